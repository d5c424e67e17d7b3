// Position store for the DCA position tracker
// SQLite-backed persistence keyed by exchange symbol
//
// Decimals are stored as TEXT so quantities round-trip exactly.

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

use crate::types::PositionRecord;

/// Get/put/delete of position records by symbol
pub trait PositionStore: Send + Sync {
    fn get(&self, symbol: &str) -> Result<Option<PositionRecord>>;
    fn put(&self, record: &PositionRecord) -> Result<()>;
    fn delete(&self, symbol: &str) -> Result<()>;
}

// =============================================================================
// SQLite
// =============================================================================

pub struct SqlitePositionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqlitePositionStore {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database: {}", db_path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let store = Self::with_connection(conn)?;
        info!("Position store opened at {}", db_path.display());
        Ok(store)
    }

    /// Private in-memory database, used by tests
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.create_tables()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("position store connection lock poisoned"))
    }

    fn create_tables(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS positions (
                symbol TEXT PRIMARY KEY,
                executed_qty TEXT NOT NULL,
                cumulative_quote_qty TEXT NOT NULL,
                num_orders INTEGER NOT NULL,
                take_profit_order_id INTEGER,
                updated_at TEXT DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;
        Ok(())
    }
}

fn parse_decimal(column: &str, value: &str) -> Result<Decimal> {
    Decimal::from_str(value).with_context(|| format!("Invalid {} value {:?}", column, value))
}

impl PositionStore for SqlitePositionStore {
    fn get(&self, symbol: &str) -> Result<Option<PositionRecord>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT executed_qty, cumulative_quote_qty, num_orders, take_profit_order_id
                 FROM positions WHERE symbol = ?1",
                params![symbol],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, u32>(2)?,
                        row.get::<_, Option<i64>>(3)?,
                    ))
                },
            )
            .optional()
            .with_context(|| format!("Failed to load position for {}", symbol))?;

        let Some((executed, cumulative, num_orders, tp_id)) = row else {
            return Ok(None);
        };

        Ok(Some(PositionRecord {
            symbol: symbol.to_string(),
            executed_qty: parse_decimal("executed_qty", &executed)?,
            cumulative_quote_qty: parse_decimal("cumulative_quote_qty", &cumulative)?,
            num_orders,
            take_profit_order_id: tp_id.map(|id| id as u64),
        }))
    }

    fn put(&self, record: &PositionRecord) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO positions
             (symbol, executed_qty, cumulative_quote_qty, num_orders, take_profit_order_id, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, CURRENT_TIMESTAMP)",
            params![
                record.symbol,
                record.executed_qty.to_string(),
                record.cumulative_quote_qty.to_string(),
                record.num_orders,
                record.take_profit_order_id.map(|id| id as i64),
            ],
        )
        .with_context(|| format!("Failed to save position for {}", record.symbol))?;
        debug!("Saved position: {} ({} orders)", record.symbol, record.num_orders);
        Ok(())
    }

    fn delete(&self, symbol: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM positions WHERE symbol = ?1", params![symbol])
            .with_context(|| format!("Failed to delete position for {}", symbol))?;
        debug!("Deleted position: {}", symbol);
        Ok(())
    }
}

// =============================================================================
// In-memory
// =============================================================================

#[derive(Default)]
pub struct MemoryPositionStore {
    records: Mutex<HashMap<String, PositionRecord>>,
}

impl MemoryPositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, PositionRecord>>> {
        self.records
            .lock()
            .map_err(|_| anyhow!("position store lock poisoned"))
    }
}

impl PositionStore for MemoryPositionStore {
    fn get(&self, symbol: &str) -> Result<Option<PositionRecord>> {
        Ok(self.lock()?.get(symbol).cloned())
    }

    fn put(&self, record: &PositionRecord) -> Result<()> {
        self.lock()?.insert(record.symbol.clone(), record.clone());
        Ok(())
    }

    fn delete(&self, symbol: &str) -> Result<()> {
        self.lock()?.remove(symbol);
        Ok(())
    }
}

/// Open the configured store; `None` keeps records in memory for this run only
pub fn create_position_store(db_path: Option<&Path>) -> Result<Arc<dyn PositionStore>> {
    match db_path {
        Some(path) => Ok(Arc::new(SqlitePositionStore::open(path)?)),
        None => {
            info!("No database path configured, positions kept in memory");
            Ok(Arc::new(MemoryPositionStore::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record() -> PositionRecord {
        PositionRecord {
            symbol: "BTCUSDT".to_string(),
            executed_qty: dec!(0.00123456789),
            cumulative_quote_qty: dec!(100.000000001),
            num_orders: 3,
            take_profit_order_id: Some(987654321),
        }
    }

    fn exercise(store: &dyn PositionStore) {
        assert_eq!(store.get("BTCUSDT").unwrap(), None);

        store.put(&record()).unwrap();
        assert_eq!(store.get("BTCUSDT").unwrap(), Some(record()));

        let mut updated = record();
        updated.take_profit_order_id = None;
        updated.num_orders = 4;
        store.put(&updated).unwrap();
        assert_eq!(store.get("BTCUSDT").unwrap(), Some(updated));

        store.delete("BTCUSDT").unwrap();
        assert_eq!(store.get("BTCUSDT").unwrap(), None);
        // Deleting a missing record is fine
        store.delete("BTCUSDT").unwrap();
    }

    #[test]
    fn test_sqlite_store_round_trips_exact_decimals() {
        let store = SqlitePositionStore::in_memory().unwrap();
        exercise(&store);
    }

    #[test]
    fn test_memory_store() {
        exercise(&MemoryPositionStore::new());
    }

    #[test]
    fn test_sqlite_store_persists_across_reopen() {
        let dir = std::env::temp_dir().join(format!("dca-bots-store-{}", std::process::id()));
        let path = dir.join("positions.db");
        {
            let store = SqlitePositionStore::open(&path).unwrap();
            store.put(&record()).unwrap();
        }
        let store = SqlitePositionStore::open(&path).unwrap();
        assert_eq!(store.get("BTCUSDT").unwrap(), Some(record()));
        drop(store);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
