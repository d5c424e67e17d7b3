//! Request signing shared by the Binance and 3Commas clients
//!
//! Both venues sign with HMAC-SHA256 and send the hex digest: Binance over
//! the query string, 3Commas over the request path plus query.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{ApiError, ApiResult};

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 of `payload` keyed with `secret`
pub fn sign_request(payload: &str, secret: &str) -> ApiResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ApiError::Signing(e.to_string()))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Join query parameters in the given order without reordering
pub fn encode_query(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// API key and secret for one venue
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"***")
            .finish()
    }
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn sign(&self, payload: &str) -> ApiResult<String> {
        sign_request(payload, &self.api_secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binance_documented_signature() {
        let secret = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";
        let query = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";
        assert_eq!(
            sign_request(query, secret).unwrap(),
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn test_signature_shape_and_consistency() {
        let sig = sign_request("/public/api/ver1/deals?scope=active", "secret").unwrap();
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(
            sig,
            sign_request("/public/api/ver1/deals?scope=active", "secret").unwrap()
        );
        assert_ne!(
            sig,
            sign_request("/public/api/ver1/deals?scope=finished", "secret").unwrap()
        );
        assert_ne!(
            sig,
            sign_request("/public/api/ver1/deals?scope=active", "other").unwrap()
        );
    }

    #[test]
    fn test_encode_query_keeps_order() {
        let params = [
            ("symbol", "BTCUSDT".to_string()),
            ("orderId", "42".to_string()),
        ];
        assert_eq!(encode_query(&params), "symbol=BTCUSDT&orderId=42");
        assert_eq!(encode_query(&[]), "");
    }

    #[test]
    fn test_credentials_debug_hides_secret() {
        let creds = Credentials::new("key", "topsecret");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("key"));
        assert!(!debug.contains("topsecret"));
        assert_eq!(creds.sign("x").unwrap(), sign_request("x", "topsecret").unwrap());
    }
}
