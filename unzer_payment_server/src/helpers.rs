use actix_web::HttpRequest;
use hmac::{Hmac, Mac};
use log::trace;
use sha2::Sha256;

use crate::errors::ServerError;

pub const SHOP_DOMAIN_HEADER: &str = "shopify-shop-domain";
pub const WEBHOOK_SHOP_HEADER: &str = "X-Shopify-Shop-Domain";
pub const WEBHOOK_TOPIC_HEADER: &str = "X-Shopify-Topic";
pub const WEBHOOK_HMAC_HEADER: &str = "X-Shopify-Hmac-Sha256";

/// The base64-encoded HMAC-SHA256 of `data`, as the marketplace computes it for its webhooks.
pub fn calculate_hmac(secret: &str, data: &[u8]) -> String {
    // HMAC accepts keys of any length
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return String::default();
    };
    mac.update(data);
    base64::encode(mac.finalize().into_bytes())
}

/// Checks a base64-encoded HMAC-SHA256 signature of `data` in constant time.
pub fn verify_hmac(secret: &str, data: &[u8], signature: &str) -> bool {
    let Ok(expected) = base64::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(data);
    mac.verify_slice(&expected).is_ok()
}

/// Reads a header that must be present and non-empty.
pub fn required_header(req: &HttpRequest, name: &'static str) -> Result<String, ServerError> {
    let value = req
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(ServerError::InvalidHeader(name))?;
    trace!("💻️ {name}: {value}");
    Ok(value)
}
