//! Request signing for authenticated upstream endpoints

use crate::error::{Result, TickerError};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 of `payload` keyed with `secret`
pub fn hmac_sha256_hex(secret: &str, payload: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| TickerError::Signing(e.to_string()))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Builds the `X-signature` header value `{timestamp}.{public_key}.{hex}`,
/// where the hex digest signs `{timestamp}.{public_key}`.
pub fn signature_header(public_key: &str, secret_key: &str, timestamp: i64) -> Result<String> {
    let payload = format!("{}.{}", timestamp, public_key);
    let digest = hmac_sha256_hex(secret_key, &payload)?;
    Ok(format!("{}.{}", payload, digest))
}
