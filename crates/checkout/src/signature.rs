//! Webhook signature scheme shared with the payment provider.
//!
//! The provider signs `"{timestamp}.{raw body}"` with HMAC-SHA256 over the
//! shared webhook secret and sends `t=<unix ts>,v1=<hex digest>` in the
//! signature header. Verification rejects stale timestamps to bound replay.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::GatewayError;

type HmacSha256 = Hmac<Sha256>;

/// Maximum accepted age (and clock skew) of a signed webhook, in seconds.
pub const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

/// Computes the hex HMAC digest for a timestamped payload.
pub fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Builds a complete signature header for a payload.
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    format!("t={timestamp},v1={}", sign(secret, timestamp, payload))
}

/// Verifies a signature header against a payload.
///
/// `now` is the verifier's clock (unix seconds); timestamps further than
/// [`TIMESTAMP_TOLERANCE_SECS`] from it are rejected.
pub fn verify(
    secret: &str,
    payload: &[u8],
    signature_header: &str,
    now: i64,
) -> Result<(), GatewayError> {
    let (timestamp, provided) = parse_header(signature_header)?;

    if (now - timestamp).abs() > TIMESTAMP_TOLERANCE_SECS {
        return Err(GatewayError::InvalidSignature(
            "timestamp outside tolerance".to_string(),
        ));
    }

    let provided_bytes = hex::decode(provided)
        .map_err(|_| GatewayError::InvalidSignature("signature is not hex".to_string()))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    // verify_slice is constant-time.
    mac.verify_slice(&provided_bytes)
        .map_err(|_| GatewayError::InvalidSignature("digest mismatch".to_string()))
}

fn parse_header(header: &str) -> Result<(i64, &str), GatewayError> {
    let mut timestamp = None;
    let mut signature = None;

    for part in header.split(',') {
        match part.split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signature = Some(value),
            _ => {}
        }
    }

    match (timestamp, signature) {
        (Some(t), Some(s)) => Ok((t, s)),
        _ => Err(GatewayError::InvalidSignature(
            "header missing t= or v1=".to_string(),
        )),
    }
}
