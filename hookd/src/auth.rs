//! Webhook request authentication
//!
//! dbt Cloud signs each delivery with an HMAC-SHA256 of the raw body keyed
//! by the account's webhook secret and puts the hex digest in the
//! `authorization` header.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Hex HMAC-SHA256 digest of `body` under `secret`
pub fn signature(secret: &[u8], body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a delivery. A missing or empty secret means the service is not
/// configured to accept anything, so every request is unauthenticated.
pub fn is_authentic(secret: Option<&str>, auth_header: Option<&str>, body: &[u8]) -> bool {
    let Some(secret) = secret.filter(|s| !s.is_empty()) else {
        warn!("webhook auth token not set; rejecting request");
        return false;
    };
    let Some(header) = auth_header else {
        return false;
    };
    signature(secret.as_bytes(), body) == header
}
