//! Local, unverified inspection of JWT access tokens.
//!
//! Only the `exp` claim is read, and only to decide whether a refresh should be
//! attempted before a request. The signature is never checked; the backend remains
//! the authority on whether a token is accepted.

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    exp: Option<f64>,
}

/// Decode the payload segment and return its `exp` claim in seconds since the epoch.
///
/// Returns `None` when the token is malformed. `Some(None)` means the payload decoded
/// but carries no expiry.
#[must_use]
pub fn expiry(token: &str) -> Option<Option<f64>> {
    let payload = token.split('.').nth(1)?;
    let trimmed = payload.trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
        .ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    Some(claims.exp)
}

/// Whether the token's `exp` lies before `now`.
///
/// `None` when the token cannot be decoded. A token without `exp` never expires.
#[must_use]
pub fn is_expired(token: &str, now: DateTime<Utc>) -> Option<bool> {
    let exp = expiry(token)?;
    #[allow(clippy::cast_precision_loss)]
    let now = now.timestamp() as f64;
    Some(exp.is_some_and(|exp| exp < now))
}
