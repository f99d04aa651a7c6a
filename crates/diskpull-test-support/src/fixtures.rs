//! Token builders and backend payload fixtures.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use serde_json::{Value, json};

/// Build an unsigned JWT-shaped token whose payload carries the given `exp`.
#[must_use]
pub fn jwt_with_exp(exp: i64) -> String {
    jwt_with_claims(&json!({ "token_type": "access", "exp": exp, "user_id": 1 }))
}

/// Build an unsigned JWT-shaped token from an arbitrary claims document.
#[must_use]
pub fn jwt_with_claims(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

/// Access token that expired an hour ago.
#[must_use]
pub fn expired_jwt() -> String {
    jwt_with_exp(Utc::now().timestamp() - 3_600)
}

/// Access token valid for another hour.
#[must_use]
pub fn fresh_jwt() -> String {
    jwt_with_exp(Utc::now().timestamp() + 3_600)
}

/// Provider download URL carrying an encoded `content_type` parameter.
#[must_use]
pub fn file_path(name: &str, content_type: &str) -> String {
    let encoded = content_type.replace('/', "%2F");
    format!("https://downloader.disk.example/disk/{name}?filename={name}&content_type={encoded}&disposition=attachment")
}

/// Single file entry as returned by `GET /files/`.
#[must_use]
pub fn file_entry(name: &str, content_type: &str) -> Value {
    json!({ "name": name, "type": "file", "path": file_path(name, content_type) })
}

/// `{files: [...]}` listing payload.
#[must_use]
pub fn listing(entries: &[Value]) -> Value {
    json!({ "files": entries })
}
