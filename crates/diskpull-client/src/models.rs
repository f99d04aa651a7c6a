//! Wire DTOs and endpoint paths for the diskpull backend.
//!
//! Paths are relative so they resolve beneath the configured base URL.

use serde::{Deserialize, Deserializer, Serialize};

/// `POST` credentials, returns a token pair.
pub const ENDPOINT_LOGIN: &str = "login/";
/// `POST` registration details, returns a token pair.
pub const ENDPOINT_REGISTER: &str = "register/";
/// `POST` a refresh token, returns a new access token.
pub const ENDPOINT_REFRESH: &str = "refresh/";
/// `POST` with a bearer token to revoke the server-side session.
pub const ENDPOINT_LOGOUT: &str = "logout/";
/// `GET` with `public_url`, returns the share listing.
pub const ENDPOINT_FILES: &str = "files/";
/// `GET` with `download_url`, returns the redirect URL for the payload.
pub const ENDPOINT_DOWNLOAD: &str = "download/";

/// A file entry returned by the share listing.
///
/// Identity is value equality; the backend issues no stable identifier beyond `path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Display name, also used as the local file name on download.
    pub name: String,
    /// Provider download URL carrying an encoded `content_type` query parameter.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub path: String,
    /// Entry type reported by the provider (`file` or `dir`).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl RemoteFile {
    /// Construct a plain file entry.
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: Some("file".to_string()),
        }
    }

    /// Whether the provider reported this entry as a directory.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind.as_deref() == Some("dir")
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Body for `POST login/`.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    /// Account name.
    pub username: &'a str,
    /// Account password.
    pub password: &'a str,
}

/// Body for `POST register/`.
#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    /// Account name.
    pub username: &'a str,
    /// Contact address.
    pub email: &'a str,
    /// Account password.
    pub password: &'a str,
}

/// Token pair returned by login and register.
#[derive(Debug, Default, Deserialize)]
pub struct AuthTokensResponse {
    /// Short-lived access token.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Long-lived refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Body for `POST refresh/`.
#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    /// Refresh token to exchange; `null` when none is stored.
    pub refresh: Option<&'a str>,
}

/// Response of `POST refresh/`.
#[derive(Debug, Default, Deserialize)]
pub struct RefreshResponse {
    /// Newly minted access token.
    #[serde(default)]
    pub access: Option<String>,
}

/// Response of `GET files/`.
#[derive(Debug, Default, Deserialize)]
pub struct FileListResponse {
    /// Entries found behind the share link.
    #[serde(default)]
    pub files: Vec<RemoteFile>,
}

/// Response of `GET download/`.
#[derive(Debug, Default, Deserialize)]
pub struct DownloadLinkResponse {
    /// Location of the binary payload.
    #[serde(default)]
    pub redirect_url: Option<String>,
}

/// Error envelope used by the backend; only one of the fields is normally set.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub(crate) detail: Option<serde_json::Value>,
    #[serde(default)]
    pub(crate) error: Option<serde_json::Value>,
    #[serde(default)]
    pub(crate) errors: Option<serde_json::Value>,
}

impl ErrorBody {
    /// First populated message, flattened to text.
    pub(crate) fn message(self) -> Option<String> {
        [self.detail, self.error, self.errors]
            .into_iter()
            .flatten()
            .find_map(|value| match value {
                serde_json::Value::Null => None,
                serde_json::Value::String(text) => Some(text),
                other => Some(other.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn remote_file_reads_null_path_as_empty() {
        let file: RemoteFile =
            serde_json::from_value(json!({"name": "photos", "type": "dir", "path": null}))
                .expect("directory entry");
        assert_eq!(file.path, "");
        assert!(file.is_dir());
    }

    #[test]
    fn remote_file_tolerates_missing_type() {
        let file: RemoteFile =
            serde_json::from_value(json!({"name": "a.png", "path": "https://x/a"}))
                .expect("file entry");
        assert_eq!(file.kind, None);
        assert!(!file.is_dir());
    }

    #[test]
    fn error_body_prefers_detail() {
        let body: ErrorBody = serde_json::from_value(json!({
            "detail": "No active account found with the given credentials",
            "error": "ignored"
        }))
        .expect("error body");
        assert_eq!(
            body.message().as_deref(),
            Some("No active account found with the given credentials")
        );
    }

    #[test]
    fn error_body_flattens_structured_errors() {
        let body: ErrorBody =
            serde_json::from_value(json!({"errors": {"username": ["taken"]}})).expect("body");
        assert_eq!(body.message().as_deref(), Some(r#"{"username":["taken"]}"#));
        assert!(ErrorBody::default().message().is_none());
    }
}
