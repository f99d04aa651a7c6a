//! # Design
//!
//! - Constant error messages; context travels in structured fields.
//! - Source errors are preserved rather than interpolated into messages.
//! - User-facing wording lives with the component that owns it, not here.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for backend requests.
pub type ApiResult<T> = Result<T, ApiError>;

/// Result alias for token store operations.
pub type TokenStoreResult<T> = Result<T, TokenStoreError>;

/// Result alias for the authentication flow.
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors raised while talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The HTTP client could not be constructed.
    #[error("failed to build http client")]
    Build {
        /// Underlying reqwest error.
        source: reqwest::Error,
    },
    /// The endpoint path could not be resolved against the base URL.
    #[error("invalid request url")]
    InvalidUrl {
        /// Endpoint path that failed to resolve.
        endpoint: String,
        /// Underlying parse error.
        source: url::ParseError,
    },
    /// The request exceeded the configured timeout.
    #[error("request timed out")]
    Timeout {
        /// Endpoint that timed out.
        endpoint: String,
        /// Underlying reqwest error.
        source: reqwest::Error,
    },
    /// The request failed before a response was received.
    #[error("request transport failure")]
    Transport {
        /// Endpoint that failed.
        endpoint: String,
        /// Underlying reqwest error.
        source: reqwest::Error,
    },
    /// The backend answered with a non-success status.
    #[error("request rejected by server")]
    Status {
        /// Endpoint that rejected the request.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// Server-supplied error detail, when present.
        detail: Option<String>,
    },
    /// The request body could not be encoded.
    #[error("failed to encode request body")]
    Encode {
        /// Endpoint the body was destined for.
        endpoint: String,
        /// Underlying serde error.
        source: serde_json::Error,
    },
    /// The response body could not be decoded.
    #[error("failed to decode response body")]
    Decode {
        /// Endpoint that produced the body.
        endpoint: String,
        /// Underlying serde error.
        source: serde_json::Error,
    },
}

impl ApiError {
    pub(crate) fn from_reqwest(endpoint: &str, source: reqwest::Error) -> Self {
        let endpoint = endpoint.to_string();
        if source.is_timeout() {
            Self::Timeout { endpoint, source }
        } else {
            Self::Transport { endpoint, source }
        }
    }

    /// HTTP status carried by the error, if the server answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Server-supplied error detail, if any.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// Whether the server refused the credentials (401 or 403).
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }
}

/// Errors raised by token stores.
#[derive(Debug, Error)]
pub enum TokenStoreError {
    /// IO failure while reading or writing the token document.
    #[error("token store io failure")]
    Io {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path of the token document.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The token document could not be parsed or serialised.
    #[error("token store json failure")]
    Json {
        /// Path of the token document.
        path: PathBuf,
        /// Underlying serde error.
        source: serde_json::Error,
    },
}

/// Errors raised by the login/register flow.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The backend rejected the request or could not be reached.
    #[error("authentication request failed")]
    Request {
        /// Underlying API error.
        #[from]
        source: ApiError,
    },
    /// The backend answered without both tokens.
    #[error("tokens not received")]
    MissingTokens,
    /// The tokens could not be persisted.
    #[error("failed to persist tokens")]
    Store {
        /// Underlying token store error.
        #[from]
        source: TokenStoreError,
    },
}

/// Errors raised while downloading a single file.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Resolving the redirect URL through the backend failed.
    #[error("download link request failed")]
    Link {
        /// Underlying API error.
        #[from]
        source: ApiError,
    },
    /// The backend answered without a redirect URL.
    #[error("download link missing from response")]
    MissingLink {
        /// File path that was submitted.
        path: String,
    },
    /// The payload HTTP client could not be constructed.
    #[error("failed to build payload client")]
    Build {
        /// Underlying reqwest error.
        source: reqwest::Error,
    },
    /// Fetching the payload from the redirect URL failed.
    #[error("payload fetch failed")]
    Fetch {
        /// Redirect URL that was fetched.
        url: String,
        /// Underlying reqwest error.
        source: reqwest::Error,
    },
    /// The payload host answered with a non-success status.
    #[error("payload fetch rejected")]
    FetchStatus {
        /// Redirect URL that was fetched.
        url: String,
        /// HTTP status code.
        status: u16,
    },
    /// The file name cannot be used as a local file name.
    #[error("invalid file name")]
    InvalidName {
        /// Offending name.
        name: String,
    },
    /// IO failure while writing the payload.
    #[error("download io failure")]
    Io {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
}

/// Errors raised while validating client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn status_error_exposes_status_and_detail() {
        let err = ApiError::Status {
            endpoint: "files/".into(),
            status: 403,
            detail: Some("forbidden".into()),
        };
        assert_eq!(err.status(), Some(403));
        assert_eq!(err.detail(), Some("forbidden"));
        assert!(err.is_unauthorized());
        assert_eq!(err.to_string(), "request rejected by server");
    }

    #[test]
    fn not_found_is_not_unauthorized() {
        let err = ApiError::Status {
            endpoint: "files/".into(),
            status: 404,
            detail: None,
        };
        assert!(!err.is_unauthorized());
        assert!(err.detail().is_none());
    }

    #[test]
    fn token_store_error_preserves_source() {
        let err = TokenStoreError::Io {
            operation: "read",
            path: PathBuf::from("tokens.json"),
            source: io::Error::other("disk"),
        };
        assert_eq!(err.to_string(), "token store io failure");
        assert!(err.source().is_some());
    }

    #[test]
    fn download_error_messages_are_constant() {
        let err = DownloadError::InvalidName { name: "..".into() };
        assert_eq!(err.to_string(), "invalid file name");
        let err = DownloadError::FetchStatus {
            url: "https://example.test/a".into(),
            status: 500,
        };
        assert_eq!(err.to_string(), "payload fetch rejected");
    }
}
