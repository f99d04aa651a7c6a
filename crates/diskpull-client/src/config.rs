//! Client configuration, defaults, and validation.
//!
//! # Design
//! - Values arrive from CLI flags or environment variables; this module only
//!   normalises and validates them.
//! - The base URL always ends with `/` so endpoint paths join beneath it.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

/// Backend base address used when none is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/disk/";
/// Request timeout in seconds used when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Worker pool size for batch downloads.
pub const DEFAULT_DOWNLOAD_CONCURRENCY: usize = 4;
/// Upper bound for the download worker pool.
pub const MAX_DOWNLOAD_CONCURRENCY: usize = 32;

const TOKEN_FILE_NAME: &str = "tokens.json";
const APP_DIR_NAME: &str = "diskpull";

/// Resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend base URL; endpoint paths are resolved relative to it.
    pub base_url: Url,
    /// Per-request timeout for backend calls.
    pub timeout: Duration,
    /// Worker pool size for batch downloads.
    pub download_concurrency: usize,
    /// Location of the persisted token document.
    pub token_path: PathBuf,
}

impl ClientConfig {
    /// Build a configuration with default timeout, concurrency, and token path.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not an absolute `http`/`https` URL.
    pub fn new(base_url: Url) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            download_concurrency: DEFAULT_DOWNLOAD_CONCURRENCY,
            token_path: default_token_path(),
        })
    }

    /// Override the request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the timeout is zero.
    pub fn with_timeout_secs(mut self, secs: u64) -> Result<Self, ConfigError> {
        if secs == 0 {
            return Err(ConfigError::InvalidField {
                field: "timeout",
                reason: "must be greater than zero",
                value: Some(secs.to_string()),
            });
        }
        self.timeout = Duration::from_secs(secs);
        Ok(self)
    }

    /// Override the download worker pool size.
    ///
    /// # Errors
    ///
    /// Returns an error when the value is zero or above [`MAX_DOWNLOAD_CONCURRENCY`].
    pub fn with_download_concurrency(mut self, workers: usize) -> Result<Self, ConfigError> {
        if !(1..=MAX_DOWNLOAD_CONCURRENCY).contains(&workers) {
            return Err(ConfigError::InvalidField {
                field: "download_concurrency",
                reason: "must be between 1 and 32",
                value: Some(workers.to_string()),
            });
        }
        self.download_concurrency = workers;
        Ok(self)
    }

    /// Override the token document location.
    #[must_use]
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }
}

/// Parse and normalise a base URL supplied as text.
///
/// # Errors
///
/// Returns an error if the input is not an absolute `http`/`https` URL.
pub fn parse_base_url(input: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(input.trim()).map_err(|_| ConfigError::InvalidField {
        field: "base_url",
        reason: "must be an absolute URL",
        value: Some(input.to_string()),
    })?;
    normalize_base_url(url)
}

fn normalize_base_url(mut url: Url) -> Result<Url, ConfigError> {
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ConfigError::InvalidField {
            field: "base_url",
            reason: "must use http or https",
            value: Some(url.to_string()),
        });
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Default token document location.
///
/// Prefers `$XDG_CONFIG_HOME/diskpull`, then `$HOME/.config/diskpull`, and falls back
/// to the working directory.
#[must_use]
pub fn default_token_path() -> PathBuf {
    let base = env::var_os("XDG_CONFIG_HOME")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            env::var_os("HOME")
                .filter(|value| !value.is_empty())
                .map(|home| PathBuf::from(home).join(".config"))
        });
    base.map_or_else(
        || PathBuf::from(format!(".{APP_DIR_NAME}-{TOKEN_FILE_NAME}")),
        |dir| dir.join(APP_DIR_NAME).join(TOKEN_FILE_NAME),
    )
}
