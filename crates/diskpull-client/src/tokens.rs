//! Bearer token persistence.
//!
//! # Design
//! - Stores know nothing about token shape; they hold two named strings.
//! - Empty values read back as absent, matching how callers treat them.
//! - The file store rewrites its document atomically and deletes it once empty.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::{TokenStoreError, TokenStoreResult};

/// Names of the persisted tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenName {
    /// Short-lived credential attached to every request.
    Access,
    /// Long-lived credential exchanged for new access tokens.
    Refresh,
}

impl TokenName {
    /// Storage key for the token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access_token",
            Self::Refresh => "refresh_token",
        }
    }
}

impl fmt::Display for TokenName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Access/refresh token pair issued by login, register, or refresh.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    /// Access token.
    pub access: String,
    /// Refresh token.
    pub refresh: String,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TokenPair")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

/// Named string storage for bearer tokens.
pub trait TokenStore: Send + Sync {
    /// Read a token; `None` when absent or empty.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing storage cannot be read.
    fn get(&self, name: TokenName) -> TokenStoreResult<Option<String>>;

    /// Write a token, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing storage cannot be written.
    fn set(&self, name: TokenName, value: &str) -> TokenStoreResult<()>;

    /// Remove a token; removing an absent token succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing storage cannot be written.
    fn remove(&self, name: TokenName) -> TokenStoreResult<()>;
}

/// Process-lifetime token store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    values: Mutex<HashMap<TokenName, String>>,
}

impl MemoryTokenStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, name: TokenName) -> TokenStoreResult<Option<String>> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(&name).filter(|value| !value.is_empty()).cloned())
    }

    fn set(&self, name: TokenName, value: &str) -> TokenStoreResult<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(name, value.to_string());
        Ok(())
    }

    fn remove(&self, name: TokenName) -> TokenStoreResult<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.remove(&name);
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct TokenDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

impl TokenDocument {
    const fn slot(&mut self, name: TokenName) -> &mut Option<String> {
        match name {
            TokenName::Access => &mut self.access_token,
            TokenName::Refresh => &mut self.refresh_token,
        }
    }

    const fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// Token store persisted as a small JSON document on disk.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    document: Mutex<TokenDocument>,
}

impl FileTokenStore {
    /// Open the store at `path`, loading any existing document.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing document cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> TokenStoreResult<Self> {
        let path = path.into();
        let document = match fs::read(&path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => TokenDocument::default(),
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|source| TokenStoreError::Json {
                    path: path.clone(),
                    source,
                })?
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => TokenDocument::default(),
            Err(source) => {
                return Err(TokenStoreError::Io {
                    operation: "read",
                    path,
                    source,
                });
            }
        };
        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    /// Location of the backing document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn mutate(&self, apply: impl FnOnce(&mut TokenDocument)) -> TokenStoreResult<()> {
        let mut document = self.document.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = document.clone();
        apply(&mut next);
        self.persist(&next)?;
        *document = next;
        drop(document);
        Ok(())
    }

    fn persist(&self, document: &TokenDocument) -> TokenStoreResult<()> {
        if document.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(source) => Err(TokenStoreError::Io {
                    operation: "remove",
                    path: self.path.clone(),
                    source,
                }),
            };
        }

        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| TokenStoreError::Io {
                operation: "create_dir",
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let bytes = serde_json::to_vec_pretty(document).map_err(|source| TokenStoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, bytes).map_err(|source| TokenStoreError::Io {
            operation: "write",
            path: staging.clone(),
            source,
        })?;
        restrict_permissions(&staging)?;
        fs::rename(&staging, &self.path).map_err(|source| TokenStoreError::Io {
            operation: "rename",
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> TokenStoreResult<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|source| {
        TokenStoreError::Io {
            operation: "chmod",
            path: path.to_path_buf(),
            source,
        }
    })
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> TokenStoreResult<()> {
    Ok(())
}

impl TokenStore for FileTokenStore {
    fn get(&self, name: TokenName) -> TokenStoreResult<Option<String>> {
        let mut document = self.document.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(document.slot(name).clone().filter(|value| !value.is_empty()))
    }

    fn set(&self, name: TokenName, value: &str) -> TokenStoreResult<()> {
        let value = value.to_string();
        self.mutate(|document| *document.slot(name) = Some(value))
    }

    fn remove(&self, name: TokenName) -> TokenStoreResult<()> {
        self.mutate(|document| *document.slot(name) = None)
    }
}
