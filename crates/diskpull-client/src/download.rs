//! Download orchestration: resolve the redirect link, fetch the payload, persist it.
//!
//! # Design
//! - Batches run through a bounded pool and yield one report per requested file;
//!   a failure never aborts its siblings.
//! - [`DirectorySink`] writes `<name>.part` first and renames it into place, removing
//!   the partial file when anything goes wrong.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use reqwest::Client;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::DownloadError;
use crate::http::ApiClient;
use crate::models::{DownloadLinkResponse, ENDPOINT_DOWNLOAD, RemoteFile};

const PART_SUFFIX: &str = ".part";

/// Destination for downloaded payloads.
#[async_trait]
pub trait DownloadSink: Send + Sync {
    /// Persist `bytes` under `name` and return where they landed.
    async fn save(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, DownloadError>;
}

/// Writes payloads into a local directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    /// Sink rooted at `root`; the directory is created on first use.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Destination directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Reduce a remote name to a single path component.
///
/// # Errors
///
/// Returns an error when nothing usable remains (empty, `.`, `..`).
pub fn sanitize_file_name(name: &str) -> Result<String, DownloadError> {
    Path::new(name.trim())
        .file_name()
        .and_then(|component| component.to_str())
        .filter(|component| !component.is_empty())
        .map(str::to_string)
        .ok_or_else(|| DownloadError::InvalidName {
            name: name.to_string(),
        })
}

#[async_trait]
impl DownloadSink for DirectorySink {
    async fn save(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, DownloadError> {
        let file_name = sanitize_file_name(name)?;
        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| DownloadError::Io {
                operation: "create_dir_all",
                path: self.root.clone(),
                source,
            })?;

        let target = self.root.join(&file_name);
        let partial = self.root.join(format!("{file_name}{PART_SUFFIX}"));

        if let Err(source) = fs::write(&partial, bytes).await {
            discard_partial(&partial).await;
            return Err(DownloadError::Io {
                operation: "write",
                path: partial,
                source,
            });
        }
        if let Err(source) = fs::rename(&partial, &target).await {
            discard_partial(&partial).await;
            return Err(DownloadError::Io {
                operation: "rename",
                path: target,
                source,
            });
        }
        Ok(target)
    }
}

async fn discard_partial(path: &Path) {
    if let Err(err) = fs::remove_file(path).await {
        debug!(path = %path.display(), error = %err, "partial file already gone");
    }
}

/// A payload that reached its destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    /// Remote name.
    pub name: String,
    /// Where the payload was written.
    pub path: PathBuf,
    /// Payload size.
    pub bytes: u64,
}

/// Per-file outcome of a batch.
#[derive(Debug)]
pub struct DownloadReport {
    /// Requested entry.
    pub file: RemoteFile,
    /// What happened to it.
    pub result: Result<SavedFile, DownloadError>,
}

impl DownloadReport {
    /// Whether the file was saved.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// HTTP client for payload hosts.
///
/// `stall` bounds connecting and each read, never the whole transfer, and no
/// backend headers are attached.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be constructed.
pub fn payload_client(stall: Duration) -> Result<Client, DownloadError> {
    Client::builder()
        .connect_timeout(stall)
        .read_timeout(stall)
        .build()
        .map_err(|source| DownloadError::Build { source })
}

/// Resolves download links and fetches payloads through a bounded pool.
#[derive(Clone)]
pub struct Downloader {
    api: ApiClient,
    fetcher: Client,
    sink: Arc<dyn DownloadSink>,
    concurrency: usize,
}

impl fmt::Debug for Downloader {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Downloader")
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

impl Downloader {
    /// Downloader that resolves links through `api` and fetches payloads with
    /// `fetcher`, usually built by [`payload_client`].
    ///
    /// `concurrency` is clamped to at least one worker.
    #[must_use]
    pub fn new(
        api: ApiClient,
        fetcher: Client,
        sink: Arc<dyn DownloadSink>,
        concurrency: usize,
    ) -> Self {
        Self {
            api,
            fetcher,
            sink,
            concurrency: concurrency.max(1),
        }
    }

    /// Worker pool size.
    #[must_use]
    pub const fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// `GET download/?download_url=…` and return the redirect URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails or carries no redirect URL.
    pub async fn resolve_link(&self, file: &RemoteFile) -> Result<String, DownloadError> {
        let response: DownloadLinkResponse = self
            .api
            .get_json(ENDPOINT_DOWNLOAD, &[("download_url", file.path.as_str())])
            .await?;
        response
            .redirect_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| DownloadError::MissingLink {
                path: file.path.clone(),
            })
    }

    /// Download a single file.
    ///
    /// # Errors
    ///
    /// Returns an error if the link cannot be resolved, the payload cannot be
    /// fetched, or the sink rejects it.
    pub async fn download_one(&self, file: &RemoteFile) -> Result<SavedFile, DownloadError> {
        let url = self.resolve_link(file).await?;
        debug!(name = %file.name, "fetching payload");

        let response = self
            .fetcher
            .get(&url)
            .send()
            .await
            .map_err(|source| DownloadError::Fetch {
                url: url.clone(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::FetchStatus {
                url,
                status: status.as_u16(),
            });
        }
        let payload = response
            .bytes()
            .await
            .map_err(|source| DownloadError::Fetch {
                url: url.clone(),
                source,
            })?;

        let path = self.sink.save(&file.name, &payload).await?;
        let bytes = payload.len() as u64;
        info!(name = %file.name, bytes, path = %path.display(), "file saved");
        Ok(SavedFile {
            name: file.name.clone(),
            path,
            bytes,
        })
    }

    /// Download every file with at most `concurrency` in flight.
    ///
    /// Reports come back in input order.
    pub async fn download_many(&self, files: &[RemoteFile]) -> Vec<DownloadReport> {
        stream::iter(files.iter().cloned())
            .map(|file| async move {
                let result = self.download_one(&file).await;
                if let Err(err) = &result {
                    warn!(name = %file.name, error = %err, "download failed");
                }
                DownloadReport { file, result }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}
