//! Share-link listing with a per-session cache and a stale-response guard.
//!
//! # Design
//! - [`FileBrowser::begin_fetch`] hands out a ticket; only the ticket of the latest
//!   generation may [`commit`](FileBrowser::commit). Older answers are discarded.
//! - The first non-empty answer for a URL is cached for the life of the browser.
//!   Empty answers are never cached.
//! - 401/403 at this boundary tear the session down through [`Session::invalidate`].

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::filter::{FilterCategory, Selection};
use crate::http::ApiClient;
use crate::models::{ENDPOINT_FILES, FileListResponse, RemoteFile};
use crate::session::Session;

/// Shown when the share link exists but holds no files.
pub const MSG_NO_FILES: &str = "Файлы по данной ссылке не найдены.";
/// Shown when the backend reports the share link as unknown.
pub const MSG_LINK_NOT_FOUND: &str =
    "Ссылка не найдена. Пожалуйста, проверьте правильность ссылки.";
/// Shown for every other listing failure.
pub const MSG_LOAD_FAILED: &str = "Произошла ошибка при загрузке файлов.";

/// Fetches share listings through the hooked API client.
#[derive(Debug, Clone)]
pub struct FileListing {
    api: ApiClient,
}

impl FileListing {
    /// Listing bound to an API client.
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// `GET files/?public_url=…`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or an
    /// undecodable body.
    pub async fn list(&self, public_url: &str) -> ApiResult<Vec<RemoteFile>> {
        let response: FileListResponse = self
            .api
            .get_json(ENDPOINT_FILES, &[("public_url", public_url)])
            .await?;
        Ok(response.files)
    }
}

/// Permission to commit one remote answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    public_url: String,
}

impl FetchTicket {
    /// URL the ticket was issued for.
    #[must_use]
    pub fn public_url(&self) -> &str {
        &self.public_url
    }
}

/// What [`FileBrowser::begin_fetch`] decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchPlan {
    /// The URL is empty; nothing to do.
    Skip,
    /// The cached list is already displayed.
    Cached {
        /// Number of entries.
        count: usize,
    },
    /// A backend request is needed; commit its answer with the ticket.
    Remote(FetchTicket),
}

/// Result of a fetch as seen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingOutcome {
    /// The URL was empty.
    Skipped,
    /// Served from cache without network IO.
    CacheHit {
        /// Number of entries.
        count: usize,
    },
    /// Fetched and cached.
    Loaded {
        /// Number of entries.
        count: usize,
    },
    /// The backend returned no entries.
    Empty,
    /// 401/403: the session was invalidated.
    SessionExpired,
    /// 404: the share link is unknown.
    LinkNotFound,
    /// Any other failure.
    Failed,
    /// A newer fetch started before this answer arrived; it was discarded.
    Stale,
}

/// Browser state: current URL, displayed list, filter, selection, and cache.
pub struct FileBrowser {
    session: Session,
    public_url: String,
    files: Vec<RemoteFile>,
    filter: FilterCategory,
    filtered: Vec<RemoteFile>,
    selection: Selection,
    cache: HashMap<String, Vec<RemoteFile>>,
    error_message: Option<&'static str>,
    generation: u64,
}

impl fmt::Debug for FileBrowser {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("FileBrowser")
            .field("public_url", &self.public_url)
            .field("files", &self.files.len())
            .field("filter", &self.filter)
            .field("selected", &self.selection.len())
            .field("cached_urls", &self.cache.len())
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl FileBrowser {
    /// Empty browser for `session`.
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            session,
            public_url: String::new(),
            files: Vec::new(),
            filter: FilterCategory::All,
            filtered: Vec::new(),
            selection: Selection::new(),
            cache: HashMap::new(),
            error_message: None,
            generation: 0,
        }
    }

    /// Set the share link to fetch next.
    pub fn set_public_url(&mut self, url: impl Into<String>) {
        self.public_url = url.into();
    }

    /// Current share link.
    #[must_use]
    pub fn public_url(&self) -> &str {
        &self.public_url
    }

    /// Full list for the current share link.
    #[must_use]
    pub fn files(&self) -> &[RemoteFile] {
        &self.files
    }

    /// Entries visible under the current filter.
    #[must_use]
    pub fn filtered(&self) -> &[RemoteFile] {
        &self.filtered
    }

    /// Current filter.
    #[must_use]
    pub const fn filter(&self) -> FilterCategory {
        self.filter
    }

    /// Change the filter; the selection is left as is.
    pub fn set_filter(&mut self, filter: FilterCategory) {
        self.filter = filter;
        self.refilter();
    }

    /// Current selection.
    #[must_use]
    pub const fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Toggle `file` in the selection.
    pub fn toggle_selection(&mut self, file: &RemoteFile) -> bool {
        self.selection.toggle(file)
    }

    /// Select every file visible under the current filter; directories are skipped.
    pub fn select_all(&mut self) {
        self.selection.select_all(&self.filtered);
    }

    /// Drop the selection.
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Message for the last fetch, if it failed or found nothing.
    #[must_use]
    pub const fn error_message(&self) -> Option<&'static str> {
        self.error_message
    }

    /// Whether `url` has a cached list.
    #[must_use]
    pub fn is_cached(&self, url: &str) -> bool {
        self.cache.contains_key(url)
    }

    /// Reset the view and decide how to serve the current URL.
    pub fn begin_fetch(&mut self) -> FetchPlan {
        self.generation += 1;
        self.error_message = None;
        self.set_files(Vec::new());

        if self.public_url.is_empty() {
            return FetchPlan::Skip;
        }
        if let Some(cached) = self.cache.get(&self.public_url) {
            let cached = cached.clone();
            let count = cached.len();
            self.set_files(cached);
            debug!(count, "serving share listing from cache");
            return FetchPlan::Cached { count };
        }
        FetchPlan::Remote(FetchTicket {
            generation: self.generation,
            public_url: self.public_url.clone(),
        })
    }

    /// Apply a backend answer, unless a newer fetch has started since `ticket`.
    pub fn commit(
        &mut self,
        ticket: FetchTicket,
        result: ApiResult<Vec<RemoteFile>>,
    ) -> ListingOutcome {
        if ticket.generation != self.generation {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                "discarding stale listing response"
            );
            return ListingOutcome::Stale;
        }

        match result {
            Ok(files) if files.is_empty() => {
                self.error_message = Some(MSG_NO_FILES);
                self.set_files(Vec::new());
                ListingOutcome::Empty
            }
            Ok(files) => {
                let count = files.len();
                self.cache.insert(ticket.public_url, files.clone());
                self.set_files(files);
                ListingOutcome::Loaded { count }
            }
            Err(err) => self.fail(&err),
        }
    }

    /// Fetch the current URL and apply the answer.
    pub async fn fetch_files(&mut self, listing: &FileListing) -> ListingOutcome {
        match self.begin_fetch() {
            FetchPlan::Skip => ListingOutcome::Skipped,
            FetchPlan::Cached { count } => ListingOutcome::CacheHit { count },
            FetchPlan::Remote(ticket) => {
                let result = listing.list(ticket.public_url()).await;
                self.commit(ticket, result)
            }
        }
    }

    fn fail(&mut self, err: &ApiError) -> ListingOutcome {
        self.set_files(Vec::new());
        warn!(error = %err, status = ?err.status(), "share listing failed");
        if err.is_unauthorized() {
            if let Err(store_err) = self.session.invalidate() {
                warn!(error = %store_err, "failed to clear stored tokens");
            }
            info!("listing rejected credentials; session invalidated");
            ListingOutcome::SessionExpired
        } else if err.status() == Some(404) {
            self.error_message = Some(MSG_LINK_NOT_FOUND);
            ListingOutcome::LinkNotFound
        } else {
            self.error_message = Some(MSG_LOAD_FAILED);
            ListingOutcome::Failed
        }
    }

    fn set_files(&mut self, files: Vec<RemoteFile>) {
        self.files = files;
        self.refilter();
    }

    fn refilter(&mut self) {
        self.filtered = self.filter.apply(&self.files);
    }
}
