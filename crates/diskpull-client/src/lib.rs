#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Client engine for browsing and downloading public share links through the
//! diskpull backend.
//!
//! Layout:
//! - `config.rs`: client configuration, defaults, and validation
//! - `tokens.rs`: token store trait with memory and file-backed implementations
//! - `session.rs`: explicit session context (tokens, authenticated flag, route)
//! - `http.rs`: transport, request hooks, and the shared API client
//! - `jwt.rs`: local, unverified expiry decoding for access tokens
//! - `auth.rs`: login/register/logout, the refresh hook, and the form state machine
//! - `gate.rs`: start-up session revalidation
//! - `listing.rs`: share-link listing, per-session cache, and stale-response guard
//! - `filter.rs`: content-type categories, filtered views, and selection
//! - `download.rs`: bounded download orchestration and on-disk sinks
//! - `models.rs`: wire DTOs and endpoint paths
//! - `error.rs`: error types shared across the modules

pub mod auth;
pub mod config;
pub mod download;
pub mod error;
pub mod filter;
pub mod gate;
pub mod http;
pub mod jwt;
pub mod listing;
pub mod models;
pub mod session;
pub mod tokens;

pub use auth::{
    AUTH_FAILED_FALLBACK, AuthFlow, AuthForm, AuthFormEvent, AuthFormRejection, AuthFormState,
    AuthMode, Credentials, LogoutOutcome, RefreshOutcome, TokenRefresher,
};
pub use config::{ClientConfig, DEFAULT_API_URL};
pub use download::{
    DirectorySink, DownloadReport, DownloadSink, Downloader, SavedFile, payload_client,
};
pub use error::{ApiError, AuthError, ConfigError, DownloadError, TokenStoreError};
pub use filter::{DisplayKind, FileCategory, FilterCategory, Selection};
pub use gate::SessionGate;
pub use http::{ApiClient, ApiResponse, PreparedRequest, RequestHook, Transport};
pub use listing::{FetchPlan, FetchTicket, FileBrowser, FileListing, ListingOutcome};
pub use models::RemoteFile;
pub use session::{Route, Session};
pub use tokens::{FileTokenStore, MemoryTokenStore, TokenName, TokenPair, TokenStore};
