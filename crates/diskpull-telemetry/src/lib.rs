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

//! Logging primitives shared across the diskpull workspace.
//!
//! Layout:
//! - `init.rs`: subscriber installation, log format selection, build identifier
//! - `context.rs`: process-wide span guard carrying the invocation metadata

pub mod context;
pub mod init;

pub use context::{GlobalContextGuard, record_command};
pub use init::{
    DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging, log_format_from_str,
};
