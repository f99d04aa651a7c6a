//! Process-wide span helpers.
//!
//! # Design
//! - Keep one application span entered for the whole CLI invocation so every event
//!   carries the command name, trace id, and build identifier.

use tracing::{Span, span::Entered};

use crate::init::build_sha;

/// Guard that keeps the application-level span entered for the lifetime of the process.
pub struct GlobalContextGuard {
    _guard: Entered<'static>,
}

impl GlobalContextGuard {
    /// Enter the application-level tracing span for the lifetime of the guard.
    #[must_use]
    pub fn new(trace_id: impl Into<String>) -> Self {
        let trace_id = trace_id.into();
        let span: &'static Span = Box::leak(Box::new(tracing::info_span!(
            "diskpull",
            trace_id = %trace_id,
            command = tracing::field::Empty,
            build_sha = %build_sha()
        )));
        let guard = span.enter();
        Self { _guard: guard }
    }
}

/// Record the command being executed on the active span.
pub fn record_command(command: &str) {
    Span::current().record("command", tracing::field::display(command));
}
