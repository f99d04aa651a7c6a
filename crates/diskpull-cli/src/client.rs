//! Application context, CLI errors, and classification of library failures.

use std::fmt::{self, Display, Formatter};
use std::path::Path;
use std::sync::Arc;

use diskpull_client::config::parse_base_url;
use diskpull_client::{
    ApiClient, AuthError, AuthFlow, ClientConfig, DirectorySink, Downloader, FileTokenStore,
    Session, SessionGate, TokenRefresher, Transport, payload_client,
};
use url::Url;

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

/// Application context passed to command handlers.
#[derive(Clone)]
pub(crate) struct AppContext {
    pub(crate) config: ClientConfig,
    pub(crate) transport: Transport,
    pub(crate) session: Session,
}

impl AppContext {
    /// Open the token file and build the transport for this invocation.
    pub(crate) fn new(config: ClientConfig, trace_id: &str) -> CliResult<Self> {
        let store = FileTokenStore::open(&config.token_path).map_err(|err| {
            CliError::failure(anyhow::Error::new(err).context(format!(
                "failed to open token file {}",
                config.token_path.display()
            )))
        })?;
        let transport = Transport::new(&config, trace_id)
            .map_err(|err| CliError::failure(anyhow::Error::new(err)))?;
        Ok(Self {
            session: Session::new(Arc::new(store)),
            transport,
            config,
        })
    }

    /// API client that attaches the bearer and refreshes expired tokens.
    pub(crate) fn api(&self) -> ApiClient {
        ApiClient::new(self.transport.clone(), self.session.clone()).with_hook(Arc::new(
            TokenRefresher::new(self.transport.clone(), self.session.clone()),
        ))
    }

    pub(crate) fn auth(&self) -> AuthFlow {
        AuthFlow::new(self.transport.clone(), self.session.clone())
    }

    pub(crate) fn gate(&self) -> SessionGate {
        SessionGate::new(self.transport.clone(), self.session.clone())
    }

    /// Downloader writing into `dest`; payload fetches use their own client.
    pub(crate) fn downloader(&self, dest: &Path) -> CliResult<Downloader> {
        let fetcher = payload_client(self.config.timeout)
            .map_err(|err| CliError::failure(anyhow::Error::new(err)))?;
        Ok(Downloader::new(
            self.api(),
            fetcher,
            Arc::new(DirectorySink::new(dest)),
            self.config.download_concurrency,
        ))
    }
}

/// Parse the API URL provided to the CLI.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    parse_base_url(input).map_err(|_| format!("invalid URL '{input}': expected an http or https address"))
}

/// Classify a login/registration failure into a CLI error.
pub(crate) fn classify_auth_error(err: AuthError) -> CliError {
    let message = err.user_message();
    match err {
        AuthError::Request { source } if source.status().is_some() => {
            CliError::validation(message)
        }
        AuthError::MissingTokens => CliError::validation(message),
        other => CliError::failure(anyhow::Error::new(other).context(message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use diskpull_client::{AUTH_FAILED_FALLBACK, ApiError};

    fn status(code: u16, detail: Option<&str>) -> ApiError {
        ApiError::Status {
            endpoint: "files/".into(),
            status: code,
            detail: detail.map(str::to_string),
        }
    }

    #[test]
    fn exit_codes_distinguish_validation_and_failure() {
        assert_eq!(CliError::validation("bad").exit_code(), 2);
        assert_eq!(CliError::failure(anyhow!("boom")).exit_code(), 3);
        assert_eq!(CliError::validation("bad").display_message(), "bad");
    }

    #[test]
    fn auth_rejections_use_server_detail_or_fallback() {
        let err = classify_auth_error(AuthError::Request {
            source: status(401, Some("No active account found")),
        });
        assert!(matches!(err, CliError::Validation(ref m) if m == "No active account found"));

        let err = classify_auth_error(AuthError::Request {
            source: status(500, None),
        });
        assert_eq!(err.display_message(), AUTH_FAILED_FALLBACK);

        let err = classify_auth_error(AuthError::MissingTokens);
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.display_message(), AUTH_FAILED_FALLBACK);
    }

    #[test]
    fn parse_url_normalises_trailing_slash() {
        let url = parse_url("http://localhost:8000/disk").expect("valid");
        assert_eq!(url.as_str(), "http://localhost:8000/disk/");
        assert!(parse_url("ftp://example.com").is_err());
    }
}
