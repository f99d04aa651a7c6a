//! Argument parsing, logging setup, and command dispatch.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use diskpull_client::config::{DEFAULT_DOWNLOAD_CONCURRENCY, DEFAULT_TIMEOUT_SECS};
use diskpull_client::{ClientConfig, DEFAULT_API_URL, FilterCategory};
use diskpull_telemetry::{
    DEFAULT_LOG_LEVEL, GlobalContextGuard, LogFormat, LoggingConfig, init_logging, record_command,
};
use url::Url;
use uuid::Uuid;

use crate::client::{AppContext, CliError, CliResult, parse_url};
use crate::commands::auth::{handle_login, handle_logout, handle_register, handle_session};
use crate::commands::files::{handle_download, handle_ls};

/// Parses CLI arguments, executes the requested command, and returns the process
/// exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let trace_id = Uuid::new_v4().to_string();

    let logging = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format.map_or_else(LogFormat::infer, LogFormat::from),
        build_sha: env!("CARGO_PKG_VERSION"),
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("warning: {err:#}");
    }
    let _context = GlobalContextGuard::new(trace_id.clone());
    record_command(command_label(&cli.command));

    match dispatch(cli, &trace_id).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

pub(crate) async fn dispatch(cli: Cli, trace_id: &str) -> CliResult<()> {
    let config = build_config(&cli)?;
    let ctx = AppContext::new(config, trace_id)?;

    match cli.command {
        Command::Login(args) => handle_login(&ctx, args).await,
        Command::Register(args) => handle_register(&ctx, args).await,
        Command::Logout => handle_logout(&ctx).await,
        Command::Session => handle_session(&ctx, cli.output).await,
        Command::Ls(args) => handle_ls(&ctx, args, cli.output).await,
        Command::Download(args) => handle_download(&ctx, args, cli.output).await,
    }
}

pub(crate) fn build_config(cli: &Cli) -> CliResult<ClientConfig> {
    let mut config = ClientConfig::new(cli.api_url.clone())
        .and_then(|config| config.with_timeout_secs(cli.timeout))
        .map_err(|_| CliError::validation("--timeout must be greater than zero"))?;
    if let Command::Download(args) = &cli.command {
        config = config
            .with_download_concurrency(args.concurrency)
            .map_err(|_| CliError::validation("--concurrency must be between 1 and 32"))?;
    }
    if let Some(path) = &cli.token_file {
        config = config.with_token_path(path);
    }
    Ok(config)
}

#[derive(Parser)]
#[command(
    name = "diskpull",
    about = "Browse and download files behind public share links"
)]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "DISKPULL_API_URL",
        value_parser = parse_url,
        default_value = DEFAULT_API_URL
    )]
    pub(crate) api_url: Url,
    #[arg(
        long,
        global = true,
        env = "DISKPULL_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    pub(crate) timeout: u64,
    #[arg(
        long,
        global = true,
        env = "DISKPULL_TOKEN_FILE",
        help = "Where tokens are persisted between invocations"
    )]
    pub(crate) token_file: Option<PathBuf>,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) output: OutputFormat,
    #[arg(
        long,
        global = true,
        env = "DISKPULL_LOG_LEVEL",
        default_value = DEFAULT_LOG_LEVEL,
        help = "Log filter used when RUST_LOG is unset"
    )]
    pub(crate) log_level: String,
    #[arg(long, global = true, value_enum)]
    pub(crate) log_format: Option<LogFormatArg>,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Sign in and store the issued tokens.
    Login(LoginArgs),
    /// Create an account and store the issued tokens.
    Register(RegisterArgs),
    /// Revoke the session and forget the stored tokens.
    Logout,
    /// Revalidate the stored session and report where it lands.
    Session,
    /// List the files behind a share link.
    Ls(ListArgs),
    /// Download files behind a share link.
    Download(DownloadArgs),
}

#[derive(Args)]
pub(crate) struct LoginArgs {
    #[arg(long, short = 'u', env = "DISKPULL_USERNAME")]
    pub(crate) username: String,
    #[arg(
        long,
        env = "DISKPULL_PASSWORD",
        hide_env_values = true,
        help = "Prompted for when omitted on an interactive terminal"
    )]
    pub(crate) password: Option<String>,
}

#[derive(Args)]
pub(crate) struct RegisterArgs {
    #[arg(long, short = 'u', env = "DISKPULL_USERNAME")]
    pub(crate) username: String,
    #[arg(long, short = 'e')]
    pub(crate) email: String,
    #[arg(
        long,
        env = "DISKPULL_PASSWORD",
        hide_env_values = true,
        help = "Prompted for when omitted on an interactive terminal"
    )]
    pub(crate) password: Option<String>,
}

#[derive(Args)]
pub(crate) struct ListArgs {
    #[arg(help = "Public share link")]
    pub(crate) public_url: String,
    #[arg(long, value_parser = parse_filter, default_value = "all")]
    pub(crate) filter: FilterCategory,
}

#[derive(Args)]
pub(crate) struct DownloadArgs {
    #[arg(help = "Public share link")]
    pub(crate) public_url: String,
    #[arg(long, value_parser = parse_filter, default_value = "all")]
    pub(crate) filter: FilterCategory,
    #[arg(
        long = "name",
        short = 'n',
        help = "File to download; repeat to select several"
    )]
    pub(crate) names: Vec<String>,
    #[arg(
        long,
        conflicts_with = "names",
        help = "Download every file visible under the filter"
    )]
    pub(crate) all: bool,
    #[arg(long, default_value = ".", help = "Destination directory")]
    pub(crate) dest: PathBuf,
    #[arg(long, default_value_t = DEFAULT_DOWNLOAD_CONCURRENCY)]
    pub(crate) concurrency: usize,
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub(crate) enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Pretty => Self::Pretty,
            LogFormatArg::Json => Self::Json,
        }
    }
}

fn parse_filter(input: &str) -> Result<FilterCategory, String> {
    input.parse()
}

pub(crate) const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Login(_) => "login",
        Command::Register(_) => "register",
        Command::Logout => "logout",
        Command::Session => "session",
        Command::Ls(_) => "ls",
        Command::Download(_) => "download",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn parses_download_with_globals_after_subcommand() {
        let cli = Cli::try_parse_from([
            "diskpull",
            "download",
            "https://disk.example/d/abc",
            "--filter",
            "images",
            "-n",
            "a.png",
            "-n",
            "b.png",
            "--api-url",
            "http://backend:8000/disk",
            "--timeout",
            "30",
        ])
        .expect("valid arguments");

        assert_eq!(cli.api_url.as_str(), "http://backend:8000/disk/");
        assert_eq!(command_label(&cli.command), "download");
        let Command::Download(args) = &cli.command else {
            panic!("expected download command");
        };
        assert_eq!(args.filter, FilterCategory::Images);
        assert_eq!(args.names, vec!["a.png", "b.png"]);
        assert_eq!(args.concurrency, DEFAULT_DOWNLOAD_CONCURRENCY);

        let config = build_config(&cli).expect("config");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn rejects_unknown_filter_and_conflicting_selection() {
        assert!(Cli::try_parse_from(["diskpull", "ls", "u", "--filter", "music"]).is_err());
        assert!(
            Cli::try_parse_from(["diskpull", "download", "u", "--all", "-n", "a.png"]).is_err()
        );
    }

    #[test]
    fn invalid_numeric_settings_are_validation_errors() {
        let cli = Cli::try_parse_from(["diskpull", "session", "--timeout", "0"]).expect("parse");
        assert!(matches!(build_config(&cli), Err(CliError::Validation(_))));

        let cli = Cli::try_parse_from(["diskpull", "download", "u", "--all", "--concurrency", "0"])
            .expect("parse");
        assert!(matches!(build_config(&cli), Err(CliError::Validation(_))));
    }

    #[test]
    fn token_file_overrides_default_location() {
        let cli = Cli::try_parse_from(["diskpull", "logout", "--token-file", "/tmp/t.json"])
            .expect("parse");
        let config = build_config(&cli).expect("config");
        assert_eq!(config.token_path, PathBuf::from("/tmp/t.json"));
    }
}
