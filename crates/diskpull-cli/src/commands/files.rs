use anyhow::anyhow;
use diskpull_client::listing::MSG_NO_FILES;
use diskpull_client::{FileBrowser, FileListing, FilterCategory, ListingOutcome, Route};
use tracing::info;

use crate::cli::{DownloadArgs, ListArgs, OutputFormat};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::{render_downloads, render_listing};

const NOT_SIGNED_IN: &str = "not signed in; run `diskpull login` first";
const SESSION_EXPIRED: &str = "session expired; run `diskpull login` again";

pub(crate) async fn handle_ls(
    ctx: &AppContext,
    args: ListArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let (browser, outcome) = load_listing(ctx, &args.public_url, args.filter).await?;
    if outcome == ListingOutcome::Empty {
        println!("{}", browser.error_message().unwrap_or(MSG_NO_FILES));
        return Ok(());
    }
    render_listing(
        browser.public_url(),
        browser.filter(),
        browser.files().len(),
        browser.filtered(),
        format,
    )
}

pub(crate) async fn handle_download(
    ctx: &AppContext,
    args: DownloadArgs,
    format: OutputFormat,
) -> CliResult<()> {
    if args.names.is_empty() && !args.all {
        return Err(CliError::validation(
            "select files with --name or download everything with --all",
        ));
    }

    let (mut browser, outcome) = load_listing(ctx, &args.public_url, args.filter).await?;
    if outcome == ListingOutcome::Empty {
        return Err(CliError::validation(
            browser.error_message().unwrap_or(MSG_NO_FILES),
        ));
    }

    if args.all {
        browser.select_all();
    } else {
        for name in &args.names {
            let file = browser
                .filtered()
                .iter()
                .find(|file| &file.name == name)
                .cloned()
                .ok_or_else(|| {
                    CliError::validation(format!(
                        "no file named '{name}' under filter '{}'",
                        browser.filter()
                    ))
                })?;
            if file.is_dir() {
                return Err(CliError::validation(format!(
                    "'{name}' is a directory; only files can be downloaded"
                )));
            }
            if !browser.selection().contains(&file) {
                browser.toggle_selection(&file);
            }
        }
    }
    if browser.selection().is_empty() {
        return Err(CliError::validation(format!(
            "no files match filter '{}'",
            browser.filter()
        )));
    }

    let downloader = ctx.downloader(&args.dest)?;
    let selected = browser.selection().to_vec();
    info!(
        count = selected.len(),
        concurrency = downloader.concurrency(),
        "starting downloads"
    );
    let reports = downloader.download_many(&selected).await;
    render_downloads(&reports, format)?;

    let failed = reports.iter().filter(|report| !report.is_success()).count();
    if failed > 0 {
        return Err(CliError::failure(anyhow!(
            "{failed} of {} downloads failed",
            reports.len()
        )));
    }
    Ok(())
}

async fn load_listing(
    ctx: &AppContext,
    public_url: &str,
    filter: FilterCategory,
) -> CliResult<(FileBrowser, ListingOutcome)> {
    let public_url = public_url.trim();
    if public_url.is_empty() {
        return Err(CliError::validation("public URL cannot be empty"));
    }
    if ctx.gate().check().await == Route::Login {
        return Err(CliError::validation(NOT_SIGNED_IN));
    }

    let mut browser = FileBrowser::new(ctx.session.clone());
    browser.set_filter(filter);
    browser.set_public_url(public_url);
    let outcome = browser.fetch_files(&FileListing::new(ctx.api())).await;

    match outcome {
        ListingOutcome::Loaded { .. } | ListingOutcome::CacheHit { .. } | ListingOutcome::Empty => {
            Ok((browser, outcome))
        }
        ListingOutcome::SessionExpired => Err(CliError::validation(SESSION_EXPIRED)),
        ListingOutcome::LinkNotFound => Err(CliError::validation(
            browser.error_message().unwrap_or_default(),
        )),
        ListingOutcome::Failed => Err(CliError::failure(anyhow!(
            "{}",
            browser.error_message().unwrap_or_default()
        ))),
        ListingOutcome::Skipped | ListingOutcome::Stale => Err(CliError::failure(anyhow!(
            "listing did not complete ({outcome:?})"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diskpull_client::listing::{MSG_LINK_NOT_FOUND, MSG_LOAD_FAILED};
    use diskpull_client::{ClientConfig, TokenPair};
    use diskpull_test_support::fixtures::{file_entry, file_path, fresh_jwt, listing};
    use httpmock::prelude::*;
    use serde_json::json;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn signed_in(server: &MockServer, dir: &TempDir) -> AppContext {
        let base = format!("{}/disk/", server.base_url())
            .parse()
            .expect("valid URL");
        let config = ClientConfig::new(base)
            .expect("config")
            .with_token_path(dir.path().join("tokens.json"));
        let ctx = AppContext::new(config, "trace-cli").expect("context");
        ctx.session
            .store_pair(&TokenPair {
                access: fresh_jwt(),
                refresh: "R".into(),
            })
            .expect("seed tokens");
        server.mock(|when, then| {
            when.method(POST).path("/disk/refresh/");
            then.status(200).json_body(json!({"access": fresh_jwt()}));
        });
        ctx
    }

    fn list_args(filter: FilterCategory) -> ListArgs {
        ListArgs {
            public_url: "https://disk.example/d/share".into(),
            filter,
        }
    }

    fn download_args(dest: PathBuf, names: &[&str], all: bool) -> DownloadArgs {
        DownloadArgs {
            public_url: "https://disk.example/d/share".into(),
            filter: FilterCategory::All,
            names: names.iter().map(|name| (*name).to_string()).collect(),
            all,
            dest,
            concurrency: 2,
        }
    }

    fn mock_listing(server: &MockServer) {
        server.mock(|when, then| {
            when.method(GET)
                .path("/disk/files/")
                .query_param("public_url", "https://disk.example/d/share");
            then.status(200).json_body(listing(&[
                file_entry("cat.png", "image/png"),
                file_entry("report.pdf", "application/pdf"),
            ]));
        });
    }

    #[tokio::test]
    async fn ls_without_session_is_rejected_before_listing() {
        let server = MockServer::start_async().await;
        let files = server.mock(|when, then| {
            when.method(GET).path("/disk/files/");
            then.status(200).json_body(json!({"files": []}));
        });
        let dir = TempDir::new().expect("tempdir");
        let base = format!("{}/disk/", server.base_url())
            .parse()
            .expect("valid URL");
        let config = ClientConfig::new(base)
            .expect("config")
            .with_token_path(dir.path().join("tokens.json"));
        let ctx = AppContext::new(config, "trace-cli").expect("context");

        let err = handle_ls(&ctx, list_args(FilterCategory::All), OutputFormat::Table)
            .await
            .expect_err("not signed in");

        assert!(matches!(err, CliError::Validation(ref m) if m == NOT_SIGNED_IN));
        assert_eq!(files.hits(), 0);
    }

    #[tokio::test]
    async fn ls_renders_filtered_listing() {
        let server = MockServer::start_async().await;
        let dir = TempDir::new().expect("tempdir");
        let ctx = signed_in(&server, &dir);
        mock_listing(&server);

        handle_ls(&ctx, list_args(FilterCategory::Images), OutputFormat::Json)
            .await
            .expect("listing");
    }

    #[tokio::test]
    async fn ls_empty_share_prints_message() {
        let server = MockServer::start_async().await;
        let dir = TempDir::new().expect("tempdir");
        let ctx = signed_in(&server, &dir);
        server.mock(|when, then| {
            when.method(GET).path("/disk/files/");
            then.status(200).json_body(json!({"files": []}));
        });

        handle_ls(&ctx, list_args(FilterCategory::All), OutputFormat::Table)
            .await
            .expect("empty share is not an error");
    }

    #[tokio::test]
    async fn ls_maps_listing_failures() {
        let server = MockServer::start_async().await;
        let dir = TempDir::new().expect("tempdir");
        let ctx = signed_in(&server, &dir);
        let mut missing = server.mock(|when, then| {
            when.method(GET).path("/disk/files/");
            then.status(404).json_body(json!({"error": "not found"}));
        });

        let err = handle_ls(&ctx, list_args(FilterCategory::All), OutputFormat::Table)
            .await
            .expect_err("404");
        assert!(matches!(err, CliError::Validation(ref m) if m == MSG_LINK_NOT_FOUND));

        missing.delete();
        server.mock(|when, then| {
            when.method(GET).path("/disk/files/");
            then.status(500);
        });
        let err = handle_ls(&ctx, list_args(FilterCategory::All), OutputFormat::Table)
            .await
            .expect_err("500");
        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.display_message(), MSG_LOAD_FAILED);
    }

    #[tokio::test]
    async fn forbidden_listing_requires_new_login() {
        let server = MockServer::start_async().await;
        let dir = TempDir::new().expect("tempdir");
        let ctx = signed_in(&server, &dir);
        server.mock(|when, then| {
            when.method(GET).path("/disk/files/");
            then.status(401);
        });

        let err = handle_ls(&ctx, list_args(FilterCategory::All), OutputFormat::Table)
            .await
            .expect_err("401");
        assert!(matches!(err, CliError::Validation(ref m) if m == SESSION_EXPIRED));
        assert!(!dir.path().join("tokens.json").exists());
    }

    #[tokio::test]
    async fn download_named_file_writes_payload() {
        let server = MockServer::start_async().await;
        let dir = TempDir::new().expect("tempdir");
        let ctx = signed_in(&server, &dir);
        mock_listing(&server);
        let blob = server.url("/blob/cat.png");
        server.mock(|when, then| {
            when.method(GET).path("/disk/download/");
            then.status(200).json_body(json!({"redirect_url": blob}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/blob/cat.png");
            then.status(200).body("meow");
        });

        let dest = dir.path().join("out");
        handle_download(
            &ctx,
            download_args(dest.clone(), &["cat.png"], false),
            OutputFormat::Table,
        )
        .await
        .expect("download");

        assert_eq!(std::fs::read(dest.join("cat.png")).expect("read"), b"meow");
        assert!(!dest.join("report.pdf").exists());
    }

    #[tokio::test]
    async fn download_unknown_name_is_a_validation_error() {
        let server = MockServer::start_async().await;
        let dir = TempDir::new().expect("tempdir");
        let ctx = signed_in(&server, &dir);
        mock_listing(&server);

        let err = handle_download(
            &ctx,
            download_args(dir.path().join("out"), &["missing.txt"], false),
            OutputFormat::Table,
        )
        .await
        .expect_err("unknown file");
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn download_requires_a_selection_flag() {
        let server = MockServer::start_async().await;
        let dir = TempDir::new().expect("tempdir");
        let ctx = signed_in(&server, &dir);

        let err = handle_download(
            &ctx,
            download_args(dir.path().join("out"), &[], false),
            OutputFormat::Table,
        )
        .await
        .expect_err("no selection");
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn download_all_skips_directories() {
        let server = MockServer::start_async().await;
        let dir = TempDir::new().expect("tempdir");
        let ctx = signed_in(&server, &dir);
        server.mock(|when, then| {
            when.method(GET).path("/disk/files/");
            then.status(200).json_body(listing(&[
                json!({"name": "albums", "type": "dir", "path": null}),
                file_entry("cat.png", "image/png"),
            ]));
        });
        let blob = server.url("/blob/cat.png");
        let link = server.mock(|when, then| {
            when.method(GET).path("/disk/download/");
            then.status(200).json_body(json!({"redirect_url": blob}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/blob/cat.png");
            then.status(200).body("meow");
        });

        let dest = dir.path().join("out");
        handle_download(
            &ctx,
            download_args(dest.clone(), &[], true),
            OutputFormat::Table,
        )
        .await
        .expect("directories are not downloaded");
        assert_eq!(link.hits(), 1);
        assert!(dest.join("cat.png").exists());

        let err = handle_download(
            &ctx,
            download_args(dest, &["albums"], false),
            OutputFormat::Table,
        )
        .await
        .expect_err("directory by name");
        assert_eq!(err.exit_code(), 2);
        assert_eq!(link.hits(), 1);
    }

    #[tokio::test]
    async fn partial_batch_failure_exits_with_failure() {
        let server = MockServer::start_async().await;
        let dir = TempDir::new().expect("tempdir");
        let ctx = signed_in(&server, &dir);
        mock_listing(&server);
        let blob = server.url("/blob/cat.png");
        server.mock(|when, then| {
            when.method(GET)
                .path("/disk/download/")
                .query_param("download_url", file_path("cat.png", "image/png"));
            then.status(200).json_body(json!({"redirect_url": blob}));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/disk/download/")
                .query_param("download_url", file_path("report.pdf", "application/pdf"));
            then.status(502);
        });
        server.mock(|when, then| {
            when.method(GET).path("/blob/cat.png");
            then.status(200).body("meow");
        });

        let dest = dir.path().join("out");
        let err = handle_download(
            &ctx,
            download_args(dest.clone(), &[], true),
            OutputFormat::Json,
        )
        .await
        .expect_err("one download fails");

        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.display_message(), "1 of 2 downloads failed");
        assert!(dest.join("cat.png").exists());
    }
}
