//! Output renderers and formatting helpers for CLI commands.

use std::path::Path;

use anyhow::anyhow;
use diskpull_client::filter::{categorize, content_type};
use diskpull_client::{DisplayKind, DownloadReport, FileCategory, FilterCategory, RemoteFile, Route};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

#[derive(Debug, Serialize)]
pub(crate) struct ListingView<'a> {
    pub(crate) public_url: &'a str,
    pub(crate) filter: &'static str,
    pub(crate) total: usize,
    pub(crate) files: Vec<FileView<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct FileView<'a> {
    pub(crate) name: &'a str,
    pub(crate) kind: &'static str,
    pub(crate) category: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) content_type: Option<String>,
    pub(crate) path: &'a str,
}

impl<'a> FileView<'a> {
    pub(crate) fn new(file: &'a RemoteFile) -> Self {
        Self {
            name: &file.name,
            kind: DisplayKind::of(file).label(),
            category: category_label(categorize(file)),
            content_type: content_type(&file.path),
            path: &file.path,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionView<'a> {
    pub(crate) route: &'static str,
    pub(crate) authenticated: bool,
    pub(crate) token_file: &'a Path,
}

#[derive(Debug, Serialize)]
pub(crate) struct DownloadView<'a> {
    pub(crate) name: &'a str,
    pub(crate) status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) path: Option<&'a Path>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
}

impl<'a> DownloadView<'a> {
    pub(crate) fn new(report: &'a DownloadReport) -> Self {
        match &report.result {
            Ok(saved) => Self {
                name: &report.file.name,
                status: "saved",
                path: Some(&saved.path),
                bytes: Some(saved.bytes),
                error: None,
            },
            Err(err) => Self {
                name: &report.file.name,
                status: "failed",
                path: None,
                bytes: None,
                error: Some(error_chain(err)),
            },
        }
    }
}

const fn category_label(category: FileCategory) -> &'static str {
    match category {
        FileCategory::Image => "image",
        FileCategory::Video => "video",
        FileCategory::Document => "document",
        FileCategory::Other => "other",
    }
}

/// Join an error with its sources, outermost first.
pub(crate) fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(inner) = source {
        parts.push(inner.to_string());
        source = inner.source();
    }
    parts.join(": ")
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

pub(crate) fn render_listing(
    public_url: &str,
    filter: FilterCategory,
    total: usize,
    files: &[RemoteFile],
    format: OutputFormat,
) -> CliResult<()> {
    let view = ListingView {
        public_url,
        filter: filter.as_str(),
        total,
        files: files.iter().map(FileView::new).collect(),
    };
    match format {
        OutputFormat::Json => print_json(&view)?,
        OutputFormat::Table => {
            println!("{:<2} {:<9} {:<9} NAME", "", "KIND", "CATEGORY");
            for (file, entry) in files.iter().zip(&view.files) {
                println!(
                    "{:<2} {:<9} {:<9} {}",
                    DisplayKind::of(file).icon(),
                    entry.kind,
                    entry.category,
                    entry.name
                );
            }
            println!("{} of {} shown (filter: {})", view.files.len(), total, filter);
        }
    }
    Ok(())
}

pub(crate) fn render_session(
    route: Route,
    authenticated: bool,
    token_file: &Path,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&SessionView {
            route: route.path(),
            authenticated,
            token_file,
        })?,
        OutputFormat::Table => {
            println!("route: {route}");
            println!("authenticated: {authenticated}");
            println!("token file: {}", token_file.display());
        }
    }
    Ok(())
}

pub(crate) fn render_downloads(reports: &[DownloadReport], format: OutputFormat) -> CliResult<()> {
    let views: Vec<DownloadView<'_>> = reports.iter().map(DownloadView::new).collect();
    match format {
        OutputFormat::Json => print_json(&views)?,
        OutputFormat::Table => {
            println!("{:<7} {:>12} NAME", "STATUS", "SIZE");
            for view in &views {
                let size = view.bytes.map_or_else(|| "-".to_string(), format_bytes);
                println!("{:<7} {:>12} {}", view.status, size, view.name);
                if let Some(path) = view.path {
                    println!("        -> {}", path.display());
                }
                if let Some(error) = &view.error {
                    println!("        !! {error}");
                }
            }
        }
    }
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} {}", UNITS[unit])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
