//! Content-type categories, filtered views, and the selection set.
//!
//! # Design
//! - Categorisation is a pure function of the entry's `path`; nothing is cached.
//! - Entries with no recognisable content type only appear under [`FilterCategory::All`].
//! - The selection keeps entries hidden by the current filter.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::RemoteFile;

/// Content types listed under "images".
pub const IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/heic",
];

/// Content types listed under "videos".
pub const VIDEO_TYPES: &[&str] = &["video/mp4", "video/mpeg"];

/// Content types listed under "documents".
pub const DOCUMENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

static CONTENT_TYPE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new("content_type=([^&]+)").ok());

/// Category an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileCategory {
    /// Allowlisted image type.
    Image,
    /// Allowlisted video type.
    Video,
    /// Allowlisted document type.
    Document,
    /// Anything else, including a missing content type.
    Other,
}

/// Filter chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterCategory {
    /// Every entry.
    #[default]
    All,
    /// Images only.
    Images,
    /// Videos only.
    Videos,
    /// Documents only.
    Documents,
}

impl FilterCategory {
    /// Every filter, in display order.
    pub const VALUES: [Self; 4] = [Self::All, Self::Images, Self::Videos, Self::Documents];

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Images => "images",
            Self::Videos => "videos",
            Self::Documents => "documents",
        }
    }

    /// Whether an entry of `category` passes this filter.
    #[must_use]
    pub const fn admits(self, category: FileCategory) -> bool {
        matches!(
            (self, category),
            (Self::All, _)
                | (Self::Images, FileCategory::Image)
                | (Self::Videos, FileCategory::Video)
                | (Self::Documents, FileCategory::Document)
        )
    }

    /// Entries of `files` that pass this filter, in order.
    #[must_use]
    pub fn apply(self, files: &[RemoteFile]) -> Vec<RemoteFile> {
        files
            .iter()
            .filter(|file| self.admits(categorize(file)))
            .cloned()
            .collect()
    }
}

impl fmt::Display for FilterCategory {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for FilterCategory {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "images" => Ok(Self::Images),
            "videos" => Ok(Self::Videos),
            "documents" => Ok(Self::Documents),
            other => Err(format!(
                "unknown filter '{other}' (expected all, images, videos, or documents)"
            )),
        }
    }
}

/// Percent-decoded `content_type` query value embedded in `path`.
#[must_use]
pub fn content_type(path: &str) -> Option<String> {
    let pattern = CONTENT_TYPE.as_ref()?;
    let raw = pattern.captures(path)?.get(1)?.as_str();
    urlencoding::decode(raw).ok().map(Cow::into_owned)
}

/// Category of an entry, derived from its embedded content type.
#[must_use]
pub fn categorize(file: &RemoteFile) -> FileCategory {
    let Some(content_type) = content_type(&file.path) else {
        return FileCategory::Other;
    };
    let content_type = content_type.as_str();
    if IMAGE_TYPES.contains(&content_type) {
        FileCategory::Image
    } else if VIDEO_TYPES.contains(&content_type) {
        FileCategory::Video
    } else if DOCUMENT_TYPES.contains(&content_type) {
        FileCategory::Document
    } else {
        FileCategory::Other
    }
}

/// Entries the user picked, tested by value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    items: Vec<RemoteFile>,
}

impl Selection {
    /// Empty selection.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Add `file` if absent, remove it if present. Returns whether it is now selected.
    pub fn toggle(&mut self, file: &RemoteFile) -> bool {
        if let Some(index) = self.items.iter().position(|item| item == file) {
            self.items.remove(index);
            false
        } else {
            self.items.push(file.clone());
            true
        }
    }

    /// Whether `file` is selected.
    #[must_use]
    pub fn contains(&self, file: &RemoteFile) -> bool {
        self.items.contains(file)
    }

    /// Replace the selection with the downloadable entries of `files`.
    ///
    /// Directories have no payload and are skipped.
    pub fn select_all(&mut self, files: &[RemoteFile]) {
        self.items = files.iter().filter(|file| !file.is_dir()).cloned().collect();
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Number of selected entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is selected.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Selected entries in selection order.
    pub fn iter(&self) -> impl Iterator<Item = &RemoteFile> {
        self.items.iter()
    }

    /// Owned copy of the selected entries.
    #[must_use]
    pub fn to_vec(&self) -> Vec<RemoteFile> {
        self.items.clone()
    }
}

impl<'a> IntoIterator for &'a Selection {
    type Item = &'a RemoteFile;
    type IntoIter = std::slice::Iter<'a, RemoteFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// How an entry is presented in listings, by file-name extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayKind {
    /// Folder.
    Directory,
    /// `jpg`, `jpeg`, `png`, `gif`.
    Image,
    /// `mp4`, `avi`, `mov`.
    Video,
    /// `pdf`, `docx`, `doc`.
    Document,
    /// `zip`, `rar`, `7z`.
    Archive,
    /// Anything else.
    Generic,
}

impl DisplayKind {
    /// Kind of `file`. Extensions are matched case-sensitively.
    #[must_use]
    pub fn of(file: &RemoteFile) -> Self {
        if file.is_dir() {
            return Self::Directory;
        }
        let extension = file.name.rsplit_once('.').map_or("", |(_, ext)| ext);
        match extension {
            "jpg" | "jpeg" | "png" | "gif" => Self::Image,
            "mp4" | "avi" | "mov" => Self::Video,
            "pdf" | "docx" | "doc" => Self::Document,
            "zip" | "rar" | "7z" => Self::Archive,
            _ => Self::Generic,
        }
    }

    /// Short label for table output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Directory => "dir",
            Self::Image => "image",
            Self::Video => "video",
            Self::Document => "document",
            Self::Archive => "archive",
            Self::Generic => "file",
        }
    }

    /// Glyph shown next to the entry.
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Directory => "📁",
            Self::Image => "🖼",
            Self::Video => "🎦",
            Self::Document => "📄",
            Self::Archive => "🗜",
            Self::Generic => "📎",
        }
    }
}
