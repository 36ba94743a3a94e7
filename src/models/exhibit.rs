//! Exhibit item model: one evidentiary unit inside a package.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Kind of evidence an exhibit carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExhibitKind {
    Pdf,
    Image,
    Url,
}

impl ExhibitKind {
    /// Wire name used in the generation payload
    pub fn as_str(&self) -> &'static str {
        match self {
            ExhibitKind::Pdf => "pdf",
            ExhibitKind::Image => "image",
            ExhibitKind::Url => "url",
        }
    }

    /// Map a file extension to a kind, `None` for anything outside the allow-list
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(ExhibitKind::Pdf),
            "jpg" | "jpeg" | "png" => Some(ExhibitKind::Image),
            _ => None,
        }
    }

    /// Map a MIME type to a file kind
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.to_ascii_lowercase();
        if mime == "application/pdf" || mime == "pdf" {
            Some(ExhibitKind::Pdf)
        } else if mime.starts_with("image/") || mime == "image" {
            Some(ExhibitKind::Image)
        } else {
            None
        }
    }

    /// Rank used by sort-by-kind
    pub(crate) fn sort_rank(&self) -> u8 {
        match self {
            ExhibitKind::Pdf => 0,
            ExhibitKind::Image => 1,
            ExhibitKind::Url => 2,
        }
    }
}

impl std::fmt::Display for ExhibitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExhibitKind::Pdf => "PDF",
            ExhibitKind::Image => "Image",
            ExhibitKind::Url => "URL",
        };
        write!(f, "{}", name)
    }
}

/// Where an exhibit comes from. Exactly one origin exists per item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "lowercase")]
pub enum ExhibitSource {
    File { filename: String },
    Url { url: String },
}

/// A single exhibit in a package
///
/// Ordering lives in the containing list; the `id` carries no ordering meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExhibitItem {
    /// Locally generated unique identifier
    pub id: String,

    /// Kind of evidence
    pub kind: ExhibitKind,

    /// Human-readable caption
    pub label: String,

    /// Origin reference
    pub source: ExhibitSource,

    /// Size of the binary content (0 for URL items)
    pub size_bytes: u64,

    /// Content already resides on the generation service
    #[serde(default)]
    pub imported_from_remote_drive: bool,

    /// Local file whose bytes are uploaded at submission time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
}

impl ExhibitItem {
    /// Create a file-backed exhibit. `kind` must not be [`ExhibitKind::Url`].
    pub fn file(kind: ExhibitKind, filename: impl Into<String>, size_bytes: u64) -> Self {
        debug_assert!(kind != ExhibitKind::Url, "file exhibits cannot be URLs");
        let filename = filename.into();
        Self {
            id: new_id(),
            kind,
            label: label_from_filename(&filename),
            source: ExhibitSource::File { filename },
            size_bytes,
            imported_from_remote_drive: false,
            local_path: None,
        }
    }

    /// Create a URL exhibit with the given caption
    pub fn url(url: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            kind: ExhibitKind::Url,
            label: label.into(),
            source: ExhibitSource::Url { url: url.into() },
            size_bytes: 0,
            imported_from_remote_drive: false,
            local_path: None,
        }
    }

    /// Attach the local path the binary content is read from
    pub fn with_local_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_path = Some(path.into());
        self
    }

    /// Mark the content as already held by the generation service
    pub fn imported_from_drive(mut self) -> Self {
        self.imported_from_remote_drive = true;
        self.local_path = None;
        self
    }

    /// Override the default caption
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn source_filename(&self) -> Option<&str> {
        match &self.source {
            ExhibitSource::File { filename } => Some(filename),
            ExhibitSource::Url { .. } => None,
        }
    }

    pub fn source_url(&self) -> Option<&str> {
        match &self.source {
            ExhibitSource::Url { url } => Some(url),
            ExhibitSource::File { .. } => None,
        }
    }

    /// Whether the submission must carry this item's bytes
    pub fn needs_upload(&self) -> bool {
        self.kind != ExhibitKind::Url && !self.imported_from_remote_drive
    }
}

/// Generate a fresh exhibit identifier
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Default caption for a file: its name without the extension
pub fn label_from_filename(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| filename.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(ExhibitKind::from_extension("PDF"), Some(ExhibitKind::Pdf));
        assert_eq!(ExhibitKind::from_extension("jpeg"), Some(ExhibitKind::Image));
        assert_eq!(ExhibitKind::from_extension("png"), Some(ExhibitKind::Image));
        assert_eq!(ExhibitKind::from_extension("docx"), None);
    }

    #[test]
    fn test_file_item_defaults() {
        let item = ExhibitItem::file(ExhibitKind::Pdf, "award_letter.pdf", 1024);
        assert_eq!(item.label, "award_letter");
        assert_eq!(item.source_filename(), Some("award_letter.pdf"));
        assert_eq!(item.source_url(), None);
        assert!(item.needs_upload());
    }

    #[test]
    fn test_url_item_has_no_size_and_no_upload() {
        let item = ExhibitItem::url("https://example.com/a.pdf", "Article");
        assert_eq!(item.size_bytes, 0);
        assert_eq!(item.source_filename(), None);
        assert!(!item.needs_upload());
    }

    #[test]
    fn test_drive_item_skips_upload() {
        let item = ExhibitItem::file(ExhibitKind::Image, "scan.png", 10)
            .with_local_path("/tmp/scan.png")
            .imported_from_drive();
        assert!(!item.needs_upload());
        assert!(item.local_path.is_none());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = ExhibitItem::url("https://a.example", "a");
        let b = ExhibitItem::url("https://a.example", "a");
        assert_ne!(a.id, b.id);
    }
}
