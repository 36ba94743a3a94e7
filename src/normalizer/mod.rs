//! Turn raw inputs into [`ExhibitItem`]s.
//!
//! Three input shapes are accepted:
//!
//! - uploaded files, filtered to an extension allow-list ([`normalize_uploads`])
//! - pasted free text containing URLs ([`extract_url_items`])
//! - picks from the remote file picker, which are only queued here and
//!   fetched later by the drive importer ([`queue_remote_picks`])

mod urls;

pub use urls::{extract_url_items, is_section_heading, label_from_url};

use std::path::{Path, PathBuf};

use crate::models::{ExhibitItem, ExhibitKind, RemoteFileDescriptor};

/// Upload filter built from the configured extension allow-list
#[derive(Debug, Clone)]
pub struct UploadFilter {
    allowed: Vec<String>,
}

impl Default for UploadFilter {
    fn default() -> Self {
        Self::new(["pdf", "jpg", "jpeg", "png"])
    }
}

impl UploadFilter {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// Kind for an accepted filename, `None` when it must be dropped
    pub fn accept(&self, filename: &str) -> Option<ExhibitKind> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())?
            .to_ascii_lowercase();

        if !self.allowed.iter().any(|a| a == &ext) {
            return None;
        }
        ExhibitKind::from_extension(&ext)
    }

    /// Normalize an in-memory upload descriptor
    pub fn normalize_upload(&self, filename: &str, size_bytes: u64) -> Option<ExhibitItem> {
        match self.accept(filename) {
            Some(kind) => Some(ExhibitItem::file(kind, filename, size_bytes)),
            None => {
                tracing::debug!("Dropping upload with unsupported extension: {}", filename);
                None
            }
        }
    }

    /// Normalize files on disk, keeping their order
    ///
    /// Rejected extensions are dropped silently; unreadable files are dropped
    /// with a warning.
    pub fn normalize_uploads<P: AsRef<Path>>(&self, paths: &[P]) -> Vec<ExhibitItem> {
        paths
            .iter()
            .filter_map(|path| self.normalize_path(path.as_ref()))
            .collect()
    }

    fn normalize_path(&self, path: &Path) -> Option<ExhibitItem> {
        let filename = path.file_name()?.to_str()?.to_string();
        let kind = match self.accept(&filename) {
            Some(kind) => kind,
            None => {
                tracing::debug!("Dropping upload with unsupported extension: {}", filename);
                return None;
            }
        };

        let metadata = match std::fs::metadata(path) {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => {
                tracing::warn!("Skipping {}: not a regular file", path.display());
                return None;
            }
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path.display(), e);
                return None;
            }
        };

        Some(ExhibitItem::file(kind, filename, metadata.len()).with_local_path(PathBuf::from(path)))
    }
}

/// Normalize files on disk with the default allow-list
pub fn normalize_uploads<P: AsRef<Path>>(paths: &[P]) -> Vec<ExhibitItem> {
    UploadFilter::default().normalize_uploads(paths)
}

/// Remote picks waiting to be fetched by the drive importer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportQueue {
    files: Vec<RemoteFileDescriptor>,
}

impl ImportQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add picks, ignoring ids already queued
    pub fn extend<I>(&mut self, picks: I)
    where
        I: IntoIterator<Item = RemoteFileDescriptor>,
    {
        for pick in picks {
            if self.files.iter().any(|f| f.id == pick.id) {
                continue;
            }
            self.files.push(pick);
        }
    }

    pub fn files(&self) -> &[RemoteFileDescriptor] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Hand the queued picks over, leaving the queue empty
    pub fn take(&mut self) -> Vec<RemoteFileDescriptor> {
        std::mem::take(&mut self.files)
    }
}

/// Queue remote picks for the drive importer
pub fn queue_remote_picks<I>(picks: I) -> ImportQueue
where
    I: IntoIterator<Item = RemoteFileDescriptor>,
{
    let mut queue = ImportQueue::new();
    queue.extend(picks);
    queue
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_allow_list_is_case_insensitive() {
        let filter = UploadFilter::default();
        assert_eq!(filter.accept("Award.PDF"), Some(ExhibitKind::Pdf));
        assert_eq!(filter.accept("photo.JpEg"), Some(ExhibitKind::Image));
        assert_eq!(filter.accept("notes.docx"), None);
        assert_eq!(filter.accept("no_extension"), None);
    }

    #[test]
    fn test_configured_allow_list_narrows() {
        let filter = UploadFilter::new([".pdf"]);
        assert_eq!(filter.accept("a.pdf"), Some(ExhibitKind::Pdf));
        assert_eq!(filter.accept("a.png"), None);
    }

    #[test]
    fn test_normalize_uploads_from_disk() {
        let dir = tempdir().unwrap();
        let pdf = dir.path().join("cv.pdf");
        let png = dir.path().join("badge.png");
        let txt = dir.path().join("notes.txt");
        fs::write(&pdf, b"%PDF-1.7 body").unwrap();
        fs::write(&png, b"\x89PNG").unwrap();
        fs::write(&txt, b"ignored").unwrap();
        let missing = dir.path().join("missing.pdf");

        let items = normalize_uploads(&[&pdf, &txt, &png, &missing]);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].kind, ExhibitKind::Pdf);
        assert_eq!(items[0].label, "cv");
        assert_eq!(items[0].size_bytes, 13);
        assert_eq!(items[0].local_path.as_deref(), Some(pdf.as_path()));
        assert_eq!(items[1].kind, ExhibitKind::Image);
    }

    #[test]
    fn test_normalize_upload_descriptor() {
        let filter = UploadFilter::default();
        let item = filter.normalize_upload("letter.jpg", 512).unwrap();
        assert_eq!(item.kind, ExhibitKind::Image);
        assert_eq!(item.size_bytes, 512);
        assert!(filter.normalize_upload("letter.gif", 512).is_none());
    }

    #[test]
    fn test_remote_picks_are_queued_not_normalized() {
        let mut queue = queue_remote_picks(vec![
            RemoteFileDescriptor::new("1", "a.pdf", "application/pdf"),
            RemoteFileDescriptor::new("2", "b.png", "image/png"),
        ]);
        queue.extend(vec![RemoteFileDescriptor::new("1", "a.pdf", "application/pdf")]);

        assert_eq!(queue.len(), 2);
        let taken = queue.take();
        assert_eq!(taken.len(), 2);
        assert!(queue.is_empty());
    }
}
