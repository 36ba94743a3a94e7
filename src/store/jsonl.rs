//! Append-only JSON-lines record file.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{latest_per_id, PackageStore, StoreError};
use crate::models::PackageRecord;

#[derive(Debug)]
pub struct JsonlPackageStore {
    path: PathBuf,
    // serializes appends from concurrently finishing packages
    write_lock: Mutex<()>,
}

impl JsonlPackageStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Vec<PackageRecord>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&self.path)?);
        let mut records = Vec::new();
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(
                    "Skipping malformed record at {}:{}: {}",
                    self.path.display(),
                    number + 1,
                    e
                ),
            }
        }
        Ok(records)
    }
}

impl PackageStore for JsonlPackageStore {
    fn save(&self, record: &PackageRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string(record)?;

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StoreError::Unavailable("record file lock poisoned".to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", json)?;
        tracing::debug!("Saved record {} to {}", record.id, self.path.display());
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<PackageRecord>, StoreError> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|r| r.id == id)
            .last())
    }

    fn list(&self) -> Result<Vec<PackageRecord>, StoreError> {
        Ok(latest_per_id(self.read_all()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PackageStatus;
    use crate::store::test_support::record;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = JsonlPackageStore::new(dir.path().join("none.jsonl"));
        assert!(store.list().unwrap().is_empty());
        assert!(store.get("x").unwrap().is_none());
    }

    #[test]
    fn test_latest_line_wins() {
        let dir = tempdir().unwrap();
        let store = JsonlPackageStore::new(dir.path().join("data").join("packages.jsonl"));

        let mut first = record("p1", "emp-1", PackageStatus::Processing, 60);
        store.save(&first).unwrap();
        first.status = PackageStatus::Completed;
        first.updated_at = chrono::Utc::now();
        store.save(&first).unwrap();
        store
            .save(&record("p2", "emp-2", PackageStatus::Failed, 30))
            .unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, "p1");
        assert_eq!(listed[0].status, PackageStatus::Completed);
        assert_eq!(
            store.get("p1").unwrap().unwrap().status,
            PackageStatus::Completed
        );
        assert_eq!(store.list_by_employer("emp-2").unwrap().len(), 1);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("packages.jsonl");
        let store = JsonlPackageStore::new(&path);
        store
            .save(&record("p1", "emp-1", PackageStatus::Completed, 0))
            .unwrap();

        let mut file = fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{not json").unwrap();

        assert_eq!(store.list().unwrap().len(), 1);
    }
}
