//! In-memory record store.

use std::sync::Mutex;

use super::{latest_per_id, PackageStore, StoreError};
use crate::models::PackageRecord;

#[derive(Debug, Default)]
pub struct MemoryPackageStore {
    records: Mutex<Vec<PackageRecord>>,
    failure: Mutex<Option<String>>,
}

impl MemoryPackageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following write fail with the given reason
    pub fn fail_writes(&self, reason: impl Into<String>) {
        *self.failure.lock().unwrap_or_else(|e| e.into_inner()) = Some(reason.into());
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PackageStore for MemoryPackageStore {
    fn save(&self, record: &PackageRecord) -> Result<(), StoreError> {
        if let Some(reason) = self
            .failure
            .lock()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?
            .clone()
        {
            return Err(StoreError::Unavailable(reason));
        }

        let mut records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<PackageRecord>, StoreError> {
        let records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    fn list(&self) -> Result<Vec<PackageRecord>, StoreError> {
        let records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(latest_per_id(records.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PackageStatus;
    use crate::store::test_support::record;

    #[test]
    fn test_save_replaces_by_id() {
        let store = MemoryPackageStore::new();
        let mut r = record("p1", "emp-1", PackageStatus::Processing, 0);
        store.save(&r).unwrap();
        r.status = PackageStatus::TimedOut;
        store.save(&r).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get("p1").unwrap().unwrap().status,
            PackageStatus::TimedOut
        );
    }

    #[test]
    fn test_failing_writes() {
        let store = MemoryPackageStore::new();
        store.fail_writes("disk full");
        let err = store
            .save(&record("p1", "emp-1", PackageStatus::Completed, 0))
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(reason) if reason == "disk full"));
        assert!(store.is_empty());
    }
}
