//! Durable storage for finalized package records.
//!
//! [`JsonlPackageStore`] appends one JSON record per line; the newest line for
//! a package id wins on read. [`MemoryPackageStore`] keeps records in memory
//! and can be told to fail writes.

mod jsonl;
mod memory;

pub use jsonl::JsonlPackageStore;
pub use memory::MemoryPackageStore;

use crate::models::PackageRecord;

/// Record store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Where package records are kept
pub trait PackageStore: Send + Sync + std::fmt::Debug {
    /// Insert or replace the record with the same id
    fn save(&self, record: &PackageRecord) -> Result<(), StoreError>;

    fn get(&self, id: &str) -> Result<Option<PackageRecord>, StoreError>;

    /// All records, most recently updated first
    fn list(&self) -> Result<Vec<PackageRecord>, StoreError>;

    fn list_by_employer(&self, employer_id: &str) -> Result<Vec<PackageRecord>, StoreError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|r| r.employer_id == employer_id)
            .collect())
    }
}

/// Keep the newest version of each record and order by `updated_at`, newest first
pub(crate) fn latest_per_id(records: Vec<PackageRecord>) -> Vec<PackageRecord> {
    let mut latest: Vec<PackageRecord> = Vec::new();
    for record in records {
        match latest.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => latest.push(record),
        }
    }
    latest.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    latest
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{Duration, Utc};

    use crate::models::{NumberingStyle, PackageRecord, PackageStatus};

    pub fn record(id: &str, employer: &str, status: PackageStatus, age_secs: i64) -> PackageRecord {
        let at = Utc::now() - Duration::seconds(age_secs);
        PackageRecord {
            id: id.to_string(),
            employer_id: employer.to_string(),
            case_id: None,
            name: format!("package {}", id),
            status,
            visa_type: Some("O-1A".to_string()),
            numbering_style: NumberingStyle::Letters,
            beneficiary_name: None,
            total_exhibits: 3,
            total_pages: None,
            file_size: None,
            download_url: None,
            delivery_method: None,
            recipient_email: None,
            drive_link: None,
            failure_reason: None,
            created_at: at,
            updated_at: at,
        }
    }
}
