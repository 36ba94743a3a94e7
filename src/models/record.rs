//! Persisted package record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::package::{DeliveryMethod, NumberingStyle, PackageStatus};

/// Finalized package metadata written to the local store, keyed by package id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRecord {
    pub id: String,
    pub employer_id: String,
    pub case_id: Option<String>,
    pub name: String,
    pub status: PackageStatus,
    pub visa_type: Option<String>,
    pub numbering_style: NumberingStyle,
    pub beneficiary_name: Option<String>,
    pub total_exhibits: usize,
    pub total_pages: Option<u32>,
    /// Artifact size in bytes
    pub file_size: Option<u64>,
    pub download_url: Option<String>,
    pub delivery_method: Option<DeliveryMethod>,
    pub recipient_email: Option<String>,
    pub drive_link: Option<String>,
    #[serde(default)]
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
