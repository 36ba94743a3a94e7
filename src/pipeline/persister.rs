//! Write finished packages to the record store.

use std::sync::Arc;

use url::Url;

use crate::models::{ExhibitPackage, PackageRecord, TerminalResult};
use crate::store::PackageStore;

/// Resolve a result URL against the service base.
///
/// Absolute URLs come back unchanged. Relative ones (`/api/...` or `api/...`)
/// are placed under the base, keeping any path prefix the base carries.
pub fn absolutize(url: &str, base: &str) -> String {
    let url = url.trim();
    if url.is_empty() || Url::parse(url).is_ok() {
        return url.to_string();
    }

    let base = format!("{}/", base.trim().trim_end_matches('/'));
    match Url::parse(&base).and_then(|b| b.join(url.trim_start_matches('/'))) {
        Ok(joined) => joined.to_string(),
        Err(e) => {
            tracing::warn!("Could not resolve {} against {}: {}", url, base, e);
            url.to_string()
        }
    }
}

/// Result with every link resolved against `base`
pub fn resolve_result(result: &TerminalResult, base: &str) -> TerminalResult {
    TerminalResult {
        download_url: result.download_url.as_deref().map(|u| absolutize(u, base)),
        delivery_url: result.delivery_url.as_deref().map(|u| absolutize(u, base)),
        drive_link: result.drive_link.as_deref().map(|u| absolutize(u, base)),
        ..result.clone()
    }
}

/// Record for a package, links resolved against `base`
pub fn record_for(package: &ExhibitPackage, base: &str) -> PackageRecord {
    let config = &package.config;
    let result = package
        .generation_job
        .as_ref()
        .and_then(|job| job.terminal_result.as_ref())
        .map(|r| resolve_result(r, base));

    PackageRecord {
        id: package.id.clone(),
        employer_id: config.employer_id.clone(),
        case_id: config.case_id.clone(),
        name: config.name.clone(),
        status: package.status,
        visa_type: config.visa_type.clone(),
        numbering_style: config.numbering_style,
        beneficiary_name: config.beneficiary_name.clone(),
        total_exhibits: package.items.len(),
        total_pages: result.as_ref().and_then(|r| r.total_pages),
        file_size: result.as_ref().and_then(|r| r.package_size_bytes),
        download_url: result
            .as_ref()
            .and_then(|r| r.delivery_url.clone().or_else(|| r.download_url.clone())),
        delivery_method: Some(config.delivery_method),
        recipient_email: config
            .recipient_email
            .clone()
            .filter(|_| config.delivery_method.requires_recipient()),
        drive_link: result.as_ref().and_then(|r| r.drive_link.clone()),
        failure_reason: package.failure.as_ref().map(|f| f.to_string()),
        created_at: package.created_at,
        updated_at: package.updated_at,
    }
}

/// Result of a persistence attempt. Never affects the package itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    Saved(PackageRecord),
    Failed(String),
}

impl PersistOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, PersistOutcome::Saved(_))
    }
}

#[derive(Debug, Clone)]
pub struct ResultPersister {
    store: Arc<dyn PackageStore>,
    base_url: String,
}

impl ResultPersister {
    pub fn new(store: Arc<dyn PackageStore>, base_url: impl Into<String>) -> Self {
        Self {
            store,
            base_url: base_url.into(),
        }
    }

    /// Best-effort write of the package record
    pub fn persist(&self, package: &ExhibitPackage) -> PersistOutcome {
        let record = record_for(package, &self.base_url);
        match self.store.save(&record) {
            Ok(()) => {
                tracing::info!("Recorded package {} as {}", record.id, record.status);
                PersistOutcome::Saved(record)
            }
            Err(e) => {
                tracing::error!("Failed to record package {}: {}", package.id, e);
                PersistOutcome::Failed(e.to_string())
            }
        }
    }
}
