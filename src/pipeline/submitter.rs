//! Validate a draft package and hand it to the generation service.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::LimitsConfig;
use crate::models::{DeliveryMethod, ExhibitPackage, PackageError, PackageStatus};
use crate::sequencer::number_at;
use crate::service::{
    ExhibitManifestEntry, FilePart, GenerationService, ServiceError, Submission, SubmissionConfig,
};
use crate::utils::{sanitize_filename, validate_email, validate_url};

/// Local checks that fail before anything is sent
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("only draft packages can be submitted (package is {0})")]
    NotDraft(PackageStatus),

    #[error("package has no exhibits")]
    NoExhibits,

    #[error("package name is required")]
    MissingName,

    #[error("employer is required")]
    MissingEmployer,

    #[error("{} delivery requires a recipient email", .0.as_str())]
    MissingRecipient(DeliveryMethod),

    #[error("invalid recipient email: {0}")]
    InvalidRecipient(String),

    #[error("requested duration of {requested} years exceeds the maximum of {max}")]
    DurationTooLong { requested: u32, max: u32 },

    #[error("exhibit \"{label}\" has an unusable URL: {reason}")]
    InvalidUrl { label: String, reason: String },

    #[error("exhibit \"{0}\" has no local file to upload")]
    MissingContent(String),

    #[error("exhibit \"{label}\" has an unusable filename: {reason}")]
    InvalidFilename { label: String, reason: String },
}

/// Submission failures
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to submit package: {0}")]
    Service(#[from] ServiceError),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Package(#[from] PackageError),
}

/// Check a package locally. Nothing here touches the network.
pub fn validate(package: &ExhibitPackage, limits: &LimitsConfig) -> Result<(), ValidationError> {
    if package.status != PackageStatus::Draft {
        return Err(ValidationError::NotDraft(package.status));
    }

    if package.items.is_empty() {
        return Err(ValidationError::NoExhibits);
    }

    let config = &package.config;
    if config.name.trim().is_empty() {
        return Err(ValidationError::MissingName);
    }
    if config.employer_id.trim().is_empty() {
        return Err(ValidationError::MissingEmployer);
    }

    if config.delivery_method.requires_recipient() {
        let recipient = config.recipient_email.as_deref().unwrap_or("").trim();
        if recipient.is_empty() {
            return Err(ValidationError::MissingRecipient(config.delivery_method));
        }
        validate_email(recipient)
            .map_err(|_| ValidationError::InvalidRecipient(recipient.to_string()))?;
    }

    if let Some(requested) = config.requested_duration_years {
        if requested > limits.max_visa_duration_years {
            return Err(ValidationError::DurationTooLong {
                requested,
                max: limits.max_visa_duration_years,
            });
        }
    }

    for item in &package.items {
        if let Some(url) = item.source_url() {
            validate_url(url).map_err(|e| ValidationError::InvalidUrl {
                label: item.label.clone(),
                reason: e.to_string(),
            })?;
        }
        if item.needs_upload() && item.local_path.is_none() {
            return Err(ValidationError::MissingContent(item.label.clone()));
        }
    }

    Ok(())
}

/// Build the multipart payload: config, manifest in list order, and file bytes
pub async fn build_submission(package: &ExhibitPackage) -> Result<Submission, SubmitError> {
    let config = &package.config;
    let submission_config = SubmissionConfig {
        package_id: package.id.clone(),
        name: config.name.trim().to_string(),
        numbering_style: config.numbering_style.as_str().to_string(),
        delivery_method: config.delivery_method.as_str().to_string(),
        recipient_email: config
            .recipient_email
            .as_ref()
            .filter(|_| config.delivery_method.requires_recipient())
            .map(|e| e.trim().to_string()),
        visa_type: config.visa_type.clone(),
        beneficiary_name: config.beneficiary_name.clone(),
        case_id: config.case_id.clone(),
    };

    let mut exhibits = Vec::with_capacity(package.items.len());
    let mut files = Vec::new();
    // server-side drive files keep their names; local parts must not shadow them
    let mut used_names: HashSet<String> = package
        .items
        .iter()
        .filter(|item| item.imported_from_remote_drive)
        .filter_map(|item| item.source_filename().map(|name| name.to_string()))
        .collect();

    for (order, item) in package.items.iter().enumerate() {
        let filename = match item.source_filename() {
            Some(name) if item.imported_from_remote_drive => Some(name.to_string()),
            Some(name) => {
                let clean = sanitize_filename(name).map_err(|e| ValidationError::InvalidFilename {
                    label: item.label.clone(),
                    reason: e.to_string(),
                })?;
                // the service matches parts to entries by filename
                let unique = unique_part_name(&used_names, clean, order + 1);
                used_names.insert(unique.clone());
                Some(unique)
            }
            None => None,
        };

        if item.needs_upload() {
            let path = item
                .local_path
                .clone()
                .ok_or_else(|| ValidationError::MissingContent(item.label.clone()))?;
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|source| SubmitError::Io {
                    path: path.clone(),
                    source,
                })?;
            let part_name = filename.clone().unwrap_or_else(|| item.id.clone());
            let content_type = mime_guess::from_path(&part_name)
                .first_or_octet_stream()
                .to_string();
            files.push(FilePart {
                filename: part_name,
                content_type,
                bytes,
            });
        }

        exhibits.push(ExhibitManifestEntry {
            order,
            number: number_at(order, config.numbering_style),
            label: item.label.clone(),
            kind: item.kind,
            filename,
            url: item.source_url().map(|u| u.to_string()),
            imported_from_drive: item.imported_from_remote_drive,
        });
    }

    Ok(Submission {
        config: submission_config,
        exhibits,
        files,
    })
}

/// `clean` itself when unused, else `{position}_{clean}`, then `{position}_{n}_{clean}`
fn unique_part_name(used: &HashSet<String>, clean: String, position: usize) -> String {
    if !used.contains(&clean) {
        return clean;
    }
    let prefixed = format!("{}_{}", position, clean);
    if !used.contains(&prefixed) {
        return prefixed;
    }
    (2..)
        .map(|n| format!("{}_{}_{}", position, n, clean))
        .find(|candidate| !used.contains(candidate))
        .unwrap_or(prefixed)
}

/// Sends draft packages to the generation service
#[derive(Debug, Clone)]
pub struct JobSubmitter {
    service: Arc<dyn GenerationService>,
    limits: LimitsConfig,
}

impl JobSubmitter {
    pub fn new(service: Arc<dyn GenerationService>, limits: LimitsConfig) -> Self {
        Self { service, limits }
    }

    /// Validate, build, and submit. On success the package is Processing with
    /// its job attached; on failure it stays Draft.
    pub async fn submit(&self, package: &mut ExhibitPackage) -> Result<String, SubmitError> {
        validate(package, &self.limits)?;
        let submission = build_submission(package).await?;

        tracing::info!(
            "Submitting package {} ({} exhibits)",
            package.id,
            submission.exhibits.len()
        );

        let ticket = self.service.generate(submission).await.map_err(|e| {
            tracing::warn!("Submission of package {} failed: {}", package.id, e);
            e
        })?;

        package.attach_job(ticket.job_id.clone())?;
        package.mark_processing()?;
        tracing::info!("Package {} accepted as job {}", package.id, ticket.job_id);

        Ok(ticket.job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExhibitItem, ExhibitKind, NumberingStyle, PackageConfig};
    use crate::service::MockGenerationService;
    use tempfile::tempdir;

    fn limits() -> LimitsConfig {
        LimitsConfig::default()
    }

    fn url_package(config: PackageConfig) -> ExhibitPackage {
        ExhibitPackage::new(
            config,
            vec![ExhibitItem::url("https://example.com/award", "Award")],
        )
    }

    #[test]
    fn test_email_delivery_requires_recipient() {
        let package = url_package(
            PackageConfig::new("Petition", "emp-1").delivery(DeliveryMethod::Email, Some("  ".into())),
        );
        assert_eq!(
            validate(&package, &limits()),
            Err(ValidationError::MissingRecipient(DeliveryMethod::Email))
        );

        let package = url_package(
            PackageConfig::new("Petition", "emp-1")
                .delivery(DeliveryMethod::Drive, Some("not-an-email".into())),
        );
        assert!(matches!(
            validate(&package, &limits()),
            Err(ValidationError::InvalidRecipient(_))
        ));
    }

    #[test]
    fn test_basic_rules() {
        let empty = ExhibitPackage::new(PackageConfig::new("Petition", "emp-1"), vec![]);
        assert_eq!(validate(&empty, &limits()), Err(ValidationError::NoExhibits));

        let unnamed = url_package(PackageConfig::new(" ", "emp-1"));
        assert_eq!(validate(&unnamed, &limits()), Err(ValidationError::MissingName));

        let no_employer = url_package(PackageConfig::new("Petition", ""));
        assert_eq!(
            validate(&no_employer, &limits()),
            Err(ValidationError::MissingEmployer)
        );

        let ok = url_package(PackageConfig::new("Petition", "emp-1"));
        assert_eq!(validate(&ok, &limits()), Ok(()));
    }

    #[test]
    fn test_duration_limit() {
        let mut config = PackageConfig::new("Petition", "emp-1");
        config.requested_duration_years = Some(4);
        let package = url_package(config);
        assert_eq!(
            validate(&package, &limits()),
            Err(ValidationError::DurationTooLong {
                requested: 4,
                max: 3
            })
        );
    }

    #[test]
    fn test_private_url_rejected() {
        let package = ExhibitPackage::new(
            PackageConfig::new("Petition", "emp-1"),
            vec![ExhibitItem::url("http://127.0.0.1/secret", "Internal")],
        );
        assert!(matches!(
            validate(&package, &limits()),
            Err(ValidationError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn test_build_submission_orders_and_numbers() {
        let dir = tempdir().unwrap();
        let cv = dir.path().join("cv.pdf");
        std::fs::write(&cv, b"%PDF-1.7").unwrap();

        let package = ExhibitPackage::new(
            PackageConfig::new("Petition", "emp-1").numbering(NumberingStyle::Roman),
            vec![
                ExhibitItem::file(ExhibitKind::Pdf, "cv.pdf", 8).with_local_path(&cv),
                ExhibitItem::url("https://example.com/story", "Story"),
                ExhibitItem::file(ExhibitKind::Image, "drive_badge.png", 5).imported_from_drive(),
            ],
        );

        let submission = build_submission(&package).await.unwrap();
        assert_eq!(submission.config.numbering_style, "roman");
        assert_eq!(submission.config.recipient_email, None);

        let numbers: Vec<_> = submission.exhibits.iter().map(|e| e.number.as_str()).collect();
        assert_eq!(numbers, vec!["I", "II", "III"]);
        assert_eq!(submission.exhibits[1].url.as_deref(), Some("https://example.com/story"));
        assert!(submission.exhibits[2].imported_from_drive);
        assert_eq!(submission.exhibits[2].filename.as_deref(), Some("drive_badge.png"));

        assert_eq!(submission.files.len(), 1);
        assert_eq!(submission.files[0].filename, "cv.pdf");
        assert_eq!(submission.files[0].content_type, "application/pdf");
        assert_eq!(submission.files[0].bytes, b"%PDF-1.7");
    }

    #[tokio::test]
    async fn test_duplicate_filenames_are_disambiguated() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::create_dir_all(&a).unwrap();
        std::fs::create_dir_all(&b).unwrap();
        std::fs::write(a.join("letter.pdf"), b"one").unwrap();
        std::fs::write(b.join("letter.pdf"), b"two").unwrap();

        let package = ExhibitPackage::new(
            PackageConfig::new("Petition", "emp-1"),
            vec![
                ExhibitItem::file(ExhibitKind::Pdf, "letter.pdf", 3).with_local_path(a.join("letter.pdf")),
                ExhibitItem::file(ExhibitKind::Pdf, "letter.pdf", 3).with_local_path(b.join("letter.pdf")),
            ],
        );

        let submission = build_submission(&package).await.unwrap();
        assert_eq!(submission.files[0].filename, "letter.pdf");
        assert_eq!(submission.files[1].filename, "2_letter.pdf");
        assert_eq!(submission.exhibits[1].filename.as_deref(), Some("2_letter.pdf"));
    }

    #[tokio::test]
    async fn test_prefixed_name_already_taken() {
        let dir = tempdir().unwrap();
        let mut items = Vec::new();
        for (sub, name) in [("a", "letter.pdf"), ("b", "3_letter.pdf"), ("c", "letter.pdf")] {
            let folder = dir.path().join(sub);
            std::fs::create_dir_all(&folder).unwrap();
            std::fs::write(folder.join(name), sub.as_bytes()).unwrap();
            items.push(ExhibitItem::file(ExhibitKind::Pdf, name, 1).with_local_path(folder.join(name)));
        }
        let package = ExhibitPackage::new(PackageConfig::new("Petition", "emp-1"), items);

        let submission = build_submission(&package).await.unwrap();
        let names: Vec<&str> = submission.files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["letter.pdf", "3_letter.pdf", "3_2_letter.pdf"]);
        assert_eq!(submission.files[2].bytes, b"c");
        assert_eq!(submission.exhibits[2].filename.as_deref(), Some("3_2_letter.pdf"));
    }

    #[tokio::test]
    async fn test_local_file_does_not_shadow_drive_file() {
        let dir = tempdir().unwrap();
        let local = dir.path().join("drive_award.pdf");
        std::fs::write(&local, b"local").unwrap();

        let package = ExhibitPackage::new(
            PackageConfig::new("Petition", "emp-1"),
            vec![
                ExhibitItem::file(ExhibitKind::Pdf, "drive_award.pdf", 5).imported_from_drive(),
                ExhibitItem::file(ExhibitKind::Pdf, "drive_award.pdf", 5).with_local_path(&local),
            ],
        );

        let submission = build_submission(&package).await.unwrap();
        assert_eq!(submission.exhibits[0].filename.as_deref(), Some("drive_award.pdf"));
        assert_eq!(submission.exhibits[1].filename.as_deref(), Some("2_drive_award.pdf"));
        assert_eq!(submission.files.len(), 1);
        assert_eq!(submission.files[0].filename, "2_drive_award.pdf");
    }

    #[tokio::test]
    async fn test_submit_moves_package_to_processing() {
        let mock = Arc::new(MockGenerationService::new());
        mock.set_job_id("job-42");
        let submitter = JobSubmitter::new(mock.clone(), limits());

        let mut package = url_package(PackageConfig::new("Petition", "emp-1"));
        let job_id = submitter.submit(&mut package).await.unwrap();

        assert_eq!(job_id, "job-42");
        assert_eq!(package.status, PackageStatus::Processing);
        assert_eq!(package.job_id(), Some("job-42"));
        assert_eq!(mock.generate_calls(), 1);
    }

    #[tokio::test]
    async fn test_submit_failure_leaves_draft() {
        let mock = Arc::new(MockGenerationService::new());
        mock.fail_generate("connection refused");
        let submitter = JobSubmitter::new(mock.clone(), limits());

        let mut package = url_package(PackageConfig::new("Petition", "emp-1"));
        let err = submitter.submit(&mut package).await.unwrap_err();

        assert!(matches!(err, SubmitError::Service(ServiceError::Network(_))));
        assert_eq!(package.status, PackageStatus::Draft);
        assert!(package.generation_job.is_none());
        assert_eq!(mock.generate_calls(), 1);
    }

    #[tokio::test]
    async fn test_invalid_package_makes_no_call() {
        let mock = Arc::new(MockGenerationService::new());
        let submitter = JobSubmitter::new(mock.clone(), limits());

        let mut package = url_package(
            PackageConfig::new("Petition", "emp-1").delivery(DeliveryMethod::Email, None),
        );
        let err = submitter.submit(&mut package).await.unwrap_err();

        assert!(matches!(
            err,
            SubmitError::Validation(ValidationError::MissingRecipient(DeliveryMethod::Email))
        ));
        assert_eq!(mock.total_calls(), 0);
    }
}
