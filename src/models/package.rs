//! Exhibit package model and its lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::exhibit::{new_id, ExhibitItem};
use super::job::{GenerationJob, TerminalResult};

/// How exhibits are numbered in the generated package
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberingStyle {
    #[default]
    Letters,
    Numbers,
    Roman,
}

impl NumberingStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            NumberingStyle::Letters => "letters",
            NumberingStyle::Numbers => "numbers",
            NumberingStyle::Roman => "roman",
        }
    }
}

/// Where the finished package goes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod {
    #[default]
    Download,
    Email,
    Drive,
}

impl DeliveryMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMethod::Download => "download",
            DeliveryMethod::Email => "email",
            DeliveryMethod::Drive => "drive",
        }
    }

    /// Email and Drive delivery both need a recipient address
    pub fn requires_recipient(&self) -> bool {
        !matches!(self, DeliveryMethod::Download)
    }
}

/// Package lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageStatus {
    Draft,
    Submitted,
    Processing,
    Completed,
    Failed,
    TimedOut,
}

impl PackageStatus {
    /// Terminal packages are immutable and never polled again automatically
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PackageStatus::Completed | PackageStatus::Failed | PackageStatus::TimedOut
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PackageStatus::Draft => "draft",
            PackageStatus::Submitted => "submitted",
            PackageStatus::Processing => "processing",
            PackageStatus::Completed => "completed",
            PackageStatus::Failed => "failed",
            PackageStatus::TimedOut => "timed_out",
        }
    }
}

impl std::fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a package ended without an artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum FailureReason {
    /// The generation service reported `failed`
    Remote(String),
    /// The attempt budget ran out before a terminal status
    TimedOut,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Remote(message) => write!(f, "generation failed: {}", message),
            FailureReason::TimedOut => write!(f, "generation exceeded maximum wait time"),
        }
    }
}

/// Package configuration chosen by the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageConfig {
    pub name: String,
    pub employer_id: String,
    #[serde(default)]
    pub case_id: Option<String>,
    #[serde(default)]
    pub visa_type: Option<String>,
    #[serde(default)]
    pub beneficiary_name: Option<String>,
    #[serde(default)]
    pub numbering_style: NumberingStyle,
    #[serde(default)]
    pub delivery_method: DeliveryMethod,
    #[serde(default)]
    pub recipient_email: Option<String>,
    /// Requested visa duration, checked against the configured maximum
    #[serde(default)]
    pub requested_duration_years: Option<u32>,
}

impl PackageConfig {
    pub fn new(name: impl Into<String>, employer_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            employer_id: employer_id.into(),
            ..Default::default()
        }
    }

    pub fn numbering(mut self, style: NumberingStyle) -> Self {
        self.numbering_style = style;
        self
    }

    pub fn delivery(mut self, method: DeliveryMethod, recipient: Option<String>) -> Self {
        self.delivery_method = method;
        self.recipient_email = recipient;
        self
    }
}

/// Errors raised by package lifecycle transitions
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PackageError {
    #[error("package is {0} and can no longer be changed")]
    Immutable(PackageStatus),

    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        from: PackageStatus,
        to: PackageStatus,
    },

    #[error("package has no generation job")]
    MissingJob,
}

/// The ordered exhibit collection plus its configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExhibitPackage {
    pub id: String,
    pub config: PackageConfig,
    pub items: Vec<ExhibitItem>,
    pub status: PackageStatus,
    pub generation_job: Option<GenerationJob>,
    pub failure: Option<FailureReason>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExhibitPackage {
    /// Create a draft package from an already ordered item list
    pub fn new(config: PackageConfig, items: Vec<ExhibitItem>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            config,
            items,
            status: PackageStatus::Draft,
            generation_job: None,
            failure: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Start over from a finished package: same config and items, new identity
    pub fn retry_from(previous: &ExhibitPackage) -> Self {
        Self::new(previous.config.clone(), previous.items.clone())
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn ensure_mutable(&self) -> Result<(), PackageError> {
        if self.is_terminal() {
            return Err(PackageError::Immutable(self.status));
        }
        Ok(())
    }

    pub fn job_id(&self) -> Option<&str> {
        self.generation_job.as_ref().map(|j| j.job_id.as_str())
    }

    /// Draft → Submitted, attaching the remote job
    pub fn attach_job(&mut self, job_id: impl Into<String>) -> Result<(), PackageError> {
        self.transition(PackageStatus::Draft, PackageStatus::Submitted)?;
        self.generation_job = Some(GenerationJob::new(job_id));
        Ok(())
    }

    /// Submitted → Processing
    pub fn mark_processing(&mut self) -> Result<(), PackageError> {
        if self.generation_job.is_none() {
            return Err(PackageError::MissingJob);
        }
        self.transition(PackageStatus::Submitted, PackageStatus::Processing)
    }

    /// Processing → Completed
    pub fn complete(&mut self, result: TerminalResult) -> Result<(), PackageError> {
        self.transition(PackageStatus::Processing, PackageStatus::Completed)?;
        if let Some(job) = self.generation_job.as_mut() {
            job.progress_percent = 100;
            job.terminal_result = Some(result);
        }
        Ok(())
    }

    /// Processing → Failed
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), PackageError> {
        self.transition(PackageStatus::Processing, PackageStatus::Failed)?;
        let message = message.into();
        if let Some(job) = self.generation_job.as_mut() {
            job.error = Some(message.clone());
        }
        self.failure = Some(FailureReason::Remote(message));
        Ok(())
    }

    /// Processing → TimedOut
    pub fn time_out(&mut self) -> Result<(), PackageError> {
        self.transition(PackageStatus::Processing, PackageStatus::TimedOut)?;
        self.failure = Some(FailureReason::TimedOut);
        Ok(())
    }

    fn transition(&mut self, from: PackageStatus, to: PackageStatus) -> Result<(), PackageError> {
        self.ensure_mutable()?;
        if self.status != from {
            return Err(PackageError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        tracing::debug!("Package {} {} -> {}", self.id, from, to);
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExhibitKind;

    fn draft() -> ExhibitPackage {
        ExhibitPackage::new(
            PackageConfig::new("O-1 petition", "emp-1"),
            vec![ExhibitItem::file(ExhibitKind::Pdf, "cv.pdf", 10)],
        )
    }

    #[test]
    fn test_happy_lifecycle() {
        let mut package = draft();
        package.attach_job("job-1").unwrap();
        assert_eq!(package.status, PackageStatus::Submitted);
        package.mark_processing().unwrap();
        package.complete(TerminalResult::default()).unwrap();
        assert_eq!(package.status, PackageStatus::Completed);
        assert_eq!(package.generation_job.unwrap().progress_percent, 100);
    }

    #[test]
    fn test_terminal_package_is_immutable() {
        let mut package = draft();
        package.attach_job("job-1").unwrap();
        package.mark_processing().unwrap();
        package.fail("bad pdf").unwrap();

        assert_eq!(
            package.time_out(),
            Err(PackageError::Immutable(PackageStatus::Failed))
        );
        assert_eq!(
            package.failure,
            Some(FailureReason::Remote("bad pdf".to_string()))
        );
    }

    #[test]
    fn test_cannot_skip_submission() {
        let mut package = draft();
        assert_eq!(package.mark_processing(), Err(PackageError::MissingJob));
        assert!(matches!(
            package.complete(TerminalResult::default()),
            Err(PackageError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_retry_creates_fresh_draft() {
        let mut package = draft();
        package.attach_job("job-1").unwrap();
        package.mark_processing().unwrap();
        package.time_out().unwrap();

        let retry = ExhibitPackage::retry_from(&package);
        assert_ne!(retry.id, package.id);
        assert_eq!(retry.status, PackageStatus::Draft);
        assert_eq!(retry.items, package.items);
        assert!(retry.generation_job.is_none());
    }

    #[test]
    fn test_timeout_reason_is_distinct() {
        assert_eq!(
            FailureReason::TimedOut.to_string(),
            "generation exceeded maximum wait time"
        );
        assert_ne!(
            FailureReason::TimedOut.to_string(),
            FailureReason::Remote("x".into()).to_string()
        );
    }
}
