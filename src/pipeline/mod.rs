//! Submission, tracking and recording of exhibit packages.
//!
//! - [`submitter`]: local validation and the multipart submission
//! - [`poller`]: fixed-interval status polling with a bounded budget
//! - [`persister`]: best-effort record of the finished package
//! - [`wizard`]: the guided assembly flow as a state machine
//!
//! [`Pipeline`] chains the first three for one package.

pub mod persister;
pub mod poller;
pub mod submitter;
pub mod wizard;

pub use persister::{absolutize, record_for, resolve_result, PersistOutcome, ResultPersister};
pub use poller::{
    CancelHandle, CancelToken, JobPoller, PollError, PollGuard, PollOutcome, PollRegistry,
    PollSettings, ProgressEvent, ProgressSink,
};
pub use submitter::{build_submission, validate, JobSubmitter, SubmitError, ValidationError};
pub use wizard::{PackageDraft, WizardError, WizardStage, WizardStep};

use std::sync::Arc;

use crate::config::Config;
use crate::models::ExhibitPackage;
use crate::service::GenerationService;
use crate::store::PackageStore;

/// Pipeline failures before a terminal outcome is reached
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error(transparent)]
    Poll(#[from] PollError),
}

/// What one pipeline run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub job_id: String,
    pub outcome: PollOutcome,
    /// `None` when the run was cancelled and nothing was recorded
    pub persisted: Option<PersistOutcome>,
}

/// Submit, poll and record one package
#[derive(Debug, Clone)]
pub struct Pipeline {
    submitter: JobSubmitter,
    poller: JobPoller,
    persister: ResultPersister,
}

impl Pipeline {
    pub fn new(submitter: JobSubmitter, poller: JobPoller, persister: ResultPersister) -> Self {
        Self {
            submitter,
            poller,
            persister,
        }
    }

    /// Wire all stages from configuration
    pub fn from_config(
        config: &Config,
        service: Arc<dyn GenerationService>,
        store: Arc<dyn PackageStore>,
    ) -> Self {
        let base_url = service.base_url().to_string();
        Self {
            submitter: JobSubmitter::new(service.clone(), config.limits.clone()),
            poller: JobPoller::new(service, PollSettings::from(&config.polling)),
            persister: ResultPersister::new(store, base_url),
        }
    }

    pub fn with_progress_sink(mut self, sink: ProgressSink) -> Self {
        self.poller = self.poller.with_progress_sink(sink);
        self
    }

    pub fn poller(&self) -> &JobPoller {
        &self.poller
    }

    pub fn persister(&self) -> &ResultPersister {
        &self.persister
    }

    /// Run a draft package to a terminal state and record it.
    ///
    /// A cancelled run leaves the package Processing and records nothing.
    pub async fn run(
        &self,
        package: &mut ExhibitPackage,
        cancel: CancelToken,
    ) -> Result<PipelineReport, PipelineError> {
        let job_id = self.submitter.submit(package).await?;
        let outcome = self.poller.run(package, cancel).await?;

        let persisted = match outcome {
            PollOutcome::Cancelled => None,
            _ => Some(self.persister.persist(package)),
        };

        Ok(PipelineReport {
            job_id,
            outcome,
            persisted,
        })
    }
}
