//! Track a submitted generation job until it reaches a terminal state.
//!
//! The poller waits a fixed interval before each status check and gives up
//! after a fixed number of checks. Running out of checks is reported as
//! [`PollOutcome::TimedOut`], never as a failure of the job itself.
//!
//! At most one loop runs per package at a time; a second [`JobPoller::run`]
//! for the same package returns [`PollError::AlreadyPolling`] until the first
//! one ends or is cancelled.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;

use crate::config::PollingConfig;
use crate::models::{
    ExhibitPackage, JobStatusReport, PackageError, PackageStatus, RemoteJobStatus, TerminalResult,
};
use crate::service::{GenerationService, ServiceError};

/// Wait budget for one package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::from(&PollingConfig::default())
    }
}

impl From<&PollingConfig> for PollSettings {
    fn from(config: &PollingConfig) -> Self {
        Self {
            interval: config.interval(),
            max_attempts: config.max_attempts,
        }
    }
}

/// How a polling loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Completed(TerminalResult),
    /// Remote failure message
    Failed(String),
    TimedOut,
    /// Stopped locally; the package stays Processing and the remote job keeps running
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("package {0} is already being polled")]
    AlreadyPolling(String),

    #[error("package is {0}; terminal packages are not polled again")]
    AlreadyTerminal(PackageStatus),

    #[error(transparent)]
    Package(#[from] PackageError),

    #[error("status check failed: {0}")]
    Service(#[from] ServiceError),
}

/// One progress update, forwarded to an optional [`ProgressSink`]
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub package_id: String,
    pub attempt: u32,
    pub progress_percent: u8,
    pub status_message: Option<String>,
    pub new_log_lines: Vec<String>,
}

/// Callback receiving progress events
pub type ProgressSink = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Packages with a live polling loop
#[derive(Debug, Clone, Default)]
pub struct PollRegistry {
    active: Arc<Mutex<HashSet<String>>>,
}

impl PollRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the package, failing when another loop holds it
    pub fn acquire(&self, package_id: &str) -> Result<PollGuard, PollError> {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if !active.insert(package_id.to_string()) {
            return Err(PollError::AlreadyPolling(package_id.to_string()));
        }
        Ok(PollGuard {
            package_id: package_id.to_string(),
            active: Arc::clone(&self.active),
        })
    }

    pub fn is_polling(&self, package_id: &str) -> bool {
        self.active
            .lock()
            .map(|active| active.contains(package_id))
            .unwrap_or(false)
    }
}

/// Releases the package's registry entry when dropped
#[derive(Debug)]
pub struct PollGuard {
    package_id: String,
    active: Arc<Mutex<HashSet<String>>>,
}

impl Drop for PollGuard {
    fn drop(&mut self) {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        active.remove(&self.package_id);
    }
}

/// Cancels the loops holding one of its tokens
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that is never cancelled
    pub fn never() -> Self {
        CancelHandle::new().token()
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested
    pub async fn cancelled(&mut self) {
        let closed = self.rx.wait_for(|cancelled| *cancelled).await.is_err();
        if closed {
            // handle dropped without cancelling
            std::future::pending::<()>().await;
        }
    }
}

/// Polls the generation service for package jobs
#[derive(Clone)]
pub struct JobPoller {
    service: Arc<dyn GenerationService>,
    settings: PollSettings,
    registry: PollRegistry,
    sink: Option<ProgressSink>,
}

impl std::fmt::Debug for JobPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobPoller")
            .field("service", &self.service)
            .field("settings", &self.settings)
            .field("registry", &self.registry)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl JobPoller {
    pub fn new(service: Arc<dyn GenerationService>, settings: PollSettings) -> Self {
        Self {
            service,
            settings,
            registry: PollRegistry::new(),
            sink: None,
        }
    }

    /// Share a registry between pollers so the one-loop rule spans all of them
    pub fn with_registry(mut self, registry: PollRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_progress_sink(mut self, sink: ProgressSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn settings(&self) -> PollSettings {
        self.settings
    }

    pub fn registry(&self) -> &PollRegistry {
        &self.registry
    }

    /// Poll until the job completes, fails, runs out of attempts or is cancelled
    pub async fn run(
        &self,
        package: &mut ExhibitPackage,
        mut cancel: CancelToken,
    ) -> Result<PollOutcome, PollError> {
        if package.is_terminal() {
            return Err(PollError::AlreadyTerminal(package.status));
        }
        let job_id = package
            .job_id()
            .map(|id| id.to_string())
            .ok_or(PackageError::MissingJob)?;

        let _guard = self.registry.acquire(&package.id)?;

        if package.status == PackageStatus::Submitted {
            package.mark_processing()?;
        }

        tracing::info!(
            "Polling job {} for package {} (every {:?}, up to {} checks)",
            job_id,
            package.id,
            self.settings.interval,
            self.settings.max_attempts
        );

        for attempt in 1..=self.settings.max_attempts {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(self.cancelled(package)),
                _ = tokio::time::sleep(self.settings.interval) => {}
            }

            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(self.cancelled(package)),
                response = self.service.status(&job_id) => response,
            };

            if let Some(job) = package.generation_job.as_mut() {
                job.attempts = attempt;
            }

            let report = match response {
                Ok(report) => report,
                Err(e) => {
                    tracing::warn!(
                        "Status check {}/{} for job {} failed: {}",
                        attempt,
                        self.settings.max_attempts,
                        job_id,
                        e
                    );
                    continue;
                }
            };

            self.apply(package, &report, attempt);

            match report.status {
                RemoteJobStatus::Completed => {
                    let result = TerminalResult::from_report(&report);
                    package.complete(result.clone())?;
                    tracing::info!("Package {} completed after {} checks", package.id, attempt);
                    return Ok(PollOutcome::Completed(result));
                }
                RemoteJobStatus::Failed => {
                    let message = failure_message(&report);
                    package.fail(message.clone())?;
                    tracing::info!("Package {} failed: {}", package.id, message);
                    return Ok(PollOutcome::Failed(message));
                }
                _ => {}
            }
        }

        package.time_out()?;
        tracing::info!(
            "Package {} timed out after {} checks",
            package.id,
            self.settings.max_attempts
        );
        Ok(PollOutcome::TimedOut)
    }

    /// One status check outside the polling loop.
    ///
    /// Terminal packages keep their status; only the job's progress, log and
    /// result fields are updated. A Processing package that turns out to be
    /// finished is moved to its terminal state.
    pub async fn refresh(&self, package: &mut ExhibitPackage) -> Result<JobStatusReport, PollError> {
        let job_id = package
            .job_id()
            .map(|id| id.to_string())
            .ok_or(PackageError::MissingJob)?;

        let report = self.service.status(&job_id).await?;
        let attempt = package
            .generation_job
            .as_ref()
            .map(|job| job.attempts)
            .unwrap_or(0);
        self.apply(package, &report, attempt);

        if package.status == PackageStatus::Processing {
            match report.status {
                RemoteJobStatus::Completed => {
                    package.complete(TerminalResult::from_report(&report))?;
                }
                RemoteJobStatus::Failed => {
                    package.fail(failure_message(&report))?;
                }
                _ => {}
            }
        } else if package.is_terminal() {
            tracing::debug!(
                "Refreshed {} package {}: remote reports {:?}",
                package.status,
                package.id,
                report.status
            );
        }

        Ok(report)
    }

    fn apply(&self, package: &mut ExhibitPackage, report: &JobStatusReport, attempt: u32) {
        let Some(job) = package.generation_job.as_mut() else {
            return;
        };
        let fresh = job.apply_report(report);

        for line in &fresh {
            tracing::debug!("[{}] {}", job.job_id, line);
        }

        if let Some(sink) = &self.sink {
            sink(&ProgressEvent {
                package_id: package.id.clone(),
                attempt,
                progress_percent: job.progress_percent,
                status_message: job.status_message.clone(),
                new_log_lines: fresh,
            });
        }
    }

    fn cancelled(&self, package: &ExhibitPackage) -> PollOutcome {
        tracing::info!("Stopped polling package {}", package.id);
        PollOutcome::Cancelled
    }
}

/// Remote error text, or a generic reason when the service sent none
fn failure_message(report: &JobStatusReport) -> String {
    report
        .error
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .unwrap_or("generation failed")
        .to_string()
}
