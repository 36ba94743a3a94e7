//! Generation job model and the remote status wire shapes.

use serde::{Deserialize, Serialize};

/// Status string reported by the generation service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteJobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    #[serde(untagged)]
    Other(String),
}

impl RemoteJobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RemoteJobStatus::Completed | RemoteJobStatus::Failed)
    }
}

/// Response of `POST /api/pdf/generate`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobTicket {
    pub job_id: String,
}

/// Response of `GET /api/pdf/status/:jobId`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusReport {
    pub status: RemoteJobStatus,

    #[serde(default)]
    pub progress: Option<f64>,

    #[serde(default)]
    pub status_message: Option<String>,

    /// Cumulative log lines since the job started
    #[serde(default)]
    pub logs: Vec<String>,

    #[serde(default)]
    pub download_url: Option<String>,

    #[serde(default)]
    pub total_pages: Option<u32>,

    /// Size of the generated artifact in bytes
    #[serde(default)]
    pub package_size: Option<u64>,

    #[serde(default)]
    pub drive_link: Option<String>,

    #[serde(default)]
    pub error: Option<String>,
}

impl JobStatusReport {
    /// A bare report with only a status, handy for tests and mocks
    pub fn with_status(status: RemoteJobStatus) -> Self {
        Self {
            status,
            progress: None,
            status_message: None,
            logs: Vec::new(),
            download_url: None,
            total_pages: None,
            package_size: None,
            drive_link: None,
            error: None,
        }
    }

    pub fn progress(mut self, percent: f64) -> Self {
        self.progress = Some(percent);
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.status_message = Some(message.into());
        self
    }

    pub fn logs<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.logs = lines.into_iter().map(Into::into).collect();
        self
    }
}

/// Artifact details captured once the job completes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalResult {
    pub download_url: Option<String>,
    pub delivery_url: Option<String>,
    pub drive_link: Option<String>,
    pub total_pages: Option<u32>,
    pub package_size_bytes: Option<u64>,
}

impl TerminalResult {
    pub fn from_report(report: &JobStatusReport) -> Self {
        Self {
            download_url: report.download_url.clone(),
            delivery_url: report
                .drive_link
                .clone()
                .or_else(|| report.download_url.clone()),
            drive_link: report.drive_link.clone(),
            total_pages: report.total_pages,
            package_size_bytes: report.package_size,
        }
    }
}

/// Remote work ticket owned by exactly one package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationJob {
    pub job_id: String,
    pub progress_percent: u8,
    pub status_message: Option<String>,
    pub log_lines: Vec<String>,
    /// Status polls issued against this job
    pub attempts: u32,
    pub terminal_result: Option<TerminalResult>,
    pub error: Option<String>,
}

impl GenerationJob {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            progress_percent: 0,
            status_message: None,
            log_lines: Vec::new(),
            attempts: 0,
            terminal_result: None,
            error: None,
        }
    }

    /// Fold a status report into the job.
    ///
    /// Progress never moves backwards. The remote log is cumulative, so only
    /// lines past what is already recorded are appended. Returns the newly
    /// appended lines.
    pub fn apply_report(&mut self, report: &JobStatusReport) -> Vec<String> {
        if let Some(progress) = report.progress {
            let clamped = progress.clamp(0.0, 100.0).round() as u8;
            if clamped > self.progress_percent {
                self.progress_percent = clamped;
            }
        }

        if let Some(message) = &report.status_message {
            self.status_message = Some(message.clone());
        }

        let known = self.log_lines.len();
        let fresh: Vec<String> = report.logs.iter().skip(known).cloned().collect();
        self.log_lines.extend(fresh.iter().cloned());

        match report.status {
            RemoteJobStatus::Completed => {
                self.progress_percent = 100;
                self.terminal_result = Some(TerminalResult::from_report(report));
            }
            RemoteJobStatus::Failed => {
                self.error = Some(
                    report
                        .error
                        .clone()
                        .unwrap_or_else(|| "generation failed".to_string()),
                );
            }
            _ => {}
        }

        fresh
    }
}
