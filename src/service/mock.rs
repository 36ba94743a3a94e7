//! Mock generation service for testing purposes.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{
    DriveConfig, DriveFileResult, DriveImportRequest, DriveImportResponse, GenerationService,
    ServiceError, Submission,
};
use crate::models::{JobStatusReport, JobTicket, RemoteJobStatus};

/// A mock service that replays scripted responses and counts calls.
///
/// Status reports are consumed in order; once the script runs out the
/// fallback report is returned on every further call.
#[derive(Debug)]
pub struct MockGenerationService {
    base_url: String,
    job_id: Mutex<Result<String, String>>,
    statuses: Mutex<VecDeque<Result<JobStatusReport, String>>>,
    fallback_status: Mutex<JobStatusReport>,
    drive_config: Mutex<DriveConfig>,
    import_results: Mutex<Option<Vec<DriveFileResult>>>,
    artifact: Mutex<Vec<u8>>,
    last_submission: Mutex<Option<Submission>>,
    last_import: Mutex<Option<DriveImportRequest>>,
    generate_calls: AtomicUsize,
    status_calls: AtomicUsize,
    import_calls: AtomicUsize,
    download_calls: AtomicUsize,
}

impl Default for MockGenerationService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGenerationService {
    /// Create a mock that issues `mock-job` and reports `processing` forever.
    pub fn new() -> Self {
        Self {
            base_url: "https://exhibits.test".to_string(),
            job_id: Mutex::new(Ok("mock-job".to_string())),
            statuses: Mutex::new(VecDeque::new()),
            fallback_status: Mutex::new(JobStatusReport::with_status(RemoteJobStatus::Processing)),
            drive_config: Mutex::new(DriveConfig::default()),
            import_results: Mutex::new(None),
            artifact: Mutex::new(Vec::new()),
            last_submission: Mutex::new(None),
            last_import: Mutex::new(None),
            generate_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            import_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the job id returned by `generate`
    pub fn set_job_id(&self, job_id: impl Into<String>) {
        *self.job_id.lock().unwrap() = Ok(job_id.into());
    }

    /// Make `generate` fail with a network error
    pub fn fail_generate(&self, message: impl Into<String>) {
        *self.job_id.lock().unwrap() = Err(message.into());
    }

    /// Queue a status report
    pub fn push_status(&self, report: JobStatusReport) {
        self.statuses.lock().unwrap().push_back(Ok(report));
    }

    /// Queue a transport failure for one status call
    pub fn push_status_error(&self, message: impl Into<String>) {
        self.statuses.lock().unwrap().push_back(Err(message.into()));
    }

    /// Report returned once the queue is empty
    pub fn set_fallback_status(&self, report: JobStatusReport) {
        *self.fallback_status.lock().unwrap() = report;
    }

    pub fn set_drive_config(&self, config: DriveConfig) {
        *self.drive_config.lock().unwrap() = config;
    }

    /// Per-file results for the next imports. Without this every file succeeds.
    pub fn set_import_results(&self, results: Vec<DriveFileResult>) {
        *self.import_results.lock().unwrap() = Some(results);
    }

    pub fn set_artifact(&self, bytes: Vec<u8>) {
        *self.artifact.lock().unwrap() = bytes;
    }

    pub fn last_submission(&self) -> Option<Submission> {
        self.last_submission.lock().unwrap().clone()
    }

    pub fn last_import(&self) -> Option<DriveImportRequest> {
        self.last_import.lock().unwrap().clone()
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn import_calls(&self) -> usize {
        self.import_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    /// Total calls of any kind
    pub fn total_calls(&self) -> usize {
        self.generate_calls() + self.status_calls() + self.import_calls() + self.download_calls()
    }
}

#[async_trait]
impl GenerationService for MockGenerationService {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn generate(&self, submission: Submission) -> Result<JobTicket, ServiceError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_submission.lock().unwrap() = Some(submission);

        match &*self.job_id.lock().unwrap() {
            Ok(job_id) => Ok(JobTicket {
                job_id: job_id.clone(),
            }),
            Err(message) => Err(ServiceError::Network(message.clone())),
        }
    }

    async fn status(&self, _job_id: &str) -> Result<JobStatusReport, ServiceError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);

        let next = self.statuses.lock().unwrap().pop_front();
        match next {
            Some(Ok(report)) => Ok(report),
            Some(Err(message)) => Err(ServiceError::Network(message)),
            None => Ok(self.fallback_status.lock().unwrap().clone()),
        }
    }

    async fn download(&self, _job_id: &str) -> Result<Vec<u8>, ServiceError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.artifact.lock().unwrap().clone())
    }

    async fn drive_config(&self) -> Result<DriveConfig, ServiceError> {
        Ok(self.drive_config.lock().unwrap().clone())
    }

    async fn drive_import(
        &self,
        request: &DriveImportRequest,
    ) -> Result<DriveImportResponse, ServiceError> {
        self.import_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_import.lock().unwrap() = Some(request.clone());

        let scripted = self.import_results.lock().unwrap().clone();
        let files = scripted.unwrap_or_else(|| {
            request
                .files
                .iter()
                .map(|file| DriveFileResult {
                    name: file.name.clone(),
                    success: true,
                    id: Some(file.id.clone()),
                    size: file.size_bytes,
                    file_type: Some(file.mime_type.clone()),
                    local_filename: Some(format!("drive_{}_{}", file.id, file.name)),
                    error: None,
                })
                .collect()
        });

        Ok(DriveImportResponse { files })
    }
}

/// Helper to build a per-file import result
pub fn import_result(name: &str, success: bool) -> DriveFileResult {
    DriveFileResult {
        name: name.to_string(),
        success,
        id: None,
        size: if success { Some(1024) } else { None },
        file_type: if success {
            Some("application/pdf".to_string())
        } else {
            None
        },
        local_filename: if success {
            Some(format!("drive_{}", name))
        } else {
            None
        },
        error: if success {
            None
        } else {
            Some("permission denied".to_string())
        },
    }
}
