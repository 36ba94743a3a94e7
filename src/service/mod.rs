//! Client side of the remote document-generation service.
//!
//! The [`GenerationService`] trait is the seam between the pipeline and the
//! network. [`HttpGenerationService`] talks to the real service over HTTP;
//! [`MockGenerationService`] replays scripted responses for tests.
//!
//! | Operation | Endpoint |
//! |---|---|
//! | [`GenerationService::generate`] | `POST /api/pdf/generate` (multipart) |
//! | [`GenerationService::status`] | `GET /api/pdf/status/:jobId` |
//! | [`GenerationService::download`] | `GET /api/pdf/download/:jobId` |
//! | [`GenerationService::drive_config`] | `GET /api/drive/config` |
//! | [`GenerationService::drive_import`] | `POST /api/drive/import` |

mod http;
pub mod mock;
mod types;

pub use http::HttpGenerationService;
pub use mock::MockGenerationService;
pub use types::{
    DriveConfig, DriveFileResult, DriveImportRequest, DriveImportResponse, ExhibitManifestEntry,
    FilePart, Submission, SubmissionConfig,
};

use async_trait::async_trait;

use crate::models::{JobStatusReport, JobTicket};

/// Operations offered by the generation service
#[async_trait]
pub trait GenerationService: Send + Sync + std::fmt::Debug {
    /// Base URL relative result links are resolved against
    fn base_url(&self) -> &str;

    /// Submit a package for generation
    async fn generate(&self, submission: Submission) -> Result<JobTicket, ServiceError>;

    /// Fetch the current status of a job
    async fn status(&self, job_id: &str) -> Result<JobStatusReport, ServiceError>;

    /// Download the finished artifact
    async fn download(&self, job_id: &str) -> Result<Vec<u8>, ServiceError>;

    /// Remote file picker settings
    async fn drive_config(&self) -> Result<DriveConfig, ServiceError>;

    /// Import a batch of picked files server-side
    async fn drive_import(
        &self,
        request: &DriveImportRequest,
    ) -> Result<DriveImportResponse, ServiceError>;
}

/// Errors that can occur when talking to the generation service
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Transport failure: connection, timeout, TLS
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP status
    #[error("HTTP {status} from {endpoint}: {body}")]
    Http {
        status: u16,
        endpoint: String,
        body: String,
    },

    /// Response body did not decode
    #[error("Parse error: {0}")]
    Parse(String),

    /// Request could not be built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// IO error (file system)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Parse(format!("JSON: {}", err))
    }
}

impl From<url::ParseError> for ServiceError {
    fn from(err: url::ParseError) -> Self {
        ServiceError::InvalidRequest(format!("URL: {}", err))
    }
}
