//! Remote file picker import.
//!
//! Picks made in the external file picker are fetched by the generation
//! service in a single batch request. Each file succeeds or fails on its own;
//! failures are gathered into one [`ImportWarning`] instead of aborting the
//! batch.
//!
//! The picker hands its access token back through a redirect. That handshake
//! is modeled as a oneshot channel: the redirect handler holds the
//! [`AuthorizationSender`], the import flow awaits the
//! [`AuthorizationWaiter`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::models::{label_from_filename, ExhibitItem, ExhibitKind, RemoteFileDescriptor};
use crate::normalizer::ImportQueue;
use crate::service::{DriveConfig, DriveFileResult, DriveImportRequest, GenerationService, ServiceError};

/// Errors raised while importing from the remote drive
#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error("remote drive import is not available")]
    Unavailable,

    #[error("no access token for the remote drive")]
    MissingToken,

    #[error("authorization denied: {0}")]
    Denied(String),

    #[error("authorization timed out after {0:?}")]
    AuthorizationTimedOut(Duration),

    #[error("authorization window closed without a response")]
    AuthorizationAbandoned,

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Names of the files that could not be imported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportWarning {
    pub failed: Vec<String>,
}

impl std::fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} file(s) could not be imported: {}",
            self.failed.len(),
            self.failed.join(", ")
        )
    }
}

/// Items imported in pick order, plus a warning when some files failed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOutcome {
    pub items: Vec<ExhibitItem>,
    pub warning: Option<ImportWarning>,
}

/// Redirect side of the authorization handshake
#[derive(Debug)]
pub struct AuthorizationSender {
    tx: oneshot::Sender<Result<String, String>>,
}

impl AuthorizationSender {
    /// Deliver the access token. Returns `false` when nobody is waiting anymore.
    pub fn deliver(self, token: impl Into<String>) -> bool {
        self.tx.send(Ok(token.into())).is_ok()
    }

    /// Report that the user refused access
    pub fn deny(self, reason: impl Into<String>) -> bool {
        self.tx.send(Err(reason.into())).is_ok()
    }
}

/// Import side of the authorization handshake
#[derive(Debug)]
pub struct AuthorizationWaiter {
    rx: oneshot::Receiver<Result<String, String>>,
}

impl AuthorizationWaiter {
    /// Wait for the redirect to deliver a token
    pub async fn await_authorization(self, timeout: Duration) -> Result<String, DriveError> {
        match tokio::time::timeout(timeout, self.rx).await {
            Err(_) => Err(DriveError::AuthorizationTimedOut(timeout)),
            Ok(Err(_)) => Err(DriveError::AuthorizationAbandoned),
            Ok(Ok(Err(reason))) => Err(DriveError::Denied(reason)),
            Ok(Ok(Ok(token))) if token.trim().is_empty() => Err(DriveError::MissingToken),
            Ok(Ok(Ok(token))) => Ok(token),
        }
    }
}

/// Batch importer backed by the generation service
#[derive(Debug, Clone)]
pub struct DriveImporter {
    service: Arc<dyn GenerationService>,
}

impl DriveImporter {
    pub fn new(service: Arc<dyn GenerationService>) -> Self {
        Self { service }
    }

    /// Open a fresh authorization handshake
    pub fn authorization_channel() -> (AuthorizationSender, AuthorizationWaiter) {
        let (tx, rx) = oneshot::channel();
        (AuthorizationSender { tx }, AuthorizationWaiter { rx })
    }

    /// Picker settings, or [`DriveError::Unavailable`] when the service has none
    pub async fn drive_config(&self) -> Result<DriveConfig, DriveError> {
        let config = self.service.drive_config().await?;
        if !config.available {
            return Err(DriveError::Unavailable);
        }
        Ok(config)
    }

    /// Import every queued pick with one request
    pub async fn import(&self, token: &str, queue: ImportQueue) -> Result<ImportOutcome, DriveError> {
        if token.trim().is_empty() {
            return Err(DriveError::MissingToken);
        }
        if queue.is_empty() {
            return Ok(ImportOutcome::default());
        }

        let picks = queue.files().to_vec();
        tracing::info!("Importing {} file(s) from the remote drive", picks.len());

        let request = DriveImportRequest {
            access_token: token.to_string(),
            files: picks.clone(),
        };
        let response = self.service.drive_import(&request).await?;

        let mut results = response.files;
        let mut items = Vec::new();
        let mut failed = Vec::new();

        for pick in &picks {
            let result = take_result(&mut results, pick);
            match result.and_then(|r| item_from_result(pick, r)) {
                Some(item) => items.push(item),
                None => failed.push(pick.name.clone()),
            }
        }

        let warning = if failed.is_empty() {
            None
        } else {
            let warning = ImportWarning { failed };
            tracing::warn!("{}", warning);
            Some(warning)
        };

        Ok(ImportOutcome { items, warning })
    }
}

/// Remove and return the result for a pick, matched by id then by name
fn take_result(results: &mut Vec<DriveFileResult>, pick: &RemoteFileDescriptor) -> Option<DriveFileResult> {
    let index = results
        .iter()
        .position(|r| r.id.as_deref() == Some(pick.id.as_str()))
        .or_else(|| results.iter().position(|r| r.name == pick.name))?;
    Some(results.remove(index))
}

fn item_from_result(pick: &RemoteFileDescriptor, result: DriveFileResult) -> Option<ExhibitItem> {
    if !result.success {
        if let Some(error) = &result.error {
            tracing::debug!("Drive import of {} failed: {}", pick.name, error);
        }
        return None;
    }

    let filename = result.local_filename.unwrap_or_else(|| pick.name.clone());
    let kind = result
        .file_type
        .as_deref()
        .and_then(ExhibitKind::from_mime)
        .or_else(|| ExhibitKind::from_mime(&pick.mime_type))
        .or_else(|| {
            std::path::Path::new(&filename)
                .extension()
                .and_then(|e| e.to_str())
                .and_then(ExhibitKind::from_extension)
        });

    let Some(kind) = kind else {
        tracing::debug!("Drive import of {} has an unsupported type", pick.name);
        return None;
    };

    let size = result.size.or(pick.size_bytes).unwrap_or(0);
    Some(
        ExhibitItem::file(kind, filename, size)
            .with_label(label_from_filename(&pick.name))
            .imported_from_drive(),
    )
}
