//! Guided package assembly as an explicit state machine.
//!
//! Upload → Review → Reorder → Generate → Complete. Each step owns the data it
//! needs, so a step can only be reached with that data in hand.

use crate::drive::{DriveError, DriveImporter, ImportWarning};
use crate::models::{ExhibitItem, ExhibitPackage, PackageConfig, RemoteFileDescriptor};
use crate::normalizer::{extract_url_items, ImportQueue};
use crate::sequencer::{SequenceError, Sequencer};

use super::poller::CancelHandle;

/// Everything gathered before a package exists
#[derive(Debug, Clone)]
pub struct PackageDraft {
    /// Case the package is assembled for, when one was selected
    pub case_id: Option<String>,
    pub config: PackageConfig,
    pub sequencer: Sequencer,
    /// Remote picks not yet imported
    pub pending_imports: ImportQueue,
}

impl PackageDraft {
    pub fn new(config: PackageConfig, max_undo_depth: usize) -> Self {
        Self {
            case_id: config.case_id.clone(),
            config,
            sequencer: Sequencer::new(max_undo_depth),
            pending_imports: ImportQueue::new(),
        }
    }

    pub fn add_items(&mut self, items: Vec<ExhibitItem>) -> Result<(), SequenceError> {
        self.sequencer.extend(items)
    }

    /// Add every URL found in pasted text; returns how many were added
    pub fn add_links(&mut self, text: &str) -> Result<usize, SequenceError> {
        let items = extract_url_items(text);
        let count = items.len();
        self.sequencer.extend(items)?;
        Ok(count)
    }

    pub fn queue_picks(&mut self, picks: Vec<RemoteFileDescriptor>) {
        self.pending_imports.extend(picks);
    }

    /// Import the queued picks and append the ones that arrived.
    /// Picks that failed are reported in the returned warning and dropped.
    pub async fn import_pending(
        &mut self,
        importer: &DriveImporter,
        token: &str,
    ) -> Result<Option<ImportWarning>, DriveError> {
        let queue = std::mem::take(&mut self.pending_imports);
        let outcome = match importer.import(token, queue.clone()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.pending_imports = queue;
                return Err(e);
            }
        };

        for item in outcome.items {
            if let Err(e) = self.sequencer.append(item) {
                tracing::warn!("Skipping imported exhibit: {}", e);
            }
        }
        Ok(outcome.warning)
    }

    pub fn into_package(self) -> ExhibitPackage {
        let mut config = self.config;
        if config.case_id.is_none() {
            config.case_id = self.case_id;
        }
        ExhibitPackage::new(config, self.sequencer.into_items())
    }

    fn from_package(package: ExhibitPackage, max_undo_depth: usize) -> Self {
        Self {
            case_id: package.config.case_id.clone(),
            config: package.config,
            sequencer: Sequencer::with_items(package.items, max_undo_depth),
            pending_imports: ImportQueue::new(),
        }
    }
}

/// Step names, for messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStage {
    Upload,
    Review,
    Reorder,
    Generate,
    Complete,
}

impl std::fmt::Display for WizardStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WizardStage::Upload => "upload",
            WizardStage::Review => "review",
            WizardStage::Reorder => "reorder",
            WizardStage::Generate => "generate",
            WizardStage::Complete => "complete",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug)]
pub enum WizardStep {
    Upload(PackageDraft),
    Review(PackageDraft),
    Reorder(PackageDraft),
    Generate {
        package: ExhibitPackage,
        cancel: Option<CancelHandle>,
    },
    Complete(ExhibitPackage),
}

/// A refused transition; the step is handed back unchanged
#[derive(Debug, thiserror::Error)]
#[error("cannot {action} from the {from} step: {reason}")]
pub struct WizardError {
    pub from: WizardStage,
    pub action: &'static str,
    pub reason: String,
    pub step: Box<WizardStep>,
}

impl WizardStep {
    pub fn start(config: PackageConfig, max_undo_depth: usize) -> Self {
        WizardStep::Upload(PackageDraft::new(config, max_undo_depth))
    }

    pub fn stage(&self) -> WizardStage {
        match self {
            WizardStep::Upload(_) => WizardStage::Upload,
            WizardStep::Review(_) => WizardStage::Review,
            WizardStep::Reorder(_) => WizardStage::Reorder,
            WizardStep::Generate { .. } => WizardStage::Generate,
            WizardStep::Complete(_) => WizardStage::Complete,
        }
    }

    pub fn draft_mut(&mut self) -> Option<&mut PackageDraft> {
        match self {
            WizardStep::Upload(d) | WizardStep::Review(d) | WizardStep::Reorder(d) => Some(d),
            _ => None,
        }
    }

    pub fn package_mut(&mut self) -> Option<&mut ExhibitPackage> {
        match self {
            WizardStep::Generate { package, .. } | WizardStep::Complete(package) => Some(package),
            _ => None,
        }
    }

    /// Remember how to stop the polling loop started for this step
    pub fn track_generation(&mut self, handle: CancelHandle) {
        if let WizardStep::Generate { cancel, .. } = self {
            *cancel = Some(handle);
        }
    }

    /// Stop polling the package being generated; returns whether a loop was tracked
    pub fn cancel_generation(&self) -> bool {
        match self {
            WizardStep::Generate {
                cancel: Some(handle),
                ..
            } => {
                handle.cancel();
                true
            }
            _ => false,
        }
    }

    /// Move to the next step
    pub fn advance(self) -> Result<Self, WizardError> {
        match self {
            WizardStep::Upload(draft) if draft.sequencer.is_empty() => {
                Err(refuse(WizardStep::Upload(draft), "advance", "no exhibits added"))
            }
            WizardStep::Upload(draft) if !draft.pending_imports.is_empty() => Err(refuse(
                WizardStep::Upload(draft),
                "advance",
                "remote picks are still waiting to be imported",
            )),
            WizardStep::Upload(draft) => Ok(WizardStep::Review(draft)),
            WizardStep::Review(draft) => Ok(WizardStep::Reorder(draft)),
            WizardStep::Reorder(draft) => Ok(WizardStep::Generate {
                package: draft.into_package(),
                cancel: None,
            }),
            WizardStep::Generate { package, cancel } if !package.is_terminal() => Err(refuse(
                WizardStep::Generate { package, cancel },
                "advance",
                "generation has not finished",
            )),
            WizardStep::Generate { package, .. } => Ok(WizardStep::Complete(package)),
            step @ WizardStep::Complete(_) => Err(refuse(step, "advance", "already complete")),
        }
    }

    /// Return to the previous step
    pub fn back(self, max_undo_depth: usize) -> Result<Self, WizardError> {
        match self {
            step @ WizardStep::Upload(_) => Err(refuse(step, "go back", "first step")),
            WizardStep::Review(draft) => Ok(WizardStep::Upload(draft)),
            WizardStep::Reorder(draft) => Ok(WizardStep::Review(draft)),
            WizardStep::Generate { package, cancel } if package.job_id().is_some() => Err(refuse(
                WizardStep::Generate { package, cancel },
                "go back",
                "package was already submitted",
            )),
            WizardStep::Generate { package, .. } => Ok(WizardStep::Reorder(
                PackageDraft::from_package(package, max_undo_depth),
            )),
            step @ WizardStep::Complete(_) => {
                Err(refuse(step, "go back", "finished packages cannot change"))
            }
        }
    }

    /// Start a fresh package from a finished one, at the reorder step
    pub fn retry(self, max_undo_depth: usize) -> Result<Self, WizardError> {
        match self {
            WizardStep::Complete(package) => {
                let fresh = ExhibitPackage::retry_from(&package);
                Ok(WizardStep::Reorder(PackageDraft::from_package(
                    fresh,
                    max_undo_depth,
                )))
            }
            step => Err(refuse(step, "retry", "only finished packages can be retried")),
        }
    }
}

fn refuse(step: WizardStep, action: &'static str, reason: &str) -> WizardError {
    WizardError {
        from: step.stage(),
        action,
        reason: reason.to_string(),
        step: Box::new(step),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PackageStatus, TerminalResult};

    fn started() -> WizardStep {
        WizardStep::start(PackageConfig::new("Petition", "emp-1"), 50)
    }

    #[test]
    fn test_upload_needs_items() {
        let err = started().advance().unwrap_err();
        assert_eq!(err.from, WizardStage::Upload);
        assert_eq!(err.step.stage(), WizardStage::Upload);
    }

    #[test]
    fn test_full_walk() {
        let mut step = started();
        let added = step
            .draft_mut()
            .unwrap()
            .add_links("Award - https://example.com/award.pdf\nhttps://example.com/press")
            .unwrap();
        assert_eq!(added, 2);

        let step = step.advance().unwrap();
        assert_eq!(step.stage(), WizardStage::Review);
        let mut step = step.advance().unwrap();
        step.draft_mut().unwrap().sequencer.reverse();
        let mut step = step.advance().unwrap();
        assert_eq!(step.stage(), WizardStage::Generate);

        let package = step.package_mut().unwrap();
        assert_eq!(package.items[0].label, "press");
        assert_eq!(package.status, PackageStatus::Draft);

        package.attach_job("job-1").unwrap();
        package.mark_processing().unwrap();
        let handle = CancelHandle::new();
        step.track_generation(handle.clone());
        assert!(step.cancel_generation());
        assert!(handle.is_cancelled());

        // not finished yet
        let err = step.advance().unwrap_err();
        let mut step = *err.step;
        step.package_mut()
            .unwrap()
            .complete(TerminalResult::default())
            .unwrap();
        let step = step.advance().unwrap();
        assert_eq!(step.stage(), WizardStage::Complete);

        let err = step.back(50).unwrap_err();
        let step = (*err.step).retry(50).unwrap();
        assert_eq!(step.stage(), WizardStage::Reorder);
    }

    #[test]
    fn test_pending_imports_block_review() {
        let mut step = started();
        let draft = step.draft_mut().unwrap();
        draft.add_links("https://example.com/a").unwrap();
        draft.queue_picks(vec![RemoteFileDescriptor::new(
            "f1",
            "a.pdf",
            "application/pdf",
        )]);

        let err = step.advance().unwrap_err();
        assert!(err.to_string().contains("remote picks"));
    }

    #[tokio::test]
    async fn test_import_pending_appends_successes() {
        use crate::service::mock::{import_result, MockGenerationService};
        use std::sync::Arc;

        let mock = Arc::new(MockGenerationService::new());
        mock.set_import_results(vec![
            import_result("a.pdf", true),
            import_result("b.pdf", false),
        ]);
        let importer = DriveImporter::new(mock);

        let mut draft = PackageDraft::new(PackageConfig::new("Petition", "emp-1"), 50);
        draft.queue_picks(vec![
            RemoteFileDescriptor::new("f1", "a.pdf", "application/pdf"),
            RemoteFileDescriptor::new("f2", "b.pdf", "application/pdf"),
        ]);

        let warning = draft.import_pending(&importer, "token").await.unwrap();
        assert_eq!(warning.unwrap().failed, vec!["b.pdf".to_string()]);
        assert_eq!(draft.sequencer.len(), 1);
        assert!(draft.pending_imports.is_empty());
    }

    #[test]
    fn test_back_from_unsubmitted_generate() {
        let mut step = started();
        step.draft_mut()
            .unwrap()
            .add_links("https://example.com/a")
            .unwrap();
        let step = step.advance().unwrap().advance().unwrap().advance().unwrap();
        let step = step.back(50).unwrap();
        assert_eq!(step.stage(), WizardStage::Reorder);
    }
}
