//! Core data models for exhibits, packages and generation jobs.

mod exhibit;
mod job;
mod package;
mod record;
mod remote;

pub use exhibit::{label_from_filename, new_id, ExhibitItem, ExhibitKind, ExhibitSource};
pub use job::{GenerationJob, JobStatusReport, JobTicket, RemoteJobStatus, TerminalResult};
pub use package::{
    DeliveryMethod, ExhibitPackage, FailureReason, NumberingStyle, PackageConfig, PackageError,
    PackageStatus,
};
pub use record::PackageRecord;
pub use remote::RemoteFileDescriptor;
