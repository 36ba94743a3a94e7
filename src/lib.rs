//! # Exhibit Assembler
//!
//! Assemble evidentiary documents (PDFs, images and web links) into a
//! numbered, ordered exhibit package for an immigration petition, submit it
//! to a remote document-generation service, and track the generation job
//! until it finishes.
//!
//! ## Architecture
//!
//! - [`models`]: exhibits, packages, generation jobs and persisted records
//! - [`normalizer`]: turn uploads, pasted links and remote picks into exhibits
//! - [`sequencer`]: ordered list with undo and position-based numbering
//! - [`drive`]: batch import of files picked in the remote drive
//! - [`service`]: the generation service client (HTTP and mock)
//! - [`pipeline`]: submission, polling, recording and the assembly wizard
//! - [`store`]: package record storage
//! - [`config`]: configuration management
//! - [`utils`]: HTTP client and input validation
//! - [`ui`]: terminal output for the CLI

pub mod config;
pub mod drive;
pub mod models;
pub mod normalizer;
pub mod pipeline;
pub mod sequencer;
pub mod service;
pub mod store;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use models::{ExhibitItem, ExhibitKind, ExhibitPackage, NumberingStyle, PackageStatus};
pub use pipeline::{JobPoller, JobSubmitter, Pipeline, ResultPersister};
pub use service::{GenerationService, HttpGenerationService};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
