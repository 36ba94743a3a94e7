//! Utility modules shared across the crate.
//!
//! - [`HttpClient`]: reqwest client configured from the service section, with
//!   optional bearer auth
//! - [`validate_email`], [`validate_url`], [`sanitize_filename`]: input checks
//!   applied before anything reaches the generation service
//!
//! ```rust
//! use exhibit_assembler::utils::{sanitize_filename, validate_email};
//!
//! assert!(validate_email("counsel@lawfirm.example.com").is_ok());
//! assert_eq!(sanitize_filename("Press (2023).png").unwrap(), "Press 2023.png");
//! ```

mod http;
mod validate;

pub use http::HttpClient;
pub use validate::{sanitize_filename, validate_email, validate_url, InputError};
