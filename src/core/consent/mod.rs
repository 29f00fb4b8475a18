//! Consent and request validation
//!
//! Every export request passes through the [`ConsentManager`] before any job
//! starts. Validation returns a structured [`ValidationResult`]; consent
//! coverage is a pure predicate over the held records.

pub mod service;
pub mod validation;

pub use service::{ConsentManager, ConsentRecord, CONSENT_SCHEMA_VERSION, CONSENT_SNAPSHOT_KEY};
pub use validation::{ValidationError, ValidationResult};
