//! Clinical data sources
//!
//! The export processor pulls user data through the [`ClinicalDataSource`]
//! trait. The in-memory implementation serves tests and local demos.

pub mod memory;
pub mod traits;

pub use memory::InMemoryDataSource;
pub use traits::{ClinicalDataSource, ClinicalRecord};
