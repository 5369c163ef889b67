//! Data models for storage unit configuration.
//!
//! This module re-exports all model types used throughout the crate.

pub mod consistency;
pub mod datasource;
pub mod properties;
pub mod synonym;
pub mod version;

// Re-export commonly used types
pub use consistency::TableDataConsistencyCountCheckResult;
pub use datasource::{ConnectionConfiguration, DataSourceConfiguration, PoolConfiguration};
pub use properties::{CanonicalProperties, CustomProperties};
pub use synonym::{Properties, PropertyCategory, PropertySynonyms, SynonymTable};
pub use version::MetaDataVersion;
