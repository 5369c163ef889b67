//! Versioned persistence of storage unit configuration.
//!
//! This module provides:
//! - Repository paths of units, versions and active pointers
//! - The YAML encoding of stored versions
//! - The persistence service itself

pub mod codec;
pub mod node;
pub mod service;

pub use service::DataSourceUnitPersistService;
