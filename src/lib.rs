//! Storage Unit Configuration Library
//!
//! This library canonicalizes, validates and version-controls the connection
//! pool configuration of storage units (SQLite, PostgreSQL, MySQL).

pub mod config;
pub mod error;
pub mod models;
pub mod persist;
pub mod pool;
pub mod repository;
pub mod translate;
pub mod validate;

pub use config::{Config, PersistOptions};
pub use error::{UnitError, UnitResult};
pub use persist::DataSourceUnitPersistService;
pub use translate::PropertiesTranslator;
pub use validate::ValidationGate;
