//! Pool type descriptors.
//!
//! A descriptor tells the translator how to read a live instance of one pool
//! implementation: which introspected fields are runtime-only state, which
//! values are just the implementation's defaults, and which native names the
//! implementation uses for the standard properties.

use super::DatabaseType;
use crate::config::{
    DEFAULT_ACQUIRE_TIMEOUT_MS, DEFAULT_IDLE_TIMEOUT_MS, DEFAULT_MAX_CONNECTIONS,
    DEFAULT_MAX_CONNECTIONS_SQLITE, DEFAULT_MAX_LIFETIME_MS, DEFAULT_MIN_CONNECTIONS,
    DEFAULT_TEST_BEFORE_ACQUIRE,
};
use crate::models::synonym::{
    CONNECTION_TIMEOUT_MILLISECONDS, IDLE_TIMEOUT_MILLISECONDS, MAX_LIFETIME_MILLISECONDS,
    MAX_POOL_SIZE, MIN_POOL_SIZE, READ_ONLY,
};
use crate::models::{Properties, PropertySynonyms};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

// Native property names of the sqlx pool adapters.
pub const NATIVE_URL: &str = "url";
pub const NATIVE_USERNAME: &str = "username";
pub const NATIVE_PASSWORD: &str = "password";
pub const NATIVE_MAX_CONNECTIONS: &str = "max_connections";
pub const NATIVE_MIN_CONNECTIONS: &str = "min_connections";
pub const NATIVE_ACQUIRE_TIMEOUT_MS: &str = "acquire_timeout_ms";
pub const NATIVE_IDLE_TIMEOUT_MS: &str = "idle_timeout_ms";
pub const NATIVE_MAX_LIFETIME_MS: &str = "max_lifetime_ms";
pub const NATIVE_READ_ONLY: &str = "read_only";
pub const NATIVE_TEST_BEFORE_ACQUIRE: &str = "test_before_acquire";
pub const NATIVE_SIZE: &str = "size";
pub const NATIVE_NUM_IDLE: &str = "num_idle";
pub const NATIVE_CLOSED: &str = "closed";

/// Per-implementation knowledge used when introspecting live pools.
pub trait PoolTypeDescriptor: Send + Sync {
    /// Identifier of the pool implementation this descriptor covers.
    fn implementation_id(&self) -> &str;

    /// Fields that must never be persisted.
    fn transient_field_names(&self) -> &[&str] {
        &[]
    }

    /// Native key -> default value; matching live values are omitted.
    fn skipped_properties(&self) -> Properties {
        Properties::new()
    }

    /// Standard key -> native key.
    fn property_synonyms(&self) -> PropertySynonyms {
        PropertySynonyms::new()
    }
}

/// Descriptor for the built-in sqlx pool adapters.
#[derive(Debug, Clone, Copy)]
pub struct SqlxPoolDescriptor {
    db_type: DatabaseType,
}

impl SqlxPoolDescriptor {
    const TRANSIENT_FIELDS: [&'static str; 3] = [NATIVE_SIZE, NATIVE_NUM_IDLE, NATIVE_CLOSED];

    pub fn new(db_type: DatabaseType) -> Self {
        Self { db_type }
    }

    pub fn db_type(&self) -> DatabaseType {
        self.db_type
    }

    fn default_max_connections(&self) -> u32 {
        match self.db_type {
            DatabaseType::SQLite => DEFAULT_MAX_CONNECTIONS_SQLITE,
            _ => DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl PoolTypeDescriptor for SqlxPoolDescriptor {
    fn implementation_id(&self) -> &str {
        self.db_type.implementation_id()
    }

    fn transient_field_names(&self) -> &[&str] {
        &Self::TRANSIENT_FIELDS
    }

    fn skipped_properties(&self) -> Properties {
        let mut result = Properties::new();
        result.insert(
            NATIVE_MAX_CONNECTIONS.to_string(),
            Value::from(self.default_max_connections()),
        );
        result.insert(
            NATIVE_MIN_CONNECTIONS.to_string(),
            Value::from(DEFAULT_MIN_CONNECTIONS),
        );
        result.insert(
            NATIVE_ACQUIRE_TIMEOUT_MS.to_string(),
            Value::from(DEFAULT_ACQUIRE_TIMEOUT_MS),
        );
        result.insert(
            NATIVE_IDLE_TIMEOUT_MS.to_string(),
            Value::from(DEFAULT_IDLE_TIMEOUT_MS),
        );
        result.insert(
            NATIVE_MAX_LIFETIME_MS.to_string(),
            Value::from(DEFAULT_MAX_LIFETIME_MS),
        );
        result.insert(
            NATIVE_TEST_BEFORE_ACQUIRE.to_string(),
            Value::from(DEFAULT_TEST_BEFORE_ACQUIRE),
        );
        result.insert(NATIVE_READ_ONLY.to_string(), Value::from(false));
        result
    }

    fn property_synonyms(&self) -> PropertySynonyms {
        [
            (CONNECTION_TIMEOUT_MILLISECONDS, NATIVE_ACQUIRE_TIMEOUT_MS),
            (IDLE_TIMEOUT_MILLISECONDS, NATIVE_IDLE_TIMEOUT_MS),
            (MAX_LIFETIME_MILLISECONDS, NATIVE_MAX_LIFETIME_MS),
            (MAX_POOL_SIZE, NATIVE_MAX_CONNECTIONS),
            (MIN_POOL_SIZE, NATIVE_MIN_CONNECTIONS),
            (READ_ONLY, NATIVE_READ_ONLY),
        ]
        .into_iter()
        .map(|(standard, native)| (standard.to_string(), native.to_string()))
        .collect()
    }
}

/// Registry resolving descriptors by pool implementation identifier.
///
/// Descriptors are registered once at startup; lookups never fail, an unknown
/// identifier simply has no descriptor.
#[derive(Clone, Default)]
pub struct DescriptorRegistry {
    descriptors: HashMap<String, Arc<dyn PoolTypeDescriptor>>,
}

impl DescriptorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in sqlx descriptors.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for db_type in DatabaseType::ALL {
            registry.register(SqlxPoolDescriptor::new(db_type));
        }
        registry
    }

    /// Register a descriptor, replacing any previous one with the same identifier.
    pub fn register(&mut self, descriptor: impl PoolTypeDescriptor + 'static) {
        let id = descriptor.implementation_id().to_string();
        debug!(implementation_id = %id, "Registering pool type descriptor");
        self.descriptors.insert(id, Arc::new(descriptor));
    }

    pub fn find(&self, implementation_id: &str) -> Option<Arc<dyn PoolTypeDescriptor>> {
        self.descriptors.get(implementation_id).cloned()
    }

    /// Synonyms for an implementation; empty when it has no descriptor.
    pub fn property_synonyms(&self, implementation_id: &str) -> PropertySynonyms {
        self.find(implementation_id)
            .map(|d| d.property_synonyms())
            .unwrap_or_default()
    }

    pub fn implementation_ids(&self) -> impl Iterator<Item = &str> {
        self.descriptors.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for DescriptorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<&str> = self.implementation_ids().collect();
        ids.sort_unstable();
        f.debug_struct("DescriptorRegistry")
            .field("implementation_ids", &ids)
            .finish()
    }
}
