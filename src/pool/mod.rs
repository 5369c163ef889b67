//! Pool implementation layer.
//!
//! This module knows about concrete pool implementations:
//! - Pool type descriptors and their registry
//! - Live pool instances and their property adapters
//! - Building and checking sqlx pools from canonical properties
//! - Live pools paired with the properties derived from them

pub mod connector;
pub mod descriptor;
pub mod instance;
pub mod resource;

pub use connector::{PoolConnector, PoolSettings, SqlxPoolConnector};
pub use descriptor::{DescriptorRegistry, PoolTypeDescriptor, SqlxPoolDescriptor};
pub use instance::{CatalogSwitchablePool, DbPool, ManagedPool, PoolInstance};
pub use resource::StorageResourceWithProperties;

use serde::{Deserialize, Serialize};

pub const POSTGRES_POOL_ID: &str = "sqlx::postgres::PgPool";
pub const MYSQL_POOL_ID: &str = "sqlx::mysql::MySqlPool";
pub const SQLITE_POOL_ID: &str = "sqlx::sqlite::SqlitePool";

/// Database backends with a built-in pool implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    PostgreSQL,
    /// Includes MariaDB
    MySQL,
    SQLite,
}

impl DatabaseType {
    pub const ALL: [DatabaseType; 3] = [Self::PostgreSQL, Self::MySQL, Self::SQLite];

    /// Parse database type from a connection string.
    pub fn from_connection_string(connection_string: &str) -> Option<Self> {
        let lower = connection_string.to_lowercase();
        if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
            Some(Self::PostgreSQL)
        } else if lower.starts_with("mysql://") || lower.starts_with("mariadb://") {
            Some(Self::MySQL)
        } else if lower.starts_with("sqlite://") || lower.starts_with("sqlite:") {
            Some(Self::SQLite)
        } else {
            None
        }
    }

    /// Resolve a built-in pool implementation identifier.
    pub fn from_implementation_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.implementation_id() == id)
    }

    pub fn implementation_id(&self) -> &'static str {
        match self {
            Self::PostgreSQL => POSTGRES_POOL_ID,
            Self::MySQL => MYSQL_POOL_ID,
            Self::SQLite => SQLITE_POOL_ID,
        }
    }

    /// Get the display name for this database type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PostgreSQL => "PostgreSQL",
            Self::MySQL => "MySQL",
            Self::SQLite => "SQLite",
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
