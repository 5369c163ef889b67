//! Live pool instances.
//!
//! Each pool implementation enumerates its own configuration fields into the
//! generic property form through [`PoolInstance`]. The translator never sees a
//! concrete pool type.

use super::DatabaseType;
use super::descriptor::{
    NATIVE_ACQUIRE_TIMEOUT_MS, NATIVE_CLOSED, NATIVE_IDLE_TIMEOUT_MS, NATIVE_MAX_CONNECTIONS,
    NATIVE_MAX_LIFETIME_MS, NATIVE_MIN_CONNECTIONS, NATIVE_NUM_IDLE, NATIVE_PASSWORD,
    NATIVE_READ_ONLY, NATIVE_SIZE, NATIVE_TEST_BEFORE_ACQUIRE, NATIVE_URL, NATIVE_USERNAME,
};
use crate::models::{ConnectionConfiguration, Properties};
use serde_json::Value;
use sqlx::{Database, MySqlPool, PgPool, Pool, SqlitePool};
use std::time::Duration;

/// A live pool whose configuration can be read back as properties.
pub trait PoolInstance: Send + Sync {
    /// Identifier of the pool implementation backing this instance.
    fn implementation_id(&self) -> &str;

    /// Every readable configuration field, keyed by native name.
    fn properties(&self) -> Properties;

    /// The wrapped instance when this one only decorates another pool.
    fn delegate(&self) -> Option<&dyn PoolInstance> {
        None
    }
}

/// A pool bound to a catalog (database/schema) chosen at runtime.
#[derive(Debug, Clone)]
pub struct CatalogSwitchablePool<P> {
    catalog: String,
    inner: P,
}

impl<P: PoolInstance> CatalogSwitchablePool<P> {
    pub fn new(catalog: impl Into<String>, inner: P) -> Self {
        Self {
            catalog: catalog.into(),
            inner,
        }
    }

    pub fn catalog(&self) -> &str {
        &self.catalog
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P: PoolInstance> PoolInstance for CatalogSwitchablePool<P> {
    fn implementation_id(&self) -> &str {
        self.inner.implementation_id()
    }

    fn properties(&self) -> Properties {
        self.inner.properties()
    }

    fn delegate(&self) -> Option<&dyn PoolInstance> {
        Some(&self.inner)
    }
}

/// Database-specific connection pool (avoids AnyPool limitations).
#[derive(Debug, Clone)]
pub enum DbPool {
    MySql(MySqlPool),
    Postgres(PgPool),
    SQLite(SqlitePool),
}

impl DbPool {
    /// Close the connection pool.
    pub async fn close(&self) {
        match self {
            DbPool::MySql(pool) => pool.close().await,
            DbPool::Postgres(pool) => pool.close().await,
            DbPool::SQLite(pool) => pool.close().await,
        }
    }

    /// Run a trivial statement to prove a connection can be used.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        match self {
            DbPool::MySql(pool) => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()),
            DbPool::Postgres(pool) => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()),
            DbPool::SQLite(pool) => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()),
        }
    }

    /// Get the database type for this pool.
    pub fn db_type(&self) -> DatabaseType {
        match self {
            DbPool::MySql(_) => DatabaseType::MySQL,
            DbPool::Postgres(_) => DatabaseType::PostgreSQL,
            DbPool::SQLite(_) => DatabaseType::SQLite,
        }
    }

    fn snapshot(&self) -> PoolSnapshot {
        match self {
            DbPool::MySql(pool) => PoolSnapshot::of(pool),
            DbPool::Postgres(pool) => PoolSnapshot::of(pool),
            DbPool::SQLite(pool) => PoolSnapshot::of(pool),
        }
    }
}

/// Configuration and runtime state read off a sqlx pool.
struct PoolSnapshot {
    max_connections: u32,
    min_connections: u32,
    acquire_timeout: Duration,
    idle_timeout: Option<Duration>,
    max_lifetime: Option<Duration>,
    test_before_acquire: bool,
    size: u32,
    num_idle: usize,
    closed: bool,
}

impl PoolSnapshot {
    fn of<DB: Database>(pool: &Pool<DB>) -> Self {
        let options = pool.options();
        Self {
            max_connections: options.get_max_connections(),
            min_connections: options.get_min_connections(),
            acquire_timeout: options.get_acquire_timeout(),
            idle_timeout: options.get_idle_timeout(),
            max_lifetime: options.get_max_lifetime(),
            test_before_acquire: options.get_test_before_acquire(),
            size: pool.size(),
            num_idle: pool.num_idle(),
            closed: pool.is_closed(),
        }
    }
}

fn millis(duration: Duration) -> Value {
    Value::from(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

fn optional_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, Value::from)
}

/// A sqlx pool together with the connection settings it was built from.
///
/// sqlx does not expose credentials once a pool is built, so the adapter keeps
/// the connection configuration alongside the pool.
#[derive(Debug, Clone)]
pub struct ManagedPool {
    pool: DbPool,
    connection: ConnectionConfiguration,
    read_only: bool,
}

impl ManagedPool {
    pub fn new(pool: DbPool, connection: ConnectionConfiguration, read_only: bool) -> Self {
        Self {
            pool,
            connection,
            read_only,
        }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn connection(&self) -> &ConnectionConfiguration {
        &self.connection
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl PoolInstance for ManagedPool {
    fn implementation_id(&self) -> &str {
        self.pool.db_type().implementation_id()
    }

    fn properties(&self) -> Properties {
        let snapshot = self.pool.snapshot();
        let mut result = Properties::new();
        result.insert(NATIVE_URL.to_string(), Value::from(self.connection.url.as_str()));
        result.insert(
            NATIVE_USERNAME.to_string(),
            optional_text(self.connection.username.as_deref()),
        );
        result.insert(
            NATIVE_PASSWORD.to_string(),
            optional_text(self.connection.password.as_deref()),
        );
        result.insert(
            NATIVE_MAX_CONNECTIONS.to_string(),
            Value::from(snapshot.max_connections),
        );
        result.insert(
            NATIVE_MIN_CONNECTIONS.to_string(),
            Value::from(snapshot.min_connections),
        );
        result.insert(
            NATIVE_ACQUIRE_TIMEOUT_MS.to_string(),
            millis(snapshot.acquire_timeout),
        );
        result.insert(
            NATIVE_IDLE_TIMEOUT_MS.to_string(),
            snapshot.idle_timeout.map_or(Value::Null, millis),
        );
        result.insert(
            NATIVE_MAX_LIFETIME_MS.to_string(),
            snapshot.max_lifetime.map_or(Value::Null, millis),
        );
        result.insert(
            NATIVE_TEST_BEFORE_ACQUIRE.to_string(),
            Value::from(snapshot.test_before_acquire),
        );
        result.insert(NATIVE_READ_ONLY.to_string(), Value::from(self.read_only));
        result.insert(NATIVE_SIZE.to_string(), Value::from(snapshot.size));
        result.insert(NATIVE_NUM_IDLE.to_string(), Value::from(snapshot.num_idle));
        result.insert(NATIVE_CLOSED.to_string(), Value::from(snapshot.closed));
        result
    }
}
