//! Durable repository on a single SQLite table.

use super::{PersistRepository, child_prefix, child_segments};
use crate::config::DEFAULT_MAX_CONNECTIONS_SQLITE;
use crate::error::{UnitError, UnitResult};
use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};

/// Upper bound of a key range whose keys all start with `prefix`.
///
/// `prefix` always ends with `/`, and `0` is the next character after it.
fn range_end(prefix: &str) -> String {
    let mut end = prefix.trim_end_matches('/').to_string();
    end.push('0');
    end
}

/// Repository storing every key in `repository(key, value)`.
#[derive(Debug, Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Open (creating when missing) the database at `url` and prepare the table.
    pub async fn connect(url: &str) -> UnitResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| {
                UnitError::connection(
                    format!("Invalid repository URL: {}", e),
                    "Check the connection URL format: sqlite:path/to/repository.db",
                )
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(DEFAULT_MAX_CONNECTIONS_SQLITE)
            .connect_with(options)
            .await?;

        info!(url = %url, "Opened SQLite repository");
        Self::with_pool(pool).await
    }

    /// Use an existing pool, creating the table if needed.
    pub async fn with_pool(pool: SqlitePool) -> UnitResult<Self> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS repository (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl PersistRepository for SqliteRepository {
    async fn get_directly(&self, key: &str) -> UnitResult<Option<String>> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM repository WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn get_children_keys(&self, key: &str) -> UnitResult<Vec<String>> {
        let prefix = child_prefix(key);
        let keys = sqlx::query_scalar::<_, String>(
            "SELECT key FROM repository WHERE key > ? AND key < ? ORDER BY key",
        )
        .bind(&prefix)
        .bind(range_end(&prefix))
        .fetch_all(&self.pool)
        .await?;
        Ok(child_segments(&prefix, keys.iter().map(String::as_str)))
    }

    async fn persist(&self, key: &str, value: &str) -> UnitResult<()> {
        sqlx::query(
            "INSERT INTO repository (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        debug!(key = %key, "Persisted repository key");
        Ok(())
    }

    async fn persist_if_absent(&self, key: &str, value: &str) -> UnitResult<bool> {
        let result = sqlx::query(
            "INSERT INTO repository (key, value) VALUES (?, ?) ON CONFLICT(key) DO NOTHING",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, key: &str) -> UnitResult<()> {
        let prefix = child_prefix(key);
        let result = sqlx::query("DELETE FROM repository WHERE key = ? OR (key > ? AND key < ?)")
            .bind(key)
            .bind(&prefix)
            .bind(range_end(&prefix))
            .execute(&self.pool)
            .await?;
        debug!(key = %key, removed = result.rows_affected(), "Deleted repository subtree");
        Ok(())
    }
}
