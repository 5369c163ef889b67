//! Hierarchical key-value stores holding versioned storage unit configuration.
//!
//! Keys are `/`-separated paths. A path has children when longer keys extend
//! it with another segment; intermediate paths need not hold a value.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryRepository;
pub use sqlite::SqliteRepository;

use crate::error::UnitResult;
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Store backing the versioned persistence service.
#[async_trait]
pub trait PersistRepository: Send + Sync {
    /// Value stored at exactly `key`.
    async fn get_directly(&self, key: &str) -> UnitResult<Option<String>>;

    /// Names of the direct children of `key`, in ascending order.
    async fn get_children_keys(&self, key: &str) -> UnitResult<Vec<String>>;

    /// Write `value` at `key`, replacing any previous value.
    async fn persist(&self, key: &str, value: &str) -> UnitResult<()>;

    /// Write `value` at `key` only if nothing is stored there yet.
    ///
    /// Returns `false` without writing when the key already holds a value.
    async fn persist_if_absent(&self, key: &str, value: &str) -> UnitResult<bool>;

    /// Remove `key` and every key below it. Missing keys are a no-op.
    async fn delete(&self, key: &str) -> UnitResult<()>;
}

/// Prefix shared by every descendant of `key`.
pub(crate) fn child_prefix(key: &str) -> String {
    format!("{}/", key.trim_end_matches('/'))
}

/// Collect the distinct first segments of `keys` below `prefix`.
pub(crate) fn child_segments<'a>(prefix: &str, keys: impl Iterator<Item = &'a str>) -> Vec<String> {
    keys.filter_map(|key| key.strip_prefix(prefix))
        .filter_map(|rest| rest.split('/').next())
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
