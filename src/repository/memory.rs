//! In-process repository.

use super::{PersistRepository, child_prefix, child_segments};
use crate::error::UnitResult;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Repository kept in memory, shared by everything holding the same instance.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl PersistRepository for MemoryRepository {
    async fn get_directly(&self, key: &str) -> UnitResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn get_children_keys(&self, key: &str) -> UnitResult<Vec<String>> {
        let prefix = child_prefix(key);
        let entries = self.entries.read().await;
        let keys = entries
            .range(prefix.clone()..)
            .map(|(k, _)| k.as_str())
            .take_while(|k| k.starts_with(&prefix));
        Ok(child_segments(&prefix, keys))
    }

    async fn persist(&self, key: &str, value: &str) -> UnitResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn persist_if_absent(&self, key: &str, value: &str) -> UnitResult<bool> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(true)
    }

    async fn delete(&self, key: &str) -> UnitResult<()> {
        let prefix = child_prefix(key);
        self.entries
            .write()
            .await
            .retain(|k, _| k != key && !k.starts_with(&prefix));
        Ok(())
    }
}
