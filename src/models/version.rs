//! Version audit records.

use serde::Serialize;

/// Outcome of writing or activating a storage unit version.
///
/// Callers use these records to build a changelog or to roll back by
/// re-activating `previous_active_version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetaDataVersion {
    /// Path of the unit node whose version changed.
    pub node: String,
    /// Active version before the change. None when the unit had no active version.
    pub previous_active_version: Option<String>,
    pub next_version: String,
}

impl MetaDataVersion {
    pub fn new(
        node: impl Into<String>,
        previous_active_version: Option<String>,
        next_version: impl Into<String>,
    ) -> Self {
        Self {
            node: node.into(),
            previous_active_version,
            next_version: next_version.into(),
        }
    }

    /// Whether activating `next_version` would move the active pointer.
    pub fn changes_active_version(&self) -> bool {
        self.previous_active_version.as_deref() != Some(self.next_version.as_str())
    }
}
