//! Data consistency check results.

use serde::Serialize;

/// Row-count parity between a migration source table and its target.
///
/// `matched` is derived once from the two counts and cannot be set on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableDataConsistencyCountCheckResult {
    source_records_count: u64,
    target_records_count: u64,
    matched: bool,
}

impl TableDataConsistencyCountCheckResult {
    pub fn new(source_records_count: u64, target_records_count: u64) -> Self {
        Self {
            source_records_count,
            target_records_count,
            matched: source_records_count == target_records_count,
        }
    }

    pub fn source_records_count(&self) -> u64 {
        self.source_records_count
    }

    pub fn target_records_count(&self) -> u64 {
        self.target_records_count
    }

    pub fn is_matched(&self) -> bool {
        self.matched
    }
}
