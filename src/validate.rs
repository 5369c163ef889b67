//! Pre-commit validation of storage units.

use crate::error::{UnitError, UnitFailure, UnitResult};
use crate::models::CanonicalProperties;
use crate::pool::PoolConnector;
use futures_util::future::join_all;
use indexmap::IndexMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Proves that candidate storage units accept connections before they are persisted.
///
/// Every unit is checked, concurrently, and all failures are reported together.
#[derive(Clone)]
pub struct ValidationGate {
    connector: Arc<dyn PoolConnector>,
    timeout: Duration,
}

impl ValidationGate {
    pub fn new(connector: Arc<dyn PoolConnector>, timeout: Duration) -> Self {
        Self { connector, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Check every unit; fails with one error listing each failing unit in input order.
    pub async fn validate(&self, units: &IndexMap<String, CanonicalProperties>) -> UnitResult<()> {
        debug!(count = units.len(), "Validating storage units");

        let checks = units.iter().map(|(name, props)| async move {
            let outcome = tokio::time::timeout(self.timeout, self.connector.check(name, props))
                .await
                .unwrap_or_else(|_| {
                    Err(UnitError::timeout(
                        format!("connect to storage unit '{}'", name),
                        self.timeout.as_secs(),
                    ))
                });
            (name, outcome)
        });

        let failures: Vec<UnitFailure> = join_all(checks)
            .await
            .into_iter()
            .filter_map(|(name, outcome)| {
                outcome.err().map(|e| {
                    warn!(unit = %name, error = %e, "Storage unit failed validation");
                    UnitFailure::new(name.as_str(), e.to_string())
                })
            })
            .collect();

        if failures.is_empty() {
            info!(count = units.len(), "Storage units validated");
            Ok(())
        } else {
            Err(UnitError::invalid_storage_units(failures))
        }
    }
}

impl std::fmt::Debug for ValidationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationGate")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
