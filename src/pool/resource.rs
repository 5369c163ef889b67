//! Live pools paired with their canonical properties.

use super::instance::{ManagedPool, PoolInstance};
use crate::models::CanonicalProperties;
use crate::translate::PropertiesTranslator;
use indexmap::IndexMap;
use tracing::debug;

/// A set of live pools keyed by unit name, together with the canonical
/// properties read back from them.
#[derive(Debug)]
pub struct StorageResourceWithProperties<P = ManagedPool> {
    pools: IndexMap<String, P>,
    properties: IndexMap<String, CanonicalProperties>,
}

impl<P: PoolInstance> StorageResourceWithProperties<P> {
    /// Introspect every pool; on duplicate names the first pool wins.
    pub fn new<N, I>(translator: &PropertiesTranslator, pools: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, P)>,
    {
        let mut unique = IndexMap::new();
        for (name, pool) in pools {
            let name = name.into();
            if unique.contains_key(&name) {
                debug!(unit = %name, "Ignoring duplicate storage unit");
                continue;
            }
            unique.insert(name, pool);
        }
        let properties = translator.from_instances(unique.iter().map(|(n, p)| (n.clone(), p)));
        Self {
            pools: unique,
            properties,
        }
    }

    pub fn pools(&self) -> &IndexMap<String, P> {
        &self.pools
    }

    pub fn properties(&self) -> &IndexMap<String, CanonicalProperties> {
        &self.properties
    }

    pub fn get(&self, unit: &str) -> Option<(&P, &CanonicalProperties)> {
        Some((self.pools.get(unit)?, self.properties.get(unit)?))
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}

impl StorageResourceWithProperties<ManagedPool> {
    /// Close every pool.
    pub async fn close(&self) {
        for (name, pool) in &self.pools {
            debug!(unit = %name, "Closing storage unit pool");
            pool.close().await;
        }
    }
}
