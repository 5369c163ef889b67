//! Versioned persistence of storage unit configuration.

use super::codec;
use super::node::{self, DEFAULT_VERSION};
use crate::config::PersistOptions;
use crate::error::{UnitError, UnitResult};
use crate::models::synonym::DATA_SOURCE_CLASS_NAME;
use crate::models::{CanonicalProperties, MetaDataVersion};
use crate::repository::PersistRepository;
use crate::translate::PropertiesTranslator;
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Stores every configuration change of a storage unit as a new version and
/// tracks which version is active.
///
/// Versions are append-only. The first version of a unit is activated
/// automatically; later versions are only activated through
/// [`switch_active_version`](Self::switch_active_version).
#[derive(Clone)]
pub struct DataSourceUnitPersistService {
    repository: Arc<dyn PersistRepository>,
    translator: PropertiesTranslator,
    options: PersistOptions,
}

impl DataSourceUnitPersistService {
    pub fn new(repository: Arc<dyn PersistRepository>, translator: PropertiesTranslator) -> Self {
        Self::with_options(repository, translator, PersistOptions::default())
    }

    pub fn with_options(
        repository: Arc<dyn PersistRepository>,
        translator: PropertiesTranslator,
        options: PersistOptions,
    ) -> Self {
        Self {
            repository,
            translator,
            options,
        }
    }

    pub fn options(&self) -> PersistOptions {
        self.options
    }

    /// Store a new version of every unit.
    pub async fn persist(
        &self,
        database: &str,
        units: &IndexMap<String, CanonicalProperties>,
    ) -> UnitResult<()> {
        check_units(units)?;
        for (name, props) in units {
            self.write_version(database, name, props).await?;
        }
        Ok(())
    }

    /// Store a new version of every unit and return one audit record per unit.
    pub async fn persist_config(
        &self,
        database: &str,
        units: &IndexMap<String, CanonicalProperties>,
    ) -> UnitResult<Vec<MetaDataVersion>> {
        check_units(units)?;
        let mut result = Vec::with_capacity(units.len());
        for (name, props) in units {
            result.push(self.write_version(database, name, props).await?);
        }
        Ok(result)
    }

    /// Same as [`persist`](Self::persist).
    pub async fn append(
        &self,
        database: &str,
        units: &IndexMap<String, CanonicalProperties>,
    ) -> UnitResult<()> {
        self.persist(database, units).await
    }

    /// Active configuration of every unit that has one.
    pub async fn load(&self, database: &str) -> UnitResult<IndexMap<String, CanonicalProperties>> {
        let mut result = IndexMap::new();
        for name in self
            .repository
            .get_children_keys(&node::units_node(database))
            .await?
        {
            if let Some(props) = self.load_active(database, &name).await? {
                result.insert(name, props);
            }
        }
        Ok(result)
    }

    /// Active configuration of one unit; empty when it has none.
    pub async fn load_unit(
        &self,
        database: &str,
        name: &str,
    ) -> UnitResult<IndexMap<String, CanonicalProperties>> {
        let mut result = IndexMap::new();
        if let Some(props) = self.load_active(database, name).await? {
            result.insert(name.to_string(), props);
        }
        Ok(result)
    }

    /// Remove every version and the active pointer of each unit.
    pub async fn delete<I>(&self, database: &str, names: I) -> UnitResult<()>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let names: Vec<I::Item> = names.into_iter().collect();
        for name in &names {
            check_unit_name(name.as_ref())?;
        }
        for name in &names {
            let name = name.as_ref();
            self.repository
                .delete(&node::unit_node(database, name))
                .await?;
            info!(database = %database, unit = %name, "Deleted storage unit");
        }
        Ok(())
    }

    /// Stored version ids of a unit, ascending.
    pub async fn versions(&self, database: &str, name: &str) -> UnitResult<Vec<String>> {
        let versions_node = node::versions_node(database, name);
        let mut versions = self.parsed_versions(&versions_node).await?;
        versions.sort_unstable();
        Ok(versions.into_iter().map(|v| v.to_string()).collect())
    }

    /// Currently active version of a unit.
    pub async fn active_version(&self, database: &str, name: &str) -> UnitResult<Option<String>> {
        Ok(self
            .repository
            .get_directly(&node::active_version_node(database, name))
            .await?
            .filter(|v| !v.is_empty()))
    }

    /// Point a unit at one of its stored versions.
    pub async fn switch_active_version(
        &self,
        database: &str,
        name: &str,
        version: &str,
    ) -> UnitResult<MetaDataVersion> {
        check_unit_name(name)?;
        let version_node = node::version_node(database, name, version);
        let stored = self.repository.get_directly(&version_node).await?;
        if stored.is_none_or(|v| v.is_empty()) {
            return Err(UnitError::invalid_version(version_node, version));
        }

        let previous = self.active_version(database, name).await?;
        self.repository
            .persist(&node::active_version_node(database, name), version)
            .await?;
        info!(
            database = %database,
            unit = %name,
            version = %version,
            previous = ?previous,
            "Switched active storage unit version"
        );
        Ok(MetaDataVersion::new(
            node::unit_node(database, name),
            previous,
            version,
        ))
    }

    /// A specific stored version of a unit.
    pub async fn load_version(
        &self,
        database: &str,
        name: &str,
        version: &str,
    ) -> UnitResult<Option<CanonicalProperties>> {
        let version_node = node::version_node(database, name, version);
        match self.repository.get_directly(&version_node).await? {
            Some(text) if !text.is_empty() => {
                Ok(Some(codec::decode(&self.translator, &version_node, &text)?))
            }
            _ => Ok(None),
        }
    }

    async fn load_active(
        &self,
        database: &str,
        name: &str,
    ) -> UnitResult<Option<CanonicalProperties>> {
        match self.active_version(database, name).await? {
            Some(version) => self.load_version(database, name, &version).await,
            None => {
                debug!(database = %database, unit = %name, "Storage unit has no active version");
                Ok(None)
            }
        }
    }

    async fn parsed_versions(&self, versions_node: &str) -> UnitResult<Vec<u64>> {
        self.repository
            .get_children_keys(versions_node)
            .await?
            .into_iter()
            .map(|v| {
                v.parse::<u64>()
                    .map_err(|_| UnitError::invalid_version(versions_node, v))
            })
            .collect()
    }

    async fn write_version(
        &self,
        database: &str,
        name: &str,
        props: &CanonicalProperties,
    ) -> UnitResult<MetaDataVersion> {
        let versions_node = node::versions_node(database, name);
        let next_version = self
            .parsed_versions(&versions_node)
            .await?
            .into_iter()
            .max()
            .map_or_else(|| DEFAULT_VERSION.to_string(), |max| (max + 1).to_string());

        let active_node = node::active_version_node(database, name);
        let active = self.repository.get_directly(&active_node).await?;
        let previous = active.clone().filter(|v| !v.is_empty());

        let version_node = node::version_node(database, name, &next_version);
        let encoded = codec::encode(props)?;
        if self.options.detect_version_conflicts {
            if !self
                .repository
                .persist_if_absent(&version_node, &encoded)
                .await?
            {
                return Err(UnitError::version_conflict(version_node, next_version));
            }
        } else {
            self.repository.persist(&version_node, &encoded).await?;
        }

        if previous.is_none() {
            self.activate_first_version(&active_node, &next_version, active.is_some())
                .await?;
        }

        info!(
            database = %database,
            unit = %name,
            version = %next_version,
            "Persisted storage unit version"
        );
        Ok(MetaDataVersion::new(
            node::unit_node(database, name),
            previous,
            next_version,
        ))
    }

    /// Activate the version just written when the unit had no active version.
    ///
    /// For a new unit this is always [`DEFAULT_VERSION`].
    async fn activate_first_version(
        &self,
        active_node: &str,
        version: &str,
        exists: bool,
    ) -> UnitResult<()> {
        if self.options.detect_version_conflicts && !exists {
            if !self
                .repository
                .persist_if_absent(active_node, version)
                .await?
            {
                debug!(node = %active_node, "Active version set by another writer");
            }
            return Ok(());
        }
        self.repository.persist(active_node, version).await
    }
}

/// Unit names are single node segments.
fn check_unit_name(name: &str) -> UnitResult<()> {
    if name.is_empty() || name.contains('/') {
        return Err(UnitError::invalid_input(format!(
            "Invalid storage unit name '{}': must be non-empty and contain no '/'",
            name
        )));
    }
    Ok(())
}

/// Reject the whole batch before anything is written.
fn check_units(units: &IndexMap<String, CanonicalProperties>) -> UnitResult<()> {
    for (name, props) in units {
        check_unit_name(name)?;
        if props.pool_implementation_id().is_empty() {
            return Err(UnitError::invalid_input(format!(
                "Storage unit '{}' has an empty {}",
                name, DATA_SOURCE_CLASS_NAME
            )));
        }
    }
    Ok(())
}

impl std::fmt::Debug for DataSourceUnitPersistService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSourceUnitPersistService")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConnectionConfiguration, DataSourceConfiguration, PoolConfiguration};
    use crate::pool::{DescriptorRegistry, MYSQL_POOL_ID};
    use crate::repository::MemoryRepository;
    use pretty_assertions::assert_eq;

    const DB: &str = "foo_db";

    fn translator() -> PropertiesTranslator {
        PropertiesTranslator::new(Arc::new(DescriptorRegistry::with_defaults()))
    }

    fn service_with(
        repository: Arc<MemoryRepository>,
        options: PersistOptions,
    ) -> DataSourceUnitPersistService {
        DataSourceUnitPersistService::with_options(repository, translator(), options)
    }

    fn units(entries: &[(&str, i32)]) -> IndexMap<String, CanonicalProperties> {
        let translator = translator();
        entries
            .iter()
            .map(|(name, max_pool_size)| {
                let config = DataSourceConfiguration::new(
                    ConnectionConfiguration::new(
                        MYSQL_POOL_ID,
                        format!("mysql://127.0.0.1:3306/{}", name),
                    ),
                    PoolConfiguration {
                        max_pool_size: Some(*max_pool_size),
                        ..PoolConfiguration::default()
                    },
                );
                (name.to_string(), translator.from_configuration(&config))
            })
            .collect()
    }

    #[tokio::test]
    async fn test_first_version_auto_activated() {
        let repository = Arc::new(MemoryRepository::new());
        let service = service_with(repository.clone(), PersistOptions::default());

        service.persist(DB, &units(&[("ds_0", 10)])).await.unwrap();

        assert_eq!(service.versions(DB, "ds_0").await.unwrap(), vec!["0"]);
        assert_eq!(
            service.active_version(DB, "ds_0").await.unwrap().as_deref(),
            Some("0")
        );
        assert!(
            repository
                .get_directly("/metadata/foo_db/datasources/units/ds_0/versions/0")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_versions_monotonic_and_pointer_stays() {
        let service = service_with(Arc::new(MemoryRepository::new()), PersistOptions::default());
        for size in [10, 20, 30] {
            service.persist(DB, &units(&[("ds_0", size)])).await.unwrap();
        }

        assert_eq!(service.versions(DB, "ds_0").await.unwrap(), vec!["0", "1", "2"]);
        assert_eq!(
            service.active_version(DB, "ds_0").await.unwrap().as_deref(),
            Some("0")
        );
        let loaded = service.load_unit(DB, "ds_0").await.unwrap();
        assert_eq!(loaded["ds_0"], units(&[("ds_0", 10)])["ds_0"]);
    }

    #[tokio::test]
    async fn test_next_version_is_numeric_max() {
        let repository = Arc::new(MemoryRepository::new());
        for version in ["9", "10"] {
            repository
                .persist(&node::version_node(DB, "ds_0", version), "x")
                .await
                .unwrap();
        }
        let service = service_with(repository, PersistOptions::default());

        let records = service
            .persist_config(DB, &units(&[("ds_0", 10)]))
            .await
            .unwrap();
        assert_eq!(records[0].next_version, "11");
        assert_eq!(
            service.versions(DB, "ds_0").await.unwrap(),
            vec!["9", "10", "11"]
        );
        assert_eq!(
            service.active_version(DB, "ds_0").await.unwrap().as_deref(),
            Some("11")
        );
    }

    #[tokio::test]
    async fn test_non_numeric_version_rejected() {
        let repository = Arc::new(MemoryRepository::new());
        repository
            .persist(&node::version_node(DB, "ds_0", "latest"), "x")
            .await
            .unwrap();
        let service = service_with(repository, PersistOptions::default());

        let err = service
            .persist(DB, &units(&[("ds_0", 10)]))
            .await
            .unwrap_err();
        assert!(matches!(err, UnitError::InvalidVersion { ref version, .. } if version == "latest"));
    }

    #[tokio::test]
    async fn test_persist_config_audit_records() {
        let service = service_with(Arc::new(MemoryRepository::new()), PersistOptions::default());

        let first = service
            .persist_config(DB, &units(&[("ds_0", 10), ("ds_1", 10)]))
            .await
            .unwrap();
        assert_eq!(
            first,
            vec![
                MetaDataVersion::new(node::unit_node(DB, "ds_0"), None, "0"),
                MetaDataVersion::new(node::unit_node(DB, "ds_1"), None, "0"),
            ]
        );

        let second = service
            .persist_config(DB, &units(&[("ds_0", 20)]))
            .await
            .unwrap();
        assert_eq!(
            second,
            vec![MetaDataVersion::new(
                node::unit_node(DB, "ds_0"),
                Some("0".to_string()),
                "1"
            )]
        );
    }

    #[tokio::test]
    async fn test_load_skips_units_without_active_version() {
        let repository = Arc::new(MemoryRepository::new());
        let service = service_with(repository.clone(), PersistOptions::default());
        service
            .append(DB, &units(&[("ds_1", 10), ("ds_0", 10)]))
            .await
            .unwrap();
        repository
            .persist(&node::active_version_node(DB, "ds_1"), "")
            .await
            .unwrap();

        let loaded = service.load(DB).await.unwrap();
        assert_eq!(loaded.keys().collect::<Vec<_>>(), vec!["ds_0"]);
        assert!(service.load_unit(DB, "ds_1").await.unwrap().is_empty());
        assert!(service.load_unit(DB, "missing").await.unwrap().is_empty());
        assert!(service.load("other_db").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_pointer_is_reactivated() {
        let repository = Arc::new(MemoryRepository::new());
        repository
            .persist(&node::active_version_node(DB, "ds_0"), "")
            .await
            .unwrap();
        let service = service_with(repository, PersistOptions::default());

        service.persist(DB, &units(&[("ds_0", 10)])).await.unwrap();
        assert_eq!(
            service.active_version(DB, "ds_0").await.unwrap().as_deref(),
            Some("0")
        );
    }

    #[tokio::test]
    async fn test_delete_removes_whole_unit() {
        let repository = Arc::new(MemoryRepository::new());
        let service = service_with(repository.clone(), PersistOptions::default());
        service
            .persist(DB, &units(&[("ds_0", 10), ("ds_1", 10)]))
            .await
            .unwrap();
        service.persist(DB, &units(&[("ds_0", 20)])).await.unwrap();

        service.delete(DB, ["ds_0", "missing"]).await.unwrap();

        assert!(service.versions(DB, "ds_0").await.unwrap().is_empty());
        assert_eq!(service.active_version(DB, "ds_0").await.unwrap(), None);
        assert_eq!(
            repository
                .get_children_keys(&node::units_node(DB))
                .await
                .unwrap(),
            vec!["ds_1"]
        );
    }

    #[tokio::test]
    async fn test_switch_and_load_version() {
        let service = service_with(Arc::new(MemoryRepository::new()), PersistOptions::default());
        service.persist(DB, &units(&[("ds_0", 10)])).await.unwrap();
        service.persist(DB, &units(&[("ds_0", 20)])).await.unwrap();

        let record = service.switch_active_version(DB, "ds_0", "1").await.unwrap();
        assert_eq!(record.previous_active_version.as_deref(), Some("0"));
        assert_eq!(record.next_version, "1");
        assert_eq!(
            service.load_unit(DB, "ds_0").await.unwrap()["ds_0"],
            units(&[("ds_0", 20)])["ds_0"]
        );

        let old = service.load_version(DB, "ds_0", "0").await.unwrap().unwrap();
        assert_eq!(old, units(&[("ds_0", 10)])["ds_0"]);
        assert!(service.load_version(DB, "ds_0", "7").await.unwrap().is_none());

        let err = service
            .switch_active_version(DB, "ds_0", "7")
            .await
            .unwrap_err();
        assert!(matches!(err, UnitError::InvalidVersion { .. }));
    }

    #[tokio::test]
    async fn test_conflicting_writer_detected() {
        let repository = Arc::new(MemoryRepository::new());
        let service = service_with(repository.clone(), PersistOptions::default());
        service.persist(DB, &units(&[("ds_0", 10)])).await.unwrap();

        let racing = Arc::new(RacingRepository {
            inner: repository.clone(),
        });
        let service = DataSourceUnitPersistService::new(racing, translator());
        let err = service
            .persist(DB, &units(&[("ds_0", 20)]))
            .await
            .unwrap_err();
        assert!(matches!(err, UnitError::VersionConflict { ref version, .. } if version == "1"));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_overwrite_mode_replaces_version() {
        let repository = Arc::new(MemoryRepository::new());
        let racing = Arc::new(RacingRepository {
            inner: repository.clone(),
        });
        let service = DataSourceUnitPersistService::with_options(
            racing,
            translator(),
            PersistOptions {
                detect_version_conflicts: false,
            },
        );
        service.persist(DB, &units(&[("ds_0", 20)])).await.unwrap();

        let stored = service.load_version(DB, "ds_0", "0").await.unwrap().unwrap();
        assert_eq!(stored, units(&[("ds_0", 20)])["ds_0"]);
    }

    #[tokio::test]
    async fn test_empty_class_name_rejected_before_any_write() {
        let repository = Arc::new(MemoryRepository::new());
        let service = service_with(repository.clone(), PersistOptions::default());
        let blank = translator().from_configuration(&DataSourceConfiguration::new(
            ConnectionConfiguration::new("", "sqlite:ds_a.db"),
            PoolConfiguration::default(),
        ));
        let mut batch = units(&[("ds_b", 10)]);
        batch.shift_insert(0, "ds_a".to_string(), blank);

        let err = service.persist(DB, &batch).await.unwrap_err();
        assert!(matches!(err, UnitError::InvalidInput { ref message } if message.contains("ds_a")));
        assert!(repository.is_empty().await);

        // Valid units stay readable
        service.persist(DB, &units(&[("ds_b", 10)])).await.unwrap();
        assert_eq!(service.load(DB).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unit_names_must_be_single_segments() {
        let repository = Arc::new(MemoryRepository::new());
        let service = service_with(repository.clone(), PersistOptions::default());

        for name in ["tenant/ds_0", ""] {
            let err = service
                .persist_config(DB, &units(&[(name, 10)]))
                .await
                .unwrap_err();
            assert!(matches!(err, UnitError::InvalidInput { .. }));
        }
        assert!(repository.is_empty().await);

        service.persist(DB, &units(&[("ds_0", 10)])).await.unwrap();
        assert!(matches!(
            service.delete(DB, ["ds_0", "tenant/ds_0"]).await,
            Err(UnitError::InvalidInput { .. })
        ));
        assert_eq!(service.load_unit(DB, "ds_0").await.unwrap().len(), 1);
        assert!(matches!(
            service.switch_active_version(DB, "", "0").await,
            Err(UnitError::InvalidInput { .. })
        ));
    }

    /// Repository where another writer always claims a version first.
    struct RacingRepository {
        inner: Arc<MemoryRepository>,
    }

    #[async_trait::async_trait]
    impl PersistRepository for RacingRepository {
        async fn get_directly(&self, key: &str) -> UnitResult<Option<String>> {
            self.inner.get_directly(key).await
        }

        async fn get_children_keys(&self, key: &str) -> UnitResult<Vec<String>> {
            let children = self.inner.get_children_keys(key).await?;
            if key.ends_with("/versions") {
                let competitor = format!("{}/{}", key, children.len());
                self.inner.persist(&competitor, "competitor").await?;
            }
            Ok(children)
        }

        async fn persist(&self, key: &str, value: &str) -> UnitResult<()> {
            self.inner.persist(key, value).await
        }

        async fn persist_if_absent(&self, key: &str, value: &str) -> UnitResult<bool> {
            self.inner.persist_if_absent(key, value).await
        }

        async fn delete(&self, key: &str) -> UnitResult<()> {
            self.inner.delete(key).await
        }
    }
}
