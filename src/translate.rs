//! Translation between structured configurations, live pools and canonical
//! properties.
//!
//! Structured configurations and canonical properties are the two shapes a
//! storage unit's configuration takes. Live pool instances are read through the
//! descriptor registry so that runtime state and implementation defaults never
//! reach the canonical form.

use crate::models::synonym::{
    CONNECTION_TIMEOUT_MILLISECONDS, DATA_SOURCE_CLASS_NAME, IDLE_TIMEOUT_MILLISECONDS,
    MAX_LIFETIME_MILLISECONDS, MAX_POOL_SIZE, MIN_POOL_SIZE, PASSWORD, READ_ONLY, URL, USERNAME,
};
use crate::models::{
    CanonicalProperties, ConnectionConfiguration, DataSourceConfiguration, PoolConfiguration,
    Properties, PropertyCategory,
};
use crate::pool::{DescriptorRegistry, PoolInstance};
use indexmap::IndexMap;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Converts storage unit configurations into canonical properties and back.
#[derive(Debug, Clone)]
pub struct PropertiesTranslator {
    registry: Arc<DescriptorRegistry>,
}

impl PropertiesTranslator {
    pub fn new(registry: Arc<DescriptorRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<DescriptorRegistry> {
        &self.registry
    }

    /// Build canonical properties for an implementation from a flat property map.
    pub fn create(&self, implementation_id: &str, props: Properties) -> CanonicalProperties {
        let synonyms = self.registry.property_synonyms(implementation_id);
        CanonicalProperties::new(implementation_id, props, &synonyms)
    }

    /// Canonicalize a structured configuration.
    ///
    /// Unset fields are left out. Custom properties never override a standard
    /// key, whether named by its standard name or by the implementation's alias.
    pub fn from_configuration(&self, config: &DataSourceConfiguration) -> CanonicalProperties {
        let connection = &config.connection;
        let pool = &config.pool;

        let mut props = Properties::new();
        props.insert(
            DATA_SOURCE_CLASS_NAME.to_string(),
            Value::from(connection.data_source_class_name.as_str()),
        );
        props.insert(URL.to_string(), Value::from(connection.url.as_str()));
        insert_some(&mut props, USERNAME, connection.username.as_deref());
        insert_some(&mut props, PASSWORD, connection.password.as_deref());
        insert_some(
            &mut props,
            CONNECTION_TIMEOUT_MILLISECONDS,
            pool.connection_timeout_milliseconds,
        );
        insert_some(&mut props, IDLE_TIMEOUT_MILLISECONDS, pool.idle_timeout_milliseconds);
        insert_some(&mut props, MAX_LIFETIME_MILLISECONDS, pool.max_lifetime_milliseconds);
        insert_some(&mut props, MAX_POOL_SIZE, pool.max_pool_size);
        insert_some(&mut props, MIN_POOL_SIZE, pool.min_pool_size);
        insert_some(&mut props, READ_ONLY, pool.read_only);

        let implementation_id = connection.data_source_class_name.as_str();
        let synonyms = self.registry.property_synonyms(implementation_id);
        for (key, value) in &pool.custom_properties {
            if is_standard_key(key) || synonyms.values().any(|native| native == key) {
                debug!(key = %key, "Dropping custom property shadowing a standard key");
                continue;
            }
            props.insert(key.clone(), value.clone());
        }

        CanonicalProperties::new(implementation_id, props, &synonyms)
    }

    /// Canonicalize every configuration; on duplicate names the first entry wins.
    pub fn from_configurations<'a, N, I>(&self, configs: I) -> IndexMap<String, CanonicalProperties>
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, &'a DataSourceConfiguration)>,
    {
        let mut result = IndexMap::new();
        for (name, config) in configs {
            result
                .entry(name.into())
                .or_insert_with(|| self.from_configuration(config));
        }
        result
    }

    /// Canonicalize a live pool.
    ///
    /// A decorating wrapper is unwrapped first. When the implementation has a
    /// descriptor, transient fields and values equal to the implementation's
    /// defaults are dropped. Null values are always kept.
    pub fn from_instance(&self, instance: &dyn PoolInstance) -> CanonicalProperties {
        let instance = instance.delegate().unwrap_or(instance);
        let implementation_id = instance.implementation_id();
        let raw = instance.properties();

        let props = match self.registry.find(implementation_id) {
            Some(descriptor) => {
                let transient = descriptor.transient_field_names();
                let skipped = descriptor.skipped_properties();
                raw.into_iter()
                    .filter(|(key, _)| !transient.contains(&key.as_str()))
                    .filter(|(key, value)| {
                        value.is_null() || skipped.get(key).is_none_or(|default| default != value)
                    })
                    .collect()
            }
            None => raw,
        };

        self.create(implementation_id, props)
    }

    /// Canonicalize every live pool; on duplicate names the first entry wins.
    pub fn from_instances<'a, N, P, I>(&self, instances: I) -> IndexMap<String, CanonicalProperties>
    where
        N: Into<String>,
        P: PoolInstance + 'a,
        I: IntoIterator<Item = (N, &'a P)>,
    {
        let mut result = IndexMap::new();
        for (name, instance) in instances {
            let name = name.into();
            if !result.contains_key(&name) {
                let props = self.from_instance(instance);
                result.insert(name, props);
            }
        }
        result
    }

    /// Rebuild a structured configuration from canonical properties.
    ///
    /// Pool values are parsed from their textual form; values that do not parse
    /// as the target type are treated as unset.
    pub fn to_configuration(props: &CanonicalProperties) -> DataSourceConfiguration {
        let conn = props.connection_properties();
        let pool = props.pool_properties();

        let connection = ConnectionConfiguration {
            data_source_class_name: conn
                .get(DATA_SOURCE_CLASS_NAME)
                .map(stringify)
                .unwrap_or_else(|| props.pool_implementation_id().to_string()),
            url: conn.get(URL).map(stringify).unwrap_or_default(),
            username: conn.get(USERNAME).map(stringify),
            password: conn.get(PASSWORD).map(stringify),
        };

        let pool = PoolConfiguration {
            connection_timeout_milliseconds: pool
                .get(CONNECTION_TIMEOUT_MILLISECONDS)
                .and_then(parse_number),
            idle_timeout_milliseconds: pool.get(IDLE_TIMEOUT_MILLISECONDS).and_then(parse_number),
            max_lifetime_milliseconds: pool.get(MAX_LIFETIME_MILLISECONDS).and_then(parse_number),
            max_pool_size: pool.get(MAX_POOL_SIZE).and_then(parse_number),
            min_pool_size: pool.get(MIN_POOL_SIZE).and_then(parse_number),
            read_only: pool.get(READ_ONLY).and_then(parse_bool),
            custom_properties: props.custom_properties().properties().clone(),
        };

        DataSourceConfiguration::new(connection, pool)
    }

    /// Rebuild every structured configuration, preserving order.
    pub fn to_configurations(
        props: &IndexMap<String, CanonicalProperties>,
    ) -> IndexMap<String, DataSourceConfiguration> {
        props
            .iter()
            .map(|(name, props)| (name.clone(), Self::to_configuration(props)))
            .collect()
    }
}

fn is_standard_key(key: &str) -> bool {
    PropertyCategory::Connection.is_standard_key(key) || PropertyCategory::Pool.is_standard_key(key)
}

fn insert_some<T: Into<Value>>(props: &mut Properties, key: &str, value: Option<T>) {
    if let Some(value) = value {
        props.insert(key.to_string(), value.into());
    }
}

/// Textual form of a property value.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_number<T: FromStr>(value: &Value) -> Option<T> {
    stringify(value).parse().ok()
}

/// Parse a boolean property; only `true`/`false` (any case) are accepted.
pub(crate) fn parse_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Null => None,
        other => {
            let text = stringify(other);
            if text.eq_ignore_ascii_case("true") {
                Some(true)
            } else if text.eq_ignore_ascii_case("false") {
                Some(false)
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::descriptor::{NATIVE_MAX_CONNECTIONS, PoolTypeDescriptor};
    use crate::pool::{CatalogSwitchablePool, MYSQL_POOL_ID, POSTGRES_POOL_ID};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const FIXTURE_POOL_ID: &str = "fixture::Pool";

    struct FixtureDescriptor;

    impl PoolTypeDescriptor for FixtureDescriptor {
        fn implementation_id(&self) -> &str {
            FIXTURE_POOL_ID
        }

        fn transient_field_names(&self) -> &[&str] {
            &["active"]
        }

        fn skipped_properties(&self) -> Properties {
            [("foo".to_string(), json!("bar"))].into_iter().collect()
        }
    }

    struct FixturePool {
        props: Properties,
    }

    impl FixturePool {
        fn new(entries: Value) -> Self {
            let props = match entries {
                Value::Object(map) => map.into_iter().collect(),
                _ => Properties::new(),
            };
            Self { props }
        }
    }

    impl PoolInstance for FixturePool {
        fn implementation_id(&self) -> &str {
            FIXTURE_POOL_ID
        }

        fn properties(&self) -> Properties {
            self.props.clone()
        }
    }

    fn translator() -> PropertiesTranslator {
        let mut registry = DescriptorRegistry::with_defaults();
        registry.register(FixtureDescriptor);
        PropertiesTranslator::new(Arc::new(registry))
    }

    fn full_configuration() -> DataSourceConfiguration {
        let mut pool = PoolConfiguration {
            connection_timeout_milliseconds: Some(30_000),
            idle_timeout_milliseconds: Some(60_000),
            max_lifetime_milliseconds: Some(1_800_000),
            max_pool_size: Some(50),
            min_pool_size: Some(1),
            read_only: Some(false),
            ..PoolConfiguration::default()
        };
        pool.custom_properties
            .insert("test_before_acquire".to_string(), json!(false));
        DataSourceConfiguration::new(
            ConnectionConfiguration::new(MYSQL_POOL_ID, "mysql://127.0.0.1:3306/demo_ds")
                .with_credentials("root", "root"),
            pool,
        )
    }

    #[test]
    fn test_configuration_round_trip() {
        let config = full_configuration();
        let props = translator().from_configuration(&config);
        assert_eq!(PropertiesTranslator::to_configuration(&props), config);
    }

    #[test]
    fn test_from_configuration_uses_descriptor_synonyms() {
        let props = translator().from_configuration(&full_configuration());
        assert_eq!(props.pool_implementation_id(), MYSQL_POOL_ID);
        assert_eq!(
            props.pool_properties().local_properties()[NATIVE_MAX_CONNECTIONS],
            json!(50)
        );
        assert_eq!(props.pool_properties().get(MAX_POOL_SIZE), Some(&json!(50)));
    }

    #[test]
    fn test_custom_property_never_shadows_standard_key() {
        let mut config = full_configuration();
        config
            .pool
            .custom_properties
            .insert(MAX_POOL_SIZE.to_string(), json!(99));
        let props = translator().from_configuration(&config);

        assert_eq!(props.pool_properties().get(MAX_POOL_SIZE), Some(&json!(50)));
        assert!(props.custom_properties().get(MAX_POOL_SIZE).is_none());
        assert_eq!(
            props.custom_properties().get("test_before_acquire"),
            Some(&json!(false))
        );
    }

    #[test]
    fn test_custom_property_never_shadows_native_alias() {
        let mut config = full_configuration();
        config.pool.max_pool_size = None;
        config
            .pool
            .custom_properties
            .insert(NATIVE_MAX_CONNECTIONS.to_string(), json!(7));
        let props = translator().from_configuration(&config);

        assert_eq!(props.pool_properties().get(MAX_POOL_SIZE), None);
        assert!(props.custom_properties().get(NATIVE_MAX_CONNECTIONS).is_none());

        config.pool.custom_properties.shift_remove(NATIVE_MAX_CONNECTIONS);
        assert_eq!(PropertiesTranslator::to_configuration(&props), config);
    }

    #[test]
    fn test_skip_default_filtering() {
        let translator = translator();

        let default_only = FixturePool::new(json!({"foo": "bar"}));
        let props = translator.from_instance(&default_only);
        assert!(props.custom_properties().is_empty());

        let overridden = FixturePool::new(json!({"foo": "baz"}));
        let props = translator.from_instance(&overridden);
        assert_eq!(props.custom_properties().get("foo"), Some(&json!("baz")));
    }

    #[test]
    fn test_transient_fields_dropped_and_nulls_kept() {
        let pool = FixturePool::new(json!({
            "url": "jdbc:fixture://h/db",
            "active": 3,
            "foo": null,
        }));
        let props = translator().from_instance(&pool);

        assert_eq!(
            props.connection_properties().get(URL),
            Some(&json!("jdbc:fixture://h/db"))
        );
        assert!(props.custom_properties().get("active").is_none());
        assert_eq!(props.custom_properties().get("foo"), Some(&Value::Null));
    }

    #[test]
    fn test_unknown_implementation_keeps_everything() {
        struct Unregistered;
        impl PoolInstance for Unregistered {
            fn implementation_id(&self) -> &str {
                "vendor::Pool"
            }
            fn properties(&self) -> Properties {
                [("foo".to_string(), json!("bar"))].into_iter().collect()
            }
        }

        let props = translator().from_instance(&Unregistered);
        assert_eq!(props.pool_implementation_id(), "vendor::Pool");
        assert_eq!(props.custom_properties().get("foo"), Some(&json!("bar")));
    }

    #[test]
    fn test_catalog_wrapper_is_unwrapped() {
        let wrapped = CatalogSwitchablePool::new(
            "orders",
            FixturePool::new(json!({"url": "jdbc:fixture://h/orders"})),
        );
        let props = translator().from_instance(&wrapped);
        assert_eq!(props.pool_implementation_id(), FIXTURE_POOL_ID);
        assert_eq!(
            props.connection_properties().get(DATA_SOURCE_CLASS_NAME),
            Some(&json!(FIXTURE_POOL_ID))
        );
    }

    #[test]
    fn test_malformed_pool_values_degrade_to_unset() {
        let props = translator().create(
            POSTGRES_POOL_ID,
            [
                (URL.to_string(), json!("postgres://h/db")),
                (MAX_POOL_SIZE.to_string(), json!("lots")),
                (CONNECTION_TIMEOUT_MILLISECONDS.to_string(), json!("2500")),
                (MIN_POOL_SIZE.to_string(), json!(" 2")),
                (READ_ONLY.to_string(), json!("TRUE")),
            ]
            .into_iter()
            .collect(),
        );
        let config = PropertiesTranslator::to_configuration(&props);

        assert_eq!(config.connection.data_source_class_name, POSTGRES_POOL_ID);
        assert_eq!(config.pool.max_pool_size, None);
        assert_eq!(config.pool.min_pool_size, None);
        assert_eq!(config.pool.connection_timeout_milliseconds, Some(2500));
        assert_eq!(config.pool.read_only, Some(true));
    }

    #[test]
    fn test_pool_size_overflow_is_unset() {
        let props = translator().create(
            POSTGRES_POOL_ID,
            [(MAX_POOL_SIZE.to_string(), json!(i64::from(i32::MAX) + 1))]
                .into_iter()
                .collect(),
        );
        let config = PropertiesTranslator::to_configuration(&props);
        assert_eq!(config.pool.max_pool_size, None);
        assert_eq!(config.connection.url, "");
    }

    #[test]
    fn test_batch_forms_first_entry_wins() {
        let translator = translator();
        let first = full_configuration();
        let mut second = full_configuration();
        second.connection.url = "mysql://127.0.0.1:3306/other".to_string();

        let props = translator.from_configurations([
            ("ds_0", &first),
            ("ds_1", &second),
            ("ds_0", &second),
        ]);
        let names: Vec<&str> = props.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["ds_0", "ds_1"]);
        assert_eq!(
            props["ds_0"].connection_properties().get(URL),
            Some(&json!("mysql://127.0.0.1:3306/demo_ds"))
        );

        let configs = PropertiesTranslator::to_configurations(&props);
        assert_eq!(configs["ds_1"], second);

        let a = FixturePool::new(json!({"foo": "a"}));
        let b = FixturePool::new(json!({"foo": "b"}));
        let props = translator.from_instances([("ds_0", &a), ("ds_0", &b)]);
        assert_eq!(props.len(), 1);
        assert_eq!(props["ds_0"].custom_properties().get("foo"), Some(&json!("a")));
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool(&json!(true)), Some(true));
        assert_eq!(parse_bool(&json!("False")), Some(false));
        assert_eq!(parse_bool(&json!("yes")), None);
        assert_eq!(parse_bool(&json!(1)), None);
        assert_eq!(parse_bool(&Value::Null), None);
    }
}
