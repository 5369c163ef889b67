//! Canonical storage unit properties.
//!
//! `CanonicalProperties` is the normalized form of one storage unit's
//! connection and pool configuration: the pool implementation it targets, a
//! connection synonym table, a pool synonym table and the custom overlay of
//! implementation-specific keys.

use super::synonym::{
    DATA_SOURCE_CLASS_NAME, Properties, PropertyCategory, PropertySynonyms, SynonymTable,
};
use serde_json::Value;

/// Implementation-specific properties that belong to neither standard set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CustomProperties {
    properties: Properties,
}

impl CustomProperties {
    /// Collect every key not claimed by one of the synonym tables.
    fn new(props: &Properties, tables: &[&SynonymTable]) -> Self {
        let properties = props
            .iter()
            .filter(|(key, _)| !tables.iter().any(|table| table.claims(key)))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Self { properties }
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalProperties {
    pool_implementation_id: String,
    connection: SynonymTable,
    pool: SynonymTable,
    custom: CustomProperties,
}

impl CanonicalProperties {
    /// Build canonical properties from a flat property map.
    ///
    /// `synonyms` is the implementation's standard -> native alias map. When
    /// `dataSourceClassName` is absent, null or empty it resolves to the
    /// implementation id.
    pub fn new(
        pool_implementation_id: impl Into<String>,
        mut props: Properties,
        synonyms: &PropertySynonyms,
    ) -> Self {
        let pool_implementation_id = pool_implementation_id.into();
        let class_name_set = props
            .get(DATA_SOURCE_CLASS_NAME)
            .is_some_and(|v| !v.is_null() && v.as_str() != Some(""));
        if !class_name_set {
            props.shift_insert(
                0,
                DATA_SOURCE_CLASS_NAME.to_string(),
                Value::String(pool_implementation_id.clone()),
            );
        }

        let connection = SynonymTable::new(PropertyCategory::Connection, &props, synonyms);
        let pool = SynonymTable::new(PropertyCategory::Pool, &props, synonyms);
        let custom = CustomProperties::new(&props, &[&connection, &pool]);

        Self {
            pool_implementation_id,
            connection,
            pool,
            custom,
        }
    }

    pub fn pool_implementation_id(&self) -> &str {
        &self.pool_implementation_id
    }

    pub fn connection_properties(&self) -> &SynonymTable {
        &self.connection
    }

    pub fn pool_properties(&self) -> &SynonymTable {
        &self.pool
    }

    pub fn custom_properties(&self) -> &CustomProperties {
        &self.custom
    }

    /// Connection and pool properties keyed by standard name.
    pub fn all_standard_properties(&self) -> Properties {
        let mut result = self.connection.standard_properties().clone();
        result.extend(
            self.pool
                .standard_properties()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        result
    }

    /// Flattened connection, pool and custom properties keyed by native name.
    ///
    /// This is the persisted shape of a storage unit.
    pub fn all_local_properties(&self) -> Properties {
        let mut result = self.connection.local_properties().clone();
        for table in [self.pool.local_properties(), self.custom.properties()] {
            result.extend(table.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(entries: &[(&str, Value)]) -> Properties {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_splits_connection_pool_and_custom() {
        let canonical = CanonicalProperties::new(
            "sqlx::postgres::PgPool",
            props(&[
                ("url", json!("postgres://localhost/app")),
                ("maxPoolSize", json!(20)),
                ("statement_cache_capacity", json!(100)),
            ]),
            &PropertySynonyms::new(),
        );

        assert_eq!(
            canonical.connection_properties().get("url"),
            Some(&json!("postgres://localhost/app"))
        );
        assert_eq!(canonical.pool_properties().get("maxPoolSize"), Some(&json!(20)));
        assert_eq!(
            canonical.custom_properties().get("statement_cache_capacity"),
            Some(&json!(100))
        );
        assert_eq!(canonical.custom_properties().properties().len(), 1);
    }

    #[test]
    fn test_class_name_defaults_to_implementation_id() {
        let canonical =
            CanonicalProperties::new("custom::Pool", Properties::new(), &PropertySynonyms::new());
        assert_eq!(
            canonical.connection_properties().get(DATA_SOURCE_CLASS_NAME),
            Some(&json!("custom::Pool"))
        );
        let local = canonical.all_local_properties();
        assert_eq!(local.get_index(0).map(|(k, _)| k.as_str()), Some(DATA_SOURCE_CLASS_NAME));
    }

    #[test]
    fn test_empty_class_name_resolves_to_implementation_id() {
        let canonical = CanonicalProperties::new(
            "custom::Pool",
            props(&[(DATA_SOURCE_CLASS_NAME, json!(""))]),
            &PropertySynonyms::new(),
        );
        assert_eq!(
            canonical.connection_properties().get(DATA_SOURCE_CLASS_NAME),
            Some(&json!("custom::Pool"))
        );
    }

    #[test]
    fn test_aliased_native_key_not_custom() {
        let synonyms: PropertySynonyms =
            [("maxPoolSize".to_string(), "max_connections".to_string())]
                .into_iter()
                .collect();
        let canonical =
            CanonicalProperties::new("x", props(&[("max_connections", json!(5))]), &synonyms);
        assert!(canonical.custom_properties().is_empty());
        assert_eq!(canonical.pool_properties().get("maxPoolSize"), Some(&json!(5)));
    }

    #[test]
    fn test_all_standard_properties_covers_both_categories() {
        let canonical = CanonicalProperties::new("x", Properties::new(), &PropertySynonyms::new());
        assert_eq!(canonical.all_standard_properties().len(), 10);
    }
}
