//! YAML encoding of stored storage unit versions.
//!
//! A version node holds the flattened connection, pool and custom properties
//! of a unit, keyed by native name, in insertion order.

use crate::error::{UnitError, UnitResult};
use crate::models::CanonicalProperties;
use crate::models::Properties;
use crate::models::synonym::DATA_SOURCE_CLASS_NAME;
use crate::translate::PropertiesTranslator;
use serde_json::Value;

pub fn encode(props: &CanonicalProperties) -> UnitResult<String> {
    Ok(serde_yaml::to_string(&props.all_local_properties())?)
}

/// Decode the value stored at `node`.
///
/// The pool implementation is read from `dataSourceClassName`.
pub fn decode(
    translator: &PropertiesTranslator,
    node: &str,
    text: &str,
) -> UnitResult<CanonicalProperties> {
    let props: Properties =
        serde_yaml::from_str(text).map_err(|e| UnitError::decoding(node, e.to_string()))?;
    let implementation_id = match props.get(DATA_SOURCE_CLASS_NAME) {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        _ => {
            return Err(UnitError::decoding(
                node,
                format!("missing {}", DATA_SOURCE_CLASS_NAME),
            ));
        }
    };
    Ok(translator.create(&implementation_id, props))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConnectionConfiguration, DataSourceConfiguration, PoolConfiguration};
    use crate::pool::{DescriptorRegistry, POSTGRES_POOL_ID};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn translator() -> PropertiesTranslator {
        PropertiesTranslator::new(Arc::new(DescriptorRegistry::with_defaults()))
    }

    #[test]
    fn test_encode_uses_native_names_in_order() {
        let config = DataSourceConfiguration::new(
            ConnectionConfiguration::new(POSTGRES_POOL_ID, "postgres://db/orders")
                .with_credentials("app", "secret"),
            PoolConfiguration {
                max_pool_size: Some(20),
                read_only: Some(true),
                ..PoolConfiguration::default()
            },
        );
        let text = encode(&translator().from_configuration(&config)).unwrap();
        let keys: Vec<&str> = text
            .lines()
            .filter_map(|line| line.split(':').next())
            .collect();
        assert_eq!(
            keys,
            vec![
                "dataSourceClassName",
                "url",
                "username",
                "password",
                "max_connections",
                "read_only"
            ]
        );
        assert!(text.contains("max_connections: 20"));
    }

    #[test]
    fn test_decode_round_trip() {
        let translator = translator();
        let mut pool = PoolConfiguration {
            connection_timeout_milliseconds: Some(2_500),
            min_pool_size: Some(2),
            ..PoolConfiguration::default()
        };
        pool.custom_properties
            .insert("statement_cache_capacity".to_string(), 64.into());
        let config = DataSourceConfiguration::new(
            ConnectionConfiguration::new(POSTGRES_POOL_ID, "postgres://db/orders"),
            pool,
        );
        let props = translator.from_configuration(&config);

        let decoded = decode(&translator, "/n", &encode(&props).unwrap()).unwrap();
        assert_eq!(decoded, props);
        assert_eq!(PropertiesTranslator::to_configuration(&decoded), config);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode(&translator(), "/n/versions/0", "- not\n- a map\n").unwrap_err();
        assert!(matches!(err, UnitError::Decoding { ref node, .. } if node == "/n/versions/0"));

        let err = decode(&translator(), "/n", "url: sqlite:a.db\n").unwrap_err();
        assert!(err.to_string().contains(DATA_SOURCE_CLASS_NAME));
    }
}
