//! Property synonym tables.
//!
//! A synonym table maps the fixed set of standard property keys of one
//! category (connection or pool) onto the native names a pool implementation
//! uses for the same settings. Values are stored under their native names and
//! read back through the standardized view.

use indexmap::IndexMap;
use serde_json::Value;

/// Dynamic property map, keyed by property name in insertion order.
pub type Properties = IndexMap<String, Value>;

/// Alias map from standard key to native key.
pub type PropertySynonyms = IndexMap<String, String>;

pub const DATA_SOURCE_CLASS_NAME: &str = "dataSourceClassName";
pub const URL: &str = "url";
pub const USERNAME: &str = "username";
pub const PASSWORD: &str = "password";

pub const CONNECTION_TIMEOUT_MILLISECONDS: &str = "connectionTimeoutMilliseconds";
pub const IDLE_TIMEOUT_MILLISECONDS: &str = "idleTimeoutMilliseconds";
pub const MAX_LIFETIME_MILLISECONDS: &str = "maxLifetimeMilliseconds";
pub const MAX_POOL_SIZE: &str = "maxPoolSize";
pub const MIN_POOL_SIZE: &str = "minPoolSize";
pub const READ_ONLY: &str = "readOnly";

const CONNECTION_STANDARD_KEYS: [&str; 4] = [DATA_SOURCE_CLASS_NAME, URL, USERNAME, PASSWORD];

const POOL_STANDARD_KEYS: [&str; 6] = [
    CONNECTION_TIMEOUT_MILLISECONDS,
    IDLE_TIMEOUT_MILLISECONDS,
    MAX_LIFETIME_MILLISECONDS,
    MAX_POOL_SIZE,
    MIN_POOL_SIZE,
    READ_ONLY,
];

/// Category of standard properties a synonym table covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyCategory {
    Connection,
    Pool,
}

impl PropertyCategory {
    /// The fixed standard key set for this category.
    pub const fn standard_keys(self) -> &'static [&'static str] {
        match self {
            Self::Connection => &CONNECTION_STANDARD_KEYS,
            Self::Pool => &POOL_STANDARD_KEYS,
        }
    }

    pub fn is_standard_key(self, key: &str) -> bool {
        self.standard_keys().contains(&key)
    }
}

/// Standard/native view over one category of properties.
#[derive(Debug, Clone)]
pub struct SynonymTable {
    category: PropertyCategory,
    /// Standard key -> native key, restricted to this category's keys.
    synonyms: PropertySynonyms,
    /// Values keyed by native name.
    local: Properties,
    /// Every standard key with its resolved value (`Null` when missing).
    standard: Properties,
}

impl SynonymTable {
    /// Build a table from a flat property map.
    ///
    /// A value stored under the standard key takes precedence over one stored
    /// under the native alias.
    pub fn new(category: PropertyCategory, props: &Properties, synonyms: &PropertySynonyms) -> Self {
        let synonyms: PropertySynonyms = synonyms
            .iter()
            .filter(|(standard, _)| category.is_standard_key(standard))
            .map(|(standard, native)| (standard.clone(), native.clone()))
            .collect();

        let mut local = Properties::new();
        let mut standard = Properties::new();
        for key in category.standard_keys() {
            let native = synonyms.get(*key).map(String::as_str).unwrap_or(*key);
            let value = props.get(*key).or_else(|| props.get(native));
            if let Some(value) = value {
                local.insert(native.to_string(), value.clone());
            }
            standard.insert(
                (*key).to_string(),
                value.cloned().unwrap_or(Value::Null),
            );
        }

        Self {
            category,
            synonyms,
            local,
            standard,
        }
    }

    pub fn standard_keys(&self) -> &'static [&'static str] {
        self.category.standard_keys()
    }

    pub fn synonyms(&self) -> &PropertySynonyms {
        &self.synonyms
    }

    /// Native name registered for a standard key (the key itself when unaliased).
    pub fn native_key<'a>(&'a self, standard_key: &'a str) -> &'a str {
        self.synonyms
            .get(standard_key)
            .map(String::as_str)
            .unwrap_or(standard_key)
    }

    /// Every standard key mapped to its resolved value.
    pub fn standard_properties(&self) -> &Properties {
        &self.standard
    }

    /// Stored values keyed by native name.
    pub fn local_properties(&self) -> &Properties {
        &self.local
    }

    /// Resolved value for a standard key; `None` for unknown or unset keys.
    pub fn get(&self, standard_key: &str) -> Option<&Value> {
        self.standard.get(standard_key).filter(|v| !v.is_null())
    }

    /// Whether `key` is claimed by this table, as a standard key or a native alias.
    pub fn claims(&self, key: &str) -> bool {
        self.category.is_standard_key(key) || self.synonyms.values().any(|native| native == key)
    }
}

impl PartialEq for SynonymTable {
    fn eq(&self, other: &Self) -> bool {
        self.category == other.category && self.standard == other.standard
    }
}

impl Eq for SynonymTable {}
