//! Structured data source configuration.
//!
//! This is the externally owned shape of a storage unit's configuration: a
//! connection section and a pool section with an open bag of custom
//! properties. Field names follow the standard property keys.

use super::synonym::Properties;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceConfiguration {
    pub connection: ConnectionConfiguration,
    #[serde(default)]
    pub pool: PoolConfiguration,
}

impl DataSourceConfiguration {
    pub fn new(connection: ConnectionConfiguration, pool: PoolConfiguration) -> Self {
        Self { connection, pool }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfiguration {
    /// Pool implementation identifier, e.g. `sqlx::postgres::PgPool`.
    pub data_source_class_name: String,
    /// Contains credentials when the URL embeds them - never log unmasked
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ConnectionConfiguration {
    pub fn new(data_source_class_name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            data_source_class_name: data_source_class_name.into(),
            url: url.into(),
            username: None,
            password: None,
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Get a display-safe version of the URL (credentials masked).
    pub fn masked_url(&self) -> String {
        match Url::parse(&self.url) {
            Ok(mut url) if url.password().is_some() => {
                if url.set_password(Some("****")).is_ok() {
                    return url.to_string();
                }
                self.url.clone()
            }
            Ok(_) => self.url.clone(),
            Err(_) => {
                // Simple masking for URLs the parser rejects
                if let Some(at_pos) = self.url.find('@') {
                    if let Some(colon_pos) = self.url[..at_pos].rfind(':') {
                        let prefix = &self.url[..colon_pos + 1];
                        let suffix = &self.url[at_pos..];
                        return format!("{}****{}", prefix, suffix);
                    }
                }
                self.url.clone()
            }
        }
    }

    /// Copy of this configuration that is safe to print.
    pub fn masked(&self) -> Self {
        Self {
            url: self.masked_url(),
            password: self.password.as_ref().map(|_| "****".to_string()),
            ..self.clone()
        }
    }
}

/// Pool settings. `None` defers to the pool implementation's own default.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_timeout_milliseconds: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_timeout_milliseconds: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_lifetime_milliseconds: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pool_size: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_pool_size: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub custom_properties: Properties,
}
