//! Repository paths of storage unit configuration.
//!
//! ```text
//! /metadata/{database}/datasources/units/{unit}/versions/{version}
//! /metadata/{database}/datasources/units/{unit}/active_version
//! ```

/// Version id of the first stored configuration of a unit.
pub const DEFAULT_VERSION: &str = "0";

const ROOT_NODE: &str = "metadata";
const UNITS_NODE: &str = "datasources/units";
const VERSIONS_NODE: &str = "versions";
const ACTIVE_VERSION_NODE: &str = "active_version";

/// Parent of every unit of a database.
pub fn units_node(database: &str) -> String {
    format!("/{}/{}/{}", ROOT_NODE, database, UNITS_NODE)
}

pub fn unit_node(database: &str, unit: &str) -> String {
    format!("{}/{}", units_node(database), unit)
}

pub fn versions_node(database: &str, unit: &str) -> String {
    format!("{}/{}", unit_node(database, unit), VERSIONS_NODE)
}

pub fn version_node(database: &str, unit: &str, version: &str) -> String {
    format!("{}/{}", versions_node(database, unit), version)
}

pub fn active_version_node(database: &str, unit: &str) -> String {
    format!("{}/{}", unit_node(database, unit), ACTIVE_VERSION_NODE)
}
