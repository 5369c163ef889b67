//! Configuration handling for the storage unit configuration tool.
//!
//! This module provides configuration management via CLI arguments and environment variables.

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_REPOSITORY_URL: &str = "sqlite:storage-units.db";
pub const DEFAULT_DATABASE_NAME: &str = "logic_db";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

// Pool defaults of the sqlx pool implementations
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_MAX_CONNECTIONS_SQLITE: u32 = 1;
pub const DEFAULT_MIN_CONNECTIONS: u32 = 0;
pub const DEFAULT_ACQUIRE_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 600_000;
pub const DEFAULT_MAX_LIFETIME_MS: u64 = 1_800_000;
pub const DEFAULT_TEST_BEFORE_ACQUIRE: bool = true;

/// Persistence settings for the versioned storage unit service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersistOptions {
    /// Write version nodes and the first active pointer conditionally, failing
    /// with a version conflict when another writer got there first.
    pub detect_version_conflicts: bool,
}

impl Default for PersistOptions {
    fn default() -> Self {
        Self {
            detect_version_conflicts: true,
        }
    }
}

/// Operations on the storage units of one logical database.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Validate and persist the storage units described in a YAML file
    Register {
        /// YAML mapping of unit name to data source configuration
        #[arg(short, long, value_name = "PATH")]
        file: PathBuf,

        /// Persist without checking that every unit accepts connections
        #[arg(long)]
        skip_validation: bool,
    },

    /// Check that every unit in a YAML file accepts connections
    Validate {
        #[arg(short, long, value_name = "PATH")]
        file: PathBuf,
    },

    /// Print the active configuration of every unit (or one unit)
    Show {
        #[arg(short, long)]
        unit: Option<String>,
    },

    /// List the stored versions of a unit
    Versions {
        #[arg(short, long)]
        unit: String,
    },

    /// Point a unit at one of its stored versions
    Activate {
        #[arg(short, long)]
        unit: String,

        #[arg(short, long)]
        version: String,
    },

    /// Remove units together with their whole version history
    Unregister {
        #[arg(short, long = "unit", required = true, value_delimiter = ',')]
        units: Vec<String>,
    },

    /// Open the active units and print the properties read back from the live pools
    Inspect {
        #[arg(short, long)]
        unit: Option<String>,
    },
}

/// Storage unit configuration CLI.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "storage-unit-config",
    about = "Canonicalize, validate and version storage unit pool configurations",
    version,
    author
)]
pub struct Config {
    /// SQLite URL of the versioned configuration repository
    #[arg(
        long,
        value_name = "URL",
        default_value = DEFAULT_REPOSITORY_URL,
        env = "SUC_REPOSITORY"
    )]
    pub repository: String,

    /// Logical database owning the storage units
    #[arg(
        short,
        long,
        default_value = DEFAULT_DATABASE_NAME,
        env = "SUC_DATABASE"
    )]
    pub database: String,

    /// Per-unit connection timeout in seconds used by validation
    #[arg(
        long,
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS,
        env = "SUC_CONNECT_TIMEOUT"
    )]
    pub connect_timeout: u64,

    /// Overwrite version nodes instead of failing on a concurrent writer
    #[arg(long, env = "SUC_ALLOW_VERSION_OVERWRITE")]
    pub allow_version_overwrite: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "SUC_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "SUC_JSON_LOGS")]
    pub json_logs: bool,

    /// Enable logging output on stderr (disabled by default to keep output machine-readable)
    #[arg(long, env = "SUC_ENABLE_LOGS")]
    pub enable_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            repository: DEFAULT_REPOSITORY_URL.to_string(),
            database: DEFAULT_DATABASE_NAME.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            allow_version_overwrite: false,
            log_level: "info".to_string(),
            json_logs: false,
            enable_logs: false,
            command: Command::Show { unit: None },
        }
    }

    /// Get the connection timeout as a Duration.
    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    pub fn persist_options(&self) -> PersistOptions {
        PersistOptions {
            detect_version_conflicts: !self.allow_version_overwrite,
        }
    }
}
