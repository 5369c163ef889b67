//! Storage unit configuration CLI - Main entry point.
//!
//! Registers, validates, lists and rolls back the pool configurations of the
//! storage units of one logical database.

use clap::Parser;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use storage_unit_config::config::{Command, Config};
use storage_unit_config::error::{UnitError, UnitResult};
use storage_unit_config::models::DataSourceConfiguration;
use storage_unit_config::models::synonym::PASSWORD;
use storage_unit_config::pool::{
    DescriptorRegistry, SqlxPoolConnector, StorageResourceWithProperties,
};
use storage_unit_config::repository::SqliteRepository;
use storage_unit_config::{DataSourceUnitPersistService, PropertiesTranslator, ValidationGate};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    if !config.enable_logs {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Read a YAML mapping of unit name to data source configuration.
fn read_units(path: &Path) -> UnitResult<IndexMap<String, DataSourceConfiguration>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        UnitError::invalid_input(format!("Cannot read {}: {}", path.display(), e))
    })?;
    serde_yaml::from_str(&text).map_err(|e| {
        UnitError::invalid_input(format!("Invalid units file {}: {}", path.display(), e))
    })
}

fn print_yaml<T: Serialize>(value: &T) -> UnitResult<()> {
    print!("{}", serde_yaml::to_string(value)?);
    Ok(())
}

fn masked(
    configs: IndexMap<String, DataSourceConfiguration>,
) -> IndexMap<String, DataSourceConfiguration> {
    configs
        .into_iter()
        .map(|(name, mut config)| {
            config.connection = config.connection.masked();
            (name, config)
        })
        .collect()
}

async fn run(config: &Config) -> UnitResult<()> {
    let translator = PropertiesTranslator::new(Arc::new(DescriptorRegistry::with_defaults()));
    let repository = Arc::new(SqliteRepository::connect(&config.repository).await?);
    let service = DataSourceUnitPersistService::with_options(
        repository.clone(),
        translator.clone(),
        config.persist_options(),
    );
    let gate = ValidationGate::new(
        Arc::new(SqlxPoolConnector::new()),
        config.connect_timeout_duration(),
    );
    let database = config.database.as_str();

    let result = match &config.command {
        Command::Register {
            file,
            skip_validation,
        } => {
            let units = translator.from_configurations(&read_units(file)?);
            if *skip_validation {
                info!(count = units.len(), "Skipping storage unit validation");
            } else {
                gate.validate(&units).await?;
            }
            let records = service.persist_config(database, &units).await?;
            print_yaml(&records)
        }
        Command::Validate { file } => {
            let units = translator.from_configurations(&read_units(file)?);
            gate.validate(&units).await?;
            println!("{} storage unit(s) valid", units.len());
            Ok(())
        }
        Command::Show { unit } => {
            let units = match unit {
                Some(name) => service.load_unit(database, name).await?,
                None => service.load(database).await?,
            };
            print_yaml(&masked(PropertiesTranslator::to_configurations(&units)))
        }
        Command::Versions { unit } => {
            let versions = service.versions(database, unit).await?;
            let active = service.active_version(database, unit).await?;
            for version in versions {
                let marker = if active.as_deref() == Some(version.as_str()) {
                    " (active)"
                } else {
                    ""
                };
                println!("{}{}", version, marker);
            }
            Ok(())
        }
        Command::Activate { unit, version } => {
            let record = service.switch_active_version(database, unit, version).await?;
            print_yaml(&record)
        }
        Command::Unregister { units } => {
            service.delete(database, units).await?;
            println!("Removed {} storage unit(s)", units.len());
            Ok(())
        }
        Command::Inspect { unit } => inspect(&service, &translator, database, unit.as_deref()).await,
    };

    repository.close().await;
    result
}

/// Open the active units and print the properties read back from the live pools.
async fn inspect(
    service: &DataSourceUnitPersistService,
    translator: &PropertiesTranslator,
    database: &str,
    unit: Option<&str>,
) -> UnitResult<()> {
    let units = match unit {
        Some(name) => service.load_unit(database, name).await?,
        None => service.load(database).await?,
    };

    let connector = SqlxPoolConnector::new();
    let mut pools = Vec::with_capacity(units.len());
    for (name, props) in &units {
        match connector.connect(props).await {
            Ok(pool) => pools.push((name.clone(), pool)),
            Err(e) => {
                for (_, pool) in &pools {
                    pool.close().await;
                }
                return Err(e);
            }
        }
    }
    let resource = StorageResourceWithProperties::new(translator, pools);

    let report: IndexMap<&String, _> = resource
        .properties()
        .iter()
        .map(|(name, props)| {
            let mut local = props.all_local_properties();
            if let Some(value) = local.get_mut(PASSWORD) {
                if !value.is_null() {
                    *value = Value::from("****");
                }
            }
            (name, local)
        })
        .collect();
    let printed = print_yaml(&report);

    resource.close().await;
    printed
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    // Initialize logging
    init_tracing(&config);

    info!(
        database = %config.database,
        "Starting storage-unit-config v{}",
        env!("CARGO_PKG_VERSION")
    );

    if let Err(e) = run(&config).await {
        error!(error = %e, "Command failed");
        match &e {
            UnitError::InvalidStorageUnits(invalid) => {
                eprintln!("Error: invalid storage units");
                for failure in invalid.failures() {
                    eprintln!("  {}", failure);
                }
            }
            other => {
                eprintln!("Error: {}", other);
                if let Some(suggestion) = other.suggestion() {
                    eprintln!("Suggestion: {}", suggestion);
                }
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
