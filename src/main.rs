//! DB Adapter - command-line entry point.
//!
//! Opens the configured master/slave topology and runs one introspection command
//! or statement, printing the outcome as JSON on stdout.

use clap::Parser;
use db_adapter::config::{Command, Config};
use db_adapter::db::{Adapter, FetchMode, Fetched, MySqlDriver, RandomSelector};
use db_adapter::error::DbResult;
use serde_json::{Value as JsonValue, json};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    // stdout carries the command output
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

fn run(config: &Config) -> DbResult<JsonValue> {
    let adapter_config = config.adapter_config()?;
    let driver = MySqlDriver::new()?;

    info!(
        slaves = adapter_config.slave.len(),
        replication = adapter_config.replication_enabled(),
        "Starting db-adapter v{}",
        env!("CARGO_PKG_VERSION")
    );

    let mut adapter = match config.seed {
        Some(seed) => Adapter::with_selector(driver, adapter_config, RandomSelector::seeded(seed)),
        None => Adapter::new(driver, adapter_config),
    };

    let output = match &config.command {
        Command::Tables => json!(adapter.tables()?),
        Command::Describe { table } => json!(adapter.describe(table)?),
        Command::CreateSql { table } => json!(adapter.create_table_sql(table)?),
        Command::Query { sql, slave } => {
            let mut result = adapter.query(sql, !slave)?;
            if result.has_rows() {
                let rows: Vec<JsonValue> = result
                    .fetch_mode(FetchMode::Assoc)
                    .into_iter()
                    .filter_map(|row| match row {
                        Fetched::Assoc(map) => Some(JsonValue::Object(map)),
                        Fetched::Object(_) => None,
                    })
                    .collect();
                json!(rows)
            } else {
                json!({
                    "affected_rows": result.affected_rows(),
                    "last_insert_id": result.last_insert_id(),
                })
            }
        }
    };

    adapter.disconnect()?;
    Ok(output)
}

fn main() {
    // Parse configuration from command line and environment
    let config = Config::parse();

    // Initialize logging
    init_tracing(&config);

    match run(&config) {
        Ok(output) => match serde_json::to_string_pretty(&output) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                error!(error = %e, "Failed to render output");
                std::process::exit(1);
            }
        },
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {}", e);
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Hint: {}", suggestion);
            }
            std::process::exit(1);
        }
    }
}
