//! A thin demo front end: load a declared schema and an optional config
//! file, open the store, and either apply the schema or print stats.
//! This is not the engine's API surface — embedders link
//! `reactive-storage`/`reactive-dispatch` directly.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reactive_core::config::EngineConfig;
use reactive_core::schema::Schema;
use reactive_storage::migrator::MigrationRules;
use reactive_storage::StorageEngine;

#[derive(Parser)]
#[command(name = "reactive-cli", about = "Demo front end for the reactive-engine storage engine")]
struct Cli {
    /// Path to the SQLite file backing the store.
    #[arg(long, default_value = "store.sqlite3")]
    store: PathBuf,

    /// Path to a JSON schema declaration.
    #[arg(long)]
    schema: PathBuf,

    /// Path to an optional TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile the schema and apply any pending migration.
    ApplySchema,
    /// Print row counts for every managed table and refresh the
    /// telemetry snapshot.
    Stats,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_toml(&std::fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };

    let schema_text = std::fs::read_to_string(&cli.schema)?;
    let schema: Schema = serde_json::from_str(&schema_text)?;

    let telemetry_dir = PathBuf::from(&config.storage.telemetry_dir);
    std::fs::create_dir_all(&telemetry_dir)?;

    let engine = StorageEngine::open(&cli.store, &schema, &MigrationRules::new(), Some(&telemetry_dir))?;

    match cli.command {
        Command::ApplySchema => {
            let plan = engine.apply_schema(&schema, &MigrationRules::new())?;
            println!("applied {} action(s)", plan.actions.len());
        }
        Command::Stats => {
            for name in engine.schema().tables.keys() {
                let count = engine.count(name, &serde_json::json!({}))?;
                println!("{name}: {count} row(s)");
            }
            engine.write_telemetry_snapshot()?;
            println!("telemetry snapshot written to {}", telemetry_dir.join("dbstat.sqlite3").display());
        }
    }

    engine.close()?;
    Ok(())
}
