//! vstore CLI
//!
//! Command-line interface for version-namespaced key-value storage.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use vstore_core::{Config, SqliteBackend, Storage, VersionStore};

mod commands;
mod output;
mod prompt;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "vstore")]
#[command(about = "vstore - Version-namespaced key-value storage")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Application version used to namespace keys (overrides config)
    #[arg(short = 'a', long = "app-version", global = true)]
    app_version: Option<String>,

    /// Extra key to store without a version suffix (repeatable)
    #[arg(short, long = "guard", global = true)]
    guard: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a value
    Get {
        key: String,
        /// Value to print when the key is absent
        #[arg(short, long)]
        default: Option<String>,
    },
    /// Store a value (JSON, or a plain string)
    Set { key: String, value: String },
    /// Guard a key and store a value under it without a version suffix
    SetDirect { key: String, value: String },
    /// Check whether a key holds a value
    Has { key: String },
    /// Remove a value
    #[command(alias = "rm")]
    Remove { key: String },
    /// Delete every key, including guarded keys
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// List every stored entry under its raw key
    #[command(alias = "ls")]
    List,
    /// Show version, guarded keys and storage details
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, app_version, guarded, log_level)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands don't need the store
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), &output);
    }

    let config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;
    init_logging(&config);

    let backend = Arc::new(
        SqliteBackend::open(&config.database_path()).context("Failed to open store")?,
    );
    let mut store = open_store(&cli, &config, backend.clone())?;

    match cli.command {
        Commands::Get { key, default } => commands::entry::get(&store, key, default, &output),
        Commands::Set { key, value } => commands::entry::set(&store, key, value, &output),
        Commands::SetDirect { key, value } => {
            commands::entry::set_direct(&mut store, key, value, &output)
        }
        Commands::Has { key } => commands::entry::has(&store, key, &output),
        Commands::Remove { key } => commands::entry::remove(&store, key, &output),
        Commands::Clear { yes } => commands::entry::clear(&store, yes, &output),
        Commands::List => commands::entry::list(&store, &output),
        Commands::Status => commands::status::show(&store, &backend, &config, &output),
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

/// Build the version store from CLI flags and configuration
fn open_store(cli: &Cli, config: &Config, backend: Arc<SqliteBackend>) -> Result<VersionStore> {
    let version = cli
        .app_version
        .clone()
        .or_else(|| config.app_version.clone())
        .context(
            "No application version set. Pass --app-version or run:\n  \
             vstore config set app_version <version>",
        )?;

    let mut guarded = config.guarded.clone();
    guarded.extend(cli.guard.iter().cloned());
    debug!("Opening version {} with guards {:?}", version, guarded);

    let storage = Storage::new(backend);
    let store = VersionStore::new(storage, &version, guarded)?;
    Ok(store)
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize stderr logging
///
/// `RUST_LOG` wins over the configured level when set.
fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
