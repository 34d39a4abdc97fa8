//! Status command handler

use anyhow::Result;

use vstore_core::{Config, Reconciliation, SqliteBackend, VersionStore};

use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(
    store: &VersionStore,
    backend: &SqliteBackend,
    config: &Config,
    output: &Output,
) -> Result<()> {
    let db_path = config.database_path();
    let db_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);
    let last_modified = backend.last_modified().ok().flatten();
    let disabled = store.storage().is_disabled();
    let entries = store.storage().keys().len();

    let reconciliation = match store.reconciliation() {
        Reconciliation::Unchanged => "unchanged".to_string(),
        Reconciliation::GuardsMerged { added } => format!("merged {} guarded key(s)", added),
        Reconciliation::Purged { removed } => format!("purged {} key(s)", removed),
    };

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "version": store.version(),
                    "guarded": store.guarded(),
                    "reconciliation": reconciliation,
                    "disabled": disabled,
                    "storage": {
                        "path": db_path,
                        "size": db_size,
                        "entries": entries,
                        "last_modified": last_modified.map(|t| t.to_rfc3339()),
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", store.version());
        }
        OutputFormat::Human => {
            println!("vstore Status");
            println!("=============");
            println!();
            println!("Version:        {}", store.version());
            println!("Reconciliation: {}", reconciliation);
            println!("Guarded keys:   {}", store.guarded().join(", "));
            println!();
            println!("Storage:");
            println!("  Location: {}", db_path.display());
            println!(
                "  Status:   {}",
                if disabled { "disabled" } else { "available" }
            );
            println!("  Size:     {} bytes", db_size);
            println!("  Entries:  {}", entries);
            println!(
                "  Modified: {}",
                last_modified
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                    .unwrap_or_else(|| "(never)".to_string())
            );
        }
    }

    Ok(())
}
