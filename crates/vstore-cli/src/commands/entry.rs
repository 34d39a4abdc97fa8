//! Entry command handlers (get, set, has, remove, clear, list)

use anyhow::{bail, Context, Result};
use serde_json::Value;

use vstore_core::VersionStore;

use crate::output::Output;
use crate::prompt::confirm;

/// Parse a command-line value as JSON, falling back to a plain string
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Show the value stored under `key`
pub fn get(store: &VersionStore, key: String, default: Option<String>, output: &Output) -> Result<()> {
    let stored_as = store.resolve_key(&key);
    let value = match (store.get(&key), default) {
        (Some(value), _) => value,
        (None, Some(default)) => parse_value(&default),
        (None, None) => bail!("Key not found: {} (stored as {})", key, stored_as),
    };

    output.print_value(&key, &stored_as, &value);
    Ok(())
}

/// Store a value under the version-suffixed key
pub fn set(store: &VersionStore, key: String, raw: String, output: &Output) -> Result<()> {
    let stored = store.set(&key, parse_value(&raw));
    if stored.is_none() {
        bail!("Storage is unavailable; '{}' was not written", key);
    }

    output.success(&format!("Set {} = {}", store.resolve_key(&key), raw));
    Ok(())
}

/// Guard `key` and store a value under it verbatim
pub fn set_direct(store: &mut VersionStore, key: String, raw: String, output: &Output) -> Result<()> {
    let stored = store.set_direct(&key, parse_value(&raw));
    if stored.is_none() {
        bail!("Storage is unavailable; '{}' was not written", key);
    }

    output.success(&format!("Guarded {} = {}", key, raw));
    Ok(())
}

pub fn has(store: &VersionStore, key: String, output: &Output) -> Result<()> {
    output.print_bool(&key, store.has(&key));
    Ok(())
}

pub fn remove(store: &VersionStore, key: String, output: &Output) -> Result<()> {
    let stored_as = store.resolve_key(&key);
    store.remove(&key);
    output.success(&format!("Removed {}", stored_as));
    Ok(())
}

/// Wipe the entire store after confirmation
pub fn clear(store: &VersionStore, yes: bool, output: &Output) -> Result<()> {
    if !yes {
        if !output.should_prompt() {
            bail!("Refusing to clear without --yes");
        }
        let confirmed = confirm("Delete every key, including guarded keys and version records?")
            .context("Failed to read confirmation")?;
        if !confirmed {
            output.message("Cancelled.");
            return Ok(());
        }
    }

    store.clear();
    output.success("Cleared store");
    Ok(())
}

/// List every raw entry
pub fn list(store: &VersionStore, output: &Output) -> Result<()> {
    match store.get_all() {
        Some(entries) => {
            output.print_entries(&entries);
            Ok(())
        }
        None => bail!("Storage is unavailable"),
    }
}
