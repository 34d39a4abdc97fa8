//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use vstore_core::config::parse_key_list;
use vstore_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "app_version": config.app_version,
                    "guarded": config.guarded,
                    "log_level": config.log_level
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:    {}", config.data_dir.display());
            println!(
                "  app_version: {}",
                config.app_version.as_deref().unwrap_or("(not set)")
            );
            println!(
                "  guarded:     {}",
                if config.guarded.is_empty() {
                    "(none)".to_string()
                } else {
                    config.guarded.join(", ")
                }
            );
            println!("  log_level:   {}", config.log_level);
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            config.data_dir = value.into();
        }
        "app_version" => {
            config.app_version = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.to_string())
            };
        }
        "guarded" => {
            config.guarded = parse_key_list(value);
        }
        "log_level" => {
            if value.is_empty() {
                bail!("log_level cannot be empty");
            }
            config.log_level = value.to_string();
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, app_version, guarded, log_level",
                key
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_known_keys() {
        let mut config = Config::default();

        apply(&mut config, "app_version", "2.0.0").unwrap();
        assert_eq!(config.app_version.as_deref(), Some("2.0.0"));

        apply(&mut config, "app_version", "none").unwrap();
        assert!(config.app_version.is_none());

        apply(&mut config, "guarded", "token,theme").unwrap();
        assert_eq!(config.guarded, vec!["token", "theme"]);

        apply(&mut config, "data_dir", "/srv/vstore").unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/vstore"));
    }

    #[test]
    fn test_apply_rejects_unknown_key() {
        let mut config = Config::default();
        let err = apply(&mut config, "sync_url", "x").unwrap_err();
        assert!(err.to_string().contains("Unknown configuration key"));
        assert!(apply(&mut config, "log_level", "").is_err());
    }
}
