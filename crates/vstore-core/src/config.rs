//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/vstore/config.toml)
//! 3. Environment variables (VSTORE_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix
const ENV_PREFIX: &str = "VSTORE";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the SQLite store
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Application version used to namespace keys
    #[serde(default)]
    pub app_version: Option<String>,

    /// Extra keys stored without a version suffix
    #[serde(default)]
    pub guarded: Vec<String>,

    /// Log filter directive (e.g. "warn", "vstore_core=debug")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            app_version: None,
            guarded: Vec::new(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (VSTORE_DATA_DIR, VSTORE_APP_VERSION,
    ///    VSTORE_GUARDED, VSTORE_LOG_LEVEL)
    /// 2. Config file (~/.config/vstore/config.toml or VSTORE_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring an explicit path from the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // VSTORE_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // VSTORE_APP_VERSION
        if let Ok(val) = std::env::var(format!("{}_APP_VERSION", ENV_PREFIX)) {
            self.app_version = if val.is_empty() { None } else { Some(val) };
        }

        // VSTORE_GUARDED (comma separated)
        if let Ok(val) = std::env::var(format!("{}_GUARDED", ENV_PREFIX)) {
            self.guarded = parse_key_list(&val);
        }

        // VSTORE_LOG_LEVEL
        if let Ok(val) = std::env::var(format!("{}_LOG_LEVEL", ENV_PREFIX)) {
            if !val.is_empty() {
                self.log_level = val;
            }
        }
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with VSTORE_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vstore")
            .join("config.toml")
    }

    /// Get the path to the SQLite store
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("vstore.db")
    }
}

/// Split a comma separated key list, dropping blanks
pub fn parse_key_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vstore")
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "VSTORE_DATA_DIR",
        "VSTORE_APP_VERSION",
        "VSTORE_GUARDED",
        "VSTORE_LOG_LEVEL",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.app_version.is_none());
        assert!(config.guarded.is_empty());
        assert_eq!(config.log_level, "warn");
        assert!(config.data_dir.ends_with("vstore"));
    }

    #[test]
    fn test_database_path() {
        let config = Config::default();
        assert!(config.database_path().ends_with("vstore.db"));
    }

    #[test]
    fn test_env_override_app_version() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("VSTORE_APP_VERSION", "2.1.0");
        config.apply_env_overrides();
        assert_eq!(config.app_version, Some("2.1.0".to_string()));

        // Empty string clears it
        env::set_var("VSTORE_APP_VERSION", "");
        config.apply_env_overrides();
        assert!(config.app_version.is_none());
    }

    #[test]
    fn test_env_override_guarded() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("VSTORE_GUARDED", "token, theme,,");
        config.apply_env_overrides();

        assert_eq!(config.guarded, vec!["token", "theme"]);
    }

    #[test]
    fn test_env_override_data_dir_and_log_level() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("VSTORE_DATA_DIR", "/tmp/vstore-test");
        env::set_var("VSTORE_LOG_LEVEL", "debug");
        config.apply_env_overrides();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/vstore-test"));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            app_version = "1.0.0"
            guarded = ["token"]
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.app_version, Some("1.0.0".to_string()));
        assert_eq!(config.guarded, vec!["token"]);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);

        let path = PathBuf::from("/nonexistent/config.toml");
        let config = Config::load_from_path(&path).unwrap();
        assert!(config.app_version.is_none());
        assert!(config.guarded.is_empty());
    }

    #[test]
    fn test_save_and_reload() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("conf").join("config.toml");

        let config = Config {
            data_dir: temp_dir.path().to_path_buf(),
            app_version: Some("3.0".to_string()),
            guarded: vec!["session".to_string()],
            log_level: "info".to_string(),
        };
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_with_cli_override(Some(&path)).unwrap();
        assert_eq!(loaded.data_dir, config.data_dir);
        assert_eq!(loaded.app_version, config.app_version);
        assert_eq!(loaded.guarded, config.guarded);
        assert_eq!(loaded.log_level, "info");
    }

    #[test]
    fn test_parse_key_list() {
        assert!(parse_key_list("").is_empty());
        assert_eq!(parse_key_list(" a ,b"), vec!["a", "b"]);
    }
}
