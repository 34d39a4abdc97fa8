//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use std::collections::BTreeMap;

use serde_json::Value;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print a single stored value
    pub fn print_value(&self, key: &str, stored_as: &str, value: &Value) {
        match self.format {
            OutputFormat::Human => {
                println!("Key:     {}", key);
                println!("Stored:  {}", stored_as);
                println!("Value:   {}", render(value));
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"key": key, "stored_as": stored_as, "value": value})
                );
            }
            OutputFormat::Quiet => {
                println!("{}", value);
            }
        }
    }

    /// Print every raw entry in the store
    pub fn print_entries(&self, entries: &BTreeMap<String, Value>) {
        match self.format {
            OutputFormat::Human => {
                if entries.is_empty() {
                    println!("No entries found.");
                    return;
                }
                for (key, value) in entries {
                    println!("{} = {}", truncate(key, 40), truncate(&render(value), 60));
                }
                println!("\n{} entr{}", entries.len(), if entries.len() == 1 { "y" } else { "ies" });
            }
            OutputFormat::Json => {
                println!("{}", Value::from(serde_json::Map::from_iter(entries.clone())));
            }
            OutputFormat::Quiet => {
                for key in entries.keys() {
                    println!("{}", key);
                }
            }
        }
    }

    /// Print a boolean answer
    pub fn print_bool(&self, key: &str, answer: bool) {
        match self.format {
            OutputFormat::Human => println!("{}: {}", key, if answer { "yes" } else { "no" }),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"key": key, "present": answer}));
            }
            OutputFormat::Quiet => println!("{}", answer),
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Render a value for humans: bare strings without quotes
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}
