//! Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Configuration for manglo
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the assistant service
    pub server_url: String,
    /// Whether to use TUI mode by default
    pub tui: bool,
    /// Log filter (tracing env-filter syntax)
    pub log_filter: String,
    /// Use the light theme instead of dark
    pub light_theme: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:5000".to_string(),
            tui: true,
            log_filter: "info".to_string(),
            light_theme: false,
        }
    }
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("manglo")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        // Check for MANGLO_CONFIG_PATH env var first
        if let Ok(path) = std::env::var("MANGLO_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from file, falling back to defaults on any problem
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Save config to file
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::config_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# manglo configuration file
# Place at ~/.config/manglo/config.toml (Linux/Mac) or %APPDATA%\manglo\config.toml (Windows)

# Base URL of the assistant service
server_url = "http://localhost:5000"

# Whether to use TUI mode by default (true by default)
# Set to false for plain stdin/stdout mode
tui = true

# Log filter, tracing env-filter syntax (logs go to manglo.log in the config dir)
log_filter = "info"

# Use the light theme
light_theme = false
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_parses() {
        let config: Config = toml::from_str(example_config()).unwrap();
        assert_eq!(config.server_url, "http://localhost:5000");
        assert!(config.tui);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = toml::from_str("server_url = \"http://farm.example\"").unwrap();
        assert_eq!(config.server_url, "http://farm.example");
        assert_eq!(config.log_filter, "info");
        assert!(!config.light_theme);
    }
}
