//! Configuration loading
//!
//! Settings come from `~/.config/tmux-schmooze/config.toml` (or a file given
//! with `--config`), with command-line flags taking precedence.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Get the default config file path (~/.config/tmux-schmooze/config.toml)
pub fn default_config_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tmux-schmooze")
        .join("config.toml")
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// tmux binary
    pub tmux_path: String,
    /// Horizontal scale applied to previewed panes
    pub scale_x: f64,
    /// Width of the picker sidebar, percent of the screen
    pub sidebar_percent: u16,
    /// Height of the entry list within the sidebar, percent
    pub picker_percent: u16,
    /// How often the target list and preview are refreshed
    pub refresh_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tmux_path: "tmux".into(),
            scale_x: 0.8,
            sidebar_percent: 20,
            picker_percent: 90,
            refresh_ms: 1000,
        }
    }
}

/// Values given on the command line; `None` keeps the file's value
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub tmux_path: Option<String>,
    pub scale_x: Option<f64>,
    pub sidebar_percent: Option<u16>,
}

impl Config {
    /// Load from `path`, which must exist and parse, or from the default
    /// location, where a missing or broken file falls back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            return Self::from_toml(&content)
                .with_context(|| format!("Failed to parse config {}", path.display()));
        }

        let path = default_config_file();
        if !path.exists() {
            tracing::debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        match std::fs::read_to_string(&path) {
            Ok(content) => match Self::from_toml(&content) {
                Ok(config) => Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to parse config file: {}, using defaults", e);
                    Ok(Self::default())
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config file: {}, using defaults", e);
                Ok(Self::default())
            }
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config.sanitized())
    }

    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(tmux_path) = overrides.tmux_path {
            self.tmux_path = tmux_path;
        }
        if let Some(scale_x) = overrides.scale_x {
            self.scale_x = scale_x;
        }
        if let Some(sidebar_percent) = overrides.sidebar_percent {
            self.sidebar_percent = sidebar_percent;
        }
        self.sanitized()
    }

    /// Clamp values into ranges the UI can lay out
    fn sanitized(mut self) -> Self {
        self.sidebar_percent = self.sidebar_percent.clamp(1, 99);
        self.picker_percent = self.picker_percent.clamp(1, 99);
        self.refresh_ms = self.refresh_ms.max(100);
        if !self.scale_x.is_finite() || self.scale_x <= 0.0 {
            tracing::warn!(scale_x = self.scale_x, "Invalid scale, using default");
            self.scale_x = Config::default().scale_x;
        }
        self
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_missing_keys() {
        let config = Config::from_toml("scale_x = 0.5\n").unwrap();
        assert_eq!(config.scale_x, 0.5);
        assert_eq!(config.tmux_path, "tmux");
        assert_eq!(config.sidebar_percent, 20);
        assert_eq!(config.refresh_interval(), Duration::from_millis(1000));
    }

    #[test]
    fn test_values_are_clamped() {
        let config =
            Config::from_toml("sidebar_percent = 0\npicker_percent = 150\nrefresh_ms = 5\nscale_x = -1.0\n")
                .unwrap();
        assert_eq!(config.sidebar_percent, 1);
        assert_eq!(config.picker_percent, 99);
        assert_eq!(config.refresh_ms, 100);
        assert_eq!(config.scale_x, 0.8);
    }

    #[test]
    fn test_overrides_win() {
        let config = Config::from_toml("tmux_path = \"/opt/tmux\"\nsidebar_percent = 30\n")
            .unwrap()
            .with_overrides(Overrides {
                scale_x: Some(1.0),
                sidebar_percent: Some(25),
                ..Default::default()
            });
        assert_eq!(config.tmux_path, "/opt/tmux");
        assert_eq!(config.scale_x, 1.0);
        assert_eq!(config.sidebar_percent, 25);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent/schmooze.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(Config::from_toml("refresh_ms = \"fast\"\n").is_err());
    }
}
