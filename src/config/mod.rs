//! Configuration management for XTouch Banks
//!
//! Handles loading, parsing, and validation of the YAML configuration file.
//! Every section has defaults, so an empty file (or no file at all) yields
//! the reference X-Touch layout.

pub mod layout;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

pub use layout::LayoutConfig;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub midi: MidiConfig,
    #[serde(default)]
    pub osc: OscConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
}

/// MIDI port configuration (case-insensitive substring patterns)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MidiConfig {
    #[serde(default = "default_port_pattern")]
    pub input_port: String,
    #[serde(default = "default_port_pattern")]
    pub output_port: String,
}

/// OSC network mirror configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OscConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Local address to bind (also receives remote automation)
    #[serde(default = "default_osc_listen")]
    pub listen: String,
    /// Remote address mirror messages are sent to
    #[serde(default = "default_osc_target")]
    pub target: String,
}

/// Snapshot persistence configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PersistenceConfig {
    /// Snapshot file; defaults to the platform data directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default = "default_save_interval")]
    pub save_interval_ms: u64,
}

/// Blinking heartbeat LED configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HeartbeatConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_heartbeat_interval")]
    pub interval_ms: u64,
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            input_port: default_port_pattern(),
            output_port: default_port_pattern(),
        }
    }
}

impl Default for OscConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: default_osc_listen(),
            target: default_osc_target(),
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            path: None,
            save_interval_ms: default_save_interval(),
        }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: default_heartbeat_interval(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_yaml(&contents)
            .with_context(|| format!("Failed to load config: {}", path.display()))
    }

    /// Load configuration, falling back to defaults when the file is absent
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if fs::try_exists(path).await.unwrap_or(false) {
            Self::load(path).await
        } else {
            warn!(
                "Config file {} not found, using the default X-Touch layout",
                path.display()
            );
            let config = Self::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(contents: &str) -> Result<Self> {
        // serde_yaml rejects an empty document, treat it as "all defaults"
        let config: AppConfig = if contents.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if self.midi.input_port.is_empty() {
            anyhow::bail!("MIDI input_port cannot be empty");
        }
        if self.midi.output_port.is_empty() {
            anyhow::bail!("MIDI output_port cannot be empty");
        }

        if self.osc.enabled {
            self.osc
                .listen
                .parse::<std::net::SocketAddr>()
                .with_context(|| format!("Invalid osc.listen address: {}", self.osc.listen))?;
            self.osc
                .target
                .parse::<std::net::SocketAddr>()
                .with_context(|| format!("Invalid osc.target address: {}", self.osc.target))?;
        }

        if self.persistence.save_interval_ms == 0 {
            anyhow::bail!("persistence.save_interval_ms must be greater than 0");
        }
        if self.heartbeat.enabled && self.heartbeat.interval_ms == 0 {
            anyhow::bail!("heartbeat.interval_ms must be greater than 0");
        }

        self.layout.validate().context("Invalid layout")?;

        Ok(())
    }
}

// Default value functions
fn default_port_pattern() -> String { "X-Touch".to_string() }
fn default_osc_listen() -> String { "0.0.0.0:8011".to_string() }
fn default_osc_target() -> String { "127.0.0.1:8010".to_string() }
fn default_true() -> bool { true }
fn default_save_interval() -> u64 { 5000 }
fn default_heartbeat_interval() -> u64 { 500 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = AppConfig::from_yaml("").unwrap();
        assert_eq!(config.layout, LayoutConfig::default());
        assert_eq!(config.persistence.save_interval_ms, 5000);
        assert_eq!(config.heartbeat.interval_ms, 500);
        assert!(config.osc.enabled);
    }

    #[test]
    fn test_partial_layout_override() {
        let yaml = r#"
midi:
  input_port: "X-Touch INT"
layout:
  bank_count: 2
  strips: 8
  bank_select_notes: [54, 55]
osc:
  target: "192.168.1.20:9000"
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.midi.input_port, "X-Touch INT");
        assert_eq!(config.midi.output_port, "X-Touch");
        assert_eq!(config.layout.bank_count, 2);
        assert_eq!(config.layout.strips, 8);
        assert_eq!(config.layout.touch_note_base, 0x68);
        assert_eq!(config.osc.target, "192.168.1.20:9000");
        assert_eq!(config.osc.listen, "0.0.0.0:8011");
    }

    #[test]
    fn test_invalid_osc_address_rejected() {
        let yaml = "osc:\n  target: \"not-an-address\"\n";
        assert!(AppConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_disabled_osc_skips_address_check() {
        let yaml = "osc:\n  enabled: false\n  target: \"unused\"\n";
        assert!(AppConfig::from_yaml(yaml).is_ok());
    }

    #[test]
    fn test_zero_save_interval_rejected() {
        let yaml = "persistence:\n  save_interval_ms: 0\n";
        assert!(AppConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_invalid_layout_rejected() {
        let yaml = "layout:\n  bank_count: 3\n";
        assert!(AppConfig::from_yaml(yaml).is_err());
    }

    #[tokio::test]
    async fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_or_default(dir.path().join("missing.yaml"))
            .await
            .unwrap();
        assert_eq!(config.layout.bank_count, 6);
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "heartbeat:\n  enabled: false\n").unwrap();

        let config = AppConfig::load(&path).await.unwrap();
        assert!(!config.heartbeat.enabled);
    }
}
