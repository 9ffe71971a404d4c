//! Configuration module for simctl-rs
//!
//! [`SimctlConfig`] is loaded once at startup and handed to the dispatcher,
//! which reads it on every invocation. Per-call knobs live in [`settings`].
//!
//! # Config Location
//!
//! The config file is stored in the platform-appropriate location:
//! - **macOS**: `~/Library/Application Support/dev.hxyulin.simctl-rs/config.toml`
//! - **Linux**: `~/.config/dev.hxyulin.simctl-rs/config.toml`
//!
//! # Example
//!
//! ```toml
//! runner = ["xcrun", "simctl"]
//! noxpc = false
//! silent = true
//! tail_poll_interval_ms = 100
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{Result, SimctlError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier for config directories
pub const APP_ID: &str = "dev.hxyulin.simctl-rs";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Environment variable that forces `noxpc` on
pub const NOXPC_ENV: &str = "SIMCTL_NOXPC";

/// Default poll interval for the log tail in milliseconds
pub const DEFAULT_TAIL_POLL_INTERVAL_MS: u64 = 250;

/// CoreSimulator log directory, relative to the home directory
pub const CORE_SIMULATOR_LOG_DIR: &str = "Library/Logs/CoreSimulator";

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Get the path to the default config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join(CONFIG_FILE))
}

/// Process-wide settings for the dispatcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimctlConfig {
    /// Program and leading arguments every subcommand is appended to
    pub runner: Vec<String>,

    /// Shell used to interpret the assembled command line
    pub shell: String,

    /// Pass `--noxpc` ahead of every subcommand
    pub noxpc: bool,

    /// Default echo policy for subcommands that do not force one
    pub silent: bool,

    /// Override for `~/Library/Logs/CoreSimulator`
    pub log_root: Option<PathBuf>,

    /// How often the log tail checks for new data
    pub tail_poll_interval_ms: u64,

    /// Program printing the toolchain version banner
    pub xcodebuild: String,

    /// Program printing the active developer directory
    pub xcode_select: String,

    /// Program used to launch the Simulator app bundle
    pub open: String,

    /// Runner for the legacy `instruments -w` boot path
    pub instruments: Vec<String>,
}

impl Default for SimctlConfig {
    fn default() -> Self {
        Self {
            runner: vec!["xcrun".to_string(), "simctl".to_string()],
            shell: "sh".to_string(),
            noxpc: false,
            silent: false,
            log_root: None,
            tail_poll_interval_ms: DEFAULT_TAIL_POLL_INTERVAL_MS,
            xcodebuild: "xcodebuild".to_string(),
            xcode_select: "xcode-select".to_string(),
            open: "open".to_string(),
            instruments: vec!["xcrun".to_string(), "instruments".to_string()],
        }
    }
}

impl SimctlConfig {
    /// Load config from an explicit TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SimctlError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let mut config: Self = toml::from_str(&content).map_err(|e| {
            SimctlError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        config.apply_env();
        Ok(config)
    }

    /// Load config from the default location, returning defaults on any error
    pub fn load_or_default() -> Self {
        let Some(path) = config_path() else {
            tracing::debug!("No config directory on this platform, using defaults");
            return Self::default().with_env();
        };

        if !path.exists() {
            return Self::default().with_env();
        }

        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default().with_env()
        })
    }

    /// Save config to the given path, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SimctlError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| SimctlError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SimctlError::Config(format!("Failed to write config: {}", e)))
    }

    /// Check the invariants the dispatcher relies on
    pub fn validate(&self) -> Result<()> {
        if self.runner.is_empty() || self.runner.iter().any(|s| s.trim().is_empty()) {
            return Err(SimctlError::Config(
                "runner must name at least one program".to_string(),
            ));
        }
        if self.shell.trim().is_empty() {
            return Err(SimctlError::Config("shell must not be empty".to_string()));
        }
        if self.tail_poll_interval_ms == 0 {
            return Err(SimctlError::Config(
                "tail_poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Builder-style setter for `noxpc`
    pub fn with_noxpc(mut self, noxpc: bool) -> Self {
        self.noxpc = noxpc;
        self
    }

    fn with_env(mut self) -> Self {
        self.apply_env();
        self
    }

    /// Apply environment overrides
    fn apply_env(&mut self) {
        if let Ok(value) = std::env::var(NOXPC_ENV) {
            match value.as_str() {
                "1" | "true" | "yes" => self.noxpc = true,
                "0" | "false" | "no" => self.noxpc = false,
                other => tracing::warn!("Ignoring {}={:?}", NOXPC_ENV, other),
            }
        }
    }

    /// Tail poll interval as a [`Duration`]
    pub fn tail_poll_interval(&self) -> Duration {
        Duration::from_millis(self.tail_poll_interval_ms)
    }

    /// Directory containing per-device CoreSimulator logs
    pub fn log_root(&self) -> Option<PathBuf> {
        self.log_root
            .clone()
            .or_else(|| dirs_next::home_dir().map(|home| home.join(CORE_SIMULATOR_LOG_DIR)))
    }

    /// Path of the system log for a device
    pub fn system_log_path(&self, udid: &str) -> Option<PathBuf> {
        self.log_root()
            .map(|root| root.join(udid).join("system.log"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults() {
        let config = SimctlConfig::default();
        assert_eq!(config.runner, vec!["xcrun", "simctl"]);
        assert!(!config.noxpc);
        assert_eq!(config.tail_poll_interval(), Duration::from_millis(250));
        assert_eq!(config.instruments, vec!["xcrun", "instruments"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_path_uses_app_id() {
        if let Some(path) = config_path() {
            assert!(path.ends_with(Path::new("dev.hxyulin.simctl-rs").join(CONFIG_FILE)));
        }
    }

    #[test]
    #[serial]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let config = SimctlConfig {
            noxpc: true,
            log_root: Some(PathBuf::from("/tmp/logs")),
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = SimctlConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    #[serial]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "silent = true\n").unwrap();

        let loaded = SimctlConfig::load(&path).unwrap();
        assert!(loaded.silent);
        assert_eq!(loaded.runner, SimctlConfig::default().runner);
    }

    #[test]
    fn test_invalid_runner_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "runner = []\n").unwrap();

        let err = SimctlConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("runner"));
    }

    #[test]
    #[serial]
    fn test_noxpc_env_override() {
        std::env::set_var(NOXPC_ENV, "1");
        let mut config = SimctlConfig::default();
        config.apply_env();
        std::env::remove_var(NOXPC_ENV);
        assert!(config.noxpc);
    }

    #[test]
    fn test_system_log_path_uses_override() {
        let config = SimctlConfig {
            log_root: Some(PathBuf::from("/var/sim")),
            ..Default::default()
        };
        assert_eq!(
            config.system_log_path("ABC").unwrap(),
            PathBuf::from("/var/sim/ABC/system.log")
        );
    }
}
