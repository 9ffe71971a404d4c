//! Core data types for simctl-rs
//!
//! # Main Types
//!
//! - [`CommandResult`] - Exit code and captured output of one `simctl` invocation
//! - [`ListCategory`] - Which section of `simctl list` to request
//! - [`Device`] / [`DeviceState`] - One simulated device as reported by `simctl list --json`
//! - [`DeviceListing`] - Devices grouped by runtime identifier
//!
//! Everything here is sourced from the external tool and never persisted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Exit code recorded when the child was terminated by a signal
pub const SIGNALLED_EXIT_CODE: i32 = -1;

/// Outcome of a single external command
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommandResult {
    /// Process exit code
    pub code: i32,
    /// Captured standard output
    pub output: String,
    /// Captured standard error
    pub stderr: String,
    /// Decoded JSON, only populated by `list`
    pub json: Option<serde_json::Value>,
}

impl CommandResult {
    /// Create a result with the given code and stdout
    pub fn new(code: i32, output: impl Into<String>) -> Self {
        Self {
            code,
            output: output.into(),
            stderr: String::new(),
            json: None,
        }
    }

    /// Attach captured stderr
    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = stderr.into();
        self
    }

    /// Whether the command exited with code 0
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Stdout followed by stderr
    pub fn combined_output(&self) -> String {
        let mut combined = String::with_capacity(self.output.len() + self.stderr.len());
        combined.push_str(&self.output);
        combined.push_str(&self.stderr);
        combined
    }
}

/// Section selector for `simctl list`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListCategory {
    Devices,
    DeviceTypes,
    Runtimes,
    Pairs,
    /// No filter; lists every section
    #[default]
    All,
}

impl ListCategory {
    /// The positional keyword passed to `simctl list`
    pub fn keyword(&self) -> &'static str {
        match self {
            ListCategory::Devices => "devices",
            ListCategory::DeviceTypes => "devicetypes",
            ListCategory::Runtimes => "runtimes",
            ListCategory::Pairs => "pairs",
            ListCategory::All => "",
        }
    }
}

/// Lifecycle state of a simulated device
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeviceState {
    Shutdown,
    Booted,
    Creating,
    Booting,
    ShuttingDown,
    /// Any state string this crate does not know about
    Unknown(String),
}

impl DeviceState {
    pub fn as_str(&self) -> &str {
        match self {
            DeviceState::Shutdown => "Shutdown",
            DeviceState::Booted => "Booted",
            DeviceState::Creating => "Creating",
            DeviceState::Booting => "Booting",
            DeviceState::ShuttingDown => "Shutting Down",
            DeviceState::Unknown(s) => s,
        }
    }
}

impl From<&str> for DeviceState {
    fn from(s: &str) -> Self {
        match s {
            "Shutdown" => DeviceState::Shutdown,
            "Booted" => DeviceState::Booted,
            "Creating" => DeviceState::Creating,
            "Booting" => DeviceState::Booting,
            "Shutting Down" => DeviceState::ShuttingDown,
            other => DeviceState::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DeviceState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DeviceState {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(DeviceState::from(s.as_str()))
    }
}

/// A simulated device record from `simctl list --json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub udid: String,
    #[serde(default)]
    pub name: String,
    pub state: DeviceState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_available: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<String>,
}

impl Device {
    pub fn is_booted(&self) -> bool {
        self.state == DeviceState::Booted
    }
}

/// Decoded `simctl list --json` output
///
/// Devices are grouped by runtime identifier. The other sections are kept
/// as raw JSON since their shape changes between Xcode releases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceListing {
    #[serde(default)]
    pub devices: BTreeMap<String, Vec<Device>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtimes: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devicetypes: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pairs: Option<serde_json::Value>,
}

impl DeviceListing {
    /// All devices across every runtime, in runtime order
    pub fn flatten(&self) -> impl Iterator<Item = &Device> {
        self.devices.values().flatten()
    }

    /// Find a device by UDID
    pub fn find(&self, udid: &str) -> Option<&Device> {
        self.flatten().find(|d| d.udid == udid)
    }

    /// Runtime identifier that owns the given device
    pub fn runtime_of(&self, udid: &str) -> Option<&str> {
        self.devices
            .iter()
            .find(|(_, devices)| devices.iter().any(|d| d.udid == udid))
            .map(|(runtime, _)| runtime.as_str())
    }

    /// Devices currently booted
    pub fn booted(&self) -> Vec<&Device> {
        self.flatten().filter(|d| d.is_booted()).collect()
    }
}
