//! Per-invocation settings
//!
//! These are built by callers for a single dispatcher call, separate from the
//! process-wide [`SimctlConfig`](super::SimctlConfig).
//!
//! # Main Types
//!
//! - [`ExecOptions`] - Echo policy for one command
//! - [`ListOptions`] - Section selector for `simctl list`
//! - [`LaunchOptions`] - Arguments for `simctl launch`
//! - [`SpawnOptions`] - Arguments for `simctl spawn`

use crate::types::ListCategory;
use serde::{Deserialize, Serialize};

/// Execution settings for one external command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecOptions {
    /// Do not echo captured output to the console
    pub silent: bool,
}

impl ExecOptions {
    pub fn silent() -> Self {
        Self { silent: true }
    }

    pub fn echo() -> Self {
        Self { silent: false }
    }
}

/// Options for `simctl list`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListOptions {
    pub category: ListCategory,
    /// Overrides the configured echo policy when set
    pub silent: Option<bool>,
}

impl ListOptions {
    pub fn new(category: ListCategory) -> Self {
        Self {
            category,
            silent: None,
        }
    }

    pub fn devices() -> Self {
        Self::new(ListCategory::Devices)
    }

    pub fn with_silent(mut self, silent: bool) -> Self {
        self.silent = Some(silent);
        self
    }
}

/// Options for `simctl launch`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LaunchOptions {
    pub wait_for_debugger: bool,
    pub device: String,
    pub app_identifier: String,
    /// Extra arguments passed to the launched app
    pub argv: Vec<String>,
}

impl LaunchOptions {
    pub fn new(device: impl Into<String>, app_identifier: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            app_identifier: app_identifier.into(),
            ..Default::default()
        }
    }

    pub fn wait_for_debugger(mut self, wait: bool) -> Self {
        self.wait_for_debugger = wait;
        self
    }

    pub fn args<I, S>(mut self, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.argv = argv.into_iter().map(Into::into).collect();
        self
    }
}

/// Options for `simctl spawn`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpawnOptions {
    pub wait_for_debugger: bool,
    /// Target architecture, e.g. `x86_64` or `arm64`
    pub arch: Option<String>,
    pub device: String,
    pub path_to_executable: String,
    pub argv: Vec<String>,
}

impl SpawnOptions {
    pub fn new(device: impl Into<String>, path_to_executable: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            path_to_executable: path_to_executable.into(),
            ..Default::default()
        }
    }

    pub fn wait_for_debugger(mut self, wait: bool) -> Self {
        self.wait_for_debugger = wait;
        self
    }

    pub fn arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = Some(arch.into());
        self
    }

    pub fn args<I, S>(mut self, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.argv = argv.into_iter().map(Into::into).collect();
        self
    }
}
