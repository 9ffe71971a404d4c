//! Helpers beyond the plain `simctl` subcommands
//!
//! - [`Extensions::xcode_version`] - Major version of the active Xcode
//! - [`Extensions::is_device_booted`] - Boot state of one device
//! - [`Extensions::start`] - Boot a device and bring up Simulator.app
//! - [`Extensions::log`] - Follow a device's `system.log`
//!
//! Xcode 9 changed how the Simulator app relates to booted devices. From 9
//! on a device is booted with `simctl boot` and the app is opened
//! separately; older toolchains boot and attach through `instruments -w`.

pub mod log_tail;

pub use log_tail::{LineSink, LogTail, TailEvent, TailState};

use crate::command::{decode_listing, CommandLine, CommandRunner, SimCtl};
use crate::config::ExecOptions;
use crate::error::{Result, ResultExt, SimctlError};
use crate::types::CommandResult;
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;

/// First Xcode major version that boots devices without `instruments`
pub const MODERN_XCODE_MAJOR: u32 = 9;

/// Simulator app bundle, relative to the active developer directory
pub const SIMULATOR_APP: &str = "Applications/Simulator.app";

const NO_ARGS: [&str; 0] = [];

static XCODE_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Xcode (\d+)").expect("xcode version pattern"));

/// Extract the major version from an `xcodebuild -version` banner
///
/// ```
/// use simctl_rs::extensions::parse_xcode_version;
///
/// assert_eq!(parse_xcode_version("Xcode 11.3\nBuild version 11C29"), Some(11));
/// assert_eq!(parse_xcode_version("xcode-select: error"), None);
/// ```
pub fn parse_xcode_version(banner: &str) -> Option<u32> {
    XCODE_VERSION_RE
        .captures(banner)
        .and_then(|caps| caps.get(1))
        .and_then(|major| major.as_str().parse().ok())
}

/// What [`Extensions::start`] ended up doing
#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    /// The device was already booted; nothing was run
    AlreadyRunning,
    /// The device was booted and the launcher command ran
    Launched(CommandResult),
    /// A precondition failed; no GUI launch was attempted
    Aborted(String),
}

/// Extension helpers bound to a dispatcher
pub struct Extensions<'a, R> {
    simctl: &'a SimCtl<R>,
}

impl<'a, R: CommandRunner> Extensions<'a, R> {
    pub(crate) fn new(simctl: &'a SimCtl<R>) -> Self {
        Self { simctl }
    }

    fn run(&self, line: &CommandLine) -> Result<CommandResult> {
        self.simctl.run_line(line, ExecOptions::silent())
    }

    /// Major version of the active Xcode, or `None` if it cannot be determined
    pub fn xcode_version(&self) -> Option<u32> {
        let line = CommandLine::new([self.simctl.config().xcodebuild.as_str()]).token("-version");
        let banner = match self.run(&line) {
            Ok(result) => result.combined_output(),
            Err(e) => {
                tracing::warn!("Unable to run xcodebuild: {}", e);
                return None;
            }
        };

        let version = parse_xcode_version(&banner);
        if version.is_none() {
            tracing::warn!("Unable to parse xcodebuild version.");
        }
        version
    }

    /// Whether the device with `udid` is booted
    ///
    /// Fails when the listing cannot be fetched or decoded, and with
    /// [`SimctlError::DeviceNotFound`] when no such device exists.
    pub fn is_device_booted(&self, udid: &str) -> Result<bool> {
        let result = self
            .simctl
            .exec("list", NO_ARGS, ["-j"], ExecOptions::silent())?;
        let listing = decode_listing(&result)?;

        listing
            .find(udid)
            .map(|device| device.is_booted())
            .ok_or_else(|| SimctlError::DeviceNotFound(udid.to_string()))
    }

    /// Boot `udid` and open Simulator.app the way the active Xcode expects
    pub fn start(&self, udid: &str) -> Result<StartOutcome> {
        let Some(major) = self.xcode_version() else {
            return Ok(StartOutcome::Aborted(
                "Unable to determine the Xcode version".to_string(),
            ));
        };

        tracing::debug!(xcode = major, "starting simulator {}", udid);
        if major >= MODERN_XCODE_MAJOR {
            self.start_modern(udid)
        } else {
            self.start_legacy(udid).map(StartOutcome::Launched)
        }
    }

    /// Xcode 9 or newer: `simctl boot`, then open Simulator.app
    pub fn start_modern(&self, udid: &str) -> Result<StartOutcome> {
        match self.is_device_booted(udid) {
            Ok(true) => {
                tracing::info!("Simulator is already running.");
                return Ok(StartOutcome::AlreadyRunning);
            }
            Ok(false) => {}
            Err(e) => {
                tracing::error!("{}", e);
                return Ok(StartOutcome::Aborted(e.to_string()));
            }
        }

        let boot = self
            .simctl
            .exec("boot", [udid], NO_ARGS, ExecOptions::silent())
            .context("Booting device")?;
        if !boot.success() {
            tracing::warn!(code = boot.code, "simctl boot {} failed: {}", udid, boot.combined_output().trim());
        }

        let Some(developer_dir) = self.developer_dir()? else {
            return Ok(StartOutcome::Aborted(
                "Unable to locate the active developer directory".to_string(),
            ));
        };

        let app = developer_dir.join(SIMULATOR_APP);
        let open = CommandLine::new([self.simctl.config().open.as_str()]).quoted(app.to_string_lossy());
        self.run(&open).map(StartOutcome::Launched)
    }

    /// Xcode 8 or older: `instruments -w` boots and attaches in one step
    pub fn start_legacy(&self, udid: &str) -> Result<CommandResult> {
        let line = CommandLine::new(self.simctl.config().instruments.iter().cloned())
            .token("-w")
            .quoted(udid);
        self.run(&line)
    }

    /// Output of `xcode-select -p`, if it succeeds
    pub fn developer_dir(&self) -> Result<Option<PathBuf>> {
        let line = CommandLine::new([self.simctl.config().xcode_select.as_str()]).token("-p");
        let result = self.run(&line)?;

        let dir = result.output.trim();
        if !result.success() || dir.is_empty() {
            tracing::warn!(code = result.code, "xcode-select -p failed");
            return Ok(None);
        }
        Ok(Some(PathBuf::from(dir)))
    }

    /// Path of the device's `system.log`
    pub fn system_log_path(&self, udid: &str) -> Result<PathBuf> {
        self.simctl.config().system_log_path(udid).ok_or_else(|| {
            SimctlError::Config("Could not determine the home directory".to_string())
        })
    }

    /// Follow the device's system log
    ///
    /// Lines are appended to `file` when given, otherwise printed to stdout.
    /// The returned handle keeps the tail alive; drop or
    /// [`stop`](LogTail::stop) it to end the subscription.
    pub fn log(&self, udid: &str, file: Option<PathBuf>) -> Result<LogTail> {
        let path = self.system_log_path(udid)?;
        LogTail::spawn(
            path,
            LineSink::from_path(file),
            self.simctl.config().tail_poll_interval(),
        )
    }
}
