//! # simctl-rs: typed wrapper around `xcrun simctl`
//!
//! Builds `simctl` command lines, runs them synchronously and hands back the
//! exit code and captured output. `list` output is decoded from JSON. On top
//! of the plain subcommands the crate can start the Simulator app for a
//! device and follow a device's system log.
//!
//! ## Architecture
//!
//! - **Command dispatcher**: [`SimCtl`] with one method per subcommand
//! - **Execution seam**: [`CommandRunner`], implemented by [`ShellRunner`] and [`ScriptedRunner`]
//! - **Extensions**: Xcode version, boot state, simulator start, log tail
//! - **Communication**: the log tail publishes on a crossbeam channel
//!
//! ## Configuration
//!
//! [`SimctlConfig`] is read from `config.toml` under the platform config
//! directory (`dev.hxyulin.simctl-rs`) and fixed for the life of a
//! dispatcher.
//!
//! ## Example
//!
//! ```ignore
//! use simctl_rs::{SimCtl, SimctlConfig, ListOptions};
//!
//! let simctl = SimCtl::new(SimctlConfig::load_or_default());
//!
//! let probe = simctl.check_prerequisites()?;
//! if !probe.success() {
//!     eprintln!("{}", probe.output);
//!     return Ok(());
//! }
//!
//! for device in simctl.list_devices()?.flatten() {
//!     println!("{} {} ({})", device.udid, device.name, device.state);
//! }
//!
//! simctl.extensions().start("8A2C2F7E-...")?;
//! let tail = simctl.extensions().log("8A2C2F7E-...", None)?;
//! for event in tail.events().iter() {
//!     if event.is_terminal() {
//!         break;
//!     }
//! }
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod extensions;
pub mod types;

// Re-export commonly used types
pub use command::{CommandRunner, ScriptedRunner, ShellRunner, SimCtl, MISSING_SIMCTL_MESSAGE};
pub use config::{ExecOptions, LaunchOptions, ListOptions, SimctlConfig, SpawnOptions};
pub use error::{Result, SimctlError};
pub use extensions::{Extensions, LineSink, LogTail, StartOutcome, TailEvent, TailState};
pub use types::{CommandResult, Device, DeviceListing, DeviceState, ListCategory};
