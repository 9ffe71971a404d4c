//! CommandRunner trait for the process execution seam
//!
//! The dispatcher only ever hands a fully rendered command line to a runner.
//! [`ShellRunner`](super::ShellRunner) executes it for real;
//! [`ScriptedRunner`](super::ScriptedRunner) replays canned results so the
//! dispatcher and extensions can be exercised without Xcode.

use crate::config::ExecOptions;
use crate::error::Result;
use crate::types::CommandResult;

/// Executes a rendered command line and waits for it to finish
///
/// A non-zero exit code is not an error: it comes back inside the
/// [`CommandResult`]. Implementations return `Err` only when the process
/// could not be run at all. Implementations must be `Send + Sync` so a
/// dispatcher can be shared with the log tail thread's owner.
///
/// # Example
///
/// ```ignore
/// fn probe(runner: &dyn CommandRunner) -> Result<bool> {
///     Ok(runner.run("xcrun simctl help", ExecOptions::silent())?.success())
/// }
/// ```
pub trait CommandRunner: Send + Sync {
    /// Run `command_line` through the runner's shell and capture its output
    fn run(&self, command_line: &str, options: ExecOptions) -> Result<CommandResult>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn run(&self, command_line: &str, options: ExecOptions) -> Result<CommandResult> {
        (**self).run(command_line, options)
    }
}

impl<T: CommandRunner + ?Sized> CommandRunner for Box<T> {
    fn run(&self, command_line: &str, options: ExecOptions) -> Result<CommandResult> {
        (**self).run(command_line, options)
    }
}

impl<T: CommandRunner + ?Sized> CommandRunner for std::sync::Arc<T> {
    fn run(&self, command_line: &str, options: ExecOptions) -> Result<CommandResult> {
        (**self).run(command_line, options)
    }
}
