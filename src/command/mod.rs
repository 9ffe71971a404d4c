//! Command dispatcher for `xcrun simctl`
//!
//! Every operation builds one command line, runs it synchronously through a
//! [`CommandRunner`] and returns the [`CommandResult`]. A non-zero exit code
//! is data, not an error; callers inspect [`CommandResult::code`].
//!
//! # Components
//!
//! - [`SimCtl`] - The dispatcher, one method per `simctl` subcommand
//! - [`CommandLine`] / [`simctl_command`] - Command line assembly and quoting
//! - [`CommandRunner`] - Execution seam between assembly and the process
//! - [`ShellRunner`] - Runs command lines through `sh -c`
//! - [`ScriptedRunner`] - Canned results for tests and dry runs
//!
//! # Example
//!
//! ```ignore
//! use simctl_rs::{SimCtl, SimctlConfig, ListOptions};
//!
//! let simctl = SimCtl::new(SimctlConfig::load_or_default());
//! let result = simctl.list(ListOptions::devices())?;
//! if let Some(json) = result.json {
//!     println!("{}", json["devices"]);
//! }
//! ```

pub mod line;
pub mod runner_trait;
pub mod scripted;
pub mod shell;

pub use line::{quote, simctl_command, CommandLine, NOXPC_FLAG};
pub use runner_trait::CommandRunner;
pub use scripted::{RecordedCall, ScriptedRunner};
pub use shell::ShellRunner;

use crate::config::{ExecOptions, LaunchOptions, ListOptions, SimctlConfig, SpawnOptions};
use crate::error::{Result, SimctlError};
use crate::extensions::Extensions;
use crate::types::{CommandResult, DeviceListing, ListCategory};

/// Remediation text substituted when the prerequisite probe fails
pub const MISSING_SIMCTL_MESSAGE: &str = include_str!("../resources/missing-simctl.txt");

/// Flag making `launch`/`spawn` wait for a debugger to attach
pub const WAIT_FOR_DEBUGGER_FLAG: &str = "--wait-for-debugger";

/// Flag forcing JSON output from `list`
pub const JSON_FLAG: &str = "--json";

const NO_ARGS: [&str; 0] = [];

/// Dispatcher for `simctl` subcommands
///
/// Holds the process-wide [`SimctlConfig`] and the runner that executes
/// command lines. The config is fixed at construction and read on every call.
#[derive(Debug, Clone)]
pub struct SimCtl<R = ShellRunner> {
    config: SimctlConfig,
    runner: R,
}

impl SimCtl<ShellRunner> {
    /// Create a dispatcher that runs commands through the configured shell
    pub fn new(config: SimctlConfig) -> Self {
        let runner = ShellRunner::new(config.shell.clone());
        Self { config, runner }
    }
}

impl<R: CommandRunner> SimCtl<R> {
    /// Create a dispatcher with a custom runner
    pub fn with_runner(config: SimctlConfig, runner: R) -> Self {
        Self { config, runner }
    }

    pub fn config(&self) -> &SimctlConfig {
        &self.config
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Whether `--noxpc` is passed ahead of every subcommand
    pub fn noxpc(&self) -> bool {
        self.config.noxpc
    }

    /// Helpers that go beyond plain `simctl` subcommands
    pub fn extensions(&self) -> Extensions<'_, R> {
        Extensions::new(self)
    }

    /// Echo policy used by subcommands that do not force one
    fn default_options(&self) -> ExecOptions {
        ExecOptions {
            silent: self.config.silent,
        }
    }

    /// Build and run `<runner> <action> "<arg>"... <flag>...`
    pub fn exec<A, F>(&self, action: &str, args: A, flags: F, options: ExecOptions) -> Result<CommandResult>
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        F: IntoIterator,
        F::Item: Into<String>,
    {
        let line = simctl_command(&self.config, action, args, flags);
        self.run_line(&line, options)
    }

    /// Run an already assembled command line
    pub fn run_line(&self, line: &CommandLine, options: ExecOptions) -> Result<CommandResult> {
        self.runner.run(&line.render(), options)
    }

    fn exec_args<A>(&self, action: &str, args: A) -> Result<CommandResult>
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
    {
        self.exec(action, args, NO_ARGS, self.default_options())
    }

    /// Probe that `simctl` is installed and working
    ///
    /// On a non-zero exit the output is replaced by [`MISSING_SIMCTL_MESSAGE`].
    pub fn check_prerequisites(&self) -> Result<CommandResult> {
        let mut result = self.exec("help", NO_ARGS, NO_ARGS, ExecOptions::silent())?;

        if !result.success() {
            tracing::warn!(code = result.code, "simctl prerequisite check failed");
            result.output = MISSING_SIMCTL_MESSAGE.to_string();
        }

        Ok(result)
    }

    /// `simctl help [subcommand]`
    pub fn help(&self, subcommand: Option<&str>) -> Result<CommandResult> {
        self.exec_args("help", subcommand)
    }

    /// `simctl create <name> <device type id> <runtime id>`
    pub fn create(&self, name: &str, device_type_id: &str, runtime_id: &str) -> Result<CommandResult> {
        self.exec_args("create", [name, device_type_id, runtime_id])
    }

    /// `simctl delete <device>`
    pub fn delete(&self, device: &str) -> Result<CommandResult> {
        self.exec_args("delete", [device])
    }

    /// `simctl erase <device>`
    pub fn erase(&self, device: &str) -> Result<CommandResult> {
        self.exec_args("erase", [device])
    }

    /// `simctl boot <device>`
    pub fn boot(&self, device: &str) -> Result<CommandResult> {
        self.exec_args("boot", [device])
    }

    /// `simctl shutdown <device>`
    pub fn shutdown(&self, device: &str) -> Result<CommandResult> {
        self.exec_args("shutdown", [device])
    }

    /// `simctl rename <device> <name>`
    pub fn rename(&self, device: &str, name: &str) -> Result<CommandResult> {
        self.exec_args("rename", [device, name])
    }

    /// `simctl getenv <device> <variable name>`
    pub fn getenv(&self, device: &str, variable_name: &str) -> Result<CommandResult> {
        self.exec_args("getenv", [device, variable_name])
    }

    /// `simctl openurl <device> <url>`
    pub fn openurl(&self, device: &str, url: &str) -> Result<CommandResult> {
        self.exec_args("openurl", [device, url])
    }

    /// `simctl addphoto <device> <path>`
    pub fn addphoto(&self, device: &str, path: &str) -> Result<CommandResult> {
        self.exec_args("addphoto", [device, path])
    }

    /// `simctl install <device> <path>`
    pub fn install(&self, device: &str, path: &str) -> Result<CommandResult> {
        self.exec_args("install", [device, path])
    }

    /// `simctl uninstall <device> <app identifier>`
    pub fn uninstall(&self, device: &str, app_identifier: &str) -> Result<CommandResult> {
        self.exec_args("uninstall", [device, app_identifier])
    }

    /// `simctl launch <device> <app identifier> [argv...] [--wait-for-debugger]`
    pub fn launch(&self, options: &LaunchOptions) -> Result<CommandResult> {
        let mut flags = Vec::new();
        if options.wait_for_debugger {
            flags.push(WAIT_FOR_DEBUGGER_FLAG.to_string());
        }

        let args = [options.device.as_str(), options.app_identifier.as_str()]
            .into_iter()
            .chain(options.argv.iter().map(String::as_str));

        self.exec("launch", args, flags, self.default_options())
    }

    /// `simctl spawn <device> <executable> [argv...] [--wait-for-debugger] [--arch="<arch>"]`
    pub fn spawn(&self, options: &SpawnOptions) -> Result<CommandResult> {
        let mut flags = Vec::new();
        if options.wait_for_debugger {
            flags.push(WAIT_FOR_DEBUGGER_FLAG.to_string());
        }
        if let Some(arch) = options.arch.as_deref().filter(|a| !a.is_empty()) {
            flags.push(format!("--arch={}", quote(arch)));
        }

        let args = [options.device.as_str(), options.path_to_executable.as_str()]
            .into_iter()
            .chain(options.argv.iter().map(String::as_str));

        self.exec("spawn", args, flags, self.default_options())
    }

    /// `simctl list <category> --json`
    ///
    /// On exit code 0 the output is decoded into [`CommandResult::json`].
    /// Decode failures are logged and leave `json` empty.
    pub fn list(&self, options: ListOptions) -> Result<CommandResult> {
        let exec_options = ExecOptions {
            silent: options.silent.unwrap_or(self.config.silent),
        };

        let mut result = self.exec(
            "list",
            [options.category.keyword()],
            [JSON_FLAG],
            exec_options,
        )?;

        if result.success() {
            match serde_json::from_str(&result.output) {
                Ok(json) => result.json = Some(json),
                Err(e) => tracing::error!("Failed to decode simctl list output: {}", e),
            }
        }

        Ok(result)
    }

    /// Silently list devices and decode them into a [`DeviceListing`]
    ///
    /// Unlike [`list`](Self::list), every failure here is an error.
    pub fn list_devices(&self) -> Result<DeviceListing> {
        let result = self.list(ListOptions::new(ListCategory::Devices).with_silent(true))?;
        decode_listing(&result)
    }

    /// `simctl notify_post <device> <notification name>`
    pub fn notify_post(&self, device: &str, notification_name: &str) -> Result<CommandResult> {
        self.exec_args("notify_post", [device, notification_name])
    }

    /// `simctl icloud_sync <device>`
    pub fn icloud_sync(&self, device: &str) -> Result<CommandResult> {
        self.exec_args("icloud_sync", [device])
    }
}

/// Decode a device listing, treating failure and `null` as errors
pub(crate) fn decode_listing(result: &CommandResult) -> Result<DeviceListing> {
    if !result.success() {
        return Err(SimctlError::ListingFailed {
            code: result.code,
            output: result.combined_output(),
        });
    }

    let listing: Option<DeviceListing> = serde_json::from_str(&result.output)?;
    listing.ok_or(SimctlError::ListingMissing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;

    mock! {
        pub Runner {}

        impl CommandRunner for Runner {
            fn run(&self, command_line: &str, options: ExecOptions) -> Result<CommandResult>;
        }
    }

    fn dispatcher(runner: MockRunner) -> SimCtl<MockRunner> {
        SimCtl::with_runner(SimctlConfig::default(), runner)
    }

    fn expect_line(runner: &mut MockRunner, expected: &'static str, code: i32, output: &'static str) {
        runner
            .expect_run()
            .withf(move |line, _| line == expected)
            .times(1)
            .returning(move |_, _| Ok(CommandResult::new(code, output)));
    }

    #[test]
    fn test_simple_subcommands_quote_positionals() {
        let mut runner = MockRunner::new();
        expect_line(&mut runner, "xcrun simctl create \"My Phone\" \"com.apple.iphone\" \"com.apple.ios-17\"", 0, "NEW-UDID\n");
        expect_line(&mut runner, "xcrun simctl delete \"A\"", 0, "");
        expect_line(&mut runner, "xcrun simctl rename \"A\" \"New Name\"", 0, "");
        expect_line(&mut runner, "xcrun simctl openurl \"A\" \"https://example.com?q=1\"", 0, "");
        expect_line(&mut runner, "xcrun simctl notify_post \"A\" \"com.example.ping\"", 0, "");
        expect_line(&mut runner, "xcrun simctl icloud_sync \"A\"", 0, "");

        let simctl = dispatcher(runner);
        assert_eq!(
            simctl
                .create("My Phone", "com.apple.iphone", "com.apple.ios-17")
                .unwrap()
                .output,
            "NEW-UDID\n"
        );
        simctl.delete("A").unwrap();
        simctl.rename("A", "New Name").unwrap();
        simctl.openurl("A", "https://example.com?q=1").unwrap();
        simctl.notify_post("A", "com.example.ping").unwrap();
        simctl.icloud_sync("A").unwrap();
    }

    #[test]
    fn test_non_zero_exit_is_returned_as_data() {
        let mut runner = MockRunner::new();
        expect_line(&mut runner, "xcrun simctl boot \"missing\"", 148, "Invalid device: missing");

        let result = dispatcher(runner).boot("missing").unwrap();
        assert_eq!(result.code, 148);
        assert_eq!(result.output, "Invalid device: missing");
    }

    #[test]
    fn test_help_with_and_without_subcommand() {
        let mut runner = MockRunner::new();
        expect_line(&mut runner, "xcrun simctl help", 0, "usage");
        expect_line(&mut runner, "xcrun simctl help \"boot\"", 0, "boot usage");

        let simctl = dispatcher(runner);
        assert_eq!(simctl.help(None).unwrap().output, "usage");
        assert_eq!(simctl.help(Some("boot")).unwrap().output, "boot usage");
    }

    #[test]
    fn test_launch_flags_follow_arguments() {
        let mut runner = MockRunner::new();
        expect_line(
            &mut runner,
            "xcrun simctl launch \"A\" \"com.example.app\" \"-flag\" \"value\" --wait-for-debugger",
            0,
            "com.example.app: 4242",
        );

        let options = LaunchOptions::new("A", "com.example.app")
            .wait_for_debugger(true)
            .args(["-flag", "value"]);
        dispatcher(runner).launch(&options).unwrap();
    }

    #[test]
    fn test_spawn_arch_flag_is_quoted_inside() {
        let mut runner = MockRunner::new();
        expect_line(
            &mut runner,
            "xcrun simctl spawn \"A\" \"/usr/bin/log\" \"stream\" --wait-for-debugger --arch=\"x86_64\"",
            0,
            "",
        );
        expect_line(&mut runner, "xcrun simctl spawn \"A\" \"/bin/ls\"", 0, "");

        let simctl = dispatcher(runner);
        let options = SpawnOptions::new("A", "/usr/bin/log")
            .wait_for_debugger(true)
            .arch("x86_64")
            .args(["stream"]);
        simctl.spawn(&options).unwrap();
        simctl.spawn(&SpawnOptions::new("A", "/bin/ls")).unwrap();
    }

    #[test]
    fn test_list_devices_decodes_json() {
        let mut runner = MockRunner::new();
        runner
            .expect_run()
            .withf(|line, options| line == "xcrun simctl list \"devices\" --json" && !options.silent)
            .times(1)
            .returning(|_, _| Ok(CommandResult::new(0, r#"{"devices":{"iOS 14":[]}}"#)));

        let result = dispatcher(runner).list(ListOptions::devices()).unwrap();
        let json = result.json.expect("json should be decoded");
        assert!(json["devices"]["iOS 14"].is_array());
    }

    #[test]
    fn test_list_malformed_json_leaves_json_empty() {
        let mut runner = MockRunner::new();
        runner
            .expect_run()
            .returning(|_, _| Ok(CommandResult::new(0, "{not json")));

        let result = dispatcher(runner).list(ListOptions::devices()).unwrap();
        assert_eq!(result.code, 0);
        assert!(result.json.is_none());
        assert_eq!(result.output, "{not json");
    }

    #[test]
    fn test_list_failure_skips_decode() {
        let mut runner = MockRunner::new();
        runner
            .expect_run()
            .returning(|_, _| Ok(CommandResult::new(1, "{}")));

        let result = dispatcher(runner).list(ListOptions::default()).unwrap();
        assert!(result.json.is_none());
    }

    #[test]
    fn test_unfiltered_list_passes_empty_keyword() {
        let mut runner = MockRunner::new();
        expect_line(&mut runner, "xcrun simctl list \"\" --json", 0, "{}");

        let result = dispatcher(runner)
            .list(ListOptions::default().with_silent(true))
            .unwrap();
        assert_eq!(result.json, Some(serde_json::json!({})));
    }

    #[test]
    fn test_check_prerequisites_substitutes_message() {
        let mut runner = MockRunner::new();
        runner
            .expect_run()
            .withf(|line, options| line == "xcrun simctl help" && options.silent)
            .times(1)
            .returning(|_, _| Ok(CommandResult::new(72, "xcrun: error: unable to find utility")));

        let result = dispatcher(runner).check_prerequisites().unwrap();
        assert_eq!(result.code, 72);
        assert_eq!(result.output, MISSING_SIMCTL_MESSAGE);
    }

    #[test]
    fn test_check_prerequisites_keeps_output_on_success() {
        let mut runner = MockRunner::new();
        expect_line(&mut runner, "xcrun simctl help", 0, "usage: simctl");

        let result = dispatcher(runner).check_prerequisites().unwrap();
        assert_eq!(result.output, "usage: simctl");
    }

    #[test]
    fn test_configured_silence_applies_to_subcommands() {
        let mut runner = MockRunner::new();
        runner
            .expect_run()
            .withf(|_, options| options.silent)
            .times(1)
            .returning(|_, _| Ok(CommandResult::default()));

        let config = SimctlConfig {
            silent: true,
            ..Default::default()
        };
        SimCtl::with_runner(config, runner).erase("A").unwrap();
    }

    #[test]
    fn test_decode_listing_errors() {
        let failed = decode_listing(&CommandResult::new(1, "")).unwrap_err();
        assert!(matches!(failed, SimctlError::ListingFailed { code: 1, .. }));

        let garbage = decode_listing(&CommandResult::new(0, "<html>")).unwrap_err();
        assert!(matches!(garbage, SimctlError::ListingParse(_)));

        let null = decode_listing(&CommandResult::new(0, "null")).unwrap_err();
        assert!(matches!(null, SimctlError::ListingMissing));
    }
}
