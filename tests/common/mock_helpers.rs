//! Mock construction helpers

use simctl_rs::{CommandResult, ScriptedRunner, SimCtl, SimctlConfig};

/// Dispatcher over a scripted runner with default config
pub fn scripted_dispatcher(runner: &ScriptedRunner) -> SimCtl<ScriptedRunner> {
    SimCtl::with_runner(SimctlConfig::default(), runner.clone())
}

/// Runner answering `xcodebuild -version` with the given major version
pub fn xcode_runner(major: u32) -> ScriptedRunner {
    ScriptedRunner::new().on(
        "xcodebuild -version",
        CommandResult::new(0, format!("Xcode {}.0\nBuild version TEST\n", major)),
    )
}

/// Successful command with the given stdout
pub fn ok(output: impl Into<String>) -> CommandResult {
    CommandResult::new(0, output)
}
