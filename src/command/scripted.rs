//! Scripted runner for testing and dry runs
//!
//! Replays canned [`CommandResult`]s instead of spawning processes and
//! records every command line it was asked to run.
//!
//! # Matching
//!
//! Rules are checked in the order they were added; the first rule whose
//! pattern is a substring of the command line wins. One-shot rules are
//! removed after they match once. Unmatched commands get the fallback
//! result (exit code 0, no output, unless changed).
//!
//! # Example
//!
//! ```ignore
//! let runner = ScriptedRunner::new()
//!     .on("xcodebuild -version", CommandResult::new(0, "Xcode 15.2\nBuild version 15C500b\n"))
//!     .on("simctl list -j", CommandResult::new(0, listing_json));
//!
//! let simctl = SimCtl::with_runner(SimctlConfig::default(), runner.clone());
//! simctl.extensions().start("A")?;
//! assert!(runner.calls().iter().any(|c| c.command_line.contains("boot")));
//! ```

use super::runner_trait::CommandRunner;
use crate::config::ExecOptions;
use crate::error::Result;
use crate::types::CommandResult;
use std::sync::{Arc, Mutex, MutexGuard};

/// One command line the runner was asked to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub command_line: String,
    pub options: ExecOptions,
}

#[derive(Debug, Clone)]
struct Rule {
    pattern: String,
    result: CommandResult,
    once: bool,
}

#[derive(Debug, Default)]
struct ScriptState {
    rules: Vec<Rule>,
    fallback: CommandResult,
    calls: Vec<RecordedCall>,
}

/// A [`CommandRunner`] that answers from a script
///
/// Cloning shares the script and the call log, so a test can keep a clone
/// after moving the runner into a dispatcher.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRunner {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every command containing `pattern` with `result`
    pub fn on(self, pattern: impl Into<String>, result: CommandResult) -> Self {
        self.push_rule(pattern.into(), result, false);
        self
    }

    /// Answer the next command containing `pattern` with `result`, once
    pub fn once(self, pattern: impl Into<String>, result: CommandResult) -> Self {
        self.push_rule(pattern.into(), result, true);
        self
    }

    /// Result for commands no rule matches
    pub fn fallback(self, result: CommandResult) -> Self {
        self.lock().fallback = result;
        self
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Command lines of every call made so far
    pub fn command_lines(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .map(|c| c.command_line.clone())
            .collect()
    }

    /// Forget recorded calls, keeping the script
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn push_rule(&self, pattern: String, result: CommandResult, once: bool) {
        self.lock().rules.push(Rule {
            pattern,
            result,
            once,
        });
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        // A panicking test thread must not hide the script from the others.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, command_line: &str, options: ExecOptions) -> Result<CommandResult> {
        let mut state = self.lock();
        state.calls.push(RecordedCall {
            command_line: command_line.to_string(),
            options,
        });

        let matched = state
            .rules
            .iter()
            .position(|rule| command_line.contains(&rule.pattern));

        let result = match matched {
            Some(index) if state.rules[index].once => state.rules.remove(index).result,
            Some(index) => state.rules[index].result.clone(),
            None => state.fallback.clone(),
        };

        tracing::trace!(code = result.code, "scripted: {}", command_line);
        Ok(result)
    }
}
