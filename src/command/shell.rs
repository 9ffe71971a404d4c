//! Real process execution through `sh -c`

use super::runner_trait::CommandRunner;
use crate::config::ExecOptions;
use crate::error::{Result, SimctlError};
use crate::types::{CommandResult, SIGNALLED_EXIT_CODE};
use std::io::Write;
use std::process::{Command, Stdio};
use std::time::Instant;

/// Runs command lines through a POSIX shell and blocks until they exit
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
}

impl ShellRunner {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new("sh")
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, command_line: &str, options: ExecOptions) -> Result<CommandResult> {
        tracing::debug!(shell = %self.shell, "exec: {}", command_line);
        let started = Instant::now();

        let out = Command::new(&self.shell)
            .arg("-c")
            .arg(command_line)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| SimctlError::Spawn {
                command: command_line.to_string(),
                source,
            })?;

        let code = out.status.code().unwrap_or_else(|| {
            tracing::warn!("`{}` was terminated by a signal", command_line);
            SIGNALLED_EXIT_CODE
        });

        let result = CommandResult::new(code, String::from_utf8_lossy(&out.stdout))
            .with_stderr(String::from_utf8_lossy(&out.stderr));

        tracing::trace!(
            code,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "exec finished: {}",
            command_line
        );

        if !options.silent {
            echo(&result);
        }

        Ok(result)
    }
}

fn echo(result: &CommandResult) {
    // Console echo is best effort; a closed stdout must not fail the command.
    let _ = std::io::stdout().write_all(result.output.as_bytes());
    let _ = std::io::stderr().write_all(result.stderr.as_bytes());
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_captures_stdout_and_code() {
        let runner = ShellRunner::default();
        let result = runner.run("printf hello", ExecOptions::silent()).unwrap();
        assert_eq!(result.code, 0);
        assert_eq!(result.output, "hello");
        assert!(result.json.is_none());
    }

    #[test]
    fn test_non_zero_exit_is_data() {
        let runner = ShellRunner::default();
        let result = runner
            .run("echo oops >&2; exit 3", ExecOptions::silent())
            .unwrap();
        assert_eq!(result.code, 3);
        assert_eq!(result.stderr, "oops\n");
    }

    #[test]
    fn test_quoted_args_reach_program_intact() {
        let runner = ShellRunner::default();
        let result = runner
            .run("printf '%s|' \"a b\" \"c\"", ExecOptions::silent())
            .unwrap();
        assert_eq!(result.output, "a b|c|");
    }

    #[test]
    fn test_missing_shell_is_spawn_error() {
        let runner = ShellRunner::new("/definitely/not/a/shell");
        let err = runner.run("true", ExecOptions::silent()).unwrap_err();
        assert!(matches!(err, SimctlError::Spawn { .. }));
    }
}
