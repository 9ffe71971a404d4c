//! Command line assembly
//!
//! Positional arguments are wrapped verbatim in double quotes. Nothing else
//! is escaped: an argument containing `"` or `$` reaches the shell as-is.
//! Flags are pre-formatted by the caller and appended unquoted.

use crate::config::SimctlConfig;
use std::fmt;

/// Flag inserted ahead of the subcommand when `noxpc` is configured
pub const NOXPC_FLAG: &str = "--noxpc";

/// Wrap a single argument in double quotes
pub fn quote(arg: &str) -> String {
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    quoted.push_str(arg);
    quoted.push('"');
    quoted
}

/// A shell command line built from raw tokens and quoted arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    parts: Vec<String>,
}

impl CommandLine {
    /// Start a command line with unquoted program tokens (e.g. `xcrun simctl`)
    pub fn new<I, S>(program: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            parts: program.into_iter().map(Into::into).collect(),
        }
    }

    /// Append an unquoted token
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.parts.push(token.into());
        self
    }

    /// Append several unquoted tokens
    pub fn tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parts.extend(tokens.into_iter().map(Into::into));
        self
    }

    /// Append a quoted positional argument
    pub fn quoted(mut self, arg: impl AsRef<str>) -> Self {
        self.parts.push(quote(arg.as_ref()));
        self
    }

    /// Append several quoted positional arguments, in order
    pub fn quoted_all<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.parts
            .extend(args.into_iter().map(|a| quote(a.as_ref())));
        self
    }

    /// The rendered pieces, in order
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Join all parts with single spaces
    pub fn render(&self) -> String {
        self.parts.join(" ")
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Build `<runner> [--noxpc] <action> "<arg>"... <flag>...`
pub fn simctl_command<A, F>(config: &SimctlConfig, action: &str, args: A, flags: F) -> CommandLine
where
    A: IntoIterator,
    A::Item: AsRef<str>,
    F: IntoIterator,
    F::Item: Into<String>,
{
    debug_assert!(!action.is_empty(), "simctl subcommand must not be empty");

    let mut line = CommandLine::new(config.runner.iter().cloned());
    if config.noxpc {
        line = line.token(NOXPC_FLAG);
    }
    line.token(action).quoted_all(args).tokens(flags)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_ARGS: [&str; 0] = [];

    #[test]
    fn test_quote_is_verbatim() {
        assert_eq!(quote("iPhone 12"), "\"iPhone 12\"");
        assert_eq!(quote(""), "\"\"");
        assert_eq!(quote("a\"b"), "\"a\"b\"");
    }

    #[test]
    fn test_simctl_command_order() {
        let config = SimctlConfig::default();
        let line = simctl_command(&config, "launch", ["A", "com.example.app"], ["--wait-for-debugger"]);
        assert_eq!(
            line.render(),
            "xcrun simctl launch \"A\" \"com.example.app\" --wait-for-debugger"
        );
    }

    #[test]
    fn test_simctl_command_without_args() {
        let config = SimctlConfig::default();
        let line = simctl_command(&config, "list", NO_ARGS, ["-j"]);
        assert_eq!(line.to_string(), "xcrun simctl list -j");
    }

    #[test]
    fn test_noxpc_precedes_subcommand() {
        let config = SimctlConfig::default().with_noxpc(true);
        let line = simctl_command(&config, "boot", ["A"], NO_ARGS);
        assert_eq!(line.render(), "xcrun simctl --noxpc boot \"A\"");
    }

    #[test]
    fn test_custom_runner() {
        let config = SimctlConfig {
            runner: vec!["/usr/bin/xcrun".into(), "--sdk".into(), "iphonesimulator".into(), "simctl".into()],
            ..Default::default()
        };
        let line = simctl_command(&config, "erase", ["all"], NO_ARGS);
        assert_eq!(
            line.parts(),
            &["/usr/bin/xcrun", "--sdk", "iphonesimulator", "simctl", "erase", "\"all\""]
        );
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_args_follow_action_then_flags(
            args in prop::collection::vec("[a-zA-Z0-9 ._-]{0,12}", 0..8),
            flags in prop::collection::vec("--[a-z]{1,8}", 0..4)
        ) {
            let config = SimctlConfig::default();
            let line = simctl_command(&config, "spawn", &args, flags.clone());
            let parts = line.parts();

            prop_assert_eq!(&parts[..3], &["xcrun", "simctl", "spawn"]);
            for (i, arg) in args.iter().enumerate() {
                prop_assert_eq!(&parts[3 + i], &quote(arg));
            }
            for (i, flag) in flags.iter().enumerate() {
                prop_assert_eq!(&parts[3 + args.len() + i], flag);
            }
            prop_assert_eq!(parts.len(), 3 + args.len() + flags.len());
        }
    }
}
