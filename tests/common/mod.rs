//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use std::path::Path;
use std::time::{Duration, Instant};

/// How long tests wait for the log tail before giving up
pub fn test_timeout() -> Duration {
    Duration::from_secs(5)
}

/// Poll interval handed to log tails in tests
pub fn fast_poll() -> Duration {
    Duration::from_millis(10)
}

/// Wait until `path` holds exactly `expected`, returning what it last held
pub fn wait_for_contents(path: &Path, expected: &str) -> String {
    let deadline = Instant::now() + test_timeout();
    loop {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content == expected || Instant::now() >= deadline {
            return content;
        }
        std::thread::sleep(fast_poll());
    }
}
