//! Error handling for simctl-rs
//!
//! Non-zero exit codes from `simctl` are returned as data inside
//! [`CommandResult`](crate::types::CommandResult). The errors here cover the
//! cases where a result would be meaningless: the process could not be
//! spawned, the device listing is unusable, or a device does not exist.

use thiserror::Error;

/// Main error type for simctl-rs operations
#[derive(Error, Debug)]
pub enum SimctlError {
    /// The shell or program could not be started at all
    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The device listing command exited with a non-zero code
    #[error("Unable to fetch list of devices (exit code {code})")]
    ListingFailed { code: i32, output: String },

    /// The device listing was not valid JSON
    #[error("Failed to parse device list: {0}")]
    ListingParse(#[from] serde_json::Error),

    /// The device listing decoded to nothing
    #[error("No device list found")]
    ListingMissing,

    /// No device with the given UDID exists in the listing
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// A log tail sink could not accept a line
    #[error("Log sink error: {0}")]
    Sink(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<SimctlError>,
    },
}

impl SimctlError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        SimctlError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error (or the error it wraps) is a missing device
    pub fn is_device_not_found(&self) -> bool {
        match self {
            SimctlError::DeviceNotFound(_) => true,
            SimctlError::WithContext { source, .. } => source.is_device_not_found(),
            _ => false,
        }
    }
}

/// Result type alias for simctl-rs operations
pub type Result<T> = std::result::Result<T, SimctlError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| SimctlError::Io(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| SimctlError::Io(e).with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SimctlError::DeviceNotFound("ABC-123".to_string());
        assert_eq!(err.to_string(), "Device not found: ABC-123");
    }

    #[test]
    fn test_error_with_context() {
        let err = SimctlError::ListingMissing;
        let with_ctx = err.with_context("Checking boot state");
        assert!(with_ctx.to_string().contains("Checking boot state"));
        assert!(with_ctx.to_string().contains("No device list found"));
    }

    #[test]
    fn test_device_not_found_through_context() {
        let err = SimctlError::DeviceNotFound("C".into()).with_context("start");
        assert!(err.is_device_not_found());
        assert!(!SimctlError::ListingMissing.is_device_not_found());
    }

    #[test]
    fn test_listing_failed_mentions_code() {
        let err = SimctlError::ListingFailed {
            code: 72,
            output: String::new(),
        };
        assert!(err.to_string().contains("72"));
    }

    #[test]
    fn test_io_result_context() {
        let res: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        let err = res.context("Opening system.log").unwrap_err();
        assert!(err.to_string().starts_with("Opening system.log"));
    }
}
