//! Error types for the scene pipeline
//!
//! Only recoverable conditions are represented here: disconnected stages,
//! backend failures, invalid configuration and failed integrity checks.
//! Broken invariants (unknown keys, wrong key kinds) panic at the call site.

use std::fmt;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Scene pipeline errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Initialization failed (render backend, stage threads)
    InitializationFailed(String),

    /// Render backend reported a failure
    BackendError(String),

    /// The stage owning a queue is gone (queue closed or promise dropped)
    StageDisconnected(String),

    /// A stage thread panicked
    StageFailed(String),

    /// A spatial index failed its structural self-check
    IntegrityViolation(String),

    /// Configuration rejected by `PipelineConfig::validate`
    InvalidConfig(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::StageDisconnected(msg) => write!(f, "Stage disconnected: {}", msg),
            Error::StageFailed(msg) => write!(f, "Stage failed: {}", msg),
            Error::IntegrityViolation(msg) => write!(f, "Integrity violation: {}", msg),
            Error::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

/// Log an error with file:line information and evaluate to the matching
/// `Error` variant.
///
/// # Example
///
/// ```ignore
/// return Err(pipeline_err!(InvalidConfig, "pipeline3d::Config", "bad extent {}", e));
/// ```
#[macro_export]
macro_rules! pipeline_err {
    ($variant:ident, $source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::pipeline_error!($source, "{}", message);
        $crate::pipeline3d::Error::$variant(message)
    }};
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
