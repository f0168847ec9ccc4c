//! Error types for the decision engine.
//!
//! Nothing inside a tick returns an error: planners fall back to harmless
//! defaults instead. These variants cover what can go wrong around a tick,
//! when the engine is built or when configuration and logs cross the IO
//! boundary.

use thiserror::Error;

/// Result type alias using [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;

/// Top-level error type for the engine crate.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Game rules describe an impossible world.
    #[error("Invalid game rules: {0}")]
    InvalidRules(String),

    /// Configuration file does not exist.
    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    /// Failed to read a file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse RON configuration.
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),

    /// Failed to encode or decode a decision log.
    #[error("Decision log encoding failed: {0}")]
    LogEncoding(#[from] bincode::Error),

    /// Decision log was written by an incompatible version.
    #[error("Unsupported decision log version {found}, expected {expected}")]
    LogVersion {
        /// Version found in the file.
        found: u32,
        /// Version this build writes.
        expected: u32,
    },
}
