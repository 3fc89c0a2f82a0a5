//! Crate-root error type for `tsugie_core`.
//!
//! Per the propagation policy shared across all `tsugie_*` crates: this
//! enum covers configuration/invariant failures only. Per-record failures
//! (parse errors, geocoder errors, HTTP failures) are never represented
//! here — they are recorded to diagnostic logs by the calling stage.

use thiserror::Error;

/// Fatal errors raised before or outside of per-record processing.
#[derive(Debug, Error)]
pub enum CoreError {
    /// I/O failure reading/writing a config, cache, or schema file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A CSV reader/writer failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration was present but malformed or internally inconsistent.
    #[error("configuration error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },
}

impl CoreError {
    /// Builds a [`CoreError::Config`] from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
