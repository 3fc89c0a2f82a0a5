//! Scoring pipeline (§4.4): build a bounded model input per fused row,
//! score it with a remote chat model or a deterministic heuristic
//! fallback, and reuse prior scores where allowed.

pub mod csv_row;
pub mod engine;
pub mod heuristic;
pub mod input;
pub mod record;
pub mod remote;

use thiserror::Error;

/// Fatal errors surfaced by the scoring stage. Per-record scoring
/// failures never reach this type: they fall back to the heuristic and
/// are recorded on the [`record::ScoreRecord`] itself (`status`, `error`).
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("core error: {0}")]
    Core(#[from] tsugie_core::CoreError),

    #[error("configuration error: {message}")]
    Config { message: String },
}

impl ScoreError {
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
