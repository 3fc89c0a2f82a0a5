//! Obfuscated spatial export (§4.5): join fused+content+score, derive
//! client-visible entries, and emit a geohash-bucketed, zlib-compressed,
//! XOR-stream-obfuscated payload pair plus a deduplicated image payload.

pub mod entry;
pub mod engine;
pub mod images;
pub mod index;
pub mod spatial;

use thiserror::Error;

/// Fatal errors surfaced by the export stage. Per-self-check-failure
/// aborts the run per §7's "codec self-check failure: fatal" policy.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("core error: {0}")]
    Core(#[from] tsugie_core::CoreError),

    #[error("image processing error: {0}")]
    Image(String),

    #[error("obfuscation self-check failed: decompressed/unobfuscated bytes did not match the source")]
    SelfCheckFailed,

    #[error("configuration error: {message}")]
    Config { message: String },
}

impl ExportError {
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
