//! Content enrichment pipeline (§4.3): per canonical event, resolve a prior
//! content record, fetch source pages, extract description/images, polish
//! through a pluggable backend, download images, and persist a content run.

pub mod category;
pub mod csv_row;
pub mod engine;
pub mod extract;
pub mod fetch;
pub mod images;
pub mod polish;
pub mod record;
pub mod selection;
pub mod signature;
pub mod summary;

use thiserror::Error;

/// Fatal errors surfaced by the content stage. Per-record fetch/extract/
/// polish failures never reach this type: they are recorded on the
/// [`record::ContentRecord`] itself (`status`, `error`).
#[derive(Debug, Error)]
pub enum ContentError {
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

impl ContentError {
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
