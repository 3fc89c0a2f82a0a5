#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all)]

//! Fusion and deduplication engine (§4.1): reads per-site raw streams,
//! normalizes names, clusters rows into canonical groups, votes on
//! per-field winners, resolves coordinates, and writes fused records plus
//! diagnostic logs. Also owns the post-hoc coordinate overlap repair
//! pass (§4.1 "Overlap-repair").

pub mod canonical;
pub mod csv_row;
pub mod dedup;
pub mod diagnostics;
pub mod engine;
pub mod geocode_strategy;
pub mod incomplete;
pub mod normalize;
pub mod overlap_repair;
pub mod raw;
pub mod voting;
pub mod year;

use thiserror::Error;

pub use canonical::{CanonicalEvent, GeoSource, UpdatePriority};
pub use engine::FusionOutput;

/// Fatal errors surfaced by the fusion stage. Per-row parse failures and
/// geocoder errors never reach this type: they are skipped/counted or
/// recorded to a diagnostic log per §7's propagation policy.
#[derive(Debug, Error)]
pub enum FusionError {
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

impl FusionError {
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
