//! Shared run-id resolution and `latest_run.json` bookkeeping used by
//! every stage subcommand.

use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use tsugie_core::run::{new_run_id, LatestRun};

/// Mints a fresh run id from the current instant.
#[must_use]
pub fn mint_run_id() -> String {
    new_run_id(Utc::now())
}

/// Resolves the run id a stage should read from: the explicit
/// `--*-run-id` flag if given, else the target root's `latest_run.json`.
///
/// # Errors
///
/// Returns an error if no explicit id was given and no
/// `latest_run.json` exists under `root`.
pub fn resolve_input_run_id(explicit: Option<String>, root: &Path) -> Result<String, String> {
    if let Some(id) = explicit {
        return Ok(id);
    }
    LatestRun::read(root)
        .map(|latest| latest.run_id)
        .ok_or_else(|| format!("no --run-id given and no latest_run.json found under {}", root.display()))
}

/// Writes `<root>/latest_run.json` pointing at `run_id`, logging a
/// warning (non-fatal) on failure rather than aborting the stage.
pub fn update_latest_run(root: &Path, run_id: &str) {
    if let Err(e) = LatestRun::write(root, run_id, Utc::now()) {
        log::warn!("failed to update latest_run.json under {}: {e}", root.display());
    }
}

/// Writes one diagnostic CSV directly from its row type, creating parent
/// directories as needed. Used for the fixed-shape diagnostic logs
/// (`dedup_log.csv`, `geocode_log.csv`, …) that already have a
/// `Serialize`-derived row struct and need no projection.
///
/// # Errors
///
/// Returns the underlying [`csv::Error`] on I/O or encoding failure.
pub fn write_csv<T: Serialize>(rows: &[T], path: &Path) -> Result<(), csv::Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
