//! Run-id minting and the per-project `latest_run.json` pointer (§3
//! "Lifecycles", §4.3 "Persistence").
//!
//! Every stage writes into a fresh `<root>/<run_id>/` directory and never
//! mutates a prior one; supersession is by swapping `latest_run.json` to
//! point at the new run, written last so a reader never sees a
//! `latest_run.json` referencing an incomplete directory.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mints a sortable run id from the given instant, e.g. `run-20260728T091500Z`.
#[must_use]
pub fn new_run_id(now: DateTime<Utc>) -> String {
    format!("run-{}", now.format("%Y%m%dT%H%M%SZ"))
}

/// The per-project `latest_run.json` pointer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestRun {
    pub run_id: String,
    pub updated_at: DateTime<Utc>,
}

impl LatestRun {
    /// Reads `<root>/latest_run.json`, if present.
    #[must_use]
    pub fn read(root: &Path) -> Option<Self> {
        let raw = std::fs::read_to_string(root.join("latest_run.json")).ok()?;
        serde_json::from_str(&raw).ok()
    }

    /// Writes `<root>/latest_run.json` via write-then-rename so a reader
    /// never observes a half-written pointer file.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error on a failed write or rename.
    pub fn write(root: &Path, run_id: &str, now: DateTime<Utc>) -> std::io::Result<()> {
        let pointer = Self {
            run_id: run_id.to_string(),
            updated_at: now,
        };
        let final_path = root.join("latest_run.json");
        let tmp_path = root.join("latest_run.json.tmp");
        std::fs::write(&tmp_path, serde_json::to_string_pretty(&pointer)?)?;
        std::fs::rename(&tmp_path, &final_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_is_sortable_and_stable_for_same_instant() {
        let now = DateTime::parse_from_rfc3339("2026-07-28T09:15:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(new_run_id(now), "run-20260728T091500Z");
    }

    #[test]
    fn latest_run_roundtrips_through_disk() {
        let dir = std::env::temp_dir().join(format!("tsugie_run_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let now = Utc::now();
        LatestRun::write(&dir, "run-20260728T091500Z", now).unwrap();
        let read_back = LatestRun::read(&dir).unwrap();
        assert_eq!(read_back.run_id, "run-20260728T091500Z");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_pointer_file_yields_none() {
        assert!(LatestRun::read(Path::new("/nonexistent/root/for/test")).is_none());
    }
}
