//! `content_summary.json` (§4.3 "Persistence"): a run-level rollup of
//! counts and configuration, written alongside the JSONL/CSV outputs.

use serde::Serialize;

use tsugie_core::config::ContentConfig;

use crate::engine::ContentOutput;

/// The `content_summary.json` document.
#[derive(Debug, Clone, Serialize)]
pub struct ContentSummary {
    pub run_id: String,
    pub fused_run_id: String,
    pub generated_at: String,
    pub selected: usize,
    pub reused_fresh: usize,
    pub reused_failed_only: usize,
    pub fetched_ok: usize,
    pub fetched_failed: usize,
    pub polish_mode: String,
    pub min_refresh_days: i64,
    pub failed_only: bool,
    pub force: bool,
}

impl ContentSummary {
    /// Builds the summary from one run's output and configuration.
    #[must_use]
    pub fn build(run_id: &str, fused_run_id: &str, output: &ContentOutput, config: &ContentConfig, generated_at: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            fused_run_id: fused_run_id.to_string(),
            generated_at: generated_at.to_string(),
            selected: output.selected,
            reused_fresh: output.reused_fresh,
            reused_failed_only: output.reused_failed_only,
            fetched_ok: output.fetched_ok,
            fetched_failed: output.fetched_failed,
            polish_mode: format!("{:?}", config.polish_mode.resolve()).to_lowercase(),
            min_refresh_days: config.min_refresh_days,
            failed_only: config.failed_only,
            force: config.force,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_from_output_and_config() {
        let output = ContentOutput {
            selected: 10,
            reused_fresh: 3,
            fetched_ok: 6,
            fetched_failed: 1,
            ..Default::default()
        };
        let config = ContentConfig::default();
        let summary = ContentSummary::build("run-a", "run-b", &output, &config, "2026-07-28T00:00:00Z");
        assert_eq!(summary.selected, 10);
        assert_eq!(summary.polish_mode, "none");
    }
}
