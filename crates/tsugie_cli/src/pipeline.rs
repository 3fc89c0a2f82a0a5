//! `pipeline` subcommand: chains fuse -> repair-geo -> enrich -> score ->
//! export in one invocation, with one `indicatif` spinner per stage
//! (mirrors `packages/cli/src/pipeline.rs`'s chained-stage orchestrator).

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::common::mint_run_id;
use crate::{enrich, export, fuse, repair_geo, score};

pub struct PipelineArgs {
    pub sites: Vec<String>,
    pub target_year: Option<i32>,
    pub strict_year: bool,
}

fn spinner(multi: &MultiProgress, message: &str) -> ProgressBar {
    let bar = multi.add(ProgressBar::new_spinner());
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(std::time::Duration::from_millis(120));
    bar
}

/// Runs all five stages back to back, threading each stage's run id into
/// the next so the chain is self-consistent even when concurrent runs are
/// landing `latest_run.json` pointers elsewhere.
///
/// # Errors
///
/// Returns the first stage's error; later stages do not run.
pub async fn run(multi: &MultiProgress, args: PipelineArgs) -> Result<(), Box<dyn std::error::Error>> {
    let fused_run_id = mint_run_id();
    let content_run_id = mint_run_id();
    let score_run_id = mint_run_id();

    let bar = spinner(multi, "[1/5] fuse");
    fuse::run(fuse::FuseArgs {
        sites: args.sites.clone(),
        run_id: Some(fused_run_id.clone()),
        target_year: args.target_year,
        strict_year: args.strict_year,
    })
    .await?;
    bar.finish_with_message("[1/5] fuse complete");

    let bar = spinner(multi, "[2/5] repair-geo");
    let fusion_config = tsugie_core::config::FusionConfig::from_env()?;
    repair_geo::run(repair_geo::RepairGeoArgs {
        fused_root: fusion_config.fused_root,
        fused_run_id: Some(fused_run_id.clone()),
    })
    .await?;
    bar.finish_with_message("[2/5] repair-geo complete");

    let bar = spinner(multi, "[3/5] enrich");
    enrich::run(enrich::EnrichArgs {
        fused_run_id: Some(fused_run_id.clone()),
        run_id: Some(content_run_id.clone()),
    })
    .await?;
    bar.finish_with_message("[3/5] enrich complete");

    let bar = spinner(multi, "[4/5] score");
    score::run(score::ScoreArgs {
        fused_run_id: Some(fused_run_id.clone()),
        content_run_id: Some(content_run_id.clone()),
        run_id: Some(score_run_id.clone()),
    })
    .await?;
    bar.finish_with_message("[4/5] score complete");

    let bar = spinner(multi, "[5/5] export");
    export::run(export::ExportArgs {
        fused_run_id: Some(fused_run_id),
        content_run_id: Some(content_run_id),
        score_run_id: Some(score_run_id),
        dry_run: false,
    })
    .await?;
    bar.finish_with_message("[5/5] export complete");

    Ok(())
}
