#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all)]

//! Thin CLI entry point for the tsugie event-aggregation pipeline.
//!
//! Parses arguments, constructs the relevant stage config, and calls into
//! the stage crates; all real logic lives in `tsugie_fusion`,
//! `tsugie_content`, `tsugie_score`, and `tsugie_export` so it stays
//! testable without a process boundary (mirrors
//! `packages/ingest/src/main.rs`'s `Commands` enum shape).

mod common;
mod enrich;
mod export;
mod fuse;
mod logging;
mod pipeline;
mod repair_geo;
mod score;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tsugie", about = "Japanese fireworks/festival event aggregation pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fuse per-site raw streams into one canonical event set.
    Fuse {
        /// Comma-separated site ids to read from `<raw_dir>/<site>.jsonl`.
        #[arg(long, value_delimiter = ',')]
        sites: Vec<String>,
        /// Explicit run id; a fresh one is minted if omitted.
        #[arg(long)]
        run_id: Option<String>,
        /// Drop rows whose extracted year doesn't match this value.
        #[arg(long)]
        target_year: Option<i32>,
        /// Require `--target-year` and drop non-matching rows.
        #[arg(long)]
        strict_year: bool,
    },
    /// Re-resolve coincident low-confidence coordinates in a fused run.
    RepairGeo {
        /// Fused run to repair; defaults to `latest_run.json`.
        #[arg(long)]
        fused_run_id: Option<String>,
    },
    /// Enrich a fused run's events with description/images/polish.
    Enrich {
        /// Fused run to read; defaults to `latest_run.json`.
        #[arg(long)]
        fused_run_id: Option<String>,
        /// Explicit run id; a fresh one is minted if omitted.
        #[arg(long)]
        run_id: Option<String>,
    },
    /// Score a fused run's events, joined against a content run.
    Score {
        /// Fused run to read; defaults to `latest_run.json`.
        #[arg(long)]
        fused_run_id: Option<String>,
        /// Content run to join against; defaults to `latest_run.json`.
        #[arg(long)]
        content_run_id: Option<String>,
        /// Explicit run id; a fresh one is minted if omitted.
        #[arg(long)]
        run_id: Option<String>,
    },
    /// Build the obfuscated spatial export bundle.
    Export {
        /// Fused run to read; defaults to `latest_run.json`.
        #[arg(long)]
        fused_run_id: Option<String>,
        /// Content run to join against; defaults to `latest_run.json`.
        #[arg(long)]
        content_run_id: Option<String>,
        /// Score run to join against; defaults to `latest_run.json`.
        #[arg(long)]
        score_run_id: Option<String>,
        /// Run the full join/bucket/obfuscate/self-check pass without
        /// writing the bundle files or updating `latest_run.json`.
        #[arg(long)]
        dry_run: bool,
    },
    /// Runs fuse -> repair-geo -> enrich -> score -> export in one pass.
    Pipeline {
        /// Comma-separated site ids to read from `<raw_dir>/<site>.jsonl`.
        #[arg(long, value_delimiter = ',')]
        sites: Vec<String>,
        /// Drop rows whose extracted year doesn't match this value.
        #[arg(long)]
        target_year: Option<i32>,
        /// Require `--target-year` and drop non-matching rows.
        #[arg(long)]
        strict_year: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = logging::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Fuse {
            sites,
            run_id,
            target_year,
            strict_year,
        } => {
            fuse::run(fuse::FuseArgs {
                sites,
                run_id,
                target_year,
                strict_year,
            })
            .await?;
        }
        Commands::RepairGeo { fused_run_id } => {
            let fusion_config = tsugie_core::config::FusionConfig::from_env()?;
            repair_geo::run(repair_geo::RepairGeoArgs {
                fused_root: fusion_config.fused_root,
                fused_run_id,
            })
            .await?;
        }
        Commands::Enrich { fused_run_id, run_id } => {
            enrich::run(enrich::EnrichArgs { fused_run_id, run_id }).await?;
        }
        Commands::Score {
            fused_run_id,
            content_run_id,
            run_id,
        } => {
            score::run(score::ScoreArgs {
                fused_run_id,
                content_run_id,
                run_id,
            })
            .await?;
        }
        Commands::Export {
            fused_run_id,
            content_run_id,
            score_run_id,
            dry_run,
        } => {
            export::run(export::ExportArgs {
                fused_run_id,
                content_run_id,
                score_run_id,
                dry_run,
            })
            .await?;
        }
        Commands::Pipeline {
            sites,
            target_year,
            strict_year,
        } => {
            pipeline::run(
                &multi,
                pipeline::PipelineArgs {
                    sites,
                    target_year,
                    strict_year,
                },
            )
            .await?;
        }
    }

    Ok(())
}
