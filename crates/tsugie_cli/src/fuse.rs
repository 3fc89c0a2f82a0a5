//! `fuse` subcommand (§4.1): raw streams in, canonical events + diagnostics
//! out.

use tsugie_core::config::{FusionConfig, GeocoderConfig};
use tsugie_core::summary::SummaryLine;
use tsugie_fusion::csv_row::write_fused_csv;
use tsugie_geocoder::Geocoder;

use crate::common::{mint_run_id, update_latest_run, write_csv};

pub struct FuseArgs {
    pub sites: Vec<String>,
    pub run_id: Option<String>,
    pub target_year: Option<i32>,
    pub strict_year: bool,
}

/// Runs the fusion stage and persists its artifacts under
/// `<fused_root>/<run_id>/`.
///
/// # Errors
///
/// Propagates configuration, geocoder, and I/O failures.
pub async fn run(args: FuseArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = FusionConfig::from_env()?;
    if args.target_year.is_some() {
        config.target_year = args.target_year;
    }
    if args.strict_year {
        config.strict_year = true;
    }

    let geocoder_config = GeocoderConfig::from_env()?;
    let mut geocoder = Geocoder::load(&geocoder_config.base_url, geocoder_config.qps, &geocoder_config.cache_path)?;

    let run_id = args.run_id.unwrap_or_else(mint_run_id);
    let run_dir = config.fused_root.join(&run_id);

    let output = tsugie_fusion::engine::run(&args.sites, &config, &mut geocoder).await?;

    tsugie_core::jsonl::write(&run_dir.join("events_fused.jsonl"), &output.events)?;
    write_fused_csv(&output.events, &run_dir.join("events_fused.csv"))?;
    write_csv(&output.dedup_log, &run_dir.join("dedup_log.csv"))?;
    write_csv(&output.geocode_log, &run_dir.join("geocode_log.csv"))?;
    write_csv(&output.incomplete_events, &run_dir.join("incomplete_events.csv"))?;
    write_csv(&output.name_alias_candidates, &run_dir.join("name_alias_candidates.csv"))?;

    geocoder.save_cache(&geocoder_config.cache_path)?;
    update_latest_run(&config.fused_root, &run_id);

    println!(
        "{}",
        SummaryLine::new("fuse")
            .field("run_id", &run_id)
            .field("total_raw", output.total_raw)
            .field("skipped_parse_errors", output.skipped_parse_errors)
            .field("events", output.events.len())
            .field("incomplete", output.incomplete_events.len())
    );

    Ok(())
}
