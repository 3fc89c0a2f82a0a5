//! `repair-geo` subcommand (§4.1 "Overlap-repair"): re-resolves coincident
//! low-confidence coordinates in an existing fused run, in place.

use tsugie_core::config::GeocoderConfig;
use tsugie_core::summary::SummaryLine;
use tsugie_fusion::canonical::CanonicalEvent;
use tsugie_fusion::csv_row::write_fused_csv;
use tsugie_geocoder::Geocoder;

use crate::common::{resolve_input_run_id, write_csv};

pub struct RepairGeoArgs {
    pub fused_root: std::path::PathBuf,
    pub fused_run_id: Option<String>,
}

/// Loads a fused run's events, repairs coincident low-confidence
/// coordinates, and overwrites the run's `events_fused.jsonl`/`.csv`.
///
/// # Errors
///
/// Propagates configuration, geocoder, and I/O failures, or an error if
/// no fused run can be resolved.
pub async fn run(args: RepairGeoArgs) -> Result<(), Box<dyn std::error::Error>> {
    let run_id = resolve_input_run_id(args.fused_run_id, &args.fused_root)?;
    let run_dir = args.fused_root.join(&run_id);

    let mut events: Vec<CanonicalEvent> = tsugie_core::jsonl::read(&run_dir.join("events_fused.jsonl"))?;

    let geocoder_config = GeocoderConfig::from_env()?;
    let mut geocoder = Geocoder::load(&geocoder_config.base_url, geocoder_config.qps, &geocoder_config.cache_path)?;

    let log = tsugie_fusion::overlap_repair::repair(&mut events, &mut geocoder).await;

    tsugie_core::jsonl::write(&run_dir.join("events_fused.jsonl"), &events)?;
    write_fused_csv(&events, &run_dir.join("events_fused.csv"))?;
    write_csv(&log, &run_dir.join("geo_overlap_repair_log.csv"))?;

    geocoder.save_cache(&geocoder_config.cache_path)?;

    println!(
        "{}",
        SummaryLine::new("repair-geo")
            .field("run_id", &run_id)
            .field("events", events.len())
            .field("repair_attempts", log.len())
    );

    Ok(())
}
