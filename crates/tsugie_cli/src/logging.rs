//! Logger initialization wrapped in `indicatif-log-bridge` so `log::info!`
//! output is suspended while progress bars redraw (mirrors
//! `packages/cli_utils`'s `init_logger()`).

use indicatif::MultiProgress;

/// Initializes the global logger and returns the [`MultiProgress`] every
/// progress bar must be registered with.
pub fn init() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok();
    log::set_max_level(level);

    multi
}
