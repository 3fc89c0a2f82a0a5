//! Per-stage configuration structs.
//!
//! The config *loader* (TOML/CLI-arg plumbing) is out of scope per §1, but
//! every stage still needs a typed config with sane defaults, loadable from
//! the process environment the way `CRIME_MAP_SOURCES` is read in
//! `packages/ingest/src/main.rs`. Each `*Config::from_env()` starts from
//! `Default` and applies `TSUGIE_<STAGE>_<FIELD>` overrides; a malformed
//! override (fails to parse) is the one fatal error class here.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::CoreError;

fn env_override<T>(key: &str, current: T) -> Result<T, CoreError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| CoreError::config(format!("{key}: invalid value {raw:?}: {e}"))),
        Err(_) => Ok(current),
    }
}

fn env_override_opt_string(key: &str, current: Option<String>) -> Option<String> {
    env::var(key).ok().or(current)
}

/// Configuration for the fusion stage (§4.1).
#[derive(Debug, Clone)]
pub struct FusionConfig {
    /// Raw record root, one `<site>.jsonl` per site.
    pub raw_dir: PathBuf,
    /// Output root; fused artifacts land under `<fused_root>/<run_id>/`.
    pub fused_root: PathBuf,
    /// Path to the TOML/JSON alias map.
    pub alias_map_path: Option<PathBuf>,
    /// Whether to drop rows whose extracted year doesn't match `target_year`.
    pub strict_year: bool,
    /// Target event year, required when `strict_year` is set.
    pub target_year: Option<i32>,
    /// Minimum Jaro-Winkler similarity for `name_alias_candidates.csv`.
    pub alias_candidate_threshold: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            fused_root: PathBuf::from("data/fused"),
            alias_map_path: None,
            strict_year: false,
            target_year: None,
            alias_candidate_threshold: 0.45,
        }
    }
}

impl FusionConfig {
    /// Applies `TSUGIE_FUSION_*` environment overrides to the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] if an override fails to parse.
    pub fn from_env() -> Result<Self, CoreError> {
        let mut cfg = Self::default();
        if let Ok(raw) = env::var("TSUGIE_FUSION_RAW_DIR") {
            cfg.raw_dir = PathBuf::from(raw);
        }
        if let Ok(raw) = env::var("TSUGIE_FUSION_FUSED_ROOT") {
            cfg.fused_root = PathBuf::from(raw);
        }
        cfg.alias_map_path = env_override_opt_string("TSUGIE_FUSION_ALIAS_MAP_PATH", None)
            .map(PathBuf::from)
            .or(cfg.alias_map_path);
        cfg.strict_year = env_override("TSUGIE_FUSION_STRICT_YEAR", cfg.strict_year)?;
        if let Ok(raw) = env::var("TSUGIE_FUSION_TARGET_YEAR") {
            cfg.target_year = Some(
                raw.parse()
                    .map_err(|e| CoreError::config(format!("TSUGIE_FUSION_TARGET_YEAR: {e}")))?,
            );
        }
        cfg.alias_candidate_threshold = env_override(
            "TSUGIE_FUSION_ALIAS_CANDIDATE_THRESHOLD",
            cfg.alias_candidate_threshold,
        )?;
        Ok(cfg)
    }
}

/// Configuration for the geocoder collaborator (§4.2).
#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    /// Maximum live requests per second; cache hits are free.
    pub qps: f64,
    /// Path to the persistent CSV cache.
    pub cache_path: PathBuf,
    /// Base URL of the upstream geocoding service.
    pub base_url: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            qps: 1.0,
            cache_path: PathBuf::from("data/geocode_cache.csv"),
            base_url: "https://nominatim.openstreetmap.org/search".to_string(),
        }
    }
}

impl GeocoderConfig {
    /// Applies `TSUGIE_GEOCODER_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] if an override fails to parse.
    pub fn from_env() -> Result<Self, CoreError> {
        let mut cfg = Self::default();
        cfg.qps = env_override("TSUGIE_GEOCODER_QPS", cfg.qps)?;
        if let Ok(raw) = env::var("TSUGIE_GEOCODER_CACHE_PATH") {
            cfg.cache_path = PathBuf::from(raw);
        }
        if let Ok(raw) = env::var("TSUGIE_GEOCODER_BASE_URL") {
            cfg.base_url = raw;
        }
        Ok(cfg)
    }
}

/// Which text-polishing backend the content stage routes through (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolishMode {
    /// Remote chat/response API.
    Openai,
    /// Local subprocess-invoked model.
    Codex,
    /// No polishing; raw extracted text is passed through unchanged.
    #[default]
    None,
    /// `openai` if an API key is present in the environment, else `codex`.
    Auto,
}

impl FromStr for PolishMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai" => Ok(Self::Openai),
            "codex" => Ok(Self::Codex),
            "none" => Ok(Self::None),
            "auto" => Ok(Self::Auto),
            other => Err(format!("unknown polish mode {other:?}")),
        }
    }
}

impl PolishMode {
    /// Resolves `Auto` against the presence of `OPENAI_API_KEY`; leaves
    /// other modes unchanged.
    #[must_use]
    pub fn resolve(self) -> Self {
        match self {
            Self::Auto => {
                if env::var("OPENAI_API_KEY").is_ok_and(|v| !v.is_empty()) {
                    Self::Openai
                } else {
                    Self::Codex
                }
            }
            other => other,
        }
    }
}

/// Configuration for the content enrichment stage (§4.3).
#[derive(Debug, Clone)]
pub struct ContentConfig {
    /// Fused input root for the run being enriched.
    pub fused_dir: PathBuf,
    /// Output root; content artifacts land under `<content_root>/<run_id>/`.
    pub content_root: PathBuf,
    /// Directory downloaded images are written under.
    pub image_dir: PathBuf,
    /// Which polishing backend to use.
    pub polish_mode: PolishMode,
    /// Maximum source URLs fetched per event.
    pub max_source_urls_per_event: usize,
    /// Maximum images kept per event.
    pub max_images: usize,
    /// Maximum bytes accepted for a single downloaded image.
    pub max_image_bytes: u64,
    /// Maximum characters kept in the extracted description.
    pub max_description_chars: usize,
    /// Reuse a previous content record verbatim if fetched within this many days.
    pub min_refresh_days: i64,
    /// Drop rows whose start date is not older than N days.
    pub only_past_days: Option<i64>,
    /// Drop rows whose start date is older than N days.
    pub skip_past_days: Option<i64>,
    /// Re-order selection toward events nearest today.
    pub prioritize_near_start: bool,
    /// Reuse "good success" previous records without network/model calls.
    pub failed_only: bool,
    /// Ignore the freshness cache and re-fetch everything.
    pub force: bool,
    /// Skip the ZH/EN follow-up translation pass; log incompleteness instead.
    pub codex_single_pass_i18n: bool,
    /// Crawl rate limit in requests per second.
    pub qps: f64,
    /// Per-call timeout for the codex subprocess backend.
    pub codex_timeout_secs: u64,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            fused_dir: PathBuf::from("data/fused"),
            content_root: PathBuf::from("data/content"),
            image_dir: PathBuf::from("data/images"),
            polish_mode: PolishMode::None,
            max_source_urls_per_event: 3,
            max_images: 6,
            max_image_bytes: 8 * 1024 * 1024,
            max_description_chars: 600,
            min_refresh_days: 45,
            only_past_days: None,
            skip_past_days: None,
            prioritize_near_start: false,
            failed_only: false,
            force: false,
            codex_single_pass_i18n: false,
            qps: 0.12,
            codex_timeout_secs: 120,
        }
    }
}

impl ContentConfig {
    /// Applies `TSUGIE_CONTENT_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] if an override fails to parse.
    #[allow(clippy::too_many_lines)]
    pub fn from_env() -> Result<Self, CoreError> {
        let mut cfg = Self::default();
        if let Ok(raw) = env::var("TSUGIE_CONTENT_FUSED_DIR") {
            cfg.fused_dir = PathBuf::from(raw);
        }
        if let Ok(raw) = env::var("TSUGIE_CONTENT_ROOT") {
            cfg.content_root = PathBuf::from(raw);
        }
        if let Ok(raw) = env::var("TSUGIE_CONTENT_IMAGE_DIR") {
            cfg.image_dir = PathBuf::from(raw);
        }
        if let Ok(raw) = env::var("TSUGIE_CONTENT_POLISH_MODE") {
            cfg.polish_mode = raw
                .parse()
                .map_err(|e| CoreError::config(format!("TSUGIE_CONTENT_POLISH_MODE: {e}")))?;
        }
        cfg.max_source_urls_per_event = env_override(
            "TSUGIE_CONTENT_MAX_SOURCE_URLS_PER_EVENT",
            cfg.max_source_urls_per_event,
        )?;
        cfg.max_images = env_override("TSUGIE_CONTENT_MAX_IMAGES", cfg.max_images)?;
        cfg.max_image_bytes =
            env_override("TSUGIE_CONTENT_MAX_IMAGE_BYTES", cfg.max_image_bytes)?;
        cfg.max_description_chars = env_override(
            "TSUGIE_CONTENT_MAX_DESCRIPTION_CHARS",
            cfg.max_description_chars,
        )?;
        cfg.min_refresh_days =
            env_override("TSUGIE_CONTENT_MIN_REFRESH_DAYS", cfg.min_refresh_days)?;
        if let Ok(raw) = env::var("TSUGIE_CONTENT_ONLY_PAST_DAYS") {
            cfg.only_past_days = Some(
                raw.parse()
                    .map_err(|e| CoreError::config(format!("TSUGIE_CONTENT_ONLY_PAST_DAYS: {e}")))?,
            );
        }
        if let Ok(raw) = env::var("TSUGIE_CONTENT_SKIP_PAST_DAYS") {
            cfg.skip_past_days = Some(
                raw.parse()
                    .map_err(|e| CoreError::config(format!("TSUGIE_CONTENT_SKIP_PAST_DAYS: {e}")))?,
            );
        }
        cfg.prioritize_near_start = env_override(
            "TSUGIE_CONTENT_PRIORITIZE_NEAR_START",
            cfg.prioritize_near_start,
        )?;
        cfg.failed_only = env_override("TSUGIE_CONTENT_FAILED_ONLY", cfg.failed_only)?;
        cfg.force = env_override("TSUGIE_CONTENT_FORCE", cfg.force)?;
        cfg.codex_single_pass_i18n = env_override(
            "TSUGIE_CONTENT_CODEX_SINGLE_PASS_I18N",
            cfg.codex_single_pass_i18n,
        )?;
        cfg.qps = env_override("TSUGIE_CONTENT_QPS", cfg.qps)?;
        cfg.codex_timeout_secs =
            env_override("TSUGIE_CONTENT_CODEX_TIMEOUT_SECS", cfg.codex_timeout_secs)?;
        cfg.polish_mode = cfg.polish_mode.resolve();
        Ok(cfg)
    }
}

/// Configuration for the scoring stage (§4.4).
#[derive(Debug, Clone)]
pub struct ScoreConfig {
    /// Fused input root for the run being scored.
    pub fused_dir: PathBuf,
    /// Output root; score artifacts land under `<score_root>/<run_id>/`.
    pub score_root: PathBuf,
    /// Maximum number of remote API calls this run may make.
    pub max_events: Option<usize>,
    /// Re-order selection toward events nearest today.
    pub prioritize_near_start: bool,
    /// Reuse previous `ok` scores without a new API call.
    pub failed_only: bool,
    /// Environment variable name holding the scoring API key.
    pub api_key_env: String,
    /// Crawl rate limit in requests per second.
    pub qps: f64,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            fused_dir: PathBuf::from("data/fused"),
            score_root: PathBuf::from("data/score"),
            max_events: None,
            prioritize_near_start: false,
            failed_only: false,
            api_key_env: "OPENAI_API_KEY".to_string(),
            qps: 0.2,
        }
    }
}

impl ScoreConfig {
    /// Applies `TSUGIE_SCORE_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] if an override fails to parse.
    pub fn from_env() -> Result<Self, CoreError> {
        let mut cfg = Self::default();
        if let Ok(raw) = env::var("TSUGIE_SCORE_FUSED_DIR") {
            cfg.fused_dir = PathBuf::from(raw);
        }
        if let Ok(raw) = env::var("TSUGIE_SCORE_ROOT") {
            cfg.score_root = PathBuf::from(raw);
        }
        if let Ok(raw) = env::var("TSUGIE_SCORE_MAX_EVENTS") {
            cfg.max_events = Some(
                raw.parse()
                    .map_err(|e| CoreError::config(format!("TSUGIE_SCORE_MAX_EVENTS: {e}")))?,
            );
        }
        cfg.prioritize_near_start = env_override(
            "TSUGIE_SCORE_PRIORITIZE_NEAR_START",
            cfg.prioritize_near_start,
        )?;
        cfg.failed_only = env_override("TSUGIE_SCORE_FAILED_ONLY", cfg.failed_only)?;
        cfg.api_key_env = env_override_opt_string("TSUGIE_SCORE_API_KEY_ENV", None)
            .unwrap_or(cfg.api_key_env);
        cfg.qps = env_override("TSUGIE_SCORE_QPS", cfg.qps)?;
        Ok(cfg)
    }
}

/// Configuration for the export stage (§4.5).
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Fused input root.
    pub fused_dir: PathBuf,
    /// Content input root (latest run per project).
    pub content_dir: PathBuf,
    /// Score input root (latest run per project).
    pub score_dir: PathBuf,
    /// Output directory for the export bundle.
    pub out_dir: PathBuf,
    /// Geohash bucket precision, clamped to [3, 8].
    pub geohash_precision: usize,
    /// JPEG re-encode quality (0-100).
    pub image_quality: u8,
    /// Maximum longest-side pixel dimension for re-encoded images.
    pub image_max_px: u32,
    /// Obfuscation key seed; stable across releases.
    pub key_seed: String,
    /// Pretty-print `index.json` instead of minifying it.
    pub pretty_index: bool,
    /// Run the full pipeline (join, bucket, obfuscate, self-check) without
    /// writing the bundle files or updating `latest_run.json`.
    pub dry_run: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            fused_dir: PathBuf::from("data/fused"),
            content_dir: PathBuf::from("data/content"),
            score_dir: PathBuf::from("data/score"),
            out_dir: PathBuf::from("data/export"),
            geohash_precision: crate::geohash::DEFAULT_PRECISION,
            image_quality: 82,
            image_max_px: 1600,
            key_seed: crate::obfuscate::DEFAULT_KEY_SEED.to_string(),
            pretty_index: false,
            dry_run: false,
        }
    }
}

impl ExportConfig {
    /// Applies `TSUGIE_EXPORT_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] if an override fails to parse.
    pub fn from_env() -> Result<Self, CoreError> {
        let mut cfg = Self::default();
        if let Ok(raw) = env::var("TSUGIE_EXPORT_FUSED_DIR") {
            cfg.fused_dir = PathBuf::from(raw);
        }
        if let Ok(raw) = env::var("TSUGIE_EXPORT_CONTENT_DIR") {
            cfg.content_dir = PathBuf::from(raw);
        }
        if let Ok(raw) = env::var("TSUGIE_EXPORT_SCORE_DIR") {
            cfg.score_dir = PathBuf::from(raw);
        }
        if let Ok(raw) = env::var("TSUGIE_EXPORT_OUT_DIR") {
            cfg.out_dir = PathBuf::from(raw);
        }
        let precision: usize =
            env_override("TSUGIE_EXPORT_GEOHASH_PRECISION", cfg.geohash_precision)?;
        cfg.geohash_precision = crate::geohash::clamp_precision(precision);
        cfg.image_quality = env_override("TSUGIE_EXPORT_IMAGE_QUALITY", cfg.image_quality)?;
        cfg.image_max_px = env_override("TSUGIE_EXPORT_IMAGE_MAX_PX", cfg.image_max_px)?;
        if let Ok(raw) = env::var("TSUGIE_EXPORT_KEY_SEED") {
            cfg.key_seed = raw;
        }
        cfg.pretty_index = env_override("TSUGIE_EXPORT_PRETTY_INDEX", cfg.pretty_index)?;
        cfg.dry_run = env_override("TSUGIE_EXPORT_DRY_RUN", cfg.dry_run)?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polish_mode_parses() {
        assert_eq!("openai".parse::<PolishMode>().unwrap(), PolishMode::Openai);
        assert_eq!("codex".parse::<PolishMode>().unwrap(), PolishMode::Codex);
        assert!("bogus".parse::<PolishMode>().is_err());
    }

    #[test]
    fn defaults_are_sane() {
        let fusion = FusionConfig::default();
        assert!(!fusion.strict_year);
        let geocoder = GeocoderConfig::default();
        assert!((geocoder.qps - 1.0).abs() < f64::EPSILON);
        let export = ExportConfig::default();
        assert_eq!(export.geohash_precision, 5);
    }
}
