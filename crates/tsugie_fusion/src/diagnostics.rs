//! Row types for the five diagnostic CSVs fusion emits (§4.1, §6), each
//! with the fixed header its downstream dashboards depend on.

use serde::Serialize;

/// One row of `dedup_log.csv`: which raw row fed which canonical event.
#[derive(Debug, Clone, Serialize)]
pub struct DedupLogRow {
    pub dedup_key: String,
    pub canonical_id: String,
    pub source_site: String,
    pub source_url: String,
    pub raw_name: String,
    pub canonical_name: String,
    pub alias_applied: u8,
}

/// One row of `geocode_log.csv`: one attempted query during primary
/// geocoding.
#[derive(Debug, Clone, Serialize)]
pub struct GeocodeLogRow {
    pub canonical_id: String,
    pub query: String,
    pub strategy: String,
    pub status: String,
    pub lat: String,
    pub lng: String,
    pub cache_hit: u8,
}

/// One row of `geo_overlap_repair_log.csv`: one attempted repair query.
#[derive(Debug, Clone, Serialize)]
pub struct GeoOverlapRepairLogRow {
    pub canonical_id: String,
    pub query: String,
    pub strategy: String,
    pub status: String,
    pub old_lat: String,
    pub old_lng: String,
    pub new_lat: String,
    pub new_lng: String,
}

/// One row of `incomplete_events.csv`.
#[derive(Debug, Clone, Serialize)]
pub struct IncompleteEventRow {
    pub canonical_id: String,
    pub event_name: String,
    pub incomplete_fields: String,
    pub update_priority: String,
}

/// One row of `name_alias_candidates.csv`: a pair of distinct raw names
/// sharing `(date, prefecture)` with text similarity above the threshold.
#[derive(Debug, Clone, Serialize)]
pub struct NameAliasCandidateRow {
    pub name_a: String,
    pub name_b: String,
    pub date: String,
    pub prefecture: String,
    pub similarity: f64,
}
