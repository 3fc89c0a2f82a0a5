//! `CanonicalEvent`: the fusion engine's output row (§3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tsugie_core::resolver::ResolverKey;

/// Provenance of a canonical event's coordinates (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GeoSource {
    SourceExact,
    NetworkGeocode,
    NetworkGeocodeTitle,
    NetworkGeocodeCache,
    NetworkGeocodeOverlapRepair,
    NetworkGeocodeOverlapRepairTitle,
    PrefCenterFallback,
    #[default]
    Missing,
}

impl GeoSource {
    /// `true` for any source in §4.1's "low-confidence geo source" set:
    /// `missing`, `pref_center_fallback`, or any `network_geocode*`.
    #[must_use]
    pub fn is_low_confidence(self) -> bool {
        !matches!(self, Self::SourceExact)
    }
}

/// `none`/`low`/`medium`/`high` urgency for a follow-up content refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UpdatePriority {
    #[default]
    None,
    Low,
    Medium,
    High,
}

/// One fused, canonical event (§3 `CanonicalEvent`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CanonicalEvent {
    pub canonical_id: String,
    pub dedup_key: String,
    pub event_year: Option<i32>,
    pub source_sites: Vec<String>,
    pub source_urls: Vec<String>,
    pub source_count: usize,
    pub fused_at: DateTime<Utc>,

    pub event_name: String,
    pub event_date_start: String,
    pub event_date_end: String,
    pub event_time_start: String,
    pub event_time_end: String,
    pub venue_name: String,
    pub venue_address: String,
    pub prefecture: String,
    pub city: String,
    pub launch_count: String,
    pub launch_scale: String,
    pub paid_seat: String,
    pub access_text: String,
    pub parking_text: String,
    pub traffic_control_text: String,
    pub rainout_policy: String,
    pub contact: String,
    pub weather_summary: String,

    pub lat: String,
    pub lng: String,
    pub geo_source: GeoSource,

    pub is_info_incomplete: bool,
    pub incomplete_field_count: usize,
    pub incomplete_fields: String,
    pub update_priority: UpdatePriority,
}

impl CanonicalEvent {
    /// Parses `lat`/`lng` as floats, when both are non-empty and valid.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.lat.parse::<f64>(), self.lng.parse::<f64>()) {
            (Ok(lat), Ok(lng)) => Some((lat, lng)),
            _ => None,
        }
    }
}

impl ResolverKey for CanonicalEvent {
    fn canonical_id(&self) -> &str {
        &self.canonical_id
    }

    fn source_urls(&self) -> &[String] {
        &self.source_urls
    }

    fn name_date_key(&self) -> Option<String> {
        if self.event_name.is_empty() || self.event_date_start.is_empty() {
            None
        } else {
            Some(format!("{}|{}", self.event_name, self.event_date_start))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_confidence_excludes_only_source_exact() {
        assert!(!GeoSource::SourceExact.is_low_confidence());
        assert!(GeoSource::Missing.is_low_confidence());
        assert!(GeoSource::NetworkGeocode.is_low_confidence());
        assert!(GeoSource::PrefCenterFallback.is_low_confidence());
    }

    #[test]
    fn geo_source_round_trips_through_strum() {
        assert_eq!(GeoSource::NetworkGeocodeOverlapRepairTitle.to_string(), "network_geocode_overlap_repair_title");
    }
}
