//! Coordinate overlap repair (§4.1 "Overlap-repair").
//!
//! Runs after the full fused set exists: groups events sharing a rounded
//! coordinate, and for groups where *every* member landed there through a
//! low-confidence path, tries to re-resolve each member individually.

use std::collections::HashMap;

use tsugie_geocoder::{GeocodeStatus, Geocoder};

use crate::canonical::{CanonicalEvent, GeoSource};
use crate::diagnostics::GeoOverlapRepairLogRow;
use crate::geocode_strategy::{build_repair_query_list, QueryFields};

const COORD_ROUND_DECIMALS: i32 = 4;
const MIN_COORD_DELTA: f64 = 1e-6;

fn round_coord(value: f64) -> i64 {
    let scale = 10f64.powi(COORD_ROUND_DECIMALS);
    (value * scale).round() as i64
}

/// Repairs coincident low-confidence coordinates across `events` in
/// place, returning one log row per attempted repair query.
pub async fn repair(events: &mut [CanonicalEvent], geocoder: &mut Geocoder) -> Vec<GeoOverlapRepairLogRow> {
    let mut groups: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    for (i, event) in events.iter().enumerate() {
        if let Some((lat, lng)) = event.coordinates() {
            groups
                .entry((round_coord(lat), round_coord(lng)))
                .or_default()
                .push(i);
        }
    }

    let mut log = Vec::new();

    for indices in groups.values() {
        if indices.len() < 2 {
            continue;
        }
        let all_low_confidence = indices
            .iter()
            .all(|&i| events[i].geo_source.is_low_confidence());
        if !all_low_confidence {
            continue;
        }

        for &i in indices {
            repair_one(events, i, geocoder, &mut log).await;
        }
    }

    log
}

async fn repair_one(
    events: &mut [CanonicalEvent],
    index: usize,
    geocoder: &mut Geocoder,
    log: &mut Vec<GeoOverlapRepairLogRow>,
) {
    let (canonical_id, old_lat, old_lng, queries) = {
        let event = &events[index];
        let Some((old_lat, old_lng)) = event.coordinates() else {
            return;
        };
        let queries = build_repair_query_list(&QueryFields {
            venue_address: &event.venue_address,
            prefecture: &event.prefecture,
            city: &event.city,
            venue_name: &event.venue_name,
            event_name: &event.event_name,
        });
        (event.canonical_id.clone(), old_lat, old_lng, queries)
    };

    if queries.is_empty() {
        log.push(GeoOverlapRepairLogRow {
            canonical_id,
            query: String::new(),
            strategy: "skipped_no_query".to_string(),
            status: "skipped_no_query".to_string(),
            old_lat: old_lat.to_string(),
            old_lng: old_lng.to_string(),
            new_lat: String::new(),
            new_lng: String::new(),
        });
        return;
    }

    for candidate in &queries {
        let response = geocoder.geocode(&candidate.query).await;
        let status_str = match response.status {
            GeocodeStatus::Ok => "ok",
            GeocodeStatus::CachedOk => "cached_ok",
            GeocodeStatus::NoResult => "no_result",
            GeocodeStatus::Error => "error",
        };

        let resolved = matches!(response.status, GeocodeStatus::Ok | GeocodeStatus::CachedOk);
        let accepted = resolved
            && (response.lat.is_some_and(|lat| (lat - old_lat).abs() > MIN_COORD_DELTA)
                || response.lng.is_some_and(|lng| (lng - old_lng).abs() > MIN_COORD_DELTA));

        log.push(GeoOverlapRepairLogRow {
            canonical_id: canonical_id.clone(),
            query: candidate.query.clone(),
            strategy: candidate.strategy.to_string(),
            status: status_str.to_string(),
            old_lat: old_lat.to_string(),
            old_lng: old_lng.to_string(),
            new_lat: response.lat.map(|v| v.to_string()).unwrap_or_default(),
            new_lng: response.lng.map(|v| v.to_string()).unwrap_or_default(),
        });

        if accepted {
            if let (Some(lat), Some(lng)) = (response.lat, response.lng) {
                let mut source = GeoSource::NetworkGeocodeOverlapRepair;
                if candidate.strategy.contains("event") {
                    source = GeoSource::NetworkGeocodeOverlapRepairTitle;
                }
                let event = &mut events[index];
                event.lat = lat.to_string();
                event.lng = lng.to_string();
                event.geo_source = source;
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_coord_groups_near_points() {
        assert_eq!(round_coord(35.681236), round_coord(35.681240));
        assert_ne!(round_coord(35.681236), round_coord(36.0));
    }
}
