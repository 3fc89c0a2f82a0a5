//! `events_fused.csv`'s fixed header (§6) and the CSV projection of
//! [`CanonicalEvent`].

use serde::Serialize;

use crate::FusionError;
use crate::canonical::CanonicalEvent;

/// One row of `events_fused.csv`. Field order is the wire contract: it is
/// the exact header downstream dashboards depend on (§6).
#[derive(Debug, Clone, Serialize)]
pub struct FusedCsvRow {
    pub canonical_id: String,
    pub event_year: String,
    pub source_count: usize,
    pub event_name: String,
    pub event_date_start: String,
    pub event_date_end: String,
    pub event_time_start: String,
    pub event_time_end: String,
    pub venue_name: String,
    pub venue_address: String,
    pub prefecture: String,
    pub city: String,
    pub lat: String,
    pub lng: String,
    pub geo_source: String,
    pub launch_count: String,
    pub launch_scale: String,
    pub paid_seat: String,
    pub access_text: String,
    pub parking_text: String,
    pub traffic_control_text: String,
    pub rainout_policy: String,
    pub contact: String,
    pub weather_summary: String,
    pub is_info_incomplete: bool,
    pub incomplete_field_count: usize,
    pub incomplete_fields: String,
    pub update_priority: String,
    pub source_sites: String,
    pub source_urls: String,
}

impl From<&CanonicalEvent> for FusedCsvRow {
    fn from(event: &CanonicalEvent) -> Self {
        Self {
            canonical_id: event.canonical_id.clone(),
            event_year: event.event_year.map(|y| y.to_string()).unwrap_or_default(),
            source_count: event.source_count,
            event_name: event.event_name.clone(),
            event_date_start: event.event_date_start.clone(),
            event_date_end: event.event_date_end.clone(),
            event_time_start: event.event_time_start.clone(),
            event_time_end: event.event_time_end.clone(),
            venue_name: event.venue_name.clone(),
            venue_address: event.venue_address.clone(),
            prefecture: event.prefecture.clone(),
            city: event.city.clone(),
            lat: event.lat.clone(),
            lng: event.lng.clone(),
            geo_source: event.geo_source.to_string(),
            launch_count: event.launch_count.clone(),
            launch_scale: event.launch_scale.clone(),
            paid_seat: event.paid_seat.clone(),
            access_text: event.access_text.clone(),
            parking_text: event.parking_text.clone(),
            traffic_control_text: event.traffic_control_text.clone(),
            rainout_policy: event.rainout_policy.clone(),
            contact: event.contact.clone(),
            weather_summary: event.weather_summary.clone(),
            is_info_incomplete: event.is_info_incomplete,
            incomplete_field_count: event.incomplete_field_count,
            incomplete_fields: event.incomplete_fields.clone(),
            update_priority: event.update_priority.to_string(),
            source_sites: tsugie_core::text::pipe_join(&event.source_sites),
            source_urls: tsugie_core::text::pipe_join(&event.source_urls),
        }
    }
}

/// Writes `events_fused.csv` for `events`, creating parent directories as
/// needed.
///
/// # Errors
///
/// Returns [`FusionError`] on I/O or CSV encoding failure.
pub fn write_fused_csv(events: &[CanonicalEvent], path: &std::path::Path) -> Result<(), FusionError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for event in events {
        writer.serialize(FusedCsvRow::from(event))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_valued_columns_are_pipe_joined() {
        let event = CanonicalEvent {
            canonical_id: "E0001".to_string(),
            source_sites: vec!["hanabi_cloud".to_string(), "jorudan".to_string()],
            source_urls: vec!["https://a.example".to_string()],
            ..Default::default()
        };
        let row = FusedCsvRow::from(&event);
        assert_eq!(row.source_sites, "hanabi_cloud|jorudan");
        assert_eq!(row.source_urls, "https://a.example");
    }
}
