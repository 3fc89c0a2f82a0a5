//! `RawRecord`: one observation from one site (§3, §6).
//!
//! The explicit fields are the ones fusion actually reads; everything else
//! a site adapter emits is preserved in `extra` so it is never silently
//! dropped before a fusion winner is chosen (§9 "Free-form dict rows").

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One line of a `<raw_dir>/<site_id>.jsonl` stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecord {
    /// Site identifier; inferred from the file name if absent on the row.
    #[serde(default)]
    pub source_site: String,
    /// The page this record was scraped from.
    #[serde(default)]
    pub source_url: String,

    #[serde(default)]
    pub event_name: String,
    #[serde(default)]
    pub event_date_start: String,
    #[serde(default)]
    pub event_date_end: String,
    #[serde(default)]
    pub event_time_start: String,
    #[serde(default)]
    pub event_time_end: String,
    #[serde(default)]
    pub venue_name: String,
    #[serde(default)]
    pub venue_address: String,
    #[serde(default)]
    pub prefecture: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub lat: String,
    #[serde(default)]
    pub lng: String,
    #[serde(default)]
    pub launch_count: String,
    #[serde(default)]
    pub launch_scale: String,
    #[serde(default)]
    pub paid_seat: String,
    #[serde(default)]
    pub access_text: String,
    #[serde(default)]
    pub parking_text: String,
    #[serde(default)]
    pub traffic_control_text: String,
    #[serde(default)]
    pub rainout_policy: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub weather_summary: String,

    /// Any field the site adapter emitted that isn't modeled above.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl RawRecord {
    /// Parses one JSONL line, filling `source_site` from `fallback_site`
    /// when the row itself doesn't carry one.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] on malformed JSON.
    pub fn from_line(line: &str, fallback_site: &str) -> Result<Self, serde_json::Error> {
        let mut record: Self = serde_json::from_str(line)?;
        if record.source_site.is_empty() {
            fallback_site.clone_into(&mut record.source_site);
        }
        Ok(record)
    }

    /// Reads every well-formed line of `path` as a [`RawRecord`], skipping
    /// (and counting) any line that fails to parse. Absence of the file
    /// itself is silently treated as zero rows, per §4.1's failure
    /// semantics.
    #[must_use]
    pub fn read_site_file(path: &std::path::Path, site_id: &str) -> (Vec<Self>, usize) {
        let Ok(contents) = std::fs::read_to_string(path) else {
            return (Vec::new(), 0);
        };
        let mut records = Vec::new();
        let mut skipped = 0;
        for line in contents.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match Self::from_line(trimmed, site_id) {
                Ok(record) => records.push(record),
                Err(e) => {
                    log::warn!("skipping unparseable row in {}: {e}", path.display());
                    skipped += 1;
                }
            }
        }
        (records, skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_source_site_from_fallback() {
        let record = RawRecord::from_line(r#"{"event_name":"test"}"#, "hanabi_cloud").unwrap();
        assert_eq!(record.source_site, "hanabi_cloud");
    }

    #[test]
    fn preserves_unknown_fields() {
        let record =
            RawRecord::from_line(r#"{"event_name":"x","visitors":"5000"}"#, "site").unwrap();
        assert_eq!(
            record.extra.get("visitors").and_then(|v| v.as_str()),
            Some("5000")
        );
    }

    #[test]
    fn missing_site_file_yields_no_records() {
        let (records, skipped) =
            RawRecord::read_site_file(std::path::Path::new("/nonexistent/x.jsonl"), "x");
        assert!(records.is_empty());
        assert_eq!(skipped, 0);
    }
}
