//! CSV-backed geocode cache, keyed by the exact query string (§6: "Query
//! is exact-match; implementations must not normalize before lookup").

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{GeocodeError, GeocodeResponse, GeocodeStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheRow {
    query: String,
    lat: String,
    lng: String,
    status: String,
    title: String,
    error: String,
    updated_at: String,
}

/// In-memory mirror of the cache CSV, mutated during a run and flushed
/// once via [`GeocodeCache::save`].
#[derive(Debug, Default)]
pub struct GeocodeCache {
    entries: HashMap<String, GeocodeResponse>,
}

impl GeocodeCache {
    /// Loads the cache from `path`. A missing file yields an empty cache,
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the file exists but isn't valid CSV.
    pub fn load(path: &Path) -> Result<Self, GeocodeError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let mut reader = csv::Reader::from_path(path)?;
        let mut entries = HashMap::new();
        for result in reader.deserialize() {
            let row: CacheRow = result?;
            let status = match row.status.as_str() {
                "ok" => GeocodeStatus::Ok,
                "cached_ok" => GeocodeStatus::CachedOk,
                "no_result" => GeocodeStatus::NoResult,
                _ => GeocodeStatus::Error,
            };
            let response = GeocodeResponse {
                status,
                query: row.query.clone(),
                lat: row.lat.parse().ok(),
                lng: row.lng.parse().ok(),
                title: if row.title.is_empty() {
                    None
                } else {
                    Some(row.title)
                },
                error: if row.error.is_empty() {
                    None
                } else {
                    Some(row.error)
                },
                cache_hit: false,
            };
            entries.insert(row.query, response);
        }
        Ok(Self { entries })
    }

    /// Returns a cloned cache entry for `query`, if present. The caller is
    /// responsible for flipping `status` to `cached_ok` and `cache_hit`.
    #[must_use]
    pub fn get(&self, query: &str) -> Option<GeocodeResponse> {
        self.entries.get(query).cloned()
    }

    /// Records a fresh response under `query`, overwriting any prior entry.
    pub fn put(&mut self, query: &str, response: &GeocodeResponse) {
        self.entries.insert(query.to_string(), response.clone());
    }

    /// Number of cached queries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the cache back to `path` as CSV, creating parent directories
    /// as needed.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] on I/O or CSV encoding failure.
    pub fn save(&self, path: &Path) -> Result<(), GeocodeError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        let now: DateTime<Utc> = Utc::now();
        let mut queries: Vec<&String> = self.entries.keys().collect();
        queries.sort();
        for query in queries {
            let response = &self.entries[query];
            let status = match response.status {
                GeocodeStatus::Ok => "ok",
                GeocodeStatus::CachedOk => "cached_ok",
                GeocodeStatus::NoResult => "no_result",
                GeocodeStatus::Error => "error",
            };
            writer.serialize(CacheRow {
                query: query.clone(),
                lat: response.lat.map(|v| v.to_string()).unwrap_or_default(),
                lng: response.lng.map(|v| v.to_string()).unwrap_or_default(),
                status: status.to_string(),
                title: response.title.clone().unwrap_or_default(),
                error: response.error.clone().unwrap_or_default(),
                updated_at: now.to_rfc3339(),
            })?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_empty_cache() {
        let cache = GeocodeCache::load(std::path::Path::new("/nonexistent/path.csv")).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn round_trips_through_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.csv");

        let mut cache = GeocodeCache::default();
        cache.put(
            "tokyo station",
            &GeocodeResponse {
                status: GeocodeStatus::Ok,
                query: "tokyo station".to_string(),
                lat: Some(35.681236),
                lng: Some(139.767125),
                title: Some("Tokyo Station".to_string()),
                error: None,
                cache_hit: false,
            },
        );
        cache.save(&path).unwrap();

        let reloaded = GeocodeCache::load(&path).unwrap();
        let entry = reloaded.get("tokyo station").unwrap();
        assert_eq!(entry.status, GeocodeStatus::Ok);
        assert!((entry.lat.unwrap() - 35.681236).abs() < 1e-6);
    }
}
