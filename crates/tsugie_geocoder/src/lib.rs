#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all)]

//! The geocoder collaborator (§4.2): `geocode(query) -> GeocodeResponse`
//! backed by a persistent CSV cache and a token-bucket rate limiter.
//!
//! Cache hits never consume a rate-limiter slot and always report
//! `status=cached_ok`, never `ok` — downstream `geo_source` suffixing
//! depends on being able to tell the two apart.

pub mod cache;

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tsugie_core::ratelimit::RateLimiter;

pub use cache::GeocodeCache;

/// Fatal configuration errors for the geocoder collaborator.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// I/O failure loading/saving the cache CSV.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Cache CSV was present but malformed.
    #[error("cache CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Status of a single geocode request, matching §3's closed set exactly:
/// cache hits are always `cached_ok`, never `ok`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeocodeStatus {
    /// A fresh live request resolved a point.
    Ok,
    /// The cache already held a resolved point for this exact query.
    CachedOk,
    /// The backend responded but found no candidate.
    NoResult,
    /// Transport or parse failure.
    Error,
}

/// One geocode request/response pair (§3 `GeocodeResponse`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodeResponse {
    /// Outcome of the request.
    pub status: GeocodeStatus,
    /// The exact query string submitted (and cache key).
    pub query: String,
    /// Resolved latitude, when `status` is `ok` or `cached_ok`.
    pub lat: Option<f64>,
    /// Resolved longitude, when `status` is `ok` or `cached_ok`.
    pub lng: Option<f64>,
    /// Backend-reported display title for the match, if any.
    pub title: Option<String>,
    /// Error detail, when `status` is `error`.
    pub error: Option<String>,
    /// Whether this response was served from the cache.
    pub cache_hit: bool,
}

impl GeocodeResponse {
    fn no_result(query: &str) -> Self {
        Self {
            status: GeocodeStatus::NoResult,
            query: query.to_string(),
            lat: None,
            lng: None,
            title: None,
            error: None,
            cache_hit: false,
        }
    }

    fn error(query: &str, message: impl Into<String>) -> Self {
        Self {
            status: GeocodeStatus::Error,
            query: query.to_string(),
            lat: None,
            lng: None,
            title: None,
            error: Some(message.into()),
            cache_hit: false,
        }
    }
}

/// Request-response geocoder collaborator: in-memory cache loaded from
/// (and flushed to) a CSV file, paced by a shared rate limiter.
///
/// One instance per run; `save_cache()` must be called once at shutdown
/// to persist newly-resolved entries.
pub struct Geocoder {
    client: reqwest::Client,
    base_url: String,
    cache: GeocodeCache,
    limiter: RateLimiter,
}

impl Geocoder {
    /// Builds a geocoder, loading the cache from `cache_path` if it exists
    /// (an absent cache file is treated as empty, not an error).
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the cache file exists but cannot be
    /// parsed.
    pub fn load(base_url: impl Into<String>, qps: f64, cache_path: &Path) -> Result<Self, GeocodeError> {
        let cache = GeocodeCache::load(cache_path)?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            cache,
            limiter: RateLimiter::new(qps),
        })
    }

    /// Persists the in-memory cache back to its CSV file. Call once at
    /// stage shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the CSV cannot be written.
    pub fn save_cache(&self, cache_path: &Path) -> Result<(), GeocodeError> {
        self.cache.save(cache_path)
    }

    /// Resolves `query` to a point, consulting the cache first.
    ///
    /// Never returns `Err`: transport/parse failures are represented as
    /// `GeocodeResponse { status: Error, .. }`, per §7's "geocoder errors
    /// never abort fusion" propagation policy.
    pub async fn geocode(&mut self, query: &str) -> GeocodeResponse {
        if let Some(mut cached) = self.cache.get(query) {
            cached.cache_hit = true;
            if cached.status == GeocodeStatus::Ok {
                cached.status = GeocodeStatus::CachedOk;
            }
            return cached;
        }

        self.limiter.wait_async().await;
        let response = self.geocode_live(query).await;
        self.cache.put(query, &response);
        response
    }

    async fn geocode_live(&self, query: &str) -> GeocodeResponse {
        let result = self
            .client
            .get(&self.base_url)
            .query(&[("q", query), ("format", "jsonv2"), ("limit", "1")])
            .header("User-Agent", "tsugie-geocoder/0.1")
            .send()
            .await;

        let resp = match result {
            Ok(resp) => resp,
            Err(e) => return GeocodeResponse::error(query, e.to_string()),
        };

        if !resp.status().is_success() {
            return GeocodeResponse::error(query, format!("HTTP {}", resp.status()));
        }

        let body: serde_json::Value = match resp.json().await {
            Ok(body) => body,
            Err(e) => return GeocodeResponse::error(query, format!("parse error: {e}")),
        };

        parse_search_response(query, &body)
    }
}

/// Parses a Nominatim-shaped `[{lat, lon, display_name}, ...]` array into a
/// [`GeocodeResponse`]. Shared by the live backend and test fixtures.
#[must_use]
pub fn parse_search_response(query: &str, body: &serde_json::Value) -> GeocodeResponse {
    let Some(results) = body.as_array() else {
        return GeocodeResponse::error(query, "response is not an array");
    };
    let Some(first) = results.first() else {
        return GeocodeResponse::no_result(query);
    };

    let lat = first
        .get("lat")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<f64>().ok());
    let lng = first
        .get("lon")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<f64>().ok());

    let (Some(lat), Some(lng)) = (lat, lng) else {
        return GeocodeResponse::error(query, "missing lat/lon in response");
    };

    GeocodeResponse {
        status: GeocodeStatus::Ok,
        query: query.to_string(),
        lat: Some(lat),
        lng: Some(lng),
        title: first
            .get("display_name")
            .and_then(|v| v.as_str())
            .map(String::from),
        error: None,
        cache_hit: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ok_result() {
        let body = serde_json::json!([{
            "lat": "35.6895",
            "lon": "139.6917",
            "display_name": "Tokyo, Japan"
        }]);
        let resp = parse_search_response("tokyo", &body);
        assert_eq!(resp.status, GeocodeStatus::Ok);
        assert!((resp.lat.unwrap() - 35.6895).abs() < 1e-6);
        assert!(!resp.cache_hit);
    }

    #[test]
    fn empty_array_is_no_result() {
        let body = serde_json::json!([]);
        let resp = parse_search_response("nowhere", &body);
        assert_eq!(resp.status, GeocodeStatus::NoResult);
    }

    #[test]
    fn non_array_is_error() {
        let body = serde_json::json!({"error": "bad request"});
        let resp = parse_search_response("q", &body);
        assert_eq!(resp.status, GeocodeStatus::Error);
    }
}
