//! Thin wrapper over the `geohash` crate, pinned to the bucket precisions
//! this pipeline uses (3-8, default 5) and the `"_unknown"` sentinel for
//! coordinate-less rows.

/// Bucket key used for rows without a valid coordinate.
pub const UNKNOWN_BUCKET: &str = "_unknown";

/// Minimum allowed geohash precision.
pub const MIN_PRECISION: usize = 3;
/// Maximum allowed geohash precision.
pub const MAX_PRECISION: usize = 8;
/// Default geohash precision when a run does not override it.
pub const DEFAULT_PRECISION: usize = 5;

/// Encodes `(lat, lng)` at `precision` characters using the standard
/// base-32 geohash alphabet (longitude-first bit interleaving).
///
/// # Errors
///
/// Returns an error if `lat`/`lng` are out of range or `precision` is 0.
pub fn encode(lat: f64, lng: f64, precision: usize) -> Result<String, geohash::GeohashError> {
    geohash::encode(geohash::Coord { x: lng, y: lat }, precision)
}

/// Clamps a requested precision into the supported range.
#[must_use]
pub fn clamp_precision(precision: usize) -> usize {
    precision.clamp(MIN_PRECISION, MAX_PRECISION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_known_vector() {
        // Testable property 8: (35.681236, 139.767125, 5) -> "xn76u".
        let hash = encode(35.681236, 139.767125, 5).unwrap();
        assert_eq!(hash, "xn76u");
    }

    #[test]
    fn clamp_keeps_within_bounds() {
        assert_eq!(clamp_precision(1), MIN_PRECISION);
        assert_eq!(clamp_precision(40), MAX_PRECISION);
        assert_eq!(clamp_precision(5), 5);
    }
}
