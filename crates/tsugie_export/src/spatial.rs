//! Geohash-bucketed, compressed, obfuscated spatial payload (§4.5).

use std::collections::BTreeMap;
use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use serde::Serialize;
use sha2::{Digest, Sha256};

use tsugie_core::obfuscate::{obfuscate, unobfuscate};

use crate::ExportError;
use crate::entry::ExportEntry;
use crate::images::zlib_decompress;

/// Per-bucket metadata recorded in `he_places.index.json`'s
/// `payload_buckets` map.
#[derive(Debug, Clone, Serialize)]
pub struct SpatialBucketDescriptor {
    pub record_count: usize,
    pub payload_offset: u64,
    pub payload_length: u64,
    pub payload_sha256: String,
}

fn zlib_compress(data: &[u8]) -> Result<Vec<u8>, ExportError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(9));
    encoder.write_all(data).map_err(ExportError::Io)?;
    encoder.finish().map_err(ExportError::Io)
}

/// Groups `entries` by geohash, sorts each bucket by `ios_place_id`, and
/// serializes/compresses/obfuscates each bucket in sorted geohash-key
/// order, self-checking every chunk before appending it.
pub fn build(entries: &[ExportEntry], key_seed: &str) -> Result<(Vec<u8>, BTreeMap<String, SpatialBucketDescriptor>), ExportError> {
    let mut buckets: BTreeMap<String, Vec<&ExportEntry>> = BTreeMap::new();
    for entry in entries {
        buckets.entry(entry.geohash.clone()).or_default().push(entry);
    }

    let mut buffer = Vec::new();
    let mut descriptors = BTreeMap::new();

    for (geohash, mut bucket_entries) in buckets {
        bucket_entries.sort_by(|a, b| a.ios_place_id.cmp(&b.ios_place_id));

        let raw_json = serde_json::to_vec(&bucket_entries)?;
        let payload_sha256 = hex::encode(Sha256::digest(&raw_json));

        let compressed = zlib_compress(&raw_json)?;
        let chunk = obfuscate(&compressed, key_seed);

        let decompressed = zlib_decompress(&unobfuscate(&chunk, key_seed))?;
        if decompressed != raw_json {
            return Err(ExportError::SelfCheckFailed);
        }

        let payload_offset = buffer.len() as u64;
        let payload_length = chunk.len() as u64;
        buffer.extend_from_slice(&chunk);

        descriptors.insert(
            geohash,
            SpatialBucketDescriptor {
                record_count: bucket_entries.len(),
                payload_offset,
                payload_length,
                payload_sha256,
            },
        );
    }

    Ok((buffer, descriptors))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, geohash: &str) -> ExportEntry {
        ExportEntry {
            ios_place_id: id.to_string(),
            canonical_id: id.to_string(),
            category: "hanabi".to_string(),
            event_name: String::new(),
            event_date_start: String::new(),
            event_date_end: String::new(),
            venue_name: String::new(),
            prefecture: String::new(),
            city: String::new(),
            lat: None,
            lng: None,
            geohash: geohash.to_string(),
            scale_score: 50,
            heat_score: 50,
            surprise_score: 50,
            score_source: "fallback".to_string(),
            distance_meters: 300,
            hint: String::new(),
            description_ja: String::new(),
            one_liner_ja: String::new(),
            description_zh: String::new(),
            one_liner_zh: String::new(),
            description_en: String::new(),
            one_liner_en: String::new(),
            source_count: 1,
            content_image_source_url: String::new(),
            image_raw_sha: None,
            image_offset: None,
            image_length: None,
        }
    }

    #[test]
    fn groups_entries_into_geohash_buckets() {
        let entries = vec![entry("a", "xn76u"), entry("b", "xn76u"), entry("c", "_unknown")];
        let (_, descriptors) = build(&entries, "seed").unwrap();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors["xn76u"].record_count, 2);
        assert_eq!(descriptors["_unknown"].record_count, 1);
    }

    #[test]
    fn bucket_payload_round_trips() {
        let entries = vec![entry("a", "xn76u")];
        let (buffer, descriptors) = build(&entries, "seed").unwrap();
        let d = &descriptors["xn76u"];
        let chunk = &buffer[d.payload_offset as usize..(d.payload_offset + d.payload_length) as usize];
        let raw = zlib_decompress(&unobfuscate(chunk, "seed")).unwrap();
        assert_eq!(hex::encode(Sha256::digest(&raw)), d.payload_sha256);
    }
}
