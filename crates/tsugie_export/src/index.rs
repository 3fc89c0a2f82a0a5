//! `he_places.index.json` document shape (§6).

use std::collections::BTreeMap;

use serde::Serialize;

use crate::spatial::SpatialBucketDescriptor;

/// Compression/obfuscation/encoding identifiers, stable across releases
/// so existing clients can keep decoding the bundle.
#[derive(Debug, Clone, Serialize)]
pub struct CodecDescriptor {
    pub compression: &'static str,
    pub obfuscation: &'static str,
    pub encoding: &'static str,
}

impl Default for CodecDescriptor {
    fn default() -> Self {
        Self {
            compression: "zlib",
            obfuscation: "xor_sha256_stream_v1",
            encoding: "binary_frame_v1",
        }
    }
}

/// Which per-project run each joined source came from.
#[derive(Debug, Clone, Serialize)]
pub struct SourceRunIds {
    pub fused_run_id: String,
    pub content_run_id: String,
    pub score_run_id: String,
}

/// Category breakdown of the joined record set.
#[derive(Debug, Clone, Serialize)]
pub struct RecordCounts {
    pub total: usize,
    pub hanabi: usize,
    pub matsuri: usize,
}

/// How much of the joined set actually carries enrichment.
#[derive(Debug, Clone, Serialize)]
pub struct ContentCounts {
    pub with_description: usize,
    pub with_image: usize,
}

/// Spatial index metadata: the bucketing scheme and its precision.
#[derive(Debug, Clone, Serialize)]
pub struct SpatialIndexDescriptor {
    pub scheme: &'static str,
    pub precision: usize,
    pub bucket_count: usize,
}

/// The image payload's own content-hash and size.
#[derive(Debug, Clone, Serialize)]
pub struct ImagePayloadDescriptor {
    pub sha256: String,
    pub size: u64,
    pub entry_count: usize,
}

/// The full `he_places.index.json` document.
#[derive(Debug, Clone, Serialize)]
pub struct ExportIndex {
    pub version: u32,
    pub generated_at: String,
    pub codec: CodecDescriptor,
    pub source_run_ids: SourceRunIds,
    pub record_counts: RecordCounts,
    pub content_counts: ContentCounts,
    pub spatial_index: SpatialIndexDescriptor,
    pub payload_buckets: BTreeMap<String, SpatialBucketDescriptor>,
    pub image_payload: ImagePayloadDescriptor,
}
