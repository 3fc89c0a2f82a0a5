//! Re-encoded, deduplicated, obfuscated local image payload (§4.5).

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use image::imageops::FilterType;
use sha2::{Digest, Sha256};

use tsugie_core::obfuscate::{obfuscate, unobfuscate};

use crate::ExportError;

/// One unique, re-encoded local image chunk inside `he_images.payload.bin`.
#[derive(Debug, Clone)]
pub struct ImagePayloadEntry {
    pub raw_sha: String,
    pub offset: u64,
    pub length: u64,
}

pub(crate) fn zlib_decompress(data: &[u8]) -> Result<Vec<u8>, ExportError> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).map_err(ExportError::Io)?;
    Ok(out)
}

fn zlib_compress(data: &[u8]) -> Result<Vec<u8>, ExportError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(9));
    encoder.write_all(data).map_err(ExportError::Io)?;
    encoder.finish().map_err(ExportError::Io)
}

/// Verifies `unobfuscate(chunk) -> zlib-decompress -> raw_bytes` (§7
/// testable property 7). Fatal on mismatch: the export stage aborts.
fn self_check(chunk: &[u8], raw_bytes: &[u8], key_seed: &str) -> Result<(), ExportError> {
    let decompressed = zlib_decompress(&unobfuscate(chunk, key_seed))?;
    if decompressed != raw_bytes {
        return Err(ExportError::SelfCheckFailed);
    }
    Ok(())
}

/// Builds the deduplicated, compressed, obfuscated image payload buffer.
#[derive(Default)]
pub struct ImagePayloadBuilder {
    buffer: Vec<u8>,
    entries: Vec<ImagePayloadEntry>,
    seen: HashMap<String, (u64, u64)>,
}

impl ImagePayloadBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-encodes the image at `path` to JPEG at `quality` with its
    /// longest side clamped to `max_px`, then compresses and obfuscates
    /// it. Returns `(raw_sha, offset, length)` locating the chunk inside
    /// the final buffer — deduplicated images resolve to the offset/length
    /// of the chunk already appended for that `raw_sha` (§4.5 image-payload
    /// step 3: "record `(offset, length, raw_sha)` on the entry").
    pub fn add_image(&mut self, path: &Path, quality: u8, max_px: u32, key_seed: &str) -> Result<(String, u64, u64), ExportError> {
        let loaded = image::open(path).map_err(|e| ExportError::Image(e.to_string()))?;
        let resized = if loaded.width().max(loaded.height()) > max_px {
            loaded.resize(max_px, max_px, FilterType::Lanczos3)
        } else {
            loaded
        };

        let mut jpeg_bytes = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg_bytes, quality);
        resized.write_with_encoder(encoder).map_err(|e| ExportError::Image(e.to_string()))?;

        let raw_sha = hex::encode(Sha256::digest(&jpeg_bytes));
        if let Some(&(offset, length)) = self.seen.get(&raw_sha) {
            return Ok((raw_sha, offset, length));
        }

        let compressed = zlib_compress(&jpeg_bytes)?;
        let chunk = obfuscate(&compressed, key_seed);
        self_check(&chunk, &jpeg_bytes, key_seed)?;

        let offset = self.buffer.len() as u64;
        let length = chunk.len() as u64;
        self.buffer.extend_from_slice(&chunk);
        self.seen.insert(raw_sha.clone(), (offset, length));
        self.entries.push(ImagePayloadEntry {
            raw_sha: raw_sha.clone(),
            offset,
            length,
        });
        Ok((raw_sha, offset, length))
    }

    #[must_use]
    pub fn finish(self) -> (Vec<u8>, Vec<ImagePayloadEntry>) {
        (self.buffer, self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_check_passes_for_matching_round_trip() {
        let raw = b"jpeg bytes placeholder".to_vec();
        let compressed = zlib_compress(&raw).unwrap();
        let chunk = obfuscate(&compressed, "seed");
        assert!(self_check(&chunk, &raw, "seed").is_ok());
    }

    #[test]
    fn self_check_fails_for_wrong_seed() {
        let raw = b"jpeg bytes placeholder".to_vec();
        let compressed = zlib_compress(&raw).unwrap();
        let chunk = obfuscate(&compressed, "seed-a");
        assert!(self_check(&chunk, &raw, "seed-b").is_err());
    }
}
