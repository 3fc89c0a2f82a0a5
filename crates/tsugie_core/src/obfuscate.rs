//! The `xor_sha256_stream_v1` tamper-evident packing transform.
//!
//! This is not security; it is the exact byte-level transform the export
//! bundle's clients already decode, and it must be replicated exactly:
//! `key = sha256(key_seed)`, `out[i] = raw[i] ^ key[i % 32] ^ ((i*131+17) & 0xFF)`.
//! The transform is its own inverse.

use sha2::{Digest, Sha256};

/// Default `key_seed`, matching the stable value clients are pinned to.
pub const DEFAULT_KEY_SEED: &str = "tsugie-ios-seed-v1";

/// Derives the 32-byte obfuscation key from a `key_seed` string.
#[must_use]
pub fn derive_key(key_seed: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(key_seed.as_bytes());
    hasher.finalize().into()
}

/// Applies the XOR stream transform in place. Self-inverse: calling this
/// twice with the same key returns the original bytes.
pub fn xor_stream(data: &mut [u8], key: &[u8; 32]) {
    for (i, byte) in data.iter_mut().enumerate() {
        let positional = ((i.wrapping_mul(131).wrapping_add(17)) & 0xFF) as u8;
        *byte ^= key[i % key.len()] ^ positional;
    }
}

/// Returns an obfuscated copy of `data` under `key_seed`.
#[must_use]
pub fn obfuscate(data: &[u8], key_seed: &str) -> Vec<u8> {
    let key = derive_key(key_seed);
    let mut out = data.to_vec();
    xor_stream(&mut out, &key);
    out
}

/// Reverses [`obfuscate`]; identical to it since the transform is self-inverse.
#[must_use]
pub fn unobfuscate(data: &[u8], key_seed: &str) -> Vec<u8> {
    obfuscate(data, key_seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn obfuscate_is_self_inverse() {
        let raw = b"hello tsugie payload".to_vec();
        let packed = obfuscate(&raw, DEFAULT_KEY_SEED);
        assert_ne!(packed, raw);
        let unpacked = unobfuscate(&packed, DEFAULT_KEY_SEED);
        assert_eq!(unpacked, raw);
    }

    #[test]
    fn obfuscate_empty_is_empty() {
        assert!(obfuscate(b"", DEFAULT_KEY_SEED).is_empty());
    }

    #[test]
    fn different_seeds_diverge() {
        let raw = b"same input bytes".to_vec();
        let a = obfuscate(&raw, "seed-a");
        let b = obfuscate(&raw, "seed-b");
        assert_ne!(a, b);
    }
}
