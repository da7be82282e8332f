//! SipHash-2-4 MAC computation.
//!
//! Every MAC in both wire protocols is a SipHash-2-4 digest over a packed
//! little-endian serialization of the message fields — never the ASCII
//! characters of the frame. This module also derives pseudorandom bytes
//! from a MAC by hashing a short seed with the fixed all-zero key, which is
//! how both protocols de-interleave their body bits/digits.

use core::hash::Hasher;
use siphasher::sip::SipHasher24;

use nexus_types::{CheckValue, SecretKey};

/// Computes the SipHash-2-4 MAC of `data` under `key`.
pub fn compute(key: &SecretKey, data: &[u8]) -> CheckValue {
    let bytes = key.as_bytes();
    let k0 = u64::from_le_bytes(bytes[0..8].try_into().expect("8 bytes"));
    let k1 = u64::from_le_bytes(bytes[8..16].try_into().expect("8 bytes"));

    let mut hasher = SipHasher24::new_with_keys(k0, k1);
    hasher.write(data);
    CheckValue::new(hasher.finish())
}

/// Derives `output.len()` pseudorandom bytes from `seed` (at most 4 bytes)
/// under `key`, by hashing a one-byte prefix followed by the seed and
/// truncating the resulting check value's little-endian bytes.
///
/// Mirrors the original's `nexus_check_compute_pseudorandom_bytes`: the
/// prefix byte exists only to give the hash input a stable, non-empty shape
/// and is always zero.
pub fn compute_pseudorandom_bytes(key: &SecretKey, seed: &[u8], output: &mut [u8]) {
    assert!(seed.len() <= 4, "unsupported seed size");
    assert!(output.len() <= 8, "unsupported output size");

    let mut seed_bytes = [0u8; 5];
    seed_bytes[1..1 + seed.len()].copy_from_slice(seed);

    let chunk = compute(key, &seed_bytes[..seed.len() + 1]);
    let chunk_bytes = chunk.to_le_bytes();
    output.copy_from_slice(&chunk_bytes[..output.len()]);
}
