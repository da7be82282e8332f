use core::fmt;

use crate::SECRET_KEY_BYTES;

/// Opaque per-device symmetric key, stable for the device's lifetime.
///
/// Never persisted by the core; read once per `process` call through the
/// platform's `get_secret_key` callback. [`fmt::Debug`] deliberately redacts
/// the bytes so a stray `tracing::debug!(?key)` never leaks key material.
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SecretKey([u8; SECRET_KEY_BYTES]);

impl SecretKey {
    /// Fixed all-zero key used for small/full-protocol PRNG de-interleave
    /// seeding and for factory QC codes that must be applicable on any unit.
    pub const FIXED_00: SecretKey = SecretKey([0x00; SECRET_KEY_BYTES]);

    /// Fixed all-`0xFF` key used for small-protocol maintenance/test codes.
    pub const FIXED_FF: SecretKey = SecretKey([0xFF; SECRET_KEY_BYTES]);

    /// Builds a key from its raw bytes.
    pub const fn new(bytes: [u8; SECRET_KEY_BYTES]) -> Self {
        Self(bytes)
    }

    /// Borrows the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; SECRET_KEY_BYTES] {
        &self.0
    }
}

impl From<[u8; SECRET_KEY_BYTES]> for SecretKey {
    fn from(bytes: [u8; SECRET_KEY_BYTES]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}
