use nexus_crypto::crc::crc16_ccitt;

use crate::backend::NvBackend;
use crate::error::NvError;

/// Distinguishes core-owned NV blocks from product-owned blocks sharing the
/// same underlying storage.
pub const NV_SENTINEL: u8 = 0xA5;

/// Largest payload a single block may carry (length is a one-byte field).
pub const NV_MAX_PAYLOAD_BYTES: usize = 32;

/// Bytes of framing overhead per block: `sentinel(1) + block_id(2) +
/// length(1) + crc(2)`.
pub const NV_BLOCK_OVERHEAD_BYTES: usize = 6;

const MAX_FRAMED_BYTES: usize = NV_MAX_PAYLOAD_BYTES + NV_BLOCK_OVERHEAD_BYTES;

/// CRC-framed block store generic over a raw [`NvBackend`].
///
/// Encodes each block as `sentinel | block_id_le | length | payload |
/// crc_ccitt_le` on write, and on read verifies the sentinel, the requested
/// `block_id`, the requested length and the trailing CRC before handing the
/// payload back — any mismatch is reported as the caller's cue to fall back
/// to default-initialized state, per the core's NV error-handling design.
pub struct NvStore<B> {
    backend: B,
}

impl<B: NvBackend> NvStore<B> {
    /// Wraps `backend` with CRC framing.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Returns the wrapped backend, discarding the framing layer.
    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Frames and persists `payload` under `block_id`.
    pub fn write(&mut self, block_id: u16, payload: &[u8]) -> Result<(), NvError> {
        if payload.len() > NV_MAX_PAYLOAD_BYTES {
            return Err(NvError::PayloadTooLarge);
        }

        let mut framed = [0u8; MAX_FRAMED_BYTES];
        let framed_len = NV_BLOCK_OVERHEAD_BYTES + payload.len();
        let id_bytes = block_id.to_le_bytes();

        framed[0] = NV_SENTINEL;
        framed[1..3].copy_from_slice(&id_bytes);
        framed[3] = payload.len() as u8;
        framed[4..4 + payload.len()].copy_from_slice(payload);

        let crc = crc16_ccitt(&framed[1..4 + payload.len()]);
        let crc_offset = 4 + payload.len();
        framed[crc_offset..crc_offset + 2].copy_from_slice(&crc.to_le_bytes());

        if self.backend.write_framed(block_id, &framed[..framed_len]) {
            Ok(())
        } else {
            Err(NvError::BackendFailure)
        }
    }

    /// Reads the block stored under `block_id`, verifying it decodes to
    /// exactly `out.len()` payload bytes, and copies the payload into `out`.
    pub fn read(&self, block_id: u16, out: &mut [u8]) -> Result<(), NvError> {
        let mut framed = [0u8; MAX_FRAMED_BYTES];
        let framed_len = self
            .backend
            .read_framed(block_id, &mut framed)
            .ok_or(NvError::NotFound)?;

        if framed_len < NV_BLOCK_OVERHEAD_BYTES {
            return Err(NvError::LengthMismatch);
        }
        if framed[0] != NV_SENTINEL {
            return Err(NvError::BlockIdMismatch);
        }

        let stored_id = u16::from_le_bytes([framed[1], framed[2]]);
        if stored_id != block_id {
            return Err(NvError::BlockIdMismatch);
        }

        let length = framed[3] as usize;
        if length != out.len() || framed_len != NV_BLOCK_OVERHEAD_BYTES + length {
            return Err(NvError::LengthMismatch);
        }

        let crc_offset = 4 + length;
        let stored_crc = u16::from_le_bytes([framed[crc_offset], framed[crc_offset + 1]]);
        let computed_crc = crc16_ccitt(&framed[1..crc_offset]);
        if stored_crc != computed_crc {
            return Err(NvError::CrcMismatch);
        }

        out.copy_from_slice(&framed[4..4 + length]);
        Ok(())
    }
}
