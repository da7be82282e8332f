/// Raw, CRC-framed-byte-blob storage a platform integrator implements.
///
/// `NvStore` owns encoding, CRC computation and verification; a backend only
/// needs to persist and retrieve the already-framed bytes keyed by
/// `block_id`. This is deliberately narrower than a generic key-value store:
/// it exists to decouple the CRC framing logic (tested once, here) from
/// whatever raw flash/EEPROM/file primitives a given product uses.
pub trait NvBackend {
    /// Persists `framed` under `block_id`. Must be durable before returning
    /// `true`; `false` signals a backend-local write failure.
    fn write_framed(&mut self, block_id: u16, framed: &[u8]) -> bool;

    /// Copies the bytes stored under `block_id` into `buf`, returning the
    /// number of bytes copied, or `None` if no block with that id has ever
    /// been written or `buf` is too small.
    fn read_framed(&self, block_id: u16, buf: &mut [u8]) -> Option<usize>;
}

#[cfg(feature = "std")]
mod std_backends {
    use std::collections::HashMap;

    use super::NvBackend;

    /// Overwrite-semantics in-memory backend: each `write_framed` replaces
    /// any prior bytes stored under the same `block_id`. Suitable for unit
    /// tests that don't care about durability-through-append ordering.
    #[derive(Default)]
    pub struct MemoryNvBackend {
        blocks: HashMap<u16, Vec<u8>>,
    }

    impl MemoryNvBackend {
        /// An empty backend with nothing written.
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl NvBackend for MemoryNvBackend {
        fn write_framed(&mut self, block_id: u16, framed: &[u8]) -> bool {
            self.blocks.insert(block_id, framed.to_vec());
            true
        }

        fn read_framed(&self, block_id: u16, buf: &mut [u8]) -> Option<usize> {
            let stored = self.blocks.get(&block_id)?;
            if stored.len() > buf.len() {
                return None;
            }
            buf[..stored.len()].copy_from_slice(stored);
            Some(stored.len())
        }
    }

    /// Write-append-log backend mirroring the desktop mock referenced by
    /// the core's design notes: every write appends a new record; reads
    /// scan the whole log and the *last* matching block wins. Used by
    /// integration tests exercising NV durability across a simulated
    /// reboot without assuming the backend overwrites in place.
    #[derive(Default)]
    pub struct AppendLogNvBackend {
        log: Vec<(u16, Vec<u8>)>,
    }

    impl AppendLogNvBackend {
        /// An empty log.
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl NvBackend for AppendLogNvBackend {
        fn write_framed(&mut self, block_id: u16, framed: &[u8]) -> bool {
            self.log.push((block_id, framed.to_vec()));
            true
        }

        fn read_framed(&self, block_id: u16, buf: &mut [u8]) -> Option<usize> {
            let stored = self
                .log
                .iter()
                .rev()
                .find(|(id, _)| *id == block_id)
                .map(|(_, bytes)| bytes)?;
            if stored.len() > buf.len() {
                return None;
            }
            buf[..stored.len()].copy_from_slice(stored);
            Some(stored.len())
        }
    }
}

#[cfg(feature = "std")]
pub use std_backends::{AppendLogNvBackend, MemoryNvBackend};
