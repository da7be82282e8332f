//! Factory QC test-code lifetime counters: a single nibble-packed byte
//! (`[7:4]` long-test count, `[3:0]` short-test count), persisted so a unit
//! can never accept more than `Config::factory_qc_{short,long}_lifetime`
//! test codes over its whole life. Ported from
//! `nexus_keycode_pro_{get,increment}_{short,long}_qc_code_count`.

use nexus_storage::{NvBackend, NvError, NvStore};

/// NV block id for the packed QC counters.
pub const BLOCK_ID: u16 = 0x5143; // "QC"

/// Counters saturate at the nibble width regardless of the configured
/// lifetime limit.
const NIBBLE_MAX: u8 = 15;

/// Persisted long/short factory QC test-code counters.
pub struct QcCounters<B> {
    store: NvStore<B>,
    packed: u8,
}

impl<B: NvBackend> QcCounters<B> {
    /// Loads the packed counter byte from `backend`, defaulting to zero.
    pub fn load(backend: B) -> Self {
        let store = NvStore::new(backend);
        let mut payload = [0u8; 1];
        let packed = store.read(BLOCK_ID, &mut payload).map(|()| payload[0]).unwrap_or(0);
        Self { store, packed }
    }

    /// Discards the CRC framing layer and returns the raw backend.
    pub fn into_backend(self) -> B {
        self.store.into_backend()
    }

    /// Count of long (>10 minute) QC codes applied so far.
    pub fn long_count(&self) -> u8 {
        (self.packed & 0xF0) >> 4
    }

    /// Count of short (<=10 minute) QC codes applied so far.
    pub fn short_count(&self) -> u8 {
        self.packed & 0x0F
    }

    /// Increments the long-test counter, refusing (silently, matching the
    /// source) once `lifetime_max` or the nibble's own 15-count ceiling is
    /// reached.
    pub fn increment_long(&mut self, lifetime_max: u8) -> Result<(), NvError> {
        let next = self.long_count().saturating_add(1);
        if next > NIBBLE_MAX || next > lifetime_max {
            return Ok(());
        }
        self.packed = (self.packed & 0x0F) | (next << 4);
        self.store.write(BLOCK_ID, &[self.packed])
    }

    /// Increments the short-test counter, with the same ceiling behavior as
    /// [`Self::increment_long`].
    pub fn increment_short(&mut self, lifetime_max: u8) -> Result<(), NvError> {
        let next = self.short_count().saturating_add(1);
        if next > NIBBLE_MAX || next > lifetime_max {
            return Ok(());
        }
        self.packed = (self.packed & 0xF0) | next;
        self.store.write(BLOCK_ID, &[self.packed])
    }

    /// Clears both counters, as `WIPE_STATE` targets that reset test state
    /// do.
    pub fn reset(&mut self) -> Result<(), NvError> {
        self.packed = 0;
        self.store.write(BLOCK_ID, &[self.packed])
    }
}
