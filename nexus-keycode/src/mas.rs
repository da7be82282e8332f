//! Message assembly: turns a stream of keypresses into at most one complete
//! frame per "bookend" cycle, rate-limited by a persistent grace-period
//! token bucket. Ported from `nexus_keycode_mas.c`.
//!
//! Interrupt-context callers use [`Mas::push_key`]; main-loop callers use
//! [`Mas::handle_complete_keycode`] (for platforms that deliver a whole
//! keycode at once) and [`Mas::process`] (periodic tick: refills the
//! bucket, persists the grace counter, times out a stalled entry).

use nexus_storage::{NvBackend, NvError, NvStore};

use crate::config::Config;
use crate::feedback::Feedback;

/// Sentinel `stop_length` meaning "no length-based finalize" (full protocol
/// relies solely on its end key).
pub const NO_STOP_LENGTH: u8 = 0;

/// Largest frame the assembler will buffer before marking an entry invalid.
/// No single wire frame in either protocol exceeds this.
pub const MAX_MESSAGE_LENGTH: usize = 32;

/// NV block id for the persisted grace-period keycode counter.
pub const BLOCK_ID: u16 = 0x4D41; // "MA"

/// Start/end keys and optional stop length framing a keycode entry.
#[derive(Debug, Clone, Copy)]
pub struct BookendConfig {
    /// Key that opens an entry.
    pub start_key: u8,
    /// Key that closes an entry (full protocol; ignored when `stop_length`
    /// is set, as the small protocol is).
    pub end_key: u8,
    /// Finalize once this many keys have been buffered, or
    /// [`NO_STOP_LENGTH`] to rely on `end_key` alone.
    pub stop_length: u8,
}

/// A finalized frame handed off to the protocol layer; `None` when the
/// entry was rejected or abandoned (the caller has already received
/// [`Feedback::MessageInvalid`]).
pub struct AssembledFrame {
    buffer: [u8; MAX_MESSAGE_LENGTH],
    len: usize,
}

impl AssembledFrame {
    /// The buffered keys, start/end framing already stripped.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[..self.len]
    }
}

/// Message assembler: bookend state machine plus rate-limit token bucket.
pub struct Mas<B> {
    bookend: BookendConfig,
    config: Config,
    store: NvStore<B>,
    grace_keycodes: u8,
    rl_bucket: u32,
    start_seen: bool,
    latest_activity_seconds: Option<u32>,
    buffer: [u8; MAX_MESSAGE_LENGTH],
    buffer_len: usize,
    max_length_exceeded: bool,
}

impl<B: NvBackend> Mas<B> {
    /// Loads the persisted grace counter from `backend` (defaulting to
    /// `config.rate_limit_initial_count()` if absent) and seeds the rate
    /// limit bucket from it, as the product does at power-up.
    pub fn new(config: Config, bookend: BookendConfig, backend: B) -> Self {
        let store = NvStore::new(backend);
        let mut payload = [0u8; 1];
        let grace_keycodes = match store.read(BLOCK_ID, &mut payload) {
            Ok(()) => payload[0],
            Err(_) => config.rate_limit_initial_count(),
        };
        let rl_bucket = u32::from(grace_keycodes) * u32::from(config.rate_limit_refill_seconds());

        Self {
            bookend,
            config,
            store,
            grace_keycodes,
            rl_bucket,
            start_seen: false,
            latest_activity_seconds: None,
            buffer: [0; MAX_MESSAGE_LENGTH],
            buffer_len: 0,
            max_length_exceeded: false,
        }
    }

    /// Discards the CRC framing layer and returns the raw backend.
    pub fn into_backend(self) -> B {
        self.store.into_backend()
    }

    /// `true` once the bucket has fewer than one refill unit's worth of
    /// seconds left. Rate limiting is disabled entirely when
    /// `rate_limit_bucket_max == 0`.
    pub fn is_rate_limited(&self) -> bool {
        if self.config.rate_limit_bucket_max() == 0 {
            return false;
        }
        self.rl_bucket < u32::from(self.config.rate_limit_refill_seconds())
    }

    fn attempts_remaining(&self) -> u8 {
        if self.config.rate_limit_bucket_max() == 0 {
            return 0;
        }
        let refill = u32::from(self.config.rate_limit_refill_seconds());
        let attempts = self.rl_bucket / refill;
        attempts.min(u32::from(u8::MAX)) as u8
    }

    fn add_rate_limit_time(&mut self, seconds_elapsed: u32) {
        let max_seconds =
            u32::from(self.config.rate_limit_bucket_max()) * u32::from(self.config.rate_limit_refill_seconds());
        self.rl_bucket = self.rl_bucket.saturating_add(seconds_elapsed).min(max_seconds);
    }

    fn deduct_one_attempt(&mut self) {
        let refill = u32::from(self.config.rate_limit_refill_seconds());
        self.rl_bucket = self.rl_bucket.saturating_sub(refill);
    }

    fn reset_buffer(&mut self) {
        self.buffer_len = 0;
        self.max_length_exceeded = false;
    }

    fn push_to_buffer(&mut self, key: u8) {
        if self.buffer_len < MAX_MESSAGE_LENGTH {
            self.buffer[self.buffer_len] = key;
            self.buffer_len += 1;
        } else {
            self.max_length_exceeded = true;
        }
    }

    fn has_reached_stop_length(&self) -> bool {
        self.bookend.stop_length != NO_STOP_LENGTH && self.buffer_len >= usize::from(self.bookend.stop_length)
    }

    /// Deducts one rate-limit attempt and returns the assembled buffer if
    /// the entry was well-formed, or `None` if it was empty or overlong.
    fn finish(&mut self) -> Option<AssembledFrame> {
        let frame = if self.buffer_len > 0 && !self.max_length_exceeded {
            Some(AssembledFrame { buffer: self.buffer, len: self.buffer_len })
        } else {
            None
        };
        self.deduct_one_attempt();
        self.reset_buffer();
        frame
    }

    /// Interrupt-safe single-key path. Never touches NV or the MAC; only
    /// mutates the in-RAM assembly buffer. Returns the per-key feedback to
    /// echo and, when a frame was just finalized via the end key or stop
    /// length, the assembled frame for the caller to hand to the protocol
    /// layer in main-loop context.
    pub fn push_key(&mut self, key: u8) -> (Feedback, Option<AssembledFrame>) {
        self.latest_activity_seconds = None; // re-armed next `process` call

        if self.is_rate_limited() {
            return (Feedback::KeyRejected, None);
        }

        if key == self.bookend.start_key {
            self.start_seen = true;
            self.reset_buffer();
            return (Feedback::KeyAccepted, None);
        }

        if !self.start_seen {
            return (Feedback::KeyRejected, None);
        }

        if key == self.bookend.end_key && self.bookend.stop_length == NO_STOP_LENGTH {
            self.start_seen = false;
            return (Feedback::KeyAccepted, self.finish());
        }

        self.push_to_buffer(key);
        if self.has_reached_stop_length() {
            self.start_seen = false;
            return (Feedback::KeyAccepted, self.finish());
        }
        (Feedback::KeyAccepted, None)
    }

    /// Whole-keycode path for platforms that deliver an entire entry at
    /// once. `keys` must begin with the configured start key; the small
    /// protocol has no end sentinel so its final character is kept, while
    /// the full protocol's final character is dropped (it is the end key).
    pub fn handle_complete_keycode(&mut self, keys: &[u8], drop_last_char: bool) -> Option<AssembledFrame> {
        if self.is_rate_limited() || keys.first() != Some(&self.bookend.start_key) {
            return None;
        }

        self.start_seen = true;
        self.reset_buffer();

        let last = if drop_last_char { keys.len().saturating_sub(1) } else { keys.len() };
        for &key in &keys[1..last] {
            self.push_to_buffer(key);
            if self.has_reached_stop_length() {
                break;
            }
        }
        self.start_seen = false;
        self.finish()
    }

    /// Periodic tick. `seconds_elapsed` refills the rate-limit bucket;
    /// `now_seconds` is compared against the last-activity timestamp to
    /// detect a stalled entry. Returns the number of seconds the caller
    /// should wait before calling `process` again.
    pub fn process(&mut self, seconds_elapsed: u32, now_seconds: u32) -> Result<u32, NvError> {
        self.add_rate_limit_time(seconds_elapsed);

        let grace = if self.rl_bucket
            >= u32::from(self.config.rate_limit_initial_count()) * u32::from(self.config.rate_limit_refill_seconds())
        {
            self.config.rate_limit_initial_count()
        } else {
            self.attempts_remaining()
        };
        if grace != self.grace_keycodes {
            self.grace_keycodes = grace;
            self.store.write(BLOCK_ID, &[grace])?;
        }

        if self.start_seen {
            let latest = *self.latest_activity_seconds.get_or_insert(now_seconds);
            if now_seconds.saturating_sub(latest) > self.config.entry_timeout_seconds() {
                self.start_seen = false;
                self.reset_buffer();
            }
        }

        Ok(if self.start_seen { 1 } else { self.config.idle_between_process_seconds() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Protocol;
    use nexus_storage::MemoryNvBackend;

    fn small_mas() -> Mas<MemoryNvBackend> {
        let config = Config::new(Protocol::Small, 10, 60, 3, 3, 3, 20, 3600);
        let bookend = BookendConfig { start_key: b'*', end_key: 0, stop_length: 14 };
        Mas::new(config, bookend, MemoryNvBackend::new())
    }

    #[test]
    fn start_key_opens_entry() {
        let mut mas = small_mas();
        let (feedback, frame) = mas.push_key(b'*');
        assert_eq!(feedback, Feedback::KeyAccepted);
        assert!(frame.is_none());
    }

    #[test]
    fn key_before_start_is_rejected() {
        let mut mas = small_mas();
        let (feedback, frame) = mas.push_key(b'1');
        assert_eq!(feedback, Feedback::KeyRejected);
        assert!(frame.is_none());
    }

    #[test]
    fn stop_length_finalizes_without_end_key() {
        let mut mas = small_mas();
        mas.push_key(b'*');
        for _ in 0..13 {
            mas.push_key(b'1');
        }
        let (_, frame) = mas.push_key(b'2');
        let frame = frame.expect("stop length reached");
        assert_eq!(frame.as_slice().len(), 14);
    }

    #[test]
    fn restart_mid_entry_resets_buffer() {
        let mut mas = small_mas();
        mas.push_key(b'*');
        mas.push_key(b'1');
        mas.push_key(b'1');
        let (feedback, frame) = mas.push_key(b'*');
        assert_eq!(feedback, Feedback::KeyAccepted);
        assert!(frame.is_none());
        assert_eq!(mas.buffer_len, 0);
    }

    #[test]
    fn handle_complete_keycode_drops_end_key_for_full_protocol() {
        let config = Config::new(Protocol::Full, 10, 60, 3, 3, 3, 20, 3600);
        let bookend = BookendConfig { start_key: b'*', end_key: b'#', stop_length: NO_STOP_LENGTH };
        let mut mas = Mas::new(config, bookend, MemoryNvBackend::new());

        let frame = mas.handle_complete_keycode(b"*12345#", true).unwrap();
        assert_eq!(frame.as_slice(), b"12345");
    }

    #[test]
    fn handle_complete_keycode_rejects_wrong_start_key() {
        let mut mas = small_mas();
        assert!(mas.handle_complete_keycode(b"912345", false).is_none());
    }

    #[test]
    fn grace_counter_survives_reload() {
        let config = Config::new(Protocol::Small, 10, 60, 3, 3, 3, 20, 3600);
        let bookend = BookendConfig { start_key: b'*', end_key: 0, stop_length: 14 };
        let backend = MemoryNvBackend::new();
        let mut mas = Mas::new(config, bookend, backend);

        mas.process(0, 0).unwrap();
        mas.push_key(b'*');
        for _ in 0..13 {
            mas.push_key(b'1');
        }
        mas.push_key(b'2');
        mas.process(0, 1).unwrap();
        assert!(mas.grace_keycodes < config.rate_limit_initial_count());
    }

    #[test]
    fn entry_timeout_abandons_stalled_entry() {
        let config = Config::new(Protocol::Small, 10, 60, 3, 3, 3, 20, 3600);
        let bookend = BookendConfig { start_key: b'*', end_key: 0, stop_length: 14 };
        let mut mas = Mas::new(config, bookend, MemoryNvBackend::new());

        mas.push_key(b'*');
        mas.process(0, 0).unwrap();
        mas.process(0, 21).unwrap();
        assert!(!mas.start_seen);
    }
}
