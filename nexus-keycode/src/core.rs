//! Top-level orchestration: wires message assembly, replay-window/QC state
//! and the per-protocol codecs/apply logic behind the few entry points a
//! platform integration calls. Grounded on the `nexus_keycode_pro_handle_*`
//! / `nexus_keycode_pro_process` dispatch in `nexus_keycode_pro.c`.
//!
//! # Context rules
//!
//! [`Core::handle_single_key`] runs at interrupt priority: it only touches
//! the in-RAM assembly buffer (via [`Mas::push_key`]) and echoes per-key
//! feedback, never NV or the MAC. A completed frame is stashed in a
//! single-slot mailbox for [`Core::process`] to authenticate and apply from
//! main-loop context. [`Core::handle_complete_keycode`] is itself a
//! main-loop entry point (for platforms that deliver a whole keycode at
//! once rather than key-by-key) and may authenticate/apply inline.

use nexus_protocol::extended;
use nexus_protocol::full::{self, FactoryOrPassthrough};
use nexus_protocol::small;
use nexus_storage::NvBackend;
use nexus_types::SecretKey;

use crate::apply;
use crate::callbacks::PlatformCallbacks;
use crate::config::{Config, Protocol};
use crate::feedback::Feedback;
use crate::mas::{AssembledFrame, BookendConfig, Mas};
use crate::qc::QcCounters;
use crate::replay_window::ReplayWindow;

/// Owns every piece of persistent and in-RAM keycode state for one device.
/// Generic over the NV backend so a platform integration picks one type and
/// hands this crate three handles to it — one per independently block-id'd
/// piece of state (replay window, QC counters, MAS grace counter).
pub struct Core<B> {
    window: ReplayWindow<B>,
    qc: QcCounters<B>,
    mas: Mas<B>,
    config: Config,
    alphabet: [u8; 4],
    pending: Option<AssembledFrame>,
    last_uptime_seconds: u32,
}

impl<B: NvBackend> Core<B> {
    /// Loads every piece of persisted state from its backend and builds a
    /// fresh `Core`. `alphabet` is only consulted by the small protocol; full
    /// protocol callers may pass any value.
    pub fn new(
        config: Config,
        bookend: BookendConfig,
        alphabet: [u8; 4],
        window_backend: B,
        qc_backend: B,
        mas_backend: B,
    ) -> Self {
        Self {
            window: ReplayWindow::load(window_backend),
            qc: QcCounters::load(qc_backend),
            mas: Mas::new(config, bookend, mas_backend),
            config,
            alphabet,
            pending: None,
            last_uptime_seconds: 0,
        }
    }

    /// Discards every CRC framing layer and returns the three raw backends,
    /// e.g. to hand the same underlying flash to a freshly constructed
    /// `Core` after a simulated reboot. Any frame still pending
    /// authentication is dropped.
    pub fn into_backends(self) -> (B, B, B) {
        (self.window.into_backend(), self.qc.into_backend(), self.mas.into_backend())
    }

    /// Whether the assembler's rate limit bucket is currently exhausted.
    /// Safe to call from any context.
    pub fn is_rate_limited(&self) -> bool {
        self.mas.is_rate_limited()
    }

    /// Interrupt-context single-key path. Returns the per-key feedback to
    /// echo immediately; never blocks on NV or the platform beyond a cheap
    /// `request_processing` nudge once a frame completes.
    pub fn handle_single_key<C: PlatformCallbacks>(&mut self, key: u8, callbacks: &mut C) -> Feedback {
        let (feedback, frame) = self.mas.push_key(key);

        if let Some(frame) = frame {
            self.pending = Some(frame);
            if let Err(err) = callbacks.request_processing(0) {
                tracing::warn!(?err, "request_processing failed after assembling a frame");
            }
        }
        if let Err(err) = callbacks.feedback_start(feedback) {
            tracing::warn!(?err, "feedback_start failed for key feedback");
        }
        feedback
    }

    /// Main-loop path for platforms that deliver an entire keycode at once.
    /// Authenticates and applies inline rather than deferring to `process`.
    pub fn handle_complete_keycode<C: PlatformCallbacks>(&mut self, keys: &[u8], callbacks: &mut C) -> Feedback {
        let drop_last_char = matches!(self.config.protocol(), Protocol::Full);
        let feedback = match self.mas.handle_complete_keycode(keys, drop_last_char) {
            Some(frame) => self.process_frame(frame.as_slice(), callbacks),
            None => Feedback::MessageInvalid,
        };
        if let Err(err) = callbacks.feedback_start(feedback) {
            tracing::warn!(?err, "feedback_start failed for handle_complete_keycode");
        }
        feedback
    }

    /// Periodic main-loop tick. `uptime_seconds` is the platform's absolute
    /// uptime clock; elapsed time is computed here and clamped to zero
    /// across a backward jump (e.g. a clock that wrapped or was corrected)
    /// rather than underflowing. Authenticates and applies any frame
    /// assembled since the last tick, then returns the number of seconds
    /// after which the platform should call `process` again.
    pub fn process<C: PlatformCallbacks>(&mut self, uptime_seconds: u32, callbacks: &mut C) -> u32 {
        let elapsed = uptime_seconds.checked_sub(self.last_uptime_seconds).unwrap_or(0);
        self.last_uptime_seconds = uptime_seconds;

        let delay = match self.mas.process(elapsed, uptime_seconds) {
            Ok(delay) => delay,
            Err(err) => {
                tracing::error!(?err, "message-assembly NV tick failed");
                self.config.idle_between_process_seconds()
            }
        };

        if let Some(frame) = self.pending.take() {
            let feedback = self.process_frame(frame.as_slice(), callbacks);
            if let Err(err) = callbacks.feedback_start(feedback) {
                tracing::warn!(?err, "feedback_start failed for assembled frame");
            }
        }

        if let Err(err) = callbacks.request_processing(delay) {
            tracing::warn!(?err, "request_processing failed while scheduling the next tick");
        }
        delay
    }

    /// Wipes every piece of NV-backed state back to its power-on default,
    /// mirroring a factory `WIPE_STATE(CREDIT_AND_MASK)`. Does not touch
    /// credit itself — callers that want a full factory reset still need to
    /// call `payg_credit_set(0)` through their own callbacks.
    pub fn shutdown(&mut self) -> Result<(), nexus_storage::NvError> {
        self.window.wipe()?;
        self.qc.reset()
    }

    fn process_frame<C: PlatformCallbacks>(&mut self, body: &[u8], callbacks: &mut C) -> Feedback {
        match self.config.protocol() {
            Protocol::Small => self.process_small(body, callbacks),
            Protocol::Full => self.process_full(body, callbacks),
            Protocol::ExtendedSmall => self.process_extended(body, callbacks),
        }
    }

    fn process_extended<C: PlatformCallbacks>(&mut self, symbols: &[u8], callbacks: &mut C) -> Feedback {
        let mut payload = match extended::decode_symbols(symbols, &self.alphabet) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::debug!(?err, "extended-small frame failed to decode");
                return Feedback::MessageInvalid;
            }
        };

        let secret = match callbacks.get_secret_key() {
            Ok(secret) => secret,
            Err(err) => {
                tracing::warn!(?err, "get_secret_key failed");
                return Feedback::MessageInvalid;
            }
        };

        // Unlike small/full, id inference and MAC authentication happen
        // together here: a candidate id only matches once its recomputed MAC
        // agrees, so there is no separate `verify` step.
        let message = match extended::parse(&mut payload, &secret, &self.window) {
            Ok(message) => message,
            Err(err) => {
                tracing::debug!(?err, "extended-small frame failed to authenticate");
                return Feedback::MessageInvalid;
            }
        };

        match apply::extended::apply(&message, &mut self.window, callbacks) {
            Ok(feedback) => feedback,
            Err(err) => {
                tracing::warn!(?err, "applying extended-small message failed");
                Feedback::MessageInvalid
            }
        }
    }

    fn process_small<C: PlatformCallbacks>(&mut self, symbols: &[u8], callbacks: &mut C) -> Feedback {
        let message = match small::parse(symbols, &self.alphabet, &self.window) {
            Ok(message) => message,
            Err(err) => {
                tracing::debug!(?err, "small-protocol frame failed to parse");
                return Feedback::MessageInvalid;
            }
        };

        let secret = match callbacks.get_secret_key() {
            Ok(secret) => secret,
            Err(err) => {
                tracing::warn!(?err, "get_secret_key failed");
                return Feedback::MessageInvalid;
            }
        };
        if let Err(err) = small::verify(&message, &secret) {
            tracing::debug!(?err, "small-protocol MAC verification failed");
            return Feedback::MessageInvalid;
        }

        match apply::small::apply(&message, &mut self.window, &mut self.qc, &self.config, callbacks) {
            Ok(feedback) => feedback,
            Err(err) => {
                tracing::warn!(?err, "applying small-protocol message failed");
                Feedback::MessageInvalid
            }
        }
    }

    fn process_full<C: PlatformCallbacks>(&mut self, digits: &[u8], callbacks: &mut C) -> Feedback {
        let type_digit = match digits.first() {
            Some(&ascii) => ascii.wrapping_sub(b'0'),
            None => return Feedback::MessageInvalid,
        };

        if type_digit < full::TYPE_FACTORY_ALLOW_TEST {
            self.process_full_activation(digits, callbacks)
        } else {
            self.process_full_factory_or_passthrough(digits, callbacks)
        }
    }

    fn process_full_activation<C: PlatformCallbacks>(&mut self, digits: &[u8], callbacks: &mut C) -> Feedback {
        let message = match full::parse_activation(digits, &self.window) {
            Ok(message) => message,
            Err(err) => {
                tracing::debug!(?err, "full-protocol activation frame failed to parse");
                return Feedback::MessageInvalid;
            }
        };

        let secret = match callbacks.get_secret_key() {
            Ok(secret) => secret,
            Err(err) => {
                tracing::warn!(?err, "get_secret_key failed");
                return Feedback::MessageInvalid;
            }
        };
        if let Err(err) = full::verify(&message, &secret) {
            tracing::debug!(?err, "full-protocol MAC verification failed");
            return Feedback::MessageInvalid;
        }

        match apply::full::apply(&message, &mut self.window, &mut self.qc, &self.config, callbacks) {
            Ok(feedback) => feedback,
            Err(err) => {
                tracing::warn!(?err, "applying full-protocol message failed");
                Feedback::MessageInvalid
            }
        }
    }

    fn process_full_factory_or_passthrough<C: PlatformCallbacks>(
        &mut self,
        digits: &[u8],
        callbacks: &mut C,
    ) -> Feedback {
        let parsed = match full::parse_factory_or_passthrough(digits) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::debug!(?err, "full-protocol factory/passthrough frame failed to parse");
                return Feedback::MessageInvalid;
            }
        };

        let message = match parsed {
            FactoryOrPassthrough::Passthrough(body) => {
                return match apply::full::apply_passthrough(body, callbacks) {
                    Ok(feedback) => feedback,
                    Err(err) => {
                        tracing::debug!(?err, "passthrough command rejected");
                        Feedback::MessageInvalid
                    }
                };
            }
            FactoryOrPassthrough::Message(message) => message,
        };

        if message.type_code != full::TYPE_FACTORY_NOMAC_DEVICE_ID_CONFIRMATION {
            if let Err(err) = full::verify(&message, &SecretKey::FIXED_00) {
                tracing::debug!(?err, "full-protocol factory MAC verification failed");
                return Feedback::MessageInvalid;
            }
        }

        match apply::full::apply(&message, &mut self.window, &mut self.qc, &self.config, callbacks) {
            Ok(feedback) => feedback,
            Err(err) => {
                tracing::warn!(?err, "applying full-protocol factory message failed");
                Feedback::MessageInvalid
            }
        }
    }
}
