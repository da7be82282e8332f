//! PAYG access-control keycode runtime for embedded appliances.
//!
//! A device holds a small amount of persistent state — a replay window, a
//! pair of factory QC test-code counters, a message-assembly grace counter —
//! and answers keycodes entered by a user or technician with a credit
//! mutation and a feedback outcome. [`Core`] owns that state; a product
//! integrates this crate by implementing [`PlatformCallbacks`] and an
//! [`nexus_storage::NvBackend`] for its own flash/EEPROM, then driving
//! [`Core::handle_single_key`] (or [`Core::handle_complete_keycode`]) and
//! [`Core::process`] from its keypad interrupt and main loop respectively.
//!
//! Two wire protocols are supported, selected by [`Config::protocol`]: the
//! "small" protocol (14 symbols drawn from a 4-character alphabet) for
//! numeric keypads with no `*`/`#`, and the "full" protocol (decimal digits
//! framed by `*`/`#`) for a standard phone-style keypad. Both are decoded
//! by `nexus-protocol`; this crate supplies the replay window those codecs
//! authenticate against and the logic that applies a verified message's
//! effects.
#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod apply;
pub mod callbacks;
pub mod config;
pub mod core;
pub mod error;
pub mod feedback;
pub mod mas;
pub mod qc;
pub mod replay_window;

pub use callbacks::PlatformCallbacks;
pub use config::{Config, ConfigError, Protocol};
pub use core::Core;
pub use error::ApplyError;
pub use feedback::Feedback;
pub use mas::{AssembledFrame, BookendConfig};
pub use qc::QcCounters;
pub use replay_window::ReplayWindow;
