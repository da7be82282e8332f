//! Wire codecs for the small, full and extended-small PAYG keycode
//! protocols: symbol/digit parsing, de-interleaving, replay-window-based id
//! inference and MAC verification. Stateless — the concrete replay window
//! and NV-backed counters live in `nexus-keycode`, which implements
//! [`window::ReplayWindowQuery`] over its own storage.
#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod extended;
pub mod full;
pub mod increment;
pub mod small;
pub mod window;

pub use error::CodecError;
pub use window::ReplayWindowQuery;
