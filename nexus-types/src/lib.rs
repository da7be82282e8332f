//! Atomic newtypes shared across the `nexus-keycode` PAYG runtime.
//!
//! These types carry no behavior of their own; they exist so that the
//! protocol, crypto and storage crates agree on the shape of a secret key,
//! a MAC output, a message id and the coarse PAYG state without each crate
//! re-deriving the same plumbing.
#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

mod check;
mod payg;
mod secret;

pub use check::CheckValue;
pub use payg::PaygState;
pub use secret::SecretKey;

/// Width in bytes of a [`SecretKey`].
pub const SECRET_KEY_BYTES: usize = 16;

/// A message id within the replay window. Monotonically increasing per
/// device; never wraps in practice (the window is sized far below `u32::MAX`).
pub type MessageId = u32;

/// The serial number printed on the device and echoed by some factory
/// keycodes.
pub type UserFacingId = u32;

/// A duration of product credit, expressed in whole seconds.
pub type CreditSeconds = u32;
