//! SipHash-2-4 MAC, CRC-CCITT and the bit/digit/bitset plumbing the keycode
//! codecs are built from.
#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod bitset;
pub mod bitstream;
pub mod crc;
pub mod digits;
mod siphash;

pub use bitset::Bitset;
pub use bitstream::Bitstream;
pub use digits::DigitStream;
pub use siphash::{compute, compute_pseudorandom_bytes};
