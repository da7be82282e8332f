//! CRC-framed non-volatile block storage.
//!
//! Mirrors the `StorageInspect`/`StorageMutate` split the rest of the pack
//! uses for storage-backed data structures: [`NvBackend`] is the thin,
//! swappable raw-bytes boundary a platform integrator implements; [`NvStore`]
//! is generic over it and owns the encode/CRC/verify framing once, so every
//! backend gets it for free.
#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

mod backend;
mod error;
mod store;

pub use backend::{AppendLogNvBackend, MemoryNvBackend, NvBackend};
pub use error::NvError;
pub use store::{NvStore, NV_BLOCK_OVERHEAD_BYTES, NV_MAX_PAYLOAD_BYTES, NV_SENTINEL};
