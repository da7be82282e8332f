/// Failure reading or writing a framed NV block.
///
/// Never fatal to the caller: per the core's error-handling design, a read
/// failure means "treat the block as absent and re-initialize defaults", and
/// a write failure is reported but never aborts an in-progress apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(thiserror::Error))]
pub enum NvError {
    /// The trailing CRC-CCITT-16 did not match the framed bytes.
    #[cfg_attr(feature = "std", error("CRC mismatch"))]
    CrcMismatch,
    /// The stored `block_id` did not match the one requested.
    #[cfg_attr(feature = "std", error("block id mismatch"))]
    BlockIdMismatch,
    /// The stored payload length did not match the buffer supplied.
    #[cfg_attr(feature = "std", error("length mismatch"))]
    LengthMismatch,
    /// The payload did not fit within [`crate::NV_MAX_PAYLOAD_BYTES`].
    #[cfg_attr(feature = "std", error("payload too large"))]
    PayloadTooLarge,
    /// No block with this id has ever been written.
    #[cfg_attr(feature = "std", error("block not found"))]
    NotFound,
    /// The backend itself reported a failure (e.g. underlying I/O error).
    #[cfg_attr(feature = "std", error("backend failure"))]
    BackendFailure,
}
