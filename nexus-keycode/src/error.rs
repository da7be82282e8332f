/// Internal failure applying a verified message's effects.
///
/// Unlike [`crate::feedback::Feedback`], this never reaches the product UI —
/// callers fold it into `Feedback::MessageInvalid` or log it, per the
/// core's "no error is fatal" design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(thiserror::Error))]
pub enum ApplyError {
    /// The wire codec rejected the frame outright.
    #[cfg_attr(feature = "std", error("codec error: {0:?}"))]
    Codec(nexus_protocol::CodecError),
    /// Reading or writing a replay-window or counter NV block failed.
    #[cfg_attr(feature = "std", error("NV error: {0:?}"))]
    Nv(nexus_storage::NvError),
    /// The external passthrough handler rejected a type-8 frame.
    #[cfg_attr(feature = "std", error("passthrough handler rejected the command"))]
    PassthroughRejected,
    /// A platform callback returned an error while applying a message's
    /// effects. The platform's own error type is folded away here since
    /// `ApplyError` is shared across every `PlatformCallbacks` impl.
    #[cfg_attr(feature = "std", error("a platform callback failed"))]
    Callback,
}

impl From<nexus_protocol::CodecError> for ApplyError {
    fn from(err: nexus_protocol::CodecError) -> Self {
        ApplyError::Codec(err)
    }
}

impl From<nexus_storage::NvError> for ApplyError {
    fn from(err: nexus_storage::NvError) -> Self {
        ApplyError::Nv(err)
    }
}
