/// Failure decoding or authenticating a keycode frame.
///
/// Distinct from a [`crate::small::Response`]-style outcome: a `CodecError`
/// means the frame could not even be turned into a candidate message, not
/// that the message was rejected as invalid wire content (that case is
/// still represented, since an unauthenticated frame decodes to a message
/// whose check fails verification).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(thiserror::Error))]
pub enum CodecError {
    /// The frame did not have the length this codec expects.
    #[cfg_attr(feature = "std", error("frame has the wrong length"))]
    WrongLength,
    /// A symbol fell outside the configured alphabet.
    #[cfg_attr(feature = "std", error("symbol not in alphabet"))]
    SymbolNotInAlphabet,
    /// The MAC did not match any candidate message.
    #[cfg_attr(feature = "std", error("MAC verification failed"))]
    MacMismatch,
    /// The frame's type code is not one this codec recognizes.
    #[cfg_attr(feature = "std", error("unrecognized type code"))]
    UnknownTypeCode,
    /// No unused id in the replay window matched the truncated id.
    #[cfg_attr(feature = "std", error("could not infer a full message id"))]
    IdNotInferable,
    /// A digit stream ran out of input before the frame was fully parsed.
    #[cfg_attr(feature = "std", error("digit stream underrun"))]
    Underrun,
}
