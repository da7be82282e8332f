/// Outcome reported to [`crate::callbacks::PlatformCallbacks::feedback_start`]
/// after a keycode is processed, or after a single keystroke.
///
/// Distinct from [`crate::error::ApplyError`]: this is the wire-facing
/// result the product UI reacts to, not an internal failure a caller must
/// handle — every outcome, including malformed input, ends here rather than
/// propagating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Feedback {
    /// No feedback is due (e.g. a passthrough command, or nothing pending).
    None,
    /// The frame failed to parse or authenticate, or was rate-limited.
    MessageInvalid,
    /// The frame authenticated but had no effect (already applied, or a
    /// policy rejection such as ADD_CREDIT on an unlocked unit).
    MessageValid,
    /// The frame authenticated and its effect was applied.
    MessageApplied,
    /// The frame requests the device display its serial/user-facing id.
    DisplaySerialId,
    /// A single keystroke was accepted by the message assembler.
    KeyAccepted,
    /// A single keystroke was rejected (out of sequence, or rate-limited).
    KeyRejected,
}
