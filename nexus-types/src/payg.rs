/// Coarse PAYG state owned by the product, read (never written) by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PaygState {
    /// Product functionality is gated off.
    Disabled,
    /// Product functionality is gated on, credit is being consumed.
    Enabled,
    /// Product functionality is gated on permanently; credit no longer applies.
    Unlocked,
}

impl PaygState {
    /// True once the device has been permanently unlocked.
    pub const fn is_unlocked(self) -> bool {
        matches!(self, PaygState::Unlocked)
    }
}
