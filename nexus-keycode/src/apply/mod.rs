//! Applies a verified, id-inferred protocol message: the credit/PAYG-state
//! effects, the NV bookkeeping (replay window, QC counters) and the
//! [`Feedback`](crate::feedback::Feedback) the platform should surface.
//!
//! One module per wire protocol, grounded on the `nexus_keycode_pro_*_apply`
//! functions in `nexus_keycode_pro.c`; each takes already-MAC-verified
//! input from `nexus-protocol` and never re-parses or re-authenticates it.

pub mod extended;
pub mod full;
pub mod small;

/// Seconds in an hour, used by the full protocol's `hours` body unit.
pub const SECONDS_IN_HOUR: u32 = 3600;
/// Seconds in a day, used by the small protocol's `days` increment tables.
pub const SECONDS_IN_DAY: u32 = 86_400;
/// Credit granted by a universal (non-lifetime-limited) short test code.
pub const UNIVERSAL_SHORT_TEST_SECONDS: u32 = 127;
/// Threshold separating a "short" QC test code from a "long" one.
pub const QC_SHORT_TEST_MESSAGE_SECONDS: u32 = 600;
/// Credit granted by the small protocol's single QC test function.
pub const QC_LONG_TEST_MESSAGE_SECONDS: u32 = 3600;

/// `WIPE_STATE` target selector, shared by the small and full protocols.
///
/// The upstream product-configuration header defining these values' exact
/// wire encoding was not part of the retrieved source; declaration order
/// (matching the small-protocol `switch` fallthrough in
/// `nexus_keycode_pro.c`) is used as the numeric assignment — see
/// `DESIGN.md`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WipeTarget {
    /// Reset the replay window *and* zero credit.
    CreditAndMask = 0,
    /// Zero credit only.
    Credit = 1,
    /// Reset the replay window only.
    MaskOnly = 2,
}

impl WipeTarget {
    /// Maps a wire value to a target, if recognized.
    pub fn from_wire(value: u8) -> Option<Self> {
        match value {
            0 => Some(WipeTarget::CreditAndMask),
            1 => Some(WipeTarget::Credit),
            2 => Some(WipeTarget::MaskOnly),
            _ => None,
        }
    }
}
