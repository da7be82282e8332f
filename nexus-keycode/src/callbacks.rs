//! Platform integration boundary.
//!
//! [`PlatformCallbacks`] is the one trait a product integrator implements.
//! Everything the core needs from the surrounding firmware — the device
//! secret, the current PAYG state, credit mutation, user-visible feedback —
//! goes through it, mirroring the way [`nexus_storage::NvBackend`] isolates
//! raw storage I/O: one small trait, one associated error type, no
//! assumptions about how the platform implements any of it.

use nexus_types::{CreditSeconds, PaygState, SecretKey, UserFacingId};

/// Platform-provided effects and state reads the core cannot perform itself.
///
/// `Error` is the platform's own I/O error type; the core never inspects it
/// beyond `Debug`, folding any failure into [`crate::error::ApplyError`].
pub trait PlatformCallbacks {
    /// Platform-specific error, e.g. an I2C or flash failure.
    type Error: core::fmt::Debug;

    /// Returns the per-device secret key used to authenticate activation
    /// messages. Never persisted by the core.
    fn get_secret_key(&mut self) -> Result<SecretKey, Self::Error>;

    /// Returns the serial number printed on the device, used to answer
    /// `FACTORY_DEVICE_ID_DISPLAY`/`_CONFIRMATION`.
    fn get_user_facing_id(&mut self) -> Result<UserFacingId, Self::Error>;

    /// Returns the product's current PAYG gating state.
    fn payg_state_get_current(&mut self) -> Result<PaygState, Self::Error>;

    /// Adds `seconds` of credit on top of whatever the product currently
    /// holds.
    fn payg_credit_add(&mut self, seconds: CreditSeconds) -> Result<(), Self::Error>;

    /// Replaces the product's credit balance with `seconds`.
    fn payg_credit_set(&mut self, seconds: CreditSeconds) -> Result<(), Self::Error>;

    /// Permanently unlocks the product; PAYG gating no longer applies.
    fn payg_credit_unlock(&mut self) -> Result<(), Self::Error>;

    /// Clears whatever sub-state `target` names (small-protocol
    /// `WIPE_STATE`/full-protocol `WIPE_STATE` body), e.g. "forget
    /// provisioning" or "clear fault log". The meaning of each `target`
    /// value is product-defined.
    fn payg_state_wipe(&mut self, target: u8) -> Result<(), Self::Error>;

    /// Reports the outcome of processing a keycode (or a single keystroke)
    /// to the product's UI layer.
    fn feedback_start(&mut self, feedback: crate::feedback::Feedback) -> Result<(), Self::Error>;

    /// Requests that the platform call [`crate::core::Core::process`] again
    /// within `delay_seconds` (e.g. to schedule deferred MAC verification
    /// off the interrupt path).
    fn request_processing(&mut self, delay_seconds: u32) -> Result<(), Self::Error>;

    /// Hands a type-8 `PASSTHROUGH_COMMAND` body to a product-specific
    /// handler outside this crate's MAC authentication. Returning `Ok(false)`
    /// surfaces as [`crate::error::ApplyError::PassthroughRejected`].
    fn passthrough_keycode(&mut self, body: &[u8]) -> Result<bool, Self::Error>;

    /// Notifies the platform that a custom product-defined flag changed as
    /// a side effect of applying a keycode (e.g. a demo-mode flag set by
    /// `DEMO_CODE`). Given a default implementation since most products
    /// have no such flags.
    fn notify_custom_flag_changed(&mut self, _flag: u8, _value: bool) -> Result<(), Self::Error> {
        Ok(())
    }
}
