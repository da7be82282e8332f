//! Applies a verified [`ExtendedMessage`]. Grounded on
//! `nexus_keycode_pro_extended_small_apply` in
//! `nexus_keycode_pro_extended.c`.
//!
//! There is only one extended command today (SET_CREDIT + clear the
//! "restricted" custom flag), so unlike the small/full modules this one
//! applies its body directly rather than dispatching on `type_code`.

use nexus_protocol::extended::ExtendedMessage;
use nexus_protocol::increment::{small_set_credit_days, SMALL_UNLOCK_INCREMENT};
use nexus_storage::NvBackend;

use crate::apply::SECONDS_IN_DAY;
use crate::callbacks::PlatformCallbacks;
use crate::error::ApplyError;
use crate::feedback::Feedback;
use crate::replay_window::ReplayWindow;

/// Custom-flag id cleared on every successful apply. The upstream
/// product-configuration header naming `NX_KEYCODE_CUSTOM_FLAG_RESTRICTED`'s
/// numeric value was not part of the retrieved source; `0` is used as the
/// sole registered flag — see `DESIGN.md`.
pub const CUSTOM_FLAG_RESTRICTED: u8 = 0;

/// Applies `message`, unconditionally: the codec's id-inference step already
/// proved it unused and authentic, so there is no duplicate check here (and,
/// unlike the small/full SET_CREDIT, no activation/maintenance split).
pub fn apply<B: NvBackend, C: PlatformCallbacks>(
    message: &ExtendedMessage,
    window: &mut ReplayWindow<B>,
    callbacks: &mut C,
) -> Result<Feedback, ApplyError> {
    let days = small_set_credit_days(message.increment_id);
    if days == SMALL_UNLOCK_INCREMENT {
        callbacks.payg_credit_unlock().map_err(|_| ApplyError::Callback)?;
    } else {
        callbacks
            .payg_credit_set(u32::from(days) * SECONDS_IN_DAY)
            .map_err(|_| ApplyError::Callback)?;
    }

    window.mask_below(message.full_message_id + 1)?;
    callbacks
        .notify_custom_flag_changed(CUSTOM_FLAG_RESTRICTED, false)
        .map_err(|_| ApplyError::Callback)?;

    Ok(Feedback::MessageApplied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_storage::MemoryNvBackend;
    use nexus_types::{CreditSeconds, PaygState, SecretKey, UserFacingId};

    struct FakeCallbacks {
        credit_set: Option<CreditSeconds>,
        unlocked: bool,
        flag_changes: Vec<(u8, bool)>,
    }

    impl PlatformCallbacks for FakeCallbacks {
        type Error = ();
        fn get_secret_key(&mut self) -> Result<SecretKey, ()> {
            Ok(SecretKey::new([0; 16]))
        }
        fn get_user_facing_id(&mut self) -> Result<UserFacingId, ()> {
            Ok(0)
        }
        fn payg_state_get_current(&mut self) -> Result<PaygState, ()> {
            Ok(PaygState::Enabled)
        }
        fn payg_credit_add(&mut self, _seconds: CreditSeconds) -> Result<(), ()> {
            Ok(())
        }
        fn payg_credit_set(&mut self, seconds: CreditSeconds) -> Result<(), ()> {
            self.credit_set = Some(seconds);
            Ok(())
        }
        fn payg_credit_unlock(&mut self) -> Result<(), ()> {
            self.unlocked = true;
            Ok(())
        }
        fn payg_state_wipe(&mut self, _target: u8) -> Result<(), ()> {
            Ok(())
        }
        fn feedback_start(&mut self, _feedback: Feedback) -> Result<(), ()> {
            Ok(())
        }
        fn request_processing(&mut self, _delay_seconds: u32) -> Result<(), ()> {
            Ok(())
        }
        fn passthrough_keycode(&mut self, _body: &[u8]) -> Result<bool, ()> {
            Ok(true)
        }
        fn notify_custom_flag_changed(&mut self, flag: u8, value: bool) -> Result<(), ()> {
            self.flag_changes.push((flag, value));
            Ok(())
        }
    }

    #[test]
    fn set_credit_masks_below_and_clears_restricted_flag() {
        let mut window = ReplayWindow::load(MemoryNvBackend::new());
        let mut callbacks = FakeCallbacks { credit_set: None, unlocked: false, flag_changes: vec![] };

        let message = ExtendedMessage { full_message_id: 7, type_code: 0, increment_id: 10 };
        let feedback = apply(&message, &mut window, &mut callbacks).unwrap();

        assert_eq!(feedback, Feedback::MessageApplied);
        assert_eq!(callbacks.credit_set, Some(u32::from(small_set_credit_days(10)) * SECONDS_IN_DAY));
        assert_eq!(callbacks.flag_changes, vec![(CUSTOM_FLAG_RESTRICTED, false)]);
        for id in 0..=7 {
            assert!(window.is_set(id));
        }
    }

    #[test]
    fn unlock_sentinel_unlocks_instead_of_setting_credit() {
        let mut window = ReplayWindow::load(MemoryNvBackend::new());
        let mut callbacks = FakeCallbacks { credit_set: None, unlocked: false, flag_changes: vec![] };

        let message = ExtendedMessage { full_message_id: 3, type_code: 0, increment_id: 255 };
        apply(&message, &mut window, &mut callbacks).unwrap();

        assert!(callbacks.unlocked);
        assert_eq!(callbacks.credit_set, None);
    }
}
