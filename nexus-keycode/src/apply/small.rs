//! Applies a verified [`SmallMessage`]. Grounded on
//! `nexus_keycode_pro_small_apply` in `nexus_keycode_pro.c`.

use nexus_protocol::increment::{small_add_credit_days, small_set_credit_days, SMALL_UNLOCK_INCREMENT};
use nexus_protocol::small::{SmallMessage, SET_LOCK_INCREMENT_ID, SET_UNLOCK_INCREMENT_ID};
use nexus_protocol::ReplayWindowQuery;
use nexus_storage::NvBackend;
use nexus_types::PaygState;

use crate::apply::{WipeTarget, QC_LONG_TEST_MESSAGE_SECONDS, SECONDS_IN_DAY, UNIVERSAL_SHORT_TEST_SECONDS};
use crate::callbacks::PlatformCallbacks;
use crate::config::Config;
use crate::error::ApplyError;
use crate::feedback::Feedback;
use crate::qc::QcCounters;
use crate::replay_window::ReplayWindow;

/// Test function id for the universal 127-second short test.
const ENABLE_SHORT_TEST_FUNCTION_ID: u8 = 0;
/// Test function id for the 1-hour QC test.
const ENABLE_QC_TEST_FUNCTION_ID: u8 = 1;

/// Applies `message` against `window`/`qc`, invoking `callbacks` for every
/// credit or state effect, and returns the feedback the platform should
/// surface.
pub fn apply<B: NvBackend, C: PlatformCallbacks>(
    message: &SmallMessage,
    window: &mut ReplayWindow<B>,
    qc: &mut QcCounters<B>,
    config: &Config,
    callbacks: &mut C,
) -> Result<Feedback, ApplyError> {
    if message.is_activation() {
        return apply_activation(message, window, callbacks);
    }

    let function_id = message.body;
    if function_id > nexus_protocol::small::MAX_TEST_FUNCTION_ID {
        apply_maintenance(function_id & 0x7F, window, qc, callbacks)
    } else {
        apply_test(function_id, window, qc, config, callbacks)
    }
}

fn apply_activation<B: NvBackend, C: PlatformCallbacks>(
    message: &SmallMessage,
    window: &mut ReplayWindow<B>,
    callbacks: &mut C,
) -> Result<Feedback, ApplyError> {
    if window.is_set(message.full_message_id) {
        return Ok(Feedback::MessageValid);
    }

    if message.is_set_credit() {
        window.mask_below(message.full_message_id + 1)?;
        if message.body == SET_UNLOCK_INCREMENT_ID {
            callbacks.payg_credit_unlock().map_err(|_| ApplyError::Callback)?;
        } else if message.body == SET_LOCK_INCREMENT_ID {
            callbacks.payg_credit_set(0).map_err(|_| ApplyError::Callback)?;
        } else {
            let days = small_set_credit_days(message.body);
            callbacks
                .payg_credit_set(u32::from(days) * SECONDS_IN_DAY)
                .map_err(|_| ApplyError::Callback)?;
        }
        window.set(message.full_message_id)?;
        return Ok(Feedback::MessageApplied);
    }

    // ACTIVATION_ADD
    window.set(message.full_message_id)?;
    let current = callbacks.payg_state_get_current().map_err(|_| ApplyError::Callback)?;
    if current == PaygState::Unlocked {
        return Ok(Feedback::MessageValid);
    }

    let days = small_add_credit_days(message.body);
    if days == SMALL_UNLOCK_INCREMENT {
        callbacks.payg_credit_unlock().map_err(|_| ApplyError::Callback)?;
    } else {
        callbacks
            .payg_credit_add(u32::from(days) * SECONDS_IN_DAY)
            .map_err(|_| ApplyError::Callback)?;
    }
    Ok(Feedback::MessageApplied)
}

fn apply_maintenance<B: NvBackend, C: PlatformCallbacks>(
    wire_target: u8,
    window: &mut ReplayWindow<B>,
    qc: &mut QcCounters<B>,
    callbacks: &mut C,
) -> Result<Feedback, ApplyError> {
    let target = WipeTarget::from_wire(wire_target).ok_or(ApplyError::PassthroughRejected)?;

    if matches!(target, WipeTarget::CreditAndMask | WipeTarget::MaskOnly) {
        window.wipe()?;
        qc.reset()?;
    }
    if matches!(target, WipeTarget::CreditAndMask | WipeTarget::Credit) {
        callbacks.payg_credit_set(0).map_err(|_| ApplyError::Callback)?;
    }
    Ok(Feedback::MessageApplied)
}

fn apply_test<B: NvBackend, C: PlatformCallbacks>(
    function_id: u8,
    _window: &mut ReplayWindow<B>,
    qc: &mut QcCounters<B>,
    config: &Config,
    callbacks: &mut C,
) -> Result<Feedback, ApplyError> {
    let current = callbacks.payg_state_get_current().map_err(|_| ApplyError::Callback)?;

    let applied = match function_id {
        ENABLE_SHORT_TEST_FUNCTION_ID if current == PaygState::Disabled => {
            callbacks
                .payg_credit_add(UNIVERSAL_SHORT_TEST_SECONDS)
                .map_err(|_| ApplyError::Callback)?;
            true
        }
        ENABLE_QC_TEST_FUNCTION_ID
            if qc.long_count() < config.factory_qc_long_lifetime() && current != PaygState::Unlocked =>
        {
            callbacks
                .payg_credit_add(QC_LONG_TEST_MESSAGE_SECONDS)
                .map_err(|_| ApplyError::Callback)?;
            qc.increment_long(config.factory_qc_long_lifetime())?;
            true
        }
        _ => false,
    };

    Ok(if applied { Feedback::MessageApplied } else { Feedback::MessageValid })
}
