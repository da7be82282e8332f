//! Applies a verified [`FullMessage`]. Grounded on
//! `nexus_keycode_pro_full_apply_factory` and the full-protocol activation
//! apply switch in `nexus_keycode_pro.c`.

use nexus_protocol::full::{
    Body, FullMessage, TYPE_ADD_CREDIT, TYPE_DEMO_CODE, TYPE_FACTORY_ALLOW_TEST,
    TYPE_FACTORY_DEVICE_ID_DISPLAY, TYPE_FACTORY_NOMAC_DEVICE_ID_CONFIRMATION, TYPE_FACTORY_QC_TEST,
    TYPE_PASSTHROUGH_COMMAND, TYPE_SET_CREDIT, TYPE_WIPE_STATE, UNLOCK_INCREMENT_HOURS,
};
use nexus_protocol::ReplayWindowQuery;
use nexus_storage::NvBackend;
use nexus_types::PaygState;

use crate::apply::{WipeTarget, QC_SHORT_TEST_MESSAGE_SECONDS, SECONDS_IN_HOUR, UNIVERSAL_SHORT_TEST_SECONDS};
use crate::callbacks::PlatformCallbacks;
use crate::config::Config;
use crate::error::ApplyError;
use crate::feedback::Feedback;
use crate::qc::QcCounters;
use crate::replay_window::ReplayWindow;

/// Seconds conveyed by a `DEMO_CODE` body, which carries minutes rather than
/// hours.
const SECONDS_IN_MINUTE: u32 = 60;

/// Applies `message` against `window`/`qc`, invoking `callbacks` for every
/// credit or state effect, and returns the feedback the platform should
/// surface.
pub fn apply<B: NvBackend, C: PlatformCallbacks>(
    message: &FullMessage,
    window: &mut ReplayWindow<B>,
    qc: &mut QcCounters<B>,
    config: &Config,
    callbacks: &mut C,
) -> Result<Feedback, ApplyError> {
    if message.is_activation() {
        return apply_activation(message, window, qc, callbacks);
    }

    match message.type_code {
        TYPE_FACTORY_ALLOW_TEST => apply_allow_test(callbacks),
        TYPE_FACTORY_QC_TEST => apply_qc_test(message, qc, config, callbacks),
        TYPE_FACTORY_DEVICE_ID_DISPLAY => Ok(Feedback::DisplaySerialId),
        TYPE_FACTORY_NOMAC_DEVICE_ID_CONFIRMATION => apply_device_id_confirmation(message, callbacks),
        _ => Err(ApplyError::PassthroughRejected),
    }
}

/// Hands a passthrough body (already stripped of the leading type digit by
/// the codec) to the platform's own handler. Not dispatched through
/// [`apply`]; called directly once `parse_factory_or_passthrough` returns a
/// `Passthrough` variant, since that path carries no [`FullMessage`] at all.
pub fn apply_passthrough<C: PlatformCallbacks>(body: &[u8], callbacks: &mut C) -> Result<Feedback, ApplyError> {
    let accepted = callbacks.passthrough_keycode(body).map_err(|_| ApplyError::Callback)?;
    if accepted {
        Ok(Feedback::MessageApplied)
    } else {
        Err(ApplyError::PassthroughRejected)
    }
}

fn apply_activation<B: NvBackend, C: PlatformCallbacks>(
    message: &FullMessage,
    window: &mut ReplayWindow<B>,
    qc: &mut QcCounters<B>,
    callbacks: &mut C,
) -> Result<Feedback, ApplyError> {
    // DEMO_CODE is intentionally reusable: it never consults or marks the
    // replay window, so the same frame may be applied repeatedly.
    if message.type_code == TYPE_DEMO_CODE {
        return apply_demo_code(message, callbacks);
    }

    if window.is_set(message.full_message_id) {
        return Ok(Feedback::MessageValid);
    }

    match message.type_code {
        TYPE_ADD_CREDIT => apply_add_credit(message, window, callbacks),
        TYPE_SET_CREDIT => apply_set_credit(message, window, callbacks),
        TYPE_WIPE_STATE => apply_wipe_state(message, window, qc, callbacks),
        _ => Err(ApplyError::PassthroughRejected),
    }
}

fn hours_of(message: &FullMessage) -> u32 {
    match message.body {
        Body::Hours(hours) => hours,
        _ => 0,
    }
}

fn apply_add_credit<B: NvBackend, C: PlatformCallbacks>(
    message: &FullMessage,
    window: &mut ReplayWindow<B>,
    callbacks: &mut C,
) -> Result<Feedback, ApplyError> {
    window.set(message.full_message_id)?;
    let current = callbacks.payg_state_get_current().map_err(|_| ApplyError::Callback)?;
    if current == PaygState::Unlocked {
        return Ok(Feedback::MessageValid);
    }

    let hours = hours_of(message);
    if hours == UNLOCK_INCREMENT_HOURS {
        callbacks.payg_credit_unlock().map_err(|_| ApplyError::Callback)?;
    } else {
        callbacks
            .payg_credit_add(hours * SECONDS_IN_HOUR)
            .map_err(|_| ApplyError::Callback)?;
    }
    Ok(Feedback::MessageApplied)
}

fn apply_set_credit<B: NvBackend, C: PlatformCallbacks>(
    message: &FullMessage,
    window: &mut ReplayWindow<B>,
    callbacks: &mut C,
) -> Result<Feedback, ApplyError> {
    window.mask_below(message.full_message_id + 1)?;

    let hours = hours_of(message);
    if hours == UNLOCK_INCREMENT_HOURS {
        callbacks.payg_credit_unlock().map_err(|_| ApplyError::Callback)?;
    } else {
        callbacks
            .payg_credit_set(hours * SECONDS_IN_HOUR)
            .map_err(|_| ApplyError::Callback)?;
    }
    window.set(message.full_message_id)?;
    Ok(Feedback::MessageApplied)
}

fn apply_demo_code<C: PlatformCallbacks>(message: &FullMessage, callbacks: &mut C) -> Result<Feedback, ApplyError> {
    let current = callbacks.payg_state_get_current().map_err(|_| ApplyError::Callback)?;
    if current != PaygState::Unlocked {
        let minutes = hours_of(message);
        callbacks
            .payg_credit_add(minutes * SECONDS_IN_MINUTE)
            .map_err(|_| ApplyError::Callback)?;
    }
    Ok(Feedback::MessageApplied)
}

fn apply_wipe_state<B: NvBackend, C: PlatformCallbacks>(
    message: &FullMessage,
    window: &mut ReplayWindow<B>,
    qc: &mut QcCounters<B>,
    callbacks: &mut C,
) -> Result<Feedback, ApplyError> {
    let wire_target = match message.body {
        Body::WipeTarget(target) => target,
        _ => return Err(ApplyError::PassthroughRejected),
    };
    window.mask_below(message.full_message_id + 1)?;

    let target = WipeTarget::from_wire(wire_target).ok_or(ApplyError::PassthroughRejected)?;
    if matches!(target, WipeTarget::CreditAndMask | WipeTarget::MaskOnly) {
        window.wipe()?;
        qc.reset()?;
    }
    if matches!(target, WipeTarget::CreditAndMask | WipeTarget::Credit) {
        callbacks.payg_credit_set(0).map_err(|_| ApplyError::Callback)?;
    }
    window.set(message.full_message_id)?;
    Ok(Feedback::MessageApplied)
}

fn apply_allow_test<C: PlatformCallbacks>(callbacks: &mut C) -> Result<Feedback, ApplyError> {
    let current = callbacks.payg_state_get_current().map_err(|_| ApplyError::Callback)?;
    if current != PaygState::Disabled {
        return Ok(Feedback::MessageValid);
    }
    callbacks
        .payg_credit_add(UNIVERSAL_SHORT_TEST_SECONDS)
        .map_err(|_| ApplyError::Callback)?;
    Ok(Feedback::MessageApplied)
}

/// Applies `FACTORY_QC_TEST`, per `nexus_keycode_pro_can_unit_accept_qc_code`:
/// rejected outright once unlocked; a non-long code is only honored while
/// disabled; long and short codes each draw from their own lifetime ceiling
/// and never stack with one another.
fn apply_qc_test<B: NvBackend, C: PlatformCallbacks>(
    message: &FullMessage,
    qc: &mut QcCounters<B>,
    config: &Config,
    callbacks: &mut C,
) -> Result<Feedback, ApplyError> {
    let minutes = match message.body {
        Body::QcMinutes(minutes) => minutes,
        _ => return Err(ApplyError::PassthroughRejected),
    };
    let seconds = u32::from(minutes) * SECONDS_IN_MINUTE;
    let is_long = seconds > QC_SHORT_TEST_MESSAGE_SECONDS;

    let current = callbacks.payg_state_get_current().map_err(|_| ApplyError::Callback)?;
    if current == PaygState::Unlocked {
        return Ok(Feedback::MessageValid);
    }
    if !is_long && current != PaygState::Disabled {
        return Ok(Feedback::MessageValid);
    }

    let allowed = if is_long {
        qc.long_count() < config.factory_qc_long_lifetime()
    } else {
        qc.short_count() < config.factory_qc_short_lifetime()
    };
    if !allowed {
        return Ok(Feedback::MessageValid);
    }

    callbacks.payg_credit_add(seconds).map_err(|_| ApplyError::Callback)?;
    if is_long {
        qc.increment_long(config.factory_qc_long_lifetime())?;
    } else {
        qc.increment_short(config.factory_qc_short_lifetime())?;
    }
    Ok(Feedback::MessageApplied)
}

fn apply_device_id_confirmation<C: PlatformCallbacks>(
    message: &FullMessage,
    callbacks: &mut C,
) -> Result<Feedback, ApplyError> {
    let claimed = match message.body {
        Body::DeviceId(id) => id,
        _ => return Err(ApplyError::PassthroughRejected),
    };
    let actual = callbacks.get_user_facing_id().map_err(|_| ApplyError::Callback)?;
    if claimed == actual {
        Ok(Feedback::MessageApplied)
    } else {
        Ok(Feedback::MessageValid)
    }
}
