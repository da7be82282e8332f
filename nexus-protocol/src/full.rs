//! Full protocol codec: decimal digits framed by `'*'`/`'#'`. Grounded on
//! `nexus_keycode_pro_full_parse*` / `..._compute_check` /
//! `..._deinterleave` in `nexus_keycode_pro.c`.

use nexus_crypto::{compute, compute_pseudorandom_bytes, DigitStream};
use nexus_types::SecretKey;

use crate::error::CodecError;
use crate::window::ReplayWindowQuery;

/// Total digits in an activation frame (`type(1) | trunc_id(2) | body(5) |
/// mac(6)`).
pub const ACTIVATION_FRAME_DIGITS: usize = 14;
/// Digits of `type | trunc_id | body` that are de-interleaved (everything
/// but the trailing MAC).
pub const ACTIVATION_BODY_DIGITS: usize = ACTIVATION_FRAME_DIGITS - CHECK_DIGITS;
const CHECK_DIGITS: usize = 6;

pub const TYPE_ADD_CREDIT: u8 = 0;
pub const TYPE_SET_CREDIT: u8 = 1;
pub const TYPE_DEMO_CODE: u8 = 2;
pub const TYPE_WIPE_STATE: u8 = 3;
pub const TYPE_FACTORY_ALLOW_TEST: u8 = 4;
pub const TYPE_FACTORY_QC_TEST: u8 = 5;
pub const TYPE_FACTORY_DEVICE_ID_DISPLAY: u8 = 6;
pub const TYPE_FACTORY_NOMAC_DEVICE_ID_CONFIRMATION: u8 = 7;
pub const TYPE_PASSTHROUGH_COMMAND: u8 = 8;

/// `hours` value meaning "unlock" for ADD_CREDIT/SET_CREDIT.
pub const UNLOCK_INCREMENT_HOURS: u32 = 99_999;

/// Body payload, keyed by `type_code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Body {
    /// ADD_CREDIT / SET_CREDIT / DEMO_CODE: hours (or minutes, for demo).
    Hours(u32),
    /// WIPE_STATE: which state to clear.
    WipeTarget(u8),
    /// FACTORY_QC_TEST: minutes.
    QcMinutes(u8),
    /// FACTORY_NOMAC_DEVICE_ID_CONFIRMATION: the claimed serial.
    DeviceId(u32),
    /// FACTORY_ALLOW_TEST / FACTORY_DEVICE_ID_DISPLAY: no body.
    None,
}

impl Body {
    fn as_u32_le(&self) -> u32 {
        match *self {
            Body::Hours(v) => v,
            Body::WipeTarget(v) => u32::from(v),
            Body::QcMinutes(v) => u32::from(v),
            Body::DeviceId(v) => v,
            Body::None => 0,
        }
    }
}

/// A decoded, not-yet-verified full-protocol message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullMessage {
    pub full_message_id: u32,
    pub type_code: u8,
    pub body: Body,
    pub check: u32,
}

impl FullMessage {
    pub fn is_activation(&self) -> bool {
        self.type_code < TYPE_FACTORY_ALLOW_TEST
    }
}

fn mathmod10(x: i32) -> u8 {
    let mut x = x;
    while x < 0 {
        x += 10;
    }
    (x % 10) as u8
}

/// De-interleaves the `ACTIVATION_BODY_DIGITS` body digits of `digits`
/// (mutated in place), seeded by the already-extracted 6-digit `check`.
fn deinterleave_activation_body(digits: &mut [u8; ACTIVATION_BODY_DIGITS], check: u32) {
    let mut prng_bytes = [0u8; ACTIVATION_BODY_DIGITS];
    compute_pseudorandom_bytes(&SecretKey::FIXED_00, &check.to_be_bytes(), &mut prng_bytes);

    for (digit, &perturbation) in digits.iter_mut().zip(prng_bytes.iter()) {
        let value = i32::from(*digit) - i32::from(perturbation);
        *digit = mathmod10(value);
    }
}

/// Parses a 14-digit activation frame (without the surrounding `*`/`#`).
pub fn parse_activation<W: ReplayWindowQuery>(
    frame: &[u8],
    window: &W,
) -> Result<FullMessage, CodecError> {
    if frame.len() != ACTIVATION_FRAME_DIGITS {
        return Err(CodecError::WrongLength);
    }

    let mut check_digits = DigitStream::new(&frame[ACTIVATION_BODY_DIGITS..]);
    let check = check_digits.pull_u32(CHECK_DIGITS);

    let mut body_digits = [0u8; ACTIVATION_BODY_DIGITS];
    for (dst, &ascii) in body_digits.iter_mut().zip(frame[..ACTIVATION_BODY_DIGITS].iter()) {
        *dst = ascii.wrapping_sub(b'0');
    }
    deinterleave_activation_body(&mut body_digits, check);

    let mut digits_str = [0u8; ACTIVATION_BODY_DIGITS];
    for (dst, &digit) in digits_str.iter_mut().zip(body_digits.iter()) {
        *dst = digit + b'0';
    }
    let mut digits = DigitStream::new(&digits_str);

    let type_code = digits.pull_u8(1);
    let truncated_id = u32::from(digits.pull_u8(2));

    let window_span = u32::from(window.before()) + u32::from(window.after());
    if truncated_id > window_span {
        return Err(CodecError::IdNotInferable);
    }
    let full_message_id =
        infer_full_id_mod_100(window, truncated_id).ok_or(CodecError::IdNotInferable)?;

    let body = match type_code {
        TYPE_ADD_CREDIT | TYPE_DEMO_CODE | TYPE_SET_CREDIT => Body::Hours(digits.pull_u32(5)),
        TYPE_WIPE_STATE => {
            let _reserved = digits.pull_u32(4);
            Body::WipeTarget(digits.pull_u8(1))
        }
        _ => return Err(CodecError::UnknownTypeCode),
    };

    Ok(FullMessage { full_message_id, type_code, body, check })
}

/// Mirrors `nexus_keycode_pro_infer_full_message_id`, but matching on the
/// id's value modulo 100 (the full protocol's 2-digit truncated id) rather
/// than a power-of-two bitmask.
fn infer_full_id_mod_100<W: ReplayWindowQuery>(window: &W, truncated_id: u32) -> Option<u32> {
    let center = window.center();
    let before = u32::from(window.before());
    let after = u32::from(window.after());
    let low = center.saturating_sub(before);
    let high = center.saturating_add(after);

    let mut candidate = low;
    while candidate <= high {
        if candidate % 100 == truncated_id {
            return Some(candidate);
        }
        candidate += 1;
    }
    None
}

/// Parses a factory or passthrough frame: `type(1) | body | mac(6)`, except
/// PASSTHROUGH (`type == 8`) which carries no MAC at this layer. Returns the
/// raw passthrough body (subtype + payload digits) via `passthrough` when
/// applicable, for the caller to hand to an external handler.
pub fn parse_factory_or_passthrough<'a>(
    frame: &'a [u8],
) -> Result<FactoryOrPassthrough<'a>, CodecError> {
    if frame.is_empty() {
        return Err(CodecError::WrongLength);
    }
    let mut digits = DigitStream::new(frame);
    let mut underrun = false;
    let type_code = digits.try_pull_u32(1, &mut underrun) as u8;

    match type_code {
        TYPE_FACTORY_ALLOW_TEST => {
            let check = digits.try_pull_u32(CHECK_DIGITS, &mut underrun);
            finish(digits, underrun, FullMessage {
                full_message_id: 0,
                type_code,
                body: Body::None,
                check,
            })
        }
        TYPE_FACTORY_QC_TEST => {
            let _reserved = digits.try_pull_u32(3, &mut underrun);
            let minutes = digits.try_pull_u32(2, &mut underrun) as u8;
            let check = digits.try_pull_u32(CHECK_DIGITS, &mut underrun);
            finish(digits, underrun, FullMessage {
                full_message_id: 0,
                type_code,
                body: Body::QcMinutes(minutes),
                check,
            })
        }
        TYPE_FACTORY_DEVICE_ID_DISPLAY => {
            let check = digits.try_pull_u32(CHECK_DIGITS, &mut underrun);
            finish(digits, underrun, FullMessage {
                full_message_id: 0,
                type_code,
                body: Body::None,
                check,
            })
        }
        TYPE_FACTORY_NOMAC_DEVICE_ID_CONFIRMATION => {
            let serial_len = frame.len().saturating_sub(1);
            if !(8..=10).contains(&serial_len) {
                return Err(CodecError::WrongLength);
            }
            let device_id = digits.try_pull_u32(serial_len, &mut underrun);
            finish(digits, underrun, FullMessage {
                full_message_id: 0,
                type_code,
                body: Body::DeviceId(device_id),
                check: 0,
            })
        }
        TYPE_PASSTHROUGH_COMMAND => {
            if frame.len() <= 2 || frame.len() == ACTIVATION_FRAME_DIGITS {
                return Err(CodecError::WrongLength);
            }
            Ok(FactoryOrPassthrough::Passthrough(&frame[1..]))
        }
        _ => Err(CodecError::UnknownTypeCode),
    }
}

fn finish(
    digits: DigitStream<'_>,
    underrun: bool,
    message: FullMessage,
) -> Result<FactoryOrPassthrough<'_>, CodecError> {
    if underrun || digits.remaining() != 0 {
        return Err(CodecError::Underrun);
    }
    Ok(FactoryOrPassthrough::Message(message))
}

/// Outcome of [`parse_factory_or_passthrough`].
pub enum FactoryOrPassthrough<'a> {
    /// A MAC-bearing (or unchecked, for device-id confirmation) message.
    Message(FullMessage),
    /// A passthrough body (subtype digit + payload), not owned by this
    /// codec — hand it to the external passthrough handler.
    Passthrough(&'a [u8]),
}

/// Recomputes the expected check value over `message`'s authenticated
/// fields (full id, type code, body), per
/// `nexus_keycode_pro_full_compute_check`.
pub fn compute_check(message: &FullMessage, key: &SecretKey) -> u32 {
    let mut buf = [0u8; 9];
    buf[0..4].copy_from_slice(&message.full_message_id.to_le_bytes());
    buf[4] = message.type_code;
    buf[5..9].copy_from_slice(&message.body.as_u32_le().to_le_bytes());
    compute(key, &buf).mod_1_000_000()
}

/// Verifies `message.check` under `key`. Callers are responsible for
/// picking `key` (secret for activation, fixed-zero for factory) and for
/// skipping verification entirely for `FACTORY_NOMAC_DEVICE_ID_CONFIRMATION`.
pub fn verify(message: &FullMessage, key: &SecretKey) -> Result<(), CodecError> {
    if message.check != compute_check(message, key) {
        return Err(CodecError::MacMismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedWindow {
        center: u32,
        before: u8,
        after: u8,
    }
    impl ReplayWindowQuery for FixedWindow {
        fn center(&self) -> u32 {
            self.center
        }
        fn before(&self) -> u8 {
            self.before
        }
        fn after(&self) -> u8 {
            self.after
        }
        fn is_set(&self, _id: u32) -> bool {
            false
        }
    }

    fn encode_activation(
        full_id: u32,
        type_code: u8,
        body: Body,
        key: &SecretKey,
    ) -> [u8; ACTIVATION_FRAME_DIGITS] {
        let message = FullMessage { full_message_id: full_id, type_code, body, check: 0 };
        let check = compute_check(&message, key);

        let mut digits_str = [0u8; ACTIVATION_BODY_DIGITS];
        let mut pos = 0;
        let mut push = |value: u32, width: usize| {
            let s = format!("{value:0width$}", width = width);
            for (i, b) in s.bytes().enumerate() {
                digits_str[pos + i] = b;
            }
            pos += width;
        };
        push(u32::from(type_code), 1);
        push(full_id % 100, 2);
        match body {
            Body::Hours(hours) => push(hours, 5),
            Body::WipeTarget(target) => {
                push(0, 4);
                push(u32::from(target), 1);
            }
            _ => unreachable!(),
        }

        let mut digit_values = [0u8; ACTIVATION_BODY_DIGITS];
        for (dst, &ascii) in digit_values.iter_mut().zip(digits_str.iter()) {
            *dst = ascii - b'0';
        }
        let mut prng_bytes = [0u8; ACTIVATION_BODY_DIGITS];
        compute_pseudorandom_bytes(&SecretKey::FIXED_00, &check.to_be_bytes(), &mut prng_bytes);
        for (digit, &perturbation) in digit_values.iter_mut().zip(prng_bytes.iter()) {
            *digit = (*digit + perturbation) % 10;
        }

        let mut frame = [0u8; ACTIVATION_FRAME_DIGITS];
        for (dst, &value) in frame[..ACTIVATION_BODY_DIGITS].iter_mut().zip(digit_values.iter()) {
            *dst = value + b'0';
        }
        let check_str = format!("{check:06}");
        for (dst, b) in frame[ACTIVATION_BODY_DIGITS..].iter_mut().zip(check_str.bytes()) {
            *dst = b;
        }
        frame
    }

    #[test]
    fn parse_add_credit_roundtrip() {
        let key = SecretKey::new([0x11; 16]);
        let window = FixedWindow { center: 23, before: 23, after: 8 };
        let frame = encode_activation(20, TYPE_ADD_CREDIT, Body::Hours(48), &key);

        let message = parse_activation(&frame, &window).unwrap();
        assert_eq!(message.full_message_id, 20);
        assert_eq!(message.body, Body::Hours(48));
        verify(&message, &key).unwrap();
    }

    #[test]
    fn parse_wipe_state_roundtrip() {
        let key = SecretKey::new([0x22; 16]);
        let window = FixedWindow { center: 5, before: 23, after: 8 };
        let frame = encode_activation(5, TYPE_WIPE_STATE, Body::WipeTarget(2), &key);

        let message = parse_activation(&frame, &window).unwrap();
        assert_eq!(message.body, Body::WipeTarget(2));
        verify(&message, &key).unwrap();
    }

    #[test]
    fn device_id_confirmation_is_unchecked() {
        let frame = b"712345678";
        match parse_factory_or_passthrough(frame).unwrap() {
            FactoryOrPassthrough::Message(message) => {
                assert_eq!(message.body, Body::DeviceId(12345678));
            }
            _ => panic!("expected a message"),
        }
    }

    #[test]
    fn passthrough_is_not_mac_checked() {
        let frame = b"8199";
        match parse_factory_or_passthrough(frame).unwrap() {
            FactoryOrPassthrough::Passthrough(body) => assert_eq!(body, b"199"),
            _ => panic!("expected passthrough"),
        }
    }

    #[test]
    fn wrong_length_activation_is_rejected() {
        let window = FixedWindow { center: 23, before: 23, after: 8 };
        let frame = [b'0'; ACTIVATION_FRAME_DIGITS - 1];
        assert_eq!(parse_activation(&frame, &window), Err(CodecError::WrongLength));
    }
}
