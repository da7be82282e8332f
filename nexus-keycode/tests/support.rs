//! Shared test double for the integration tests in this directory.
//! Has no `#[test]` functions of its own; pulled in via `mod support;`.

use nexus_crypto::{compute_pseudorandom_bytes, Bitstream};
use nexus_keycode::{Feedback, PlatformCallbacks};
use nexus_types::{CheckValue, CreditSeconds, PaygState, SecretKey, UserFacingId};

pub const ALPHABET: [u8; 4] = *b"1234";

pub struct ScriptedCallbacks {
    pub secret: SecretKey,
    pub user_facing_id: UserFacingId,
    pub state: PaygState,
    pub credit_added: Vec<CreditSeconds>,
    pub credit_set: Vec<CreditSeconds>,
    pub unlocked: bool,
    pub feedback_log: Vec<Feedback>,
    pub processing_requests: Vec<u32>,
}

impl ScriptedCallbacks {
    pub fn new(secret: SecretKey, state: PaygState) -> Self {
        Self {
            secret,
            user_facing_id: 40_302_010,
            state,
            credit_added: vec![],
            credit_set: vec![],
            unlocked: false,
            feedback_log: vec![],
            processing_requests: vec![],
        }
    }

    pub fn total_credit_added(&self) -> u32 {
        self.credit_added.iter().sum()
    }
}

impl PlatformCallbacks for ScriptedCallbacks {
    type Error = ();

    fn get_secret_key(&mut self) -> Result<SecretKey, ()> {
        Ok(self.secret)
    }

    fn get_user_facing_id(&mut self) -> Result<UserFacingId, ()> {
        Ok(self.user_facing_id)
    }

    fn payg_state_get_current(&mut self) -> Result<PaygState, ()> {
        Ok(self.state)
    }

    fn payg_credit_add(&mut self, seconds: CreditSeconds) -> Result<(), ()> {
        self.credit_added.push(seconds);
        Ok(())
    }

    fn payg_credit_set(&mut self, seconds: CreditSeconds) -> Result<(), ()> {
        self.credit_set.push(seconds);
        Ok(())
    }

    fn payg_credit_unlock(&mut self) -> Result<(), ()> {
        self.unlocked = true;
        self.state = PaygState::Unlocked;
        Ok(())
    }

    fn payg_state_wipe(&mut self, _target: u8) -> Result<(), ()> {
        Ok(())
    }

    fn feedback_start(&mut self, feedback: Feedback) -> Result<(), ()> {
        self.feedback_log.push(feedback);
        Ok(())
    }

    fn request_processing(&mut self, delay_seconds: u32) -> Result<(), ()> {
        self.processing_requests.push(delay_seconds);
        Ok(())
    }

    fn passthrough_keycode(&mut self, _body: &[u8]) -> Result<bool, ()> {
        Ok(true)
    }
}

/// Encodes a small-protocol activation/maintenance frame the same way the
/// product firmware would, for tests to feed into `Core`.
pub fn encode_small(
    full_id: u32,
    type_code: u8,
    body: u8,
    key: &SecretKey,
) -> [u8; nexus_protocol::small::FRAME_SYMBOLS] {
    use nexus_protocol::small::{compute_check, SmallMessage, FRAME_SYMBOLS};

    let message = SmallMessage { full_message_id: full_id, type_code, body, check: CheckValue::new(0) };
    let check = compute_check(&message, key);
    let check_12 = check.upper_12_bits();

    let mut prng_bytes = [0u8; 4];
    compute_pseudorandom_bytes(&SecretKey::FIXED_00, &check_12.to_be_bytes(), &mut prng_bytes);
    let mut prng_reader = Bitstream::new(&mut prng_bytes, 32, 32);

    let mut message_bytes = [0u8; 4];
    {
        let mut writer = Bitstream::new(&mut message_bytes, 32, 0);
        let truncated_id = (full_id & 0x3F) as u8 ^ prng_reader.pull_u8(6);
        writer.push_u8(truncated_id, 6);
        writer.push_u8(type_code ^ prng_reader.pull_u8(2), 2);
        writer.push_u8(body ^ prng_reader.pull_u8(8), 8);
        writer.push_u8((check_12 >> 8) as u8, 4);
        writer.push_u8(check_12 as u8, 8);
    }

    let mut reader = Bitstream::new(&mut message_bytes, 32, 28);
    let mut symbols = [0u8; FRAME_SYMBOLS];
    for symbol in symbols.iter_mut() {
        let value = reader.pull_u8(2);
        *symbol = ALPHABET[value as usize];
    }
    symbols
}

/// Encodes an extended-small 13-symbol frame carrying a
/// `SET_CREDIT_AND_WIPE_FLAG` payload, mirroring
/// `nexus_protocol::extended`'s own test encoder.
pub fn encode_extended(
    full_id: u32,
    increment_id: u8,
    key: &SecretKey,
) -> [u8; nexus_protocol::extended::FRAME_SYMBOLS] {
    use nexus_protocol::extended::TYPE_SET_CREDIT_AND_WIPE_FLAG;

    let truncated_id = (full_id as u8) & 0x3;
    let mut buf = [0u8; 7];
    buf[0..4].copy_from_slice(&full_id.to_le_bytes());
    buf[4] = TYPE_SET_CREDIT_AND_WIPE_FLAG;
    buf[5] = increment_id;
    buf[6] = truncated_id;
    let mac = nexus_crypto::compute(key, &buf).upper_12_bits();

    let mut payload = [0u8; 4];
    {
        let mut writer = Bitstream::new(&mut payload, 32, 0);
        writer.push_u8(TYPE_SET_CREDIT_AND_WIPE_FLAG, 3);
        writer.push_u8(truncated_id, 2);
        writer.push_u8(increment_id, 8);
        writer.push_u8((mac >> 8) as u8, 4);
        writer.push_u8(mac as u8, 8);
    }

    let mut reader = Bitstream::new(&mut payload, 32, 26);
    let mut symbols = [0u8; nexus_protocol::extended::FRAME_SYMBOLS];
    for symbol in symbols.iter_mut() {
        let value = reader.pull_u8(2);
        *symbol = ALPHABET[value as usize];
    }
    symbols
}

/// Encodes a full-protocol 14-digit activation frame (without the
/// surrounding `*`/`#`), mirroring `nexus_keycode_pro_full_compute_check`'s
/// de-interleaving in reverse.
pub fn encode_full_activation(
    full_id: u32,
    type_code: u8,
    body: nexus_protocol::full::Body,
    key: &SecretKey,
) -> [u8; nexus_protocol::full::ACTIVATION_FRAME_DIGITS] {
    use nexus_protocol::full::{compute_check, Body, FullMessage, ACTIVATION_BODY_DIGITS, ACTIVATION_FRAME_DIGITS};

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
        _ => unreachable!("only activation bodies are encoded by this helper"),
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
