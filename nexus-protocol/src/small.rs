//! Small ("reduced-alphabet") protocol codec: 14 symbols drawn from a
//! 4-character alphabet, 28 bits total. Grounded on
//! `nexus_keycode_pro_small_parse` / `..._apply` in `nexus_keycode_pro.c`.

use nexus_crypto::{compute, compute_pseudorandom_bytes, Bitstream};
use nexus_types::{CheckValue, SecretKey};

use crate::error::CodecError;
use crate::window::{infer_full_id, ReplayWindowQuery};

/// Number of symbols in a small-protocol frame.
pub const FRAME_SYMBOLS: usize = 14;

/// `function_id` at or below this value identifies a test/QC code,
/// authenticated with the fixed all-`0xFF` key rather than the device
/// secret.
pub const MAX_TEST_FUNCTION_ID: u8 = 127;

const MAINTENANCE_OR_TEST_TYPE: u8 = 0b11;
const ACTIVATION_ADD_TYPE: u8 = 0b00;
const ACTIVATION_SET_TYPE: u8 = 0b01;

/// ACTIVATION_SET `increment_id` meaning "unlock".
pub const SET_UNLOCK_INCREMENT_ID: u8 = 255;
/// ACTIVATION_SET `increment_id` meaning "disable" (set credit to zero).
pub const SET_LOCK_INCREMENT_ID: u8 = 254;

/// A decoded, not-yet-verified small-protocol message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmallMessage {
    pub full_message_id: u32,
    pub type_code: u8,
    pub body: u8,
    pub check: CheckValue,
}

impl SmallMessage {
    /// `true` for ACTIVATION_ADD / ACTIVATION_SET messages.
    pub fn is_activation(&self) -> bool {
        self.type_code < MAINTENANCE_OR_TEST_TYPE
    }

    pub fn is_add_credit(&self) -> bool {
        self.type_code == ACTIVATION_ADD_TYPE
    }

    pub fn is_set_credit(&self) -> bool {
        self.type_code == ACTIVATION_SET_TYPE
    }

    /// `true` for a maintenance/test message whose `body` is a
    /// `function_id` at or below [`MAX_TEST_FUNCTION_ID`].
    pub fn is_test_function(&self) -> bool {
        self.type_code == MAINTENANCE_OR_TEST_TYPE && self.body <= MAX_TEST_FUNCTION_ID
    }
}

/// Maps each wire symbol to its 2-bit value using `alphabet`, e.g. `b"1234"`.
fn symbol_value(alphabet: &[u8; 4], symbol: u8) -> Option<u8> {
    alphabet.iter().position(|&s| s == symbol).map(|idx| idx as u8)
}

/// Decodes `symbols` (exactly [`FRAME_SYMBOLS`] wire characters) into a
/// [`SmallMessage`] against `window`, inferring the full message id from the
/// transmitted 6-bit truncated id. Does not verify the MAC — callers must
/// call [`verify`] with the appropriate key afterwards.
pub fn parse<W: ReplayWindowQuery>(
    symbols: &[u8],
    alphabet: &[u8; 4],
    window: &W,
) -> Result<SmallMessage, CodecError> {
    if symbols.len() != FRAME_SYMBOLS {
        return Err(CodecError::WrongLength);
    }

    let mut message_bytes = [0u8; 4];
    {
        let mut writer = Bitstream::new(&mut message_bytes, 32, 0);
        for &symbol in symbols {
            let value = symbol_value(alphabet, symbol).ok_or(CodecError::SymbolNotInAlphabet)?;
            writer.push_u8(value, 2);
        }
    }

    let mut reader = Bitstream::new(&mut message_bytes, 32, 28);
    reader.set_position(16);
    let check = CheckValue::new(u64::from(reader.pull_u16_be(12)));

    let mut prng_bytes = [0u8; 4];
    compute_pseudorandom_bytes(
        &SecretKey::FIXED_00,
        &(check.as_u64() as u16).to_be_bytes(),
        &mut prng_bytes,
    );
    let mut prng_reader = Bitstream::new(&mut prng_bytes, 32, 32);

    reader.set_position(0);
    let truncated_id = u32::from(reader.pull_u8(6) ^ prng_reader.pull_u8(6));
    let type_code = reader.pull_u8(2) ^ prng_reader.pull_u8(2);
    let body = reader.pull_u8(8) ^ prng_reader.pull_u8(8);

    let full_message_id = if type_code < MAINTENANCE_OR_TEST_TYPE {
        infer_full_id(window, truncated_id, 6).ok_or(CodecError::IdNotInferable)?
    } else {
        truncated_id
    };

    Ok(SmallMessage { full_message_id, type_code, body, check })
}

/// Recomputes the expected check value over `message`'s authenticated
/// fields (message id, type code, body) under `key`, per
/// `nexus_keycode_pro_small_compute_check`.
pub fn compute_check(message: &SmallMessage, key: &SecretKey) -> CheckValue {
    let mut buf = [0u8; 6];
    buf[0..4].copy_from_slice(&message.full_message_id.to_le_bytes());
    buf[4] = message.type_code;
    buf[5] = message.body;
    compute(key, &buf)
}

/// Verifies `message.check` against the key appropriate for its type:
/// the fixed all-`0xFF` key for test/QC function ids, the device `secret`
/// otherwise.
pub fn verify(message: &SmallMessage, secret: &SecretKey) -> Result<(), CodecError> {
    let key = if message.is_test_function() { &SecretKey::FIXED_FF } else { secret };
    let expected = compute_check(message, key);
    let expected_check = CheckValue::new(u64::from(expected.upper_12_bits()));
    if message.check.as_u64() != expected_check.as_u64() {
        return Err(CodecError::MacMismatch);
    }
    Ok(())
}
