//! Extended-small codec: a 25-bit passthrough carried by the small
//! protocol's `type_code == 0b10` ("extended") frames. Grounded on
//! `nexus_keycode_pro_extended_small_parse` /
//! `..._infer_windowed_message_id` / `..._apply` in
//! `nexus_keycode_pro_extended.c`.
//!
//! The caller (message assembly) is responsible for recognizing the
//! extended tag and handing this codec the remaining 25 bits; this module
//! never sees the leading tag bit.

use nexus_crypto::{compute, Bitstream};
use nexus_types::SecretKey;

use crate::error::CodecError;
use crate::window::ReplayWindowQuery;

/// Only extended type currently defined.
pub const TYPE_SET_CREDIT_AND_WIPE_FLAG: u8 = 0;

/// Wire symbols needed to carry the 25-bit extended payload: 13 symbols at
/// 2 bits apiece (26 bits) leaves a single unused trailing bit, the same way
/// the small protocol's 14 symbols leave none. Framed with the same
/// start-key/alphabet conventions as the small protocol, just a shorter
/// entry.
pub const FRAME_SYMBOLS: usize = 13;

/// Maps each wire symbol to its 2-bit value using `alphabet`, mirroring
/// `small::symbol_value`.
fn symbol_value(alphabet: &[u8; 4], symbol: u8) -> Option<u8> {
    alphabet.iter().position(|&s| s == symbol).map(|idx| idx as u8)
}

/// Decodes `symbols` (exactly [`FRAME_SYMBOLS`] wire characters) into the
/// 4-byte payload [`parse`] expects, MSB-first, one symbol per 2 bits.
pub fn decode_symbols(symbols: &[u8], alphabet: &[u8; 4]) -> Result<[u8; 4], CodecError> {
    if symbols.len() != FRAME_SYMBOLS {
        return Err(CodecError::WrongLength);
    }
    let mut payload = [0u8; 4];
    let mut writer = Bitstream::new(&mut payload, 32, 0);
    for &symbol in symbols {
        let value = symbol_value(alphabet, symbol).ok_or(CodecError::SymbolNotInAlphabet)?;
        writer.push_u8(value, 2);
    }
    Ok(payload)
}

/// A decoded, not-yet-id-inferred extended-small message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedMessage {
    pub full_message_id: u32,
    pub type_code: u8,
    pub increment_id: u8,
}

/// Parses the 25-bit payload (`type(3) | trunc_id(2) | increment_id(8) |
/// mac(12)`) in `payload[0..25 bits]`, inferring the full message id by
/// brute-forcing candidates in the replay window: the first unused id whose
/// low 2 bits match `trunc_id` and whose recomputed MAC matches wins.
pub fn parse<W: ReplayWindowQuery>(
    payload: &mut [u8; 4],
    key: &SecretKey,
    window: &W,
) -> Result<ExtendedMessage, CodecError> {
    let mut reader = Bitstream::new(payload, 32, 25);
    let type_code = reader.pull_u8(3);
    let truncated_id = reader.pull_u8(2);
    let increment_id = reader.pull_u8(8);
    let mac = reader.pull_u16_be(12);

    if type_code != TYPE_SET_CREDIT_AND_WIPE_FLAG {
        return Err(CodecError::UnknownTypeCode);
    }

    let center = window.center();
    let before = u32::from(window.before());
    let start = center.saturating_sub(before);

    let mut candidate = start;
    while candidate <= center {
        if (candidate as u8) & 0x3 == truncated_id && !window.is_set(candidate) {
            let expected = compute_mac(candidate, type_code, increment_id, truncated_id, key);
            if expected == mac {
                return Ok(ExtendedMessage { full_message_id: candidate, type_code, increment_id });
            }
        }
        candidate += 1;
    }
    Err(CodecError::IdNotInferable)
}

/// `SipHash(key, pack(full_id_le, type_code, increment_id,
/// truncated_id))[upper 12 bits]`, per
/// `_nexus_keycode_pro_extended_small_auth_arbitrary_bytes`.
fn compute_mac(full_id: u32, type_code: u8, increment_id: u8, truncated_id: u8, key: &SecretKey) -> u16 {
    let mut buf = [0u8; 7];
    buf[0..4].copy_from_slice(&full_id.to_le_bytes());
    buf[4] = type_code;
    buf[5] = increment_id;
    buf[6] = truncated_id;
    compute(key, &buf).upper_12_bits()
}
