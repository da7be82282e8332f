//! Piecewise `increment_id -> days` mappings carried by the small-protocol
//! activation body. Pure integer functions, grounded on
//! `nexus_keycode_pro_small_get_add_credit_increment_days` and
//! `..._set_credit_increment_days`.

/// Sentinel returned by [`small_add_credit_days`] for `increment_id == 255`,
/// meaning "unlock" rather than a finite day count.
pub const SMALL_UNLOCK_INCREMENT: u16 = u16::MAX;

/// Days conveyed by an ACTIVATION_ADD `increment_id`, or
/// [`SMALL_UNLOCK_INCREMENT`] if the id means "unlock".
pub fn small_add_credit_days(increment_id: u8) -> u16 {
    if increment_id == 255 {
        SMALL_UNLOCK_INCREMENT
    } else if increment_id < 180 {
        u16::from(increment_id) + 1
    } else {
        (u16::from(increment_id) - 179) * 3 + 180
    }
}

/// Days conveyed by an ACTIVATION_SET `increment_id` for the general
/// (non-unlock, non-disable) case. Callers must special-case `increment_id
/// == 254` (disable) and `255` (unlock) before consulting this table.
pub fn small_set_credit_days(increment_id: u8) -> u16 {
    let id = u16::from(increment_id);
    if id < 90 {
        id + 1
    } else if id < 135 {
        (id - 89) * 2 + 90
    } else if id < 180 {
        (id - 134) * 4 + 180
    } else if id < 225 {
        (id - 179) * 8 + 360
    } else {
        (id - 224) * 16 + 720
    }
}
