/// Read-only view of a replay window, as needed to infer a full message id
/// from its truncated wire representation and to check whether a candidate
/// id has already been applied.
///
/// The codecs in this crate never own replay-window storage — `nexus-keycode`
/// owns the concrete window (backed by NV) and implements this trait over it,
/// so inference stays a pure function of `(truncated id, window state)`.
pub trait ReplayWindowQuery {
    /// The current window center (the highest applied message id, or the
    /// provisioning default before any message has been applied).
    fn center(&self) -> u32;

    /// Number of ids below `center()` still covered by the window.
    fn before(&self) -> u8;

    /// Number of ids above `center()` a codec may still infer without first
    /// observing an intervening message that shifts the window.
    fn after(&self) -> u8;

    /// Whether `id` has already been recorded as applied.
    ///
    /// Must return `false` for any `id` outside `[center - before, center]`
    /// (ids above center are never "already set" until the window shifts).
    fn is_set(&self, id: u32) -> bool;
}

/// Scans `[window.center() - window.before(), window.center() + window.after()]`
/// for the first id whose value, modulo `2^truncated_bits`, equals
/// `truncated_id`. Mirrors `nexus_keycode_pro_infer_full_message_id`.
pub fn infer_full_id<W: ReplayWindowQuery>(
    window: &W,
    truncated_id: u32,
    truncated_bits: u32,
) -> Option<u32> {
    let mask = (1u32 << truncated_bits) - 1;
    let center = window.center();
    let before = u32::from(window.before());
    let after = u32::from(window.after());

    let low = center.saturating_sub(before);
    let high = center.saturating_add(after);

    let mut candidate = low;
    while candidate <= high {
        if candidate & mask == truncated_id & mask {
            return Some(candidate);
        }
        candidate += 1;
    }
    None
}
