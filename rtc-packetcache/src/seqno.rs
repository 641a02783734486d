//! 16-bit wrapping sequence number arithmetic.

/// Half of u16 max value, used for sequence number wraparound detection.
const UINT16_SIZE_HALF: u16 = 1 << 15;

/// Largest backward distance still accepted as reordering rather than a
/// stream discontinuity.
pub const MAX_REORDER: u16 = 256;

/// Returns `true` if `a` lies behind `b` within half a cycle.
#[inline]
pub(crate) fn is_behind(a: u16, b: u16) -> bool {
    a.wrapping_sub(b) & UINT16_SIZE_HALF != 0
}

/// Decides whether `seqno` is too far in the past, relative to `reference`,
/// to be trusted.
///
/// Any forward distance (up to half a cycle) is accepted. A backward
/// distance is accepted as ordinary reordering up to [`MAX_REORDER`]; beyond
/// that the bit pattern is indistinguishable from a huge forward jump, so
/// the arrival is treated as a discontinuity.
pub fn seqno_invalid(seqno: u16, reference: u16) -> bool {
    if !is_behind(seqno, reference) {
        return false;
    }

    reference.wrapping_sub(seqno) > MAX_REORDER
}
