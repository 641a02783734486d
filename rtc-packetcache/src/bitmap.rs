//! Sliding 32-bit window of arrived sequence numbers.

use crate::nack::NackPair;
use crate::seqno::{is_behind, seqno_invalid};
use log::{debug, trace};

/// Number of sequence numbers covered by the window.
const WINDOW_BITS: u16 = 32;

/// Number of sequence numbers drained by one [`ArrivalBitmap::drain`]: one
/// packet id plus the 16 bits of a generic NACK mask.
pub const DRAIN_BITS: u16 = 17;

const DRAIN_MASK: u32 = (1 << DRAIN_BITS) - 1;

/// Result of draining the front of the arrival window.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BitmapDrain {
    /// Whether any of the drained sequence numbers was missing.
    pub has_loss: bool,
    /// First missing sequence number, or the window start if nothing was
    /// missing.
    pub seqno: u16,
    /// Further missing sequence numbers relative to `seqno`.
    pub bitmap: u16,
}

impl BitmapDrain {
    /// Converts the drain into a generic NACK entry if anything was missing.
    pub fn nack_pair(&self) -> Option<NackPair> {
        self.has_loss.then_some(NackPair::new(self.seqno, self.bitmap))
    }
}

/// Bit `i` of `bitmap` is set iff sequence number `first + i` has arrived.
#[derive(Debug, Default)]
pub(crate) struct ArrivalBitmap {
    first: u16,
    bitmap: u32,
}

impl ArrivalBitmap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn first(&self) -> u16 {
        self.first
    }

    /// Marks `seqno` as arrived, sliding the window forward if needed.
    pub(crate) fn set(&mut self, seqno: u16) {
        if self.bitmap == 0 || seqno_invalid(seqno, self.first) {
            if self.bitmap != 0 {
                debug!("arrival window reset: first {} -> {}", self.first, seqno);
            }
            self.first = seqno;
            self.bitmap = 1;
            return;
        }

        if is_behind(seqno, self.first) {
            // predates the window
            return;
        }

        let offset = seqno.wrapping_sub(self.first);
        if offset < WINDOW_BITS {
            self.bitmap |= 1 << offset;
            return;
        }

        let shift = offset - (WINDOW_BITS - 1);
        trace!("arrival window slide by {shift} to seqno {seqno}");
        self.bitmap = self.bitmap.checked_shr(shift as u32).unwrap_or(0);
        self.first = self.first.wrapping_add(shift);
        self.bitmap |= 1 << (WINDOW_BITS - 1);
    }

    /// Shifts [`DRAIN_BITS`] sequence numbers out of the front of the window,
    /// reporting the first missing one and a mask of the following missing
    /// ones.
    ///
    /// The window always advances, whether or not anything was missing.
    pub(crate) fn drain(&mut self) -> BitmapDrain {
        let first = self.first;
        let missing = !self.bitmap & DRAIN_MASK;
        self.bitmap >>= DRAIN_BITS;
        self.first = self.first.wrapping_add(DRAIN_BITS);

        if missing == 0 {
            return BitmapDrain {
                has_loss: false,
                seqno: first,
                bitmap: 0,
            };
        }

        let zeros = missing.trailing_zeros();
        BitmapDrain {
            has_loss: true,
            seqno: first.wrapping_add(zeros as u16),
            bitmap: (missing >> (zeros + 1)) as u16,
        }
    }
}
