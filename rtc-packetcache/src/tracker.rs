//! Loss and expected-packet bookkeeping for reception reports.

use crate::seqno::{is_behind, seqno_invalid};
use log::debug;

/// Snapshot of the reception statistics returned by
/// [`PacketCache::stats`](crate::PacketCache::stats).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Packets expected since the last reset.
    pub expected: u32,
    /// Packets lost since the last reset, net of late arrivals.
    pub lost: u32,
    /// Cumulative packets lost, including the current period.
    pub total_lost: u32,
    /// Highest sequence number received, extended with the wrap cycle count.
    pub extended_seqno: u32,
}

impl CacheStats {
    /// Fraction of packets lost since the last reset, as the 8-bit fixed
    /// point value carried in a reception report (RFC 3550 6.4.1).
    pub fn fraction_lost(&self) -> u8 {
        if self.expected == 0 {
            return 0;
        }
        let fraction = (self.lost as u64 * 256) / self.expected as u64;
        fraction.min(u8::MAX as u64) as u8
    }

    /// Cumulative loss clamped to the 24-bit reception report field.
    pub fn cumulative_lost_24(&self) -> u32 {
        self.total_lost.min(0xFFFFFF)
    }
}

/// Tracks the highest sequence number seen, its wrap cycle, and the running
/// expected/lost counters.
#[derive(Debug, Default)]
pub(crate) struct SequenceTracker {
    last: u16,
    last_valid: bool,
    cycle: u16,
    expected: u32,
    lost: u32,
    total_lost: u32,
}

impl SequenceTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Accounts for the arrival of `seqno`.
    ///
    /// Forward gaps are tentatively counted as lost; a late arrival within
    /// the reorder window retracts one such loss.
    pub(crate) fn update(&mut self, seqno: u16) {
        if !self.last_valid || seqno_invalid(seqno, self.last) {
            if self.last_valid {
                debug!(
                    "sequence discontinuity: {} -> {}, re-anchoring",
                    self.last, seqno
                );
            }
            self.last = seqno;
            self.last_valid = true;
            self.expected = self.expected.wrapping_add(1);
            return;
        }

        if is_behind(self.last, seqno) {
            let gap = seqno.wrapping_sub(self.last) as u32;
            self.expected = self.expected.wrapping_add(gap);
            self.lost = self.lost.wrapping_add(gap - 1);
            if seqno < self.last {
                self.cycle = self.cycle.wrapping_add(1);
            }
            self.last = seqno;
        } else if self.lost > 0 {
            self.lost -= 1;
        }
    }

    pub(crate) fn expect(&mut self, n: u32) {
        self.expected = self.expected.wrapping_add(n);
    }

    pub(crate) fn extended_seqno(&self) -> u32 {
        (self.cycle as u32) << 16 | self.last as u32
    }

    /// Returns the current statistics, folding `lost` into the cumulative
    /// total and clearing the period counters if `reset` is set.
    pub(crate) fn stats(&mut self, reset: bool) -> CacheStats {
        let stats = CacheStats {
            expected: self.expected,
            lost: self.lost,
            total_lost: self.total_lost.wrapping_add(self.lost),
            extended_seqno: self.extended_seqno(),
        };

        if reset {
            self.total_lost = self.total_lost.wrapping_add(self.lost);
            self.lost = 0;
            self.expected = 0;
        }

        stats
    }
}
