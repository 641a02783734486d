//! Generic NACK entries (RFC 4585 section 6.2.1).

use std::fmt;

/// One generic NACK feedback control information entry: a packet id and a
/// bitmask of following lost packets.
///
/// Bit `i` of `lost_packets` being set means that sequence number
/// `packet_id + i + 1` is also missing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NackPair {
    /// First missing sequence number.
    pub packet_id: u16,
    /// Bitmask of following lost packets.
    pub lost_packets: u16,
}

impl NackPair {
    pub fn new(packet_id: u16, lost_packets: u16) -> Self {
        Self {
            packet_id,
            lost_packets,
        }
    }

    /// Iterates over every sequence number this entry reports as missing, in
    /// order, starting with `packet_id`.
    pub fn range(&self) -> impl Iterator<Item = u16> {
        let NackPair {
            packet_id,
            lost_packets,
        } = *self;
        std::iter::once(packet_id).chain(
            (0..16u16)
                .filter(move |&i| lost_packets & (1 << i) != 0)
                .map(move |i| packet_id.wrapping_add(i + 1)),
        )
    }

    /// Returns the list of sequence numbers this entry reports as missing.
    pub fn packet_list(&self) -> Vec<u16> {
        self.range().collect()
    }
}

impl fmt::Display for NackPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.packet_list())
    }
}
