//! RTC Packet Cache - retransmission cache and loss tracking for RTP relays.
//!
//! [`PacketCache`] remembers the last N packets of a stream, keyed by their
//! 16-bit RTP sequence number, so that retransmission requests can be
//! answered. It also tracks which sequence numbers arrived, in a form that
//! maps directly onto generic NACK entries (RFC 4585), and keeps the running
//! expected/lost counters needed for RTCP reception reports (RFC 3550).
//!
//! # Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | sequence tracker | Highest sequence number, wrap cycles, expected and lost counters |
//! | arrival bitmap | 32-bit sliding window of arrived sequence numbers, drained 17 at a time |
//! | slot store | Fixed-capacity ring of payloads with validated index lookup and live resize |
//!
//! All three live behind a single mutex inside [`PacketCache`]; every method
//! holds it for its full duration.
//!
//! # Sequence Numbers
//!
//! Sequence numbers wrap at 65536. A packet ahead of the reference by less
//! than half a cycle is new data. A packet behind it by at most
//! [`MAX_REORDER`] is a late arrival; anything further behind is taken as a
//! stream discontinuity and re-anchors the tracking state.
//!
//! # Slot Indices
//!
//! [`PacketCache::store`] returns the ring slot it wrote to. Looking a packet
//! up by slot with [`PacketCache::get_at`] is O(1), and always re-checks the
//! sequence number held in the slot, so an index that has been overwritten
//! or invalidated by a resize degrades to a miss.
//!
//! # Example
//!
//! ```
//! use rtc_packetcache::PacketCache;
//!
//! let cache = PacketCache::new(64).unwrap();
//!
//! let (_, index) = cache.store(1000, b"first");
//! cache.store(1002, b"third");
//!
//! let mut buf = [0u8; rtc_packetcache::BUF_SIZE];
//! let n = cache.get_at(1000, index, &mut buf);
//! assert_eq!(&buf[..n], b"first");
//!
//! let drained = cache.bitmap_get();
//! let nack = drained.nack_pair().unwrap();
//! assert_eq!(nack.packet_id, 1001);
//!
//! let stats = cache.stats(true);
//! assert_eq!(stats.expected, 3);
//! assert_eq!(stats.lost, 1);
//! ```

#![warn(rust_2018_idioms)]

mod bitmap;
mod cache;
mod nack;
mod seqno;
mod slot_store;
mod tracker;

pub use bitmap::{BitmapDrain, DRAIN_BITS};
pub use cache::{DEFAULT_CAPACITY, MAX_CAPACITY, PacketCache, PacketCacheBuilder};
pub use nack::NackPair;
pub use seqno::{MAX_REORDER, seqno_invalid};
pub use tracker::CacheStats;

/// Size of a cached payload buffer: the link MTU.
pub const BUF_SIZE: usize = 1500;
