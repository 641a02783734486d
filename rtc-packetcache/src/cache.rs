//! The packet cache façade.

use crate::bitmap::{ArrivalBitmap, BitmapDrain};
use crate::slot_store::SlotStore;
use crate::tracker::{CacheStats, SequenceTracker};
use log::warn;
use shared::error::{Error, Result};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Largest capacity whose slot indices still fit in 16 bits.
pub const MAX_CAPACITY: usize = 1 << 16;

/// Capacity used by [`PacketCacheBuilder`] when none is set.
pub const DEFAULT_CAPACITY: usize = 512;

/// Builder for [`PacketCache`].
///
/// # Example
///
/// ```
/// use rtc_packetcache::PacketCacheBuilder;
///
/// let cache = PacketCacheBuilder::new().with_capacity(1024).build().unwrap();
/// assert_eq!(cache.capacity(), 1024);
/// ```
#[derive(Debug, Clone)]
pub struct PacketCacheBuilder {
    capacity: usize,
}

impl Default for PacketCacheBuilder {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl PacketCacheBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of packets kept for retransmission.
    ///
    /// Must be between 1 and [`MAX_CAPACITY`] (inclusive).
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Build the cache.
    pub fn build(self) -> Result<PacketCache> {
        PacketCache::new(self.capacity)
    }
}

struct State {
    tracker: SequenceTracker,
    bitmap: ArrivalBitmap,
    slots: SlotStore,
}

/// Cache of recently seen packets, with arrival tracking for NACK
/// generation and loss statistics for reception reports.
///
/// Every method takes the same internal lock for its whole duration, so a
/// `PacketCache` can be shared between a receive path, a feedback path and
/// a retransmission path through an `Arc` without further synchronization.
pub struct PacketCache {
    state: Mutex<State>,
}

impl PacketCache {
    /// Creates a cache holding up to `capacity` packets.
    pub fn new(capacity: usize) -> Result<Self> {
        check_capacity(capacity)?;

        Ok(Self {
            state: Mutex::new(State {
                tracker: SequenceTracker::new(),
                bitmap: ArrivalBitmap::new(),
                slots: SlotStore::new(capacity),
            }),
        })
    }

    // Nothing inside the lock can panic midway through an update.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records the arrival of `seqno` and caches `payload`.
    ///
    /// Returns the arrival window's first sequence number and the slot index
    /// the payload was written to. The index can later be passed to
    /// [`get_at`](Self::get_at).
    pub fn store(&self, seqno: u16, payload: &[u8]) -> (u16, u16) {
        let mut state = self.lock();
        state.tracker.update(seqno);
        state.bitmap.set(seqno);
        let index = state.slots.insert(seqno, payload);
        (state.bitmap.first(), index)
    }

    /// Counts `n` packets as expected without marking any arrival.
    pub fn expect(&self, n: u32) {
        if n == 0 {
            return;
        }
        self.lock().tracker.expect(n);
    }

    /// Copies the cached packet `seqno` into `out`, returning the number of
    /// bytes copied, or 0 if it is not cached.
    pub fn get(&self, seqno: u16, out: &mut [u8]) -> usize {
        self.lock().slots.get(seqno, out)
    }

    /// Like [`get`](Self::get), but reads slot `index` directly. Returns 0 if
    /// the slot no longer holds `seqno`.
    pub fn get_at(&self, seqno: u16, index: u16, out: &mut [u8]) -> usize {
        self.lock().slots.get_at(seqno, index, out)
    }

    /// Copies the most recently stored packet into `out`.
    pub fn get_last(&self, out: &mut [u8]) -> usize {
        self.lock().slots.get_last(out)
    }

    pub fn capacity(&self) -> usize {
        self.lock().slots.capacity()
    }

    /// First sequence number of the arrival window.
    pub fn first(&self) -> u16 {
        self.lock().bitmap.first()
    }

    /// Changes the capacity, preserving cached packets and slot indices
    /// where possible. Capacities outside `1..=MAX_CAPACITY` are ignored.
    pub fn resize(&self, capacity: usize) {
        if let Err(err) = check_capacity(capacity) {
            warn!("packet cache resize ignored: {err}");
            return;
        }
        self.lock().slots.resize(capacity);
    }

    /// Resizes only if the current capacity is outside
    /// `[capacity / 2, capacity * 2)` and doing so would not invalidate too
    /// many slot indices. Returns whether a resize happened.
    pub fn resize_cond(&self, capacity: usize) -> bool {
        if let Err(err) = check_capacity(capacity) {
            warn!("packet cache resize ignored: {err}");
            return false;
        }

        let mut state = self.lock();
        let current = state.slots.capacity();
        if current >= capacity / 2 && current < capacity * 2 {
            return false;
        }

        let tail = state.slots.tail();
        if tail > current / 2 && tail > capacity / 2 {
            return false;
        }

        state.slots.resize(capacity);
        true
    }

    /// Drains 17 sequence numbers from the front of the arrival window and
    /// reports which of them are missing, in generic NACK form.
    pub fn bitmap_get(&self) -> BitmapDrain {
        self.lock().bitmap.drain()
    }

    /// Returns the reception statistics. With `reset`, the period counters
    /// are cleared and the period's loss is folded into the cumulative total.
    pub fn stats(&self, reset: bool) -> CacheStats {
        self.lock().tracker.stats(reset)
    }
}

fn check_capacity(capacity: usize) -> Result<()> {
    if capacity == 0 {
        return Err(Error::ErrPacketCacheCapacityZero);
    }
    if capacity > MAX_CAPACITY {
        return Err(Error::ErrPacketCacheCapacityTooLarge(capacity));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BUF_SIZE;

    #[test]
    fn test_new_capacity_bounds() {
        assert_eq!(
            PacketCache::new(0).err(),
            Some(Error::ErrPacketCacheCapacityZero)
        );
        assert_eq!(
            PacketCache::new(MAX_CAPACITY + 1).err(),
            Some(Error::ErrPacketCacheCapacityTooLarge(MAX_CAPACITY + 1))
        );
        assert!(PacketCache::new(1).is_ok());
        assert!(PacketCache::new(MAX_CAPACITY).is_ok());
    }

    #[test]
    fn test_builder_default_capacity() {
        let cache = PacketCacheBuilder::new().build().unwrap();
        assert_eq!(cache.capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn test_store_returns_window_and_index() {
        let cache = PacketCache::new(4).unwrap();
        assert_eq!(cache.store(100, b"a"), (100, 0));
        assert_eq!(cache.store(101, b"b"), (100, 1));
        assert_eq!(cache.store(140, b"c"), (109, 2));
        assert_eq!(cache.first(), 109);
    }

    #[test]
    fn test_store_in_order_stats() {
        let cache = PacketCache::new(16).unwrap();
        for seqno in 0..40u16 {
            cache.store(seqno, &[seqno as u8]);
        }
        let stats = cache.stats(false);
        assert_eq!(stats.expected, 40);
        assert_eq!(stats.lost, 0);
        assert_eq!(stats.extended_seqno, 39);
    }

    #[test]
    fn test_store_reorder_stats() {
        let cache = PacketCache::new(16).unwrap();
        for seqno in [0u16, 1, 3] {
            cache.store(seqno, &[0]);
        }
        assert_eq!(cache.stats(false).lost, 1);

        cache.store(2, &[0]);
        let stats = cache.stats(false);
        assert_eq!(stats.expected, 4);
        assert_eq!(stats.lost, 0);
    }

    #[test]
    fn test_expect_is_not_loss() {
        let cache = PacketCache::new(4).unwrap();
        cache.store(0, &[0]);
        cache.expect(0);
        cache.expect(2);
        let stats = cache.stats(false);
        assert_eq!(stats.expected, 3);
        assert_eq!(stats.lost, 0);
    }

    #[test]
    fn test_eviction_misses() {
        let cache = PacketCache::new(8).unwrap();
        let mut indices = Vec::new();
        for seqno in 0..=8u16 {
            indices.push(cache.store(seqno, &seqno.to_be_bytes()).1);
        }

        let mut out = [0u8; BUF_SIZE];
        assert_eq!(cache.get(0, &mut out), 0);
        assert_eq!(cache.get_at(0, indices[0], &mut out), 0);
        assert_eq!(cache.get_at(8, indices[8], &mut out), 2);
        assert_eq!(&out[..2], &8u16.to_be_bytes());
        assert_eq!(cache.get(1, &mut out), 2);
    }

    #[test]
    fn test_get_last() {
        let cache = PacketCache::new(3).unwrap();
        let mut out = [0u8; BUF_SIZE];
        for seqno in 0..5u16 {
            cache.store(seqno, &seqno.to_be_bytes());
            assert_eq!(cache.get_last(&mut out), 2);
            assert_eq!(&out[..2], &seqno.to_be_bytes());
        }
    }

    #[test]
    fn test_resize_keeps_index() {
        let cache = PacketCache::new(4).unwrap();
        let mut stored = Vec::new();
        for seqno in 1..=4u16 {
            stored.push(cache.store(seqno, &seqno.to_be_bytes()));
        }
        assert_eq!(stored[0].1, 0);

        cache.resize(8);
        assert_eq!(cache.capacity(), 8);

        let mut out = [0u8; BUF_SIZE];
        assert_eq!(cache.get_at(1, 0, &mut out), 2);
        assert_eq!(&out[..2], &1u16.to_be_bytes());
    }

    #[test]
    fn test_resize_ignores_invalid_capacity() {
        let cache = PacketCache::new(4).unwrap();
        cache.resize(0);
        cache.resize(MAX_CAPACITY + 1);
        assert_eq!(cache.capacity(), 4);
        assert!(!cache.resize_cond(0));
        assert!(!cache.resize_cond(MAX_CAPACITY + 1));
        assert_eq!(cache.capacity(), 4);
    }

    #[test]
    fn test_resize_cond_within_band() {
        let cache = PacketCache::new(64).unwrap();
        for capacity in [33, 64, 100, 128] {
            assert!(!cache.resize_cond(capacity), "capacity {capacity}");
            assert_eq!(cache.capacity(), 64);
        }
    }

    #[test]
    fn test_resize_cond_outside_band() {
        let cache = PacketCache::new(64).unwrap();
        assert!(cache.resize_cond(130));
        assert_eq!(cache.capacity(), 130);
        assert!(cache.resize_cond(16));
        assert_eq!(cache.capacity(), 16);
    }

    #[test]
    fn test_resize_cond_refuses_late_tail() {
        let cache = PacketCache::new(64).unwrap();
        for seqno in 0..40u16 {
            cache.store(seqno, &[1]);
        }
        // tail 40 is past both halves
        assert!(!cache.resize_cond(16));
        assert_eq!(cache.capacity(), 64);
        // a large enough target keeps tail below its half
        assert!(cache.resize_cond(256));
        assert_eq!(cache.capacity(), 256);
    }

    #[test]
    fn test_bitmap_get_contiguous() {
        let cache = PacketCache::new(32).unwrap();
        for seqno in 500..517u16 {
            cache.store(seqno, &[0]);
        }
        let drained = cache.bitmap_get();
        assert!(!drained.has_loss);
        assert_eq!(drained.seqno, 500);
        assert_eq!(drained.bitmap, 0);
        assert_eq!(cache.first(), 517);
    }

    #[test]
    fn test_bitmap_get_loss() {
        let cache = PacketCache::new(32).unwrap();
        cache.store(500, &[0]);
        cache.store(505, &[0]);
        let drained = cache.bitmap_get();
        assert!(drained.has_loss);
        assert_eq!(drained.seqno, 501);
        let nack = drained.nack_pair().unwrap();
        let missing = nack.packet_list();
        assert_eq!(missing.len(), 15);
        assert!(!missing.contains(&505));
        assert_eq!(missing.last(), Some(&516));
    }

    #[test]
    fn test_stats_reset() {
        let cache = PacketCache::new(8).unwrap();
        cache.store(0, &[0]);
        cache.store(3, &[0]);
        let stats = cache.stats(true);
        assert_eq!((stats.expected, stats.lost, stats.total_lost), (4, 2, 2));
        let stats = cache.stats(false);
        assert_eq!((stats.expected, stats.lost, stats.total_lost), (0, 0, 2));
        assert_eq!(stats.extended_seqno, 3);
    }

    #[test]
    fn test_cache_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PacketCache>();
    }
}
