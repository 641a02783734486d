//! Fixed-capacity ring of cached payloads.

use crate::BUF_SIZE;
use log::{debug, warn};

/// One ring slot. A zero `length` marks the slot as empty.
#[derive(Clone)]
struct Entry {
    seqno: u16,
    length: u16,
    buf: [u8; BUF_SIZE],
}

impl Default for Entry {
    fn default() -> Self {
        Self {
            seqno: 0,
            length: 0,
            buf: [0; BUF_SIZE],
        }
    }
}

impl Entry {
    fn is_empty(&self) -> bool {
        self.length == 0
    }

    fn copy_to(&self, out: &mut [u8]) -> usize {
        let n = (self.length as usize).min(out.len());
        out[..n].copy_from_slice(&self.buf[..n]);
        n
    }
}

/// Ring of [`Entry`] written at `tail`, which advances modulo the capacity.
///
/// A slot index handed out by [`SlotStore::insert`] refers to the inserted
/// packet only until the ring wraps back onto it; lookups by index always
/// re-check the stored sequence number.
pub(crate) struct SlotStore {
    entries: Vec<Entry>,
    tail: u16,
}

impl SlotStore {
    /// Creates a ring of `capacity` empty slots. The caller guarantees
    /// `1 <= capacity <= 65536`.
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            entries: vec![Entry::default(); capacity],
            tail: 0,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn tail(&self) -> usize {
        self.tail as usize
    }

    /// Writes `payload` into the slot at `tail` and returns that slot's
    /// index. Payloads longer than [`BUF_SIZE`] are truncated.
    pub(crate) fn insert(&mut self, seqno: u16, payload: &[u8]) -> u16 {
        let i = self.tail as usize;
        let n = payload.len().min(BUF_SIZE);

        let entry = &mut self.entries[i];
        entry.seqno = seqno;
        entry.buf[..n].copy_from_slice(&payload[..n]);
        entry.length = n as u16;

        self.tail = ((i + 1) % self.entries.len()) as u16;
        i as u16
    }

    /// Scans every slot for `seqno`.
    pub(crate) fn get(&self, seqno: u16, out: &mut [u8]) -> usize {
        self.entries
            .iter()
            .find(|e| !e.is_empty() && e.seqno == seqno)
            .map_or(0, |e| e.copy_to(out))
    }

    /// Reads slot `index` if it still holds `seqno`.
    pub(crate) fn get_at(&self, seqno: u16, index: u16, out: &mut [u8]) -> usize {
        match self.entries.get(index as usize) {
            Some(e) if e.seqno == seqno => e.copy_to(out),
            _ => 0,
        }
    }

    /// Reads the most recently written slot.
    pub(crate) fn get_last(&self, out: &mut [u8]) -> usize {
        let i = match self.tail {
            0 => self.entries.len() - 1,
            t => t as usize - 1,
        };
        self.entries[i].copy_to(out)
    }

    /// Reallocates the ring to `capacity` slots, keeping as many slot indices
    /// valid as possible.
    ///
    /// Indices below `tail` survive any resize with `capacity > tail`, and a
    /// grow with `tail == 0` keeps every index. When shrinking to
    /// `capacity <= tail` only the newest `capacity` entries are kept and
    /// every previously issued index is invalidated.
    pub(crate) fn resize(&mut self, capacity: usize) {
        let old = self.entries.len();
        if capacity == old {
            return;
        }

        let tail = self.tail as usize;
        let mut entries = vec![Entry::default(); capacity];

        if capacity > old && tail == 0 {
            // tail 0 and tail == old name the same ring position
            entries[..old].clone_from_slice(&self.entries);
            self.tail = old as u16;
        } else if capacity > old {
            // the block at and after tail is the oldest; keep it at the end
            entries[..tail].clone_from_slice(&self.entries[..tail]);
            entries[tail + capacity - old..].clone_from_slice(&self.entries[tail..]);
        } else if capacity > tail {
            entries[..tail].clone_from_slice(&self.entries[..tail]);
            entries[tail..].clone_from_slice(&self.entries[tail + old - capacity..]);
        } else {
            warn!(
                "packet cache shrink {} -> {} below tail {}, slot indices invalidated",
                old, capacity, tail
            );
            entries.clone_from_slice(&self.entries[tail - capacity..tail]);
            self.tail = 0;
        }

        debug!("packet cache resized {} -> {}", old, capacity);
        self.entries = entries;
    }
}
