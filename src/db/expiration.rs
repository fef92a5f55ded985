use bytes::Bytes;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Instant;

/// One entry on the expiration heap. Ordering is `(expires_at,
/// sequence)`; `sequence` exists solely to keep the ordering total
/// when two keys expire at the same instant.
#[derive(Debug, Clone, Eq, PartialEq)]
struct HeapEntry {
    expires_at: Instant,
    sequence: u64,
    key: Bytes,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.expires_at, self.sequence).cmp(&(other.expires_at, other.sequence))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// The TTL side-index for one DB: a min-heap of expiry entries plus a
/// lookup map from key to its current `(expires_at, sequence)`.
///
/// Overwriting a key's expiry never touches the heap in place: it
/// bumps the sequence counter, pushes a fresh heap entry, and updates
/// the lookup map. Any heap entry whose sequence no longer matches the
/// lookup map is an implicit tombstone, discovered and discarded when
/// it is popped, rather than tracked with a separate flag.
#[derive(Debug, Default)]
pub struct ExpirationIndex {
    heap: BinaryHeap<Reverse<HeapEntry>>,
    lookup: HashMap<Bytes, (Instant, u64)>,
    next_sequence: u64,
}

impl ExpirationIndex {
    pub fn new() -> ExpirationIndex {
        ExpirationIndex::default()
    }

    /// Sets (or replaces) the expiry for `key`.
    pub fn set(&mut self, key: Bytes, expires_at: Instant) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.lookup.insert(key.clone(), (expires_at, sequence));
        self.heap.push(Reverse(HeapEntry {
            expires_at,
            sequence,
            key,
        }));
    }

    /// Clears any expiry on `key`. The corresponding heap entry, if
    /// any, becomes an implicit tombstone.
    pub fn clear(&mut self, key: &[u8]) {
        self.lookup.remove(key);
    }

    pub fn expires_at(&self, key: &[u8]) -> Option<Instant> {
        self.lookup.get(key).map(|&(at, _)| at)
    }

    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    /// Pops every heap entry whose expiry has lapsed as of `now`,
    /// skipping tombstoned (stale) entries, and returns the keys that
    /// were actually live and are now removed from the index.
    pub fn pop_expired(&mut self, now: Instant) -> Vec<Bytes> {
        let mut expired = Vec::new();
        while let Some(Reverse(top)) = self.heap.peek() {
            if top.expires_at > now {
                break;
            }
            let Reverse(entry) = self.heap.pop().expect("peeked entry must pop");
            if let Some(&(at, seq)) = self.lookup.get(&entry.key) {
                if at == entry.expires_at && seq == entry.sequence {
                    self.lookup.remove(&entry.key);
                    expired.push(entry.key);
                }
            }
        }
        expired
    }
}
