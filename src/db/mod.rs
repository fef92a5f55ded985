mod entry;
mod expiration;
mod pool;

pub use pool::Databases;

use bytes::Bytes;
use entry::Entry;
use expiration::ExpirationIndex;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Options accepted by `SET`, parsed once up front by the handler.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Override {
    #[default]
    Always,
    OnlyIfAbsent,
    OnlyIfPresent,
}

/// One logical keyspace: a key/value map plus its TTL index. Both live
/// behind a single `RwLock` -- correct and simple at the scale this
/// server targets (see the concurrency notes for why a coarser lock
/// was chosen over key-sharded locking).
#[derive(Default)]
pub struct Db {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<Bytes, Entry>,
    expiration: ExpirationIndex,
}

impl Inner {
    /// A key is active iff it is present in the value map AND its TTL,
    /// if any, has not lapsed as of `now`. The TTL lives solely in
    /// `expiration`, never on the `Entry` itself, so this is the one
    /// place liveness is decided.
    fn is_active(&self, key: &[u8], now: Instant) -> bool {
        if !self.entries.contains_key(key) {
            return false;
        }
        match self.expiration.expires_at(key) {
            Some(at) => at >= now,
            None => true,
        }
    }
}

impl Db {
    pub fn new() -> Db {
        Db::default()
    }

    pub fn get(&self, key: &[u8], now: Instant) -> Option<Bytes> {
        let inner = self.inner.read();
        if !inner.is_active(key, now) {
            return None;
        }
        inner.entries.get(key).map(|e| e.value.clone())
    }

    pub fn get_multi(&self, keys: &[Bytes], now: Instant) -> Vec<Option<Bytes>> {
        let inner = self.inner.read();
        keys.iter()
            .map(|k| {
                if !inner.is_active(k, now) {
                    return None;
                }
                inner.entries.get(k.as_ref()).map(|e| e.value.clone())
            })
            .collect()
    }

    pub fn is_active(&self, key: &[u8], now: Instant) -> bool {
        self.inner.read().is_active(key, now)
    }

    /// Writes `key` unconditionally (or conditionally per `over`),
    /// returning `true` if the write happened. `expires_in` of `None`
    /// clears any existing TTL; `Some(d)` sets a new absolute expiry.
    pub fn set(
        &self,
        key: Bytes,
        value: Bytes,
        over: Override,
        expires_in: Option<Duration>,
        now: Instant,
    ) -> bool {
        let mut inner = self.inner.write();
        let active = inner.is_active(&key, now);
        match over {
            Override::OnlyIfAbsent if active => return false,
            Override::OnlyIfPresent if !active => return false,
            _ => {}
        }
        inner.entries.insert(key.clone(), Entry::new(value));
        match expires_in {
            Some(d) => inner.expiration.set(key, now + d),
            None => inner.expiration.clear(&key),
        }
        true
    }

    pub fn multi_set(&self, pairs: Vec<(Bytes, Bytes)>) {
        let mut inner = self.inner.write();
        for (key, value) in pairs {
            inner.entries.insert(key.clone(), Entry::new(value));
            inner.expiration.clear(&key);
        }
    }

    /// Every currently-active key whose decoded form matches `pattern`.
    pub fn keys_matching(&self, pattern: &crate::glob::Pattern, now: Instant) -> Vec<Bytes> {
        let inner = self.inner.read();
        inner
            .entries
            .keys()
            .filter(|k| inner.is_active(k, now))
            .filter(|k| pattern.is_match(k))
            .cloned()
            .collect()
    }

    /// Number of active keys and number of active keys with an expiry,
    /// used by `INFO`.
    pub fn key_counts(&self, now: Instant) -> (usize, usize) {
        let inner = self.inner.read();
        let active: Vec<&Bytes> = inner
            .entries
            .keys()
            .filter(|k| inner.is_active(k, now))
            .collect();
        let with_expiry = active
            .iter()
            .filter(|k| inner.expiration.expires_at(k).is_some())
            .count();
        (active.len(), with_expiry)
    }

    /// Evicts every key whose expiry has lapsed as of `now`. Run
    /// periodically by the background expirer; lazy reads make this
    /// non-load-bearing for correctness.
    pub fn purge(&self, now: Instant) -> usize {
        let mut inner = self.inner.write();
        let expired = inner.expiration.pop_expired(now);
        let count = expired.len();
        for key in expired {
            inner.entries.remove(&key);
        }
        count
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn set_then_get() {
        let db = Db::new();
        let now = Instant::now();
        db.set(
            Bytes::from_static(b"foo"),
            Bytes::from_static(b"bar"),
            Override::Always,
            None,
            now,
        );
        assert_eq!(db.get(b"foo", now), Some(Bytes::from_static(b"bar")));
    }

    #[test]
    fn expired_key_is_invisible() {
        let db = Db::new();
        let now = Instant::now();
        db.set(
            Bytes::from_static(b"foo"),
            Bytes::from_static(b"bar"),
            Override::Always,
            Some(Duration::from_millis(10)),
            now,
        );
        let later = now + Duration::from_millis(50);
        assert_eq!(db.get(b"foo", later), None);
    }

    #[test]
    fn nx_is_a_no_op_on_active_key() {
        let db = Db::new();
        let now = Instant::now();
        assert!(db.set(
            Bytes::from_static(b"k"),
            Bytes::from_static(b"1"),
            Override::Always,
            None,
            now,
        ));
        assert!(!db.set(
            Bytes::from_static(b"k"),
            Bytes::from_static(b"2"),
            Override::OnlyIfAbsent,
            None,
            now,
        ));
        assert_eq!(db.get(b"k", now), Some(Bytes::from_static(b"1")));
    }

    #[test]
    fn xx_is_a_no_op_on_absent_key() {
        let db = Db::new();
        let now = Instant::now();
        assert!(!db.set(
            Bytes::from_static(b"k"),
            Bytes::from_static(b"2"),
            Override::OnlyIfPresent,
            None,
            now,
        ));
        assert_eq!(db.get(b"k", now), None);
    }

    #[test]
    fn overwrite_without_ttl_clears_old_expiry() {
        let db = Db::new();
        let now = Instant::now();
        db.set(
            Bytes::from_static(b"k"),
            Bytes::from_static(b"1"),
            Override::Always,
            Some(Duration::from_millis(10)),
            now,
        );
        db.set(
            Bytes::from_static(b"k"),
            Bytes::from_static(b"2"),
            Override::Always,
            None,
            now,
        );
        let later = now + Duration::from_millis(50);
        assert_eq!(db.get(b"k", later), Some(Bytes::from_static(b"2")));
    }

    #[test]
    fn purge_removes_expired_entries() {
        let db = Db::new();
        let now = Instant::now();
        db.set(
            Bytes::from_static(b"k"),
            Bytes::from_static(b"v"),
            Override::Always,
            Some(Duration::from_millis(1)),
            now,
        );
        let later = now + Duration::from_millis(50);
        assert_eq!(db.purge(later), 1);
        assert_eq!(db.key_counts(later), (0, 0));
    }

    #[test]
    fn info_counts_active_keys_with_and_without_expiry() {
        let db = Db::new();
        let now = Instant::now();
        db.set(Bytes::from_static(b"a"), Bytes::from_static(b"1"), Override::Always, None, now);
        db.set(
            Bytes::from_static(b"b"),
            Bytes::from_static(b"2"),
            Override::Always,
            Some(Duration::from_secs(60)),
            now,
        );
        assert_eq!(db.key_counts(now), (2, 1));
    }
}
