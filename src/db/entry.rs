use bytes::Bytes;

/// A stored value. Expiry is not tracked here: the owning `Db` consults
/// its `ExpirationIndex` for the authoritative TTL, so a key's liveness
/// can never drift out of sync between the value map and the TTL side
/// index.
#[derive(Debug, Clone)]
pub struct Entry {
    pub value: Bytes,
}

impl Entry {
    pub fn new(value: Bytes) -> Entry {
        Entry { value }
    }
}
