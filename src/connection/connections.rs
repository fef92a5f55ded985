use super::Connection;
use crate::db::Databases;
use crate::pubsub::Pubsub;
use crate::value::Value;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Outbound queue depth for a single connection's pub/sub writer task.
const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// Owns the live connection set plus the shared DB pool and pub/sub
/// fabric every connection is constructed against.
pub struct Connections {
    dbs: Arc<Databases>,
    pubsub: Arc<Pubsub>,
    conns: RwLock<HashMap<u128, Arc<Connection>>>,
    next_id: AtomicU64,
}

impl Connections {
    pub fn new(dbs: Arc<Databases>, pubsub: Arc<Pubsub>) -> Arc<Connections> {
        Arc::new(Connections {
            dbs,
            pubsub,
            conns: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn dbs(&self) -> &Arc<Databases> {
        &self.dbs
    }

    pub fn pubsub(&self) -> &Arc<Pubsub> {
        &self.pubsub
    }

    pub fn new_connection(&self, peer: SocketAddr) -> (mpsc::Receiver<Value>, Arc<Connection>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) as u128;
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let conn = Arc::new(Connection::new(id, peer, tx));
        self.conns.write().insert(id, conn.clone());
        (rx, conn)
    }

    /// Removes a connection from the registry. Callers must also have
    /// already unwound its pub/sub subscriptions via
    /// `Pubsub::disconnect` before this point.
    pub fn remove(&self, id: u128) {
        self.conns.write().remove(&id);
    }

    pub fn len(&self) -> usize {
        self.conns.read().len()
    }
}
