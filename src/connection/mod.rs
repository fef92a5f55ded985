mod connections;

pub use connections::Connections;

use crate::value::Value;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::mpsc;

/// Per-connection state: the selected DB index, the normal/pubsub mode
/// flag, and the sending half of this connection's outbound queue.
///
/// The outbound queue is what lets `PUBLISH` push messages to a
/// subscriber without blocking on that subscriber's socket: exactly
/// one writer task per connection drains it (see the pub/sub module
/// and the connection loop in `server.rs`), which is the fix this
/// implementation adopts for the out-of-order fan-out caveat a shared
/// worker pool would otherwise have.
pub struct Connection {
    id: u128,
    peer: SocketAddr,
    db_index: AtomicUsize,
    pubsub_mode: AtomicBool,
    outbound: mpsc::Sender<Value>,
}

impl Connection {
    pub(crate) fn new(id: u128, peer: SocketAddr, outbound: mpsc::Sender<Value>) -> Connection {
        Connection {
            id,
            peer,
            db_index: AtomicUsize::new(0),
            pubsub_mode: AtomicBool::new(false),
            outbound,
        }
    }

    pub fn id(&self) -> u128 {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn db_index(&self) -> usize {
        self.db_index.load(Ordering::Acquire)
    }

    pub fn select_db(&self, index: usize) {
        self.db_index.store(index, Ordering::Release);
    }

    pub fn is_pubsub(&self) -> bool {
        self.pubsub_mode.load(Ordering::Acquire)
    }

    pub fn set_pubsub_mode(&self, on: bool) {
        self.pubsub_mode.store(on, Ordering::Release);
    }

    /// Enqueues a message for this connection's writer task. Uses
    /// `try_send` so a publisher never blocks on a slow subscriber;
    /// a full queue drops the message and is logged by the caller.
    pub fn send(&self, value: Value) -> bool {
        self.outbound.try_send(value).is_ok()
    }
}
