use crate::connection::Connection;
use crate::glob::Pattern;
use crate::value::Value;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

type Subscribers = HashMap<u128, Arc<Connection>>;

/// The channel/pattern subscription fabric shared by every connection.
///
/// `channel_subs`/`pattern_subs` are the forward index used by
/// `PUBLISH`; `conn_channels`/`conn_patterns` are the reverse index
/// used to answer a connection's current subscription count and to
/// unwind everything on disconnect. The reference implementation keeps
/// this reverse index in `weakref` collections so a dead connection
/// can't be kept alive by a subscription; here the same property comes
/// from `disconnect` being called explicitly from the connection
/// task's unwind path instead (see the design notes).
#[derive(Default)]
pub struct Pubsub {
    channel_subs: RwLock<HashMap<Bytes, Subscribers>>,
    pattern_subs: RwLock<HashMap<Bytes, Subscribers>>,
    conn_channels: RwLock<HashMap<u128, HashSet<Bytes>>>,
    conn_patterns: RwLock<HashMap<u128, HashSet<Bytes>>>,
}

impl Pubsub {
    pub fn new() -> Pubsub {
        Pubsub::default()
    }

    fn subscription_count(&self, conn_id: u128) -> usize {
        let channels = self
            .conn_channels
            .read()
            .get(&conn_id)
            .map_or(0, HashSet::len);
        let patterns = self
            .conn_patterns
            .read()
            .get(&conn_id)
            .map_or(0, HashSet::len);
        channels + patterns
    }

    /// Subscribes `conn` to each channel in order, returning one
    /// `["subscribe", channel, count]` response per channel.
    pub fn subscribe(&self, conn: &Arc<Connection>, channels: &[Bytes]) -> Vec<Value> {
        let mut responses = Vec::with_capacity(channels.len());
        for channel in channels {
            self.channel_subs
                .write()
                .entry(channel.clone())
                .or_default()
                .insert(conn.id(), conn.clone());
            self.conn_channels
                .write()
                .entry(conn.id())
                .or_default()
                .insert(channel.clone());
            let count = self.subscription_count(conn.id());
            responses.push(Value::Array(vec![
                Value::bulk_from(Bytes::from_static(b"subscribe")),
                Value::bulk_from(channel.clone()),
                Value::Integer(count as i64),
            ]));
        }
        conn.set_pubsub_mode(true);
        responses
    }

    /// Unsubscribes `conn` from `channels`, or from every channel it
    /// currently holds when `channels` is empty. Always emits one
    /// response per channel actually iterated; an empty iteration (no
    /// args, no current subscriptions) emits nothing.
    pub fn unsubscribe(&self, conn: &Arc<Connection>, channels: &[Bytes]) -> Vec<Value> {
        let targets: Vec<Bytes> = if channels.is_empty() {
            self.conn_channels
                .read()
                .get(&conn.id())
                .map(|s| s.iter().cloned().collect())
                .unwrap_or_default()
        } else {
            channels.to_vec()
        };

        let mut responses = Vec::with_capacity(targets.len());
        for channel in &targets {
            if let Some(subs) = self.channel_subs.write().get_mut(channel) {
                subs.remove(&conn.id());
            }
            if let Some(set) = self.conn_channels.write().get_mut(&conn.id()) {
                set.remove(channel);
            }
            let count = self.subscription_count(conn.id());
            responses.push(Value::Array(vec![
                Value::bulk_from(Bytes::from_static(b"unsubscribe")),
                Value::bulk_from(channel.clone()),
                Value::Integer(count as i64),
            ]));
        }
        if self.subscription_count(conn.id()) == 0 {
            conn.set_pubsub_mode(false);
        }
        responses
    }

    pub fn psubscribe(&self, conn: &Arc<Connection>, patterns: &[Bytes]) -> Vec<Value> {
        let mut responses = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            self.pattern_subs
                .write()
                .entry(pattern.clone())
                .or_default()
                .insert(conn.id(), conn.clone());
            self.conn_patterns
                .write()
                .entry(conn.id())
                .or_default()
                .insert(pattern.clone());
            let count = self.subscription_count(conn.id());
            responses.push(Value::Array(vec![
                Value::bulk_from(Bytes::from_static(b"psubscribe")),
                Value::bulk_from(pattern.clone()),
                Value::Integer(count as i64),
            ]));
        }
        conn.set_pubsub_mode(true);
        responses
    }

    pub fn punsubscribe(&self, conn: &Arc<Connection>, patterns: &[Bytes]) -> Vec<Value> {
        let targets: Vec<Bytes> = if patterns.is_empty() {
            self.conn_patterns
                .read()
                .get(&conn.id())
                .map(|s| s.iter().cloned().collect())
                .unwrap_or_default()
        } else {
            patterns.to_vec()
        };

        let mut responses = Vec::with_capacity(targets.len());
        for pattern in &targets {
            if let Some(subs) = self.pattern_subs.write().get_mut(pattern) {
                subs.remove(&conn.id());
            }
            if let Some(set) = self.conn_patterns.write().get_mut(&conn.id()) {
                set.remove(pattern);
            }
            let count = self.subscription_count(conn.id());
            responses.push(Value::Array(vec![
                Value::bulk_from(Bytes::from_static(b"punsubscribe")),
                Value::bulk_from(pattern.clone()),
                Value::Integer(count as i64),
            ]));
        }
        if self.subscription_count(conn.id()) == 0 {
            conn.set_pubsub_mode(false);
        }
        responses
    }

    /// Delivers `message` on `channel` to every exact-channel
    /// subscriber and every connection whose pattern matches
    /// `channel`. Returns the count this spec defines for `PUBLISH`'s
    /// reply: exact subscribers plus the number of (pattern,
    /// connection) pairs dispatched, duplicates included.
    pub fn publish(&self, channel: &Bytes, message: &Bytes) -> i64 {
        let mut delivered = 0i64;

        if let Some(subs) = self.channel_subs.read().get(channel) {
            for conn in subs.values() {
                conn.send(Value::Array(vec![
                    Value::bulk_from(Bytes::from_static(b"message")),
                    Value::bulk_from(channel.clone()),
                    Value::bulk_from(message.clone()),
                ]));
                delivered += 1;
            }
        }

        for (pattern, subs) in self.pattern_subs.read().iter() {
            let compiled = match Pattern::compile(pattern, false) {
                Ok(p) => p,
                Err(_) => continue,
            };
            if !compiled.is_match(channel) {
                continue;
            }
            for conn in subs.values() {
                conn.send(Value::Array(vec![
                    Value::bulk_from(Bytes::from_static(b"pmessage")),
                    Value::bulk_from(pattern.clone()),
                    Value::bulk_from(channel.clone()),
                    Value::bulk_from(message.clone()),
                ]));
                delivered += 1;
            }
        }

        delivered
    }

    /// Every channel with at least one subscriber whose name matches
    /// `pattern`.
    pub fn channels(&self, pattern: &Pattern) -> Vec<Bytes> {
        self.channel_subs
            .read()
            .iter()
            .filter(|(_, subs)| !subs.is_empty())
            .map(|(channel, _)| channel.clone())
            .filter(|channel| pattern.is_match(channel))
            .collect()
    }

    pub fn num_subscribers(&self, channel: &Bytes) -> i64 {
        self.channel_subs
            .read()
            .get(channel)
            .map_or(0, |subs| subs.len() as i64)
    }

    pub fn num_patterns(&self) -> i64 {
        self.conn_patterns
            .read()
            .values()
            .map(|s| s.len() as i64)
            .sum()
    }

    /// Removes every trace of `conn_id` from all four indices. Called
    /// from the connection task's unwind path on disconnect.
    pub fn disconnect(&self, conn_id: u128) {
        if let Some(channels) = self.conn_channels.write().remove(&conn_id) {
            let mut subs = self.channel_subs.write();
            for channel in channels {
                if let Some(set) = subs.get_mut(&channel) {
                    set.remove(&conn_id);
                }
            }
        }
        if let Some(patterns) = self.conn_patterns.write().remove(&conn_id) {
            let mut subs = self.pattern_subs.write();
            for pattern in patterns {
                if let Some(set) = subs.get_mut(&pattern) {
                    set.remove(&conn_id);
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::connection::Connection;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use tokio::sync::mpsc;

    fn new_conn(id: u128) -> (Arc<Connection>, mpsc::Receiver<Value>) {
        let (tx, rx) = mpsc::channel(16);
        let peer = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
        (Arc::new(Connection::new(id, peer, tx)), rx)
    }

    #[test]
    fn subscribe_sets_pubsub_mode_and_reports_count() {
        let pubsub = Pubsub::new();
        let (conn, _rx) = new_conn(1);
        let responses = pubsub.subscribe(&conn, &[Bytes::from_static(b"news")]);
        assert_eq!(responses.len(), 1);
        assert!(conn.is_pubsub());
        match &responses[0] {
            Value::Array(items) => assert_eq!(items[2], Value::Integer(1)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unsubscribe_with_no_args_clears_all_and_resets_mode() {
        let pubsub = Pubsub::new();
        let (conn, _rx) = new_conn(1);
        pubsub.subscribe(&conn, &[Bytes::from_static(b"a"), Bytes::from_static(b"b")]);
        let responses = pubsub.unsubscribe(&conn, &[]);
        assert_eq!(responses.len(), 2);
        assert!(!conn.is_pubsub());
    }

    #[test]
    fn unsubscribe_with_no_args_and_no_subscriptions_emits_nothing() {
        let pubsub = Pubsub::new();
        let (conn, _rx) = new_conn(1);
        assert!(pubsub.unsubscribe(&conn, &[]).is_empty());
    }

    #[test]
    fn publish_counts_exact_and_pattern_pairs() {
        let pubsub = Pubsub::new();
        let (a, mut rx_a) = new_conn(1);
        let (b, _rx_b) = new_conn(2);
        pubsub.subscribe(&a, &[Bytes::from_static(b"news")]);
        pubsub.psubscribe(&b, &[Bytes::from_static(b"news.*")]);
        pubsub.psubscribe(&a, &[Bytes::from_static(b"n*")]);

        let count = pubsub.publish(&Bytes::from_static(b"news"), &Bytes::from_static(b"hello"));
        // 1 exact subscriber (a) + 1 matching pattern (a's "n*") = 2;
        // b's "news.*" does not match the bare "news" channel.
        assert_eq!(count, 2);
        assert!(rx_a.try_recv().is_ok());
    }

    #[test]
    fn disconnect_removes_all_subscriptions() {
        let pubsub = Pubsub::new();
        let (conn, _rx) = new_conn(1);
        pubsub.subscribe(&conn, &[Bytes::from_static(b"news")]);
        pubsub.psubscribe(&conn, &[Bytes::from_static(b"n*")]);
        pubsub.disconnect(conn.id());
        assert_eq!(pubsub.num_subscribers(&Bytes::from_static(b"news")), 0);
        assert_eq!(pubsub.num_patterns(), 0);
    }

    #[test]
    fn channels_filters_by_pattern_and_activity() {
        let pubsub = Pubsub::new();
        let (conn, _rx) = new_conn(1);
        pubsub.subscribe(&conn, &[Bytes::from_static(b"news"), Bytes::from_static(b"sport")]);
        let pattern = Pattern::compile(b"n*", true).unwrap();
        let channels = pubsub.channels(&pattern);
        assert_eq!(channels, vec![Bytes::from_static(b"news")]);
    }
}
