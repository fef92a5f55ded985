use crate::cmd;
use crate::connection::{Connection, Connections};
use crate::error::Error;
use crate::value::Value;
use bytes::Bytes;
use std::sync::Arc;

/// Verbs permitted on a connection that is currently in pubsub mode.
const ALLOWED_IN_PUBSUB_MODE: &[&str] = &[
    "subscribe",
    "unsubscribe",
    "psubscribe",
    "punsubscribe",
    "publish",
    "pubsub",
    "ping",
    "quit",
];

/// The outcome of dispatching one command.
pub enum Dispatch {
    /// Write this value back to the client and keep the connection open.
    Reply(Value),
    /// Write this value back, then close the connection (`QUIT`).
    Close(Value),
}

/// Lowercases and truncates a verb to 50 bytes, bounding lookup cost
/// the same way the reference implementation does.
fn normalize_verb(raw: &Bytes) -> String {
    let mut verb = String::from_utf8_lossy(raw).to_lowercase();
    verb.truncate(50);
    verb
}

/// Executes one already-parsed command vector against `conns`/`conn`.
///
/// `args` must be non-empty; the codec never yields an empty command
/// (a zero-length request array is consumed silently before it gets
/// here, see `codec.rs`).
pub fn dispatch(conns: &Arc<Connections>, conn: &Arc<Connection>, args: Vec<Bytes>) -> Dispatch {
    let verb = normalize_verb(&args[0]);
    let rest = &args[1..];

    if verb == "quit" {
        return Dispatch::Close(Value::ok());
    }

    if conn.is_pubsub() && !ALLOWED_IN_PUBSUB_MODE.contains(&verb.as_str()) {
        return Dispatch::Reply(Error::PubsubOnly.into());
    }

    let result = match verb.as_str() {
        "ping" => cmd::connection::ping(rest),
        "select" => cmd::connection::select(conns, conn, rest),
        "info" => cmd::server::info(conns),
        "get" => cmd::string::get(conns, conn, rest),
        "set" => cmd::string::set(conns, conn, rest),
        "mget" => cmd::string::mget(conns, conn, rest),
        "mset" => cmd::string::mset(conns, conn, rest),
        "keys" => cmd::string::keys(conns, conn, rest),
        "subscribe" => cmd::pubsub::subscribe(conns, conn, rest),
        "unsubscribe" => cmd::pubsub::unsubscribe(conns, conn, rest),
        "psubscribe" => cmd::pubsub::psubscribe(conns, conn, rest),
        "punsubscribe" => cmd::pubsub::punsubscribe(conns, conn, rest),
        "publish" => cmd::pubsub::publish(conns, rest),
        "pubsub" => cmd::pubsub::pubsub(conns, rest),
        _ => Err(Error::UnknownCommand(verb.clone())),
    };

    Dispatch::Reply(match result {
        Ok(value) => value,
        Err(err) => err.into(),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cmd::test::create_connection;

    fn run(conns: &Arc<Connections>, conn: &Arc<Connection>, parts: &[&str]) -> Value {
        let args = parts.iter().map(|p| Bytes::copy_from_slice(p.as_bytes())).collect();
        match dispatch(conns, conn, args) {
            Dispatch::Reply(v) | Dispatch::Close(v) => v,
        }
    }

    #[test]
    fn unknown_verb_is_reported() {
        let (conns, conn, _rx) = create_connection();
        match run(&conns, &conn, &["bogus"]) {
            Value::Error(kind, _) => assert_eq!(kind, "ERR"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn quit_closes_the_connection() {
        let (conns, conn, _rx) = create_connection();
        let args = vec![Bytes::from_static(b"QUIT")];
        match dispatch(&conns, &conn, args) {
            Dispatch::Close(Value::Simple(s)) => assert_eq!(s, "OK"),
            _ => panic!("expected Close(OK)"),
        }
    }

    #[test]
    fn pubsub_mode_restricts_other_verbs() {
        let (conns, conn, _rx) = create_connection();
        run(&conns, &conn, &["subscribe", "news"]);
        match run(&conns, &conn, &["get", "x"]) {
            Value::Error(_, msg) => assert!(msg.contains("only (P)SUBSCRIBE")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn ping_and_quit_are_allowed_in_pubsub_mode() {
        let (conns, conn, _rx) = create_connection();
        run(&conns, &conn, &["subscribe", "news"]);
        assert_eq!(run(&conns, &conn, &["ping"]), Value::Simple("PONG".to_owned()));
    }

    #[test]
    fn verb_is_case_insensitive() {
        let (conns, conn, _rx) = create_connection();
        assert_eq!(run(&conns, &conn, &["PiNg"]), Value::Simple("PONG".to_owned()));
    }
}
