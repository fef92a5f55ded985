use crate::value::Value;
use thiserror::Error as ThisError;

/// Errors produced by command handlers and the dispatcher.
///
/// Every variant's `Display` implementation renders the exact wire text
/// (kind word, then message) that is split into a protocol Error frame
/// by [`From<Error> for Value`].
#[derive(Debug, ThisError, PartialEq, Eq, Clone)]
pub enum Error {
    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),

    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArgsCount(String),

    #[error("ERR syntax error")]
    Syntax,

    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,

    #[error("ERR invalid DB index")]
    InvalidDbIndex,

    #[error("ERR invalid pattern")]
    InvalidPattern,

    #[error("ERR Unknown PUBSUB subcommand")]
    UnknownSubcommand,

    #[error("ERR only (P)SUBSCRIBE / (P)UNSUBSCRIBE / PING / QUIT allowed in this context")]
    PubsubOnly,

    #[error("ERR Protocol error")]
    Protocol,
}

impl From<Error> for Value {
    fn from(err: Error) -> Value {
        let full = err.to_string();
        let mut parts = full.splitn(2, ' ');
        let kind = parts.next().unwrap_or("ERR").to_owned();
        let msg = parts.next().unwrap_or("").to_owned();
        Value::Error(kind, msg)
    }
}

/// Parses an argument as a base-10 i64, mapping any failure to the
/// same error the wire protocol reports for a bad integer option.
pub fn bytes_to_int(bytes: &[u8]) -> Result<i64, Error> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or(Error::NotAnInteger)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unknown_command_renders_kind_and_message() {
        let err = Error::UnknownCommand("foo".to_owned());
        match Value::from(err) {
            Value::Error(kind, msg) => {
                assert_eq!(kind, "ERR");
                assert_eq!(msg, "unknown command 'foo'");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn bytes_to_int_rejects_garbage() {
        assert_eq!(bytes_to_int(b"12x"), Err(Error::NotAnInteger));
        assert_eq!(bytes_to_int(b"42"), Ok(42));
        assert_eq!(bytes_to_int(b"-7"), Ok(-7));
    }
}
