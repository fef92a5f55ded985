use crate::connection::{Connection, Connections};
use crate::error::Error;
use crate::glob::Pattern;
use crate::value::Value;
use bytes::Bytes;
use std::sync::Arc;

pub fn subscribe(conns: &Arc<Connections>, conn: &Arc<Connection>, args: &[Bytes]) -> Result<Value, Error> {
    if args.is_empty() {
        return Err(Error::WrongArgsCount("subscribe".to_owned()));
    }
    Ok(Value::Multi(conns.pubsub().subscribe(conn, args)))
}

pub fn unsubscribe(conns: &Arc<Connections>, conn: &Arc<Connection>, args: &[Bytes]) -> Result<Value, Error> {
    Ok(Value::Multi(conns.pubsub().unsubscribe(conn, args)))
}

pub fn psubscribe(conns: &Arc<Connections>, conn: &Arc<Connection>, args: &[Bytes]) -> Result<Value, Error> {
    if args.is_empty() {
        return Err(Error::WrongArgsCount("psubscribe".to_owned()));
    }
    Ok(Value::Multi(conns.pubsub().psubscribe(conn, args)))
}

pub fn punsubscribe(conns: &Arc<Connections>, conn: &Arc<Connection>, args: &[Bytes]) -> Result<Value, Error> {
    Ok(Value::Multi(conns.pubsub().punsubscribe(conn, args)))
}

pub fn publish(conns: &Arc<Connections>, args: &[Bytes]) -> Result<Value, Error> {
    if args.len() != 2 {
        return Err(Error::WrongArgsCount("publish".to_owned()));
    }
    let count = conns.pubsub().publish(&args[0], &args[1]);
    Ok(Value::Integer(count))
}

pub fn pubsub(conns: &Arc<Connections>, args: &[Bytes]) -> Result<Value, Error> {
    let sub = args
        .first()
        .map(|b| String::from_utf8_lossy(b).to_ascii_uppercase())
        .ok_or_else(|| Error::WrongArgsCount("pubsub".to_owned()))?;
    match sub.as_str() {
        "CHANNELS" => {
            let pattern_bytes = args.get(1).cloned().unwrap_or_else(|| Bytes::from_static(b"*"));
            let pattern = Pattern::compile(&pattern_bytes, true)?;
            let channels = conns.pubsub().channels(&pattern);
            Ok(Value::Array(channels.into_iter().map(Value::bulk_from).collect()))
        }
        "NUMSUB" => {
            let mut items = Vec::with_capacity(args.len().saturating_sub(1) * 2);
            for channel in &args[1..] {
                items.push(Value::bulk_from(channel.clone()));
                items.push(Value::Integer(conns.pubsub().num_subscribers(channel)));
            }
            Ok(Value::Array(items))
        }
        "NUMPAT" => Ok(Value::Integer(conns.pubsub().num_patterns())),
        _ => Err(Error::UnknownSubcommand),
    }
}
