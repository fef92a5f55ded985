use crate::connection::{Connection, Connections};
use crate::error::Error;
use crate::value::Value;
use bytes::Bytes;
use std::sync::Arc;

pub fn ping(args: &[Bytes]) -> Result<Value, Error> {
    match args.len() {
        0 => Ok(Value::Simple("PONG".to_owned())),
        1 => Ok(Value::Simple(String::from_utf8_lossy(&args[0]).into_owned())),
        _ => Err(Error::WrongArgsCount("ping".to_owned())),
    }
}

pub fn select(conns: &Arc<Connections>, conn: &Arc<Connection>, args: &[Bytes]) -> Result<Value, Error> {
    if args.len() != 1 {
        return Err(Error::WrongArgsCount("select".to_owned()));
    }
    let index: i64 = std::str::from_utf8(&args[0])
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(Error::InvalidDbIndex)?;
    if index < 0 || index as usize >= conns.dbs().len() {
        return Err(Error::InvalidDbIndex);
    }
    conn.select_db(index as usize);
    Ok(Value::ok())
}
