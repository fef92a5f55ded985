use crate::connection::{Connection, Connections};
use crate::db::Override;
use crate::error::{bytes_to_int, Error};
use crate::glob::Pattern;
use crate::value::Value;
use bytes::Bytes;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub fn get(conns: &Arc<Connections>, conn: &Arc<Connection>, args: &[Bytes]) -> Result<Value, Error> {
    if args.len() != 1 {
        return Err(Error::WrongArgsCount("get".to_owned()));
    }
    let db = conns.dbs().get(conn.db_index())?;
    Ok(match db.get(&args[0], Instant::now()) {
        Some(value) => Value::bulk_from(value),
        None => Value::NullBulk,
    })
}

pub fn set(conns: &Arc<Connections>, conn: &Arc<Connection>, args: &[Bytes]) -> Result<Value, Error> {
    if args.len() < 2 {
        return Err(Error::WrongArgsCount("set".to_owned()));
    }
    let key = args[0].clone();
    let value = args[1].clone();
    let mut over = Override::Always;
    let mut expires_in: Option<Duration> = None;
    let mut saw_expiry_opt = false;
    let mut i = 2;
    while i < args.len() {
        let opt = String::from_utf8_lossy(&args[i]).to_ascii_uppercase();
        match opt.as_str() {
            "NX" => {
                if over == Override::OnlyIfPresent {
                    return Err(Error::Syntax);
                }
                over = Override::OnlyIfAbsent;
                i += 1;
            }
            "XX" => {
                if over == Override::OnlyIfAbsent {
                    return Err(Error::Syntax);
                }
                over = Override::OnlyIfPresent;
                i += 1;
            }
            "EX" | "PX" => {
                if saw_expiry_opt {
                    return Err(Error::Syntax);
                }
                saw_expiry_opt = true;
                let raw = args.get(i + 1).ok_or(Error::Syntax)?;
                let amount = bytes_to_int(raw)?.max(0) as u64;
                expires_in = Some(if opt == "EX" {
                    Duration::from_secs(amount)
                } else {
                    Duration::from_millis(amount)
                });
                i += 2;
            }
            _ => return Err(Error::Syntax),
        }
    }

    let db = conns.dbs().get(conn.db_index())?;
    let wrote = db.set(key, value, over, expires_in, Instant::now());
    Ok(if wrote { Value::ok() } else { Value::NullBulk })
}

pub fn mget(conns: &Arc<Connections>, conn: &Arc<Connection>, args: &[Bytes]) -> Result<Value, Error> {
    if args.is_empty() {
        return Err(Error::WrongArgsCount("mget".to_owned()));
    }
    let db = conns.dbs().get(conn.db_index())?;
    let values = db.get_multi(args, Instant::now());
    Ok(Value::Array(
        values
            .into_iter()
            .map(|v| v.map_or(Value::NullBulk, Value::bulk_from))
            .collect(),
    ))
}

pub fn mset(conns: &Arc<Connections>, conn: &Arc<Connection>, args: &[Bytes]) -> Result<Value, Error> {
    if args.is_empty() || args.len() % 2 != 0 {
        return Err(Error::WrongArgsCount("mset".to_owned()));
    }
    let db = conns.dbs().get(conn.db_index())?;
    let pairs = args
        .chunks(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect();
    db.multi_set(pairs);
    Ok(Value::ok())
}

pub fn keys(conns: &Arc<Connections>, conn: &Arc<Connection>, args: &[Bytes]) -> Result<Value, Error> {
    if args.len() != 1 {
        return Err(Error::WrongArgsCount("keys".to_owned()));
    }
    let pattern = Pattern::compile(&args[0], true)?;
    let db = conns.dbs().get(conn.db_index())?;
    let matched = db.keys_matching(&pattern, Instant::now());
    Ok(Value::Array(matched.into_iter().map(Value::bulk_from).collect()))
}
