use crate::connection::Connections;
use crate::error::Error;
use crate::value::Value;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;

/// `# Keyspace` section only, one `dbN:keys=X,expires=Y` line per DB
/// that has at least one active key. DB 0 is always listed even when
/// empty, matching the reference's unconditional `db_info(0)`.
pub fn info(conns: &Arc<Connections>) -> Result<Value, Error> {
    let now = Instant::now();
    let mut lines = vec!["# Keyspace".to_owned()];
    for (index, db) in conns.dbs().iter() {
        let (keys, expires) = db.key_counts(now);
        if index == 0 || keys > 0 {
            lines.push(format!("db{}:keys={},expires={}", index, keys, expires));
        }
    }
    Ok(Value::bulk_from(Bytes::from(lines.join("\n"))))
}
