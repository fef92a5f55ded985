use bytes::{BufMut, Bytes, BytesMut};

/// A single protocol-level response value.
///
/// [`Value::Multi`] is an internal-only framing convenience used by the
/// (p)subscribe/(p)unsubscribe family: it serializes its items back to
/// back with no wrapper bytes at all, rather than as an Array.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Simple(String),
    Error(String, String),
    Integer(i64),
    Bulk(Bytes),
    NullBulk,
    Array(Vec<Value>),
    Multi(Vec<Value>),
}

impl Value {
    pub fn bulk_from(bytes: impl Into<Bytes>) -> Value {
        Value::Bulk(bytes.into())
    }

    pub fn ok() -> Value {
        Value::Simple("OK".to_owned())
    }

    /// Serializes this value onto `buf`, following the five response
    /// kinds plus the unwrapped `Multi` convenience.
    pub fn write_to(&self, buf: &mut BytesMut) {
        match self {
            Value::Simple(s) => {
                buf.put_u8(b'+');
                buf.put_slice(s.as_bytes());
                buf.put_slice(b"\r\n");
            }
            Value::Error(kind, msg) => {
                buf.put_u8(b'-');
                buf.put_slice(kind.as_bytes());
                if !msg.is_empty() {
                    buf.put_u8(b' ');
                    buf.put_slice(msg.as_bytes());
                }
                buf.put_slice(b"\r\n");
            }
            Value::Integer(n) => {
                buf.put_u8(b':');
                buf.put_slice(n.to_string().as_bytes());
                buf.put_slice(b"\r\n");
            }
            Value::Bulk(b) => {
                buf.put_u8(b'$');
                buf.put_slice(b.len().to_string().as_bytes());
                buf.put_slice(b"\r\n");
                buf.put_slice(b);
                buf.put_slice(b"\r\n");
            }
            Value::NullBulk => {
                buf.put_slice(b"$-1\r\n");
            }
            Value::Array(items) => {
                buf.put_u8(b'*');
                buf.put_slice(items.len().to_string().as_bytes());
                buf.put_slice(b"\r\n");
                for item in items {
                    item.write_to(buf);
                }
            }
            Value::Multi(items) => {
                for item in items {
                    item.write_to(buf);
                }
            }
        }
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.write_to(&mut buf);
        buf.freeze()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn simple_string() {
        assert_eq!(Value::ok().to_bytes(), &b"+OK\r\n"[..]);
    }

    #[test]
    fn bulk_string_roundtrip_embedded_crlf() {
        let v = Value::bulk_from(Bytes::from_static(b"foo\r\nbar"));
        assert_eq!(v.to_bytes(), &b"$8\r\nfoo\r\nbar\r\n"[..]);
    }

    #[test]
    fn null_bulk_string() {
        assert_eq!(Value::NullBulk.to_bytes(), &b"$-1\r\n"[..]);
    }

    #[test]
    fn error_value() {
        let v = Value::Error("ERR".to_owned(), "invalid DB index".to_owned());
        assert_eq!(v.to_bytes(), &b"-ERR invalid DB index\r\n"[..]);
    }

    #[test]
    fn array_of_bulk() {
        let v = Value::Array(vec![
            Value::bulk_from(Bytes::from_static(b"a")),
            Value::NullBulk,
        ]);
        assert_eq!(v.to_bytes(), &b"*2\r\n$1\r\na\r\n$-1\r\n"[..]);
    }

    #[test]
    fn multi_has_no_wrapper() {
        let v = Value::Multi(vec![Value::Integer(1), Value::Integer(2)]);
        assert_eq!(v.to_bytes(), &b":1\r\n:2\r\n"[..]);
    }
}
