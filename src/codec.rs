use crate::value::Value;
use bytes::{Buf, Bytes, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

/// Streaming framing for the wire protocol.
///
/// Requests are Arrays of Bulk Strings (other simple frame types are
/// accepted as array elements and treated as raw byte payloads).
/// Nested arrays inside a request are a hard protocol error: a
/// conforming client never sends one and our reader does not attempt
/// partial recovery, closing the connection instead.
#[derive(Debug, Default)]
pub struct RespCodec;

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Cursor { buf, pos: 0 }
    }

    /// Returns the next CRLF-terminated line, excluding the CRLF, or
    /// `None` if the buffer doesn't yet contain one.
    fn read_line(&mut self) -> Option<&'a [u8]> {
        let rest = &self.buf[self.pos..];
        let idx = rest.windows(2).position(|w| w == b"\r\n")?;
        let line = &rest[..idx];
        self.pos += idx + 2;
        Some(line)
    }

    fn read_exact(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.buf.len() - self.pos < n {
            return None;
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Some(out)
    }
}

/// Tries to parse a single request frame from `buf`.
///
/// Returns `Ok(None)` if more bytes are needed, `Ok(Some((consumed,
/// args)))` on a full parse (`args` is empty for a zero-length array,
/// which is silently consumed per protocol), and `Err` on a malformed
/// or unsupported frame (in particular, a nested array).
fn parse_frame(buf: &[u8]) -> io::Result<Option<(usize, Vec<Bytes>)>> {
    let mut cur = Cursor::new(buf);
    let header = match cur.read_line() {
        Some(l) => l,
        None => return Ok(None),
    };
    if header.first() != Some(&b'*') {
        return Err(protocol_error("expected array"));
    }
    let len: i64 = std::str::from_utf8(&header[1..])
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| protocol_error("invalid array length"))?;
    if len <= 0 {
        return Ok(Some((cur.pos, Vec::new())));
    }

    let mut args = Vec::with_capacity(len as usize);
    for _ in 0..len {
        let line = match cur.read_line() {
            Some(l) => l,
            None => return Ok(None),
        };
        let (kind, rest) = match line.split_first() {
            Some(x) => x,
            None => return Err(protocol_error("empty frame")),
        };
        match kind {
            b'$' => {
                let blen: i64 = std::str::from_utf8(rest)
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| protocol_error("invalid bulk length"))?;
                if blen < 0 {
                    args.push(Bytes::new());
                    continue;
                }
                let data = match cur.read_exact(blen as usize) {
                    Some(d) => Bytes::copy_from_slice(d),
                    None => return Ok(None),
                };
                match cur.read_exact(2) {
                    Some(b"\r\n") => {}
                    Some(_) => return Err(protocol_error("missing bulk terminator")),
                    None => return Ok(None),
                }
                args.push(data);
            }
            b'+' | b'-' | b':' => {
                args.push(Bytes::copy_from_slice(rest));
            }
            b'*' => {
                return Err(protocol_error("nested arrays are not supported"));
            }
            _ => return Err(protocol_error("unknown frame type")),
        }
    }
    Ok(Some((cur.pos, args)))
}

fn protocol_error(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.to_owned())
}

impl Decoder for RespCodec {
    type Item = Vec<Bytes>;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> io::Result<Option<Vec<Bytes>>> {
        loop {
            match parse_frame(src)? {
                Some((consumed, args)) => {
                    src.advance(consumed);
                    if args.is_empty() {
                        // zero-length array: consumed silently, try the next frame
                        continue;
                    }
                    return Ok(Some(args));
                }
                None => return Ok(None),
            }
        }
    }
}

impl Encoder<Value> for RespCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Value, dst: &mut BytesMut) -> io::Result<()> {
        item.write_to(dst);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn feed(bytes: &[u8]) -> Option<Vec<Bytes>> {
        let mut codec = RespCodec;
        let mut buf = BytesMut::from(bytes);
        codec.decode(&mut buf).unwrap()
    }

    #[test]
    fn parses_simple_array() {
        let got = feed(b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n").unwrap();
        assert_eq!(got, vec![Bytes::from_static(b"GET"), Bytes::from_static(b"foo")]);
    }

    #[test]
    fn incomplete_frame_yields_none() {
        assert!(feed(b"*2\r\n$3\r\nGE").is_none());
    }

    #[test]
    fn zero_length_array_is_silently_consumed() {
        let mut codec = RespCodec;
        let mut buf = BytesMut::from(&b"*0\r\n*1\r\n$4\r\nPING\r\n"[..]);
        let got = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(got, vec![Bytes::from_static(b"PING")]);
    }

    #[test]
    fn nested_array_is_a_protocol_error() {
        let mut codec = RespCodec;
        let mut buf = BytesMut::from(&b"*1\r\n*1\r\n$1\r\na\r\n"[..]);
        assert!(codec.decode(&mut buf).is_err());
    }

    #[test]
    fn bulk_string_round_trips_embedded_crlf() {
        let got = feed(b"*1\r\n$6\r\nfo\r\nbar\r\n").unwrap();
        assert_eq!(got, vec![Bytes::from_static(b"fo\r\nbar")]);
    }
}
