//! Networked Store Backend (RESP)
//!
//! Talks to a Redis-compatible server over one TCP connection, using the
//! small slice of RESP the metadata layer needs: `AUTH`, `PING`, `GET`,
//! `SET`, `INCR`.
//!
//! ## Wire Format
//!
//! Commands go out as arrays of bulk strings:
//!
//! ```text
//! *3\r\n$3\r\nSET\r\n$7\r\nPI_name\r\n$4\r\nErik\r\n
//! ```
//!
//! Replies come back as one of:
//! - `+<string>\r\n` simple string
//! - `-<message>\r\n` error
//! - `:<integer>\r\n` integer
//! - `$<len>\r\n<data>\r\n` bulk string, `$-1\r\n` for null
//!
//! The connection lives behind a mutex so the handle can be shared as
//! `Arc<dyn KvStore>`; RESP on a single connection is itself strictly
//! request/reply, so serializing access is required anyway.

use super::{KvStore, StoreError};
use async_trait::async_trait;
use bytes::{Buf, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::debug;

/// Default port of the store backend (same as Redis).
pub const DEFAULT_STORE_PORT: u16 = 6379;

const CRLF: &[u8] = b"\r\n";

/// A decoded RESP reply, restricted to the types this client requests.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RespReply {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(String),
    Null,
}

/// Store backend over a Redis-compatible server.
pub struct RedisStore {
    conn: Mutex<RespConnection>,
}

impl RedisStore {
    /// Connects to the store, authenticates if a token is given, and
    /// verifies the connection with a `PING`.
    ///
    /// A refused or unanswered connection is an error here rather than on
    /// first use, so a misconfigured host or token fails at startup.
    pub async fn connect(
        host: &str,
        port: u16,
        token: Option<&str>,
    ) -> Result<Self, StoreError> {
        let stream = TcpStream::connect((host, port)).await?;
        let mut conn = RespConnection {
            stream: BufWriter::new(stream),
            buffer: BytesMut::with_capacity(1024),
        };

        if let Some(token) = token {
            match conn.command(&["AUTH", token]).await? {
                RespReply::Simple(_) => {}
                RespReply::Error(e) => return Err(StoreError::Server(e)),
                other => {
                    return Err(StoreError::Protocol(format!(
                        "unexpected AUTH reply: {other:?}"
                    )))
                }
            }
        }

        match conn.command(&["PING"]).await? {
            RespReply::Simple(_) => {}
            RespReply::Error(e) => return Err(StoreError::Server(e)),
            other => {
                return Err(StoreError::Protocol(format!(
                    "unexpected PING reply: {other:?}"
                )))
            }
        }

        debug!(host, port, "Connected to configuration store");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.lock().await;
        match conn.command(&["GET", key]).await? {
            RespReply::Null => Ok(None),
            RespReply::Bulk(value) | RespReply::Simple(value) => Ok(Some(value)),
            RespReply::Error(e) => Err(StoreError::Server(e)),
            other => Err(StoreError::Protocol(format!(
                "unexpected GET reply: {other:?}"
            ))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().await;
        match conn.command(&["SET", key, value]).await? {
            RespReply::Simple(_) => Ok(()),
            RespReply::Error(e) => Err(StoreError::Server(e)),
            other => Err(StoreError::Protocol(format!(
                "unexpected SET reply: {other:?}"
            ))),
        }
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut conn = self.conn.lock().await;
        match conn.command(&["INCR", key]).await? {
            RespReply::Integer(n) => Ok(n),
            RespReply::Error(e) => Err(StoreError::Server(e)),
            other => Err(StoreError::Protocol(format!(
                "unexpected INCR reply: {other:?}"
            ))),
        }
    }
}

/// One RESP connection: serialization, buffered reads, reply parsing.
struct RespConnection {
    stream: BufWriter<TcpStream>,
    buffer: BytesMut,
}

impl RespConnection {
    /// Sends one command and reads its reply.
    async fn command(&mut self, parts: &[&str]) -> Result<RespReply, StoreError> {
        let out = serialize_command(parts);
        self.stream.write_all(&out).await?;
        self.stream.flush().await?;

        loop {
            if let Some((reply, consumed)) = parse_reply(&self.buffer)? {
                self.buffer.advance(consumed);
                return Ok(reply);
            }

            let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;
            if n == 0 {
                return Err(StoreError::Protocol(
                    "store closed the connection".to_string(),
                ));
            }
        }
    }
}

/// Serializes a command as a RESP array of bulk strings.
fn serialize_command(parts: &[&str]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.push(b'*');
    buf.extend_from_slice(parts.len().to_string().as_bytes());
    buf.extend_from_slice(CRLF);
    for part in parts {
        buf.push(b'$');
        buf.extend_from_slice(part.len().to_string().as_bytes());
        buf.extend_from_slice(CRLF);
        buf.extend_from_slice(part.as_bytes());
        buf.extend_from_slice(CRLF);
    }
    buf
}

/// Attempts to parse one reply from the buffer.
///
/// Returns `Ok(Some((reply, consumed)))` on success, `Ok(None)` when the
/// buffer holds an incomplete reply.
fn parse_reply(buf: &[u8]) -> Result<Option<(RespReply, usize)>, StoreError> {
    if buf.is_empty() {
        return Ok(None);
    }

    match buf[0] {
        b'+' => Ok(parse_line(buf)?.map(|(s, n)| (RespReply::Simple(s), n))),
        b'-' => Ok(parse_line(buf)?.map(|(s, n)| (RespReply::Error(s), n))),
        b':' => match parse_line(buf)? {
            Some((s, n)) => {
                let value = s.parse::<i64>().map_err(|_| {
                    StoreError::Protocol(format!("invalid integer reply: {s:?}"))
                })?;
                Ok(Some((RespReply::Integer(value), n)))
            }
            None => Ok(None),
        },
        b'$' => parse_bulk(buf),
        other => Err(StoreError::Protocol(format!(
            "unknown reply prefix: {other:#04x}"
        ))),
    }
}

/// Parses a `<prefix><content>\r\n` line, returning content and consumed bytes.
fn parse_line(buf: &[u8]) -> Result<Option<(String, usize)>, StoreError> {
    match find_crlf(&buf[1..]) {
        Some(pos) => {
            let content = std::str::from_utf8(&buf[1..1 + pos])
                .map_err(|e| StoreError::Protocol(format!("invalid UTF-8: {e}")))?;
            // +1 for prefix, +2 for CRLF
            Ok(Some((content.to_string(), 1 + pos + 2)))
        }
        None => Ok(None),
    }
}

/// Parses a bulk string reply: `$<length>\r\n<data>\r\n` or `$-1\r\n`.
fn parse_bulk(buf: &[u8]) -> Result<Option<(RespReply, usize)>, StoreError> {
    let (length_str, header_len) = match parse_line(buf)? {
        Some(parsed) => parsed,
        None => return Ok(None),
    };

    let length: i64 = length_str
        .parse()
        .map_err(|_| StoreError::Protocol(format!("invalid bulk length: {length_str:?}")))?;

    if length == -1 {
        return Ok(Some((RespReply::Null, header_len)));
    }
    if length < 0 {
        return Err(StoreError::Protocol(format!(
            "invalid bulk length: {length}"
        )));
    }

    let length = length as usize;
    let total = header_len + length + 2;
    if buf.len() < total {
        return Ok(None);
    }

    if &buf[header_len + length..total] != CRLF {
        return Err(StoreError::Protocol(
            "bulk reply missing trailing CRLF".to_string(),
        ));
    }

    let data = std::str::from_utf8(&buf[header_len..header_len + length])
        .map_err(|e| StoreError::Protocol(format!("invalid UTF-8: {e}")))?;

    Ok(Some((RespReply::Bulk(data.to_string()), total)))
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    (0..buf.len().saturating_sub(1)).find(|&i| buf[i] == b'\r' && buf[i + 1] == b'\n')
}
