//! Command Channel Client
//!
//! The controller-side stub: opens one connection to an instrument
//! server and exposes named convenience calls. Every call performs
//! exactly one encode → send → blocking-receive → return cycle.
//!
//! The client owns its connection exclusively and all request methods
//! take `&mut self`, so a second request cannot be issued while the
//! first is outstanding: the strict request/reply alternation of the
//! protocol is enforced by the borrow checker rather than by runtime
//! bookkeeping.
//!
//! ## Example
//!
//! ```ignore
//! use beamlink::client::CommandClient;
//!
//! let mut client = CommandClient::connect("127.0.0.1:5555").await?;
//! let reply = client.ping().await?;
//! assert_eq!(reply.encode(), "OK:pong");
//! ```

use crate::protocol::{FrameError, LineCodec, Reply, Request};
use bytes::{Buf, BytesMut};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::{debug, trace};

/// How long to wait for a reply before giving up.
///
/// The wire protocol has no timeout of its own; without one, a server
/// that dies mid-request leaves the caller blocked forever. Disable via
/// [`CommandClient::set_reply_timeout`] if a deployment really wants
/// unbounded waits.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors surfaced by the client stub.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection refused, reset, or otherwise unusable. Fatal to the
    /// session; the caller decides whether to reconnect.
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    /// The server closed the connection before a reply arrived.
    #[error("connection closed before reply")]
    ConnectionClosed,

    /// No reply within the configured timeout.
    #[error("no reply within {0:?}")]
    Timeout(Duration),

    /// The reply line violated framing rules.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The reply carried neither the `OK:` nor the `ERROR:` marker.
    /// Carries the raw line so the caller can inspect it.
    #[error("malformed reply: {0:?}")]
    MalformedReply(String),
}

/// A connected command channel client.
pub struct CommandClient {
    stream: BufWriter<TcpStream>,
    buffer: BytesMut,
    codec: LineCodec,
    reply_timeout: Option<Duration>,
}

impl CommandClient {
    /// Connects to a command channel server.
    ///
    /// The reply timeout starts at [`DEFAULT_REPLY_TIMEOUT`].
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        debug!(peer = %stream.peer_addr()?, "Connected to command server");
        Ok(Self {
            stream: BufWriter::new(stream),
            buffer: BytesMut::with_capacity(1024),
            codec: LineCodec::new(),
            reply_timeout: Some(DEFAULT_REPLY_TIMEOUT),
        })
    }

    /// Changes the reply timeout. `None` waits forever.
    pub fn set_reply_timeout(&mut self, timeout: Option<Duration>) {
        self.reply_timeout = timeout;
    }

    /// Sends one raw message and returns the raw reply line.
    ///
    /// The reply is surfaced verbatim, marker prefix included; most
    /// callers want [`request`](Self::request) instead.
    pub async fn send_raw(&mut self, message: &str) -> Result<String, ClientError> {
        self.stream
            .write_all(&self.codec.encode(message))
            .await?;
        self.stream.flush().await?;
        trace!(message, "Sent request");

        let raw = match self.reply_timeout {
            Some(limit) => tokio::time::timeout(limit, self.receive_line())
                .await
                .map_err(|_| ClientError::Timeout(limit))??,
            None => self.receive_line().await?,
        };
        trace!(reply = %raw, "Received reply");
        Ok(raw)
    }

    /// Sends a command with arguments and returns the decoded reply.
    pub async fn request(&mut self, command: &str, args: &[&str]) -> Result<Reply, ClientError> {
        let request = Request::new(command, args.iter().map(|s| s.to_string()).collect());
        let raw = self.send_raw(&request.encode()).await?;
        Reply::decode(&raw).ok_or(ClientError::MalformedReply(raw))
    }

    /// Liveness check. A healthy server answers `OK:pong`.
    pub async fn ping(&mut self) -> Result<Reply, ClientError> {
        self.request("ping", &[]).await
    }

    /// Triggers a pedestal acquisition and blocks until it completes.
    ///
    /// The server answers only after the full acquisition delay, so this
    /// call takes at least that long.
    pub async fn collect_pedestal(&mut self) -> Result<Reply, ClientError> {
        self.request("collect_pedestal", &[]).await
    }

    /// Reads from the socket until one framed reply line is available.
    async fn receive_line(&mut self) -> Result<String, ClientError> {
        loop {
            if let Some((line, consumed)) = self.codec.decode(&self.buffer)? {
                self.buffer.advance(consumed);
                return Ok(line);
            }

            let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;
            if n == 0 {
                return Err(ClientError::ConnectionClosed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{CollectPedestalCommand, CommandRegistry, PingCommand};
    use crate::connection::{handle_connection, ConnectionStats};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use tokio::net::TcpListener;

    async fn spawn_server() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(PingCommand));
        registry.register(Arc::new(CollectPedestalCommand::with_delay(
            Duration::from_millis(20),
        )));
        let registry = Arc::new(registry);
        let stats = Arc::new(ConnectionStats::new());

        tokio::spawn(async move {
            while let Ok((stream, client_addr)) = listener.accept().await {
                tokio::spawn(handle_connection(
                    stream,
                    client_addr,
                    Arc::clone(&registry),
                    Arc::clone(&stats),
                ));
            }
        });

        addr
    }

    #[tokio::test]
    async fn test_ping() {
        let addr = spawn_server().await;
        let mut client = CommandClient::connect(addr).await.unwrap();

        let reply = client.ping().await.unwrap();
        assert_eq!(reply, Reply::ok("pong"));
    }

    #[tokio::test]
    async fn test_collect_pedestal() {
        let addr = spawn_server().await;
        let mut client = CommandClient::connect(addr).await.unwrap();

        let reply = client.collect_pedestal().await.unwrap();
        assert_eq!(reply, Reply::ok("Pedestal collected"));
    }

    #[tokio::test]
    async fn test_raw_reply_surfaces_marker() {
        let addr = spawn_server().await;
        let mut client = CommandClient::connect(addr).await.unwrap();

        assert_eq!(client.send_raw("ping").await.unwrap(), "OK:pong");
        assert_eq!(
            client.send_raw("frobnicate").await.unwrap(),
            "ERROR:Invalid command"
        );
    }

    #[tokio::test]
    async fn test_unknown_command_with_args() {
        let addr = spawn_server().await;
        let mut client = CommandClient::connect(addr).await.unwrap();

        let reply = client.request("move", &["10", "20"]).await.unwrap();
        assert_eq!(reply, Reply::invalid_command());

        // Session survives the error reply.
        assert!(client.ping().await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_sequential_requests_in_order() {
        let addr = spawn_server().await;
        let mut client = CommandClient::connect(addr).await.unwrap();

        let first = client.collect_pedestal().await.unwrap();
        let second = client.ping().await.unwrap();
        assert_eq!(first, Reply::ok("Pedestal collected"));
        assert_eq!(second, Reply::ok("pong"));
    }

    #[tokio::test]
    async fn test_reply_timeout() {
        // A listener that accepts but never replies.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            // Hold the socket open without answering.
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(stream);
        });

        let mut client = CommandClient::connect(addr).await.unwrap();
        client.set_reply_timeout(Some(Duration::from_millis(50)));

        let err = client.ping().await.unwrap_err();
        assert!(matches!(err, ClientError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_server_gone_is_surfaced() {
        // Bind, learn the port, drop the listener: connecting must fail
        // loudly instead of being retried silently.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = CommandClient::connect(addr).await;
        assert!(matches!(result, Err(ClientError::Io(_))));
    }

    #[tokio::test]
    async fn test_connection_closed_mid_request() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);
        });

        let mut client = CommandClient::connect(addr).await.unwrap();
        let err = client.ping().await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::ConnectionClosed | ClientError::Io(_)
        ));
    }
}
