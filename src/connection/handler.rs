//! Connection Handler
//!
//! Handles a single client connection to the command channel. Each client
//! gets its own handler task that runs in a loop, reading one request,
//! dispatching it, and sending the reply before reading the next.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │   Read bytes from socket     │
//!    │            │                 │
//!    │            ▼                 │
//!    │   Frame + decode request     │
//!    │            │                 │
//!    │            ▼                 │
//!    │   Dispatch to registry       │
//!    │            │                 │
//!    │            ▼                 │
//!    │   Send OK:/ERROR: reply      │
//!    │            │                 │
//!    │            ▼                 │
//!    │       [Loop back]            │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. Client disconnects / transport error
//! ```
//!
//! Requests on one connection are processed strictly in order: the reply
//! to a request is always written before the next request is decoded, so
//! replies are FIFO with respect to requests even when a client sends
//! ahead. Only transport-level failures end the loop; an unknown command
//! or a failing handler answers with an `ERROR:` reply and the loop
//! continues.

use crate::commands::CommandRegistry;
use crate::protocol::{FrameError, LineCodec, Reply, Request};
use bytes::{Buf, BytesMut};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, error, info, trace, warn};

/// Maximum size for the read buffer (64 KB)
const MAX_BUFFER_SIZE: usize = 64 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 1024;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total requests dispatched
    pub requests_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn request_processed(&self) {
        self.requests_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
///
/// Owns the read buffer, framing, and reply sending for one connected
/// client. The registry is shared read-only across all handlers.
pub struct ConnectionHandler {
    /// The TCP stream for this connection
    stream: BufWriter<TcpStream>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Buffer for incoming data
    buffer: BytesMut,

    /// The command registry (shared across connections)
    registry: Arc<CommandRegistry>,

    /// Message framing
    codec: LineCodec,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl ConnectionHandler {
    /// Creates a new connection handler.
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        registry: Arc<CommandRegistry>,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            registry,
            codec: LineCodec::new(),
            stats,
        }
    }

    /// Runs the connection loop to completion.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected gracefully"),
            Err(e) => match e {
                ConnectionError::ClientDisconnected => {
                    debug!(client = %self.addr, "Client disconnected")
                }
                ConnectionError::IoError(io_err)
                    if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
                {
                    debug!(client = %self.addr, "Connection reset by client")
                }
                _ => warn!(client = %self.addr, error = %e, "Connection error"),
            },
        }

        self.stats.connection_closed();
        result
    }

    /// The read-decode-dispatch-reply loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            while let Some(message) = self.try_frame_message()? {
                let reply = match message {
                    Framed::Message(raw) => {
                        let request = Request::decode(&raw);
                        trace!(client = %self.addr, request = %request, "Dispatching request");
                        self.registry.dispatch(&request).await
                    }
                    // Undecodable bytes still get a reply; the framing
                    // stays intact so the loop carries on.
                    Framed::Garbage => Reply::error("request is not valid UTF-8"),
                };
                self.stats.request_processed();
                self.send_reply(&reply).await?;
            }

            // Need more data - read from the socket
            self.read_more_data().await?;
        }
    }

    /// Attempts to frame one message from the buffer.
    fn try_frame_message(&mut self) -> Result<Option<Framed>, ConnectionError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        match self.codec.decode(&self.buffer) {
            Ok(Some((message, consumed))) => {
                self.buffer.advance(consumed);
                trace!(
                    client = %self.addr,
                    consumed = consumed,
                    remaining = self.buffer.len(),
                    "Framed message"
                );
                Ok(Some(Framed::Message(message)))
            }
            Ok(None) => {
                trace!(
                    client = %self.addr,
                    buffered = self.buffer.len(),
                    "Incomplete message, need more data"
                );
                Ok(None)
            }
            Err(FrameError::InvalidUtf8(e)) => {
                // Skip the bad line, the terminator is known to be there.
                warn!(client = %self.addr, error = %e, "Request is not valid UTF-8");
                if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                    self.buffer.advance(pos + 1);
                }
                Ok(Some(Framed::Garbage))
            }
            Err(e @ FrameError::MessageTooLarge { .. }) => {
                warn!(client = %self.addr, error = %e, "Framing error");
                Err(ConnectionError::FrameError(e))
            }
        }
    }

    /// Reads more data from the socket into the buffer.
    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        if self.buffer.len() >= MAX_BUFFER_SIZE {
            error!(
                client = %self.addr,
                size = self.buffer.len(),
                "Buffer size limit exceeded"
            );
            return Err(ConnectionError::BufferFull);
        }

        if self.buffer.capacity() - self.buffer.len() < 256 {
            self.buffer.reserve(1024);
        }

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;

        if n == 0 {
            // Connection closed by client
            if self.buffer.is_empty() {
                return Err(ConnectionError::ClientDisconnected);
            } else {
                // Partial request in buffer
                return Err(ConnectionError::UnexpectedEof);
            }
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");

        Ok(())
    }

    /// Sends a reply to the client.
    async fn send_reply(&mut self, reply: &Reply) -> Result<(), ConnectionError> {
        let bytes = self.codec.encode(&reply.encode());
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(bytes.len());
        trace!(client = %self.addr, bytes = bytes.len(), "Sent reply");
        Ok(())
    }
}

/// One framing attempt's outcome: a decodable message or a skipped bad line.
enum Framed {
    Message(String),
    Garbage,
}

/// Errors that can occur while handling a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Unrecoverable framing error
    #[error("Frame error: {0}")]
    FrameError(#[from] FrameError),

    /// Client disconnected normally
    #[error("Client disconnected")]
    ClientDisconnected,

    /// Unexpected end of stream (partial request)
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    /// Buffer size limit exceeded
    #[error("Buffer size limit exceeded")]
    BufferFull,
}

/// Handles a client connection.
///
/// Convenience entry point that creates a [`ConnectionHandler`] and runs
/// it to completion, swallowing the expected disconnect outcomes.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    registry: Arc<CommandRegistry>,
    stats: Arc<ConnectionStats>,
) {
    let handler = ConnectionHandler::new(stream, addr, registry, stats);
    if let Err(e) = handler.run().await {
        match e {
            ConnectionError::ClientDisconnected => {}
            ConnectionError::IoError(ref io_err)
                if io_err.kind() == std::io::ErrorKind::ConnectionReset => {}
            _ => {
                debug!(client = %addr, error = %e, "Connection ended with error");
            }
        }
    }
}
