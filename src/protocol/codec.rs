//! Line Framing for the Command Channel
//!
//! The original transport framed whole messages for us; over a raw TCP
//! stream the boundary has to be explicit. Messages are UTF-8 lines
//! terminated by `\n` (an optional `\r` before the terminator is stripped,
//! so interactive telnet sessions work).
//!
//! ## How the Codec Works
//!
//! The codec reads from a buffer and returns either:
//! - `Ok(Some((line, consumed)))` - a complete message, `consumed` bytes were used
//! - `Ok(None)` - need more data, the message is incomplete
//! - `Err(FrameError)` - invalid framing
//!
//! This lets the caller:
//! 1. Append incoming network data to a buffer
//! 2. Call `decode()` to attempt framing
//! 3. If successful, advance the buffer by `consumed` bytes
//! 4. If incomplete, wait for more data
//! 5. If error, disconnect the client

use thiserror::Error;

/// Maximum size for a single message line (64 KB).
///
/// Commands and their arguments are short; anything near this limit is a
/// misbehaving peer, not a legitimate request.
pub const MAX_LINE_SIZE: usize = 64 * 1024;

/// Errors that can occur during message framing.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FrameError {
    /// The message is not valid UTF-8
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),

    /// The message exceeds the maximum allowed line size
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },
}

/// Frames newline-terminated messages out of a byte buffer.
///
/// # Example
///
/// ```
/// use beamlink::protocol::LineCodec;
///
/// let codec = LineCodec::new();
/// let (line, consumed) = codec.decode(b"ping\nleft").unwrap().unwrap();
/// assert_eq!(line, "ping");
/// assert_eq!(consumed, 5);
/// ```
#[derive(Debug)]
pub struct LineCodec {
    max_line: usize,
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl LineCodec {
    /// Creates a codec with the default line size limit.
    pub fn new() -> Self {
        Self {
            max_line: MAX_LINE_SIZE,
        }
    }

    /// Creates a codec with a custom line size limit.
    pub fn with_max_line(max_line: usize) -> Self {
        Self { max_line }
    }

    /// Attempts to frame one message from the buffer.
    ///
    /// # Returns
    ///
    /// - `Ok(Some((line, consumed)))` - a complete message, terminator excluded
    /// - `Ok(None)` - incomplete data, need more bytes
    /// - `Err(e)` - framing error
    pub fn decode(&self, buf: &[u8]) -> Result<Option<(String, usize)>, FrameError> {
        let newline = match buf.iter().position(|&b| b == b'\n') {
            Some(pos) => pos,
            None => {
                // No terminator yet; reject peers that never send one.
                if buf.len() > self.max_line {
                    return Err(FrameError::MessageTooLarge {
                        size: buf.len(),
                        max: self.max_line,
                    });
                }
                return Ok(None);
            }
        };

        if newline > self.max_line {
            return Err(FrameError::MessageTooLarge {
                size: newline,
                max: self.max_line,
            });
        }

        // Strip an optional carriage return before the terminator.
        let end = if newline > 0 && buf[newline - 1] == b'\r' {
            newline - 1
        } else {
            newline
        };

        let line = std::str::from_utf8(&buf[..end])
            .map_err(|e| FrameError::InvalidUtf8(e.to_string()))?
            .to_string();

        Ok(Some((line, newline + 1)))
    }

    /// Encodes a message into its framed wire form.
    pub fn encode(&self, message: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(message.len() + 1);
        out.extend_from_slice(message.as_bytes());
        out.push(b'\n');
        out
    }
}
