//! Command Channel Protocol
//!
//! Text protocol spoken between the controller and the instrument server.
//! One request, one reply, strictly alternating:
//!
//! ```text
//! Client                                Server
//!   │  ──────  collect_pedestal  ─────▶   │
//!   │                                     │  (handler runs)
//!   │  ◀────  OK:Pedestal collected  ───  │
//!   │  ─────────  frobnicate  ──────────▶ │
//!   │  ◀──────  ERROR:Invalid command ──  │
//! ```
//!
//! - [`types`]: request/reply values and their `cmd:arg,arg` / `OK:`-`ERROR:` encoding
//! - [`codec`]: newline framing over the TCP stream

pub mod codec;
pub mod types;

// Re-export commonly used types
pub use codec::{FrameError, LineCodec, MAX_LINE_SIZE};
pub use types::{Reply, Request, DELIMITER, ERROR_MARKER, OK_MARKER, SEPARATOR};
