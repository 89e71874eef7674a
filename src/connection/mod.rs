//! Connection Handling
//!
//! Server-side management of individual client connections. Each accepted
//! connection runs in its own task:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TCP Listener                            │
//! │                      (main.rs)                              │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │ accept()
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌─────────────┐   ┌──────────────┐   ┌────────────────┐   │
//! │  │ Read bytes  │──▶│ Frame+decode │──▶│ Dispatch       │   │
//! │  └─────────────┘   └──────────────┘   └───────┬────────┘   │
//! │                                               ▼            │
//! │                                      ┌────────────────┐    │
//! │                                      │ Send reply     │    │
//! │                                      └────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Within a connection, processing is strictly sequential: one request is
//! decoded, dispatched to completion, and answered before the next is
//! looked at. This preserves the request/reply alternation of the
//! protocol while still serving multiple connections concurrently.

pub mod handler;

// Re-export commonly used types
pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
