//! Command Registry Module
//!
//! Maps command names to executable handlers and dispatches decoded
//! requests to them.
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  Line Codec     │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandRegistry │  (this module)
//! │                 │
//! │  - Resolve      │
//! │  - Execute      │
//! │  - Reply        │
//! └────────┬────────┘
//!          │
//!          ▼
//!    OK: / ERROR: reply
//! ```
//!
//! The registry is built once at startup ([`CommandRegistry::with_builtins`]
//! plus any deployment-specific [`CommandRegistry::register`] calls) and
//! shared read-only across connections.

pub mod builtin;
pub mod registry;

// Re-export the registry surface
pub use builtin::{CollectPedestalCommand, PingCommand, PEDESTAL_ACQUISITION_DELAY};
pub use registry::{Command, CommandError, CommandRegistry};
