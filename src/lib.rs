//! # beamlink - Instrument Command Channel and Experiment Metadata
//!
//! beamlink lets a controller process issue named commands to a remote
//! instrument-control process over a point-to-point TCP socket, and lets
//! any process in the setup read and write shared experiment metadata
//! (operator, project, output paths, file counters) through a central
//! key-value store.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                            beamlink                              │
//! │                                                                  │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────┐      │
//! │  │ TCP Server  │───▶│ Connection  │───▶│ CommandRegistry  │      │
//! │  │ (Listener)  │    │  Handler    │    │  ping,           │      │
//! │  └─────────────┘    └─────────────┘    │  collect_pedestal│      │
//! │                                        └──────────────────┘      │
//! │  ┌─────────────┐    ┌──────────────────────────────────────┐     │
//! │  │ Line Codec  │    │           Store boundary             │     │
//! │  │ cmd:a,b     │    │  KvStore ── MemoryStore / RedisStore │     │
//! │  │ OK:/ERROR:  │    │  ExperimentConfig, derived paths     │     │
//! │  └─────────────┘    └──────────────────────────────────────┘     │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The command channel and the store boundary are independent
//! collaborators; a deployment wires them together.
//!
//! ## Protocol
//!
//! One long-lived connection, strict request/reply alternation. Requests
//! are `<command>` or `<command>:<arg1>,<arg2>,...`; replies are
//! `OK:<payload>` or `ERROR:<message>`, newline-framed. Every request
//! that reaches the server gets exactly one reply.
//!
//! ## Quick Start
//!
//! ```ignore
//! use beamlink::commands::CommandRegistry;
//! use beamlink::connection::{handle_connection, ConnectionStats};
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = Arc::new(CommandRegistry::with_builtins());
//!     let stats = Arc::new(ConnectionStats::new());
//!
//!     let listener = TcpListener::bind("127.0.0.1:5555").await.unwrap();
//!
//!     loop {
//!         let (stream, addr) = listener.accept().await.unwrap();
//!         let registry = Arc::clone(&registry);
//!         let stats = Arc::clone(&stats);
//!
//!         tokio::spawn(handle_connection(stream, addr, registry, stats));
//!     }
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: wire types, `cmd:arg,arg` decoding, reply markers, framing
//! - [`commands`]: command registry and the built-in instrument commands
//! - [`connection`]: server-side per-connection request loop
//! - [`client`]: controller-side stub with `ping()` / `collect_pedestal()`
//! - [`store`]: configuration store boundary and experiment metadata
//!
//! ## Concurrency Model
//!
//! Within one connection, requests are handled strictly in order and a
//! slow command (pedestal acquisition takes about a second) stalls that
//! connection for its duration; this is the intended trade-off for a
//! low-traffic instrument-control channel. Connections are served
//! concurrently; the registry is read-only after startup and safe to
//! share. There is no cancellation: a dispatched command always runs to
//! completion.

pub mod client;
pub mod commands;
pub mod connection;
pub mod protocol;
pub mod store;

// Re-export commonly used types for convenience
pub use client::{ClientError, CommandClient};
pub use commands::{Command, CommandError, CommandRegistry};
pub use connection::{handle_connection, ConnectionError, ConnectionStats};
pub use protocol::{LineCodec, Reply, Request};

/// The default port the command channel listens on
pub const DEFAULT_PORT: u16 = 5555;

/// The default host the server binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of beamlink
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
