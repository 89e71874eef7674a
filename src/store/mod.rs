//! Configuration Store
//!
//! Shared experiment metadata lives in a central key-value store so every
//! machine in the setup agrees on who is measuring, where data goes, and
//! what files are called. This module is the client-side boundary to that
//! store:
//!
//! - [`KvStore`]: the three operations the metadata layer needs
//!   (get/set/atomic increment), behind a trait so backends swap freely
//! - [`MemoryStore`]: in-process backend for tests and single-machine runs
//! - [`RedisStore`]: networked backend speaking a minimal RESP dialect
//! - [`ExperimentConfig`]: typed accessors over a store handle
//! - [`paths`]: pure derivation of data directories and filenames
//!
//! The command channel has no dependency on any of this; a deployment
//! wires the two together.
//!
//! ## Ownership
//!
//! A store handle is opened once, injected into whatever needs it
//! (`Arc<dyn KvStore>`), and closed when the last owner drops it. There
//! is no process-global client object.

pub mod experiment;
pub mod memory;
pub mod paths;
pub mod resp;

use async_trait::async_trait;
use thiserror::Error;

// Re-export the store surface
pub use experiment::{ExperimentClass, ExperimentConfig};
pub use memory::MemoryStore;
pub use resp::RedisStore;

/// Errors from the configuration store boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport failure talking to the store backend
    #[error("store transport error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend sent something the client cannot interpret
    #[error("store protocol error: {0}")]
    Protocol(String),

    /// The backend answered with an error of its own
    #[error("store error: {0}")]
    Server(String),

    /// A required key has never been set
    #[error("'{0}' not set")]
    KeyNotSet(String),

    /// A key holds a value the schema cannot accept
    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

/// The store operations the experiment metadata layer relies on.
///
/// Values are UTF-8 strings keyed by fixed names; `incr` must be atomic
/// with respect to other clients of the same backend, since the file
/// counter is shared between machines.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Reads a key. `None` means the key was never set.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes a key, overwriting any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Atomically increments an integer key and returns the new value.
    /// A missing key counts as zero.
    async fn incr(&self, key: &str) -> Result<i64, StoreError>;
}
