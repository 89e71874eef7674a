//! Built-in Instrument Commands
//!
//! The standard command set every beamlink server answers:
//!
//! - `ping` - liveness check, replies `OK:pong`
//! - `collect_pedestal` - pedestal acquisition, replies `OK:Pedestal collected`
//!   after the acquisition delay
//!
//! `collect_pedestal` models the detector operation: the real
//! implementation would trigger hardware and block for the acquisition
//! time. Swapping it in changes nothing about the dispatch contract, so
//! the simulation keeps the same shape, a fixed delay followed by a fixed
//! payload.

use super::registry::{Command, CommandError};
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

/// How long a pedestal acquisition takes.
pub const PEDESTAL_ACQUISITION_DELAY: Duration = Duration::from_secs(1);

fn expect_no_args(command: &'static str, args: &[String]) -> Result<(), CommandError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(CommandError::WrongArity {
            command,
            expected: 0,
            got: args.len(),
        })
    }
}

/// Liveness command: answers `pong` immediately.
pub struct PingCommand;

#[async_trait]
impl Command for PingCommand {
    fn name(&self) -> &'static str {
        "ping"
    }

    async fn execute(&self, args: &[String]) -> Result<String, CommandError> {
        expect_no_args(self.name(), args)?;
        Ok("pong".to_string())
    }
}

/// Pedestal acquisition command.
///
/// Sleeps for the acquisition delay, then reports success. The delay is
/// injectable so tests don't have to wait out the full second.
pub struct CollectPedestalCommand {
    delay: Duration,
}

impl CollectPedestalCommand {
    /// Creates the command with a custom acquisition delay.
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for CollectPedestalCommand {
    fn default() -> Self {
        Self {
            delay: PEDESTAL_ACQUISITION_DELAY,
        }
    }
}

#[async_trait]
impl Command for CollectPedestalCommand {
    fn name(&self) -> &'static str {
        "collect_pedestal"
    }

    async fn execute(&self, args: &[String]) -> Result<String, CommandError> {
        expect_no_args(self.name(), args)?;
        info!(delay_ms = self.delay.as_millis() as u64, "Collecting pedestal");
        tokio::time::sleep(self.delay).await;
        Ok("Pedestal collected".to_string())
    }
}
