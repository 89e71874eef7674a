//! Command Registry and Dispatcher
//!
//! The registry owns the fixed set of executable commands and routes
//! decoded requests to the matching handler. It is populated at server
//! startup and read-only afterwards; lookup is by exact, case-sensitive
//! string match.
//!
//! Dispatch is total: every request yields exactly one [`Reply`], sent
//! only after the handler has fully completed. A handler that fails, or
//! even panics, becomes an `ERROR:` reply; it never takes the server
//! loop down with it.

use crate::protocol::{Reply, Request};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors a command handler can report.
///
/// These are handler-level failures: the command was found and invoked,
/// but could not complete. They reach the client as `ERROR:` replies.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommandError {
    /// The argument list does not match what the handler expects
    #[error("wrong number of arguments for '{command}': expected {expected}, got {got}")]
    WrongArity {
        command: &'static str,
        expected: usize,
        got: usize,
    },

    /// An argument was present but unusable
    #[error("invalid argument for '{command}': {reason}")]
    InvalidArgument {
        command: &'static str,
        reason: String,
    },

    /// The handler started but could not finish its work
    #[error("{0}")]
    Failed(String),
}

/// A named operation the server can execute.
///
/// Implementations are registered once at startup and shared across all
/// connections, so they must be `Send + Sync`. Handlers run to completion
/// before the reply is sent; a slow handler stalls its connection for the
/// duration, which is the intended behavior for instrument operations.
#[async_trait]
pub trait Command: Send + Sync {
    /// The wire name this command is invoked by.
    fn name(&self) -> &'static str;

    /// Executes the command with the request's positional arguments.
    async fn execute(&self, args: &[String]) -> Result<String, CommandError>;
}

/// Immutable mapping from command name to handler.
///
/// # Example
///
/// ```
/// use beamlink::commands::CommandRegistry;
/// use beamlink::protocol::Request;
///
/// # tokio_test::block_on(async {
/// let registry = CommandRegistry::with_builtins();
/// let reply = registry.dispatch(&Request::decode("ping")).await;
/// assert_eq!(reply.encode(), "OK:pong");
/// # });
/// ```
pub struct CommandRegistry {
    commands: HashMap<&'static str, Arc<dyn Command>>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// Creates a registry with the standard instrument command set.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(super::builtin::PingCommand));
        registry.register(Arc::new(super::builtin::CollectPedestalCommand::default()));
        registry
    }

    /// Registers a command handler.
    ///
    /// Construction time only: the registry is shared immutably (behind an
    /// `Arc`) once the server starts, so its shape never changes while
    /// requests are in flight. Registering a duplicate name replaces the
    /// earlier handler.
    pub fn register(&mut self, command: Arc<dyn Command>) {
        let name = command.name();
        if self.commands.insert(name, command).is_some() {
            warn!(command = name, "Replacing previously registered command");
        } else {
            debug!(command = name, "Registered command");
        }
    }

    /// Returns true if a command with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// The names of all registered commands, in no particular order.
    pub fn command_names(&self) -> Vec<&'static str> {
        self.commands.keys().copied().collect()
    }

    /// Resolves and executes a request, producing exactly one reply.
    ///
    /// An unregistered name yields `ERROR:Invalid command` without
    /// invoking anything. The handler runs on its own task so that a
    /// panic is confined there and surfaces as an `ERROR:` reply instead
    /// of tearing down the connection loop.
    pub async fn dispatch(&self, request: &Request) -> Reply {
        let Some(command) = self.commands.get(request.command.as_str()) else {
            debug!(command = %request.command, "Unknown command");
            return Reply::invalid_command();
        };

        let command = Arc::clone(command);
        let args = request.args.clone();
        let handler = tokio::spawn(async move { command.execute(&args).await });

        match handler.await {
            Ok(Ok(payload)) => Reply::Ok(payload),
            Ok(Err(e)) => {
                debug!(command = %request.command, error = %e, "Command failed");
                Reply::Error(e.to_string())
            }
            Err(e) if e.is_panic() => {
                warn!(command = %request.command, "Command handler panicked");
                Reply::Error(format!(
                    "command '{}' failed unexpectedly",
                    request.command
                ))
            }
            Err(_) => Reply::Error(format!("command '{}' was cancelled", request.command)),
        }
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingCommand {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Command for CountingCommand {
        fn name(&self) -> &'static str {
            "count"
        }

        async fn execute(&self, _args: &[String]) -> Result<String, CommandError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("counted".to_string())
        }
    }

    struct FailingCommand;

    #[async_trait]
    impl Command for FailingCommand {
        fn name(&self) -> &'static str {
            "fail"
        }

        async fn execute(&self, _args: &[String]) -> Result<String, CommandError> {
            Err(CommandError::Failed("detector offline".to_string()))
        }
    }

    struct PanickingCommand;

    #[async_trait]
    impl Command for PanickingCommand {
        fn name(&self) -> &'static str {
            "panic"
        }

        async fn execute(&self, _args: &[String]) -> Result<String, CommandError> {
            panic!("handler bug");
        }
    }

    struct EchoArgsCommand;

    #[async_trait]
    impl Command for EchoArgsCommand {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn execute(&self, args: &[String]) -> Result<String, CommandError> {
            Ok(args.join(";"))
        }
    }

    #[tokio::test]
    async fn test_dispatch_registered_command() {
        let registry = CommandRegistry::with_builtins();
        let reply = registry.dispatch(&Request::decode("ping")).await;
        assert_eq!(reply, Reply::ok("pong"));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_command() {
        let registry = CommandRegistry::with_builtins();
        let reply = registry.dispatch(&Request::decode("frobnicate")).await;
        assert_eq!(reply.encode(), "ERROR:Invalid command");
    }

    #[tokio::test]
    async fn test_dispatch_empty_command_name() {
        let registry = CommandRegistry::with_builtins();
        let reply = registry.dispatch(&Request::decode("")).await;
        assert_eq!(reply, Reply::invalid_command());
    }

    #[tokio::test]
    async fn test_unknown_command_has_no_side_effects() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(CountingCommand {
            calls: Arc::clone(&calls),
        }));

        let reply = registry.dispatch(&Request::decode("not_count")).await;
        assert_eq!(reply, Reply::invalid_command());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        registry.dispatch(&Request::decode("count")).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_handler_error_becomes_error_reply() {
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(FailingCommand));

        let reply = registry.dispatch(&Request::decode("fail")).await;
        assert_eq!(reply.encode(), "ERROR:detector offline");
    }

    #[tokio::test]
    async fn test_handler_panic_becomes_error_reply() {
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(PanickingCommand));

        let reply = registry.dispatch(&Request::decode("panic")).await;
        assert!(matches!(reply, Reply::Error(_)));

        // The registry stays usable after a panicking handler.
        registry.register(Arc::new(EchoArgsCommand));
        let reply = registry.dispatch(&Request::decode("echo:a,b")).await;
        assert_eq!(reply, Reply::ok("a;b"));
    }

    #[tokio::test]
    async fn test_args_passed_positionally() {
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(EchoArgsCommand));

        let reply = registry.dispatch(&Request::decode("echo:10,20,30")).await;
        assert_eq!(reply, Reply::ok("10;20;30"));
    }

    #[test]
    fn test_builtin_registry_shape() {
        let registry = CommandRegistry::with_builtins();
        assert!(registry.contains("ping"));
        assert!(registry.contains("collect_pedestal"));
        assert!(!registry.contains("PING"));
        assert_eq!(registry.command_names().len(), 2);
    }
}
