//! beamlink - Instrument Command Channel Server
//!
//! Main entry point for the command channel server. Sets up the TCP
//! listener and the command registry, then serves connections until
//! shutdown.

use beamlink::commands::CommandRegistry;
use beamlink::connection::{handle_connection, ConnectionStats};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Server configuration
#[derive(Debug, PartialEq)]
struct Config {
    /// Host to bind to
    host: String,
    /// Port to listen on
    port: u16,
}

/// What the command line asks the process to do
#[derive(Debug, PartialEq)]
enum Action {
    Run(Config),
    ShowHelp,
    ShowVersion,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: beamlink::DEFAULT_HOST.to_string(),
            port: beamlink::DEFAULT_PORT,
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let args: Vec<String> = std::env::args().collect();
        match Config::parse(&args) {
            Ok(Action::Run(config)) => config,
            Ok(Action::ShowHelp) => {
                print_help();
                std::process::exit(0);
            }
            Ok(Action::ShowVersion) => {
                println!("beamlink version {}", beamlink::VERSION);
                std::process::exit(0);
            }
            Err(message) => {
                eprintln!("Error: {message}");
                print_help();
                std::process::exit(1);
            }
        }
    }

    /// Parses an argument vector into the requested action.
    ///
    /// Split from [`from_args`](Self::from_args) so parsing stays
    /// testable; this function never exits the process.
    fn parse(args: &[String]) -> Result<Action, String> {
        let mut config = Config::default();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" => {
                    if i + 1 < args.len() {
                        config.host = args[i + 1].clone();
                        i += 2;
                    } else {
                        return Err("--host requires a value".to_string());
                    }
                }
                "--port" | "-p" => {
                    if i + 1 < args.len() {
                        config.port = args[i + 1]
                            .parse()
                            .map_err(|_| format!("invalid port number: {}", args[i + 1]))?;
                        i += 2;
                    } else {
                        return Err("--port requires a value".to_string());
                    }
                }
                "--help" | "-h" => return Ok(Action::ShowHelp),
                "--version" | "-v" => return Ok(Action::ShowVersion),
                other => return Err(format!("unknown argument: {other}")),
            }
        }

        Ok(Action::Run(config))
    }

    /// Returns the bind address as a string
    fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn print_help() {
    println!(
        r#"
beamlink - Instrument Command Channel Server

USAGE:
    beamlink [OPTIONS]

OPTIONS:
        --host <HOST>    Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>    Port to listen on (default: 5555)
    -v, --version        Print version information
    -h, --help           Print this help message

EXAMPLES:
    beamlink                       # Start on 127.0.0.1:5555
    beamlink --port 5556           # Start on port 5556
    beamlink --host 0.0.0.0        # Listen on all interfaces

CONNECTING:
    Requests are newline-terminated text; try it with netcat:
    $ nc 127.0.0.1 5555
    ping
    OK:pong
    collect_pedestal
    OK:Pedestal collected
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = Config::from_args();

    // Set up logging
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    info!("beamlink v{} starting", beamlink::VERSION);

    // Build the command registry (read-only after this point)
    let registry = Arc::new(CommandRegistry::with_builtins());
    info!(
        commands = ?registry.command_names(),
        "Command registry initialized"
    );

    // Create connection statistics
    let stats = Arc::new(ConnectionStats::new());

    // Bind the TCP listener
    let listener = TcpListener::bind(config.bind_address()).await?;
    info!("Listening on {}", config.bind_address());

    // Set up graceful shutdown
    let shutdown = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Shutdown signal received, stopping server...");
    };

    // Main accept loop
    tokio::select! {
        _ = accept_loop(listener, registry, stats) => {}
        _ = shutdown => {}
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Main loop that accepts incoming connections
async fn accept_loop(
    listener: TcpListener,
    registry: Arc<CommandRegistry>,
    stats: Arc<ConnectionStats>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let registry = Arc::clone(&registry);
                let stats = Arc::clone(&stats);

                // Spawn a task to handle this connection
                tokio::spawn(async move {
                    handle_connection(stream, addr, registry, stats).await;
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_defaults() {
        let action = Config::parse(&argv(&["beamlink"])).unwrap();
        assert_eq!(action, Action::Run(Config::default()));
    }

    #[test]
    fn test_parse_host_and_port() {
        let action =
            Config::parse(&argv(&["beamlink", "--host", "0.0.0.0", "-p", "5556"])).unwrap();
        assert_eq!(
            action,
            Action::Run(Config {
                host: "0.0.0.0".to_string(),
                port: 5556,
            })
        );
    }

    #[test]
    fn test_short_h_means_help_not_host() {
        let action = Config::parse(&argv(&["beamlink", "-h"])).unwrap();
        assert_eq!(action, Action::ShowHelp);

        // Only the long flag takes a host value.
        let action = Config::parse(&argv(&["beamlink", "--help"])).unwrap();
        assert_eq!(action, Action::ShowHelp);
    }

    #[test]
    fn test_parse_version() {
        let action = Config::parse(&argv(&["beamlink", "-v"])).unwrap();
        assert_eq!(action, Action::ShowVersion);
    }

    #[test]
    fn test_parse_missing_values() {
        assert!(Config::parse(&argv(&["beamlink", "--host"])).is_err());
        assert!(Config::parse(&argv(&["beamlink", "--port"])).is_err());
    }

    #[test]
    fn test_parse_bad_port() {
        let err = Config::parse(&argv(&["beamlink", "--port", "not-a-port"])).unwrap_err();
        assert!(err.contains("invalid port number"));
    }

    #[test]
    fn test_parse_unknown_argument() {
        let err = Config::parse(&argv(&["beamlink", "--frobnicate"])).unwrap_err();
        assert!(err.contains("unknown argument"));
    }

    #[test]
    fn test_bind_address() {
        assert_eq!(Config::default().bind_address(), "127.0.0.1:5555");
    }
}
