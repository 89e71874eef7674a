//! Command Channel Wire Types
//!
//! This module defines the request and reply types exchanged over the
//! command channel, together with their text encoding.
//!
//! ## Protocol Format
//!
//! Requests are a command name, optionally followed by `:` and a
//! comma-separated argument list:
//!
//! - `ping`
//! - `collect_pedestal`
//! - `move:10,20`
//!
//! Replies carry a marker prefix distinguishing success from failure:
//!
//! - `OK:pong`
//! - `ERROR:Invalid command`
//!
//! The markers are part of the wire contract: every conformant server
//! produces exactly one `OK:` or `ERROR:` reply per request.

use std::fmt;

/// Separates the command name from its argument list.
pub const SEPARATOR: char = ':';

/// Separates individual arguments from each other.
pub const DELIMITER: char = ',';

/// Prefix of a successful reply.
pub const OK_MARKER: &str = "OK:";

/// Prefix of a failed reply.
pub const ERROR_MARKER: &str = "ERROR:";

/// A decoded command request: a name plus zero or more string arguments.
///
/// Requests are constructed by decoding a raw message and consumed
/// immediately by dispatch; they are never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Command name, matched case-sensitively against the registry.
    pub command: String,
    /// Ordered argument list, passed to the handler positionally.
    pub args: Vec<String>,
}

impl Request {
    /// Creates a request from a command name and arguments.
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    /// Decodes a raw message into a request.
    ///
    /// Decoding is total: every input string yields exactly one request.
    /// The message is split on the *first* separator; any further
    /// separators belong to the argument side. An argument side without a
    /// delimiter is a single argument, even when it is empty. Whitespace
    /// is preserved to keep exact-match semantics.
    ///
    /// # Example
    ///
    /// ```
    /// use beamlink::protocol::Request;
    ///
    /// let req = Request::decode("move:10,20");
    /// assert_eq!(req.command, "move");
    /// assert_eq!(req.args, vec!["10", "20"]);
    /// ```
    pub fn decode(message: &str) -> Self {
        match message.split_once(SEPARATOR) {
            Some((command, rest)) => Self {
                command: command.to_string(),
                args: rest.split(DELIMITER).map(str::to_string).collect(),
            },
            None => Self {
                command: message.to_string(),
                args: Vec::new(),
            },
        }
    }

    /// Encodes the request into its wire form.
    ///
    /// A request without arguments is just the command name.
    pub fn encode(&self) -> String {
        if self.args.is_empty() {
            self.command.clone()
        } else {
            format!("{}{}{}", self.command, SEPARATOR, self.args.join(","))
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            write!(f, "{}", self.command)
        } else {
            write!(f, "{}({})", self.command, self.args.join(", "))
        }
    }
}

/// The outcome of one request/reply exchange.
///
/// Produced by executing a handler or by dispatch failure; lives only for
/// the duration of the exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Successful execution, carrying the handler's payload.
    /// Wire form: `OK:<payload>`
    Ok(String),
    /// Failed execution or dispatch, carrying a human-readable message.
    /// Wire form: `ERROR:<message>`
    Error(String),
}

impl Reply {
    /// Creates a successful reply.
    pub fn ok(payload: impl Into<String>) -> Self {
        Reply::Ok(payload.into())
    }

    /// Creates an error reply.
    pub fn error(message: impl Into<String>) -> Self {
        Reply::Error(message.into())
    }

    /// The reply every unregistered command name resolves to.
    pub fn invalid_command() -> Self {
        Reply::Error("Invalid command".to_string())
    }

    /// Encodes the reply into its wire form, marker included.
    pub fn encode(&self) -> String {
        match self {
            Reply::Ok(payload) => format!("{OK_MARKER}{payload}"),
            Reply::Error(message) => format!("{ERROR_MARKER}{message}"),
        }
    }

    /// Decodes a raw reply line by its marker prefix.
    ///
    /// Returns `None` for a line carrying neither marker; the client
    /// surfaces such lines as malformed rather than guessing.
    pub fn decode(message: &str) -> Option<Self> {
        if let Some(payload) = message.strip_prefix(OK_MARKER) {
            Some(Reply::Ok(payload.to_string()))
        } else {
            message
                .strip_prefix(ERROR_MARKER)
                .map(|msg| Reply::Error(msg.to_string()))
        }
    }

    /// Returns true if this reply signals success.
    pub fn is_ok(&self) -> bool {
        matches!(self, Reply::Ok(_))
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_bare_command() {
        let req = Request::decode("ping");
        assert_eq!(req.command, "ping");
        assert!(req.args.is_empty());
    }

    #[test]
    fn test_decode_with_args() {
        let req = Request::decode("move:10,20");
        assert_eq!(req.command, "move");
        assert_eq!(req.args, vec!["10", "20"]);
    }

    #[test]
    fn test_decode_single_arg() {
        let req = Request::decode("set_tag:lysozyme");
        assert_eq!(req.command, "set_tag");
        assert_eq!(req.args, vec!["lysozyme"]);
    }

    #[test]
    fn test_decode_empty_message() {
        let req = Request::decode("");
        assert_eq!(req.command, "");
        assert!(req.args.is_empty());
    }

    #[test]
    fn test_decode_empty_arg_side() {
        // "cmd:" has an argument side: a single empty argument, not none.
        let req = Request::decode("cmd:");
        assert_eq!(req.command, "cmd");
        assert_eq!(req.args, vec![""]);
    }

    #[test]
    fn test_decode_extra_separators_stay_in_args() {
        let req = Request::decode("a:b:c");
        assert_eq!(req.command, "a");
        assert_eq!(req.args, vec!["b:c"]);
    }

    #[test]
    fn test_decode_preserves_whitespace() {
        let req = Request::decode(" ping ");
        assert_eq!(req.command, " ping ");
    }

    #[test]
    fn test_encode_round_trip() {
        let req = Request::new("move", vec!["10".into(), "20".into()]);
        assert_eq!(req.encode(), "move:10,20");
        assert_eq!(Request::decode(&req.encode()), req);
    }

    #[test]
    fn test_encode_no_args() {
        assert_eq!(Request::new("ping", vec![]).encode(), "ping");
    }

    #[test]
    fn test_reply_encode() {
        assert_eq!(Reply::ok("X").encode(), "OK:X");
        assert_eq!(Reply::error("Y").encode(), "ERROR:Y");
    }

    #[test]
    fn test_reply_decode() {
        assert_eq!(Reply::decode("OK:pong"), Some(Reply::ok("pong")));
        assert_eq!(
            Reply::decode("ERROR:Invalid command"),
            Some(Reply::invalid_command())
        );
        assert_eq!(Reply::decode("pong"), None);
    }

    #[test]
    fn test_reply_decode_empty_payload() {
        assert_eq!(Reply::decode("OK:"), Some(Reply::ok("")));
    }
}
