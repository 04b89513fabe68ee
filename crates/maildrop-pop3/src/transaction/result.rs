//! Typed outcome of one transaction.

use std::fmt;

/// Result code of a completed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    /// The server answered `+OK`.
    RequestDone,
    /// The server answered `-ERR`; the connection remains usable.
    RequestError,
    /// Unexpected failure inside the engine; connection state unknown.
    InternalError,
    /// A socket read or write timed out.
    SocketTimeout,
    /// The connection was refused, lost, or closed mid-exchange.
    ConnectionError,
    /// The STLS re-handshake failed.
    UpgradeError,
}

impl ResultCode {
    /// Returns `true` for codes that leave the connection in an
    /// unknown or broken state and must escalate to a thrown error
    /// plus forced teardown.
    #[must_use]
    pub const fn escalates(self) -> bool {
        !matches!(self, Self::RequestDone | Self::RequestError)
    }
}

/// Immutable value describing how a transaction ended.
///
/// `RequestDone` and `RequestError` are data: an ordinary negative
/// server reply is not an error. The remaining codes are produced only
/// transiently before the engine escalates them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    code: ResultCode,
    text: String,
}

impl CommandResult {
    /// Creates a result.
    #[must_use]
    pub const fn new(code: ResultCode, text: String) -> Self {
        Self { code, text }
    }

    /// Creates a successful result with the given status text.
    #[must_use]
    pub fn request_done(text: impl Into<String>) -> Self {
        Self::new(ResultCode::RequestDone, text.into())
    }

    /// Creates a request-level failure with the given text.
    #[must_use]
    pub fn request_error(text: impl Into<String>) -> Self {
        Self::new(ResultCode::RequestError, text.into())
    }

    /// The result code.
    #[must_use]
    pub const fn code(&self) -> ResultCode {
        self.code
    }

    /// Server status text or engine description.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns `true` if the request completed with `+OK`.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        matches!(self.code, ResultCode::RequestDone)
    }

    /// Returns `true` if the request did not complete with `+OK`.
    #[must_use]
    pub const fn failed(&self) -> bool {
        !self.succeeded()
    }
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.text)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn succeeded_is_derived_from_code() {
        assert!(CommandResult::request_done("2 320").succeeded());
        assert!(CommandResult::request_error("no such message").failed());
    }

    #[test]
    fn escalation_classification() {
        assert!(!ResultCode::RequestDone.escalates());
        assert!(!ResultCode::RequestError.escalates());
        assert!(ResultCode::InternalError.escalates());
        assert!(ResultCode::SocketTimeout.escalates());
        assert!(ResultCode::ConnectionError.escalates());
        assert!(ResultCode::UpgradeError.escalates());
    }
}
