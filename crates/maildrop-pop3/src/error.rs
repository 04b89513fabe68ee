//! Error types for the POP3 library.
//!
//! Errors fall into two disjoint channels. Programming-contract
//! violations ([`Error::InvalidState`], [`Error::Disposed`],
//! [`Error::TransactionInProgress`], [`Error::InvalidArgument`],
//! [`Error::Incapable`]) are raised before any bytes touch the wire.
//! Transport and protocol failures that leave the connection in an
//! unknown state escalate to the remaining variants together with a
//! forced session teardown. An ordinary `-ERR` reply is *not* an error;
//! it is returned as data in a
//! [`CommandResult`](crate::transaction::CommandResult).

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during POP3 operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake or encryption error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Invalid DNS name for TLS.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Connection could not be established or was lost.
    #[error("Connection error: {0}")]
    ConnectionFailed(String),

    /// STLS upgrade failed; the stream state is unknown.
    #[error("Connection upgrade failed: {0}")]
    UpgradeFailed(String),

    /// Operation timed out.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Authentication failed after exhausting every candidate mechanism.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Malformed or unexpected data from the server.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Command issued in a session state where it is not valid.
    ///
    /// This is a contract fault, distinct from a failed server
    /// response; nothing is sent on the wire.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Session has already been disposed.
    #[error("Session has been disposed")]
    Disposed,

    /// A second transaction was started while one is in flight.
    ///
    /// Transactions on one session are strictly sequential; a
    /// concurrent attempt fails fast, it never queues.
    #[error("Another transaction is in progress")]
    TransactionInProgress,

    /// Malformed argument (for example a zero message number).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The server does not advertise a capability required by the
    /// command, and strict capability checking is enabled.
    #[error("Server is not capable of {0}")]
    Incapable(String),
}

impl Error {
    /// Returns `true` if this error is a programming-contract violation
    /// rather than a transport or protocol failure.
    #[must_use]
    pub const fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::InvalidState(_)
                | Self::Disposed
                | Self::TransactionInProgress
                | Self::InvalidArgument(_)
                | Self::Incapable(_)
        )
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

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
    fn contract_violations_are_classified() {
        assert!(Error::Disposed.is_contract_violation());
        assert!(Error::TransactionInProgress.is_contract_violation());
        assert!(Error::InvalidState("not connected".into()).is_contract_violation());
        assert!(Error::InvalidArgument("message number".into()).is_contract_violation());
        assert!(Error::Incapable("STLS".into()).is_contract_violation());
    }

    #[test]
    fn transport_failures_are_not_contract_violations() {
        assert!(!Error::Timeout(Duration::from_secs(1)).is_contract_violation());
        assert!(!Error::ConnectionFailed("refused".into()).is_contract_violation());
        assert!(!Error::Protocol("garbage".into()).is_contract_violation());
    }
}
