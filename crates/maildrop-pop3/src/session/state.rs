//! Session lifecycle states.

use std::fmt;

/// Lifecycle state of a POP3 session (RFC 1939 §3).
///
/// Exactly one value at any time; every operation declares which states
/// it is valid in and fails with a contract error, before any wire I/O,
/// from the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No usable connection: before the greeting, or after QUIT,
    /// disconnect, or a forced teardown.
    NotConnected,
    /// Greeting received, not yet authenticated.
    Authorization,
    /// Authenticated; maildrop commands are available.
    Transaction,
    /// QUIT issued from the Transaction state; the server commits
    /// deletions and closes.
    Update,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotConnected => "not-connected",
            Self::Authorization => "authorization",
            Self::Transaction => "transaction",
            Self::Update => "update",
        };
        f.write_str(name)
    }
}
