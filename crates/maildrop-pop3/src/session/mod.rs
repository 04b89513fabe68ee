//! The POP3 session: state machine plus the transaction engine.
//!
//! A [`PopSession`] owns at most one [`PopConnection`] and runs one
//! [`Transaction`] at a time. Each transaction is executed on a spawned
//! worker task that takes ownership of the connection for its duration;
//! the engine awaits the worker under the optional whole-transaction
//! deadline. On deadline expiry the worker is abandoned, never
//! cancelled, so no write is ever torn mid-line; the worker's own
//! per-operation I/O timeout bounds how long it can linger before the
//! socket is released.

#![allow(clippy::missing_errors_doc)]

mod authorization;
mod creator;
mod state;
mod transaction_state;

pub use creator::{CapaFailurePolicy, SessionProfile, create_session, negotiate};
pub use state::SessionState;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::command::Command;
use crate::connection::{Config, PopConnection, PopStream};
use crate::protocol::extract_timestamp;
use crate::transaction::{CommandResult, FinishedTransaction, Transaction};
use crate::types::{Authority, CapabilitySet, PopScheme};
use crate::{Error, Result};

/// A POP3 client session.
///
/// Operations return a [`CommandResult`] carrying the server's `+OK` or
/// `-ERR` as data; thrown errors are reserved for contract violations
/// (raised before any wire I/O) and for transport failures that force
/// the session back to [`SessionState::NotConnected`].
pub struct PopSession<S = PopStream> {
    connection: Option<PopConnection<S>>,
    state: SessionState,
    authority: Authority,
    capabilities: CapabilitySet,
    timestamp: Option<String>,
    transaction_timeout: Option<Duration>,
    strict_capabilities: bool,
    in_flight: Arc<AtomicBool>,
    last_user: Option<String>,
    disposed: bool,
}

impl PopSession<PopStream> {
    /// Connects per the configuration and reads the server greeting.
    pub async fn connect(config: &Config) -> Result<Self> {
        let connection = PopConnection::open(config).await?;
        Self::start(connection, config.transaction_timeout).await
    }
}

impl<S> PopSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Starts a session on an established connection: reads the
    /// greeting, captures the APOP timestamp if present, and enters the
    /// Authorization state.
    pub async fn start(
        connection: PopConnection<S>,
        transaction_timeout: Option<Duration>,
    ) -> Result<Self> {
        let scheme = if connection.is_secure_port() {
            PopScheme::Pops
        } else {
            PopScheme::Pop
        };
        let authority = Authority::unauthenticated(
            scheme,
            connection.host().to_string(),
            connection.port(),
        );

        let mut session = Self {
            connection: Some(connection),
            state: SessionState::NotConnected,
            authority,
            capabilities: CapabilitySet::empty(),
            timestamp: None,
            transaction_timeout,
            strict_capabilities: false,
            in_flight: Arc::new(AtomicBool::new(false)),
            last_user: None,
            disposed: false,
        };

        // A failure this early means the connection was never usable,
        // so even a deadline expiry surfaces as a connection error.
        let finished = match session.process(Transaction::greeting()).await {
            Ok(finished) => finished,
            Err(Error::Timeout(limit)) => {
                return Err(Error::ConnectionFailed(format!(
                    "greeting timed out after {limit:?}"
                )));
            }
            Err(error) => return Err(error),
        };

        if finished.result.failed() {
            session.teardown();
            return Err(Error::ConnectionFailed(format!(
                "server rejected connection: {}",
                finished.result.text()
            )));
        }

        session.timestamp = extract_timestamp(finished.result.text());
        session.state = SessionState::Authorization;
        tracing::debug!(
            authority = %session.authority,
            apop = session.timestamp.is_some(),
            "session established"
        );

        Ok(session)
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// The (scheme, host, port, user, mechanism) tuple identifying this
    /// session.
    #[must_use]
    pub const fn authority(&self) -> &Authority {
        &self.authority
    }

    /// The capability snapshot from the most recent CAPA.
    #[must_use]
    pub const fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    /// The APOP timestamp nonce from the greeting, if the server sent
    /// one.
    #[must_use]
    pub fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }

    /// Returns `true` if the greeting carried a timestamp, so APOP can
    /// be attempted.
    #[must_use]
    pub const fn apop_available(&self) -> bool {
        self.timestamp.is_some()
    }

    /// Server host name.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.authority.host
    }

    /// Server port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.authority.port
    }

    /// Returns `true` while a usable connection exists.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        !matches!(self.state, SessionState::NotConnected)
    }

    /// Returns `true` if the transport is encrypted.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(PopConnection::is_secure)
    }

    /// Bounds every subsequent transaction by the given deadline;
    /// `None` removes the bound.
    pub fn set_transaction_timeout(&mut self, timeout: Option<Duration>) {
        self.transaction_timeout = timeout;
    }

    /// When enabled, commands whose capability the server does not
    /// advertise fail with [`Error::Incapable`] before any bytes are
    /// sent. Disabled by default: servers may well accept commands they
    /// do not advertise.
    pub fn set_strict_capability_checking(&mut self, strict: bool) {
        self.strict_capabilities = strict;
    }

    /// Queries server capabilities and replaces the snapshot wholesale.
    ///
    /// A `-ERR` reply (CAPA is optional) empties the snapshot and is
    /// returned as data.
    pub async fn capa(&mut self) -> Result<CommandResult> {
        self.require_connected("CAPA")?;

        let finished = self.process(Transaction::command(Command::Capa)).await?;
        if finished.succeeded() {
            self.capabilities = CapabilitySet::parse(&finished.responses);
        } else {
            self.capabilities = CapabilitySet::empty();
        }

        Ok(finished.result)
    }

    /// Sends an arbitrary command, for server extensions not covered by
    /// the typed operations. Returns the result and any multi-line
    /// response lines.
    pub async fn generic_command(
        &mut self,
        verb: &str,
        arguments: Vec<String>,
        multiline: bool,
    ) -> Result<(CommandResult, Vec<String>)> {
        self.require_connected(verb)?;

        let finished = self
            .process(Transaction::command(Command::Generic {
                verb: verb.to_string(),
                arguments,
                multiline,
            }))
            .await?;

        Ok((finished.result, finished.responses))
    }

    /// Ends the session with QUIT and closes the connection.
    ///
    /// From the Transaction state the session passes through Update, so
    /// the server commits pending deletions. When already logged out
    /// this succeeds without any wire I/O.
    pub async fn quit(&mut self) -> Result<CommandResult> {
        self.check_disposed()?;

        if self.state == SessionState::NotConnected {
            return Ok(CommandResult::request_done("already logged out"));
        }

        if self.state == SessionState::Transaction {
            self.state = SessionState::Update;
        }

        let finished = self.process(Transaction::command(Command::Quit)).await?;

        if let Some(mut connection) = self.connection.take() {
            connection.shutdown().await;
        }
        self.state = SessionState::NotConnected;
        tracing::debug!(authority = %self.authority, "session closed");

        Ok(finished.result)
    }

    /// Closes the session, optionally logging out first, and disposes
    /// it. Every later operation fails with [`Error::Disposed`].
    /// Idempotent.
    pub async fn disconnect(&mut self, logout: bool) {
        if !self.disposed && logout && self.state != SessionState::NotConnected {
            // Best effort; the connection is going away either way.
            let _ = self.quit().await;
        }

        if let Some(mut connection) = self.connection.take() {
            connection.shutdown().await;
        }
        self.state = SessionState::NotConnected;
        self.disposed = true;
    }

    /// Runs one transaction under the engine's concurrency and deadline
    /// rules.
    pub(crate) async fn process(
        &mut self,
        transaction: Transaction,
    ) -> Result<FinishedTransaction> {
        self.check_disposed()?;

        if self.strict_capabilities {
            if let Some(tag) = transaction.required_capability() {
                if !self.capabilities.supports(tag) {
                    return Err(Error::Incapable(tag.to_string()));
                }
            }
        }

        // Strictly sequential: a concurrent attempt fails fast rather
        // than queueing. The flag is cleared by the worker, so it also
        // covers a worker abandoned by a deadline expiry.
        if self.in_flight.swap(true, Ordering::AcqRel) {
            return Err(Error::TransactionInProgress);
        }

        let Some(mut connection) = self.connection.take() else {
            self.in_flight.store(false, Ordering::Release);
            return Err(Error::InvalidState(
                "session is not connected".to_string(),
            ));
        };

        let in_flight = Arc::clone(&self.in_flight);
        let worker = tokio::spawn(async move {
            let finished = transaction.run(&mut connection).await;
            in_flight.store(false, Ordering::Release);
            (finished, connection)
        });

        let joined = match self.transaction_timeout {
            Some(limit) => match tokio::time::timeout(limit, worker).await {
                Ok(joined) => joined,
                Err(_) => {
                    // Abandon the worker, never cancel it: cancelling
                    // mid-write would tear a command line. Its own I/O
                    // timeout bounds how long it holds the socket.
                    tracing::warn!(?limit, "transaction deadline expired; abandoning worker");
                    self.teardown();
                    return Err(Error::Timeout(limit));
                }
            },
            None => worker.await,
        };

        match joined {
            Ok((finished, connection)) => {
                self.connection = Some(connection);
                self.post_process(finished)
            }
            Err(join_error) => {
                self.teardown();
                Err(Error::Protocol(format!(
                    "transaction worker failed: {join_error}"
                )))
            }
        }
    }

    /// Escalates transport-level result codes to thrown errors with a
    /// forced teardown; passes request-level outcomes through as data.
    fn post_process(&mut self, mut finished: FinishedTransaction) -> Result<FinishedTransaction> {
        if finished.result.code().escalates() {
            let error = finished.take_error();
            tracing::warn!(%error, "transaction escalated; closing connection");
            self.teardown();
            return Err(error);
        }

        Ok(finished)
    }

    /// Drops the connection, if any, and forces the session back to
    /// NotConnected. Synchronous: dropping the stream closes the
    /// socket.
    fn teardown(&mut self) {
        self.connection = None;
        self.state = SessionState::NotConnected;
    }

    /// Records a successful login and enters the Transaction state.
    fn mark_authenticated(
        &mut self,
        username: Option<String>,
        mechanism: Option<crate::auth::AuthMechanism>,
    ) {
        self.authority.username = username;
        self.authority.mechanism = mechanism;
        self.state = SessionState::Transaction;
        tracing::info!(authority = %self.authority, "authenticated");
    }

    fn check_disposed(&self) -> Result<()> {
        if self.disposed {
            Err(Error::Disposed)
        } else {
            Ok(())
        }
    }

    /// Contract check: the operation is only valid in `expected`.
    /// Raised before any wire I/O.
    fn require_state(&self, expected: SessionState, operation: &str) -> Result<()> {
        self.check_disposed()?;

        if self.state == expected {
            Ok(())
        } else {
            Err(Error::InvalidState(format!(
                "{operation} is valid only in the {expected} state; session is {}",
                self.state
            )))
        }
    }

    /// Contract check: any state with a live connection.
    fn require_connected(&self, operation: &str) -> Result<()> {
        self.check_disposed()?;

        if self.state == SessionState::NotConnected {
            Err(Error::InvalidState(format!(
                "{operation} requires an established session"
            )))
        } else {
            Ok(())
        }
    }
}

impl<S> std::fmt::Debug for PopSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PopSession")
            .field("authority", &self.authority.to_string())
            .field("state", &self.state)
            .field("connected", &self.connection.is_some())
            .finish_non_exhaustive()
    }
}
