//! Authorization-state operations: STLS and the login family.
//!
//! USER/PASS, APOP and AUTH all share one quirk inherited from RFC
//! 1939: calling them on an already-authenticated session is not a
//! contract violation, it returns a success-shaped result without any
//! wire I/O, so retry loops in callers stay simple.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::auth::{
    AuthMechanism, CredentialSource, MechanismRegistry, SaslMechanism, apop_digest,
};
use crate::command::Command;
use crate::connection::StreamUpgrade;
use crate::session::{PopSession, SessionState};
use crate::transaction::{CommandResult, Transaction};
use crate::types::CapabilitySet;
use crate::{Error, Result};

impl<S> PopSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Presents a user name with USER.
    ///
    /// The name is remembered so a following [`pass`](Self::pass) can
    /// complete the login.
    pub async fn user(&mut self, username: &str) -> Result<CommandResult> {
        if let Some(result) = self.already_authenticated()? {
            return Ok(result);
        }
        self.require_state(SessionState::Authorization, "USER")?;

        let finished = self
            .process(Transaction::command(Command::User {
                name: username.to_string(),
            }))
            .await?;

        if finished.succeeded() {
            self.last_user = Some(username.to_string());
        }

        Ok(finished.result)
    }

    /// Presents the password for a preceding USER.
    ///
    /// Fails with a contract error, before any wire I/O, when no USER
    /// has been accepted in this session.
    pub async fn pass(&mut self, secret: &str) -> Result<CommandResult> {
        if let Some(result) = self.already_authenticated()? {
            return Ok(result);
        }
        self.require_state(SessionState::Authorization, "PASS")?;

        let Some(username) = self.last_user.clone() else {
            return Err(Error::InvalidState(
                "issue USER command first".to_string(),
            ));
        };

        let finished = self
            .process(Transaction::command(Command::Pass {
                secret: secret.to_string(),
            }))
            .await?;

        if finished.succeeded() {
            self.mark_authenticated(Some(username), Some(AuthMechanism::Login));
        }

        Ok(finished.result)
    }

    /// USER/PASS login in one call. A rejected USER is returned as-is;
    /// PASS is only sent after USER succeeds.
    pub async fn login(&mut self, username: &str, secret: &str) -> Result<CommandResult> {
        let result = self.user(username).await?;
        if result.failed() {
            return Ok(result);
        }
        self.pass(secret).await
    }

    /// APOP digest login (RFC 1939 §7).
    ///
    /// Requires the greeting to have carried a timestamp nonce; without
    /// one the server cannot verify the digest and the call fails
    /// before any wire I/O.
    pub async fn apop(&mut self, username: &str, secret: &str) -> Result<CommandResult> {
        if let Some(result) = self.already_authenticated()? {
            return Ok(result);
        }
        self.require_state(SessionState::Authorization, "APOP")?;

        let Some(timestamp) = self.timestamp().map(str::to_string) else {
            return Err(Error::Incapable(
                "APOP (greeting carried no timestamp)".to_string(),
            ));
        };

        let digest = apop_digest(&timestamp, secret);
        let finished = self
            .process(Transaction::command(Command::Apop {
                name: username.to_string(),
                digest,
            }))
            .await?;

        if finished.succeeded() {
            self.mark_authenticated(Some(username.to_string()), Some(AuthMechanism::Apop));
        }

        Ok(finished.result)
    }

    /// SASL AUTH with the given mechanism instance (RFC 5034).
    ///
    /// The transaction layer drives the base64 challenge/response loop
    /// until the server settles on a status.
    pub async fn auth(&mut self, mechanism: Box<dyn SaslMechanism + Send>) -> Result<CommandResult> {
        if let Some(result) = self.already_authenticated()? {
            return Ok(result);
        }
        self.require_state(SessionState::Authorization, "AUTH")?;

        let username = mechanism.username().map(str::to_string);
        let name = mechanism.name().to_string();

        let finished = self.process(Transaction::auth(mechanism)).await?;

        if finished.succeeded() {
            self.mark_authenticated(username, Some(AuthMechanism::named(&name)));
        }

        Ok(finished.result)
    }

    /// Authenticates with a mechanism chosen by name, resolving the
    /// credential through the source.
    ///
    /// A failed credential lookup is a request-level failure, not a
    /// thrown error; an unimplemented mechanism is reported as a
    /// capability problem.
    pub async fn authenticate(
        &mut self,
        mechanism: &AuthMechanism,
        credentials: &dyn CredentialSource,
        registry: &MechanismRegistry,
    ) -> Result<CommandResult> {
        if let Some(result) = self.already_authenticated()? {
            return Ok(result);
        }
        self.require_state(SessionState::Authorization, "authentication")?;

        let host = self.authority.host.clone();
        let port = self.authority.port;
        let Some(credential) = credentials.lookup(&host, port, None, Some(mechanism)) else {
            return Ok(CommandResult::request_error(format!(
                "no credential found for {}",
                mechanism.name()
            )));
        };

        match mechanism {
            AuthMechanism::Apop => self.apop(&credential.username, &credential.password).await,
            AuthMechanism::Login => {
                self.login(&credential.username, &credential.password).await
            }
            other => {
                let Some(sasl) = registry.create(other.name(), credential) else {
                    return Err(Error::Incapable(format!(
                        "SASL mechanism {}",
                        other.name()
                    )));
                };
                self.auth(sasl).await
            }
        }
    }

    fn already_authenticated(&self) -> Result<Option<CommandResult>> {
        self.check_disposed()?;

        if matches!(
            self.state(),
            SessionState::Transaction | SessionState::Update
        ) {
            Ok(Some(CommandResult::request_done("already authenticated")))
        } else {
            Ok(None)
        }
    }
}

impl<S> PopSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + StreamUpgrade + 'static,
{
    /// Upgrades the connection in place with STLS (RFC 2595).
    ///
    /// On a positive reply the capability snapshot is discarded before
    /// the handshake: capabilities advertised in plaintext no longer
    /// apply, and the caller must re-issue CAPA on the secured
    /// connection. A negative reply leaves the plaintext connection
    /// usable and is returned as data; a handshake failure tears the
    /// session down.
    pub async fn stls(&mut self) -> Result<CommandResult> {
        self.require_state(SessionState::Authorization, "STLS")?;

        if self.is_secure() {
            return Err(Error::InvalidState(
                "connection is already encrypted".to_string(),
            ));
        }

        let finished = self.process(Transaction::command(Command::Stls)).await?;
        if finished.result.failed() {
            return Ok(finished.result);
        }

        self.capabilities = CapabilitySet::empty();

        let Some(connection) = self.connection.take() else {
            return Err(Error::InvalidState(
                "session is not connected".to_string(),
            ));
        };

        match connection.upgrade_to_tls().await {
            Ok(upgraded) => {
                self.connection = Some(upgraded);
                tracing::debug!(authority = %self.authority, "connection upgraded to TLS");
                Ok(finished.result)
            }
            Err(error) => {
                self.teardown();
                Err(Error::UpgradeFailed(error.to_string()))
            }
        }
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
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    use super::*;
    use crate::types::{Authority, PopScheme};

    fn session_in(state: SessionState) -> PopSession<tokio::io::DuplexStream> {
        PopSession {
            connection: None,
            state,
            authority: Authority::unauthenticated(
                PopScheme::Pop,
                "pop.example.net".to_string(),
                110,
            ),
            capabilities: CapabilitySet::empty(),
            timestamp: None,
            transaction_timeout: None,
            strict_capabilities: false,
            in_flight: Arc::new(AtomicBool::new(false)),
            last_user: None,
            disposed: false,
        }
    }

    #[tokio::test]
    async fn login_ops_report_already_authenticated_in_update_state() {
        let mut session = session_in(SessionState::Update);

        // No connection exists; anything but the short-circuit would
        // fail with a missing-connection error.
        let result = session.user("mrose").await.unwrap();
        assert!(result.succeeded());
        assert_eq!(result.text(), "already authenticated");

        let result = session.pass("secret").await.unwrap();
        assert_eq!(result.text(), "already authenticated");
    }
}
