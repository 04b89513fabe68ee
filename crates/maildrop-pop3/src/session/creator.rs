//! Session establishment and authentication negotiation.
//!
//! [`create_session`] runs the full sequence: connect, greeting,
//! best-effort CAPA, opportunistic STLS, then authentication per the
//! profile's mechanism selection (RFC 2384 `;AUTH` semantics). Any
//! failure after the connection exists closes it before the error is
//! returned, so a creator never leaks a half-negotiated session.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::auth::{AuthMechanism, Credential, CredentialSource, MechanismRegistry};
use crate::connection::{Config, Security, StreamUpgrade};
use crate::session::PopSession;
use crate::{Error, Result};

/// Conventional trace identity for anonymous login (RFC 4505 §3).
const ANONYMOUS_TRACE: &str = "anonymous@";

/// What to do when the server rejects CAPA during negotiation.
///
/// CAPA is optional (RFC 2449), so rejection is tolerated by default;
/// selection then proceeds with an empty capability snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapaFailurePolicy {
    /// Continue with an empty capability snapshot.
    #[default]
    Ignore,
    /// Treat a rejected CAPA as a failed connection attempt.
    Fail,
}

/// Everything needed to establish and authenticate a session, short of
/// the secrets themselves.
#[derive(Debug, Clone)]
pub struct SessionProfile {
    /// Server host name.
    pub host: String,
    /// Server port; `None` uses the security mode's default.
    pub port: Option<u16>,
    /// Transport security mode.
    pub security: Security,
    /// Account user name; `None` requests anonymous access.
    pub username: Option<String>,
    /// Requested mechanism. `None` and
    /// [`AuthMechanism::SelectAppropriate`] both negotiate
    /// automatically; any other value is used without downgrade.
    pub mechanism: Option<AuthMechanism>,
    /// Acceptable SASL mechanism names for automatic selection, in
    /// preference order. `None` accepts any advertised mechanism in the
    /// server's order.
    pub sasl_mechanisms: Option<Vec<String>>,
    /// Permit mechanisms that reveal the password on an unencrypted
    /// connection. Off by default.
    pub allow_insecure_login: bool,
    /// Reaction to a rejected CAPA.
    pub capa_policy: CapaFailurePolicy,
    /// Connection-establishment timeout.
    pub connect_timeout: Duration,
    /// Per-read/write socket timeout.
    pub io_timeout: Duration,
    /// Whole-transaction deadline; `None` means unbounded.
    pub transaction_timeout: Option<Duration>,
}

impl SessionProfile {
    /// Creates a profile with opportunistic TLS and automatic mechanism
    /// selection.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            security: Security::default(),
            username: None,
            mechanism: None,
            sasl_mechanisms: None,
            allow_insecure_login: false,
            capa_policy: CapaFailurePolicy::default(),
            connect_timeout: Duration::from_secs(30),
            io_timeout: Duration::from_secs(60),
            transaction_timeout: None,
        }
    }

    /// The connection configuration this profile describes.
    #[must_use]
    pub fn config(&self) -> Config {
        let mut builder = Config::builder(self.host.clone())
            .security(self.security)
            .connect_timeout(self.connect_timeout)
            .io_timeout(self.io_timeout);
        if let Some(port) = self.port {
            builder = builder.port(port);
        }
        if let Some(timeout) = self.transaction_timeout {
            builder = builder.transaction_timeout(timeout);
        }
        builder.build()
    }
}

/// Connects, negotiates and authenticates a session per the profile.
///
/// On any negotiation failure the connection is closed (without QUIT;
/// the server state is not trusted at that point) before the error is
/// returned.
pub async fn create_session(
    profile: &SessionProfile,
    credentials: &dyn CredentialSource,
    registry: &MechanismRegistry,
) -> Result<PopSession> {
    let config = profile.config();
    let mut session = PopSession::connect(&config).await?;

    match negotiate(&mut session, profile, credentials, registry).await {
        Ok(()) => Ok(session),
        Err(error) => {
            session.disconnect(false).await;
            Err(error)
        }
    }
}

/// Runs CAPA, opportunistic STLS and authentication on an established
/// session. Exposed separately so pre-established connections can be
/// negotiated the same way.
pub async fn negotiate<S>(
    session: &mut PopSession<S>,
    profile: &SessionProfile,
    credentials: &dyn CredentialSource,
    registry: &MechanismRegistry,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + StreamUpgrade + 'static,
{
    refresh_capabilities(session, profile).await?;

    if profile.security == Security::OpportunisticTls && !session.is_secure() {
        if session.capabilities().supports("STLS") {
            let result = session.stls().await?;
            if result.failed() {
                // The server advertised STLS and then refused it; do
                // not continue in plaintext.
                return Err(Error::UpgradeFailed(format!(
                    "server refused STLS: {}",
                    result.text()
                )));
            }
            refresh_capabilities(session, profile).await?;
        } else {
            tracing::warn!(
                host = %profile.host,
                "server does not advertise STLS; continuing in plaintext"
            );
        }
    }

    authenticate(session, profile, credentials, registry).await
}

async fn refresh_capabilities<S>(
    session: &mut PopSession<S>,
    profile: &SessionProfile,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let result = session.capa().await?;

    if result.failed() {
        match profile.capa_policy {
            CapaFailurePolicy::Ignore => {
                tracing::debug!(text = result.text(), "CAPA rejected; continuing without");
            }
            CapaFailurePolicy::Fail => {
                return Err(Error::ConnectionFailed(format!(
                    "server rejected CAPA: {}",
                    result.text()
                )));
            }
        }
    }

    Ok(())
}

async fn authenticate<S>(
    session: &mut PopSession<S>,
    profile: &SessionProfile,
    credentials: &dyn CredentialSource,
    registry: &MechanismRegistry,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    match (&profile.mechanism, &profile.username) {
        // An explicitly requested ANONYMOUS never falls back; only the
        // derived anonymous path (no mechanism, no user) may.
        (Some(AuthMechanism::Anonymous), username) => {
            let trace = username.clone();
            authenticate_anonymous(session, registry, trace.as_deref(), false).await
        }
        (None, None) => authenticate_anonymous(session, registry, None, true).await,
        (Some(AuthMechanism::SelectAppropriate) | None, Some(username)) => {
            let username = username.clone();
            select_appropriate(session, profile, credentials, registry, &username).await
        }
        (Some(AuthMechanism::SelectAppropriate), None) => {
            select_appropriate_unnamed(session, profile, credentials, registry).await
        }
        (Some(mechanism), username) => {
            let mechanism = mechanism.clone();
            let username = username.clone();
            authenticate_explicit(session, credentials, registry, &mechanism, username.as_deref())
                .await
        }
    }
}

/// `;AUTH=*`: try the acceptable SASL mechanisms available in-process
/// and advertised by the server, then, when insecure login is
/// permitted, APOP (if the greeting carried a timestamp) and USER/PASS.
/// Plaintext mechanisms are skipped unless the connection is secure or
/// the profile allows insecure login; ANONYMOUS is never a candidate
/// here, it only runs through the anonymous path.
async fn select_appropriate<S>(
    session: &mut PopSession<S>,
    profile: &SessionProfile,
    credentials: &dyn CredentialSource,
    registry: &MechanismRegistry,
    username: &str,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let host = session.authority().host.clone();
    let port = session.authority().port;
    let allow_plaintext = session.is_secure() || profile.allow_insecure_login;

    let advertised: Vec<String> = session.capabilities().sasl_mechanisms().to_vec();
    let candidates: Vec<String> = match &profile.sasl_mechanisms {
        // The profile's preference order wins over the server's.
        Some(preferred) => preferred
            .iter()
            .filter(|name| advertised.iter().any(|a| a.eq_ignore_ascii_case(name)))
            .cloned()
            .collect(),
        None => advertised,
    };

    for name in &candidates {
        if !registry.contains(name) {
            continue;
        }

        let mechanism = AuthMechanism::named(name);
        if mechanism == AuthMechanism::Anonymous {
            continue;
        }
        if mechanism.is_plaintext() && !allow_plaintext {
            tracing::debug!(mechanism = %name, "skipping plaintext mechanism on insecure connection");
            continue;
        }

        let Some(credential) =
            credentials.lookup(&host, port, Some(username), Some(&mechanism))
        else {
            continue;
        };
        let Some(sasl) = registry.create(name, credential) else {
            continue;
        };

        let result = session.auth(sasl).await?;
        if result.succeeded() {
            return Ok(());
        }
        tracing::debug!(mechanism = %name, text = result.text(), "mechanism rejected; trying next");
    }

    if allow_plaintext && session.timestamp().is_some() {
        if let Some(credential) =
            credentials.lookup(&host, port, Some(username), Some(&AuthMechanism::Apop))
        {
            let result = session
                .apop(&credential.username, &credential.password)
                .await?;
            if result.succeeded() {
                return Ok(());
            }
            tracing::debug!(text = result.text(), "APOP rejected; trying next");
        }
    }

    if allow_plaintext {
        if let Some(credential) =
            credentials.lookup(&host, port, Some(username), Some(&AuthMechanism::Login))
        {
            let result = session
                .login(&credential.username, &credential.password)
                .await?;
            if result.succeeded() {
                return Ok(());
            }
            return Err(Error::Auth(format!(
                "authentication failed: {}",
                result.text()
            )));
        }
    }

    Err(Error::Auth(
        "no acceptable authentication mechanism succeeded".to_string(),
    ))
}

/// `;AUTH=*` without a user name: resolve the user name from the
/// credential source first, then select as usual.
async fn select_appropriate_unnamed<S>(
    session: &mut PopSession<S>,
    profile: &SessionProfile,
    credentials: &dyn CredentialSource,
    registry: &MechanismRegistry,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let host = session.authority().host.clone();
    let port = session.authority().port;

    let Some(credential) = credentials.lookup(&host, port, None, None) else {
        return Err(Error::Auth(
            "no credential found for automatic selection".to_string(),
        ));
    };

    let username = credential.username.clone();
    select_appropriate(session, profile, credentials, registry, &username).await
}

/// A mechanism named explicitly is used as-is, with no downgrade on
/// rejection and no veto: an insecure plaintext choice is the caller's
/// to make (RFC 2384 §4), it only draws a warning.
async fn authenticate_explicit<S>(
    session: &mut PopSession<S>,
    credentials: &dyn CredentialSource,
    registry: &MechanismRegistry,
    mechanism: &AuthMechanism,
    username: Option<&str>,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    if mechanism.is_plaintext() && !session.is_secure() {
        tracing::warn!(
            mechanism = %mechanism.name(),
            "plaintext mechanism requested on an insecure connection"
        );
    }

    let host = session.authority().host.clone();
    let port = session.authority().port;
    let Some(credential) = credentials.lookup(&host, port, username, Some(mechanism)) else {
        return Err(Error::Auth(format!(
            "no credential found for {}",
            mechanism.name()
        )));
    };

    let result = match mechanism {
        AuthMechanism::Apop => {
            session
                .apop(&credential.username, &credential.password)
                .await?
        }
        AuthMechanism::Login => {
            session
                .login(&credential.username, &credential.password)
                .await?
        }
        other => {
            let Some(sasl) = registry.create(other.name(), credential) else {
                return Err(Error::Auth(format!(
                    "mechanism {} is not available in this process",
                    other.name()
                )));
            };
            session.auth(sasl).await?
        }
    };

    if result.succeeded() {
        Ok(())
    } else {
        Err(Error::Auth(format!(
            "authentication failed: {}",
            result.text()
        )))
    }
}

/// Anonymous access: SASL ANONYMOUS when both sides support it, with a
/// fallback to USER/PASS using the `anonymous` identity. The profile's
/// user name, when present, is the trace identity. A rejected AUTH
/// ANONYMOUS falls back only when the anonymous path was derived rather
/// than requested; when the server does not advertise ANONYMOUS the
/// USER/PASS form is the only option and is always tried. No secret is
/// revealed either way, so the insecure-login gate does not apply.
async fn authenticate_anonymous<S>(
    session: &mut PopSession<S>,
    registry: &MechanismRegistry,
    trace: Option<&str>,
    fallback_permitted: bool,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let trace = trace.unwrap_or(ANONYMOUS_TRACE);

    if session.capabilities().supports_sasl("ANONYMOUS") && registry.contains("ANONYMOUS") {
        if let Some(sasl) = registry.create("ANONYMOUS", Credential::anonymous(trace)) {
            let result = session.auth(sasl).await?;
            if result.succeeded() {
                return Ok(());
            }
            if !fallback_permitted {
                return Err(Error::Auth(format!(
                    "anonymous authentication rejected: {}",
                    result.text()
                )));
            }
            tracing::debug!(text = result.text(), "ANONYMOUS rejected; falling back to USER/PASS");
        }
    }

    let result = session.login("anonymous", trace).await?;
    if result.succeeded() {
        Ok(())
    } else {
        Err(Error::Auth(format!(
            "anonymous login rejected: {}",
            result.text()
        )))
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
    fn profile_defaults() {
        let profile = SessionProfile::new("pop.example.net");
        assert_eq!(profile.security, Security::OpportunisticTls);
        assert_eq!(profile.capa_policy, CapaFailurePolicy::Ignore);
        assert!(!profile.allow_insecure_login);
        assert_eq!(profile.mechanism, None);

        let config = profile.config();
        assert_eq!(config.port, 110);
    }

    #[test]
    fn profile_config_honors_port_and_security() {
        let mut profile = SessionProfile::new("pop.example.net");
        profile.security = Security::Implicit;
        assert_eq!(profile.config().port, 995);

        profile.port = Some(10995);
        assert_eq!(profile.config().port, 10995);
    }
}
