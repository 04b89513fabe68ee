//! Session authority: who is authenticated, where, and how.

use std::fmt;

use crate::auth::AuthMechanism;

/// URI scheme of a POP session authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PopScheme {
    /// `pop://` — plain or STLS-upgraded connection.
    #[default]
    Pop,
    /// `pops://` — implicit TLS (secure-port) connection.
    Pops,
}

impl PopScheme {
    /// Returns the scheme as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pop => "pop",
            Self::Pops => "pops",
        }
    }

    /// Returns the default port for the scheme (110 or 995).
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Pop => 110,
            Self::Pops => 995,
        }
    }
}

/// The (scheme, host, port, user, mechanism) tuple identifying a
/// session.
///
/// Recomputed when the session enters the Authorization state (no user
/// yet) and again on successful login. Displayed as
/// `pop://[user[;AUTH=mech]@]host[:port]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authority {
    /// URI scheme; `pops` for secure-port connections.
    pub scheme: PopScheme,
    /// Server host name.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Authenticated user name, if any.
    pub username: Option<String>,
    /// Mechanism the user authenticated with, if any.
    pub mechanism: Option<AuthMechanism>,
}

impl Authority {
    /// Creates an authority with no authenticated user.
    #[must_use]
    pub const fn unauthenticated(scheme: PopScheme, host: String, port: u16) -> Self {
        Self {
            scheme,
            host,
            port,
            username: None,
            mechanism: None,
        }
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://", self.scheme.as_str())?;

        match (&self.username, &self.mechanism) {
            (Some(user), Some(mech)) => write!(f, "{user};AUTH={}@", mech.name())?,
            (Some(user), None) => write!(f, "{user}@")?,
            (None, Some(mech)) => write!(f, ";AUTH={}@", mech.name())?,
            (None, None) => {}
        }

        write!(f, "{}", self.host)?;

        if self.port != self.scheme.default_port() {
            write!(f, ":{}", self.port)?;
        }

        Ok(())
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
    fn display_unauthenticated() {
        let authority =
            Authority::unauthenticated(PopScheme::Pop, "pop.example.net".to_string(), 10110);
        assert_eq!(authority.to_string(), "pop://pop.example.net:10110");
    }

    #[test]
    fn display_default_port_is_omitted() {
        let authority =
            Authority::unauthenticated(PopScheme::Pop, "pop.example.net".to_string(), 110);
        assert_eq!(authority.to_string(), "pop://pop.example.net");
    }

    #[test]
    fn display_with_user_and_mechanism() {
        let authority = Authority {
            scheme: PopScheme::Pop,
            host: "pop.example.net".to_string(),
            port: 110,
            username: Some("mrose".to_string()),
            mechanism: Some(AuthMechanism::Apop),
        };
        assert_eq!(authority.to_string(), "pop://mrose;AUTH=+APOP@pop.example.net");
    }

    #[test]
    fn display_secure_port_scheme() {
        let authority = Authority {
            scheme: PopScheme::Pops,
            host: "pop.example.net".to_string(),
            port: 995,
            username: Some("mrose".to_string()),
            mechanism: None,
        };
        assert_eq!(authority.to_string(), "pops://mrose@pop.example.net");
    }
}
