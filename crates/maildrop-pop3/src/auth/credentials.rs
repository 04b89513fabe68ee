//! Credentials and credential lookup.

use super::AuthMechanism;

/// A username/password pair.
///
/// Credentials are read-only values; the session never takes ownership
/// of a credential store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// User name.
    pub username: String,
    /// Password or shared secret.
    pub password: String,
}

impl Credential {
    /// Creates a credential.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Creates an anonymous credential with the given trace identity.
    #[must_use]
    pub fn anonymous(trace: impl Into<String>) -> Self {
        Self {
            username: "anonymous".to_string(),
            password: trace.into(),
        }
    }
}

/// A host/realm/mechanism-aware credential lookup.
///
/// The session resolves a credential through this trait before every
/// authentication attempt; a `None` return is reported as a
/// request-level failure, not a thrown error.
pub trait CredentialSource {
    /// Looks up a credential for the given endpoint, user name and
    /// mechanism. Any of `username` and `mechanism` may be absent.
    fn lookup(
        &self,
        host: &str,
        port: u16,
        username: Option<&str>,
        mechanism: Option<&AuthMechanism>,
    ) -> Option<Credential>;
}

/// A single credential acts as its own source: it matches any host and
/// mechanism, and any username equal to its own (or none).
impl CredentialSource for Credential {
    fn lookup(
        &self,
        _host: &str,
        _port: u16,
        username: Option<&str>,
        _mechanism: Option<&AuthMechanism>,
    ) -> Option<Credential> {
        match username {
            Some(name) if name != self.username => None,
            _ => Some(self.clone()),
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
    use super::*;

    #[test]
    fn credential_is_its_own_source() {
        let cred = Credential::new("mrose", "tanstaaf");

        assert_eq!(
            cred.lookup("pop.example.net", 110, None, None),
            Some(cred.clone())
        );
        assert_eq!(
            cred.lookup("pop.example.net", 110, Some("mrose"), None),
            Some(cred.clone())
        );
        assert_eq!(cred.lookup("pop.example.net", 110, Some("other"), None), None);
    }

    #[test]
    fn anonymous_credential() {
        let cred = Credential::anonymous("anonymous@");
        assert_eq!(cred.username, "anonymous");
        assert_eq!(cred.password, "anonymous@");
    }
}
