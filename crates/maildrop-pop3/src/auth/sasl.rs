//! SASL client mechanisms for the AUTH command (RFC 5034).
//!
//! Implements the built-in non-cryptographic mechanisms:
//! - PLAIN (RFC 4616)
//! - LOGIN (draft-murchison-sasl-login)
//! - ANONYMOUS (RFC 4505)
//!
//! Other mechanisms can be added through [`MechanismRegistry`], an
//! explicit name-to-factory map built at startup. Nothing here scans
//! types at runtime.

use std::collections::HashMap;

use crate::{Error, Result};

use super::Credential;

/// A client-side SASL mechanism driven by the AUTH exchange.
///
/// The transaction layer base64-encodes responses and decodes
/// challenges; implementations deal in raw bytes only.
pub trait SaslMechanism: Send {
    /// Mechanism name as sent in the AUTH command.
    fn name(&self) -> &str;

    /// Returns `true` if the exchange reveals the password to an
    /// eavesdropper.
    fn is_plaintext(&self) -> bool {
        false
    }

    /// The authenticated user name, recorded in the session authority
    /// on success.
    fn username(&self) -> Option<&str>;

    /// Initial client response for client-first mechanisms, sent with
    /// the AUTH command itself to save a round trip.
    fn initial_response(&mut self) -> Option<Vec<u8>>;

    /// Responds to a decoded server challenge.
    fn respond(&mut self, challenge: &[u8]) -> Result<Vec<u8>>;
}

/// SASL PLAIN: single client-first message
/// `authzid NUL authcid NUL password`.
pub struct PlainMechanism {
    credential: Credential,
}

impl PlainMechanism {
    /// Creates a PLAIN mechanism for the given credential.
    #[must_use]
    pub const fn new(credential: Credential) -> Self {
        Self { credential }
    }
}

impl SaslMechanism for PlainMechanism {
    fn name(&self) -> &str {
        "PLAIN"
    }

    fn is_plaintext(&self) -> bool {
        true
    }

    fn username(&self) -> Option<&str> {
        Some(&self.credential.username)
    }

    fn initial_response(&mut self) -> Option<Vec<u8>> {
        // Empty authorization identity: act as the authentication identity.
        let response = format!(
            "\0{}\0{}",
            self.credential.username, self.credential.password
        );
        Some(response.into_bytes())
    }

    fn respond(&mut self, _challenge: &[u8]) -> Result<Vec<u8>> {
        Err(Error::Protocol(
            "PLAIN mechanism received an unexpected challenge".to_string(),
        ))
    }
}

/// SASL LOGIN: server challenges for user name and password in turn.
pub struct LoginMechanism {
    credential: Credential,
    step: u8,
}

impl LoginMechanism {
    /// Creates a LOGIN mechanism for the given credential.
    #[must_use]
    pub const fn new(credential: Credential) -> Self {
        Self {
            credential,
            step: 0,
        }
    }
}

impl SaslMechanism for LoginMechanism {
    fn name(&self) -> &str {
        "LOGIN"
    }

    fn is_plaintext(&self) -> bool {
        true
    }

    fn username(&self) -> Option<&str> {
        Some(&self.credential.username)
    }

    fn initial_response(&mut self) -> Option<Vec<u8>> {
        None
    }

    fn respond(&mut self, _challenge: &[u8]) -> Result<Vec<u8>> {
        self.step += 1;
        match self.step {
            1 => Ok(self.credential.username.clone().into_bytes()),
            2 => Ok(self.credential.password.clone().into_bytes()),
            _ => Err(Error::Protocol(
                "LOGIN mechanism received too many challenges".to_string(),
            )),
        }
    }
}

/// SASL ANONYMOUS: single client-first trace message.
pub struct AnonymousMechanism {
    trace: String,
}

impl AnonymousMechanism {
    /// Creates an ANONYMOUS mechanism with the given trace identity,
    /// conventionally an email address.
    #[must_use]
    pub fn new(trace: impl Into<String>) -> Self {
        Self {
            trace: trace.into(),
        }
    }
}

impl SaslMechanism for AnonymousMechanism {
    fn name(&self) -> &str {
        "ANONYMOUS"
    }

    fn username(&self) -> Option<&str> {
        Some(&self.trace)
    }

    fn initial_response(&mut self) -> Option<Vec<u8>> {
        Some(self.trace.clone().into_bytes())
    }

    fn respond(&mut self, _challenge: &[u8]) -> Result<Vec<u8>> {
        Err(Error::Protocol(
            "ANONYMOUS mechanism received an unexpected challenge".to_string(),
        ))
    }
}

/// Factory producing a mechanism instance for a credential.
pub type MechanismFactory =
    Box<dyn Fn(Credential) -> Box<dyn SaslMechanism + Send> + Send + Sync>;

/// Name-to-factory map of the SASL mechanisms available in-process.
///
/// Automatic mechanism selection intersects this map with the profile's
/// acceptable names and the server-advertised names.
pub struct MechanismRegistry {
    factories: HashMap<String, MechanismFactory>,
}

impl MechanismRegistry {
    /// Creates a registry with the built-in mechanisms
    /// (PLAIN, LOGIN, ANONYMOUS).
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };

        registry.register("PLAIN", |credential| {
            Box::new(PlainMechanism::new(credential))
        });
        registry.register("LOGIN", |credential| {
            Box::new(LoginMechanism::new(credential))
        });
        registry.register("ANONYMOUS", |credential| {
            Box::new(AnonymousMechanism::new(credential.password))
        });

        registry
    }

    /// Registers a mechanism factory under a name, replacing any
    /// previous registration of the same name.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(Credential) -> Box<dyn SaslMechanism + Send> + Send + Sync + 'static,
    {
        self.factories
            .insert(name.to_uppercase(), Box::new(factory));
    }

    /// Returns `true` if a mechanism with the given name is available.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_uppercase())
    }

    /// Instantiates the named mechanism for a credential.
    #[must_use]
    pub fn create(
        &self,
        name: &str,
        credential: Credential,
    ) -> Option<Box<dyn SaslMechanism + Send>> {
        self.factories
            .get(&name.to_uppercase())
            .map(|factory| factory(credential))
    }
}

impl Default for MechanismRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for MechanismRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MechanismRegistry")
            .field("mechanisms", &self.factories.keys().collect::<Vec<_>>())
            .finish()
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
    fn plain_initial_response() {
        let mut mech = PlainMechanism::new(Credential::new("tim", "tanstaaftanstaaf"));
        assert_eq!(
            mech.initial_response(),
            Some(b"\0tim\0tanstaaftanstaaf".to_vec())
        );
        assert!(mech.is_plaintext());
        assert!(mech.respond(b"").is_err());
    }

    #[test]
    fn login_two_step_exchange() {
        let mut mech = LoginMechanism::new(Credential::new("tim", "secret"));
        assert_eq!(mech.initial_response(), None);
        assert_eq!(mech.respond(b"Username:").unwrap(), b"tim".to_vec());
        assert_eq!(mech.respond(b"Password:").unwrap(), b"secret".to_vec());
        assert!(mech.respond(b"?").is_err());
    }

    #[test]
    fn anonymous_sends_trace() {
        let mut mech = AnonymousMechanism::new("anonymous@");
        assert_eq!(mech.initial_response(), Some(b"anonymous@".to_vec()));
        assert!(!mech.is_plaintext());
    }

    #[test]
    fn registry_lookup_is_case_insensitive() {
        let registry = MechanismRegistry::builtin();
        assert!(registry.contains("plain"));
        assert!(registry.contains("LOGIN"));
        assert!(registry.contains("Anonymous"));
        assert!(!registry.contains("CRAM-MD5"));

        let mech = registry
            .create("plain", Credential::new("a", "b"))
            .unwrap();
        assert_eq!(mech.name(), "PLAIN");
    }

    #[test]
    fn registry_accepts_custom_factories() {
        let mut registry = MechanismRegistry::builtin();
        registry.register("X-TEST", |credential| {
            Box::new(PlainMechanism::new(credential))
        });
        assert!(registry.contains("x-test"));
    }
}
