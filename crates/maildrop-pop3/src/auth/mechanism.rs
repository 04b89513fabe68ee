//! Authentication mechanism names.

use std::fmt;
use std::hash::{Hash, Hasher};

/// An authentication mechanism, identified by name.
///
/// This is a closed union of the well-known mechanisms plus
/// [`AuthMechanism::Other`] for arbitrary SASL names; no runtime
/// discovery is involved. Equality and hashing are by name,
/// case-insensitively, so `AuthMechanism::named("plain")` equals
/// [`AuthMechanism::Plain`].
#[derive(Debug, Clone)]
pub enum AuthMechanism {
    /// Select an appropriate mechanism automatically (`;AUTH=*`,
    /// RFC 2384 §4).
    SelectAppropriate,
    /// USER/PASS login (`+LOGIN`), not a SASL mechanism.
    Login,
    /// APOP challenge-response (`+APOP`), not a SASL mechanism.
    Apop,
    /// SASL ANONYMOUS (RFC 4505).
    Anonymous,
    /// SASL PLAIN (RFC 4616).
    Plain,
    /// SASL CRAM-MD5 (RFC 2195).
    CramMd5,
    /// Any other SASL mechanism name.
    Other(String),
}

impl AuthMechanism {
    /// Returns the mechanism name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::SelectAppropriate => "*",
            Self::Login => "+LOGIN",
            Self::Apop => "+APOP",
            Self::Anonymous => "ANONYMOUS",
            Self::Plain => "PLAIN",
            Self::CramMd5 => "CRAM-MD5",
            Self::Other(name) => name,
        }
    }

    /// Returns the well-known mechanism for `name`, or
    /// [`AuthMechanism::Other`] if the name is not known.
    #[must_use]
    pub fn named(name: &str) -> Self {
        match name.to_uppercase().as_str() {
            "*" => Self::SelectAppropriate,
            "+LOGIN" => Self::Login,
            "+APOP" => Self::Apop,
            "ANONYMOUS" => Self::Anonymous,
            "PLAIN" => Self::Plain,
            "CRAM-MD5" => Self::CramMd5,
            _ => Self::Other(name.to_string()),
        }
    }

    /// Returns `true` if the mechanism transmits credentials in a form
    /// recoverable by an eavesdropper.
    ///
    /// Plaintext mechanisms are skipped during automatic selection
    /// unless the connection is secure or the profile allows insecure
    /// login.
    #[must_use]
    pub fn is_plaintext(&self) -> bool {
        matches!(self, Self::Login | Self::Plain)
            || self.name().eq_ignore_ascii_case("LOGIN")
    }

    /// Returns `true` for mechanisms carried by the AUTH command, as
    /// opposed to USER/PASS or APOP.
    #[must_use]
    pub const fn is_sasl(&self) -> bool {
        !matches!(self, Self::SelectAppropriate | Self::Login | Self::Apop)
    }
}

impl PartialEq for AuthMechanism {
    fn eq(&self, other: &Self) -> bool {
        self.name().eq_ignore_ascii_case(other.name())
    }
}

impl Eq for AuthMechanism {}

impl Hash for AuthMechanism {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().to_uppercase().hash(state);
    }
}

impl fmt::Display for AuthMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
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
    fn equality_is_by_name_case_insensitive() {
        assert_eq!(AuthMechanism::named("plain"), AuthMechanism::Plain);
        assert_eq!(AuthMechanism::named("CRAM-md5"), AuthMechanism::CramMd5);
        assert_eq!(
            AuthMechanism::Other("PLAIN".to_string()),
            AuthMechanism::Plain
        );
        assert_ne!(AuthMechanism::Plain, AuthMechanism::Anonymous);
    }

    #[test]
    fn named_falls_back_to_other() {
        let mech = AuthMechanism::named("X-CUSTOM");
        assert_eq!(mech, AuthMechanism::Other("X-CUSTOM".to_string()));
        assert_eq!(mech.name(), "X-CUSTOM");
    }

    #[test]
    fn plaintext_classification() {
        assert!(AuthMechanism::Plain.is_plaintext());
        assert!(AuthMechanism::Login.is_plaintext());
        assert!(AuthMechanism::Other("LOGIN".to_string()).is_plaintext());
        assert!(!AuthMechanism::CramMd5.is_plaintext());
        assert!(!AuthMechanism::Apop.is_plaintext());
        assert!(!AuthMechanism::Anonymous.is_plaintext());
    }

    #[test]
    fn sasl_classification() {
        assert!(AuthMechanism::Plain.is_sasl());
        assert!(AuthMechanism::Anonymous.is_sasl());
        assert!(!AuthMechanism::Login.is_sasl());
        assert!(!AuthMechanism::Apop.is_sasl());
        assert!(!AuthMechanism::SelectAppropriate.is_sasl());
    }
}
