//! Authentication: mechanism names, credentials, SASL, APOP.

mod apop;
mod credentials;
mod mechanism;
pub mod sasl;

pub use apop::apop_digest;
pub use credentials::{Credential, CredentialSource};
pub use mechanism::AuthMechanism;
pub use sasl::{MechanismRegistry, SaslMechanism};
