//! # maildrop-pop3
//!
//! Async POP3 client session engine (RFC 1939) with CAPA (RFC 2449),
//! STLS (RFC 2595), APOP and SASL AUTH (RFC 5034).
//!
//! The central type is [`PopSession`]: a state machine over one
//! connection that runs strictly sequential transactions. Server `-ERR`
//! replies come back as [`CommandResult`] data; thrown errors are
//! reserved for contract violations and for transport failures that
//! force the session back to the not-connected state.
//!
//! [`create_session`] layers establishment on top: connect, greeting,
//! best-effort CAPA, opportunistic STLS, then authentication
//! negotiation per a [`SessionProfile`].
//!
//! ```no_run
//! use maildrop_pop3::{Credential, MechanismRegistry, SessionProfile, create_session};
//!
//! # async fn demo() -> maildrop_pop3::Result<()> {
//! let mut profile = SessionProfile::new("pop.example.net");
//! profile.username = Some("mrose".to_string());
//!
//! let credential = Credential::new("mrose", "tanstaaf");
//! let registry = MechanismRegistry::builtin();
//!
//! let mut session = create_session(&profile, &credential, &registry).await?;
//!
//! let (_, listings) = session.list().await?;
//! for listing in listings {
//!     let (result, body) = session.retr(listing.number).await?;
//!     if let Some(body) = body {
//!         println!("{}: {} bytes ({})", listing.number, body.len(), result.text());
//!     }
//! }
//!
//! session.quit().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod command;
pub mod connection;
mod error;
pub mod protocol;
pub mod session;
pub mod transaction;
pub mod types;

pub use auth::{
    AuthMechanism, Credential, CredentialSource, MechanismRegistry, SaslMechanism, apop_digest,
};
pub use command::Command;
pub use connection::{Config, ConfigBuilder, PopConnection, PopStream, Security, StreamUpgrade};
pub use error::{Error, Result};
pub use session::{
    CapaFailurePolicy, PopSession, SessionProfile, SessionState, create_session, negotiate,
};
pub use transaction::{CommandResult, ResultCode};
pub use types::{
    Authority, Capability, CapabilitySet, DropListing, MessageBody, PopScheme, ScanListing,
    UniqueIdListing,
};
