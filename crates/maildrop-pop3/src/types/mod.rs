//! Core POP3 value types.

mod authority;
mod capability;
mod listing;
mod message;

pub use authority::{Authority, PopScheme};
pub use capability::{Capability, CapabilitySet};
pub use listing::{DropListing, ScanListing, UniqueIdListing};
pub use message::MessageBody;
