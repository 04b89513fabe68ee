//! Minimal POP3 response grammar.

mod response;

pub use response::{extract_timestamp, Response, StatusIndicator, StatusResponse};
