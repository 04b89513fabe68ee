//! Parsing of single-line POP3 responses.
//!
//! POP3 replies with `+OK text` or `-ERR text` status lines; during an
//! AUTH exchange the server may instead send a `+ base64` continuation
//! request (RFC 5034 §4). Multi-line bodies are framed by the
//! connection layer, not here.

use crate::{Error, Result};

/// Status indicator of a POP3 reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusIndicator {
    /// `+OK`
    Positive,
    /// `-ERR`
    Negative,
}

/// A parsed status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResponse {
    /// Positive or negative indicator.
    pub indicator: StatusIndicator,
    /// Human-readable text following the indicator.
    pub text: String,
}

impl StatusResponse {
    /// Returns `true` for a `+OK` reply.
    #[must_use]
    pub const fn is_positive(&self) -> bool {
        matches!(self.indicator, StatusIndicator::Positive)
    }
}

/// A single-line server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `+OK` / `-ERR` status line.
    Status(StatusResponse),
    /// `+ base64` continuation request during an AUTH exchange.
    Continuation(String),
}

impl Response {
    /// Parses one CRLF-stripped response line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the line carries no recognizable
    /// status indicator.
    pub fn parse(line: &str) -> Result<Self> {
        if let Some(rest) = strip_indicator(line, "+OK") {
            return Ok(Self::Status(StatusResponse {
                indicator: StatusIndicator::Positive,
                text: rest.to_string(),
            }));
        }

        if let Some(rest) = strip_indicator(line, "-ERR") {
            return Ok(Self::Status(StatusResponse {
                indicator: StatusIndicator::Negative,
                text: rest.to_string(),
            }));
        }

        if line == "+" {
            return Ok(Self::Continuation(String::new()));
        }
        if let Some(rest) = line.strip_prefix("+ ") {
            return Ok(Self::Continuation(rest.to_string()));
        }

        Err(Error::Protocol(format!(
            "malformed status line: {line:?}"
        )))
    }
}

/// Strips `+OK`/`-ERR` followed by end-of-line or a space.
fn strip_indicator<'a>(line: &'a str, indicator: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(indicator)?;
    if rest.is_empty() {
        Some(rest)
    } else {
        rest.strip_prefix(' ')
    }
}

/// Extracts the APOP timestamp nonce (`<...>`) from greeting text.
///
/// Returns the nonce with its angle brackets, as required by the APOP
/// digest calculation.
#[must_use]
pub fn extract_timestamp(text: &str) -> Option<String> {
    let start = text.find('<')?;
    let end = text[start..].find('>')?;
    Some(text[start..=start + end].to_string())
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
    fn parse_positive_status() {
        let response = Response::parse("+OK 2 messages (320 octets)").unwrap();
        assert_eq!(
            response,
            Response::Status(StatusResponse {
                indicator: StatusIndicator::Positive,
                text: "2 messages (320 octets)".to_string(),
            })
        );
    }

    #[test]
    fn parse_negative_status() {
        let Response::Status(status) = Response::parse("-ERR no such message").unwrap() else {
            panic!("expected status");
        };
        assert!(!status.is_positive());
        assert_eq!(status.text, "no such message");
    }

    #[test]
    fn parse_bare_ok() {
        let Response::Status(status) = Response::parse("+OK").unwrap() else {
            panic!("expected status");
        };
        assert!(status.is_positive());
        assert!(status.text.is_empty());
    }

    #[test]
    fn parse_continuation() {
        assert_eq!(
            Response::parse("+ VXNlcm5hbWU6").unwrap(),
            Response::Continuation("VXNlcm5hbWU6".to_string())
        );
        assert_eq!(
            Response::parse("+").unwrap(),
            Response::Continuation(String::new())
        );
    }

    #[test]
    fn parse_garbage_is_protocol_error() {
        assert!(Response::parse("OK nope").is_err());
        assert!(Response::parse("+OKAY").is_err());
    }

    #[test]
    fn timestamp_extraction() {
        assert_eq!(
            extract_timestamp("POP3 server ready <1896.697170952@dbc.mtview.ca.us>"),
            Some("<1896.697170952@dbc.mtview.ca.us>".to_string())
        );
        assert_eq!(extract_timestamp("POP3 server ready"), None);
        assert_eq!(extract_timestamp("broken <nonce"), None);
    }
}
