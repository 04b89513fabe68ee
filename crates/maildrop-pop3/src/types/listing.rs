//! Maildrop listing value types (STAT, LIST, UIDL).

use std::str::FromStr;

use crate::{Error, Result};

/// Drop listing returned by STAT: message count and aggregate size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DropListing {
    /// Number of messages in the maildrop.
    pub count: u64,
    /// Aggregate size of the maildrop in octets.
    pub octets: u64,
}

impl FromStr for DropListing {
    type Err = Error;

    /// Parses the `+OK` status text of a STAT response, e.g. `2 320`.
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split_whitespace();
        let count = parse_field(parts.next(), s, "message count")?;
        let octets = parse_field(parts.next(), s, "maildrop size")?;

        Ok(Self { count, octets })
    }
}

/// Scan listing returned by LIST: message number and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanListing {
    /// Message number, always non-zero positive.
    pub number: u64,
    /// Exact size of the message in octets.
    pub octets: u64,
}

impl FromStr for ScanListing {
    type Err = Error;

    /// Parses one scan listing line, e.g. `1 120`.
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split_whitespace();
        let number = parse_field(parts.next(), s, "message number")?;
        let octets = parse_field(parts.next(), s, "message size")?;

        Ok(Self { number, octets })
    }
}

/// Unique-id listing returned by UIDL: message number and opaque id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueIdListing {
    /// Message number, always non-zero positive.
    pub number: u64,
    /// Server-assigned unique identifier, stable across sessions.
    pub id: String,
}

impl FromStr for UniqueIdListing {
    type Err = Error;

    /// Parses one unique-id listing line, e.g. `1 whqtswO00WBw418f9t5JxYwZ`.
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split_whitespace();
        let number = parse_field(parts.next(), s, "message number")?;
        let id = parts
            .next()
            .ok_or_else(|| malformed(s, "unique id"))?
            .to_string();

        Ok(Self { number, id })
    }
}

fn parse_field(field: Option<&str>, line: &str, what: &str) -> Result<u64> {
    field
        .and_then(|f| f.parse().ok())
        .ok_or_else(|| malformed(line, what))
}

fn malformed(line: &str, what: &str) -> Error {
    Error::Protocol(format!("malformed listing, missing {what}: {line:?}"))
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
    fn parse_drop_listing() {
        let listing: DropListing = "2 320".parse().unwrap();
        assert_eq!(listing.count, 2);
        assert_eq!(listing.octets, 320);
    }

    #[test]
    fn parse_drop_listing_with_trailing_text() {
        // RFC 1939 permits extra data after the size; it is ignored.
        let listing: DropListing = "2 320 octets".parse().unwrap();
        assert_eq!(listing.count, 2);
    }

    #[test]
    fn parse_scan_listing() {
        let listing: ScanListing = "1 120".parse().unwrap();
        assert_eq!(listing.number, 1);
        assert_eq!(listing.octets, 120);
    }

    #[test]
    fn parse_unique_id_listing() {
        let listing: UniqueIdListing = "2 QhdPYR:00WBw1Ph7x7".parse().unwrap();
        assert_eq!(listing.number, 2);
        assert_eq!(listing.id, "QhdPYR:00WBw1Ph7x7");
    }

    #[test]
    fn malformed_listing_is_a_protocol_error() {
        assert!("".parse::<DropListing>().is_err());
        assert!("1".parse::<ScanListing>().is_err());
        assert!("x y".parse::<ScanListing>().is_err());
        assert!("3".parse::<UniqueIdListing>().is_err());
    }
}
