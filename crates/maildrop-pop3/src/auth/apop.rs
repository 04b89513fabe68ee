//! APOP digest calculation (RFC 1939 §7).

use md5::{Digest, Md5};

/// Computes the APOP digest for a greeting timestamp and shared secret.
///
/// The digest is `MD5(timestamp ‖ secret)`, hex-encoded in lowercase.
/// The timestamp must include the angle brackets exactly as received in
/// the server greeting.
///
/// # Example
///
/// ```
/// use maildrop_pop3::auth::apop_digest;
///
/// let digest = apop_digest("<1896.697170952@dbc.mtview.ca.us>", "tanstaaf");
/// assert_eq!(digest, "c4c9334bac560ecc979e58001b3e22fb");
/// ```
#[must_use]
pub fn apop_digest(timestamp: &str, secret: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(timestamp.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
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
    fn rfc1939_example_digest() {
        // The worked example from RFC 1939 §7.
        assert_eq!(
            apop_digest("<1896.697170952@dbc.mtview.ca.us>", "tanstaaf"),
            "c4c9334bac560ecc979e58001b3e22fb"
        );
    }

    #[test]
    fn digest_depends_on_timestamp() {
        let a = apop_digest("<1@a>", "secret");
        let b = apop_digest("<2@a>", "secret");
        assert_ne!(a, b);
    }
}
