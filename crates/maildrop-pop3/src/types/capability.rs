//! Server capabilities advertised via CAPA (RFC 2449).

/// A single capability tag from a CAPA response.
///
/// Some tags carry sub-values, for example `SASL PLAIN CRAM-MD5`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    /// TOP command support.
    Top,
    /// UIDL command support.
    Uidl,
    /// USER/PASS login support.
    User,
    /// SASL AUTH support with the advertised mechanism names.
    Sasl(Vec<String>),
    /// Extended response codes.
    RespCodes,
    /// Minimum delay between logins, in seconds.
    LoginDelay(Option<u64>),
    /// Command pipelining.
    Pipelining,
    /// Message expiration policy (`NEVER`, a day count, or absent).
    Expire(Option<String>),
    /// STLS upgrade support.
    Stls,
    /// Server implementation string.
    Implementation(String),
    /// Unknown capability tag with its raw arguments.
    Unknown(String),
}

impl Capability {
    /// Parses a single CAPA response line.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let mut parts = line.split_whitespace();
        let Some(tag) = parts.next() else {
            return Self::Unknown(line.to_string());
        };

        match tag.to_uppercase().as_str() {
            "TOP" => Self::Top,
            "UIDL" => Self::Uidl,
            "USER" => Self::User,
            "SASL" => Self::Sasl(parts.map(str::to_string).collect()),
            "RESP-CODES" => Self::RespCodes,
            "LOGIN-DELAY" => Self::LoginDelay(parts.next().and_then(|s| s.parse().ok())),
            "PIPELINING" => Self::Pipelining,
            "EXPIRE" => Self::Expire(parts.next().map(str::to_string)),
            "STLS" => Self::Stls,
            "IMPLEMENTATION" => {
                Self::Implementation(parts.collect::<Vec<_>>().join(" "))
            }
            _ => Self::Unknown(line.to_string()),
        }
    }

    /// Returns the capability tag name.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Self::Top => "TOP",
            Self::Uidl => "UIDL",
            Self::User => "USER",
            Self::Sasl(_) => "SASL",
            Self::RespCodes => "RESP-CODES",
            Self::LoginDelay(_) => "LOGIN-DELAY",
            Self::Pipelining => "PIPELINING",
            Self::Expire(_) => "EXPIRE",
            Self::Stls => "STLS",
            Self::Implementation(_) => "IMPLEMENTATION",
            Self::Unknown(line) => line.split_whitespace().next().unwrap_or(line),
        }
    }
}

/// A read-only snapshot of server-advertised capabilities.
///
/// The snapshot is replaced wholesale after a successful CAPA and
/// discarded unconditionally after STLS; it is never mutated in place.
/// Capability checks always read the session's current snapshot at call
/// time because the set changes across CAPA and STLS.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    capabilities: Vec<Capability>,
}

impl CapabilitySet {
    /// Creates an empty capability set.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            capabilities: Vec::new(),
        }
    }

    /// Builds a snapshot from CAPA response lines.
    #[must_use]
    pub fn parse(lines: &[String]) -> Self {
        Self {
            capabilities: lines
                .iter()
                .filter(|l| !l.trim().is_empty())
                .map(|l| Capability::parse(l))
                .collect(),
        }
    }

    /// Builds a snapshot from already-parsed capabilities.
    #[must_use]
    pub fn new(capabilities: Vec<Capability>) -> Self {
        Self { capabilities }
    }

    /// Returns `true` if no capabilities are advertised.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Returns the advertised capabilities.
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Returns `true` if a capability with the given tag is advertised.
    #[must_use]
    pub fn supports(&self, tag: &str) -> bool {
        self.capabilities
            .iter()
            .any(|c| c.tag().eq_ignore_ascii_case(tag))
    }

    /// Returns the advertised SASL mechanism names, if any.
    #[must_use]
    pub fn sasl_mechanisms(&self) -> &[String] {
        for capability in &self.capabilities {
            if let Capability::Sasl(mechanisms) = capability {
                return mechanisms;
            }
        }
        &[]
    }

    /// Returns `true` if the given SASL mechanism is advertised.
    #[must_use]
    pub fn supports_sasl(&self, mechanism: &str) -> bool {
        self.sasl_mechanisms()
            .iter()
            .any(|m| m.eq_ignore_ascii_case(mechanism))
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

    mod capability_parse_tests {
        use super::*;

        #[test]
        fn parse_top() {
            assert_eq!(Capability::parse("TOP"), Capability::Top);
            assert_eq!(Capability::parse("top"), Capability::Top);
        }

        #[test]
        fn parse_uidl() {
            assert_eq!(Capability::parse("UIDL"), Capability::Uidl);
        }

        #[test]
        fn parse_stls() {
            assert_eq!(Capability::parse("STLS"), Capability::Stls);
        }

        #[test]
        fn parse_sasl_with_mechanisms() {
            assert_eq!(
                Capability::parse("SASL PLAIN CRAM-MD5"),
                Capability::Sasl(vec!["PLAIN".to_string(), "CRAM-MD5".to_string()])
            );
        }

        #[test]
        fn parse_sasl_without_mechanisms() {
            assert_eq!(Capability::parse("SASL"), Capability::Sasl(vec![]));
        }

        #[test]
        fn parse_login_delay() {
            assert_eq!(
                Capability::parse("LOGIN-DELAY 900"),
                Capability::LoginDelay(Some(900))
            );
        }

        #[test]
        fn parse_expire_never() {
            assert_eq!(
                Capability::parse("EXPIRE NEVER"),
                Capability::Expire(Some("NEVER".to_string()))
            );
        }

        #[test]
        fn parse_implementation() {
            assert_eq!(
                Capability::parse("IMPLEMENTATION Shlemazle-Plotz-v302"),
                Capability::Implementation("Shlemazle-Plotz-v302".to_string())
            );
        }

        #[test]
        fn parse_unknown() {
            let cap = Capability::parse("X-SOMETHING arg");
            assert_eq!(cap, Capability::Unknown("X-SOMETHING arg".to_string()));
            assert_eq!(cap.tag(), "X-SOMETHING");
        }
    }

    mod capability_set_tests {
        use super::*;

        fn sample() -> CapabilitySet {
            CapabilitySet::parse(&[
                "TOP".to_string(),
                "USER".to_string(),
                "SASL PLAIN CRAM-MD5".to_string(),
                "STLS".to_string(),
                "UIDL".to_string(),
            ])
        }

        #[test]
        fn supports_is_case_insensitive() {
            let caps = sample();
            assert!(caps.supports("STLS"));
            assert!(caps.supports("stls"));
            assert!(!caps.supports("PIPELINING"));
        }

        #[test]
        fn sasl_mechanisms_are_listed() {
            let caps = sample();
            assert_eq!(caps.sasl_mechanisms(), &["PLAIN", "CRAM-MD5"]);
            assert!(caps.supports_sasl("plain"));
            assert!(caps.supports_sasl("CRAM-MD5"));
            assert!(!caps.supports_sasl("ANONYMOUS"));
        }

        #[test]
        fn empty_set_supports_nothing() {
            let caps = CapabilitySet::empty();
            assert!(caps.is_empty());
            assert!(!caps.supports("TOP"));
            assert!(caps.sasl_mechanisms().is_empty());
        }

        #[test]
        fn blank_lines_are_skipped() {
            let caps = CapabilitySet::parse(&["TOP".to_string(), String::new()]);
            assert_eq!(caps.capabilities().len(), 1);
        }
    }
}
