//! POP3 command library.
//!
//! One [`Command`] variant per verb. Each command knows its serialized
//! wire line, whether its successful response is multi-line, and which
//! server capability it depends on.

/// A POP3 command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// CAPA — query server capabilities (RFC 2449).
    Capa,
    /// USER — present a user name.
    User {
        /// User name.
        name: String,
    },
    /// PASS — present the password for a preceding USER.
    Pass {
        /// Password.
        secret: String,
    },
    /// APOP — digest authentication (RFC 1939 §7).
    Apop {
        /// User name.
        name: String,
        /// Hex-encoded MD5 digest of timestamp and shared secret.
        digest: String,
    },
    /// AUTH — SASL authentication (RFC 5034).
    Auth {
        /// Mechanism name.
        mechanism: String,
        /// Base64-encoded initial client response, if client-first.
        initial_response: Option<String>,
    },
    /// STLS — upgrade the connection to TLS in place (RFC 2595).
    Stls,
    /// STAT — drop listing.
    Stat,
    /// LIST — scan listing for one or all messages.
    List {
        /// Message number; `None` lists all messages.
        message: Option<u64>,
    },
    /// RETR — retrieve a message.
    Retr {
        /// Message number.
        message: u64,
    },
    /// DELE — mark a message as deleted.
    Dele {
        /// Message number.
        message: u64,
    },
    /// NOOP — keep-alive.
    Noop,
    /// RSET — unmark deleted messages.
    Rset,
    /// TOP — retrieve headers and the first `lines` body lines.
    Top {
        /// Message number.
        message: u64,
        /// Number of body lines, zero or more.
        lines: u64,
    },
    /// UIDL — unique-id listing for one or all messages.
    Uidl {
        /// Message number; `None` lists all messages.
        message: Option<u64>,
    },
    /// QUIT — end the session.
    Quit,
    /// Arbitrary verb escape hatch for server extensions.
    Generic {
        /// Command verb.
        verb: String,
        /// Arguments joined by single spaces.
        arguments: Vec<String>,
        /// Whether a successful response is multi-line.
        multiline: bool,
    },
}

impl Command {
    /// Returns the command verb.
    #[must_use]
    pub fn verb(&self) -> &str {
        match self {
            Self::Capa => "CAPA",
            Self::User { .. } => "USER",
            Self::Pass { .. } => "PASS",
            Self::Apop { .. } => "APOP",
            Self::Auth { .. } => "AUTH",
            Self::Stls => "STLS",
            Self::Stat => "STAT",
            Self::List { .. } => "LIST",
            Self::Retr { .. } => "RETR",
            Self::Dele { .. } => "DELE",
            Self::Noop => "NOOP",
            Self::Rset => "RSET",
            Self::Top { .. } => "TOP",
            Self::Uidl { .. } => "UIDL",
            Self::Quit => "QUIT",
            Self::Generic { verb, .. } => verb,
        }
    }

    /// Serializes the command to a CRLF-terminated wire line.
    #[must_use]
    pub fn serialize(&self) -> String {
        let mut line = String::from(self.verb());

        match self {
            Self::User { name } => {
                line.push(' ');
                line.push_str(name);
            }
            Self::Apop { name, digest } => {
                line.push(' ');
                line.push_str(name);
                line.push(' ');
                line.push_str(digest);
            }
            Self::Pass { secret } => {
                line.push(' ');
                line.push_str(secret);
            }
            Self::Auth {
                mechanism,
                initial_response,
            } => {
                line.push(' ');
                line.push_str(mechanism);
                if let Some(initial) = initial_response {
                    line.push(' ');
                    line.push_str(initial);
                }
            }
            Self::List { message: Some(n) } | Self::Uidl { message: Some(n) } => {
                line.push(' ');
                line.push_str(&n.to_string());
            }
            Self::Retr { message } | Self::Dele { message } => {
                line.push(' ');
                line.push_str(&message.to_string());
            }
            Self::Top { message, lines } => {
                line.push(' ');
                line.push_str(&message.to_string());
                line.push(' ');
                line.push_str(&lines.to_string());
            }
            Self::Generic { arguments, .. } => {
                for argument in arguments {
                    line.push(' ');
                    line.push_str(argument);
                }
            }
            _ => {}
        }

        line.push_str("\r\n");
        line
    }

    /// Returns a loggable form of the wire line with secrets redacted.
    #[must_use]
    pub fn redacted(&self) -> String {
        match self {
            Self::Pass { .. } => "PASS ********".to_string(),
            Self::Apop { name, .. } => format!("APOP {name} ********"),
            Self::Auth {
                mechanism,
                initial_response: Some(_),
            } => format!("AUTH {mechanism} ********"),
            _ => self.serialize().trim_end().to_string(),
        }
    }

    /// Returns `true` if a successful response is multi-line,
    /// terminated by a line containing only `.`.
    #[must_use]
    pub const fn is_multiline(&self) -> bool {
        match self {
            Self::Capa | Self::Retr { .. } | Self::Top { .. } => true,
            Self::List { message } | Self::Uidl { message } => message.is_none(),
            Self::Generic { multiline, .. } => *multiline,
            _ => false,
        }
    }

    /// Returns the capability tag the server must advertise for this
    /// command, if it is capability-gated.
    ///
    /// Checked against the live capability snapshot before any bytes
    /// are sent, and only when strict capability checking is enabled.
    #[must_use]
    pub const fn required_capability(&self) -> Option<&'static str> {
        match self {
            Self::Stls => Some("STLS"),
            Self::Auth { .. } => Some("SASL"),
            Self::Top { .. } => Some("TOP"),
            Self::Uidl { .. } => Some("UIDL"),
            Self::User { .. } | Self::Pass { .. } => Some("USER"),
            _ => None,
        }
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
    fn serialize_bare_commands() {
        assert_eq!(Command::Stat.serialize(), "STAT\r\n");
        assert_eq!(Command::Quit.serialize(), "QUIT\r\n");
        assert_eq!(Command::Capa.serialize(), "CAPA\r\n");
        assert_eq!(Command::Stls.serialize(), "STLS\r\n");
    }

    #[test]
    fn serialize_message_number_arguments() {
        assert_eq!(Command::Retr { message: 1 }.serialize(), "RETR 1\r\n");
        assert_eq!(Command::Dele { message: 2 }.serialize(), "DELE 2\r\n");
        assert_eq!(
            Command::Top {
                message: 1,
                lines: 10
            }
            .serialize(),
            "TOP 1 10\r\n"
        );
        assert_eq!(Command::List { message: None }.serialize(), "LIST\r\n");
        assert_eq!(
            Command::List { message: Some(2) }.serialize(),
            "LIST 2\r\n"
        );
    }

    #[test]
    fn serialize_apop() {
        let cmd = Command::Apop {
            name: "mrose".to_string(),
            digest: "c4c9334bac560ecc979e58001b3e22fb".to_string(),
        };
        assert_eq!(
            cmd.serialize(),
            "APOP mrose c4c9334bac560ecc979e58001b3e22fb\r\n"
        );
    }

    #[test]
    fn serialize_auth_with_and_without_initial_response() {
        assert_eq!(
            Command::Auth {
                mechanism: "PLAIN".to_string(),
                initial_response: Some("dGVzdAB0ZXN0AHRlc3Q=".to_string()),
            }
            .serialize(),
            "AUTH PLAIN dGVzdAB0ZXN0AHRlc3Q=\r\n"
        );
        assert_eq!(
            Command::Auth {
                mechanism: "LOGIN".to_string(),
                initial_response: None,
            }
            .serialize(),
            "AUTH LOGIN\r\n"
        );
    }

    #[test]
    fn serialize_generic() {
        let cmd = Command::Generic {
            verb: "XTND".to_string(),
            arguments: vec!["XMIT".to_string()],
            multiline: false,
        };
        assert_eq!(cmd.serialize(), "XTND XMIT\r\n");
    }

    #[test]
    fn multiline_classification() {
        assert!(Command::Capa.is_multiline());
        assert!(Command::Retr { message: 1 }.is_multiline());
        assert!(Command::List { message: None }.is_multiline());
        assert!(!Command::List { message: Some(1) }.is_multiline());
        assert!(Command::Uidl { message: None }.is_multiline());
        assert!(!Command::Uidl { message: Some(1) }.is_multiline());
        assert!(!Command::Stat.is_multiline());
    }

    #[test]
    fn capability_gating() {
        assert_eq!(Command::Stls.required_capability(), Some("STLS"));
        assert_eq!(
            Command::Uidl { message: None }.required_capability(),
            Some("UIDL")
        );
        assert_eq!(Command::Stat.required_capability(), None);
        assert_eq!(Command::Quit.required_capability(), None);
    }

    #[test]
    fn secrets_are_redacted_in_logs() {
        let pass = Command::Pass {
            secret: "hunter2".to_string(),
        };
        assert!(!pass.redacted().contains("hunter2"));

        let apop = Command::Apop {
            name: "mrose".to_string(),
            digest: "c4c9334bac560ecc979e58001b3e22fb".to_string(),
        };
        assert!(!apop.redacted().contains("c4c9"));
        assert!(apop.redacted().contains("mrose"));
    }
}
