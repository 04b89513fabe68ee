//! Connection configuration types.

use std::time::Duration;

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// No encryption (port 110). **Not recommended for production.**
    None,
    /// Start with plaintext, upgrade with STLS when the server
    /// advertises it (port 110).
    #[default]
    OpportunisticTls,
    /// TLS from the start (port 995).
    Implicit,
}

impl Security {
    /// Returns the default port for this security mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None | Self::OpportunisticTls => 110,
            Self::Implicit => 995,
        }
    }

    /// Returns `true` for the implicit-TLS (secure port) mode.
    #[must_use]
    pub const fn is_secure_port(self) -> bool {
        matches!(self, Self::Implicit)
    }
}

/// POP3 connection configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Connection-establishment timeout.
    pub connect_timeout: Duration,
    /// Per-read/write socket timeout.
    pub io_timeout: Duration,
    /// Whole-transaction timeout; `None` means unbounded.
    pub transaction_timeout: Option<Duration>,
}

impl Config {
    /// Creates a configuration with opportunistic TLS on port 110.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self::builder(host).build()
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(host)
    }
}

/// Builder for connection configuration.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    host: String,
    port: Option<u16>,
    security: Security,
    connect_timeout: Duration,
    io_timeout: Duration,
    transaction_timeout: Option<Duration>,
}

impl ConfigBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            security: Security::default(),
            connect_timeout: Duration::from_secs(30),
            io_timeout: Duration::from_secs(60),
            transaction_timeout: None,
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the security mode.
    #[must_use]
    pub const fn security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the per-read/write socket timeout.
    #[must_use]
    pub const fn io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Bounds every transaction by the given timeout.
    #[must_use]
    pub const fn transaction_timeout(mut self, timeout: Duration) -> Self {
        self.transaction_timeout = Some(timeout);
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        Config {
            host: self.host,
            port: self.port.unwrap_or_else(|| self.security.default_port()),
            security: self.security,
            connect_timeout: self.connect_timeout,
            io_timeout: self.io_timeout,
            transaction_timeout: self.transaction_timeout,
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
    fn test_default_ports() {
        assert_eq!(Security::None.default_port(), 110);
        assert_eq!(Security::OpportunisticTls.default_port(), 110);
        assert_eq!(Security::Implicit.default_port(), 995);
    }

    #[test]
    fn test_config_new() {
        let config = Config::new("pop.example.net");
        assert_eq!(config.host, "pop.example.net");
        assert_eq!(config.port, 110);
        assert_eq!(config.security, Security::OpportunisticTls);
        assert_eq!(config.transaction_timeout, None);
    }

    #[test]
    fn test_config_builder() {
        let config = Config::builder("pop.example.net")
            .security(Security::Implicit)
            .connect_timeout(Duration::from_secs(10))
            .transaction_timeout(Duration::from_secs(120))
            .build();

        assert_eq!(config.port, 995);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.transaction_timeout, Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_explicit_port_wins() {
        let config = Config::builder("pop.example.net").port(10110).build();
        assert_eq!(config.port, 10110);
    }
}
