//! Connection management: transport, framing, configuration.

#![allow(clippy::missing_errors_doc)]

mod config;
mod framed;
mod stream;

pub use config::{Config, ConfigBuilder, Security};
pub use framed::FramedStream;
pub use stream::PopStream;

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::protocol::Response;
use crate::{Error, Result};

/// A transport that can be re-handshaked in place for STLS.
pub trait StreamUpgrade: Sized {
    /// Upgrades the transport to TLS against the given host name.
    fn upgrade(
        self,
        host: &str,
    ) -> impl std::future::Future<Output = Result<Self>> + Send;
}

impl StreamUpgrade for PopStream {
    async fn upgrade(self, host: &str) -> Result<Self> {
        self.upgrade_to_tls(host).await
    }
}

/// A POP3 connection: framed transport plus endpoint metadata.
///
/// Exclusively owned by one session; during a bounded transaction it is
/// moved into the worker task and returned on completion.
pub struct PopConnection<S = PopStream> {
    framed: FramedStream<S>,
    host: String,
    port: u16,
    secure_port: bool,
    upgraded: bool,
    io_timeout: Duration,
}

impl<S> PopConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wraps an already-connected stream.
    pub fn from_stream(
        stream: S,
        host: impl Into<String>,
        port: u16,
        secure_port: bool,
        io_timeout: Duration,
    ) -> Self {
        Self {
            framed: FramedStream::new(stream),
            host: host.into(),
            port,
            secure_port,
            upgraded: false,
            io_timeout,
        }
    }

    /// Server host name.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Server port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns `true` if this is an implicit-TLS (secure port)
    /// connection.
    #[must_use]
    pub const fn is_secure_port(&self) -> bool {
        self.secure_port
    }

    /// Returns `true` if the transport is encrypted, either from the
    /// start or after an STLS upgrade.
    #[must_use]
    pub const fn is_secure(&self) -> bool {
        self.secure_port || self.upgraded
    }

    /// Sends one CRLF-terminated command line, bounded by the I/O
    /// timeout.
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        timed(self.io_timeout, self.framed.write_line(line.as_bytes())).await
    }

    /// Reads and parses one response line, bounded by the I/O timeout.
    pub async fn read_response(&mut self) -> Result<Response> {
        let line = timed(self.io_timeout, self.framed.read_line()).await?;
        Response::parse(&line)
    }

    /// Reads a dot-terminated multi-line block, each line bounded by
    /// the I/O timeout.
    pub async fn read_block(&mut self) -> Result<Vec<String>> {
        timed(self.io_timeout, self.framed.read_block()).await
    }

    /// Shuts the transport down, best-effort.
    pub async fn shutdown(&mut self) {
        let _ = self.framed.get_mut().shutdown().await;
    }
}

async fn timed<T, F>(timeout: Duration, operation: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout(timeout)),
    }
}

impl<S> PopConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + StreamUpgrade,
{
    /// Re-handshakes the same stream in place after a positive STLS
    /// reply, bounded by the I/O timeout.
    ///
    /// Consumes the connection so no plaintext state survives a failed
    /// upgrade.
    pub async fn upgrade_to_tls(self) -> Result<Self> {
        let Self {
            framed,
            host,
            port,
            secure_port,
            io_timeout,
            ..
        } = self;

        let stream = framed.into_inner();
        let upgraded = match tokio::time::timeout(io_timeout, stream.upgrade(&host)).await {
            Ok(result) => result?,
            Err(_) => return Err(Error::Timeout(io_timeout)),
        };

        Ok(Self {
            framed: FramedStream::new(upgraded),
            host,
            port,
            secure_port,
            upgraded: true,
            io_timeout,
        })
    }
}

impl PopConnection<PopStream> {
    /// Opens a TCP connection per the configuration, performing the
    /// implicit TLS handshake for [`Security::Implicit`].
    pub async fn open(config: &Config) -> Result<Self> {
        let addr = format!("{}:{}", config.host, config.port);

        let tcp = match tokio::time::timeout(config.connect_timeout, TcpStream::connect(&addr))
            .await
        {
            Ok(Ok(tcp)) => tcp,
            Ok(Err(e)) => {
                return Err(Error::ConnectionFailed(format!(
                    "connect to {addr} failed: {e}"
                )));
            }
            Err(_) => {
                return Err(Error::ConnectionFailed(format!(
                    "connect to {addr} timed out after {:?}",
                    config.connect_timeout
                )));
            }
        };

        let stream = if config.security.is_secure_port() {
            PopStream::plain(tcp).upgrade_to_tls(&config.host).await?
        } else {
            PopStream::plain(tcp)
        };

        tracing::debug!(host = %config.host, port = config.port, secure = stream.is_tls(), "connected");

        Ok(Self::from_stream(
            stream,
            config.host.clone(),
            config.port,
            config.security.is_secure_port(),
            config.io_timeout,
        ))
    }
}
