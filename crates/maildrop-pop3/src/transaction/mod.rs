//! The bounded request/response exchange primitive.
//!
//! A [`Transaction`] owns one complete exchange with the server: send a
//! command line (or nothing, for the greeting), read the status line,
//! read the dot-terminated block for multi-line commands, and for AUTH
//! drive the base64 challenge/response loop until the server settles on
//! `+OK` or `-ERR`.
//!
//! A `-ERR` reply is data, not an error: it finishes the transaction
//! with [`ResultCode::RequestError`]. Transport and protocol failures
//! finish it with an escalating code and carry the source error so the
//! session can tear the connection down and rethrow.

mod result;

pub use result::{CommandResult, ResultCode};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::auth::SaslMechanism;
use crate::command::Command;
use crate::connection::PopConnection;
use crate::protocol::Response;
use crate::{Error, Result};

enum Request {
    /// Read the server greeting; nothing is sent.
    Greeting,
    /// One command, one status line, optionally one multi-line block.
    Command(Command),
    /// AUTH challenge/response exchange (RFC 5034).
    Auth(Box<dyn SaslMechanism + Send>),
}

/// One request/response exchange, run to completion on a connection.
pub struct Transaction {
    request: Request,
    responses: Vec<String>,
}

/// A transaction that has run to completion.
///
/// `result` is always present; `error` carries the source failure for
/// escalating result codes and is `None` otherwise.
pub struct FinishedTransaction {
    /// How the exchange ended.
    pub result: CommandResult,
    /// Lines of the multi-line block, dot-unstuffed, terminator
    /// excluded. Empty for single-line commands.
    pub responses: Vec<String>,
    /// The underlying failure, for escalating codes.
    pub error: Option<Error>,
}

impl Transaction {
    /// Creates a transaction that only reads the server greeting.
    #[must_use]
    pub const fn greeting() -> Self {
        Self {
            request: Request::Greeting,
            responses: Vec::new(),
        }
    }

    /// Creates a transaction for a single command.
    #[must_use]
    pub const fn command(command: Command) -> Self {
        Self {
            request: Request::Command(command),
            responses: Vec::new(),
        }
    }

    /// Creates a transaction that drives a SASL AUTH exchange.
    #[must_use]
    pub fn auth(mechanism: Box<dyn SaslMechanism + Send>) -> Self {
        Self {
            request: Request::Auth(mechanism),
            responses: Vec::new(),
        }
    }

    /// Verb of the underlying command, for logging.
    #[must_use]
    pub fn verb(&self) -> &str {
        match &self.request {
            Request::Greeting => "(greeting)",
            Request::Command(command) => command.verb(),
            Request::Auth(_) => "AUTH",
        }
    }

    /// Capability tag the server must advertise before this transaction
    /// may be started, if any.
    #[must_use]
    pub fn required_capability(&self) -> Option<&'static str> {
        match &self.request {
            Request::Greeting => None,
            Request::Command(command) => command.required_capability(),
            Request::Auth(_) => Some("SASL"),
        }
    }

    /// Runs the exchange to completion.
    ///
    /// Never returns early on failure: every outcome, including
    /// transport errors, is folded into the finished transaction so the
    /// caller can classify it in one place.
    pub async fn run<S>(mut self, conn: &mut PopConnection<S>) -> FinishedTransaction
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        match self.execute(conn).await {
            Ok(result) => FinishedTransaction {
                result,
                responses: self.responses,
                error: None,
            },
            Err(error) => {
                let code = classify(&error);
                tracing::debug!(verb = self.verb(), ?code, %error, "transaction failed");
                FinishedTransaction {
                    result: CommandResult::new(code, error.to_string()),
                    responses: self.responses,
                    error: Some(error),
                }
            }
        }
    }

    async fn execute<S>(&mut self, conn: &mut PopConnection<S>) -> Result<CommandResult>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        match &mut self.request {
            Request::Greeting => match conn.read_response().await? {
                Response::Status(status) if status.is_positive() => {
                    Ok(CommandResult::request_done(status.text))
                }
                Response::Status(status) => Ok(CommandResult::request_error(status.text)),
                Response::Continuation(_) => Err(Error::Protocol(
                    "unexpected continuation request in greeting".to_string(),
                )),
            },

            Request::Command(command) => {
                tracing::debug!(command = %command.redacted(), "send");
                conn.send_line(&command.serialize()).await?;

                match conn.read_response().await? {
                    Response::Status(status) if status.is_positive() => {
                        if command.is_multiline() {
                            self.responses = conn.read_block().await?;
                        }
                        Ok(CommandResult::request_done(status.text))
                    }
                    Response::Status(status) => Ok(CommandResult::request_error(status.text)),
                    Response::Continuation(_) => Err(Error::Protocol(format!(
                        "unexpected continuation request after {}",
                        command.verb()
                    ))),
                }
            }

            Request::Auth(mechanism) => {
                let initial = mechanism
                    .initial_response()
                    .map(|response| BASE64.encode(response));
                let command = Command::Auth {
                    mechanism: mechanism.name().to_string(),
                    initial_response: initial,
                };
                tracing::debug!(command = %command.redacted(), "send");
                conn.send_line(&command.serialize()).await?;

                loop {
                    match conn.read_response().await? {
                        Response::Status(status) if status.is_positive() => {
                            return Ok(CommandResult::request_done(status.text));
                        }
                        Response::Status(status) => {
                            return Ok(CommandResult::request_error(status.text));
                        }
                        Response::Continuation(challenge) => {
                            let decoded =
                                BASE64.decode(challenge.as_bytes()).map_err(|_| {
                                    Error::Protocol(
                                        "server challenge is not valid base64".to_string(),
                                    )
                                })?;

                            match mechanism.respond(&decoded) {
                                Ok(reply) => {
                                    let line = format!("{}\r\n", BASE64.encode(reply));
                                    conn.send_line(&line).await?;
                                }
                                Err(error) => {
                                    // Cancel the exchange (RFC 5034 §4)
                                    // and drain the server's -ERR.
                                    conn.send_line("*\r\n").await?;
                                    let _ = conn.read_response().await;
                                    return Err(error);
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

impl FinishedTransaction {
    /// Returns `true` if the exchange ended with `+OK`.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.result.succeeded()
    }

    /// Takes the underlying error, substituting a generic protocol
    /// error when an escalating code carries none.
    #[must_use]
    pub fn take_error(&mut self) -> Error {
        self.error
            .take()
            .unwrap_or_else(|| Error::Protocol(self.result.text().to_string()))
    }
}

/// Maps a thrown failure to the result code recorded on the finished
/// transaction. All of these escalate in the session layer.
fn classify(error: &Error) -> ResultCode {
    match error {
        Error::Timeout(_) => ResultCode::SocketTimeout,
        Error::Tls(_) | Error::InvalidDnsName(_) | Error::UpgradeFailed(_) => {
            ResultCode::UpgradeError
        }
        Error::Io(_) | Error::ConnectionFailed(_) => ResultCode::ConnectionError,
        _ => ResultCode::InternalError,
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
    use std::io;
    use std::time::Duration;

    use super::*;

    #[test]
    fn classification_of_thrown_errors() {
        assert_eq!(
            classify(&Error::Timeout(Duration::from_secs(1))),
            ResultCode::SocketTimeout
        );
        assert_eq!(
            classify(&Error::UpgradeFailed("handshake".into())),
            ResultCode::UpgradeError
        );
        assert_eq!(
            classify(&Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "closed"
            ))),
            ResultCode::ConnectionError
        );
        assert_eq!(
            classify(&Error::Protocol("garbage".into())),
            ResultCode::InternalError
        );
    }

    #[test]
    fn capability_gating_includes_auth() {
        assert_eq!(Transaction::greeting().required_capability(), None);
        assert_eq!(
            Transaction::command(Command::Stls).required_capability(),
            Some("STLS")
        );
        assert_eq!(
            Transaction::command(Command::Stat).required_capability(),
            None
        );

        let mechanism = crate::auth::sasl::PlainMechanism::new(crate::auth::Credential::new(
            "tim", "secret",
        ));
        assert_eq!(
            Transaction::auth(Box::new(mechanism)).required_capability(),
            Some("SASL")
        );
    }
}
