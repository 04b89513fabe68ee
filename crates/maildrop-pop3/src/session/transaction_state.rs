//! Transaction-state maildrop operations.
//!
//! Message numbers are 1-based (RFC 1939 §5); zero is rejected as a
//! contract violation before any wire I/O. A `-ERR` reply, for example
//! for a deleted or out-of-range message, is returned as data with no
//! typed value.

use std::str::FromStr;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::command::Command;
use crate::session::{PopSession, SessionState};
use crate::transaction::{CommandResult, Transaction};
use crate::types::{DropListing, MessageBody, ScanListing, UniqueIdListing};
use crate::{Error, Result};

impl<S> PopSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// STAT: message count and maildrop size.
    pub async fn stat(&mut self) -> Result<(CommandResult, Option<DropListing>)> {
        self.require_state(SessionState::Transaction, "STAT")?;

        let finished = self.process(Transaction::command(Command::Stat)).await?;
        if finished.result.failed() {
            return Ok((finished.result, None));
        }

        let listing = self.parse_value::<DropListing>(finished.result.text())?;
        Ok((finished.result, Some(listing)))
    }

    /// LIST: scan listings for every message not marked as deleted.
    pub async fn list(&mut self) -> Result<(CommandResult, Vec<ScanListing>)> {
        self.require_state(SessionState::Transaction, "LIST")?;

        let finished = self
            .process(Transaction::command(Command::List { message: None }))
            .await?;
        if finished.result.failed() {
            return Ok((finished.result, Vec::new()));
        }

        let mut listings = Vec::with_capacity(finished.responses.len());
        for line in &finished.responses {
            listings.push(self.parse_value::<ScanListing>(line)?);
        }

        Ok((finished.result, listings))
    }

    /// LIST n: scan listing for one message.
    pub async fn list_message(
        &mut self,
        message: u64,
    ) -> Result<(CommandResult, Option<ScanListing>)> {
        self.require_state(SessionState::Transaction, "LIST")?;
        require_message_number(message)?;

        let finished = self
            .process(Transaction::command(Command::List {
                message: Some(message),
            }))
            .await?;
        if finished.result.failed() {
            return Ok((finished.result, None));
        }

        let listing = self.parse_value::<ScanListing>(finished.result.text())?;
        Ok((finished.result, Some(listing)))
    }

    /// RETR: the full content of a message.
    pub async fn retr(&mut self, message: u64) -> Result<(CommandResult, Option<MessageBody>)> {
        self.require_state(SessionState::Transaction, "RETR")?;
        require_message_number(message)?;

        let finished = self
            .process(Transaction::command(Command::Retr { message }))
            .await?;
        if finished.result.failed() {
            return Ok((finished.result, None));
        }

        let body = MessageBody::from_lines(&finished.responses);
        Ok((finished.result, Some(body)))
    }

    /// TOP: the headers and the first `lines` body lines of a message.
    /// `lines` may be zero to fetch headers only.
    pub async fn top(
        &mut self,
        message: u64,
        lines: u64,
    ) -> Result<(CommandResult, Option<MessageBody>)> {
        self.require_state(SessionState::Transaction, "TOP")?;
        require_message_number(message)?;

        let finished = self
            .process(Transaction::command(Command::Top { message, lines }))
            .await?;
        if finished.result.failed() {
            return Ok((finished.result, None));
        }

        let body = MessageBody::from_lines(&finished.responses);
        Ok((finished.result, Some(body)))
    }

    /// DELE: marks a message as deleted. The server commits deletions
    /// only when the session passes through the Update state.
    pub async fn dele(&mut self, message: u64) -> Result<CommandResult> {
        self.require_state(SessionState::Transaction, "DELE")?;
        require_message_number(message)?;

        let finished = self
            .process(Transaction::command(Command::Dele { message }))
            .await?;
        Ok(finished.result)
    }

    /// NOOP keep-alive.
    pub async fn noop(&mut self) -> Result<CommandResult> {
        self.require_state(SessionState::Transaction, "NOOP")?;

        let finished = self.process(Transaction::command(Command::Noop)).await?;
        Ok(finished.result)
    }

    /// RSET: unmarks every message marked as deleted.
    pub async fn rset(&mut self) -> Result<CommandResult> {
        self.require_state(SessionState::Transaction, "RSET")?;

        let finished = self.process(Transaction::command(Command::Rset)).await?;
        Ok(finished.result)
    }

    /// UIDL: unique-id listings for every message not marked as
    /// deleted.
    pub async fn uidl(&mut self) -> Result<(CommandResult, Vec<UniqueIdListing>)> {
        self.require_state(SessionState::Transaction, "UIDL")?;

        let finished = self
            .process(Transaction::command(Command::Uidl { message: None }))
            .await?;
        if finished.result.failed() {
            return Ok((finished.result, Vec::new()));
        }

        let mut listings = Vec::with_capacity(finished.responses.len());
        for line in &finished.responses {
            listings.push(self.parse_value::<UniqueIdListing>(line)?);
        }

        Ok((finished.result, listings))
    }

    /// UIDL n: unique-id listing for one message.
    pub async fn uidl_message(
        &mut self,
        message: u64,
    ) -> Result<(CommandResult, Option<UniqueIdListing>)> {
        self.require_state(SessionState::Transaction, "UIDL")?;
        require_message_number(message)?;

        let finished = self
            .process(Transaction::command(Command::Uidl {
                message: Some(message),
            }))
            .await?;
        if finished.result.failed() {
            return Ok((finished.result, None));
        }

        let listing = self.parse_value::<UniqueIdListing>(finished.result.text())?;
        Ok((finished.result, Some(listing)))
    }

    /// Parses a typed value out of completed-response text. Malformed
    /// server data leaves the exchange unsynchronized, so a parse
    /// failure tears the session down and escalates.
    fn parse_value<T>(&mut self, text: &str) -> Result<T>
    where
        T: FromStr<Err = Error>,
    {
        match text.parse::<T>() {
            Ok(value) => Ok(value),
            Err(error) => {
                tracing::warn!(%error, "malformed server response; closing connection");
                self.teardown();
                Err(error)
            }
        }
    }
}

/// Message numbers are 1-based; zero is malformed by contract.
fn require_message_number(message: u64) -> Result<()> {
    if message == 0 {
        Err(Error::InvalidArgument(
            "message numbers start at 1".to_string(),
        ))
    } else {
        Ok(())
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
    fn zero_message_number_is_rejected() {
        assert!(matches!(
            require_message_number(0),
            Err(Error::InvalidArgument(_))
        ));
        assert!(require_message_number(1).is_ok());
    }
}
