//! Bridges the type-state client to the message composer's transport seam.

use std::net::SocketAddr;

use mailpost_mime::Transport;

use super::client::{Client, RecipientAdded, SessionState};
use crate::error::{Error, Result};
use crate::types::Address;

enum Stage<S> {
    Ready(Client<S>),
    Envelope(Client<RecipientAdded<S>>),
}

/// A connected client driven through envelope and data by a composed message.
///
/// After a failed command the session is spent and every further call
/// returns [`Error::InvalidState`].
pub struct Session<S> {
    stage: Option<Stage<S>>,
}

impl<S> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stage = match self.stage {
            Some(Stage::Ready(_)) => "ready",
            Some(Stage::Envelope(_)) => "envelope",
            None => "closed",
        };
        f.debug_struct("Session").field("stage", &stage).finish()
    }
}

impl<S: SessionState> Session<S> {
    /// Wraps a client that may start a mail transaction.
    #[must_use]
    pub const fn new(client: Client<S>) -> Self {
        Self {
            stage: Some(Stage::Ready(client)),
        }
    }

    /// Returns the local socket address of the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is spent or the socket is gone.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        match &self.stage {
            Some(Stage::Ready(client)) => client.local_addr(),
            Some(Stage::Envelope(client)) => client.local_addr(),
            None => Err(Error::InvalidState("session is closed".into())),
        }
    }

    /// Sends QUIT and closes the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is spent or QUIT fails.
    pub async fn quit(mut self) -> Result<()> {
        match self.stage.take() {
            Some(Stage::Ready(client)) => client.quit().await,
            Some(Stage::Envelope(client)) => client.quit().await,
            None => Err(Error::InvalidState("session is closed".into())),
        }
    }

    fn take_ready(&mut self, operation: &str) -> Result<Client<S>> {
        match self.stage.take() {
            Some(Stage::Ready(client)) => Ok(client),
            other => {
                self.stage = other;
                Err(Error::InvalidState(format!(
                    "{operation} requires an idle session"
                )))
            }
        }
    }

    fn take_envelope(&mut self) -> Result<Client<RecipientAdded<S>>> {
        match self.stage.take() {
            Some(Stage::Envelope(client)) => Ok(client),
            other => {
                self.stage = other;
                Err(Error::InvalidState(
                    "DATA requires an accepted envelope".into(),
                ))
            }
        }
    }
}

impl<S: SessionState> Transport for Session<S> {
    type Error = Error;

    async fn send_envelope(&mut self, from: &str, recipients: &[&str]) -> Result<()> {
        let Some((first, rest)) = recipients.split_first() else {
            return Err(Error::InvalidAddress("no recipients".into()));
        };
        let from = Address::new(from)?;
        let first = Address::new(*first)?;
        let rest = rest
            .iter()
            .map(|addr| Address::new(*addr))
            .collect::<Result<Vec<_>>>()?;

        let client = self.take_ready("MAIL FROM")?;
        let mut client = client.mail_from(from).await?.rcpt_to(first).await?;
        for to in rest {
            client = client.rcpt_to(to).await?;
        }
        tracing::debug!(recipients = recipients.len(), "Envelope accepted");

        self.stage = Some(Stage::Envelope(client));
        Ok(())
    }

    async fn send_data(&mut self, data: &[u8]) -> Result<()> {
        let client = self.take_envelope()?;
        let client = client.data().await?.send_message(data).await?;
        self.stage = Some(Stage::Ready(client));
        Ok(())
    }
}
