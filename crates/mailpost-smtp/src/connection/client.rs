//! Type-state SMTP client.

use std::collections::HashSet;
use std::marker::PhantomData;
use std::net::SocketAddr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tokio_rustls::TlsConnector;

use super::{ServerInfo, SmtpStream};
use crate::auth::cram_md5_response;
use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::{Address, AuthMechanism, Extension, Reply, ReplyCode};

/// Type-state marker for connected state.
#[derive(Debug)]
pub struct Connected;

/// Type-state marker for authenticated state.
#[derive(Debug)]
pub struct Authenticated;

/// Type-state marker for mail transaction started.
///
/// `S` is the state the client returns to once the transaction ends.
#[derive(Debug)]
pub struct MailTransaction<S>(PhantomData<S>);

/// Type-state marker for at least one recipient accepted.
#[derive(Debug)]
pub struct RecipientAdded<S>(PhantomData<S>);

/// Type-state marker for data mode.
#[derive(Debug)]
pub struct Data<S>(PhantomData<S>);

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Connected {}
    impl Sealed for super::Authenticated {}
}

/// States from which a mail transaction may start.
pub trait SessionState: sealed::Sealed + Send + Sync + 'static {}

impl SessionState for Connected {}
impl SessionState for Authenticated {}

/// SMTP client with type-state pattern.
#[derive(Debug)]
pub struct Client<State> {
    stream: SmtpStream,
    server_info: ServerInfo,
    _state: PhantomData<State>,
}

/// Connection trait for all states.
pub trait SmtpConnection {
    /// Returns the server information.
    fn server_info(&self) -> &ServerInfo;
}

impl<S> SmtpConnection for Client<S> {
    fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }
}

impl Client<Connected> {
    /// Creates a client from a stream and reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the greeting fails or if the server returns an error.
    pub async fn from_stream(mut stream: SmtpStream) -> Result<Self> {
        let greeting = read_reply(&mut stream).await?.require_success()?;

        // Hostname is the first word of the greeting text.
        let hostname = greeting
            .message
            .first()
            .and_then(|msg| msg.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();
        tracing::debug!(%hostname, "Server greeting received");

        Ok(Self {
            stream,
            server_info: ServerInfo {
                hostname,
                extensions: HashSet::new(),
            },
            _state: PhantomData,
        })
    }

    /// Sends EHLO and discovers server capabilities.
    ///
    /// # Errors
    ///
    /// Returns an error if the EHLO command fails.
    pub async fn ehlo(mut self, client_hostname: &str) -> Result<Self> {
        let cmd = Command::Ehlo {
            hostname: client_hostname.to_string(),
        };
        let reply = self.send_command(cmd).await?.require_success()?;

        // First line is the server's greeting, the rest are extensions.
        self.server_info.extensions = reply
            .message
            .iter()
            .skip(1)
            .map(|line| Extension::parse(line))
            .collect();
        tracing::debug!(
            extensions = self.server_info.extensions.len(),
            "EHLO accepted"
        );
        Ok(self)
    }

    /// Upgrades the connection to TLS using STARTTLS, then repeats EHLO.
    ///
    /// # Errors
    ///
    /// Returns an error if STARTTLS is not supported or if the upgrade fails.
    pub async fn starttls(
        mut self,
        hostname: &str,
        client_hostname: &str,
        connector: &TlsConnector,
    ) -> Result<Self> {
        if !self.server_info.supports_starttls() {
            return Err(Error::NotSupported("STARTTLS".into()));
        }

        self.send_command(Command::StartTls)
            .await?
            .require(ReplyCode::SERVICE_READY)?;

        self.stream = self.stream.upgrade_to_tls(hostname, connector).await?;
        self.ehlo(client_hostname).await
    }

    /// Authenticates using the PLAIN mechanism with an initial response.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication fails.
    pub async fn auth_plain(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<Authenticated>> {
        let credentials = format!("\0{username}\0{password}");
        let cmd = Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: Some(STANDARD.encode(credentials.as_bytes())),
        };

        self.send_command(cmd).await?.require_success()?;
        tracing::debug!(mechanism = "PLAIN", "Authenticated");
        Ok(self.transition())
    }

    /// Authenticates using the CRAM-MD5 challenge-response mechanism.
    ///
    /// # Errors
    ///
    /// Returns an error if the server sends no valid challenge or rejects
    /// the response.
    pub async fn auth_cram_md5(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<Authenticated>> {
        let cmd = Command::Auth {
            mechanism: AuthMechanism::CramMd5,
            initial_response: None,
        };
        let challenge = self
            .send_command(cmd)
            .await?
            .require(ReplyCode::AUTH_CONTINUE)?;

        let challenge = STANDARD
            .decode(challenge.message_text().trim())
            .map_err(|e| Error::Auth(format!("Invalid CRAM-MD5 challenge: {e}")))?;
        let response = cram_md5_response(username, password, &challenge)?;

        self.send_command(Command::AuthResponse(response))
            .await?
            .require_success()?;
        tracing::debug!(mechanism = "CRAM-MD5", "Authenticated");
        Ok(self.transition())
    }
}

impl<S: SessionState> Client<S> {
    /// Starts a mail transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the MAIL FROM command fails.
    pub async fn mail_from(mut self, from: Address) -> Result<Client<MailTransaction<S>>> {
        self.send_command(Command::MailFrom { from })
            .await?
            .require_success()?;
        Ok(self.transition())
    }
}

impl<S> Client<MailTransaction<S>> {
    /// Adds the first recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Client<RecipientAdded<S>>> {
        self.send_command(Command::RcptTo { to })
            .await?
            .require_success()?;
        Ok(self.transition())
    }

    /// Aborts the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RSET command fails.
    pub async fn reset(mut self) -> Result<Client<S>> {
        self.send_command(Command::Rset).await?.require_success()?;
        Ok(self.transition())
    }
}

impl<S> Client<RecipientAdded<S>> {
    /// Adds another recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Self> {
        self.send_command(Command::RcptTo { to })
            .await?
            .require_success()?;
        Ok(self)
    }

    /// Begins sending message data.
    ///
    /// # Errors
    ///
    /// Returns an error if the DATA command fails.
    pub async fn data(mut self) -> Result<Client<Data<S>>> {
        self.send_command(Command::Data)
            .await?
            .require(ReplyCode::START_DATA)?;
        Ok(self.transition())
    }

    /// Aborts the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RSET command fails.
    pub async fn reset(mut self) -> Result<Client<S>> {
        self.send_command(Command::Rset).await?.require_success()?;
        Ok(self.transition())
    }
}

impl<S> Client<Data<S>> {
    /// Sends the message content and completes the transaction.
    ///
    /// Line endings are normalized to CRLF, lines starting with `.` are
    /// dot-stuffed, and the terminating `.` line is appended.
    ///
    /// # Errors
    ///
    /// Returns an error if sending the message fails or server rejects it.
    pub async fn send_message(mut self, message: &[u8]) -> Result<Client<S>> {
        let payload = encode_data(message);
        self.stream.write_all(&payload).await?;
        read_reply(&mut self.stream).await?.require_success()?;
        tracing::debug!(bytes = payload.len(), "Message accepted");
        Ok(self.transition())
    }
}

/// Frames message content for the DATA phase.
///
/// Every line ends in CRLF, lines starting with `.` get an extra `.`, and
/// the `.` terminator line is appended.
#[must_use]
pub fn encode_data(message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len() + message.len() / 64 + 5);
    for line in message.split_inclusive(|&b| b == b'\n') {
        let line = line.strip_suffix(b"\n").unwrap_or(line);
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.first() == Some(&b'.') {
            out.push(b'.');
        }
        out.extend_from_slice(line);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b".\r\n");
    out
}

// Common implementation for all states
impl<S> Client<S> {
    #[allow(clippy::missing_const_for_fn)] // SmtpStream has a destructor
    fn transition<T>(self) -> Client<T> {
        Client {
            stream: self.stream,
            server_info: self.server_info,
            _state: PhantomData,
        }
    }

    async fn send_command(&mut self, cmd: Command) -> Result<Reply> {
        tracing::trace!(command = %cmd.redacted(), "Sending command");
        self.stream.write_all(&cmd.serialize()).await?;
        read_reply(&mut self.stream).await
    }

    /// Returns the local socket address of the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket is no longer connected.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.stream.local_addr()
    }

    /// Returns true once the connection is encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        self.stream.is_tls()
    }

    /// Sends QUIT and closes the connection (available in any state).
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT command fails.
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.send_command(Command::Quit).await?;

        if !reply.is_success() && reply.code != ReplyCode::CLOSING {
            return Err(reply.into_error());
        }

        Ok(())
    }
}

async fn read_reply(stream: &mut SmtpStream) -> Result<Reply> {
    let mut lines = Vec::new();
    loop {
        let line = stream.read_line().await?;
        if line.is_empty() {
            continue;
        }

        let is_last = is_last_reply_line(&line);
        lines.push(line);

        if is_last {
            break;
        }
    }

    parse_reply(&lines)
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
    fn test_encode_data_normalizes_line_endings() {
        assert_eq!(encode_data(b"a\nb\r\nc"), b"a\r\nb\r\nc\r\n.\r\n");
    }

    #[test]
    fn test_encode_data_trailing_newline_is_not_doubled() {
        assert_eq!(encode_data(b"hello\r\n"), b"hello\r\n.\r\n");
    }

    #[test]
    fn test_encode_data_dot_stuffing() {
        assert_eq!(
            encode_data(b".hidden\r\n..two\r\nnot.first\r\n"),
            b"..hidden\r\n...two\r\nnot.first\r\n.\r\n"
        );
    }

    #[test]
    fn test_encode_data_empty() {
        assert_eq!(encode_data(b""), b".\r\n");
    }

    #[test]
    fn test_encode_data_blank_lines_kept() {
        assert_eq!(encode_data(b"a\r\n\r\nb\r\n"), b"a\r\n\r\nb\r\n.\r\n");
    }
}
