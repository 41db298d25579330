//! Send service.
//!
//! Turns [`Settings`] into a composed [`Message`] and delivers it over one
//! SMTP connection.

use std::net::SocketAddr;

use mailpost_mime::Message;
use mailpost_smtp::{Authenticator, Authorized, Client, ServerConfig, Session, SessionState};

use crate::error::{Error, Result};
use crate::settings::Settings;
use crate::validation::{ValidationError, ValidationResult, validate};

/// Outcome of a successful delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendReport {
    /// Local address of the SMTP connection.
    pub local_addr: SocketAddr,
}

/// Delivers messages using one set of settings.
#[derive(Debug, Clone)]
pub struct Mailer {
    settings: Settings,
}

impl Mailer {
    /// Creates a mailer.
    #[must_use]
    pub const fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Returns the settings.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Composes the message described by the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if an attachment cannot be registered.
    pub fn build_message(&self) -> Result<Message> {
        let settings = &self.settings;
        let mut message = Message::new();

        if let Some(sender) = &settings.sender {
            message.set_sender(sender.clone());
        }
        message.set_recipients(
            settings.to.clone(),
            settings.cc.clone(),
            settings.bcc.clone(),
        );
        message.set_reply_to(settings.reply_to.clone());
        message.set_subject(settings.subject.as_str());
        if let Some(id) = &settings.message_id {
            message.set_message_id(id.as_str());
        }
        for header in &settings.headers {
            message.add_custom_header(header.as_str());
        }
        message.set_body_plain_text(settings.body_text.as_str());
        message.set_body_html(settings.body_html.as_str());
        for path in &settings.attachments {
            message.add_attachment(path.as_path())?;
        }
        Ok(message)
    }

    /// Checks the settings and `message` without touching the network.
    ///
    /// # Errors
    ///
    /// Returns every settings and message problem found.
    pub fn check(&self, message: &Message) -> ValidationResult {
        validate(&self.settings, message)
    }

    /// Validates, connects, authenticates, transmits `message` and quits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] before any I/O if something is missing,
    /// otherwise the first connection, authentication or delivery error.
    pub async fn send(&self, message: &mut Message) -> Result<SendReport> {
        self.check(message)?;

        let server = self.server_config()?;
        let authenticator =
            Authenticator::new(self.settings.auth_method, self.settings.credentials());

        let client = server.open().await?;
        let local_addr = client.local_addr()?;
        tracing::debug!(%local_addr, tls = client.is_tls(), "Connected");

        match authenticator.authenticate(client).await? {
            Authorized::Anonymous(client) => deliver(client, message).await?,
            Authorized::Authenticated(client) => deliver(client, message).await?,
        }

        tracing::info!(
            host = %server.host,
            port = server.port,
            recipients = message.all_recipients().count(),
            "Message delivered"
        );
        Ok(SendReport { local_addr })
    }

    fn server_config(&self) -> Result<ServerConfig> {
        let settings = &self.settings;
        let host = settings
            .smtp_host
            .as_deref()
            .map(str::trim)
            .filter(|host| !host.is_empty())
            .ok_or_else(|| Error::Validation(vec![ValidationError::MissingHost]))?;
        let port = settings
            .smtp_port
            .filter(|&port| port != 0)
            .ok_or_else(|| Error::Validation(vec![ValidationError::MissingPort]))?;

        let mut builder = ServerConfig::builder(host)
            .port(port)
            .security(settings.security());
        if let Some(root_ca) = &settings.root_ca {
            builder = builder.root_ca(root_ca.as_path());
        }
        Ok(builder.build())
    }
}

async fn deliver<S: SessionState>(client: Client<S>, message: &mut Message) -> Result<()> {
    let mut session = Session::new(client);
    message.send_content(&mut session).await?;

    // The server already accepted the message.
    if let Err(e) = session.quit().await {
        tracing::warn!(error = %e, "QUIT failed after delivery");
    }
    Ok(())
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
    use mailpost_mime::Mailbox;
    use mailpost_smtp::Security;

    fn settings() -> Settings {
        Settings {
            smtp_host: Some("localhost".into()),
            smtp_port: Some(2525),
            sender: Some(Mailbox::parse("Sender <sender@example.com>").unwrap()),
            to: vec![Mailbox::parse("to@example.com").unwrap()],
            subject: "Hello".into(),
            body_text: "Body".into(),
            headers: vec!["X-Mailer: mailpost".into()],
            message_id: Some("<1@example.com>".into()),
            ..Settings::default()
        }
    }

    #[test]
    fn test_build_message() {
        let mailer = Mailer::new(settings());
        let message = mailer.build_message().unwrap();
        assert_eq!(message.sender().unwrap().address(), "sender@example.com");
        assert_eq!(message.to().len(), 1);
        assert_eq!(message.subject(), "Hello");
        assert_eq!(message.message_id(), Some("<1@example.com>"));
        assert_eq!(message.custom_headers(), ["X-Mailer: mailpost"]);
        assert!(mailer.check(&message).is_ok());
    }

    #[test]
    fn test_build_message_registers_attachments() {
        let settings = Settings {
            attachments: vec!["/does/not/exist.bin".into()],
            ..settings()
        };
        let mailer = Mailer::new(settings);
        let message = mailer.build_message().unwrap();
        assert_eq!(message.attachments().len(), 1);

        let errors = mailer.check(&message).unwrap_err();
        assert!(matches!(
            errors.as_slice(),
            [ValidationError::Message(
                mailpost_mime::ValidationError::MissingAttachment(_)
            )]
        ));
    }

    #[test]
    fn test_server_config() {
        let settings = Settings {
            security: Some(Security::StartTls),
            root_ca: Some("/etc/ca.pem".into()),
            ..settings()
        };
        let config = Mailer::new(settings).server_config().unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 2525);
        assert_eq!(config.security, Security::StartTls);
        assert!(config.root_ca.is_some());
    }

    #[tokio::test]
    async fn test_send_validates_before_connecting() {
        let settings = Settings {
            subject: String::new(),
            ..settings()
        };
        let mailer = Mailer::new(settings);
        let mut message = mailer.build_message().unwrap();

        let err = mailer.send(&mut message).await.unwrap_err();
        assert!(err.is_usage());
        assert!(matches!(
            err,
            Error::Validation(ref errors) if errors == &[ValidationError::Message(
                mailpost_mime::ValidationError::MissingSubject
            )]
        ));
    }
}
