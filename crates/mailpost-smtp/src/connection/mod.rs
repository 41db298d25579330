//! SMTP connection management with type-state pattern.

mod client;
mod config;
mod session;
mod stream;

pub use client::{
    Authenticated, Client, Connected, Data, MailTransaction, RecipientAdded, SessionState,
    SmtpConnection, encode_data,
};
pub use config::{ParseSecurityError, Security, ServerConfig, ServerConfigBuilder};
pub use session::Session;
pub use stream::{SmtpStream, connect, connect_tls, tls_connector};

use crate::types::{AuthMechanism, Extension};
use std::collections::HashSet;

/// Server capabilities from EHLO response.
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    /// Server hostname from greeting.
    pub hostname: String,
    /// Supported extensions.
    pub extensions: HashSet<Extension>,
}

impl ServerInfo {
    /// Checks if the server supports an extension.
    #[must_use]
    pub fn supports(&self, ext: &Extension) -> bool {
        self.extensions.contains(ext)
    }

    /// Checks if STARTTLS is supported.
    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.supports(&Extension::StartTls)
    }

    /// Returns the maximum message size, if advertised.
    #[must_use]
    pub fn max_message_size(&self) -> Option<usize> {
        self.extensions.iter().find_map(|ext| match ext {
            Extension::Size(size) => *size,
            _ => None,
        })
    }

    /// Returns advertised authentication mechanisms, or `None` when the
    /// server does not offer AUTH at all.
    #[must_use]
    pub fn auth_mechanisms(&self) -> Option<&[AuthMechanism]> {
        self.extensions.iter().find_map(|ext| match ext {
            Extension::Auth(mechanisms) => Some(mechanisms.as_slice()),
            _ => None,
        })
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

    fn info(lines: &[&str]) -> ServerInfo {
        ServerInfo {
            hostname: "mail.example.com".into(),
            extensions: lines.iter().map(|l| Extension::parse(l)).collect(),
        }
    }

    #[test]
    fn test_server_info_queries() {
        let info = info(&["STARTTLS", "SIZE 1000", "AUTH PLAIN CRAM-MD5"]);
        assert!(info.supports_starttls());
        assert_eq!(info.max_message_size(), Some(1000));
        assert_eq!(
            info.auth_mechanisms(),
            Some([AuthMechanism::Plain, AuthMechanism::CramMd5].as_slice())
        );
    }

    #[test]
    fn test_server_info_without_extensions() {
        let info = info(&[]);
        assert!(!info.supports_starttls());
        assert_eq!(info.max_message_size(), None);
        assert!(info.auth_mechanisms().is_none());
    }
}
