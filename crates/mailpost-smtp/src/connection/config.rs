//! Connection configuration types.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::client::{Client, Connected};
use super::stream::{connect, connect_tls, tls_connector};
use crate::error::Result;

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// No encryption.
    #[default]
    None,
    /// Start with plaintext, upgrade with STARTTLS.
    StartTls,
    /// TLS from the start (port 465).
    Tls,
}

impl Security {
    /// Returns the conventional port for this security mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None => 25,
            Self::StartTls => 587,
            Self::Tls => 465,
        }
    }

    /// Returns true if the connection ends up encrypted.
    #[must_use]
    pub const fn is_encrypted(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Returns the name used in settings files and on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::StartTls => "starttls",
            Self::Tls => "ssl/tls",
        }
    }
}

impl fmt::Display for Security {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown security protocol name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown security protocol '{0}'")]
pub struct ParseSecurityError(pub String);

impl FromStr for Security {
    type Err = ParseSecurityError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "starttls" => Ok(Self::StartTls),
            "ssl/tls" | "tls" | "ssl" => Ok(Self::Tls),
            _ => Err(ParseSecurityError(s.to_string())),
        }
    }
}

/// SMTP server connection configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// PEM file whose certificates replace the default trust roots.
    pub root_ca: Option<PathBuf>,
    /// Name sent with EHLO.
    pub helo_name: String,
    /// Connection timeout.
    pub connect_timeout: Duration,
}

impl ServerConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> ServerConfigBuilder {
        ServerConfigBuilder::new(host)
    }

    /// Connects, reads the greeting, sends EHLO and, for STARTTLS, upgrades
    /// the connection and repeats EHLO.
    ///
    /// # Errors
    ///
    /// Returns an error if the root CA cannot be loaded, the connection or
    /// handshake fails, or the server does not offer STARTTLS when required.
    pub async fn open(&self) -> Result<Client<Connected>> {
        tracing::debug!(
            host = %self.host,
            port = self.port,
            security = %self.security,
            "Opening SMTP connection"
        );

        let stream = match self.security {
            Security::Tls => {
                let connector = tls_connector(self.root_ca.as_deref())?;
                connect_tls(&self.host, self.port, self.connect_timeout, &connector).await?
            }
            Security::None | Security::StartTls => {
                connect(&self.host, self.port, self.connect_timeout).await?
            }
        };

        let client = Client::from_stream(stream)
            .await?
            .ehlo(&self.helo_name)
            .await?;

        if self.security == Security::StartTls {
            let connector = tls_connector(self.root_ca.as_deref())?;
            return client
                .starttls(&self.host, &self.helo_name, &connector)
                .await;
        }
        Ok(client)
    }
}

/// Builder for server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    host: String,
    port: Option<u16>,
    security: Security,
    root_ca: Option<PathBuf>,
    helo_name: String,
    connect_timeout: Duration,
}

impl ServerConfigBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            security: Security::None,
            root_ca: None,
            helo_name: "localhost".to_string(),
            connect_timeout: Duration::from_secs(30),
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

    /// Trusts only the certificates in this PEM file.
    #[must_use]
    pub fn root_ca(mut self, path: impl Into<PathBuf>) -> Self {
        self.root_ca = Some(path.into());
        self
    }

    /// Sets the name sent with EHLO.
    #[must_use]
    pub fn helo_name(mut self, name: impl Into<String>) -> Self {
        self.helo_name = name.into();
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            host: self.host,
            port: self.port.unwrap_or_else(|| self.security.default_port()),
            security: self.security,
            root_ca: self.root_ca,
            helo_name: self.helo_name,
            connect_timeout: self.connect_timeout,
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
    fn test_security_from_str() {
        assert_eq!("".parse::<Security>().unwrap(), Security::None);
        assert_eq!("STARTTLS".parse::<Security>().unwrap(), Security::StartTls);
        assert_eq!("ssl/tls".parse::<Security>().unwrap(), Security::Tls);
        assert_eq!("tls".parse::<Security>().unwrap(), Security::Tls);
        assert_eq!(
            "smime".parse::<Security>().unwrap_err().to_string(),
            "unknown security protocol 'smime'"
        );
    }

    #[test]
    fn test_security_display_round_trips() {
        for security in [Security::None, Security::StartTls, Security::Tls] {
            assert_eq!(security.to_string().parse::<Security>().unwrap(), security);
        }
        assert!(!Security::None.is_encrypted());
        assert!(Security::StartTls.is_encrypted());
    }

    #[test]
    fn test_builder_default_port() {
        let config = ServerConfig::builder("smtp.example.com")
            .security(Security::Tls)
            .build();
        assert_eq!(config.port, 465);
        assert_eq!(config.helo_name, "localhost");
        assert!(config.root_ca.is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let config = ServerConfig::builder("smtp.example.com")
            .port(2525)
            .security(Security::StartTls)
            .root_ca("/etc/ssl/ca.pem")
            .helo_name("client.example.com")
            .connect_timeout(Duration::from_secs(5))
            .build();
        assert_eq!(config.port, 2525);
        assert_eq!(config.security, Security::StartTls);
        assert_eq!(config.root_ca, Some(PathBuf::from("/etc/ssl/ca.pem")));
        assert_eq!(config.helo_name, "client.example.com");
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
    }
}
