//! SMTP authentication.
//!
//! Supports PLAIN (RFC 4616) and CRAM-MD5 (RFC 2195). Which one is used,
//! if any, is decided by the caller through [`Authenticator`].

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};

use crate::connection::{Authenticated, Client, Connected, SmtpConnection};
use crate::error::{Error, Result};
use crate::types::AuthMechanism;

type HmacMd5 = Hmac<md5::Md5>;

/// Builds the CRAM-MD5 response: `username` and the hex HMAC-MD5 digest
/// of the challenge keyed by `password`, base64 encoded.
///
/// # Errors
///
/// Returns an error if the HMAC cannot be keyed.
pub fn cram_md5_response(username: &str, password: &str, challenge: &[u8]) -> Result<String> {
    let mut mac = HmacMd5::new_from_slice(password.as_bytes())
        .map_err(|e| Error::Auth(format!("CRAM-MD5 key: {e}")))?;
    mac.update(challenge);
    let digest = hex::encode(mac.finalize().into_bytes());
    Ok(STANDARD.encode(format!("{username} {digest}")))
}

/// Authentication method selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// PLAIN.
    Plain,
    /// CRAM-MD5.
    CramMd5,
}

impl AuthMethod {
    /// Returns the name used in settings files and on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::CramMd5 => "cram-md5",
        }
    }

    const fn mechanism(self) -> AuthMechanism {
        match self {
            Self::Plain => AuthMechanism::Plain,
            Self::CramMd5 => AuthMechanism::CramMd5,
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown authentication method name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown authentication method '{0}'")]
pub struct ParseAuthMethodError(pub String);

impl FromStr for AuthMethod {
    type Err = ParseAuthMethodError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" => Ok(Self::Plain),
            "cram-md5" => Ok(Self::CramMd5),
            _ => Err(ParseAuthMethodError(s.to_string())),
        }
    }
}

/// Login credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Creates credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns the login name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Authentication step run after EHLO.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Authenticator {
    /// Send mail without authenticating.
    #[default]
    None,
    /// Authenticate with PLAIN.
    Plain(Credentials),
    /// Authenticate with CRAM-MD5.
    CramMd5(Credentials),
}

/// Client state after the authentication step.
#[derive(Debug)]
pub enum Authorized {
    /// No authentication was requested.
    Anonymous(Client<Connected>),
    /// The server accepted the credentials.
    Authenticated(Client<Authenticated>),
}

impl Authenticator {
    /// Creates an authenticator for `method`, or [`Authenticator::None`]
    /// when no method is set.
    #[must_use]
    pub fn new(method: Option<AuthMethod>, credentials: Credentials) -> Self {
        match method {
            None => Self::None,
            Some(AuthMethod::Plain) => Self::Plain(credentials),
            Some(AuthMethod::CramMd5) => Self::CramMd5(credentials),
        }
    }

    /// Returns the configured method.
    #[must_use]
    pub const fn method(&self) -> Option<AuthMethod> {
        match self {
            Self::None => None,
            Self::Plain(_) => Some(AuthMethod::Plain),
            Self::CramMd5(_) => Some(AuthMethod::CramMd5),
        }
    }

    /// Runs the authentication exchange on a freshly greeted client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSupported`] if the server advertises no AUTH
    /// extension, or the server's error if it rejects the credentials.
    pub async fn authenticate(&self, client: Client<Connected>) -> Result<Authorized> {
        let (method, credentials) = match self {
            Self::None => return Ok(Authorized::Anonymous(client)),
            Self::Plain(credentials) => (AuthMethod::Plain, credentials),
            Self::CramMd5(credentials) => (AuthMethod::CramMd5, credentials),
        };

        let Some(offered) = client.server_info().auth_mechanisms() else {
            return Err(Error::NotSupported("AUTH".into()));
        };
        if !offered.contains(&method.mechanism()) {
            tracing::warn!(%method, "Server does not advertise mechanism, trying anyway");
        }

        let Credentials { username, password } = credentials;
        let client = match method {
            AuthMethod::Plain => client.auth_plain(username, password).await?,
            AuthMethod::CramMd5 => client.auth_cram_md5(username, password).await?,
        };
        Ok(Authorized::Authenticated(client))
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
    fn test_cram_md5_rfc2195_vector() {
        let response = cram_md5_response(
            "tim",
            "tanstaaftanstaaf",
            b"<1896.697170952@postoffice.reston.mci.net>",
        )
        .unwrap();
        assert_eq!(response, "dGltIGI5MTNhNjAyYzdlZGE3YTQ5NWI0ZTZlNzMzNGQzODkw");

        let decoded = String::from_utf8(STANDARD.decode(&response).unwrap()).unwrap();
        assert_eq!(decoded, "tim b913a602c7eda7a495b4e6e7334d3890");
    }

    #[test]
    fn test_auth_method_from_str() {
        assert_eq!("PLAIN".parse::<AuthMethod>().unwrap(), AuthMethod::Plain);
        assert_eq!("cram-md5".parse::<AuthMethod>().unwrap(), AuthMethod::CramMd5);
        assert!("login".parse::<AuthMethod>().is_err());
        assert_eq!(AuthMethod::CramMd5.to_string(), "cram-md5");
    }

    #[test]
    fn test_authenticator_new() {
        let creds = Credentials::new("user", "secret");
        assert_eq!(Authenticator::new(None, creds.clone()), Authenticator::None);
        assert_eq!(
            Authenticator::new(Some(AuthMethod::CramMd5), creds.clone()).method(),
            Some(AuthMethod::CramMd5)
        );
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let debug = format!("{:?}", Credentials::new("user", "secret"));
        assert!(debug.contains("user"));
        assert!(!debug.contains("secret"));
    }
}
