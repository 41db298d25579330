//! Settings validation.

use std::path::PathBuf;

use mailpost_mime::{HeaderError, Message, check_header};
use mailpost_smtp::{AuthMethod, Security};

use crate::settings::Settings;

/// Validation error for send settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// SMTP host is empty.
    MissingHost,
    /// SMTP port is missing or zero.
    MissingPort,
    /// Root CA file does not exist.
    RootCaNotFound(PathBuf),
    /// Login is empty while an authentication method is set.
    MissingLogin(AuthMethod),
    /// Password is empty while an authentication method is set.
    MissingPassword(AuthMethod),
    /// PLAIN credentials would cross the network unencrypted.
    PlainAuthUnencrypted,
    /// An encrypted connection without authentication.
    AuthRequired(Security),
    /// A custom header line is malformed.
    InvalidHeader {
        /// The offending header line.
        header: String,
        /// What is wrong with it.
        error: HeaderError,
    },
    /// The message itself is incomplete.
    Message(mailpost_mime::ValidationError),
}

impl ValidationError {
    /// Get the field name this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::MissingHost => "smtp-host",
            Self::MissingPort => "smtp-port",
            Self::RootCaNotFound(_) => "rootca",
            Self::MissingLogin(_) => "login",
            Self::MissingPassword(_) => "password",
            Self::PlainAuthUnencrypted | Self::AuthRequired(_) => "auth-method",
            Self::InvalidHeader { .. } => "header",
            Self::Message(error) => error.field(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingHost => f.write_str("SMTP host is required"),
            Self::MissingPort => f.write_str("SMTP port is required"),
            Self::RootCaNotFound(path) => {
                write!(f, "Root CA file {} does not exist", path.display())
            }
            Self::MissingLogin(method) => {
                write!(f, "Login is required for authentication method '{method}'")
            }
            Self::MissingPassword(method) => {
                write!(f, "Password is required for authentication method '{method}'")
            }
            Self::PlainAuthUnencrypted => write!(
                f,
                "Authentication method '{}' is only allowed on a secure connection",
                AuthMethod::Plain
            ),
            Self::AuthRequired(security) => {
                write!(f, "Authentication is required for security protocol '{security}'")
            }
            Self::InvalidHeader { header, error } => write!(f, "Header '{header}': {error}"),
            Self::Message(error) => error.fmt(f),
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<mailpost_mime::ValidationError> for ValidationError {
    fn from(error: mailpost_mime::ValidationError) -> Self {
        Self::Message(error)
    }
}

/// Result of validating settings.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Validate the connection and authentication settings.
///
/// # Errors
///
/// Returns every problem found.
pub fn validate_settings(settings: &Settings) -> ValidationResult {
    let mut errors = Vec::new();

    let host = settings.smtp_host.as_deref().map_or("", str::trim);
    if host.is_empty() {
        errors.push(ValidationError::MissingHost);
    }
    if settings.smtp_port.is_none_or(|port| port == 0) {
        errors.push(ValidationError::MissingPort);
    }
    if let Some(path) = &settings.root_ca
        && !path.exists()
    {
        errors.push(ValidationError::RootCaNotFound(path.clone()));
    }

    let security = settings.security();
    if let Some(method) = settings.auth_method {
        if settings.login.as_deref().is_none_or(str::is_empty) {
            errors.push(ValidationError::MissingLogin(method));
        }
        if settings.password.as_deref().is_none_or(str::is_empty) {
            errors.push(ValidationError::MissingPassword(method));
        }
    }

    // Credentials may only travel in the clear to the local host.
    match (security, settings.auth_method) {
        (Security::None, Some(AuthMethod::Plain)) if host != "localhost" => {
            errors.push(ValidationError::PlainAuthUnencrypted);
        }
        (Security::StartTls | Security::Tls, None) => {
            errors.push(ValidationError::AuthRequired(security));
        }
        _ => {}
    }

    for header in &settings.headers {
        if let Err(error) = check_header(header) {
            errors.push(ValidationError::InvalidHeader {
                header: header.clone(),
                error,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate settings and the message built from them together.
///
/// # Errors
///
/// Returns the settings problems followed by the message problems.
pub fn validate(settings: &Settings, message: &Message) -> ValidationResult {
    let mut errors = validate_settings(settings).err().unwrap_or_default();
    if let Err(message_errors) = message.validate() {
        errors.extend(message_errors.into_iter().map(ValidationError::from));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
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

    fn valid_settings() -> Settings {
        Settings {
            smtp_host: Some("smtp.example.com".into()),
            smtp_port: Some(587),
            security: Some(Security::StartTls),
            auth_method: Some(AuthMethod::Plain),
            login: Some("user".into()),
            password: Some("secret".into()),
            ..Settings::default()
        }
    }

    #[test]
    fn test_valid_settings() {
        assert!(validate_settings(&valid_settings()).is_ok());
    }

    #[test]
    fn test_empty_settings_collects_all() {
        let errors = validate_settings(&Settings::default()).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::MissingHost, ValidationError::MissingPort]
        );
    }

    #[test]
    fn test_missing_credentials() {
        let settings = Settings {
            login: None,
            password: Some(String::new()),
            ..valid_settings()
        };
        let errors = validate_settings(&settings).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::MissingLogin(AuthMethod::Plain),
                ValidationError::MissingPassword(AuthMethod::Plain),
            ]
        );
        assert_eq!(errors[0].field(), "login");
    }

    #[test]
    fn test_plain_auth_without_encryption() {
        let settings = Settings {
            security: None,
            ..valid_settings()
        };
        assert_eq!(
            validate_settings(&settings).unwrap_err(),
            vec![ValidationError::PlainAuthUnencrypted]
        );

        let local = Settings {
            smtp_host: Some("localhost".into()),
            ..settings
        };
        assert!(validate_settings(&local).is_ok());
    }

    #[test]
    fn test_cram_md5_without_encryption_is_allowed() {
        let settings = Settings {
            security: Some(Security::None),
            auth_method: Some(AuthMethod::CramMd5),
            ..valid_settings()
        };
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_encryption_requires_auth() {
        let settings = Settings {
            security: Some(Security::Tls),
            auth_method: None,
            ..valid_settings()
        };
        let errors = validate_settings(&settings).unwrap_err();
        assert_eq!(errors, vec![ValidationError::AuthRequired(Security::Tls)]);
        assert_eq!(
            errors[0].to_string(),
            "Authentication is required for security protocol 'ssl/tls'"
        );
    }

    #[test]
    fn test_root_ca_must_exist() {
        let settings = Settings {
            root_ca: Some(PathBuf::from("/does/not/exist.pem")),
            ..valid_settings()
        };
        assert!(matches!(
            validate_settings(&settings).unwrap_err().as_slice(),
            [ValidationError::RootCaNotFound(_)]
        ));
    }

    #[test]
    fn test_invalid_header() {
        let settings = Settings {
            headers: vec!["X-Ok: yes".into(), "no colon".into()],
            ..valid_settings()
        };
        let errors = validate_settings(&settings).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field(), "header");
    }

    #[test]
    fn test_validate_includes_message_errors() {
        let message = Message::new();
        let errors = validate(&Settings::default(), &message).unwrap_err();
        assert_eq!(errors[0], ValidationError::MissingHost);
        assert!(errors.contains(&ValidationError::Message(
            mailpost_mime::ValidationError::MissingSender
        )));
        assert!(errors.contains(&ValidationError::Message(
            mailpost_mime::ValidationError::EmptyContent
        )));
    }
}
