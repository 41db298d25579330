//! Error types for the core library.

use thiserror::Error;

use crate::validation::ValidationError;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Settings or message failed validation.
    #[error("{}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    /// SMTP operation failed.
    #[error("SMTP error: {0}")]
    Smtp(#[from] mailpost_smtp::Error),

    /// Message composition or delivery failed.
    #[error("{0}")]
    Mime(#[from] mailpost_mime::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<Vec<ValidationError>> for Error {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self::Validation(errors)
    }
}

impl Error {
    /// Returns true if the error was raised before any network activity,
    /// because the settings or the message are unusable.
    #[must_use]
    pub const fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Config(_) | Self::Mime(mailpost_mime::Error::Validation(_))
        )
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

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
    fn test_validation_errors_one_per_line() {
        let err = Error::Validation(vec![
            ValidationError::MissingHost,
            ValidationError::MissingPort,
        ]);
        assert_eq!(err.to_string(), "SMTP host is required\nSMTP port is required");
        assert!(err.is_usage());
    }

    #[test]
    fn test_smtp_error_is_not_usage() {
        let err = Error::from(mailpost_smtp::Error::smtp_error(550, "mailbox unavailable"));
        assert!(!err.is_usage());
        assert!(err.to_string().contains("550"));
    }
}
