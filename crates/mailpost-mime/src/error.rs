//! Error types for message composition.

use std::path::PathBuf;

use crate::header::HeaderError;
use crate::validation::ValidationError;

/// Result type alias for message composition.
pub type Result<T> = std::result::Result<T, Error>;

/// Message composition error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// One or more message fields are missing or inconsistent.
    #[error("Message: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    /// An attachment file could not be read.
    #[error("Attachment {}: {source}", .path.display())]
    Io {
        /// Path of the attachment.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A deterministic token does not fit in the requested length.
    #[error("Token too short: prefix {prefix:?} with counter {counter} exceeds {length} characters")]
    TokenTooShort {
        /// Configured prefix.
        prefix: String,
        /// Counter value that did not fit.
        counter: u64,
        /// Requested token length.
        length: usize,
    },

    /// A mailbox could not be parsed.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// A custom header line is malformed.
    #[error(transparent)]
    InvalidHeader(#[from] HeaderError),

    /// The transport rejected the envelope or the content.
    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<Vec<ValidationError>> for Error {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self::Validation(errors)
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
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
    fn test_validation_display_lists_every_problem() {
        let err = Error::Validation(vec![
            ValidationError::MissingSender,
            ValidationError::MissingRecipients,
            ValidationError::MissingSubject,
        ]);
        assert_eq!(
            err.to_string(),
            "Message: No sender provided, No recipients provided, No subject provided"
        );
    }

    #[test]
    fn test_io_display_names_path() {
        let err = Error::Io {
            path: PathBuf::from("/tmp/missing.pdf"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(err.to_string(), "Attachment /tmp/missing.pdf: not found");
    }

    #[test]
    fn test_token_too_short_display() {
        let err = Error::TokenTooShort {
            prefix: "LONG_PREFIX_".to_string(),
            counter: 100,
            length: 12,
        };
        assert!(err.to_string().contains("LONG_PREFIX_"));
        assert!(err.to_string().contains("100"));
    }
}
