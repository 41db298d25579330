//! Message validation.

use std::path::PathBuf;

use crate::message::Message;

/// Validation error for a message about to be rendered or sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No sender address.
    MissingSender,
    /// No `To` recipient.
    MissingRecipients,
    /// Subject is empty.
    MissingSubject,
    /// An attachment path does not exist.
    MissingAttachment(PathBuf),
    /// Neither a body nor attachments.
    EmptyContent,
}

impl ValidationError {
    /// Get the field name this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::MissingSender => "sender",
            Self::MissingRecipients => "to",
            Self::MissingSubject => "subject",
            Self::MissingAttachment(_) => "attachment",
            Self::EmptyContent => "body",
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingSender => f.write_str("No sender provided"),
            Self::MissingRecipients => f.write_str("No recipients provided"),
            Self::MissingSubject => f.write_str("No subject provided"),
            Self::MissingAttachment(path) => {
                write!(f, "Attachment file {} does not exist", path.display())
            }
            Self::EmptyContent => f.write_str("No body or attachments provided"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Result of validating a message.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Validate a message, collecting every problem.
///
/// # Errors
///
/// Returns all validation errors found.
pub fn validate_message(message: &Message) -> ValidationResult {
    let mut errors = Vec::new();

    if message.sender().is_none() {
        errors.push(ValidationError::MissingSender);
    }

    if message.to().is_empty() {
        errors.push(ValidationError::MissingRecipients);
    }

    if message.subject().is_empty() {
        errors.push(ValidationError::MissingSubject);
    }

    for attachment in message.attachments() {
        if !attachment.path().exists() {
            errors.push(ValidationError::MissingAttachment(
                attachment.path().to_path_buf(),
            ));
        }
    }

    if message.body_plain_text().is_empty()
        && message.body_html().is_empty()
        && message.attachments().is_empty()
    {
        errors.push(ValidationError::EmptyContent);
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
    use crate::mailbox::Mailbox;

    fn valid_message() -> Message {
        let mut message = Message::new();
        message.set_sender(Mailbox::new("sender@example.com").unwrap());
        message.set_recipients(
            vec![Mailbox::new("to@example.com").unwrap()],
            Vec::new(),
            Vec::new(),
        );
        message.set_subject("Subject");
        message.set_body_plain_text("Body");
        message
    }

    #[test]
    fn test_valid_message() {
        assert!(validate_message(&valid_message()).is_ok());
    }

    #[test]
    fn test_all_errors_are_collected() {
        let mut message = Message::new();
        message.set_body_plain_text("Body");
        let errors = validate_message(&message).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::MissingSender,
                ValidationError::MissingRecipients,
                ValidationError::MissingSubject,
            ]
        );
    }

    #[test]
    fn test_whitespace_subject_is_accepted() {
        let mut message = valid_message();
        message.set_subject(" ");
        assert!(validate_message(&message).is_ok());

        message.set_subject("");
        let errors = validate_message(&message).unwrap_err();
        assert_eq!(errors, vec![ValidationError::MissingSubject]);
    }

    #[test]
    fn test_bcc_only_is_missing_recipients() {
        let mut message = valid_message();
        message.set_recipients(
            Vec::new(),
            Vec::new(),
            vec![Mailbox::new("bcc@example.com").unwrap()],
        );
        let errors = validate_message(&message).unwrap_err();
        assert_eq!(errors, vec![ValidationError::MissingRecipients]);
    }

    #[test]
    fn test_missing_attachment_file() {
        let mut message = valid_message();
        message.add_attachment("/does/not/exist.pdf").unwrap();
        let errors = validate_message(&message).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::MissingAttachment(PathBuf::from(
                "/does/not/exist.pdf"
            ))]
        );
        assert_eq!(
            errors[0].to_string(),
            "Attachment file /does/not/exist.pdf does not exist"
        );
    }

    #[test]
    fn test_empty_content() {
        let mut message = valid_message();
        message.set_body_plain_text("");
        let errors = validate_message(&message).unwrap_err();
        assert_eq!(errors, vec![ValidationError::EmptyContent]);
        assert_eq!(errors[0].field(), "body");
    }
}
