//! Outgoing message composition.

use std::path::PathBuf;

use crate::attachment::{Attachment, encode_attachments};
use crate::body::BodyBuilder;
use crate::content_type::ContentType;
use crate::error::{Error, Result};
use crate::header::Headers;
use crate::id::IdGenerator;
use crate::mailbox::Mailbox;
use crate::node::ContentNode;
use crate::transport::Transport;
use crate::validation::{ValidationError, ValidationResult, validate_message};

/// An outgoing email message.
///
/// Every boundary and content-ID comes from the message's own
/// [`IdGenerator`], so two messages never share state.
#[derive(Debug, Clone, Default)]
pub struct Message {
    sender: Option<Mailbox>,
    to: Vec<Mailbox>,
    cc: Vec<Mailbox>,
    bcc: Vec<Mailbox>,
    reply_to: Vec<Mailbox>,
    subject: String,
    message_id: Option<String>,
    custom_headers: Vec<String>,
    body_plain_text: String,
    body_html: String,
    attachments: Vec<Attachment>,
    ids: IdGenerator,
}

impl Message {
    /// Creates an empty message with random boundaries and content-IDs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty message using the given token generator.
    #[must_use]
    pub fn with_id_generator(ids: IdGenerator) -> Self {
        Self {
            ids,
            ..Self::default()
        }
    }

    /// Switches to prefix-and-counter tokens with a fresh counter.
    ///
    /// Must be called before the first attachment is added for the
    /// content-IDs to be reproducible.
    pub fn set_deterministic_ids(&mut self, prefix: impl Into<String>) {
        if !self.attachments.is_empty() {
            tracing::warn!(
                count = self.attachments.len(),
                "Deterministic ids enabled after attachments were added"
            );
        }
        self.ids = IdGenerator::deterministic(prefix);
    }

    /// Sets the sender.
    pub fn set_sender(&mut self, sender: Mailbox) {
        self.sender = Some(sender);
    }

    /// Replaces the To, Cc and Bcc lists.
    pub fn set_recipients(&mut self, to: Vec<Mailbox>, cc: Vec<Mailbox>, bcc: Vec<Mailbox>) {
        self.to = to;
        self.cc = cc;
        self.bcc = bcc;
    }

    /// Replaces the Reply-To list.
    pub fn set_reply_to(&mut self, reply_to: Vec<Mailbox>) {
        self.reply_to = reply_to;
    }

    /// Sets the subject.
    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.subject = subject.into();
    }

    /// Sets the Message-ID header value; an empty string clears it.
    pub fn set_message_id(&mut self, message_id: impl Into<String>) {
        let message_id = message_id.into();
        self.message_id = (!message_id.is_empty()).then_some(message_id);
    }

    /// Appends a raw `Name: value` header line.
    ///
    /// Empty lines are kept but never rendered.
    pub fn add_custom_header(&mut self, line: impl Into<String>) {
        self.custom_headers.push(line.into());
    }

    /// Sets the plain-text body; empty means no plain part.
    pub fn set_body_plain_text(&mut self, text: impl Into<String>) {
        self.body_plain_text = text.into();
    }

    /// Sets the HTML body; empty means no HTML part.
    pub fn set_body_html(&mut self, html: impl Into<String>) {
        self.body_html = html.into();
    }

    /// Attaches a file and returns its content-ID.
    ///
    /// The content type is detected from the file when the message is
    /// rendered.
    ///
    /// # Errors
    ///
    /// Returns an error if a deterministic content-ID does not fit.
    pub fn add_attachment(&mut self, path: impl Into<PathBuf>) -> Result<String> {
        self.push_attachment(Attachment::new(path))
    }

    /// Attaches a file with an explicit content type and returns its
    /// content-ID.
    ///
    /// # Errors
    ///
    /// Returns an error if a deterministic content-ID does not fit.
    pub fn add_attachment_with_type(
        &mut self,
        path: impl Into<PathBuf>,
        content_type: impl Into<String>,
    ) -> Result<String> {
        self.push_attachment(Attachment::new(path).with_content_type(content_type))
    }

    fn push_attachment(&mut self, attachment: Attachment) -> Result<String> {
        let content_id = self.ids.next_content_id()?;
        tracing::debug!(path = %attachment.path().display(), %content_id, "Attachment added");
        self.attachments
            .push(attachment.with_content_id(content_id.clone()));
        Ok(content_id)
    }

    /// Returns the sender.
    #[must_use]
    pub const fn sender(&self) -> Option<&Mailbox> {
        self.sender.as_ref()
    }

    /// Returns the To list.
    #[must_use]
    pub fn to(&self) -> &[Mailbox] {
        &self.to
    }

    /// Returns the Cc list.
    #[must_use]
    pub fn cc(&self) -> &[Mailbox] {
        &self.cc
    }

    /// Returns the Bcc list.
    #[must_use]
    pub fn bcc(&self) -> &[Mailbox] {
        &self.bcc
    }

    /// Returns the Reply-To list.
    #[must_use]
    pub fn reply_to(&self) -> &[Mailbox] {
        &self.reply_to
    }

    /// Returns To, Cc and Bcc recipients in that order.
    pub fn all_recipients(&self) -> impl Iterator<Item = &Mailbox> {
        self.to.iter().chain(&self.cc).chain(&self.bcc)
    }

    /// Returns the subject.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Returns the Message-ID, if set.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    /// Returns the raw custom header lines.
    #[must_use]
    pub fn custom_headers(&self) -> &[String] {
        &self.custom_headers
    }

    /// Returns the plain-text body.
    #[must_use]
    pub fn body_plain_text(&self) -> &str {
        &self.body_plain_text
    }

    /// Returns the HTML body.
    #[must_use]
    pub fn body_html(&self) -> &str {
        &self.body_html
    }

    /// Returns the attachments in order.
    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Checks the message, reporting every problem at once.
    ///
    /// # Errors
    ///
    /// Returns all validation errors found.
    pub fn validate(&self) -> ValidationResult {
        validate_message(self)
    }

    /// Detects and caches the content type of every attachment that has
    /// none.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] for the first attachment that cannot be read.
    pub fn resolve_content_types(&mut self) -> Result<()> {
        for attachment in &mut self.attachments {
            attachment.resolve_content_type()?;
        }
        Ok(())
    }

    /// Builds the MIME body tree.
    ///
    /// The body is built before the attachment container, so an
    /// alternative boundary is always drawn before the mixed one.
    ///
    /// # Errors
    ///
    /// Returns an error if an attachment cannot be read or a token cannot be
    /// generated.
    pub fn build_content_tree(&mut self) -> Result<Option<ContentNode>> {
        let body = BodyBuilder::new(&self.body_plain_text, &self.body_html)
            .with_attachments(&self.attachments)
            .build(&mut self.ids)?;

        if self.attachments.is_empty() {
            return Ok(body);
        }

        let parts = encode_attachments(&self.attachments)?;
        let boundary = self.ids.next_boundary()?;
        let headers = Headers::new().with(
            "Content-Type",
            ContentType::multipart_mixed(boundary.as_str()).to_string(),
        );
        let children = body.into_iter().chain(parts).collect();
        Ok(Some(ContentNode::container(boundary, headers, children)))
    }

    /// Renders the complete message: envelope headers followed by the body
    /// tree, CRLF-delimited and ready to follow `DATA`.
    ///
    /// # Errors
    ///
    /// Returns an error if the message has no content, an attachment cannot
    /// be read, or a token cannot be generated.
    pub fn render_content_text(&mut self) -> Result<String> {
        self.resolve_content_types()?;
        let root = self
            .build_content_tree()?
            .ok_or_else(|| Error::Validation(vec![ValidationError::EmptyContent]))?;

        let mut out = self.render_header_block();
        root.render_into(&mut out, None);
        Ok(out)
    }

    fn render_header_block(&self) -> String {
        let mut out = String::new();
        let mut line = |name: &str, value: &str| {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push_str("\r\n");
        };

        if let Some(sender) = &self.sender {
            line("From", &sender.to_string());
        }
        line("To", &join_mailboxes(&self.to));
        if !self.cc.is_empty() {
            line("Cc", &join_mailboxes(&self.cc));
        }
        line("Subject", &self.subject);
        if !self.reply_to.is_empty() {
            line("Reply-To", &join_mailboxes(&self.reply_to));
        }
        if let Some(id) = &self.message_id {
            line("Message-ID", id);
        }
        line("MIME-Version", "1.0");

        for header in self.custom_headers.iter().filter(|h| !h.is_empty()) {
            out.push_str(header);
            out.push_str("\r\n");
        }
        out
    }

    /// Validates, renders and delivers the message over `transport`.
    ///
    /// Nothing reaches the transport unless validation and rendering both
    /// succeed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] with every problem found, a rendering
    /// error, or [`Error::Transport`] if the channel fails.
    pub async fn send_content<T: Transport>(&mut self, transport: &mut T) -> Result<()> {
        self.validate()?;
        let content = self.render_content_text()?;

        let from = self
            .sender
            .as_ref()
            .map(Mailbox::address)
            .ok_or_else(|| Error::Validation(vec![ValidationError::MissingSender]))?
            .to_string();
        let recipients: Vec<&str> = self.all_recipients().map(Mailbox::address).collect();
        tracing::debug!(
            %from,
            recipients = recipients.len(),
            bytes = content.len(),
            "Sending message content"
        );

        transport
            .send_envelope(&from, &recipients)
            .await
            .map_err(|e| Error::Transport(Box::new(e)))?;
        transport
            .send_data(content.as_bytes())
            .await
            .map_err(|e| Error::Transport(Box::new(e)))?;

        tracing::info!(recipients = recipients.len(), "Message content sent");
        Ok(())
    }
}

fn join_mailboxes(mailboxes: &[Mailbox]) -> String {
    mailboxes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
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

    fn mailbox(addr: &str) -> Mailbox {
        Mailbox::parse(addr).unwrap()
    }

    fn plain_message() -> Message {
        let mut message = Message::with_id_generator(IdGenerator::deterministic("ID_"));
        message.set_sender(mailbox("Sender <sender@example.com>"));
        message.set_recipients(vec![mailbox("to@example.com")], Vec::new(), Vec::new());
        message.set_subject("Hello");
        message.set_body_plain_text("Hi there");
        message
    }

    #[test]
    fn test_render_plain_message() {
        let mut message = plain_message();
        assert_eq!(
            message.render_content_text().unwrap(),
            "From: \"Sender\" <sender@example.com>\r\n\
             To: <to@example.com>\r\n\
             Subject: Hello\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: text/plain; charset=\"UTF-8\"\r\n\
             Content-Transfer-Encoding: 7bit\r\n\
             \r\n\
             Hi there\r\n\
             \r\n"
        );
    }

    #[test]
    fn test_optional_headers_in_order() {
        let mut message = plain_message();
        message.set_recipients(
            vec![mailbox("a@example.com"), mailbox("B <b@example.com>")],
            vec![mailbox("c@example.com")],
            vec![mailbox("hidden@example.com")],
        );
        message.set_reply_to(vec![mailbox("reply@example.com")]);
        message.set_message_id("<1234@example.com>");
        message.add_custom_header("X-Mailer: mailpost");
        message.add_custom_header("");

        let text = message.render_content_text().unwrap();
        let header_block: Vec<&str> = text.split("\r\n").take(8).collect();
        assert_eq!(
            header_block,
            [
                "From: \"Sender\" <sender@example.com>",
                "To: <a@example.com>,\"B\" <b@example.com>",
                "Cc: <c@example.com>",
                "Subject: Hello",
                "Reply-To: <reply@example.com>",
                "Message-ID: <1234@example.com>",
                "MIME-Version: 1.0",
                "X-Mailer: mailpost",
            ]
        );
        assert!(!text.contains("hidden@example.com"));
    }

    #[test]
    fn test_empty_message_id_is_unset() {
        let mut message = plain_message();
        message.set_message_id("abc");
        message.set_message_id("");
        assert!(message.message_id().is_none());
    }

    #[test]
    fn test_render_without_content_fails() {
        let mut message = plain_message();
        message.set_body_plain_text("");
        let err = message.render_content_text().unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ref errors) if errors == &[ValidationError::EmptyContent]
        ));
    }

    #[test]
    fn test_all_recipients_order() {
        let mut message = plain_message();
        message.set_recipients(
            vec![mailbox("a@example.com")],
            vec![mailbox("b@example.com")],
            vec![mailbox("c@example.com")],
        );
        let addresses: Vec<&str> = message.all_recipients().map(Mailbox::address).collect();
        assert_eq!(addresses, ["a@example.com", "b@example.com", "c@example.com"]);
    }

    #[test]
    fn test_content_ids_are_stable() {
        let mut message = plain_message();
        let first = message.add_attachment("/tmp/a.txt").unwrap();
        let second = message
            .add_attachment_with_type("/tmp/b.txt", "text/plain")
            .unwrap();
        assert_ne!(first, second);
        assert_eq!(message.attachments()[0].content_id(), Some(first.as_str()));
        assert_eq!(message.attachments()[1].content_id(), Some(second.as_str()));
        assert_eq!(message.attachments()[1].content_type(), Some("text/plain"));
    }

    #[test]
    fn test_set_deterministic_ids_resets_counter() {
        let mut message = Message::new();
        message.set_deterministic_ids("X_");
        let id = message.add_attachment("/tmp/a.txt").unwrap();
        assert!(id.starts_with("X_0"));
        assert!(id.ends_with("01"));
    }
}
