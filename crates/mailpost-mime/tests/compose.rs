//! Integration tests for message composition.
//!
//! Messages are rendered with deterministic ids so the exact wire text can
//! be compared, and delivered through an in-memory transport.

use std::fs;
use std::path::{Path, PathBuf};

use mailpost_mime::{
    CONTENT_ID_LENGTH, Error, IdGenerator, Mailbox, Message, Transport, ValidationError,
};

/// Transport that records what it is given.
#[derive(Default)]
struct MockTransport {
    from: Option<String>,
    recipients: Vec<String>,
    data: Vec<u8>,
    fail_data: bool,
}

#[derive(Debug, thiserror::Error)]
#[error("mock transport failure")]
struct MockError;

impl Transport for MockTransport {
    type Error = MockError;

    async fn send_envelope(&mut self, from: &str, recipients: &[&str]) -> Result<(), MockError> {
        self.from = Some(from.to_string());
        self.recipients = recipients.iter().map(ToString::to_string).collect();
        Ok(())
    }

    async fn send_data(&mut self, data: &[u8]) -> Result<(), MockError> {
        if self.fail_data {
            return Err(MockError);
        }
        self.data = data.to_vec();
        Ok(())
    }
}

fn mailbox(s: &str) -> Mailbox {
    Mailbox::parse(s).unwrap()
}

fn write_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, data).unwrap();
    path
}

fn base_message(prefix: &str) -> Message {
    let mut message = Message::new();
    message.set_deterministic_ids(prefix);
    message.set_sender(mailbox("Sender Name <sender@example.com>"));
    message.set_recipients(vec![mailbox("to@example.com")], Vec::new(), Vec::new());
    message.set_subject("Test");
    message
}

fn padded(prefix: &str, n: u64, length: usize) -> String {
    let width = length - prefix.len();
    format!("{prefix}{n:0>width$}")
}

#[test]
fn test_plain_only_has_no_boundaries() {
    let mut message = base_message("ID_");
    message.set_body_plain_text("Just text");

    let text = message.render_content_text().unwrap();
    assert_eq!(text.matches("Content-Transfer-Encoding: 7bit").count(), 1);
    assert!(!text.contains("boundary="));
    assert!(!text.contains("\r\n--"));
}

#[test]
fn test_alternative_uses_one_boundary() {
    let mut message = base_message("ID_");
    message.set_body_plain_text("plain");
    message.set_body_html("<p>html</p>");

    let text = message.render_content_text().unwrap();
    let boundary = padded("ID_", 1, 20);
    assert!(text.contains(&format!(
        "Content-Type: multipart/alternative; boundary=\"{boundary}\"\r\n"
    )));
    assert_eq!(text.matches(&format!("--{boundary}\r\n")).count(), 2);
    assert_eq!(text.matches(&format!("--{boundary}--\r\n")).count(), 1);

    let plain = text.find("text/plain").unwrap();
    let html = text.find("text/html").unwrap();
    assert!(plain < html);
    assert!(text.ends_with(&format!("--{boundary}--\r\n")));
}

#[test]
fn test_mixed_message_exact_output() {
    let dir = tempfile::tempdir().unwrap();
    let logo = write_file(dir.path(), "logo.png", b"PNGDATA");

    let mut message = base_message("ID_");
    message.set_recipients(
        vec![mailbox("a@example.com"), mailbox("B <b@example.com>")],
        vec![mailbox("c@example.com")],
        vec![mailbox("d@example.com")],
    );
    message.set_reply_to(vec![mailbox("r@example.com")]);
    message.set_message_id("<id@example.com>");
    message.add_custom_header("X-Mailer: mailpost");
    message.set_body_plain_text("Hello\nWorld");
    message.set_body_html("<p>Hello</p><img src=\"logo.png\">");
    let cid = message.add_attachment_with_type(&logo, "image/png").unwrap();

    assert_eq!(cid, padded("ID_", 1, CONTENT_ID_LENGTH));
    let alternative = padded("ID_", 2, 20);
    let mixed = padded("ID_", 3, 20);

    let expected = format!(
        "From: \"Sender Name\" <sender@example.com>\r\n\
         To: <a@example.com>,\"B\" <b@example.com>\r\n\
         Cc: <c@example.com>\r\n\
         Subject: Test\r\n\
         Reply-To: <r@example.com>\r\n\
         Message-ID: <id@example.com>\r\n\
         MIME-Version: 1.0\r\n\
         X-Mailer: mailpost\r\n\
         Content-Type: multipart/mixed; boundary=\"{mixed}\"\r\n\
         \r\n\
         --{mixed}\r\n\
         Content-Type: multipart/alternative; boundary=\"{alternative}\"\r\n\
         \r\n\
         --{alternative}\r\n\
         Content-Type: text/plain; charset=\"UTF-8\"\r\n\
         Content-Transfer-Encoding: 7bit\r\n\
         \r\n\
         Hello\r\nWorld\r\n\
         \r\n\
         --{alternative}\r\n\
         Content-Type: text/html; charset=\"UTF-8\"\r\n\
         Content-Transfer-Encoding: 7bit\r\n\
         \r\n\
         <p>Hello</p><img src=\"cid:{cid}\">\r\n\
         \r\n\
         --{alternative}--\r\n\
         --{mixed}\r\n\
         Content-Type: image/png; name=\"logo.png\"\r\n\
         Content-Transfer-Encoding: base64\r\n\
         Content-Disposition: attachment; filename=\"logo.png\"\r\n\
         Content-ID: {cid}\r\n\
         \r\n\
         UE5HREFUQQ==\r\n\
         \r\n\
         --{mixed}--\r\n"
    );
    assert_eq!(message.render_content_text().unwrap(), expected);
}

#[test]
fn test_mixed_nesting_with_several_attachments() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_file(dir.path(), "one.txt", b"one");
    let second = write_file(dir.path(), "two.txt", b"two");

    let mut message = base_message("N_");
    message.set_body_plain_text("plain");
    message.set_body_html("<p>html</p>");
    message.add_attachment(&first).unwrap();
    message.add_attachment(&second).unwrap();

    let text = message.render_content_text().unwrap();
    let inner = padded("N_", 3, 20);
    let outer = padded("N_", 4, 20);
    assert_ne!(inner, outer);

    // Outer opens before the alternative block and before each attachment.
    assert_eq!(text.matches(&format!("--{outer}\r\n")).count(), 3);
    assert_eq!(text.matches(&format!("--{outer}--\r\n")).count(), 1);
    assert_eq!(text.matches(&format!("--{inner}\r\n")).count(), 2);
    assert_eq!(text.matches(&format!("--{inner}--\r\n")).count(), 1);

    let inner_close = text.find(&format!("--{inner}--")).unwrap();
    let one = text.find("name=\"one.txt\"").unwrap();
    let two = text.find("name=\"two.txt\"").unwrap();
    assert!(inner_close < one && one < two);
    assert!(text.ends_with(&format!("--{outer}--\r\n")));
}

#[test]
fn test_deterministic_content_ids() {
    let mut message = base_message("ATTACH_");
    let first = message.add_attachment("/tmp/first.bin").unwrap();
    let second = message.add_attachment("/tmp/second.bin").unwrap();

    assert_eq!(first, padded("ATTACH_", 1, CONTENT_ID_LENGTH));
    assert_eq!(second, padded("ATTACH_", 2, CONTENT_ID_LENGTH));
    assert_eq!(first.len(), CONTENT_ID_LENGTH);
}

#[test]
fn test_content_id_rewriting_by_path() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_file(dir.path(), "chart.gif", b"GIF89a\x01\x00\x01\x00");
    let path = image.to_string_lossy().into_owned();

    let mut message = base_message("ID_");
    message.set_body_html(format!("<img src=\"{path}\">"));
    let cid = message.add_attachment(&image).unwrap();

    let text = message.render_content_text().unwrap();
    assert!(text.contains(&format!("<img src=\"cid:{cid}\">")));
    assert!(!text.contains(&format!("\"{path}\"")));
    assert!(text.contains("Content-Type: image/gif; name=\"chart.gif\""));
}

#[test]
fn test_validation_reports_every_problem() {
    let mut message = Message::new();
    message.set_body_plain_text("body");

    let errors = message.validate().unwrap_err();
    assert!(errors.contains(&ValidationError::MissingSender));
    assert!(errors.contains(&ValidationError::MissingRecipients));
    assert!(errors.contains(&ValidationError::MissingSubject));

    let err = Error::Validation(errors);
    let rendered = err.to_string();
    assert!(rendered.contains("No sender provided"));
    assert!(rendered.contains("No recipients provided"));
    assert!(rendered.contains("No subject provided"));
}

#[test]
fn test_detected_content_type_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "data.pdf", b"%PDF-1.4 test");

    let mut message = base_message("ID_");
    message.set_body_plain_text("see attachment");
    message.add_attachment(&path).unwrap();

    let first = message.render_content_text().unwrap();
    fs::write(&path, b"plain text now").unwrap();
    let second = message.render_content_text().unwrap();

    let header = "Content-Type: application/pdf; name=\"data.pdf\"";
    assert!(first.contains(header));
    assert!(second.contains(header));
    assert_eq!(
        message.attachments()[0].content_type(),
        Some("application/pdf")
    );
}

#[test]
fn test_line_endings_are_normalized() {
    let mut message = base_message("ID_");
    message.set_body_plain_text("a\nb\r\nc\\nd");

    let text = message.render_content_text().unwrap();
    assert!(text.contains("\r\n\r\na\r\nb\r\nc\r\nd\r\n\r\n"));
    assert!(!text.contains("\\n"));
}

#[test]
fn test_attachment_only_message() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "notes.txt", b"notes");

    let mut message = base_message("ID_");
    message.add_attachment(&path).unwrap();
    assert!(message.validate().is_ok());

    let text = message.render_content_text().unwrap();
    assert!(text.contains("multipart/mixed"));
    assert!(!text.contains("multipart/alternative"));
    assert!(text.contains("Content-Type: text/plain; charset=utf-8; name=\"notes.txt\""));
}

#[test]
fn test_token_too_short_aborts_render() {
    let mut message = base_message("A_VERY_LONG_PREFIX_1");
    message.set_body_plain_text("plain");
    message.set_body_html("<p>html</p>");

    let err = message.render_content_text().unwrap_err();
    assert!(matches!(err, Error::TokenTooShort { length: 20, .. }));
}

#[test]
fn test_missing_attachment_is_io_error_at_render() {
    let mut message = base_message("ID_");
    message.set_body_plain_text("plain");
    message.add_attachment("/does/not/exist.txt").unwrap();

    assert!(matches!(
        message.render_content_text().unwrap_err(),
        Error::Io { .. }
    ));
}

#[test]
fn test_send_content_delivers_envelope_and_data() {
    let mut message = base_message("ID_");
    message.set_recipients(
        vec![mailbox("to@example.com")],
        vec![mailbox("cc@example.com")],
        vec![mailbox("bcc@example.com")],
    );
    message.set_body_plain_text("hello");

    let mut transport = MockTransport::default();
    tokio_test::block_on(message.send_content(&mut transport)).unwrap();

    assert_eq!(transport.from.as_deref(), Some("sender@example.com"));
    assert_eq!(
        transport.recipients,
        ["to@example.com", "cc@example.com", "bcc@example.com"]
    );
    let data = String::from_utf8(transport.data).unwrap();
    assert!(data.starts_with("From: \"Sender Name\" <sender@example.com>\r\n"));
    assert!(!data.contains("bcc@example.com"));
}

#[test]
fn test_send_content_validates_before_transport() {
    let mut message = Message::new();
    let mut transport = MockTransport::default();

    let err = tokio_test::block_on(message.send_content(&mut transport)).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(transport.from.is_none());
    assert!(transport.data.is_empty());
}

#[test]
fn test_send_content_wraps_transport_error() {
    let mut message = base_message("ID_");
    message.set_body_plain_text("hello");
    let mut transport = MockTransport {
        fail_data: true,
        ..MockTransport::default()
    };

    let err = tokio_test::block_on(message.send_content(&mut transport)).unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
}

#[test]
fn test_independent_messages_do_not_share_counters() {
    let mut first = base_message("ID_");
    let mut second = base_message("ID_");
    assert_eq!(
        first.add_attachment("/tmp/a").unwrap(),
        second.add_attachment("/tmp/b").unwrap()
    );
    let generator = IdGenerator::deterministic("ID_");
    assert!(generator.is_deterministic());
}
