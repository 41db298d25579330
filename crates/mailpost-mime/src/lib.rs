//! # mailpost-mime
//!
//! MIME composition for outgoing email.
//!
//! ## Features
//!
//! - **Body structure**: plain text, HTML, or both as `multipart/alternative`
//! - **Attachments**: base64 parts with sniffed content types, wrapped in
//!   `multipart/mixed`
//! - **Inline references**: quoted attachment paths in the HTML body become
//!   `cid:` URIs
//! - **Reproducible output**: prefix-and-counter boundaries and content-IDs
//! - **Validation**: every missing field reported at once
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailpost_mime::{Mailbox, Message};
//!
//! let mut message = Message::new();
//! message.set_sender(Mailbox::parse("Alice <alice@example.com>")?);
//! message.set_recipients(vec![Mailbox::parse("bob@example.com")?], vec![], vec![]);
//! message.set_subject("Report");
//! message.set_body_plain_text("See attached.");
//! message.set_body_html(r#"<p>See <img src="chart.png"></p>"#);
//! let cid = message.add_attachment("/tmp/chart.png")?;
//!
//! let text = message.render_content_text()?;
//! assert!(text.contains(&format!("cid:{cid}")));
//! ```
//!
//! ## Structure
//!
//! ```text
//! multipart/mixed                 (only with attachments)
//! ├── multipart/alternative       (only with both bodies)
//! │   ├── text/plain
//! │   └── text/html
//! ├── attachment 1
//! └── attachment N
//! ```
//!
//! Delivery goes through the [`Transport`] trait, implemented by the SMTP
//! session in `mailpost-smtp`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod attachment;
mod body;
mod content_type;
mod error;
mod header;
mod id;
mod mailbox;
mod message;
mod node;
mod transport;
mod validation;

pub mod encoding;
pub mod sniff;

pub use attachment::{Attachment, encode_attachments};
pub use body::{BodyBuilder, rewrite_cid_references};
pub use content_type::ContentType;
pub use error::{Error, Result};
pub use header::{HeaderError, Headers, MAX_LINE_LENGTH, check_header};
pub use id::{BOUNDARY_LENGTH, CONTENT_ID_LENGTH, IdGenerator};
pub use mailbox::Mailbox;
pub use message::Message;
pub use node::ContentNode;
pub use transport::Transport;
pub use validation::{ValidationError, ValidationResult, validate_message};
