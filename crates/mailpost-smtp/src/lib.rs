//! # mailpost-smtp
//!
//! Async SMTP submission client (RFC 5321) for delivering one composed
//! message per connection.
//!
//! ## Features
//!
//! - **Type-state connection management**: Compile-time enforcement of valid
//!   SMTP state transitions
//! - **TLS support**: Both implicit TLS (port 465) and STARTTLS, with an
//!   optional private root CA
//! - **Authentication**: PLAIN and CRAM-MD5
//! - **Composer bridge**: [`Session`] implements the composer's
//!   [`mailpost_mime::Transport`] so a [`mailpost_mime::Message`] can send
//!   itself
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailpost_smtp::{Authenticator, Authorized, Credentials, AuthMethod, Security, ServerConfig, Session};
//!
//! #[tokio::main]
//! async fn main() -> mailpost_smtp::Result<()> {
//!     let config = ServerConfig::builder("smtp.example.com")
//!         .security(Security::StartTls)
//!         .build();
//!     let client = config.open().await?;
//!
//!     let auth = Authenticator::new(
//!         Some(AuthMethod::Plain),
//!         Credentials::new("user@example.com", "password"),
//!     );
//!     match auth.authenticate(client).await? {
//!         Authorized::Authenticated(client) => {
//!             let mut session = Session::new(client);
//!             // message.send_content(&mut session).await?;
//!             session.quit().await?;
//!         }
//!         Authorized::Anonymous(client) => client.quit().await?,
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Connection States
//!
//! ```text
//! ┌──────────────┐
//! │  Connected   │ ─── auth_plain() / auth_cram_md5() ───→ Authenticated
//! └──────────────┘
//!        │
//!        └─── mail_from() ───→ MailTransaction ───→ RecipientAdded ───→ Data
//!                                                                        │
//!        Connected / Authenticated ←──────── send_message() ─────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod auth;
pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use auth::{
    AuthMethod, Authenticator, Authorized, Credentials, ParseAuthMethodError, cram_md5_response,
};
pub use connection::{
    Authenticated, Client, Connected, Data, MailTransaction, ParseSecurityError, RecipientAdded,
    Security, ServerConfig, ServerConfigBuilder, ServerInfo, Session, SessionState,
    SmtpConnection,
};
pub use error::{Error, Result};
pub use types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
