//! Core services for email operations.
//!
//! This module bridges the command line with the MIME and SMTP libraries.

pub mod send;

pub use send::{Mailer, SendReport};
