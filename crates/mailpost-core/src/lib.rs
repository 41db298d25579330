//! # mailpost-core
//!
//! Core logic for the `mailpost` command.
//!
//! This crate provides:
//! - Send settings, merged from the command line and settings files
//! - Aggregated validation of settings and message
//! - The [`Mailer`] service that composes and delivers one message

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod service;
pub mod settings;
pub mod validation;

pub use error::{Error, Result};
pub use service::{Mailer, SendReport};
pub use settings::{Settings, SettingsFile};
pub use validation::{ValidationError, ValidationResult, validate, validate_settings};
