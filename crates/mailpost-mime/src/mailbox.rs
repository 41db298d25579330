//! Mailbox (display name + address) used in message headers.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Mailbox with an optional display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mailbox {
    name: Option<String>,
    address: String,
}

impl Mailbox {
    /// Creates a new mailbox with just an address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn new(address: impl Into<String>) -> Result<Self> {
        let address = address.into();
        validate_address(&address)?;
        Ok(Self {
            name: None,
            address,
        })
    }

    /// Creates a new mailbox with a display name and address.
    ///
    /// An empty name is treated as no name.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn with_name(name: impl Into<String>, address: impl Into<String>) -> Result<Self> {
        let mut mailbox = Self::new(address)?;
        let name = name.into();
        if !name.is_empty() {
            mailbox.name = Some(name);
        }
        Ok(mailbox)
    }

    /// Parses `addr`, `<addr>`, `Name <addr>` or `"Name" <addr>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is malformed or the address is invalid.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let Some(open) = input.rfind('<') else {
            return Self::new(input);
        };
        let address = input[open + 1..]
            .strip_suffix('>')
            .ok_or_else(|| Error::InvalidAddress(input.to_string()))?
            .trim();
        let name = input[..open].trim();
        let name = name
            .strip_prefix('"')
            .and_then(|n| n.strip_suffix('"'))
            .map_or_else(|| name.to_string(), unescape);
        Self::with_name(name, address)
    }

    /// Returns the display name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the bare address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl FromStr for Mailbox {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Renders `<addr>` or `"Name" <addr>`.
impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            None => write!(f, "<{}>", self.address),
            Some(name) => {
                f.write_str("\"")?;
                for c in name.chars() {
                    if c == '\\' || c == '"' {
                        f.write_str("\\")?;
                    }
                    write!(f, "{c}")?;
                }
                write!(f, "\" <{}>", self.address)
            }
        }
    }
}

fn validate_address(addr: &str) -> Result<()> {
    let invalid = || Error::InvalidAddress(addr.to_string());
    let (local, domain) = addr.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    if addr.chars().any(|c| c.is_whitespace() || c == '<' || c == '>') {
        return Err(invalid());
    }
    Ok(())
}

fn unescape(quoted: &str) -> String {
    let mut out = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
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
    fn test_bare_address() {
        let mailbox = Mailbox::parse("user@example.com").unwrap();
        assert_eq!(mailbox.address(), "user@example.com");
        assert!(mailbox.name().is_none());
        assert_eq!(mailbox.to_string(), "<user@example.com>");
    }

    #[test]
    fn test_angle_address() {
        let mailbox = Mailbox::parse(" <user@example.com> ").unwrap();
        assert_eq!(mailbox.address(), "user@example.com");
        assert!(mailbox.name().is_none());
    }

    #[test]
    fn test_named_address() {
        let mailbox = Mailbox::parse("John Doe <john@example.com>").unwrap();
        assert_eq!(mailbox.name(), Some("John Doe"));
        assert_eq!(mailbox.to_string(), "\"John Doe\" <john@example.com>");
    }

    #[test]
    fn test_quoted_name_round_trips_escapes() {
        let mailbox = Mailbox::parse(r#""Doe, \"JD\"" <jd@example.com>"#).unwrap();
        assert_eq!(mailbox.name(), Some(r#"Doe, "JD""#));
        assert_eq!(mailbox.to_string(), r#""Doe, \"JD\"" <jd@example.com>"#);
    }

    #[test]
    fn test_invalid_addresses() {
        assert!(Mailbox::new("").is_err());
        assert!(Mailbox::new("userexample.com").is_err());
        assert!(Mailbox::new("@example.com").is_err());
        assert!(Mailbox::new("user@").is_err());
        assert!(Mailbox::new("a@b@c").is_err());
        assert!(Mailbox::parse("Name <user@example.com").is_err());
    }

    #[test]
    fn test_empty_name_is_none() {
        let mailbox = Mailbox::with_name("", "user@example.com").unwrap();
        assert!(mailbox.name().is_none());
    }
}
