//! MIME header handling.

use std::fmt;

/// Maximum length of a single header line, excluding the CRLF.
pub const MAX_LINE_LENGTH: usize = 78;

/// Custom header validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    /// The header line is empty.
    #[error("Header is empty")]
    Empty,

    /// The header does not contain exactly one colon.
    #[error("Header {0:?} must contain exactly one ':'")]
    Separator(String),

    /// A physical line is longer than [`MAX_LINE_LENGTH`].
    #[error("Header line {line:?} is longer than {MAX_LINE_LENGTH} characters")]
    LineTooLong {
        /// Offending line.
        line: String,
    },

    /// The header name is empty or contains non-printable characters.
    #[error("Header name {0:?} is invalid")]
    InvalidName(String),

    /// The header body is empty or contains invalid characters.
    #[error("Header value {0:?} is invalid")]
    InvalidValue(String),
}

/// Checks a raw custom header line such as `X-Mailer: mailpost`.
///
/// Folded headers are accepted as CRLF-separated lines; every line must
/// fit in [`MAX_LINE_LENGTH`] characters.
///
/// # Errors
///
/// Returns the first rule the header breaks.
pub fn check_header(header: &str) -> Result<(), HeaderError> {
    if header.is_empty() {
        return Err(HeaderError::Empty);
    }
    if header.matches(':').count() != 1 {
        return Err(HeaderError::Separator(header.to_string()));
    }

    for (index, line) in header.split("\r\n").enumerate() {
        if line.len() > MAX_LINE_LENGTH {
            return Err(HeaderError::LineTooLong {
                line: line.to_string(),
            });
        }

        let body = if index == 0 {
            let (name, body) = line
                .split_once(':')
                .ok_or_else(|| HeaderError::Separator(header.to_string()))?;
            let name = name.trim();
            if name.is_empty() || !name.bytes().all(|b| (0x21..=0x7E).contains(&b)) {
                return Err(HeaderError::InvalidName(name.to_string()));
            }
            body
        } else {
            line
        };

        let body = body.trim();
        if body.is_empty() || !body.bytes().all(|b| b == b'\t' || (0x20..=0x7E).contains(&b)) {
            return Err(HeaderError::InvalidValue(body.to_string()));
        }
    }

    Ok(())
}

/// Ordered collection of header fields.
///
/// Fields render as `Name: value` lines in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: Vec<(String, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header field.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Appends a header field, builder style.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add(name, value);
        self
    }

    /// Gets the first value for a header, ignoring ASCII case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns an iterator over all fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.fields {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
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

    #[test]
    fn test_headers_keep_order() {
        let headers = Headers::new()
            .with("Content-Type", "text/plain")
            .with("Content-Transfer-Encoding", "7bit");
        assert_eq!(
            headers.to_string(),
            "Content-Type: text/plain\r\nContent-Transfer-Encoding: 7bit\r\n"
        );
        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_check_header_valid() {
        assert!(check_header("X-Mailer: mailpost").is_ok());
        assert!(check_header("X-Folded: first\r\n\tsecond").is_ok());
    }

    #[test]
    fn test_check_header_empty() {
        assert_eq!(check_header(""), Err(HeaderError::Empty));
    }

    #[test]
    fn test_check_header_colons() {
        assert!(matches!(
            check_header("no separator"),
            Err(HeaderError::Separator(_))
        ));
        assert!(matches!(
            check_header("X-Time: 10:30"),
            Err(HeaderError::Separator(_))
        ));
    }

    #[test]
    fn test_check_header_line_length() {
        let header = format!("X-Long: {}", "a".repeat(MAX_LINE_LENGTH));
        assert!(matches!(
            check_header(&header),
            Err(HeaderError::LineTooLong { .. })
        ));

        let header = format!("X-Ok: {}", "a".repeat(MAX_LINE_LENGTH - 6));
        assert_eq!(header.len(), MAX_LINE_LENGTH);
        assert!(check_header(&header).is_ok());
    }

    #[test]
    fn test_check_header_name() {
        assert!(matches!(
            check_header(": value"),
            Err(HeaderError::InvalidName(_))
        ));
        assert!(matches!(
            check_header("X Bad: value"),
            Err(HeaderError::InvalidName(_))
        ));
    }

    #[test]
    fn test_check_header_value() {
        assert!(matches!(
            check_header("X-Empty:   "),
            Err(HeaderError::InvalidValue(_))
        ));
        assert!(matches!(
            check_header("X-Utf8: héllo"),
            Err(HeaderError::InvalidValue(_))
        ));
        assert!(matches!(
            check_header("X-Fold: a\r\n   "),
            Err(HeaderError::InvalidValue(_))
        ));
    }
}
