//! Body encodings used when composing messages.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Encodes data as standard padded Base64 without line wrapping.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Normalizes line endings to CRLF.
///
/// The literal two-character escape `\n` becomes a line feed, the literal
/// escape `\r` is dropped, and every CRLF or bare LF ends up as a single
/// CRLF.
#[must_use]
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\\n", "\n")
        .replace("\\r", "")
        .replace("\r\n", "\n")
        .replace('\n', "\r\n")
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
    use proptest::prelude::*;

    #[test]
    fn test_base64_encode() {
        assert_eq!(encode_base64(b"Hello, World!"), "SGVsbG8sIFdvcmxkIQ==");
        assert_eq!(encode_base64(b""), "");
    }

    #[test]
    fn test_base64_does_not_wrap() {
        let encoded = encode_base64(&[0xAB; 300]);
        assert!(!encoded.contains('\n'));
        assert_eq!(encoded.len(), 400);
    }

    #[test]
    fn test_normalize_mixed_line_endings() {
        let text = "one\ntwo\r\nthree\\nfour";
        assert_eq!(normalize_line_endings(text), "one\r\ntwo\r\nthree\r\nfour");
    }

    #[test]
    fn test_normalize_drops_escaped_carriage_return() {
        assert_eq!(normalize_line_endings("a\\r\\nb"), "a\r\nb");
    }

    #[test]
    fn test_normalize_is_idempotent_on_crlf() {
        let once = normalize_line_endings("a\nb\n");
        assert_eq!(normalize_line_endings(&once), once);
    }

    proptest! {
        #[test]
        fn prop_every_line_feed_is_preceded_by_carriage_return(text in "[a-z\\\\\r\n ]{0,64}") {
            let normalized = normalize_line_endings(&text);
            let bytes = normalized.as_bytes();
            for (i, b) in bytes.iter().enumerate() {
                if *b == b'\n' {
                    prop_assert!(i > 0 && bytes[i - 1] == b'\r');
                }
            }
        }
    }
}
