//! Content type detection from leading file bytes.
//!
//! Implements the MIME sniffing table used by browsers: markup signatures
//! after leading whitespace, exact magic numbers, masked signatures for
//! container formats, and finally a text/binary split.

/// Maximum number of bytes examined.
pub const SNIFF_LENGTH: usize = 512;

const OCTET_STREAM: &str = "application/octet-stream";
const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

const HTML_TAGS: &[&[u8]] = &[
    b"<!DOCTYPE HTML",
    b"<HTML",
    b"<HEAD",
    b"<SCRIPT",
    b"<IFRAME",
    b"<H1",
    b"<DIV",
    b"<FONT",
    b"<TABLE",
    b"<A",
    b"<STYLE",
    b"<TITLE",
    b"<B",
    b"<BODY",
    b"<BR",
    b"<P",
    b"<!--",
];

struct Masked {
    mask: &'static [u8],
    pattern: &'static [u8],
    skip_whitespace: bool,
    mime: &'static str,
}

const MASKED: &[Masked] = &[
    Masked {
        mask: b"\xFF\xFF\xFF\xFF\xFF",
        pattern: b"<?xml",
        skip_whitespace: true,
        mime: "text/xml; charset=utf-8",
    },
    Masked {
        mask: b"\xFF\xFF\x00\x00",
        pattern: b"\xFE\xFF\x00\x00",
        skip_whitespace: false,
        mime: "text/plain; charset=utf-16be",
    },
    Masked {
        mask: b"\xFF\xFF\x00\x00",
        pattern: b"\xFF\xFE\x00\x00",
        skip_whitespace: false,
        mime: "text/plain; charset=utf-16le",
    },
    Masked {
        mask: b"\xFF\xFF\xFF\x00",
        pattern: b"\xEF\xBB\xBF\x00",
        skip_whitespace: false,
        mime: "text/plain; charset=utf-8",
    },
    Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        pattern: b"RIFF\x00\x00\x00\x00WEBP",
        skip_whitespace: false,
        mime: "image/webp",
    },
    Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        pattern: b"FORM\x00\x00\x00\x00AIFF",
        skip_whitespace: false,
        mime: "audio/aiff",
    },
    Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        pattern: b"RIFF\x00\x00\x00\x00AVI ",
        skip_whitespace: false,
        mime: "video/avi",
    },
    Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        pattern: b"RIFF\x00\x00\x00\x00WAVE",
        skip_whitespace: false,
        mime: "audio/wave",
    },
    Masked {
        mask: b"\xFF\xFF\xFF\xFF\xFF\xFF\xFF\xFF\xFF\xFF\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\xFF\xFF",
        pattern: b"\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x4C\x50",
        skip_whitespace: false,
        mime: "application/vnd.ms-fontobject",
    },
];

const EXACT: &[(&[u8], &str)] = &[
    (b"%PDF-", "application/pdf"),
    (b"%!PS-Adobe-", "application/postscript"),
    (b"\x00\x00\x01\x00", "image/x-icon"),
    (b"\x00\x00\x02\x00", "image/x-icon"),
    (b"BM", "image/bmp"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"\x89PNG\x0D\x0A\x1A\x0A", "image/png"),
    (b"\xFF\xD8\xFF", "image/jpeg"),
    (b"ID3", "audio/mpeg"),
    (b"OggS\x00", "application/ogg"),
    (b"MThd\x00\x00\x00\x06", "audio/midi"),
    (b"\x1A\x45\xDF\xA3", "video/webm"),
    (b"\x00\x01\x00\x00", "font/ttf"),
    (b"OTTO", "font/otf"),
    (b"ttcf", "font/collection"),
    (b"wOFF", "font/woff"),
    (b"wOF2", "font/woff2"),
    (b"\x1F\x8B\x08", "application/x-gzip"),
    (b"PK\x03\x04", "application/zip"),
    (b"Rar!\x1A\x07\x00", "application/x-rar-compressed"),
    (b"Rar!\x1A\x07\x01\x00", "application/x-rar-compressed"),
    (b"\x00\x61\x73\x6D", "application/wasm"),
];

/// Returns the MIME type of `data`, examining at most [`SNIFF_LENGTH`] bytes.
///
/// Always returns a valid type; `application/octet-stream` when nothing
/// more specific matches and the data looks binary.
#[must_use]
pub fn sniff(data: &[u8]) -> &'static str {
    let data = &data[..data.len().min(SNIFF_LENGTH)];
    let trimmed = skip_whitespace(data);

    if HTML_TAGS.iter().any(|tag| matches_html_tag(trimmed, tag)) {
        return "text/html; charset=utf-8";
    }

    for sig in MASKED {
        let input = if sig.skip_whitespace { trimmed } else { data };
        if matches_masked(input, sig) {
            return sig.mime;
        }
    }

    if let Some(&(_, mime)) = EXACT.iter().find(|(magic, _)| data.starts_with(magic)) {
        return mime;
    }

    if is_mp4(data) {
        return "video/mp4";
    }

    if data.iter().any(|b| is_binary_byte(*b)) {
        OCTET_STREAM
    } else {
        TEXT_PLAIN
    }
}

fn skip_whitespace(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| !matches!(b, b'\t' | b'\n' | b'\x0C' | b'\r' | b' '))
        .unwrap_or(data.len());
    &data[start..]
}

// Case-insensitive tag match that must be followed by a space or '>'.
fn matches_html_tag(data: &[u8], tag: &[u8]) -> bool {
    if data.len() < tag.len() + 1 {
        return false;
    }
    let head_matches = tag
        .iter()
        .zip(data)
        .all(|(t, d)| t.eq_ignore_ascii_case(d));
    head_matches && matches!(data[tag.len()], b' ' | b'>')
}

fn matches_masked(data: &[u8], sig: &Masked) -> bool {
    if data.len() < sig.pattern.len() {
        return false;
    }
    sig.pattern
        .iter()
        .zip(sig.mask)
        .zip(data)
        .all(|((p, m), d)| d & m == *p)
}

// ISO base media file: big-endian box size, then "ftyp", then brands.
fn is_mp4(data: &[u8]) -> bool {
    if data.len() < 12 {
        return false;
    }
    let box_size = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if data.len() < box_size || box_size % 4 != 0 || box_size < 12 {
        return false;
    }
    if &data[4..8] != b"ftyp" {
        return false;
    }
    (8..box_size)
        .step_by(4)
        .filter(|&st| st != 12)
        .any(|st| data.get(st..st + 3) == Some(b"mp4".as_slice()))
}

const fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
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
    fn test_empty_is_plain_text() {
        assert_eq!(sniff(b""), "text/plain; charset=utf-8");
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(sniff(b"Hello, World!\r\n"), "text/plain; charset=utf-8");
    }

    #[test]
    fn test_html_after_whitespace() {
        assert_eq!(sniff(b"  \n<html><body>"), "text/html; charset=utf-8");
        assert_eq!(sniff(b"<!doctype html>"), "text/html; charset=utf-8");
        assert_eq!(sniff(b"<p>hello</p>"), "text/html; charset=utf-8");
    }

    #[test]
    fn test_html_tag_requires_terminator() {
        // "<pre" is not "<p" followed by space or '>'.
        assert_eq!(sniff(b"<pre>code</pre>"), "text/plain; charset=utf-8");
    }

    #[test]
    fn test_xml() {
        assert_eq!(sniff(b"<?xml version=\"1.0\"?>"), "text/xml; charset=utf-8");
    }

    #[test]
    fn test_images() {
        assert_eq!(sniff(b"\x89PNG\r\n\x1A\n\x00\x00\x00\x0DIHDR"), "image/png");
        assert_eq!(sniff(b"\xFF\xD8\xFF\xE0\x00\x10JFIF"), "image/jpeg");
        assert_eq!(sniff(b"GIF89a\x01\x00"), "image/gif");
        assert_eq!(sniff(b"RIFF\x10\x00\x00\x00WEBPVP8 "), "image/webp");
    }

    #[test]
    fn test_documents_and_archives() {
        assert_eq!(sniff(b"%PDF-1.7\n"), "application/pdf");
        assert_eq!(sniff(b"PK\x03\x04\x14\x00"), "application/zip");
        assert_eq!(sniff(b"\x1F\x8B\x08\x00"), "application/x-gzip");
    }

    #[test]
    fn test_mp4() {
        let mut data = vec![0x00, 0x00, 0x00, 0x18];
        data.extend_from_slice(b"ftypmp42");
        data.extend_from_slice(&[0, 0, 0, 0]);
        data.extend_from_slice(b"mp42isom");
        assert_eq!(sniff(&data), "video/mp4");
    }

    #[test]
    fn test_binary_fallback() {
        assert_eq!(sniff(b"\x00\x01\x02\x03random"), "application/octet-stream");
    }

    #[test]
    fn test_only_prefix_is_examined() {
        let mut data = vec![b'a'; SNIFF_LENGTH];
        data.push(0x00);
        assert_eq!(sniff(&data), "text/plain; charset=utf-8");
    }
}
