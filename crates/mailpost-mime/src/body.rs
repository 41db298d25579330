//! Text and HTML body parts.

use crate::attachment::Attachment;
use crate::content_type::ContentType;
use crate::encoding::normalize_line_endings;
use crate::error::Result;
use crate::header::Headers;
use crate::id::IdGenerator;
use crate::node::ContentNode;

/// Builds the body part of a message from its plain and HTML texts.
///
/// | plain | html | result |
/// |-------|------|--------|
/// | yes   | no   | `text/plain` leaf |
/// | no    | yes  | `text/html` leaf |
/// | yes   | yes  | `multipart/alternative` with [plain, html] |
/// | no    | no   | nothing |
#[derive(Debug, Clone, Copy, Default)]
pub struct BodyBuilder<'a> {
    plain: &'a str,
    html: &'a str,
    attachments: &'a [Attachment],
}

impl<'a> BodyBuilder<'a> {
    /// Creates a builder; empty strings mean "absent".
    #[must_use]
    pub const fn new(plain: &'a str, html: &'a str) -> Self {
        Self {
            plain,
            html,
            attachments: &[],
        }
    }

    /// Attachments whose paths or file names the HTML may reference.
    #[must_use]
    pub const fn with_attachments(mut self, attachments: &'a [Attachment]) -> Self {
        self.attachments = attachments;
        self
    }

    /// Builds the body node, drawing a boundary from `ids` only when both
    /// texts are present.
    ///
    /// # Errors
    ///
    /// Returns an error if boundary generation fails.
    pub fn build(&self, ids: &mut IdGenerator) -> Result<Option<ContentNode>> {
        let plain = (!self.plain.is_empty()).then(|| self.plain_leaf());
        let html = (!self.html.is_empty()).then(|| self.html_leaf());

        Ok(match (plain, html) {
            (None, None) => None,
            (Some(leaf), None) | (None, Some(leaf)) => Some(leaf),
            (Some(plain), Some(html)) => {
                let boundary = ids.next_boundary()?;
                let headers = Headers::new().with(
                    "Content-Type",
                    ContentType::multipart_alternative(boundary.as_str()).to_string(),
                );
                Some(ContentNode::container(boundary, headers, vec![plain, html]))
            }
        })
    }

    fn plain_leaf(&self) -> ContentNode {
        text_leaf(ContentType::text_plain(), normalize_line_endings(self.plain))
    }

    fn html_leaf(&self) -> ContentNode {
        let html = normalize_line_endings(self.html);
        text_leaf(
            ContentType::text_html(),
            rewrite_cid_references(&html, self.attachments),
        )
    }
}

fn text_leaf(content_type: ContentType, text: String) -> ContentNode {
    let headers = Headers::new()
        .with("Content-Type", content_type.to_string())
        .with("Content-Transfer-Encoding", "7bit");
    ContentNode::leaf(headers, text)
}

/// Replaces quoted attachment paths and file names with `cid:` URIs.
///
/// For each attachment that has a content-ID, in list order, every
/// `"<path>"` and then every `"<file name>"` becomes `"cid:<id>"`. This is
/// plain substring replacement; overlapping names resolve by list order.
#[must_use]
pub fn rewrite_cid_references(html: &str, attachments: &[Attachment]) -> String {
    let mut html = html.to_string();
    for attachment in attachments {
        let Some(id) = attachment.content_id() else {
            continue;
        };
        let cid = format!("\"cid:{id}\"");
        let path = format!("\"{}\"", attachment.path().to_string_lossy());
        html = html.replace(&path, &cid);
        let name = format!("\"{}\"", attachment.file_name());
        html = html.replace(&name, &cid);
    }
    html
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

    fn leaf_text(node: &ContentNode) -> &str {
        match node {
            ContentNode::Leaf { text, .. } => text,
            ContentNode::Container { .. } => panic!("expected leaf"),
        }
    }

    #[test]
    fn test_empty_body() {
        let mut ids = IdGenerator::deterministic("B_");
        assert!(BodyBuilder::new("", "").build(&mut ids).unwrap().is_none());
    }

    #[test]
    fn test_plain_only() {
        let mut ids = IdGenerator::deterministic("B_");
        let node = BodyBuilder::new("line1\nline2", "")
            .build(&mut ids)
            .unwrap()
            .unwrap();
        assert_eq!(
            node.headers().get("Content-Type"),
            Some("text/plain; charset=\"UTF-8\"")
        );
        assert_eq!(node.headers().get("Content-Transfer-Encoding"), Some("7bit"));
        assert_eq!(leaf_text(&node), "line1\r\nline2");
    }

    #[test]
    fn test_html_only() {
        let mut ids = IdGenerator::deterministic("B_");
        let node = BodyBuilder::new("", "<p>hi</p>")
            .build(&mut ids)
            .unwrap()
            .unwrap();
        assert_eq!(
            node.headers().get("Content-Type"),
            Some("text/html; charset=\"UTF-8\"")
        );
        assert!(node.boundary().is_none());
    }

    #[test]
    fn test_both_make_alternative() {
        let mut ids = IdGenerator::deterministic("BOUNDARY_ID_");
        let node = BodyBuilder::new("plain", "<p>html</p>")
            .build(&mut ids)
            .unwrap()
            .unwrap();
        assert_eq!(node.boundary(), Some("BOUNDARY_ID_00000001"));
        assert_eq!(
            node.headers().get("Content-Type"),
            Some("multipart/alternative; boundary=\"BOUNDARY_ID_00000001\"")
        );
        let children = node.children();
        assert_eq!(children.len(), 2);
        assert_eq!(leaf_text(&children[0]), "plain");
        assert_eq!(leaf_text(&children[1]), "<p>html</p>");
    }

    #[test]
    fn test_single_body_draws_no_boundary() {
        let mut ids = IdGenerator::deterministic("B_");
        BodyBuilder::new("plain", "").build(&mut ids).unwrap();
        assert_eq!(ids.next_token(4).unwrap(), "B_01");
    }

    #[test]
    fn test_rewrite_path_and_file_name() {
        let attachments = vec![
            Attachment::new("/tmp/img/logo.png").with_content_id("CID1"),
            Attachment::new("/tmp/photo.jpg").with_content_id("CID2"),
            Attachment::new("/tmp/plain.txt"),
        ];
        let html = r#"<img src="/tmp/img/logo.png"><img src="photo.jpg"><a href="plain.txt">"#;
        assert_eq!(
            rewrite_cid_references(html, &attachments),
            r#"<img src="cid:CID1"><img src="cid:CID2"><a href="plain.txt">"#
        );
    }

    #[test]
    fn test_rewrite_requires_quotes() {
        let attachments = vec![Attachment::new("/tmp/logo.png").with_content_id("CID1")];
        let html = "logo.png and '/tmp/logo.png'";
        assert_eq!(rewrite_cid_references(html, &attachments), html);
    }

    #[test]
    fn test_html_is_normalized_then_rewritten() {
        let attachments = vec![Attachment::new("/tmp/logo.png").with_content_id("CID1")];
        let mut ids = IdGenerator::deterministic("B_");
        let node = BodyBuilder::new("", "<p>\n<img src=\"logo.png\"></p>")
            .with_attachments(&attachments)
            .build(&mut ids)
            .unwrap()
            .unwrap();
        assert_eq!(leaf_text(&node), "<p>\r\n<img src=\"cid:CID1\"></p>");
    }
}
