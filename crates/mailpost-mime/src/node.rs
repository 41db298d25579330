//! MIME body tree and its wire rendering.

use crate::header::Headers;

/// A node in the MIME body tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentNode {
    /// Single body part with its payload.
    Leaf {
        /// Part headers.
        headers: Headers,
        /// Payload, already encoded for the wire.
        text: String,
    },
    /// Multipart container.
    Container {
        /// Delimiter token shared by the children.
        boundary: String,
        /// Container headers, including the multipart `Content-Type`.
        headers: Headers,
        /// Child parts in order.
        children: Vec<ContentNode>,
    },
}

impl ContentNode {
    /// Creates a leaf node.
    #[must_use]
    pub fn leaf(headers: Headers, text: impl Into<String>) -> Self {
        Self::Leaf {
            headers,
            text: text.into(),
        }
    }

    /// Creates a container node.
    #[must_use]
    pub fn container(boundary: impl Into<String>, headers: Headers, children: Vec<Self>) -> Self {
        Self::Container {
            boundary: boundary.into(),
            headers,
            children,
        }
    }

    /// Returns the node headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        match self {
            Self::Leaf { headers, .. } | Self::Container { headers, .. } => headers,
        }
    }

    /// Returns the boundary of a container.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        match self {
            Self::Leaf { .. } => None,
            Self::Container { boundary, .. } => Some(boundary.as_str()),
        }
    }

    /// Returns the children of a container, or an empty slice for a leaf.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        match self {
            Self::Leaf { .. } => &[],
            Self::Container { children, .. } => children,
        }
    }

    /// Renders this node as the top of a message body.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, None);
        out
    }

    /// Appends this node to `out`, opened with the parent's delimiter when
    /// it has a parent.
    pub fn render_into(&self, out: &mut String, parent_boundary: Option<&str>) {
        if let Some(parent) = parent_boundary {
            out.push_str("--");
            out.push_str(parent);
            out.push_str("\r\n");
        }
        out.push_str(&self.headers().to_string());
        out.push_str("\r\n");

        match self {
            Self::Leaf { text, .. } => {
                if !text.is_empty() {
                    out.push_str(text);
                    out.push_str("\r\n\r\n");
                }
            }
            Self::Container {
                boundary, children, ..
            } => {
                for child in children {
                    child.render_into(out, Some(boundary.as_str()));
                }
                out.push_str("--");
                out.push_str(boundary);
                out.push_str("--\r\n");
            }
        }
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

    fn text_leaf(text: &str) -> ContentNode {
        ContentNode::leaf(Headers::new().with("Content-Type", "text/plain"), text)
    }

    #[test]
    fn test_render_root_leaf() {
        assert_eq!(
            text_leaf("Hello").render(),
            "Content-Type: text/plain\r\n\r\nHello\r\n\r\n"
        );
    }

    #[test]
    fn test_render_empty_leaf_text() {
        assert_eq!(text_leaf("").render(), "Content-Type: text/plain\r\n\r\n");
    }

    #[test]
    fn test_render_container() {
        let node = ContentNode::container(
            "B1",
            Headers::new().with("Content-Type", "multipart/mixed; boundary=\"B1\""),
            vec![text_leaf("a"), text_leaf("b")],
        );
        assert_eq!(
            node.render(),
            "Content-Type: multipart/mixed; boundary=\"B1\"\r\n\
             \r\n\
             --B1\r\n\
             Content-Type: text/plain\r\n\
             \r\n\
             a\r\n\
             \r\n\
             --B1\r\n\
             Content-Type: text/plain\r\n\
             \r\n\
             b\r\n\
             \r\n\
             --B1--\r\n"
        );
    }

    #[test]
    fn test_render_nested_containers_close_inner_first() {
        let inner = ContentNode::container("IN", Headers::new(), vec![text_leaf("x")]);
        let outer = ContentNode::container("OUT", Headers::new(), vec![inner, text_leaf("y")]);
        let rendered = outer.render();

        let inner_close = rendered.find("--IN--\r\n").unwrap();
        let outer_close = rendered.find("--OUT--\r\n").unwrap();
        assert!(inner_close < outer_close);
        assert_eq!(rendered.matches("--OUT\r\n").count(), 2);
        assert_eq!(rendered.matches("--IN\r\n").count(), 1);
        assert!(rendered.ends_with("--OUT--\r\n"));
    }

    #[test]
    fn test_accessors() {
        let node = ContentNode::container("B", Headers::new(), vec![text_leaf("a")]);
        assert_eq!(node.boundary(), Some("B"));
        assert_eq!(node.children().len(), 1);
        assert!(text_leaf("a").boundary().is_none());
        assert!(text_leaf("a").children().is_empty());
    }
}
