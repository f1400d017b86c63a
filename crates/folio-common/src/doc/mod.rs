//! Structured post documents.

mod mark;
mod node;

pub use mark::{HighlightAttrs, LinkAttrs, Mark};
pub use node::{
    Attrs, Branch, CellAttrs, CodeBlockAttrs, DisplayMode, EmbedAttrs, GalleryAttrs, GridSpan,
    HeadingAttrs, ImageAttrs, LinkMentionAttrs, MentionAttrs, Node, NodeDecodeError,
    OrderedListAttrs, Text, UnknownNode,
};

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Root of a post body. Serializes as `{"type": "doc", "content": [...]}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawDoc", into = "RawDoc")]
pub struct Document {
    pub content: Vec<Node>,
}

impl Document {
    pub fn new(content: Vec<Node>) -> Self {
        Self { content }
    }

    /// The document every new post starts with: a single empty level-1 heading.
    pub fn with_empty_title() -> Self {
        Self::new(vec![Node::heading(1, Vec::new())])
    }

    /// Size of the root content in flat positions.
    pub fn content_size(&self) -> usize {
        self.content.iter().map(Node::node_size).sum()
    }

    /// Visit every node in document order.
    pub fn walk<'a>(&'a self, mut f: impl FnMut(&'a Node)) {
        for node in &self.content {
            node.walk(&mut f);
        }
    }

    pub fn text_content(&self) -> String {
        self.content.iter().map(Node::text_content).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawDoc {
    #[serde(rename = "type", default = "doc_type")]
    kind: SmolStr,
    #[serde(default)]
    content: Vec<Node>,
}

fn doc_type() -> SmolStr {
    SmolStr::new_static("doc")
}

#[derive(Debug, thiserror::Error)]
#[error("expected a `doc` root node, found `{0}`")]
pub struct NotADocument(SmolStr);

impl TryFrom<RawDoc> for Document {
    type Error = NotADocument;

    fn try_from(raw: RawDoc) -> Result<Self, Self::Error> {
        if raw.kind != "doc" {
            return Err(NotADocument(raw.kind));
        }
        Ok(Document {
            content: raw.content,
        })
    }
}

impl From<Document> for RawDoc {
    fn from(doc: Document) -> Self {
        RawDoc {
            kind: doc_type(),
            content: doc.content,
        }
    }
}
