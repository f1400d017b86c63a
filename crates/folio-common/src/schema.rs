//! The title invariant: the first child of every document is a level-1 heading.
//!
//! [`validate`] checks it, [`enforce_invariant`] repairs any document into a conforming one.
//! Repairs are never errors; they are reported as [`StructuralViolation`]s and logged.

use smol_str::SmolStr;

use crate::doc::{Branch, Document, HeadingAttrs, Node, Text};

/// Something [`enforce_invariant`] had to fix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralViolation {
    /// The document had no children; an empty title was added.
    Empty,
    /// The first heading had the wrong level; it was rewritten to 1.
    HeadingLevel { found: u8 },
    /// The first child was a textblock; it was turned into the title, keeping its text.
    ConvertedToTitle { found: SmolStr },
    /// The first child had no inline content of its own; an empty title was inserted before it.
    InsertedTitle { found: SmolStr },
}

/// Whether `doc` satisfies the title invariant.
pub fn validate(doc: &Document) -> bool {
    matches!(doc.content.first(), Some(Node::Heading(h)) if h.attrs.level == 1)
}

/// Repair `doc` so it satisfies the title invariant. Idempotent and total.
pub fn enforce_invariant(mut doc: Document) -> Document {
    repair(&mut doc);
    doc
}

/// In-place form of [`enforce_invariant`], returning what was repaired.
pub fn repair(doc: &mut Document) -> Option<StructuralViolation> {
    let violation = match doc.content.first_mut() {
        None => {
            doc.content.push(empty_title());
            StructuralViolation::Empty
        }
        Some(Node::Heading(h)) if h.attrs.level == 1 => return None,
        Some(Node::Heading(h)) => {
            let found = h.attrs.level;
            h.attrs.level = 1;
            StructuralViolation::HeadingLevel { found }
        }
        Some(first) => {
            let found = SmolStr::new(first.type_name());
            match title_content(first) {
                Some(content) => {
                    doc.content[0] = Node::Heading(Branch {
                        attrs: HeadingAttrs::default(),
                        content,
                    });
                    StructuralViolation::ConvertedToTitle { found }
                }
                None => {
                    doc.content.insert(0, empty_title());
                    StructuralViolation::InsertedTitle { found }
                }
            }
        }
    };
    tracing::debug!(?violation, "repaired document title");
    Some(violation)
}

fn empty_title() -> Node {
    Node::heading(1, Vec::new())
}

/// Inline content a first child can hand over to a new title, if it is a textblock.
fn title_content(node: &Node) -> Option<Vec<Node>> {
    match node {
        Node::Paragraph(Branch { content, .. }) => Some(content.clone()),
        // Code text loses its monospace context in a heading, so keep only the characters.
        Node::CodeBlock(block) => {
            let text = block
                .content
                .iter()
                .map(Node::text_content)
                .collect::<String>();
            Some(if text.is_empty() {
                Vec::new()
            } else {
                vec![Node::Text(Text {
                    text,
                    marks: Vec::new(),
                })]
            })
        }
        Node::Unknown(u) => match &u.content {
            Some(content) if !content.is_empty() && content.iter().all(Node::is_inline) => {
                Some(content.clone())
            }
            _ => None,
        },
        _ => None,
    }
}
