use crate::doc::{Document, Node};
use crate::schema;

/// Title of a document: the text of the leading level-1 heading, marks ignored.
///
/// Only direct text children count; inline atoms such as mentions are skipped. Returns an
/// empty string when the document does not satisfy the title invariant.
pub fn extract_title(doc: &Document) -> String {
    if !schema::validate(doc) {
        return String::new();
    }
    let Some(Node::Heading(heading)) = doc.content.first() else {
        return String::new();
    };
    heading
        .content
        .iter()
        .filter_map(|child| match child {
            Node::Text(t) => Some(t.text.as_str()),
            _ => None,
        })
        .collect()
}
