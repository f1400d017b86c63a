//! Flat document positions.
//!
//! Positions count tokens the way the document model sizes nodes: one per character of text,
//! one per leaf node, and one for each opening and closing edge of a branch. Position `0` is
//! the start of the root content and `doc.content_size()` its end.

use folio_common::doc::{Document, Node, Text};

use crate::error::EditError;

/// A position resolved against a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPos {
    pub pos: usize,
    /// Child indices from the root down to the innermost branch whose content holds `pos`.
    /// Empty when `pos` sits directly in the root content.
    pub path: Vec<usize>,
    /// Offset of `pos` inside that branch's content.
    pub offset: usize,
}

impl ResolvedPos {
    /// The innermost branch holding the position, `None` for the root.
    pub fn parent<'a>(&self, doc: &'a Document) -> Option<&'a Node> {
        node_at(doc, &self.path)
    }

    /// Whether text can be typed at this position.
    pub fn in_textblock(&self, doc: &Document) -> bool {
        self.parent(doc).is_some_and(Node::is_textblock)
    }

    /// Absolute position of the start of the parent's content.
    pub fn content_start(&self) -> usize {
        self.pos - self.offset
    }
}

pub fn resolve(doc: &Document, pos: usize) -> Result<ResolvedPos, EditError> {
    let size = doc.content_size();
    if pos > size {
        return Err(EditError::OutOfRange { pos, size });
    }

    let mut path = Vec::new();
    let mut children: &[Node] = &doc.content;
    let mut offset = pos;
    'descend: loop {
        let mut start = 0;
        for (index, child) in children.iter().enumerate() {
            if start > offset {
                break;
            }
            let end = start + child.node_size();
            if !child.is_leaf() && offset > start && offset < end {
                path.push(index);
                children = child.content();
                offset -= start + 1;
                continue 'descend;
            }
            start = end;
        }
        break;
    }

    Ok(ResolvedPos { pos, path, offset })
}

/// Whether `pos` is inside the inline content of a textblock.
pub fn is_text_position(doc: &Document, pos: usize) -> bool {
    resolve(doc, pos).is_ok_and(|r| r.in_textblock(doc))
}

pub fn node_at<'a>(doc: &'a Document, path: &[usize]) -> Option<&'a Node> {
    let (&last, rest) = path.split_last()?;
    let mut children: &[Node] = &doc.content;
    for &index in rest {
        children = children.get(index)?.content();
    }
    children.get(last)
}

pub(crate) fn node_at_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Option<&'a mut Node> {
    let (&last, rest) = path.split_last()?;
    children_at_mut(doc, rest)?.get_mut(last)
}

/// The child list of the branch at `path`, or the root content for an empty path.
pub(crate) fn children_at_mut<'a>(
    doc: &'a mut Document,
    path: &[usize],
) -> Option<&'a mut Vec<Node>> {
    let mut children = &mut doc.content;
    for &index in path {
        children = children.get_mut(index)?.content_mut()?;
    }
    Some(children)
}

/// Absolute position just before the node at `path`.
pub fn node_start(doc: &Document, path: &[usize]) -> Option<usize> {
    let mut pos = 0;
    let mut children: &[Node] = &doc.content;
    for (depth, &index) in path.iter().enumerate() {
        pos += children.get(..index)?.iter().map(Node::node_size).sum::<usize>();
        if depth + 1 < path.len() {
            // Step over the opening edge into the child's content.
            pos += 1;
            children = children.get(index)?.content();
        }
    }
    Some(pos)
}

/// Byte index of the `chars`-th character of `text`.
pub(crate) fn byte_index(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map_or(text.len(), |(index, _)| index)
}

/// Split `children` at content offset `offset`, cutting a text node in two when the offset
/// falls inside it. Returns the index of the first child at or after the offset.
pub(crate) fn split_children(children: &mut Vec<Node>, offset: usize) -> usize {
    let mut start = 0;
    for index in 0..children.len() {
        if start >= offset {
            return index;
        }
        let size = children[index].node_size();
        if offset < start + size {
            if let Node::Text(text) = &mut children[index] {
                let tail = text.text.split_off(byte_index(&text.text, offset - start));
                let right = Node::Text(Text {
                    text: tail,
                    marks: text.marks.clone(),
                });
                children.insert(index + 1, right);
            }
            return index + 1;
        }
        start += size;
    }
    children.len()
}

/// Drop empty text nodes and merge neighbouring text nodes that carry the same marks.
pub(crate) fn normalize_inline(children: &mut Vec<Node>) {
    let mut merged: Vec<Node> = Vec::with_capacity(children.len());
    for node in children.drain(..) {
        if let Node::Text(text) = &node {
            if text.is_empty() {
                continue;
            }
            if let Some(Node::Text(prev)) = merged.last_mut() {
                if prev.marks == text.marks {
                    prev.text.push_str(&text.text);
                    continue;
                }
            }
        }
        merged.push(node);
    }
    *children = merged;
}

/// Tidy the whole tree after a structural edit: inline content is normalized and container
/// blocks that lost all their children are removed.
pub(crate) fn normalize(doc: &mut Document) {
    normalize_blocks(&mut doc.content);
}

fn normalize_blocks(children: &mut Vec<Node>) {
    for child in children.iter_mut() {
        let textblock = child.is_textblock();
        if let Some(content) = child.content_mut() {
            if textblock {
                normalize_inline(content);
            } else {
                normalize_blocks(content);
            }
        }
    }
    children.retain(|child| !is_empty_container(child));
}

fn is_empty_container(node: &Node) -> bool {
    matches!(
        node,
        Node::BulletList(_)
            | Node::OrderedList(_)
            | Node::ListItem(_)
            | Node::Blockquote(_)
            | Node::Table(_)
            | Node::TableRow(_)
    ) && node.content().is_empty()
}
