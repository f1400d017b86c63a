//! Structural edits over a [`Document`].
//!
//! [`apply`] is pure: it returns the edited copy and the cursor position that follows the edit,
//! leaving the input untouched when the operation is rejected. Leaves (atoms included) take up a
//! single position, so a range that touches an atom at all removes the whole node.

use folio_common::doc::{Branch, Document, HeadingAttrs, Node, Text};
use smol_str::SmolStr;

use crate::error::EditError;
use crate::position::{
    ResolvedPos, children_at_mut, node_at, node_at_mut, normalize, normalize_inline, resolve,
    split_children,
};

/// Target type for [`EditOp::SetBlockType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    Paragraph,
    /// Heading level, clamped to `1..=6`.
    Heading(u8),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditOp {
    /// Type `text` at `pos`, which must be inside a textblock.
    InsertText { pos: usize, text: String },
    /// Insert a node. Inline nodes go into the textblock at `pos`; block nodes split the
    /// textblock they land in, and inline nodes placed between blocks get a paragraph.
    InsertNode { pos: usize, node: Node },
    Delete { from: usize, to: usize },
    /// Delete the range, then insert `nodes` in order where it started.
    Replace {
        from: usize,
        to: usize,
        nodes: Vec<Node>,
    },
    /// Split the textblock at `pos` (Enter).
    SplitBlock { pos: usize },
    SetBlockType { pos: usize, block: BlockType },
}

impl EditOp {
    pub fn name(&self) -> &'static str {
        match self {
            EditOp::InsertText { .. } => "insert_text",
            EditOp::InsertNode { .. } => "insert_node",
            EditOp::Delete { .. } => "delete",
            EditOp::Replace { .. } => "replace",
            EditOp::SplitBlock { .. } => "split_block",
            EditOp::SetBlockType { .. } => "set_block_type",
        }
    }
}

/// Apply `op` to a copy of `doc`, returning the result and the cursor after the edit.
pub fn apply(doc: &Document, op: &EditOp) -> Result<(Document, usize), EditError> {
    let mut next = doc.clone();
    let cursor = match op {
        EditOp::InsertText { pos, text } => insert_text(&mut next, *pos, text)?,
        EditOp::InsertNode { pos, node } => insert_node(&mut next, *pos, node.clone())?,
        EditOp::Delete { from, to } => delete(&mut next, *from, *to)?,
        EditOp::Replace { from, to, nodes } => {
            let mut cursor = delete(&mut next, *from, *to)?;
            for node in nodes {
                cursor = insert_node(&mut next, cursor, node.clone())?;
            }
            cursor
        }
        EditOp::SplitBlock { pos } => split_block(&mut next, *pos)?,
        EditOp::SetBlockType { pos, block } => set_block_type(&mut next, *pos, *block)?,
    };
    Ok((next, cursor))
}

fn textblock_at(doc: &Document, pos: usize) -> Result<ResolvedPos, EditError> {
    let resolved = resolve(doc, pos)?;
    if resolved.in_textblock(doc) {
        Ok(resolved)
    } else {
        Err(EditError::NotInTextblock { pos })
    }
}

fn insert_text(doc: &mut Document, pos: usize, text: &str) -> Result<usize, EditError> {
    let resolved = textblock_at(doc, pos)?;
    if text.is_empty() {
        return Ok(pos);
    }
    let children = children_at_mut(doc, &resolved.path)
        .ok_or(EditError::NotInTextblock { pos })?;

    // New text takes the marks of the run before it, or of the run after it at the start of
    // a block.
    let index = split_children(children, resolved.offset);
    let target = match index.checked_sub(1).map(|i| (i, &children[i])) {
        Some((i, Node::Text(_))) => Some((i, true)),
        _ => match children.get(index) {
            Some(Node::Text(_)) if index == 0 => Some((index, false)),
            _ => None,
        },
    };
    match target.map(|(i, append)| (&mut children[i], append)) {
        Some((Node::Text(run), true)) => run.text.push_str(text),
        Some((Node::Text(run), false)) => run.text.insert_str(0, text),
        _ => children.insert(
            index,
            Node::Text(Text {
                text: text.to_string(),
                marks: Vec::new(),
            }),
        ),
    }
    normalize_inline(children);
    Ok(pos + text.chars().count())
}

/// Whether `child` may sit directly inside `parent` (`None` being the root).
fn accepts(parent: Option<&Node>, child: &Node) -> bool {
    match parent {
        Some(p) if p.is_textblock() => child.is_inline(),
        Some(Node::BulletList(_) | Node::OrderedList(_)) => matches!(child, Node::ListItem(_)),
        Some(Node::Table(_)) => matches!(child, Node::TableRow(_)),
        Some(Node::TableRow(_)) => matches!(child, Node::TableCell(_) | Node::TableHeader(_)),
        _ => !child.is_inline() && !is_structural_child(child),
    }
}

fn is_structural_child(node: &Node) -> bool {
    matches!(
        node,
        Node::ListItem(_) | Node::TableRow(_) | Node::TableCell(_) | Node::TableHeader(_)
    )
}

fn insert_node(doc: &mut Document, pos: usize, node: Node) -> Result<usize, EditError> {
    let resolved = resolve(doc, pos)?;
    if matches!(&node, Node::Text(run) if run.text.is_empty()) {
        return Ok(pos);
    }
    let parent = resolved.parent(doc);
    let size = node.node_size();

    if parent.is_some_and(Node::is_textblock) {
        if node.is_inline() {
            let children = children_at_mut(doc, &resolved.path)
                .ok_or(EditError::NotInTextblock { pos })?;
            let index = split_children(children, resolved.offset);
            children.insert(index, node);
            normalize_inline(children);
            return Ok(pos + size);
        }
        return insert_block_in_textblock(doc, resolved, node);
    }

    let (node, size) = if node.is_inline() && accepts(parent, &Node::paragraph(Vec::new())) {
        let wrapped = Node::paragraph(vec![node]);
        let size = wrapped.node_size();
        (wrapped, size)
    } else {
        (node, size)
    };
    if !accepts(parent, &node) {
        return Err(EditError::InvalidPlacement {
            kind: SmolStr::new(node.type_name()),
            pos,
        });
    }
    let children = children_at_mut(doc, &resolved.path).ok_or(EditError::InvalidPlacement {
        kind: SmolStr::new(node.type_name()),
        pos,
    })?;
    let index = split_children(children, resolved.offset);
    children.insert(index, node);
    Ok(pos + size)
}

/// Place a block where the cursor sits inside a textblock: before it at its start, after it at
/// its end, or between the two halves of a split.
fn insert_block_in_textblock(
    doc: &mut Document,
    resolved: ResolvedPos,
    node: Node,
) -> Result<usize, EditError> {
    let pos = resolved.pos;
    let Some((&index, container_path)) = resolved.path.split_last() else {
        return Err(EditError::NotInTextblock { pos });
    };
    let invalid = || EditError::InvalidPlacement {
        kind: SmolStr::new(node.type_name()),
        pos,
    };
    if !accepts(node_at(doc, container_path), &node) {
        return Err(invalid());
    }

    let block_start = resolved.content_start() - 1;
    let block_size = node_at(doc, &resolved.path).map_or(0, Node::node_size);
    let size = node.node_size();
    let children = children_at_mut(doc, container_path).ok_or_else(invalid)?;

    let (at, node_start) = if resolved.offset == 0 {
        (index, block_start)
    } else if resolved.offset + 2 == block_size {
        (index + 1, block_start + block_size)
    } else {
        let right = split_off_textblock(&mut children[index], resolved.offset);
        children.insert(index + 1, right);
        (index + 1, block_start + resolved.offset + 2)
    };
    children.insert(at, node);
    Ok(node_start + size)
}

/// Cut `block` at content offset `offset`, returning the right half. Splitting a heading at its
/// end yields a paragraph.
fn split_off_textblock(block: &mut Node, offset: usize) -> Node {
    let at_end = offset >= block.content_size();
    let tail = match block.content_mut() {
        Some(content) => {
            let index = split_children(content, offset);
            let tail = content.split_off(index);
            normalize_inline(content);
            tail
        }
        None => Vec::new(),
    };
    if at_end && matches!(block, Node::Heading(_)) {
        return Node::paragraph(tail);
    }
    let mut right = block.clone();
    if let Some(content) = right.content_mut() {
        *content = tail;
        normalize_inline(content);
    }
    right
}

fn delete(doc: &mut Document, from: usize, to: usize) -> Result<usize, EditError> {
    if from > to {
        return Err(EditError::ReversedRange { from, to });
    }
    let start = resolve(doc, from)?;
    let end = resolve(doc, to)?;
    if from == to {
        return Ok(from);
    }

    delete_in(&mut doc.content, from, to);

    // When both ends were inside blocks under a common ancestor, the pieces left on either side
    // are now neighbours; stitch them back together.
    let shared = start
        .path
        .iter()
        .zip(&end.path)
        .take_while(|(a, b)| a == b)
        .count();
    if let (Some(&left), Some(_)) = (start.path.get(shared), end.path.get(shared)) {
        let left_open = start.path.len() - shared - 1;
        let right_open = end.path.len() - shared - 1;
        if let Some(children) = children_at_mut(doc, &start.path[..shared]) {
            join(children, left, left_open, right_open);
        }
    }

    normalize(doc);
    Ok(from)
}

/// Remove everything between content offsets `from` and `to` of `children`.
fn delete_in(children: &mut Vec<Node>, from: usize, to: usize) {
    let mut start = 0;
    let mut index = 0;
    while index < children.len() {
        let size = children[index].node_size();
        let end = start + size;
        if end <= from || start >= to {
            index += 1;
        } else if from <= start && end <= to {
            children.remove(index);
        } else {
            match &mut children[index] {
                Node::Text(text) => {
                    let cut_from = from.max(start) - start;
                    let cut_to = to.min(end) - start;
                    let chars: String = text
                        .text
                        .chars()
                        .enumerate()
                        .filter(|(i, _)| *i < cut_from || *i >= cut_to)
                        .map(|(_, c)| c)
                        .collect();
                    text.text = chars;
                }
                node => {
                    let inner = node.content_size();
                    if let Some(content) = node.content_mut() {
                        let inner_from = from.saturating_sub(start + 1);
                        let inner_to = (to - start - 1).min(inner);
                        delete_in(content, inner_from, inner_to);
                    }
                }
            }
            index += 1;
        }
        start = end;
    }
}

/// Merge `children[index + 1]` into `children[index]`. The open depths say how far down each
/// side was cut into; only cut sides are stitched.
fn join(children: &mut Vec<Node>, index: usize, left_open: usize, right_open: usize) {
    let (Some(left), Some(right)) = (children.get(index), children.get(index + 1)) else {
        return;
    };
    let both_textblocks = left.is_textblock() && right.is_textblock();
    let same_container = !left.is_leaf()
        && !left.is_textblock()
        && left.type_name() == right.type_name()
        && left_open > 0
        && right_open > 0;
    if !both_textblocks && !same_container {
        return;
    }

    let right = children.remove(index + 1);
    let tail = right.content().to_vec();
    let Some(content) = children[index].content_mut() else {
        return;
    };
    let seam = content.len();
    content.extend(tail);
    if both_textblocks {
        normalize_inline(content);
    } else if seam > 0 {
        join(content, seam - 1, left_open - 1, right_open - 1);
    }
}

fn split_block(doc: &mut Document, pos: usize) -> Result<usize, EditError> {
    let resolved = textblock_at(doc, pos)?;
    let Some((&index, container_path)) = resolved.path.split_last() else {
        return Err(EditError::NotInTextblock { pos });
    };

    // Enter inside a list item splits the item too.
    if let Some((&item_index, list_path)) = container_path.split_last() {
        if matches!(node_at(doc, container_path), Some(Node::ListItem(_))) {
            let Some(item_children) = node_at_mut(doc, container_path).and_then(Node::content_mut)
            else {
                return Err(EditError::NotInTextblock { pos });
            };
            let right_block = split_off_textblock(&mut item_children[index], resolved.offset);
            let mut moved = vec![right_block];
            moved.extend(item_children.split_off(index + 1));
            let new_item = Node::ListItem(Branch::new(moved));
            if let Some(list) = children_at_mut(doc, list_path) {
                list.insert(item_index + 1, new_item);
            }
            return Ok(pos + 4);
        }
    }

    let children = children_at_mut(doc, container_path)
        .ok_or(EditError::NotInTextblock { pos })?;
    let right = split_off_textblock(&mut children[index], resolved.offset);
    children.insert(index + 1, right);
    Ok(pos + 2)
}

fn set_block_type(doc: &mut Document, pos: usize, block: BlockType) -> Result<usize, EditError> {
    let resolved = textblock_at(doc, pos)?;
    let Some(node) = node_at_mut(doc, &resolved.path) else {
        return Err(EditError::NotInTextblock { pos });
    };
    let content = node.content().to_vec();
    *node = match block {
        BlockType::Paragraph => Node::paragraph(content),
        BlockType::Heading(level) => Node::Heading(Branch {
            attrs: HeadingAttrs {
                level: level.clamp(1, 6),
                ..Default::default()
            },
            content,
        }),
    };
    Ok(pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_common::doc::Mark;

    fn doc(content: Vec<Node>) -> Document {
        Document::new(content)
    }

    fn run(d: &Document, op: EditOp) -> (Document, usize) {
        apply(d, &op).unwrap()
    }

    #[test]
    fn typing_inherits_marks_of_preceding_run() {
        let d = doc(vec![Node::heading(
            1,
            vec![Node::marked_text("ab", vec![Mark::Bold]), Node::text("c")],
        )]);
        let (next, cursor) = run(
            &d,
            EditOp::InsertText {
                pos: 3,
                text: "X".into(),
            },
        );
        assert_eq!(cursor, 4);
        assert_eq!(
            next.content[0].content(),
            &[Node::marked_text("abX", vec![Mark::Bold]), Node::text("c")]
        );

        let (next, _) = run(
            &d,
            EditOp::InsertText {
                pos: 1,
                text: "_".into(),
            },
        );
        assert_eq!(next.content[0].content()[0], Node::marked_text("_ab", vec![Mark::Bold]));
    }

    #[test]
    fn text_outside_textblocks_is_rejected() {
        let d = doc(vec![Node::heading(1, vec![]), Node::gallery(vec![])]);
        assert_eq!(
            apply(
                &d,
                &EditOp::InsertText {
                    pos: 2,
                    text: "x".into()
                }
            ),
            Err(EditError::NotInTextblock { pos: 2 })
        );
    }

    #[test]
    fn inline_node_between_blocks_gets_a_paragraph() {
        let d = doc(vec![Node::heading(1, vec![])]);
        let (next, cursor) = run(
            &d,
            EditOp::InsertNode {
                pos: 2,
                node: Node::text("hi"),
            },
        );
        assert_eq!(next.content[1], Node::paragraph(vec![Node::text("hi")]));
        assert_eq!(cursor, 6);
    }

    #[test]
    fn empty_text_inserts_nothing() {
        let d = doc(vec![Node::heading(1, vec![Node::text("T")])]);
        let (next, cursor) = run(
            &d,
            EditOp::InsertNode {
                pos: 3,
                node: Node::text(""),
            },
        );
        assert_eq!(next, d);
        assert_eq!(cursor, 3);
        assert!(apply(&d, &EditOp::InsertNode { pos: 9, node: Node::text("") }).is_err());
    }

    #[test]
    fn block_node_splits_the_paragraph() {
        // <h1></h1> <p>abcd</p>
        let d = doc(vec![
            Node::heading(1, vec![]),
            Node::paragraph(vec![Node::text("abcd")]),
        ]);
        let embed = Node::youtube_embed("https://youtu.be/dQw4w9WgXcQ");
        let (next, cursor) = run(
            &d,
            EditOp::InsertNode {
                pos: 5,
                node: embed.clone(),
            },
        );
        assert_eq!(
            next.content,
            vec![
                Node::heading(1, vec![]),
                Node::paragraph(vec![Node::text("ab")]),
                embed.clone(),
                Node::paragraph(vec![Node::text("cd")]),
            ]
        );
        assert_eq!(cursor, 7);

        // At the end of the paragraph nothing is split.
        let (next, cursor) = run(&d, EditOp::InsertNode { pos: 7, node: embed.clone() });
        assert_eq!(next.content.len(), 3);
        assert_eq!(next.content[2], embed);
        assert_eq!(cursor, 9);

        let err = apply(
            &d,
            &EditOp::InsertNode {
                pos: 5,
                node: Node::list_item(vec![]),
            },
        );
        assert!(matches!(err, Err(EditError::InvalidPlacement { .. })));
    }

    #[test]
    fn deleting_across_paragraphs_joins_them() {
        // <h1>T</h1> <p>abc</p> <p>def</p>
        let d = doc(vec![
            Node::heading(1, vec![Node::text("T")]),
            Node::paragraph(vec![Node::text("abc")]),
            Node::paragraph(vec![Node::text("def")]),
        ]);
        let (next, cursor) = run(&d, EditOp::Delete { from: 5, to: 10 });
        assert_eq!(cursor, 5);
        assert_eq!(
            next.content,
            vec![
                Node::heading(1, vec![Node::text("T")]),
                Node::paragraph(vec![Node::text("aef")]),
            ]
        );
    }

    #[test]
    fn deleting_across_list_items_joins_their_paragraphs() {
        let item = |t: &str| Node::list_item(vec![Node::paragraph(vec![Node::text(t)])]);
        // <ul> <li> <p> ab </p> </li> <li> <p> cd </p> </li> </ul>
        // 0    1    2   3   5    6    7    8   9  11   12   13
        let d = doc(vec![Node::bullet_list(vec![item("ab"), item("cd")])]);
        let (next, _) = run(&d, EditOp::Delete { from: 4, to: 10 });
        assert_eq!(
            next.content,
            vec![Node::bullet_list(vec![Node::list_item(vec![Node::paragraph(
                vec![Node::text("ad")]
            )])])]
        );
    }

    #[test]
    fn partial_overlap_removes_atoms_whole() {
        // <h1></h1> <p>ab@</p> <gallery> <p>z</p>
        let d = doc(vec![
            Node::heading(1, vec![]),
            Node::paragraph(vec![Node::text("ab"), Node::mention(Default::default())]),
            Node::gallery(vec!["a.png".into(), "b.png".into()]),
            Node::paragraph(vec![Node::text("z")]),
        ]);
        let (next, _) = run(&d, EditOp::Delete { from: 4, to: 8 });
        assert_eq!(
            next.content,
            vec![
                Node::heading(1, vec![]),
                Node::paragraph(vec![Node::text("a")]),
                Node::paragraph(vec![Node::text("z")]),
            ]
        );
    }

    #[test]
    fn replace_swaps_range_for_nodes() {
        let d = doc(vec![Node::heading(1, vec![Node::text("hi @jo")])]);
        let (next, cursor) = run(
            &d,
            EditOp::Replace {
                from: 4,
                to: 7,
                nodes: vec![Node::mention(Default::default())],
            },
        );
        assert_eq!(
            next.content[0].content(),
            &[Node::text("hi "), Node::mention(Default::default())]
        );
        assert_eq!(cursor, 5);
    }

    #[test]
    fn split_block_and_list_items() {
        let d = doc(vec![Node::heading(1, vec![Node::text("Title")])]);
        let (next, cursor) = run(&d, EditOp::SplitBlock { pos: 6 });
        assert_eq!(
            next.content,
            vec![
                Node::heading(1, vec![Node::text("Title")]),
                Node::paragraph(vec![]),
            ]
        );
        assert_eq!(cursor, 8);

        let (next, _) = run(&d, EditOp::SplitBlock { pos: 3 });
        assert_eq!(next.content[1], Node::heading(1, vec![Node::text("tle")]));

        let d = doc(vec![Node::bullet_list(vec![Node::list_item(vec![
            Node::paragraph(vec![Node::text("ab")]),
        ])])]);
        let (next, cursor) = run(&d, EditOp::SplitBlock { pos: 4 });
        assert_eq!(
            next.content,
            vec![Node::bullet_list(vec![
                Node::list_item(vec![Node::paragraph(vec![Node::text("a")])]),
                Node::list_item(vec![Node::paragraph(vec![Node::text("b")])]),
            ])]
        );
        assert_eq!(cursor, 8);
    }

    #[test]
    fn set_block_type_keeps_content() {
        let d = doc(vec![
            Node::heading(1, vec![]),
            Node::paragraph(vec![Node::text("x")]),
        ]);
        let (next, _) = run(
            &d,
            EditOp::SetBlockType {
                pos: 3,
                block: BlockType::Heading(9),
            },
        );
        assert_eq!(next.content[1], Node::heading(6, vec![Node::text("x")]));
    }

    #[test]
    fn out_of_range_and_reversed_ranges_are_errors() {
        let d = doc(vec![Node::heading(1, vec![])]);
        assert_eq!(
            apply(&d, &EditOp::Delete { from: 0, to: 3 }),
            Err(EditError::OutOfRange { pos: 3, size: 2 })
        );
        assert_eq!(
            apply(&d, &EditOp::Delete { from: 2, to: 1 }),
            Err(EditError::ReversedRange { from: 2, to: 1 })
        );
    }
}
