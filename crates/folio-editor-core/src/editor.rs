//! The editing session for one post.

use std::ops::Range;

use folio_common::doc::{Document, Node};
use folio_common::schema::{self, StructuralViolation};

use crate::edit::{self, EditOp};
use crate::error::EditError;
use crate::position::resolve;
use crate::selection::{RestoredSelection, Selection, restore_selection};
use crate::undo::{History, UndoManager};

/// What produced a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    Edit,
    /// The whole document was replaced from outside, e.g. after a save round trip.
    Reset,
    Undo,
    Redo,
}

/// Passed to listeners after every settled change.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    /// Increases by one per change.
    pub version: u64,
    pub origin: ChangeOrigin,
    /// The title repair applied before listeners were told, if any.
    pub repaired: Option<StructuralViolation>,
}

pub type ListenerId = u64;

/// Size of the empty title heading the repair inserts.
const EMPTY_TITLE_SIZE: usize = 2;

type Listener = Box<dyn Fn(&Document, &Change) + Send + Sync>;

/// Owns a post's document for the length of an editing session.
///
/// All edits go through [`PostEditor::apply_edit`]; the title invariant is repaired after each
/// one and only then are listeners notified, so they never observe a document without its
/// title.
pub struct PostEditor {
    doc: Document,
    selection: Selection,
    history: History,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: ListenerId,
    version: u64,
}

impl std::fmt::Debug for PostEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostEditor")
            .field("version", &self.version)
            .field("selection", &self.selection)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl Default for PostEditor {
    fn default() -> Self {
        Self::new(Document::with_empty_title())
    }
}

impl PostEditor {
    pub fn new(doc: Document) -> Self {
        Self::with_history(doc, History::default())
    }

    pub fn with_history(doc: Document, history: History) -> Self {
        let doc = schema::enforce_invariant(doc);
        let end = doc.content_size();
        let mut editor = Self {
            doc,
            selection: Selection::default(),
            history,
            listeners: Vec::new(),
            next_listener: 0,
            version: 0,
        };
        editor.selection = match restore_selection(Selection::collapsed(end + 1), &editor.doc) {
            RestoredSelection::Text(selection) => selection,
            RestoredSelection::FocusEnd => Selection::collapsed(end),
        };
        editor
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// An owned copy of the current document.
    pub fn snapshot(&self) -> Document {
        self.doc.clone()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) -> Result<(), EditError> {
        let size = self.doc.content_size();
        if let Some(pos) = [selection.anchor, selection.head]
            .into_iter()
            .find(|&pos| pos > size)
        {
            return Err(EditError::OutOfRange { pos, size });
        }
        self.selection = selection;
        Ok(())
    }

    /// Register a change listener.
    pub fn on_change(
        &mut self,
        listener: impl Fn(&Document, &Change) + Send + Sync + 'static,
    ) -> ListenerId {
        let id = self.next_listener;
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Apply one edit. Returns the cursor position after it, which also becomes the selection.
    #[tracing::instrument(skip_all, fields(op = op.name()))]
    pub fn apply_edit(&mut self, op: EditOp) -> Result<usize, EditError> {
        let (next, cursor) = edit::apply(&self.doc, &op)?;
        let Some(change) = self.commit(next, ChangeOrigin::Edit) else {
            return Ok(cursor.min(self.doc.content_size()));
        };
        // A title put in front of the edited content moves everything after it.
        let cursor = match change.repaired {
            Some(StructuralViolation::InsertedTitle { .. }) => cursor + EMPTY_TITLE_SIZE,
            Some(StructuralViolation::Empty) => 1,
            _ => cursor,
        };
        let cursor = cursor.min(self.doc.content_size());
        self.selection = Selection::collapsed(cursor);
        Ok(cursor)
    }

    /// Replace the whole document, e.g. with the copy a save returned. History is cleared and
    /// the selection is carried over with [`restore_selection`].
    pub fn set_content(&mut self, doc: Document) -> RestoredSelection {
        self.history.clear();
        self.commit(doc, ChangeOrigin::Reset);
        self.restore(self.selection)
    }

    /// The full range of the atom at `pos`: the one starting there, or else the one ending there.
    pub fn select_node_at(&mut self, pos: usize) -> Option<Range<usize>> {
        let resolved = resolve(&self.doc, pos).ok()?;
        let siblings = match resolved.parent(&self.doc) {
            Some(parent) => parent.content(),
            None => &self.doc.content,
        };

        let mut start = 0;
        let mut found = None;
        for node in siblings {
            let end = start + node.node_size();
            if node.is_atom() && (start == resolved.offset || end == resolved.offset) {
                found = Some(start);
                if start == resolved.offset {
                    break;
                }
            }
            if start > resolved.offset {
                break;
            }
            start = end;
        }

        let from = resolved.content_start() + found?;
        self.selection = Selection::new(from, from + 1);
        Some(from..from + 1)
    }

    /// The node directly after `pos` in its parent, if any.
    pub fn node_after(&self, pos: usize) -> Option<&Node> {
        let resolved = resolve(&self.doc, pos).ok()?;
        let siblings = match resolved.parent(&self.doc) {
            Some(parent) => parent.content(),
            None => &self.doc.content,
        };
        let mut start = 0;
        for node in siblings {
            if start == resolved.offset {
                return Some(node);
            }
            start += node.node_size();
        }
        None
    }

    fn restore(&mut self, previous: Selection) -> RestoredSelection {
        let restored = restore_selection(previous, &self.doc);
        self.selection = match restored {
            RestoredSelection::Text(selection) => selection,
            RestoredSelection::FocusEnd => Selection::collapsed(self.doc.content_size()),
        };
        restored
    }

    /// Enforce the title invariant on `next`, install it and notify listeners. Returns `None`
    /// when the result is identical to the current document.
    fn commit(&mut self, mut next: Document, origin: ChangeOrigin) -> Option<Change> {
        let repaired = schema::repair(&mut next);
        if next == self.doc {
            return None;
        }

        let previous = std::mem::replace(&mut self.doc, next);
        if origin == ChangeOrigin::Edit {
            self.history.record(previous);
        }
        self.version += 1;

        let change = Change {
            version: self.version,
            origin,
            repaired,
        };
        for (_, listener) in &self.listeners {
            listener(&self.doc, &change);
        }
        Some(change)
    }
}

impl UndoManager for PostEditor {
    fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn undo(&mut self) -> bool {
        let Some(previous) = self.history.undo(self.doc.clone()) else {
            return false;
        };
        self.commit(previous, ChangeOrigin::Undo);
        self.restore(self.selection);
        true
    }

    fn redo(&mut self) -> bool {
        let Some(next) = self.history.redo(self.doc.clone()) else {
            return false;
        };
        self.commit(next, ChangeOrigin::Redo);
        self.restore(self.selection);
        true
    }

    fn clear_history(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::edit::BlockType;

    #[test]
    fn listeners_see_repaired_documents() {
        let mut editor = PostEditor::new(Document::new(vec![
            Node::heading(1, vec![Node::text("T")]),
            Node::paragraph(vec![Node::text("body")]),
        ]));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        editor.on_change(move |doc, change| {
            sink.lock()
                .unwrap()
                .push((schema::validate(doc), change.clone()));
        });

        // Demoting the title is repaired before anyone hears about it.
        editor
            .apply_edit(EditOp::SetBlockType {
                pos: 1,
                block: BlockType::Paragraph,
            })
            .unwrap();
        assert_eq!(editor.version(), 0);
        assert!(seen.lock().unwrap().is_empty());

        // Deleting the title block entirely promotes the paragraph.
        editor.apply_edit(EditOp::Delete { from: 0, to: 3 }).unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].0);
        assert_eq!(
            seen[0].1.repaired,
            Some(StructuralViolation::ConvertedToTitle {
                found: "paragraph".into()
            })
        );
        assert_eq!(editor.document().text_content(), "body");
    }

    #[test]
    fn cursor_follows_an_inserted_title() {
        // <h1>T</h1> <gallery>
        let mut editor = PostEditor::new(Document::new(vec![
            Node::heading(1, vec![Node::text("T")]),
            Node::gallery(vec![]),
        ]));
        let cursor = editor.apply_edit(EditOp::Delete { from: 0, to: 3 }).unwrap();
        assert_eq!(
            editor.document(),
            &Document::new(vec![Node::heading(1, vec![]), Node::gallery(vec![])])
        );
        assert_eq!(cursor, 2);
        assert_eq!(editor.selection(), Selection::collapsed(2));
        assert_eq!(editor.node_after(cursor), Some(&Node::gallery(vec![])));
    }

    #[test]
    fn cursor_lands_in_the_title_of_an_emptied_document() {
        let mut editor = PostEditor::new(Document::new(vec![Node::heading(
            1,
            vec![Node::text("T")],
        )]));
        let cursor = editor.apply_edit(EditOp::Delete { from: 0, to: 3 }).unwrap();
        assert_eq!(editor.document(), &Document::with_empty_title());
        assert_eq!(cursor, 1);
    }

    #[test]
    fn undo_restores_previous_snapshot() {
        let mut editor = PostEditor::default();
        editor
            .apply_edit(EditOp::InsertText {
                pos: 1,
                text: "Hello".into(),
            })
            .unwrap();
        assert!(editor.can_undo());
        assert!(editor.undo());
        assert_eq!(editor.document(), &Document::with_empty_title());
        assert_eq!(editor.selection(), Selection::collapsed(1));
        assert!(editor.redo());
        assert_eq!(editor.document().text_content(), "Hello");
        assert!(!editor.redo());
    }

    #[test]
    fn set_content_restores_selection() {
        let mut editor = PostEditor::new(Document::new(vec![Node::heading(
            1,
            vec![Node::text("A long title")],
        )]));
        editor.set_selection(Selection::collapsed(12)).unwrap();
        let restored = editor.set_content(Document::new(vec![Node::heading(
            1,
            vec![Node::text("Short")],
        )]));
        assert_eq!(restored, RestoredSelection::Text(Selection::collapsed(6)));
        assert!(!editor.can_undo());
    }

    #[test]
    fn select_node_at_covers_atoms() {
        // <h1>a@</h1> <gallery>
        let mut editor = PostEditor::new(Document::new(vec![
            Node::heading(1, vec![Node::text("a"), Node::mention(Default::default())]),
            Node::gallery(vec![]),
        ]));
        assert_eq!(editor.select_node_at(2), Some(2..3));
        assert_eq!(editor.select_node_at(3), Some(2..3));
        assert_eq!(editor.select_node_at(4), Some(4..5));
        assert_eq!(editor.select_node_at(5), Some(4..5));
        assert_eq!(editor.selection(), Selection::new(4, 5));
        assert_eq!(editor.select_node_at(1), None);
        assert_eq!(editor.select_node_at(9), None);
    }
}
