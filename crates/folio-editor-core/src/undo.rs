//! Undo/redo management for the post editor.
//!
//! Provides:
//! - `UndoManager` trait for abstracting undo implementations
//! - `History` - bounded stacks of whole-document snapshots

use folio_common::doc::Document;

/// Trait for managing undo/redo operations.
///
/// Implementations must actually perform the undo/redo, not just track state.
pub trait UndoManager {
    /// Check if undo is available.
    fn can_undo(&self) -> bool;

    /// Check if redo is available.
    fn can_redo(&self) -> bool;

    /// Perform undo. Returns true if successful.
    fn undo(&mut self) -> bool;

    /// Perform redo. Returns true if successful.
    fn redo(&mut self) -> bool;

    /// Clear all undo/redo history.
    fn clear_history(&mut self);
}

/// Snapshots taken before each edit.
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: Vec<Document>,
    redo_stack: Vec<Document>,
    max_steps: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_STEPS)
    }
}

impl History {
    pub const DEFAULT_MAX_STEPS: usize = 100;

    pub fn new(max_steps: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_steps,
        }
    }

    /// Record the document as it was before an edit.
    pub fn record(&mut self, before: Document) {
        // Clear redo stack on new edit
        self.redo_stack.clear();

        self.undo_stack.push(before);

        // Trim if over max
        while self.undo_stack.len() > self.max_steps {
            self.undo_stack.remove(0);
        }
    }

    /// Step back from `current`, returning the document to restore.
    pub fn undo(&mut self, current: Document) -> Option<Document> {
        let previous = self.undo_stack.pop()?;
        self.redo_stack.push(current);
        Some(previous)
    }

    /// Step forward from `current`, returning the document to restore.
    pub fn redo(&mut self, current: Document) -> Option<Document> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_common::doc::Node;

    fn titled(text: &str) -> Document {
        Document::new(vec![Node::heading(1, vec![Node::text(text)])])
    }

    #[test]
    fn undo_then_redo() {
        let mut history = History::default();
        history.record(titled("a"));
        assert!(history.can_undo());

        let restored = history.undo(titled("ab")).unwrap();
        assert_eq!(restored, titled("a"));
        assert!(!history.can_undo());
        assert!(history.can_redo());

        let again = history.redo(restored).unwrap();
        assert_eq!(again, titled("ab"));
        assert!(history.undo(titled("ab")).is_some());
    }

    #[test]
    fn new_edit_clears_redo() {
        let mut history = History::default();
        history.record(titled("a"));
        history.undo(titled("ab"));
        history.record(titled("a"));
        assert!(!history.can_redo());
    }

    #[test]
    fn oldest_steps_are_dropped() {
        let mut history = History::new(2);
        for text in ["a", "b", "c"] {
            history.record(titled(text));
        }
        assert_eq!(history.undo_depth(), 2);
        assert_eq!(history.undo(titled("d")), Some(titled("c")));
        assert_eq!(history.undo(titled("c")), Some(titled("b")));
        assert_eq!(history.undo(titled("b")), None);
    }
}
