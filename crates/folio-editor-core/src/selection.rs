//! Selections and how they survive content being replaced underneath them.

use std::ops::Range;

use folio_common::doc::Document;

use crate::position::is_text_position;

/// Text selection with anchor and head positions.
///
/// The anchor is where the selection started, the head is where the cursor is now.
/// They may be in any order - use `start()` and `end()` for ordered bounds.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// Create a collapsed selection (cursor position).
    pub fn collapsed(offset: usize) -> Self {
        Self {
            anchor: offset,
            head: offset,
        }
    }

    pub fn start(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn end(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }

    /// Convert to a Range<usize> (ordered).
    pub fn to_range(&self) -> Range<usize> {
        self.start()..self.end()
    }
}

/// Where to put the selection after the document was replaced.
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum RestoredSelection {
    Text(Selection),
    /// No usable text position near the old one; focus the end of the document.
    FocusEnd,
}

/// Map `previous` onto `doc`.
///
/// Offsets still inside the document are kept as they are. Offsets past its end are clamped to
/// the end and then moved onto the closest text position at most one step back, which is the
/// end of a trailing textblock. When that does not exist the caller should focus the end.
pub fn restore_selection(previous: Selection, doc: &Document) -> RestoredSelection {
    let size = doc.content_size();
    let place = |offset: usize| -> Option<usize> {
        if offset <= size {
            return Some(offset);
        }
        [size, size.saturating_sub(1)]
            .into_iter()
            .find(|&candidate| is_text_position(doc, candidate))
    };
    match (place(previous.anchor), place(previous.head)) {
        (Some(anchor), Some(head)) => RestoredSelection::Text(Selection::new(anchor, head)),
        _ => RestoredSelection::FocusEnd,
    }
}
