//! folio-editor-core: the editing session for a post, independent of any UI toolkit.
//!
//! This crate provides:
//! - `PostEditor` - owns the document, applies edits, keeps the title invariant, notifies
//! - `edit` - the structural edit operations over flat positions
//! - `History` / `UndoManager` - snapshot undo
//! - `restore_selection` - carrying a selection across a content reset
//! - paste and mention glue that turns resolved content into edits
//! - `view` - the editing surface's HTML backend
//! - `Autosaver` - coalesced background saving

pub mod autosave;
pub mod edit;
pub mod editor;
pub mod error;
pub mod paste;
pub mod position;
pub mod selection;
pub mod undo;
pub mod view;

pub use autosave::{Autosaver, SaveStatus};
pub use edit::{BlockType, EditOp};
pub use editor::{Change, ChangeOrigin, ListenerId, PostEditor};
pub use error::EditError;
pub use paste::{LinkChoice, PasteOutcome, PendingLinkPaste};
pub use position::{ResolvedPos, is_text_position, resolve};
pub use selection::{RestoredSelection, Selection, restore_selection};
pub use undo::{History, UndoManager};
pub use view::{EditableAnnotations, render_interactive};
