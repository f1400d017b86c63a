//! Attaching resolved content to the document: pasted text, link mentions and mention
//! suggestions. Resolution itself happens elsewhere; these only turn its answers into edits.

use std::ops::Range;

use folio_common::doc::Node;
use folio_resolve::{EmbedKind, LinkPasteSuggestion, MentionInsert, PasteAction, classify_paste};
use smol_str::SmolStr;
use url::Url;

use crate::edit::EditOp;
use crate::editor::PostEditor;
use crate::error::EditError;

/// A pasted URL waiting for the author to choose how to insert it.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingLinkPaste {
    pub url: Url,
    /// Where the paste happened.
    pub pos: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PasteOutcome {
    /// An embed node was inserted; the cursor sits after it.
    Embedded {
        kind: EmbedKind,
        id: SmolStr,
        cursor: usize,
    },
    /// Nothing was inserted yet. Resolve the link and finish with
    /// [`PostEditor::complete_link_paste`].
    PendingLink(PendingLinkPaste),
    Text { cursor: usize },
}

/// How a resolved link paste goes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkChoice {
    Mention,
    PlainLink,
}

impl PostEditor {
    /// Paste `text` at `pos`. Video and social post URLs become embeds, other URLs wait for a
    /// link choice, and anything else is inserted as text.
    pub fn paste_text(&mut self, pos: usize, text: &str) -> Result<PasteOutcome, EditError> {
        let action = classify_paste(text);
        if let (PasteAction::Embed { kind, id, .. }, Some(node)) = (&action, action.embed_node()) {
            let cursor = self.apply_edit(EditOp::InsertNode { pos, node })?;
            tracing::debug!(kind = kind.name(), %id, "pasted embed");
            return Ok(PasteOutcome::Embedded {
                kind: *kind,
                id: id.clone(),
                cursor,
            });
        }
        match action {
            PasteAction::LinkMention { url } => {
                // Validate the position now so a bad paste fails before any lookup starts.
                crate::position::resolve(self.document(), pos)?;
                Ok(PasteOutcome::PendingLink(PendingLinkPaste { url, pos }))
            }
            _ => {
                let cursor = self.apply_edit(EditOp::InsertNode {
                    pos,
                    node: Node::text(text),
                })?;
                Ok(PasteOutcome::Text { cursor })
            }
        }
    }

    /// Insert a resolved link paste as a link mention or as linked text.
    pub fn complete_link_paste(
        &mut self,
        pending: &PendingLinkPaste,
        suggestion: &LinkPasteSuggestion,
        choice: LinkChoice,
    ) -> Result<usize, EditError> {
        let node = match choice {
            LinkChoice::Mention => suggestion.to_link_mention(),
            LinkChoice::PlainLink => suggestion.to_plain_link(),
        };
        self.apply_edit(EditOp::InsertNode {
            pos: pending.pos,
            node,
        })
    }

    /// Apply a picked mention suggestion over the trigger text (`@` through the typed query).
    pub fn apply_mention(
        &mut self,
        trigger: Range<usize>,
        insert: MentionInsert,
    ) -> Result<usize, EditError> {
        let node = match insert {
            MentionInsert::Text(text) => Node::text(text),
            MentionInsert::Mention(attrs) => Node::mention(attrs),
        };
        self.apply_edit(EditOp::Replace {
            from: trigger.start,
            to: trigger.end,
            nodes: vec![node],
        })
    }
}
