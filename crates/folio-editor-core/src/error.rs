use miette::Diagnostic;
use smol_str::SmolStr;
use thiserror::Error;

/// Rejected edit operations. The document is left untouched when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[non_exhaustive]
pub enum EditError {
    #[error("position {pos} is outside the document (size {size})")]
    #[diagnostic(code(edit::out_of_range))]
    OutOfRange { pos: usize, size: usize },

    #[error("range {from}..{to} is reversed")]
    #[diagnostic(code(edit::reversed_range))]
    ReversedRange { from: usize, to: usize },

    #[error("position {pos} is not inside a text block")]
    #[diagnostic(
        code(edit::not_in_textblock),
        help("text and inline nodes can only be placed inside headings, paragraphs or code blocks")
    )]
    NotInTextblock { pos: usize },

    #[error("`{kind}` cannot be inserted at position {pos}")]
    #[diagnostic(code(edit::invalid_placement))]
    InvalidPlacement { kind: SmolStr, pos: usize },
}
