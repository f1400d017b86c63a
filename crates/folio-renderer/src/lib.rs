//! Rendering for folio documents.
//!
//! A document is first turned into a render tree by [`build`], the one place that decides how
//! each node type looks. Backends then write that tree out: [`html`] for published pages, and
//! the editor's view backend for the editing surface.

pub mod build;
pub mod embeds;
pub mod html;
pub mod mention;
pub mod tree;

pub use build::{LOADING_TEXT, RenderContext, Surface, build, build_node, with_marks};
pub use embeds::{EmbedIndex, EmbedState, prefetch_embeds};
pub use html::{Annotate, HtmlWriter, Plain, render_static, to_html};
pub use tree::{Element, RenderNode, Source};
