//! The editing surface's HTML backend.
//!
//! Uses the same render tree as published pages, built for [`Surface::Interactive`]. Every
//! element that stands for a document node is tagged with its position so the surface can map
//! DOM selections back onto the document, and atoms are made non-editable.

use folio_common::doc::Document;
use folio_renderer::{Annotate, EmbedIndex, Element, HtmlWriter, RenderContext, Surface, build};
use smol_str::SmolStr;

/// Adds `data-pos` to node elements and `contenteditable="false"` to atoms.
#[derive(Debug, Clone, Copy, Default)]
pub struct EditableAnnotations;

impl Annotate for EditableAnnotations {
    fn annotate(&self, element: &Element) -> Vec<(SmolStr, String)> {
        let Some(source) = element.source else {
            return Vec::new();
        };
        let mut attrs = vec![(SmolStr::new_static("data-pos"), source.pos.to_string())];
        if source.atom {
            attrs.push((SmolStr::new_static("contenteditable"), "false".to_string()));
        }
        attrs
    }
}

/// Render `doc` for the editing surface.
pub fn render_interactive(doc: &Document, embeds: &EmbedIndex) -> String {
    let ctx = RenderContext::new(Surface::Interactive, embeds);
    let nodes = build(doc, &ctx);
    HtmlWriter::with_annotator(String::new(), EditableAnnotations)
        .run(&nodes)
        .unwrap_or_default()
}
