//! Static HTML backend.

use std::fmt::{self, Write};

use folio_common::doc::Document;
use smol_str::SmolStr;

use crate::build::{RenderContext, Surface, build};
use crate::embeds::EmbedIndex;
use crate::tree::{Element, RenderNode};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Extra attributes a surface adds to elements as they are written.
pub trait Annotate {
    fn annotate(&self, _element: &Element) -> Vec<(SmolStr, String)> {
        Vec::new()
    }
}

/// Writes the tree as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct Plain;

impl Annotate for Plain {}

/// Serializes render trees as HTML.
pub struct HtmlWriter<W, A = Plain> {
    writer: W,
    annotator: A,
}

impl<W: Write> HtmlWriter<W, Plain> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            annotator: Plain,
        }
    }
}

impl<W: Write, A: Annotate> HtmlWriter<W, A> {
    pub fn with_annotator(writer: W, annotator: A) -> Self {
        Self { writer, annotator }
    }

    /// Write top-level nodes, one per line.
    pub fn run(mut self, nodes: &[RenderNode]) -> Result<W, fmt::Error> {
        for node in nodes {
            self.write_node(node)?;
            self.writer.write_char('\n')?;
        }
        Ok(self.writer)
    }

    fn write_node(&mut self, node: &RenderNode) -> fmt::Result {
        match node {
            RenderNode::Text(text) => self.writer.write_str(&html_escape::encode_text(text)),
            RenderNode::Element(element) => self.write_element(element),
        }
    }

    fn write_attr(&mut self, name: &str, value: &str) -> fmt::Result {
        write!(
            self.writer,
            " {name}=\"{}\"",
            html_escape::encode_double_quoted_attribute(value)
        )
    }

    fn write_element(&mut self, element: &Element) -> fmt::Result {
        write!(self.writer, "<{}", element.tag)?;
        for (name, value) in &element.attrs {
            self.write_attr(name, value)?;
        }
        for (name, value) in self.annotator.annotate(element) {
            self.write_attr(&name, &value)?;
        }
        if VOID_ELEMENTS.contains(&element.tag.as_str()) {
            return self.writer.write_str(" />");
        }
        self.writer.write_char('>')?;
        for child in &element.children {
            self.write_node(child)?;
        }
        write!(self.writer, "</{}>", element.tag)
    }
}

/// Serialize `nodes` with no surface annotations.
pub fn to_html(nodes: &[RenderNode]) -> String {
    HtmlWriter::new(String::new())
        .run(nodes)
        .unwrap_or_default()
}

/// Render a document for a published page.
pub fn render_static(doc: &Document, embeds: &EmbedIndex) -> String {
    let ctx = RenderContext::new(Surface::Static, embeds);
    to_html(&build(doc, &ctx))
}
