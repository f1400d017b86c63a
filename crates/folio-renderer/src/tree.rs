//! The render tree shared by every output surface.

use smol_str::SmolStr;

/// Where an element came from in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Source {
    /// Flat position of the node's start.
    pub pos: usize,
    /// The node is edited and selected as a whole.
    pub atom: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: SmolStr,
    pub attrs: Vec<(SmolStr, String)>,
    pub children: Vec<RenderNode>,
    pub source: Option<Source>,
}

impl Element {
    pub fn new(tag: impl Into<SmolStr>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
            source: None,
        }
    }

    pub fn attr(mut self, name: impl Into<SmolStr>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    /// Adds the attribute only when `value` is present.
    pub fn attr_opt(self, name: impl Into<SmolStr>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.attr(name, value),
            None => self,
        }
    }

    pub fn class(self, class: impl Into<String>) -> Self {
        self.attr("class", class)
    }

    pub fn child(mut self, child: impl Into<RenderNode>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = RenderNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.child(RenderNode::Text(text.into()))
    }

    pub fn source(mut self, pos: usize, atom: bool) -> Self {
        self.source = Some(Source { pos, atom });
        self
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderNode {
    Element(Element),
    Text(String),
}

impl RenderNode {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            RenderNode::Element(e) => Some(e),
            RenderNode::Text(_) => None,
        }
    }

    /// Visit this node and its descendants in document order.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a RenderNode)) {
        f(self);
        if let RenderNode::Element(e) = self {
            for child in &e.children {
                child.walk(f);
            }
        }
    }
}

impl From<Element> for RenderNode {
    fn from(element: Element) -> Self {
        RenderNode::Element(element)
    }
}
