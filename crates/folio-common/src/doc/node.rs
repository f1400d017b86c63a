//! Document tree node types.
//!
//! Nodes serialize to the ProseMirror JSON shape (`{type, attrs, content, text, marks}`)
//! through [`RawNode`]. Known attributes are typed; anything else a node carries is kept in a
//! flattened `extra` map so persisted documents round-trip without loss.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use smol_str::SmolStr;

use super::mark::Mark;

/// Untyped attribute bag.
pub type Attrs = Map<String, Value>;

/// Editors write every declared attribute, using `null` for unset ones.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A node that owns child nodes, plus its attributes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Branch<A> {
    pub attrs: A,
    pub content: Vec<Node>,
}

impl<A: Default> Branch<A> {
    pub fn new(content: Vec<Node>) -> Self {
        Self {
            attrs: A::default(),
            content,
        }
    }
}

/// A run of text with its marks.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Text {
    pub text: String,
    pub marks: Vec<Mark>,
}

impl Text {
    /// Size in positions: one per Unicode scalar value.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadingAttrs {
    #[serde(default = "default_level")]
    pub level: u8,
    #[serde(flatten)]
    pub extra: Attrs,
}

fn default_level() -> u8 {
    1
}

impl Default for HeadingAttrs {
    fn default() -> Self {
        Self {
            level: 1,
            extra: Attrs::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderedListAttrs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u32>,
    #[serde(flatten)]
    pub extra: Attrs,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CodeBlockAttrs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(flatten)]
    pub extra: Attrs,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CellAttrs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colspan: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rowspan: Option<u32>,
    #[serde(flatten)]
    pub extra: Attrs,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageAttrs {
    #[serde(default, deserialize_with = "null_as_default")]
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub extra: Attrs,
    /// Marks the image sits under when placed inline. Stored beside `attrs` on the wire.
    #[serde(skip)]
    pub marks: Vec<Mark>,
}

/// Attributes of a person mention (`tw:` or `gh:` identity).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MentionAttrs {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    #[serde(flatten)]
    pub extra: Attrs,
    #[serde(skip)]
    pub marks: Vec<Mark>,
}

/// Attributes of an inline rich link.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkMentionAttrs {
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(flatten)]
    pub extra: Attrs,
    #[serde(skip)]
    pub marks: Vec<Mark>,
}

/// Embed nodes only persist the source URL; the external id is derived when needed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EmbedAttrs {
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub url: String,
    #[serde(flatten)]
    pub extra: Attrs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Grid,
    Carousel,
    #[serde(other)]
    List,
}

impl DisplayMode {
    pub fn as_str(self) -> &'static str {
        match self {
            DisplayMode::Grid => "grid",
            DisplayMode::Carousel => "carousel",
            DisplayMode::List => "list",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSpan {
    pub col: u32,
    pub row: u32,
}

impl Default for GridSpan {
    fn default() -> Self {
        Self { col: 1, row: 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryAttrs {
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_mode: DisplayMode,
    /// `null` decodes as zero, which [`GalleryAttrs::columns`] treats as unset.
    #[serde(default = "default_columns", deserialize_with = "null_as_default")]
    pub columns: u32,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub grid_spans: Vec<GridSpan>,
    #[serde(flatten)]
    pub extra: Attrs,
}

fn default_columns() -> u32 {
    GalleryAttrs::DEFAULT_COLUMNS
}

impl GalleryAttrs {
    pub const DEFAULT_COLUMNS: u32 = 3;

    /// Column count, with zero treated as unset.
    pub fn columns(&self) -> u32 {
        if self.columns == 0 {
            Self::DEFAULT_COLUMNS
        } else {
            self.columns
        }
    }

    /// Span for the image at `index`, `{1,1}` when unspecified.
    pub fn span(&self, index: usize) -> GridSpan {
        self.grid_spans.get(index).copied().unwrap_or_default()
    }
}

impl Default for GalleryAttrs {
    fn default() -> Self {
        Self {
            images: Vec::new(),
            display_mode: DisplayMode::Grid,
            columns: Self::DEFAULT_COLUMNS,
            grid_spans: Vec::new(),
            extra: Attrs::new(),
        }
    }
}

/// A node whose type this build does not know. Kept verbatim.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnknownNode {
    pub kind: SmolStr,
    pub attrs: Option<Value>,
    pub content: Option<Vec<Node>>,
    pub text: Option<String>,
    pub marks: Vec<Mark>,
}

/// A document node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNode", into = "RawNode")]
pub enum Node {
    Text(Text),
    /// A line break, with the marks it was typed under.
    HardBreak(Vec<Mark>),
    Heading(Branch<HeadingAttrs>),
    Paragraph(Branch<Attrs>),
    BulletList(Branch<Attrs>),
    OrderedList(Branch<OrderedListAttrs>),
    ListItem(Branch<Attrs>),
    Blockquote(Branch<Attrs>),
    CodeBlock(Branch<CodeBlockAttrs>),
    HorizontalRule,
    Image(ImageAttrs),
    Table(Branch<Attrs>),
    TableRow(Branch<Attrs>),
    TableCell(Branch<CellAttrs>),
    TableHeader(Branch<CellAttrs>),
    Mention(MentionAttrs),
    LinkMention(LinkMentionAttrs),
    TwitterEmbed(EmbedAttrs),
    YoutubeEmbed(EmbedAttrs),
    Gallery(GalleryAttrs),
    Unknown(UnknownNode),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(Text {
            text: text.into(),
            marks: Vec::new(),
        })
    }

    pub fn marked_text(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Node::Text(Text {
            text: text.into(),
            marks,
        })
    }

    pub fn hard_break() -> Self {
        Node::HardBreak(Vec::new())
    }

    pub fn heading(level: u8, content: Vec<Node>) -> Self {
        Node::Heading(Branch {
            attrs: HeadingAttrs {
                level,
                extra: Attrs::new(),
            },
            content,
        })
    }

    pub fn paragraph(content: Vec<Node>) -> Self {
        Node::Paragraph(Branch::new(content))
    }

    pub fn bullet_list(items: Vec<Node>) -> Self {
        Node::BulletList(Branch::new(items))
    }

    pub fn list_item(content: Vec<Node>) -> Self {
        Node::ListItem(Branch::new(content))
    }

    pub fn blockquote(content: Vec<Node>) -> Self {
        Node::Blockquote(Branch::new(content))
    }

    pub fn mention(attrs: MentionAttrs) -> Self {
        Node::Mention(attrs)
    }

    pub fn link_mention(attrs: LinkMentionAttrs) -> Self {
        Node::LinkMention(attrs)
    }

    pub fn twitter_embed(url: impl Into<String>) -> Self {
        Node::TwitterEmbed(EmbedAttrs {
            url: url.into(),
            extra: Attrs::new(),
        })
    }

    pub fn youtube_embed(url: impl Into<String>) -> Self {
        Node::YoutubeEmbed(EmbedAttrs {
            url: url.into(),
            extra: Attrs::new(),
        })
    }

    pub fn gallery(images: Vec<String>) -> Self {
        Node::Gallery(GalleryAttrs {
            images,
            ..Default::default()
        })
    }

    /// The ProseMirror type name of this node.
    pub fn type_name(&self) -> &str {
        match self {
            Node::Text(_) => "text",
            Node::HardBreak(_) => "hardBreak",
            Node::Heading(_) => "heading",
            Node::Paragraph(_) => "paragraph",
            Node::BulletList(_) => "bulletList",
            Node::OrderedList(_) => "orderedList",
            Node::ListItem(_) => "listItem",
            Node::Blockquote(_) => "blockquote",
            Node::CodeBlock(_) => "codeBlock",
            Node::HorizontalRule => "horizontalRule",
            Node::Image(_) => "image",
            Node::Table(_) => "table",
            Node::TableRow(_) => "tableRow",
            Node::TableCell(_) => "tableCell",
            Node::TableHeader(_) => "tableHeader",
            Node::Mention(_) => "mention",
            Node::LinkMention(_) => "linkMention",
            Node::TwitterEmbed(_) => "twitterEmbed",
            Node::YoutubeEmbed(_) => "youtubeEmbed",
            Node::Gallery(_) => "gallery",
            Node::Unknown(u) => u.kind.as_str(),
        }
    }

    /// Atomic nodes are edited and selected as one unit and never carry children.
    pub fn is_atom(&self) -> bool {
        matches!(
            self,
            Node::Mention(_)
                | Node::LinkMention(_)
                | Node::TwitterEmbed(_)
                | Node::YoutubeEmbed(_)
                | Node::Gallery(_)
        )
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }

    /// Inline nodes live inside textblocks.
    pub fn is_inline(&self) -> bool {
        match self {
            Node::Text(_) | Node::HardBreak(_) | Node::Mention(_) | Node::LinkMention(_) => true,
            Node::Unknown(u) => u.text.is_some(),
            _ => false,
        }
    }

    /// Blocks whose children are inline content.
    pub fn is_textblock(&self) -> bool {
        matches!(
            self,
            Node::Heading(_) | Node::Paragraph(_) | Node::CodeBlock(_)
        )
    }

    /// Nodes with no content of their own.
    pub fn is_leaf(&self) -> bool {
        match self {
            Node::Text(_)
            | Node::HardBreak(_)
            | Node::HorizontalRule
            | Node::Image(_)
            | Node::Mention(_)
            | Node::LinkMention(_)
            | Node::TwitterEmbed(_)
            | Node::YoutubeEmbed(_)
            | Node::Gallery(_) => true,
            Node::Unknown(u) => u.content.is_none(),
            _ => false,
        }
    }

    /// Child nodes, empty for leaves.
    pub fn content(&self) -> &[Node] {
        match self {
            Node::Heading(b) => &b.content,
            Node::Paragraph(b)
            | Node::BulletList(b)
            | Node::ListItem(b)
            | Node::Blockquote(b)
            | Node::Table(b)
            | Node::TableRow(b) => &b.content,
            Node::OrderedList(b) => &b.content,
            Node::CodeBlock(b) => &b.content,
            Node::TableCell(b) | Node::TableHeader(b) => &b.content,
            Node::Unknown(u) => u.content.as_deref().unwrap_or(&[]),
            _ => &[],
        }
    }

    /// Mutable child list, `None` for leaves.
    pub fn content_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Heading(b) => Some(&mut b.content),
            Node::Paragraph(b)
            | Node::BulletList(b)
            | Node::ListItem(b)
            | Node::Blockquote(b)
            | Node::Table(b)
            | Node::TableRow(b) => Some(&mut b.content),
            Node::OrderedList(b) => Some(&mut b.content),
            Node::CodeBlock(b) => Some(&mut b.content),
            Node::TableCell(b) | Node::TableHeader(b) => Some(&mut b.content),
            Node::Unknown(u) => u.content.as_mut(),
            _ => None,
        }
    }

    /// Sum of the sizes of the children.
    pub fn content_size(&self) -> usize {
        self.content().iter().map(Node::node_size).sum()
    }

    /// Size in flat positions: text counts characters, other leaves count one, and
    /// branches count their content plus an opening and closing token.
    pub fn node_size(&self) -> usize {
        match self {
            Node::Text(t) => t.len(),
            n if n.is_leaf() => 1,
            n => n.content_size() + 2,
        }
    }

    /// Marks on an inline node. Always empty for blocks.
    pub fn marks(&self) -> &[Mark] {
        match self {
            Node::Text(t) => &t.marks,
            Node::HardBreak(marks) => marks,
            Node::Image(a) => &a.marks,
            Node::Mention(a) => &a.marks,
            Node::LinkMention(a) => &a.marks,
            Node::Unknown(u) => &u.marks,
            _ => &[],
        }
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text(t) => out.push_str(&t.text),
            Node::Unknown(UnknownNode {
                text: Some(text), ..
            }) => out.push_str(text),
            other => {
                for child in other.content() {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Visit this node and every descendant in document order.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Node)) {
        f(self);
        for child in self.content() {
            child.walk(f);
        }
    }
}

/// Wire shape of a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RawNode {
    #[serde(rename = "type")]
    kind: SmolStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attrs: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<Vec<Node>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    marks: Vec<Mark>,
}

/// A node that could not be decoded from its wire shape.
#[derive(Debug, thiserror::Error)]
#[error("invalid `{kind}` node: {message}")]
pub struct NodeDecodeError {
    kind: SmolStr,
    message: String,
}

fn decode_attrs<A: DeserializeOwned + Default>(
    kind: &SmolStr,
    attrs: Option<Value>,
) -> Result<A, NodeDecodeError> {
    match attrs {
        None | Some(Value::Null) => Ok(A::default()),
        Some(value) => serde_json::from_value(value).map_err(|e| NodeDecodeError {
            kind: kind.clone(),
            message: e.to_string(),
        }),
    }
}

fn encode_attrs<A: Serialize>(attrs: &A) -> Option<Value> {
    match serde_json::to_value(attrs) {
        Ok(Value::Object(map)) if map.is_empty() => None,
        Ok(value) => Some(value),
        Err(_) => None,
    }
}

fn branch<A: DeserializeOwned + Default>(raw: RawNode) -> Result<Branch<A>, NodeDecodeError> {
    Ok(Branch {
        attrs: decode_attrs(&raw.kind, raw.attrs)?,
        content: raw.content.unwrap_or_default(),
    })
}

impl TryFrom<RawNode> for Node {
    type Error = NodeDecodeError;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        let node = match raw.kind.as_str() {
            "text" => Node::Text(Text {
                text: raw.text.unwrap_or_default(),
                marks: raw.marks,
            }),
            "hardBreak" => Node::HardBreak(raw.marks),
            "heading" => Node::Heading(branch(raw)?),
            "paragraph" => Node::Paragraph(branch(raw)?),
            "bulletList" => Node::BulletList(branch(raw)?),
            "orderedList" => Node::OrderedList(branch(raw)?),
            "listItem" => Node::ListItem(branch(raw)?),
            "blockquote" => Node::Blockquote(branch(raw)?),
            "codeBlock" => Node::CodeBlock(branch(raw)?),
            "horizontalRule" => Node::HorizontalRule,
            "image" => Node::Image(ImageAttrs {
                marks: raw.marks,
                ..decode_attrs(&raw.kind, raw.attrs)?
            }),
            "table" => Node::Table(branch(raw)?),
            "tableRow" => Node::TableRow(branch(raw)?),
            "tableCell" => Node::TableCell(branch(raw)?),
            "tableHeader" => Node::TableHeader(branch(raw)?),
            "mention" => Node::Mention(MentionAttrs {
                marks: raw.marks,
                ..decode_attrs(&raw.kind, raw.attrs)?
            }),
            "linkMention" => Node::LinkMention(LinkMentionAttrs {
                marks: raw.marks,
                ..decode_attrs(&raw.kind, raw.attrs)?
            }),
            // Older posts used the short names.
            "twitterEmbed" | "twitter" => Node::TwitterEmbed(decode_attrs(&raw.kind, raw.attrs)?),
            "youtubeEmbed" | "youtube" => Node::YoutubeEmbed(decode_attrs(&raw.kind, raw.attrs)?),
            "gallery" => Node::Gallery(decode_attrs(&raw.kind, raw.attrs)?),
            _ => Node::Unknown(UnknownNode {
                kind: raw.kind,
                attrs: raw.attrs,
                content: raw.content,
                text: raw.text,
                marks: raw.marks,
            }),
        };
        Ok(node)
    }
}

impl From<Node> for RawNode {
    fn from(node: Node) -> Self {
        let kind = SmolStr::new(node.type_name());
        let mut raw = RawNode {
            kind,
            attrs: None,
            content: None,
            text: None,
            marks: Vec::new(),
        };
        fn children(content: Vec<Node>) -> Option<Vec<Node>> {
            (!content.is_empty()).then_some(content)
        }
        match node {
            Node::Text(t) => {
                raw.text = Some(t.text);
                raw.marks = t.marks;
            }
            Node::HardBreak(marks) => raw.marks = marks,
            Node::HorizontalRule => {}
            Node::Heading(b) => {
                raw.attrs = encode_attrs(&b.attrs);
                raw.content = children(b.content);
            }
            Node::Paragraph(b)
            | Node::BulletList(b)
            | Node::ListItem(b)
            | Node::Blockquote(b)
            | Node::Table(b)
            | Node::TableRow(b) => {
                raw.attrs = encode_attrs(&b.attrs);
                raw.content = children(b.content);
            }
            Node::OrderedList(b) => {
                raw.attrs = encode_attrs(&b.attrs);
                raw.content = children(b.content);
            }
            Node::CodeBlock(b) => {
                raw.attrs = encode_attrs(&b.attrs);
                raw.content = children(b.content);
            }
            Node::TableCell(b) | Node::TableHeader(b) => {
                raw.attrs = encode_attrs(&b.attrs);
                raw.content = children(b.content);
            }
            Node::Image(mut a) => {
                raw.marks = std::mem::take(&mut a.marks);
                raw.attrs = encode_attrs(&a);
            }
            Node::Mention(mut a) => {
                raw.marks = std::mem::take(&mut a.marks);
                raw.attrs = encode_attrs(&a);
            }
            Node::LinkMention(mut a) => {
                raw.marks = std::mem::take(&mut a.marks);
                raw.attrs = encode_attrs(&a);
            }
            Node::TwitterEmbed(a) | Node::YoutubeEmbed(a) => raw.attrs = encode_attrs(&a),
            Node::Gallery(a) => raw.attrs = encode_attrs(&a),
            Node::Unknown(u) => {
                raw.attrs = u.attrs;
                raw.content = u.content;
                raw.text = u.text;
                raw.marks = u.marks;
            }
        }
        raw
    }
}
