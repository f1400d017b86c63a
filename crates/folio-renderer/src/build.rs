//! The canonical document to render-tree builder.
//!
//! Both output surfaces go through [`build`]; backends only decide how the resulting tree is
//! written out. Every element produced for a document node records the node's flat position, and
//! atoms are flagged so an editing surface can treat them as one unit.

use folio_common::doc::{
    Branch, CellAttrs, DisplayMode, Document, EmbedAttrs, GalleryAttrs, ImageAttrs, Mark, Node,
};
use folio_resolve::{
    EmbedKey, EmbedKind, EmbedPayload, SocialPost, VideoPayload, extract_status_id,
    extract_video_id,
};

use crate::embeds::{EmbedIndex, EmbedState};
use crate::mention;
use crate::tree::{Element, RenderNode};

/// Which surface the tree is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Surface {
    /// Published pages.
    #[default]
    Static,
    /// The editor's view of the document.
    Interactive,
}

/// Inputs shared by a whole render pass.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub surface: Surface,
    pub embeds: &'a EmbedIndex,
}

impl<'a> RenderContext<'a> {
    pub fn new(surface: Surface, embeds: &'a EmbedIndex) -> Self {
        Self { surface, embeds }
    }
}

pub const LOADING_TEXT: &str = "Loading\u{2026}";

const YOUTUBE_ALLOW: &str = "accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture; web-share";

/// Build the render tree for a whole document.
pub fn build(doc: &Document, ctx: &RenderContext<'_>) -> Vec<RenderNode> {
    let mut out = Vec::new();
    let mut pos = 0;
    for node in &doc.content {
        out.extend(build_node(node, pos, false, ctx));
        pos += node.node_size();
    }
    out
}

/// Build one node starting at flat position `pos`. `inline` is set for the children of
/// textblocks, where unknown containers become spans instead of divs.
pub fn build_node(node: &Node, pos: usize, inline: bool, ctx: &RenderContext<'_>) -> Option<RenderNode> {
    let element = match node {
        Node::Text(text) => return Some(with_marks(RenderNode::Text(text.text.clone()), &text.marks)),
        Node::HardBreak(_) => Element::new("br"),
        Node::Heading(b) => {
            let level = b.attrs.level.clamp(1, 6);
            children_of(Element::new(format!("h{level}")), b, pos, true, ctx)
        }
        Node::Paragraph(b) => children_of(Element::new("p"), b, pos, true, ctx),
        Node::BulletList(b) => children_of(Element::new("ul"), b, pos, false, ctx),
        Node::OrderedList(b) => {
            let ol = Element::new("ol").attr_opt("start", b.attrs.start.map(|s| s.to_string()));
            children_of(ol, b, pos, false, ctx)
        }
        Node::ListItem(b) => children_of(Element::new("li"), b, pos, false, ctx),
        Node::Blockquote(b) => children_of(Element::new("blockquote"), b, pos, false, ctx),
        Node::CodeBlock(b) => {
            let text: String = b.content.iter().map(Node::text_content).collect();
            let code = Element::new("code")
                .attr_opt(
                    "class",
                    b.attrs
                        .language
                        .as_deref()
                        .filter(|l| !l.is_empty())
                        .map(|l| format!("language-{l}")),
                )
                .text(text);
            Element::new("pre").child(code)
        }
        Node::HorizontalRule => Element::new("hr"),
        Node::Image(attrs) => image(attrs),
        Node::Table(b) => {
            let tbody = Element::new("tbody").children(block_children(&b.content, pos + 1, ctx));
            Element::new("table").child(tbody)
        }
        Node::TableRow(b) => children_of(Element::new("tr"), b, pos, false, ctx),
        Node::TableCell(b) => cell("td", b, pos, ctx),
        Node::TableHeader(b) => cell("th", b, pos, ctx),
        Node::Mention(attrs) => {
            return Some(with_marks(mention::mention(attrs, pos), &attrs.marks));
        }
        Node::LinkMention(attrs) => {
            return Some(with_marks(mention::link_mention(attrs, pos), &attrs.marks));
        }
        Node::TwitterEmbed(attrs) => social_embed(attrs, ctx),
        Node::YoutubeEmbed(attrs) => video_embed(attrs, ctx),
        Node::Gallery(attrs) => gallery(attrs, ctx)?,
        Node::Unknown(unknown) => {
            let content = unknown.content.as_ref()?;
            let tag = if inline || unknown.text.is_some() { "span" } else { "div" };
            let mut element = Element::new(tag);
            let mut child_pos = pos + 1;
            for child in content {
                element.children.extend(build_node(child, child_pos, inline, ctx));
                child_pos += child.node_size();
            }
            element
        }
    };
    Some(with_marks(
        element.source(pos, node.is_atom()).into(),
        node.marks(),
    ))
}

fn block_children(content: &[Node], start: usize, ctx: &RenderContext<'_>) -> Vec<RenderNode> {
    let mut out = Vec::with_capacity(content.len());
    let mut pos = start;
    for child in content {
        out.extend(build_node(child, pos, false, ctx));
        pos += child.node_size();
    }
    out
}

fn children_of<A>(
    element: Element,
    branch: &Branch<A>,
    pos: usize,
    inline: bool,
    ctx: &RenderContext<'_>,
) -> Element {
    let mut element = element;
    let mut child_pos = pos + 1;
    for child in &branch.content {
        element.children.extend(build_node(child, child_pos, inline, ctx));
        child_pos += child.node_size();
    }
    element
}

/// Wrap `inner` in one element per mark. The first mark ends up innermost.
pub fn with_marks(inner: RenderNode, marks: &[Mark]) -> RenderNode {
    marks.iter().fold(inner, |acc, mark| {
        let wrapper = match mark {
            Mark::Bold => Element::new("strong"),
            Mark::Italic => Element::new("em"),
            Mark::Strike => Element::new("s"),
            Mark::Code => Element::new("code"),
            Mark::Underline => Element::new("u"),
            Mark::Link(link) => Element::new("a")
                .attr("href", link.href.as_str())
                .attr_opt("target", link.target.as_deref())
                .attr_opt("rel", link.rel.as_deref()),
            Mark::Highlight(_) => Element::new("mark"),
            Mark::Subscript => Element::new("sub"),
            Mark::Superscript => Element::new("sup"),
            Mark::Unknown { .. } => return acc,
        };
        wrapper.child(acc).into()
    })
}

fn image(attrs: &ImageAttrs) -> Element {
    Element::new("img")
        .attr("src", attrs.src.as_str())
        .attr("alt", attrs.alt.clone().unwrap_or_default())
        .attr_opt("title", attrs.title.as_deref())
}

fn cell(tag: &str, branch: &Branch<CellAttrs>, pos: usize, ctx: &RenderContext<'_>) -> Element {
    let element = Element::new(tag)
        .attr_opt("colspan", branch.attrs.colspan.map(|c| c.to_string()))
        .attr_opt("rowspan", branch.attrs.rowspan.map(|r| r.to_string()));
    children_of(element, branch, pos, false, ctx)
}

fn external_link(href: &str, text: &str) -> Element {
    Element::new("a")
        .attr("href", href)
        .attr("target", "_blank")
        .attr("rel", "noopener noreferrer")
        .text(text)
}

/// Placeholder for an embed whose URL yields no id.
fn invalid_embed(class: &str, message: &str, url: &str, link_text: &str) -> Element {
    let mut element = Element::new("div")
        .class(format!("{class} {class}-error"))
        .child(Element::new("p").text(message));
    if !url.is_empty() {
        element = element.child(external_link(url, link_text));
    }
    element
}

fn loading(class: &str) -> Element {
    Element::new("div")
        .class(class)
        .child(Element::new("div").class("embed-loading").text(LOADING_TEXT))
}

fn social_embed(attrs: &EmbedAttrs, ctx: &RenderContext<'_>) -> Element {
    let Some(id) = extract_status_id(&attrs.url) else {
        return invalid_embed("twitter-embed", "Invalid tweet URL", &attrs.url, "View on Twitter");
    };
    let key = EmbedKey::new(EmbedKind::SocialPost, id);
    match ctx.embeds.get(&key) {
        Some(EmbedState::Ready(EmbedPayload::SocialPost(post))) => Element::new("div")
            .class("twitter-embed")
            .child(social_post(post)),
        Some(_) => Element::new("div").class("twitter-embed").child(
            Element::new("div")
                .class("embed-not-found")
                .child(Element::new("p").text("Post not found"))
                .child(external_link(&attrs.url, "View on Twitter")),
        ),
        None => loading("twitter-embed"),
    }
}

fn social_post(post: &SocialPost) -> Element {
    let mut author = Element::new("div").class("tweet-author");
    if let Some(avatar) = post.user.profile_image_url_https.as_deref() {
        author = author.child(
            Element::new("img")
                .class("tweet-avatar")
                .attr("src", avatar)
                .attr("alt", post.user.name.as_str()),
        );
    }
    author = author
        .child(Element::new("span").class("tweet-author-name").text(post.user.name.as_str()))
        .child(
            Element::new("span")
                .class("tweet-author-handle")
                .text(format!("@{}", post.user.screen_name)),
        );

    let link_text = post.created_at.as_deref().unwrap_or("View post");
    Element::new("article")
        .class("tweet")
        .child(author)
        .child(Element::new("p").class("tweet-body").text(post.text.as_str()))
        .child(external_link(&post.permalink(), link_text).class("tweet-link"))
}

fn video_embed(attrs: &EmbedAttrs, ctx: &RenderContext<'_>) -> Element {
    let Some(id) = extract_video_id(&attrs.url) else {
        return invalid_embed("youtube-embed", "Invalid YouTube URL", &attrs.url, "View on YouTube");
    };
    let key = EmbedKey::new(EmbedKind::Video, id.clone());
    // The player URL is derived from the id, so videos render even when not prefetched.
    let payload = match ctx.embeds.get(&key) {
        Some(EmbedState::Ready(EmbedPayload::Video(video))) => video.clone(),
        Some(_) => {
            return Element::new("div").class("youtube-embed").child(
                Element::new("div")
                    .class("embed-not-found")
                    .child(Element::new("p").text("Video not found"))
                    .child(external_link(&attrs.url, "View on YouTube")),
            );
        }
        None => VideoPayload::new(id),
    };
    let iframe = Element::new("iframe")
        .attr("src", payload.embed_url)
        .attr("title", "YouTube video player")
        .attr("frameborder", "0")
        .attr("allow", YOUTUBE_ALLOW)
        .attr("allowfullscreen", "")
        .class("youtube-embed-iframe");
    Element::new("div")
        .class("youtube-embed")
        .child(Element::new("div").class("youtube-embed-container").child(iframe))
}

fn gallery_image(src: &str, index: usize) -> Element {
    Element::new("img")
        .attr("src", src)
        .attr("alt", format!("Gallery image {}", index + 1))
        .class("gallery-image")
}

fn gallery(attrs: &GalleryAttrs, ctx: &RenderContext<'_>) -> Option<Element> {
    if attrs.images.is_empty() {
        return match ctx.surface {
            Surface::Static => None,
            Surface::Interactive => Some(
                Element::new("div").class("gallery gallery-empty").child(
                    Element::new("div")
                        .class("gallery-empty-content")
                        .child(Element::new("p").text("No images in gallery")),
                ),
            ),
        };
    }

    let outer = Element::new("div").class(format!("gallery gallery-{}", attrs.display_mode.as_str()));
    let body = match attrs.display_mode {
        DisplayMode::Grid => Element::new("div")
            .class("gallery-grid")
            .attr(
                "style",
                format!("grid-template-columns: repeat({}, 1fr)", attrs.columns()),
            )
            .children(attrs.images.iter().enumerate().map(|(i, src)| {
                let span = attrs.span(i);
                Element::new("div")
                    .class("gallery-grid-item")
                    .attr(
                        "style",
                        format!("grid-column: span {}; grid-row: span {}", span.col, span.row),
                    )
                    .child(gallery_image(src, i).attr("loading", "lazy"))
                    .into()
            })),
        DisplayMode::Carousel => {
            let nav = |side: &str, label: &str, glyph: &str| {
                Element::new("button")
                    .attr("type", "button")
                    .class(format!("gallery-carousel-nav gallery-carousel-{side}"))
                    .attr("aria-label", label)
                    .text(glyph)
            };
            Element::new("div")
                .class("gallery-carousel-container")
                .child(nav("prev", "Previous image", "\u{2039}"))
                .child(
                    Element::new("div")
                        .class("gallery-carousel-image-wrapper")
                        .child(gallery_image(&attrs.images[0], 0))
                        .child(
                            Element::new("div")
                                .class("gallery-carousel-indicator")
                                .text(format!("1 / {}", attrs.images.len())),
                        ),
                )
                .child(nav("next", "Next image", "\u{203A}"))
        }
        DisplayMode::List => Element::new("div").class("gallery-list").children(
            attrs.images.iter().enumerate().map(|(i, src)| {
                Element::new("div")
                    .class("gallery-list-item")
                    .child(gallery_image(src, i).attr("loading", "lazy"))
                    .into()
            }),
        ),
    };
    Some(outer.child(body))
}
