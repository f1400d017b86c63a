//! Person mentions and link mentions.

use folio_common::doc::{LinkMentionAttrs, MentionAttrs};
use folio_resolve::Provider;

use crate::tree::{Element, RenderNode};

struct Icon {
    path: &'static str,
    fill_rule: bool,
    view_box: u32,
}

const TWITTER_ICON: Icon = Icon {
    path: "M22.46 6c-.77.35-1.6.58-2.46.69c.88-.53 1.56-1.37 1.88-2.38c-.83.5-1.75.85-2.72 1.05C18.37 4.5 17.26 4 16 4c-2.35 0-4.27 1.92-4.27 4.29c0 .34.04.67.11.98C8.28 9.09 5.11 7.38 3 4.79c-.37.63-.58 1.37-.58 2.15c0 1.49.75 2.81 1.91 3.56c-.71 0-1.37-.2-1.95-.5v.03c0 2.08 1.48 3.82 3.44 4.21a4.2 4.2 0 0 1-1.93.07a4.28 4.28 0 0 0 4 2.98a8.52 8.52 0 0 1-5.33 1.84q-.51 0-1.02-.06C3.44 20.29 5.7 21 8.12 21C16 21 20.33 14.46 20.33 8.79c0-.19 0-.37-.01-.56c.84-.6 1.56-1.36 2.14-2.23",
    fill_rule: false,
    view_box: 24,
};

const GITHUB_ICON: Icon = Icon {
    path: "M12 2A10 10 0 0 0 2 12c0 4.42 2.87 8.17 6.84 9.5c.5.08.66-.23.66-.5v-1.69c-2.77.6-3.36-1.34-3.36-1.34c-.46-1.16-1.11-1.47-1.11-1.47c-.91-.62.07-.6.07-.6c1 .07 1.53 1.03 1.53 1.03c.87 1.52 2.34 1.07 2.91.83c.09-.65.35-1.09.63-1.34c-2.22-.25-4.55-1.11-4.55-4.92c0-1.11.38-2 1.03-2.71c-.1-.25-.45-1.29.1-2.64c0 0 .84-.27 2.75 1.02c.79-.22 1.65-.33 2.5-.33s1.71.11 2.5.33c1.91-1.29 2.75-1.02 2.75-1.02c.55 1.35.2 2.39.1 2.64c.65.71 1.03 1.6 1.03 2.71c0 3.82-2.34 4.66-4.57 4.91c.36.31.69.92.69 1.85V21c0 .27.16.59.67.5C19.14 20.16 22 16.42 22 12A10 10 0 0 0 12 2",
    fill_rule: false,
    view_box: 24,
};

const VERIFIED_ICON: Icon = Icon {
    path: "M6.267 3.455a3.066 3.066 0 001.745-.723 3.066 3.066 0 013.976 0 3.066 3.066 0 001.745.723 3.066 3.066 0 012.812 2.812c.051.643.304 1.254.723 1.745a3.066 3.066 0 010 3.976 3.066 3.066 0 00-.723 1.745 3.066 3.066 0 01-2.812 2.812 3.066 3.066 0 00-1.745.723 3.066 3.066 0 01-3.976 0 3.066 3.066 0 00-1.745-.723 3.066 3.066 0 01-2.812-2.812 3.066 3.066 0 00-.723-1.745 3.066 3.066 0 010-3.976 3.066 3.066 0 00.723-1.745 3.066 3.066 0 012.812-2.812zm7.44 5.252a1 1 0 00-1.414-1.414L9 10.586 7.707 9.293a1 1 0 00-1.414 1.414l2 2a1 1 0 001.414 0l4-4z",
    fill_rule: true,
    view_box: 20,
};

fn icon(icon: &Icon, class: &str, size: u32) -> Element {
    let mut path = Element::new("path").attr("fill", "currentColor");
    if icon.fill_rule {
        path = path.attr("fill-rule", "evenodd");
    }
    path = path.attr("d", icon.path);
    if icon.fill_rule {
        path = path.attr("clip-rule", "evenodd");
    }
    Element::new("svg")
        .attr("xmlns", "http://www.w3.org/2000/svg")
        .attr("width", size.to_string())
        .attr("height", size.to_string())
        .attr("viewBox", format!("0 0 {0} {0}", icon.view_box))
        .class(class)
        .child(path)
}

fn strip_at(s: &str) -> &str {
    s.trim_start_matches('@')
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// How a mention names its person.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionNames {
    /// Best available name without leading `@`.
    pub display_name: String,
    pub username: String,
    /// The display name differs from the handle and is shown next to it.
    pub show_display_name: bool,
}

impl MentionNames {
    pub fn of(attrs: &MentionAttrs) -> Self {
        let raw = non_empty(&attrs.display_name)
            .or(non_empty(&attrs.username))
            .or(non_empty(&attrs.label))
            .unwrap_or(&attrs.id);
        let display_name = strip_at(raw).to_string();
        let username = non_empty(&attrs.username)
            .map(strip_at)
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| display_name.clone());
        let show_display_name =
            non_empty(&attrs.display_name).is_some_and(|d| d != username);
        Self {
            display_name,
            username,
            show_display_name,
        }
    }

    /// Accessible name: `Display @handle`, or just `@handle`.
    pub fn with_at(&self, attrs: &MentionAttrs) -> String {
        match non_empty(&attrs.display_name) {
            Some(display) if self.show_display_name => format!("{display} @{}", self.username),
            _ => format!("@{}", self.username),
        }
    }
}

/// Profile URL for a mention, `#` when the provider or handle is unknown.
pub fn mention_href(attrs: &MentionAttrs) -> String {
    let username = non_empty(&attrs.username).map(strip_at);
    match (Provider::of_mention_id(&attrs.id), username) {
        (Some(Provider::Twitter), Some(user)) => format!("https://twitter.com/{user}"),
        (Some(Provider::GitHub), Some(user)) => format!("https://github.com/{user}"),
        _ => "#".to_string(),
    }
}

pub(crate) fn mention(attrs: &MentionAttrs, pos: usize) -> RenderNode {
    let provider = Provider::of_mention_id(&attrs.id);
    let platform = provider.map(Provider::name).unwrap_or("default");
    let names = MentionNames::of(attrs);

    let mut content = Element::new("span").class("mention-content");
    if let Some(provider) = provider {
        let glyph = match provider {
            Provider::Twitter => &TWITTER_ICON,
            Provider::GitHub => &GITHUB_ICON,
        };
        content = content.child(
            Element::new("span")
                .class(format!("mention-platform mention-platform-{}", provider.name()))
                .child(icon(glyph, "mention-platform-icon", 16)),
        );
    }
    content = match non_empty(&attrs.avatar) {
        Some(avatar) => content.child(
            Element::new("img")
                .class("mention-avatar")
                .attr("src", avatar)
                .attr("alt", names.with_at(attrs)),
        ),
        None => {
            let initial = names
                .display_name
                .chars()
                .next()
                .map(|c| c.to_uppercase().collect::<String>())
                .unwrap_or_else(|| "@".to_string());
            content.child(
                Element::new("span")
                    .class("mention-avatar mention-avatar-placeholder")
                    .text(initial),
            )
        }
    };

    let handle = Element::new("span")
        .class("mention-handle")
        .text(format!("@{}", names.username));
    let mut text = Element::new("span").class("mention-text");
    text = match non_empty(&attrs.display_name) {
        Some(display) if names.show_display_name => text
            .child(Element::new("span").class("mention-name").text(display))
            .child(RenderNode::Text(" ".into()))
            .child(handle),
        _ => text.child(handle),
    };
    if attrs.verified == Some(true) && provider == Some(Provider::Twitter) {
        text = text.child(icon(&VERIFIED_ICON, "mention-verified", 14));
    }
    content = content.child(text);

    Element::new("span")
        .class(format!("mention mention-{platform}"))
        .attr("data-mention-id", attrs.id.as_str())
        .attr("data-type", "mention")
        .attr("data-id", attrs.id.as_str())
        .attr(
            "data-label",
            attrs.label.clone().unwrap_or_else(|| attrs.id.clone()),
        )
        .source(pos, true)
        .child(
            Element::new("a")
                .attr("href", mention_href(attrs))
                .attr("target", "_blank")
                .attr("rel", "noopener noreferrer")
                .class("mention-link")
                .child(content),
        )
        .into()
}

/// Title shown for a link mention: custom title, page title, host name, then the URL.
pub fn link_mention_title(attrs: &LinkMentionAttrs) -> &str {
    non_empty(&attrs.custom_title)
        .or(non_empty(&attrs.title))
        .or(non_empty(&attrs.hostname))
        .unwrap_or(&attrs.url)
}

pub(crate) fn link_mention(attrs: &LinkMentionAttrs, pos: usize) -> RenderNode {
    let favicon = match non_empty(&attrs.favicon) {
        Some(src) => Element::new("img")
            .class("link-mention-favicon")
            .attr("src", src)
            .attr("alt", ""),
        None => {
            let initial = non_empty(&attrs.hostname)
                .and_then(|h| h.chars().next())
                .map(|c| c.to_uppercase().collect::<String>())
                .unwrap_or_else(|| "\u{1F310}".to_string());
            Element::new("span")
                .class("link-mention-favicon link-mention-favicon-placeholder")
                .text(initial)
        }
    };

    Element::new("span")
        .class("link-mention")
        .attr("data-type", "link-mention")
        .attr("data-url", attrs.url.as_str())
        .attr_opt("data-title", attrs.title.as_deref())
        .attr_opt("data-custom-title", attrs.custom_title.as_deref())
        .attr_opt("data-favicon", attrs.favicon.as_deref())
        .attr_opt("data-hostname", attrs.hostname.as_deref())
        .source(pos, true)
        .child(
            Element::new("a")
                .attr("href", attrs.url.as_str())
                .attr("target", "_blank")
                .attr("rel", "noopener noreferrer")
                .class("link-mention-link")
                .child(
                    Element::new("span")
                        .class("link-mention-content")
                        .child(favicon)
                        .child(
                            Element::new("span")
                                .class("link-mention-title")
                                .text(link_mention_title(attrs)),
                        ),
                ),
        )
        .into()
}
