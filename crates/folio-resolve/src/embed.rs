//! Classifying pasted text into embeds, link mentions or plain text.
//!
//! Matchers run in a fixed order and the first claim wins:
//!
//! 1. video URLs become a `youtubeEmbed`
//! 2. social post URLs (`/status/<id>`) become a `twitterEmbed`
//! 3. any other http(s) URL goes through the link-mention flow
//!
//! Later matchers never see URLs claimed by earlier ones.

use std::sync::LazyLock;

use folio_common::doc::{Document, Node};
use regex::Regex;
use smol_str::SmolStr;
use url::Url;

static VIDEO_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(www\.)?(youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/)")
        .expect("valid video url regex")
});

static VIDEO_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/)([a-zA-Z0-9_-]{11})")
        .expect("valid video id regex")
});

static BARE_VIDEO_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]{11}$").expect("valid bare video id regex"));

static STATUS_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/status/(\d+)").expect("valid status id regex"));

static LOOKS_LIKE_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(https?://)?([\da-z.-]+)\.([a-z.]{2,6})([/\w .-]*)*/?$")
        .expect("valid url shape regex")
});

/// The two kinds of external embed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EmbedKind {
    Video,
    SocialPost,
}

impl EmbedKind {
    pub fn name(self) -> &'static str {
        match self {
            EmbedKind::Video => "video",
            EmbedKind::SocialPost => "social",
        }
    }
}

/// An embed reference: kind plus external id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EmbedKey {
    pub kind: EmbedKind,
    pub id: SmolStr,
}

impl EmbedKey {
    pub fn new(kind: EmbedKind, id: impl Into<SmolStr>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    /// The key an embed node refers to, if its URL yields an id.
    pub fn of_node(node: &Node) -> Option<Self> {
        match node {
            Node::YoutubeEmbed(a) => extract_video_id(&a.url).map(|id| Self::new(EmbedKind::Video, id)),
            Node::TwitterEmbed(a) => {
                extract_status_id(&a.url).map(|id| Self::new(EmbedKind::SocialPost, id))
            }
            _ => None,
        }
    }
}

/// What a paste should turn into.
#[derive(Debug, Clone, PartialEq)]
pub enum PasteAction {
    Embed { kind: EmbedKind, url: String, id: SmolStr },
    /// Offer the link-mention popover for this URL.
    LinkMention { url: Url },
    /// Let the editor insert the text as typed.
    PlainText,
}

impl PasteAction {
    /// The node to insert for an embed paste.
    pub fn embed_node(&self) -> Option<Node> {
        match self {
            PasteAction::Embed {
                kind: EmbedKind::Video,
                url,
                ..
            } => Some(Node::youtube_embed(url.clone())),
            PasteAction::Embed {
                kind: EmbedKind::SocialPost,
                url,
                ..
            } => Some(Node::twitter_embed(url.clone())),
            _ => None,
        }
    }
}

/// Video id from a watch, short-link or embed URL, or a bare 11-character id.
pub fn extract_video_id(url: &str) -> Option<SmolStr> {
    if let Some(caps) = VIDEO_ID_RE.captures(url) {
        return Some(SmolStr::new(&caps[1]));
    }
    BARE_VIDEO_ID_RE
        .is_match(url)
        .then(|| SmolStr::new(url))
}

/// Numeric post id from a `/status/<id>` URL.
pub fn extract_status_id(url: &str) -> Option<SmolStr> {
    STATUS_ID_RE
        .captures(url)
        .map(|caps| SmolStr::new(&caps[1]))
}

fn is_social_host(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    let host = host
        .strip_prefix("www.")
        .or_else(|| host.strip_prefix("mobile."))
        .unwrap_or(&host);
    host == "twitter.com" || host == "x.com"
}

fn is_video_url(url: &str) -> bool {
    VIDEO_URL_RE.is_match(url)
}

/// Social post URLs: anything on the known social domains with `/status/` in the path, and any
/// other http(s) URL carrying `/status/<digits>`.
fn is_social_post_url(url: &Url) -> bool {
    let path = url.path();
    if is_social_host(url) {
        path.contains("/status/")
    } else {
        STATUS_ID_RE.is_match(path)
    }
}

/// Parse pasted text as an http(s) URL, adding `https://` to bare host-looking text.
pub fn normalize_pasted_url(text: &str) -> Option<Url> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    match Url::parse(text) {
        Ok(url) => matches!(url.scheme(), "http" | "https").then_some(url),
        Err(_) if LOOKS_LIKE_URL_RE.is_match(text) => {
            let with_scheme = if text.starts_with("http") {
                text.to_string()
            } else {
                format!("https://{text}")
            };
            Url::parse(&with_scheme).ok()
        }
        Err(_) => None,
    }
}

/// Decide what pasting `text` should do.
pub fn classify_paste(text: &str) -> PasteAction {
    let Some(url) = normalize_pasted_url(text) else {
        return PasteAction::PlainText;
    };
    let href = url.as_str();

    if is_video_url(href) {
        // A video URL without a usable id is still claimed here; it renders as an invalid-URL
        // placeholder instead of falling through to the link flow.
        let id = extract_video_id(href).unwrap_or_default();
        return PasteAction::Embed {
            kind: EmbedKind::Video,
            url: href.to_string(),
            id,
        };
    }

    if is_social_post_url(&url) {
        let id = extract_status_id(url.path()).unwrap_or_default();
        return PasteAction::Embed {
            kind: EmbedKind::SocialPost,
            url: url.to_string(),
            id,
        };
    }

    // Other pages on the social domains are not link-mention candidates.
    if is_social_host(&url) {
        return PasteAction::PlainText;
    }

    PasteAction::LinkMention { url }
}

/// Every embed reference in `doc`, deduplicated, in document order.
pub fn embed_keys(doc: &Document) -> Vec<EmbedKey> {
    let mut keys: Vec<EmbedKey> = Vec::new();
    doc.walk(|node| {
        if let Some(key) = EmbedKey::of_node(node) {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    });
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_ids_from_every_url_shape() {
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://youtube.com/embed/dQw4w9WgXcQ?start=3",
            "dQw4w9WgXcQ",
        ] {
            assert_eq!(extract_video_id(url).as_deref(), Some("dQw4w9WgXcQ"), "{url}");
        }
        assert_eq!(extract_video_id("https://youtu.be/short"), None);
    }

    #[test]
    fn video_beats_link_mention() {
        let action = classify_paste("https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert!(matches!(
            action,
            PasteAction::Embed {
                kind: EmbedKind::Video,
                ..
            }
        ));
        assert!(matches!(action.embed_node(), Some(Node::YoutubeEmbed(_))));
    }

    #[test]
    fn any_status_url_is_a_social_post() {
        let action = classify_paste("https://example.com/status/12345");
        assert_eq!(
            action,
            PasteAction::Embed {
                kind: EmbedKind::SocialPost,
                url: "https://example.com/status/12345".into(),
                id: "12345".into(),
            }
        );
    }

    #[test]
    fn social_domains() {
        let action = classify_paste("https://x.com/jack/status/20?s=46");
        assert!(matches!(
            action,
            PasteAction::Embed { kind: EmbedKind::SocialPost, ref id, .. } if id == "20"
        ));
        assert_eq!(classify_paste("https://twitter.com/jack"), PasteAction::PlainText);
    }

    #[test]
    fn other_urls_become_link_mentions() {
        match classify_paste("  example.com/blog/post ") {
            PasteAction::LinkMention { url } => {
                assert_eq!(url.as_str(), "https://example.com/blog/post");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(classify_paste("just some words"), PasteAction::PlainText);
        assert_eq!(classify_paste("ftp://example.com/file"), PasteAction::PlainText);
        assert_eq!(classify_paste(""), PasteAction::PlainText);
    }

    #[test]
    fn embed_keys_are_deduplicated() {
        let doc = Document::new(vec![
            Node::heading(1, vec![]),
            Node::twitter_embed("https://x.com/a/status/1"),
            Node::youtube_embed("https://youtu.be/dQw4w9WgXcQ"),
            Node::blockquote(vec![Node::twitter_embed("https://twitter.com/b/status/1")]),
            Node::twitter_embed("https://x.com/a/status/nope"),
        ]);
        assert_eq!(
            embed_keys(&doc),
            vec![
                EmbedKey::new(EmbedKind::SocialPost, "1"),
                EmbedKey::new(EmbedKind::Video, "dQw4w9WgXcQ"),
            ]
        );
    }
}
