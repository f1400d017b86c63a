//! Page metadata for link mentions.
//!
//! A pasted URL that is not an embed gets a one-shot lookup of its page title and favicon.
//! Lookups are bounded in time, and any failure is replaced by metadata synthesized from the
//! URL itself, so the author is always offered something to insert.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use folio_common::doc::{LinkMentionAttrs, Mark, Node};
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ResolveError;

/// Browser-like agent; many sites refuse unknown clients.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Most of a page that is read looking for metadata. Reading also stops at `</head>`.
pub const MAX_HEAD_BYTES: usize = 256 * 1024;

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").expect("valid title regex"));
static META_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("valid meta regex"));
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<link\b[^>]*>").expect("valid link regex"));
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+))"#)
        .expect("valid attribute regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LinkMetadata {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    pub hostname: String,
}

/// Favicon service URL for `host`.
pub fn favicon_service_url(host: &str) -> String {
    format!("https://www.google.com/s2/favicons?domain={host}&sz=64")
}

impl LinkMetadata {
    /// Metadata derived from the URL alone.
    ///
    /// Title and hostname are the host name and the favicon comes from the favicon service. A
    /// URL without a host uses the raw URL for both and has no favicon.
    pub fn fallback(url: &Url) -> Self {
        match url.host_str().filter(|h| !h.is_empty()) {
            Some(host) => Self {
                url: url.to_string(),
                title: Some(host.to_string()),
                favicon: Some(favicon_service_url(host)),
                hostname: host.to_string(),
            },
            None => Self {
                url: url.to_string(),
                title: Some(url.to_string()),
                favicon: None,
                hostname: url.to_string(),
            },
        }
    }
}

#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<LinkMetadata, ResolveError>;
}

/// Fetch metadata with a time bound, falling back to [`LinkMetadata::fallback`] on any failure.
pub async fn resolve_link(fetcher: &dyn MetadataFetcher, url: &Url, timeout: Duration) -> LinkMetadata {
    match tokio::time::timeout(timeout, fetcher.fetch(url)).await {
        Ok(Ok(metadata)) => metadata,
        Ok(Err(error)) => {
            tracing::warn!(%url, %error, "link metadata lookup failed, using fallback");
            LinkMetadata::fallback(url)
        }
        Err(_) => {
            tracing::warn!(%url, ?timeout, "link metadata lookup timed out, using fallback");
            LinkMetadata::fallback(url)
        }
    }
}

/// Title and favicon candidates found in a page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageHints {
    pub title: Option<String>,
    /// From `<link rel="icon">`, `rel="shortcut icon"` or `rel="apple-touch-icon"`, resolved
    /// against the page origin.
    pub favicon: Option<String>,
}

fn attributes(tag: &str) -> Vec<(String, String)> {
    ATTR_RE
        .captures_iter(tag)
        .map(|caps| {
            let name = caps[1].to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str())
                .unwrap_or_default();
            (name, html_escape::decode_html_entities(value).into_owned())
        })
        .collect()
}

fn attr<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_str())
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn resolve_against_origin(href: &str, page: &Url) -> String {
    Url::parse(&page.origin().ascii_serialization())
        .and_then(|origin| origin.join(href))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Scan page markup for a title and an icon link.
pub fn parse_page_hints(html: &str, page: &Url) -> PageHints {
    let metas: Vec<_> = META_RE.find_iter(html).map(|m| attributes(m.as_str())).collect();
    let meta_content = |key: &str, value: &str| {
        metas
            .iter()
            .find(|a| attr(a, key).is_some_and(|v| v.eq_ignore_ascii_case(value)))
            .and_then(|a| attr(a, "content"))
            .and_then(non_empty)
    };

    let title = TITLE_RE
        .captures(html)
        .and_then(|caps| non_empty(&html_escape::decode_html_entities(&caps[1])))
        .or_else(|| meta_content("property", "og:title"))
        .or_else(|| meta_content("name", "title"));

    let links: Vec<_> = LINK_RE.find_iter(html).map(|m| attributes(m.as_str())).collect();
    let icon_with = |rels: &[&str]| {
        links
            .iter()
            .find(|a| {
                attr(a, "rel").is_some_and(|rel| rels.iter().any(|r| rel.trim().eq_ignore_ascii_case(r)))
            })
            .and_then(|a| attr(a, "href"))
            .and_then(non_empty)
            .map(|href| resolve_against_origin(&href, page))
    };
    let favicon = icon_with(&["icon", "shortcut icon"]).or_else(|| icon_with(&["apple-touch-icon"]));

    PageHints { title, favicon }
}

/// Fetches the page itself and reads its markup.
#[derive(Debug, Clone)]
pub struct HttpMetadataFetcher {
    client: reqwest::Client,
}

impl HttpMetadataFetcher {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn default_favicon(&self, page: &Url) -> Option<String> {
        let candidate = resolve_against_origin("/favicon.ico", page);
        match self.client.head(&candidate).send().await {
            Ok(response) if response.status().is_success() => Some(candidate),
            _ => None,
        }
    }
}

impl Default for HttpMetadataFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl MetadataFetcher for HttpMetadataFetcher {
    #[tracing::instrument(skip(self), fields(url = %url))]
    async fn fetch(&self, url: &Url) -> Result<LinkMetadata, ResolveError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ResolveError::http(url.as_str(), e))?;
        if !response.status().is_success() {
            return Err(ResolveError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        let html = read_head(response)
            .await
            .map_err(|e| ResolveError::http(url.as_str(), e))?;

        let hints = parse_page_hints(&html, url);
        let hostname = url.host_str().unwrap_or_default().to_string();
        let favicon = match hints.favicon {
            Some(icon) => Some(icon),
            None => self.default_favicon(url).await,
        }
        .or_else(|| (!hostname.is_empty()).then(|| favicon_service_url(&hostname)));

        Ok(LinkMetadata {
            url: url.to_string(),
            title: hints.title.or_else(|| Some(hostname.clone())),
            favicon,
            hostname,
        })
    }
}

/// Read the body up to the end of `<head>`, never more than [`MAX_HEAD_BYTES`].
async fn read_head(mut response: reqwest::Response) -> Result<String, reqwest::Error> {
    let mut buf: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        // Back up far enough to catch a closing tag split across chunks.
        let from = buf.len().saturating_sub(HEAD_END.len() - 1);
        buf.extend_from_slice(&chunk);
        if buf.len() >= MAX_HEAD_BYTES || contains_head_end(&buf[from..]) {
            break;
        }
    }
    buf.truncate(MAX_HEAD_BYTES);
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

const HEAD_END: &[u8] = b"</head>";

fn contains_head_end(bytes: &[u8]) -> bool {
    bytes
        .windows(HEAD_END.len())
        .any(|w| w.eq_ignore_ascii_case(HEAD_END))
}

/// The choice offered after a bare URL is pasted.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkPasteSuggestion {
    pub url: Url,
    pub metadata: LinkMetadata,
}

impl LinkPasteSuggestion {
    pub async fn resolve(fetcher: &dyn MetadataFetcher, url: Url, timeout: Duration) -> Self {
        let metadata = resolve_link(fetcher, &url, timeout).await;
        Self { url, metadata }
    }

    /// "Insert as rich mention".
    pub fn to_link_mention(&self) -> Node {
        Node::link_mention(LinkMentionAttrs {
            url: self.url.to_string(),
            title: self.metadata.title.clone(),
            favicon: self.metadata.favicon.clone(),
            hostname: Some(self.metadata.hostname.clone()),
            ..Default::default()
        })
    }

    /// "Insert as plain link": the URL as text carrying a link mark.
    pub fn to_plain_link(&self) -> Node {
        let href = self.url.to_string();
        Node::marked_text(href.clone(), vec![Mark::link(href)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("https://example.com/blog/post").unwrap()
    }

    #[test]
    fn fallback_uses_hostname_and_favicon_service() {
        let metadata = LinkMetadata::fallback(&page());
        assert_eq!(metadata.title.as_deref(), Some("example.com"));
        assert_eq!(metadata.hostname, "example.com");
        assert_eq!(
            metadata.favicon.as_deref(),
            Some("https://www.google.com/s2/favicons?domain=example.com&sz=64")
        );
    }

    #[test]
    fn head_end_is_found_in_any_case() {
        assert!(contains_head_end(b"<title>x</title></HEAD><body>"));
        assert!(!contains_head_end(b"<head><title>x</title>"));
    }

    #[test]
    fn fallback_without_host_uses_raw_url() {
        let url = Url::parse("data:text/plain,hello").unwrap();
        let metadata = LinkMetadata::fallback(&url);
        assert_eq!(metadata.title.as_deref(), Some("data:text/plain,hello"));
        assert_eq!(metadata.hostname, "data:text/plain,hello");
        assert_eq!(metadata.favicon, None);
    }

    #[test]
    fn title_prefers_title_tag_then_open_graph() {
        let html = r#"<html><head>
            <meta property="og:title" content="OG Title">
            <title> Page &amp; Title </title>
            <link rel="stylesheet" href="/style.css">
            <link rel="icon" href="/static/icon.png">
        </head></html>"#;
        let hints = parse_page_hints(html, &page());
        assert_eq!(hints.title.as_deref(), Some("Page & Title"));
        assert_eq!(hints.favicon.as_deref(), Some("https://example.com/static/icon.png"));

        let html = r#"<meta content='Only OG' property='og:title'><link rel="apple-touch-icon" href="https://cdn.example.com/t.png">"#;
        let hints = parse_page_hints(html, &page());
        assert_eq!(hints.title.as_deref(), Some("Only OG"));
        assert_eq!(hints.favicon.as_deref(), Some("https://cdn.example.com/t.png"));

        let html = r#"<meta name="title" content="Meta Title">"#;
        assert_eq!(parse_page_hints(html, &page()).title.as_deref(), Some("Meta Title"));
        assert_eq!(parse_page_hints("", &page()), PageHints::default());
    }

    #[test]
    fn suggestion_nodes() {
        let suggestion = LinkPasteSuggestion {
            url: page(),
            metadata: LinkMetadata::fallback(&page()),
        };
        match suggestion.to_link_mention() {
            Node::LinkMention(attrs) => {
                assert_eq!(attrs.url, "https://example.com/blog/post");
                assert_eq!(attrs.hostname.as_deref(), Some("example.com"));
            }
            other => panic!("unexpected {other:?}"),
        }
        match suggestion.to_plain_link() {
            Node::Text(text) => {
                assert_eq!(text.text, "https://example.com/blog/post");
                assert_eq!(text.marks, vec![Mark::link("https://example.com/blog/post")]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    struct Failing;

    #[async_trait]
    impl MetadataFetcher for Failing {
        async fn fetch(&self, _url: &Url) -> Result<LinkMetadata, ResolveError> {
            Err(ResolveError::Timeout)
        }
    }

    struct Hanging;

    #[async_trait]
    impl MetadataFetcher for Hanging {
        async fn fetch(&self, _url: &Url) -> Result<LinkMetadata, ResolveError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn failures_resolve_to_fallback() {
        let metadata = resolve_link(&Failing, &page(), DEFAULT_TIMEOUT).await;
        assert_eq!(metadata, LinkMetadata::fallback(&page()));
    }

    #[tokio::test(start_paused = true)]
    async fn timeouts_resolve_to_fallback() {
        let metadata = resolve_link(&Hanging, &page(), DEFAULT_TIMEOUT).await;
        assert_eq!(metadata, LinkMetadata::fallback(&page()));
    }
}
