//! Embed content: the data an embed node shows once its external id is known.
//!
//! Video embeds need no lookup; their player URL is derived from the id. Social posts are fetched
//! from the syndication endpoint and kept in an on-disk cache so published pages keep rendering
//! when the upstream post cannot be reached.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smol_str::SmolStr;
use url::Url;

use crate::embed::{EmbedKey, EmbedKind};
use crate::error::ResolveError;

pub const DEFAULT_SYNDICATION_URL: &str = "https://cdn.syndication.twimg.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoPayload {
    pub id: SmolStr,
    pub embed_url: String,
}

impl VideoPayload {
    pub fn new(id: impl Into<SmolStr>) -> Self {
        let id = id.into();
        Self {
            embed_url: format!("https://www.youtube.com/embed/{id}"),
            id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SocialUser {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub screen_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image_url_https: Option<String>,
    #[serde(default)]
    pub is_blue_verified: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A social post as the syndication endpoint returns it.
///
/// Fields the renderer does not use are kept in `extra` so cached copies stay complete.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SocialPost {
    #[serde(default)]
    pub id_str: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub user: SocialUser,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SocialPost {
    /// Link to the post on the social site.
    pub fn permalink(&self) -> String {
        format!("https://x.com/{}/status/{}", self.user.screen_name, self.id_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EmbedPayload {
    Video(VideoPayload),
    SocialPost(SocialPost),
}

/// Looks up what an embed should show. `Ok(None)` means the content does not exist (deleted,
/// private or never existed).
#[async_trait]
pub trait EmbedFetcher: Send + Sync {
    async fn fetch(&self, key: &EmbedKey) -> Result<Option<EmbedPayload>, ResolveError>;
}

#[async_trait]
impl<T: EmbedFetcher + ?Sized> EmbedFetcher for std::sync::Arc<T> {
    async fn fetch(&self, key: &EmbedKey) -> Result<Option<EmbedPayload>, ResolveError> {
        (**self).fetch(key).await
    }
}

fn is_numeric_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}

/// Decode a syndication response body. Tombstones and empty bodies are "not found".
pub fn decode_social_post(body: &str) -> Result<Option<SocialPost>, ResolveError> {
    let value: Value = serde_json::from_str(body).map_err(|e| ResolveError::Decode {
        message: e.to_string(),
    })?;
    match &value {
        Value::Null => return Ok(None),
        Value::Object(map) if map.is_empty() => return Ok(None),
        Value::Object(map) if map.get("__typename").and_then(Value::as_str) == Some("TweetTombstone") => {
            return Ok(None);
        }
        _ => {}
    }
    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| ResolveError::Decode {
            message: e.to_string(),
        })
}

/// Videos from their id, social posts from the syndication endpoint.
#[derive(Debug, Clone)]
pub struct HttpEmbedFetcher {
    client: reqwest::Client,
    syndication: Url,
}

impl HttpEmbedFetcher {
    pub fn new(syndication: Url) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("folio/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self::with_client(client, syndication)
    }

    pub fn with_client(client: reqwest::Client, syndication: Url) -> Self {
        Self {
            client,
            syndication,
        }
    }

    fn post_url(&self, id: &str) -> Result<Url, ResolveError> {
        let mut url = self
            .syndication
            .join("tweet-result")
            .map_err(|e| ResolveError::InvalidUrl {
                url: self.syndication.to_string(),
                message: e.to_string(),
            })?;
        url.query_pairs_mut().append_pair("id", id).append_pair("lang", "en");
        Ok(url)
    }

    async fn fetch_social(&self, id: &str) -> Result<Option<SocialPost>, ResolveError> {
        if !is_numeric_id(id) {
            return Ok(None);
        }
        let url = self.post_url(id)?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ResolveError::http(url.as_str(), e))?;
        match response.status() {
            reqwest::StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body = response
                    .text()
                    .await
                    .map_err(|e| ResolveError::http(url.as_str(), e))?;
                if body.trim().is_empty() {
                    return Ok(None);
                }
                decode_social_post(&body)
            }
            status => Err(ResolveError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }),
        }
    }
}

impl Default for HttpEmbedFetcher {
    fn default() -> Self {
        let syndication = Url::parse(DEFAULT_SYNDICATION_URL).expect("default syndication URL is valid");
        Self::new(syndication)
    }
}

#[async_trait]
impl EmbedFetcher for HttpEmbedFetcher {
    #[tracing::instrument(skip(self), fields(kind = key.kind.name(), id = %key.id))]
    async fn fetch(&self, key: &EmbedKey) -> Result<Option<EmbedPayload>, ResolveError> {
        match key.kind {
            EmbedKind::Video => Ok(Some(EmbedPayload::Video(VideoPayload::new(key.id.clone())))),
            EmbedKind::SocialPost => Ok(self.fetch_social(&key.id).await?.map(EmbedPayload::SocialPost)),
        }
    }
}

/// Wraps a fetcher with a directory of cached social posts, one `<id>.json` per post.
///
/// Every fetch asks upstream first and refreshes the cached copy. Upstream "not found" removes
/// the cached copy, and an upstream failure falls back to whatever is cached.
#[derive(Debug, Clone)]
pub struct FileCachedFetcher<F> {
    dir: PathBuf,
    inner: F,
}

impl<F: EmbedFetcher> FileCachedFetcher<F> {
    pub fn new(dir: impl Into<PathBuf>, inner: F) -> Self {
        Self {
            dir: dir.into(),
            inner,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// The cached post, if present and readable.
    pub async fn cached(&self, id: &str) -> Result<Option<SocialPost>, ResolveError> {
        let path = self.path_for(id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice(&bytes) {
            Ok(post) => Ok(Some(post)),
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "ignoring unreadable cached post");
                Ok(None)
            }
        }
    }

    async fn store(&self, id: &str, post: &SocialPost) -> Result<(), ResolveError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_vec_pretty(post).map_err(|e| ResolveError::Decode {
            message: e.to_string(),
        })?;
        tokio::fs::write(self.path_for(id), json).await?;
        Ok(())
    }

    async fn evict(&self, id: &str) -> Result<(), ResolveError> {
        match tokio::fs::remove_file(self.path_for(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl<F: EmbedFetcher> EmbedFetcher for FileCachedFetcher<F> {
    async fn fetch(&self, key: &EmbedKey) -> Result<Option<EmbedPayload>, ResolveError> {
        if key.kind != EmbedKind::SocialPost || !is_numeric_id(&key.id) {
            return self.inner.fetch(key).await;
        }
        match self.inner.fetch(key).await {
            Ok(Some(EmbedPayload::SocialPost(post))) => {
                if let Err(error) = self.store(&key.id, &post).await {
                    tracing::warn!(id = %key.id, %error, "could not cache fetched post");
                }
                Ok(Some(EmbedPayload::SocialPost(post)))
            }
            Ok(Some(other)) => Ok(Some(other)),
            Ok(None) => {
                self.evict(&key.id).await?;
                Ok(None)
            }
            Err(error) => {
                tracing::warn!(id = %key.id, %error, "post fetch failed, trying cache");
                match self.cached(&key.id).await? {
                    Some(post) => {
                        tracing::debug!(id = %key.id, "serving cached post");
                        Ok(Some(EmbedPayload::SocialPost(post)))
                    }
                    None => Err(error),
                }
            }
        }
    }
}
