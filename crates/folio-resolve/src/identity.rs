//! Identity providers behind `@tw:` and `@gh:` mentions.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use folio_common::cache::HandleCache;
use folio_common::doc::MentionAttrs;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ResolveError;

const USER_AGENT: &str = concat!("folio/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Provider {
    Twitter,
    GitHub,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Twitter, Provider::GitHub];

    /// Short prefix used in mention ids, without the colon.
    pub fn prefix(self) -> &'static str {
        match self {
            Provider::Twitter => "tw",
            Provider::GitHub => "gh",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.prefix().eq_ignore_ascii_case(prefix))
    }

    /// Provider a mention id belongs to, from its `tw:` / `gh:` prefix.
    pub fn of_mention_id(id: &str) -> Option<Self> {
        let (prefix, _) = id.split_once(':')?;
        Self::ALL.into_iter().find(|p| p.prefix() == prefix)
    }

    pub fn name(self) -> &'static str {
        match self {
            Provider::Twitter => "twitter",
            Provider::GitHub => "github",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A directory entry for a person on one provider.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
}

impl Identity {
    pub fn new(provider: Provider, username: &str) -> Self {
        let id = format!("{}:{username}", provider.prefix());
        Self {
            label: format!("@{id}"),
            id,
            username: Some(username.to_string()),
            ..Default::default()
        }
    }

    /// What a failed lookup offers instead: the typed handle, as-is.
    pub fn fallback(provider: Provider, handle: &str) -> Self {
        Self::new(provider, handle)
    }

    pub fn to_mention_attrs(&self) -> MentionAttrs {
        MentionAttrs {
            id: self.id.clone(),
            label: Some(self.label.clone()),
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            avatar: self.avatar.clone(),
            verified: self.verified,
            ..Default::default()
        }
    }
}

/// Exact-handle lookup on one identity directory.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn provider(&self) -> Provider;

    /// Zero or one identity whose handle is exactly `handle`.
    async fn search_by_exact_handle(&self, handle: &str) -> Result<Option<Identity>, ResolveError>;
}

/// Trim whitespace and one leading `@`.
pub fn clean_handle(handle: &str) -> &str {
    let handle = handle.trim();
    handle.strip_prefix('@').unwrap_or(handle)
}

fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, ResolveError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ResolveError::InvalidUrl {
            url: base.to_string(),
            message: "cannot be a base URL".into(),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn default_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_default()
}

/// GitHub users through the REST API (`GET /users/{login}`).
#[derive(Clone)]
pub struct GitHubProvider {
    client: reqwest::Client,
    api: Url,
    token: Option<String>,
    cache: HandleCache<Option<Identity>>,
}

#[derive(Deserialize)]
struct GitHubUser {
    login: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
}

impl GitHubProvider {
    pub fn new(api: Url, token: Option<String>) -> Self {
        Self::with_client(default_client(), api, token)
    }

    pub fn with_client(client: reqwest::Client, api: Url, token: Option<String>) -> Self {
        Self {
            client,
            api,
            token,
            cache: HandleCache::new(),
        }
    }
}

#[async_trait]
impl IdentityProvider for GitHubProvider {
    fn provider(&self) -> Provider {
        Provider::GitHub
    }

    #[tracing::instrument(skip(self), fields(provider = "github"))]
    async fn search_by_exact_handle(&self, handle: &str) -> Result<Option<Identity>, ResolveError> {
        let handle = clean_handle(handle);
        if handle.is_empty() {
            return Ok(None);
        }
        if let Some(hit) = self.cache.get(handle) {
            return Ok(hit);
        }

        let url = endpoint(&self.api, &["users", handle])?;
        let mut request = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ResolveError::http(url.as_str(), e))?;

        let found = match response.status() {
            reqwest::StatusCode::NOT_FOUND => None,
            status if status.is_success() => {
                let user: GitHubUser = response.json().await.map_err(|e| ResolveError::Decode {
                    message: e.to_string(),
                })?;
                let mut identity = Identity::new(Provider::GitHub, &user.login);
                identity.display_name = Some(user.name.filter(|n| !n.is_empty()).unwrap_or(user.login));
                identity.avatar = user.avatar_url.filter(|a| !a.is_empty());
                identity.verified = Some(false);
                Some(identity)
            }
            status => {
                return Err(ResolveError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }
        };
        self.cache.insert(handle, found.clone());
        Ok(found)
    }
}

/// Twitter users through a lookup service answering `GET {base}/users/{handle}`.
///
/// The response carries `userName`, `fullName`, `isVerified` and `profileImage`; a 404 or a
/// `null` body means no such user.
#[derive(Clone)]
pub struct TwitterProvider {
    client: reqwest::Client,
    base: Option<Url>,
    cache: HandleCache<Option<Identity>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TwitterUser {
    user_name: String,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    is_verified: Option<bool>,
    #[serde(default)]
    profile_image: Option<String>,
}

impl TwitterProvider {
    /// `base` may be absent, in which case every lookup fails and callers fall back.
    pub fn new(base: Option<Url>) -> Self {
        Self::with_client(default_client(), base)
    }

    pub fn with_client(client: reqwest::Client, base: Option<Url>) -> Self {
        Self {
            client,
            base,
            cache: HandleCache::new(),
        }
    }
}

#[async_trait]
impl IdentityProvider for TwitterProvider {
    fn provider(&self) -> Provider {
        Provider::Twitter
    }

    #[tracing::instrument(skip(self), fields(provider = "twitter"))]
    async fn search_by_exact_handle(&self, handle: &str) -> Result<Option<Identity>, ResolveError> {
        let handle = clean_handle(handle);
        if handle.is_empty() {
            return Ok(None);
        }
        let Some(base) = &self.base else {
            return Err(ResolveError::Unconfigured {
                provider: "twitter".into(),
            });
        };
        if let Some(hit) = self.cache.get(handle) {
            return Ok(hit);
        }

        let url = endpoint(base, &["users", handle])?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ResolveError::http(url.as_str(), e))?;

        let found = match response.status() {
            reqwest::StatusCode::NOT_FOUND => None,
            status if status.is_success() => {
                let user: Option<TwitterUser> =
                    response.json().await.map_err(|e| ResolveError::Decode {
                        message: e.to_string(),
                    })?;
                user.map(|user| {
                    let mut identity = Identity::new(Provider::Twitter, &user.user_name);
                    identity.display_name =
                        Some(user.full_name.filter(|n| !n.is_empty()).unwrap_or(user.user_name));
                    identity.verified = Some(user.is_verified.unwrap_or(false));
                    identity.avatar = user.profile_image.filter(|a| !a.is_empty());
                    identity
                })
            }
            status => {
                return Err(ResolveError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }
        };
        self.cache.insert(handle, found.clone());
        Ok(found)
    }
}
