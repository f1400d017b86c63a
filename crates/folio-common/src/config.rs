use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

/// Runtime configuration for the blog services.
#[derive(Debug, Clone)]
pub struct FolioConfig {
    /// Directory holding one `<id>.json` file per post
    pub posts_dir: PathBuf,
    /// Directory for cached social-post payloads
    pub tweet_cache_dir: PathBuf,
    pub github_api: Url,
    pub github_token: Option<String>,
    /// Endpoint answering `GET {base}/users/{handle}` for Twitter identities
    pub twitter_identity_url: Option<Url>,
    pub tweet_syndication_url: Url,
    pub mention_debounce: Duration,
    pub autosave_quiet: Duration,
    pub metadata_timeout: Duration,
}

impl FolioConfig {
    pub const DEFAULT_POSTS_DIR: &'static str = "data/posts";
    pub const DEFAULT_TWEET_CACHE_DIR: &'static str = "data/cache/tweet";
    pub const DEFAULT_GITHUB_API: &'static str = "https://api.github.com";
    pub const DEFAULT_TWEET_SYNDICATION: &'static str = "https://cdn.syndication.twimg.com";
    pub const DEFAULT_MENTION_DEBOUNCE_MS: u64 = 300;
    pub const DEFAULT_AUTOSAVE_QUIET_MS: u64 = 1000;
    pub const DEFAULT_METADATA_TIMEOUT_SECS: u64 = 10;

    /// Load configuration from environment variables.
    ///
    /// Optional env vars:
    /// - `FOLIO_POSTS_DIR`: post directory (default: data/posts)
    /// - `FOLIO_TWEET_CACHE_DIR`: social post cache (default: data/cache/tweet)
    /// - `FOLIO_GITHUB_API`: GitHub REST base URL (default: https://api.github.com)
    /// - `GITHUB_TOKEN`: token sent with GitHub lookups
    /// - `FOLIO_TWITTER_IDENTITY_URL`: Twitter identity lookup base URL (default: none)
    /// - `FOLIO_TWEET_SYNDICATION_URL`: social post content source
    /// - `FOLIO_MENTION_DEBOUNCE_MS`: mention lookup quiet window (default: 300)
    /// - `FOLIO_AUTOSAVE_QUIET_MS`: autosave quiet window (default: 1000)
    /// - `FOLIO_METADATA_TIMEOUT_SECS`: link metadata timeout (default: 10)
    pub fn from_env() -> Result<Self, ConfigError> {
        let posts_dir = std::env::var("FOLIO_POSTS_DIR")
            .unwrap_or_else(|_| Self::DEFAULT_POSTS_DIR.to_string())
            .into();
        let tweet_cache_dir = std::env::var("FOLIO_TWEET_CACHE_DIR")
            .unwrap_or_else(|_| Self::DEFAULT_TWEET_CACHE_DIR.to_string())
            .into();

        let github_api = url_var("FOLIO_GITHUB_API")?
            .map(Ok)
            .unwrap_or_else(|| parse_url(Self::DEFAULT_GITHUB_API.to_string()))?;
        let tweet_syndication_url = url_var("FOLIO_TWEET_SYNDICATION_URL")?
            .map(Ok)
            .unwrap_or_else(|| parse_url(Self::DEFAULT_TWEET_SYNDICATION.to_string()))?;
        let twitter_identity_url = url_var("FOLIO_TWITTER_IDENTITY_URL")?;

        let github_token = std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty());

        let mention_debounce = Duration::from_millis(
            number_var("FOLIO_MENTION_DEBOUNCE_MS")?.unwrap_or(Self::DEFAULT_MENTION_DEBOUNCE_MS),
        );
        let autosave_quiet = Duration::from_millis(
            number_var("FOLIO_AUTOSAVE_QUIET_MS")?.unwrap_or(Self::DEFAULT_AUTOSAVE_QUIET_MS),
        );
        let metadata_timeout = Duration::from_secs(
            number_var("FOLIO_METADATA_TIMEOUT_SECS")?
                .unwrap_or(Self::DEFAULT_METADATA_TIMEOUT_SECS),
        );

        Ok(Self {
            posts_dir,
            tweet_cache_dir,
            github_api,
            github_token,
            twitter_identity_url,
            tweet_syndication_url,
            mention_debounce,
            autosave_quiet,
            metadata_timeout,
        })
    }
}

impl Default for FolioConfig {
    fn default() -> Self {
        Self {
            posts_dir: Self::DEFAULT_POSTS_DIR.into(),
            tweet_cache_dir: Self::DEFAULT_TWEET_CACHE_DIR.into(),
            github_api: Url::parse(Self::DEFAULT_GITHUB_API).expect("static url"),
            github_token: None,
            twitter_identity_url: None,
            tweet_syndication_url: Url::parse(Self::DEFAULT_TWEET_SYNDICATION)
                .expect("static url"),
            mention_debounce: Duration::from_millis(Self::DEFAULT_MENTION_DEBOUNCE_MS),
            autosave_quiet: Duration::from_millis(Self::DEFAULT_AUTOSAVE_QUIET_MS),
            metadata_timeout: Duration::from_secs(Self::DEFAULT_METADATA_TIMEOUT_SECS),
        }
    }
}

fn parse_url(url: String) -> Result<Url, ConfigError> {
    Url::parse(&url).map_err(|e| ConfigError::UrlParse {
        url,
        message: e.to_string(),
    })
}

fn url_var(var: &'static str) -> Result<Option<Url>, ConfigError> {
    match std::env::var(var) {
        Ok(value) if !value.is_empty() => parse_url(value).map(Some),
        _ => Ok(None),
    }
}

fn number_var<T>(var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(value) if !value.is_empty() => {
            value
                .parse()
                .map(Some)
                .map_err(|e: T::Err| ConfigError::InvalidValue {
                    var,
                    message: e.to_string(),
                    value,
                })
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = FolioConfig::default();
        assert_eq!(config.mention_debounce, Duration::from_millis(300));
        assert_eq!(config.autosave_quiet, Duration::from_secs(1));
        assert_eq!(config.metadata_timeout, Duration::from_secs(10));
        assert_eq!(config.github_api.as_str(), "https://api.github.com/");
        assert_eq!(config.posts_dir, PathBuf::from("data/posts"));
    }

    #[test]
    fn bad_urls_are_reported() {
        let err = parse_url("not a url".into()).unwrap_err();
        assert!(matches!(err, ConfigError::UrlParse { .. }));
    }
}
