//! Everything the editor resolves against the outside world: mention identities, pasted-link
//! metadata and embed content.
//!
//! Resolution never fails outward. Lookups are time-bounded and every failure path ends in a
//! fallback value, with the underlying [`ResolveError`] logged.

pub mod coalesce;
pub mod content;
pub mod embed;
pub mod error;
pub mod identity;
pub mod mention;
pub mod metadata;

pub use coalesce::Coalescer;
pub use content::{
    EmbedFetcher, EmbedPayload, FileCachedFetcher, HttpEmbedFetcher, SocialPost, SocialUser,
    VideoPayload,
};
pub use embed::{
    EmbedKey, EmbedKind, PasteAction, classify_paste, embed_keys, extract_status_id,
    extract_video_id, normalize_pasted_url,
};
pub use error::ResolveError;
pub use identity::{GitHubProvider, Identity, IdentityProvider, Provider, TwitterProvider};
pub use mention::{MentionInsert, MentionSession, SuggestionItem, Suggestions, TriggerState};
pub use metadata::{
    HttpMetadataFetcher, LinkMetadata, LinkPasteSuggestion, MAX_HEAD_BYTES, MetadataFetcher,
    resolve_link,
};

use std::sync::Arc;

use folio_common::config::FolioConfig;

/// A mention session wired to the HTTP providers named in `config`.
pub fn mention_session(config: &FolioConfig) -> MentionSession {
    MentionSession::new(config.mention_debounce)
        .with_provider(Arc::new(GitHubProvider::new(
            config.github_api.clone(),
            config.github_token.clone(),
        )))
        .with_provider(Arc::new(TwitterProvider::new(config.twitter_identity_url.clone())))
}

/// The embed fetcher used for rendering: syndication lookups behind the on-disk post cache.
pub fn embed_fetcher(config: &FolioConfig) -> FileCachedFetcher<HttpEmbedFetcher> {
    FileCachedFetcher::new(
        config.tweet_cache_dir.clone(),
        HttpEmbedFetcher::new(config.tweet_syndication_url.clone()),
    )
}
