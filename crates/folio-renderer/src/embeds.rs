//! Embed content collected ahead of a render pass.

use std::collections::HashMap;

use folio_common::doc::Document;
use folio_resolve::{EmbedFetcher, EmbedKey, EmbedPayload, embed_keys};

#[derive(Debug, Clone, PartialEq)]
pub enum EmbedState {
    Ready(EmbedPayload),
    NotFound,
}

/// Embed content keyed by `(kind, id)`. Keys missing from the index render as still loading.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbedIndex {
    entries: HashMap<EmbedKey, EmbedState>,
}

impl EmbedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: EmbedKey, state: EmbedState) {
        self.entries.insert(key, state);
    }

    pub fn get(&self, key: &EmbedKey) -> Option<&EmbedState> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(EmbedKey, EmbedState)> for EmbedIndex {
    fn from_iter<T: IntoIterator<Item = (EmbedKey, EmbedState)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Fetch every embed referenced by `doc`, concurrently, once per distinct key.
///
/// Missing content and fetch failures are both recorded as [`EmbedState::NotFound`].
pub async fn prefetch_embeds(doc: &Document, fetcher: &dyn EmbedFetcher) -> EmbedIndex {
    let keys = embed_keys(doc);
    if keys.is_empty() {
        return EmbedIndex::new();
    }
    tracing::debug!(count = keys.len(), "prefetching embeds");

    let fetches = keys.into_iter().map(|key| async move {
        let state = match fetcher.fetch(&key).await {
            Ok(Some(payload)) => EmbedState::Ready(payload),
            Ok(None) => EmbedState::NotFound,
            Err(error) => {
                tracing::warn!(kind = key.kind.name(), id = %key.id, %error, "embed fetch failed");
                EmbedState::NotFound
            }
        };
        (key, state)
    });
    n0_future::join_all(fetches).await.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use folio_common::doc::Node;
    use folio_resolve::{EmbedKind, ResolveError, SocialPost, VideoPayload};

    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<EmbedKey>>,
    }

    #[async_trait]
    impl EmbedFetcher for Recording {
        async fn fetch(&self, key: &EmbedKey) -> Result<Option<EmbedPayload>, ResolveError> {
            self.seen.lock().unwrap().push(key.clone());
            match (key.kind, key.id.as_str()) {
                (EmbedKind::Video, id) => Ok(Some(EmbedPayload::Video(VideoPayload::new(id)))),
                (EmbedKind::SocialPost, "1") => Ok(Some(EmbedPayload::SocialPost(SocialPost::default()))),
                (EmbedKind::SocialPost, "2") => Ok(None),
                _ => Err(ResolveError::Timeout),
            }
        }
    }

    #[tokio::test]
    async fn prefetch_fetches_each_key_once() {
        let doc = Document::new(vec![
            Node::heading(1, vec![]),
            Node::twitter_embed("https://x.com/a/status/1"),
            Node::twitter_embed("https://twitter.com/a/status/1"),
            Node::twitter_embed("https://x.com/a/status/2"),
            Node::twitter_embed("https://x.com/a/status/3"),
            Node::youtube_embed("https://youtu.be/dQw4w9WgXcQ"),
        ]);
        let fetcher = Recording::default();
        let index = prefetch_embeds(&doc, &fetcher).await;

        assert_eq!(fetcher.seen.lock().unwrap().len(), 4);
        assert_eq!(index.len(), 4);
        assert!(matches!(
            index.get(&EmbedKey::new(EmbedKind::SocialPost, "1")),
            Some(EmbedState::Ready(_))
        ));
        assert_eq!(
            index.get(&EmbedKey::new(EmbedKind::SocialPost, "2")),
            Some(&EmbedState::NotFound)
        );
        // Failures are recorded as not found.
        assert_eq!(
            index.get(&EmbedKey::new(EmbedKind::SocialPost, "3")),
            Some(&EmbedState::NotFound)
        );
    }

    #[tokio::test]
    async fn documents_without_embeds_fetch_nothing() {
        let fetcher = Recording::default();
        let index = prefetch_embeds(&Document::with_empty_title(), &fetcher).await;
        assert!(index.is_empty());
        assert!(fetcher.seen.lock().unwrap().is_empty());
    }
}
