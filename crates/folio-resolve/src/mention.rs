//! Mention suggestions for the `@` trigger.
//!
//! The text typed after `@` drives a small state machine:
//!
//! - empty: offer both provider hints (`@tw:`, `@gh:`)
//! - a partial prefix (`t`, `gh`, `tw:`): offer the matching hint, or both when nothing matches
//! - `tw:<handle>` / `gh:<handle>`: look the handle up, debounced and coalesced per
//!   `(provider, handle)`, and offer the identity found (or nothing)
//! - a failed lookup offers a synthetic identity built from the typed handle
//!
//! A [`MentionSession`] belongs to one editor. It tags every query with a generation so the
//! caller can drop answers to queries that have since been superseded.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use folio_common::doc::MentionAttrs;
use regex::Regex;
use smol_str::SmolStr;

use crate::coalesce::Coalescer;
use crate::identity::{Identity, IdentityProvider, Provider};

static PROVIDER_QUERY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(tw|gh):(.+)$").expect("valid mention query regex"));

/// Where the typed trigger text sits in the suggestion flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerState {
    Empty,
    Hinting { partial: SmolStr },
    ProviderSelected { provider: Provider, handle: SmolStr },
    Querying { provider: Provider, handle: SmolStr },
    Resolved { provider: Provider, handle: SmolStr },
    Failed { provider: Provider, handle: SmolStr },
}

impl TriggerState {
    /// Classify the text typed after `@`.
    pub fn classify(query: &str) -> Self {
        if query.is_empty() {
            return TriggerState::Empty;
        }
        if let Some(caps) = PROVIDER_QUERY_RE.captures(query) {
            if let Some(provider) = Provider::from_prefix(&caps[1]) {
                return TriggerState::ProviderSelected {
                    provider,
                    handle: SmolStr::new(caps[2].trim()),
                };
            }
        }
        TriggerState::Hinting {
            partial: SmolStr::new(query),
        }
    }
}

/// Hints offered for a partial provider prefix.
pub fn hints_for(partial: &str) -> Vec<Provider> {
    let lower = partial.to_lowercase();
    let matching: Vec<Provider> = Provider::ALL
        .into_iter()
        .filter(|p| p.prefix().starts_with(&lower) || lower.starts_with(p.prefix()))
        .collect();
    if matching.len() == 1 {
        matching
    } else {
        Provider::ALL.to_vec()
    }
}

/// One row of the suggestion popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestionItem {
    /// Inserts the provider prefix and keeps the popup open.
    Hint(Provider),
    Identity(Identity),
}

/// What selecting a suggestion does to the trigger range.
#[derive(Debug, Clone, PartialEq)]
pub enum MentionInsert {
    /// Replace the trigger with this text and keep suggesting.
    Text(String),
    /// Replace the trigger with a mention node.
    Mention(MentionAttrs),
}

impl SuggestionItem {
    pub fn id(&self) -> String {
        match self {
            SuggestionItem::Hint(p) => format!("{}:", p.prefix()),
            SuggestionItem::Identity(i) => i.id.clone(),
        }
    }

    pub fn label(&self) -> String {
        match self {
            SuggestionItem::Hint(p) => format!("@{}:", p.prefix()),
            SuggestionItem::Identity(i) => i.label.clone(),
        }
    }

    pub fn on_select(&self) -> MentionInsert {
        match self {
            SuggestionItem::Hint(p) => MentionInsert::Text(format!("@{}:", p.prefix())),
            SuggestionItem::Identity(i) => MentionInsert::Mention(i.to_mention_attrs()),
        }
    }
}

/// Answer to one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestions {
    pub generation: u64,
    pub state: TriggerState,
    pub items: Vec<SuggestionItem>,
    /// A newer query was issued while this one was in flight.
    pub stale: bool,
}

type LookupKey = (Provider, SmolStr);
type LookupResult = Result<Option<Identity>, SmolStr>;

/// Per-editor mention resolution.
pub struct MentionSession {
    providers: HashMap<Provider, Arc<dyn IdentityProvider>>,
    coalescer: Coalescer<LookupKey, LookupResult>,
    lookup_timeout: Duration,
    latest: AtomicU64,
}

impl std::fmt::Debug for MentionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MentionSession")
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .field("coalescer", &self.coalescer)
            .field("lookup_timeout", &self.lookup_timeout)
            .finish()
    }
}

impl MentionSession {
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
    pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(debounce: Duration) -> Self {
        Self {
            providers: HashMap::new(),
            coalescer: Coalescer::new(debounce),
            lookup_timeout: Self::DEFAULT_LOOKUP_TIMEOUT,
            latest: AtomicU64::new(0),
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.providers.insert(provider.provider(), provider);
        self
    }

    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Whether `generation` is the most recent query issued on this session.
    pub fn is_current(&self, generation: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == generation
    }

    /// Suggestions for the text typed after `@`.
    pub async fn suggest(&self, query: &str) -> Suggestions {
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let state = TriggerState::classify(query);

        let (state, items) = match state {
            TriggerState::Empty => (
                TriggerState::Empty,
                Provider::ALL.into_iter().map(SuggestionItem::Hint).collect(),
            ),
            TriggerState::Hinting { partial } => {
                let items = hints_for(&partial)
                    .into_iter()
                    .map(SuggestionItem::Hint)
                    .collect();
                (TriggerState::Hinting { partial }, items)
            }
            TriggerState::ProviderSelected { provider, handle } if handle.is_empty() => {
                (TriggerState::ProviderSelected { provider, handle }, Vec::new())
            }
            TriggerState::ProviderSelected { provider, handle } => {
                self.lookup(provider, handle).await
            }
            other => (other, Vec::new()),
        };

        Suggestions {
            generation,
            state,
            items,
            stale: !self.is_current(generation),
        }
    }

    async fn lookup(&self, provider: Provider, handle: SmolStr) -> (TriggerState, Vec<SuggestionItem>) {
        tracing::trace!(state = ?TriggerState::Querying { provider, handle: handle.clone() });
        let Some(source) = self.providers.get(&provider).cloned() else {
            tracing::warn!(%provider, %handle, "no identity provider registered");
            return Self::failed(provider, handle);
        };

        let timeout = self.lookup_timeout;
        let query = handle.clone();
        let outcome = self
            .coalescer
            .call((provider, handle.clone()), move || async move {
                match tokio::time::timeout(timeout, source.search_by_exact_handle(&query)).await {
                    Ok(Ok(found)) => Ok(found),
                    Ok(Err(e)) => Err(SmolStr::new(e.to_string())),
                    Err(_) => Err(SmolStr::new_static("lookup timed out")),
                }
            })
            .await;

        match outcome {
            Ok(Ok(found)) => (
                TriggerState::Resolved { provider, handle },
                found.into_iter().map(SuggestionItem::Identity).collect(),
            ),
            Ok(Err(error)) => {
                tracing::warn!(%provider, %handle, %error, "identity lookup failed, offering typed handle");
                Self::failed(provider, handle)
            }
            Err(error) => {
                tracing::warn!(%provider, %handle, %error, "identity lookup cancelled");
                Self::failed(provider, handle)
            }
        }
    }

    fn failed(provider: Provider, handle: SmolStr) -> (TriggerState, Vec<SuggestionItem>) {
        let item = SuggestionItem::Identity(Identity::fallback(provider, &handle));
        (TriggerState::Failed { provider, handle }, vec![item])
    }
}

impl Default for MentionSession {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DEBOUNCE)
    }
}
