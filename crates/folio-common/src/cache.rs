//! Lookup cache for account handles, over mini-moka-wasm's thread-safe cache.
//!
//! Handles are case-insensitive and may be typed with a leading `@`, so `@Octocat` and
//! `octocat` share an entry. Entries expire after a fixed TTL; a cached `None` (no such
//! account) is a hit like any other value.

use std::time::Duration;

use smol_str::SmolStr;

/// How long a lookup result is reused before asking again.
pub const HANDLE_TTL: Duration = Duration::from_secs(10 * 60);
pub const HANDLE_CAPACITY: u64 = 512;

#[derive(Clone)]
pub struct HandleCache<V> {
    inner: mini_moka_wasm::sync::Cache<SmolStr, V>,
}

impl<V: Clone + Send + Sync + 'static> HandleCache<V> {
    pub fn new() -> Self {
        Self::with_ttl(HANDLE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: mini_moka_wasm::sync::Cache::builder()
                .max_capacity(HANDLE_CAPACITY)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub fn get(&self, handle: &str) -> Option<V> {
        self.inner.get(&handle_key(handle))
    }

    pub fn insert(&self, handle: &str, value: V) {
        self.inner.insert(handle_key(handle), value);
    }
}

impl<V: Clone + Send + Sync + 'static> Default for HandleCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache key for a handle: no leading `@`, lowercased.
pub fn handle_key(handle: &str) -> SmolStr {
    SmolStr::new(handle.trim().trim_start_matches('@').to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_share_entries_across_case_and_at_sign() {
        let cache = HandleCache::<Option<u32>>::new();
        assert_eq!(cache.get("octocat"), None);
        cache.insert("@Octocat", Some(7));
        assert_eq!(cache.get("octocat"), Some(Some(7)));
        assert_eq!(cache.get("OCTOCAT"), Some(Some(7)));
    }

    #[test]
    fn missing_accounts_are_cached_too() {
        let cache = HandleCache::<Option<u32>>::new();
        cache.insert("ghost", None);
        assert_eq!(cache.get("ghost"), Some(None));
    }

    #[test]
    fn entries_expire() {
        let cache = HandleCache::<u32>::with_ttl(Duration::from_millis(20));
        cache.insert("a", 1);
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(cache.get("a"), None);
    }
}
