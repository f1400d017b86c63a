//! Per-key trailing-edge debounce.
//!
//! A [`Coalescer`] lets many callers ask for the same key inside a quiet window and pays for
//! one lookup. Each call restarts the key's timer; when the window passes without another
//! call, the most recent lookup runs once and every caller that joined gets the same value.
//! Distinct keys have independent timers and proceed concurrently.
//!
//! Coalescers are plain values owned by whoever needs them (typically one per editing
//! session). Dropping one cancels its outstanding timers.

use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use n0_future::task::{self, JoinHandle};
use tokio::sync::oneshot;

use crate::error::ResolveError;

struct Pending<V> {
    generation: u64,
    timer: JoinHandle<()>,
    waiters: Vec<oneshot::Sender<V>>,
}

pub struct Coalescer<K: Hash + Eq, V> {
    window: Duration,
    pending: Arc<DashMap<K, Pending<V>>>,
    generation: AtomicU64,
}

impl<K: Hash + Eq, V> std::fmt::Debug for Coalescer<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coalescer")
            .field("window", &self.window)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl<K, V> Coalescer<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: Arc::new(DashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Number of keys with a timer currently running.
    pub fn pending_keys(&self) -> usize {
        self.pending.len()
    }

    /// Join the pending lookup for `key`, restarting its quiet window.
    ///
    /// Resolves once the window elapses with no further calls for `key`, with the value
    /// produced by the last `lookup` supplied for it.
    pub async fn call<F, Fut>(&self, key: K, lookup: F) -> Result<V, ResolveError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = V> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);

        // The timer is spawned while the entry is held so it cannot fire before it is registered.
        match self.pending.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let pending = occupied.get_mut();
                pending.timer.abort();
                pending.timer = self.spawn_timer(key, generation, lookup);
                pending.generation = generation;
                pending.waiters.push(tx);
            }
            Entry::Vacant(vacant) => {
                let timer = self.spawn_timer(key, generation, lookup);
                vacant.insert(Pending {
                    generation,
                    timer,
                    waiters: vec![tx],
                });
            }
        }

        rx.await.map_err(|_| ResolveError::Cancelled)
    }

    fn spawn_timer<F, Fut>(&self, key: K, generation: u64, lookup: F) -> JoinHandle<()>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = V> + Send + 'static,
    {
        let pending = Arc::clone(&self.pending);
        let window = self.window;
        task::spawn(async move {
            tokio::time::sleep(window).await;
            // A newer call owns the key now; its timer will answer everyone.
            let Some((_, entry)) = pending.remove_if(&key, |_, p| p.generation == generation)
            else {
                return;
            };
            tracing::debug!(waiters = entry.waiters.len(), "coalesced lookup firing");
            let value = lookup().await;
            for waiter in entry.waiters {
                let _ = waiter.send(value.clone());
            }
        })
    }
}

impl<K: Hash + Eq, V> Drop for Coalescer<K, V> {
    fn drop(&mut self) {
        for entry in self.pending.iter() {
            entry.timer.abort();
        }
    }
}
