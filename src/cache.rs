//! Verse caching with LRU eviction and shared in-flight fetches

use crate::error::FetchError;
use crate::models::{Verse, VerseKey};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;
use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Default verse cache capacity (number of verses)
pub const DEFAULT_CACHE_CAPACITY: usize = 512;

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<Verse>, FetchError>>>;

pub struct VerseCache {
    cache: Mutex<LruCache<VerseKey, Arc<Verse>>>,
    in_flight: Mutex<HashMap<VerseKey, SharedFetch>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl VerseCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or_else(|| NonZeroUsize::new(DEFAULT_CACHE_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Look up a verse, marking it as recently used.
    pub fn get(&self, key: &VerseKey) -> Option<Arc<Verse>> {
        lock(&self.cache).get(key).cloned()
    }

    pub fn contains(&self, key: &VerseKey) -> bool {
        lock(&self.cache).contains(key)
    }

    /// Store a verse under `key`. Overwriting with the same verse is a no-op
    /// as far as callers can observe. A verse whose own key differs from
    /// `key` is refused.
    pub fn put(&self, key: VerseKey, verse: Arc<Verse>) -> bool {
        if verse.key != key {
            warn!(%key, verse = %verse.key, "refusing to cache verse under a foreign key");
            return false;
        }
        lock(&self.cache).put(key, verse);
        true
    }

    /// Whether a fetch for `key` is currently pending.
    pub fn is_in_flight(&self, key: &VerseKey) -> bool {
        lock(&self.in_flight).contains_key(key)
    }

    /// Return the cached verse, or run `fetch` and cache its result.
    ///
    /// Concurrent callers asking for the same key while a fetch is pending
    /// attach to that fetch instead of starting another one. Failures are
    /// handed to every waiter and nothing is cached.
    pub async fn get_or_fetch<F, Fut>(
        self: &Arc<Self>,
        key: VerseKey,
        fetch: F,
    ) -> Result<Arc<Verse>, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Verse, FetchError>> + Send + 'static,
    {
        if let Some(verse) = self.get(&key) {
            debug!(%key, "verse cache hit");
            return Ok(verse);
        }

        let pending = {
            let mut in_flight = lock(&self.in_flight);
            // A fetch that completed since the lookup above has already
            // written the cache before leaving the in-flight map.
            if let Some(verse) = self.get(&key) {
                return Ok(verse);
            }
            match in_flight.get(&key) {
                Some(existing) => {
                    debug!(%key, "joining in-flight fetch");
                    existing.clone()
                }
                None => {
                    debug!(%key, "verse cache miss");
                    let pending = fetch().map(|r| r.map(Arc::new)).boxed().shared();
                    in_flight.insert(key, pending.clone());
                    pending
                }
            }
        };

        let result = pending.clone().await;

        if let Ok(verse) = &result {
            self.put(key, Arc::clone(verse));
        }
        let mut in_flight = lock(&self.in_flight);
        if in_flight.get(&key).is_some_and(|current| current.ptr_eq(&pending)) {
            in_flight.remove(&key);
        }

        result
    }

    pub fn clear(&self) {
        lock(&self.cache).clear();
    }

    /// (entries, capacity)
    pub fn stats(&self) -> (usize, usize) {
        let cache = lock(&self.cache);
        (cache.len(), cache.cap().get())
    }
}

impl Default for VerseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
