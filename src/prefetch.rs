//! Background prefetch of verses adjacent to the open one

use crate::client::{fetch_verse, ContentSource};
use crate::models::{VerseKey, MAX_VERSES_IN_CHAPTER};
use crate::store::VerseStore;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default number of verses fetched ahead of the open one
pub const DEFAULT_PREFETCH_COUNT: u16 = 2;

#[derive(Clone)]
pub struct Prefetcher {
    store: Arc<VerseStore>,
    source: Arc<dyn ContentSource>,
}

impl Prefetcher {
    pub fn new(store: Arc<VerseStore>, source: Arc<dyn ContentSource>) -> Self {
        Self { store, source }
    }

    /// Keys in `(from_verse, from_verse + count]` that are not cached yet,
    /// clamped to the chapter's length.
    pub fn pending_keys(&self, chapter: u16, from_verse: u16, count: u16) -> Vec<VerseKey> {
        let last_in_chapter = self
            .store
            .chapter(chapter)
            .map(|c| c.verse_count)
            .unwrap_or(MAX_VERSES_IN_CHAPTER);
        let end = from_verse.saturating_add(count).min(last_in_chapter);

        (from_verse.saturating_add(1)..=end)
            .map(|verse| VerseKey::new(chapter, verse))
            .filter(|key| !self.store.cache().contains(key))
            .collect()
    }

    /// Fetch the verses after `from_verse` in the background.
    ///
    /// The caller never waits on this; the handle resolves to the number of
    /// verses this task fetched (joined in-flight fetches count too).
    /// Failures are logged and dropped.
    pub fn schedule(&self, chapter: u16, from_verse: u16, count: u16) -> JoinHandle<usize> {
        let keys = self.pending_keys(chapter, from_verse, count);
        let cache = Arc::clone(self.store.cache());
        let source = Arc::clone(&self.source);

        tokio::spawn(async move {
            let mut fetched = 0;
            for key in keys {
                let source = Arc::clone(&source);
                let result = cache
                    .get_or_fetch(key, move || async move { fetch_verse(source.as_ref(), key).await })
                    .await;
                match result {
                    Ok(_) => {
                        debug!(%key, "prefetched verse");
                        fetched += 1;
                    }
                    Err(e) => {
                        warn!(%key, error = %e, "prefetch failed");
                        break;
                    }
                }
            }
            fetched
        })
    }
}
