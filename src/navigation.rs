//! Verse navigation: stepping within a chapter, jumping across chapters,
//! opening chapters and paging through their verses

use crate::client::{fetch_verse, ContentSource};
use crate::error::{FetchError, ReaderError, Result};
use crate::models::{Chapter, Direction, Verse, VerseKey};
use crate::prefetch::Prefetcher;
use crate::store::VerseStore;
use std::sync::Arc;
use tracing::{debug, info};

/// Default number of verses requested per chapter page
pub const DEFAULT_PAGE_SIZE: u16 = 10;

pub struct Navigator {
    store: Arc<VerseStore>,
    source: Arc<dyn ContentSource>,
    prefetcher: Prefetcher,
    page_size: u16,
    prefetch_count: u16,
}

impl Navigator {
    pub fn new(
        store: Arc<VerseStore>,
        source: Arc<dyn ContentSource>,
        page_size: u16,
        prefetch_count: u16,
    ) -> Self {
        let prefetcher = Prefetcher::new(Arc::clone(&store), Arc::clone(&source));
        Self {
            store,
            source,
            prefetcher,
            page_size: page_size.max(1),
            prefetch_count,
        }
    }

    pub fn store(&self) -> &Arc<VerseStore> {
        &self.store
    }

    pub fn prefetcher(&self) -> &Prefetcher {
        &self.prefetcher
    }

    /// Cached verse or a single de-duplicated remote fetch.
    pub async fn fetch(&self, key: VerseKey) -> Result<Arc<Verse>> {
        let source = Arc::clone(&self.source);
        let verse = self
            .store
            .cache()
            .get_or_fetch(key, move || async move { fetch_verse(source.as_ref(), key).await })
            .await?;
        Ok(verse)
    }

    /// Chapter metadata from the loaded list, falling back to the API.
    async fn resolve_chapter(&self, number: u16) -> Result<Chapter> {
        if let Some(chapter) = self.store.chapter(number) {
            return Ok(chapter.clone());
        }
        match self.source.chapter(number).await {
            Ok(chapter) => Ok(chapter),
            Err(FetchError::NotFound(_)) => Err(ReaderError::ChapterNotFound(number)),
            Err(e) => Err(e.into()),
        }
    }

    fn prefetch_after(&self, key: VerseKey) {
        if self.prefetch_count > 0 {
            self.prefetcher.schedule(key.chapter, key.verse, self.prefetch_count);
        }
    }

    /// Step one verse forward or back inside the open chapter.
    ///
    /// At either end of the chapter this returns the open verse unchanged;
    /// chapter boundaries are only crossed by [`Navigator::jump_to_verse`].
    /// On a failed fetch the position is left as it was.
    pub async fn advance(&self, direction: Direction) -> Result<Arc<Verse>> {
        let position = self.store.position().ok_or(ReaderError::NoPosition)?;
        let chapter = position.chapter().clone();

        let Some(target) = direction.step(position.key().verse, chapter.verse_count) else {
            debug!(key = %position.key(), ?direction, "at chapter boundary");
            return Ok(Arc::clone(position.verse()));
        };

        let key = VerseKey::new(chapter.number, target);
        let verse = self.fetch(key).await?;
        self.store.set_current(chapter, Arc::clone(&verse))?;
        self.prefetch_after(key);
        Ok(verse)
    }

    /// Show `verse`, switching chapter when it lives in another one.
    ///
    /// A verse outside its chapter's range is rejected. A cached copy that
    /// already carries a translation is kept over an untranslated `verse`.
    pub async fn jump_to_verse(&self, verse: Arc<Verse>) -> Result<()> {
        let chapter = self.resolve_chapter(verse.chapter_number()).await?;
        if !chapter.contains(verse.number_in_chapter()) {
            return Err(FetchError::NotFound(format!("verse {}", verse.key)).into());
        }
        let switching = self
            .store
            .current_chapter()
            .map_or(true, |current| current.number != chapter.number);

        let verse = match self.store.get_cached(&verse.key) {
            Some(cached) if cached.has_translation() && !verse.has_translation() => cached,
            _ => {
                self.store.put(verse.key, Arc::clone(&verse));
                verse
            }
        };
        self.store.set_current(chapter.clone(), Arc::clone(&verse))?;
        if switching {
            info!(chapter = chapter.number, "switched chapter");
            self.store.set_chapter_page(chapter.number, Vec::new());
        }
        self.prefetch_after(verse.key);
        Ok(())
    }

    /// Fetch the verse at `key` (or take it from the cache) and jump to it.
    pub async fn jump_to_key(&self, key: VerseKey) -> Result<Arc<Verse>> {
        let chapter = self.resolve_chapter(key.chapter).await?;
        if !chapter.contains(key.verse) {
            return Err(FetchError::NotFound(format!("verse {}", key)).into());
        }
        let verse = self.fetch(key).await?;
        self.jump_to_verse(Arc::clone(&verse)).await?;
        Ok(verse)
    }

    /// Open a chapter at its first verse with the first page listed.
    pub async fn load_chapter(&self, number: u16) -> Result<Arc<Verse>> {
        let chapter = self.resolve_chapter(number).await?;
        info!(chapter = number, name = %chapter.english_name, "loading chapter");

        let verses = self.fetch_page(number, 0).await?;
        let first = verses
            .first()
            .cloned()
            .ok_or_else(|| FetchError::NotFound(format!("verses of chapter {}", number)))?;

        self.store.set_current(chapter, Arc::clone(&first))?;
        self.store.set_chapter_page(number, verses);
        self.prefetch_after(first.key);
        Ok(first)
    }

    /// List the next page of the open chapter; returns how many verses were
    /// added (0 once the chapter is fully listed).
    pub async fn load_next_page(&self) -> Result<usize> {
        let page = self.store.chapter_page();
        if page.chapter == 0 {
            return Err(ReaderError::NoPosition);
        }
        let chapter = self.resolve_chapter(page.chapter).await?;
        let offset = page.next_offset();
        if offset >= chapter.verse_count {
            return Ok(0);
        }

        let verses = self.fetch_page(chapter.number, offset).await?;
        Ok(self.store.append_chapter_page(verses))
    }

    async fn fetch_page(&self, chapter: u16, offset: u16) -> Result<Vec<Arc<Verse>>> {
        let verses: Vec<Arc<Verse>> = self
            .source
            .verses(chapter, offset, self.page_size)
            .await?
            .into_iter()
            .map(Arc::new)
            .collect();
        for verse in &verses {
            self.store.put(verse.key, Arc::clone(verse));
        }
        debug!(chapter, offset, count = verses.len(), "fetched chapter page");
        Ok(verses)
    }

    /// Fill in the translation of a verse that arrived without one.
    pub async fn complete_translation(&self, key: VerseKey) -> Result<Arc<Verse>> {
        let verse = self.fetch(key).await?;
        if verse.has_translation() {
            return Ok(verse);
        }

        let translation = self.source.translation(key).await?;
        let completed = Arc::new(verse.with_translation(translation));
        self.store.put(key, Arc::clone(&completed));

        if let Some(position) = self.store.position() {
            if position.key() == key {
                self.store.set_current(position.chapter().clone(), Arc::clone(&completed))?;
            }
        }
        Ok(completed)
    }
}
