//! Verse store: chapter list, open position and the verse cache

use crate::cache::VerseCache;
use crate::error::Result;
use crate::models::{Chapter, NavigationPosition, Verse, VerseKey};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Verses listed for the open chapter, page by page.
#[derive(Debug, Clone, Default)]
pub struct ChapterPage {
    pub chapter: u16,
    pub verses: Vec<Arc<Verse>>,
}

impl ChapterPage {
    /// Offset of the next page to request.
    pub fn next_offset(&self) -> u16 {
        self.verses.len() as u16
    }
}

pub struct VerseStore {
    chapters: OnceLock<Vec<Chapter>>,
    position: RwLock<Option<NavigationPosition>>,
    page: RwLock<ChapterPage>,
    cache: Arc<VerseCache>,
}

impl VerseStore {
    pub fn new(cache: Arc<VerseCache>) -> Self {
        Self {
            chapters: OnceLock::new(),
            position: RwLock::new(None),
            page: RwLock::new(ChapterPage::default()),
            cache,
        }
    }

    pub fn cache(&self) -> &Arc<VerseCache> {
        &self.cache
    }

    /// Install the chapter list. Only the first call has any effect; the
    /// list is read-only afterwards.
    pub fn set_chapters(&self, chapters: Vec<Chapter>) -> bool {
        self.chapters.set(chapters).is_ok()
    }

    pub fn chapters(&self) -> &[Chapter] {
        self.chapters.get().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn chapter(&self, number: u16) -> Option<&Chapter> {
        self.chapters().iter().find(|c| c.number == number)
    }

    pub fn get_cached(&self, key: &VerseKey) -> Option<Arc<Verse>> {
        self.cache.get(key)
    }

    pub fn put(&self, key: VerseKey, verse: Arc<Verse>) {
        self.cache.put(key, verse);
    }

    /// Move to `verse` in `chapter`. Fails without touching the position
    /// when the verse belongs to another chapter.
    pub fn set_current(&self, chapter: Chapter, verse: Arc<Verse>) -> Result<()> {
        let position = NavigationPosition::new(chapter, verse)?;
        *self.position.write().unwrap_or_else(PoisonError::into_inner) = Some(position);
        Ok(())
    }

    pub fn position(&self) -> Option<NavigationPosition> {
        self.position.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn current_chapter(&self) -> Option<Chapter> {
        self.position().map(|p| p.chapter().clone())
    }

    pub fn current_verse(&self) -> Option<Arc<Verse>> {
        self.position().map(|p| Arc::clone(p.verse()))
    }

    /// Replace the listed verses with the first page of `chapter`.
    pub fn set_chapter_page(&self, chapter: u16, verses: Vec<Arc<Verse>>) {
        *self.page.write().unwrap_or_else(PoisonError::into_inner) = ChapterPage { chapter, verses };
    }

    /// Append a further page. Verses from another chapter or already listed
    /// are skipped; returns how many were added.
    pub fn append_chapter_page(&self, verses: Vec<Arc<Verse>>) -> usize {
        let mut page = self.page.write().unwrap_or_else(PoisonError::into_inner);
        let mut added = 0;
        for verse in verses {
            let last = page.verses.last().map(|v| v.number_in_chapter()).unwrap_or(0);
            if verse.chapter_number() == page.chapter && verse.number_in_chapter() > last {
                page.verses.push(verse);
                added += 1;
            }
        }
        added
    }

    pub fn chapter_page(&self) -> ChapterPage {
        self.page.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReaderError;
    use crate::models::fixtures::{chapter, verse};

    fn store() -> VerseStore {
        VerseStore::new(Arc::new(VerseCache::new(16)))
    }

    #[test]
    fn test_get_cached_has_no_side_effects_on_contents() {
        let store = store();
        assert!(store.get_cached(&VerseKey::new(1, 1)).is_none());
        assert_eq!(store.cache().stats().0, 0);

        store.put(VerseKey::new(1, 1), Arc::new(verse(1, 1)));
        assert_eq!(store.get_cached(&VerseKey::new(1, 1)).unwrap().key, VerseKey::new(1, 1));
        assert_eq!(store.cache().stats().0, 1);
    }

    #[test]
    fn test_set_current_enforces_invariant() {
        let store = store();
        store.set_current(chapter(1, 7), Arc::new(verse(1, 3))).unwrap();

        let err = store.set_current(chapter(1, 7), Arc::new(verse(2, 1))).unwrap_err();
        assert!(matches!(err, ReaderError::InconsistentPosition { .. }));
        // Prior position survives the failed transition
        assert_eq!(store.current_verse().unwrap().key, VerseKey::new(1, 3));
    }

    #[test]
    fn test_chapter_list_is_set_once() {
        let store = store();
        assert!(store.chapters().is_empty());
        assert!(store.set_chapters(vec![chapter(1, 7), chapter(2, 286)]));
        assert!(!store.set_chapters(vec![chapter(3, 200)]));
        assert_eq!(store.chapters().len(), 2);
        assert_eq!(store.chapter(2).unwrap().verse_count, 286);
        assert!(store.chapter(3).is_none());
    }

    #[test]
    fn test_chapter_page_appends_in_order() {
        let store = store();
        store.set_chapter_page(1, (1..=3).map(|n| Arc::new(verse(1, n))).collect());
        assert_eq!(store.chapter_page().next_offset(), 3);

        let added = store.append_chapter_page(vec![
            Arc::new(verse(1, 3)),
            Arc::new(verse(1, 4)),
            Arc::new(verse(2, 5)),
        ]);
        assert_eq!(added, 1);
        assert_eq!(store.chapter_page().verses.len(), 4);
    }
}
