//! Property-based tests for navigation and parsing invariants.
//!
//! Tests validate:
//! 1. Verse keys parse only inside the chapter range
//! 2. Voice command rules apply in order
//! 3. The verse cache is bounded and idempotent
//! 4. Any walk of next/previous stays inside the open chapter

use async_trait::async_trait;
use proptest::prelude::*;
use std::sync::Arc;
use tilawa_lib::cache::VerseCache;
use tilawa_lib::client::ContentSource;
use tilawa_lib::error::FetchError;
use tilawa_lib::models::{Chapter, Direction, SearchMatch, Verse, VerseKey, CHAPTER_COUNT};
use tilawa_lib::navigation::Navigator;
use tilawa_lib::store::VerseStore;
use tilawa_lib::voice::{parse_command, VoiceCommand};

fn verse(chapter: u16, number: u16) -> Verse {
    Verse {
        key: VerseKey::new(chapter, number),
        number: u32::from(chapter) * 1000 + u32::from(number),
        arabic_text: format!("arabic {}:{}", chapter, number),
        translation: Some(format!("translation {}:{}", chapter, number)),
    }
}

/// A single chapter of `verse_count` verses.
struct OneChapter {
    chapter: Chapter,
}

impl OneChapter {
    fn new(verse_count: u16) -> Self {
        Self {
            chapter: Chapter {
                number: 2,
                name: String::new(),
                english_name: "Al-Baqara".to_string(),
                english_name_translation: "The Cow".to_string(),
                verse_count,
                revelation_type: "Medinan".to_string(),
            },
        }
    }
}

#[async_trait]
impl ContentSource for OneChapter {
    async fn chapters(&self) -> Result<Vec<Chapter>, FetchError> {
        Ok(vec![self.chapter.clone()])
    }

    async fn chapter(&self, number: u16) -> Result<Chapter, FetchError> {
        if number == self.chapter.number {
            Ok(self.chapter.clone())
        } else {
            Err(FetchError::NotFound(format!("surah {}", number)))
        }
    }

    async fn verses(&self, chapter: u16, offset: u16, limit: u16) -> Result<Vec<Verse>, FetchError> {
        let end = offset.saturating_add(limit).min(self.chapter.verse_count);
        Ok((offset + 1..=end).map(|n| verse(chapter, n)).collect())
    }

    async fn translation(&self, key: VerseKey) -> Result<String, FetchError> {
        Ok(format!("translation {}", key))
    }

    async fn search(&self, _query: &str) -> Result<Vec<SearchMatch>, FetchError> {
        Ok(Vec::new())
    }
}

// ===== Property 1: Verse Keys =====

proptest! {
    #[test]
    fn verse_key_parses_inside_chapter_range(chapter in 0u16..200, number in 0u16..300) {
        let parsed = format!("{}:{}", chapter, number).parse::<VerseKey>();
        let valid = chapter >= 1 && chapter <= CHAPTER_COUNT && number >= 1;
        prop_assert_eq!(parsed.is_ok(), valid);
        if let Ok(key) = parsed {
            prop_assert_eq!(key, VerseKey::new(chapter, number));
        }
    }

    #[test]
    fn direction_step_stays_in_range(current in 1u16..=286, count in 1u16..=286, next in any::<bool>()) {
        let direction = if next { Direction::Next } else { Direction::Previous };
        if let Some(target) = direction.step(current, count) {
            prop_assert!(target >= 1 && target <= count);
            prop_assert_eq!(target.abs_diff(current), 1);
        }
    }
}

// ===== Property 2: Voice Command Rules =====

proptest! {
    #[test]
    fn next_keyword_always_wins(prefix in "[a-z ]{0,12}", suffix in "[a-z ]{0,12}") {
        let transcript = format!("{}NEXT{}", prefix, suffix);
        prop_assert_eq!(parse_command(&transcript), Some(VoiceCommand::Next));
    }

    #[test]
    fn transcripts_without_keywords_are_unrecognized(transcript in "[0-9 ,.!?]{0,30}") {
        prop_assert_eq!(parse_command(&transcript), None);
    }
}

// ===== Property 3: Verse Cache =====

proptest! {
    #[test]
    fn cache_is_bounded_and_idempotent(
        capacity in 1usize..16,
        keys in prop::collection::vec((1u16..=3, 1u16..=10), 0..64),
    ) {
        let cache = VerseCache::new(capacity);
        for (chapter, number) in keys {
            let key = VerseKey::new(chapter, number);
            let stored = Arc::new(verse(chapter, number));
            prop_assert!(cache.put(key, Arc::clone(&stored)));
            prop_assert!(cache.put(key, Arc::clone(&stored)));
            prop_assert_eq!(cache.get(&key), Some(stored));

            let (len, cap) = cache.stats();
            prop_assert!(len <= cap);
            prop_assert_eq!(cap, capacity);
        }
    }
}

// ===== Property 4: Navigation Walks =====

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn walks_stay_inside_the_chapter(
        verse_count in 1u16..=40,
        steps in prop::collection::vec(any::<bool>(), 0..80),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let store = Arc::new(VerseStore::new(Arc::new(VerseCache::new(8))));
            let navigator = Navigator::new(Arc::clone(&store), Arc::new(OneChapter::new(verse_count)), 10, 0);
            navigator.load_chapter(2).await.unwrap();

            let mut expected = 1u16;
            for next in steps {
                let direction = if next { Direction::Next } else { Direction::Previous };
                let shown = navigator.advance(direction).await.unwrap();
                expected = direction.step(expected, verse_count).unwrap_or(expected);

                let position = store.position().unwrap();
                assert_eq!(position.chapter().number, 2);
                assert_eq!(position.key(), VerseKey::new(2, expected));
                assert_eq!(shown.key, position.key());
            }
        });
    }
}
