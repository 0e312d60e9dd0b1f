//! Chapter and verse types

use crate::error::ReaderError;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

/// Number of chapters in the Quran.
pub const CHAPTER_COUNT: u16 = 114;

/// Verse count of the longest chapter (Al-Baqarah).
pub const MAX_VERSES_IN_CHAPTER: u16 = 286;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub number: u16,
    /// Arabic name
    #[serde(default)]
    pub name: String,
    pub english_name: String,
    pub english_name_translation: String,
    #[serde(rename = "numberOfAyahs")]
    pub verse_count: u16,
    #[serde(default)]
    pub revelation_type: String,
}

impl Chapter {
    pub fn contains(&self, verse: u16) -> bool {
        verse >= 1 && verse <= self.verse_count
    }
}

/// Address of a verse: `chapter:verse`, both 1-based.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VerseKey {
    pub chapter: u16,
    pub verse: u16,
}

impl VerseKey {
    pub fn new(chapter: u16, verse: u16) -> Self {
        Self { chapter, verse }
    }
}

impl fmt::Display for VerseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chapter, self.verse)
    }
}

fn verse_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*(\d{1,3})\s*:\s*(\d{1,3})\s*$").expect("valid verse key pattern"))
}

impl FromStr for VerseKey {
    type Err = ReaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ReaderError::Other(format!("Invalid verse key: {:?}", s));
        let caps = verse_key_pattern().captures(s).ok_or_else(invalid)?;
        let chapter: u16 = caps[1].parse().map_err(|_| invalid())?;
        let verse: u16 = caps[2].parse().map_err(|_| invalid())?;
        if chapter == 0 || chapter > CHAPTER_COUNT || verse == 0 {
            return Err(invalid());
        }
        Ok(Self { chapter, verse })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    pub key: VerseKey,
    /// Position of the verse across the whole text (1..=6236)
    pub number: u32,
    pub arabic_text: String,
    /// `None` until the translation has been fetched
    pub translation: Option<String>,
}

impl Verse {
    pub fn chapter_number(&self) -> u16 {
        self.key.chapter
    }

    pub fn number_in_chapter(&self) -> u16 {
        self.key.verse
    }

    pub fn has_translation(&self) -> bool {
        self.translation.is_some()
    }

    pub fn with_translation(&self, translation: String) -> Self {
        Self {
            translation: Some(translation),
            ..self.clone()
        }
    }
}

/// The open chapter and the verse shown in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationPosition {
    chapter: Chapter,
    verse: Arc<Verse>,
}

impl NavigationPosition {
    pub fn new(chapter: Chapter, verse: Arc<Verse>) -> Result<Self, ReaderError> {
        if verse.chapter_number() != chapter.number {
            return Err(ReaderError::InconsistentPosition {
                chapter: chapter.number,
                verse: verse.key.to_string(),
            });
        }
        Ok(Self { chapter, verse })
    }

    pub fn chapter(&self) -> &Chapter {
        &self.chapter
    }

    pub fn verse(&self) -> &Arc<Verse> {
        &self.verse
    }

    pub fn key(&self) -> VerseKey {
        self.verse.key
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Next,
    Previous,
}

impl Direction {
    /// Target verse number from `current`, or `None` when it would leave
    /// `1..=verse_count`.
    pub fn step(&self, current: u16, verse_count: u16) -> Option<u16> {
        let target = match self {
            Direction::Next => current.checked_add(1)?,
            Direction::Previous => current.checked_sub(1)?,
        };
        (target >= 1 && target <= verse_count).then_some(target)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMatch {
    pub key: VerseKey,
    pub number: u32,
    pub text: String,
    pub chapter_english_name: String,
    pub edition: Option<String>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn chapter(number: u16, verse_count: u16) -> Chapter {
        Chapter {
            number,
            name: String::new(),
            english_name: format!("Chapter {}", number),
            english_name_translation: String::new(),
            verse_count,
            revelation_type: "Meccan".to_string(),
        }
    }

    pub fn verse(chapter: u16, verse: u16) -> Verse {
        Verse {
            key: VerseKey::new(chapter, verse),
            number: u32::from(chapter) * 1000 + u32::from(verse),
            arabic_text: format!("arabic {}:{}", chapter, verse),
            translation: Some(format!("translation {}:{}", chapter, verse)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_verse_key_parsing() {
        assert_eq!("2:255".parse::<VerseKey>().unwrap(), VerseKey::new(2, 255));
        assert_eq!(" 1 : 7 ".parse::<VerseKey>().unwrap(), VerseKey::new(1, 7));
        assert!("0:1".parse::<VerseKey>().is_err());
        assert!("115:1".parse::<VerseKey>().is_err());
        assert!("1:0".parse::<VerseKey>().is_err());
        assert!("1-7".parse::<VerseKey>().is_err());
        assert_eq!(VerseKey::new(36, 1).to_string(), "36:1");
    }

    #[test]
    fn test_chapter_deserializes_api_fields() {
        let json = r#"{
            "number": 1,
            "name": "سُورَةُ ٱلْفَاتِحَةِ",
            "englishName": "Al-Faatiha",
            "englishNameTranslation": "The Opening",
            "numberOfAyahs": 7,
            "revelationType": "Meccan"
        }"#;
        let chapter: Chapter = serde_json::from_str(json).unwrap();
        assert_eq!(chapter.number, 1);
        assert_eq!(chapter.verse_count, 7);
        assert_eq!(chapter.english_name, "Al-Faatiha");
    }

    #[test]
    fn test_position_rejects_foreign_verse() {
        let err = NavigationPosition::new(chapter(1, 7), Arc::new(verse(2, 1))).unwrap_err();
        assert!(matches!(err, ReaderError::InconsistentPosition { chapter: 1, .. }));
        assert!(NavigationPosition::new(chapter(2, 286), Arc::new(verse(2, 1))).is_ok());
    }

    #[test]
    fn test_direction_clamps_to_chapter() {
        assert_eq!(Direction::Next.step(7, 7), None);
        assert_eq!(Direction::Previous.step(1, 7), None);
        assert_eq!(Direction::Next.step(3, 7), Some(4));
        assert_eq!(Direction::Previous.step(3, 7), Some(2));
    }

    #[test]
    fn test_missing_translation_is_distinct_state() {
        let mut bare = verse(1, 1);
        bare.translation = None;
        assert!(!bare.has_translation());
        let full = bare.with_translation("In the name of God".into());
        assert!(full.has_translation());
        assert_eq!(full.key, bare.key);
    }
}
