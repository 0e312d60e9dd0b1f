//! In-memory stand-ins for the remote API, audio output and speech input

use crate::audio::{AudioBackend, AudioStream};
use crate::client::ContentSource;
use crate::error::{FetchError, ReaderError, Result};
use crate::models::fixtures;
use crate::models::{Chapter, SearchMatch, Verse, VerseKey};
use crate::voice::SpeechRecognizer;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub struct FakeSource {
    chapters: Vec<Chapter>,
    verse_requests: AtomicUsize,
    search_requests: AtomicUsize,
    fail_verses: AtomicBool,
    fail_search: AtomicBool,
    omit_translations: AtomicBool,
    search_results: Mutex<HashMap<String, Vec<SearchMatch>>>,
}

impl FakeSource {
    /// A few chapters with their real verse counts.
    pub fn quran() -> Self {
        Self {
            chapters: vec![
                fixtures::chapter(1, 7),
                fixtures::chapter(2, 286),
                fixtures::chapter(36, 83),
                fixtures::chapter(112, 4),
            ],
            verse_requests: AtomicUsize::new(0),
            search_requests: AtomicUsize::new(0),
            fail_verses: AtomicBool::new(false),
            fail_search: AtomicBool::new(false),
            omit_translations: AtomicBool::new(false),
            search_results: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_search(self, query: &str, matches: Vec<SearchMatch>) -> Self {
        self.search_results.lock().unwrap().insert(query.to_string(), matches);
        self
    }

    pub fn verse_requests(&self) -> usize {
        self.verse_requests.load(Ordering::SeqCst)
    }

    pub fn search_requests(&self) -> usize {
        self.search_requests.load(Ordering::SeqCst)
    }

    pub fn fail_verses(&self, fail: bool) {
        self.fail_verses.store(fail, Ordering::SeqCst);
    }

    pub fn fail_search(&self, fail: bool) {
        self.fail_search.store(fail, Ordering::SeqCst);
    }

    pub fn omit_translations(&self, omit: bool) {
        self.omit_translations.store(omit, Ordering::SeqCst);
    }
}

#[async_trait]
impl ContentSource for FakeSource {
    async fn chapters(&self) -> Result<Vec<Chapter>, FetchError> {
        Ok(self.chapters.clone())
    }

    async fn chapter(&self, number: u16) -> Result<Chapter, FetchError> {
        self.chapters
            .iter()
            .find(|c| c.number == number)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(format!("surah {}", number)))
    }

    async fn verses(&self, chapter: u16, offset: u16, limit: u16) -> Result<Vec<Verse>, FetchError> {
        self.verse_requests.fetch_add(1, Ordering::SeqCst);
        if self.fail_verses.load(Ordering::SeqCst) {
            return Err(FetchError::Network("offline".to_string()));
        }
        let chapter = self.chapter(chapter).await?;
        let end = offset.saturating_add(limit).min(chapter.verse_count);
        let omit = self.omit_translations.load(Ordering::SeqCst);
        Ok((offset + 1..=end)
            .map(|n| {
                let mut verse = fixtures::verse(chapter.number, n);
                if omit {
                    verse.translation = None;
                }
                verse
            })
            .collect())
    }

    async fn translation(&self, key: VerseKey) -> Result<String, FetchError> {
        if self.fail_verses.load(Ordering::SeqCst) {
            return Err(FetchError::Network("offline".to_string()));
        }
        Ok(format!("translation {}", key))
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchMatch>, FetchError> {
        self.search_requests.fetch_add(1, Ordering::SeqCst);
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(FetchError::Status(502));
        }
        Ok(self.search_results.lock().unwrap().get(query).cloned().unwrap_or_default())
    }
}

pub fn search_match(chapter: u16, verse: u16) -> SearchMatch {
    SearchMatch {
        key: VerseKey::new(chapter, verse),
        number: u32::from(chapter) * 1000 + u32::from(verse),
        text: format!("translation {}:{}", chapter, verse),
        chapter_english_name: format!("Chapter {}", chapter),
        edition: Some("en.sahih".to_string()),
    }
}

/// Records every call so tests can check ordering and overlap.
#[derive(Default)]
pub struct FakeAudio {
    pub events: Arc<Mutex<Vec<String>>>,
    pub open_streams: Arc<AtomicUsize>,
    pub fail_open: AtomicBool,
}

impl FakeAudio {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::SeqCst)
    }
}

struct FakeStream {
    url: String,
    events: Arc<Mutex<Vec<String>>>,
    open_streams: Arc<AtomicUsize>,
}

impl AudioStream for FakeStream {
    fn play(&mut self) -> Result<()> {
        self.events.lock().unwrap().push(format!("play {}", self.url));
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.events.lock().unwrap().push(format!("pause {}", self.url));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.events.lock().unwrap().push(format!("stop {}", self.url));
        Ok(())
    }
}

impl Drop for FakeStream {
    fn drop(&mut self) {
        self.open_streams.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl AudioBackend for FakeAudio {
    async fn open(&self, url: &str) -> Result<Box<dyn AudioStream>> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(ReaderError::Playback(format!("cannot load {}", url)));
        }
        assert_eq!(self.open_streams(), 0, "a prior stream is still open");
        self.open_streams.fetch_add(1, Ordering::SeqCst);
        self.events.lock().unwrap().push(format!("open {}", url));
        Ok(Box::new(FakeStream {
            url: url.to_string(),
            events: Arc::clone(&self.events),
            open_streams: Arc::clone(&self.open_streams),
        }))
    }
}

/// Hands out scripted transcripts; with an empty script it never answers.
#[derive(Default)]
pub struct FakeRecognizer {
    script: Mutex<VecDeque<Result<String, String>>>,
    hang_on_start: bool,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
}

impl FakeRecognizer {
    pub fn saying(transcripts: &[&str]) -> Self {
        let recognizer = Self::default();
        recognizer
            .script
            .lock()
            .unwrap()
            .extend(transcripts.iter().map(|t| Ok(t.to_string())));
        recognizer
    }

    pub fn failing(message: &str) -> Self {
        let recognizer = Self::default();
        recognizer.script.lock().unwrap().push_back(Err(message.to_string()));
        recognizer
    }

    pub fn silent() -> Self {
        Self::default()
    }

    /// `start` never completes.
    pub fn stuck_starting() -> Self {
        Self {
            hang_on_start: true,
            ..Self::default()
        }
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechRecognizer for FakeRecognizer {
    async fn start(&self, _locale: &str) -> Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.hang_on_start {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn transcript(&self) -> Result<String> {
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(ReaderError::Voice(message)),
            None => std::future::pending().await,
        }
    }
}
