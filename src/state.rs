//! Reader session state

use crate::audio::{recitation_url_resolver, AudioBackend, PlaybackState, Player};
use crate::cache::VerseCache;
use crate::client::ContentSource;
use crate::config::Config;
use crate::error::{ReaderError, Result};
use crate::models::{Chapter, Direction, NavigationPosition, SearchMatch, Verse, VerseKey};
use crate::navigation::Navigator;
use crate::search::{run_search, SearchOutcome};
use crate::settings::{SearchHistoryEntry, SettingsStore};
use crate::store::{ChapterPage, VerseStore};
use crate::voice::{parse_command, SpeechRecognizer, VoiceCommand, VoiceOutcome, VoiceSession, VoiceState};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{error, info, warn};

/// One reading session: the open chapter and verse, recitation, voice
/// commands and search. Constructed once and shared by handle.
pub struct Reader {
    source: Arc<dyn ContentSource>,
    store: Arc<VerseStore>,
    navigator: Navigator,
    player: Player,
    voice: Option<VoiceSession>,
    settings: Option<SettingsStore>,
    search: RwLock<SearchOutcome>,
    error: RwLock<Option<String>>,
}

impl Reader {
    pub fn new(
        config: &Config,
        source: Arc<dyn ContentSource>,
        audio: Arc<dyn AudioBackend>,
        recognizer: Option<Arc<dyn SpeechRecognizer>>,
        settings: Option<SettingsStore>,
    ) -> Self {
        let store = Arc::new(VerseStore::new(Arc::new(VerseCache::new(config.cache_capacity))));
        let navigator = Navigator::new(
            Arc::clone(&store),
            Arc::clone(&source),
            config.page_size,
            config.prefetch_count,
        );
        let resolver = recitation_url_resolver(&config.audio_base_url, config.audio_bitrate, &config.reciter);
        let voice = recognizer.map(|r| VoiceSession::new(r, &config.voice_locale, config.voice_timeout));

        Self {
            source,
            store,
            navigator,
            player: Player::new(audio, resolver),
            voice,
            settings,
            search: RwLock::new(SearchOutcome::Idle),
            error: RwLock::new(None),
        }
    }

    /// Record the outcome of a reader action: a failure replaces the shown
    /// error, a success clears it.
    fn surface<T>(&self, result: Result<T>) -> Result<T> {
        let message = result.as_ref().err().map(ReaderError::user_message);
        self.surface_with(result, message)
    }

    fn surface_as<T>(&self, result: Result<T>, message: &str) -> Result<T> {
        self.surface_with(result, Some(message.to_string()))
    }

    fn surface_with<T>(&self, result: Result<T>, message: Option<String>) -> Result<T> {
        let shown = match &result {
            Ok(_) => None,
            Err(e) => {
                error!(error = %e, "reader action failed");
                message
            }
        };
        *self.error.write().unwrap_or_else(PoisonError::into_inner) = shown;
        result
    }

    /// Last failure, phrased for the reader.
    pub fn error(&self) -> Option<String> {
        self.error.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn clear_error(&self) {
        *self.error.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn remember_position(&self) {
        let (Some(settings), Some(position)) = (&self.settings, self.store.position()) else {
            return;
        };
        if let Err(e) = settings.save_position(position.key()) {
            warn!(error = %e, "failed to save reading position");
        }
    }

    /// Fetch the chapter list and open the last read verse, or the first
    /// chapter when there is none.
    pub async fn initialize(&self) -> Result<()> {
        let result = self.open_initial_position().await;
        self.surface_as(result, "Failed to initialize app. Please try again.")
    }

    async fn open_initial_position(&self) -> Result<()> {
        if self.store.chapters().is_empty() {
            let chapters = self.source.chapters().await?;
            info!(count = chapters.len(), "loaded chapter list");
            self.store.set_chapters(chapters);
        }

        let saved = match &self.settings {
            Some(settings) => settings.last_position().unwrap_or_else(|e| {
                warn!(error = %e, "failed to read saved position");
                None
            }),
            None => None,
        };
        if let Some(key) = saved {
            match self.navigator.load_chapter(key.chapter).await {
                Ok(_) => {
                    if key.verse > 1 {
                        if let Err(e) = self.navigator.jump_to_key(key).await {
                            warn!(%key, error = %e, "saved position could not be restored");
                        }
                    }
                    return Ok(());
                }
                Err(e) => warn!(%key, error = %e, "saved chapter could not be opened"),
            }
        }

        let first = self
            .store
            .chapters()
            .first()
            .map(|c| c.number)
            .ok_or_else(|| ReaderError::Other("The chapter list is empty".to_string()))?;
        self.navigator.load_chapter(first).await?;
        Ok(())
    }

    pub fn chapters(&self) -> &[Chapter] {
        self.store.chapters()
    }

    pub fn position(&self) -> Option<NavigationPosition> {
        self.store.position()
    }

    pub fn current_verse(&self) -> Option<Arc<Verse>> {
        self.store.current_verse()
    }

    pub fn chapter_page(&self) -> ChapterPage {
        self.store.chapter_page()
    }

    /// (cached verses, capacity)
    pub fn cache_stats(&self) -> (usize, usize) {
        self.store.cache().stats()
    }

    pub async fn load_chapter(&self, number: u16) -> Result<Arc<Verse>> {
        let verse = self.surface(self.navigator.load_chapter(number).await)?;
        self.remember_position();
        Ok(verse)
    }

    pub async fn load_more_verses(&self) -> Result<usize> {
        self.surface(self.navigator.load_next_page().await)
    }

    pub async fn next_verse(&self) -> Result<Arc<Verse>> {
        self.advance(Direction::Next).await
    }

    pub async fn previous_verse(&self) -> Result<Arc<Verse>> {
        self.advance(Direction::Previous).await
    }

    async fn advance(&self, direction: Direction) -> Result<Arc<Verse>> {
        let verse = self.surface(self.navigator.advance(direction).await)?;
        self.remember_position();
        Ok(verse)
    }

    pub async fn jump_to_verse(&self, verse: Arc<Verse>) -> Result<()> {
        self.surface(self.navigator.jump_to_verse(verse).await)?;
        self.remember_position();
        Ok(())
    }

    pub async fn jump_to_key(&self, key: VerseKey) -> Result<Arc<Verse>> {
        let verse = self.surface(self.navigator.jump_to_key(key).await)?;
        self.remember_position();
        Ok(verse)
    }

    pub async fn select_search_match(&self, found: &SearchMatch) -> Result<Arc<Verse>> {
        self.jump_to_key(found.key).await
    }

    /// Fetch the missing translation of the open verse.
    pub async fn complete_translation(&self) -> Result<Arc<Verse>> {
        let key = self.store.position().ok_or(ReaderError::NoPosition).map(|p| p.key());
        let key = self.surface(key)?;
        self.surface(self.navigator.complete_translation(key).await)
    }

    // ============ Playback ============

    pub fn playback_state(&self) -> PlaybackState {
        self.player.state()
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Play or pause the open verse.
    pub async fn toggle_playback(&self) -> Result<PlaybackState> {
        let key = self.store.position().ok_or(ReaderError::NoPosition).map(|p| p.key());
        let key = self.surface(key)?;
        self.surface(self.player.toggle(key).await)
    }

    pub async fn stop_playback(&self) {
        self.player.stop().await;
    }

    // ============ Voice ============

    pub fn voice_state(&self) -> VoiceState {
        self.voice.as_ref().map_or(VoiceState::Idle, VoiceSession::state)
    }

    /// Listen for one spoken command and carry it out.
    pub async fn listen(&self) -> Result<VoiceOutcome> {
        let Some(voice) = &self.voice else {
            return self.surface(Err(ReaderError::Voice("Voice recognition is not available".to_string())));
        };
        let outcome = self.surface(voice.listen().await)?;
        if let VoiceOutcome::Command { command, .. } = &outcome {
            self.apply_voice_command(*command).await?;
        }
        Ok(outcome)
    }

    pub fn cancel_listening(&self) {
        if let Some(voice) = &self.voice {
            voice.cancel();
        }
    }

    /// Carry out a transcript obtained outside a listening session.
    pub async fn handle_transcript(&self, transcript: &str) -> Result<Option<VoiceCommand>> {
        let command = parse_command(transcript);
        if let Some(command) = command {
            self.apply_voice_command(command).await?;
        }
        Ok(command)
    }

    pub async fn apply_voice_command(&self, command: VoiceCommand) -> Result<()> {
        info!(?command, "voice command");
        match command {
            VoiceCommand::Next => self.next_verse().await.map(|_| ()),
            VoiceCommand::Previous => self.previous_verse().await.map(|_| ()),
            VoiceCommand::Play => {
                if self.playback_state().is_playing() {
                    return Ok(());
                }
                self.toggle_playback().await.map(|_| ())
            }
            VoiceCommand::Stop => {
                if !self.playback_state().is_playing() {
                    return Ok(());
                }
                self.surface(self.player.pause().await)
            }
        }
    }

    // ============ Search ============

    pub fn search_outcome(&self) -> SearchOutcome {
        self.search.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Run a search. On failure the previous outcome is kept.
    pub async fn search(&self, query: &str) -> Result<SearchOutcome> {
        let outcome = self.surface_as(
            run_search(self.source.as_ref(), query).await.map_err(ReaderError::from),
            "Failed to search. Please try again.",
        )?;

        if let (Some(settings), Some(query)) = (&self.settings, outcome.query()) {
            if let Err(e) = settings.add_search(query, outcome.matches().len()) {
                warn!(error = %e, "failed to record search history");
            }
        }
        *self.search.write().unwrap_or_else(PoisonError::into_inner) = outcome.clone();
        Ok(outcome)
    }

    pub fn search_history(&self, limit: usize) -> Result<Vec<SearchHistoryEntry>> {
        match &self.settings {
            Some(settings) => settings.search_history(limit),
            None => Ok(Vec::new()),
        }
    }
}
