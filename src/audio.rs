//! Verse recitation playback
//!
//! Platform audio output is reached through [`AudioBackend`]. The
//! [`Player`] owns at most one open stream: starting a verse stops and
//! releases whatever was playing before opening the next one.

use crate::error::{ReaderError, Result};
use crate::models::VerseKey;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

pub const DEFAULT_AUDIO_BASE_URL: &str = "https://cdn.islamic.network/quran/audio";
pub const DEFAULT_AUDIO_BITRATE: u32 = 128;
pub const DEFAULT_RECITER: &str = "ar.alafasy";

/// Opens playable streams from URLs.
#[async_trait]
pub trait AudioBackend: Send + Sync {
    async fn open(&self, url: &str) -> Result<Box<dyn AudioStream>>;
}

/// A loaded recitation. Dropping it releases the platform resource.
pub trait AudioStream: Send {
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self) -> Result<()>;
    fn stop(&mut self) -> Result<()>;
}

/// Maps a verse to the URL of its recitation.
pub type AudioResolver = Arc<dyn Fn(VerseKey) -> String + Send + Sync>;

/// `{base}/{bitrate}/{reciter}/{chapter}/{verse}.mp3`
pub fn recitation_url_resolver(base_url: &str, bitrate: u32, reciter: &str) -> AudioResolver {
    let prefix = format!("{}/{}/{}", base_url.trim_end_matches('/'), bitrate, reciter);
    Arc::new(move |key: VerseKey| format!("{}/{}/{}.mp3", prefix, key.chapter, key.verse))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "verse", rename_all = "snake_case")]
pub enum PlaybackState {
    Idle,
    Loading(VerseKey),
    Playing(VerseKey),
    Paused(VerseKey),
}

impl PlaybackState {
    pub fn key(&self) -> Option<VerseKey> {
        match self {
            PlaybackState::Idle => None,
            PlaybackState::Loading(key) | PlaybackState::Playing(key) | PlaybackState::Paused(key) => Some(*key),
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing(_))
    }
}

struct ActiveStream {
    key: VerseKey,
    stream: Box<dyn AudioStream>,
}

pub struct Player {
    backend: Arc<dyn AudioBackend>,
    resolver: AudioResolver,
    active: Mutex<Option<ActiveStream>>,
    state: watch::Sender<PlaybackState>,
}

impl Player {
    pub fn new(backend: Arc<dyn AudioBackend>, resolver: AudioResolver) -> Self {
        Self {
            backend,
            resolver,
            active: Mutex::new(None),
            state: watch::Sender::new(PlaybackState::Idle),
        }
    }

    pub fn state(&self) -> PlaybackState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state.subscribe()
    }

    pub fn url_for(&self, key: VerseKey) -> String {
        (self.resolver)(key)
    }

    fn release(slot: &mut Option<ActiveStream>) {
        if let Some(mut prior) = slot.take() {
            if let Err(e) = prior.stream.stop() {
                warn!(key = %prior.key, error = %e, "failed to stop stream");
            }
            debug!(key = %prior.key, "released stream");
        }
    }

    /// Drop the stream after a failure and surface it as a playback error.
    fn fail(&self, slot: &mut Option<ActiveStream>, err: ReaderError) -> ReaderError {
        Self::release(slot);
        self.state.send_replace(PlaybackState::Idle);
        match err {
            ReaderError::Playback(_) => err,
            other => ReaderError::Playback(other.to_string()),
        }
    }

    /// Start reciting `key` from the beginning.
    pub async fn play(&self, key: VerseKey) -> Result<()> {
        let mut active = self.active.lock().await;
        Self::release(&mut active);

        let url = self.url_for(key);
        if url.is_empty() {
            return Err(self.fail(&mut active, ReaderError::Playback(format!("no audio for verse {}", key))));
        }

        self.state.send_replace(PlaybackState::Loading(key));
        info!(%key, %url, "loading recitation");
        let mut stream = match self.backend.open(&url).await {
            Ok(stream) => stream,
            Err(e) => return Err(self.fail(&mut active, e)),
        };
        if let Err(e) = stream.play() {
            drop(stream);
            return Err(self.fail(&mut active, e));
        }

        *active = Some(ActiveStream { key, stream });
        self.state.send_replace(PlaybackState::Playing(key));
        Ok(())
    }

    pub async fn pause(&self) -> Result<()> {
        let mut active = self.active.lock().await;
        let PlaybackState::Playing(key) = self.state() else {
            return Ok(());
        };
        let paused = match active.as_mut() {
            Some(current) => current.stream.pause(),
            None => Ok(()),
        };
        match paused {
            Ok(()) => {
                self.state.send_replace(PlaybackState::Paused(key));
                Ok(())
            }
            Err(e) => Err(self.fail(&mut active, e)),
        }
    }

    pub async fn resume(&self) -> Result<()> {
        let mut active = self.active.lock().await;
        let PlaybackState::Paused(key) = self.state() else {
            return Ok(());
        };
        let resumed = match active.as_mut() {
            Some(current) => current.stream.play(),
            None => Err(ReaderError::Playback("no stream to resume".to_string())),
        };
        match resumed {
            Ok(()) => {
                self.state.send_replace(PlaybackState::Playing(key));
                Ok(())
            }
            Err(e) => Err(self.fail(&mut active, e)),
        }
    }

    pub async fn stop(&self) {
        let mut active = self.active.lock().await;
        Self::release(&mut active);
        self.state.send_replace(PlaybackState::Idle);
    }

    /// Pause when `key` is playing, resume when it is paused, otherwise
    /// start it. Returns the resulting state.
    pub async fn toggle(&self, key: VerseKey) -> Result<PlaybackState> {
        match self.state() {
            PlaybackState::Playing(current) if current == key => self.pause().await?,
            PlaybackState::Paused(current) if current == key => self.resume().await?,
            _ => self.play(key).await?,
        }
        Ok(self.state())
    }

    /// Called by the backend integration when a stream reaches its end.
    pub async fn finished(&self) {
        let mut active = self.active.lock().await;
        if let Some(done) = active.take() {
            debug!(key = %done.key, "recitation finished");
        }
        self.state.send_replace(PlaybackState::Idle);
    }
}
