//! Tilawa - Quran reader core
//!
//! Verse navigation over a remote Quran API with a bounded prefetch cache,
//! verse recitation, voice commands and translation search.

// Models must be defined first as every other module uses them
pub mod models;
pub mod error;
pub mod cache;
pub mod client;
pub mod store;
pub mod prefetch;
pub mod navigation;
pub mod audio;
pub mod voice;
pub mod search;
pub mod settings;
pub mod config;
pub mod logging;
pub mod state;

#[cfg(test)]
mod testing;

pub use error::{FetchError, ReaderError};
pub use state::Reader;
pub use models::{Chapter, Direction, NavigationPosition, SearchMatch, Verse, VerseKey};
pub use cache::VerseCache;
pub use client::{ApiClient, ContentSource};
pub use audio::{AudioBackend, AudioStream, PlaybackState, Player};
pub use voice::{parse_command, SpeechRecognizer, VoiceCommand, VoiceOutcome, VoiceState};
pub use search::SearchOutcome;
pub use settings::SettingsStore;
pub use config::{load_config, Config, ConfigError};
