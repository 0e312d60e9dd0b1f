//! Error types for Tilawa

use thiserror::Error;

/// Failure talking to the remote content source.
///
/// `Clone` because one failed fetch is handed to every caller waiting on
/// the same in-flight request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Server returned HTTP {0}")]
    Status(u16),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(err.to_string())
        } else if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Verse {verse} does not belong to chapter {chapter}")]
    InconsistentPosition { chapter: u16, verse: String },

    #[error("Voice recognition error: {0}")]
    Voice(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Chapter not found: {0}")]
    ChapterNotFound(u16),

    #[error("No verse is open")]
    NoPosition,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl ReaderError {
    /// Message shown to the reader. Every failure is recoverable by
    /// repeating the action, so each message prompts a retry.
    pub fn user_message(&self) -> String {
        match self {
            ReaderError::Fetch(FetchError::Network(_)) => {
                "Connection error. Please check your internet connection and try again.".to_string()
            }
            ReaderError::Fetch(FetchError::Timeout(_)) => {
                "The request timed out. Please try again.".to_string()
            }
            ReaderError::Fetch(_) => "Failed to load verses. Please try again.".to_string(),
            ReaderError::Voice(_) => "Voice command failed. Please try again.".to_string(),
            ReaderError::Playback(_) => "Failed to play audio. Please try again.".to_string(),
            ReaderError::ChapterNotFound(n) => format!("Failed to load chapter {}", n),
            ReaderError::NoPosition => "Open a chapter first.".to_string(),
            other => format!("{}. Please try again.", other),
        }
    }
}

impl From<rusqlite::Error> for ReaderError {
    fn from(err: rusqlite::Error) -> Self {
        ReaderError::Database(err.to_string())
    }
}

impl serde::Serialize for ReaderError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T, E = ReaderError> = std::result::Result<T, E>;
