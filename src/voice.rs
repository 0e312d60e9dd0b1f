//! Voice commands
//!
//! A listening session asks the platform recognizer for one best-guess
//! transcript and maps it onto a reader command. Sessions stop on their
//! own after a fixed timeout whether or not the recognizer has answered.

use crate::error::{ReaderError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub const DEFAULT_VOICE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_LOCALE: &str = "en-US";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceCommand {
    Next,
    Previous,
    Play,
    Stop,
}

/// Checked in order; the first rule with a keyword contained in the
/// transcript wins.
const COMMAND_RULES: &[(VoiceCommand, &[&str])] = &[
    (VoiceCommand::Next, &["next", "after"]),
    (VoiceCommand::Previous, &["previous", "before", "back"]),
    (VoiceCommand::Play, &["play", "start"]),
    (VoiceCommand::Stop, &["stop", "pause"]),
];

pub fn parse_command(transcript: &str) -> Option<VoiceCommand> {
    let lowered = transcript.to_lowercase();
    COMMAND_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(command, _)| *command)
}

/// Platform speech-to-text.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn start(&self, locale: &str) -> Result<()>;

    async fn stop(&self) -> Result<()>;

    /// Best guess for what was said since `start`.
    async fn transcript(&self) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceState {
    Idle,
    Listening,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VoiceOutcome {
    Command { command: VoiceCommand, transcript: String },
    Unrecognized { transcript: String },
    TimedOut,
    Cancelled,
    /// A session was already running; nothing was started.
    Busy,
}

pub struct VoiceSession {
    recognizer: Arc<dyn SpeechRecognizer>,
    locale: String,
    timeout: Duration,
    state: watch::Sender<VoiceState>,
    cancel: watch::Sender<bool>,
}

impl VoiceSession {
    pub fn new(recognizer: Arc<dyn SpeechRecognizer>, locale: &str, timeout: Duration) -> Self {
        Self {
            recognizer,
            locale: locale.to_string(),
            timeout,
            state: watch::Sender::new(VoiceState::Idle),
            cancel: watch::Sender::new(false),
        }
    }

    pub fn state(&self) -> VoiceState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<VoiceState> {
        self.state.subscribe()
    }

    /// Listen for one command.
    ///
    /// Returns `Busy` if a session is already running. The timeout covers
    /// starting the recognizer as well as waiting for the transcript. Every
    /// other path, including dropping the returned future, ends with the
    /// recognizer stopped and the session back to `Idle`.
    pub async fn listen(&self) -> Result<VoiceOutcome> {
        let started = self.state.send_if_modified(|state| match state {
            VoiceState::Idle => {
                *state = VoiceState::Listening;
                true
            }
            VoiceState::Listening => false,
        });
        if !started {
            return Ok(VoiceOutcome::Busy);
        }
        let mut guard = ListeningGuard { session: self, stopped: false };

        let deadline = Instant::now() + self.timeout;
        self.cancel.send_replace(false);
        let mut cancel_rx = self.cancel.subscribe();
        info!("listening for voice command");

        let heard = async {
            self.recognizer.start(&self.locale).await?;
            self.recognizer.transcript().await
        };
        let outcome = tokio::select! {
            heard = tokio::time::timeout_at(deadline, heard) => match heard {
                Ok(Ok(transcript)) => {
                    debug!(%transcript, "voice transcript");
                    Ok(match parse_command(&transcript) {
                        Some(command) => VoiceOutcome::Command { command, transcript },
                        None => VoiceOutcome::Unrecognized { transcript },
                    })
                }
                Ok(Err(e)) => Err(into_voice_error(e)),
                Err(_) => {
                    debug!(timeout = ?self.timeout, "voice session timed out");
                    Ok(VoiceOutcome::TimedOut)
                }
            },
            _ = cancelled(&mut cancel_rx) => Ok(VoiceOutcome::Cancelled),
        };

        if let Err(e) = self.recognizer.stop().await {
            warn!(error = %e, "failed to stop recognizer");
        }
        guard.stopped = true;
        drop(guard);
        outcome
    }

    /// Stop a running session early.
    pub fn cancel(&self) {
        if self.state() == VoiceState::Listening {
            self.cancel.send_replace(true);
        }
    }
}

/// Returns the session to `Idle` however `listen` ends. A session dropped
/// before the recognizer was stopped gets a background stop.
struct ListeningGuard<'a> {
    session: &'a VoiceSession,
    stopped: bool,
}

impl Drop for ListeningGuard<'_> {
    fn drop(&mut self) {
        if !self.stopped {
            debug!("voice session dropped while listening");
            let recognizer = Arc::clone(&self.session.recognizer);
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    if let Err(e) = recognizer.stop().await {
                        warn!(error = %e, "failed to stop recognizer");
                    }
                });
            }
        }
        self.session.state.send_replace(VoiceState::Idle);
    }
}

async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return std::future::pending().await;
        }
    }
}

fn into_voice_error(err: ReaderError) -> ReaderError {
    match err {
        ReaderError::Voice(_) => err,
        other => ReaderError::Voice(other.to_string()),
    }
}
