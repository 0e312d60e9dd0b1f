//! Tilawa - Quran reader
//! Terminal front end over the reader core

mod commands;

use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use commands::Command;
use std::path::PathBuf;
use std::sync::Arc;
use tilawa_lib::audio::{AudioBackend, AudioStream};
use tilawa_lib::client::ApiClient;
use tilawa_lib::config::load_config;
use tilawa_lib::error::Result as ReaderResult;
use tilawa_lib::logging::{init_logging, DEFAULT_LOG_FILTER};
use tilawa_lib::settings::SettingsStore;
use tilawa_lib::state::Reader;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "tilawa", version, about = "Read and listen to the Quran verse by verse")]
struct Args {
    /// Config file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where settings and history are stored
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Translation edition, e.g. en.sahih
    #[arg(long)]
    translation: Option<String>,
}

/// Terminals have no audio output; streams print the recitation URL.
struct AnnouncingBackend;

struct AnnouncedStream {
    url: String,
}

#[async_trait]
impl AudioBackend for AnnouncingBackend {
    async fn open(&self, url: &str) -> ReaderResult<Box<dyn AudioStream>> {
        Ok(Box::new(AnnouncedStream { url: url.to_string() }))
    }
}

impl AudioStream for AnnouncedStream {
    fn play(&mut self) -> ReaderResult<()> {
        println!("playing {}", self.url);
        Ok(())
    }

    fn pause(&mut self) -> ReaderResult<()> {
        println!("paused {}", self.url);
        Ok(())
    }

    fn stop(&mut self) -> ReaderResult<()> {
        println!("stopped {}", self.url);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(DEFAULT_LOG_FILTER);
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref()).context("Failed to load config")?;
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    if let Some(translation) = args.translation {
        config.translation = translation;
    }
    info!(data_dir = ?config.data_dir, translation = %config.translation, "starting");

    let client = ApiClient::new(&config.api_base_url, &config.translation, config.request_timeout)
        .context("Failed to build HTTP client")?;

    // The reader works without persistence if the database can't be opened
    let settings = match SettingsStore::open(&config.settings_db_path()) {
        Ok(settings) => Some(settings),
        Err(e) => {
            warn!(error = %e, "settings unavailable, position and history won't be saved");
            None
        }
    };

    let reader = Reader::new(&config, Arc::new(client), Arc::new(AnnouncingBackend), None, settings);
    if let Err(e) = reader.initialize().await {
        eprintln!("{}", reader.error().unwrap_or_else(|| e.to_string()));
    } else if let Some(verse) = reader.current_verse() {
        println!("{}", commands::format_verse(&verse));
    }
    println!("Type \"help\" for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        let command = match commands::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                eprintln!("{}", message);
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        match commands::execute(&reader, command).await {
            Ok(output) => println!("{}", output),
            Err(e) => {
                let message = reader.error().unwrap_or_else(|| e.user_message());
                eprintln!("{}", message);
                reader.clear_error();
            }
        }
    }

    reader.stop_playback().await;
    Ok(())
}
