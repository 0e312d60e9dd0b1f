//! Terminal commands for the reader

use std::fmt::Write as _;
use std::sync::Arc;
use tilawa_lib::error::ReaderError;
use tilawa_lib::models::{Verse, VerseKey};
use tilawa_lib::search::SearchOutcome;
use tilawa_lib::state::Reader;

pub const HELP: &str = "\
commands:
  next | n            next verse
  prev | p            previous verse
  chapter N           open chapter N
  goto C:V            open a verse
  more                list more verses of the open chapter
  search QUERY        search translations
  open N              open the Nth search result
  play                play or pause the open verse
  stop                stop playback
  say TEXT            run TEXT as a voice command
  translate           fetch a missing translation
  chapters            list chapters
  history             recent searches
  stats               cache usage
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Next,
    Previous,
    Chapter(u16),
    Goto(VerseKey),
    More,
    Search(String),
    Open(usize),
    Play,
    Stop,
    Say(String),
    Translate,
    Chapters,
    History,
    Stats,
    Help,
    Quit,
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_lowercase().as_str() {
        "next" | "n" => Command::Next,
        "prev" | "previous" | "p" => Command::Previous,
        "chapter" | "c" => Command::Chapter(
            rest.parse()
                .map_err(|_| format!("expected a chapter number, got {:?}", rest))?,
        ),
        "goto" | "g" => Command::Goto(rest.parse().map_err(|e| format!("{}", e))?),
        "more" => Command::More,
        "search" | "s" => Command::Search(rest.to_string()),
        "open" | "o" => match rest.parse::<usize>() {
            Ok(n) if n > 0 => Command::Open(n),
            _ => return Err(format!("expected a result number, got {:?}", rest)),
        },
        "play" => Command::Play,
        "stop" => Command::Stop,
        "say" => Command::Say(rest.to_string()),
        "translate" | "t" => Command::Translate,
        "chapters" => Command::Chapters,
        "history" => Command::History,
        "stats" => Command::Stats,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(format!("unknown command {:?} (try \"help\")", other)),
    };
    Ok(Some(command))
}

pub fn format_verse(verse: &Verse) -> String {
    let mut out = format!("[{}] {}", verse.key, verse.arabic_text);
    match &verse.translation {
        Some(translation) => {
            let _ = write!(out, "\n    {}", translation);
        }
        None => out.push_str("\n    (no translation, use \"translate\")"),
    }
    out
}

fn format_search(outcome: &SearchOutcome) -> String {
    match outcome {
        SearchOutcome::Idle => "Enter a search query.".to_string(),
        SearchOutcome::Empty { query } => format!("No verses match {:?}.", query),
        SearchOutcome::Matches { query, matches } => {
            let mut out = format!("{} matches for {:?}:", matches.len(), query);
            for (i, m) in matches.iter().enumerate() {
                let _ = write!(out, "\n  {:>3}. [{}] {} - {}", i + 1, m.key, m.chapter_english_name, m.text);
            }
            out
        }
    }
}

fn current(reader: &Reader) -> Result<Arc<Verse>, ReaderError> {
    reader.current_verse().ok_or(ReaderError::NoPosition)
}

/// Carry out `command` and return the text to print.
pub async fn execute(reader: &Reader, command: Command) -> Result<String, ReaderError> {
    match command {
        Command::Next => Ok(format_verse(&*reader.next_verse().await?)),
        Command::Previous => Ok(format_verse(&*reader.previous_verse().await?)),
        Command::Chapter(n) => Ok(format_verse(&*reader.load_chapter(n).await?)),
        Command::Goto(key) => Ok(format_verse(&*reader.jump_to_key(key).await?)),
        Command::More => {
            let added = reader.load_more_verses().await?;
            let page = reader.chapter_page();
            if added == 0 {
                return Ok(format!("All {} verses of chapter {} are listed.", page.verses.len(), page.chapter));
            }
            let listed = page.verses[page.verses.len() - added..]
                .iter()
                .map(|v| format_verse(v))
                .collect::<Vec<_>>();
            Ok(listed.join("\n"))
        }
        Command::Search(query) => Ok(format_search(&reader.search(&query).await?)),
        Command::Open(n) => {
            let outcome = reader.search_outcome();
            let found = outcome
                .matches()
                .get(n - 1)
                .ok_or_else(|| ReaderError::Other(format!("No search result {}", n)))?;
            Ok(format_verse(&*reader.select_search_match(found).await?))
        }
        Command::Play => Ok(format!("{:?}", reader.toggle_playback().await?)),
        Command::Stop => {
            reader.stop_playback().await;
            Ok("Stopped.".to_string())
        }
        Command::Say(text) => match reader.handle_transcript(&text).await? {
            Some(command) => Ok(format!("{:?}: {}", command, format_verse(&*current(reader)?))),
            None => Ok(format!("Did not understand {:?}.", text)),
        },
        Command::Translate => Ok(format_verse(&*reader.complete_translation().await?)),
        Command::Chapters => Ok(reader
            .chapters()
            .iter()
            .map(|c| format!("{:>3}. {} ({}) - {} verses", c.number, c.english_name, c.name, c.verse_count))
            .collect::<Vec<_>>()
            .join("\n")),
        Command::History => {
            let history = reader.search_history(20)?;
            if history.is_empty() {
                return Ok("No searches yet.".to_string());
            }
            Ok(history
                .iter()
                .map(|h| format!("{}  {} ({} results)", h.created_at, h.query, h.result_count))
                .collect::<Vec<_>>()
                .join("\n"))
        }
        Command::Stats => {
            let (len, cap) = reader.cache_stats();
            Ok(format!("{} of {} verses cached", len, cap))
        }
        Command::Help => Ok(HELP.to_string()),
        Command::Quit => Ok(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse("  ").unwrap(), None);
        assert_eq!(parse("n").unwrap(), Some(Command::Next));
        assert_eq!(parse("chapter 36").unwrap(), Some(Command::Chapter(36)));
        assert_eq!(parse("goto 2:255").unwrap(), Some(Command::Goto(VerseKey::new(2, 255))));
        assert_eq!(
            parse("search  day of judgment").unwrap(),
            Some(Command::Search("day of judgment".to_string()))
        );
        assert_eq!(parse("SAY next please").unwrap(), Some(Command::Say("next please".to_string())));
    }

    #[test]
    fn test_parse_rejects_bad_arguments() {
        assert!(parse("chapter").is_err());
        assert!(parse("goto 115:1").is_err());
        assert!(parse("open 0").is_err());
        assert!(parse("dance").is_err());
    }

    #[test]
    fn test_format_verse_without_translation() {
        let verse = Verse {
            key: VerseKey::new(1, 1),
            number: 1,
            arabic_text: "بِسْمِ اللَّهِ".to_string(),
            translation: None,
        };
        assert!(format_verse(&verse).contains("translate"));
    }
}
