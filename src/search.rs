//! Text search over verse translations

use crate::client::ContentSource;
use crate::error::FetchError;
use crate::models::SearchMatch;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SearchOutcome {
    /// No query entered
    #[default]
    Idle,
    /// The query ran and matched nothing
    Empty { query: String },
    Matches { query: String, matches: Vec<SearchMatch> },
}

impl SearchOutcome {
    pub fn is_idle(&self) -> bool {
        matches!(self, SearchOutcome::Idle)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, SearchOutcome::Empty { .. })
    }

    pub fn query(&self) -> Option<&str> {
        match self {
            SearchOutcome::Idle => None,
            SearchOutcome::Empty { query } | SearchOutcome::Matches { query, .. } => Some(query),
        }
    }

    pub fn matches(&self) -> &[SearchMatch] {
        match self {
            SearchOutcome::Matches { matches, .. } => matches,
            _ => &[],
        }
    }
}

fn whitespace() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace pattern"))
}

/// Trim and collapse inner whitespace; `None` for a blank query.
pub fn normalize_query(query: &str) -> Option<String> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(whitespace().replace_all(trimmed, " ").into_owned())
}

/// Run `query` against the source. A blank query never reaches the network.
pub async fn run_search(source: &dyn ContentSource, query: &str) -> Result<SearchOutcome, FetchError> {
    let Some(query) = normalize_query(query) else {
        return Ok(SearchOutcome::Idle);
    };

    let matches = source.search(&query).await?;
    debug!(%query, count = matches.len(), "search finished");
    if matches.is_empty() {
        Ok(SearchOutcome::Empty { query })
    } else {
        Ok(SearchOutcome::Matches { query, matches })
    }
}
