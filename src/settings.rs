//! Persistent reader settings: last open verse and search history

use crate::error::{ReaderError, Result};
use crate::models::VerseKey;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::warn;

/// Search history rotates at this many entries
pub const SEARCH_HISTORY_LIMIT: usize = 100;

const LAST_POSITION_KEY: &str = "last_position";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHistoryEntry {
    pub id: i64,
    pub query: String,
    pub result_count: i64,
    pub created_at: String,
}

pub struct SettingsStore {
    conn: Mutex<Connection>,
}

impl SettingsStore {
    /// Open (creating if missing) the settings database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ReaderError::Database(format!("Failed to create {:?}: {}", parent, e)))?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            -- Search history (auto-saved, rotates at 100 entries)
            CREATE TABLE IF NOT EXISTS search_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                query TEXT NOT NULL,
                result_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            -- App settings (key-value store)
            CREATE TABLE IF NOT EXISTS app_settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_search_history_created
            ON search_history(created_at DESC);
            "#,
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn()
            .query_row("SELECT value FROM app_settings WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO app_settings (key, value) VALUES (?1, ?2)",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }

    /// The verse that was open when the reader last moved. An unreadable
    /// stored value is treated as absent.
    pub fn last_position(&self) -> Result<Option<VerseKey>> {
        let Some(value) = self.get_setting(LAST_POSITION_KEY)? else {
            return Ok(None);
        };
        match value.parse() {
            Ok(key) => Ok(Some(key)),
            Err(e) => {
                warn!(%value, error = %e, "ignoring stored position");
                Ok(None)
            }
        }
    }

    pub fn save_position(&self, key: VerseKey) -> Result<()> {
        self.set_setting(LAST_POSITION_KEY, &key.to_string())
    }

    pub fn add_search(&self, query: &str, result_count: usize) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO search_history (query, result_count, created_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![query, result_count as i64, chrono::Utc::now().to_rfc3339()],
        )?;
        conn.execute(
            "DELETE FROM search_history WHERE id NOT IN
             (SELECT id FROM search_history ORDER BY id DESC LIMIT ?1)",
            [SEARCH_HISTORY_LIMIT as i64],
        )?;
        Ok(())
    }

    /// Most recent first.
    pub fn search_history(&self, limit: usize) -> Result<Vec<SearchHistoryEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, query, result_count, created_at FROM search_history ORDER BY id DESC LIMIT ?1",
        )?;
        let entries = stmt
            .query_map([limit as i64], |row| {
                Ok(SearchHistoryEntry {
                    id: row.get(0)?,
                    query: row.get(1)?,
                    result_count: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    pub fn clear_history(&self) -> Result<()> {
        self.conn().execute("DELETE FROM search_history", [])?;
        Ok(())
    }
}
