//! Persistence for finished interviews.
//!
//! Provides a `Database` struct that owns the SQLite connection and the
//! [`TranscriptGateway`](insightloop_core::TranscriptGateway) implementations
//! the runner hands completed transcripts to.

mod error;
mod gateway;
mod transcripts;

pub use error::PersistenceError;
pub use gateway::{BridgeConfig, BridgeGateway, MockGateway, SqliteGateway, DEFAULT_TABLE};
pub use transcripts::{TranscriptFilter, TranscriptRow, Transcripts};

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// The main database struct that owns the SQLite connection.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the default location.
    ///
    /// The default location is `~/.local/share/insightloop/insightloop.db`.
    pub fn open() -> Result<Self, PersistenceError> {
        Self::open_at(&Self::default_path())
    }

    /// Open or create a database at a specific path.
    pub fn open_at(path: &Path) -> Result<Self, PersistenceError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).ok();
            }
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (useful for testing).
    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("insightloop")
            .join("insightloop.db")
    }

    /// Access the transcripts store.
    pub fn transcripts(&self) -> Transcripts<'_> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        Transcripts::new(conn)
    }

    fn init_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS interview_responses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                study_name TEXT NOT NULL,
                respondent_id TEXT NOT NULL,
                interview_json TEXT NOT NULL,
                summary_text TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_responses_study_name ON interview_responses(study_name);
            CREATE INDEX IF NOT EXISTS idx_responses_created_at ON interview_responses(created_at DESC);
            "#,
        )
    }
}
