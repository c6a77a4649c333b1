//! Transcript store over the `interview_responses` table.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::sync::MutexGuard;

use insightloop_core::{InterviewStep, TranscriptRecord};

use crate::PersistenceError;

/// A stored interview response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptRow {
    pub id: i64,
    pub study_name: String,
    pub respondent_id: String,
    pub interview_json: String, // JSON array of steps
    pub summary_text: String,
    pub created_at: DateTime<Utc>,
}

impl TranscriptRow {
    /// Decode the stored step array.
    pub fn steps(&self) -> Result<Vec<InterviewStep>, PersistenceError> {
        Ok(serde_json::from_str(&self.interview_json)?)
    }
}

/// Filter options for listing transcripts.
#[derive(Debug, Default, Clone)]
pub struct TranscriptFilter {
    pub study_name: Option<String>,
    pub respondent_id: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Transcripts store with a borrowed connection.
pub struct Transcripts<'db> {
    conn: MutexGuard<'db, Connection>,
}

const COLUMNS: &str = "id, study_name, respondent_id, interview_json, summary_text, created_at";

impl<'db> Transcripts<'db> {
    pub(crate) fn new(conn: MutexGuard<'db, Connection>) -> Self {
        Self { conn }
    }

    /// Insert a finished transcript, returning its row id.
    pub fn save(&self, record: &TranscriptRecord) -> Result<i64, PersistenceError> {
        let interview_json = record.interview_json()?;

        self.conn.execute(
            r#"
            INSERT INTO interview_responses (study_name, respondent_id, interview_json, summary_text, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                record.study_name,
                record.respondent_id.as_str(),
                interview_json,
                record.summary_text(),
                record.completed_at.to_rfc3339(),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    pub fn get(&self, id: i64) -> Result<Option<TranscriptRow>, PersistenceError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM interview_responses WHERE id = ?1"),
                params![id],
                Self::row_to_record,
            )
            .optional()?;
        Ok(row)
    }

    /// List transcripts, newest first.
    pub fn list(&self, filter: &TranscriptFilter) -> Result<Vec<TranscriptRow>, PersistenceError> {
        let mut sql = format!("SELECT {COLUMNS} FROM interview_responses WHERE 1=1");
        let mut param_values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref study_name) = filter.study_name {
            sql.push_str(" AND study_name = ?");
            param_values.push(Box::new(study_name.clone()));
        }

        if let Some(ref respondent_id) = filter.respondent_id {
            sql.push_str(" AND respondent_id = ?");
            param_values.push(Box::new(respondent_id.clone()));
        }

        sql.push_str(" ORDER BY created_at DESC, id DESC");

        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        } else if filter.offset.is_some() {
            sql.push_str(" LIMIT -1");
        }

        if let Some(offset) = filter.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        let params: Vec<&dyn rusqlite::ToSql> = param_values.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params.as_slice(), Self::row_to_record)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }

        Ok(records)
    }

    /// Distinct study names with their transcript counts.
    pub fn list_studies(&self) -> Result<Vec<(String, usize)>, PersistenceError> {
        let mut stmt = self.conn.prepare(
            "SELECT study_name, COUNT(*) FROM interview_responses GROUP BY study_name ORDER BY study_name",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
        })?;

        let mut studies = Vec::new();
        for row in rows {
            studies.push(row?);
        }

        Ok(studies)
    }

    pub fn delete(&self, id: i64) -> Result<bool, PersistenceError> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM interview_responses WHERE id = ?1", params![id])?;
        Ok(rows_affected > 0)
    }

    fn row_to_record(row: &rusqlite::Row) -> Result<TranscriptRow, rusqlite::Error> {
        let created_at_str: String = row.get(5)?;

        Ok(TranscriptRow {
            id: row.get(0)?,
            study_name: row.get(1)?,
            respondent_id: row.get(2)?,
            interview_json: row.get(3)?,
            summary_text: row.get(4)?,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}
