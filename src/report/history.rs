//! Local cache of saved assessment reports using SQLite.
//!
//! Every successfully saved assessment is mirrored here so `viva reports`
//! can list past results without the persistence collaborator being
//! reachable.

use anyhow::Result;
use chrono::{DateTime, Local};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

use crate::report::record::AssessmentRecord;

/// One cached report row.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub id: i64,
    /// Identifier assigned by the persistence collaborator, when the save
    /// reached it.
    pub remote_id: Option<String>,
    pub topic: String,
    pub question_count: usize,
    pub overall_score: u32,
    /// Serialized [`AssessmentRecord`].
    pub data: String,
    pub created_at: DateTime<Local>,
}

/// Manages the local report history database.
pub struct ReportHistory {
    database_path: PathBuf,
    connection: Option<Connection>,
}

impl ReportHistory {
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        Ok(Self {
            database_path: data_dir.join("report_history.db"),
            connection: None,
        })
    }

    /// Opens the history in the default data directory.
    pub fn open_default() -> Result<Self> {
        let data_dir = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?
            .join(".local")
            .join("share")
            .join("viva");
        Self::new(&data_dir)
    }

    fn get_connection(&mut self) -> Result<&Connection> {
        if self.connection.is_none() {
            let connection = Connection::open(&self.database_path)?;
            connection.execute(
                "CREATE TABLE IF NOT EXISTS reports (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    remote_id TEXT,
                    topic TEXT NOT NULL,
                    question_count INTEGER NOT NULL,
                    overall_score INTEGER NOT NULL,
                    data TEXT NOT NULL,
                    created_at TEXT NOT NULL
                )",
                [],
            )?;
            self.connection = Some(connection);
        }
        Ok(self.connection.as_ref().unwrap())
    }

    /// Caches a saved assessment. Returns the local row id.
    pub fn record(&mut self, remote_id: Option<&str>, record: &AssessmentRecord) -> Result<i64> {
        let data = record.to_json()?;
        let created_at = Local::now().to_rfc3339();
        let connection = self.get_connection()?;

        connection.execute(
            "INSERT INTO reports (remote_id, topic, question_count, overall_score, data, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                remote_id,
                record.setup.topic,
                record.questions.len() as i64,
                record.overall_score as i64,
                data,
                created_at
            ],
        )?;
        let id = connection.last_insert_rowid();
        tracing::debug!("Report cached locally with id {}", id);
        Ok(id)
    }

    /// All cached reports, newest first.
    pub fn entries(&mut self) -> Result<Vec<HistoryEntry>> {
        let connection = self.get_connection()?;
        let mut statement = connection.prepare(
            "SELECT id, remote_id, topic, question_count, overall_score, data, created_at
             FROM reports ORDER BY id DESC",
        )?;

        let rows = statement.query_map([], row_to_entry)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    /// One cached report by local row id.
    pub fn get(&mut self, id: i64) -> Result<Option<HistoryEntry>> {
        let connection = self.get_connection()?;
        let entry = connection
            .query_row(
                "SELECT id, remote_id, topic, question_count, overall_score, data, created_at
                 FROM reports WHERE id = ?1",
                params![id],
                row_to_entry,
            )
            .optional()?;
        Ok(entry)
    }

    /// Drops the cached row for a remotely deleted assessment.
    pub fn forget_remote(&mut self, remote_id: &str) -> Result<()> {
        let connection = self.get_connection()?;
        connection.execute(
            "DELETE FROM reports WHERE remote_id = ?1",
            params![remote_id],
        )?;
        Ok(())
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<HistoryEntry> {
    let created_at: String = row.get(6)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|t| t.with_timezone(&Local))
        .unwrap_or_else(|_| Local::now());
    Ok(HistoryEntry {
        id: row.get(0)?,
        remote_id: row.get(1)?,
        topic: row.get(2)?,
        question_count: row.get::<_, i64>(3)? as usize,
        overall_score: row.get::<_, i64>(4)? as u32,
        data: row.get(5)?,
        created_at,
    })
}
