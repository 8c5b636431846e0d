//! SQLite report store.
//!
//! Each analysis is one row in `analyses` (summary columns plus the full
//! JSON document) with one row per report in `agent_reports`. The async
//! [`SqliteReportSink`] opens the store on a blocking thread per call, since
//! `rusqlite::Connection` is not `Sync`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use super::{AnalysisSummary, ReportSink};
use crate::agent::report::Analysis;
use crate::error::StorageError;

/// Default database location relative to the working directory.
pub const DEFAULT_DB_PATH: &str = ".pressroom/analyses.db";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS analyses (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    document_id      TEXT    NOT NULL,
    title            TEXT    NOT NULL,
    source_url       TEXT    NOT NULL,
    final_verdict    TEXT    NOT NULL,
    agents_completed INTEGER NOT NULL,
    agents_failed    INTEGER NOT NULL,
    total_tokens     INTEGER NOT NULL,
    elapsed_ms       INTEGER NOT NULL,
    created_at       TEXT    NOT NULL,
    analysis_json    TEXT    NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_analyses_document ON analyses(document_id);

CREATE TABLE IF NOT EXISTS agent_reports (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    analysis_id INTEGER NOT NULL REFERENCES analyses(id) ON DELETE CASCADE,
    position    INTEGER NOT NULL,
    agent_name  TEXT    NOT NULL,
    icon        TEXT    NOT NULL,
    status      TEXT    NOT NULL,
    content     TEXT    NOT NULL,
    error       TEXT
);
CREATE INDEX IF NOT EXISTS idx_agent_reports_analysis ON agent_reports(analysis_id);
";

fn to_i64<T: TryInto<i64>>(value: T) -> i64 {
    value.try_into().unwrap_or(i64::MAX)
}

fn to_usize(value: i64) -> usize {
    usize::try_from(value).unwrap_or_default()
}

/// Synchronous store over one SQLite connection.
#[derive(Debug)]
pub struct ReportStore {
    conn: Connection,
}

impl ReportStore {
    /// Opens (creating if needed) the database at `path` and ensures the schema.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the parent directory cannot be created or
    /// the database cannot be opened.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    /// Opens an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] if SQLite fails.
    pub fn in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Stores an analysis with its reports in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on serialization or SQLite failure.
    pub fn save(&mut self, analysis: &Analysis) -> Result<i64, StorageError> {
        let json = serde_json::to_string(analysis)?;
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO analyses
             (document_id, title, source_url, final_verdict, agents_completed,
              agents_failed, total_tokens, elapsed_ms, created_at, analysis_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                analysis.document_id,
                analysis.title,
                analysis.source_url,
                analysis.final_verdict,
                to_i64(analysis.agents_completed),
                to_i64(analysis.agents_failed),
                i64::from(analysis.total_tokens),
                to_i64(analysis.elapsed_ms),
                analysis.created_at.to_rfc3339(),
                json,
            ],
        )?;
        let id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO agent_reports
                 (analysis_id, position, agent_name, icon, status, content, error)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for (position, report) in analysis.reports.iter().enumerate() {
                stmt.execute(params![
                    id,
                    to_i64(position),
                    report.agent_name,
                    report.icon,
                    report.status.as_str(),
                    report.content,
                    report.error,
                ])?;
            }
        }

        tx.commit()?;
        debug!(id, document = %analysis.document_id, "analysis stored");
        Ok(id)
    }

    /// Lists the most recent analyses, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on SQLite failure or a corrupt timestamp.
    pub fn list(&self, limit: usize) -> Result<Vec<AnalysisSummary>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, document_id, title, agents_completed, agents_failed, created_at
             FROM analyses
             ORDER BY id DESC
             LIMIT ?1",
        )?;

        let rows = stmt
            .query_map(params![to_i64(limit)], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, document_id, title, completed, failed, created_at)| {
                Ok(AnalysisSummary {
                    id,
                    document_id,
                    title,
                    agents_completed: to_usize(completed),
                    agents_failed: to_usize(failed),
                    created_at: parse_timestamp(&created_at)?,
                })
            })
            .collect()
    }

    /// Loads a stored analysis.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::AnalysisNotFound`] if no row has this id.
    pub fn get(&self, id: i64) -> Result<Analysis, StorageError> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT analysis_json FROM analyses WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        let json = json.ok_or(StorageError::AnalysisNotFound { id })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Number of report rows stored for an analysis.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] on SQLite failure.
    pub fn report_count(&self, analysis_id: i64) -> Result<usize, StorageError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM agent_reports WHERE analysis_id = ?1",
            params![analysis_id],
            |row| row.get(0),
        )?;
        Ok(to_usize(count))
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::CorruptRow {
            message: format!("timestamp '{value}': {e}"),
        })
}

/// [`ReportSink`] backed by a SQLite file.
#[derive(Debug, Clone)]
pub struct SqliteReportSink {
    db_path: PathBuf,
}

impl SqliteReportSink {
    /// Creates a sink for the database at `db_path`.
    #[must_use]
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    /// Database path.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Lists recent analyses without blocking the runtime.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on database or task failure.
    pub async fn list(&self, limit: usize) -> Result<Vec<AnalysisSummary>, StorageError> {
        let path = self.db_path.clone();
        run_blocking(move || ReportStore::open(&path)?.list(limit)).await
    }

    /// Loads a stored analysis without blocking the runtime.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on database or task failure.
    pub async fn get(&self, id: i64) -> Result<Analysis, StorageError> {
        let path = self.db_path.clone();
        run_blocking(move || ReportStore::open(&path)?.get(id)).await
    }
}

#[async_trait]
impl ReportSink for SqliteReportSink {
    async fn persist(&self, analysis: &Analysis) -> Result<i64, StorageError> {
        let path = self.db_path.clone();
        let analysis = analysis.clone();
        run_blocking(move || ReportStore::open(&path)?.save(&analysis)).await
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, StorageError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StorageError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StorageError::Task {
            message: e.to_string(),
        })?
}
