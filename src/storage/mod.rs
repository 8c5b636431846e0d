//! Persistence of finished analyses.
//!
//! The orchestrator hands every completed [`Analysis`] to a [`ReportSink`].
//! A sink failure is logged by the caller and never fails the run.

mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::report::Analysis;
use crate::error::StorageError;

pub use sqlite::{DEFAULT_DB_PATH, ReportStore, SqliteReportSink};

/// Destination for completed analyses.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Stores an analysis and returns its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the analysis cannot be written.
    async fn persist(&self, analysis: &Analysis) -> Result<i64, StorageError>;
}

/// One row of the analysis history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Stored analysis id.
    pub id: i64,
    /// Document identifier.
    pub document_id: String,
    /// Document headline.
    pub title: String,
    /// Reports that completed.
    pub agents_completed: usize,
    /// Reports that failed.
    pub agents_failed: usize,
    /// When the analysis was assembled.
    pub created_at: DateTime<Utc>,
}
