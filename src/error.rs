//! Error types for pressroom.
//!
//! Each layer owns an error enum: [`AgentError`] for individual model and
//! search calls, [`AnalysisError`] for the run as a whole, [`SourceError`]
//! and [`StorageError`] for the collaborators, and [`CommandError`] for the
//! CLI. The top-level [`Error`] unifies them for command execution.

use std::time::Duration;

use thiserror::Error;

/// Result alias used by the CLI layer.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for CLI command execution.
#[derive(Debug, Error)]
pub enum Error {
    /// A run failed at a stage without failure isolation.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// Report storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Document lookup failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Agent configuration or provider setup failed.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Command-level failure.
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Failure of a single model, tool, or search interaction.
///
/// Inside the agent runtime these are recovered locally and recorded on the
/// failing agent's report. Only the dispatch and editor stages let them
/// escape, wrapped in [`AnalysisError`].
#[derive(Debug, Error)]
pub enum AgentError {
    /// The provider API returned an error.
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Provider error message.
        message: String,
        /// HTTP status, when known.
        status: Option<u16>,
    },

    /// A gateway or search call exceeded its deadline.
    #[error("{operation} timed out after {}s", timeout.as_secs_f64())]
    Timeout {
        /// What was being awaited (`"inference"`, `"search"`).
        operation: &'static str,
        /// The deadline that elapsed.
        timeout: Duration,
    },

    /// The model returned no usable text.
    #[error("empty response from {agent}")]
    EmptyResponse {
        /// Agent that issued the request.
        agent: String,
    },

    /// The search capability failed or is switched off.
    #[error("search unavailable: {message}")]
    SearchUnavailable {
        /// Reason reported by the search backend.
        message: String,
    },

    /// The model's response did not match the expected structure.
    #[error("failed to parse response: {message}")]
    ResponseParse {
        /// What went wrong.
        message: String,
        /// The raw content that failed to parse.
        content: String,
    },

    /// The model kept requesting tools after the round bound was spent.
    #[error("tool round limit reached ({max_rounds}) without a final answer")]
    ToolLoopExceeded {
        /// Configured bound on search rounds.
        max_rounds: usize,
    },

    /// A vision agent was asked to run on a document without images.
    #[error("{agent} requires at least one image")]
    PreconditionUnmet {
        /// Agent whose precondition failed.
        agent: String,
    },

    /// No provider is registered under the configured name.
    #[error("unsupported provider: {name}")]
    UnsupportedProvider {
        /// Requested provider name.
        name: String,
    },

    /// No API key was configured.
    #[error("API key missing (set OPENAI_API_KEY or PRESSROOM_API_KEY)")]
    ApiKeyMissing,
}

/// Fatal failure of an analysis run.
///
/// Only the stages without a reasonable partial result produce these: no
/// roster means no reports to build, and no verdict means no coherent
/// analysis to persist.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The document could not be fetched.
    #[error("document source: {0}")]
    Source(#[from] SourceError),

    /// The dispatch manager could not produce a usable roster.
    #[error("dispatch failed: {0}")]
    Dispatch(#[source] AgentError),

    /// The editor could not produce a final verdict.
    #[error("editor failed: {0}")]
    Editor(#[source] AgentError),

    /// Internal orchestration failure.
    #[error("orchestration error: {message}")]
    Orchestration {
        /// Description of the failure.
        message: String,
    },
}

/// Failure to fetch a document from a [`DocumentSource`](crate::document::DocumentSource).
#[derive(Debug, Error)]
pub enum SourceError {
    /// No document exists under the identifier.
    #[error("document not found: {id}")]
    NotFound {
        /// Requested identifier.
        id: String,
    },

    /// The identifier is not acceptable to this source.
    #[error("invalid document id: {id}")]
    InvalidId {
        /// Rejected identifier.
        id: String,
    },

    /// The stored document could not be read.
    #[error("failed to read document {id}: {source}")]
    Io {
        /// Requested identifier.
        id: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The stored document is malformed.
    #[error("malformed document {id}: {source}")]
    Malformed {
        /// Requested identifier.
        id: String,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

/// Failure in the report store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// SQLite error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Analysis (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error around the database file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No analysis exists under the identifier.
    #[error("analysis not found: {id}")]
    AnalysisNotFound {
        /// Requested analysis id.
        id: i64,
    },

    /// A stored row could not be decoded.
    #[error("corrupt row: {message}")]
    CorruptRow {
        /// What was wrong with the row.
        message: String,
    },

    /// The blocking storage task failed to complete.
    #[error("storage task failed: {message}")]
    Task {
        /// Join error description.
        message: String,
    },
}

/// Command-level failures.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command could not be carried out.
    #[error("{0}")]
    ExecutionFailed(String),

    /// Output could not be rendered.
    #[error("output format error: {0}")]
    OutputFormat(String),
}
