//! # pressroom
//!
//! Multi-agent editorial analysis of news articles.
//!
//! A dispatch manager reads an article excerpt and proposes which specialist
//! analysts should examine it. Deterministic protocol rules then add any
//! specialist the article's content demands (figures call for the numbers
//! auditor, quotations for the framing critic, and so on) and drop agents
//! whose preconditions fail. The selected agents run concurrently, each
//! failure isolated to its own report, and an editor combines the reports
//! into a final verdict that is stored for later review.
//!
//! ## Quick start
//!
//! ```bash
//! export OPENAI_API_KEY=sk-...
//! pressroom analyze housing-fund-2024 --docs-dir ./documents
//! pressroom history
//! pressroom show 1
//! ```
//!
//! ## Library use
//!
//! ```no_run
//! use std::sync::Arc;
//! use pressroom::agent::{AgentConfig, DisabledSearch, Orchestrator, create_gateway};
//! use pressroom::document::DirectorySource;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AgentConfig::from_env()?;
//! let gateway = create_gateway(&config)?;
//! let orchestrator = Orchestrator::new(
//!     gateway,
//!     Arc::new(DisabledSearch),
//!     Arc::new(DirectorySource::new("documents")),
//!     config,
//! );
//! let analysis = orchestrator.analyze("housing-fund-2024").await?;
//! println!("{}", analysis.final_verdict);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod cli;
pub mod document;
pub mod error;
pub mod storage;

pub use agent::{AgentReport, AgentStatus, Analysis, Orchestrator, StoredAnalysis};
pub use document::{DirectorySource, Document, DocumentSource};
pub use error::{AgentError, AnalysisError, Error, Result, SourceError, StorageError};
pub use storage::{ReportSink, ReportStore, SqliteReportSink};
