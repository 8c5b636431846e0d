//! Orchestrator for one analysis run.
//!
//! Coordinates the full pipeline: dispatch → protocol rules → concurrent
//! fan-out of leaf agents → join → forward synthesizer → editor → sink.
//! Only the dispatch and editor stages can fail a run; every agent failure
//! is isolated in its own report, and sink failures are only logged.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::catalog::{self, AgentSpec};
use super::config::AgentConfig;
use super::dispatch::DispatchManager;
use super::prompt::PromptSet;
use super::protocol::apply_overrides;
use super::provider::InferenceGateway;
use super::report::{AgentReport, AgentStatus, Analysis};
use super::runtime::AgentRuntime;
use super::search::SearchCapability;
use super::synthesis::{Editor, synthesize_forward};
use crate::document::{Document, DocumentSource};
use crate::error::AnalysisError;
use crate::storage::ReportSink;

/// A finished analysis and the id it was stored under.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredAnalysis {
    /// The analysis.
    pub analysis: Analysis,
    /// Sink-assigned id, if the analysis was persisted.
    pub stored_id: Option<i64>,
}

/// Runs analyses end to end.
pub struct Orchestrator {
    gateway: Arc<dyn InferenceGateway>,
    source: Arc<dyn DocumentSource>,
    sink: Option<Arc<dyn ReportSink>>,
    runtime: Arc<AgentRuntime>,
    dispatch: DispatchManager,
    editor: Editor,
    config: AgentConfig,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("gateway", &self.gateway.name())
            .field("runtime", &self.runtime)
            .field("persist", &self.sink.is_some())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates a new orchestrator.
    ///
    /// Loads prompt templates from the directory specified in
    /// [`AgentConfig::prompt_dir`], falling back to compiled-in defaults.
    #[must_use]
    pub fn new(
        gateway: Arc<dyn InferenceGateway>,
        search: Arc<dyn SearchCapability>,
        source: Arc<dyn DocumentSource>,
        config: AgentConfig,
    ) -> Self {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        Self::with_prompts(gateway, search, source, config, prompts)
    }

    /// Creates an orchestrator with an explicit prompt set.
    #[must_use]
    pub fn with_prompts(
        gateway: Arc<dyn InferenceGateway>,
        search: Arc<dyn SearchCapability>,
        source: Arc<dyn DocumentSource>,
        config: AgentConfig,
        prompts: PromptSet,
    ) -> Self {
        let dispatch = DispatchManager::new(&config, prompts.dispatch.clone());
        let editor = Editor::new(&config, prompts.editor.clone());
        let runtime = Arc::new(AgentRuntime::new(
            Arc::clone(&gateway),
            search,
            Arc::new(prompts),
            &config,
        ));
        Self {
            gateway,
            source,
            sink: None,
            runtime,
            dispatch,
            editor,
            config,
        }
    }

    /// Persists every finished analysis to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// The agent catalog this orchestrator dispatches from.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub const fn catalog(&self) -> &'static [AgentSpec] {
        catalog::catalog()
    }

    /// Fetches a document and analyzes it.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Source`] if the document cannot be fetched,
    /// otherwise as [`Orchestrator::analyze_document`].
    pub async fn analyze(&self, document_id: &str) -> Result<Analysis, AnalysisError> {
        self.analyze_stored(document_id)
            .await
            .map(|stored| stored.analysis)
    }

    /// Fetches and analyzes a document, also returning the id the sink
    /// assigned.
    ///
    /// `stored_id` is `None` when no sink is configured or the write failed.
    ///
    /// # Errors
    ///
    /// As [`Orchestrator::analyze`].
    pub async fn analyze_stored(
        &self,
        document_id: &str,
    ) -> Result<StoredAnalysis, AnalysisError> {
        let document = self.source.fetch(document_id).await?;
        self.run(document_id, document).await
    }

    /// Analyzes an already-fetched document.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Dispatch`] if no roster can be proposed and
    /// [`AnalysisError::Editor`] if no verdict can be written. In both cases
    /// nothing is persisted.
    pub async fn analyze_document(
        &self,
        document_id: &str,
        document: Document,
    ) -> Result<Analysis, AnalysisError> {
        self.run(document_id, document)
            .await
            .map(|stored| stored.analysis)
    }

    async fn run(
        &self,
        document_id: &str,
        document: Document,
    ) -> Result<StoredAnalysis, AnalysisError> {
        let start = Instant::now();
        info!(
            document = document_id,
            images = document.images.len(),
            "analysis started"
        );

        // Dispatch
        let proposal = self
            .dispatch
            .propose(self.gateway.as_ref(), &document)
            .await
            .map_err(AnalysisError::Dispatch)?;
        let mut total_usage = proposal.usage;

        // Protocol rules
        let resolution = apply_overrides(&document, &proposal.decision);
        let mut exclusions = proposal.exclusions;
        exclusions.extend(resolution.exclusions);

        let mut roster: Vec<&'static AgentSpec> = resolution
            .final_roster
            .iter()
            .filter_map(|name| catalog::find(name))
            .collect();
        roster.sort_by_key(|spec| catalog::position(spec.name));

        info!(
            proposed = proposal.decision.proposed_agents.len(),
            overrides = resolution.overrides.len(),
            excluded = exclusions.len(),
            roster = roster.len(),
            "roster resolved"
        );

        let leaves: Vec<&'static AgentSpec> =
            roster.iter().copied().filter(|s| s.is_leaf()).collect();
        let forward = roster.iter().copied().find(|s| !s.is_leaf());

        // Fan-out and join
        let document = Arc::new(document);
        let leaf_reports = self.fan_out(&leaves, Arc::clone(&document)).await;

        // Forward synthesis
        let forward_report = match forward {
            Some(spec) => {
                Some(synthesize_forward(&self.runtime, spec, &document, &leaf_reports).await)
            }
            None => None,
        };
        let synthesis_output = forward_report
            .as_ref()
            .filter(|r| r.is_completed())
            .map(|r| r.content.clone());

        // Editor
        let verdict = self
            .editor
            .finalize(
                self.gateway.as_ref(),
                &document,
                &leaf_reports,
                synthesis_output.as_deref(),
            )
            .await
            .map_err(AnalysisError::Editor)?;
        total_usage.accumulate(verdict.usage);

        let mut reports = leaf_reports;
        reports.extend(forward_report);
        reports.sort_by_key(|r| catalog::position(&r.agent_name));

        for report in &reports {
            total_usage.accumulate(report.usage);
        }
        let (agents_completed, agents_failed) = count_outcomes(&reports);
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let analysis = Analysis {
            document_id: document_id.to_string(),
            title: document.title.clone(),
            source_url: document.source_url.clone(),
            final_roster: resolution.final_roster,
            rationale: proposal.decision.rationale,
            overrides: resolution.overrides,
            exclusions,
            reports,
            synthesis_output,
            final_verdict: verdict.text,
            agents_completed,
            agents_failed,
            total_tokens: total_usage.total_tokens,
            elapsed_ms,
            created_at: Utc::now(),
        };

        info!(
            document = document_id,
            completed = agents_completed,
            failed = agents_failed,
            tokens = analysis.total_tokens,
            elapsed_ms,
            "analysis complete"
        );

        let stored_id = self.persist(&analysis).await;
        Ok(StoredAnalysis {
            analysis,
            stored_id,
        })
    }

    /// Runs leaf agents concurrently and waits for all of them.
    ///
    /// Reports come back in the order of `leaves`. A task that panics or is
    /// cancelled becomes a `Failed` report.
    async fn fan_out(
        &self,
        leaves: &[&'static AgentSpec],
        document: Arc<Document>,
    ) -> Vec<AgentReport> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let request_delay = self.config.request_delay;

        let handles = leaves.iter().map(|&spec| {
            let sem = Arc::clone(&semaphore);
            let runtime = Arc::clone(&self.runtime);
            let doc = Arc::clone(&document);

            tokio::spawn(async move {
                let _permit = match sem.acquire().await {
                    Ok(permit) => permit,
                    Err(e) => return failed_report(spec, &format!("concurrency limit: {e}")),
                };

                if !request_delay.is_zero() {
                    tokio::time::sleep(request_delay).await;
                }

                runtime.run(spec, &doc).await
            })
        });

        let joined = join_all(handles).await;
        debug!(agents = joined.len(), "fan-out joined");

        joined
            .into_iter()
            .zip(leaves)
            .map(|(result, spec)| {
                result.unwrap_or_else(|e| {
                    warn!(agent = spec.name, error = %e, "agent task aborted");
                    failed_report(spec, &format!("agent task failed: {e}"))
                })
            })
            .collect()
    }

    async fn persist(&self, analysis: &Analysis) -> Option<i64> {
        let sink = self.sink.as_ref()?;
        match sink.persist(analysis).await {
            Ok(id) => {
                info!(id, document = %analysis.document_id, "analysis persisted");
                Some(id)
            }
            Err(e) => {
                warn!(document = %analysis.document_id, error = %e, "failed to persist analysis");
                None
            }
        }
    }
}

fn failed_report(spec: &AgentSpec, error: &str) -> AgentReport {
    let mut report = AgentReport::pending(spec);
    if let Err(e) = report.fail(error) {
        warn!(agent = spec.name, error = %e, "report transition rejected");
    }
    report
}

fn count_outcomes(reports: &[AgentReport]) -> (usize, usize) {
    reports.iter().fold((0, 0), |(ok, failed), r| match r.status {
        AgentStatus::Completed => (ok + 1, failed),
        AgentStatus::Failed => (ok, failed + 1),
        AgentStatus::Pending | AgentStatus::Thinking => (ok, failed),
    })
}
