//! Data types for dispatch decisions, agent reports and the final analysis.
//!
//! [`AgentReport`] carries a small state machine: a report starts
//! `Pending`, moves to `Thinking` when its agent starts, and ends in
//! `Completed` or `Failed`. Terminal states never change again.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::catalog::AgentSpec;
use super::message::TokenUsage;

/// Lifecycle status of an agent report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Scheduled but not started.
    Pending,
    /// Calls in flight.
    Thinking,
    /// Finished with content.
    Completed,
    /// Finished without usable content.
    Failed,
}

impl AgentStatus {
    /// Returns `true` for `Completed` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns `true` if moving from `self` to `next` is allowed.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Thinking | Self::Failed)
                | (Self::Thinking, Self::Completed | Self::Failed)
        )
    }

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Thinking => "thinking",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid report transition {from} -> {to}")]
pub struct InvalidTransition {
    /// Status before the attempted change.
    pub from: AgentStatus,
    /// Requested status.
    pub to: AgentStatus,
}

/// One agent's contribution to an analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentReport {
    /// Catalog name of the agent.
    pub agent_name: String,
    /// Display symbol.
    pub icon: String,
    /// Lifecycle status.
    pub status: AgentStatus,
    /// Report text, or a failure placeholder.
    pub content: String,
    /// Failure detail for diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Token usage across this agent's calls.
    #[serde(default)]
    pub usage: TokenUsage,
    /// Number of search calls made.
    #[serde(default)]
    pub search_calls: usize,
    /// Wall time from start to terminal status, in milliseconds.
    #[serde(default)]
    pub elapsed_ms: u64,
}

impl AgentReport {
    /// Creates a pending report for a catalog agent.
    #[must_use]
    pub fn pending(spec: &AgentSpec) -> Self {
        Self {
            agent_name: spec.name.to_string(),
            icon: spec.icon.to_string(),
            status: AgentStatus::Pending,
            content: String::new(),
            error: None,
            usage: TokenUsage::default(),
            search_calls: 0,
            elapsed_ms: 0,
        }
    }

    fn transition(&mut self, next: AgentStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Marks the agent as started.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] unless the report is `Pending`.
    pub fn begin(&mut self) -> Result<(), InvalidTransition> {
        self.transition(AgentStatus::Thinking)
    }

    /// Records the agent's content.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] unless the report is `Thinking`.
    pub fn complete(&mut self, content: String) -> Result<(), InvalidTransition> {
        self.transition(AgentStatus::Completed)?;
        self.content = content;
        Ok(())
    }

    /// Records a failure with a generic placeholder as content.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] if the report is already terminal.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), InvalidTransition> {
        self.transition(AgentStatus::Failed)?;
        self.content = failure_placeholder(&self.icon, &self.agent_name);
        self.error = Some(error.into());
        Ok(())
    }

    /// Returns `true` if the report completed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == AgentStatus::Completed
    }

    pub(crate) fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    }
}

/// Content shown in place of a failed agent's report.
#[must_use]
pub fn failure_placeholder(icon: &str, agent_name: &str) -> String {
    format!("{icon} {agent_name} failed to analyze this article.")
}

/// Roster proposed by the dispatch manager.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchDecision {
    /// Proposed catalog agents.
    pub proposed_agents: BTreeSet<String>,
    /// The manager's explanation.
    pub rationale: String,
}

/// An agent added by a protocol rule outside the manager's proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolOverride {
    /// Agent that was added.
    pub agent_name: String,
    /// Why the rule fired.
    pub trigger_reason: String,
}

/// An agent dropped from the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterExclusion {
    /// Name that was dropped.
    pub agent_name: String,
    /// Why it was dropped.
    pub reason: String,
}

/// The finished analysis of one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// Identifier the document was fetched under.
    pub document_id: String,
    /// Document headline.
    pub title: String,
    /// Document URL.
    pub source_url: String,
    /// Agents that ran, each with exactly one report.
    pub final_roster: BTreeSet<String>,
    /// The dispatch manager's rationale.
    pub rationale: String,
    /// Agents added by protocol rules.
    pub overrides: Vec<ProtocolOverride>,
    /// Proposed or unknown agents that did not run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusions: Vec<RosterExclusion>,
    /// One report per roster agent, in catalog order.
    pub reports: Vec<AgentReport>,
    /// Forward synthesizer output, when it was selected and completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthesis_output: Option<String>,
    /// The editor's verdict.
    pub final_verdict: String,
    /// Reports that completed.
    pub agents_completed: usize,
    /// Reports that failed.
    pub agents_failed: usize,
    /// Tokens consumed across all calls in the run.
    pub total_tokens: u32,
    /// Wall time of the run, in milliseconds.
    pub elapsed_ms: u64,
    /// When the analysis was assembled.
    pub created_at: DateTime<Utc>,
}

impl Analysis {
    /// Returns the report for an agent, if it ran.
    #[must_use]
    pub fn report(&self, agent_name: &str) -> Option<&AgentReport> {
        self.reports.iter().find(|r| r.agent_name == agent_name)
    }

    /// Reports that failed.
    pub fn failed_reports(&self) -> impl Iterator<Item = &AgentReport> {
        self.reports
            .iter()
            .filter(|r| r.status == AgentStatus::Failed)
    }
}
