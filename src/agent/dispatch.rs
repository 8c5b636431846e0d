//! Dispatch manager.
//!
//! Reads a sampled excerpt of the article together with the catalog roster
//! and proposes which specialists should run. The proposal is advisory:
//! protocol rules add to it afterwards.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use super::catalog::{self, EDITOR};
use super::config::AgentConfig;
use super::message::{ChatRequest, TokenUsage, system_message, user_message};
use super::prompt::build_dispatch_prompt;
use super::provider::{InferenceGateway, chat_with_timeout};
use super::report::{DispatchDecision, RosterExclusion};
use crate::document::Document;
use crate::error::AgentError;

/// Name the dispatch manager uses on its gateway requests.
pub const DISPATCH: &str = "dispatch";

/// Wire shape of the manager's JSON answer.
#[derive(Debug, Deserialize)]
struct RawDecision {
    #[serde(alias = "proposed_agents")]
    agents: Vec<String>,
    #[serde(default)]
    rationale: String,
}

/// Parsed and validated dispatch result.
#[derive(Debug, Clone, Default)]
pub struct DispatchOutcome {
    /// Proposal restricted to catalog agents.
    pub decision: DispatchDecision,
    /// Proposed names that are not runnable catalog agents.
    pub exclusions: Vec<RosterExclusion>,
    /// Token usage of the dispatch call.
    pub usage: TokenUsage,
}

/// Agent that proposes the roster for an article.
#[derive(Debug, Clone)]
pub struct DispatchManager {
    model: String,
    max_tokens: u32,
    excerpt_chars: usize,
    timeout: Duration,
    system_prompt: String,
}

impl DispatchManager {
    /// Creates a new dispatch manager with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.dispatch_model.clone(),
            max_tokens: config.dispatch_max_tokens,
            excerpt_chars: config.dispatch_excerpt_chars,
            timeout: config.call_timeout,
            system_prompt,
        }
    }

    /// Asks the model for a roster proposal.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Timeout`] or the gateway's error if the call
    /// fails, and [`AgentError::ResponseParse`] if the answer is not the
    /// expected JSON object.
    pub async fn propose(
        &self,
        gateway: &dyn InferenceGateway,
        document: &Document,
    ) -> Result<DispatchOutcome, AgentError> {
        let request = ChatRequest {
            agent: DISPATCH.to_string(),
            model: self.model.clone(),
            messages: vec![
                system_message(&self.system_prompt),
                user_message(&build_dispatch_prompt(document, self.excerpt_chars)),
            ],
            temperature: Some(0.0),
            max_tokens: Some(self.max_tokens),
            json_mode: true,
            tools: Vec::new(),
        };

        let response = chat_with_timeout(gateway, &request, self.timeout).await?;
        let (decision, exclusions) = Self::parse_decision(&response.content)?;

        debug!(
            proposed = decision.proposed_agents.len(),
            excluded = exclusions.len(),
            "dispatch proposal parsed"
        );

        Ok(DispatchOutcome {
            decision,
            exclusions,
            usage: response.usage,
        })
    }

    /// Parses the manager's JSON answer, separating unknown names.
    fn parse_decision(
        content: &str,
    ) -> Result<(DispatchDecision, Vec<RosterExclusion>), AgentError> {
        let raw: RawDecision =
            serde_json::from_str(strip_code_fence(content)).map_err(|e| {
                AgentError::ResponseParse {
                    message: format!("Failed to parse dispatch decision: {e}"),
                    content: content.to_string(),
                }
            })?;

        let mut proposed_agents = BTreeSet::new();
        let mut exclusions = Vec::new();
        for name in raw.agents {
            let name = name.trim().to_string();
            if catalog::find(&name).is_some() {
                proposed_agents.insert(name);
                continue;
            }
            let reason = if name == EDITOR {
                "the editor always runs last and cannot be dispatched"
            } else {
                "not in the agent catalog"
            };
            if exclusions
                .iter()
                .any(|e: &RosterExclusion| e.agent_name == name)
            {
                continue;
            }
            warn!(agent = %name, reason, "dropping proposed agent");
            exclusions.push(RosterExclusion {
                agent_name: name,
                reason: reason.to_string(),
            });
        }

        Ok((
            DispatchDecision {
                proposed_agents,
                rationale: raw.rationale,
            },
            exclusions,
        ))
    }
}

/// Removes a surrounding markdown code fence, if present.
pub(crate) fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    if trimmed.starts_with("```") {
        trimmed
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim()
    } else {
        trimmed
    }
}
