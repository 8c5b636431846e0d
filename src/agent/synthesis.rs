//! Synthesis stage: forward synthesizer and editor.
//!
//! Both run after the fan-out barrier. The forward synthesizer is a catalog
//! agent and fails in isolation like any other; the editor is not, and
//! its failure fails the run.

use std::time::Duration;

use tracing::{debug, info};

use super::catalog::{AgentSpec, EDITOR};
use super::config::AgentConfig;
use super::message::{ChatRequest, TokenUsage, system_message, user_message};
use super::prompt::build_editor_prompt;
use super::provider::{InferenceGateway, chat_with_timeout};
use super::report::AgentReport;
use super::runtime::AgentRuntime;
use crate::document::Document;
use crate::error::AgentError;

/// Editor sampling temperature.
const EDITOR_TEMPERATURE: f32 = 0.1;

/// The editor's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Final verdict text, never empty.
    pub text: String,
    /// Token usage of the editor call.
    pub usage: TokenUsage,
}

/// Runs the forward synthesizer over the leaf reports.
///
/// Failed leaf reports are passed through and marked in the prompt.
pub async fn synthesize_forward(
    runtime: &AgentRuntime,
    spec: &AgentSpec,
    document: &Document,
    leaf_reports: &[AgentReport],
) -> AgentReport {
    info!(agent = spec.name, inputs = leaf_reports.len(), "forward synthesis");
    runtime.run_forward(spec, document, leaf_reports).await
}

/// Agent that writes the final verdict.
#[derive(Debug, Clone)]
pub struct Editor {
    model: String,
    max_tokens: u32,
    timeout: Duration,
    system_prompt: String,
}

impl Editor {
    /// Creates a new editor with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.editor_model.clone(),
            max_tokens: config.editor_max_tokens,
            timeout: config.call_timeout,
            system_prompt,
        }
    }

    /// Writes the verdict from the leaf reports and optional forward output.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Timeout`] or the gateway's error if the call
    /// fails, and [`AgentError::EmptyResponse`] if the verdict is blank.
    pub async fn finalize(
        &self,
        gateway: &dyn InferenceGateway,
        document: &Document,
        leaf_reports: &[AgentReport],
        forward_output: Option<&str>,
    ) -> Result<Verdict, AgentError> {
        let request = ChatRequest {
            agent: EDITOR.to_string(),
            model: self.model.clone(),
            messages: vec![
                system_message(&self.system_prompt),
                user_message(&build_editor_prompt(document, leaf_reports, forward_output)),
            ],
            temperature: Some(EDITOR_TEMPERATURE),
            max_tokens: Some(self.max_tokens),
            json_mode: false,
            tools: Vec::new(),
        };

        let response = chat_with_timeout(gateway, &request, self.timeout).await?;
        let text = response.content.trim();
        if text.is_empty() {
            return Err(AgentError::EmptyResponse {
                agent: EDITOR.to_string(),
            });
        }

        debug!(
            reports = leaf_reports.len(),
            forward = forward_output.is_some(),
            tokens = response.usage.total_tokens,
            "editor verdict written"
        );

        Ok(Verdict {
            text: text.to_string(),
            usage: response.usage,
        })
    }
}
