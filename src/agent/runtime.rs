//! Agent runtime: runs one catalog agent and produces its report.
//!
//! The execution strategy follows the agent's [`Capability`]:
//!
//! - `PlainText`: one call with the system prompt and the bounded body.
//! - `ToolUse`: a bounded [`tool_round`] with `web_search` declared.
//! - `Vision`: one call with a text excerpt and the images as multimodal
//!   inputs. Requires at least one image.
//!
//! Every error, timeout, or empty answer ends the report as `Failed`; the
//! runtime itself never returns an error.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::catalog::{AgentSpec, Capability};
use super::config::AgentConfig;
use super::message::{
    ChatMessage, ChatRequest, TokenUsage, system_message, user_message,
    user_message_with_images,
};
use super::prompt::{PromptSet, build_agent_prompt, build_forward_prompt, build_vision_prompt};
use super::provider::{InferenceGateway, chat_with_timeout};
use super::report::AgentReport;
use super::search::SearchCapability;
use super::tool::ToolSet;
use super::tool_round::tool_round;
use crate::document::Document;
use crate::error::AgentError;

/// Sampling temperature for specialist agents.
const AGENT_TEMPERATURE: f32 = 0.2;

/// Successful agent execution.
#[derive(Debug)]
struct Execution {
    content: String,
    usage: TokenUsage,
    search_calls: usize,
}

/// Runs catalog agents against a shared gateway and search backend.
pub struct AgentRuntime {
    gateway: Arc<dyn InferenceGateway>,
    search: Arc<dyn SearchCapability>,
    prompts: Arc<PromptSet>,
    agent_model: String,
    vision_model: String,
    max_tokens: u32,
    max_body_chars: usize,
    vision_excerpt_chars: usize,
    max_tool_rounds: usize,
    timeout: Duration,
}

impl std::fmt::Debug for AgentRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRuntime")
            .field("gateway", &self.gateway.name())
            .field("search", &self.search.name())
            .field("agent_model", &self.agent_model)
            .field("vision_model", &self.vision_model)
            .field("max_tool_rounds", &self.max_tool_rounds)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl AgentRuntime {
    /// Creates a runtime from configuration.
    #[must_use]
    pub fn new(
        gateway: Arc<dyn InferenceGateway>,
        search: Arc<dyn SearchCapability>,
        prompts: Arc<PromptSet>,
        config: &AgentConfig,
    ) -> Self {
        Self {
            gateway,
            search,
            prompts,
            agent_model: config.agent_model.clone(),
            vision_model: config.vision_model.clone(),
            max_tokens: config.agent_max_tokens,
            max_body_chars: config.max_body_chars,
            vision_excerpt_chars: config.vision_excerpt_chars,
            max_tool_rounds: config.max_tool_rounds,
            timeout: config.call_timeout,
        }
    }

    /// Runs a leaf agent over the article.
    pub async fn run(&self, spec: &AgentSpec, document: &Document) -> AgentReport {
        if !spec.precondition_met(document.images.len()) {
            let mut report = AgentReport::pending(spec);
            let error = AgentError::PreconditionUnmet {
                agent: spec.name.to_string(),
            };
            warn!(agent = spec.name, error = %error, "agent not started");
            if let Err(e) = report.fail(error.to_string()) {
                warn!(agent = spec.name, error = %e, "report transition rejected");
            }
            return report;
        }

        let user = match spec.capability {
            Capability::Vision => user_message_with_images(
                &build_vision_prompt(document, self.vision_excerpt_chars),
                &document.images,
            ),
            Capability::PlainText | Capability::ToolUse => {
                user_message(&build_agent_prompt(document, self.max_body_chars))
            }
        };
        self.drive(spec, user).await
    }

    /// Runs the forward synthesizer over the leaf reports.
    pub async fn run_forward(
        &self,
        spec: &AgentSpec,
        document: &Document,
        leaf_reports: &[AgentReport],
    ) -> AgentReport {
        self.drive(spec, user_message(&build_forward_prompt(document, leaf_reports)))
            .await
    }

    /// Moves a report through its lifecycle around one execution.
    async fn drive(&self, spec: &AgentSpec, user: ChatMessage) -> AgentReport {
        let mut report = AgentReport::pending(spec);
        let started = Instant::now();

        if let Err(e) = report.begin() {
            warn!(agent = spec.name, error = %e, "report transition rejected");
        }
        debug!(agent = spec.name, capability = %spec.capability, "agent thinking");

        let transition = match self.execute(spec, user).await {
            Ok(execution) => {
                report.usage = execution.usage;
                report.search_calls = execution.search_calls;
                debug!(
                    agent = spec.name,
                    tokens = execution.usage.total_tokens,
                    searches = execution.search_calls,
                    "agent completed"
                );
                report.complete(execution.content)
            }
            Err(e) => {
                warn!(agent = spec.name, error = %e, "agent failed");
                report.fail(e.to_string())
            }
        };
        if let Err(e) = transition {
            warn!(agent = spec.name, error = %e, "report transition rejected");
        }

        report.set_elapsed(started.elapsed());
        report
    }

    async fn execute(&self, spec: &AgentSpec, user: ChatMessage) -> Result<Execution, AgentError> {
        let tools = match spec.capability {
            Capability::ToolUse => ToolSet::research_tools(),
            Capability::PlainText | Capability::Vision => ToolSet::none(),
        };
        let model = match spec.capability {
            Capability::Vision => &self.vision_model,
            Capability::PlainText | Capability::ToolUse => &self.agent_model,
        };

        let mut request = ChatRequest {
            agent: spec.name.to_string(),
            model: model.clone(),
            messages: vec![system_message(self.prompts.agent(spec)), user],
            temperature: Some(AGENT_TEMPERATURE),
            max_tokens: Some(self.max_tokens),
            json_mode: false,
            tools: tools.definitions().to_vec(),
        };

        let (response, usage, search_calls) = if tools.is_empty() {
            let response = chat_with_timeout(self.gateway.as_ref(), &request, self.timeout).await?;
            let usage = response.usage;
            (response, usage, 0)
        } else {
            let outcome = tool_round(
                self.gateway.as_ref(),
                self.search.as_ref(),
                &mut request,
                self.max_tool_rounds,
                self.timeout,
            )
            .await?;
            (outcome.response, outcome.usage, outcome.search_calls)
        };

        let content = response.content.trim();
        if content.is_empty() {
            return Err(AgentError::EmptyResponse {
                agent: spec.name.to_string(),
            });
        }

        Ok(Execution {
            content: content.to_string(),
            usage,
            search_calls,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::catalog::{FACT_CHECKER, FORWARD_ANALYST, NUMBERS_AUDITOR, VISUAL_ANALYST, find};
    use crate::agent::message::ChatResponse;
    use crate::agent::report::AgentStatus;
    use crate::agent::search::{DisabledSearch, Snippet};
    use crate::agent::tool::{ToolCall, WEB_SEARCH};

    use std::sync::Mutex;

    use async_trait::async_trait;

    /// Gateway that records requests and answers by closure.
    struct MockGateway {
        seen: Mutex<Vec<ChatRequest>>,
        reply: fn(&ChatRequest) -> Result<ChatResponse, AgentError>,
        delay: Duration,
    }

    impl MockGateway {
        fn new(reply: fn(&ChatRequest) -> Result<ChatResponse, AgentError>) -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                reply,
                delay: Duration::ZERO,
            }
        }

        fn requests(&self) -> Vec<ChatRequest> {
            self.seen.lock().unwrap_or_else(|e| panic!("{e}")).clone()
        }
    }

    #[async_trait]
    impl InferenceGateway for MockGateway {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            self.seen
                .lock()
                .unwrap_or_else(|e| panic!("{e}"))
                .push(request.clone());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            (self.reply)(request)
        }
    }

    struct OneResult;

    #[async_trait]
    impl SearchCapability for OneResult {
        fn name(&self) -> &'static str {
            "one"
        }

        async fn query(&self, text: &str) -> Result<Vec<Snippet>, AgentError> {
            Ok(vec![Snippet {
                title: "HFA".to_string(),
                text: format!("{text}: confirmed"),
                url: String::new(),
            }])
        }
    }

    fn runtime(gateway: Arc<MockGateway>, search: Arc<dyn SearchCapability>) -> AgentRuntime {
        let config = AgentConfig::builder()
            .api_key("test")
            .call_timeout(Duration::from_secs(1))
            .build()
            .unwrap_or_else(|_| unreachable!());
        AgentRuntime::new(gateway, search, Arc::new(PromptSet::defaults()), &config)
    }

    fn spec(name: &str) -> &'static AgentSpec {
        find(name).unwrap_or_else(|| unreachable!())
    }

    fn article() -> Document {
        Document::new("Fund launched", "The minister said \"€50m\" will be spent.")
    }

    #[tokio::test]
    async fn test_plain_text_completes() {
        let gateway = Arc::new(MockGateway::new(|_| {
            let mut r = ChatResponse::text("  Figures check out.  ");
            r.usage.total_tokens = 42;
            Ok(r)
        }));
        let rt = runtime(Arc::clone(&gateway), Arc::new(DisabledSearch));

        let report = rt.run(spec(NUMBERS_AUDITOR), &article()).await;
        assert_eq!(report.status, AgentStatus::Completed);
        assert_eq!(report.content, "Figures check out.");
        assert_eq!(report.usage.total_tokens, 42);

        let requests = gateway.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].tools.is_empty());
        assert!(!requests[0].has_images());
    }

    #[tokio::test]
    async fn test_empty_response_fails() {
        let gateway = Arc::new(MockGateway::new(|_| Ok(ChatResponse::text("   "))));
        let rt = runtime(gateway, Arc::new(DisabledSearch));

        let report = rt.run(spec(NUMBERS_AUDITOR), &article()).await;
        assert_eq!(report.status, AgentStatus::Failed);
        assert_eq!(report.content, "🔢 numbers_auditor failed to analyze this article.");
        assert!(report.error.as_deref().unwrap_or_default().contains("empty"));
    }

    #[tokio::test]
    async fn test_gateway_error_fails() {
        let gateway = Arc::new(MockGateway::new(|_| {
            Err(AgentError::ApiRequest {
                message: "rate limited".to_string(),
                status: Some(429),
            })
        }));
        let rt = runtime(gateway, Arc::new(DisabledSearch));

        let report = rt.run(spec(NUMBERS_AUDITOR), &article()).await;
        assert_eq!(report.status, AgentStatus::Failed);
        assert!(report.error.as_deref().unwrap_or_default().contains("rate limited"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fails() {
        let mut mock = MockGateway::new(|_| Ok(ChatResponse::text("too late")));
        mock.delay = Duration::from_secs(60);
        let rt = runtime(Arc::new(mock), Arc::new(DisabledSearch));

        let report = rt.run(spec(NUMBERS_AUDITOR), &article()).await;
        assert_eq!(report.status, AgentStatus::Failed);
        assert!(report.error.as_deref().unwrap_or_default().contains("timed out"));
    }

    #[tokio::test]
    async fn test_tool_use_searches_once() {
        let gateway = Arc::new(MockGateway::new(|request| {
            if request.messages.iter().any(|m| m.tool_call_id.is_some()) {
                Ok(ChatResponse::text("Claim confirmed by HFA."))
            } else {
                Ok(ChatResponse::tool_request(vec![ToolCall {
                    id: "call_1".to_string(),
                    name: WEB_SEARCH.to_string(),
                    arguments: r#"{"query":"HFA €50m fund"}"#.to_string(),
                }]))
            }
        }));
        let rt = runtime(Arc::clone(&gateway), Arc::new(OneResult));

        let report = rt.run(spec(FACT_CHECKER), &article()).await;
        assert_eq!(report.status, AgentStatus::Completed);
        assert_eq!(report.search_calls, 1);

        let requests = gateway.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].tools.len(), 1);
    }

    #[tokio::test]
    async fn test_vision_sends_images() {
        let gateway = Arc::new(MockGateway::new(|_| Ok(ChatResponse::text("A crane."))));
        let rt = runtime(Arc::clone(&gateway), Arc::new(DisabledSearch));
        let doc = article().with_images(vec!["https://img.example/site.jpg".to_string()]);

        let report = rt.run(spec(VISUAL_ANALYST), &doc).await;
        assert_eq!(report.status, AgentStatus::Completed);

        let requests = gateway.requests();
        assert!(requests[0].has_images());
        assert_eq!(requests[0].model, "gpt-4o");
    }

    #[tokio::test]
    async fn test_vision_without_images_fails_without_call() {
        let gateway = Arc::new(MockGateway::new(|_| Ok(ChatResponse::text("unused"))));
        let rt = runtime(Arc::clone(&gateway), Arc::new(DisabledSearch));

        let report = rt.run(spec(VISUAL_ANALYST), &article()).await;
        assert_eq!(report.status, AgentStatus::Failed);
        assert!(gateway.requests().is_empty());
    }

    #[tokio::test]
    async fn test_forward_sees_reports() {
        let gateway = Arc::new(MockGateway::new(|request| {
            let user = &request.messages[1].content;
            if user.contains("0.2% of capital spend") {
                Ok(ChatResponse::text("Expect delays."))
            } else {
                Ok(ChatResponse::text(""))
            }
        }));
        let rt = runtime(Arc::clone(&gateway), Arc::new(DisabledSearch));

        let mut leaf = AgentReport::pending(spec(NUMBERS_AUDITOR));
        let _ = leaf.begin();
        let _ = leaf.complete("0.2% of capital spend".to_string());

        let report = rt
            .run_forward(spec(FORWARD_ANALYST), &article(), &[leaf])
            .await;
        assert_eq!(report.status, AgentStatus::Completed);
        assert_eq!(report.content, "Expect delays.");
    }
}
