//! Shared test doubles for the integration suites.

#![allow(dead_code, clippy::panic, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pressroom::agent::catalog::EDITOR;
use pressroom::agent::dispatch::DISPATCH;
use pressroom::agent::message::{ChatRequest, ChatResponse, Role, TokenUsage};
use pressroom::agent::search::{SearchCapability, Snippet};
use pressroom::agent::tool::{ToolCall, WEB_SEARCH};
use pressroom::agent::{AgentConfig, InferenceGateway};
use pressroom::error::{AgentError, SourceError, StorageError};
use pressroom::{Analysis, Document, DocumentSource, ReportSink};

/// Tokens charged for every scripted response.
pub const TOKENS_PER_CALL: u32 = 10;

/// How the scripted gateway answers one agent.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Plain text answer.
    Text(String),
    /// Provider error.
    Error(String),
    /// Asks for one search, then answers with the text.
    SearchThenText(String),
    /// Asks for a search on every call.
    AlwaysSearch,
    /// Whitespace-only answer.
    Empty,
    /// Text answer after sleeping.
    Delayed(Duration, String),
}

/// Gateway that answers by `request.agent`.
pub struct ScriptedGateway {
    dispatch: Reply,
    editor: Reply,
    agents: HashMap<String, Reply>,
    calls: Mutex<HashMap<String, usize>>,
    editor_inputs: Mutex<Vec<String>>,
    events: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedGateway {
    /// Proposes `agents` at dispatch. Unscripted agents answer
    /// `"<name> report"`.
    pub fn proposing(agents: &[&str]) -> Self {
        let json = serde_json::json!({
            "agents": agents,
            "rationale": "scripted proposal",
        });
        Self {
            dispatch: Reply::Text(json.to_string()),
            editor: Reply::Text("Verdict: broadly accurate.".to_string()),
            agents: HashMap::new(),
            calls: Mutex::new(HashMap::new()),
            editor_inputs: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn dispatch_reply(mut self, reply: Reply) -> Self {
        self.dispatch = reply;
        self
    }

    #[must_use]
    pub fn editor_reply(mut self, reply: Reply) -> Self {
        self.editor = reply;
        self
    }

    #[must_use]
    pub fn agent(mut self, name: &str, reply: Reply) -> Self {
        self.agents.insert(name.to_string(), reply);
        self
    }

    /// Number of gateway calls made on behalf of `agent`.
    pub fn calls(&self, agent: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|e| panic!("{e}"))
            .get(agent)
            .copied()
            .unwrap_or(0)
    }

    /// Total gateway calls.
    pub fn total_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|e| panic!("{e}"))
            .values()
            .sum()
    }

    /// User messages the editor received.
    pub fn editor_inputs(&self) -> Vec<String> {
        self.editor_inputs
            .lock()
            .unwrap_or_else(|e| panic!("{e}"))
            .clone()
    }

    /// `"start <agent>"` and `"end <agent>"` entries in call order.
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap_or_else(|e| panic!("{e}")).clone()
    }

    /// Most calls that were outstanding at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, event: String) {
        self.events
            .lock()
            .unwrap_or_else(|e| panic!("{e}"))
            .push(event);
    }

    fn reply_for(&self, agent: &str) -> Reply {
        match agent {
            DISPATCH => self.dispatch.clone(),
            EDITOR => self.editor.clone(),
            name => self
                .agents
                .get(name)
                .cloned()
                .unwrap_or_else(|| Reply::Text(format!("{name} report"))),
        }
    }
}

fn charged(mut response: ChatResponse) -> ChatResponse {
    response.usage = TokenUsage {
        prompt_tokens: TOKENS_PER_CALL / 2,
        completion_tokens: TOKENS_PER_CALL / 2,
        total_tokens: TOKENS_PER_CALL,
    };
    response
}

fn search_request() -> ChatResponse {
    ChatResponse::tool_request(vec![ToolCall {
        id: "call_1".to_string(),
        name: WEB_SEARCH.to_string(),
        arguments: r#"{"query":"housing fund"}"#.to_string(),
    }])
}

#[async_trait]
impl InferenceGateway for ScriptedGateway {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        *self
            .calls
            .lock()
            .unwrap_or_else(|e| panic!("{e}"))
            .entry(request.agent.clone())
            .or_default() += 1;

        if request.agent == EDITOR
            && let Some(user) = request.messages.iter().find(|m| m.role == Role::User)
        {
            self.editor_inputs
                .lock()
                .unwrap_or_else(|e| panic!("{e}"))
                .push(user.content.clone());
        }

        self.record(format!("start {}", request.agent));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let result = self.respond(request).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.record(format!("end {}", request.agent));
        result
    }
}

impl ScriptedGateway {
    async fn respond(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let response = match self.reply_for(&request.agent) {
            Reply::Text(text) => ChatResponse::text(text),
            Reply::Error(message) => {
                return Err(AgentError::ApiRequest {
                    message,
                    status: Some(500),
                });
            }
            Reply::SearchThenText(text) => {
                if request.messages.iter().any(|m| m.role == Role::Tool) {
                    ChatResponse::text(text)
                } else {
                    search_request()
                }
            }
            Reply::AlwaysSearch => search_request(),
            Reply::Empty => ChatResponse::text("  \n"),
            Reply::Delayed(delay, text) => {
                tokio::time::sleep(delay).await;
                ChatResponse::text(text)
            }
        };
        Ok(charged(response))
    }
}

/// Search returning one fixed snippet.
#[derive(Default)]
pub struct StaticSearch {
    queries: AtomicUsize,
}

impl StaticSearch {
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchCapability for StaticSearch {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn query(&self, text: &str) -> Result<Vec<Snippet>, AgentError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(vec![Snippet {
            title: "Housing Finance Agency".to_string(),
            text: format!("Background on {text}."),
            url: "https://example.org/hfa".to_string(),
        }])
    }
}

/// In-memory document source.
#[derive(Default)]
pub struct MemorySource {
    documents: HashMap<String, Document>,
}

impl MemorySource {
    #[must_use]
    pub fn with(mut self, id: &str, document: Document) -> Self {
        self.documents.insert(id.to_string(), document);
        self
    }
}

#[async_trait]
impl DocumentSource for MemorySource {
    async fn fetch(&self, id: &str) -> Result<Document, SourceError> {
        self.documents
            .get(id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound { id: id.to_string() })
    }
}

/// Sink that keeps every persisted analysis.
#[derive(Default)]
pub struct RecordingSink {
    saved: Mutex<Vec<Analysis>>,
}

impl RecordingSink {
    pub fn saved(&self) -> Vec<Analysis> {
        self.saved.lock().unwrap_or_else(|e| panic!("{e}")).clone()
    }
}

#[async_trait]
impl ReportSink for RecordingSink {
    async fn persist(&self, analysis: &Analysis) -> Result<i64, StorageError> {
        let mut saved = self.saved.lock().unwrap_or_else(|e| panic!("{e}"));
        saved.push(analysis.clone());
        Ok(i64::try_from(saved.len()).unwrap_or(i64::MAX))
    }
}

/// Sink that always fails.
pub struct FailingSink;

#[async_trait]
impl ReportSink for FailingSink {
    async fn persist(&self, _analysis: &Analysis) -> Result<i64, StorageError> {
        Err(StorageError::Task {
            message: "disk full".to_string(),
        })
    }
}

/// Test configuration with a short per-call timeout.
pub fn config(timeout: Duration) -> AgentConfig {
    AgentConfig::builder()
        .api_key("test-key")
        .call_timeout(timeout)
        .build()
        .unwrap_or_else(|e| panic!("{e}"))
}

/// An article that trips none of the protocol rules.
pub fn quiet_document() -> Document {
    Document::new(
        "Council reviews library opening hours",
        "The council reviewed library opening hours on Tuesday. Residents \
         asked for longer weekend opening at the central branch.",
    )
}

/// The housing fund article: figures, a quotation, forward-looking
/// language, attribution, policy vocabulary and one image.
pub fn housing_fund_document() -> Document {
    Document::new(
        "Minister announces €50m fund for affordable homes",
        "The Minister for Housing said the €50m fund will deliver 500 \
         affordable homes by 2026. \"This is a turning point for renters,\" \
         the minister told reporters. According to the department, the \
         scheme will be included in next year's budget.",
    )
    .with_images(vec!["https://img.example.org/site.jpg".to_string()])
    .with_source_url("https://news.example.org/housing-fund")
}
