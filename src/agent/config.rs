//! Agent configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::path::PathBuf;
use std::time::Duration;

use super::catalog::AGENT_CATALOG;
use crate::error::AgentError;

/// Default per-call timeout in seconds for inference and search calls.
const DEFAULT_CALL_TIMEOUT_SECS: u64 = 90;
/// Default max tokens for the dispatch manager.
const DEFAULT_DISPATCH_MAX_TOKENS: u32 = 512;
/// Default max tokens for specialist agents.
const DEFAULT_AGENT_MAX_TOKENS: u32 = 1500;
/// Default max tokens for the editor.
const DEFAULT_EDITOR_MAX_TOKENS: u32 = 2500;
/// Default grapheme budget of the dispatch excerpt (head + middle + tail).
const DEFAULT_DISPATCH_EXCERPT_CHARS: usize = 3_000;
/// Default grapheme cap on the article body sent to specialists.
const DEFAULT_MAX_BODY_CHARS: usize = 8_000;
/// Default grapheme budget of the excerpt sent alongside images.
const DEFAULT_VISION_EXCERPT_CHARS: usize = 1_500;
/// Default search rounds per tool-using agent.
const DEFAULT_MAX_TOOL_ROUNDS: usize = 1;
/// Upper bound on search rounds per tool-using agent.
pub const MAX_TOOL_ROUNDS_LIMIT: usize = 2;

/// Configuration for the analysis desk.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// LLM provider name (e.g., "openai").
    pub provider: String,
    /// API key for the provider.
    pub api_key: String,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Model for the dispatch manager.
    pub dispatch_model: String,
    /// Model for plain-text and tool-using specialists and the forward synthesizer.
    pub agent_model: String,
    /// Model for vision specialists.
    pub vision_model: String,
    /// Model for the editor.
    pub editor_model: String,
    /// Maximum concurrently running agents.
    pub max_concurrency: usize,
    /// Deadline for each individual inference or search call.
    pub call_timeout: Duration,
    /// Maximum tokens for the dispatch manager.
    pub dispatch_max_tokens: u32,
    /// Maximum tokens for each specialist.
    pub agent_max_tokens: u32,
    /// Maximum tokens for the editor.
    pub editor_max_tokens: u32,
    /// Grapheme budget of the dispatch excerpt.
    pub dispatch_excerpt_chars: usize,
    /// Grapheme cap on the article body sent to specialists.
    pub max_body_chars: usize,
    /// Grapheme budget of the excerpt sent with images.
    pub vision_excerpt_chars: usize,
    /// Search rounds a tool-using agent may run (clamped to `1..=2`).
    pub max_tool_rounds: usize,
    /// Directory containing prompt template files.
    pub prompt_dir: Option<PathBuf>,
    /// Delay after acquiring a concurrency permit, before the first call.
    ///
    /// `Duration::ZERO` (default) disables it.
    pub request_delay: Duration,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key is found.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    dispatch_model: Option<String>,
    agent_model: Option<String>,
    vision_model: Option<String>,
    editor_model: Option<String>,
    max_concurrency: Option<usize>,
    call_timeout: Option<Duration>,
    dispatch_max_tokens: Option<u32>,
    agent_max_tokens: Option<u32>,
    editor_max_tokens: Option<u32>,
    dispatch_excerpt_chars: Option<usize>,
    max_body_chars: Option<usize>,
    vision_excerpt_chars: Option<usize>,
    max_tool_rounds: Option<usize>,
    prompt_dir: Option<PathBuf>,
    request_delay: Option<Duration>,
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("PRESSROOM_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY")
                .or_else(|_| std::env::var("PRESSROOM_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("OPENAI_BASE_URL")
                .or_else(|_| std::env::var("PRESSROOM_BASE_URL"))
                .ok();
        }
        if self.dispatch_model.is_none() {
            self.dispatch_model = std::env::var("PRESSROOM_DISPATCH_MODEL").ok();
        }
        if self.agent_model.is_none() {
            self.agent_model = std::env::var("PRESSROOM_AGENT_MODEL").ok();
        }
        if self.vision_model.is_none() {
            self.vision_model = std::env::var("PRESSROOM_VISION_MODEL").ok();
        }
        if self.editor_model.is_none() {
            self.editor_model = std::env::var("PRESSROOM_EDITOR_MODEL").ok();
        }
        if self.max_concurrency.is_none() {
            self.max_concurrency = std::env::var("PRESSROOM_MAX_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.call_timeout.is_none() {
            self.call_timeout = std::env::var("PRESSROOM_CALL_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs);
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("PRESSROOM_PROMPT_DIR")
                .ok()
                .map(PathBuf::from);
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the dispatch manager model.
    #[must_use]
    pub fn dispatch_model(mut self, model: impl Into<String>) -> Self {
        self.dispatch_model = Some(model.into());
        self
    }

    /// Sets the specialist model.
    #[must_use]
    pub fn agent_model(mut self, model: impl Into<String>) -> Self {
        self.agent_model = Some(model.into());
        self
    }

    /// Sets the vision model.
    #[must_use]
    pub fn vision_model(mut self, model: impl Into<String>) -> Self {
        self.vision_model = Some(model.into());
        self
    }

    /// Sets the editor model.
    #[must_use]
    pub fn editor_model(mut self, model: impl Into<String>) -> Self {
        self.editor_model = Some(model.into());
        self
    }

    /// Sets the maximum concurrency.
    #[must_use]
    pub const fn max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = Some(n);
        self
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub const fn call_timeout(mut self, duration: Duration) -> Self {
        self.call_timeout = Some(duration);
        self
    }

    /// Sets the specialist max tokens.
    #[must_use]
    pub const fn agent_max_tokens(mut self, n: u32) -> Self {
        self.agent_max_tokens = Some(n);
        self
    }

    /// Sets the editor max tokens.
    #[must_use]
    pub const fn editor_max_tokens(mut self, n: u32) -> Self {
        self.editor_max_tokens = Some(n);
        self
    }

    /// Sets the dispatch excerpt budget.
    #[must_use]
    pub const fn dispatch_excerpt_chars(mut self, n: usize) -> Self {
        self.dispatch_excerpt_chars = Some(n);
        self
    }

    /// Sets the body cap for specialists.
    #[must_use]
    pub const fn max_body_chars(mut self, n: usize) -> Self {
        self.max_body_chars = Some(n);
        self
    }

    /// Sets the number of search rounds per tool-using agent.
    #[must_use]
    pub const fn max_tool_rounds(mut self, n: usize) -> Self {
        self.max_tool_rounds = Some(n);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Sets the delay applied after acquiring a concurrency permit.
    #[must_use]
    pub const fn request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = Some(delay);
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key was set.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let api_key = self.api_key.ok_or(AgentError::ApiKeyMissing)?;
        let agent_model = self
            .agent_model
            .unwrap_or_else(|| "gpt-4o-mini".to_string());

        Ok(AgentConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url: self.base_url,
            dispatch_model: self
                .dispatch_model
                .unwrap_or_else(|| "gpt-4o-mini".to_string()),
            vision_model: self.vision_model.unwrap_or_else(|| "gpt-4o".to_string()),
            editor_model: self.editor_model.unwrap_or_else(|| "gpt-4o".to_string()),
            agent_model,
            max_concurrency: self
                .max_concurrency
                .unwrap_or(AGENT_CATALOG.len())
                .max(1),
            call_timeout: self
                .call_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS)),
            dispatch_max_tokens: self
                .dispatch_max_tokens
                .unwrap_or(DEFAULT_DISPATCH_MAX_TOKENS),
            agent_max_tokens: self.agent_max_tokens.unwrap_or(DEFAULT_AGENT_MAX_TOKENS),
            editor_max_tokens: self.editor_max_tokens.unwrap_or(DEFAULT_EDITOR_MAX_TOKENS),
            dispatch_excerpt_chars: self
                .dispatch_excerpt_chars
                .unwrap_or(DEFAULT_DISPATCH_EXCERPT_CHARS),
            max_body_chars: self.max_body_chars.unwrap_or(DEFAULT_MAX_BODY_CHARS),
            vision_excerpt_chars: self
                .vision_excerpt_chars
                .unwrap_or(DEFAULT_VISION_EXCERPT_CHARS),
            max_tool_rounds: self
                .max_tool_rounds
                .unwrap_or(DEFAULT_MAX_TOOL_ROUNDS)
                .clamp(1, MAX_TOOL_ROUNDS_LIMIT),
            prompt_dir: self.prompt_dir,
            request_delay: self.request_delay.unwrap_or(Duration::ZERO),
        })
    }
}
