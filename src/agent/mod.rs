//! Multi-agent editorial analysis.
//!
//! A dispatch manager proposes which specialists should read an article,
//! deterministic protocol rules add the ones the article's content demands,
//! the selected agents run concurrently, and an editor writes the verdict.
//!
//! # Architecture
//!
//! ```text
//! Document → Orchestrator
//!   ├── DispatchManager (proposes a roster, JSON mode)
//!   ├── protocol::apply_overrides (regex rules, preconditions)
//!   ├── Fan-out → N concurrent AgentRuntime::run
//!   │   └── PlainText | ToolUse (bounded search round) | Vision
//!   ├── Join barrier
//!   ├── Forward synthesizer (if on the roster)
//!   ├── Editor → final verdict
//!   └── ReportSink (failures logged only)
//! ```

pub mod catalog;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod message;
pub mod orchestrator;
pub mod prompt;
pub mod protocol;
pub mod provider;
pub mod providers;
pub mod report;
pub mod runtime;
pub mod search;
pub mod synthesis;
pub mod tool;
pub mod tool_round;

// Re-export key types
pub use catalog::{AGENT_CATALOG, AgentRole, AgentSpec, Capability};
pub use client::create_gateway;
pub use config::AgentConfig;
pub use dispatch::{DispatchManager, DispatchOutcome};
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
pub use orchestrator::{Orchestrator, StoredAnalysis};
pub use prompt::PromptSet;
pub use protocol::{PROTOCOL_RULES, RosterResolution, apply_overrides};
pub use provider::InferenceGateway;
pub use report::{
    AgentReport, AgentStatus, Analysis, DispatchDecision, ProtocolOverride, RosterExclusion,
};
pub use runtime::AgentRuntime;
pub use search::{DisabledSearch, DuckDuckGoSearch, SearchCapability, Snippet};
pub use synthesis::{Editor, Verdict};
pub use tool::{ToolCall, ToolDefinition, ToolSet};
