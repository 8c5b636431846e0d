//! Pluggable inference gateway trait.
//!
//! Implementations translate provider-agnostic [`ChatRequest`]/[`ChatResponse`]
//! into provider-specific SDK calls. Agents, dispatch and the editor only
//! ever see this trait, so tests can substitute scripted gateways.

use std::time::Duration;

use async_trait::async_trait;

use super::message::{ChatRequest, ChatResponse};
use crate::error::AgentError;

/// Trait for inference backends.
///
/// One call is one completion: text, image inputs and tool definitions in,
/// text and/or tool-call requests out. Timeouts are applied by the caller.
#[async_trait]
pub trait InferenceGateway: Send + Sync {
    /// Provider name (e.g., `"openai"`).
    fn name(&self) -> &'static str;

    /// Executes a chat completion request.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures or unusable responses.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError>;
}

/// Runs one gateway call under a deadline.
///
/// # Errors
///
/// Returns [`AgentError::Timeout`] if the call does not finish in time,
/// otherwise whatever the gateway returns.
pub async fn chat_with_timeout(
    gateway: &dyn InferenceGateway,
    request: &ChatRequest,
    timeout: Duration,
) -> Result<ChatResponse, AgentError> {
    tokio::time::timeout(timeout, gateway.chat(request))
        .await
        .map_err(|_| AgentError::Timeout {
            operation: "inference",
            timeout,
        })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message::user_message;

    struct SlowGateway(Duration);

    #[async_trait]
    impl InferenceGateway for SlowGateway {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            tokio::time::sleep(self.0).await;
            Ok(ChatResponse::text("late"))
        }
    }

    fn request() -> ChatRequest {
        ChatRequest {
            agent: "framing_critic".to_string(),
            model: "m".to_string(),
            messages: vec![user_message("hi")],
            temperature: None,
            max_tokens: None,
            json_mode: false,
            tools: Vec::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_elapses() {
        let gateway = SlowGateway(Duration::from_secs(30));
        let result = chat_with_timeout(&gateway, &request(), Duration::from_secs(1)).await;
        assert!(matches!(
            result,
            Err(AgentError::Timeout {
                operation: "inference",
                ..
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_within_deadline() {
        let gateway = SlowGateway(Duration::from_millis(10));
        let result = chat_with_timeout(&gateway, &request(), Duration::from_secs(1)).await;
        assert_eq!(result.map(|r| r.content).ok().as_deref(), Some("late"));
    }
}
