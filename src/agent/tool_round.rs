//! Bounded tool-calling round.
//!
//! Drives the model ↔ search round-trip for tool-using agents: the model
//! may ask for a web search, the search runs, its snippets go back as a
//! tool message, and the model is called again. The number of rounds is
//! capped, and each round performs at most one search no matter how many
//! tool calls the model emits.

use std::time::Duration;

use tracing::{debug, warn};

use super::message::{
    ChatRequest, ChatResponse, TokenUsage, assistant_tool_calls_message, tool_message,
};
use super::provider::{InferenceGateway, chat_with_timeout};
use super::search::{SearchCapability, format_snippets};
use crate::error::AgentError;

/// Result of a completed tool round.
#[derive(Debug, Clone)]
pub struct ToolRoundOutcome {
    /// Final model response (the text answer).
    pub response: ChatResponse,
    /// Usage summed over every gateway call in the round.
    pub usage: TokenUsage,
    /// Number of searches executed.
    pub search_calls: usize,
    /// Number of gateway calls made.
    pub gateway_calls: usize,
}

/// Runs a bounded tool round: model → search → model, at most `max_rounds`
/// searches, followed by one final call.
///
/// Only the first tool call of a response is served. Any further calls in
/// the same response get an error tool message so the conversation stays
/// well-formed. A call with invalid arguments also gets an error tool
/// message and no search.
///
/// # Errors
///
/// Returns [`AgentError::Timeout`] if a gateway or search call exceeds
/// `timeout`, [`AgentError::SearchUnavailable`] if the search backend
/// fails, and [`AgentError::ToolLoopExceeded`] if the final call still
/// asks for tools and carries no text. Gateway errors propagate.
pub async fn tool_round(
    gateway: &dyn InferenceGateway,
    search: &dyn SearchCapability,
    request: &mut ChatRequest,
    max_rounds: usize,
    timeout: Duration,
) -> Result<ToolRoundOutcome, AgentError> {
    let mut usage = TokenUsage::default();
    let mut search_calls = 0;
    let mut gateway_calls = 0;

    for round in 0..max_rounds {
        let response = chat_with_timeout(gateway, request, timeout).await?;
        gateway_calls += 1;
        usage.accumulate(response.usage);

        if !response.requests_tools() {
            debug!(agent = %request.agent, round, "tool round finished without search");
            return Ok(ToolRoundOutcome {
                response,
                usage,
                search_calls,
                gateway_calls,
            });
        }

        debug!(
            agent = %request.agent,
            round,
            tool_count = response.tool_calls.len(),
            "model requested tools"
        );

        request
            .messages
            .push(assistant_tool_calls_message(response.tool_calls.clone()));

        for (index, call) in response.tool_calls.iter().enumerate() {
            let content = if index > 0 {
                warn!(agent = %request.agent, tool = %call.name, "extra tool call ignored");
                error_payload("only one search is allowed per round")
            } else {
                match call.search_args() {
                    Ok(args) => {
                        let snippets = tokio::time::timeout(timeout, search.query(&args.query))
                            .await
                            .map_err(|_| AgentError::Timeout {
                                operation: "search",
                                timeout,
                            })??;
                        search_calls += 1;
                        debug!(
                            agent = %request.agent,
                            backend = search.name(),
                            results = snippets.len(),
                            "search complete"
                        );
                        format_snippets(&args.query, &snippets)
                    }
                    Err(e) => {
                        warn!(agent = %request.agent, error = %e, "rejected tool call");
                        error_payload(&e.to_string())
                    }
                }
            };
            request.messages.push(tool_message(&call.id, &content));
        }
    }

    let response = chat_with_timeout(gateway, request, timeout).await?;
    gateway_calls += 1;
    usage.accumulate(response.usage);

    if response.requests_tools() && response.content.trim().is_empty() {
        return Err(AgentError::ToolLoopExceeded { max_rounds });
    }

    Ok(ToolRoundOutcome {
        response,
        usage,
        search_calls,
        gateway_calls,
    })
}

fn error_payload(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::message::{Role, system_message, user_message};
    use crate::agent::search::{DisabledSearch, Snippet};
    use crate::agent::tool::{ToolCall, WEB_SEARCH};

    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    /// Gateway that replays scripted responses in order.
    struct ScriptedGateway {
        responses: Mutex<Vec<ChatResponse>>,
        calls: AtomicUsize,
    }

    impl ScriptedGateway {
        fn new(mut responses: Vec<ChatResponse>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl InferenceGateway for ScriptedGateway {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self
                .responses
                .lock()
                .unwrap_or_else(|e| panic!("poisoned: {e}"))
                .pop();
            Ok(next.unwrap_or_else(|| ChatResponse::text("fallback")))
        }
    }

    struct CountingSearch {
        queries: AtomicUsize,
    }

    #[async_trait]
    impl SearchCapability for CountingSearch {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn query(&self, text: &str) -> Result<Vec<Snippet>, AgentError> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Snippet {
                title: "Result".to_string(),
                text: format!("about {text}"),
                url: String::new(),
            }])
        }
    }

    fn search_call(id: &str, query: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            name: WEB_SEARCH.to_string(),
            arguments: serde_json::json!({ "query": query }).to_string(),
        }
    }

    fn request() -> ChatRequest {
        ChatRequest {
            agent: "fact_checker".to_string(),
            model: "test".to_string(),
            messages: vec![system_message("check"), user_message("article")],
            temperature: Some(0.0),
            max_tokens: Some(256),
            json_mode: false,
            tools: Vec::new(),
        }
    }

    fn counting() -> CountingSearch {
        CountingSearch {
            queries: AtomicUsize::new(0),
        }
    }

    #[tokio::test]
    async fn test_single_search_then_answer() {
        let gateway = ScriptedGateway::new(vec![
            ChatResponse::tool_request(vec![search_call("call_1", "housing fund")]),
            ChatResponse::text("Verified."),
        ]);
        let search = counting();
        let mut req = request();

        let outcome = tool_round(&gateway, &search, &mut req, 1, Duration::from_secs(5))
            .await
            .unwrap_or_else(|e| panic!("tool round failed: {e}"));

        assert_eq!(outcome.response.content, "Verified.");
        assert_eq!(outcome.search_calls, 1);
        assert_eq!(outcome.gateway_calls, 2);
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 2);
        assert_eq!(search.queries.load(Ordering::SeqCst), 1);
        // system + user + assistant(tool_calls) + tool
        assert_eq!(req.messages.len(), 4);
        assert_eq!(req.messages[3].role, Role::Tool);
    }

    #[tokio::test]
    async fn test_extra_calls_in_one_response_get_one_search() {
        let gateway = ScriptedGateway::new(vec![
            ChatResponse::tool_request(vec![
                search_call("call_1", "first"),
                search_call("call_2", "second"),
                search_call("call_3", "third"),
            ]),
            ChatResponse::text("Done."),
        ]);
        let search = counting();
        let mut req = request();

        let outcome = tool_round(&gateway, &search, &mut req, 1, Duration::from_secs(5))
            .await
            .unwrap_or_else(|e| panic!("tool round failed: {e}"));

        assert_eq!(outcome.search_calls, 1);
        assert_eq!(search.queries.load(Ordering::SeqCst), 1);
        // every call id still answered
        let tool_msgs: Vec<_> = req.messages.iter().filter(|m| m.role == Role::Tool).collect();
        assert_eq!(tool_msgs.len(), 3);
        assert!(tool_msgs[1].content.contains("error"));
    }

    #[tokio::test]
    async fn test_no_tool_request_is_one_call() {
        let gateway = ScriptedGateway::new(vec![ChatResponse::text("Nothing to check.")]);
        let search = counting();
        let mut req = request();

        let outcome = tool_round(&gateway, &search, &mut req, 1, Duration::from_secs(5))
            .await
            .unwrap_or_else(|e| panic!("tool round failed: {e}"));

        assert_eq!(outcome.gateway_calls, 1);
        assert_eq!(outcome.search_calls, 0);
        assert_eq!(req.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_persistent_tool_requests_exceed_bound() {
        let gateway = ScriptedGateway::new(vec![
            ChatResponse::tool_request(vec![search_call("call_1", "a")]),
            ChatResponse::tool_request(vec![search_call("call_2", "b")]),
        ]);
        let search = counting();
        let mut req = request();

        let result = tool_round(&gateway, &search, &mut req, 1, Duration::from_secs(5)).await;
        assert!(
            matches!(result, Err(AgentError::ToolLoopExceeded { max_rounds: 1 })),
            "unexpected: {result:?}"
        );
        assert_eq!(search.queries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_final_tool_request_with_text_is_accepted() {
        let mut last = ChatResponse::tool_request(vec![search_call("call_2", "b")]);
        last.content = "Partial verdict.".to_string();
        let gateway = ScriptedGateway::new(vec![
            ChatResponse::tool_request(vec![search_call("call_1", "a")]),
            last,
        ]);
        let search = counting();
        let mut req = request();

        let outcome = tool_round(&gateway, &search, &mut req, 1, Duration::from_secs(5))
            .await
            .unwrap_or_else(|e| panic!("tool round failed: {e}"));
        assert_eq!(outcome.response.content, "Partial verdict.");
    }

    #[tokio::test]
    async fn test_invalid_arguments_skip_search() {
        let gateway = ScriptedGateway::new(vec![
            ChatResponse::tool_request(vec![ToolCall {
                id: "call_1".to_string(),
                name: WEB_SEARCH.to_string(),
                arguments: "{not json".to_string(),
            }]),
            ChatResponse::text("Answer without search."),
        ]);
        let search = counting();
        let mut req = request();

        let outcome = tool_round(&gateway, &search, &mut req, 1, Duration::from_secs(5))
            .await
            .unwrap_or_else(|e| panic!("tool round failed: {e}"));
        assert_eq!(outcome.search_calls, 0);
        assert_eq!(outcome.gateway_calls, 2);
        assert_eq!(search.queries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_search_failure_propagates() {
        let gateway = ScriptedGateway::new(vec![ChatResponse::tool_request(vec![search_call(
            "call_1", "a",
        )])]);
        let mut req = request();

        let result = tool_round(&gateway, &DisabledSearch, &mut req, 1, Duration::from_secs(5))
            .await;
        assert!(matches!(result, Err(AgentError::SearchUnavailable { .. })));
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_two_rounds_allowed() {
        let gateway = ScriptedGateway::new(vec![
            ChatResponse::tool_request(vec![search_call("call_1", "a")]),
            ChatResponse::tool_request(vec![search_call("call_2", "b")]),
            ChatResponse::text("Two searches later."),
        ]);
        let search = counting();
        let mut req = request();

        let outcome = tool_round(&gateway, &search, &mut req, 2, Duration::from_secs(5))
            .await
            .unwrap_or_else(|e| panic!("tool round failed: {e}"));
        assert_eq!(outcome.search_calls, 2);
        assert_eq!(outcome.gateway_calls, 3);
    }
}
