//! Tool type definitions for function-calling.
//!
//! Provides provider-agnostic types for tool definitions and calls. The
//! only tool exposed to agents is `web_search`, backed by the
//! [`SearchCapability`](super::search::SearchCapability).

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::AgentError;

/// Name of the web search tool.
pub const WEB_SEARCH: &str = "web_search";

/// Maximum accepted length of a search query requested by a model.
const MAX_QUERY_LEN: usize = 500;

/// A tool definition that can be sent to an LLM for function-calling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema object describing the tool's parameters.
    pub parameters: serde_json::Value,
}

/// A tool call requested by the LLM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this call (assigned by the provider).
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// JSON-encoded arguments for the tool.
    pub arguments: String,
}

/// Arguments of a `web_search` call.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchArgs {
    /// Query text.
    pub query: String,
}

impl ToolCall {
    /// Parses and validates `web_search` arguments.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ResponseParse`] if this is not a `web_search`
    /// call, the arguments are not valid JSON, or the query is empty or
    /// oversized.
    pub fn search_args(&self) -> Result<SearchArgs, AgentError> {
        if self.name != WEB_SEARCH {
            return Err(AgentError::ResponseParse {
                message: format!("unknown tool '{}'", self.name),
                content: self.arguments.clone(),
            });
        }
        let args: SearchArgs =
            serde_json::from_str(&self.arguments).map_err(|e| AgentError::ResponseParse {
                message: format!("invalid {WEB_SEARCH} arguments: {e}"),
                content: self.arguments.clone(),
            })?;
        let query = args.query.trim();
        if query.is_empty() || query.len() > MAX_QUERY_LEN {
            return Err(AgentError::ResponseParse {
                message: format!("{WEB_SEARCH} query must be 1..={MAX_QUERY_LEN} bytes"),
                content: self.arguments.clone(),
            });
        }
        Ok(SearchArgs {
            query: query.to_string(),
        })
    }
}

/// A set of tool definitions scoped to an agent capability.
///
/// - `ToolUse` agents: `web_search`
/// - everything else: no tools
#[derive(Debug, Clone, Default)]
pub struct ToolSet {
    definitions: Vec<ToolDefinition>,
}

impl ToolSet {
    /// Returns the tool definitions in this set.
    #[must_use]
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Returns `true` if this set contains no tools.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Returns the number of tools in this set.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Tool set for research agents.
    #[must_use]
    pub fn research_tools() -> Self {
        Self {
            definitions: vec![def_web_search()],
        }
    }

    /// Empty tool set (no tools available).
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }
}

/// Defines the `web_search` tool.
fn def_web_search() -> ToolDefinition {
    ToolDefinition {
        name: WEB_SEARCH.to_string(),
        description: "Search the web for background, prior reporting, or official figures \
                       relevant to a claim in the article. Returns a short list of ranked \
                       snippets. You may search once."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query text."
                }
            },
            "required": ["query"],
            "additionalProperties": false
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: "call_1".to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    #[test]
    fn test_research_tools() {
        let ts = ToolSet::research_tools();
        assert_eq!(ts.len(), 1);
        assert_eq!(ts.definitions()[0].name, WEB_SEARCH);
        assert_eq!(ts.definitions()[0].parameters["type"], "object");
    }

    #[test]
    fn test_toolset_none() {
        let ts = ToolSet::none();
        assert!(ts.is_empty());
    }

    #[test]
    fn test_search_args_valid() {
        let args = call(WEB_SEARCH, r#"{"query":"  Irish housing fund 2026 "}"#)
            .search_args()
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(args.query, "Irish housing fund 2026");
    }

    #[test]
    fn test_search_args_rejects_unknown_tool() {
        assert!(call("get_chunks", r#"{"query":"x"}"#).search_args().is_err());
    }

    #[test]
    fn test_search_args_rejects_bad_json_and_empty() {
        assert!(call(WEB_SEARCH, "not json").search_args().is_err());
        assert!(call(WEB_SEARCH, r#"{"query":"   "}"#).search_args().is_err());
        let long = format!(r#"{{"query":"{}"}}"#, "q".repeat(MAX_QUERY_LEN + 1));
        assert!(call(WEB_SEARCH, &long).search_args().is_err());
    }
}
