//! Gateway registry and factory.
//!
//! Maps provider names to concrete [`InferenceGateway`] implementations.

use std::sync::Arc;

use crate::agent::config::AgentConfig;
use crate::agent::provider::InferenceGateway;
use crate::agent::providers::OpenAiProvider;
use crate::error::AgentError;

/// Creates an [`InferenceGateway`] based on the configured provider name.
///
/// # Supported Providers
///
/// - `"openai"` (default): OpenAI-compatible APIs via `async-openai`
///
/// # Errors
///
/// Returns [`AgentError::UnsupportedProvider`] for unknown provider names.
pub fn create_gateway(config: &AgentConfig) -> Result<Arc<dyn InferenceGateway>, AgentError> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiProvider::new(config))),
        other => Err(AgentError::UnsupportedProvider {
            name: other.to_string(),
        }),
    }
}
