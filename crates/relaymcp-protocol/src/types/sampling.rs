//! Sampling types
//!
//! `sampling/createMessage` lets a server ask the client to run an LLM
//! inference on its behalf, optionally with human review before the
//! request and before the response are released.

use serde::{Deserialize, Serialize};

use super::content::Content;
use super::prompts::Role;

/// A message in a sampling conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingMessage {
    /// Who speaks
    pub role: Role,
    /// What is said
    pub content: Content,
}

/// A hint naming a preferred model family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelHint {
    /// Substring-matched model name, e.g. `"claude-3"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Server preferences for model selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelPreferences {
    /// Ordered model hints, strongest preference first
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<ModelHint>>,
    /// Relative priority of cost (0.0 - 1.0)
    #[serde(rename = "costPriority", skip_serializing_if = "Option::is_none")]
    pub cost_priority: Option<f64>,
    /// Relative priority of latency (0.0 - 1.0)
    #[serde(rename = "speedPriority", skip_serializing_if = "Option::is_none")]
    pub speed_priority: Option<f64>,
    /// Relative priority of capability (0.0 - 1.0)
    #[serde(rename = "intelligencePriority", skip_serializing_if = "Option::is_none")]
    pub intelligence_priority: Option<f64>,
}

/// Parameters of `sampling/createMessage`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMessageRequest {
    /// Conversation so far
    pub messages: Vec<SamplingMessage>,
    /// Model selection preferences
    #[serde(rename = "modelPreferences", skip_serializing_if = "Option::is_none")]
    pub model_preferences: Option<ModelPreferences>,
    /// System prompt the server requests
    #[serde(rename = "systemPrompt", skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// What context from MCP servers to include
    #[serde(rename = "includeContext", skip_serializing_if = "Option::is_none")]
    pub include_context: Option<String>,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Maximum tokens to sample
    #[serde(rename = "maxTokens")]
    pub max_tokens: u64,
    /// Stop sequences
    #[serde(rename = "stopSequences", skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    /// Provider-specific metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Result of `sampling/createMessage`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMessageResult {
    /// Role of the sampled message (always assistant in practice)
    pub role: Role,
    /// Sampled content
    pub content: Content,
    /// Name of the model actually used
    pub model: String,
    /// Why sampling stopped
    #[serde(rename = "stopReason", skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_message_request_round_trip() {
        let value = json!({
            "messages": [
                {"role": "user", "content": {"type": "text", "text": "What is 2+2?"}}
            ],
            "maxTokens": 100,
            "systemPrompt": "Be brief."
        });
        let req: CreateMessageRequest = serde_json::from_value(value).unwrap();
        assert_eq!(req.max_tokens, 100);
        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.system_prompt.as_deref(), Some("Be brief."));
    }
}
