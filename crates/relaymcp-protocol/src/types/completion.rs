//! Argument completion types

use serde::{Deserialize, Serialize};

/// What the completion is for: a prompt argument or a resource template
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CompleteReference {
    /// Complete an argument of a named prompt
    #[serde(rename = "ref/prompt")]
    Prompt {
        /// Prompt name
        name: String,
    },
    /// Complete a variable of a resource template
    #[serde(rename = "ref/resource")]
    Resource {
        /// Resource template URI
        uri: String,
    },
}

/// The argument being completed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteArgument {
    /// Argument name
    pub name: String,
    /// Current (partial) value
    pub value: String,
}

/// Parameters of `completion/complete`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteRequest {
    /// Completion target
    #[serde(rename = "ref")]
    pub reference: CompleteReference,
    /// Argument under completion
    pub argument: CompleteArgument,
}

/// Completion values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    /// Candidate values (at most 100 per schema)
    pub values: Vec<String>,
    /// Total number of candidates, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    /// Whether more candidates exist beyond `values`
    #[serde(rename = "hasMore", skip_serializing_if = "Option::is_none")]
    pub has_more: Option<bool>,
}

/// Result of `completion/complete`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteResult {
    /// The completion payload
    pub completion: Completion,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reference_tagging() {
        let p = CompleteReference::Prompt {
            name: "greet".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&p).unwrap(),
            json!({"type": "ref/prompt", "name": "greet"})
        );

        let r: CompleteReference = serde_json::from_value(json!({
            "type": "ref/resource", "uri": "file:///{path}"
        }))
        .unwrap();
        assert!(matches!(r, CompleteReference::Resource { .. }));
    }
}
