//! Core shared types
//!
//! Identity, paging, progress tokens, and the empty/ping results shared by
//! every capability module.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Name and version of an MCP implementation (client or server)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implementation {
    /// Programmatic name
    pub name: String,
    /// Version string
    pub version: String,
    /// Display title for UI contexts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Opaque pagination cursor
pub type Cursor = String;

/// Token correlating progress notifications with the request that
/// triggered them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProgressToken {
    /// String token
    String(String),
    /// Integer token
    Number(i64),
}

/// Request metadata envelope (`_meta`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestMeta {
    /// Progress token the caller wants progress reported against
    #[serde(rename = "progressToken", skip_serializing_if = "Option::is_none")]
    pub progress_token: Option<ProgressToken>,
}

/// Result carrying no data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmptyResult {}

/// Result of a `ping` request.
///
/// The schema defines this as empty, but some servers return arbitrary
/// JSON; any extra fields are captured and ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PingResult {
    /// Whatever the server chose to send back
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ping_result_accepts_any_payload() {
        let empty: PingResult = serde_json::from_value(json!({})).unwrap();
        assert!(empty.extra.is_empty());

        let noisy: PingResult =
            serde_json::from_value(json!({"uptime": 12, "note": "pong"})).unwrap();
        assert_eq!(noisy.extra.len(), 2);
    }

    #[test]
    fn progress_token_both_forms() {
        let s: ProgressToken = serde_json::from_value(json!("tok")).unwrap();
        assert_eq!(s, ProgressToken::String("tok".to_string()));
        let n: ProgressToken = serde_json::from_value(json!(5)).unwrap();
        assert_eq!(n, ProgressToken::Number(5));
    }
}
