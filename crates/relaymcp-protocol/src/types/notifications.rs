//! Notification payloads and wire method names

use serde::{Deserialize, Serialize};

use super::core::ProgressToken;
use crate::jsonrpc::RequestId;

/// Payload of a progress notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressNotification {
    /// Token from the originating request's `_meta`
    #[serde(rename = "progressToken")]
    pub progress_token: ProgressToken,
    /// Progress so far (monotonically increasing)
    pub progress: f64,
    /// Total expected work, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    /// Human-readable progress message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Payload of a cancellation notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelledNotification {
    /// Id of the request being cancelled
    #[serde(rename = "requestId")]
    pub request_id: RequestId,
    /// Optional reason for logging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Wire method names for every operation and notification the client
/// speaks. Kept in one place so the dispatcher and operations never
/// disagree on spelling.
pub mod methods {
    /// `initialize` request
    pub const INITIALIZE: &str = "initialize";
    /// `ping` request (either direction)
    pub const PING: &str = "ping";
    /// Initialized notification
    pub const INITIALIZED: &str = "notifications/initialized";
    /// Cancellation notification (either direction)
    pub const CANCELLED: &str = "notifications/cancelled";
    /// Progress notification
    pub const PROGRESS: &str = "notifications/progress";

    /// List tools
    pub const TOOLS_LIST: &str = "tools/list";
    /// Call a tool
    pub const TOOLS_CALL: &str = "tools/call";
    /// Tool list changed notification
    pub const TOOLS_LIST_CHANGED: &str = "notifications/tools/list_changed";

    /// List resources
    pub const RESOURCES_LIST: &str = "resources/list";
    /// Read a resource
    pub const RESOURCES_READ: &str = "resources/read";
    /// Subscribe to a resource
    pub const RESOURCES_SUBSCRIBE: &str = "resources/subscribe";
    /// Unsubscribe from a resource
    pub const RESOURCES_UNSUBSCRIBE: &str = "resources/unsubscribe";
    /// List resource templates
    pub const RESOURCES_TEMPLATES_LIST: &str = "resources/templates/list";
    /// Resource list changed notification
    pub const RESOURCES_LIST_CHANGED: &str = "notifications/resources/list_changed";
    /// Resource updated notification
    pub const RESOURCES_UPDATED: &str = "notifications/resources/updated";

    /// List prompts
    pub const PROMPTS_LIST: &str = "prompts/list";
    /// Get a prompt
    pub const PROMPTS_GET: &str = "prompts/get";
    /// Prompt list changed notification
    pub const PROMPTS_LIST_CHANGED: &str = "notifications/prompts/list_changed";

    /// Argument completion
    pub const COMPLETION_COMPLETE: &str = "completion/complete";

    /// Set server logging level
    pub const LOGGING_SET_LEVEL: &str = "logging/setLevel";
    /// Server log message notification
    pub const LOG_MESSAGE: &str = "notifications/message";

    /// Server-initiated sampling request
    pub const SAMPLING_CREATE_MESSAGE: &str = "sampling/createMessage";
    /// Server-initiated elicitation request
    pub const ELICITATION_CREATE: &str = "elicitation/create";
    /// Server-initiated roots listing
    pub const ROOTS_LIST: &str = "roots/list";
    /// Roots changed notification (client to server)
    pub const ROOTS_LIST_CHANGED: &str = "notifications/roots/list_changed";
}
