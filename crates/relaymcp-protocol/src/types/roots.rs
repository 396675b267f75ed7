//! Roots types
//!
//! Roots are filesystem URIs the client exposes to the server as
//! workspace boundaries.

use serde::{Deserialize, Serialize};

/// A single workspace root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Root {
    /// Root URI (must be a `file://` URI per schema)
    pub uri: String,
    /// Display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Result of the server-initiated `roots/list` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListRootsResult {
    /// The roots the client exposes
    pub roots: Vec<Root>,
}
