//! Elicitation types
//!
//! `elicitation/create` asks the client to collect a value from the user.
//! Form mode carries an in-band flat schema of primitive fields; url mode
//! points the user at an out-of-band browser flow.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A server request for user-provided input
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElicitRequest {
    /// URL mode: complete the elicitation in a browser
    Url {
        /// Prompt shown to the user
        message: String,
        /// The URL to open
        url: String,
        /// Server-side correlation id for the out-of-band flow
        #[serde(rename = "elicitationId")]
        elicitation_id: String,
    },
    /// Form mode: collect values matching an in-band schema
    Form {
        /// Prompt shown to the user
        message: String,
        /// Flat object schema of primitive properties
        #[serde(rename = "requestedSchema")]
        requested_schema: ElicitationSchema,
    },
}

impl ElicitRequest {
    /// The user-facing prompt.
    pub fn message(&self) -> &str {
        match self {
            Self::Form { message, .. } | Self::Url { message, .. } => message,
        }
    }
}

/// Flat object schema for form-mode elicitation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElicitationSchema {
    /// Always `"object"`
    #[serde(rename = "type")]
    pub schema_type: String,
    /// Field name to primitive definition
    pub properties: HashMap<String, PrimitiveSchemaDefinition>,
    /// Names of required fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

/// A primitive field definition in an elicitation schema
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PrimitiveSchemaDefinition {
    /// String field, optionally enum-restricted
    String {
        /// Display title
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        /// Field description
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        /// Allowed values, when the field is an enumeration
        #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
        enum_values: Option<Vec<String>>,
    },
    /// Floating-point field
    Number {
        /// Display title
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        /// Field description
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        /// Inclusive minimum
        #[serde(skip_serializing_if = "Option::is_none")]
        minimum: Option<f64>,
        /// Inclusive maximum
        #[serde(skip_serializing_if = "Option::is_none")]
        maximum: Option<f64>,
    },
    /// Integer field
    Integer {
        /// Display title
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        /// Field description
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        /// Inclusive minimum
        #[serde(skip_serializing_if = "Option::is_none")]
        minimum: Option<i64>,
        /// Inclusive maximum
        #[serde(skip_serializing_if = "Option::is_none")]
        maximum: Option<i64>,
    },
    /// Boolean field
    Boolean {
        /// Display title
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        /// Field description
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        /// Default value
        #[serde(skip_serializing_if = "Option::is_none")]
        default: Option<bool>,
    },
}

/// How the user answered an elicitation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElicitationAction {
    /// The user supplied values
    Accept,
    /// The user explicitly declined
    Decline,
    /// The user dismissed without answering
    Cancel,
}

/// Result of `elicitation/create`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElicitResult {
    /// What the user did
    pub action: ElicitationAction,
    /// Collected values (present only on accept, form mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<HashMap<String, serde_json::Value>>,
}

impl ElicitResult {
    /// An accept result carrying the collected values.
    pub fn accept(content: HashMap<String, serde_json::Value>) -> Self {
        Self {
            action: ElicitationAction::Accept,
            content: Some(content),
        }
    }

    /// A decline result.
    pub fn decline() -> Self {
        Self {
            action: ElicitationAction::Decline,
            content: None,
        }
    }

    /// A cancel result.
    pub fn cancel() -> Self {
        Self {
            action: ElicitationAction::Cancel,
            content: None,
        }
    }
}
