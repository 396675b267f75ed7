//! # JSON-RPC 2.0 Implementation
//!
//! Envelope types and classification for the JSON-RPC 2.0 messages carried
//! by the protocol. Incoming values are classified by shape: a `method`
//! with an `id` is a request, a `method` without an `id` is a notification,
//! and an `id` with a `result` or `error` is a response. Anything else is
//! malformed and surfaces as a [`ProtocolError`] without closing the
//! transport.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// JSON-RPC version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Decode failures for inbound protocol messages.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProtocolError {
    /// The payload was not valid JSON
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    /// The value was valid JSON but not a valid JSON-RPC 2.0 message
    #[error("malformed JSON-RPC message: {0}")]
    Malformed(String),
}

/// JSON-RPC version type
///
/// Zero-sized marker that serializes to the literal `"2.0"` and rejects
/// everything else on deserialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonRpcVersion;

impl Serialize for JsonRpcVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(JSONRPC_VERSION)
    }
}

impl<'de> Deserialize<'de> for JsonRpcVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let version = String::deserialize(deserializer)?;
        if version == JSONRPC_VERSION {
            Ok(JsonRpcVersion)
        } else {
            Err(serde::de::Error::custom(format!(
                "Invalid JSON-RPC version: expected '{JSONRPC_VERSION}', got '{version}'"
            )))
        }
    }
}

/// Request identifier: a string or a 64-bit unsigned integer.
///
/// Locally generated identifiers use the numeric form backed by a 64-bit
/// counter, so they never wrap within the lifetime of a session and must
/// never be narrowed to 32 bits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric identifier (client-generated ids use this form)
    Number(u64),
    /// String identifier
    String(String),
}

impl From<u64> for RequestId {
    fn from(n: u64) -> Self {
        Self::Number(n)
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

impl RequestId {
    /// Return the numeric form, if this is a numeric id.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::String(_) => None,
        }
    }
}

/// JSON-RPC request message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version
    pub jsonrpc: JsonRpcVersion,
    /// Request identifier
    pub id: RequestId,
    /// Request method name
    pub method: String,
    /// Request parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Create a new request.
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            id: id.into(),
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC notification message (no response expected)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    /// JSON-RPC version
    pub jsonrpc: JsonRpcVersion,
    /// Notification method name
    pub method: String,
    /// Notification parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    /// Create a new notification.
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Additional error data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// JSON-RPC response payload - ensures mutual exclusion of result and error
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcResponsePayload {
    /// Successful response with result
    Success {
        /// Response result
        result: Value,
    },
    /// Error response
    Failure {
        /// Response error
        error: JsonRpcError,
    },
}

/// JSON-RPC response message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version
    pub jsonrpc: JsonRpcVersion,
    /// Request identifier this response answers
    pub id: RequestId,
    /// Response payload (either result or error, never both)
    #[serde(flatten)]
    pub payload: JsonRpcResponsePayload,
}

impl JsonRpcResponse {
    /// Create a successful response.
    pub fn success(result: Value, id: RequestId) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            id,
            payload: JsonRpcResponsePayload::Success { result },
        }
    }

    /// Create an error response.
    pub fn error_response(error: JsonRpcError, id: RequestId) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            id,
            payload: JsonRpcResponsePayload::Failure { error },
        }
    }

    /// Get the result payload, if this is a success response.
    pub fn result(&self) -> Option<&Value> {
        match &self.payload {
            JsonRpcResponsePayload::Success { result } => Some(result),
            JsonRpcResponsePayload::Failure { .. } => None,
        }
    }

    /// Get the error payload, if this is an error response.
    pub fn error(&self) -> Option<&JsonRpcError> {
        match &self.payload {
            JsonRpcResponsePayload::Success { .. } => None,
            JsonRpcResponsePayload::Failure { error } => Some(error),
        }
    }

    /// Consume the response, yielding `Ok(result)` or `Err(error)`.
    pub fn into_result(self) -> Result<Value, JsonRpcError> {
        match self.payload {
            JsonRpcResponsePayload::Success { result } => Ok(result),
            JsonRpcResponsePayload::Failure { error } => Err(error),
        }
    }
}

/// Standard JSON-RPC error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcErrorCode {
    /// Parse error (-32700)
    ParseError,
    /// Invalid request (-32600)
    InvalidRequest,
    /// Method not found (-32601)
    MethodNotFound,
    /// Invalid params (-32602)
    InvalidParams,
    /// Internal error (-32603)
    InternalError,
}

impl JsonRpcErrorCode {
    /// Numeric code for the wire.
    pub fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
        }
    }

    /// Standard message text.
    pub fn message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
        }
    }
}

impl From<JsonRpcErrorCode> for JsonRpcError {
    fn from(code: JsonRpcErrorCode) -> Self {
        Self {
            code: code.code(),
            message: code.message().to_string(),
            data: None,
        }
    }
}

/// A classified inbound JSON-RPC message.
#[derive(Debug, Clone)]
pub enum JsonRpcMessage {
    /// Server-initiated request (has `method` and `id`)
    Request(JsonRpcRequest),
    /// Notification (has `method`, no `id`)
    Notification(JsonRpcNotification),
    /// Response to a client request (has `id` and `result` or `error`)
    Response(JsonRpcResponse),
}

impl JsonRpcMessage {
    /// Classify a JSON value by the presence of `id`, `method`, `result`
    /// and `error` keys.
    ///
    /// Unknown extra fields never cause failure; only a value that fits
    /// none of the three shapes is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Malformed`] when the value is not a valid
    /// request, notification, or response.
    pub fn classify(value: Value) -> Result<Self, ProtocolError> {
        let obj = value
            .as_object()
            .ok_or_else(|| ProtocolError::Malformed("message is not a JSON object".to_string()))?;

        let has_id = obj.contains_key("id") && !obj["id"].is_null();
        let has_method = obj.contains_key("method");
        let has_result_or_error = obj.contains_key("result") || obj.contains_key("error");

        if has_method && has_id {
            serde_json::from_value(value)
                .map(Self::Request)
                .map_err(|e| ProtocolError::Malformed(e.to_string()))
        } else if has_method {
            serde_json::from_value(value)
                .map(Self::Notification)
                .map_err(|e| ProtocolError::Malformed(e.to_string()))
        } else if has_id && has_result_or_error {
            serde_json::from_value(value)
                .map(Self::Response)
                .map_err(|e| ProtocolError::Malformed(e.to_string()))
        } else {
            Err(ProtocolError::Malformed(
                "message has neither method nor result/error with id".to_string(),
            ))
        }
    }

    /// Parse and classify a raw byte payload.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidJson`] when the bytes are not JSON,
    /// or [`ProtocolError::Malformed`] when the JSON is not a valid message.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;
        Self::classify(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn version_round_trip() {
        let v = serde_json::to_value(JsonRpcVersion).unwrap();
        assert_eq!(v, json!("2.0"));
        assert!(serde_json::from_value::<JsonRpcVersion>(json!("2.0")).is_ok());
        assert!(serde_json::from_value::<JsonRpcVersion>(json!("1.0")).is_err());
    }

    #[test]
    fn request_id_forms() {
        let n: RequestId = 42u64.into();
        assert_eq!(serde_json::to_value(&n).unwrap(), json!(42));
        let s: RequestId = "req-1".into();
        assert_eq!(serde_json::to_value(&s).unwrap(), json!("req-1"));

        // Large 64-bit ids survive the round trip unscathed.
        let big = RequestId::Number(u64::MAX);
        let round: RequestId =
            serde_json::from_value(serde_json::to_value(&big).unwrap()).unwrap();
        assert_eq!(round, big);
    }

    #[test]
    fn classify_request() {
        let msg = JsonRpcMessage::classify(json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "roots/list"
        }))
        .unwrap();
        match msg {
            JsonRpcMessage::Request(req) => {
                assert_eq!(req.id, RequestId::Number(7));
                assert_eq!(req.method, "roots/list");
            }
            other => panic!("expected request, got {other:?}"),
        }
    }

    #[test]
    fn classify_notification() {
        let msg = JsonRpcMessage::classify(json!({
            "jsonrpc": "2.0",
            "method": "notifications/tools/list_changed"
        }))
        .unwrap();
        assert!(matches!(msg, JsonRpcMessage::Notification(_)));
    }

    #[test]
    fn classify_success_response() {
        let msg = JsonRpcMessage::classify(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {"tools": []}
        }))
        .unwrap();
        match msg {
            JsonRpcMessage::Response(resp) => {
                assert_eq!(resp.result().unwrap(), &json!({"tools": []}));
                assert!(resp.error().is_none());
            }
            other => panic!("expected response, got {other:?}"),
        }
    }

    #[test]
    fn classify_error_response() {
        let msg = JsonRpcMessage::classify(json!({
            "jsonrpc": "2.0",
            "id": "abc",
            "error": {"code": -32601, "message": "Method not found"}
        }))
        .unwrap();
        match msg {
            JsonRpcMessage::Response(resp) => {
                let err = resp.error().unwrap();
                assert_eq!(err.code, -32601);
            }
            other => panic!("expected response, got {other:?}"),
        }
    }

    #[test]
    fn classify_rejects_shapeless_value() {
        assert!(JsonRpcMessage::classify(json!({"jsonrpc": "2.0"})).is_err());
        assert!(JsonRpcMessage::classify(json!([1, 2, 3])).is_err());
        assert!(JsonRpcMessage::classify(json!({"id": 5})).is_err());
    }

    #[test]
    fn classify_tolerates_unknown_fields() {
        let msg = JsonRpcMessage::classify(json!({
            "jsonrpc": "2.0",
            "id": 3,
            "result": {},
            "x-vendor-extension": true
        }))
        .unwrap();
        assert!(matches!(msg, JsonRpcMessage::Response(_)));
    }

    #[test]
    fn from_slice_invalid_json() {
        let err = JsonRpcMessage::from_slice(b"not json").unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidJson(_)));
    }

    #[test]
    fn encode_decode_identity() {
        let request = JsonRpcRequest::new(9u64, "tools/call", Some(json!({"name": "echo"})));
        let encoded = serde_json::to_vec(&request).unwrap();
        match JsonRpcMessage::from_slice(&encoded).unwrap() {
            JsonRpcMessage::Request(decoded) => {
                assert_eq!(decoded.method, request.method);
                assert_eq!(decoded.id, request.id);
                assert_eq!(decoded.params, request.params);
            }
            other => panic!("expected request, got {other:?}"),
        }

        let response = JsonRpcResponse::success(json!({"ok": true}), RequestId::Number(9));
        let encoded = serde_json::to_vec(&response).unwrap();
        match JsonRpcMessage::from_slice(&encoded).unwrap() {
            JsonRpcMessage::Response(decoded) => {
                assert_eq!(decoded.result(), response.result());
            }
            other => panic!("expected response, got {other:?}"),
        }

        let notification =
            JsonRpcNotification::new("notifications/initialized", None);
        let encoded = serde_json::to_vec(&notification).unwrap();
        assert!(matches!(
            JsonRpcMessage::from_slice(&encoded).unwrap(),
            JsonRpcMessage::Notification(_)
        ));
    }

    #[test]
    fn response_payload_mutual_exclusion() {
        // A response carrying both result and error decodes as success
        // (untagged picks the first matching variant); the wire never
        // produces this, but decoding must not panic.
        let value = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": 1,
            "error": {"code": -1, "message": "x"}
        });
        assert!(serde_json::from_value::<JsonRpcResponse>(value).is_ok());
    }

    #[test]
    fn error_code_constants() {
        assert_eq!(JsonRpcErrorCode::MethodNotFound.code(), -32601);
        assert_eq!(JsonRpcErrorCode::InternalError.code(), -32603);
        let err: JsonRpcError = JsonRpcErrorCode::ParseError.into();
        assert_eq!(err.code, -32700);
    }
}
