//! # relaymcp-protocol
//!
//! JSON-RPC 2.0 codec and MCP domain types for the relaymcp client
//! runtime. This crate is stateless: it defines the wire envelope
//! ([`jsonrpc`]), the capability DTOs ([`types`]), and nothing else.
//! Transports and clients build on top of it.

pub mod jsonrpc;
pub mod types;

pub use jsonrpc::{
    JSONRPC_VERSION, JsonRpcError, JsonRpcErrorCode, JsonRpcMessage, JsonRpcNotification,
    JsonRpcRequest, JsonRpcResponse, JsonRpcVersion, ProtocolError, RequestId,
};
pub use types::initialization::PROTOCOL_VERSION;
