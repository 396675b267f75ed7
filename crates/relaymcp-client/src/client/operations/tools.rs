//! Tool operations.

use std::collections::HashMap;

use serde_json::Value;

use relaymcp_protocol::types::{
    CallToolRequest, CallToolResult, ListToolsRequest, ListToolsResult, ProgressToken,
    RequestMeta, Tool, methods,
};
use relaymcp_transport::Transport;

use crate::client::core::Client;
use crate::error::{ClientError, ClientResult};

impl<T: Transport + 'static> Client<T> {
    /// List the tools the server offers, one page at a time.
    ///
    /// # Errors
    ///
    /// `NotConnected`/`NotInitialized` before the handshake, or any
    /// request-pipeline error.
    pub async fn list_tools(&self, cursor: Option<String>) -> ClientResult<ListToolsResult> {
        self.ensure_initialized()?;
        let request = ListToolsRequest { cursor };
        let raw = self
            .send_request(methods::TOOLS_LIST, Some(to_params(&request)?))
            .await?;
        parse_result(raw)
    }

    /// Names of every tool on the first page, for quick discovery.
    ///
    /// # Errors
    ///
    /// Same as [`list_tools`](Client::list_tools).
    pub async fn list_tool_names(&self) -> ClientResult<Vec<String>> {
        let result = self.list_tools(None).await?;
        Ok(result.tools.into_iter().map(|tool: Tool| tool.name).collect())
    }

    /// Call a tool with the given arguments.
    ///
    /// # Errors
    ///
    /// `NotConnected`/`NotInitialized` before the handshake, `Rpc` when
    /// the server rejects the call, or any request-pipeline error. A
    /// tool-level failure comes back as `Ok` with `is_error` set.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<HashMap<String, Value>>,
    ) -> ClientResult<CallToolResult> {
        self.call_tool_with_progress(name, arguments, None).await
    }

    /// Call a tool and ask the server to report progress against the
    /// given token.
    ///
    /// # Errors
    ///
    /// Same as [`call_tool`](Client::call_tool).
    pub async fn call_tool_with_progress(
        &self,
        name: &str,
        arguments: Option<HashMap<String, Value>>,
        progress_token: Option<ProgressToken>,
    ) -> ClientResult<CallToolResult> {
        self.ensure_initialized()?;
        if name.is_empty() {
            return Err(ClientError::Protocol("tool name cannot be empty".to_string()));
        }
        let request = CallToolRequest {
            name: name.to_string(),
            arguments,
            meta: progress_token.map(|token| RequestMeta {
                progress_token: Some(token),
            }),
        };
        let raw = self
            .send_request(methods::TOOLS_CALL, Some(to_params(&request)?))
            .await?;
        parse_result(raw)
    }
}

pub(super) fn to_params<P: serde::Serialize>(params: &P) -> ClientResult<Value> {
    serde_json::to_value(params)
        .map_err(|e| ClientError::Protocol(format!("failed to serialize params: {e}")))
}

pub(super) fn parse_result<R: serde::de::DeserializeOwned>(raw: Value) -> ClientResult<R> {
    serde_json::from_value(raw)
        .map_err(|e| ClientError::Protocol(format!("invalid result payload: {e}")))
}
