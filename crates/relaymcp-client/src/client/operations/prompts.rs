//! Prompt operations.

use std::collections::HashMap;

use relaymcp_protocol::types::{
    GetPromptRequest, GetPromptResult, ListPromptsRequest, ListPromptsResult, ProgressToken,
    RequestMeta, methods,
};
use relaymcp_transport::Transport;

use super::tools::{parse_result, to_params};
use crate::client::core::Client;
use crate::error::{ClientError, ClientResult};

impl<T: Transport + 'static> Client<T> {
    /// List the prompts the server offers, one page at a time.
    ///
    /// # Errors
    ///
    /// `NotConnected`/`NotInitialized` before the handshake, or any
    /// request-pipeline error.
    pub async fn list_prompts(&self, cursor: Option<String>) -> ClientResult<ListPromptsResult> {
        self.ensure_initialized()?;
        let request = ListPromptsRequest { cursor };
        let raw = self
            .send_request(methods::PROMPTS_LIST, Some(to_params(&request)?))
            .await?;
        parse_result(raw)
    }

    /// Render a prompt with the given argument values.
    ///
    /// # Errors
    ///
    /// `Protocol` for an empty name; `Rpc` when the server rejects the
    /// prompt or its arguments.
    pub async fn get_prompt(
        &self,
        name: &str,
        arguments: Option<HashMap<String, String>>,
    ) -> ClientResult<GetPromptResult> {
        self.get_prompt_with_progress(name, arguments, None).await
    }

    /// Render a prompt and ask the server to report progress against the
    /// given token.
    ///
    /// # Errors
    ///
    /// Same as [`get_prompt`](Client::get_prompt).
    pub async fn get_prompt_with_progress(
        &self,
        name: &str,
        arguments: Option<HashMap<String, String>>,
        progress_token: Option<ProgressToken>,
    ) -> ClientResult<GetPromptResult> {
        self.ensure_initialized()?;
        if name.is_empty() {
            return Err(ClientError::Protocol("prompt name cannot be empty".to_string()));
        }
        let request = GetPromptRequest {
            name: name.to_string(),
            arguments,
            meta: progress_token.map(|token| RequestMeta {
                progress_token: Some(token),
            }),
        };
        let raw = self
            .send_request(methods::PROMPTS_GET, Some(to_params(&request)?))
            .await?;
        parse_result(raw)
    }
}
