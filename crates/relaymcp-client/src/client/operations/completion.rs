//! Argument completion operations.

use relaymcp_protocol::types::{
    CompleteArgument, CompleteReference, CompleteRequest, CompleteResult, methods,
};
use relaymcp_transport::Transport;

use super::tools::{parse_result, to_params};
use crate::client::core::Client;
use crate::error::ClientResult;

impl<T: Transport + 'static> Client<T> {
    /// Request completion candidates for the given reference/argument.
    ///
    /// # Errors
    ///
    /// `NotConnected`/`NotInitialized` before the handshake, or any
    /// request-pipeline error.
    pub async fn complete(&self, request: CompleteRequest) -> ClientResult<CompleteResult> {
        self.ensure_initialized()?;
        let raw = self
            .send_request(methods::COMPLETION_COMPLETE, Some(to_params(&request)?))
            .await?;
        parse_result(raw)
    }

    /// Complete an argument of a named prompt.
    ///
    /// # Errors
    ///
    /// Same as [`complete`](Client::complete).
    pub async fn complete_prompt(
        &self,
        prompt_name: &str,
        argument_name: &str,
        argument_value: &str,
    ) -> ClientResult<CompleteResult> {
        self.complete(CompleteRequest {
            reference: CompleteReference::Prompt {
                name: prompt_name.to_string(),
            },
            argument: CompleteArgument {
                name: argument_name.to_string(),
                value: argument_value.to_string(),
            },
        })
        .await
    }

    /// Complete a variable of a resource template.
    ///
    /// # Errors
    ///
    /// Same as [`complete`](Client::complete).
    pub async fn complete_resource(
        &self,
        resource_uri: &str,
        argument_name: &str,
        argument_value: &str,
    ) -> ClientResult<CompleteResult> {
        self.complete(CompleteRequest {
            reference: CompleteReference::Resource {
                uri: resource_uri.to_string(),
            },
            argument: CompleteArgument {
                name: argument_name.to_string(),
                value: argument_value.to_string(),
            },
        })
        .await
    }
}
