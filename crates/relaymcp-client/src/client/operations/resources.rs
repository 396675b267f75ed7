//! Resource operations.

use relaymcp_protocol::types::{
    EmptyResult, ListResourceTemplatesResult, ListResourcesRequest, ListResourcesResult,
    ProgressToken, ReadResourceRequest, ReadResourceResult, RequestMeta, SubscribeRequest, methods,
};
use relaymcp_transport::Transport;

use super::tools::{parse_result, to_params};
use crate::client::core::Client;
use crate::error::{ClientError, ClientResult};

impl<T: Transport + 'static> Client<T> {
    /// List the resources the server exposes, one page at a time.
    ///
    /// # Errors
    ///
    /// `NotConnected`/`NotInitialized` before the handshake, or any
    /// request-pipeline error.
    pub async fn list_resources(
        &self,
        cursor: Option<String>,
    ) -> ClientResult<ListResourcesResult> {
        self.ensure_initialized()?;
        let request = ListResourcesRequest { cursor };
        let raw = self
            .send_request(methods::RESOURCES_LIST, Some(to_params(&request)?))
            .await?;
        parse_result(raw)
    }

    /// Read the contents of a resource by URI.
    ///
    /// # Errors
    ///
    /// `Protocol` for an empty URI; otherwise as
    /// [`list_resources`](Client::list_resources).
    pub async fn read_resource(&self, uri: &str) -> ClientResult<ReadResourceResult> {
        self.read_resource_with_progress(uri, None).await
    }

    /// Read a resource and ask the server to report progress against the
    /// given token.
    ///
    /// # Errors
    ///
    /// Same as [`read_resource`](Client::read_resource).
    pub async fn read_resource_with_progress(
        &self,
        uri: &str,
        progress_token: Option<ProgressToken>,
    ) -> ClientResult<ReadResourceResult> {
        self.ensure_initialized()?;
        if uri.is_empty() {
            return Err(ClientError::Protocol("resource URI cannot be empty".to_string()));
        }
        let request = ReadResourceRequest {
            uri: uri.to_string(),
            meta: progress_token.map(|token| RequestMeta {
                progress_token: Some(token),
            }),
        };
        let raw = self
            .send_request(methods::RESOURCES_READ, Some(to_params(&request)?))
            .await?;
        parse_result(raw)
    }

    /// Subscribe to change notifications for a resource.
    ///
    /// # Errors
    ///
    /// `Protocol` for an empty URI; `Rpc` when the server does not
    /// support subscriptions.
    pub async fn subscribe_resource(&self, uri: &str) -> ClientResult<EmptyResult> {
        self.ensure_initialized()?;
        if uri.is_empty() {
            return Err(ClientError::Protocol("subscription URI cannot be empty".to_string()));
        }
        let request = SubscribeRequest {
            uri: uri.to_string(),
        };
        let raw = self
            .send_request(methods::RESOURCES_SUBSCRIBE, Some(to_params(&request)?))
            .await?;
        parse_result(raw)
    }

    /// Cancel a previous resource subscription.
    ///
    /// # Errors
    ///
    /// Same as [`subscribe_resource`](Client::subscribe_resource).
    pub async fn unsubscribe_resource(&self, uri: &str) -> ClientResult<EmptyResult> {
        self.ensure_initialized()?;
        if uri.is_empty() {
            return Err(ClientError::Protocol("unsubscription URI cannot be empty".to_string()));
        }
        let request = SubscribeRequest {
            uri: uri.to_string(),
        };
        let raw = self
            .send_request(methods::RESOURCES_UNSUBSCRIBE, Some(to_params(&request)?))
            .await?;
        parse_result(raw)
    }

    /// List URI templates for dynamically constructed resources.
    ///
    /// # Errors
    ///
    /// Same as [`list_resources`](Client::list_resources).
    pub async fn list_resource_templates(
        &self,
        cursor: Option<String>,
    ) -> ClientResult<ListResourceTemplatesResult> {
        self.ensure_initialized()?;
        let request = ListResourcesRequest { cursor };
        let raw = self
            .send_request(methods::RESOURCES_TEMPLATES_LIST, Some(to_params(&request)?))
            .await?;
        parse_result(raw)
    }
}
