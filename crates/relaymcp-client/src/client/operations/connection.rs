//! Connection utilities: ping, logging level, roots notifications.

use relaymcp_protocol::types::{LoggingLevel, PingResult, SetLevelRequest, methods};
use relaymcp_transport::Transport;

use super::tools::to_params;
use crate::client::core::Client;
use crate::error::ClientResult;

impl<T: Transport + 'static> Client<T> {
    /// Ping the server.
    ///
    /// Any result payload is accepted and discarded; some servers reply
    /// with extra fields and that is fine.
    ///
    /// # Errors
    ///
    /// `NotConnected` before connect, or any request-pipeline error.
    pub async fn ping(&self) -> ClientResult<PingResult> {
        if !self.is_connected() {
            return Err(crate::error::ClientError::NotConnected);
        }
        let raw = self.send_request(methods::PING, None).await?;
        Ok(serde_json::from_value(raw).unwrap_or_default())
    }

    /// Ask the server to emit log messages at `level` or above.
    ///
    /// # Errors
    ///
    /// `NotConnected`/`NotInitialized` before the handshake, or any
    /// request-pipeline error.
    pub async fn set_logging_level(&self, level: LoggingLevel) -> ClientResult<()> {
        self.ensure_initialized()?;
        let request = SetLevelRequest { level };
        self.send_request(methods::LOGGING_SET_LEVEL, Some(to_params(&request)?))
            .await?;
        Ok(())
    }

    /// Tell the server the workspace roots changed.
    ///
    /// # Errors
    ///
    /// `NotConnected` before connect, or the notification write error.
    pub async fn notify_roots_changed(&self) -> ClientResult<()> {
        self.send_notification(methods::ROOTS_LIST_CHANGED, None).await
    }
}
