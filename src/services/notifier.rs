use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use crate::models::Notification;
use crate::services::Notifier;

/// Errors that can occur when pushing an outcome to the realtime transport
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Transport returned error: {0}")]
    ApiError(String),
}

/// Posts notifications to the realtime transport's HTTP endpoint
///
/// The transport fans the message out to the sockets named in it.
pub struct HttpNotifier {
    endpoint: String,
    client: Client,
}

impl HttpNotifier {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { endpoint, client })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(notification)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::ApiError(format!(
                "Failed to deliver {} notification for room {}: {}",
                notification.state,
                notification.room_id,
                response.status()
            )));
        }

        tracing::debug!(
            "Delivered {} notification for room {}",
            notification.state,
            notification.room_id
        );
        Ok(())
    }
}

/// Notifier used when no transport is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            "Notify {} for room {} (user1: {}, user2: {:?})",
            notification.state,
            notification.room_id,
            notification.user1,
            notification.user2
        );
        Ok(())
    }
}
