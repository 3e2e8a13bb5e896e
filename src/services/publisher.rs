use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use thiserror::Error;

use crate::models::MatchResult;
use crate::services::ResultPublisher;

/// Errors that can occur while handing off a match
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Publishes confirmed matches as JSON on a Redis channel
///
/// Downstream services (question assignment, collaboration rooms) subscribe
/// to the channel.
pub struct RedisPublisher {
    // ConnectionManager needs &mut for queries
    redis: Arc<tokio::sync::Mutex<ConnectionManager>>,
    channel: String,
}

impl RedisPublisher {
    pub async fn new(redis_url: &str, channel: impl Into<String>) -> Result<Self, PublishError> {
        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;

        Ok(Self {
            redis: Arc::new(tokio::sync::Mutex::new(redis)),
            channel: channel.into(),
        })
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

#[async_trait]
impl ResultPublisher for RedisPublisher {
    async fn publish(&self, result: &MatchResult) -> Result<(), PublishError> {
        let payload = serde_json::to_string(result)?;

        let mut conn = self.redis.lock().await;
        let receivers: i64 = redis::cmd("PUBLISH")
            .arg(&self.channel)
            .arg(payload)
            .query_async(&mut *conn)
            .await?;
        drop(conn);

        tracing::debug!(
            "Published match {} to {} ({} subscribers)",
            result.room_id,
            self.channel,
            receivers
        );
        Ok(())
    }
}

/// Publisher used when no broker is configured; only logs the hand-off
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPublisher;

#[async_trait]
impl ResultPublisher for LogPublisher {
    async fn publish(&self, result: &MatchResult) -> Result<(), PublishError> {
        tracing::info!(
            "Match {} ready: {} <-> {} ({:?})",
            result.room_id,
            result.user_one.user_id,
            result.user_two.user_id,
            result.selected_language
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Participant, ProgrammingLanguage};
    use uuid::Uuid;

    fn sample_result() -> MatchResult {
        let participant = |user: &str| Participant {
            request_id: Uuid::new_v4(),
            user_id: user.to_string(),
            display_name: user.to_string(),
            transport_handle: format!("sock-{}", user),
        };
        let user_one = participant("a");

        MatchResult {
            room_id: user_one.request_id,
            user_one,
            user_two: participant("b"),
            selected_language: ProgrammingLanguage::Python,
            difficulty_intersection: vec![],
            category_intersection: vec![],
            matched_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_log_publisher_never_fails() {
        assert!(LogPublisher.publish(&sample_result()).await.is_ok());
    }

    #[tokio::test]
    #[ignore = "Requires Redis"]
    async fn test_redis_publish() {
        let publisher = RedisPublisher::new("redis://127.0.0.1:6379", "match.results.test")
            .await
            .expect("Failed to connect to Redis");

        publisher.publish(&sample_result()).await.unwrap();
    }
}
