// Collaborator exports
pub mod memory;
pub mod notifier;
pub mod postgres;
pub mod publisher;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{MatchRequest, MatchResult, Notification, RequestStatus};

pub use memory::InMemoryStore;
pub use notifier::{HttpNotifier, LogNotifier, NotifyError};
pub use postgres::{PostgresStore, StoreError};
pub use publisher::{LogPublisher, PublishError, RedisPublisher};

/// Any failure from a downstream collaborator
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("publisher: {0}")]
    Publish(#[from] PublishError),

    #[error("notifier: {0}")]
    Notify(#[from] NotifyError),
}

/// Record of requests and their outcomes, keyed by request id
///
/// Single-key read-after-write must be consistent.
#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn insert_request(&self, request: &MatchRequest) -> Result<(), StoreError>;

    async fn update_status(&self, request_id: Uuid, status: RequestStatus) -> Result<(), StoreError>;

    /// Persist a confirmed pairing and mark both requests `Matched`
    async fn record_match(&self, result: &MatchResult) -> Result<(), StoreError>;

    async fn get_status(&self, request_id: Uuid) -> Result<Option<RequestStatus>, StoreError>;

    /// Delete resolved requests created before `older_than`; returns rows removed
    async fn purge_stale(&self, older_than: chrono::DateTime<chrono::Utc>) -> Result<u64, StoreError>;

    async fn health_check(&self) -> Result<bool, StoreError>;
}

/// Hands a confirmed match to downstream services
#[async_trait]
pub trait ResultPublisher: Send + Sync {
    async fn publish(&self, result: &MatchResult) -> Result<(), PublishError>;
}

/// Pushes outcomes to participants over the realtime transport
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}
