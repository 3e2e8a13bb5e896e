//! In-memory store, used when no database is configured

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{MatchRequest, MatchResult, RequestStatus};
use crate::services::{MatchStore, StoreError};

/// Stored request row
#[derive(Debug, Clone)]
pub struct StoredRequest {
    pub request: MatchRequest,
    pub room_id: Option<Uuid>,
}

/// Non-persistent store; contents are lost on restart
#[derive(Debug, Default)]
pub struct InMemoryStore {
    requests: RwLock<HashMap<Uuid, StoredRequest>>,
    matches: RwLock<Vec<MatchResult>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_request(&self, request_id: Uuid) -> Option<StoredRequest> {
        self.requests.read().await.get(&request_id).cloned()
    }

    pub async fn matches(&self) -> Vec<MatchResult> {
        self.matches.read().await.clone()
    }
}

#[async_trait]
impl MatchStore for InMemoryStore {
    async fn insert_request(&self, request: &MatchRequest) -> Result<(), StoreError> {
        self.requests.write().await.insert(
            request.request_id,
            StoredRequest {
                request: request.clone(),
                room_id: None,
            },
        );
        Ok(())
    }

    async fn update_status(&self, request_id: Uuid, status: RequestStatus) -> Result<(), StoreError> {
        let mut requests = self.requests.write().await;
        let row = requests
            .get_mut(&request_id)
            .ok_or_else(|| StoreError::NotFound(request_id.to_string()))?;
        row.request.status = status;
        Ok(())
    }

    async fn record_match(&self, result: &MatchResult) -> Result<(), StoreError> {
        {
            let mut requests = self.requests.write().await;
            for participant in [&result.user_one, &result.user_two] {
                if let Some(row) = requests.get_mut(&participant.request_id) {
                    row.request.status = RequestStatus::Matched;
                    row.room_id = Some(result.room_id);
                }
            }
        }

        self.matches.write().await.push(result.clone());
        Ok(())
    }

    async fn get_status(&self, request_id: Uuid) -> Result<Option<RequestStatus>, StoreError> {
        Ok(self
            .requests
            .read()
            .await
            .get(&request_id)
            .map(|row| row.request.status))
    }

    async fn purge_stale(&self, older_than: chrono::DateTime<chrono::Utc>) -> Result<u64, StoreError> {
        let mut requests = self.requests.write().await;
        let before = requests.len();
        requests.retain(|_, row| {
            !(row.request.status.is_terminal() && row.request.created_at < older_than)
        });
        Ok((before - requests.len()) as u64)
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}
