use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use async_trait::async_trait;

use crate::models::{MatchRequest, MatchResult, RequestStatus};
use crate::services::MatchStore;

/// Errors that can occur when persisting match records
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Request status as stored in the `request_status` column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "request_status", rename_all = "snake_case")]
pub enum StatusColumn {
    Pending,
    Matched,
    Cancelled,
    TimedOut,
}

impl From<RequestStatus> for StatusColumn {
    fn from(value: RequestStatus) -> Self {
        match value {
            RequestStatus::Pending => StatusColumn::Pending,
            RequestStatus::Matched => StatusColumn::Matched,
            RequestStatus::Cancelled => StatusColumn::Cancelled,
            RequestStatus::TimedOut => StatusColumn::TimedOut,
        }
    }
}

impl From<StatusColumn> for RequestStatus {
    fn from(value: StatusColumn) -> Self {
        match value {
            StatusColumn::Pending => RequestStatus::Pending,
            StatusColumn::Matched => RequestStatus::Matched,
            StatusColumn::Cancelled => RequestStatus::Cancelled,
            StatusColumn::TimedOut => RequestStatus::TimedOut,
        }
    }
}

/// PostgreSQL record of match requests and confirmed pairings
///
/// The in-memory pool stays authoritative; this is the durable history
/// consumed by other services.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect and run migrations
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
        )
        .await
    }
}

#[async_trait]
impl MatchStore for PostgresStore {
    async fn insert_request(&self, request: &MatchRequest) -> Result<(), StoreError> {
        let query = r#"
            INSERT INTO match_requests
                (request_id, user_id, display_name, transport_handle, criteria, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (request_id) DO NOTHING
        "#;

        sqlx::query(query)
            .bind(request.request_id)
            .bind(&request.user_id)
            .bind(&request.display_name)
            .bind(&request.transport_handle)
            .bind(Json(&request.criteria))
            .bind(StatusColumn::from(request.status))
            .bind(request.created_at)
            .execute(&self.pool)
            .await?;

        tracing::debug!("Stored request {} for user {}", request.request_id, request.user_id);
        Ok(())
    }

    async fn update_status(&self, request_id: Uuid, status: RequestStatus) -> Result<(), StoreError> {
        let query = r#"
            UPDATE match_requests
            SET status = $2, updated_at = NOW()
            WHERE request_id = $1
        "#;

        let result = sqlx::query(query)
            .bind(request_id)
            .bind(StatusColumn::from(status))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(request_id.to_string()));
        }

        Ok(())
    }

    async fn record_match(&self, result: &MatchResult) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let update = r#"
            UPDATE match_requests
            SET status = 'matched', room_id = $2, updated_at = NOW()
            WHERE request_id = ANY($1)
        "#;

        sqlx::query(update)
            .bind(vec![result.user_one.request_id, result.user_two.request_id])
            .bind(result.room_id)
            .execute(&mut *tx)
            .await?;

        let insert = r#"
            INSERT INTO match_results (room_id, user_one_request, user_two_request, payload, matched_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (room_id) DO NOTHING
        "#;

        sqlx::query(insert)
            .bind(result.room_id)
            .bind(result.user_one.request_id)
            .bind(result.user_two.request_id)
            .bind(Json(result))
            .bind(result.matched_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(
            "Recorded match {} ({} <-> {})",
            result.room_id,
            result.user_one.user_id,
            result.user_two.user_id
        );
        Ok(())
    }

    async fn get_status(&self, request_id: Uuid) -> Result<Option<RequestStatus>, StoreError> {
        let query = r#"
            SELECT status
            FROM match_requests
            WHERE request_id = $1
        "#;

        let row = sqlx::query(query)
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.get::<StatusColumn, _>("status").into()))
    }

    async fn purge_stale(&self, older_than: chrono::DateTime<chrono::Utc>) -> Result<u64, StoreError> {
        let query = r#"
            DELETE FROM match_requests
            WHERE status <> 'pending' AND created_at < $1
        "#;

        let result = sqlx::query(query).bind(older_than).execute(&self.pool).await?;

        if result.rows_affected() > 0 {
            tracing::info!("Purged {} stale match requests", result.rows_affected());
        }

        Ok(result.rows_affected())
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}
