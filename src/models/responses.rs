use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::RequestStatus;

/// Acknowledgement returned once a request joins the pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitMatchResponse {
    pub message: String,
    #[serde(rename = "requestId")]
    pub request_id: Uuid,
    #[serde(rename = "roomId")]
    pub room_id: Uuid,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "transportHandle")]
    pub transport_handle: String,
    pub status: RequestStatus,
}

/// Current status of a request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(rename = "requestId")]
    pub request_id: Uuid,
    pub status: RequestStatus,
}

/// Cancellation response, successful for unknown and already resolved requests too
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResponse {
    pub success: bool,
    #[serde(rename = "requestId")]
    pub request_id: Option<Uuid>,
    pub status: Option<RequestStatus>,
    pub message: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(rename = "pendingRequests")]
    pub pending_requests: usize,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
}
