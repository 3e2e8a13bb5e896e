use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;
use uuid::Uuid;

use crate::models::ErrorResponse;
use crate::services::CollaboratorError;

/// Errors surfaced by the matching core
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Request not found: {0}")]
    NotFound(Uuid),

    #[error("Collaborator failure: {0}")]
    Collaborator(#[from] CollaboratorError),

    /// A transition lost the race: the request had already left Pending
    #[error("Request {0} is no longer pending")]
    RaceDiscarded(Uuid),
}

impl MatchError {
    fn kind(&self) -> &'static str {
        match self {
            MatchError::Validation(_) => "validation_failed",
            MatchError::NotFound(_) => "not_found",
            MatchError::Collaborator(_) => "collaborator_failure",
            MatchError::RaceDiscarded(_) => "race_discarded",
        }
    }
}

impl ResponseError for MatchError {
    fn status_code(&self) -> StatusCode {
        match self {
            MatchError::Validation(_) => StatusCode::BAD_REQUEST,
            MatchError::NotFound(_) => StatusCode::NOT_FOUND,
            MatchError::RaceDiscarded(_) => StatusCode::CONFLICT,
            MatchError::Collaborator(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        HttpResponse::build(status).json(ErrorResponse {
            error: self.kind().to_string(),
            message: self.to_string(),
            status_code: status.as_u16(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let id = Uuid::new_v4();
        assert_eq!(MatchError::NotFound(id).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(MatchError::RaceDiscarded(id).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            MatchError::Validation(validator::ValidationErrors::new()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
