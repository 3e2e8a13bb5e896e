// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    DifficultyLevel, MatchCriteria, MatchPolicy, MatchRequest, MatchResult, Notification,
    Participant, ProgrammingLanguage, RequestStatus,
};
pub use requests::SubmitMatchRequest;
pub use responses::{CancelResponse, ErrorResponse, HealthResponse, StatusResponse, SubmitMatchResponse};
