//! PairUp - matchmaking service for collaborative coding practice
//!
//! Users submit requests describing the difficulty levels, categories and
//! programming languages they want to practise. Each request waits in a shared
//! pending pool until it is paired with a compatible partner, cancelled, or
//! times out.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{language_compatible, CancelOutcome, Collaborators, MatchError, Matchmaker, MatchmakerConfig};
pub use models::{MatchRequest, MatchResult, RequestStatus, SubmitMatchRequest};
