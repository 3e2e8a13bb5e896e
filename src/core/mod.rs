// Core matching exports
pub mod error;
pub mod intersect;
pub mod lifecycle;
pub mod pool;
pub mod timers;

pub use error::MatchError;
pub use intersect::{category_intersection, difficulty_intersection, is_compatible, language_compatible, select_language};
pub use lifecycle::{build_result, CancelOutcome, Collaborators, Matchmaker, MatchmakerConfig, Submission};
pub use pool::{MatchedPair, PendingPool, PoolState, Registration};
pub use timers::{TimerHandle, TimerRegistry};
