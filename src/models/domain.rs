use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Question difficulty a user is willing to practise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DifficultyLevel {
    Easy,
    Medium,
    Hard,
}

/// Programming languages supported by the collaboration editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProgrammingLanguage {
    Python,
    Java,
    JavaScript,
    TypeScript,
    Go,
    #[serde(rename = "C++")]
    Cpp,
    C,
}

impl Default for ProgrammingLanguage {
    fn default() -> Self {
        ProgrammingLanguage::JavaScript
    }
}

/// Lifecycle state of a match request
///
/// `Pending` is the only non-terminal state. A request leaves it exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Matched,
    Cancelled,
    TimedOut,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "Pending",
            RequestStatus::Matched => "Matched",
            RequestStatus::Cancelled => "Cancelled",
            RequestStatus::TimedOut => "TimedOut",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attribute sets two requests are compared on
///
/// Each list is de-duplicated at intake and keeps its declared order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCriteria {
    #[serde(rename = "difficultyLevels")]
    pub difficulty_levels: Vec<DifficultyLevel>,
    pub categories: Vec<String>,
    #[serde(rename = "programmingLanguages")]
    pub programming_languages: Vec<ProgrammingLanguage>,
    #[serde(rename = "generalizeLanguages")]
    pub generalize_languages: bool,
}

/// One user's request to be paired with a partner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRequest {
    #[serde(rename = "requestId")]
    pub request_id: Uuid,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "transportHandle")]
    pub transport_handle: String,
    #[serde(flatten)]
    pub criteria: MatchCriteria,
    pub status: RequestStatus,
    #[serde(rename = "createdAt")]
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Arrival order inside the pool, assigned on registration
    #[serde(skip)]
    pub sequence: u64,
}

impl MatchRequest {
    pub fn new(
        user_id: String,
        display_name: String,
        transport_handle: String,
        criteria: MatchCriteria,
    ) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            user_id,
            display_name,
            transport_handle,
            criteria,
            status: RequestStatus::Pending,
            created_at: chrono::Utc::now(),
            sequence: 0,
        }
    }

    pub fn participant(&self) -> Participant {
        Participant {
            request_id: self.request_id,
            user_id: self.user_id.clone(),
            display_name: self.display_name.clone(),
            transport_handle: self.transport_handle.clone(),
        }
    }
}

/// One side of a confirmed pairing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    #[serde(rename = "requestId")]
    pub request_id: Uuid,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "transportHandle")]
    pub transport_handle: String,
}

/// A confirmed pairing, immutable once built
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    #[serde(rename = "roomId")]
    pub room_id: Uuid,
    #[serde(rename = "userOne")]
    pub user_one: Participant,
    #[serde(rename = "userTwo")]
    pub user_two: Participant,
    #[serde(rename = "selectedLanguage")]
    pub selected_language: ProgrammingLanguage,
    #[serde(rename = "difficultyIntersection")]
    pub difficulty_intersection: Vec<DifficultyLevel>,
    #[serde(rename = "categoryIntersection")]
    pub category_intersection: Vec<String>,
    #[serde(rename = "matchedAt")]
    pub matched_at: chrono::DateTime<chrono::Utc>,
}

/// Outcome message pushed to participants through the realtime transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub user1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user2: Option<String>,
    #[serde(rename = "roomId")]
    pub room_id: Uuid,
    pub state: RequestStatus,
}

impl Notification {
    pub fn matched(result: &MatchResult) -> Self {
        Self {
            user1: result.user_one.transport_handle.clone(),
            user2: Some(result.user_two.transport_handle.clone()),
            room_id: result.room_id,
            state: RequestStatus::Matched,
        }
    }

    pub fn unmatched(request: &MatchRequest, state: RequestStatus) -> Self {
        Self {
            user1: request.transport_handle.clone(),
            user2: None,
            room_id: request.request_id,
            state,
        }
    }
}

/// Rules deciding whether two pending requests may be paired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchPolicy {
    /// Language chosen when neither side declared any
    pub fallback_language: ProgrammingLanguage,
    /// Reject pairs with no shared difficulty level
    pub require_difficulty_overlap: bool,
    /// Reject pairs with no shared category
    pub require_category_overlap: bool,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            fallback_language: ProgrammingLanguage::default(),
            require_difficulty_overlap: false,
            require_category_overlap: false,
        }
    }
}
