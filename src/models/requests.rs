use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::Hash;
use validator::{Validate, ValidationError};

use crate::models::domain::{DifficultyLevel, MatchCriteria, MatchRequest, ProgrammingLanguage};

/// Request to join the matching pool
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitMatchRequest {
    #[validate(length(min = 1, max = 128))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    #[validate(length(min = 1, max = 128))]
    #[serde(alias = "username", alias = "display_name", rename = "displayName")]
    pub display_name: String,
    #[validate(length(min = 1, max = 256))]
    #[serde(alias = "socket_id", alias = "transport_handle", rename = "transportHandle")]
    pub transport_handle: String,
    #[validate(length(min = 1, max = 16))]
    #[serde(alias = "difficulty_levels", rename = "difficultyLevels")]
    pub difficulty_levels: Vec<DifficultyLevel>,
    #[serde(default)]
    #[validate(length(max = 64), custom(function = "validate_categories"))]
    pub categories: Vec<String>,
    #[serde(default)]
    #[validate(length(max = 32))]
    #[serde(alias = "programming_languages", rename = "programmingLanguages")]
    pub programming_languages: Vec<ProgrammingLanguage>,
    #[serde(default)]
    #[serde(alias = "generalize_languages", rename = "generalizeLanguages")]
    pub generalize_languages: bool,
}

fn validate_categories(categories: &[String]) -> Result<(), ValidationError> {
    if categories.iter().any(|c| c.trim().is_empty()) {
        return Err(ValidationError::new("blank_category"));
    }
    Ok(())
}

impl SubmitMatchRequest {
    /// Build a fresh Pending request, de-duplicating every attribute list
    pub fn into_match_request(self) -> MatchRequest {
        let criteria = MatchCriteria {
            difficulty_levels: dedup(self.difficulty_levels),
            categories: dedup(self.categories.into_iter().map(|c| c.trim().to_string()).collect()),
            programming_languages: dedup(self.programming_languages),
            generalize_languages: self.generalize_languages,
        };

        MatchRequest::new(self.user_id, self.display_name, self.transport_handle, criteria)
    }
}

/// Drop repeats, keeping the first occurrence of each value
fn dedup<T: Eq + Hash + Clone>(values: Vec<T>) -> Vec<T> {
    let mut seen: HashSet<T> = HashSet::with_capacity(values.len());
    values
        .into_iter()
        .filter(|value| seen.insert(value.clone()))
        .collect()
}
