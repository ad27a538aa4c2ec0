use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{DEFAULT_NEIGHBORS, DEFAULT_TOP_N};
use crate::matrix_builder::UserItemMatrix;
use crate::types::{RecommendationEntry, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub user_id: UserId,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_neighbors")]
    pub k: usize,
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

fn default_neighbors() -> usize {
    DEFAULT_NEIGHBORS
}

impl RecommendationRequest {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id, top_n: DEFAULT_TOP_N, k: DEFAULT_NEIGHBORS }
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn with_neighbors(mut self, k: usize) -> Self {
        self.k = k;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoRecommendationsReason {
    NoNeighbors,
    NoContributions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryOutcome {
    Ranked(Vec<RecommendationEntry>),
    NoRecommendations(NoRecommendationsReason),
    UnknownUser(UserId),
}

impl QueryOutcome {
    pub fn entries(&self) -> &[RecommendationEntry] {
        match self {
            QueryOutcome::Ranked(entries) => entries,
            _ => &[],
        }
    }
}

/// Progress of one query. `Ranked`, `NoRecommendations` and `UnknownUser` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QueryState {
    Idle,
    NeighborsSelected { neighbors: usize },
    EmptyNeighbors,
    NonEmptyNeighbors { neighbors: usize },
    Aggregating,
    Ranked { entries: usize },
    NoRecommendations(NoRecommendationsReason),
    UnknownUser,
}

impl QueryState {

    pub(crate) fn is_terminal(self) -> bool {
        matches!(
            self,
            QueryState::Ranked { .. } | QueryState::NoRecommendations(_) | QueryState::UnknownUser
        )
    }

    pub(crate) fn can_advance_to(self, next: QueryState) -> bool {
        match (self, next) {
            (QueryState::Idle, QueryState::NeighborsSelected { .. }) => true,
            (QueryState::Idle, QueryState::UnknownUser) => true,
            (QueryState::NeighborsSelected { neighbors }, QueryState::EmptyNeighbors) => neighbors == 0,
            (
                QueryState::NeighborsSelected { neighbors },
                QueryState::NonEmptyNeighbors { neighbors: selected },
            ) => neighbors > 0 && neighbors == selected,
            (
                QueryState::EmptyNeighbors,
                QueryState::NoRecommendations(NoRecommendationsReason::NoNeighbors),
            ) => true,
            (QueryState::NonEmptyNeighbors { .. }, QueryState::Aggregating) => true,
            (QueryState::Aggregating, QueryState::Ranked { entries }) => entries > 0,
            (
                QueryState::Aggregating,
                QueryState::NoRecommendations(NoRecommendationsReason::NoContributions),
            ) => true,
            _ => false,
        }
    }

    pub(crate) fn advance(self, next: QueryState) -> QueryState {
        debug_assert!(self.can_advance_to(next), "{:?} -> {:?}", self, next);
        if next.is_terminal() {
            debug!(state = ?next, "query finished");
        } else {
            debug!(state = ?next);
        }
        next
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvalidUserId {
    NotNumeric(String),
    UnknownUser(UserId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserIdValidation {
    Valid(UserId),
    Invalid(InvalidUserId),
}

pub fn validate_user_id(input: &str, matrix: &UserItemMatrix) -> UserIdValidation {
    let trimmed = input.trim();
    match trimmed.parse::<UserId>() {
        Ok(user_id) if matrix.contains_user(user_id) => UserIdValidation::Valid(user_id),
        Ok(user_id) => UserIdValidation::Invalid(InvalidUserId::UnknownUser(user_id)),
        Err(_) => UserIdValidation::Invalid(InvalidUserId::NotNumeric(trimmed.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DuplicatePolicy;
    use crate::matrix_builder::MatrixBuilder;
    use crate::types::RawRating;

    #[test]
    fn test_validate_user_id() {
        let ratings = vec![RawRating::new(17, "Doom", 4.0)];
        let matrix = MatrixBuilder::new(DuplicatePolicy::Reject).build(ratings).unwrap().matrix;

        assert_eq!(validate_user_id(" 17 ", &matrix), UserIdValidation::Valid(17));
        assert_eq!(
            validate_user_id("18", &matrix),
            UserIdValidation::Invalid(InvalidUserId::UnknownUser(18))
        );
        assert_eq!(
            validate_user_id("seventeen", &matrix),
            UserIdValidation::Invalid(InvalidUserId::NotNumeric("seventeen".to_string()))
        );
        assert_eq!(
            validate_user_id("", &matrix),
            UserIdValidation::Invalid(InvalidUserId::NotNumeric(String::new()))
        );
    }

    #[test]
    fn test_query_state_transitions() {
        let ranked = [
            QueryState::Idle,
            QueryState::NeighborsSelected { neighbors: 2 },
            QueryState::NonEmptyNeighbors { neighbors: 2 },
            QueryState::Aggregating,
            QueryState::Ranked { entries: 3 },
        ];
        let no_neighbors = [
            QueryState::Idle,
            QueryState::NeighborsSelected { neighbors: 0 },
            QueryState::EmptyNeighbors,
            QueryState::NoRecommendations(NoRecommendationsReason::NoNeighbors),
        ];
        let no_contributions = [
            QueryState::Aggregating,
            QueryState::NoRecommendations(NoRecommendationsReason::NoContributions),
        ];

        for path in [&ranked[..], &no_neighbors[..], &no_contributions[..]] {
            assert!(path.windows(2).all(|step| step[0].can_advance_to(step[1])));
            assert!(path[..path.len() - 1].iter().all(|state| !state.is_terminal()));
            assert!(path[path.len() - 1].is_terminal());
        }

        assert!(QueryState::Idle.can_advance_to(QueryState::UnknownUser));
        assert!(QueryState::UnknownUser.is_terminal());
    }

    #[test]
    fn test_query_state_rejects_shortcuts() {
        let selected_none = QueryState::NeighborsSelected { neighbors: 0 };
        let selected_some = QueryState::NeighborsSelected { neighbors: 2 };

        assert!(!selected_none.can_advance_to(QueryState::NonEmptyNeighbors { neighbors: 0 }));
        assert!(!selected_some.can_advance_to(QueryState::EmptyNeighbors));
        assert!(!QueryState::Idle.can_advance_to(QueryState::Aggregating));
        assert!(!QueryState::EmptyNeighbors.can_advance_to(QueryState::Aggregating));
        assert!(!QueryState::EmptyNeighbors
            .can_advance_to(QueryState::NoRecommendations(NoRecommendationsReason::NoContributions)));
        assert!(!QueryState::Aggregating.can_advance_to(QueryState::Ranked { entries: 0 }));
        assert!(!QueryState::Ranked { entries: 1 }.can_advance_to(QueryState::Idle));
    }

    #[test]
    fn test_request_defaults() {
        let request = RecommendationRequest::new(3);
        assert_eq!(request.top_n, 10);
        assert_eq!(request.k, 10);

        let request = request.with_top_n(2).with_neighbors(5);
        assert_eq!(request.top_n, 2);
        assert_eq!(request.k, 5);
    }
}
