use thiserror::Error;

use crate::types::UserId;

/// A rating row that could not be accepted. The row is skipped, ingestion continues.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("user {user_id}: rating for '{item}' is not numeric: '{value}'")]
    NotNumeric { user_id: UserId, item: String, value: String },
    #[error("user {user_id}: rating for '{item}' is not a finite number")]
    NotFinite { user_id: UserId, item: String },
    #[error("user {user_id}: empty item identifier")]
    EmptyItem { user_id: UserId },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatrixError {
    #[error("duplicate rating for user {user_id} and item '{item}'")]
    DuplicateRating { user_id: UserId, item: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("rating store unavailable: {0}")]
    Unavailable(String),
}

/// Why a similarity artifact could not be reused. Never surfaced as a failure,
/// the artifact is recomputed instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StaleArtifactError {
    #[error("artifact covers {artifact} users, matrix has {matrix}")]
    UserCountMismatch { artifact: usize, matrix: usize },
    #[error("artifact was computed over a different set of users")]
    UserIdMismatch,
    #[error("artifact covers {artifact} items, matrix has {matrix}")]
    ItemCountMismatch { artifact: usize, matrix: usize },
    #[error("artifact could not be decoded: {0}")]
    Undecodable(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("the catalog is empty, ingest ratings before querying")]
    EmptyCatalog,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Matrix(#[from] MatrixError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
