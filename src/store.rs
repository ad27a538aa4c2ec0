use crate::error::StoreError;
use crate::types::{RawRating, UserId};

/// Source of rating rows for one ingestion batch.
pub trait RatingStore {
    fn fetch_ratings(&self) -> Result<Vec<RawRating>, StoreError>;

    /// Users that exist even if they have not rated anything yet.
    fn known_users(&self) -> Result<Vec<UserId>, StoreError> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryRatingStore {
    ratings: Vec<RawRating>,
    known_users: Vec<UserId>,
}

impl InMemoryRatingStore {

    pub fn new(ratings: Vec<RawRating>) -> Self {
        Self { ratings, known_users: Vec::new() }
    }

    pub fn with_known_users(mut self, users: Vec<UserId>) -> Self {
        self.known_users = users;
        self
    }
}

impl RatingStore for InMemoryRatingStore {
    fn fetch_ratings(&self) -> Result<Vec<RawRating>, StoreError> {
        Ok(self.ratings.clone())
    }

    fn known_users(&self) -> Result<Vec<UserId>, StoreError> {
        Ok(self.known_users.clone())
    }
}
