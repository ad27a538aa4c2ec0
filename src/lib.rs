//! User-based collaborative filtering.
//!
//! Ratings are turned into a sparse user-item matrix, users are compared with
//! cosine similarity, and the unrated items of a query user are scored from the
//! ratings of its most similar users.
//!
//! ```
//! use ubcf::{QueryOutcome, RawRating, RecommendationRequest, Recommender};
//!
//! let recommender = Recommender::default();
//! recommender.ingest(vec![
//!     RawRating::new(1, "A", 5.0),
//!     RawRating::new(2, "A", 5.0),
//!     RawRating::new(2, "B", 4.0),
//!     RawRating::new(3, "C", 5.0),
//! ]).expect("no duplicate ratings");
//!
//! let outcome = recommender.recommend(&RecommendationRequest::new(1)).expect("catalog is not empty");
//! assert_eq!(outcome.entries()[0].item, "B");
//! assert!(matches!(
//!     recommender.recommend(&RecommendationRequest::new(7)),
//!     Ok(QueryOutcome::UnknownUser(7))
//! ));
//! ```

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod matrix_builder;
pub mod query;
pub mod similarity;
pub mod store;
pub mod topk;
pub mod types;

mod row_accumulator;

pub use aggregator::{Aggregation, RecommendationAggregator};
pub use cache::{ArtifactStatus, SimilarityCache};
pub use config::{AggregationPolicy, DuplicatePolicy, EngineConfig};
pub use dedup::{merge_identical_rows, MergeMap};
pub use engine::{IngestReport, Recommender};
pub use error::{EngineError, InputError, MatrixError, StaleArtifactError, StoreError};
pub use matrix_builder::{BuildReport, MatrixBuilder, UserItemMatrix};
pub use query::{
    validate_user_id, InvalidUserId, NoRecommendationsReason, QueryOutcome,
    RecommendationRequest, UserIdValidation,
};
pub use similarity::{SimilarityArtifact, SimilarityEngine};
pub use store::{InMemoryRatingStore, RatingStore};
pub use topk::NeighborSelector;
pub use types::{Neighbor, RawRating, Rating, RatingValue, RecommendationEntry, UserId};
