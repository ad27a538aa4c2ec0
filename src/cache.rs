use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::error::StaleArtifactError;
use crate::matrix_builder::UserItemMatrix;
use crate::similarity::{SimilarityArtifact, SimilarityEngine};

#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactStatus {
    Computed,
    Reused,
    Recomputed(StaleArtifactError),
    /// An artifact was accepted but can only be checked once ratings are ingested.
    Deferred,
    Discarded(StaleArtifactError),
}

#[derive(Debug, Default)]
pub struct SimilarityCache {
    current: RwLock<Option<Arc<SimilarityArtifact>>>,
}

impl SimilarityCache {

    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Arc<SimilarityArtifact>> {
        self.current.read().clone()
    }

    pub fn offer(&self, artifact: SimilarityArtifact) {
        *self.current.write() = Some(Arc::new(artifact));
    }

    pub fn offer_bytes(&self, bytes: &[u8]) -> Result<(), StaleArtifactError> {
        let artifact = SimilarityArtifact::from_bytes(bytes)?;
        self.offer(artifact);
        Ok(())
    }

    pub fn resolve(&self, matrix: &UserItemMatrix) -> (Arc<SimilarityArtifact>, ArtifactStatus) {
        let cached = self.current();

        let status = match cached {
            Some(artifact) => match artifact.check_compatible(matrix) {
                Ok(()) => {
                    info!(generation = artifact.generation(), "reusing cached similarities");
                    return (artifact, ArtifactStatus::Reused);
                }
                Err(stale) => {
                    warn!(generation = artifact.generation(), reason = %stale, "cached similarities are stale, recomputing");
                    ArtifactStatus::Recomputed(stale)
                }
            },
            None => ArtifactStatus::Computed,
        };

        let fresh = Arc::new(SimilarityEngine::compute(matrix));
        *self.current.write() = Some(Arc::clone(&fresh));

        (fresh, status)
    }

    pub fn clear(&self) {
        *self.current.write() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DuplicatePolicy;
    use crate::matrix_builder::MatrixBuilder;
    use crate::types::{RawRating, UserId};

    fn matrix_from(ratings: Vec<(UserId, &str, f64)>) -> UserItemMatrix {
        let ratings = ratings
            .into_iter()
            .map(|(user, item, value)| RawRating::new(user, item, value));
        MatrixBuilder::new(DuplicatePolicy::Reject).build(ratings).unwrap().matrix
    }

    #[test]
    fn test_compute_then_reuse() {
        let matrix = matrix_from(vec![(1, "A", 5.0), (2, "A", 3.0)]);
        let cache = SimilarityCache::new();

        let (first, status) = cache.resolve(&matrix);
        assert_eq!(status, ArtifactStatus::Computed);

        let (second, status) = cache.resolve(&matrix);
        assert_eq!(status, ArtifactStatus::Reused);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_stale_artifact_is_replaced() {
        let cache = SimilarityCache::new();
        let (old, _) = cache.resolve(&matrix_from(vec![(1, "A", 5.0), (2, "A", 3.0)]));

        let grown = matrix_from(vec![(1, "A", 5.0), (2, "A", 3.0), (3, "A", 1.0)]);
        let (fresh, status) = cache.resolve(&grown);

        assert_eq!(
            status,
            ArtifactStatus::Recomputed(StaleArtifactError::UserCountMismatch { artifact: 2, matrix: 3 })
        );
        assert_eq!(fresh.num_users(), 3);
        assert!(Arc::ptr_eq(&cache.current().unwrap(), &fresh));

        // Readers holding the old artifact keep a consistent view
        assert_eq!(old.num_users(), 2);
        assert_eq!(old.similarity(1, 2), Some(1.0));
    }

    #[test]
    fn test_offered_bytes() {
        let matrix = matrix_from(vec![(1, "A", 5.0), (2, "A", 3.0), (2, "B", 1.0)]);
        let bytes = SimilarityEngine::compute(&matrix).to_bytes().unwrap();

        let cache = SimilarityCache::new();
        cache.offer_bytes(&bytes).unwrap();

        let (_, status) = cache.resolve(&matrix);
        assert_eq!(status, ArtifactStatus::Reused);

        assert!(cache.offer_bytes(b"garbage").is_err());
        cache.clear();
        assert!(cache.current().is_none());
    }
}
