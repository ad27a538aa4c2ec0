use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{info, instrument, warn};

use crate::aggregator::{Aggregation, RecommendationAggregator};
use crate::cache::{ArtifactStatus, SimilarityCache};
use crate::config::EngineConfig;
use crate::dedup::{merge_identical_rows, MergeMap};
use crate::error::EngineError;
use crate::matrix_builder::{MatrixBuilder, UserItemMatrix};
use crate::query::{
    validate_user_id, NoRecommendationsReason, QueryOutcome, QueryState, RecommendationRequest,
    UserIdValidation,
};
use crate::similarity::SimilarityArtifact;
use crate::store::RatingStore;
use crate::topk::NeighborSelector;
use crate::types::{Neighbor, RawRating, UserId};

/// Everything a query reads. Published as a whole and never modified.
#[derive(Debug)]
struct Snapshot {
    matrix: UserItemMatrix,
    merges: MergeMap,
    similarities: Arc<SimilarityArtifact>,
}

impl Snapshot {
    fn representative_of(&self, user_id: UserId) -> UserId {
        self.merges.representative_of(user_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub users: usize,
    pub items: usize,
    pub accepted: usize,
    pub overwritten: usize,
    pub skipped: usize,
    pub merged_users: usize,
    pub artifact: ArtifactStatus,
}

pub struct Recommender {
    config: EngineConfig,
    cache: SimilarityCache,
    published: RwLock<Option<Arc<Snapshot>>>,
    /// Held by every writer from reading the current snapshot until its replacement is published.
    publishing: Mutex<()>,
}

impl Recommender {

    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            cache: SimilarityCache::new(),
            published: RwLock::new(None),
            publishing: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &SimilarityCache {
        &self.cache
    }

    fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.published.read().clone()
    }

    fn publish(&self, snapshot: Snapshot) {
        *self.published.write() = Some(Arc::new(snapshot));
    }

    pub fn ingest_from<S: RatingStore + ?Sized>(&self, store: &S) -> Result<IngestReport, EngineError> {
        let known_users = store.known_users()?;
        let ratings = store.fetch_ratings()?;
        self.ingest_with_known_users(ratings, known_users)
    }

    pub fn ingest<I>(&self, ratings: I) -> Result<IngestReport, EngineError>
    where
        I: IntoIterator<Item = RawRating>,
    {
        self.ingest_with_known_users(ratings, Vec::new())
    }

    /// Queries running concurrently finish on the snapshot they started with.
    #[instrument(skip_all)]
    pub fn ingest_with_known_users<I>(
        &self,
        ratings: I,
        known_users: Vec<UserId>,
    ) -> Result<IngestReport, EngineError>
    where
        I: IntoIterator<Item = RawRating>,
    {
        let _publishing = self.publishing.lock();

        let build = MatrixBuilder::new(self.config.duplicate_policy)
            .with_known_users(known_users)
            .build(ratings)?;

        for error in &build.rejected {
            warn!(%error, "rejected rating");
        }

        let (matrix, merges) = if self.config.merge_identical_rows {
            merge_identical_rows(&build.matrix)
        } else {
            (build.matrix, MergeMap::default())
        };

        let (similarities, artifact) = self.cache.resolve(&matrix);

        let report = IngestReport {
            users: matrix.num_users(),
            items: matrix.num_items(),
            accepted: build.accepted,
            overwritten: build.overwritten,
            skipped: build.rejected.len(),
            merged_users: merges.num_merged(),
            artifact,
        };

        if matrix.is_empty() {
            warn!("ingested an empty catalog, queries will fail until ratings arrive");
        }

        self.publish(Snapshot { matrix, merges, similarities });
        info!(?report, "published snapshot");

        Ok(report)
    }

    /// Stale or undecodable bytes are replaced by a fresh computation once ratings are ingested.
    pub fn load_artifact(&self, bytes: &[u8]) -> ArtifactStatus {
        let _publishing = self.publishing.lock();
        let current = self.snapshot();

        match SimilarityArtifact::from_bytes(bytes) {
            Ok(artifact) => {
                self.cache.offer(artifact);
                match current {
                    Some(current) => self.republish(&current),
                    None => ArtifactStatus::Deferred,
                }
            }
            Err(stale) => {
                warn!(reason = %stale, "ignoring similarity artifact");
                match current {
                    Some(current) => {
                        self.cache.clear();
                        self.republish(&current);
                        ArtifactStatus::Recomputed(stale)
                    }
                    None => ArtifactStatus::Discarded(stale),
                }
            }
        }
    }

    pub fn export_artifact(&self) -> Option<Result<Vec<u8>, bincode::Error>> {
        self.snapshot().map(|snapshot| snapshot.similarities.to_bytes())
    }

    /// Recomputes similarities from the published matrix unconditionally.
    pub fn refresh_similarities(&self) -> Result<(), EngineError> {
        let _publishing = self.publishing.lock();
        let current = self.snapshot().ok_or(EngineError::EmptyCatalog)?;
        self.cache.clear();
        self.republish(&current);
        Ok(())
    }

    /// Callers hold `publishing`.
    fn republish(&self, current: &Snapshot) -> ArtifactStatus {
        let (similarities, status) = self.cache.resolve(&current.matrix);
        self.publish(Snapshot {
            matrix: current.matrix.clone(),
            merges: current.merges.clone(),
            similarities,
        });
        status
    }

    pub fn validate_user_id(&self, input: &str) -> Result<UserIdValidation, EngineError> {
        let snapshot = self.non_empty_snapshot()?;
        let validation = match validate_user_id(input, &snapshot.matrix) {
            UserIdValidation::Invalid(reason) => match input.trim().parse::<UserId>() {
                Ok(user_id) if snapshot.representative_of(user_id) != user_id => {
                    UserIdValidation::Valid(user_id)
                }
                _ => UserIdValidation::Invalid(reason),
            },
            valid => valid,
        };
        Ok(validation)
    }

    pub fn similarity(&self, user_a: UserId, user_b: UserId) -> Result<Option<f64>, EngineError> {
        let snapshot = self.non_empty_snapshot()?;
        let a = snapshot.representative_of(user_a);
        let b = snapshot.representative_of(user_b);
        Ok(snapshot.similarities.similarity(a, b))
    }

    /// Neighbors of a user, `None` if the user is unknown. With merged rows the
    /// neighbors are representatives; `merged_users` maps them back.
    pub fn neighbors(&self, user_id: UserId, k: usize) -> Result<Option<Vec<Neighbor>>, EngineError> {
        let snapshot = self.non_empty_snapshot()?;
        let representative = snapshot.representative_of(user_id);
        match snapshot.similarities.user_index(representative) {
            Some(user) => Ok(Some(NeighborSelector::select_by_index(&snapshot.similarities, user, k))),
            None => Ok(None),
        }
    }

    pub fn merged_users(&self, representative: UserId) -> Vec<UserId> {
        match self.snapshot() {
            Some(snapshot) => snapshot.merges.expand(representative),
            None => vec![representative],
        }
    }

    fn non_empty_snapshot(&self) -> Result<Arc<Snapshot>, EngineError> {
        match self.snapshot() {
            Some(snapshot) if !snapshot.matrix.is_empty() => Ok(snapshot),
            _ => Err(EngineError::EmptyCatalog),
        }
    }

    pub fn recommend_for(&self, user_id: UserId) -> Result<QueryOutcome, EngineError> {
        let request = RecommendationRequest::new(user_id)
            .with_top_n(self.config.top_n)
            .with_neighbors(self.config.neighbors);
        self.recommend(&request)
    }

    #[instrument(skip(self), fields(user_id = request.user_id))]
    pub fn recommend(&self, request: &RecommendationRequest) -> Result<QueryOutcome, EngineError> {
        if request.top_n == 0 {
            return Err(EngineError::InvalidRequest("top_n must be at least 1".to_string()));
        }

        let snapshot = self.non_empty_snapshot()?;
        let mut state = QueryState::Idle;

        let user_id = snapshot.representative_of(request.user_id);
        let user = match snapshot.similarities.user_index(user_id) {
            Some(user) => user,
            None => {
                state.advance(QueryState::UnknownUser);
                return Ok(QueryOutcome::UnknownUser(request.user_id));
            }
        };

        let neighbors = NeighborSelector::select_by_index(&snapshot.similarities, user, request.k);
        state = state.advance(QueryState::NeighborsSelected { neighbors: neighbors.len() });

        if neighbors.is_empty() {
            let reason = NoRecommendationsReason::NoNeighbors;
            state
                .advance(QueryState::EmptyNeighbors)
                .advance(QueryState::NoRecommendations(reason));
            return Ok(QueryOutcome::NoRecommendations(reason));
        }

        state = state
            .advance(QueryState::NonEmptyNeighbors { neighbors: neighbors.len() })
            .advance(QueryState::Aggregating);

        let aggregator = RecommendationAggregator::new(self.config.aggregation);
        let outcome = match aggregator.aggregate(user_id, &neighbors, &snapshot.matrix, request.top_n) {
            Aggregation::Ranked(entries) => {
                state.advance(QueryState::Ranked { entries: entries.len() });
                QueryOutcome::Ranked(entries)
            }
            Aggregation::NoRecommendations => {
                let reason = NoRecommendationsReason::NoContributions;
                state.advance(QueryState::NoRecommendations(reason));
                QueryOutcome::NoRecommendations(reason)
            }
        };

        Ok(outcome)
    }
}

impl Default for Recommender {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
