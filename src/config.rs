use serde::{Deserialize, Serialize};

/// How the matrix builder resolves two ratings for the same (user, item) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    LastWriteWins,
    /// The whole build fails with `MatrixError::DuplicateRating`.
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationPolicy {
    Mean,
    /// Mean weighted by each neighbor's similarity to the query user.
    SimilarityWeighted,
}

pub const DEFAULT_NEIGHBORS: usize = 10;
pub const DEFAULT_TOP_N: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub duplicate_policy: DuplicatePolicy,
    /// Neighbor cap k used when a request does not carry its own
    pub neighbors: usize,
    /// Length of the recommendation list when a request does not carry its own
    pub top_n: usize,
    pub aggregation: AggregationPolicy,
    /// Collapse users with identical rating vectors at ingestion (opt-in)
    pub merge_identical_rows: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::Reject,
            neighbors: DEFAULT_NEIGHBORS,
            top_n: DEFAULT_TOP_N,
            aggregation: AggregationPolicy::Mean,
            merge_identical_rows: false,
        }
    }
}

impl EngineConfig {
    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn with_neighbors(mut self, k: usize) -> Self {
        self.neighbors = k;
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn with_aggregation(mut self, aggregation: AggregationPolicy) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn with_merge_identical_rows(mut self, merge: bool) -> Self {
        self.merge_identical_rows = merge;
        self
    }
}
