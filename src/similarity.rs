//! Pairwise user-user cosine similarity. Rows are accumulated sparsely, but the
//! worst case is O(|U|^2 * |I|) and the result is a dense `n x n` matrix of `f64`.

use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sprs::CsMat;
use tracing::{debug, info};

use crate::error::StaleArtifactError;
use crate::matrix_builder::UserItemMatrix;
use crate::row_accumulator::RowAccumulator;
use crate::types::UserId;

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityArtifact {
    generation: u64,
    user_ids: Vec<UserId>,
    num_items: usize,
    scores: Vec<f64>,
}

impl SimilarityArtifact {

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn user_ids(&self) -> &[UserId] {
        &self.user_ids
    }

    pub fn num_users(&self) -> usize {
        self.user_ids.len()
    }

    pub fn num_items(&self) -> usize {
        self.num_items
    }

    pub fn user_index(&self, user_id: UserId) -> Option<usize> {
        self.user_ids.binary_search(&user_id).ok()
    }

    pub fn similarity(&self, user_a: UserId, user_b: UserId) -> Option<f64> {
        let a = self.user_index(user_a)?;
        let b = self.user_index(user_b)?;
        Some(self.score(a, b))
    }

    pub(crate) fn score(&self, a: usize, b: usize) -> f64 {
        self.scores[a * self.num_users() + b]
    }

    pub(crate) fn row(&self, user: usize) -> &[f64] {
        let n = self.num_users();
        &self.scores[user * n..(user + 1) * n]
    }

    /// Checks whether this artifact can be reused for `matrix`.
    ///
    /// Only the shape is compared: the exact ordered user ids and the item count.
    /// Changed or added ratings of existing users over existing items go unnoticed.
    pub fn check_compatible(&self, matrix: &UserItemMatrix) -> Result<(), StaleArtifactError> {
        if self.num_users() != matrix.num_users() {
            return Err(StaleArtifactError::UserCountMismatch {
                artifact: self.num_users(),
                matrix: matrix.num_users(),
            });
        }
        if self.user_ids != matrix.user_ids() {
            return Err(StaleArtifactError::UserIdMismatch);
        }
        if self.num_items != matrix.num_items() {
            return Err(StaleArtifactError::ItemCountMismatch {
                artifact: self.num_items,
                matrix: matrix.num_items(),
            });
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StaleArtifactError> {
        let artifact: SimilarityArtifact = bincode::deserialize(bytes)
            .map_err(|error| StaleArtifactError::Undecodable(error.to_string()))?;

        let n = artifact.num_users();
        if artifact.scores.len() != n * n {
            return Err(StaleArtifactError::Undecodable(format!(
                "{} scores for {} users",
                artifact.scores.len(),
                n
            )));
        }
        Ok(artifact)
    }
}

pub struct SimilarityEngine;

impl SimilarityEngine {

    pub fn compute(matrix: &UserItemMatrix) -> SimilarityArtifact {
        let num_users = matrix.num_users();
        let user_representations: &CsMat<f64> = matrix.representations();
        let user_representations_transposed: CsMat<f64> = user_representations.to_csc();

        let data = user_representations.data();
        let indices = user_representations.indices();
        let indptr = user_representations.indptr();
        let data_t = user_representations_transposed.data();
        let indices_t = user_representations_transposed.indices();
        let indptr_t = user_representations_transposed.indptr();

        // Cosine does not change when a row is scaled, so every row is divided by
        // its largest magnitude to keep sums of squares away from overflow.
        let scales: Vec<f64> = (0..num_users)
            .map(|user| {
                let max_abs = indptr
                    .outer_inds_sz(user)
                    .map(|item_index| data[item_index].abs())
                    .fold(0.0, f64::max);
                if max_abs > 0.0 { max_abs } else { 1.0 }
            })
            .collect();

        let l2norms: Vec<f64> = (0..num_users)
            .map(|user| {
                let mut sum_of_squares: f64 = 0.0;
                for item_index in indptr.outer_inds_sz(user) {
                    let value = data[item_index] / scales[user];
                    sum_of_squares += value * value;
                }
                sum_of_squares.sqrt()
            })
            .collect();

        let upper_rows: Vec<Vec<(usize, f64)>> = (0..num_users)
            .into_par_iter()
            .map_init(
                || RowAccumulator::new(num_users),
                |accumulator, user| {
                    for item_index in indptr.outer_inds_sz(user) {
                        let value = data[item_index] / scales[user];
                        for user_index in indptr_t.outer_inds_sz(indices[item_index]) {
                            let other_user = indices_t[user_index];
                            let other_value = data_t[user_index] / scales[other_user];
                            accumulator.add_to(other_user, other_value * value);
                        }
                    }
                    accumulator.upper_cosines_and_clear(user, &l2norms)
                },
            )
            .collect();

        let mut scores = vec![0.0; num_users * num_users];
        for user in 0..num_users {
            scores[user * num_users + user] = 1.0;
        }
        let mut num_non_zero = 0;
        for (user, row) in upper_rows.into_iter().enumerate() {
            for (other_user, similarity) in row {
                scores[user * num_users + other_user] = similarity;
                scores[other_user * num_users + user] = similarity;
                num_non_zero += 1;
            }
        }

        let generation = NEXT_GENERATION.fetch_add(1, Ordering::Relaxed);
        debug!(generation, num_non_zero, "mirrored upper triangle");
        info!(users = num_users, items = matrix.num_items(), generation, "computed user similarities");

        SimilarityArtifact {
            generation,
            user_ids: matrix.user_ids().to_vec(),
            num_items: matrix.num_items(),
            scores,
        }
    }
}
