use std::cmp::Ordering;

use tracing::debug;

use crate::config::AggregationPolicy;
use crate::matrix_builder::UserItemMatrix;
use crate::types::{Neighbor, RecommendationEntry, UserId};

#[derive(Debug, Clone, PartialEq)]
pub enum Aggregation {
    Ranked(Vec<RecommendationEntry>),
    NoRecommendations,
}

struct ItemAccumulator {
    rating_sums: Vec<f64>,
    weighted_sums: Vec<f64>,
    similarity_sums: Vec<f64>,
    support: Vec<usize>,
    non_zeros: Vec<isize>,
    head: isize,
}

const NOT_OCCUPIED: isize = -1;
const NO_HEAD: isize = -2;

impl ItemAccumulator {

    fn new(num_items: usize) -> Self {
        Self {
            rating_sums: vec![0.0; num_items],
            weighted_sums: vec![0.0; num_items],
            similarity_sums: vec![0.0; num_items],
            support: vec![0; num_items],
            non_zeros: vec![NOT_OCCUPIED; num_items],
            head: NO_HEAD,
        }
    }

    fn add(&mut self, item: usize, rating: f64, similarity: f64) {
        self.rating_sums[item] += rating;
        self.weighted_sums[item] += similarity * rating;
        self.similarity_sums[item] += similarity;
        self.support[item] += 1;

        if self.non_zeros[item] == NOT_OCCUPIED {
            self.non_zeros[item] = self.head;
            self.head = item as isize;
        }
    }

    fn collect(self, items: &[String], policy: AggregationPolicy) -> Vec<RecommendationEntry> {
        let mut entries = Vec::new();
        let mut head = self.head;

        while head != NO_HEAD {
            let item = head as usize;
            let support_count = self.support[item];

            let predicted_score = match policy {
                AggregationPolicy::Mean => self.rating_sums[item] / support_count as f64,
                AggregationPolicy::SimilarityWeighted => {
                    self.weighted_sums[item] / self.similarity_sums[item]
                }
            };

            entries.push(RecommendationEntry {
                item: items[item].clone(),
                predicted_score,
                support_count,
            });

            head = self.non_zeros[item];
        }

        entries
    }
}

fn ranking(a: &RecommendationEntry, b: &RecommendationEntry) -> Ordering {
    b.predicted_score
        .total_cmp(&a.predicted_score)
        .then_with(|| b.support_count.cmp(&a.support_count))
        .then_with(|| a.item.cmp(&b.item))
}

pub struct RecommendationAggregator {
    policy: AggregationPolicy,
}

impl Default for RecommendationAggregator {
    fn default() -> Self {
        Self::new(AggregationPolicy::Mean)
    }
}

impl RecommendationAggregator {

    pub fn new(policy: AggregationPolicy) -> Self {
        Self { policy }
    }

    pub fn aggregate(
        &self,
        user_id: UserId,
        neighbors: &[Neighbor],
        matrix: &UserItemMatrix,
        top_n: usize,
    ) -> Aggregation {
        let user = match matrix.user_index(user_id) {
            Some(user) => user,
            None => return Aggregation::NoRecommendations,
        };

        let mut already_rated = vec![false; matrix.num_items()];
        for (item, _) in matrix.row(user) {
            already_rated[item] = true;
        }

        let mut accumulator = ItemAccumulator::new(matrix.num_items());
        for neighbor in neighbors {
            if neighbor.user_id == user_id || neighbor.similarity <= 0.0 {
                continue;
            }
            let other_user = match matrix.user_index(neighbor.user_id) {
                Some(other_user) => other_user,
                None => continue,
            };
            for (item, rating) in matrix.row(other_user) {
                if !already_rated[item] {
                    accumulator.add(item, rating, neighbor.similarity);
                }
            }
        }

        let mut entries = accumulator.collect(matrix.items(), self.policy);
        debug!(user_id, candidates = entries.len(), "aggregated neighbor ratings");

        if entries.is_empty() {
            return Aggregation::NoRecommendations;
        }

        entries.sort_by(ranking);
        entries.truncate(top_n);

        Aggregation::Ranked(entries)
    }
}
