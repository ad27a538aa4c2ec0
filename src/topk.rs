use std::collections::BinaryHeap;

use crate::similarity::SimilarityArtifact;
use crate::types::{Neighbor, UserId};

pub(crate) struct TopK {
    heap: BinaryHeap<Neighbor>,
    k: usize,
}

impl TopK {

    /// Keeps the best `k` entries; `capacity` only bounds the initial allocation.
    pub(crate) fn new(k: usize, capacity: usize) -> Self {
        Self { heap: BinaryHeap::with_capacity(k.min(capacity)), k }
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    pub(crate) fn offer(&mut self, offered_entry: Neighbor) {
        if self.heap.len() < self.k {
            self.heap.push(offered_entry);
            return;
        }
        if let Some(mut top) = self.heap.peek_mut() {
            if offered_entry < *top {
                *top = offered_entry;
            }
        }
    }

    pub(crate) fn into_sorted_vec(self) -> Vec<Neighbor> {
        self.heap.into_sorted_vec()
    }
}

pub struct NeighborSelector;

impl NeighborSelector {

    /// The `k` users most similar to `user_id`, ties by ascending user id. The
    /// query user and non-positive scores are dropped before ranking. Unknown
    /// users get an empty result, same as the cold-start case.
    pub fn select(similarities: &SimilarityArtifact, user_id: UserId, k: usize) -> Vec<Neighbor> {
        match similarities.user_index(user_id) {
            Some(user) => Self::select_by_index(similarities, user, k),
            None => Vec::new(),
        }
    }

    pub(crate) fn select_by_index(
        similarities: &SimilarityArtifact,
        user: usize,
        k: usize,
    ) -> Vec<Neighbor> {
        if k == 0 {
            return Vec::new();
        }

        let user_ids = similarities.user_ids();
        let mut topk = TopK::new(k, user_ids.len());

        similarities
            .row(user)
            .iter()
            .enumerate()
            .filter(|(other_user, similarity)| *other_user != user && **similarity > 0.0)
            .for_each(|(other_user, similarity)| {
                topk.offer(Neighbor::new(user_ids[other_user], *similarity))
            });

        debug_assert!(topk.len() <= k);
        topk.into_sorted_vec()
    }
}
