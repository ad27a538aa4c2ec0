//! Property-based tests for the similarity, neighbor and recommendation invariants

use proptest::prelude::*;
use ubcf::{
    DuplicatePolicy, EngineConfig, MatrixBuilder, NeighborSelector, NoRecommendationsReason,
    QueryOutcome, RawRating, RecommendationRequest, Recommender, SimilarityEngine, UserId,
    UserItemMatrix,
};

const ITEMS: [&str; 6] = ["Doom", "FIFA", "Halo", "Myst", "Tetris", "Zelda"];

/// Ratings on a 0-5 scale in half steps, zero included
fn ratings_strategy() -> impl Strategy<Value = Vec<RawRating>> {
    prop::collection::vec((0i64..8, 0usize..ITEMS.len(), 0u8..=10), 0..40).prop_map(|rows| {
        rows.into_iter()
            .map(|(user, item, half_stars)| RawRating::new(user, ITEMS[item], half_stars as f64 / 2.0))
            .collect()
    })
}

fn build(ratings: Vec<RawRating>) -> UserItemMatrix {
    MatrixBuilder::new(DuplicatePolicy::LastWriteWins)
        .build(ratings)
        .expect("last write wins never fails")
        .matrix
}

proptest! {
    #[test]
    fn similarity_is_symmetric_with_unit_diagonal(ratings in ratings_strategy()) {
        let matrix = build(ratings);
        let similarities = SimilarityEngine::compute(&matrix);

        for &a in matrix.user_ids() {
            prop_assert_eq!(similarities.similarity(a, a), Some(1.0));
            for &b in matrix.user_ids() {
                let ab = similarities.similarity(a, b).unwrap();
                let ba = similarities.similarity(b, a).unwrap();
                prop_assert_eq!(ab, ba);
                prop_assert!((0.0..=1.0).contains(&ab));
            }
        }
    }

    #[test]
    fn recomputation_is_stable(ratings in ratings_strategy()) {
        let matrix = build(ratings);
        let first = SimilarityEngine::compute(&matrix);
        let second = SimilarityEngine::compute(&matrix);

        for &a in matrix.user_ids() {
            for &b in matrix.user_ids() {
                prop_assert_eq!(first.similarity(a, b), second.similarity(a, b));
            }
        }
    }

    #[test]
    fn neighbors_are_positive_bounded_and_deterministic(ratings in ratings_strategy(), k in 0usize..6) {
        let matrix = build(ratings);
        let similarities = SimilarityEngine::compute(&matrix);

        for &user in matrix.user_ids() {
            let neighbors = NeighborSelector::select(&similarities, user, k);

            prop_assert!(neighbors.len() <= k);
            prop_assert!(neighbors.iter().all(|n| n.similarity > 0.0));
            prop_assert!(neighbors.iter().all(|n| n.user_id != user));
            prop_assert!(neighbors.windows(2).all(|w| {
                w[0].similarity > w[1].similarity
                    || (w[0].similarity == w[1].similarity && w[0].user_id < w[1].user_id)
            }), "neighbors not sorted by (similarity desc, user_id asc)");

            let again = NeighborSelector::select(&similarities, user, k);
            prop_assert_eq!(neighbors, again);
        }
    }

    #[test]
    fn never_recommends_rated_items(ratings in ratings_strategy(), top_n in 1usize..8) {
        let matrix = build(ratings.clone());
        let recommender = Recommender::new(
            EngineConfig::default().with_duplicate_policy(DuplicatePolicy::LastWriteWins),
        );
        recommender.ingest(ratings).unwrap();

        for &user in matrix.user_ids() {
            let outcome = recommender
                .recommend(&RecommendationRequest::new(user).with_top_n(top_n))
                .unwrap();

            match outcome {
                QueryOutcome::Ranked(entries) => {
                    prop_assert!(!entries.is_empty());
                    prop_assert!(entries.len() <= top_n);
                    for entry in entries {
                        prop_assert_eq!(matrix.rating(user, &entry.item), None);
                        prop_assert!(entry.support_count >= 1);
                    }
                }
                QueryOutcome::NoRecommendations(_) => {}
                QueryOutcome::UnknownUser(_) => prop_assert!(false, "user {} is known", user),
            }
        }
    }
}

#[test]
fn dissimilar_users_get_no_recommendations() {
    let recommender = Recommender::default();
    let ratings: Vec<RawRating> = ITEMS
        .iter()
        .enumerate()
        .map(|(user, item)| RawRating::new(user as UserId, *item, 4.0))
        .collect();
    recommender.ingest(ratings).unwrap();

    for user in 0..ITEMS.len() as UserId {
        assert_eq!(
            recommender.recommend(&RecommendationRequest::new(user)).unwrap(),
            QueryOutcome::NoRecommendations(NoRecommendationsReason::NoNeighbors)
        );
    }
}
