use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::InputError;

pub type UserId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RatingValue {
    Number(f64),
    Text(String),
}

impl From<f64> for RatingValue {
    fn from(value: f64) -> Self {
        RatingValue::Number(value)
    }
}

impl From<&str> for RatingValue {
    fn from(value: &str) -> Self {
        RatingValue::Text(value.to_string())
    }
}

impl From<String> for RatingValue {
    fn from(value: String) -> Self {
        RatingValue::Text(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRating {
    pub user_id: UserId,
    pub item: String,
    pub value: RatingValue,
}

impl RawRating {
    pub fn new(user_id: UserId, item: impl Into<String>, value: impl Into<RatingValue>) -> Self {
        Self { user_id, item: item.into(), value: value.into() }
    }
}

/// A validated rating. The value is always finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub item: String,
    pub value: f64,
}

impl TryFrom<RawRating> for Rating {
    type Error = InputError;

    fn try_from(raw: RawRating) -> Result<Self, Self::Error> {
        let item = raw.item.trim();
        if item.is_empty() {
            return Err(InputError::EmptyItem { user_id: raw.user_id });
        }

        let value = match raw.value {
            RatingValue::Number(value) => value,
            RatingValue::Text(text) => text.trim().parse::<f64>().map_err(|_| {
                InputError::NotNumeric { user_id: raw.user_id, item: item.to_string(), value: text.clone() }
            })?,
        };

        if !value.is_finite() {
            return Err(InputError::NotFinite { user_id: raw.user_id, item: item.to_string() });
        }

        Ok(Rating { user_id: raw.user_id, item: item.to_string(), value })
    }
}

/// Ordered better-first: higher similarity, then lower user id.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Neighbor {
    pub user_id: UserId,
    pub similarity: f64,
}

impl Neighbor {
    pub fn new(user_id: UserId, similarity: f64) -> Self {
        Self { user_id, similarity }
    }
}

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Neighbor {}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        other.similarity.total_cmp(&self.similarity)
            .then_with(|| self.user_id.cmp(&other.user_id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationEntry {
    pub item: String,
    pub predicted_score: f64,
    pub support_count: usize,
}

impl fmt::Display for RecommendationEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.3}, {} neighbors)", self.item, self.predicted_score, self.support_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BinaryHeap;

    #[test]
    fn test_rating_from_text() {
        let rating = Rating::try_from(RawRating::new(3, " Doom ", "4.5")).unwrap();
        assert_eq!(rating.user_id, 3);
        assert_eq!(rating.item, "Doom");
        assert_eq!(rating.value, 4.5);
    }

    #[test]
    fn test_rating_rejects_malformed_values() {
        assert!(matches!(
            Rating::try_from(RawRating::new(1, "Doom", "five")),
            Err(InputError::NotNumeric { user_id: 1, .. })
        ));
        assert!(matches!(
            Rating::try_from(RawRating::new(1, "Doom", f64::NAN)),
            Err(InputError::NotFinite { user_id: 1, .. })
        ));
        assert!(matches!(
            Rating::try_from(RawRating::new(1, "Doom", "inf")),
            Err(InputError::NotFinite { user_id: 1, .. })
        ));
        assert!(matches!(
            Rating::try_from(RawRating::new(1, "  ", 3.0)),
            Err(InputError::EmptyItem { user_id: 1 })
        ));
    }

    #[test]
    fn test_zero_is_a_rating() {
        let rating = Rating::try_from(RawRating::new(1, "Doom", 0.0)).unwrap();
        assert_eq!(rating.value, 0.0);
    }

    #[test]
    fn test_neighbor_ordering() {
        let mut heap = BinaryHeap::new();
        heap.push(Neighbor::new(4, 0.5));
        heap.push(Neighbor::new(2, 0.9));
        heap.push(Neighbor::new(3, 0.5));
        heap.push(Neighbor::new(1, 0.7));

        // The heap root is the weakest neighbor
        assert_eq!(heap.peek().unwrap().user_id, 4);

        let sorted: Vec<UserId> = heap.into_sorted_vec().iter().map(|n| n.user_id).collect();
        assert_eq!(sorted, vec![2, 1, 3, 4]);
    }
}
