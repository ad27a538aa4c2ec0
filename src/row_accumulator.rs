pub(crate) struct RowAccumulator {
    dot_products: Vec<f64>,
    non_zeros: Vec<isize>,
    head: isize,
}

const NONE: f64 = 0.0;
const NOT_OCCUPIED: isize = -1;
const NO_HEAD: isize = -2;

impl RowAccumulator {

    pub(crate) fn new(num_users: usize) -> Self {
        RowAccumulator {
            dot_products: vec![NONE; num_users],
            non_zeros: vec![NOT_OCCUPIED; num_users],
            head: NO_HEAD,
        }
    }

    pub(crate) fn add_to(&mut self, other_user: usize, value: f64) {
        self.dot_products[other_user] += value;

        if self.non_zeros[other_user] == NOT_OCCUPIED {
            self.non_zeros[other_user] = self.head;
            self.head = other_user as isize;
        }
    }

    /// Cosine similarities of `current_user` to every touched user with a larger index,
    /// sorted by user index. Resets the accumulator.
    pub(crate) fn upper_cosines_and_clear(
        &mut self,
        current_user: usize,
        l2norms: &[f64],
    ) -> Vec<(usize, f64)> {

        let mut similarities = Vec::new();

        while self.head != NO_HEAD {
            let other_user = self.head as usize;

            if other_user > current_user {
                let similarity = cosine(
                    self.dot_products[other_user],
                    l2norms[current_user],
                    l2norms[other_user],
                );
                if similarity != 0.0 {
                    similarities.push((other_user, similarity));
                }
            }

            self.head = self.non_zeros[other_user];
            self.dot_products[other_user] = NONE;
            self.non_zeros[other_user] = NOT_OCCUPIED;
        }
        self.head = NO_HEAD;

        similarities.sort_unstable_by_key(|(other_user, _)| *other_user);
        similarities
    }
}

/// A zero-magnitude vector is dissimilar to everything, including other empty vectors.
pub(crate) fn cosine(dot_product: f64, l2norm_a: f64, l2norm_b: f64) -> f64 {
    let denominator = l2norm_a * l2norm_b;
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    (dot_product / denominator).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulate_and_clear() {
        let l2norms = vec![1.0, 2.0, 1.0, 4.0];
        let mut accumulator = RowAccumulator::new(4);

        accumulator.add_to(3, 1.0);
        accumulator.add_to(1, 0.5);
        accumulator.add_to(3, 1.0);
        accumulator.add_to(0, 1.0);

        let similarities = accumulator.upper_cosines_and_clear(0, &l2norms);
        assert_eq!(similarities.len(), 2);
        check_entry(similarities[0], 1, 0.25);
        check_entry(similarities[1], 3, 0.5);

        // Nothing survives the clear
        assert!(accumulator.upper_cosines_and_clear(0, &l2norms).is_empty());
        accumulator.add_to(2, 1.0);
        let similarities = accumulator.upper_cosines_and_clear(1, &l2norms);
        check_entry(similarities[0], 2, 0.5);
    }

    #[test]
    fn test_cosine_of_empty_vector_is_zero() {
        assert_eq!(cosine(0.0, 0.0, 3.0), 0.0);
        assert_eq!(cosine(0.0, 0.0, 0.0), 0.0);
        assert!((cosine(25.0, 5.0, 41f64.sqrt()) - 0.7808688).abs() < 0.0001);
    }

    fn check_entry(entry: (usize, f64), expected_user: usize, expected_similarity: f64) {
        assert_eq!(entry.0, expected_user);
        assert!((entry.1 - expected_similarity).abs() < 0.0001);
    }
}
