//! Opt-in merging of users whose rating vectors are identical.

use std::collections::{BTreeMap, HashMap};

use tracing::info;

use crate::matrix_builder::UserItemMatrix;
use crate::types::UserId;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeMap {
    groups: BTreeMap<UserId, Vec<UserId>>,
    representatives: HashMap<UserId, UserId>,
}

impl MergeMap {

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn num_merged(&self) -> usize {
        self.representatives.len()
    }

    /// The row that now stands for `user_id`. Users that were not merged map to themselves.
    pub fn representative_of(&self, user_id: UserId) -> UserId {
        self.representatives.get(&user_id).copied().unwrap_or(user_id)
    }

    /// All original users behind `representative`, in ascending order.
    pub fn expand(&self, representative: UserId) -> Vec<UserId> {
        match self.groups.get(&representative) {
            Some(members) => members.clone(),
            None => vec![representative],
        }
    }
}

/// Two rows are identical if they rated the same items with bitwise equal values.
pub fn merge_identical_rows(matrix: &UserItemMatrix) -> (UserItemMatrix, MergeMap) {
    let mut first_seen: HashMap<Vec<(usize, u64)>, usize> = HashMap::new();
    let mut groups: BTreeMap<UserId, Vec<UserId>> = BTreeMap::new();
    let mut representatives = HashMap::new();

    let mut user_ids = Vec::with_capacity(matrix.num_users());
    let mut rows = Vec::with_capacity(matrix.num_users());

    for (user, user_id) in matrix.user_ids().iter().enumerate() {
        let row: Vec<(usize, f64)> = matrix.row(user).collect();
        let key: Vec<(usize, u64)> = row.iter().map(|(item, value)| (*item, value.to_bits())).collect();

        match first_seen.get(&key) {
            Some(representative) => {
                let representative_id = matrix.user_ids()[*representative];
                groups
                    .entry(representative_id)
                    .or_insert_with(|| vec![representative_id])
                    .push(*user_id);
                representatives.insert(*user_id, representative_id);
            }
            None => {
                first_seen.insert(key, user);
                user_ids.push(*user_id);
                rows.push(row);
            }
        }
    }

    for (representative, members) in &groups {
        info!(representative, merged = ?&members[1..], "merged users with identical ratings");
    }

    let merged = UserItemMatrix::from_rows(user_ids, matrix.items().to_vec(), rows);

    (merged, MergeMap { groups, representatives })
}
