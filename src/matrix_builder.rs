use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use sprs::CsMat;
use tracing::{debug, info};

use crate::config::DuplicatePolicy;
use crate::error::{InputError, MatrixError};
use crate::types::{RawRating, Rating, UserId};

/// Ratings of every user over every observed item.
///
/// Rows are users sorted by id, columns are items sorted by name. A cell is rated
/// iff the sparse matrix stores an entry for it, so a stored `0.0` is a rating of
/// zero and never means "unrated".
#[derive(Debug, Clone)]
pub struct UserItemMatrix {
    user_ids: Vec<UserId>,
    items: Vec<String>,
    ratings: CsMat<f64>,
}

impl UserItemMatrix {

    /// `rows[user]` must be sorted by column index without duplicates.
    pub(crate) fn from_rows(
        user_ids: Vec<UserId>,
        items: Vec<String>,
        rows: Vec<Vec<(usize, f64)>>,
    ) -> Self {
        debug_assert_eq!(user_ids.len(), rows.len());

        let num_ratings = rows.iter().map(|row| row.len()).sum();
        let mut indptr = Vec::with_capacity(rows.len() + 1);
        let mut indices = Vec::with_capacity(num_ratings);
        let mut data = Vec::with_capacity(num_ratings);

        indptr.push(0);
        for row in rows {
            for (column, value) in row {
                indices.push(column);
                data.push(value);
            }
            indptr.push(indices.len());
        }

        let ratings = CsMat::new((user_ids.len(), items.len()), indptr, indices, data);

        Self { user_ids, items, ratings }
    }

    pub fn num_users(&self) -> usize {
        self.user_ids.len()
    }

    pub fn num_items(&self) -> usize {
        self.items.len()
    }

    pub fn num_ratings(&self) -> usize {
        self.ratings.nnz()
    }

    pub fn is_empty(&self) -> bool {
        self.user_ids.is_empty() || self.items.is_empty()
    }

    pub fn user_ids(&self) -> &[UserId] {
        &self.user_ids
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn user_index(&self, user_id: UserId) -> Option<usize> {
        self.user_ids.binary_search(&user_id).ok()
    }

    pub fn item_index(&self, item: &str) -> Option<usize> {
        self.items.binary_search_by(|probe| probe.as_str().cmp(item)).ok()
    }

    pub fn contains_user(&self, user_id: UserId) -> bool {
        self.user_index(user_id).is_some()
    }

    /// The rating of `user_id` for `item`, `None` if the cell is unrated.
    pub fn rating(&self, user_id: UserId, item: &str) -> Option<f64> {
        let user = self.user_index(user_id)?;
        let item = self.item_index(item)?;
        self.ratings.get(user, item).copied()
    }

    pub(crate) fn row(&self, user: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let indices = self.ratings.indices();
        let data = self.ratings.data();
        self.ratings.indptr().outer_inds_sz(user).map(move |k| (indices[k], data[k]))
    }

    pub(crate) fn representations(&self) -> &CsMat<f64> {
        &self.ratings
    }
}

#[derive(Debug, Clone)]
pub struct BuildReport {
    pub matrix: UserItemMatrix,
    pub accepted: usize,
    /// Ratings replaced by a later row under `DuplicatePolicy::LastWriteWins`
    pub overwritten: usize,
    pub rejected: Vec<InputError>,
}

impl BuildReport {
    pub fn skipped(&self) -> usize {
        self.rejected.len()
    }
}

pub struct MatrixBuilder {
    policy: DuplicatePolicy,
    known_users: BTreeSet<UserId>,
}

impl MatrixBuilder {

    pub fn new(policy: DuplicatePolicy) -> Self {
        Self { policy, known_users: BTreeSet::new() }
    }

    /// Users that get a row even if none of their ratings survive validation.
    pub fn with_known_users(mut self, users: impl IntoIterator<Item = UserId>) -> Self {
        self.known_users.extend(users);
        self
    }

    pub fn build<I>(&self, ratings: I) -> Result<BuildReport, MatrixError>
    where
        I: IntoIterator<Item = RawRating>,
    {
        let mut per_user: BTreeMap<UserId, BTreeMap<String, f64>> = self.known_users
            .iter()
            .map(|user_id| (*user_id, BTreeMap::new()))
            .collect();

        let mut accepted = 0;
        let mut overwritten = 0;
        let mut rejected = Vec::new();

        for raw in ratings {
            let rating = match Rating::try_from(raw) {
                Ok(rating) => rating,
                Err(error) => {
                    debug!(%error, "skipping malformed rating");
                    rejected.push(error);
                    continue;
                }
            };

            let row = per_user.entry(rating.user_id).or_default();
            match row.entry(rating.item) {
                Entry::Vacant(cell) => {
                    cell.insert(rating.value);
                    accepted += 1;
                }
                Entry::Occupied(mut cell) => match self.policy {
                    DuplicatePolicy::LastWriteWins => {
                        cell.insert(rating.value);
                        overwritten += 1;
                    }
                    DuplicatePolicy::Reject => {
                        return Err(MatrixError::DuplicateRating {
                            user_id: rating.user_id,
                            item: cell.key().clone(),
                        });
                    }
                },
            }
        }

        let items: Vec<String> = per_user
            .values()
            .flat_map(|row| row.keys())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .cloned()
            .collect();

        let mut user_ids = Vec::with_capacity(per_user.len());
        let mut rows = Vec::with_capacity(per_user.len());
        for (user_id, row) in per_user {
            let cells: Vec<(usize, f64)> = row
                .into_iter()
                .filter_map(|(item, value)| {
                    items.binary_search(&item).ok().map(|column| (column, value))
                })
                .collect();
            user_ids.push(user_id);
            rows.push(cells);
        }

        let matrix = UserItemMatrix::from_rows(user_ids, items, rows);

        info!(
            users = matrix.num_users(),
            items = matrix.num_items(),
            accepted,
            overwritten,
            skipped = rejected.len(),
            "built user-item matrix"
        );

        Ok(BuildReport { matrix, accepted, overwritten, rejected })
    }
}
