/*
 * RecoContext
 * Copyright (C) 2018 Sebastian Schelter
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

//! Ratings together with any number of integral feature columns.
//!
//! Every field of a record except the rating becomes one dimension of the tensor, in the order
//! the fields appear in the record. The user and item dimensions hold dense registry indices,
//! all other dimensions hold the feature values as written in the file.

use crate::error::{DataError, Result};
use crate::matrix::{SparseMatrix, SparseMatrixBuilder};
use crate::types::{self, DenseIndex, IndexSet};

/// Coordinate lists of a sparse rating tensor, one list per dimension plus one value per entry.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingTensor {
    keys: Vec<Vec<DenseIndex>>,
    values: Vec<f64>,
    user_dimension: usize,
    item_dimension: usize,
}

impl RatingTensor {

    pub fn new(num_dimensions: usize, user_dimension: usize, item_dimension: usize) -> Result<Self> {
        if user_dimension >= num_dimensions || item_dimension >= num_dimensions
            || user_dimension == item_dimension {
            return Err(DataError::Config(format!(
                "user dimension {} and item dimension {} must be distinct and below {}",
                user_dimension, item_dimension, num_dimensions)));
        }
        Ok(RatingTensor {
            keys: vec![Vec::new(); num_dimensions],
            values: Vec::new(),
            user_dimension,
            item_dimension,
        })
    }

    pub fn push(&mut self, key: &[DenseIndex], value: f64) -> Result<()> {
        if key.len() != self.keys.len() {
            return Err(DataError::Config(format!(
                "expected a key with {} dimensions, got {}", self.keys.len(), key.len())));
        }
        for (keys, index) in self.keys.iter_mut().zip(key) {
            keys.push(*index);
        }
        self.values.push(value);
        Ok(())
    }

    pub fn num_dimensions(&self) -> usize {
        self.keys.len()
    }

    /// Dimensions other than user and item.
    pub fn num_features(&self) -> usize {
        self.keys.len() - 2
    }

    /// Number of entries, duplicates included.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn user_dimension(&self) -> usize {
        self.user_dimension
    }

    pub fn item_dimension(&self) -> usize {
        self.item_dimension
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// The keys of all entries along one dimension.
    pub fn keys_of(&self, dimension: usize) -> Result<&[DenseIndex]> {
        self.keys
            .get(dimension)
            .map(Vec::as_slice)
            .ok_or(DataError::OutOfRange {
                index: dimension as DenseIndex,
                max: self.keys.len().saturating_sub(1) as DenseIndex,
            })
    }

    /// The full key of one entry.
    pub fn key(&self, entry: usize) -> Option<Vec<DenseIndex>> {
        if entry >= self.values.len() {
            return None;
        }
        Some(self.keys.iter().map(|keys| keys[entry]).collect())
    }

    /// Number of distinct keys along a dimension.
    pub fn cardinality(&self, dimension: usize) -> Result<usize> {
        let keys = self.keys_of(dimension)?;
        let mut distinct: IndexSet = types::new_index_set(keys.len());
        distinct.extend(keys.iter().copied());
        Ok(distinct.len())
    }

    pub fn cardinalities(&self) -> Vec<usize> {
        (0..self.keys.len())
            .map(|dimension| self.cardinality(dimension).unwrap_or(0))
            .collect()
    }

    /// Collapses the feature dimensions into a user-item matrix. Entries sharing a user and an
    /// item keep the value read last.
    pub fn rate_matrix(&self, num_users: usize, num_items: usize) -> Result<SparseMatrix<f64>> {
        let users = &self.keys[self.user_dimension];
        let items = &self.keys[self.item_dimension];

        let mut builder = SparseMatrixBuilder::new();
        for ((user, item), value) in users.iter().zip(items).zip(&self.values) {
            builder.put(*user, *item, *value);
        }
        builder.build(num_users, num_items)
    }

    pub(crate) fn shift_values(&mut self, epsilon: f64) {
        for value in self.values.iter_mut() {
            *value += epsilon;
        }
    }
}

#[cfg(test)]
mod tests {

    use super::RatingTensor;

    #[test]
    fn entries_and_cardinalities() {
        let mut tensor = RatingTensor::new(3, 0, 1).unwrap();
        tensor.push(&[0, 0, 7], 4.0).unwrap();
        tensor.push(&[1, 0, 7], 2.0).unwrap();
        tensor.push(&[1, 2, 3], 5.0).unwrap();

        assert_eq!(tensor.len(), 3);
        assert_eq!(tensor.num_features(), 1);
        assert_eq!(tensor.key(2), Some(vec![1, 2, 3]));
        assert_eq!(tensor.key(3), None);
        assert_eq!(tensor.keys_of(2).unwrap(), &[7, 7, 3]);
        assert_eq!(tensor.cardinalities(), vec![2, 2, 2]);
        assert!(tensor.keys_of(3).is_err());

        assert!(tensor.push(&[0, 0], 1.0).is_err());
        assert_eq!(tensor.len(), 3);
    }

    #[test]
    fn user_and_item_must_differ() {
        assert!(RatingTensor::new(3, 1, 1).is_err());
        assert!(RatingTensor::new(2, 0, 2).is_err());
    }

    #[test]
    fn collapses_into_a_rate_matrix() {
        // item dimension first, as in a file with the item id in front
        let mut tensor = RatingTensor::new(3, 1, 0).unwrap();
        tensor.push(&[0, 1, 5], 3.0).unwrap();
        tensor.push(&[0, 1, 6], 4.0).unwrap();
        tensor.push(&[2, 0, 5], 1.0).unwrap();

        let matrix = tensor.rate_matrix(2, 3).unwrap();

        assert_eq!(matrix.nnz(), 2);
        assert_eq!(matrix.get(1, 0), Some(4.0));
        assert_eq!(matrix.get(0, 2), Some(1.0));
    }
}
