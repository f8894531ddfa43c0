/**
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

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{DataError, Result};
use crate::matrix::{SparseMatrix, SparseMatrixBuilder};

/// Splits the entries of `matrix` into a training and a test matrix of the same dimensions.
/// Every entry goes to training with probability `ratio`; the same seed always yields the same
/// split.
pub fn ratio_split<V: Copy>(matrix: &SparseMatrix<V>, ratio: f64, seed: u64)
    -> Result<(SparseMatrix<V>, SparseMatrix<V>)> {

    if !(0.0..=1.0).contains(&ratio) {
        return Err(DataError::Config(format!("split ratio {} is not within [0, 1]", ratio)));
    }

    let mut rng = StdRng::seed_from_u64(seed);

    let mut train = SparseMatrixBuilder::new();
    let mut test = SparseMatrixBuilder::new();

    for entry in matrix.iter() {
        if rng.gen::<f64>() < ratio {
            train.put(entry.row, entry.column, entry.value);
        } else {
            test.put(entry.row, entry.column, entry.value);
        }
    }

    Ok((
        train.build(matrix.num_rows(), matrix.num_columns())?,
        test.build(matrix.num_rows(), matrix.num_columns())?,
    ))
}

#[cfg(test)]
mod tests {

    use super::*;

    fn matrix() -> SparseMatrix<f64> {
        let triplets = (0..20u32).flat_map(|row| (0..5u32).map(move |column| {
            (row, column, (row * 5 + column) as f64)
        }));
        SparseMatrix::from_triplets(20, 5, triplets).unwrap()
    }

    #[test]
    fn split_partitions_entries() {
        let matrix = matrix();
        let (train, test) = ratio_split(&matrix, 0.8, 42).unwrap();

        assert_eq!(train.num_rows(), 20);
        assert_eq!(test.num_columns(), 5);
        assert_eq!(train.nnz() + test.nnz(), matrix.nnz());

        for entry in matrix.iter() {
            let in_train = train.get(entry.row, entry.column);
            let in_test = test.get(entry.row, entry.column);
            assert!(in_train.is_some() != in_test.is_some());
            assert_eq!(in_train.or(in_test), Some(entry.value));
        }
    }

    #[test]
    fn same_seed_same_split() {
        let matrix = matrix();
        let (first, _) = ratio_split(&matrix, 0.5, 7).unwrap();
        let (second, _) = ratio_split(&matrix, 0.5, 7).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn extreme_ratios() {
        let matrix = matrix();

        let (train, test) = ratio_split(&matrix, 1.0, 1).unwrap();
        assert_eq!(train.nnz(), matrix.nnz());
        assert!(test.nnz() == 0);

        assert!(ratio_split(&matrix, 1.5, 1).is_err());
    }
}
