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

//! Rating scales and the zero-shift correction.
//!
//! A value of `0.0` means "no entry" to most consumers of a rating matrix, so a dataset whose
//! smallest rating is exactly zero gets all of its ratings shifted up by the gap to the second
//! smallest rating once loading has finished.

use fnv::FnvHashMap;
use tracing::debug;

use crate::matrix::SparseMatrix;

/// Multiset of observed rating values.
#[derive(Debug, Clone, Default)]
pub struct ScaleDistribution {
    counts: FnvHashMap<u64, usize>,
    total: usize,
}

impl ScaleDistribution {

    pub fn new() -> Self {
        ScaleDistribution::default()
    }

    pub fn add(&mut self, value: f64) {
        // `+ 0.0` folds -0.0 into 0.0 so both land in the same bucket
        *self.counts.entry((value + 0.0).to_bits()).or_insert(0) += 1;
        self.total += 1;
    }

    pub fn count(&self, value: f64) -> usize {
        self.counts.get(&(value + 0.0).to_bits()).copied().unwrap_or(0)
    }

    /// Number of values added, duplicates included.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn num_distinct(&self) -> usize {
        self.counts.len()
    }

    /// `(value, count)` pairs sorted by value.
    pub fn sorted_counts(&self) -> Vec<(f64, usize)> {
        let mut counts: Vec<(f64, usize)> = self.counts
            .iter()
            .map(|(bits, count)| (f64::from_bits(*bits), *count))
            .collect();
        counts.sort_by(|(a, _), (b, _)| a.total_cmp(b));
        counts
    }
}

/// Sorted distinct rating values of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingScale {
    values: Vec<f64>,
    shift: f64,
    normalized: bool,
}

impl RatingScale {

    pub fn from_distribution(distribution: &ScaleDistribution) -> Self {
        let values = distribution.sorted_counts().into_iter().map(|(value, _)| value).collect();
        RatingScale { values, shift: 0.0, normalized: false }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn min(&self) -> Option<f64> {
        self.values.first().copied()
    }

    pub fn max(&self) -> Option<f64> {
        self.values.last().copied()
    }

    /// The amount added to every rating by [`RatingScale::normalize`], zero if nothing moved.
    pub fn shift(&self) -> f64 {
        self.shift
    }

    /// The epsilon the zero-shift correction would apply. If zero is the only value on the
    /// scale there is no second value to measure the gap against and the ratings move by one.
    pub fn zero_shift(&self) -> Option<f64> {
        match self.values.as_slice() {
            [min, second, ..] if *min == 0.0 => Some(*second - *min),
            [min] if *min == 0.0 => Some(1.0),
            _ => None,
        }
    }

    /// Applies the zero-shift correction to this scale and to every stored entry of `matrix`.
    /// Runs at most once, later calls leave everything untouched. Returns the applied shift.
    pub fn normalize(&mut self, matrix: &mut SparseMatrix<f64>) -> f64 {
        if self.normalized {
            return self.shift;
        }
        self.normalized = true;

        if let Some(epsilon) = self.zero_shift() {
            for value in self.values.iter_mut() {
                *value += epsilon;
            }
            for value in matrix.values_mut().iter_mut() {
                *value += epsilon;
            }
            self.shift = epsilon;

            debug!(epsilon, entries = matrix.nnz(), "shifted rating scale away from zero");
        }

        self.shift
    }
}
