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

use std::collections::BTreeMap;
use std::fmt;

use fnv::FnvHashMap;

use crate::loader::RatingData;
use crate::matrix::SparseMatrix;
use crate::registry::Registries;

/// Max, min, mean and standard deviation of the number of ratings per user or per item. Only
/// users and items with at least one rating are taken into account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountSummary {
    pub max: usize,
    pub min: usize,
    pub mean: f64,
    pub std: f64,
}

/// Descriptive statistics of a loaded dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSpecs {
    pub dataset: String,
    pub num_users: usize,
    /// Absent if items are users.
    pub num_items: Option<usize>,
    pub num_ratings: usize,
    pub density: f64,
    /// Observed rating values with their frequencies, before any zero shift.
    pub scale_distribution: Vec<(f64, usize)>,
    pub mean: f64,
    pub std: f64,
    pub mode: f64,
    pub median: f64,
    pub ratings_per_user: CountSummary,
    pub ratings_per_item: Option<CountSummary>,
    pub timestamp_range: Option<(i64, i64)>,
    pub num_days: i64,
}

pub fn dataset_specs(dataset: &str, registries: &Registries, data: &RatingData) -> DatasetSpecs {

    let matrix = &data.rate_matrix;
    let values = matrix.values();

    let user_counts: Vec<usize> = (0..matrix.num_rows() as u32)
        .map(|row| matrix.row_size(row))
        .collect();

    let ratings_per_item = if registries.is_shared() {
        None
    } else {
        let item_counts: Vec<usize> = (0..matrix.num_columns() as u32)
            .map(|column| matrix.column_size(column))
            .collect();
        Some(count_summary(&item_counts))
    };

    DatasetSpecs {
        dataset: dataset.to_owned(),
        num_users: registries.num_users(),
        num_items: if registries.is_shared() { None } else { Some(registries.num_items()) },
        num_ratings: matrix.nnz(),
        density: matrix.density(),
        scale_distribution: data.distribution.sorted_counts(),
        mean: mean(values),
        std: std(values),
        mode: mode(values),
        median: median(values),
        ratings_per_user: count_summary(&user_counts),
        ratings_per_item,
        timestamp_range: data.timestamp_range,
        num_days: data.num_days(),
    }
}

impl fmt::Display for DatasetSpecs {

    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Dataset: {}", self.dataset)?;
        writeln!(f, "User amount: {}", self.num_users)?;
        if let Some(num_items) = self.num_items {
            writeln!(f, "Item amount: {}", num_items)?;
        }
        writeln!(f, "Rate amount: {}", self.num_ratings)?;
        writeln!(f, "Data density: {:.4}%", self.density * 100.0)?;
        writeln!(f, "Scale distribution: {:?}", self.scale_distribution)?;
        writeln!(f)?;
        writeln!(f, "Average value of all ratings: {:.6}", self.mean)?;
        writeln!(f, "Standard deviation of all ratings: {:.6}", self.std)?;
        writeln!(f, "Mode of all rating values: {:.6}", self.mode)?;
        writeln!(f, "Median of all rating values: {:.6}", self.median)?;
        write_counts(f, "user", &self.ratings_per_user)?;
        if let Some(ref ratings_per_item) = self.ratings_per_item {
            write_counts(f, "item", ratings_per_item)?;
        }
        Ok(())
    }
}

fn write_counts(f: &mut fmt::Formatter, what: &str, counts: &CountSummary) -> fmt::Result {
    writeln!(f)?;
    writeln!(f, "Max number of ratings per {}: {}", what, counts.max)?;
    writeln!(f, "Min number of ratings per {}: {}", what, counts.min)?;
    writeln!(f, "Average number of ratings per {}: {:.6}", what, counts.mean)?;
    writeln!(f, "Standard deviation of number of ratings per {}: {:.6}", what, counts.std)
}

/// How many users issued (items received) a given number of ratings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distributions {
    pub users_per_rating_count: BTreeMap<usize, usize>,
    pub items_per_rating_count: BTreeMap<usize, usize>,
}

pub fn distributions<V: Copy>(matrix: &SparseMatrix<V>) -> Distributions {

    let mut users_per_rating_count = BTreeMap::new();
    for row in 0..matrix.num_rows() as u32 {
        *users_per_rating_count.entry(matrix.row_size(row)).or_insert(0) += 1;
    }

    let mut items_per_rating_count = BTreeMap::new();
    for column in 0..matrix.num_columns() as u32 {
        *items_per_rating_count.entry(matrix.column_size(column)).or_insert(0) += 1;
    }

    Distributions { users_per_rating_count, items_per_rating_count }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation, zero for fewer than two values.
pub fn std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean(values);
    let squares: f64 = values.iter().map(|value| (value - mean) * (value - mean)).sum();
    (squares / (values.len() - 1) as f64).sqrt()
}

/// Most frequent value; ties go to the smallest value.
pub fn mode(values: &[f64]) -> f64 {
    let mut counts: FnvHashMap<u64, usize> = FnvHashMap::default();
    for value in values {
        *counts.entry((value + 0.0).to_bits()).or_insert(0) += 1;
    }

    counts.into_iter()
        .map(|(bits, count)| (f64::from_bits(bits), count))
        .max_by(|(value_a, count_a), (value_b, count_b)| {
            count_a.cmp(count_b).then_with(|| value_b.total_cmp(value_a))
        })
        .map_or(0.0, |(value, _)| value)
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let middle = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[middle - 1] + sorted[middle]) / 2.0
    } else {
        sorted[middle]
    }
}

fn count_summary(counts: &[usize]) -> CountSummary {
    let rated: Vec<f64> = counts.iter()
        .filter(|count| **count > 0)
        .map(|count| *count as f64)
        .collect();

    CountSummary {
        max: counts.iter().copied().max().unwrap_or(0),
        min: counts.iter().copied().filter(|count| *count > 0).min().unwrap_or(0),
        mean: mean(&rated),
        std: std(&rated),
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::matrix::SparseMatrix;

    fn close_enough_to(value: f64, expected: f64) -> bool {
        (value - expected).abs() < 0.0001
    }

    #[test]
    fn descriptive_statistics() {
        let values = [5.0, 3.0, 1.0, 3.0];

        assert!(close_enough_to(mean(&values), 3.0));
        assert!(close_enough_to(std(&values), (8.0f64 / 3.0).sqrt()));
        assert!(close_enough_to(mode(&values), 3.0));
        assert!(close_enough_to(median(&values), 3.0));
        assert!(close_enough_to(median(&[4.0, 1.0, 2.0]), 2.0));
    }

    #[test]
    fn empty_inputs() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(std(&[2.0]), 0.0);
        assert_eq!(mode(&[]), 0.0);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn mode_ties_pick_smallest() {
        assert_eq!(mode(&[4.0, 2.0, 4.0, 2.0, 5.0]), 2.0);
    }

    #[test]
    fn rating_count_distributions() {
        let matrix = SparseMatrix::from_triplets(3, 2, vec![
            (0, 0, 1.0),
            (0, 1, 1.0),
            (1, 0, 1.0),
        ]).unwrap();

        let distributions = distributions(&matrix);

        let users: Vec<(usize, usize)> =
            distributions.users_per_rating_count.into_iter().collect();
        assert_eq!(users, vec![(0, 1), (1, 1), (2, 1)]);

        let items: Vec<(usize, usize)> =
            distributions.items_per_rating_count.into_iter().collect();
        assert_eq!(items, vec![(1, 1), (2, 1)]);
    }

    #[test]
    fn count_summaries_skip_empty_rows() {
        let summary = count_summary(&[0, 3, 1]);
        assert_eq!(summary.max, 3);
        assert_eq!(summary.min, 1);
        assert!(close_enough_to(summary.mean, 2.0));
    }
}
