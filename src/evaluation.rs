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

//! Measures a model can report from a checkpoint evaluation.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::Result;
use crate::matrix::SparseMatrix;
use crate::similarity::{self, ScoredItem};
use crate::types::DenseIndex;

pub const MAE: &str = "MAE";
pub const RMSE: &str = "RMSE";

/// Named measures, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Measures {
    values: BTreeMap<String, f64>,
}

impl Measures {

    pub fn new() -> Self {
        Measures::default()
    }

    pub fn insert(&mut self, name: &str, value: f64) {
        self.values.insert(name.to_owned(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, f64> {
        self.values.iter()
    }

    pub fn extend(&mut self, other: Measures) {
        self.values.extend(other.values);
    }
}

impl fmt::Display for Measures {

    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for (name, value) in &self.values {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{}: {:.6}", name, value)?;
            first = false;
        }
        Ok(())
    }
}

pub fn precision_at(k: usize) -> String {
    format!("Pre@{}", k)
}

pub fn recall_at(k: usize) -> String {
    format!("Rec@{}", k)
}

/// Mean absolute and root mean squared error of `predict` over all entries of `test`.
pub fn rating_measures<F>(test: &SparseMatrix<f64>, mut predict: F) -> Result<Measures>
    where F: FnMut(DenseIndex, DenseIndex) -> Result<f64> {

    let mut absolute_error = 0.0;
    let mut squared_error = 0.0;
    let mut count = 0;

    for entry in test.iter() {
        let error = predict(entry.row, entry.column)? - entry.value;
        absolute_error += error.abs();
        squared_error += error * error;
        count += 1;
    }

    let mut measures = Measures::new();
    if count > 0 {
        measures.insert(MAE, absolute_error / count as f64);
        measures.insert(RMSE, (squared_error / count as f64).sqrt());
    }
    Ok(measures)
}

/// Precision and recall of the `k` highest ranked items per user, averaged over all users with
/// at least one entry in `test`. Items the user already has in `train` are never recommended.
pub fn ranking_measures<F>(
    train: &SparseMatrix<f64>,
    test: &SparseMatrix<f64>,
    k: usize,
    mut rank: F,
) -> Result<Measures>
    where F: FnMut(DenseIndex, DenseIndex) -> Result<f64> {

    let mut precision = 0.0;
    let mut recall = 0.0;
    let mut num_users = 0;

    for user in 0..test.num_rows() as DenseIndex {

        let relevant = test.row_indices(user);
        if relevant.is_empty() {
            continue;
        }

        let mut candidates = Vec::with_capacity(train.num_columns());
        for item in 0..train.num_columns() as DenseIndex {
            if !train.contains(user, item) {
                candidates.push(ScoredItem { item, score: rank(user, item)? });
            }
        }

        let hits = similarity::top_k(candidates, k)
            .iter()
            .filter(|scored_item| relevant.binary_search(&scored_item.item).is_ok())
            .count();

        precision += hits as f64 / k as f64;
        recall += hits as f64 / relevant.len() as f64;
        num_users += 1;
    }

    let mut measures = Measures::new();
    if num_users > 0 && k > 0 {
        measures.insert(&precision_at(k), precision / num_users as f64);
        measures.insert(&recall_at(k), recall / num_users as f64);
    }
    Ok(measures)
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::error::DataError;

    fn close_enough_to(value: f64, expected: f64) -> bool {
        (value - expected).abs() < 0.0001
    }

    #[test]
    fn rating_errors() {
        let test = SparseMatrix::from_triplets(2, 2, vec![(0, 0, 4.0), (1, 1, 2.0)]).unwrap();

        let measures = rating_measures(&test, |_, _| Ok(3.0)).unwrap();

        assert!(close_enough_to(measures.get(MAE).unwrap(), 1.0));
        assert!(close_enough_to(measures.get(RMSE).unwrap(), 1.0));

        let measures = rating_measures(&test, |user, _| Ok(if user == 0 { 4.0 } else { 0.0 }))
            .unwrap();

        assert!(close_enough_to(measures.get(MAE).unwrap(), 1.0));
        assert!(close_enough_to(measures.get(RMSE).unwrap(), 2.0f64.sqrt()));
    }

    #[test]
    fn prediction_failures_propagate() {
        let test = SparseMatrix::from_triplets(1, 1, vec![(0, 0, 4.0)]).unwrap();
        let result = rating_measures(&test, |_, _| Err(DataError::Model(String::from("diverged"))));
        assert!(result.is_err());
    }

    #[test]
    fn ranking_precision_and_recall() {
        let train = SparseMatrix::from_triplets(1, 4, vec![(0, 0, 1.0)]).unwrap();
        let test = SparseMatrix::from_triplets(1, 4, vec![(0, 1, 1.0), (0, 3, 1.0)]).unwrap();

        // item 0 would rank first but is already known from training
        let scores = [10.0, 3.0, 2.0, 1.0];
        let measures =
            ranking_measures(&train, &test, 2, |_, item| Ok(scores[item as usize])).unwrap();

        assert!(close_enough_to(measures.get(&precision_at(2)).unwrap(), 0.5));
        assert!(close_enough_to(measures.get(&recall_at(2)).unwrap(), 0.5));
    }

    #[test]
    fn display_and_json() {
        let mut measures = Measures::new();
        measures.insert(RMSE, 0.5);
        measures.insert(MAE, 0.25);

        assert_eq!(measures.to_string(), "MAE: 0.250000,RMSE: 0.500000");
        assert_eq!(serde_json::to_string(&measures).unwrap(), r#"{"MAE":0.25,"RMSE":0.5}"#);
    }
}
