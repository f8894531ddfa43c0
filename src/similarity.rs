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

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::{DataError, Result};
use crate::matrix::SparseMatrix;
use crate::types::DenseIndex;

/// Result type used to find the top-k items via a binary heap
#[derive(PartialEq, Debug, Clone, Copy, Serialize)]
pub struct ScoredItem {
    pub item: DenseIndex,
    pub score: f64,
}

/// Ordering for our max-heap, not that we must use a special implementation here as there is no
/// total order on floating point numbers. Equal scores are broken by the smaller index.
fn cmp_reverse(scored_item_a: &ScoredItem, scored_item_b: &ScoredItem) -> Ordering {
    let by_score = match scored_item_a.score.partial_cmp(&scored_item_b.score) {
        Some(Ordering::Less) => Ordering::Greater,
        Some(Ordering::Greater) => Ordering::Less,
        Some(Ordering::Equal) => Ordering::Equal,
        None => Ordering::Equal
    };
    by_score.then_with(|| scored_item_a.item.cmp(&scored_item_b.item))
}

impl Eq for ScoredItem {}

impl Ord for ScoredItem {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_reverse(self, other)
    }
}

impl PartialOrd for ScoredItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(cmp_reverse(self, other))
    }
}

/// The `k` highest scored items, best first.
pub fn top_k<I>(scored_items: I, k: usize) -> Vec<ScoredItem>
    where I: IntoIterator<Item=ScoredItem> {

    if k == 0 {
        return Vec::new();
    }

    let mut heap = BinaryHeap::with_capacity(k);

    for scored_item in scored_items {
        if heap.len() < k {
            heap.push(scored_item);
        } else if let Some(mut top) = heap.peek_mut() {
            if scored_item < *top {
                *top = scored_item;
            }
        }
    }

    heap.into_sorted_vec()
}

/// Jaccard coefficient of two sorted index lists.
pub fn jaccard(a: &[DenseIndex], b: &[DenseIndex]) -> f64 {

    let mut intersection = 0;
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                intersection += 1;
                i += 1;
                j += 1;
            }
        }
    }

    let union = a.len() + b.len() - intersection;
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// The `k` items whose sets of raters overlap most with the raters of `item`, by Jaccard
/// coefficient. Items without a common rater are never returned.
pub fn similar_items<V: Copy>(matrix: &SparseMatrix<V>, item: DenseIndex, k: usize)
    -> Result<Vec<ScoredItem>> {

    if item as usize >= matrix.num_columns() {
        return Err(DataError::OutOfRange {
            index: item,
            max: matrix.num_columns().saturating_sub(1) as DenseIndex,
        });
    }

    let raters = matrix.column_indices(item);

    let candidates = (0..matrix.num_columns() as DenseIndex)
        .filter(|other| *other != item)
        .filter_map(|other| {
            let score = jaccard(raters, matrix.column_indices(other));
            if score > 0.0 {
                Some(ScoredItem { item: other, score })
            } else {
                None
            }
        });

    Ok(top_k(candidates, k))
}

#[cfg(test)]
mod tests {

    use std::f64::EPSILON;

    use super::*;

    fn within_epsilon(value: f64, expected: f64) -> bool {
        (value - expected).abs() < EPSILON
    }

    #[test]
    fn scored_item_ordering_reversed() {
        let item_a = ScoredItem { item: 1, score: 0.5 };
        let item_b = ScoredItem { item: 2, score: 1.5 };
        let item_c = ScoredItem { item: 3, score: 0.3 };

        assert!(item_a > item_b);
        assert!(item_a < item_c);
        assert!(item_b < item_c);
    }

    #[test]
    fn topk() {

        let items = vec![
            ScoredItem { item: 1, score: 0.5 },
            ScoredItem { item: 2, score: 1.5 },
            ScoredItem { item: 3, score: 0.3 },
            ScoredItem { item: 4, score: 3.5 },
            ScoredItem { item: 5, score: 2.5 },
        ];

        let top_k = top_k(items, 3);

        assert_eq!(top_k.len(), 3);

        assert_eq!(top_k[0].item, 4);
        assert!(within_epsilon(top_k[0].score, 3.5));

        assert_eq!(top_k[1].item, 5);
        assert!(within_epsilon(top_k[1].score, 2.5));

        assert_eq!(top_k[2].item, 2);
        assert!(within_epsilon(top_k[2].score, 1.5));
    }

    #[test]
    fn jaccard_of_sorted_lists() {
        assert!(within_epsilon(jaccard(&[0, 1, 2], &[1, 2, 3]), 0.5));
        assert!(within_epsilon(jaccard(&[0], &[1]), 0.0));
        assert!(within_epsilon(jaccard(&[], &[]), 0.0));
    }

    #[test]
    fn similar_items_by_raters() {
        // items 0 and 1 share both raters, item 2 shares one of them
        let matrix = SparseMatrix::from_triplets(3, 4, vec![
            (0, 0, 1.0), (0, 1, 1.0), (0, 2, 1.0),
            (1, 0, 1.0), (1, 1, 1.0),
            (2, 3, 1.0),
        ]).unwrap();

        let similar = similar_items(&matrix, 0, 10).unwrap();

        assert_eq!(similar.len(), 2);
        assert_eq!(similar[0].item, 1);
        assert!(within_epsilon(similar[0].score, 1.0));
        assert_eq!(similar[1].item, 2);
        assert!(within_epsilon(similar[1].score, 0.5));

        assert!(similar_items(&matrix, 4, 10).is_err());
    }
}
