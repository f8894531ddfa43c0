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

//! Sparse matrices over dense indices.
//!
//! A [`SparseMatrixBuilder`] collects entries in a row table plus a column to rows multimap.
//! Building the matrix sorts each row and each column once, so the cost is proportional to the
//! number of entries and never to the full `rows x columns` grid. The result stores both a
//! compressed row layout (for row scans and ordered iteration) and a compressed column layout
//! (for column scans), and is read-only afterwards.

use fnv::FnvHashMap;

use crate::error::{DataError, Result};
use crate::types::{self, ColumnMap, DenseIndex, RowTable};

/// One stored entry of a matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixEntry<V> {
    pub row: DenseIndex,
    pub column: DenseIndex,
    pub value: V,
}

/// Accumulates entries before the dimensions of a matrix are known. Putting the same
/// `(row, column)` twice keeps the last value; nothing is aggregated.
#[derive(Debug, Clone)]
pub struct SparseMatrixBuilder<V> {
    table: RowTable<V>,
    column_map: ColumnMap,
    num_entries: usize,
}

impl<V: Copy> SparseMatrixBuilder<V> {

    pub fn new() -> Self {
        SparseMatrixBuilder {
            table: FnvHashMap::default(),
            column_map: FnvHashMap::default(),
            num_entries: 0,
        }
    }

    pub fn put(&mut self, row: DenseIndex, column: DenseIndex, value: V) {
        let previous = self.table
            .entry(row)
            .or_insert_with(FnvHashMap::default)
            .insert(column, value);

        if previous.is_none() {
            self.num_entries += 1;
            self.column_map
                .entry(column)
                .or_insert_with(|| types::new_index_set(4))
                .insert(row);
        }
    }

    pub fn get(&self, row: DenseIndex, column: DenseIndex) -> Option<V> {
        self.table.get(&row).and_then(|columns| columns.get(&column)).copied()
    }

    /// Number of distinct `(row, column)` positions seen so far.
    pub fn len(&self) -> usize {
        self.num_entries
    }

    pub fn is_empty(&self) -> bool {
        self.num_entries == 0
    }

    pub fn build(self, num_rows: usize, num_columns: usize) -> Result<SparseMatrix<V>> {

        let SparseMatrixBuilder { mut table, column_map, num_entries } = self;

        if let Some(row) = table.keys().find(|row| **row as usize >= num_rows) {
            let max = num_rows.saturating_sub(1) as DenseIndex;
            return Err(DataError::OutOfRange { index: *row, max });
        }
        if let Some(column) = column_map.keys().find(|column| **column as usize >= num_columns) {
            let max = num_columns.saturating_sub(1) as DenseIndex;
            return Err(DataError::OutOfRange { index: *column, max });
        }

        let mut row_offsets = Vec::with_capacity(num_rows + 1);
        let mut column_indices = Vec::with_capacity(num_entries);
        let mut values = Vec::with_capacity(num_entries);

        row_offsets.push(0);
        for row in 0..num_rows {
            if let Some(columns) = table.remove(&(row as DenseIndex)) {
                let mut entries: Vec<(DenseIndex, V)> = columns.into_iter().collect();
                entries.sort_unstable_by_key(|(column, _)| *column);

                for (column, value) in entries {
                    column_indices.push(column);
                    values.push(value);
                }
            }
            row_offsets.push(column_indices.len());
        }

        let mut column_offsets = Vec::with_capacity(num_columns + 1);
        let mut row_indices = Vec::with_capacity(num_entries);
        let mut value_positions = Vec::with_capacity(num_entries);

        column_offsets.push(0);
        for column in 0..num_columns as DenseIndex {
            if let Some(rows) = column_map.get(&column) {
                let mut rows: Vec<DenseIndex> = rows.iter().copied().collect();
                rows.sort_unstable();

                for row in rows {
                    let start = row_offsets[row as usize];
                    let end = row_offsets[row as usize + 1];
                    // Every row in the column map has the column in its table row.
                    if let Ok(offset) = column_indices[start..end].binary_search(&column) {
                        row_indices.push(row);
                        value_positions.push(start + offset);
                    }
                }
            }
            column_offsets.push(row_indices.len());
        }

        Ok(SparseMatrix {
            num_rows,
            num_columns,
            row_offsets,
            column_indices,
            values,
            column_offsets,
            row_indices,
            value_positions,
        })
    }
}

impl<V: Copy> Default for SparseMatrixBuilder<V> {
    fn default() -> Self {
        SparseMatrixBuilder::new()
    }
}

/// Sparse matrix with fixed dimensions, constant-time row and column degrees and row-major entry
/// iteration (columns ascending within a row).
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix<V = f64> {
    num_rows: usize,
    num_columns: usize,
    row_offsets: Vec<usize>,
    column_indices: Vec<DenseIndex>,
    values: Vec<V>,
    column_offsets: Vec<usize>,
    row_indices: Vec<DenseIndex>,
    // position in `values` for each entry of the column layout
    value_positions: Vec<usize>,
}

impl<V: Copy> SparseMatrix<V> {

    pub fn from_triplets<I>(num_rows: usize, num_columns: usize, triplets: I) -> Result<Self>
        where I: IntoIterator<Item=(DenseIndex, DenseIndex, V)> {

        let mut builder = SparseMatrixBuilder::new();
        for (row, column, value) in triplets {
            builder.put(row, column, value);
        }
        builder.build(num_rows, num_columns)
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn density(&self) -> f64 {
        let cells = self.num_rows as f64 * self.num_columns as f64;
        if cells == 0.0 {
            0.0
        } else {
            self.nnz() as f64 / cells
        }
    }

    pub fn row_size(&self, row: DenseIndex) -> usize {
        let row = row as usize;
        if row >= self.num_rows {
            return 0;
        }
        self.row_offsets[row + 1] - self.row_offsets[row]
    }

    pub fn column_size(&self, column: DenseIndex) -> usize {
        let column = column as usize;
        if column >= self.num_columns {
            return 0;
        }
        self.column_offsets[column + 1] - self.column_offsets[column]
    }

    pub fn get(&self, row: DenseIndex, column: DenseIndex) -> Option<V> {
        self.position(row, column).map(|position| self.values[position])
    }

    pub fn contains(&self, row: DenseIndex, column: DenseIndex) -> bool {
        self.position(row, column).is_some()
    }

    /// Columns with an entry in `row`, ascending.
    pub fn row_indices(&self, row: DenseIndex) -> &[DenseIndex] {
        match self.row_range(row) {
            Some((start, end)) => &self.column_indices[start..end],
            None => &[],
        }
    }

    /// Rows with an entry in `column`, ascending.
    pub fn column_indices(&self, column: DenseIndex) -> &[DenseIndex] {
        match self.column_range(column) {
            Some((start, end)) => &self.row_indices[start..end],
            None => &[],
        }
    }

    pub fn row(&self, row: DenseIndex) -> impl Iterator<Item=(DenseIndex, V)> + '_ {
        let (start, end) = self.row_range(row).unwrap_or((0, 0));
        (start..end).map(move |position| (self.column_indices[position], self.values[position]))
    }

    pub fn column(&self, column: DenseIndex) -> impl Iterator<Item=(DenseIndex, V)> + '_ {
        let (start, end) = self.column_range(column).unwrap_or((0, 0));
        (start..end).map(move |position| {
            (self.row_indices[position], self.values[self.value_positions[position]])
        })
    }

    /// All entries in row-major order.
    pub fn iter(&self) -> impl Iterator<Item=MatrixEntry<V>> + '_ {
        (0..self.num_rows).flat_map(move |row| {
            let start = self.row_offsets[row];
            let end = self.row_offsets[row + 1];
            (start..end).map(move |position| MatrixEntry {
                row: row as DenseIndex,
                column: self.column_indices[position],
                value: self.values[position],
            })
        })
    }

    /// Stored values in row-major order.
    pub fn values(&self) -> &[V] {
        &self.values
    }

    /// Only used by the scale normalization pass; the sparsity pattern cannot change.
    pub(crate) fn values_mut(&mut self) -> &mut [V] {
        &mut self.values
    }

    fn row_range(&self, row: DenseIndex) -> Option<(usize, usize)> {
        let row = row as usize;
        if row >= self.num_rows {
            None
        } else {
            Some((self.row_offsets[row], self.row_offsets[row + 1]))
        }
    }

    fn column_range(&self, column: DenseIndex) -> Option<(usize, usize)> {
        let column = column as usize;
        if column >= self.num_columns {
            None
        } else {
            Some((self.column_offsets[column], self.column_offsets[column + 1]))
        }
    }

    fn position(&self, row: DenseIndex, column: DenseIndex) -> Option<usize> {
        let (start, end) = self.row_range(row)?;
        self.column_indices[start..end]
            .binary_search(&column)
            .ok()
            .map(|offset| start + offset)
    }
}

#[cfg(test)]
mod tests {

    use super::{MatrixEntry, SparseMatrix, SparseMatrixBuilder};
    use crate::error::DataError;

    fn example() -> SparseMatrix<f64> {
        SparseMatrix::from_triplets(3, 4, vec![
            (0, 0, 5.0),
            (1, 0, 3.0),
            (0, 1, 1.0),
            (2, 3, 2.0),
            (0, 3, 4.0),
        ]).unwrap()
    }

    #[test]
    fn lookups() {
        let matrix = example();

        assert_eq!(matrix.num_rows(), 3);
        assert_eq!(matrix.num_columns(), 4);
        assert_eq!(matrix.nnz(), 5);

        assert_eq!(matrix.get(0, 0), Some(5.0));
        assert_eq!(matrix.get(1, 0), Some(3.0));
        assert_eq!(matrix.get(0, 1), Some(1.0));
        assert_eq!(matrix.get(1, 1), None);
        assert_eq!(matrix.get(9, 1), None);
        assert!(matrix.contains(2, 3));
        assert!(!matrix.contains(2, 2));
    }

    #[test]
    fn degrees() {
        let matrix = example();

        assert_eq!(matrix.row_size(0), 3);
        assert_eq!(matrix.row_size(1), 1);
        assert_eq!(matrix.row_size(2), 1);
        assert_eq!(matrix.column_size(0), 2);
        assert_eq!(matrix.column_size(2), 0);
        assert_eq!(matrix.column_size(3), 2);
        assert_eq!(matrix.column_size(17), 0);

        assert!((matrix.density() - 5.0 / 12.0).abs() < 1e-12);
    }

    #[test]
    fn row_major_iteration() {
        let matrix = example();
        let entries: Vec<MatrixEntry<f64>> = matrix.iter().collect();

        let positions: Vec<(u32, u32)> = entries.iter().map(|e| (e.row, e.column)).collect();
        assert_eq!(positions, vec![(0, 0), (0, 1), (0, 3), (1, 0), (2, 3)]);
        assert_eq!(matrix.values(), &[5.0, 1.0, 4.0, 3.0, 2.0]);
    }

    #[test]
    fn column_scans() {
        let matrix = example();

        let column: Vec<(u32, f64)> = matrix.column(3).collect();
        assert_eq!(column, vec![(0, 4.0), (2, 2.0)]);
        assert_eq!(matrix.column_indices(0), &[0, 1]);
        assert_eq!(matrix.row_indices(0), &[0, 1, 3]);

        let row: Vec<(u32, f64)> = matrix.row(1).collect();
        assert_eq!(row, vec![(0, 3.0)]);
    }

    #[test]
    fn last_duplicate_wins() {
        let mut builder = SparseMatrixBuilder::new();
        builder.put(0, 0, 2.0);
        builder.put(0, 0, 4.0);
        builder.put(1, 0, 1.0);

        assert_eq!(builder.len(), 2);

        let matrix = builder.build(2, 1).unwrap();
        assert_eq!(matrix.get(0, 0), Some(4.0));
        assert_eq!(matrix.nnz(), 2);
        assert_eq!(matrix.column_size(0), 2);
    }

    #[test]
    fn entries_outside_dimensions() {
        let result = SparseMatrix::from_triplets(2, 2, vec![(0, 5, 1.0)]);
        match result {
            Err(DataError::OutOfRange { index, .. }) => assert_eq!(index, 5),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn empty_matrix() {
        let matrix: SparseMatrix<i64> = SparseMatrixBuilder::new().build(0, 0).unwrap();
        assert_eq!(matrix.nnz(), 0);
        assert_eq!(matrix.density(), 0.0);
        assert_eq!(matrix.iter().count(), 0);
    }
}
