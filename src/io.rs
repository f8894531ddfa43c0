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

use std::fs::File;
use std::io::prelude::*;
use std::io::{stdout, BufReader, BufWriter};
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::error::{DataError, Result};
use crate::matrix::SparseMatrix;

/// Number of triplets buffered before they are flushed to the export file.
const TRIPLET_BATCH_SIZE: usize = 1000;
/// Number of rows buffered before they are flushed to a bag-format export file.
const ARFF_BATCH_SIZE: usize = 500;

const KEY_VALUES_SEPARATOR: &str = " ## ";

/// Opens a file for a single line-oriented parse pass. The handle is closed when the returned
/// reader is dropped, also if the pass bails out early with an error.
pub fn line_reader<P: AsRef<Path>>(path: P) -> Result<BufReader<File>> {
    Ok(BufReader::new(File::open(path)?))
}

/// Splits a record on runs of spaces, tabs and commas.
pub fn split_fields(line: &str) -> Vec<&str> {
    line.trim()
        .split(|c| c == ' ' || c == '\t' || c == ',')
        .filter(|field| !field.is_empty())
        .collect()
}

/// Splits a `key ## value ## value` record.
pub fn split_key_values(line: &str) -> Vec<&str> {
    line.trim().split(KEY_VALUES_SEPARATOR).collect()
}

/// Parses an integral field, falling back to a float for values like `9.7323480e+008`.
pub fn parse_integral(field: &str, line: usize) -> Result<i64> {
    match field.parse::<i64>() {
        Ok(value) => Ok(value),
        Err(_) => parse_float(field, line).map(|value| value as i64),
    }
}

pub fn parse_float(field: &str, line: usize) -> Result<f64> {
    field.parse::<f64>().map_err(|_| DataError::Parse { line, field: field.to_owned() })
}

/// Writes all entries of `matrix` as `row column value` lines with one-based indices. Entries
/// are flushed in batches; the output order is the row-major order of the matrix.
pub fn write_triplets<W: Write>(matrix: &SparseMatrix<f64>, out: W, separator: u8) -> Result<usize> {

    let mut writer = csv::WriterBuilder::new()
        .delimiter(separator)
        .has_headers(false)
        .from_writer(out);

    let mut num_written = 0;
    for entry in matrix.iter() {
        writer.write_record(&[
            (entry.row + 1).to_string(),
            (entry.column + 1).to_string(),
            entry.value.to_string(),
        ])?;

        num_written += 1;
        if num_written % TRIPLET_BATCH_SIZE == 0 {
            writer.flush()?;
        }
    }
    writer.flush()?;

    Ok(num_written)
}

/// Replaces the file at `path` with the triplets of `matrix`.
pub fn write_triplets_to<P: AsRef<Path>>(matrix: &SparseMatrix<f64>, path: P) -> Result<usize> {
    let file = File::create(path.as_ref())?;
    let num_written = write_triplets(matrix, file, b' ')?;
    debug!("Data has been exported to {}", path.as_ref().display());
    Ok(num_written)
}

/// Writes `matrix` in the sparse ARFF bag format: a relation header followed by one line per row,
/// `{0 <row>, <column> <value>, ...}`, with one-based indices.
pub fn write_arff<W: Write>(matrix: &SparseMatrix<f64>, relation: &str, out: W) -> Result<()> {

    let mut out = BufWriter::new(out);

    write!(out, "@RELATION {}\n\n", relation)?;
    write!(out, "@ATTRIBUTE UserId NUMERIC\n\n")?;
    writeln!(out, "@DATA")?;

    let mut batch = String::new();
    let mut rows_in_batch = 0;

    for row in 0..matrix.num_rows() as u32 {
        batch.push_str(&format!("{{0 {}", row + 1));
        for (column, value) in matrix.row(row) {
            batch.push_str(&format!(", {} {}", column + 1, value));
        }
        batch.push_str("}\n");

        rows_in_batch += 1;
        if rows_in_batch >= ARFF_BATCH_SIZE {
            out.write_all(batch.as_bytes())?;
            batch.clear();
            rows_in_batch = 0;
        }
    }

    if rows_in_batch > 0 {
        out.write_all(batch.as_bytes())?;
    }
    out.flush()?;

    Ok(())
}

pub fn write_arff_to<P: AsRef<Path>>(matrix: &SparseMatrix<f64>, relation: &str, path: P)
    -> Result<()> {

    let file = File::create(path.as_ref())?;
    write_arff(matrix, relation, file)?;
    debug!("Data has been exported to {}", path.as_ref().display());
    Ok(())
}

/// Output a value as a single line of JSON. If a `path` is supplied, we write to a file at the
/// specified path, otherwise, we output to stdout.
pub fn write_json<T: Serialize>(value: &T, path: Option<&str>) -> Result<()> {

    let mut out: Box<dyn Write> = match path {
        Some(path) => Box::new(File::create(&Path::new(path))?),
        _ => Box::new(stdout())
    };

    writeln!(out, "{}", serde_json::to_string(value)?)?;

    Ok(())
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::matrix::SparseMatrix;

    fn matrix() -> SparseMatrix<f64> {
        SparseMatrix::from_triplets(2, 3, vec![(0, 2, 4.0), (0, 0, 5.0), (1, 1, 0.5)]).unwrap()
    }

    #[test]
    fn field_splitting() {
        assert_eq!(split_fields("  u1 \t i1,,5  1000 "), vec!["u1", "i1", "5", "1000"]);
        assert_eq!(split_fields(""), Vec::<&str>::new());
        assert_eq!(split_key_values("i1 ## a nice pony ## 3"), vec!["i1", "a nice pony", "3"]);
    }

    #[test]
    fn integral_fallback() {
        assert_eq!(parse_integral("1000", 1).unwrap(), 1000);
        assert_eq!(parse_integral("9.7323480e+008", 1).unwrap(), 973_234_800);

        match parse_integral("yesterday", 7) {
            Err(DataError::Parse { line, field }) => {
                assert_eq!(line, 7);
                assert_eq!(field, "yesterday");
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn triplets_are_one_based() {
        let mut out = Vec::new();
        let num_written = write_triplets(&matrix(), &mut out, b' ').unwrap();

        assert_eq!(num_written, 3);
        assert_eq!(String::from_utf8(out).unwrap(), "1 1 5\n1 3 4\n2 2 0.5\n");
    }

    #[test]
    fn arff_layout() {
        let mut out = Vec::new();
        write_arff(&matrix(), "ratings", &mut out).unwrap();

        let expected = "@RELATION ratings\n\n@ATTRIBUTE UserId NUMERIC\n\n@DATA\n\
                        {0 1, 1 5, 3 4}\n{0 2, 2 0.5}\n";
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn json_reports() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("specs.json");

        let value: Vec<(u32, f64)> = vec![(1, 0.5), (2, 1.0)];
        write_json(&value, path.to_str()).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "[[1,0.5],[2,1.0]]\n");
    }

    #[test]
    fn exports_are_deterministic() {
        let mut first = Vec::new();
        let mut second = Vec::new();
        write_triplets(&matrix(), &mut first, b'\t').unwrap();
        write_triplets(&matrix(), &mut second, b'\t').unwrap();
        assert_eq!(first, second);
    }
}
