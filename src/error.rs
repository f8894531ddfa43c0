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

//! Error types shared by ingestion, context stores and the training loop.

use thiserror::Error;

use crate::types::DenseIndex;

/// Errors that can occur while loading, storing or training on interaction data.
#[derive(Error, Debug)]
pub enum DataError {
    /// Reading or writing a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The csv writer used for exports failed.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Serializing a report or a checkpoint record failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A numeric field could be parsed neither as an integer nor as a float.
    #[error("line {line}: cannot parse '{field}' as a number")]
    Parse {
        /// One-based line number in the source file.
        line: usize,
        /// The offending field.
        field: String,
    },

    /// A record has the wrong number of fields or misses a configured column.
    #[error("line {line}: {message}")]
    Format {
        /// One-based line number in the source file.
        line: usize,
        /// What is wrong with the record.
        message: String,
    },

    /// No raw id is registered for a dense index.
    #[error("no raw id registered for index {index}")]
    NotFound {
        /// The dense index that was looked up.
        index: DenseIndex,
    },

    /// A context entry was requested past the configured maximum index.
    #[error("index {index} is out of range (maximum index: {max})")]
    OutOfRange {
        /// The requested index.
        index: DenseIndex,
        /// The configured maximum index.
        max: DenseIndex,
    },

    /// Invalid training or loader configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A pluggable model reported a failure.
    #[error("model error: {0}")]
    Model(String),
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, DataError>;
