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

use fnv::{FnvHashMap, FnvHashSet};

/// Contiguous zero-based internal id of a user, an item, a tag, a category or a region.
pub type DenseIndex = u32;

pub type IndexSet = FnvHashSet<DenseIndex>;

/// Row to (column to value) table used while a matrix is being assembled.
pub type RowTable<V> = FnvHashMap<DenseIndex, FnvHashMap<DenseIndex, V>>;

/// Column to rows multimap, used to build the column-oriented part of a matrix.
pub type ColumnMap = FnvHashMap<DenseIndex, IndexSet>;

pub fn new_index_set(capacity: usize) -> IndexSet {
    FnvHashSet::with_capacity_and_hasher(capacity, Default::default())
}

/// A single observed interaction, expressed in dense indices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triplet {
    pub row: DenseIndex,
    pub column: DenseIndex,
    pub value: f64,
    /// Milliseconds since the epoch, if the source carried a timestamp.
    pub timestamp: Option<i64>,
}

/// Unit of the timestamps found in a source file. Everything is stored in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {

    pub fn to_millis(self, value: i64) -> i64 {
        match self {
            TimeUnit::Nanoseconds => value / 1_000_000,
            TimeUnit::Microseconds => value / 1_000,
            TimeUnit::Milliseconds => value,
            TimeUnit::Seconds => value.saturating_mul(1_000),
            TimeUnit::Minutes => value.saturating_mul(60_000),
            TimeUnit::Hours => value.saturating_mul(3_600_000),
            TimeUnit::Days => value.saturating_mul(86_400_000),
        }
    }

    pub fn parse(name: &str) -> Option<TimeUnit> {
        match name.to_ascii_lowercase().as_str() {
            "ns" | "nanoseconds" => Some(TimeUnit::Nanoseconds),
            "us" | "microseconds" => Some(TimeUnit::Microseconds),
            "ms" | "milliseconds" => Some(TimeUnit::Milliseconds),
            "s" | "seconds" => Some(TimeUnit::Seconds),
            "m" | "minutes" => Some(TimeUnit::Minutes),
            "h" | "hours" => Some(TimeUnit::Hours),
            "d" | "days" => Some(TimeUnit::Days),
            _ => None,
        }
    }
}

impl Default for TimeUnit {
    fn default() -> Self {
        TimeUnit::Seconds
    }
}

#[cfg(test)]
mod tests {

    use super::TimeUnit;

    #[test]
    fn seconds_to_millis() {
        assert_eq!(TimeUnit::Seconds.to_millis(1000), 1_000_000);
        assert_eq!(TimeUnit::Milliseconds.to_millis(1234), 1234);
        assert_eq!(TimeUnit::Days.to_millis(1), 86_400_000);
        assert_eq!(TimeUnit::Microseconds.to_millis(5_000), 5);
    }

    #[test]
    fn unit_names() {
        assert_eq!(TimeUnit::parse("s"), Some(TimeUnit::Seconds));
        assert_eq!(TimeUnit::parse("Milliseconds"), Some(TimeUnit::Milliseconds));
        assert_eq!(TimeUnit::parse("fortnights"), None);
        assert_eq!(TimeUnit::default(), TimeUnit::Seconds);
    }
}
