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

use fnv::FnvHashMap;

use crate::error::{DataError, Result};
use crate::types::DenseIndex;

/// Bijective mapping between raw string ids and consecutive integer ids. Indices are handed out
/// in the order in which raw ids are first seen. The inverse is an owned vector that is only ever
/// extended together with the forward map, so both directions always agree.
#[derive(Debug, Clone, Default)]
pub struct IdRegistry {
    index_of_raw_id: FnvHashMap<String, DenseIndex>,
    raw_ids: Vec<String>,
}

impl IdRegistry {

    pub fn new() -> Self {
        IdRegistry::with_capacity(100)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        IdRegistry {
            index_of_raw_id: FnvHashMap::with_capacity_and_hasher(capacity, Default::default()),
            raw_ids: Vec::with_capacity(capacity),
        }
    }

    /// Returns the index of `raw_id`, assigning the next free index if it has not been seen yet.
    pub fn index_of(&mut self, raw_id: &str) -> DenseIndex {
        if let Some(index) = self.index_of_raw_id.get(raw_id) {
            return *index;
        }

        let index = self.raw_ids.len() as DenseIndex;
        self.index_of_raw_id.insert(raw_id.to_owned(), index);
        self.raw_ids.push(raw_id.to_owned());
        index
    }

    /// Looks up `raw_id` without registering it.
    pub fn get(&self, raw_id: &str) -> Option<DenseIndex> {
        self.index_of_raw_id.get(raw_id).copied()
    }

    pub fn contains(&self, raw_id: &str) -> bool {
        self.index_of_raw_id.contains_key(raw_id)
    }

    pub fn raw_id_of(&self, index: DenseIndex) -> Result<&str> {
        self.raw_ids
            .get(index as usize)
            .map(String::as_str)
            .ok_or(DataError::NotFound { index })
    }

    pub fn len(&self) -> usize {
        self.raw_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw_ids.is_empty()
    }

    /// Iterates over `(index, raw id)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item=(DenseIndex, &str)> {
        self.raw_ids
            .iter()
            .enumerate()
            .map(|(index, raw_id)| (index as DenseIndex, raw_id.as_str()))
    }
}

/// The user and item registries of a dataset. In shared mode there is only one table, which
/// serves both spaces; this is the case for social-link datasets where the items are users.
#[derive(Debug, Clone)]
pub struct Registries {
    users: IdRegistry,
    items: Option<IdRegistry>,
}

impl Registries {

    pub fn separate() -> Self {
        Registries { users: IdRegistry::new(), items: Some(IdRegistry::new()) }
    }

    pub fn shared() -> Self {
        Registries { users: IdRegistry::new(), items: None }
    }

    /// Continues from existing registries, e.g. to read a test file against the ids of a
    /// training file.
    pub fn from_existing(users: IdRegistry, items: IdRegistry) -> Self {
        Registries { users, items: Some(items) }
    }

    pub fn is_shared(&self) -> bool {
        self.items.is_none()
    }

    pub fn users(&self) -> &IdRegistry {
        &self.users
    }

    pub fn items(&self) -> &IdRegistry {
        self.items.as_ref().unwrap_or(&self.users)
    }

    pub fn users_mut(&mut self) -> &mut IdRegistry {
        &mut self.users
    }

    pub fn items_mut(&mut self) -> &mut IdRegistry {
        match self.items {
            Some(ref mut items) => items,
            None => &mut self.users,
        }
    }

    pub fn num_users(&self) -> usize {
        self.users().len()
    }

    pub fn num_items(&self) -> usize {
        self.items().len()
    }

    pub fn into_parts(self) -> (IdRegistry, Option<IdRegistry>) {
        (self.users, self.items)
    }
}

impl Default for Registries {
    fn default() -> Self {
        Registries::separate()
    }
}
