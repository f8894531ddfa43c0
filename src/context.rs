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

//! Side information about users, items and individual ratings.
//!
//! Context is loaded from several independent files, each of which fills a single field of an
//! entry. A pass therefore fetches the current entry (or a default one), changes its own field
//! and writes the entry back, see [`ContextStore::update`].

use fnv::FnvHashMap;

use crate::error::{DataError, Result};
use crate::types::{self, DenseIndex, IndexSet};

/// Entries keyed by dense index. A slot table sized to the maximum index maps each index to the
/// position of its entry in a compact, append-only entry list.
#[derive(Debug, Clone)]
pub struct ContextStore<T> {
    slots: Vec<Option<usize>>,
    entries: Vec<T>,
    max_index: DenseIndex,
}

impl<T> ContextStore<T> {

    pub fn new(max_index: DenseIndex) -> Self {
        ContextStore::with_capacity(max_index, 0)
    }

    pub fn with_capacity(max_index: DenseIndex, capacity: usize) -> Self {
        ContextStore {
            slots: vec![None; max_index as usize + 1],
            entries: Vec::with_capacity(capacity),
            max_index,
        }
    }

    pub fn max_index(&self) -> DenseIndex {
        self.max_index
    }

    /// Number of indices with an entry.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Never fails; indices past the maximum simply have no entry.
    pub fn contains(&self, index: DenseIndex) -> bool {
        self.slots.get(index as usize).map_or(false, Option::is_some)
    }

    /// `Ok(None)` for a valid index without an entry, an error only past the maximum index.
    pub fn get(&self, index: DenseIndex) -> Result<Option<&T>> {
        let slot = self.slot(index)?;
        Ok(slot.map(|position| &self.entries[position]))
    }

    pub fn get_mut(&mut self, index: DenseIndex) -> Result<Option<&mut T>> {
        match self.slot(index)? {
            Some(position) => Ok(Some(&mut self.entries[position])),
            None => Ok(None),
        }
    }

    /// Inserts the entry on first use and overwrites it afterwards.
    pub fn set(&mut self, index: DenseIndex, entry: T) -> Result<()> {
        match self.slot(index)? {
            Some(position) => self.entries[position] = entry,
            None => {
                self.slots[index as usize] = Some(self.entries.len());
                self.entries.push(entry);
            }
        }
        Ok(())
    }

    /// Iterates over `(index, entry)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item=(DenseIndex, &T)> {
        let entries = &self.entries;
        self.slots
            .iter()
            .enumerate()
            .filter_map(move |(index, slot)| {
                slot.map(|position| (index as DenseIndex, &entries[position]))
            })
    }

    /// Raises the maximum index, e.g. after the registry the store belongs to has grown. Existing
    /// entries keep their indices; the maximum never shrinks.
    pub fn ensure_max_index(&mut self, max_index: DenseIndex) {
        if max_index > self.max_index {
            self.slots.resize(max_index as usize + 1, None);
            self.max_index = max_index;
        }
    }

    fn slot(&self, index: DenseIndex) -> Result<Option<usize>> {
        if index > self.max_index {
            return Err(DataError::OutOfRange { index, max: self.max_index });
        }
        Ok(self.slots[index as usize])
    }
}

impl<T: Default> ContextStore<T> {

    /// Fetches the entry at `index` (or a default one), lets `change` modify it and stores it.
    /// Fields that `change` does not touch keep whatever an earlier pass put there.
    pub fn update<F>(&mut self, index: DenseIndex, change: F) -> Result<()>
        where F: FnOnce(&mut T) {

        match self.get_mut(index)? {
            Some(entry) => change(entry),
            None => {
                let mut entry = T::default();
                change(&mut entry);
                self.set(index, entry)?;
            }
        }
        Ok(())
    }
}

/// User related side information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserContextEntry {
    pub social: IndexSet,
    pub name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub description: Option<String>,
}

impl UserContextEntry {

    pub fn add_social(&mut self, user: DenseIndex) {
        self.social.insert(user);
    }

    pub fn is_social_with(&self, user: DenseIndex) -> bool {
        self.social.contains(&user)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Female,
    Male,
}

impl Gender {

    /// Accepts `1`/`m`/`male` and `0`/`f`/`female`, ignoring case.
    pub fn parse(field: &str) -> Option<Gender> {
        match field.trim().to_ascii_lowercase().as_str() {
            "1" | "m" | "male" => Some(Gender::Male),
            "0" | "f" | "female" => Some(Gender::Female),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// Item related side information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemContextEntry {
    pub name: Option<String>,
    pub price: Option<f32>,
    pub category: Option<DenseIndex>,
    pub description: Option<String>,
    pub location: Option<Location>,
    pub tags: IndexSet,
    pub region: Option<DenseIndex>,
}

pub type UserContext = ContextStore<UserContextEntry>;

/// Item context plus the sizes of the tag, category and region vocabularies of the passes that
/// filled it.
#[derive(Debug, Clone)]
pub struct ItemContext {
    entries: ContextStore<ItemContextEntry>,
    num_tags: usize,
    num_categories: usize,
    num_regions: usize,
}

impl ItemContext {

    pub fn new(max_index: DenseIndex) -> Self {
        ItemContext {
            entries: ContextStore::new(max_index),
            num_tags: 0,
            num_categories: 0,
            num_regions: 0,
        }
    }

    pub fn entries(&self) -> &ContextStore<ItemContextEntry> {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut ContextStore<ItemContextEntry> {
        &mut self.entries
    }

    pub fn contains(&self, item: DenseIndex) -> bool {
        self.entries.contains(item)
    }

    pub fn ensure_max_index(&mut self, max_index: DenseIndex) {
        self.entries.ensure_max_index(max_index);
    }

    pub fn get(&self, item: DenseIndex) -> Result<Option<&ItemContextEntry>> {
        self.entries.get(item)
    }

    pub fn num_tags(&self) -> usize {
        self.num_tags
    }

    pub fn num_categories(&self) -> usize {
        self.num_categories
    }

    pub fn num_regions(&self) -> usize {
        self.num_regions
    }

    pub(crate) fn set_num_tags(&mut self, num_tags: usize) {
        self.num_tags = num_tags;
    }

    pub(crate) fn set_num_categories(&mut self, num_categories: usize) {
        self.num_categories = num_categories;
    }

    pub(crate) fn set_num_regions(&mut self, num_regions: usize) {
        self.num_regions = num_regions;
    }
}

/// Context of a single (user, item) rating.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingContextEntry {
    /// Milliseconds since the epoch.
    pub timestamp: Option<i64>,
    /// All known rating times of the pair, in the order they were read.
    pub timestamps: Vec<i64>,
    pub mood: Option<String>,
}

impl RatingContextEntry {

    /// Appends a rating time; the first one known also becomes `timestamp`.
    pub fn push_timestamp(&mut self, timestamp: i64) {
        self.timestamp.get_or_insert(timestamp);
        self.timestamps.push(timestamp);
    }
}

/// Rating context keyed by `(user, item)`, with per-user and per-item views.
#[derive(Debug, Clone, Default)]
pub struct RatingContext {
    entries: FnvHashMap<(DenseIndex, DenseIndex), RatingContextEntry>,
    items_by_user: FnvHashMap<DenseIndex, IndexSet>,
    users_by_item: FnvHashMap<DenseIndex, IndexSet>,
}

impl RatingContext {

    pub fn new() -> Self {
        RatingContext::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, user: DenseIndex, item: DenseIndex) -> bool {
        self.entries.contains_key(&(user, item))
    }

    pub fn contains_user(&self, user: DenseIndex) -> bool {
        self.items_by_user.contains_key(&user)
    }

    pub fn contains_item(&self, item: DenseIndex) -> bool {
        self.users_by_item.contains_key(&item)
    }

    pub fn get(&self, user: DenseIndex, item: DenseIndex) -> Option<&RatingContextEntry> {
        self.entries.get(&(user, item))
    }

    /// Replaces the entry of the pair.
    pub fn put(&mut self, user: DenseIndex, item: DenseIndex, entry: RatingContextEntry) {
        self.register(user, item);
        self.entries.insert((user, item), entry);
    }

    /// Fetch-or-create, then modify in place.
    pub fn update<F>(&mut self, user: DenseIndex, item: DenseIndex, change: F)
        where F: FnOnce(&mut RatingContextEntry) {

        self.register(user, item);
        change(self.entries.entry((user, item)).or_insert_with(RatingContextEntry::default));
    }

    /// The rated items of `user` with their context.
    pub fn by_user(&self, user: DenseIndex) -> Vec<(DenseIndex, &RatingContextEntry)> {
        let mut entries: Vec<(DenseIndex, &RatingContextEntry)> = self.items_by_user
            .get(&user)
            .into_iter()
            .flat_map(|items| items.iter())
            .filter_map(|item| self.entries.get(&(user, *item)).map(|entry| (*item, entry)))
            .collect();
        entries.sort_unstable_by_key(|(item, _)| *item);
        entries
    }

    /// The users who rated `item`, with their context.
    pub fn by_item(&self, item: DenseIndex) -> Vec<(DenseIndex, &RatingContextEntry)> {
        let mut entries: Vec<(DenseIndex, &RatingContextEntry)> = self.users_by_item
            .get(&item)
            .into_iter()
            .flat_map(|users| users.iter())
            .filter_map(|user| self.entries.get(&(*user, item)).map(|entry| (*user, entry)))
            .collect();
        entries.sort_unstable_by_key(|(user, _)| *user);
        entries
    }

    fn register(&mut self, user: DenseIndex, item: DenseIndex) {
        self.items_by_user
            .entry(user)
            .or_insert_with(|| types::new_index_set(4))
            .insert(item);
        self.users_by_item
            .entry(item)
            .or_insert_with(|| types::new_index_set(4))
            .insert(user);
    }
}

#[cfg(test)]
mod tests {

    use super::{ContextStore, Gender, ItemContextEntry, Location, RatingContext};
    use crate::error::DataError;

    #[test]
    fn insert_then_overwrite() {
        let mut store: ContextStore<String> = ContextStore::new(4);

        assert!(!store.contains(2));
        assert_eq!(store.get(2).unwrap(), None);

        store.set(2, String::from("first")).unwrap();
        store.set(0, String::from("other")).unwrap();
        store.set(2, String::from("second")).unwrap();

        assert!(store.contains(2));
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(2).unwrap().map(String::as_str), Some("second"));
    }

    #[test]
    fn out_of_range_is_a_contract_violation() {
        let mut store: ContextStore<u8> = ContextStore::new(3);

        assert!(!store.contains(10));
        assert!(store.get(3).unwrap().is_none());

        match store.get(4) {
            Err(DataError::OutOfRange { index, max }) => {
                assert_eq!(index, 4);
                assert_eq!(max, 3);
            }
            other => panic!("unexpected result {:?}", other),
        }

        assert!(store.set(4, 1).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn growing_keeps_entries() {
        let mut store: ContextStore<u8> = ContextStore::new(0);
        store.set(0, 7).unwrap();
        assert!(store.set(2, 9).is_err());

        store.ensure_max_index(2);
        store.set(2, 9).unwrap();
        store.ensure_max_index(1);

        assert_eq!(store.max_index(), 2);
        assert_eq!(store.get(0).unwrap(), Some(&7));
        assert_eq!(store.get(2).unwrap(), Some(&9));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn passes_merge_fields() {
        let mut store: ContextStore<ItemContextEntry> = ContextStore::new(2);

        store.update(1, |entry| entry.description = Some(String::from("a pony"))).unwrap();
        store.update(1, |entry| entry.category = Some(3)).unwrap();
        store.update(1, |entry| {
            entry.location = Some(Location { latitude: 52.5, longitude: 13.4 })
        }).unwrap();

        let entry = store.get(1).unwrap().unwrap();
        assert_eq!(entry.description.as_deref(), Some("a pony"));
        assert_eq!(entry.category, Some(3));
        assert!(entry.location.is_some());
        assert_eq!(store.len(), 1);

        store.update(1, |entry| entry.description = Some(String::from("a horse"))).unwrap();
        let entry = store.get(1).unwrap().unwrap();
        assert_eq!(entry.description.as_deref(), Some("a horse"));
        assert_eq!(entry.category, Some(3));
    }

    #[test]
    fn entries_in_index_order() {
        let mut store: ContextStore<char> = ContextStore::new(5);
        store.set(4, 'd').unwrap();
        store.set(1, 'a').unwrap();

        let entries: Vec<(u32, char)> = store.iter().map(|(index, c)| (index, *c)).collect();
        assert_eq!(entries, vec![(1, 'a'), (4, 'd')]);
    }

    #[test]
    fn rating_timestamps_append() {
        let mut context = RatingContext::new();

        context.update(0, 1, |entry| entry.push_timestamp(30));
        context.update(0, 1, |entry| entry.push_timestamp(10));
        context.update(2, 1, |entry| entry.mood = Some(String::from("happy")));

        assert_eq!(context.len(), 2);
        assert_eq!(context.get(0, 1).unwrap().timestamps, vec![30, 10]);
        assert_eq!(context.get(0, 1).unwrap().timestamp, Some(30));
        assert!(context.contains_user(2));
        assert!(context.contains_item(1));
        assert!(!context.contains_item(0));

        let raters: Vec<u32> = context.by_item(1).into_iter().map(|(user, _)| user).collect();
        assert_eq!(raters, vec![0, 2]);
        assert_eq!(context.by_user(0).len(), 1);
    }

    #[test]
    fn gender_codes() {
        assert_eq!(Gender::parse("1"), Some(Gender::Male));
        assert_eq!(Gender::parse("Female"), Some(Gender::Female));
        assert_eq!(Gender::parse("x"), None);
    }
}
