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

//! Loading of rating files and of the auxiliary context files that accompany them.
//!
//! The rating file is read in a single sequential pass. Every record is turned into a triplet
//! whose user and item are resolved through the [`Registries`], and the triplets are collected
//! into a [`SparseMatrixBuilder`]. Once the scan is complete the matrix is built with the final
//! registry sizes as dimensions and the rating scale is shifted away from zero if needed.
//!
//! Auxiliary passes only resolve raw ids that the rating file introduced; records about unknown
//! users or items are skipped.

use std::convert::TryFrom;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use tracing::{debug, info, trace};

use crate::context::{Gender, ItemContext, Location, RatingContext, UserContext};
use crate::error::{DataError, Result};
use crate::io;
use crate::matrix::{SparseMatrix, SparseMatrixBuilder};
use crate::registry::{IdRegistry, Registries};
use crate::scale::{RatingScale, ScaleDistribution};
use crate::stats::{self, DatasetSpecs, Distributions};
use crate::tensor::RatingTensor;
use crate::types::{self, DenseIndex, TimeUnit, Triplet};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Positions of the relevant fields in a rating record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub user: usize,
    pub item: usize,
    pub rating: Option<usize>,
    pub timestamp: Option<usize>,
}

impl ColumnSpec {

    /// Implicit feedback: every record counts as a rating of `1.0`.
    pub fn implicit(user: usize, item: usize) -> Self {
        ColumnSpec { user, item, rating: None, timestamp: None }
    }

    pub fn with_rating(mut self, rating: usize) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_timestamp(mut self, timestamp: usize) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// `{user, item, [rating, [timestamp]]}`, as given on the command line.
    pub fn from_positions(positions: &[usize]) -> Result<Self> {
        match *positions {
            [user, item] => Ok(ColumnSpec::implicit(user, item)),
            [user, item, rating] => Ok(ColumnSpec::implicit(user, item).with_rating(rating)),
            [user, item, rating, timestamp] => Ok(ColumnSpec::implicit(user, item)
                .with_rating(rating)
                .with_timestamp(timestamp)),
            _ => Err(DataError::Config(format!(
                "expected 2 to 4 column positions, got {}", positions.len()))),
        }
    }
}

impl Default for ColumnSpec {
    fn default() -> Self {
        ColumnSpec::implicit(0, 1).with_rating(2)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub columns: ColumnSpec,
    /// Ratings above the threshold become `1.0`, all others `0.0`.
    pub binarize_threshold: Option<f64>,
    pub time_unit: TimeUnit,
    pub skip_header: bool,
}

impl LoaderConfig {

    pub fn with_columns(mut self, columns: ColumnSpec) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_binarize_threshold(mut self, threshold: f64) -> Self {
        self.binarize_threshold = Some(threshold);
        self
    }

    pub fn with_time_unit(mut self, time_unit: TimeUnit) -> Self {
        self.time_unit = time_unit;
        self
    }

    pub fn with_skip_header(mut self, skip_header: bool) -> Self {
        self.skip_header = skip_header;
        self
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            columns: ColumnSpec::default(),
            binarize_threshold: None,
            time_unit: TimeUnit::default(),
            skip_header: false,
        }
    }
}

/// Everything the scan of a rating file produces.
#[derive(Debug, Clone)]
pub struct RatingData {
    pub rate_matrix: SparseMatrix<f64>,
    /// Rating times in milliseconds, present if the records carried timestamps.
    pub time_matrix: Option<SparseMatrix<i64>>,
    pub scale: RatingScale,
    pub distribution: ScaleDistribution,
    /// Number of records read, duplicates included.
    pub num_ratings: usize,
    /// Smallest and largest timestamp in milliseconds.
    pub timestamp_range: Option<(i64, i64)>,
}

impl RatingData {

    pub fn num_days(&self) -> i64 {
        self.timestamp_range.map_or(0, |(min, max)| (max - min) / MILLIS_PER_DAY)
    }
}

pub struct DatasetLoader {
    path: PathBuf,
    config: LoaderConfig,
    registries: Registries,
    data: Option<RatingData>,
    tensor: Option<RatingTensor>,
    user_context: Option<UserContext>,
    item_context: Option<ItemContext>,
    rating_context: Option<RatingContext>,
}

impl DatasetLoader {

    pub fn new<P: AsRef<Path>>(path: P, config: LoaderConfig) -> Self {
        DatasetLoader::with_registries(path, config, Registries::separate())
    }

    /// Users and items share one id space, e.g. for a file of social links.
    pub fn with_shared_ids<P: AsRef<Path>>(path: P, config: LoaderConfig) -> Self {
        DatasetLoader::with_registries(path, config, Registries::shared())
    }

    pub fn with_registries<P: AsRef<Path>>(
        path: P,
        config: LoaderConfig,
        registries: Registries,
    ) -> Self {
        DatasetLoader {
            path: path.as_ref().to_path_buf(),
            config,
            registries,
            data: None,
            tensor: None,
            user_context: None,
            item_context: None,
            rating_context: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    pub fn users(&self) -> &IdRegistry {
        self.registries.users()
    }

    pub fn items(&self) -> &IdRegistry {
        self.registries.items()
    }

    pub fn num_users(&self) -> usize {
        self.registries.num_users()
    }

    pub fn num_items(&self) -> usize {
        self.registries.num_items()
    }

    pub fn data(&self) -> Option<&RatingData> {
        self.data.as_ref()
    }

    /// The tensor of the last [`DatasetLoader::read_tensor`], unless ratings were read since.
    pub fn tensor(&self) -> Option<&RatingTensor> {
        self.tensor.as_ref()
    }

    pub fn into_parts(self) -> (Registries, Option<RatingData>) {
        (self.registries, self.data)
    }

    /// Reads the rating file.
    pub fn read_data(&mut self) -> Result<&RatingData> {
        info!("Dataset: {}", self.path.display());
        let reader = io::line_reader(&self.path)?;
        self.read_data_from(reader)
    }

    /// Reads ratings from any line source. On failure the registries and any previously read
    /// data stay as they were; a partially filled matrix is never kept.
    pub fn read_data_from<R: BufRead>(&mut self, reader: R) -> Result<&RatingData> {

        let mut registries = self.registries.clone();
        let mut rate_builder = SparseMatrixBuilder::new();
        let mut time_builder: Option<SparseMatrixBuilder<i64>> = None;
        let mut distribution = ScaleDistribution::new();
        let mut timestamp_range: Option<(i64, i64)> = None;

        let mut header_pending = self.config.skip_header;

        for (number, line) in reader.lines().enumerate() {
            let line = line?;

            if header_pending {
                header_pending = false;
                continue;
            }

            let fields = io::split_fields(&line);
            if fields.is_empty() {
                continue;
            }

            let triplet = self.parse_rating(&fields, number + 1, &mut registries)?;

            distribution.add(triplet.value);
            rate_builder.put(triplet.row, triplet.column, triplet.value);

            if let Some(timestamp) = triplet.timestamp {
                timestamp_range = Some(match timestamp_range {
                    Some((min, max)) => (min.min(timestamp), max.max(timestamp)),
                    None => (timestamp, timestamp),
                });
                time_builder
                    .get_or_insert_with(SparseMatrixBuilder::new)
                    .put(triplet.row, triplet.column, timestamp);
            }
        }

        let num_rows = registries.num_users();
        let num_columns = registries.num_items();

        let mut rate_matrix = rate_builder.build(num_rows, num_columns)?;
        let time_matrix = match time_builder {
            Some(builder) => Some(builder.build(num_rows, num_columns)?),
            None => None,
        };

        let mut scale = RatingScale::from_distribution(&distribution);
        scale.normalize(&mut rate_matrix);

        debug!(
            shared_ids = registries.is_shared(),
            users = num_rows,
            items = num_columns,
            ratings = distribution.total(),
            scale = ?scale.values(),
            timestamps = ?timestamp_range,
            "With specs"
        );

        self.registries = registries;
        self.tensor = None;
        let data = RatingData {
            rate_matrix,
            time_matrix,
            scale,
            num_ratings: distribution.total(),
            distribution,
            timestamp_range,
        };

        Ok(&*self.data.insert(data))
    }

    /// The rating data, reading the rating file first if that has not happened yet.
    pub fn ensure_data(&mut self) -> Result<&RatingData> {
        if self.data.is_none() {
            return self.read_data();
        }
        self.loaded()
    }

    fn loaded(&self) -> Result<&RatingData> {
        self.data
            .as_ref()
            .ok_or_else(|| DataError::Config(String::from("no rating data has been read")))
    }

    fn parse_rating(
        &self,
        fields: &[&str],
        line: usize,
        registries: &mut Registries,
    ) -> Result<Triplet> {

        let columns = &self.config.columns;

        let user = field(fields, columns.user, line)?;
        let item = field(fields, columns.item, line)?;

        let value = match columns.rating.and_then(|column| fields.get(column)) {
            Some(rating) => io::parse_float(rating, line)?,
            None => 1.0,
        };

        let value = self.binarize(value);

        let timestamp = match columns.timestamp.and_then(|column| fields.get(column)) {
            Some(timestamp) => {
                Some(self.config.time_unit.to_millis(io::parse_integral(timestamp, line)?))
            }
            None => None,
        };

        let row = registries.users_mut().index_of(user);
        let column = registries.items_mut().index_of(item);

        Ok(Triplet { row, column, value, timestamp })
    }

    fn binarize(&self, value: f64) -> f64 {
        match self.config.binarize_threshold {
            Some(threshold) => if value > threshold { 1.0 } else { 0.0 },
            None => value,
        }
    }

    /// Reads the rating file together with its feature columns.
    pub fn read_tensor(&mut self) -> Result<&RatingTensor> {
        info!("Dataset: {}", self.path.display());
        let reader = io::line_reader(&self.path)?;
        self.read_tensor_from(reader)
    }

    /// Reads ratings whose records carry integral features in every field besides user, item
    /// and rating; `na` stands for feature `0`. All records need as many fields as the first one.
    /// Binarization and the zero shift apply as for [`DatasetLoader::read_data_from`], and the
    /// collapsed user-item matrix becomes the loader's rating data. A configured timestamp
    /// column is read as a feature like any other.
    pub fn read_tensor_from<R: BufRead>(&mut self, reader: R) -> Result<&RatingTensor> {

        let columns = self.config.columns;
        let rating_column = columns.rating.ok_or_else(|| DataError::Config(String::from(
            "reading features needs user, item and rating columns")))?;
        if rating_column == columns.user || rating_column == columns.item {
            return Err(DataError::Config(format!(
                "rating column {} overlaps the user or item column", rating_column)));
        }
        let last_column = columns.user.max(columns.item).max(rating_column);

        let mut registries = self.registries.clone();
        let mut distribution = ScaleDistribution::new();
        let mut tensor: Option<RatingTensor> = None;
        let mut num_fields = last_column + 1;
        let mut key = Vec::with_capacity(num_fields);

        let mut header_pending = self.config.skip_header;

        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            let number = number + 1;

            if header_pending {
                header_pending = false;
                continue;
            }

            let fields = io::split_fields(&line);
            if fields.is_empty() {
                continue;
            }

            let current = match tensor {
                Some(ref mut current) => current,
                None => {
                    if fields.len() <= last_column {
                        return Err(DataError::Format {
                            line: number,
                            message: format!(
                                "missing column {} in a record with {} fields",
                                last_column, fields.len()),
                        });
                    }
                    num_fields = fields.len();
                    tensor.insert(tensor_layout(&columns, rating_column, num_fields)?)
                }
            };

            if fields.len() != num_fields {
                return Err(DataError::Format {
                    line: number,
                    message: format!(
                        "expected {} fields like the first record, found {}",
                        num_fields, fields.len()),
                });
            }

            key.clear();
            let mut value = 1.0;
            for (position, raw) in fields.iter().enumerate() {
                let raw = raw.trim();
                if position == columns.user {
                    key.push(registries.users_mut().index_of(raw));
                } else if position == columns.item {
                    key.push(registries.items_mut().index_of(raw));
                } else if position == rating_column {
                    value = self.binarize(io::parse_float(raw, number)?);
                } else {
                    key.push(parse_feature(raw, number)?);
                }
            }

            distribution.add(value);
            current.push(&key, value)?;
        }

        let mut tensor = match tensor {
            Some(tensor) => tensor,
            None => tensor_layout(&columns, rating_column, num_fields)?,
        };

        let num_rows = registries.num_users();
        let num_columns = registries.num_items();

        let mut rate_matrix = tensor.rate_matrix(num_rows, num_columns)?;
        let mut scale = RatingScale::from_distribution(&distribution);
        let shift = scale.normalize(&mut rate_matrix);
        tensor.shift_values(shift);

        debug!(
            users = num_rows,
            items = num_columns,
            ratings = distribution.total(),
            features = tensor.num_features(),
            scale = ?scale.values(),
            "With specs"
        );

        self.registries = registries;
        self.data = Some(RatingData {
            rate_matrix,
            time_matrix: None,
            scale,
            num_ratings: distribution.total(),
            distribution,
            timestamp_range: None,
        });

        Ok(&*self.tensor.insert(tensor))
    }

    pub fn user_context(&self) -> Option<&UserContext> {
        self.user_context.as_ref()
    }

    pub fn item_context(&self) -> Option<&ItemContext> {
        self.item_context.as_ref()
    }

    pub fn rating_context(&self) -> Option<&RatingContext> {
        self.rating_context.as_ref()
    }

    /// Reads `user friend` links. Both users have to be known.
    pub fn read_user_social<P: AsRef<Path>>(&mut self, columns: [usize; 2], path: P)
        -> Result<&UserContext> {

        let users = self.registries.users();
        let context = self.user_context
            .get_or_insert_with(|| UserContext::new(max_index(users.len())));
        context.ensure_max_index(max_index(users.len()));

        scan_lines(path, |number, line| {
            let fields = io::split_fields(line);
            if fields.len() < 2 {
                return Ok(());
            }
            let user = field(&fields, columns[0], number)?;
            let friend = field(&fields, columns[1], number)?;

            match (users.get(user), users.get(friend)) {
                (Some(user), Some(friend)) => context.update(user, |entry| entry.add_social(friend)),
                _ => {
                    trace!(line = number, "skipping link between unknown users");
                    Ok(())
                }
            }
        })?;

        Ok(context)
    }

    /// Reads `user ## description` records.
    pub fn read_user_description<P: AsRef<Path>>(&mut self, columns: [usize; 2], path: P)
        -> Result<&UserContext> {

        let users = self.registries.users();
        let context = self.user_context
            .get_or_insert_with(|| UserContext::new(max_index(users.len())));
        context.ensure_max_index(max_index(users.len()));

        scan_lines(path, |number, line| {
            let fields = io::split_key_values(line);
            if fields.len() < 2 {
                return Ok(());
            }
            let description = field(&fields, columns[1], number)?;

            match users.get(field(&fields, columns[0], number)?) {
                Some(user) => context.update(user, |entry| {
                    entry.description = Some(description.to_owned())
                }),
                None => Ok(()),
            }
        })?;

        Ok(context)
    }

    /// Reads `user ## name ## age ## gender` records. Missing trailing fields are left unset.
    pub fn read_user_profile<P: AsRef<Path>>(&mut self, columns: [usize; 4], path: P)
        -> Result<&UserContext> {

        let users = self.registries.users();
        let context = self.user_context
            .get_or_insert_with(|| UserContext::new(max_index(users.len())));
        context.ensure_max_index(max_index(users.len()));

        scan_lines(path, |number, line| {
            let fields = io::split_key_values(line);
            if fields.len() < 2 {
                return Ok(());
            }
            let user = match users.get(field(&fields, columns[0], number)?) {
                Some(user) => user,
                None => return Ok(()),
            };

            let name = fields.get(columns[1]).map(|name| name.trim().to_owned());
            let age = match fields.get(columns[2]) {
                Some(age) => {
                    let parsed = io::parse_integral(age.trim(), number)?;
                    let age = u32::try_from(parsed).map_err(|_| DataError::Format {
                        line: number,
                        message: format!("age {} is not a valid age", parsed),
                    })?;
                    Some(age)
                }
                None => None,
            };
            let gender = fields.get(columns[3]).and_then(|gender| Gender::parse(gender));

            context.update(user, |entry| {
                if name.is_some() {
                    entry.name = name;
                }
                if age.is_some() {
                    entry.age = age;
                }
                if gender.is_some() {
                    entry.gender = gender;
                }
            })
        })?;

        Ok(context)
    }

    /// Reads `item latitude longitude` records. Every record must have exactly three fields.
    pub fn read_item_location<P: AsRef<Path>>(&mut self, columns: [usize; 3], path: P)
        -> Result<&ItemContext> {

        let items = self.registries.items();
        let context = self.item_context
            .get_or_insert_with(|| ItemContext::new(max_index(items.len())));
        context.ensure_max_index(max_index(items.len()));

        scan_lines(path, |number, line| {
            let fields = io::split_fields(line);
            if fields.len() != 3 {
                return Err(DataError::Format {
                    line: number,
                    message: format!(
                        "expected item, latitude and longitude, found {} fields", fields.len()),
                });
            }

            let latitude = io::parse_float(field(&fields, columns[1], number)?, number)?;
            let longitude = io::parse_float(field(&fields, columns[2], number)?, number)?;

            match items.get(field(&fields, columns[0], number)?) {
                Some(item) => context.entries_mut().update(item, |entry| {
                    entry.location = Some(Location { latitude, longitude })
                }),
                None => Ok(()),
            }
        })?;

        Ok(context)
    }

    /// Reads `item ## tag ## tag ...` records. Tags get indices from a vocabulary private to
    /// this pass; its size is published on the item context.
    pub fn read_item_tags<P: AsRef<Path>>(&mut self, item_column: usize, path: P)
        -> Result<&ItemContext> {

        let items = self.registries.items();
        let context = self.item_context
            .get_or_insert_with(|| ItemContext::new(max_index(items.len())));
        context.ensure_max_index(max_index(items.len()));
        let mut tag_ids = IdRegistry::new();

        scan_lines(path, |number, line| {
            let fields = io::split_key_values(line);
            if fields.len() < 2 {
                return Ok(());
            }

            let item = match items.get(field(&fields, item_column, number)?) {
                Some(item) => item,
                None => return Ok(()),
            };

            let mut tags = types::new_index_set(fields.len() - 1);
            for (position, tag) in fields.iter().enumerate() {
                if position != item_column {
                    tags.insert(tag_ids.index_of(tag));
                }
            }

            context.entries_mut().update(item, |entry| entry.tags = tags)
        })?;

        context.set_num_tags(tag_ids.len());
        Ok(context)
    }

    /// Reads `item ## description` records.
    pub fn read_item_description<P: AsRef<Path>>(&mut self, columns: [usize; 2], path: P)
        -> Result<&ItemContext> {

        let items = self.registries.items();
        let context = self.item_context
            .get_or_insert_with(|| ItemContext::new(max_index(items.len())));
        context.ensure_max_index(max_index(items.len()));

        scan_lines(path, |number, line| {
            let fields = io::split_key_values(line);
            if fields.len() < 2 {
                return Ok(());
            }
            let description = field(&fields, columns[1], number)?;

            match items.get(field(&fields, columns[0], number)?) {
                Some(item) => context.entries_mut().update(item, |entry| {
                    entry.description = Some(description.to_owned())
                }),
                None => Ok(()),
            }
        })?;

        Ok(context)
    }

    /// Reads `item ## ... ## category` records. Records with more than four fields carry the
    /// category in their fourth field, shorter records in their last one.
    pub fn read_item_category<P: AsRef<Path>>(&mut self, item_column: usize, path: P)
        -> Result<&ItemContext> {

        let items = self.registries.items();
        let context = self.item_context
            .get_or_insert_with(|| ItemContext::new(max_index(items.len())));
        context.ensure_max_index(max_index(items.len()));
        let mut category_ids = IdRegistry::new();

        scan_lines(path, |number, line| {
            let fields = io::split_key_values(line);
            if fields.len() < 2 {
                return Ok(());
            }

            let item = match items.get(field(&fields, item_column, number)?) {
                Some(item) => item,
                None => return Ok(()),
            };

            let category = if fields.len() > 4 { fields[3] } else { fields[fields.len() - 1] };
            let category = category_ids.index_of(category);

            context.entries_mut().update(item, |entry| entry.category = Some(category))
        })?;

        context.set_num_categories(category_ids.len());
        Ok(context)
    }

    /// Reads `item region` records.
    pub fn read_item_region<P: AsRef<Path>>(&mut self, columns: [usize; 2], path: P)
        -> Result<&ItemContext> {

        let items = self.registries.items();
        let context = self.item_context
            .get_or_insert_with(|| ItemContext::new(max_index(items.len())));
        context.ensure_max_index(max_index(items.len()));
        let mut region_ids = IdRegistry::new();

        scan_lines(path, |number, line| {
            let fields = io::split_fields(line);
            if fields.len() < 2 {
                return Ok(());
            }

            let item = match items.get(field(&fields, columns[0], number)?) {
                Some(item) => item,
                None => return Ok(()),
            };
            let region = region_ids.index_of(field(&fields, columns[1], number)?);

            context.entries_mut().update(item, |entry| entry.region = Some(region))
        })?;

        context.set_num_regions(region_ids.len());
        Ok(context)
    }

    /// Reads `item ## name ## price` records.
    pub fn read_item_profile<P: AsRef<Path>>(&mut self, columns: [usize; 3], path: P)
        -> Result<&ItemContext> {

        let items = self.registries.items();
        let context = self.item_context
            .get_or_insert_with(|| ItemContext::new(max_index(items.len())));
        context.ensure_max_index(max_index(items.len()));

        scan_lines(path, |number, line| {
            let fields = io::split_key_values(line);
            if fields.len() < 2 {
                return Ok(());
            }
            let item = match items.get(field(&fields, columns[0], number)?) {
                Some(item) => item,
                None => return Ok(()),
            };

            let name = fields.get(columns[1]).map(|name| name.trim().to_owned());
            let price = match fields.get(columns[2]) {
                Some(price) => Some(io::parse_float(price.trim(), number)? as f32),
                None => None,
            };

            context.entries_mut().update(item, |entry| {
                if name.is_some() {
                    entry.name = name;
                }
                if price.is_some() {
                    entry.price = price;
                }
            })
        })?;

        Ok(context)
    }

    /// Reads `user item timestamp` records and appends each timestamp, converted to
    /// milliseconds, to the list of its (user, item) pair.
    pub fn read_rating_timestamps<P: AsRef<Path>>(&mut self, columns: [usize; 3], path: P)
        -> Result<&RatingContext> {

        let users = self.registries.users();
        let items = self.registries.items();
        let time_unit = self.config.time_unit;
        let context = self.rating_context.get_or_insert_with(RatingContext::new);

        scan_lines(path, |number, line| {
            let fields = io::split_fields(line);
            if fields.len() < 2 {
                return Ok(());
            }

            let user = users.get(field(&fields, columns[0], number)?);
            let item = items.get(field(&fields, columns[1], number)?);

            if let (Some(user), Some(item)) = (user, item) {
                let raw = io::parse_integral(field(&fields, columns[2], number)?, number)?;
                let timestamp = time_unit.to_millis(raw);
                context.update(user, item, |entry| entry.push_timestamp(timestamp));
            }
            Ok(())
        })?;

        Ok(context)
    }

    /// Descriptive statistics of the dataset, reading the rating file first if needed.
    pub fn specs(&mut self) -> Result<DatasetSpecs> {
        self.ensure_data()?;
        let data = self.loaded()?;
        Ok(stats::dataset_specs(&self.path.display().to_string(), &self.registries, data))
    }

    /// Rating count distributions, reading the rating file first if needed.
    pub fn distributions(&mut self) -> Result<Distributions> {
        let data = self.ensure_data()?;
        Ok(stats::distributions(&data.rate_matrix))
    }

    /// Exports the rating matrix as one-based triplets, reading the rating file first if needed.
    pub fn write_triplets<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let data = self.ensure_data()?;
        io::write_triplets_to(&data.rate_matrix, path)
    }

    /// Exports the rating matrix in ARFF bag format, reading the rating file first if needed.
    pub fn write_arff<P: AsRef<Path>>(&mut self, relation: &str, path: P) -> Result<()> {
        let data = self.ensure_data()?;
        io::write_arff_to(&data.rate_matrix, relation, path)
    }
}

/// A store that can hold every index of a registry with `len` entries.
fn max_index(len: usize) -> DenseIndex {
    len.saturating_sub(1) as DenseIndex
}

/// One tensor dimension per field except the rating, in field order.
fn tensor_layout(columns: &ColumnSpec, rating_column: usize, num_fields: usize)
    -> Result<RatingTensor> {

    let dimension = |column: usize| if column > rating_column { column - 1 } else { column };
    RatingTensor::new(num_fields - 1, dimension(columns.user), dimension(columns.item))
}

fn parse_feature(field: &str, line: usize) -> Result<DenseIndex> {
    if field.eq_ignore_ascii_case("na") {
        return Ok(0);
    }
    let parsed = io::parse_integral(field, line)?;
    DenseIndex::try_from(parsed).map_err(|_| DataError::Format {
        line,
        message: format!("feature {} is not a valid feature value", parsed),
    })
}

fn field<'a>(fields: &[&'a str], position: usize, line: usize) -> Result<&'a str> {
    fields.get(position).map(|field| field.trim()).ok_or_else(|| DataError::Format {
        line,
        message: format!("missing column {} in a record with {} fields", position, fields.len()),
    })
}

/// Runs `handle` on every non-blank line of the file at `path` with its one-based line number.
fn scan_lines<P, F>(path: P, mut handle: F) -> Result<()>
    where P: AsRef<Path>, F: FnMut(usize, &str) -> Result<()> {

    let reader = io::line_reader(path)?;
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        handle(number + 1, &line)?;
    }
    Ok(())
}
