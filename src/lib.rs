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

//! Ingestion of user-item rating data and its side information for recommender models.
//!
//! A [`DatasetLoader`] reads a delimited rating file into a [`SparseMatrix`], mapping the raw
//! user and item ids of the file onto dense indices via an [`IdRegistry`]. Auxiliary files with
//! social links, descriptions, locations, tags and similar side information are merged into
//! per-user, per-item and per-rating context stores. An [`IterativeTrainingLoop`] drives models
//! that implement [`LatentModel`] through burn-in, sampling and checkpoint evaluation.

#[macro_use]
extern crate serde_derive;

pub mod context;
pub mod error;
pub mod evaluation;
pub mod io;
pub mod loader;
pub mod matrix;
pub mod registry;
pub mod scale;
pub mod similarity;
pub mod split;
pub mod stats;
pub mod tensor;
pub mod training;
pub mod types;


pub use crate::context::{ContextStore, ItemContext, RatingContext, UserContext};
pub use crate::error::{DataError, Result};
pub use crate::loader::{ColumnSpec, DatasetLoader, LoaderConfig, RatingData};
pub use crate::matrix::{SparseMatrix, SparseMatrixBuilder};
pub use crate::registry::{IdRegistry, Registries};
pub use crate::scale::RatingScale;
pub use crate::tensor::RatingTensor;
pub use crate::training::{IterativeTrainingLoop, LatentModel, LoopState, TrainingConfig};
pub use crate::types::{DenseIndex, TimeUnit};
