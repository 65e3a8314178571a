// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Sky models.
//!
//! A [`SourceList`] is an ordered collection of sources, each described by
//! nodes of an [`crate::ExprGraph`]. Sources can be added but never removed.
//! A subset of the sources is "selected"; only selected sources are used when
//! predicting visibilities.


use indexmap::IndexMap;
use log::debug;
use thiserror::Error;

use crate::ExprId;

/// The Stokes parameters of a source \[Jy\].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stokes {
    pub i: ExprId,
    pub q: ExprId,
    pub u: ExprId,
    pub v: ExprId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceShape {
    Point,

    Gaussian {
        /// Full width at half maximum of the major axis \[radians\]
        major: ExprId,

        /// Full width at half maximum of the minor axis \[radians\]
        minor: ExprId,

        /// Position angle \[radians\]
        position_angle: ExprId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub name: String,

    /// Right ascension \[radians\]
    pub ra: ExprId,

    /// Declination \[radians\]
    pub dec: ExprId,

    pub flux: Stokes,

    pub shape: SourceShape,
}

impl Source {
    pub fn is_point(&self) -> bool {
        matches!(self.shape, SourceShape::Point)
    }

    pub fn is_gaussian(&self) -> bool {
        matches!(self.shape, SourceShape::Gaussian { .. })
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ComponentCounts {
    pub num_points: usize,
    pub num_gaussians: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SourceList {
    sources: IndexMap<String, Source>,

    /// Indices into `sources`. Every index is in range.
    selected: Vec<usize>,
}

impl SourceList {
    pub fn new() -> SourceList {
        SourceList::default()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Append a source. It is selected straight away. Returns the new
    /// source's index.
    ///
    /// Source names must be unique, as sources can be looked up by name;
    /// adding a source whose name is already in the list fails with
    /// [`SourceListError::DuplicateName`] and leaves the list unchanged.
    pub fn add(&mut self, source: Source) -> Result<usize, SourceListError> {
        if self.sources.contains_key(&source.name) {
            return Err(SourceListError::DuplicateName(source.name));
        }
        let (index, _) = self.sources.insert_full(source.name.clone(), source);
        self.selected.push(index);
        Ok(index)
    }

    /// Select sources by index. An empty slice selects every source, in
    /// order. Otherwise the indices are used as given (including their order
    /// and any repeats). If any index is out of range, the selection is left
    /// unchanged.
    pub fn set_selected(&mut self, indices: &[usize]) -> Result<(), SourceListError> {
        if indices.is_empty() {
            self.selected = (0..self.sources.len()).collect();
        } else {
            if let Some(&index) = indices.iter().find(|&&i| i >= self.sources.len()) {
                return Err(SourceListError::IndexOutOfRange {
                    index,
                    len: self.sources.len(),
                });
            }
            self.selected = indices.to_vec();
        }
        debug!(
            "{} of {} sources selected",
            self.selected.len(),
            self.sources.len()
        );
        Ok(())
    }

    /// Select sources by name, with the same rules as
    /// [`SourceList::set_selected`].
    pub fn set_selected_by_name<S: AsRef<str>>(&mut self, names: &[S]) -> Result<(), SourceListError> {
        let indices = names
            .iter()
            .map(|name| {
                self.sources
                    .get_index_of(name.as_ref())
                    .ok_or_else(|| SourceListError::UnknownSource(name.as_ref().to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.set_selected(&indices)
    }

    pub fn selected(&self) -> &[usize] {
        &self.selected
    }

    /// The selected sources, in selection order.
    pub fn selected_sources(&self) -> impl Iterator<Item = &Source> {
        self.selected.iter().map(|&i| &self.sources[i])
    }

    pub fn get(&self, index: usize) -> Option<&Source> {
        self.sources.get_index(index).map(|(_, s)| s)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Source> {
        self.sources.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Source> {
        self.sources.values()
    }

    pub fn counts(&self) -> ComponentCounts {
        let mut counts = ComponentCounts::default();
        for source in self.sources.values() {
            match source.shape {
                SourceShape::Point => counts.num_points += 1,
                SourceShape::Gaussian { .. } => counts.num_gaussians += 1,
            }
        }
        counts
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceListError {
    #[error("Source index {index} is out of range; there are only {len} sources")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("A source named '{0}' is already in the source list")]
    DuplicateName(String),

    #[error("No source named '{0}' is in the source list")]
    UnknownSource(String),
}
