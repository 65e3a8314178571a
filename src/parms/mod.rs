// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Named model parameters ("parms"), the leaves of expression graphs.
//!
//! Each parameter is a 2-D polynomial over the normalised frequency and time
//! axes of the domain being evaluated. A parameter may be made solvable, in
//! which case each of its coefficients gets its own spid, and evaluating the
//! parameter with derivatives sets one perturbed value per coefficient.


use std::ops::Range;

use indexmap::IndexMap;
use itertools::Itertools;
use log::debug;
use ndarray::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Matrix, MeqResult, Request, ValueError};

/// An index into a [`ParmStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParmId(pub(crate) usize);

impl ParmId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ParmId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "parm #{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parm {
    name: String,

    /// Polynomial coefficients. The first axis is the order in frequency,
    /// the second the order in time.
    coeffs: Array2<f64>,

    /// If this parameter is solvable, the spids of its coefficients, in the
    /// (row-major) order of `coeffs`.
    spids: Option<Range<usize>>,
}

impl Parm {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn coeffs(&self) -> ArrayView2<'_, f64> {
        self.coeffs.view()
    }

    pub fn is_solvable(&self) -> bool {
        self.spids.is_some()
    }

    pub fn spids(&self) -> Option<Range<usize>> {
        self.spids.clone()
    }

    /// Evaluate this parameter over a request. `num_spids` is the total
    /// number of spids in use, so that the result has a slot for each.
    ///
    /// The result is `1x1` for a constant, and only expands along an axis if
    /// the polynomial has a term in it. If derivatives are wanted and
    /// `num_spids` leaves no slot for one of this parameter's spids, this
    /// fails with [`ValueError::SpidOutOfRange`].
    pub fn evaluate(&self, request: &Request, num_spids: usize) -> Result<MeqResult, ValueError> {
        let (freq_order, time_order) = self.coeffs.dim();
        let domain = request.domain();
        let xs = if freq_order > 1 {
            domain
                .freq_centres(request.num_freqs())
                .mapv(|f| domain.normalised_freq(f))
        } else {
            Array1::zeros(1)
        };
        let ys = if time_order > 1 {
            domain
                .time_centres(request.num_times())
                .mapv(|t| domain.normalised_time(t))
        } else {
            Array1::zeros(1)
        };

        // The polynomial basis functions x^k y^l, one grid per coefficient.
        let basis = |k: usize, l: usize| -> Array2<f64> {
            Array2::from_shape_fn((xs.len(), ys.len()), |(i, j)| {
                xs[i].powi(k as i32) * ys[j].powi(l as i32)
            })
        };

        let mut value = Array2::zeros((xs.len(), ys.len()));
        for ((k, l), &c) in self.coeffs.indexed_iter() {
            if c != 0.0 {
                value.scaled_add(c, &basis(k, l));
            }
        }

        let mut result = MeqResult::from_value(Matrix::Real(value), num_spids);
        if request.eval_derivatives() {
            if let Some(spids) = &self.spids {
                for (spid, (k, l)) in spids.clone().zip((0..freq_order).cartesian_product(0..time_order)) {
                    result.set_perturbed_value(spid, Matrix::Real(basis(k, l)))?;
                }
            }
        }
        Ok(result)
    }
}

/// An ordered collection of named parameters.
#[derive(Debug, Clone, Default)]
pub struct ParmStore {
    parms: IndexMap<String, Parm>,
    num_spids: usize,
}

impl ParmStore {
    pub fn new() -> ParmStore {
        ParmStore::default()
    }

    pub fn len(&self) -> usize {
        self.parms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parms.is_empty()
    }

    /// Add a parameter with polynomial coefficients `coeffs[freq][time]`.
    pub fn add(&mut self, name: &str, coeffs: Array2<f64>) -> Result<ParmId, ParmError> {
        if coeffs.is_empty() {
            return Err(ParmError::EmptyCoeffs(name.to_string()));
        }
        if self.parms.contains_key(name) {
            return Err(ParmError::DuplicateName(name.to_string()));
        }
        let (index, _) = self.parms.insert_full(
            name.to_string(),
            Parm {
                name: name.to_string(),
                coeffs,
                spids: None,
            },
        );
        Ok(ParmId(index))
    }

    /// Add a parameter that is constant over the domain.
    pub fn add_constant(&mut self, name: &str, value: f64) -> Result<ParmId, ParmError> {
        self.add(name, Array2::from_elem((1, 1), value))
    }

    /// Get a parameter's id, adding it as a constant if it doesn't exist.
    pub fn get_or_add_constant(&mut self, name: &str, value: f64) -> ParmId {
        match self.id(name) {
            Some(id) => id,
            None => {
                let (index, _) = self.parms.insert_full(
                    name.to_string(),
                    Parm {
                        name: name.to_string(),
                        coeffs: Array2::from_elem((1, 1), value),
                        spids: None,
                    },
                );
                ParmId(index)
            }
        }
    }

    pub fn id(&self, name: &str) -> Option<ParmId> {
        self.parms.get_index_of(name).map(ParmId)
    }

    pub fn get(&self, id: ParmId) -> Option<&Parm> {
        self.parms.get_index(id.0).map(|(_, p)| p)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Parm> {
        self.parms.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parm> {
        self.parms.values()
    }

    /// The total number of spids, i.e. the number of solvable coefficients.
    pub fn num_spids(&self) -> usize {
        self.num_spids
    }

    /// Make every parameter whose name matches one of the glob `patterns`
    /// solvable, and every other parameter not solvable. Spids are handed out
    /// in store order. Returns the number of spids.
    pub fn set_solvable<S: AsRef<str>>(&mut self, patterns: &[S]) -> Result<usize, ParmError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                glob::Pattern::new(p.as_ref()).map_err(|e| ParmError::BadPattern {
                    pattern: p.as_ref().to_string(),
                    err: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut next_spid = 0;
        for parm in self.parms.values_mut() {
            if patterns.iter().any(|p| p.matches(&parm.name)) {
                let n = parm.coeffs.len();
                parm.spids = Some(next_spid..next_spid + n);
                next_spid += n;
            } else {
                parm.spids = None;
            }
        }
        self.num_spids = next_spid;
        debug!(
            "{} solvable parameters with {} coefficients",
            self.parms.values().filter(|p| p.is_solvable()).count(),
            self.num_spids
        );
        Ok(self.num_spids)
    }

    /// The coefficients of all solvable parameters, in spid order.
    pub fn solvable_values(&self) -> Vec<f64> {
        let mut values = vec![0.0; self.num_spids];
        for parm in self.parms.values() {
            if let Some(spids) = &parm.spids {
                for (spid, &c) in spids.clone().zip(parm.coeffs.iter()) {
                    values[spid] = c;
                }
            }
        }
        values
    }

    /// Overwrite the coefficients of all solvable parameters. `values` is in
    /// spid order (the same order as [`ParmStore::solvable_values`]).
    pub fn update_solvables(&mut self, values: &[f64]) -> Result<(), ParmError> {
        if values.len() != self.num_spids {
            return Err(ParmError::WrongNumberOfValues {
                expected: self.num_spids,
                got: values.len(),
            });
        }
        for parm in self.parms.values_mut() {
            if let Some(spids) = &parm.spids {
                for (c, &v) in parm.coeffs.iter_mut().zip(&values[spids.clone()]) {
                    *c = v;
                }
            }
        }
        Ok(())
    }

    /// Replace a parameter's coefficients. A solvable parameter must keep the
    /// same number of coefficients, as its spids would otherwise be wrong.
    pub fn set_coeffs(&mut self, name: &str, coeffs: Array2<f64>) -> Result<(), ParmError> {
        let parm = self
            .parms
            .get_mut(name)
            .ok_or_else(|| ParmError::UnknownParm(name.to_string()))?;
        if coeffs.is_empty() {
            return Err(ParmError::EmptyCoeffs(name.to_string()));
        }
        if parm.is_solvable() && parm.coeffs.dim() != coeffs.dim() {
            return Err(ParmError::SolvableShapeChanged {
                name: name.to_string(),
                old: parm.coeffs.dim(),
                new: coeffs.dim(),
            });
        }
        parm.coeffs = coeffs;
        Ok(())
    }
}

impl std::ops::Index<ParmId> for ParmStore {
    type Output = Parm;

    fn index(&self, id: ParmId) -> &Parm {
        &self.parms[id.0]
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParmError {
    #[error("A parameter named '{0}' already exists")]
    DuplicateName(String),

    #[error("No parameter named '{0}' exists")]
    UnknownParm(String),

    #[error("Parameter '{0}' was given no coefficients")]
    EmptyCoeffs(String),

    #[error("Expected {expected} solvable values, but got {got}")]
    WrongNumberOfValues { expected: usize, got: usize },

    #[error("Cannot change the coefficient shape of solvable parameter '{name}' from {old:?} to {new:?}")]
    SolvableShapeChanged {
        name: String,
        old: (usize, usize),
        new: (usize, usize),
    },

    #[error("Invalid parameter pattern '{pattern}': {err}")]
    BadPattern { pattern: String, err: String },
}
