// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Externally-supplied visibilities, read by [`crate::JonesKind::VisData`]
//! nodes.


use std::path::Path;

use marlu::Jones;
use ndarray::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::c64;

/// Visibilities for each baseline, each a `[freq][time]` grid of Jones
/// matrices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "VisBufferOnDisk", try_from = "VisBufferOnDisk")]
pub struct VisBuffer {
    baselines: Vec<Array2<Jones<f64>>>,
}

impl VisBuffer {
    pub fn new() -> VisBuffer {
        VisBuffer::default()
    }

    pub fn from_baselines(baselines: Vec<Array2<Jones<f64>>>) -> VisBuffer {
        VisBuffer { baselines }
    }

    /// Add the visibilities of the next baseline, returning its index.
    pub fn push(&mut self, vis: Array2<Jones<f64>>) -> usize {
        self.baselines.push(vis);
        self.baselines.len() - 1
    }

    pub fn num_baselines(&self) -> usize {
        self.baselines.len()
    }

    pub fn baseline(&self, index: usize) -> Option<ArrayView2<'_, Jones<f64>>> {
        self.baselines.get(index).map(|a| a.view())
    }

    /// Read visibilities from a JSON file (as written by `bbs predict
    /// --output`, or by hand).
    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<VisBuffer, VisReadError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

/// How a [`VisBuffer`] is (de)serialised: the four elements of each Jones
/// matrix are the last axis of a `[freq][time][4]` array.
#[derive(Serialize, Deserialize)]
struct VisBufferOnDisk {
    baselines: Vec<Array3<c64>>,
}

impl From<VisBuffer> for VisBufferOnDisk {
    fn from(vis: VisBuffer) -> Self {
        let baselines = vis
            .baselines
            .into_iter()
            .map(|a| {
                let (num_freqs, num_times) = a.dim();
                Array3::from_shape_fn((num_freqs, num_times, 4), |(f, t, k)| a[(f, t)][k])
            })
            .collect();
        VisBufferOnDisk { baselines }
    }
}

impl TryFrom<VisBufferOnDisk> for VisBuffer {
    type Error = VisReadError;

    fn try_from(on_disk: VisBufferOnDisk) -> Result<Self, Self::Error> {
        let baselines = on_disk
            .baselines
            .into_iter()
            .enumerate()
            .map(|(i_bl, a)| {
                let (num_freqs, num_times, num_pols) = a.dim();
                if num_pols != 4 {
                    return Err(VisReadError::NotFourPols {
                        baseline: i_bl,
                        num_pols,
                    });
                }
                Ok(Array2::from_shape_fn((num_freqs, num_times), |(f, t)| {
                    Jones::from([a[(f, t, 0)], a[(f, t, 1)], a[(f, t, 2)], a[(f, t, 3)]])
                }))
            })
            .collect::<Result<_, _>>()?;
        Ok(VisBuffer { baselines })
    }
}

#[derive(Error, Debug)]
pub enum VisReadError {
    #[error("Baseline {baseline} has {num_pols} polarisations per sample; expected 4")]
    NotFourPols { baseline: usize, num_pols: usize },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
