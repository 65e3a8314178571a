// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The time-frequency region over which expressions are evaluated.


use ndarray::prelude::*;
use thiserror::Error;

/// A rectangular region in (frequency, time) space. Internally, each axis is
/// stored as an offset and a scale, so that any point inside the domain can
/// be mapped onto the normalised interval \[-1, 1\].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
    offset_freq: f64,
    scale_freq: f64,
    offset_time: f64,
    scale_time: f64,
}

impl Domain {
    /// Create a new [`Domain`]. Frequencies are in \[Hz\] and times in
    /// \[seconds\], although nothing here depends on the units. The start of
    /// each axis must be strictly less than its end.
    pub fn new(
        start_freq: f64,
        end_freq: f64,
        start_time: f64,
        end_time: f64,
    ) -> Result<Domain, DomainError> {
        check_axis("frequency", start_freq, end_freq)?;
        check_axis("time", start_time, end_time)?;

        Ok(Domain {
            offset_freq: (end_freq + start_freq) / 2.0,
            scale_freq: (end_freq - start_freq) / 2.0,
            offset_time: (end_time + start_time) / 2.0,
            scale_time: (end_time - start_time) / 2.0,
        })
    }

    pub fn offset_freq(&self) -> f64 {
        self.offset_freq
    }

    pub fn scale_freq(&self) -> f64 {
        self.scale_freq
    }

    pub fn offset_time(&self) -> f64 {
        self.offset_time
    }

    pub fn scale_time(&self) -> f64 {
        self.scale_time
    }

    pub fn start_freq(&self) -> f64 {
        self.offset_freq - self.scale_freq
    }

    pub fn end_freq(&self) -> f64 {
        self.offset_freq + self.scale_freq
    }

    pub fn start_time(&self) -> f64 {
        self.offset_time - self.scale_time
    }

    pub fn end_time(&self) -> f64 {
        self.offset_time + self.scale_time
    }

    /// Map a frequency onto the normalised frequency axis. Frequencies inside
    /// the domain map to \[-1, 1\].
    #[inline]
    pub fn normalised_freq(&self, freq: f64) -> f64 {
        (freq - self.offset_freq) / self.scale_freq
    }

    /// Map a time onto the normalised time axis. Times inside the domain map
    /// to \[-1, 1\].
    #[inline]
    pub fn normalised_time(&self, time: f64) -> f64 {
        (time - self.offset_time) / self.scale_time
    }

    /// The centres of `num_cells` equally-sized frequency cells spanning the
    /// domain.
    pub fn freq_centres(&self, num_cells: usize) -> Array1<f64> {
        cell_centres(self.start_freq(), self.end_freq(), num_cells)
    }

    /// The centres of `num_cells` equally-sized time cells spanning the
    /// domain.
    pub fn time_centres(&self, num_cells: usize) -> Array1<f64> {
        cell_centres(self.start_time(), self.end_time(), num_cells)
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "freq [{}, {}] Hz, time [{}, {}] s",
            self.start_freq(),
            self.end_freq(),
            self.start_time(),
            self.end_time()
        )
    }
}

fn check_axis(axis: &'static str, start: f64, end: f64) -> Result<(), DomainError> {
    // Written this way so that NaNs are rejected too.
    if !(start.is_finite() && end.is_finite() && start < end) {
        return Err(DomainError::InvalidDomain { axis, start, end });
    }
    Ok(())
}

fn cell_centres(start: f64, end: f64, num_cells: usize) -> Array1<f64> {
    let width = (end - start) / num_cells as f64;
    Array1::from_shape_fn(num_cells, |i| start + (i as f64 + 0.5) * width)
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Invalid domain: the {axis} axis must start before it ends, but got start {start} and end {end}")]
    InvalidDomain {
        axis: &'static str,
        start: f64,
        end: f64,
    },
}
