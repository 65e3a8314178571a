// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Numeric values produced by evaluating expressions.
//!
//! A [`Matrix`] is always two dimensional, with frequency on the first axis
//! and time on the second. An axis of length 1 means the value is constant
//! along that axis, so a scalar is `1x1`, a value that only varies with
//! frequency is `Nx1` and so on. Binary operations broadcast length-1 axes
//! against each other.


use ndarray::{prelude::*, Zip};
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::c64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Matrix {
    Real(Array2<f64>),
    Complex(Array2<c64>),
}

impl Matrix {
    /// A `1x1` real value.
    pub fn real_scalar(x: f64) -> Matrix {
        Matrix::Real(Array2::from_elem((1, 1), x))
    }

    /// A `1x1` complex value.
    pub fn complex_scalar(z: c64) -> Matrix {
        Matrix::Complex(Array2::from_elem((1, 1), z))
    }

    /// A real value that is zero everywhere.
    pub fn zeros(shape: (usize, usize)) -> Matrix {
        Matrix::Real(Array2::zeros(shape))
    }

    pub fn shape(&self) -> (usize, usize) {
        match self {
            Matrix::Real(a) => a.dim(),
            Matrix::Complex(a) => a.dim(),
        }
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, Matrix::Complex(_))
    }

    pub fn as_real(&self) -> Option<&Array2<f64>> {
        match self {
            Matrix::Real(a) => Some(a),
            Matrix::Complex(_) => None,
        }
    }

    pub fn as_complex(&self) -> Option<&Array2<c64>> {
        match self {
            Matrix::Real(_) => None,
            Matrix::Complex(a) => Some(a),
        }
    }

    /// Get a complex copy of this value, regardless of whether it's real.
    pub fn to_complex_array(&self) -> Array2<c64> {
        match self {
            Matrix::Real(a) => a.mapv(|x| c64::new(x, 0.0)),
            Matrix::Complex(a) => a.clone(),
        }
    }

    /// Get the value in a grid cell. Axes of length 1 are broadcast, so any
    /// cell index can be used on a scalar.
    ///
    /// # Panics
    ///
    /// Panics if an index is out of range on an axis that isn't broadcast.
    pub fn get(&self, i_freq: usize, i_time: usize) -> c64 {
        let (num_freqs, num_times) = self.shape();
        let i_freq = if num_freqs == 1 { 0 } else { i_freq };
        let i_time = if num_times == 1 { 0 } else { i_time };
        match self {
            Matrix::Real(a) => c64::new(a[(i_freq, i_time)], 0.0),
            Matrix::Complex(a) => a[(i_freq, i_time)],
        }
    }

    /// Is every element exactly zero?
    pub fn is_zero(&self) -> bool {
        match self {
            Matrix::Real(a) => a.iter().all(Zero::is_zero),
            Matrix::Complex(a) => a.iter().all(Zero::is_zero),
        }
    }

    /// The absolute value of every element.
    pub fn abs(&self) -> Array2<f64> {
        match self {
            Matrix::Real(a) => a.mapv(f64::abs),
            Matrix::Complex(a) => a.mapv(|z| z.norm()),
        }
    }

    /// The largest absolute value of any element. NaNs are ignored.
    pub fn max_abs(&self) -> f64 {
        self.abs().iter().copied().fold(0.0, f64::max)
    }

    /// Expand this value to `shape`.
    pub fn broadcast_to(&self, shape: (usize, usize)) -> Result<Matrix, ValueError> {
        let err = || ValueError::ShapeMismatch {
            left: self.shape(),
            right: shape,
        };
        Ok(match self {
            Matrix::Real(a) => Matrix::Real(a.broadcast(shape).ok_or_else(err)?.to_owned()),
            Matrix::Complex(a) => Matrix::Complex(a.broadcast(shape).ok_or_else(err)?.to_owned()),
        })
    }

    pub fn add(&self, other: &Matrix) -> Result<Matrix, ValueError> {
        self.zip_with(other, |a, b| a + b, |a, b| a + b)
    }

    pub fn sub(&self, other: &Matrix) -> Result<Matrix, ValueError> {
        self.zip_with(other, |a, b| a - b, |a, b| a - b)
    }

    pub fn mul(&self, other: &Matrix) -> Result<Matrix, ValueError> {
        self.zip_with(other, |a, b| a * b, |a, b| a * b)
    }

    pub fn div(&self, other: &Matrix) -> Result<Matrix, ValueError> {
        self.zip_with(other, |a, b| a / b, |a, b| a / b)
    }

    pub fn neg(&self) -> Matrix {
        self.map(|x| -x, |z| -z)
    }

    /// The complex conjugate. Real values are unchanged.
    pub fn conj(&self) -> Matrix {
        match self {
            Matrix::Real(_) => self.clone(),
            Matrix::Complex(a) => Matrix::Complex(a.mapv(|z| z.conj())),
        }
    }

    pub fn cos(&self) -> Matrix {
        self.map(f64::cos, |z| z.cos())
    }

    pub fn sin(&self) -> Matrix {
        self.map(f64::sin, |z| z.sin())
    }

    pub fn exp(&self) -> Matrix {
        self.map(f64::exp, |z| z.exp())
    }

    pub fn sqrt(&self) -> Matrix {
        self.map(f64::sqrt, |z| z.sqrt())
    }

    /// `e^{ix}` for every element `x`. The result is always complex.
    pub fn cis(&self) -> Matrix {
        match self {
            Matrix::Real(a) => Matrix::Complex(a.mapv(c64::cis)),
            Matrix::Complex(a) => Matrix::Complex(a.mapv(|z| (z * c64::i()).exp())),
        }
    }

    /// Multiply every element by a real number.
    pub fn scale(&self, factor: f64) -> Matrix {
        self.map(|x| x * factor, |z| z * factor)
    }

    /// Multiply every element by a complex number. The result is always
    /// complex.
    pub fn scale_complex(&self, factor: c64) -> Matrix {
        Matrix::Complex(self.to_complex_array().mapv(|z| z * factor))
    }

    /// Combine a real part and an imaginary part into a complex value.
    pub fn to_complex(re: &Matrix, im: &Matrix) -> Result<Matrix, ValueError> {
        let im = im.scale_complex(c64::i());
        re.add(&im)
    }

    /// Combine an amplitude and a phase \[radians\] into a complex value.
    pub fn polar(amp: &Matrix, phase: &Matrix) -> Result<Matrix, ValueError> {
        amp.mul(&phase.cis())
    }

    fn map(&self, fr: impl Fn(f64) -> f64, fc: impl Fn(c64) -> c64) -> Matrix {
        match self {
            Matrix::Real(a) => Matrix::Real(a.mapv(fr)),
            Matrix::Complex(a) => Matrix::Complex(a.mapv(fc)),
        }
    }

    fn zip_with(
        &self,
        other: &Matrix,
        fr: impl Fn(f64, f64) -> f64,
        fc: impl Fn(c64, c64) -> c64,
    ) -> Result<Matrix, ValueError> {
        let shape = broadcast_shape(self.shape(), other.shape())?;
        match (self, other) {
            (Matrix::Real(a), Matrix::Real(b)) => Ok(Matrix::Real(zip_arrays(a, b, shape, fr)?)),
            _ => {
                let a = self.to_complex_array();
                let b = other.to_complex_array();
                Ok(Matrix::Complex(zip_arrays(&a, &b, shape, fc)?))
            }
        }
    }
}

impl From<Array2<f64>> for Matrix {
    fn from(a: Array2<f64>) -> Self {
        Matrix::Real(a)
    }
}

impl From<Array2<c64>> for Matrix {
    fn from(a: Array2<c64>) -> Self {
        Matrix::Complex(a)
    }
}

/// Get the shape that results from combining two values with the given
/// shapes.
pub fn broadcast_shape(
    left: (usize, usize),
    right: (usize, usize),
) -> Result<(usize, usize), ValueError> {
    fn dim(a: usize, b: usize) -> Option<usize> {
        if a == b || b == 1 {
            Some(a)
        } else if a == 1 {
            Some(b)
        } else {
            None
        }
    }

    match (dim(left.0, right.0), dim(left.1, right.1)) {
        (Some(f), Some(t)) => Ok((f, t)),
        _ => Err(ValueError::ShapeMismatch { left, right }),
    }
}

fn zip_arrays<T: Copy>(
    a: &Array2<T>,
    b: &Array2<T>,
    shape: (usize, usize),
    f: impl Fn(T, T) -> T,
) -> Result<Array2<T>, ValueError> {
    let err = || ValueError::ShapeMismatch {
        left: a.dim(),
        right: b.dim(),
    };
    let a = a.broadcast(shape).ok_or_else(err)?;
    let b = b.broadcast(shape).ok_or_else(err)?;
    Ok(Zip::from(&a).and(&b).map_collect(|&x, &y| f(x, y)))
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    #[error("Cannot combine values with shapes {left:?} and {right:?}")]
    ShapeMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },

    #[error("No perturbed value has been set for spid {spid}")]
    NoDerivative { spid: usize },

    #[error("spid {spid} is out of range; only {num_spids} perturbed values are available")]
    SpidOutOfRange { spid: usize, num_spids: usize },

    #[error("Cannot invert a singular 2x2 matrix (|det| = {det_abs:e} in cell [{i_freq}, {i_time}])")]
    SingularMatrix {
        i_freq: usize,
        i_time: usize,
        det_abs: f64,
    },
}
