// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! 2x2 matrices of results.
//!
//! The algebra here is the same as that of [`marlu::Jones`], except that each
//! element is a whole [`MeqResult`] grid, and perturbed values are carried
//! through each operation.

use marlu::Jones;
use serde::Serialize;

use super::MeqResult;
use crate::{constants::SINGULAR_MATRIX_RTOL, value::broadcast_shape, Matrix, ValueError};

/// A 2x2 (Jones) matrix of results. Element `rIJ` is row `I`, column `J`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JonesResult {
    pub r11: MeqResult,
    pub r12: MeqResult,
    pub r21: MeqResult,
    pub r22: MeqResult,
}

impl JonesResult {
    pub fn new(r11: MeqResult, r12: MeqResult, r21: MeqResult, r22: MeqResult) -> JonesResult {
        JonesResult { r11, r12, r21, r22 }
    }

    /// A diagonal matrix. The off-diagonal elements are exactly zero and
    /// have no perturbed values.
    pub fn diagonal(r11: MeqResult, r22: MeqResult) -> JonesResult {
        let num_spids = r11.num_spids().max(r22.num_spids());
        let zero = || MeqResult::from_value(Matrix::real_scalar(0.0), num_spids);
        JonesResult::new(r11, zero(), zero(), r22)
    }

    /// A matrix of zeros with `num_spids` unset perturbed values.
    pub fn zeros(num_spids: usize) -> JonesResult {
        let zero = || MeqResult::from_value(Matrix::real_scalar(0.0), num_spids);
        JonesResult::new(zero(), zero(), zero(), zero())
    }

    /// The coherency matrix of a point source with the given Stokes
    /// parameters:
    ///
    /// ```text
    /// 1/2 [[I + Q,   U + iV],
    ///      [U - iV,  I - Q ]]
    /// ```
    pub fn from_stokes(
        i: &MeqResult,
        q: &MeqResult,
        u: &MeqResult,
        v: &MeqResult,
    ) -> Result<JonesResult, ValueError> {
        let half = MeqResult::from_value(Matrix::real_scalar(0.5), 0);
        let xx = half.mul(&i.add(q)?)?;
        let xy = half.mul(&MeqResult::to_complex(u, v)?)?;
        let yx = half.mul(&MeqResult::to_complex(u, &v.neg()?)?)?;
        let yy = half.mul(&i.sub(q)?)?;
        Ok(JonesResult::new(xx, xy, yx, yy))
    }

    pub fn elements(&self) -> [&MeqResult; 4] {
        [&self.r11, &self.r12, &self.r21, &self.r22]
    }

    pub fn num_spids(&self) -> usize {
        self.elements()
            .iter()
            .map(|r| r.num_spids())
            .max()
            .unwrap_or(0)
    }

    /// The shape of the grid covered by all four elements.
    pub fn shape(&self) -> Result<(usize, usize), ValueError> {
        self.elements()
            .iter()
            .try_fold((1, 1), |acc, r| broadcast_shape(acc, r.shape()))
    }

    /// Get the values in one grid cell as a Jones matrix.
    pub fn jones_at(&self, i_freq: usize, i_time: usize) -> Jones<f64> {
        Jones::from([
            self.r11.value().get(i_freq, i_time),
            self.r12.value().get(i_freq, i_time),
            self.r21.value().get(i_freq, i_time),
            self.r22.value().get(i_freq, i_time),
        ])
    }

    pub fn add(&self, other: &JonesResult) -> Result<JonesResult, ValueError> {
        Ok(JonesResult::new(
            self.r11.add(&other.r11)?,
            self.r12.add(&other.r12)?,
            self.r21.add(&other.r21)?,
            self.r22.add(&other.r22)?,
        ))
    }

    pub fn sub(&self, other: &JonesResult) -> Result<JonesResult, ValueError> {
        Ok(JonesResult::new(
            self.r11.sub(&other.r11)?,
            self.r12.sub(&other.r12)?,
            self.r21.sub(&other.r21)?,
            self.r22.sub(&other.r22)?,
        ))
    }

    /// Multiply every element by a scalar result.
    pub fn scale(&self, s: &MeqResult) -> Result<JonesResult, ValueError> {
        Ok(JonesResult::new(
            s.mul(&self.r11)?,
            s.mul(&self.r12)?,
            s.mul(&self.r21)?,
            s.mul(&self.r22)?,
        ))
    }

    /// The matrix product `self . other`.
    pub fn mul(&self, other: &JonesResult) -> Result<JonesResult, ValueError> {
        let (a, b) = (self, other);
        let dot = |x1: &MeqResult, y1: &MeqResult, x2: &MeqResult, y2: &MeqResult| {
            x1.mul(y1)?.add(&x2.mul(y2)?)
        };
        Ok(JonesResult::new(
            dot(&a.r11, &b.r11, &a.r12, &b.r21)?,
            dot(&a.r11, &b.r12, &a.r12, &b.r22)?,
            dot(&a.r21, &b.r11, &a.r22, &b.r21)?,
            dot(&a.r21, &b.r12, &a.r22, &b.r22)?,
        ))
    }

    /// The Hermitian conjugate (conjugate transpose).
    pub fn h(&self) -> Result<JonesResult, ValueError> {
        Ok(JonesResult::new(
            self.r11.conj()?,
            self.r21.conj()?,
            self.r12.conj()?,
            self.r22.conj()?,
        ))
    }

    /// `self . other^H`.
    pub fn mul_hermitian(&self, other: &JonesResult) -> Result<JonesResult, ValueError> {
        self.mul(&other.h()?)
    }

    /// The matrix inverse, `adj(A) / det(A)`. Fails if the matrix is singular
    /// in any cell (see [`SINGULAR_MATRIX_RTOL`]). The perturbed values use
    /// `d(A^-1) = -A^-1 dA A^-1`.
    pub fn inv(&self) -> Result<JonesResult, ValueError> {
        let [a11, a12, a21, a22] = self.elements().map(MeqResult::value);
        let det = a11.mul(a22)?.sub(&a12.mul(a21)?)?;
        check_singular(&det, [a11, a12, a21, a22])?;

        let inv = [
            a22.div(&det)?,
            a12.div(&det)?.neg(),
            a21.div(&det)?.neg(),
            a11.div(&det)?,
        ];

        let num_spids = self.num_spids();
        let mut out = [
            MeqResult::from_value(inv[0].clone(), num_spids),
            MeqResult::from_value(inv[1].clone(), num_spids),
            MeqResult::from_value(inv[2].clone(), num_spids),
            MeqResult::from_value(inv[3].clone(), num_spids),
        ];
        let zero = Matrix::real_scalar(0.0);
        for spid in 0..num_spids {
            let elements = self.elements();
            if !elements.iter().any(|r| r.is_perturbed(spid)) {
                continue;
            }
            let da = elements.map(|r| r.perturbed_value(spid).unwrap_or(&zero));
            let inv_refs = [&inv[0], &inv[1], &inv[2], &inv[3]];
            let tmp = matmul(inv_refs, da)?;
            let d_inv = matmul([&tmp[0], &tmp[1], &tmp[2], &tmp[3]], inv_refs)?;
            for (o, d) in out.iter_mut().zip(d_inv) {
                o.set_perturbed_value(spid, d.neg())?;
            }
        }

        let [r11, r12, r21, r22] = out;
        Ok(JonesResult::new(r11, r12, r21, r22))
    }
}

/// A plain 2x2 product of value grids.
fn matmul(a: [&Matrix; 4], b: [&Matrix; 4]) -> Result<[Matrix; 4], ValueError> {
    let dot = |x1: &Matrix, y1: &Matrix, x2: &Matrix, y2: &Matrix| x1.mul(y1)?.add(&x2.mul(y2)?);
    Ok([
        dot(a[0], b[0], a[1], b[2])?,
        dot(a[0], b[1], a[1], b[3])?,
        dot(a[2], b[0], a[3], b[2])?,
        dot(a[2], b[1], a[3], b[3])?,
    ])
}

fn check_singular(det: &Matrix, elements: [&Matrix; 4]) -> Result<(), ValueError> {
    // Squared Frobenius norm in each cell.
    let mut norm2 = Matrix::real_scalar(0.0);
    for e in elements {
        let abs = Matrix::Real(e.abs());
        norm2 = norm2.add(&abs.mul(&abs)?)?;
    }

    let (num_freqs, num_times) = broadcast_shape(det.shape(), norm2.shape())?;
    for i_freq in 0..num_freqs {
        for i_time in 0..num_times {
            let det_abs = det.get(i_freq, i_time).norm();
            if det_abs <= SINGULAR_MATRIX_RTOL * norm2.get(i_freq, i_time).re {
                return Err(ValueError::SingularMatrix {
                    i_freq,
                    i_time,
                    det_abs,
                });
            }
        }
    }
    Ok(())
}
