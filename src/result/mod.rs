// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The results of evaluating expressions: a value, and the partial
//! derivatives of that value with respect to each solvable parameter
//! coefficient ("perturbed values").
//!
//! Perturbed values are addressed by "spid" (solvable parameter id), handed
//! out by [`crate::ParmStore`]. A result only carries the perturbed values of
//! the spids it actually depends on; an unset slot means the derivative is
//! zero.

mod jones;
#[cfg(test)]
mod tests;

pub use jones::JonesResult;

use serde::Serialize;

use crate::{c64, Matrix, ValueError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeqResult {
    value: Matrix,
    perturbed: Vec<Option<Matrix>>,
}

impl MeqResult {
    /// Create a result with room for `num_spids` perturbed values, all unset.
    /// The value is a real zero until it's set.
    pub fn new(num_spids: usize) -> MeqResult {
        MeqResult::from_value(Matrix::real_scalar(0.0), num_spids)
    }

    pub fn from_value(value: Matrix, num_spids: usize) -> MeqResult {
        MeqResult {
            value,
            perturbed: vec![None; num_spids],
        }
    }

    pub fn value(&self) -> &Matrix {
        &self.value
    }

    pub fn set_value(&mut self, value: Matrix) {
        self.value = value;
    }

    pub fn shape(&self) -> (usize, usize) {
        self.value.shape()
    }

    /// The number of perturbed-value slots.
    pub fn num_spids(&self) -> usize {
        self.perturbed.len()
    }

    pub fn is_perturbed(&self, spid: usize) -> bool {
        matches!(self.perturbed.get(spid), Some(Some(_)))
    }

    /// Iterate over the spids that have a perturbed value.
    pub fn active_spids(&self) -> impl Iterator<Item = usize> + '_ {
        self.perturbed
            .iter()
            .enumerate()
            .filter_map(|(spid, p)| p.as_ref().map(|_| spid))
    }

    /// Get the perturbed value for a spid. It is an error to ask for a
    /// perturbed value that was never set.
    pub fn perturbed_value(&self, spid: usize) -> Result<&Matrix, ValueError> {
        match self.perturbed.get(spid) {
            Some(Some(p)) => Ok(p),
            Some(None) => Err(ValueError::NoDerivative { spid }),
            None => Err(ValueError::SpidOutOfRange {
                spid,
                num_spids: self.num_spids(),
            }),
        }
    }

    /// Set the perturbed value for a spid. Its shape must be broadcastable to
    /// the shape of the value.
    pub fn set_perturbed_value(&mut self, spid: usize, perturbed: Matrix) -> Result<(), ValueError> {
        let num_spids = self.num_spids();
        let (vf, vt) = self.value.shape();
        let (pf, pt) = perturbed.shape();
        if (pf != vf && pf != 1) || (pt != vt && pt != 1) {
            return Err(ValueError::ShapeMismatch {
                left: (vf, vt),
                right: (pf, pt),
            });
        }
        let slot = self
            .perturbed
            .get_mut(spid)
            .ok_or(ValueError::SpidOutOfRange { spid, num_spids })?;
        *slot = Some(perturbed);
        Ok(())
    }

    fn slot(&self, spid: usize) -> Option<&Matrix> {
        self.perturbed.get(spid).and_then(Option::as_ref)
    }

    /// Build a result from two operands, calling `deriv` for every spid that
    /// at least one operand depends on.
    fn combine(
        &self,
        other: &MeqResult,
        value: Matrix,
        deriv: impl Fn(Option<&Matrix>, Option<&Matrix>) -> Result<Matrix, ValueError>,
    ) -> Result<MeqResult, ValueError> {
        let num_spids = self.num_spids().max(other.num_spids());
        let mut out = MeqResult::from_value(value, num_spids);
        for (spid, slot) in out.perturbed.iter_mut().enumerate() {
            let (da, db) = (self.slot(spid), other.slot(spid));
            if da.is_some() || db.is_some() {
                *slot = Some(deriv(da, db)?);
            }
        }
        Ok(out)
    }

    /// Build a result from one operand with the chain rule; `deriv` maps the
    /// operand's perturbed value to the output's.
    fn chain(
        &self,
        value: Matrix,
        deriv: impl Fn(&Matrix) -> Result<Matrix, ValueError>,
    ) -> Result<MeqResult, ValueError> {
        let mut out = MeqResult::from_value(value, self.num_spids());
        for (slot, p) in out.perturbed.iter_mut().zip(self.perturbed.iter()) {
            if let Some(p) = p {
                *slot = Some(deriv(p)?);
            }
        }
        Ok(out)
    }

    pub fn add(&self, other: &MeqResult) -> Result<MeqResult, ValueError> {
        let value = self.value.add(&other.value)?;
        self.combine(other, value, |da, db| match (da, db) {
            (Some(da), Some(db)) => da.add(db),
            (Some(d), None) | (None, Some(d)) => Ok(d.clone()),
            (None, None) => unreachable!(),
        })
    }

    pub fn sub(&self, other: &MeqResult) -> Result<MeqResult, ValueError> {
        let value = self.value.sub(&other.value)?;
        self.combine(other, value, |da, db| match (da, db) {
            (Some(da), Some(db)) => da.sub(db),
            (Some(da), None) => Ok(da.clone()),
            (None, Some(db)) => Ok(db.neg()),
            (None, None) => unreachable!(),
        })
    }

    /// Product rule: d(ab) = da b + a db.
    pub fn mul(&self, other: &MeqResult) -> Result<MeqResult, ValueError> {
        let (a, b) = (&self.value, &other.value);
        let value = a.mul(b)?;
        self.combine(other, value, |da, db| match (da, db) {
            (Some(da), Some(db)) => da.mul(b)?.add(&a.mul(db)?),
            (Some(da), None) => da.mul(b),
            (None, Some(db)) => a.mul(db),
            (None, None) => unreachable!(),
        })
    }

    /// Quotient rule: d(a/b) = da / b - (a/b) db / b.
    pub fn div(&self, other: &MeqResult) -> Result<MeqResult, ValueError> {
        let b = &other.value;
        let q = self.value.div(b)?;
        let value = q.clone();
        self.combine(other, value, |da, db| match (da, db) {
            (Some(da), Some(db)) => da.div(b)?.sub(&q.mul(db)?.div(b)?),
            (Some(da), None) => da.div(b),
            (None, Some(db)) => Ok(q.mul(db)?.div(b)?.neg()),
            (None, None) => unreachable!(),
        })
    }

    pub fn neg(&self) -> Result<MeqResult, ValueError> {
        self.chain(self.value.neg(), |d| Ok(d.neg()))
    }

    /// The complex conjugate. All parameters are real, so the derivatives are
    /// conjugated too.
    pub fn conj(&self) -> Result<MeqResult, ValueError> {
        self.chain(self.value.conj(), |d| Ok(d.conj()))
    }

    pub fn cos(&self) -> Result<MeqResult, ValueError> {
        let factor = self.value.sin().neg();
        self.chain(self.value.cos(), |d| factor.mul(d))
    }

    pub fn sin(&self) -> Result<MeqResult, ValueError> {
        let factor = self.value.cos();
        self.chain(self.value.sin(), |d| factor.mul(d))
    }

    pub fn exp(&self) -> Result<MeqResult, ValueError> {
        let value = self.value.exp();
        self.chain(value.clone(), |d| value.mul(d))
    }

    pub fn sqrt(&self) -> Result<MeqResult, ValueError> {
        let value = self.value.sqrt();
        let factor = value.scale(2.0);
        self.chain(value, |d| d.div(&factor))
    }

    /// Combine a real part and an imaginary part into a complex result.
    pub fn to_complex(re: &MeqResult, im: &MeqResult) -> Result<MeqResult, ValueError> {
        let value = Matrix::to_complex(&re.value, &im.value)?;
        re.combine(im, value, |dre, dim| match (dre, dim) {
            (Some(dre), Some(dim)) => Matrix::to_complex(dre, dim),
            (Some(dre), None) => Ok(dre.scale_complex(c64::new(1.0, 0.0))),
            (None, Some(dim)) => Ok(dim.scale_complex(c64::i())),
            (None, None) => unreachable!(),
        })
    }

    /// Combine an amplitude and a phase \[radians\] into a complex result:
    /// `v = amp e^{i phase}`, so `dv = e^{i phase} d(amp) + i v d(phase)`.
    pub fn polar(amp: &MeqResult, phase: &MeqResult) -> Result<MeqResult, ValueError> {
        let cis = phase.value.cis();
        let value = amp.value.mul(&cis)?;
        let i_value = value.scale_complex(c64::i());
        amp.combine(phase, value, |damp, dphase| match (damp, dphase) {
            (Some(damp), Some(dphase)) => cis.mul(damp)?.add(&i_value.mul(dphase)?),
            (Some(damp), None) => cis.mul(damp),
            (None, Some(dphase)) => i_value.mul(dphase),
            (None, None) => unreachable!(),
        })
    }

    /// `left - right`, without any perturbed values.
    pub fn compare(left: &MeqResult, right: &MeqResult) -> Result<MeqResult, ValueError> {
        let value = left.value.sub(&right.value)?;
        Ok(MeqResult::from_value(value, 0))
    }
}
