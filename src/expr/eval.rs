// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Evaluating graphs over requests.

use std::sync::Arc;

use log::debug;
use ndarray::prelude::*;
use rayon::prelude::*;

use super::{EvalError, ExprGraph, ExprId, ExprKind, JonesId, JonesKind};
use crate::{JonesResult, Matrix, MeqResult, Request};

impl ExprGraph {
    /// Get the result of a scalar node for a request. Repeated calls with the
    /// same request return the same result without evaluating again.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this graph.
    pub fn get_result(&self, id: ExprId, request: &Request) -> Result<Arc<MeqResult>, EvalError> {
        if self.parallel {
            self.evaluate_levels(&self.expr_levels([id]), &[], request)?;
        }
        self.expr_result(id, request)
    }

    /// Get the result of a Jones node for a request. Repeated calls with the
    /// same request return the same result without evaluating again.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this graph.
    pub fn get_jresult(
        &self,
        id: JonesId,
        request: &Request,
    ) -> Result<Arc<JonesResult>, EvalError> {
        Ok(self.get_jresults(&[id], request)?.remove(0))
    }

    /// Get the results of many Jones nodes for a request. Nodes shared
    /// between the roots are only evaluated once.
    pub fn get_jresults(
        &self,
        ids: &[JonesId],
        request: &Request,
    ) -> Result<Vec<Arc<JonesResult>>, EvalError> {
        if self.parallel {
            let jones_levels = self.jones_levels(ids);
            let expr_roots = jones_levels
                .iter()
                .flatten()
                .flat_map(|&j| self.jones[j.0].exprs.iter().copied());
            let expr_levels = self.expr_levels(expr_roots);
            self.evaluate_levels(&expr_levels, &jones_levels, request)?;
        }
        ids.iter()
            .map(|&id| self.jones_result(id, request))
            .collect()
    }

    /// Evaluate nodes one level at a time, in parallel within a level. Every
    /// node's children are in an earlier level, so by the time a node is
    /// evaluated its children are already cached. No cache slot is held
    /// while waiting on another thread.
    fn evaluate_levels(
        &self,
        expr_levels: &[Vec<ExprId>],
        jones_levels: &[Vec<JonesId>],
        request: &Request,
    ) -> Result<(), EvalError> {
        debug!(
            "Evaluating {} scalar and {} Jones nodes in parallel for request {}",
            expr_levels.iter().map(Vec::len).sum::<usize>(),
            jones_levels.iter().map(Vec::len).sum::<usize>(),
            request.id()
        );
        for level in expr_levels {
            level
                .par_iter()
                .try_for_each(|&id| self.expr_result(id, request).map(|_| ()))?;
        }
        for level in jones_levels {
            level
                .par_iter()
                .try_for_each(|&id| self.jones_result(id, request).map(|_| ()))?;
        }
        Ok(())
    }

    fn expr_levels(&self, roots: impl IntoIterator<Item = ExprId>) -> Vec<Vec<ExprId>> {
        let mut reachable = vec![false; self.exprs.len()];
        let mut stack = roots.into_iter().collect::<Vec<_>>();
        while let Some(id) = stack.pop() {
            if !std::mem::replace(&mut reachable[id.0], true) {
                stack.extend(&self.exprs[id.0].children);
            }
        }
        group_by_depth(&reachable, |i| {
            self.exprs[i].children.iter().map(|c| c.0).collect()
        })
        .into_iter()
        .map(|level| level.into_iter().map(ExprId).collect())
        .collect()
    }

    fn jones_levels(&self, roots: &[JonesId]) -> Vec<Vec<JonesId>> {
        let mut reachable = vec![false; self.jones.len()];
        let mut stack = roots.to_vec();
        while let Some(id) = stack.pop() {
            if !std::mem::replace(&mut reachable[id.0], true) {
                stack.extend(&self.jones[id.0].jones);
            }
        }
        group_by_depth(&reachable, |i| {
            self.jones[i].jones.iter().map(|c| c.0).collect()
        })
        .into_iter()
        .map(|level| level.into_iter().map(JonesId).collect())
        .collect()
    }

    fn expr_result(&self, id: ExprId, request: &Request) -> Result<Arc<MeqResult>, EvalError> {
        let node = &self.exprs[id.0];
        node.cache
            .get_or_evaluate(id, request, || self.evaluate_expr(id, request))
    }

    fn jones_result(&self, id: JonesId, request: &Request) -> Result<Arc<JonesResult>, EvalError> {
        let node = &self.jones[id.0];
        node.cache
            .get_or_evaluate(id, request, || self.evaluate_jones(id, request))
    }

    fn evaluate_expr(&self, id: ExprId, request: &Request) -> Result<MeqResult, EvalError> {
        let node = &self.exprs[id.0];
        let num_spids = self.parms.num_spids();
        let child = |i: usize| self.expr_result(node.children[i], request);

        use ExprKind::*;
        let result = match node.kind {
            Constant(x) => MeqResult::from_value(Matrix::real_scalar(x), num_spids),
            ComplexConstant(z) => MeqResult::from_value(Matrix::complex_scalar(z), num_spids),
            Parm(p) => self.parms[p].evaluate(request, num_spids)?,
            Frequency => {
                let domain = request.domain();
                let freqs = domain.freq_centres(request.num_freqs());
                MeqResult::from_value(Matrix::Real(freqs.insert_axis(Axis(1))), num_spids)
            }
            Time => {
                let domain = request.domain();
                let times = domain.time_centres(request.num_times());
                MeqResult::from_value(Matrix::Real(times.insert_axis(Axis(0))), num_spids)
            }
            Add => child(0)?.add(&*child(1)?)?,
            Subtract => child(0)?.sub(&*child(1)?)?,
            Multiply => child(0)?.mul(&*child(1)?)?,
            Divide => child(0)?.div(&*child(1)?)?,
            Negate => child(0)?.neg()?,
            Cos => child(0)?.cos()?,
            Sin => child(0)?.sin()?,
            Exp => child(0)?.exp()?,
            Sqrt => child(0)?.sqrt()?,
            ToComplex => MeqResult::to_complex(&*child(0)?, &*child(1)?)?,
            AmpPhaseToComplex => MeqResult::polar(&*child(0)?, &*child(1)?)?,
            Conjugate => child(0)?.conj()?,
            Compare => {
                let diff = MeqResult::compare(&*child(0)?, &*child(1)?)?;
                debug!(
                    "{id}: max |{} - {}| = {:e}",
                    node.children[0],
                    node.children[1],
                    diff.value().max_abs()
                );
                diff
            }
        };
        Ok(result)
    }

    fn evaluate_jones(&self, id: JonesId, request: &Request) -> Result<JonesResult, EvalError> {
        let node = &self.jones[id.0];
        let e = |i: usize| self.expr_result(node.exprs[i], request);
        let j = |i: usize| self.jones_result(node.jones[i], request);

        use JonesKind::*;
        let result = match node.kind {
            Full => JonesResult::new(
                (*e(0)?).clone(),
                (*e(1)?).clone(),
                (*e(2)?).clone(),
                (*e(3)?).clone(),
            ),
            Diag => JonesResult::diagonal((*e(0)?).clone(), (*e(1)?).clone()),
            Scale => j(0)?.scale(&*e(0)?)?,
            Mul2 => j(0)?.mul(&*j(1)?)?,
            Mul3 => j(0)?.mul(&*j(1)?)?.mul_hermitian(&*j(2)?)?,
            CMul2 => j(0)?.mul_hermitian(&*j(1)?)?,
            Invert => j(0)?.inv()?,
            Rotation => {
                let chi = e(0)?;
                let (cos, sin) = (chi.cos()?, chi.sin()?);
                JonesResult::new(cos.clone(), sin.neg()?, sin, cos)
            }
            PointCoherence => JonesResult::from_stokes(&*e(0)?, &*e(1)?, &*e(2)?, &*e(3)?)?,
            VisData(baseline) => self.read_vis(id, baseline, request)?,
            Sum => {
                let mut sum = JonesResult::zeros(self.parms.num_spids());
                for &term in &node.jones {
                    sum = sum.add(&*self.jones_result(term, request)?)?;
                }
                sum
            }
            Subtract => j(0)?.sub(&*j(1)?)?,
        };
        Ok(result)
    }

    fn read_vis(
        &self,
        id: JonesId,
        baseline: usize,
        request: &Request,
    ) -> Result<JonesResult, EvalError> {
        let vis = self
            .vis
            .as_ref()
            .ok_or(EvalError::NoVisData { node: id, baseline })?;
        let data = vis
            .baseline(baseline)
            .ok_or(EvalError::UnknownBaseline {
                node: id,
                baseline,
                num_baselines: vis.num_baselines(),
            })?;
        if data.dim() != request.grid_shape() {
            return Err(EvalError::VisShape {
                baseline,
                expected: request.grid_shape(),
                got: data.dim(),
            });
        }

        let num_spids = self.parms.num_spids();
        let element = |k: usize| {
            MeqResult::from_value(Matrix::Complex(data.map(|j| j[k])), num_spids)
        };
        Ok(JonesResult::new(element(0), element(1), element(2), element(3)))
    }
}

/// Group the reachable nodes of an arena by their depth above the leaves.
/// Children always have smaller indices than their parents, so one pass in
/// index order sees every child before its parent.
fn group_by_depth(reachable: &[bool], children: impl Fn(usize) -> Vec<usize>) -> Vec<Vec<usize>> {
    let mut depths = vec![0; reachable.len()];
    let mut levels: Vec<Vec<usize>> = vec![];
    for i in (0..reachable.len()).filter(|&i| reachable[i]) {
        let depth = children(i)
            .into_iter()
            .map(|c| depths[c] + 1)
            .max()
            .unwrap_or(0);
        depths[i] = depth;
        if levels.len() <= depth {
            levels.resize_with(depth + 1, Vec::new);
        }
        levels[depth].push(i);
    }
    levels
}
