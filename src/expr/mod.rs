// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Expression graphs.
//!
//! A graph is an arena of scalar nodes and 2x2 (Jones) nodes. A node's
//! children must already be in the graph when it is added, so graphs are
//! acyclic, and a node may be the child of any number of parents. Every node
//! remembers the result of the last request it was evaluated for (see
//! [`Request`]), so a node shared by many parents is only evaluated once per
//! request.

mod cache;
mod error;
mod eval;
mod kinds;

pub use error::{EvalError, GraphError};
pub use kinds::{Arity, ExprKind, JonesKind};

use log::debug;
use serde::{Deserialize, Serialize};
use vec1::Vec1;

use crate::{c64, JonesResult, MeqResult, ParmStore, Stokes, VisBuffer};
use cache::NodeCache;

/// The id of a scalar node in an [`ExprGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExprId(pub(crate) usize);

/// The id of a Jones node in an [`ExprGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JonesId(pub(crate) usize);

impl ExprId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl JonesId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ExprId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "expr #{}", self.0)
    }
}

impl std::fmt::Display for JonesId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "jones #{}", self.0)
    }
}

#[derive(Debug)]
struct ExprNode {
    kind: ExprKind,
    children: Vec<ExprId>,
    cache: NodeCache<MeqResult>,
}

#[derive(Debug)]
struct JonesNode {
    kind: JonesKind,
    exprs: Vec<ExprId>,
    jones: Vec<JonesId>,
    cache: NodeCache<JonesResult>,
}

#[derive(Debug, Default)]
pub struct ExprGraph {
    parms: ParmStore,
    exprs: Vec<ExprNode>,
    jones: Vec<JonesNode>,

    /// Read by [`JonesKind::VisData`] nodes.
    vis: Option<VisBuffer>,

    /// Evaluate independent nodes on the rayon thread pool?
    parallel: bool,
}

impl ExprGraph {
    /// Create an empty graph whose parameter leaves come from `parms`.
    pub fn new(parms: ParmStore) -> ExprGraph {
        ExprGraph {
            parms,
            ..Default::default()
        }
    }

    pub fn parms(&self) -> &ParmStore {
        &self.parms
    }

    /// Parameters can be changed (e.g. after a solve) but not removed, so
    /// existing parameter leaves stay valid. Changes are seen by the next
    /// request.
    pub fn parms_mut(&mut self) -> &mut ParmStore {
        &mut self.parms
    }

    pub fn set_vis_buffer(&mut self, vis: VisBuffer) {
        self.vis = Some(vis);
    }

    pub fn vis_buffer(&self) -> Option<&VisBuffer> {
        self.vis.as_ref()
    }

    pub fn set_parallel(&mut self, parallel: bool) {
        self.parallel = parallel;
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    pub fn num_exprs(&self) -> usize {
        self.exprs.len()
    }

    pub fn num_jones(&self) -> usize {
        self.jones.len()
    }

    /// # Panics
    ///
    /// Panics if `id` does not belong to this graph.
    pub fn kind(&self, id: ExprId) -> ExprKind {
        self.exprs[id.0].kind
    }

    /// # Panics
    ///
    /// Panics if `id` does not belong to this graph.
    pub fn jones_kind(&self, id: JonesId) -> JonesKind {
        self.jones[id.0].kind
    }

    /// How many times a scalar node has actually been evaluated (i.e. not
    /// counting cache hits).
    pub fn num_evaluations(&self, id: ExprId) -> usize {
        self.exprs[id.0].cache.num_evaluations()
    }

    /// How many times a Jones node has actually been evaluated.
    pub fn num_jones_evaluations(&self, id: JonesId) -> usize {
        self.jones[id.0].cache.num_evaluations()
    }

    /// Add a scalar node. The number of children must match the kind's
    /// arity, and every child (and parameter) must already exist.
    pub fn add_expr(&mut self, kind: ExprKind, children: &[ExprId]) -> Result<ExprId, GraphError> {
        check_arity(kind.into(), "scalar", kind.arity(), children.len())?;
        self.check_exprs(children)?;
        if let ExprKind::Parm(p) = kind {
            if self.parms.get(p).is_none() {
                return Err(GraphError::UnknownParm(p.to_string()));
            }
        }

        let id = ExprId(self.exprs.len());
        self.exprs.push(ExprNode {
            kind,
            children: children.to_vec(),
            cache: NodeCache::default(),
        });
        debug!("Added {id}: {kind} {children:?}");
        Ok(id)
    }

    /// Add a Jones node with scalar children `exprs` and Jones children
    /// `jones`. Both counts must match the kind's arity.
    pub fn add_jones(
        &mut self,
        kind: JonesKind,
        exprs: &[ExprId],
        jones: &[JonesId],
    ) -> Result<JonesId, GraphError> {
        let (expr_arity, jones_arity) = kind.arity();
        check_arity(kind.into(), "scalar", expr_arity, exprs.len())?;
        check_arity(kind.into(), "Jones", jones_arity, jones.len())?;
        self.check_exprs(exprs)?;
        if let Some(&bad) = jones.iter().find(|j| j.0 >= self.jones.len()) {
            return Err(GraphError::UnknownJones(bad));
        }

        let id = JonesId(self.jones.len());
        self.jones.push(JonesNode {
            kind,
            exprs: exprs.to_vec(),
            jones: jones.to_vec(),
            cache: NodeCache::default(),
        });
        debug!("Added {id}: {kind} {exprs:?} {jones:?}");
        Ok(id)
    }

    fn check_exprs(&self, exprs: &[ExprId]) -> Result<(), GraphError> {
        match exprs.iter().find(|e| e.0 >= self.exprs.len()) {
            Some(&bad) => Err(GraphError::UnknownExpr(bad)),
            None => Ok(()),
        }
    }

    // Convenience constructors. Leaves can't fail.

    pub fn constant(&mut self, value: f64) -> ExprId {
        self.push_leaf(ExprKind::Constant(value))
    }

    pub fn complex_constant(&mut self, value: c64) -> ExprId {
        self.push_leaf(ExprKind::ComplexConstant(value))
    }

    pub fn frequency(&mut self) -> ExprId {
        self.push_leaf(ExprKind::Frequency)
    }

    pub fn time(&mut self) -> ExprId {
        self.push_leaf(ExprKind::Time)
    }

    fn push_leaf(&mut self, kind: ExprKind) -> ExprId {
        let id = ExprId(self.exprs.len());
        self.exprs.push(ExprNode {
            kind,
            children: vec![],
            cache: NodeCache::default(),
        });
        id
    }

    /// A leaf for the named parameter.
    pub fn parm(&mut self, name: &str) -> Result<ExprId, GraphError> {
        let p = self
            .parms
            .id(name)
            .ok_or_else(|| GraphError::UnknownParm(name.to_string()))?;
        self.add_expr(ExprKind::Parm(p), &[])
    }

    pub fn unary(&mut self, kind: ExprKind, a: ExprId) -> Result<ExprId, GraphError> {
        self.add_expr(kind, &[a])
    }

    pub fn binary(&mut self, kind: ExprKind, a: ExprId, b: ExprId) -> Result<ExprId, GraphError> {
        self.add_expr(kind, &[a, b])
    }

    pub fn full(
        &mut self,
        xx: ExprId,
        xy: ExprId,
        yx: ExprId,
        yy: ExprId,
    ) -> Result<JonesId, GraphError> {
        self.add_jones(JonesKind::Full, &[xx, xy, yx, yy], &[])
    }

    pub fn diag(&mut self, xx: ExprId, yy: ExprId) -> Result<JonesId, GraphError> {
        self.add_jones(JonesKind::Diag, &[xx, yy], &[])
    }

    pub fn scale(&mut self, s: ExprId, j: JonesId) -> Result<JonesId, GraphError> {
        self.add_jones(JonesKind::Scale, &[s], &[j])
    }

    pub fn mul2(&mut self, a: JonesId, b: JonesId) -> Result<JonesId, GraphError> {
        self.add_jones(JonesKind::Mul2, &[], &[a, b])
    }

    pub fn mul3(&mut self, a: JonesId, m: JonesId, b: JonesId) -> Result<JonesId, GraphError> {
        self.add_jones(JonesKind::Mul3, &[], &[a, m, b])
    }

    pub fn cmul2(&mut self, a: JonesId, b: JonesId) -> Result<JonesId, GraphError> {
        self.add_jones(JonesKind::CMul2, &[], &[a, b])
    }

    pub fn invert(&mut self, a: JonesId) -> Result<JonesId, GraphError> {
        self.add_jones(JonesKind::Invert, &[], &[a])
    }

    pub fn rotation(&mut self, chi: ExprId) -> Result<JonesId, GraphError> {
        self.add_jones(JonesKind::Rotation, &[chi], &[])
    }

    pub fn point_coherence(&mut self, flux: &Stokes) -> Result<JonesId, GraphError> {
        self.add_jones(
            JonesKind::PointCoherence,
            &[flux.i, flux.q, flux.u, flux.v],
            &[],
        )
    }

    pub fn vis_data(&mut self, baseline: usize) -> Result<JonesId, GraphError> {
        self.add_jones(JonesKind::VisData(baseline), &[], &[])
    }

    pub fn sum(&mut self, terms: &Vec1<JonesId>) -> Result<JonesId, GraphError> {
        self.add_jones(JonesKind::Sum, &[], terms.as_slice())
    }

    pub fn subtract(&mut self, a: JonesId, b: JonesId) -> Result<JonesId, GraphError> {
        self.add_jones(JonesKind::Subtract, &[], &[a, b])
    }
}

fn check_arity(
    kind: &'static str,
    child_type: &'static str,
    expected: Arity,
    got: usize,
) -> Result<(), GraphError> {
    if expected.accepts(got) {
        Ok(())
    } else {
        Err(GraphError::Arity {
            kind,
            child_type,
            expected,
            got,
        })
    }
}
