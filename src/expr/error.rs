// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors from building and evaluating expression graphs.

use thiserror::Error;

use super::{Arity, ExprId, JonesId};
use crate::ValueError;

/// Errors raised while adding nodes to a graph. These are never raised during
/// evaluation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("A {kind} node takes {expected} {child_type} children, but was given {got}")]
    Arity {
        kind: &'static str,
        child_type: &'static str,
        expected: Arity,
        got: usize,
    },

    #[error("{0} does not exist in this graph")]
    UnknownExpr(ExprId),

    #[error("{0} does not exist in this graph")]
    UnknownJones(JonesId),

    #[error("No parameter named '{0}' exists")]
    UnknownParm(String),
}

/// Errors raised while evaluating a graph. Any error aborts the whole
/// evaluation; nothing is cached for a node that failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error(transparent)]
    Value(#[from] ValueError),

    #[error("{node} reads the visibilities of baseline {baseline}, but no visibilities have been supplied")]
    NoVisData { node: JonesId, baseline: usize },

    #[error("{node} reads the visibilities of baseline {baseline}, but only {num_baselines} baselines were supplied")]
    UnknownBaseline {
        node: JonesId,
        baseline: usize,
        num_baselines: usize,
    },

    #[error("The visibilities of baseline {baseline} have shape {got:?}, but the request grid is {expected:?}")]
    VisShape {
        baseline: usize,
        expected: (usize, usize),
        got: (usize, usize),
    },
}
