// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Expression-tree evaluation for radio-interferometric self-calibration.

A calibration model is a directed acyclic graph of scalar and 2x2 Jones-matrix
expressions. Each node is evaluated over a time-frequency [`Domain`] for a
[`Request`], memoising its [`MeqResult`] (value plus per-parameter derivatives)
by request id so that shared sub-expressions are evaluated only once per pass.
 */

pub mod config;
pub mod constants;
pub mod domain;
pub mod expr;
pub mod parms;
pub mod predict;
pub mod request;
pub mod result;
pub mod srclist;
pub mod value;
pub mod vis;

mod cli;

#[allow(non_camel_case_types)]
pub type c64 = num_complex::Complex<f64>;

// Re-exports.
pub use cli::{Bbs, BbsError};
pub use domain::{Domain, DomainError};
pub use expr::{EvalError, ExprGraph, ExprId, ExprKind, GraphError, JonesId, JonesKind};
pub use parms::{Parm, ParmError, ParmId, ParmStore};
pub use request::{EvalSession, Request};
pub use result::{JonesResult, MeqResult};
pub use srclist::{Source, SourceList, SourceListError, SourceShape, Stokes};
pub use value::{Matrix, ValueError};
pub use vis::VisBuffer;

pub use marlu::Jones;
