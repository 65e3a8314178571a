// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all bbs-related errors. This should be the *only* error
//! enum that is publicly visible from the binary.

use thiserror::Error;

use super::predict::PredictArgsError;
use crate::{config::ConfigError, vis::VisReadError, EvalError};

/// The *only* publicly visible error from bbs.
#[derive(Error, Debug)]
pub enum BbsError {
    /// An error related to reading or building a parset.
    #[error("{0}\n\nParsets are toml, json or yaml files; see the README for their layout.")]
    Parset(String),

    /// An error from evaluating an expression graph.
    #[error("Evaluation failed: {0}")]
    Eval(String),

    /// An error related to reading or writing visibilities.
    #[error("{0}\n\nVisibilities are json files with a 'baselines' list of [freq][time][4] complex arrays.")]
    Vis(String),

    /// A generic error that can't be clarified further, e.g. IO errors.
    #[error("{0}")]
    Generic(String),
}

impl From<ConfigError> for BbsError {
    fn from(e: ConfigError) -> Self {
        let s = e.to_string();
        match e {
            ConfigError::IO(_) => Self::Generic(s),
            _ => Self::Parset(s),
        }
    }
}

impl From<EvalError> for BbsError {
    fn from(e: EvalError) -> Self {
        let s = e.to_string();
        match e {
            EvalError::NoVisData { .. }
            | EvalError::UnknownBaseline { .. }
            | EvalError::VisShape { .. } => Self::Vis(s),
            EvalError::Value(_) => Self::Eval(s),
        }
    }
}

impl From<VisReadError> for BbsError {
    fn from(e: VisReadError) -> Self {
        let s = e.to_string();
        match e {
            VisReadError::IO(_) => Self::Generic(s),
            VisReadError::NotFourPols { .. } | VisReadError::Json(_) => Self::Vis(s),
        }
    }
}

impl From<PredictArgsError> for BbsError {
    fn from(e: PredictArgsError) -> Self {
        let s = e.to_string();
        match e {
            PredictArgsError::Parset(e) => Self::from(e),
            PredictArgsError::Eval(e) => Self::from(e),
            PredictArgsError::VisRead(e) => Self::from(e),
            PredictArgsError::BaselineMismatch { .. } => Self::Vis(s),
            PredictArgsError::Json(_) => Self::Vis(s),
            PredictArgsError::IO(e) => Self::from(e),
        }
    }
}

impl From<std::io::Error> for BbsError {
    fn from(e: std::io::Error) -> Self {
        Self::Generic(e.to_string())
    }
}
