// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Parameter sets ("parsets"): a sky model, station layout and evaluation
//! domain, read from a toml, json or yaml file and turned into an expression
//! graph.
//!
//! Every source property is a parameter, named after the property and the
//! source, e.g. `ra:3C196` or `I:3C196`. A parameter given explicitly in the
//! `parms` section takes precedence, which is how e.g. a spectral polynomial
//! is given to a flux density.

#[cfg(test)]
mod tests;

use std::{
    num::NonZeroUsize,
    path::{Path, PathBuf},
    str::FromStr,
};

use itertools::Itertools;
use log::{debug, info};
use marlu::{RADec, UVW};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;

use crate::{
    predict::{Baseline, PredictBuilder, PredictError, PredictRoots},
    Domain, DomainError, EvalSession, ExprGraph, ExprId, GraphError, ParmError, ParmStore,
    Request, Source, SourceList, SourceListError, SourceShape, Stokes,
};

lazy_static::lazy_static! {
    pub static ref PARSET_TYPES_COMMA_SEPARATED: String = ParsetFileType::iter().join(", ");
}

#[derive(Debug, Display, EnumIter, EnumString)]
enum ParsetFileType {
    #[strum(serialize = "toml")]
    Toml,
    #[strum(serialize = "json")]
    Json,
    #[strum(serialize = "yaml")]
    Yaml,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Parset {
    pub domain: DomainConfig,

    /// \[degrees\]
    pub phase_centre: PhaseCentreConfig,

    /// Parameters, in addition to those made for each source.
    #[serde(default)]
    pub parms: Vec<ParmConfig>,

    /// Glob patterns of the parameters to solve for.
    #[serde(default)]
    pub solvable: Vec<String>,

    pub sources: Vec<SourceConfig>,

    pub baselines: Vec<BaselineConfig>,

    /// The names of the sources to use. If empty, all sources are used.
    #[serde(default)]
    pub selected_sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DomainConfig {
    /// Start and end frequencies \[Hz\]
    pub freq: [f64; 2],

    /// Start and end times \[s\]
    pub time: [f64; 2],

    /// The number of frequency cells to evaluate over.
    #[serde(default = "one")]
    pub num_freqs: NonZeroUsize,

    /// The number of time cells to evaluate over.
    #[serde(default = "one")]
    pub num_times: NonZeroUsize,
}

fn one() -> NonZeroUsize {
    NonZeroUsize::MIN
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhaseCentreConfig {
    pub ra: f64,
    pub dec: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParmConfig {
    pub name: String,

    /// Polynomial coefficients; each row is a frequency order, each column a
    /// time order. A single number is a constant.
    pub coeffs: Coeffs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coeffs {
    Constant(f64),
    Poly(Vec<Vec<f64>>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub name: String,

    /// \[degrees\]
    pub ra: f64,

    /// \[degrees\]
    pub dec: f64,

    /// Stokes I \[Jy\]
    pub i: f64,
    #[serde(default)]
    pub q: f64,
    #[serde(default)]
    pub u: f64,
    #[serde(default)]
    pub v: f64,

    /// If absent, the source is a point source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gaussian: Option<GaussianConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GaussianConfig {
    /// FWHM of the major axis \[arcsec\]
    pub maj: f64,

    /// FWHM of the minor axis \[arcsec\]
    pub min: f64,

    /// Position angle \[degrees\]
    pub pa: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BaselineConfig {
    pub stations: [String; 2],

    /// \[metres\]
    pub uvw: [f64; 3],
}

/// Everything made from a [`Parset`].
#[derive(Debug)]
pub struct Model {
    pub graph: ExprGraph,
    pub srclist: SourceList,
    pub baselines: Vec<Baseline>,
    pub roots: PredictRoots,
    pub domain: Domain,
    pub num_freqs: NonZeroUsize,
    pub num_times: NonZeroUsize,
}

impl Model {
    /// A new request over the parset's domain and grid.
    pub fn request(&self, session: &EvalSession, eval_derivatives: bool) -> Request {
        Request::with_grid(
            session,
            self.domain,
            self.num_freqs,
            self.num_times,
            eval_derivatives,
        )
    }
}

impl Parset {
    /// Read a parset. The format is determined by the file extension.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Parset, ConfigError> {
        let path = path.as_ref();
        debug!("Attempting to parse parset {}", path.display());
        let file_type = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| match e.to_lowercase().as_str() {
                "yml" => "yaml".to_string(),
                e => e.to_string(),
            })
            .and_then(|e| ParsetFileType::from_str(&e).ok())
            .ok_or_else(|| ConfigError::UnknownExtension(path.to_path_buf()))?;

        let contents = std::fs::read_to_string(path)?;
        let parset = match file_type {
            ParsetFileType::Toml => toml::from_str(&contents)?,
            ParsetFileType::Json => serde_json::from_str(&contents)?,
            ParsetFileType::Yaml => serde_yaml::from_str(&contents)?,
        };
        Ok(parset)
    }

    /// Build the expression graph, sky model and predictions described by
    /// this parset. If `residuals` is true, residual roots are made too (and
    /// the graph needs visibilities before they can be evaluated).
    pub fn build(&self, residuals: bool) -> Result<Model, ConfigError> {
        if self.baselines.is_empty() {
            return Err(ConfigError::NoBaselines);
        }
        let domain = Domain::new(
            self.domain.freq[0],
            self.domain.freq[1],
            self.domain.time[0],
            self.domain.time[1],
        )?;

        let mut parms = ParmStore::new();
        for parm in &self.parms {
            parms.add(&parm.name, parm.coeffs.to_array(&parm.name)?)?;
        }
        let mut graph = ExprGraph::new(parms);

        let mut srclist = SourceList::new();
        for source in &self.sources {
            let source = source_from_config(&mut graph, source)?;
            srclist.add(source)?;
        }
        srclist.set_selected_by_name(&self.selected_sources)?;

        let phase_centre = RADec::from_degrees(self.phase_centre.ra, self.phase_centre.dec);
        let baselines = self
            .baselines
            .iter()
            .map(|b| Baseline {
                station1: b.stations[0].clone(),
                station2: b.stations[1].clone(),
                uvw: UVW {
                    u: b.uvw[0],
                    v: b.uvw[1],
                    w: b.uvw[2],
                },
            })
            .collect::<Vec<_>>();
        let roots = PredictBuilder::new(phase_centre)
            .with_residuals(residuals)
            .build(&mut graph, &srclist, &baselines)?;

        // Last, so that the gain parameters made for the predictions can be
        // solvable too.
        let num_spids = graph.parms_mut().set_solvable(&self.solvable)?;

        info!(
            "Model has {} sources ({} selected), {} baselines, {} parameters ({num_spids} solvable coefficients)",
            srclist.len(),
            srclist.selected().len(),
            baselines.len(),
            graph.parms().len(),
        );

        Ok(Model {
            graph,
            srclist,
            baselines,
            roots,
            domain,
            num_freqs: self.domain.num_freqs,
            num_times: self.domain.num_times,
        })
    }
}

impl Coeffs {
    fn to_array(&self, name: &str) -> Result<Array2<f64>, ConfigError> {
        match self {
            Coeffs::Constant(c) => Ok(Array2::from_elem((1, 1), *c)),
            Coeffs::Poly(rows) => {
                let num_rows = rows.len();
                let num_cols = rows.first().map(Vec::len).unwrap_or(0);
                if rows.iter().any(|r| r.len() != num_cols) {
                    return Err(ConfigError::RaggedCoeffs(name.to_string()));
                }
                let flat = rows.iter().flatten().copied().collect();
                Array2::from_shape_vec((num_rows, num_cols), flat)
                    .map_err(|_| ConfigError::RaggedCoeffs(name.to_string()))
            }
        }
    }
}

/// Make the parameters of a source (unless they already exist) and the leaves
/// that read them.
fn source_from_config(graph: &mut ExprGraph, config: &SourceConfig) -> Result<Source, ConfigError> {
    let name = &config.name;
    let mut leaf = |property: &str, default: f64| -> Result<ExprId, GraphError> {
        let parm_name = format!("{property}:{name}");
        graph.parms_mut().get_or_add_constant(&parm_name, default);
        graph.parm(&parm_name)
    };

    let ra = leaf("ra", config.ra.to_radians())?;
    let dec = leaf("dec", config.dec.to_radians())?;
    let flux = Stokes {
        i: leaf("I", config.i)?,
        q: leaf("Q", config.q)?,
        u: leaf("U", config.u)?,
        v: leaf("V", config.v)?,
    };
    let shape = match config.gaussian {
        None => SourceShape::Point,
        Some(g) => SourceShape::Gaussian {
            major: leaf("maj", (g.maj / 3600.0).to_radians())?,
            minor: leaf("min", (g.min / 3600.0).to_radians())?,
            position_angle: leaf("pa", g.pa.to_radians())?,
        },
    };
    Ok(Source {
        name: name.clone(),
        ra,
        dec,
        flux,
        shape,
    })
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Parset '{}' doesn't have a recognised file extension! Valid extensions are: {}, yml", .0.display(), *PARSET_TYPES_COMMA_SEPARATED)]
    UnknownExtension(PathBuf),

    #[error("The coefficients of parameter '{0}' aren't a rectangular grid")]
    RaggedCoeffs(String),

    #[error("The parset has no baselines")]
    NoBaselines,

    #[error("Couldn't decode toml structure: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Couldn't decode json structure: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Couldn't decode yaml structure: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Parm(#[from] ParmError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    SourceList(#[from] SourceListError),

    #[error(transparent)]
    Predict(#[from] PredictError),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
