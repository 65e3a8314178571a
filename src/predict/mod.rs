// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Build graphs that predict visibilities from a sky model.
//!
//! For a baseline between stations `p` and `q`, the predicted visibility is
//!
//! ```text
//! V_pq = sum_s K_s G_p C_s G_q^H
//! ```
//!
//! over the selected sources `s`, where `C_s` is the source's coherency
//! matrix, `G_p` is station `p`'s (diagonal) gain and `K_s` is the scalar
//! term `envelope * exp(2 pi i f/c (u l + v m + w (n - 1)))`.
//!
//! Sub-expressions that don't depend on the baseline (a source's direction
//! cosines and coherency, a station's gain) are built once, so evaluating all
//! baselines for a request evaluates them once.


use std::collections::HashMap;
use std::f64::consts::TAU;

use log::debug;
use marlu::{RADec, UVW};
use thiserror::Error;
use vec1::Vec1;

use crate::{
    constants::{GAIN_PARM_PREFIX, GAUSSIAN_EXP_CONST, VEL_C},
    ExprGraph, ExprId, ExprKind, GraphError, JonesId, Source, SourceList, SourceShape,
};

/// A pair of stations and their separation.
#[derive(Debug, Clone, PartialEq)]
pub struct Baseline {
    pub station1: String,
    pub station2: String,

    /// \[metres\]
    pub uvw: UVW,
}

/// The roots made by [`PredictBuilder::build`], one per baseline, in the
/// order the baselines were given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictRoots {
    pub predicted: Vec<JonesId>,

    /// `observed - predicted`; empty unless residuals were asked for.
    pub residuals: Vec<JonesId>,
}

/// The names of a station's gain parameters, in the order `[11 amplitude,
/// 11 phase, 22 amplitude, 22 phase]`.
pub fn gain_parm_names(station: &str) -> [String; 4] {
    ["11:ampl", "11:phase", "22:ampl", "22:phase"]
        .map(|suffix| format!("{GAIN_PARM_PREFIX}:{suffix}:{station}"))
}

#[derive(Debug, Clone)]
pub struct PredictBuilder {
    phase_centre: RADec,
    residuals: bool,
}

impl PredictBuilder {
    pub fn new(phase_centre: RADec) -> PredictBuilder {
        PredictBuilder {
            phase_centre,
            residuals: false,
        }
    }

    /// Also build `VisData(b) - predicted(b)` for each baseline `b`. The
    /// visibilities of baseline `b` are the `b`th baseline of the graph's
    /// [`crate::VisBuffer`].
    pub fn with_residuals(mut self, residuals: bool) -> PredictBuilder {
        self.residuals = residuals;
        self
    }

    /// Add the prediction for each baseline to `graph`. Gain parameters that
    /// aren't already in the graph's parameter store are added with unit
    /// amplitude and zero phase; they won't be solvable until
    /// [`crate::ParmStore::set_solvable`] is called again.
    pub fn build(
        &self,
        graph: &mut ExprGraph,
        srclist: &SourceList,
        baselines: &[Baseline],
    ) -> Result<PredictRoots, PredictError> {
        if srclist.selected().is_empty() {
            return Err(PredictError::NoSelectedSources);
        }

        let mut builder = Builder::new(graph, self.phase_centre)?;

        // Per-source nodes, shared between baselines. A source may be
        // selected more than once; each selection is a term of the sum.
        let mut per_source: HashMap<&str, SourceNodes> = HashMap::new();
        let mut terms = Vec::with_capacity(srclist.selected().len());
        for source in srclist.selected_sources() {
            let nodes = match per_source.get(source.name.as_str()) {
                Some(&nodes) => nodes,
                None => {
                    let nodes = builder.source_nodes(source)?;
                    per_source.insert(&source.name, nodes);
                    nodes
                }
            };
            terms.push(nodes);
        }

        let mut roots = PredictRoots {
            predicted: Vec::with_capacity(baselines.len()),
            residuals: vec![],
        };
        for (i_bl, baseline) in baselines.iter().enumerate() {
            let g1 = builder.gain(&baseline.station1)?;
            let g2 = builder.gain(&baseline.station2)?;
            let uvw = builder.uvw(baseline.uvw);
            let mut source_terms = Vec::with_capacity(terms.len());
            for nodes in &terms {
                let k = builder.rime_term(nodes, uvw)?;
                let corrupted = builder.graph.mul3(g1, nodes.coherence, g2)?;
                source_terms.push(builder.graph.scale(k, corrupted)?);
            }
            // There is at least one selected source.
            let source_terms =
                Vec1::try_from_vec(source_terms).map_err(|_| PredictError::NoSelectedSources)?;
            let predicted = builder.graph.sum(&source_terms)?;
            roots.predicted.push(predicted);

            if self.residuals {
                let observed = builder.graph.vis_data(i_bl)?;
                roots
                    .residuals
                    .push(builder.graph.subtract(observed, predicted)?);
            }
        }

        debug!(
            "Built predictions for {} baselines and {} source terms; the graph has {} scalar and {} Jones nodes",
            baselines.len(),
            terms.len(),
            builder.graph.num_exprs(),
            builder.graph.num_jones()
        );
        Ok(roots)
    }
}

#[derive(Debug, Clone, Copy)]
struct SourceNodes {
    l: ExprId,
    m: ExprId,
    n_minus_one: ExprId,
    gaussian: Option<GaussianNodes>,
    coherence: JonesId,
}

#[derive(Debug, Clone, Copy)]
struct GaussianNodes {
    major: ExprId,
    minor: ExprId,
    sin_pa: ExprId,
    cos_pa: ExprId,
}

#[derive(Debug, Clone, Copy)]
struct UvwNodes {
    u: ExprId,
    v: ExprId,
    w: ExprId,
}

struct Builder<'a> {
    graph: &'a mut ExprGraph,
    one: ExprId,

    /// The phase centre's RA, sin(dec) and cos(dec).
    ra0: ExprId,
    sin_dec0: ExprId,
    cos_dec0: ExprId,

    /// `2 pi f / c` \[radians/metre\]
    phase_per_metre: ExprId,

    /// `f / c` \[wavelengths/metre\]
    wavelengths_per_metre: ExprId,

    gains: HashMap<String, JonesId>,
}

impl<'a> Builder<'a> {
    fn new(graph: &'a mut ExprGraph, phase_centre: RADec) -> Result<Builder<'a>, GraphError> {
        let one = graph.constant(1.0);
        let freq = graph.frequency();
        let per_c = graph.constant(1.0 / VEL_C);
        let two_pi_per_c = graph.constant(TAU / VEL_C);
        let (sin_dec0, cos_dec0) = phase_centre.dec.sin_cos();
        let ra0 = graph.constant(phase_centre.ra);
        let sin_dec0 = graph.constant(sin_dec0);
        let cos_dec0 = graph.constant(cos_dec0);
        let wavelengths_per_metre = graph.binary(ExprKind::Multiply, freq, per_c)?;
        let phase_per_metre = graph.binary(ExprKind::Multiply, freq, two_pi_per_c)?;
        Ok(Builder {
            graph,
            one,
            ra0,
            sin_dec0,
            cos_dec0,
            phase_per_metre,
            wavelengths_per_metre,
            gains: HashMap::new(),
        })
    }

    fn mul(&mut self, a: ExprId, b: ExprId) -> Result<ExprId, GraphError> {
        self.graph.binary(ExprKind::Multiply, a, b)
    }

    fn add(&mut self, a: ExprId, b: ExprId) -> Result<ExprId, GraphError> {
        self.graph.binary(ExprKind::Add, a, b)
    }

    fn sub(&mut self, a: ExprId, b: ExprId) -> Result<ExprId, GraphError> {
        self.graph.binary(ExprKind::Subtract, a, b)
    }

    /// Direction cosines relative to the phase centre, the source's coherency
    /// and its Gaussian parameters.
    fn source_nodes(&mut self, source: &Source) -> Result<SourceNodes, GraphError> {
        let d_ra = self.sub(source.ra, self.ra0)?;
        let sin_d_ra = self.graph.unary(ExprKind::Sin, d_ra)?;
        let cos_d_ra = self.graph.unary(ExprKind::Cos, d_ra)?;
        let sin_dec = self.graph.unary(ExprKind::Sin, source.dec)?;
        let cos_dec = self.graph.unary(ExprKind::Cos, source.dec)?;

        // l = cos(dec) sin(ra - ra0)
        let l = self.mul(cos_dec, sin_d_ra)?;
        // m = sin(dec) cos(dec0) - cos(dec) sin(dec0) cos(ra - ra0)
        let m1 = self.mul(sin_dec, self.cos_dec0)?;
        let m2 = self.mul(cos_dec, self.sin_dec0)?;
        let m2 = self.mul(m2, cos_d_ra)?;
        let m = self.sub(m1, m2)?;
        // n - 1 = sqrt(1 - l^2 - m^2) - 1
        let l2 = self.mul(l, l)?;
        let m2 = self.mul(m, m)?;
        let n2 = self.sub(self.one, l2)?;
        let n2 = self.sub(n2, m2)?;
        let n = self.graph.unary(ExprKind::Sqrt, n2)?;
        let n_minus_one = self.sub(n, self.one)?;

        let gaussian = match source.shape {
            SourceShape::Point => None,
            SourceShape::Gaussian {
                major,
                minor,
                position_angle,
            } => Some(GaussianNodes {
                major,
                minor,
                sin_pa: self.graph.unary(ExprKind::Sin, position_angle)?,
                cos_pa: self.graph.unary(ExprKind::Cos, position_angle)?,
            }),
        };

        Ok(SourceNodes {
            l,
            m,
            n_minus_one,
            gaussian,
            coherence: self.graph.point_coherence(&source.flux)?,
        })
    }

    fn uvw(&mut self, uvw: UVW) -> UvwNodes {
        UvwNodes {
            u: self.graph.constant(uvw.u),
            v: self.graph.constant(uvw.v),
            w: self.graph.constant(uvw.w),
        }
    }

    /// `Diag(ampl_11 e^{i phase_11}, ampl_22 e^{i phase_22})`, made once per
    /// station.
    fn gain(&mut self, station: &str) -> Result<JonesId, GraphError> {
        if let Some(&g) = self.gains.get(station) {
            return Ok(g);
        }

        let [a11, p11, a22, p22] = gain_parm_names(station).map(|name| {
            let default = if name.contains(":ampl:") { 1.0 } else { 0.0 };
            self.graph.parms_mut().get_or_add_constant(&name, default)
        });
        let mut polar = |ampl, phase| -> Result<ExprId, GraphError> {
            let ampl = self.graph.add_expr(ExprKind::Parm(ampl), &[])?;
            let phase = self.graph.add_expr(ExprKind::Parm(phase), &[])?;
            self.graph.binary(ExprKind::AmpPhaseToComplex, ampl, phase)
        };
        let g11 = polar(a11, p11)?;
        let g22 = polar(a22, p22)?;
        let g = self.graph.diag(g11, g22)?;
        self.gains.insert(station.to_string(), g);
        Ok(g)
    }

    /// The scalar factor of one source on one baseline.
    fn rime_term(&mut self, source: &SourceNodes, uvw: UvwNodes) -> Result<ExprId, GraphError> {
        let ul = self.mul(uvw.u, source.l)?;
        let vm = self.mul(uvw.v, source.m)?;
        let wn = self.mul(uvw.w, source.n_minus_one)?;
        let path = self.add(ul, vm)?;
        let path = self.add(path, wn)?;
        let phase = self.mul(self.phase_per_metre, path)?;

        let envelope = match source.gaussian {
            None => self.one,
            Some(g) => {
                // k_x = (u sin(pa) + v cos(pa)) f/c, k_y = (u cos(pa) - v sin(pa)) f/c
                let us = self.mul(uvw.u, g.sin_pa)?;
                let vc = self.mul(uvw.v, g.cos_pa)?;
                let uc = self.mul(uvw.u, g.cos_pa)?;
                let vs = self.mul(uvw.v, g.sin_pa)?;
                let k_x = self.add(us, vc)?;
                let k_x = self.mul(k_x, self.wavelengths_per_metre)?;
                let k_y = self.sub(uc, vs)?;
                let k_y = self.mul(k_y, self.wavelengths_per_metre)?;

                let a = self.mul(g.major, k_x)?;
                let a2 = self.mul(a, a)?;
                let b = self.mul(g.minor, k_y)?;
                let b2 = self.mul(b, b)?;
                let sum = self.add(a2, b2)?;
                let exp_const = self.graph.constant(GAUSSIAN_EXP_CONST);
                let exponent = self.mul(exp_const, sum)?;
                self.graph.unary(ExprKind::Exp, exponent)?
            }
        };

        self.graph
            .binary(ExprKind::AmpPhaseToComplex, envelope, phase)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictError {
    #[error("No sources are selected, so there is nothing to predict")]
    NoSelectedSources,

    #[error(transparent)]
    Graph(#[from] GraphError),
}
