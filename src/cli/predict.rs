// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Predict the visibilities (or residuals) of a parset's sky model.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
    time::Instant,
};

use clap::Parser;
use log::{debug, info};
use ndarray::Array2;
use thiserror::Error;

use crate::{
    config::{ConfigError, Model, Parset},
    srclist::ComponentCounts,
    vis::VisReadError,
    BbsError, EvalError, EvalSession, JonesResult, VisBuffer,
};

#[derive(Parser, Debug)]
pub struct PredictArgs {
    /// Path to the parset describing the sky model, stations and domain.
    #[clap(name = "PARSET", parse(from_os_str))]
    parset: PathBuf,

    /// Observed visibilities (json), one entry per parset baseline. If given,
    /// residuals (observed minus predicted) are computed instead of
    /// predictions.
    #[clap(long, parse(from_os_str))]
    vis: Option<PathBuf>,

    /// Write the predicted (or residual) visibilities to this json file.
    #[clap(short, long, parse(from_os_str))]
    output: Option<PathBuf>,

    /// Also evaluate derivatives with respect to the solvable parameters and
    /// report their magnitudes.
    #[clap(long)]
    derivatives: bool,

    /// Evaluate one node at a time, rather than independent nodes in
    /// parallel.
    #[clap(long)]
    sequential: bool,
}

impl PredictArgs {
    pub fn run(&self, dry_run: bool) -> Result<(), BbsError> {
        predict(self, dry_run)?;
        Ok(())
    }
}

fn predict(args: &PredictArgs, dry_run: bool) -> Result<(), PredictArgsError> {
    let parset = Parset::read(&args.parset)?;
    let residuals = args.vis.is_some();
    let mut model = parset.build(residuals)?;
    if let Some(vis) = &args.vis {
        let vis = VisBuffer::read_json(vis)?;
        if vis.num_baselines() != model.baselines.len() {
            return Err(PredictArgsError::BaselineMismatch {
                parset: model.baselines.len(),
                vis: vis.num_baselines(),
            });
        }
        model.graph.set_vis_buffer(vis);
    }
    model.graph.set_parallel(!args.sequential);

    let ComponentCounts {
        num_points,
        num_gaussians,
    } = model.srclist.counts();
    info!("Parset {}:", args.parset.display());
    info!(
        "    {} sources ({num_points} points, {num_gaussians} gaussians), {} selected",
        model.srclist.len(),
        model.srclist.selected().len()
    );
    info!(
        "    {} baselines over {} ({} x {} cells)",
        model.baselines.len(),
        model.domain,
        model.num_freqs,
        model.num_times
    );
    info!(
        "    Graph: {} scalar and {} Jones nodes; evaluating {}",
        model.graph.num_exprs(),
        model.graph.num_jones(),
        if args.sequential {
            "sequentially"
        } else {
            "in parallel"
        }
    );

    if dry_run {
        info!("Dry run -- exiting now.");
        return Ok(());
    }

    let roots = if residuals {
        &model.roots.residuals
    } else {
        &model.roots.predicted
    };
    let session = EvalSession::new();
    let request = model.request(&session, args.derivatives);
    let start = Instant::now();
    let results = model.graph.get_jresults(roots, &request)?;
    info!(
        "Evaluated {} {} in {:.3?}",
        results.len(),
        if residuals { "residuals" } else { "predictions" },
        start.elapsed()
    );

    for (baseline, result) in model.baselines.iter().zip(results.iter()) {
        let j = result.jones_at(0, 0);
        debug!(
            "{}-{}: first cell XX {:.6}, XY {:.6}, YX {:.6}, YY {:.6}",
            baseline.station1, baseline.station2, j[0], j[1], j[2], j[3]
        );
    }

    if args.derivatives {
        report_derivatives(&model, &results);
    }

    if let Some(output) = &args.output {
        let grid = request.grid_shape();
        let vis = VisBuffer::from_baselines(
            results
                .iter()
                .map(|r| Array2::from_shape_fn(grid, |(f, t)| r.jones_at(f, t)))
                .collect(),
        );
        let mut f = BufWriter::new(File::create(output)?);
        serde_json::to_writer(&mut f, &vis)?;
        f.flush()?;
        info!("Wrote {}", output.display());
    }

    Ok(())
}

/// Log the largest derivative magnitude of any result with respect to each
/// solvable parameter coefficient.
fn report_derivatives<R: AsRef<JonesResult>>(model: &Model, results: &[R]) {
    let parms = model.graph.parms();
    if parms.num_spids() == 0 {
        info!("No parameters are solvable; there are no derivatives to report");
        return;
    }
    for parm in parms.iter() {
        let spids = match parm.spids() {
            Some(s) => s,
            None => continue,
        };
        for spid in spids.clone() {
            let max = results
                .iter()
                .flat_map(|r| r.as_ref().elements())
                .filter_map(|e| e.perturbed_value(spid).ok())
                .map(|m| m.max_abs())
                .fold(0.0, f64::max);
            info!(
                "    d/d {} [coeff {}]: max |dV| = {max:.6e}",
                parm.name(),
                spid - spids.start
            );
        }
    }
}

#[derive(Error, Debug)]
pub(super) enum PredictArgsError {
    #[error("The parset has {parset} baselines, but the supplied visibilities have {vis}")]
    BaselineMismatch { parset: usize, vis: usize },

    #[error(transparent)]
    Parset(#[from] ConfigError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    VisRead(#[from] VisReadError),

    #[error("Couldn't write visibilities: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
