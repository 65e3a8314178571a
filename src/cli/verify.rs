// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to verify parsets.

use std::path::{Path, PathBuf};

use clap::Parser;
use log::info;

use crate::{
    config::{ConfigError, Parset},
    srclist::ComponentCounts,
    BbsError,
};

/// Verify that parsets can be read and built into expression graphs.
#[derive(Parser, Debug)]
pub struct VerifyArgs {
    /// Path to the parset(s) to be verified.
    #[clap(name = "PARSETS", parse(from_os_str))]
    parsets: Vec<PathBuf>,
}

impl VerifyArgs {
    /// Run [verify] with these arguments.
    pub fn run(&self) -> Result<(), BbsError> {
        verify(&self.parsets)
    }
}

/// Read, build and print stats out for each input parset. If a parset
/// couldn't be read, print the error, and continue trying to read the other
/// parsets. An error is returned at the end if any parset was bad.
fn verify<P: AsRef<Path>>(parsets: &[P]) -> Result<(), BbsError> {
    if parsets.is_empty() {
        info!("No parsets were supplied!");
        return Ok(());
    }

    let mut last_error = None;
    for parset in parsets {
        let parset = parset.as_ref();
        info!("{}:", parset.display());
        match verify_one(parset) {
            Ok(()) => info!(""),
            Err(e) => {
                info!("{}", e);
                info!("");
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) => Err(BbsError::from(e)),
        None => Ok(()),
    }
}

fn verify_one(path: &Path) -> Result<(), ConfigError> {
    let model = Parset::read(path)?.build(false)?;
    let ComponentCounts {
        num_points,
        num_gaussians,
    } = model.srclist.counts();
    let parms = model.graph.parms();
    let num_solvable = parms.iter().filter(|p| p.is_solvable()).count();
    info!(
        "    {} sources ({num_points} points, {num_gaussians} gaussians), {} selected",
        model.srclist.len(),
        model.srclist.selected().len()
    );
    info!("    {} baselines", model.baselines.len());
    info!(
        "    {} parameters, {num_solvable} solvable ({} solvable coefficients)",
        parms.len(),
        parms.num_spids()
    );
    info!(
        "    {} scalar and {} Jones nodes",
        model.graph.num_exprs(),
        model.graph.num_jones()
    );
    Ok(())
}
