// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use marlu::Jones;
use ndarray::Array2;
use tempfile::TempDir;

use crate::*;
use lofar_bbs::VisBuffer;

#[test]
fn test_predict_then_residuals_are_zero() {
    let tmp_dir = TempDir::new().unwrap();
    let parset = make_file_in_dir("model.toml", tmp_dir.path(), PARSET);
    let predicted = tmp_dir.path().join("predicted.json");
    let residuals = tmp_dir.path().join("residuals.json");

    let cmd = bbs()
        .arg("predict")
        .arg(&parset)
        .arg("--output")
        .arg(&predicted)
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
    let vis = VisBuffer::read_json(&predicted).unwrap();
    assert_eq!(vis.num_baselines(), 3);
    for i_bl in 0..3 {
        let bl = vis.baseline(i_bl).unwrap();
        assert_eq!(bl.dim(), (3, 2));
        // Nothing here varies with time.
        assert_abs_diff_eq!(bl[(1, 0)], bl[(1, 1)], epsilon = 1e-12);
    }

    let cmd = bbs()
        .arg("predict")
        .arg(&parset)
        .arg("--vis")
        .arg(&predicted)
        .arg("--output")
        .arg(&residuals)
        .arg("--sequential")
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("Evaluated 3 residuals"), "{stdout}");
    let vis = VisBuffer::read_json(&residuals).unwrap();
    for i_bl in 0..3 {
        for j in vis.baseline(i_bl).unwrap() {
            assert_abs_diff_eq!(*j, Jones::default(), epsilon = 1e-12);
        }
    }
}

#[test]
fn test_dry_run_writes_nothing() {
    let tmp_dir = TempDir::new().unwrap();
    let parset = make_file_in_dir("model.toml", tmp_dir.path(), PARSET);
    let output = tmp_dir.path().join("predicted.json");

    let cmd = bbs()
        .arg("predict")
        .arg(&parset)
        .arg("--output")
        .arg(&output)
        .arg("--dry-run")
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("Dry run"), "{stdout}");
    assert!(!output.exists());
}

#[test]
fn test_derivatives_are_reported() {
    let tmp_dir = TempDir::new().unwrap();
    let parset = make_file_in_dir("model.toml", tmp_dir.path(), PARSET);

    let cmd = bbs().arg("predict").arg(&parset).arg("--derivatives").ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
    let (stdout, _) = get_cmd_output(cmd);
    for station in ["A", "B", "C"] {
        assert!(
            stdout.contains(&format!("d/d gain:11:ampl:{station} [coeff 0]")),
            "{stdout}"
        );
    }
    assert!(!stdout.contains("d/d gain:22"), "{stdout}");
}

#[test]
fn test_mismatched_vis_is_an_error() {
    let tmp_dir = TempDir::new().unwrap();
    let parset = make_file_in_dir("model.toml", tmp_dir.path(), PARSET);
    let vis = tmp_dir.path().join("vis.json");
    let one_baseline = VisBuffer::from_baselines(vec![Array2::from_elem((3, 2), Jones::identity())]);
    std::fs::write(&vis, serde_json::to_string(&one_baseline).unwrap()).unwrap();

    let cmd = bbs().arg("predict").arg(&parset).arg("--vis").arg(&vis).ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(
        stderr.contains("The parset has 3 baselines, but the supplied visibilities have 1"),
        "{stderr}"
    );
}
