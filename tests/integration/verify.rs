// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use tempfile::TempDir;

use crate::*;

#[test]
fn test_verify_good_parset() {
    let tmp_dir = TempDir::new().unwrap();
    let parset = make_file_in_dir("model.toml", tmp_dir.path(), PARSET);

    let cmd = bbs().arg("verify").arg(&parset).ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
    let (stdout, _) = get_cmd_output(cmd);
    assert!(
        stdout.contains("2 sources (1 points, 1 gaussians), 2 selected"),
        "{stdout}"
    );
    assert!(stdout.contains("3 baselines"), "{stdout}");
    // Three stations with four gain parameters each, plus four Stokes
    // parameters and a position for each source, plus the Gaussian's shape.
    assert!(stdout.contains("27 parameters, 3 solvable"), "{stdout}");
}

#[test]
fn test_verify_reports_every_bad_parset() {
    let tmp_dir = TempDir::new().unwrap();
    let good = make_file_in_dir("good.toml", tmp_dir.path(), PARSET);
    let bad_extension = make_file_in_dir("model.txt", tmp_dir.path(), PARSET);
    let no_baselines = make_file_in_dir(
        "no_baselines.json",
        tmp_dir.path(),
        r#"{
            "domain": { "freq": [1.0, 2.0], "time": [0.0, 1.0] },
            "phase_centre": { "ra": 0.0, "dec": 0.0 },
            "sources": [],
            "baselines": []
        }"#,
    );

    let cmd = bbs()
        .arg("verify")
        .arg(&bad_extension)
        .arg(&good)
        .arg(&no_baselines)
        .ok();
    assert!(cmd.is_err());
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(
        stdout.contains("doesn't have a recognised file extension"),
        "{stdout}"
    );
    assert!(stdout.contains("3 baselines"), "{stdout}");
    assert!(stderr.contains("The parset has no baselines"), "{stderr}");
}
