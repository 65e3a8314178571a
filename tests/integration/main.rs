// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Integration tests.
//!
//! Some help for laying out these tests was taken from:
//! https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod predict;
mod verify;

use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
    process::Output,
    str::from_utf8,
};

use assert_cmd::{output::OutputError, Command};
use indoc::indoc;

/// Two sources, one at the phase centre, and three stations. All gains are
/// unity.
const PARSET: &str = indoc! {r#"
    solvable = ["gain:11:ampl:*"]

    [domain]
    freq = [150e6, 160e6]
    time = [0.0, 10.0]
    num_freqs = 3
    num_times = 2

    [phase_centre]
    ra = 60.0
    dec = -27.0

    [[sources]]
    name = "centre"
    ra = 60.0
    dec = -27.0
    i = 4.0

    [[sources]]
    name = "offset"
    ra = 61.0
    dec = -26.0
    i = 1.0
    gaussian = { maj = 90.0, min = 45.0, pa = 10.0 }

    [[baselines]]
    stations = ["A", "B"]
    uvw = [100.0, -50.0, 3.0]

    [[baselines]]
    stations = ["A", "C"]
    uvw = [-20.0, 300.0, -10.0]

    [[baselines]]
    stations = ["B", "C"]
    uvw = [-120.0, 350.0, -13.0]
"#};

fn bbs() -> Command {
    Command::cargo_bin("bbs").unwrap()
}

fn get_cmd_output(result: Result<Output, OutputError>) -> (String, String) {
    let output = match result {
        Ok(o) => o,
        Err(o) => o.as_output().unwrap().clone(),
    };
    (
        from_utf8(&output.stdout).unwrap().to_string(),
        from_utf8(&output.stderr).unwrap().to_string(),
    )
}

fn make_file_in_dir<T: AsRef<Path>, U: AsRef<Path>>(
    filename: T,
    dir: U,
    contents: &str,
) -> PathBuf {
    let path = dir.as_ref().join(filename);
    let mut f = File::create(&path).expect("couldn't make file");
    f.write_all(contents.as_bytes()).unwrap();
    path
}
