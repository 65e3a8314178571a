// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::io::Write;

use approx::assert_abs_diff_eq;
use indoc::indoc;
use tempfile::Builder;

use super::*;
use crate::JonesKind;

const TOML_PARSET: &str = indoc! {r#"
    solvable = ["gain:*:ampl:*"]
    selected_sources = []

    [domain]
    freq = [150e6, 160e6]
    time = [0.0, 10.0]
    num_freqs = 4

    [phase_centre]
    ra = 60.0
    dec = -27.0

    [[parms]]
    name = "I:3C196"
    coeffs = [[10.0], [-1.5]]

    [[sources]]
    name = "3C196"
    ra = 60.0
    dec = -27.0
    i = 10.0
    q = 1.0

    [[sources]]
    name = "blob"
    ra = 60.5
    dec = -27.5
    i = 2.0
    gaussian = { maj = 120.0, min = 60.0, pa = 30.0 }

    [[baselines]]
    stations = ["CS001", "CS002"]
    uvw = [100.0, -50.0, 3.0]

    [[baselines]]
    stations = ["CS001", "CS003"]
    uvw = [-20.0, 300.0, -10.0]
"#};

const JSON_PARSET: &str = indoc! {r#"
    {
        "domain": { "freq": [150e6, 160e6], "time": [0.0, 10.0], "num_freqs": 4 },
        "phase_centre": { "ra": 60.0, "dec": -27.0 },
        "parms": [ { "name": "I:3C196", "coeffs": [[10.0], [-1.5]] } ],
        "solvable": ["gain:*:ampl:*"],
        "sources": [
            { "name": "3C196", "ra": 60.0, "dec": -27.0, "i": 10.0, "q": 1.0 },
            { "name": "blob", "ra": 60.5, "dec": -27.5, "i": 2.0,
              "gaussian": { "maj": 120.0, "min": 60.0, "pa": 30.0 } }
        ],
        "baselines": [
            { "stations": ["CS001", "CS002"], "uvw": [100.0, -50.0, 3.0] },
            { "stations": ["CS001", "CS003"], "uvw": [-20.0, 300.0, -10.0] }
        ]
    }
"#};

const YAML_PARSET: &str = indoc! {r#"
    domain:
      freq: [150.0e6, 160.0e6]
      time: [0.0, 10.0]
      num_freqs: 4
    phase_centre:
      ra: 60.0
      dec: -27.0
    parms:
      - name: "I:3C196"
        coeffs: [[10.0], [-1.5]]
    solvable: ["gain:*:ampl:*"]
    sources:
      - name: 3C196
        ra: 60.0
        dec: -27.0
        i: 10.0
        q: 1.0
      - name: blob
        ra: 60.5
        dec: -27.5
        i: 2.0
        gaussian: { maj: 120.0, min: 60.0, pa: 30.0 }
    baselines:
      - stations: [CS001, CS002]
        uvw: [100.0, -50.0, 3.0]
      - stations: [CS001, CS003]
        uvw: [-20.0, 300.0, -10.0]
"#};

fn write_parset(contents: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn toml_parset() -> Parset {
    toml::from_str(TOML_PARSET).unwrap()
}

#[test]
fn test_read_all_formats() {
    let from_toml = Parset::read(write_parset(TOML_PARSET, ".toml").path()).unwrap();
    let from_json = Parset::read(write_parset(JSON_PARSET, ".json").path()).unwrap();
    let from_yaml = Parset::read(write_parset(YAML_PARSET, ".yaml").path()).unwrap();
    let from_yml = Parset::read(write_parset(YAML_PARSET, ".YML").path()).unwrap();
    assert_eq!(from_toml, from_json);
    assert_eq!(from_toml, from_yaml);
    assert_eq!(from_toml, from_yml);

    assert_eq!(from_toml.domain.num_freqs.get(), 4);
    assert_eq!(from_toml.domain.num_times.get(), 1);
    assert_eq!(from_toml.sources[0].u, 0.0);
    assert_eq!(from_toml.parms[0].coeffs, Coeffs::Poly(vec![vec![10.0], vec![-1.5]]));
    assert!(from_toml.sources[0].gaussian.is_none());
    assert_eq!(
        from_toml.sources[1].gaussian,
        Some(GaussianConfig {
            maj: 120.0,
            min: 60.0,
            pa: 30.0
        })
    );
}

#[test]
fn test_unknown_extension() {
    let file = write_parset(TOML_PARSET, ".txt");
    let result = Parset::read(file.path());
    assert!(matches!(result, Err(ConfigError::UnknownExtension(_))));
    let msg = result.unwrap_err().to_string();
    assert!(msg.contains("toml, json, yaml, yml"), "{msg}");
}

#[test]
fn test_unknown_field_is_rejected() {
    let contents = TOML_PARSET.replace("num_freqs = 4", "num_channels = 4");
    let file = write_parset(&contents, ".toml");
    assert!(matches!(Parset::read(file.path()), Err(ConfigError::Toml(_))));
}

#[test]
fn test_build() {
    let model = toml_parset().build(false).unwrap();
    assert_eq!(model.srclist.len(), 2);
    assert_eq!(model.srclist.selected(), &[0, 1]);
    assert_eq!(model.roots.predicted.len(), 2);
    assert!(model.roots.residuals.is_empty());
    assert_eq!(model.baselines[1].station2, "CS003");
    assert_eq!(model.baselines[1].uvw.v, 300.0);

    let parms = model.graph.parms();
    // The explicitly-given flux density wins over the source's.
    assert_eq!(parms.get_by_name("I:3C196").unwrap().coeffs().dim(), (2, 1));
    assert_abs_diff_eq!(
        parms.get_by_name("dec:3C196").unwrap().coeffs()[(0, 0)],
        -27.0_f64.to_radians()
    );
    assert_abs_diff_eq!(
        parms.get_by_name("maj:blob").unwrap().coeffs()[(0, 0)],
        (120.0 / 3600.0_f64).to_radians()
    );
    assert!(parms.get_by_name("maj:3C196").is_none());
    // Four gain parameters for each of three stations.
    assert!(parms.get_by_name("gain:22:phase:CS003").is_some());
    // Amplitudes of three stations, both polarisations.
    assert_eq!(parms.num_spids(), 6);
    assert!(parms.get_by_name("gain:11:ampl:CS002").unwrap().is_solvable());
    assert!(!parms.get_by_name("gain:11:phase:CS002").unwrap().is_solvable());

    assert!(matches!(
        model.graph.jones_kind(model.roots.predicted[0]),
        JonesKind::Sum
    ));
}

#[test]
fn test_build_with_residuals_and_selection() {
    let mut parset = toml_parset();
    parset.selected_sources = vec!["blob".to_string()];
    let model = parset.build(true).unwrap();
    assert_eq!(model.srclist.selected(), &[1]);
    assert_eq!(model.roots.residuals.len(), 2);

    parset.selected_sources = vec!["nope".to_string()];
    assert!(matches!(
        parset.build(false),
        Err(ConfigError::SourceList(SourceListError::UnknownSource(_)))
    ));
}

#[test]
fn test_build_errors() {
    let mut parset = toml_parset();
    parset.baselines.clear();
    assert!(matches!(parset.build(false), Err(ConfigError::NoBaselines)));

    let mut parset = toml_parset();
    parset.parms[0].coeffs = Coeffs::Poly(vec![vec![1.0, 2.0], vec![3.0]]);
    assert!(matches!(parset.build(false), Err(ConfigError::RaggedCoeffs(_))));

    let mut parset = toml_parset();
    parset.domain.freq = [160e6, 150e6];
    assert!(matches!(parset.build(false), Err(ConfigError::Domain(_))));

    let mut parset = toml_parset();
    parset.solvable = vec!["[".to_string()];
    assert!(matches!(parset.build(false), Err(ConfigError::Parm(_))));
}

#[test]
fn test_evaluate_model() {
    let mut parset = toml_parset();
    parset.parms.clear();
    parset.selected_sources = vec!["3C196".to_string()];
    let model = parset.build(false).unwrap();

    let session = EvalSession::new();
    let request = model.request(&session, true);
    assert_eq!(request.grid_shape(), (4, 1));
    let results = model
        .graph
        .get_jresults(&model.roots.predicted, &request)
        .unwrap();
    // The source is at the phase centre and all gains are unity.
    for result in &results {
        for i_freq in 0..4 {
            let jones = result.jones_at(i_freq, 0);
            assert_abs_diff_eq!(jones[0].re, 5.5, epsilon = 1e-12);
            assert_abs_diff_eq!(jones[0].im, 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(jones[3].re, 4.5, epsilon = 1e-12);
            assert_abs_diff_eq!(jones[1].norm(), 0.0, epsilon = 1e-12);
        }
    }
}
