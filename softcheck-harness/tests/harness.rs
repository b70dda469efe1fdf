// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino_tempfile::tempdir;
use libtest_mimic::{Arguments, ColorSetting};
use pretty_assertions::assert_eq;
use softcheck::{CheckConfig, CheckLimit, TracebackStyle, errors::ConfigParseErrorKind};
use softcheck_harness::Harness;

fn args() -> Arguments {
    Arguments {
        test_threads: Some(1),
        color: Some(ColorSetting::Never),
        ..Arguments::default()
    }
}

#[test]
fn trials_report_soft_check_outcomes() {
    let harness = Harness::new(CheckConfig::default().with_traceback_style(TracebackStyle::No))
        .test("harness::passes", |c| {
            c.equal(1, 1);
        })
        .test("harness::soft_failures", |c| {
            c.equal(1, 2);
            c.greater(1, 2);
        })
        .test("harness::returns_error", |_| -> Result<(), String> {
            Err("bad input".to_owned())
        })
        .xfail_test("harness::expected", "tracked upstream", |c| {
            c.fail("still broken");
        });
    assert_eq!(harness.len(), 4);

    let conclusion = harness.run(&args());
    assert_eq!(conclusion.num_passed, 2, "passing and expected-failure trials pass");
    assert_eq!(conclusion.num_failed, 2);
    assert!(conclusion.has_failed());
}

#[test]
fn filters_apply_to_soft_check_trials() {
    let harness = Harness::new(CheckConfig::default())
        .test("harness::filtered::kept", |c| {
            c.is_true(true);
        })
        .test("harness::filtered::dropped", |c| {
            c.fail("should not run");
        });

    let args = Arguments {
        filter: Some("kept".to_owned()),
        ..args()
    };
    let conclusion = harness.run(&args);
    assert_eq!(conclusion.num_passed, 1);
    assert_eq!(conclusion.num_filtered_out, 1);
    assert!(!conclusion.has_failed());
}

#[test]
fn load_reads_workspace_config() {
    let dir = tempdir().expect("created temp dir");
    let config_dir = dir.path().join(".config");
    std::fs::create_dir_all(&config_dir).expect("created .config");
    std::fs::write(
        config_dir.join("softcheck.toml"),
        "max_fail = 1\ntraceback_style = \"no\"\n",
    )
    .expect("wrote config");

    let harness = Harness::load(dir.path()).expect("config loaded");
    assert_eq!(harness.config().max_fail(), CheckLimit::Count(1));
    assert_eq!(harness.config().traceback_style(), TracebackStyle::No);

    let harness = harness.test("harness::loaded::aborts", |c| {
        c.equal(1, 2);
        c.equal(3, 4);
    });
    let conclusion = harness.run(&args());
    assert_eq!(conclusion.num_failed, 1);
}

#[test]
fn load_reports_invalid_workspace_config() {
    let dir = tempdir().expect("created temp dir");
    let config_dir = dir.path().join(".config");
    std::fs::create_dir_all(&config_dir).expect("created .config");
    std::fs::write(config_dir.join("softcheck.toml"), "color = \"sometimes\"\n")
        .expect("wrote config");

    let error = match Harness::load(dir.path()) {
        Ok(_) => panic!("invalid color should fail to load"),
        Err(error) => error,
    };
    assert!(
        matches!(error.kind(), ConfigParseErrorKind::DeserializeError(_)),
        "expected deserialize error, found {error:?}"
    );
}
