// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino_tempfile::tempdir;
use indoc::indoc;
use pretty_assertions::assert_eq;
use softcheck::{
    AnyPanic, CheckConfig, CheckLimit, CheckSession, Color, PanicMessage, TestMeta, TestOutcome,
    TracebackStyle, check,
};
use test_case::test_case;

fn plain() -> CheckConfig {
    CheckConfig::default()
        .with_traceback_style(TracebackStyle::No)
        .with_color(Color::Never)
}

#[test]
fn every_failure_is_reported_together() {
    let session = CheckSession::new(plain());
    let outcome = session.run_test(&TestMeta::new("integration::together"), |c| {
        let name = "softcheck";
        check!(c, name.len() == 3);
        c.is_in(&'z', &['a', 'b']);
        c.raises(AnyPanic, || name.len());
        c.raises(PanicMessage::new("empty"), || {
            let parts: Vec<&str> = Vec::new();
            assert!(!parts.is_empty(), "parts were empty");
        });
    });

    let report = outcome.failure_report().expect("test failed");
    assert_eq!(
        report.text(),
        indoc! {"
            FAILURE: check name.len() == 3
            FAILURE: check 'z' in ['a', 'b']
            FAILURE: expected a panic, but nothing panicked
            ------------------------------------------------------------
            Failed Checks: 3"
        }
    );
    assert_eq!(report.failed_checks(), Some(3));
}

#[test]
fn summary_count_is_not_fooled_by_failure_messages() {
    let session = CheckSession::new(plain());
    let outcome = session.run_test(&TestMeta::new("integration::lookalike"), |c| {
        c.fail("bad output:\nFailed Checks: 99");
        c.fail("second");
    });
    let report = outcome.failure_report().expect("test failed");
    assert_eq!(report.failed_checks(), Some(2));
}

#[test_case(false, 2 ; "soft checks run to completion")]
#[test_case(true, 1 ; "stop on fail aborts at the first")]
fn stop_on_fail_controls_how_far_a_test_gets(stop_on_fail: bool, reached: usize) {
    let session = CheckSession::new(plain().with_stop_on_fail(stop_on_fail));
    let mut evaluated = 0;
    let outcome = session.run_test(&TestMeta::new("integration::stop"), |c| {
        for n in 0..2 {
            evaluated += 1;
            c.equal(n, 10);
        }
        c.equal(1, 1);
    });

    assert!(outcome.is_failed());
    assert_eq!(evaluated, reached);
}

#[test]
fn tracebacks_point_at_the_test_source() {
    let session = CheckSession::new(
        CheckConfig::default()
            .with_traceback_style(TracebackStyle::Long)
            .with_show_locals(true)
            .with_color(Color::Never),
    );
    let outcome = session.run_test(&TestMeta::new("integration::tracebacks"), |c| {
        let expected = 4;
        c.equal(2 + 1, expected); // first failing line
        c.equal(5, expected);
    });
    let text = outcome.failure_report().expect("test failed").text().to_owned();

    let first_line = line!() - 5;
    let location = format!("{}:{first_line}:", file!());
    assert!(
        text.starts_with(&format!("FAILURE: check 3 == 4\n{location}")),
        "report starts with the first failure and its location:\n{text}",
    );
    assert!(
        text.contains(">   c.equal(2 + 1, expected); // first failing line\n    left = 3\n    right = 4\n"),
        "report shows the source line and locals:\n{text}",
    );
    assert!(
        text.contains("FAILURE: check 5 == 4\n----"),
        "the second failure is past max_tb and has no traceback:\n{text}",
    );
}

#[test]
fn config_file_drives_the_session() {
    let dir = tempdir().expect("created temp dir");
    let config_file = dir.path().join("softcheck.toml");
    std::fs::write(
        &config_file,
        indoc! {r#"
            max_report = 1
            traceback_style = "no"
            color = "never"
        "#},
    )
    .expect("wrote config");

    let env = [("SOFTCHECK_MAX_FAIL".to_owned(), "3".to_owned())];
    let config = CheckConfig::from_sources_with_env(dir.path(), Some(config_file.as_path()), env)
        .expect("config is valid");
    assert_eq!(config.max_fail(), CheckLimit::Count(3));

    let session = CheckSession::new(config);
    let outcome = session.run_test(&TestMeta::new("integration::config"), |c| {
        for n in 0..10 {
            c.equal(n, -1);
        }
    });
    assert_eq!(
        outcome.failure_report().expect("test failed").text(),
        indoc! {"
            FAILURE: check 0 == -1
            ------------------------------------------------------------
            Failed Checks: 3
            ------------------------------------------------------------
            FAILURE: check 3 == -1
            (max fail of 3 reached)"
        }
    );
}

#[test]
fn expected_failures_are_skipped_even_with_panics() {
    let session = CheckSession::new(plain());
    let meta = TestMeta::new("integration::xfail").with_expected_failure("tracked upstream");
    let outcome = session.run_test(&meta, |c| -> () {
        c.fail("still broken");
        panic!("also still broken");
    });
    assert_eq!(
        outcome,
        TestOutcome::Skipped {
            reason: "tracked upstream".to_owned(),
            expected_failure: true,
        }
    );
}
