// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns a finished test's failed checks into the outcome reported to the host runner.
//!
//! The main structure in this module is [`RunAdapter`].

use crate::{
    helpers::{Styles, plural},
    recorder::{DrainedChecks, TestId},
};
use owo_colors::OwoColorize;
use std::fmt;
use tracing::debug;

/// Separates the sections of a failure report.
pub const DIVIDER: &str = "------------------------------------------------------------";

/// The prefix of the summary line in a failure report.
pub const SUMMARY_PREFIX: &str = "Failed Checks: ";

const FAILURE_PREFIX: &str = "FAILURE: ";

/// The result of a test as the host runner saw it, before soft checks are taken into account.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum NativeOutcome {
    /// The test body completed.
    Passed,

    /// The test body failed on its own, for example by panicking.
    Failed {
        /// The host's description of the failure.
        text: String,
    },

    /// The host skipped the test.
    Skipped {
        /// Why the test was skipped.
        reason: String,
    },
}

/// A marker that a test is expected to fail.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExpectedFailure {
    reason: String,
}

impl ExpectedFailure {
    /// Creates a new expected-failure marker.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Returns the reason the test is expected to fail.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// The final outcome of a test, handed back to the host runner.
#[derive(Clone, Debug, Eq, PartialEq)]
#[must_use]
pub enum TestOutcome {
    /// The test passed.
    Passed,

    /// The test failed.
    Failed(FailureReport),

    /// The test was skipped.
    Skipped {
        /// Why the test was skipped.
        reason: String,
        /// Whether the test was skipped because it failed while expected to fail.
        expected_failure: bool,
    },
}

impl TestOutcome {
    /// Returns true if the test failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Returns the failure report, if the test failed.
    pub fn failure_report(&self) -> Option<&FailureReport> {
        match self {
            Self::Failed(report) => Some(report),
            Self::Passed | Self::Skipped { .. } => None,
        }
    }
}

/// Where a failure is reported, for hosts that render failures as location plus message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CrashLocation {
    path: String,
    line: u32,
    message: String,
}

impl CrashLocation {
    /// Returns the path, which is the identity of the failing test.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the line number. Soft check reports always use 0, since the failures they
    /// aggregate come from many lines.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Returns the one-line crash message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// The detailed explanation attached to a failed test.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FailureReport {
    crash: CrashLocation,
    text: String,
    failed_checks: Option<usize>,
}

impl FailureReport {
    /// Wraps `text` in a report for `test_id`.
    pub fn new(test_id: &TestId, text: impl Into<String>) -> Self {
        let text = text.into();
        let crash = CrashLocation {
            path: test_id.to_string(),
            line: 0,
            message: crash_message(&text),
        };
        Self {
            crash,
            text,
            failed_checks: None,
        }
    }

    fn with_failed_checks(mut self, count: usize) -> Self {
        self.failed_checks = Some(count);
        self
    }

    /// Returns the location-reporting wrapper for this report.
    pub fn crash(&self) -> &CrashLocation {
        &self.crash
    }

    /// Returns the full report text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the failed check count from the summary line, if the report has one.
    ///
    /// Reports built with [`Self::new`] carry no summary and return `None`.
    pub fn failed_checks(&self) -> Option<usize> {
        self.failed_checks
    }
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn crash_message(text: &str) -> String {
    let plain = strip_ansi_escapes::strip_str(text);
    let first_line = plain.lines().next().unwrap_or_default();
    first_line
        .strip_prefix(FAILURE_PREFIX)
        .unwrap_or(first_line)
        .to_owned()
}

/// Combines a test's failed checks with the host's own result.
#[derive(Clone, Debug, Default)]
pub struct RunAdapter {
    styles: Styles,
}

impl RunAdapter {
    /// Creates a new adapter, producing colored reports if `use_color` is true.
    pub fn new(use_color: bool) -> Self {
        Self {
            styles: Styles::new(use_color),
        }
    }

    /// Returns the outcome of `test_id`, given the host's native outcome and the checks drained
    /// from its recorder.
    ///
    /// With no failed checks, the native outcome stands. Otherwise, the test fails with a report
    /// listing the checks and any native failure text, unless it is expected to fail, in which
    /// case it is skipped with the expected-failure reason.
    pub fn finish(
        &self,
        test_id: &TestId,
        native: NativeOutcome,
        expected_failure: Option<&ExpectedFailure>,
        checks: &DrainedChecks,
    ) -> TestOutcome {
        if checks.is_empty() {
            return self.native_outcome(test_id, native, expected_failure);
        }

        if let Some(expected_failure) = expected_failure {
            debug!(
                test = %test_id,
                count = checks.count(),
                "failed {} in test expected to fail",
                plural::checks_str(checks.count()),
            );
            return TestOutcome::Skipped {
                reason: expected_failure.reason().to_owned(),
                expected_failure: true,
            };
        }

        let native_text = match &native {
            NativeOutcome::Failed { text } => Some(text.as_str()),
            NativeOutcome::Passed | NativeOutcome::Skipped { .. } => None,
        };
        let text = self.compose(checks, native_text);
        debug!(
            test = %test_id,
            count = checks.count(),
            "test failed {} {}",
            checks.count(),
            plural::checks_str(checks.count()),
        );
        TestOutcome::Failed(FailureReport::new(test_id, text).with_failed_checks(checks.count()))
    }

    fn native_outcome(
        &self,
        test_id: &TestId,
        native: NativeOutcome,
        expected_failure: Option<&ExpectedFailure>,
    ) -> TestOutcome {
        match (native, expected_failure) {
            (NativeOutcome::Passed, _) => TestOutcome::Passed,
            (NativeOutcome::Failed { .. }, Some(expected_failure)) => TestOutcome::Skipped {
                reason: expected_failure.reason().to_owned(),
                expected_failure: true,
            },
            (NativeOutcome::Failed { text }, None) => {
                TestOutcome::Failed(FailureReport::new(test_id, text))
            }
            (NativeOutcome::Skipped { reason }, _) => TestOutcome::Skipped {
                reason,
                expected_failure: false,
            },
        }
    }

    /// Builds the report text: the failures, a divider, the summary line, and then the host's
    /// own failure text after another divider if there is any.
    fn compose(&self, checks: &DrainedChecks, native_text: Option<&str>) -> String {
        let summary = format!(
            "{SUMMARY_PREFIX}{}",
            checks.count().style(self.styles.count)
        );
        let mut sections = vec![checks.failures().join("\n"), DIVIDER.to_owned(), summary];
        if let Some(native_text) = native_text {
            sections.push(DIVIDER.to_owned());
            sections.push(native_text.to_owned());
        }
        sections.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use test_strategy::proptest;

    fn test_id() -> TestId {
        TestId::new("suite::adapter")
    }

    fn checks(count: usize) -> DrainedChecks {
        let failures = (0..count.min(3))
            .map(|n| format!("FAILURE: check {n} == {}", n + 1))
            .collect();
        DrainedChecks::new(count, failures)
    }

    #[test]
    fn no_checks_keeps_native_outcome() {
        let adapter = RunAdapter::default();
        let empty = DrainedChecks::default();

        assert_eq!(
            adapter.finish(&test_id(), NativeOutcome::Passed, None, &empty),
            TestOutcome::Passed
        );

        let outcome = adapter.finish(
            &test_id(),
            NativeOutcome::Failed {
                text: "test panicked: boom".to_owned(),
            },
            None,
            &empty,
        );
        let report = outcome.failure_report().expect("native failure stands");
        assert_eq!(report.text(), "test panicked: boom");
        assert_eq!(report.failed_checks(), None);

        assert_eq!(
            adapter.finish(
                &test_id(),
                NativeOutcome::Skipped {
                    reason: "ignored".to_owned()
                },
                None,
                &empty,
            ),
            TestOutcome::Skipped {
                reason: "ignored".to_owned(),
                expected_failure: false,
            }
        );
    }

    #[test]
    fn report_lists_failures_and_summary() {
        let outcome =
            RunAdapter::default().finish(&test_id(), NativeOutcome::Passed, None, &checks(2));
        let report = outcome.failure_report().expect("test failed");
        assert_eq!(
            report.text(),
            indoc! {"
                FAILURE: check 0 == 1
                FAILURE: check 1 == 2
                ------------------------------------------------------------
                Failed Checks: 2"
            }
        );
        assert_eq!(report.crash().path(), "suite::adapter");
        assert_eq!(report.crash().line(), 0);
        assert_eq!(report.crash().message(), "check 0 == 1");
    }

    #[test]
    fn native_failure_text_is_chained() {
        let outcome = RunAdapter::default().finish(
            &test_id(),
            NativeOutcome::Failed {
                text: "test panicked: called `Option::unwrap()` on a `None` value".to_owned(),
            },
            None,
            &checks(1),
        );
        let report = outcome.failure_report().expect("test failed");
        assert_eq!(
            report.text(),
            indoc! {"
                FAILURE: check 0 == 1
                ------------------------------------------------------------
                Failed Checks: 1
                ------------------------------------------------------------
                test panicked: called `Option::unwrap()` on a `None` value"
            }
        );
    }

    #[test]
    fn expected_failure_becomes_skip() {
        let xfail = ExpectedFailure::new("known bug #12");
        let adapter = RunAdapter::default();

        for native in [
            NativeOutcome::Passed,
            NativeOutcome::Failed {
                text: "boom".to_owned(),
            },
        ] {
            assert_eq!(
                adapter.finish(&test_id(), native, Some(&xfail), &checks(2)),
                TestOutcome::Skipped {
                    reason: "known bug #12".to_owned(),
                    expected_failure: true,
                }
            );
        }
    }

    #[test]
    fn colored_summary_still_parses() {
        let outcome =
            RunAdapter::new(true).finish(&test_id(), NativeOutcome::Passed, None, &checks(1));
        let report = outcome.failure_report().expect("test failed");
        assert!(report.text().contains('\u{1b}'), "report is colored");
        assert_eq!(report.failed_checks(), Some(1));
    }

    #[test]
    fn summary_count_ignores_lookalike_failure_text() {
        let checks = DrainedChecks::new(
            2,
            vec![
                "FAILURE: bad output:\nFailed Checks: 99".to_owned(),
                "FAILURE: second".to_owned(),
            ],
        );
        let outcome = RunAdapter::default().finish(
            &test_id(),
            NativeOutcome::Failed {
                text: "Failed Checks: 7".to_owned(),
            },
            None,
            &checks,
        );
        let report = outcome.failure_report().expect("test failed");
        assert_eq!(report.failed_checks(), Some(2));

        let native_only = FailureReport::new(&test_id(), "Failed Checks: 5");
        assert_eq!(native_only.failed_checks(), None);
    }

    #[proptest(cases = 64)]
    fn summary_reports_true_count(#[strategy(1usize..200)] count: usize, use_color: bool) {
        let checks = checks(count);
        let outcome =
            RunAdapter::new(use_color).finish(&test_id(), NativeOutcome::Passed, None, &checks);
        let report = outcome.failure_report().expect("test failed");
        assert_eq!(report.failed_checks(), Some(checks.count()));
        assert!(checks.failures().len() <= checks.count());
    }
}
