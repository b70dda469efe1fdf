// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Run soft-check test bodies in `harness = false` test targets.
//!
//! ```no_run
//! use softcheck::CheckConfig;
//! use softcheck_harness::Harness;
//!
//! fn main() -> std::process::ExitCode {
//!     Harness::new(CheckConfig::default())
//!         .test("widths::match", |c| {
//!             c.equal(3, 3);
//!         })
//!         .xfail_test("widths::overflow", "known overflow bug", |c| {
//!             c.less(u32::MAX, 10);
//!         })
//!         .run_from_args()
//!         .exit_code()
//! }
//! ```

pub mod output;

use camino::Utf8PathBuf;
use libtest_mimic::{Arguments, ColorSetting, Conclusion, Failed, Trial};
use softcheck::{
    CheckConfig, CheckSession, Checker, Color, TestMeta, TestOutcome, TestReturn,
    errors::ConfigParseError,
};
use std::sync::Arc;
use tracing::{debug, info};

type Runner = Box<dyn FnOnce(&CheckSession) -> TestOutcome + Send>;

struct PendingTrial {
    name: String,
    runner: Runner,
}

/// A collection of soft-check tests, run through `libtest-mimic`.
#[must_use]
pub struct Harness {
    config: CheckConfig,
    pending: Vec<PendingTrial>,
}

impl Harness {
    /// Creates an empty harness with the given config.
    pub fn new(config: CheckConfig) -> Self {
        Self {
            config,
            pending: Vec::new(),
        }
    }

    /// Creates an empty harness, reading config from `workspace_root` and the environment.
    ///
    /// See [`CheckConfig::from_sources`] for the layers that are read.
    pub fn load(workspace_root: impl Into<Utf8PathBuf>) -> Result<Self, ConfigParseError> {
        CheckConfig::from_sources(workspace_root, None).map(Self::new)
    }

    /// Returns the config tests will run with, before any color override from the arguments.
    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    /// Adds a test.
    pub fn test<F, R>(self, name: impl Into<String>, body: F) -> Self
    where
        F: FnOnce(&Checker<'_>) -> R + Send + 'static,
        R: TestReturn,
    {
        self.push(TestMeta::new(name), body)
    }

    /// Adds a test that is expected to fail, for the given reason.
    ///
    /// If the test fails, it's reported as passing and the reason is logged.
    pub fn xfail_test<F, R>(
        self,
        name: impl Into<String>,
        reason: impl Into<String>,
        body: F,
    ) -> Self
    where
        F: FnOnce(&Checker<'_>) -> R + Send + 'static,
        R: TestReturn,
    {
        self.push(TestMeta::new(name).with_expected_failure(reason), body)
    }

    fn push<F, R>(mut self, meta: TestMeta, body: F) -> Self
    where
        F: FnOnce(&Checker<'_>) -> R + Send + 'static,
        R: TestReturn,
    {
        let name = meta.id().to_string();
        let runner: Runner = Box::new(move |session: &CheckSession| session.run_test(&meta, body));
        self.pending.push(PendingTrial { name, runner });
        self
    }

    /// Returns the number of tests added so far.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if no tests have been added.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Parses the process arguments and runs the tests.
    pub fn run_from_args(self) -> Conclusion {
        let args = Arguments::from_args();
        self.run(&args)
    }

    /// Runs the tests with the given arguments.
    pub fn run(self, args: &Arguments) -> Conclusion {
        let config = match args.color {
            Some(setting) => self.config.with_color(color_from_setting(setting)),
            None => self.config,
        };
        output::init_logging(config.color());

        let session = Arc::new(CheckSession::new(config));
        debug!(count = self.pending.len(), "running soft-check trials");

        let trials = self
            .pending
            .into_iter()
            .map(|pending| {
                let session = Arc::clone(&session);
                let PendingTrial { name, runner } = pending;
                Trial::test(name.clone(), move || {
                    trial_result(&name, runner(&*session))
                })
            })
            .collect();

        libtest_mimic::run(args, trials)
    }
}

fn color_from_setting(setting: ColorSetting) -> Color {
    match setting {
        ColorSetting::Auto => Color::Auto,
        ColorSetting::Always => Color::Always,
        ColorSetting::Never => Color::Never,
    }
}

fn trial_result(name: &str, outcome: TestOutcome) -> Result<(), Failed> {
    match outcome {
        TestOutcome::Passed => Ok(()),
        TestOutcome::Failed(report) => Err(Failed::from(report.text())),
        TestOutcome::Skipped {
            reason,
            expected_failure,
        } => {
            if expected_failure {
                info!("{name}: failed as expected ({reason})");
            } else {
                info!("{name}: skipped ({reason})");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn color_settings_map() {
        assert_eq!(color_from_setting(ColorSetting::Auto), Color::Auto);
        assert_eq!(color_from_setting(ColorSetting::Always), Color::Always);
        assert_eq!(color_from_setting(ColorSetting::Never), Color::Never);
    }

    #[test]
    fn skipped_outcomes_pass() {
        let outcome = TestOutcome::Skipped {
            reason: "known bug".to_owned(),
            expected_failure: true,
        };
        assert!(trial_result("skipped", outcome).is_ok());
        assert!(trial_result("passed", TestOutcome::Passed).is_ok());
    }
}
