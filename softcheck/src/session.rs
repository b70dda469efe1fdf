// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Running test bodies with soft checks.
//!
//! A [`CheckSession`] holds the configuration for a whole run. Each test is run through
//! [`CheckSession::run_test`], which hands the body a [`Checker`], catches anything the body
//! raises, and folds the test's failed checks into a single [`TestOutcome`].

use crate::{
    adapter::{ExpectedFailure, NativeOutcome, RunAdapter, TestOutcome},
    check::Checker,
    config::CheckConfig,
    errors::CheckAborted,
    helpers::{Styles, panic_description},
    recorder::{Admission, FailureEntry, RecorderArena, RecorderLimits, TestId},
    traceback::{CallSite, CheckLocal, TracebackSynthesizer},
};
use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
};
use tracing::debug;

/// A test to run, as the host runner describes it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestMeta {
    id: TestId,
    expected_failure: Option<ExpectedFailure>,
}

impl TestMeta {
    /// Creates metadata for the test named `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: TestId::new(id),
            expected_failure: None,
        }
    }

    /// Marks the test as expected to fail, for the given reason.
    #[must_use]
    pub fn with_expected_failure(mut self, reason: impl Into<String>) -> Self {
        self.expected_failure = Some(ExpectedFailure::new(reason));
        self
    }

    /// Returns the test's identifier.
    pub fn id(&self) -> &TestId {
        &self.id
    }

    /// Returns the expected-failure marker, if the test has one.
    pub fn expected_failure(&self) -> Option<&ExpectedFailure> {
        self.expected_failure.as_ref()
    }
}

/// Values a test body may return.
pub trait TestReturn {
    /// Converts the returned value into the test's native outcome.
    fn into_native(self) -> NativeOutcome;
}

impl TestReturn for () {
    fn into_native(self) -> NativeOutcome {
        NativeOutcome::Passed
    }
}

impl<E: fmt::Debug> TestReturn for Result<(), E> {
    fn into_native(self) -> NativeOutcome {
        match self {
            Ok(()) => NativeOutcome::Passed,
            Err(error) => NativeOutcome::Failed {
                text: format!("test returned error: {error:?}"),
            },
        }
    }
}

impl TestReturn for NativeOutcome {
    fn into_native(self) -> NativeOutcome {
        self
    }
}

/// Soft-check state for a test run.
///
/// A session may be shared between threads running different tests. Each test's failures are
/// kept apart by its [`TestId`].
#[derive(Debug)]
pub struct CheckSession {
    config: CheckConfig,
    styles: Styles,
    synthesizer: TracebackSynthesizer,
    arena: RecorderArena,
    adapter: RunAdapter,
}

impl CheckSession {
    /// Creates a new session.
    pub fn new(config: CheckConfig) -> Self {
        let use_color = config.use_color();
        let styles = Styles::new(use_color);
        let synthesizer = TracebackSynthesizer::with_styles(&config, styles.clone());
        let arena = RecorderArena::new(RecorderLimits::from_config(&config));
        debug!(
            stop_on_fail = config.stop_on_fail(),
            max_fail = %config.max_fail(),
            max_report = %config.max_report(),
            max_tb = config.max_tb(),
            traceback_style = %config.traceback_style(),
            use_color,
            "created check session",
        );

        Self {
            config,
            styles,
            synthesizer,
            arena,
            adapter: RunAdapter::new(use_color),
        }
    }

    /// Returns the configuration for this session.
    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    /// Returns the recorders for tests in this session.
    pub fn arena(&self) -> &RecorderArena {
        &self.arena
    }

    /// Returns a checker that records into `test_id`.
    ///
    /// Tests run through [`run_test`](Self::run_test) get a checker automatically. This is for
    /// hosts that run bodies themselves and call [`finish_test`](Self::finish_test) afterwards.
    pub fn checker<'a>(&'a self, test_id: &'a TestId) -> Checker<'a> {
        Checker::new(self, test_id)
    }

    /// Runs `body` as the test described by `meta`, returning its final outcome.
    ///
    /// Panics raised by the body are caught and become the test's native failure. Failed checks
    /// are then combined with that native outcome.
    pub fn run_test<F, R>(&self, meta: &TestMeta, body: F) -> TestOutcome
    where
        F: FnOnce(&Checker<'_>) -> R,
        R: TestReturn,
    {
        let checker = self.checker(meta.id());
        let native = match panic::catch_unwind(AssertUnwindSafe(|| body(&checker))) {
            Ok(ret) => ret.into_native(),
            Err(payload) => match payload.downcast::<CheckAborted>() {
                Ok(aborted) => {
                    debug!(test = %meta.id(), reason = %aborted.reason(), "test aborted by check");
                    NativeOutcome::Failed {
                        text: aborted.message().to_owned(),
                    }
                }
                Err(payload) => NativeOutcome::Failed {
                    text: format!("test panicked: {}", panic_description(&*payload)),
                },
            },
        };

        self.finish_test(meta, native)
    }

    /// Drains the failed checks for the test described by `meta` and combines them with the
    /// host's `native` outcome.
    ///
    /// This must be called exactly once per test, after its body has finished.
    pub fn finish_test(&self, meta: &TestMeta, native: NativeOutcome) -> TestOutcome {
        let checks = self.arena.drain_styled(meta.id(), &self.styles);
        self.adapter
            .finish(meta.id(), native, meta.expected_failure(), &checks)
    }

    /// Records a failed check for `test_id`, or aborts the test if the limits say so.
    ///
    /// Aborting unwinds with a [`CheckAborted`] payload, without running the panic hook.
    pub(crate) fn record_failure(
        &self,
        test_id: &TestId,
        site: CallSite,
        condition: String,
        locals: Vec<CheckLocal>,
    ) {
        let with_traceback = match self.arena.with_recorder(test_id, |r| r.admission()) {
            Admission::Record { with_traceback } => with_traceback,
            // The aborting failure becomes the test's own failure text, so it always gets one.
            Admission::Abort(_) => true,
        };
        let traceback = if with_traceback {
            self.synthesizer.synthesize(&site, test_id, &locals)
        } else {
            None
        };

        let entry = FailureEntry::new(condition, traceback);
        match self.arena.with_recorder(test_id, |r| r.record_styled(entry, &self.styles)) {
            Ok(disposition) => {
                debug!(test = %test_id, %site, ?disposition, "recorded failed check");
            }
            Err(aborted) => {
                debug!(test = %test_id, %site, reason = %aborted.reason(), "aborting test");
                panic::resume_unwind(Box::new(aborted));
            }
        }
    }
}
