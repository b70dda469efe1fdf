// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-test log of failed checks.
//!
//! Each running test gets its own [`FailureRecorder`], created the first time a check fails and
//! kept in a [`RecorderArena`] under the test's [`TestId`]. The arena is drained exactly once per
//! test, after the test body has finished, so failures never leak from one test into the next.

use crate::{
    config::{CheckConfig, CheckLimit},
    errors::{AbortReason, CheckAborted},
    helpers::Styles,
};
use owo_colors::OwoColorize;
use std::{
    collections::HashMap,
    fmt,
    sync::{Mutex, PoisonError},
};
use swrite::{SWrite, swrite};
use tracing::debug;

/// The identity of a test, as the host runner names it.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TestId(String);

impl TestId {
    /// Creates a new test identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TestId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// One failed check.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FailureEntry {
    condition: String,
    traceback: Option<String>,
}

impl FailureEntry {
    /// Creates a new entry from the condition text that failed and its pseudo-traceback.
    pub fn new(condition: impl Into<String>, traceback: Option<String>) -> Self {
        Self {
            condition: condition.into(),
            traceback,
        }
    }

    /// Returns the condition text that failed.
    pub fn condition(&self) -> &str {
        &self.condition
    }

    /// Returns the pseudo-traceback, if one was rendered.
    pub fn traceback(&self) -> Option<&str> {
        self.traceback.as_deref()
    }

    pub(crate) fn render(&self, styles: &Styles) -> String {
        let mut out = String::new();
        swrite!(out, "{}{}", "FAILURE: ".style(styles.fail), self.condition);
        if let Some(traceback) = &self.traceback {
            swrite!(out, "\n{traceback}\n");
        }
        out
    }
}

/// The limits a recorder enforces, taken from the run's [`CheckConfig`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RecorderLimits {
    stop_on_fail: bool,
    max_fail: CheckLimit,
    max_report: CheckLimit,
    max_tb: usize,
}

impl RecorderLimits {
    /// Returns the limits configured in `config`.
    pub fn from_config(config: &CheckConfig) -> Self {
        Self {
            stop_on_fail: config.stop_on_fail(),
            max_fail: config.max_fail(),
            max_report: config.max_report(),
            max_tb: config.max_tb(),
        }
    }
}

/// What happens to the next failed check in a test.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Admission {
    /// The failure will be counted, and recorded with or without a pseudo-traceback.
    Record {
        /// Whether the failure gets a pseudo-traceback.
        with_traceback: bool,
    },

    /// The failure will end the test instead.
    Abort(AbortReason),
}

/// Whether a counted failure made it into the report.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RecordDisposition {
    /// The entry is part of the report.
    Recorded,

    /// The entry was counted but is beyond `max_report`.
    Hidden,
}

/// The failed checks of a single test.
#[derive(Clone, Debug)]
pub struct FailureRecorder {
    limits: RecorderLimits,
    entries: Vec<FailureEntry>,
    num_failures: usize,
}

impl FailureRecorder {
    /// Creates an empty recorder.
    pub fn new(limits: RecorderLimits) -> Self {
        Self {
            limits,
            entries: Vec::new(),
            num_failures: 0,
        }
    }

    /// Returns what will happen to the next failed check.
    pub fn admission(&self) -> Admission {
        if self.limits.stop_on_fail {
            Admission::Abort(AbortReason::StopOnFail)
        } else if let Some(max_fail) = self
            .limits
            .max_fail
            .count()
            .filter(|&max_fail| self.num_failures >= max_fail)
        {
            Admission::Abort(AbortReason::MaxFail { max_fail })
        } else {
            Admission::Record {
                with_traceback: self.num_failures < self.limits.max_tb,
            }
        }
    }

    /// Records a failed check.
    ///
    /// Returns an error, without recording anything, if the failure must end the test instead:
    /// either because `stop_on_fail` is set, or because `max_fail` failures have already been
    /// recorded.
    pub fn record(&mut self, entry: FailureEntry) -> Result<RecordDisposition, CheckAborted> {
        self.record_styled(entry, &Styles::default())
    }

    pub(crate) fn record_styled(
        &mut self,
        entry: FailureEntry,
        styles: &Styles,
    ) -> Result<RecordDisposition, CheckAborted> {
        if let Admission::Abort(reason) = self.admission() {
            return Err(CheckAborted::new(reason, abort_message(entry.render(styles), reason)));
        }

        self.num_failures += 1;
        if self.limits.max_report.is_reached(self.entries.len()) {
            Ok(RecordDisposition::Hidden)
        } else {
            self.entries.push(entry);
            Ok(RecordDisposition::Recorded)
        }
    }

    /// Returns the recorded entries, up to `max_report` of them.
    pub fn entries(&self) -> &[FailureEntry] {
        &self.entries
    }

    /// Returns the recorded entries rendered as standalone text blocks.
    pub fn get_failures(&self) -> Vec<String> {
        self.render_failures(&Styles::default())
    }

    pub(crate) fn render_failures(&self, styles: &Styles) -> Vec<String> {
        self.entries.iter().map(|entry| entry.render(styles)).collect()
    }

    /// Returns the number of failed checks, including those beyond `max_report`.
    pub fn get_count(&self) -> usize {
        self.num_failures
    }

    /// Resets the recorder to empty.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.num_failures = 0;
    }
}

fn abort_message(rendered: String, reason: AbortReason) -> String {
    let rendered = rendered.trim_end();
    match reason {
        AbortReason::StopOnFail => rendered.to_owned(),
        AbortReason::MaxFail { .. } => format!("{rendered}\n({reason})"),
    }
}

/// Everything recorded for one test, taken out of the arena when the test finishes.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DrainedChecks {
    count: usize,
    failures: Vec<String>,
}

impl DrainedChecks {
    /// Creates a new set of drained checks.
    pub fn new(count: usize, failures: Vec<String>) -> Self {
        Self { count, failures }
    }

    /// Returns the true number of failed checks.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns the rendered failures, truncated to `max_report`.
    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    /// Returns true if no check failed.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Recorders for every test currently running, keyed by test.
#[derive(Debug)]
pub struct RecorderArena {
    limits: RecorderLimits,
    recorders: Mutex<HashMap<TestId, FailureRecorder>>,
}

impl RecorderArena {
    /// Creates an empty arena whose recorders enforce `limits`.
    pub fn new(limits: RecorderLimits) -> Self {
        Self {
            limits,
            recorders: Mutex::new(HashMap::new()),
        }
    }

    /// Runs `f` against the recorder for `test_id`, creating it if it doesn't exist yet.
    pub fn with_recorder<T>(
        &self,
        test_id: &TestId,
        f: impl FnOnce(&mut FailureRecorder) -> T,
    ) -> T {
        // A panic while the lock is held can't leave a recorder half-updated, so poisoning is
        // safe to ignore.
        let mut recorders = self.recorders.lock().unwrap_or_else(PoisonError::into_inner);
        let recorder = recorders
            .entry(test_id.clone())
            .or_insert_with(|| FailureRecorder::new(self.limits));
        f(recorder)
    }

    /// Returns the number of failed checks recorded so far for `test_id`.
    pub fn count(&self, test_id: &TestId) -> usize {
        let recorders = self.recorders.lock().unwrap_or_else(PoisonError::into_inner);
        recorders.get(test_id).map_or(0, |recorder| recorder.get_count())
    }

    /// Removes and returns everything recorded for `test_id`.
    ///
    /// This must be called once per test, after the test body has finished.
    pub fn drain(&self, test_id: &TestId) -> DrainedChecks {
        self.drain_styled(test_id, &Styles::default())
    }

    pub(crate) fn drain_styled(&self, test_id: &TestId, styles: &Styles) -> DrainedChecks {
        let recorder = {
            let mut recorders = self.recorders.lock().unwrap_or_else(PoisonError::into_inner);
            recorders.remove(test_id)
        };

        match recorder {
            Some(mut recorder) => {
                let drained = DrainedChecks::new(
                    recorder.get_count(),
                    recorder.render_failures(styles),
                );
                recorder.clear();
                debug!(
                    test = %test_id,
                    count = drained.count(),
                    shown = drained.failures().len(),
                    "drained failed checks",
                );
                drained
            }
            None => DrainedChecks::default(),
        }
    }
}
