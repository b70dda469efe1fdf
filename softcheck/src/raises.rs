// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Checking that a block of code panics.
//!
//! A panic is Rust's exception. [`Checker::raises`] runs a block and checks that it panics in the
//! expected way; a block that doesn't panic, or panics the wrong way, is recorded as a single
//! failed check and the test continues.

use crate::{
    check::Checker,
    errors::CheckAborted,
    helpers::{panic_description, panic_message},
    traceback::CallSite,
};
use regex::Regex;
use std::{
    any::{Any, type_name},
    fmt,
    marker::PhantomData,
    panic::{self, AssertUnwindSafe},
};
use tracing::debug;

/// A view into the payload of a caught panic.
#[derive(Clone, Copy)]
pub struct PanicPayload<'a> {
    payload: &'a (dyn Any + Send),
}

impl<'a> PanicPayload<'a> {
    /// Wraps a panic payload.
    pub fn new(payload: &'a (dyn Any + Send)) -> Self {
        Self { payload }
    }

    /// Returns the panic message, if the panic was raised with `panic!` and friends.
    pub fn message(&self) -> Option<&'a str> {
        panic_message(self.payload)
    }

    /// Returns the payload as a `T`, if it is one.
    pub fn downcast_ref<T: Any>(&self) -> Option<&'a T> {
        self.payload.downcast_ref::<T>()
    }
}

impl fmt::Debug for PanicPayload<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanicPayload")
            .field("message", &self.message())
            .finish_non_exhaustive()
    }
}

/// An expectation about how a block of code panics.
pub trait PanicExpectation {
    /// Returns true if `payload` meets the expectation.
    fn matches(&self, payload: PanicPayload<'_>) -> bool;

    /// Describes the expected panic, for failure messages.
    fn describe(&self) -> String;
}

/// Expects any panic at all.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnyPanic;

impl PanicExpectation for AnyPanic {
    fn matches(&self, _payload: PanicPayload<'_>) -> bool {
        true
    }

    fn describe(&self) -> String {
        "a panic".to_owned()
    }
}

/// Expects a panic whose message contains a substring.
#[derive(Clone, Debug)]
pub struct PanicMessage {
    contains: String,
}

impl PanicMessage {
    /// Expects a panic message containing `contains`.
    pub fn new(contains: impl Into<String>) -> Self {
        Self {
            contains: contains.into(),
        }
    }
}

impl PanicExpectation for PanicMessage {
    fn matches(&self, payload: PanicPayload<'_>) -> bool {
        payload
            .message()
            .is_some_and(|message| message.contains(&self.contains))
    }

    fn describe(&self) -> String {
        format!("a panic containing {:?}", self.contains)
    }
}

/// Expects a panic whose message matches a regular expression.
#[derive(Clone, Debug)]
pub struct PanicMatches {
    regex: Regex,
}

impl PanicMatches {
    /// Expects a panic message matching `regex`.
    pub fn new(regex: Regex) -> Self {
        Self { regex }
    }
}

impl PanicExpectation for PanicMatches {
    fn matches(&self, payload: PanicPayload<'_>) -> bool {
        payload
            .message()
            .is_some_and(|message| self.regex.is_match(message))
    }

    fn describe(&self) -> String {
        format!("a panic matching /{}/", self.regex)
    }
}

/// Expects a panic raised with a payload of type `T`, as with [`std::panic::panic_any`].
pub struct PanicPayloadOf<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> PanicPayloadOf<T> {
    /// Expects a payload of type `T`.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for PanicPayloadOf<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for PanicPayloadOf<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PanicPayloadOf<{}>", type_name::<T>())
    }
}

impl<T: Any> PanicExpectation for PanicPayloadOf<T> {
    fn matches(&self, payload: PanicPayload<'_>) -> bool {
        payload.downcast_ref::<T>().is_some()
    }

    fn describe(&self) -> String {
        format!("a panic with a payload of type {}", type_name::<T>())
    }
}

impl Checker<'_> {
    /// Runs `f` and checks that it panics as `expected` describes.
    ///
    /// A matching panic is absorbed. If `f` returns normally, or panics some other way, one
    /// failed check is recorded and the other panic is absorbed as well, unless the run stops
    /// on the first failure, in which case the other panic carries on unwinding.
    #[track_caller]
    pub fn raises<T>(&self, expected: impl PanicExpectation, f: impl FnOnce() -> T) -> bool {
        let site = CallSite::caller();
        let payload = match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(_) => {
                let condition = format!("expected {}, but nothing panicked", expected.describe());
                self.session()
                    .record_failure(self.test_id(), site, self.with_msg(condition), Vec::new());
                return false;
            }
            Err(payload) => payload,
        };

        // A check inside the block that ended the test is not the panic being checked for.
        if payload.is::<CheckAborted>() {
            panic::resume_unwind(payload);
        }

        if expected.matches(PanicPayload::new(&*payload)) {
            debug!(test = %self.test_id(), "block panicked as expected");
            return true;
        }

        if self.session().config().stop_on_fail() {
            panic::resume_unwind(payload);
        }

        let condition = format!(
            "expected {}, but got a panic with message {:?}",
            expected.describe(),
            panic_description(&*payload),
        );
        self.session()
            .record_failure(self.test_id(), site, self.with_msg(condition), Vec::new());
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{CheckConfig, TracebackStyle},
        recorder::TestId,
        session::CheckSession,
    };
    use pretty_assertions::assert_eq;

    #[derive(Debug)]
    struct CustomPayload;

    fn session() -> CheckSession {
        CheckSession::new(CheckConfig::default().with_traceback_style(TracebackStyle::No))
    }

    #[test]
    fn matching_panics_are_absorbed() {
        let session = session();
        let test_id = TestId::new("raises::matching");
        let c = session.checker(&test_id);

        assert!(c.raises(AnyPanic, || panic!("boom")));
        assert!(c.raises(PanicMessage::new("index out of"), || {
            let v: Vec<u8> = Vec::new();
            v[3]
        }));
        assert!(c.raises(PanicMatches::new(Regex::new(r"^code \d+$").unwrap()), || {
            panic!("code {}", 42)
        }));
        assert!(c.raises(PanicPayloadOf::<CustomPayload>::new(), || {
            panic::panic_any(CustomPayload)
        }));

        assert!(session.arena().drain(&test_id).is_empty());
    }

    #[test]
    fn missing_and_mismatched_panics_are_recorded() {
        let session = session();
        let test_id = TestId::new("raises::mismatched");
        let c = session.checker(&test_id);

        assert!(!c.raises(AnyPanic, || 1 + 1));
        assert!(!c.raises(PanicMessage::new("overflow"), || panic!("underflow")));
        assert!(!c.msg("custom payload").raises(
            PanicPayloadOf::<CustomPayload>::new(),
            || panic!("plain message"),
        ));

        let drained = session.arena().drain(&test_id);
        assert_eq!(
            drained.failures(),
            [
                "FAILURE: expected a panic, but nothing panicked",
                "FAILURE: expected a panic containing \"overflow\", but got a panic with message \"underflow\"",
                "FAILURE: expected a panic with a payload of type softcheck::raises::tests::CustomPayload, \
                 but got a panic with message \"plain message\": custom payload",
            ]
        );
    }

    #[test]
    fn mismatch_resumes_under_stop_on_fail() {
        let session = CheckSession::new(CheckConfig::default().with_stop_on_fail(true));
        let test_id = TestId::new("raises::stop_on_fail");
        let c = session.checker(&test_id);

        let payload = panic::catch_unwind(AssertUnwindSafe(|| {
            c.raises(PanicMessage::new("expected"), || panic!("something else"));
        }))
        .expect_err("the original panic carries on");
        assert_eq!(panic_message(&*payload), Some("something else"));
        assert!(session.arena().drain(&test_id).is_empty());
    }
}
