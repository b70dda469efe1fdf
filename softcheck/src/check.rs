// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The check functions available to test bodies.
//!
//! A [`Checker`] is handed to each test body by
//! [`CheckSession::run_test`](crate::session::CheckSession::run_test). Every check returns
//! whether it passed; a failing check is recorded and the test keeps going.

use crate::{
    errors::CheckAborted,
    helpers::{debug_or_placeholder, panic_description},
    recorder::TestId,
    session::CheckSession,
    traceback::{CallSite, CheckLocal},
};
use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
};

/// Records `$cond` as a soft check, using its source text as the condition.
///
/// ```
/// # use softcheck::{CheckConfig, CheckSession, TestMeta, check};
/// # let session = CheckSession::new(CheckConfig::default());
/// # let _ = session.run_test(&TestMeta::new("doc"), |checker| {
/// let width = 3;
/// check!(checker, width > 2);
/// check!(checker, width < 10, "width {width} is too large");
/// # });
/// ```
#[macro_export]
macro_rules! check {
    ($checker:expr, $cond:expr $(,)?) => {
        $checker.check($cond, ::core::stringify!($cond))
    };
    ($checker:expr, $cond:expr, $($arg:tt)+) => {
        $checker
            .msg(::core::format_args!($($arg)+))
            .check($cond, ::core::stringify!($cond))
    };
}

/// Bounds used by [`Checker::between`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Bounds {
    /// Whether the value may equal the lower bound.
    pub lower_inclusive: bool,
    /// Whether the value may equal the upper bound.
    pub upper_inclusive: bool,
}

impl Bounds {
    /// `lower < value < upper`.
    pub const EXCLUSIVE: Self = Self {
        lower_inclusive: false,
        upper_inclusive: false,
    };

    /// `lower <= value <= upper`.
    pub const INCLUSIVE: Self = Self {
        lower_inclusive: true,
        upper_inclusive: true,
    };

    fn lower_op(self) -> &'static str {
        if self.lower_inclusive { "<=" } else { "<" }
    }

    fn upper_op(self) -> &'static str {
        if self.upper_inclusive { "<=" } else { "<" }
    }
}

/// Tolerances used by [`Checker::almost_equal`] and [`Checker::not_almost_equal`].
///
/// Two values are almost equal if they differ by no more than the larger of `abs` and `rel`
/// times the magnitude of the expected value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerance {
    /// Relative tolerance.
    pub rel: f64,
    /// Absolute tolerance.
    pub abs: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            rel: 1e-6,
            abs: 1e-12,
        }
    }
}

impl Tolerance {
    /// Returns true if `actual` is within tolerance of `expected`.
    pub fn contains(self, actual: f64, expected: f64) -> bool {
        if actual == expected {
            // Also covers equal infinities.
            return true;
        }
        if actual.is_infinite() || expected.is_infinite() {
            return false;
        }
        let allowed = self.abs.max(self.rel * expected.abs());
        (actual - expected).abs() <= allowed
    }
}

/// The handle test bodies use to run soft checks.
#[derive(Clone, Debug)]
pub struct Checker<'a> {
    session: &'a CheckSession,
    test_id: &'a TestId,
    msg: Option<String>,
}

impl<'a> Checker<'a> {
    pub(crate) fn new(session: &'a CheckSession, test_id: &'a TestId) -> Self {
        Self {
            session,
            test_id,
            msg: None,
        }
    }

    /// Returns the test this checker records into.
    pub fn test_id(&self) -> &TestId {
        self.test_id
    }

    /// Returns the number of checks that have failed so far in this test.
    pub fn failure_count(&self) -> usize {
        self.session.arena().count(self.test_id)
    }

    /// Returns a checker that appends `msg` to the condition of every failure it records.
    #[must_use]
    pub fn msg(&self, msg: impl fmt::Display) -> Checker<'a> {
        Checker {
            session: self.session,
            test_id: self.test_id,
            msg: Some(msg.to_string()),
        }
    }

    /// Checks that `condition` holds, describing it as `description` if it doesn't.
    #[track_caller]
    pub fn check(&self, condition: bool, description: impl fmt::Display) -> bool {
        if condition {
            return true;
        }
        self.record_failure(format!("check {description}"), Vec::new())
    }

    /// Records an unconditional failure.
    #[track_caller]
    pub fn fail(&self, reason: impl fmt::Display) -> bool {
        self.record_failure(reason.to_string(), Vec::new())
    }

    /// Checks that `left == right`.
    #[track_caller]
    pub fn equal<L, R>(&self, left: L, right: R) -> bool
    where
        L: PartialEq<R> + fmt::Debug,
        R: fmt::Debug,
    {
        if left == right {
            return true;
        }
        self.record_binary("==", &left, &right)
    }

    /// Checks that `left != right`.
    #[track_caller]
    pub fn not_equal<L, R>(&self, left: L, right: R) -> bool
    where
        L: PartialEq<R> + fmt::Debug,
        R: fmt::Debug,
    {
        if left != right {
            return true;
        }
        self.record_binary("!=", &left, &right)
    }

    /// Checks that `value` is true.
    #[track_caller]
    pub fn is_true(&self, value: bool) -> bool {
        if value {
            return true;
        }
        self.record_failure("check is_true(false)".to_owned(), Vec::new())
    }

    /// Checks that `value` is false.
    #[track_caller]
    pub fn is_false(&self, value: bool) -> bool {
        if !value {
            return true;
        }
        self.record_failure("check is_false(true)".to_owned(), Vec::new())
    }

    /// Checks that `value` is `Some`.
    #[track_caller]
    pub fn is_some<T: fmt::Debug>(&self, value: &Option<T>) -> bool {
        if value.is_some() {
            return true;
        }
        self.record_unary("is Some", value)
    }

    /// Checks that `value` is `None`.
    #[track_caller]
    pub fn is_none<T: fmt::Debug>(&self, value: &Option<T>) -> bool {
        if value.is_none() {
            return true;
        }
        self.record_unary("is None", value)
    }

    /// Checks that `value` is `Ok`.
    #[track_caller]
    pub fn is_ok<T: fmt::Debug, E: fmt::Debug>(&self, value: &Result<T, E>) -> bool {
        if value.is_ok() {
            return true;
        }
        self.record_unary("is Ok", value)
    }

    /// Checks that `value` is `Err`.
    #[track_caller]
    pub fn is_err<T: fmt::Debug, E: fmt::Debug>(&self, value: &Result<T, E>) -> bool {
        if value.is_err() {
            return true;
        }
        self.record_unary("is Err", value)
    }

    /// Checks that `items` contains `item`.
    #[track_caller]
    pub fn is_in<T>(&self, item: &T, items: &[T]) -> bool
    where
        T: PartialEq + fmt::Debug,
    {
        if items.contains(item) {
            return true;
        }
        self.record_binary("in", item, &items)
    }

    /// Checks that `items` doesn't contain `item`.
    #[track_caller]
    pub fn is_not_in<T>(&self, item: &T, items: &[T]) -> bool
    where
        T: PartialEq + fmt::Debug,
    {
        if !items.contains(item) {
            return true;
        }
        self.record_binary("not in", item, &items)
    }

    /// Checks that `left > right`.
    #[track_caller]
    pub fn greater<L, R>(&self, left: L, right: R) -> bool
    where
        L: PartialOrd<R> + fmt::Debug,
        R: fmt::Debug,
    {
        if left > right {
            return true;
        }
        self.record_binary(">", &left, &right)
    }

    /// Checks that `left >= right`.
    #[track_caller]
    pub fn greater_equal<L, R>(&self, left: L, right: R) -> bool
    where
        L: PartialOrd<R> + fmt::Debug,
        R: fmt::Debug,
    {
        if left >= right {
            return true;
        }
        self.record_binary(">=", &left, &right)
    }

    /// Checks that `left < right`.
    #[track_caller]
    pub fn less<L, R>(&self, left: L, right: R) -> bool
    where
        L: PartialOrd<R> + fmt::Debug,
        R: fmt::Debug,
    {
        if left < right {
            return true;
        }
        self.record_binary("<", &left, &right)
    }

    /// Checks that `left <= right`.
    #[track_caller]
    pub fn less_equal<L, R>(&self, left: L, right: R) -> bool
    where
        L: PartialOrd<R> + fmt::Debug,
        R: fmt::Debug,
    {
        if left <= right {
            return true;
        }
        self.record_binary("<=", &left, &right)
    }

    /// Checks that `value` lies between `lower` and `upper`.
    #[track_caller]
    pub fn between<T>(&self, value: T, lower: T, upper: T, bounds: Bounds) -> bool
    where
        T: PartialOrd + fmt::Debug,
    {
        let above_lower = if bounds.lower_inclusive {
            lower <= value
        } else {
            lower < value
        };
        let below_upper = if bounds.upper_inclusive {
            value <= upper
        } else {
            value < upper
        };
        if above_lower && below_upper {
            return true;
        }

        let (value, lower, upper) = (
            debug_or_placeholder(&value),
            debug_or_placeholder(&lower),
            debug_or_placeholder(&upper),
        );
        let condition = format!(
            "check {lower} {} {value} {} {upper}",
            bounds.lower_op(),
            bounds.upper_op(),
        );
        let locals = vec![
            CheckLocal::new("value", value),
            CheckLocal::new("lower", lower),
            CheckLocal::new("upper", upper),
        ];
        self.record_failure(condition, locals)
    }

    /// Checks that `actual` is within the default [`Tolerance`] of `expected`.
    #[track_caller]
    pub fn almost_equal(&self, actual: f64, expected: f64) -> bool {
        self.almost_equal_within(actual, expected, Tolerance::default())
    }

    /// Checks that `actual` is within `tolerance` of `expected`.
    #[track_caller]
    pub fn almost_equal_within(&self, actual: f64, expected: f64, tolerance: Tolerance) -> bool {
        if tolerance.contains(actual, expected) {
            return true;
        }
        self.record_approx("==", actual, expected)
    }

    /// Checks that `actual` is not within the default [`Tolerance`] of `expected`.
    #[track_caller]
    pub fn not_almost_equal(&self, actual: f64, expected: f64) -> bool {
        self.not_almost_equal_within(actual, expected, Tolerance::default())
    }

    /// Checks that `actual` is not within `tolerance` of `expected`.
    #[track_caller]
    pub fn not_almost_equal_within(
        &self,
        actual: f64,
        expected: f64,
        tolerance: Tolerance,
    ) -> bool {
        if !tolerance.contains(actual, expected) {
            return true;
        }
        self.record_approx("!=", actual, expected)
    }

    /// Runs `f`, recording a panic inside it as a single failed check.
    ///
    /// This is the block form of a soft check: ordinary assertions inside `f` become soft.
    /// Returns the value of `f`, or `None` if it panicked.
    #[track_caller]
    pub fn context<T>(&self, f: impl FnOnce() -> T) -> Option<T> {
        let site = CallSite::caller();
        match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => Some(value),
            Err(payload) => {
                if payload.is::<CheckAborted>() || self.session.config().stop_on_fail() {
                    panic::resume_unwind(payload);
                }
                let condition = panic_description(&*payload);
                self.session.record_failure(
                    self.test_id,
                    site,
                    self.with_msg(condition),
                    Vec::new(),
                );
                None
            }
        }
    }

    #[track_caller]
    fn record_unary(&self, what: &str, value: &dyn fmt::Debug) -> bool {
        let value = debug_or_placeholder(value);
        let condition = format!("check {value} {what}");
        self.record_failure(condition, vec![CheckLocal::new("value", value)])
    }

    #[track_caller]
    fn record_binary(&self, op: &str, left: &dyn fmt::Debug, right: &dyn fmt::Debug) -> bool {
        let (left, right) = (debug_or_placeholder(left), debug_or_placeholder(right));
        let condition = format!("check {left} {op} {right}");
        let locals = vec![CheckLocal::new("left", left), CheckLocal::new("right", right)];
        self.record_failure(condition, locals)
    }

    #[track_caller]
    fn record_approx(&self, op: &str, actual: f64, expected: f64) -> bool {
        let condition = format!("check {actual:?} {op} approx({expected:?})");
        let locals = vec![
            CheckLocal::new("actual", format!("{actual:?}")),
            CheckLocal::new("expected", format!("{expected:?}")),
        ];
        self.record_failure(condition, locals)
    }

    /// Records a failure at the caller's location. Always returns false.
    #[track_caller]
    pub(crate) fn record_failure(&self, condition: String, locals: Vec<CheckLocal>) -> bool {
        let site = CallSite::caller();
        self.session
            .record_failure(self.test_id, site, self.with_msg(condition), locals);
        false
    }

    pub(crate) fn session(&self) -> &'a CheckSession {
        self.session
    }

    pub(crate) fn with_msg(&self, condition: String) -> String {
        match &self.msg {
            Some(msg) => format!("{condition}: {msg}"),
            None => condition,
        }
    }
}
