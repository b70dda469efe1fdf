// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Soft assertions for Rust tests.
//!
//! A soft check records its failure and lets the test keep going. When the test finishes, every
//! failed check is reported together, along with anything the test body itself raised:
//!
//! ```
//! use softcheck::{CheckConfig, CheckSession, TestMeta};
//!
//! let session = CheckSession::new(CheckConfig::default());
//! let outcome = session.run_test(&TestMeta::new("widths"), |c| {
//!     c.equal(3, 4);
//!     c.less(10, 2);
//! });
//!
//! let report = outcome.failure_report().expect("two checks failed");
//! assert_eq!(report.failed_checks(), Some(2));
//! ```
//!
//! Run-wide limits (stop on first failure, per-test ceilings on recorded and reported failures,
//! traceback styles) are set through [`CheckConfig`].

pub mod adapter;
pub mod check;
pub mod config;
pub mod errors;
mod helpers;
pub mod raises;
pub mod recorder;
pub mod session;
pub mod traceback;

pub use adapter::{FailureReport, NativeOutcome, TestOutcome};
pub use check::{Bounds, Checker, Tolerance};
pub use config::{CheckConfig, CheckLimit, Color, TracebackStyle};
pub use raises::{AnyPanic, PanicExpectation, PanicMatches, PanicMessage, PanicPayloadOf};
pub use session::{CheckSession, TestMeta, TestReturn};
