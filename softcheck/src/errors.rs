// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by softcheck.

use crate::config::{Color, TracebackStyle};
use camino::{Utf8Path, Utf8PathBuf};
use config::ConfigError;
use std::fmt;
use thiserror::Error;

/// An error that occurred while parsing the softcheck config.
#[derive(Debug, Error)]
#[error("failed to parse softcheck config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8Path {
        &self.config_file
    }

    /// Returns the kind of error this is.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of softcheck configuration error that occurred.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),
}

/// Error returned while parsing a [`CheckLimit`](crate::config::CheckLimit) value from a string.
#[derive(Clone, Debug, Error)]
#[error("error parsing check limit: {message}")]
pub struct CheckLimitParseError {
    message: String,
}

impl CheckLimitParseError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error returned while parsing a [`TracebackStyle`] value from a string.
#[derive(Clone, Debug, Error)]
#[error(
    "unrecognized value for traceback style: {input}\n(known values: {})",
    TracebackStyle::variants().join(", "),
)]
pub struct TracebackStyleParseError {
    input: String,
}

impl TracebackStyleParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// Error returned while parsing a [`Color`] value from a string.
#[derive(Clone, Debug, Error)]
#[error(
    "unrecognized value for color: {input}\n(known values: {})",
    Color::variants().join(", "),
)]
pub struct ColorParseError {
    input: String,
}

impl ColorParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// Why a soft check stopped the test instead of being recorded.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AbortReason {
    /// The run was configured to stop on the first failing check.
    StopOnFail,

    /// The per-test ceiling on recorded failures was reached.
    MaxFail {
        /// The configured ceiling.
        max_fail: usize,
    },
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StopOnFail => write!(f, "stopping on first failed check"),
            Self::MaxFail { max_fail } => write!(f, "max fail of {max_fail} reached"),
        }
    }
}

/// A failing check that aborted the running test.
///
/// This is the unwind payload used when a check escapes its guard on purpose. It is raised with
/// [`std::panic::resume_unwind`], so the panic hook never prints it, and
/// [`CheckSession::run_test`](crate::session::CheckSession::run_test) turns it back into the
/// test's failure text.
#[derive(Clone, Debug, Error)]
#[error("{message}")]
pub struct CheckAborted {
    reason: AbortReason,
    message: String,
}

impl CheckAborted {
    pub(crate) fn new(reason: AbortReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }

    /// Returns the reason the test was aborted.
    pub fn reason(&self) -> AbortReason {
        self.reason
    }

    /// Returns the rendered failure that triggered the abort.
    pub fn message(&self) -> &str {
        &self.message
    }
}
