// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pseudo-tracebacks for failed checks.
//!
//! By the time a check knows it has failed, the real stack is inside softcheck. What the test
//! author wants to see is the line of their own test that ran the check, so every check entry
//! point is `#[track_caller]` and hands its [`CallSite`] down to the [`TracebackSynthesizer`].

use crate::{
    config::{CheckConfig, TracebackStyle},
    helpers::Styles,
    recorder::TestId,
};
use camino::Utf8PathBuf;
use owo_colors::OwoColorize;
use std::{
    fmt,
    panic::Location,
    path::{Path, PathBuf},
};
use swrite::{SWrite, swrite};
use tracing::trace;

/// The source location a check was called from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CallSite {
    file: &'static str,
    line: u32,
    column: u32,
}

impl CallSite {
    /// Returns the call site of the function this is called from.
    ///
    /// This follows `#[track_caller]` chains, so inside a check it returns the test's own line.
    #[track_caller]
    pub fn caller() -> Self {
        Self::from(Location::caller())
    }

    /// Creates a call site from its parts.
    pub fn new(file: &'static str, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }

    /// Returns the source file, as the compiler reported it.
    pub fn file(&self) -> &'static str {
        self.file
    }

    /// Returns the 1-based line number.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Returns the 1-based column number.
    pub fn column(&self) -> u32 {
        self.column
    }
}

impl From<&'static Location<'static>> for CallSite {
    fn from(location: &'static Location<'static>) -> Self {
        Self {
            file: location.file(),
            line: location.line(),
            column: location.column(),
        }
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A named value that took part in a failed check, such as the two sides of an `equal`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CheckLocal {
    name: &'static str,
    value: String,
}

impl CheckLocal {
    /// Creates a new local.
    pub fn new(name: &'static str, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }

    /// Returns the name of the local.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the rendered value.
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Builds pseudo-tracebacks anchored at a check's call site.
#[derive(Clone, Debug)]
pub struct TracebackSynthesizer {
    style: TracebackStyle,
    show_locals: bool,
    source_root: Option<Utf8PathBuf>,
    styles: Styles,
}

impl TracebackSynthesizer {
    /// Creates a synthesizer for the given config, rendering without color.
    pub fn new(config: &CheckConfig) -> Self {
        Self::with_styles(config, Styles::default())
    }

    pub(crate) fn with_styles(config: &CheckConfig, styles: Styles) -> Self {
        Self {
            style: config.traceback_style(),
            show_locals: config.show_locals(),
            source_root: config.source_root().map(|root| root.to_owned()),
            styles,
        }
    }

    /// Returns the pseudo-traceback for a check that failed at `site` while running `test_id`.
    ///
    /// Returns `None` if tracebacks are turned off, in which case the failure is reported with
    /// just its message.
    pub fn synthesize(
        &self,
        site: &CallSite,
        test_id: &TestId,
        locals: &[CheckLocal],
    ) -> Option<String> {
        if self.style.is_off() {
            return None;
        }

        let mut out = String::new();
        swrite!(out, "{}", site.style(self.styles.location));

        if self.style.shows_source() {
            swrite!(out, " in {test_id}");
            if let Some(source) = self.source_line(site) {
                let marker = match self.style {
                    TracebackStyle::Short => "    ",
                    _ => ">   ",
                };
                swrite!(out, "\n{marker}{}", source.trim().style(self.styles.source));
            }
        }

        if self.show_locals {
            for local in locals {
                swrite!(
                    out,
                    "\n    {} = {}",
                    local.name.style(self.styles.local_name),
                    local.value,
                );
            }
        }

        Some(out)
    }

    fn source_line(&self, site: &CallSite) -> Option<String> {
        let index = usize::try_from(site.line).ok()?.checked_sub(1)?;
        for path in self.candidate_paths(site.file) {
            if let Ok(contents) = std::fs::read_to_string(&path) {
                return contents.lines().nth(index).map(|line| line.to_owned());
            }
        }

        trace!(file = site.file, "source file for call site not found");
        None
    }

    /// Returns the places `file` might live.
    ///
    /// The compiler reports paths relative to the directory it was run from, which is usually the
    /// workspace root, while tests usually run from their package directory.
    fn candidate_paths(&self, file: &str) -> Vec<PathBuf> {
        let file = Path::new(file);
        if file.is_absolute() {
            return vec![file.to_owned()];
        }

        let mut paths = vec![file.to_owned()];
        if let Some(root) = &self.source_root {
            paths.push(root.as_std_path().join(file));
        }
        if let Ok(cwd) = std::env::current_dir() {
            paths.extend(cwd.ancestors().skip(1).map(|dir| dir.join(file)));
        }
        paths
    }
}
