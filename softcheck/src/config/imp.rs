// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{CheckLimit, Color, TracebackStyle};
use crate::errors::{ConfigParseError, ConfigParseErrorKind};
use camino::{Utf8Path, Utf8PathBuf};
use config::{
    Config, ConfigBuilder, ConfigError, Environment, File, FileFormat, builder::DefaultState,
};
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Run-wide configuration for soft checks.
///
/// A `CheckConfig` is decided once, before any test starts, and is then shared read-only by every
/// test in the run. It can be built up programmatically from [`CheckConfig::default`], or read
/// from the layered sources described in [`CheckConfig::from_sources`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CheckConfig {
    stop_on_fail: bool,
    max_fail: CheckLimit,
    max_report: CheckLimit,
    max_tb: usize,
    traceback_style: TracebackStyle,
    color: Color,
    show_locals: bool,
    source_root: Option<Utf8PathBuf>,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            stop_on_fail: false,
            max_fail: CheckLimit::Unlimited,
            max_report: CheckLimit::Unlimited,
            max_tb: 1,
            traceback_style: TracebackStyle::Auto,
            color: Color::Auto,
            show_locals: false,
            source_root: None,
        }
    }
}

impl CheckConfig {
    /// The default location of the config within the workspace root.
    pub const CONFIG_PATH: &'static str = ".config/softcheck.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Repository-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../../default-config.toml");

    /// Environment configuration uses this prefix, plus a _.
    pub const ENVIRONMENT_PREFIX: &'static str = "SOFTCHECK";

    // Environment variables with the prefix that configure something other than checks.
    const RESERVED_ENV_KEYS: &'static [&'static str] = &["log"];

    /// Reads the config from the default config, then `file` (or [`Self::CONFIG_PATH`] under
    /// `workspace_root` if `file` is `None`), then `SOFTCHECK_`-prefixed environment variables.
    ///
    /// An explicitly passed in `file` must exist; the default location is optional. Relative
    /// source paths in pseudo-tracebacks are resolved against `workspace_root`.
    pub fn from_sources(
        workspace_root: impl Into<Utf8PathBuf>,
        file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        Self::from_sources_impl(
            workspace_root.into(),
            file,
            Environment::with_prefix(Self::ENVIRONMENT_PREFIX),
        )
    }

    /// Like [`Self::from_sources`], but reads environment overrides from `env` instead of the
    /// process environment.
    pub fn from_sources_with_env(
        workspace_root: impl Into<Utf8PathBuf>,
        file: Option<&Utf8Path>,
        env: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, ConfigParseError> {
        let env = Environment::with_prefix(Self::ENVIRONMENT_PREFIX)
            .source(Some(env.into_iter().collect()));
        Self::from_sources_impl(workspace_root.into(), file, env)
    }

    fn from_sources_impl(
        workspace_root: Utf8PathBuf,
        file: Option<&Utf8Path>,
        env: Environment,
    ) -> Result<Self, ConfigParseError> {
        let (config_file, source) = match file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = workspace_root.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config()
            .add_source(source)
            .add_source(env.try_parsing(true));

        let (deserialized, ignored) = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;

        let unknown: Vec<_> = ignored
            .iter()
            .filter(|key| !Self::RESERVED_ENV_KEYS.contains(&key.as_str()))
            .collect();
        if !unknown.is_empty() {
            warn!(
                config_file = %config_file,
                "ignoring unknown softcheck configuration keys: {}",
                unknown.iter().map(|key| key.as_str()).collect::<Vec<_>>().join(", "),
            );
        }

        let config = deserialized.into_config(workspace_root);
        debug!(?config, "loaded softcheck config");
        Ok(config)
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    /// This returns a tuple of (config, ignored paths).
    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(CheckConfigDeserialize, BTreeSet<String>), ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config: CheckConfigDeserialize = serde_path_to_error::deserialize(ignored_de)
            .map_err(|error| {
                // Both serde_path_to_error and the config crate report the key. We drop the key
                // from the config error for consistency.
                let path = error.path().clone();
                let config_error = error.into_inner();
                let error = match config_error {
                    ConfigError::At { error, .. } => *error,
                    other => other,
                };
                ConfigParseErrorKind::DeserializeError(Box::new(serde_path_to_error::Error::new(
                    path, error,
                )))
            })?;

        Ok((config, ignored))
    }

    /// Returns true if the first failing check should end the test.
    pub fn stop_on_fail(&self) -> bool {
        self.stop_on_fail
    }

    /// Returns the number of failed checks recorded per test before failing checks abort.
    pub fn max_fail(&self) -> CheckLimit {
        self.max_fail
    }

    /// Returns the number of failed checks shown per test report.
    pub fn max_report(&self) -> CheckLimit {
        self.max_report
    }

    /// Returns the number of pseudo-tracebacks rendered per test.
    pub fn max_tb(&self) -> usize {
        self.max_tb
    }

    /// Returns the traceback style.
    pub fn traceback_style(&self) -> TracebackStyle {
        self.traceback_style
    }

    /// Returns the color choice.
    pub fn color(&self) -> Color {
        self.color
    }

    /// Returns true if operand values are rendered under pseudo-tracebacks.
    pub fn show_locals(&self) -> bool {
        self.show_locals
    }

    /// Returns the directory that relative source paths are resolved against, if any.
    pub fn source_root(&self) -> Option<&Utf8Path> {
        self.source_root.as_deref()
    }

    /// Resolves the color choice against stdout, where host runners write reports.
    pub fn use_color(&self) -> bool {
        self.color.should_colorize(supports_color::Stream::Stdout)
    }

    /// Sets whether the first failing check ends the test.
    #[must_use]
    pub fn with_stop_on_fail(mut self, stop_on_fail: bool) -> Self {
        self.stop_on_fail = stop_on_fail;
        self
    }

    /// Applies the host runner's own test-level max-fail.
    ///
    /// A host that stops after the first failing test wants the first failing check to stop the
    /// test as well. Any other value leaves `stop_on_fail` as it is.
    #[must_use]
    pub fn with_host_max_fail(mut self, host_max_fail: Option<usize>) -> Self {
        if host_max_fail == Some(1) {
            self.stop_on_fail = true;
        }
        self
    }

    /// Sets the per-test ceiling on recorded failures.
    #[must_use]
    pub fn with_max_fail(mut self, max_fail: CheckLimit) -> Self {
        self.max_fail = max_fail;
        self
    }

    /// Sets the number of failures shown per report.
    #[must_use]
    pub fn with_max_report(mut self, max_report: CheckLimit) -> Self {
        self.max_report = max_report;
        self
    }

    /// Sets the number of pseudo-tracebacks rendered per test.
    #[must_use]
    pub fn with_max_tb(mut self, max_tb: usize) -> Self {
        self.max_tb = max_tb;
        self
    }

    /// Sets the traceback style.
    #[must_use]
    pub fn with_traceback_style(mut self, traceback_style: TracebackStyle) -> Self {
        self.traceback_style = traceback_style;
        self
    }

    /// Sets the color choice.
    #[must_use]
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Sets whether operand values are rendered.
    #[must_use]
    pub fn with_show_locals(mut self, show_locals: bool) -> Self {
        self.show_locals = show_locals;
        self
    }

    /// Sets the directory relative source paths are resolved against.
    #[must_use]
    pub fn with_source_root(mut self, source_root: impl Into<Utf8PathBuf>) -> Self {
        self.source_root = Some(source_root.into());
        self
    }
}

#[derive(Debug, Deserialize)]
struct CheckConfigDeserialize {
    stop_on_fail: bool,
    max_fail: CheckLimit,
    max_report: CheckLimit,
    max_tb: usize,
    traceback_style: TracebackStyle,
    color: Color,
    show_locals: bool,
}

impl CheckConfigDeserialize {
    fn into_config(self, workspace_root: Utf8PathBuf) -> CheckConfig {
        CheckConfig {
            stop_on_fail: self.stop_on_fail,
            max_fail: self.max_fail,
            max_report: self.max_report,
            max_tb: self.max_tb,
            traceback_style: self.traceback_style,
            color: self.color,
            show_locals: self.show_locals,
            source_root: Some(workspace_root),
        }
    }
}
