// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::{ColorParseError, TracebackStyleParseError};
use serde::{Deserialize, Deserializer};
use std::{fmt, str::FromStr};

/// How much location context to render for each failed check.
///
/// The values mirror the `--tb` choices of a host test runner, so a host's setting can be passed
/// through as is.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
pub enum TracebackStyle {
    /// Same as [`Self::Long`].
    #[default]
    Auto,

    /// The call site, its source line, and locals if enabled.
    Long,

    /// The call site and its source line.
    Short,

    /// Only the call site.
    Line,

    /// Same as [`Self::Long`].
    Native,

    /// No pseudo-traceback at all: just the failure message.
    No,
}

impl TracebackStyle {
    /// Returns string representations of all known variants.
    pub fn variants() -> &'static [&'static str] {
        &["auto", "long", "short", "line", "native", "no"]
    }

    /// Returns true if pseudo-tracebacks are turned off.
    pub fn is_off(self) -> bool {
        self == Self::No
    }

    /// Returns true if this style renders the source line of the call site.
    pub fn shows_source(self) -> bool {
        !matches!(self, Self::Line | Self::No)
    }
}

impl fmt::Display for TracebackStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Long => write!(f, "long"),
            Self::Short => write!(f, "short"),
            Self::Line => write!(f, "line"),
            Self::Native => write!(f, "native"),
            Self::No => write!(f, "no"),
        }
    }
}

impl FromStr for TracebackStyle {
    type Err = TracebackStyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let val = match s {
            "auto" => Self::Auto,
            "long" => Self::Long,
            "short" => Self::Short,
            "line" => Self::Line,
            "native" => Self::Native,
            "no" => Self::No,
            other => return Err(TracebackStyleParseError::new(other)),
        };
        Ok(val)
    }
}

/// Whether to produce colored reports.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
pub enum Color {
    /// Colorize if the output stream supports it.
    #[default]
    Auto,

    /// Always colorize.
    Always,

    /// Never colorize.
    Never,
}

impl Color {
    /// Returns string representations of all known variants.
    pub fn variants() -> &'static [&'static str] {
        &["auto", "always", "never"]
    }

    /// Resolves this choice against the color support of `stream`.
    pub fn should_colorize(self, stream: supports_color::Stream) -> bool {
        match self {
            Color::Auto => supports_color::on_cached(stream).is_some(),
            Color::Always => true,
            Color::Never => false,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Always => write!(f, "always"),
            Self::Never => write!(f, "never"),
        }
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let val = match s {
            "auto" => Self::Auto,
            "always" | "yes" => Self::Always,
            "never" | "no" => Self::Never,
            other => return Err(ColorParseError::new(other)),
        };
        Ok(val)
    }
}

impl<'de> Deserialize<'de> for TracebackStyle {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserialize_from_str(deserializer)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserialize_from_str(deserializer)
    }
}

// Goes through FromStr so config errors list the known values.
fn deserialize_from_str<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_strategy::proptest;

    #[proptest(cases = 16)]
    fn traceback_style_display_round_trips(style: TracebackStyle) {
        assert_eq!(style.to_string().parse::<TracebackStyle>().unwrap(), style);
        assert!(TracebackStyle::variants().contains(&style.to_string().as_str()));
    }

    #[proptest(cases = 16)]
    fn color_display_round_trips(color: Color) {
        assert_eq!(color.to_string().parse::<Color>().unwrap(), color);
    }

    #[test]
    fn color_aliases() {
        assert_eq!("yes".parse::<Color>().unwrap(), Color::Always);
        assert_eq!("no".parse::<Color>().unwrap(), Color::Never);
        assert!(!Color::Never.should_colorize(supports_color::Stream::Stdout));
        assert!(Color::Always.should_colorize(supports_color::Stream::Stdout));
    }

    #[test]
    fn unknown_values() {
        let error = "verbose".parse::<TracebackStyle>().unwrap_err();
        assert_eq!(
            error.to_string(),
            "unrecognized value for traceback style: verbose\n\
             (known values: auto, long, short, line, native, no)"
        );
        "sometimes".parse::<Color>().unwrap_err();
    }
}
