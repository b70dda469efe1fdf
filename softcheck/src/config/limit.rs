// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::CheckLimitParseError;
use serde::Deserialize;
use std::{fmt, str::FromStr};

/// A per-test ceiling on failed checks, used for `max_fail` and `max_report`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
pub enum CheckLimit {
    /// At most this many failed checks.
    Count(#[cfg_attr(test, strategy(1usize..64))] usize),

    /// No ceiling.
    #[default]
    Unlimited,
}

impl CheckLimit {
    /// Returns the limit as an optional count.
    pub fn count(self) -> Option<usize> {
        match self {
            Self::Count(n) => Some(n),
            Self::Unlimited => None,
        }
    }

    /// Returns true if `seen` failures have reached this limit.
    pub fn is_reached(self, seen: usize) -> bool {
        match self {
            Self::Count(n) => seen >= n,
            Self::Unlimited => false,
        }
    }
}

impl FromStr for CheckLimit {
    type Err = CheckLimitParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        if lower == "all" || lower == "none" {
            return Ok(Self::Unlimited);
        }

        let count = s
            .parse::<isize>()
            .map_err(|e| CheckLimitParseError::new(format!("{e} parsing '{s}'")))?;

        if count <= 0 {
            return Err(CheckLimitParseError::new("check limit may not be <= 0"));
        }

        Ok(Self::Count(count as usize))
    }
}

impl fmt::Display for CheckLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::Unlimited => write!(f, "all"),
        }
    }
}

impl<'de> Deserialize<'de> for CheckLimit {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;

        impl serde::de::Visitor<'_> for V {
            type Value = CheckLimit;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(formatter, "a positive integer or the string \"all\"")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if v == "all" || v == "none" {
                    return Ok(CheckLimit::Unlimited);
                }

                // If v is a string that represents a number, suggest using the
                // integer form.
                if let Ok(val) = v.parse::<i64>() {
                    let expected = if val > 0 {
                        "the string \"all\" (numbers must be specified without quotes)"
                    } else {
                        "the string \"all\" (numbers must be positive and without quotes)"
                    };
                    return Err(serde::de::Error::invalid_value(
                        serde::de::Unexpected::Str(v),
                        &expected,
                    ));
                }

                Err(serde::de::Error::invalid_value(
                    serde::de::Unexpected::Str(v),
                    &"the string \"all\" or a positive integer",
                ))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if v > 0 {
                    Ok(CheckLimit::Count(v as usize))
                } else {
                    Err(serde::de::Error::invalid_value(
                        serde::de::Unexpected::Signed(v),
                        &"a positive integer or the string \"all\"",
                    ))
                }
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if v > 0 {
                    Ok(CheckLimit::Count(v as usize))
                } else {
                    Err(serde::de::Error::invalid_value(
                        serde::de::Unexpected::Unsigned(v),
                        &"a positive integer or the string \"all\"",
                    ))
                }
            }
        }

        deserializer.deserialize_any(V)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_strategy::proptest;

    #[test]
    fn check_limit_from_str() {
        let successes = vec![
            ("all", CheckLimit::Unlimited),
            ("ALL", CheckLimit::Unlimited),
            ("none", CheckLimit::Unlimited),
            ("1", CheckLimit::Count(1)),
            ("25", CheckLimit::Count(25)),
        ];

        let failures = vec!["-1", "0", "foo", "1.5", ""];

        for (input, output) in successes {
            assert_eq!(
                CheckLimit::from_str(input).unwrap_or_else(|err| panic!(
                    "expected input '{input}' to succeed, failed with: {err}"
                )),
                output,
                "success case '{input}' matches",
            );
        }

        for input in failures {
            CheckLimit::from_str(input).expect_err(&format!("expected input '{input}' to fail"));
        }
    }

    #[test]
    fn is_reached() {
        assert!(!CheckLimit::Unlimited.is_reached(usize::MAX));
        assert!(!CheckLimit::Count(2).is_reached(1));
        assert!(CheckLimit::Count(2).is_reached(2));
        assert!(CheckLimit::Count(2).is_reached(3));
    }

    #[proptest(cases = 64)]
    fn display_from_str_agree(limit: CheckLimit) {
        let displayed = limit.to_string();
        assert_eq!(CheckLimit::from_str(&displayed).expect("display output parses"), limit);
    }
}
