// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! General support code for softcheck.

use owo_colors::Style;
use std::{
    any::Any,
    fmt,
    panic::{self, AssertUnwindSafe},
};

/// Utilities for pluralizing various words based on count or plurality.
pub mod plural {
    /// Returns "check" if `count` is 1, otherwise "checks".
    pub fn checks_str(count: usize) -> &'static str {
        if count == 1 { "check" } else { "checks" }
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Styles {
    pub(crate) fail: Style,
    pub(crate) location: Style,
    pub(crate) source: Style,
    pub(crate) local_name: Style,
    pub(crate) count: Style,
}

impl Styles {
    pub(crate) fn new(use_color: bool) -> Self {
        let mut styles = Self::default();
        if use_color {
            styles.colorize();
        }
        styles
    }

    pub(crate) fn colorize(&mut self) {
        self.fail = Style::new().red().bold();
        self.location = Style::new().yellow();
        self.source = Style::new().bold();
        self.local_name = Style::new().cyan();
        self.count = Style::new().bold();
    }
}

/// Displays a value with `Debug`, falling back to a placeholder if the `Debug` impl panics.
///
/// Failed checks are formatted while a test is running, and a broken `Debug` impl in test code
/// must not cost the failure itself.
pub(crate) fn debug_or_placeholder<T: fmt::Debug + ?Sized>(value: &T) -> String {
    panic::catch_unwind(AssertUnwindSafe(|| format!("{value:?}")))
        .unwrap_or_else(|_| "<Debug impl panicked>".to_owned())
}

/// Returns the message inside a panic payload, if it's one of the types `panic!` produces.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> Option<&str> {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        Some(s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        Some(s.as_str())
    } else {
        None
    }
}

/// Returns the message inside a panic payload, or a description of the payload otherwise.
pub(crate) fn panic_description(payload: &(dyn Any + Send)) -> String {
    match panic_message(payload) {
        Some(message) => message.to_owned(),
        None => "Box<dyn Any>".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Exploding;

    impl fmt::Debug for Exploding {
        fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
            panic!("no Debug for you");
        }
    }

    #[test]
    fn debug_fallback() {
        assert_eq!(debug_or_placeholder(&vec![1, 2]), "[1, 2]");
        assert_eq!(debug_or_placeholder(&Exploding), "<Debug impl panicked>");
    }

    #[test]
    fn panic_payloads() {
        let static_payload: Box<dyn Any + Send> = Box::new("static");
        let owned_payload: Box<dyn Any + Send> = Box::new("owned".to_owned());
        let other_payload: Box<dyn Any + Send> = Box::new(42u32);

        assert_eq!(panic_message(&*static_payload), Some("static"));
        assert_eq!(panic_message(&*owned_payload), Some("owned"));
        assert_eq!(panic_message(&*other_payload), None);
        assert_eq!(panic_description(&*other_payload), "Box<dyn Any>");
    }
}
