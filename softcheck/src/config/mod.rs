// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for soft checks.
//!
//! The main structure in this module is [`CheckConfig`], which is decided once per run and then
//! passed into a [`CheckSession`](crate::session::CheckSession).

mod imp;
mod limit;
mod style;

pub use imp::*;
pub use limit::*;
pub use style::*;
