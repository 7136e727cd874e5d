// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Run a test command across worker processes and merge their results into one xUnit report.
//!
//! `xunitmp run --with-xunit -j 4 -- <command>` starts four copies of `<command>`. Each worker
//! finds the run through the `XUNITMP_RUN_DIR` environment variable and reports its outcomes
//! through [`xunitmp_runner::hooks::LifecycleHooks`]. Once every worker has exited, the report
//! is written to `xunit.xml`, or the path given by `--xunit-file`.

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::{OutputContext, StderrStyles};
