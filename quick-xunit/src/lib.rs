// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Build xUnit XML reports out of independently produced fragments.
//!
//! A [`OutcomeRecord`] describes one finished test. It serializes into a self-contained
//! [`Fragment`], a single `<testcase>` element that can be shipped to another process. A
//! [`DocumentWriter`] later stitches fragments together under one `<testsuite>` root.
//!
//! Escaping is owned by the serializer: no caller-supplied string reaches the output without
//! going through [`sanitize`].

mod errors;
mod record;
pub mod sanitize;
mod serialize;
pub mod text;

pub use errors::*;
pub use record::*;
pub use serialize::{DocumentWriter, ReportHeader};
