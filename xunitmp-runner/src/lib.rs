// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core functionality for [xunitmp](https://crates.io/crates/xunitmp): collecting test
//! outcomes from many worker processes into a single xUnit report.
//!
//! The flow of a run:
//!
//! 1. The coordinator creates a [`context::RunContext`], which sets up the shared counters and
//!    the result channel in a fresh run directory.
//! 2. Workers are started with the run's [`context::RunHandle`] in their environment, for
//!    example with [`workers::WorkerSet`].
//! 3. In each worker, the host test runner drives [`hooks::LifecycleHooks`], which publishes
//!    one fragment and increments one counter per finished test.
//! 4. Once every worker has been joined, the coordinator holds a
//!    [`barrier::CompletionBarrier`] and calls [`context::RunContext::write_report`].

pub mod barrier;
pub mod channel;
pub mod config;
pub mod context;
pub mod counters;
pub mod errors;
pub mod failure;
pub mod hooks;
pub mod report;
pub mod workers;
