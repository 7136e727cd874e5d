// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::thread::{self, JoinHandle};

/// Proof that every producer for a run has finished.
///
/// [`ResultChannel::drain_all`](crate::channel::ResultChannel::drain_all) and
/// [`RunContext::write_report`](crate::context::RunContext::write_report) require one of these,
/// so the report can only be written after producers have been joined.
///
/// A barrier is obtained by:
///
/// * joining worker processes with [`WorkerSet::join`](crate::workers::WorkerSet::join);
/// * joining in-process producer threads with [`Self::join_threads`];
/// * asserting completion with [`Self::assume_complete`], for callers that manage producers
///   themselves.
#[derive(Debug)]
#[must_use = "a completion barrier is needed to drain the result channel"]
pub struct CompletionBarrier {
    producers: usize,
}

impl CompletionBarrier {
    /// Joins every thread in `handles`, returning a barrier and each thread's result in order.
    ///
    /// A thread that panicked counts as finished: whatever it published before panicking is
    /// still collected.
    pub fn join_threads<T>(
        handles: impl IntoIterator<Item = JoinHandle<T>>,
    ) -> (Self, Vec<thread::Result<T>>) {
        let results: Vec<_> = handles.into_iter().map(JoinHandle::join).collect();
        let barrier = Self {
            producers: results.len(),
        };
        (barrier, results)
    }

    /// Asserts that all `producers` producers have finished.
    ///
    /// The caller is responsible for the assertion being true. Fragments published after the
    /// channel is drained are lost.
    pub fn assume_complete(producers: usize) -> Self {
        Self { producers }
    }

    pub(crate) fn joined_processes(producers: usize) -> Self {
        Self { producers }
    }

    /// The number of producers that were joined.
    pub fn producers(&self) -> usize {
        self.producers
    }
}
