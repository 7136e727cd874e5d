// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-test callbacks driven by the host test runner.
//!
//! Each worker owns one [`LifecycleHooks`]. For every test the host calls
//! [`on_start`](LifecycleHooks::on_start), then exactly one of
//! [`on_success`](LifecycleHooks::on_success), [`on_failure`](LifecycleHooks::on_failure) or
//! [`on_error`](LifecycleHooks::on_error). Every finishing callback produces one record, which
//! is published and counted exactly once.

use crate::{
    config::XunitConfig,
    context::{RunHandle, WorkerSink},
    errors::{HookError, RunContextError},
    failure::{ExceptionInfo, FailureInfo},
};
use quick_xunit::{Outcome, OutcomeRecord, TestId};
use std::time::{Duration, Instant};
use tracing::{debug, error};

#[derive(Debug)]
struct RunningTest {
    id: String,
    started: Instant,
}

/// The lifecycle callbacks for one worker.
#[derive(Debug)]
pub struct LifecycleHooks {
    sink: WorkerSink,
    store_success_output: bool,
    running: Option<RunningTest>,
}

impl LifecycleHooks {
    /// Creates hooks that submit to `sink`.
    pub fn new(sink: WorkerSink, config: &XunitConfig) -> Self {
        Self {
            sink,
            store_success_output: config.store_success_output(),
            running: None,
        }
    }

    /// Attaches to the run named by the environment.
    ///
    /// Returns `Ok(None)` if this process is not part of a reporting run, in which case the
    /// host should not install hooks at all.
    pub fn from_env(config: &XunitConfig) -> Result<Option<Self>, RunContextError> {
        let Some(handle) = RunHandle::from_env()? else {
            return Ok(None);
        };
        let sink = handle.attach()?;
        debug!(run_dir = %handle.run_dir(), "attached to run");
        Ok(Some(Self::new(sink, config)))
    }

    /// Records the start time for `test`.
    pub fn on_start(&mut self, test: &str) {
        if let Some(previous) = self.running.take() {
            debug!(
                previous = %previous.id,
                test,
                "test started before the previous one finished"
            );
        }
        self.running = Some(RunningTest {
            id: test.to_owned(),
            started: Instant::now(),
        });
    }

    /// Reports a test that raised an error or asked to be skipped.
    pub fn on_error(&mut self, test: &str, failure: FailureInfo) -> Result<(), HookError> {
        let outcome = match failure {
            FailureInfo::Skip { reason } => Outcome::Skip { reason },
            FailureInfo::Exception(info) => Outcome::Error(info.into_detail()),
        };
        self.finish(test, outcome)
    }

    /// Reports a test whose assertion failed.
    pub fn on_failure(&mut self, test: &str, exception: ExceptionInfo) -> Result<(), HookError> {
        self.finish(test, Outcome::Failure(exception.into_detail()))
    }

    /// Reports a test that passed.
    ///
    /// If storing success output is enabled, a short statistics line is attached.
    pub fn on_success(&mut self, test: &str) -> Result<(), HookError> {
        let system_out = self
            .store_success_output
            .then(|| format!("{test}: passed"));
        self.finish(test, Outcome::Pass { system_out })
    }

    /// Reports a test that passed, with its captured output.
    ///
    /// The output is only kept if storing success output is enabled.
    pub fn on_success_with_output(&mut self, test: &str, output: &str) -> Result<(), HookError> {
        let system_out = self.store_success_output.then(|| output.to_owned());
        self.finish(test, Outcome::Pass { system_out })
    }

    /// The number of outcomes submitted by these hooks.
    pub fn submitted(&self) -> usize {
        self.sink.submitted()
    }

    fn finish(&mut self, test: &str, outcome: Outcome) -> Result<(), HookError> {
        let duration = self.take_duration(test);

        let id = match TestId::parse(test) {
            Ok(id) => id,
            Err(parse_error) => {
                error!(test, kind = %outcome.kind(), "dropping outcome with malformed test id");
                return Err(parse_error.into());
            }
        };

        let record = OutcomeRecord::new(id, duration, outcome);
        self.sink.submit(&record).map_err(|publish_error| {
            error!(test, "failed to publish outcome");
            HookError::from(publish_error)
        })
    }

    fn take_duration(&mut self, test: &str) -> Duration {
        match self.running.take() {
            Some(running) if running.id == test => running.started.elapsed(),
            Some(running) => {
                debug!(
                    started = %running.id,
                    test,
                    "finished test does not match started test, using zero duration"
                );
                Duration::ZERO
            }
            None => {
                debug!(test, "no start observed for test, using zero duration");
                Duration::ZERO
            }
        }
    }
}
