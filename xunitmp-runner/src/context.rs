// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-run state shared between the coordinating process and its workers.
//!
//! The coordinator creates a [`RunContext`] before starting any worker. Workers find the run
//! through a [`RunHandle`], usually read from the environment, and [attach](RunHandle::attach)
//! to it to get a [`WorkerSink`].

use crate::{
    barrier::CompletionBarrier,
    channel::{Publisher, ResultChannel},
    config::XunitConfig,
    counters::SharedCounters,
    errors::{PublishError, RunContextError, WriteReportError},
    report::{ReportSummary, ReportWriter},
};
use camino::{Utf8Path, Utf8PathBuf};
use camino_tempfile::Utf8TempDir;
use quick_xunit::OutcomeRecord;
use std::env::{self, VarError};
use tracing::debug;

/// Environment variable naming the run directory. Set for every worker.
pub const RUN_DIR_ENV: &str = "XUNITMP_RUN_DIR";

/// Environment variable holding the zero-based index of a worker.
pub const WORKER_INDEX_ENV: &str = "XUNITMP_WORKER_INDEX";

/// Environment variable holding the total number of workers in the run.
pub const WORKER_COUNT_ENV: &str = "XUNITMP_WORKER_COUNT";

static COUNTERS_FILE_NAME: &str = "counters";
static SPOOL_DIR_NAME: &str = "fragments";

/// Everything that exists for the lifetime of one run.
///
/// Owned by the coordinating process. Dropping the context removes the run directory.
#[derive(Debug)]
pub struct RunContext {
    config: XunitConfig,
    counters: SharedCounters,
    channel: ResultChannel,
    // Declared last so the directory is removed after the counters are unmapped.
    run_dir: Utf8TempDir,
}

impl RunContext {
    /// Creates a run in the system temporary directory.
    pub fn new(config: XunitConfig) -> Result<Self, RunContextError> {
        let parent = Utf8PathBuf::try_from(env::temp_dir())
            .map_err(|error| RunContextError::TempDirNotUtf8 { error })?;
        Self::new_in(config, &parent)
    }

    /// Creates a run in a fresh directory under `parent`.
    pub fn new_in(config: XunitConfig, parent: &Utf8Path) -> Result<Self, RunContextError> {
        let run_dir = camino_tempfile::Builder::new()
            .prefix("xunitmp-run-")
            .tempdir_in(parent)
            .map_err(|error| RunContextError::RunDirCreate {
                parent: parent.to_owned(),
                error,
            })?;

        let counters = SharedCounters::create(&run_dir.path().join(COUNTERS_FILE_NAME))?;
        let channel = ResultChannel::create(&run_dir.path().join(SPOOL_DIR_NAME))?;
        debug!(run_dir = %run_dir.path(), "created run context");

        Ok(Self {
            config,
            counters,
            channel,
            run_dir,
        })
    }

    /// Returns a handle that producers use to find this run.
    pub fn handle(&self) -> RunHandle {
        RunHandle {
            run_dir: self.run_dir.path().to_owned(),
        }
    }

    /// Returns the configuration this run was created with.
    pub fn config(&self) -> &XunitConfig {
        &self.config
    }

    /// Returns the counters for this run.
    pub fn counters(&self) -> &SharedCounters {
        &self.counters
    }

    /// Returns the run directory.
    pub fn run_dir(&self) -> &Utf8Path {
        self.run_dir.path()
    }

    /// Writes the report, consuming the run.
    ///
    /// The barrier proves that every producer has finished, so the counters are final and the
    /// channel holds every fragment.
    pub fn write_report(
        self,
        barrier: CompletionBarrier,
    ) -> Result<ReportSummary, WriteReportError> {
        let Self {
            config,
            counters,
            channel,
            run_dir,
        } = self;

        let summary = ReportWriter::new(&config).write(&counters, channel, barrier);

        drop(counters);
        if let Err(error) = run_dir.close() {
            debug!(%error, "failed to remove run directory");
        }
        summary
    }

    #[cfg(test)]
    pub(crate) fn into_fragments(
        self,
        barrier: CompletionBarrier,
    ) -> Result<Vec<quick_xunit::Fragment>, crate::errors::DrainError> {
        self.channel.drain_all(barrier)
    }
}

/// Locates a run from a producer.
///
/// A handle is just the path to the run directory. It can be passed to threads directly, or to
/// child processes through [`RUN_DIR_ENV`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunHandle {
    run_dir: Utf8PathBuf,
}

impl RunHandle {
    /// Creates a handle for an existing run directory.
    pub fn new(run_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            run_dir: run_dir.into(),
        }
    }

    /// Reads the handle from [`RUN_DIR_ENV`].
    ///
    /// Returns `Ok(None)` if the variable is not set, which means the process is not part of
    /// a reporting run.
    pub fn from_env() -> Result<Option<Self>, RunContextError> {
        match env::var(RUN_DIR_ENV) {
            Ok(run_dir) if run_dir.is_empty() => Ok(None),
            Ok(run_dir) => Ok(Some(Self::new(run_dir))),
            Err(VarError::NotPresent) => Ok(None),
            Err(VarError::NotUnicode(_)) => {
                Err(RunContextError::EnvNotUtf8 { name: RUN_DIR_ENV })
            }
        }
    }

    /// Returns the run directory.
    pub fn run_dir(&self) -> &Utf8Path {
        &self.run_dir
    }

    /// The environment variable a child process needs to find this run.
    pub fn env_var(&self) -> (&'static str, &str) {
        (RUN_DIR_ENV, self.run_dir.as_str())
    }

    /// Maps the run's counters and opens a new spool file for this producer.
    pub fn attach(&self) -> Result<WorkerSink, RunContextError> {
        let counters = SharedCounters::open(&self.run_dir.join(COUNTERS_FILE_NAME))?;
        let channel = ResultChannel::open(&self.run_dir.join(SPOOL_DIR_NAME))?;
        let publisher = channel.publisher()?;
        Ok(WorkerSink {
            counters,
            publisher,
        })
    }
}

/// A producer's connection to a run.
///
/// Each worker process (or producer thread) holds its own sink.
#[derive(Debug)]
pub struct WorkerSink {
    counters: SharedCounters,
    publisher: Publisher,
}

impl WorkerSink {
    /// Serializes `record`, publishes it and counts it.
    ///
    /// The fragment is published before the counter is incremented, so an error leaves neither
    /// the counters nor the channel holding a partial record of this outcome.
    pub fn submit(&mut self, record: &OutcomeRecord) -> Result<(), PublishError> {
        let fragment = record
            .to_fragment()
            .map_err(|error| PublishError::Serialize {
                test: record.id().to_string(),
                error,
            })?;
        self.publisher.publish(&fragment)?;
        self.counters.increment(record.kind());
        debug!(test = %record.id(), kind = %record.kind(), "submitted outcome");
        Ok(())
    }

    /// The number of outcomes submitted through this sink.
    pub fn submitted(&self) -> usize {
        self.publisher.published()
    }

    /// Returns the run's counters.
    pub fn counters(&self) -> &SharedCounters {
        &self.counters
    }
}
