// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Writes the consolidated report at the end of a run.

use crate::{
    barrier::CompletionBarrier,
    channel::ResultChannel,
    config::XunitConfig,
    counters::{CounterSnapshot, SharedCounters},
    errors::WriteReportError,
};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use camino::{Utf8Path, Utf8PathBuf};
use quick_xunit::{DocumentWriter, SerializeError};
use std::io::BufWriter;
use tracing::{info, warn};

/// Writes one report document from a run's counters and channel.
#[derive(Debug)]
pub struct ReportWriter<'cfg> {
    config: &'cfg XunitConfig,
}

impl<'cfg> ReportWriter<'cfg> {
    /// Creates a new writer.
    pub fn new(config: &'cfg XunitConfig) -> Self {
        Self { config }
    }

    /// Writes the report to the configured path.
    ///
    /// The header counts come from `counters`; the body is every fragment drained from
    /// `channel`. The file is written to a temporary location and renamed over the target, so
    /// a failed write never leaves a truncated report behind.
    pub fn write(
        &self,
        counters: &SharedCounters,
        channel: ResultChannel,
        barrier: CompletionBarrier,
    ) -> Result<ReportSummary, WriteReportError> {
        let path = self.config.path();
        let counts = counters.snapshot();
        let header = counts.to_header(self.config.report_name());

        if let Some(dir) = path.parent().filter(|dir| !dir.as_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|error| WriteReportError::CreateDir {
                dir: dir.to_owned(),
                error,
            })?;
        }

        let serialize_err = |error: SerializeError| WriteReportError::Serialize {
            path: path.to_owned(),
            error,
        };

        let atomic_file = AtomicFile::new(path, OverwriteBehavior::AllowOverwrite);
        let fragments = atomic_file
            .write(|file| {
                let mut writer =
                    DocumentWriter::start(BufWriter::new(file), &header).map_err(serialize_err)?;

                let fragments =
                    channel
                        .drain_all(barrier)
                        .map_err(|error| WriteReportError::Drain {
                            path: path.to_owned(),
                            error,
                        })?;
                for fragment in &fragments {
                    writer.write_fragment(fragment).map_err(serialize_err)?;
                }

                let fragments_written = writer.fragments_written();
                writer.finish().map_err(serialize_err)?;
                Ok(fragments_written)
            })
            .map_err(|err| match err {
                atomicwrites::Error::Internal(error) => WriteReportError::Write {
                    path: path.to_owned(),
                    error,
                },
                atomicwrites::Error::User(err) => err,
            })?;

        if fragments as u64 != counts.total() {
            warn!(
                %path,
                counted = counts.total(),
                collected = fragments,
                "number of collected results does not match the counters"
            );
        }
        info!(%path, tests = counts.total(), "wrote xunit report");

        Ok(ReportSummary {
            path: path.to_owned(),
            counts,
            fragments,
        })
    }
}

/// What was written by [`ReportWriter::write`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReportSummary {
    path: Utf8PathBuf,
    counts: CounterSnapshot,
    fragments: usize,
}

impl ReportSummary {
    /// The path of the report.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// The counts in the report header.
    pub fn counts(&self) -> CounterSnapshot {
        self.counts
    }

    /// The number of `<testcase>` elements in the report body.
    pub fn fragments(&self) -> usize {
        self.fragments
    }

    /// Returns true if the body and the header agree.
    pub fn is_consistent(&self) -> bool {
        self.fragments as u64 == self.counts.total()
    }
}
