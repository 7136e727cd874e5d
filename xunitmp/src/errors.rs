// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;
use xunitmp_runner::errors::{
    ConfigParseError, HookError, RunContextError, SpawnWorkersError, WriteReportError,
};

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

/// Documented exit codes for `xunitmp` failures.
///
/// Unknown or unexpected failures always result in exit code 1.
pub enum XunitmpExitCode {}

impl XunitmpExitCode {
    /// No errors occurred and xunitmp exited normally.
    pub const OK: i32 = 0;

    /// Reporting was enabled, but no test outcomes were recorded.
    pub const NO_TESTS_RUN: i32 = 4;

    /// One or more tests failed or errored, or a worker exited unsuccessfully.
    pub const TEST_RUN_FAILED: i32 = 100;

    /// A problem with the invocation or the environment prevented the run from starting.
    pub const SETUP_ERROR: i32 = 96;

    /// Writing the report, or writing to stdout or stderr, produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}

// The #[error()] strings are placeholders: errors are meant to be printed with
// display_to_stderr, which adds color and the chain of causes.

/// An error that xunitmp knows how to report.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("could not determine the current directory")]
    CurrentDirFailed {
        #[source]
        error: std::io::Error,
    },
    #[error("current directory is not valid UTF-8")]
    CurrentDirNotUtf8 {
        #[source]
        error: camino::FromPathBufError,
    },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("run context error")]
    RunContextError {
        #[from]
        err: RunContextError,
    },
    #[error("worker error")]
    SpawnWorkersError {
        #[from]
        err: SpawnWorkersError,
    },
    #[error("report write error")]
    WriteReportError {
        #[from]
        err: WriteReportError,
    },
    #[error("not running under xunitmp")]
    NotInRun,
    #[error("hook error")]
    HookError {
        test: String,
        #[source]
        err: HookError,
    },
    #[error("error writing to stdout")]
    WriteOutput {
        #[source]
        err: std::io::Error,
    },
}

impl ExpectedError {
    pub(crate) fn hook_error(test: impl Into<String>, err: HookError) -> Self {
        Self::HookError {
            test: test.into(),
            err,
        }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CurrentDirFailed { .. }
            | Self::CurrentDirNotUtf8 { .. }
            | Self::ConfigParseError { .. }
            | Self::RunContextError { .. }
            | Self::SpawnWorkersError { .. }
            | Self::NotInRun
            | Self::HookError { .. } => XunitmpExitCode::SETUP_ERROR,
            Self::WriteReportError { .. } | Self::WriteOutput { .. } => {
                XunitmpExitCode::WRITE_OUTPUT_ERROR
            }
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match self {
            Self::CurrentDirFailed { error } => {
                tracing::error!("could not determine the current directory");
                Some(error as &dyn Error)
            }
            Self::CurrentDirNotUtf8 { error } => {
                tracing::error!(
                    "current directory `{}` is not valid UTF-8",
                    error.as_path().display().style(styles.bold)
                );
                None
            }
            Self::ConfigParseError { err } => {
                tracing::error!(
                    "failed to parse xunitmp config at `{}`",
                    err.config_file().style(styles.bold)
                );
                err.source()
            }
            Self::RunContextError { err } => {
                tracing::error!("failed to set up the run");
                Some(err as &dyn Error)
            }
            Self::SpawnWorkersError { err } => {
                tracing::error!("{err}");
                err.source()
            }
            Self::WriteReportError { err } => {
                tracing::error!("{err}");
                err.source()
            }
            Self::NotInRun => {
                tracing::error!(
                    "{} is not set: this command must be run as an xunitmp worker",
                    xunitmp_runner::context::RUN_DIR_ENV.style(styles.bold)
                );
                None
            }
            Self::HookError { test, err } => {
                tracing::error!(
                    "failed to record outcome for `{}`",
                    test.style(styles.bold)
                );
                Some(err as &dyn Error)
            }
            Self::WriteOutput { err } => {
                tracing::error!("error writing to stdout");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            tracing::error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
