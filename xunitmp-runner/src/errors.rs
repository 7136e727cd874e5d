// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by xunitmp-runner.

use camino::Utf8PathBuf;
use config::ConfigError;
use quick_xunit::{SerializeError, TestIdParseError};
use std::{error, fmt, io};
use thiserror::Error;

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse xunitmp config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    err: ConfigError,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, err: ConfigError) -> Self {
        Self {
            config_file: config_file.into(),
            err,
        }
    }

    /// Returns the config file that failed to parse.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }
}

/// An error that occurred while creating a run or attaching to one.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunContextError {
    /// The run directory could not be created.
    #[error("error creating run directory in `{parent}`")]
    RunDirCreate {
        parent: Utf8PathBuf,
        #[source]
        error: io::Error,
    },

    /// The temporary directory is not valid UTF-8.
    #[error("temporary directory is not valid UTF-8")]
    TempDirNotUtf8 {
        #[source]
        error: camino::FromPathBufError,
    },

    /// The environment variable naming the run directory is not valid UTF-8.
    #[error("environment variable `{name}` is not valid UTF-8")]
    EnvNotUtf8 { name: &'static str },

    /// The counters file could not be created, opened or mapped.
    #[error("error mapping counters file `{path}`")]
    CountersMap {
        path: Utf8PathBuf,
        #[source]
        error: io::Error,
    },

    /// The counters file exists but does not have the expected layout.
    #[error("`{path}` is not an xunitmp counters file ({reason})")]
    CountersLayout {
        path: Utf8PathBuf,
        reason: &'static str,
    },

    /// The spool directory for fragments could not be created or found.
    #[error("error accessing spool directory `{path}`")]
    SpoolDir {
        path: Utf8PathBuf,
        #[source]
        error: io::Error,
    },

    /// Opening this producer's spool file failed.
    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// An error that occurred while publishing a fragment.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PublishError {
    /// The outcome could not be serialized.
    #[error("error serializing outcome for `{test}`")]
    Serialize {
        test: String,
        #[source]
        error: SerializeError,
    },

    /// The fragment could not be framed for transport.
    #[error("error encoding fragment")]
    Encode {
        #[source]
        error: serde_json::Error,
    },

    /// The spool file could not be opened or written.
    #[error("error writing to spool file `{path}`")]
    Spool {
        path: Utf8PathBuf,
        #[source]
        error: io::Error,
    },
}

/// An error that occurred while draining the result channel.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DrainError {
    /// The spool directory could not be listed.
    #[error("error listing spool directory `{path}`")]
    ListSpool {
        path: Utf8PathBuf,
        #[source]
        error: io::Error,
    },

    /// A spool file could not be read.
    #[error("error reading spool file `{path}`")]
    ReadSpool {
        path: Utf8PathBuf,
        #[source]
        error: io::Error,
    },
}

/// An outcome arrived that could not be turned into a record.
///
/// This breaks the correspondence between counters and fragments, so it is reported instead
/// of being dropped.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HookError {
    /// The test id could not be split into a classname and a name.
    #[error("malformed outcome")]
    MalformedTestId {
        #[from]
        error: TestIdParseError,
    },

    /// Publishing the outcome failed.
    #[error("error publishing outcome")]
    Publish {
        #[from]
        error: PublishError,
    },
}

/// An error that occurred while writing the report.
///
/// This is the one fatal error in a run: the report could not be produced.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteReportError {
    /// The directory containing the report could not be created.
    #[error("error creating directory `{dir}`")]
    CreateDir {
        dir: Utf8PathBuf,
        #[source]
        error: io::Error,
    },

    /// The report file could not be written or moved into place.
    #[error("error writing report to `{path}`")]
    Write {
        path: Utf8PathBuf,
        #[source]
        error: io::Error,
    },

    /// Serializing the document failed.
    #[error("error serializing report to `{path}`")]
    Serialize {
        path: Utf8PathBuf,
        #[source]
        error: SerializeError,
    },

    /// The result channel could not be drained.
    #[error("error collecting results for `{path}`")]
    Drain {
        path: Utf8PathBuf,
        #[source]
        error: DrainError,
    },
}

/// An error that occurred while starting or joining worker processes.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SpawnWorkersError {
    /// No command was given for the workers.
    #[error("no worker command specified")]
    EmptyCommand,

    /// A worker could not be started.
    #[error("error spawning worker {index} (`{command}`)")]
    Spawn {
        index: usize,
        command: String,
        #[source]
        error: io::Error,
    },

    /// Waiting for a worker failed.
    #[error("error waiting for worker {index}")]
    Wait {
        index: usize,
        #[source]
        error: io::Error,
    },
}

/// Displays an error along with its chain of sources.
///
/// ```text
/// error spawning worker 0 (`false`)
///   caused by:
///   - No such file or directory (os error 2)
/// ```
pub struct DisplayErrorChain<E> {
    error: E,
}

impl<E: error::Error> DisplayErrorChain<E> {
    /// Creates a new `DisplayErrorChain`.
    pub fn new(error: E) -> Self {
        Self { error }
    }
}

impl<E: error::Error> fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        let mut source = self.error.source();
        if source.is_none() {
            return Ok(());
        }
        write!(f, "\n  caused by:")?;
        while let Some(error) = source {
            write!(f, "\n  - {error}")?;
            source = error.source();
        }
        Ok(())
    }
}

impl<E: error::Error> fmt::Debug for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
