// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Starting and joining worker processes.

use crate::{
    barrier::CompletionBarrier,
    context::{RUN_DIR_ENV, RunHandle, WORKER_COUNT_ENV, WORKER_INDEX_ENV},
    errors::SpawnWorkersError,
};
use duct::cmd;
use std::{fmt, num::NonZeroUsize, process::ExitStatus};
use tracing::debug;

/// The command every worker runs.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WorkerCommand {
    program: String,
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl WorkerCommand {
    /// Creates a command from a program followed by its arguments.
    pub fn new<I, S>(argv: I) -> Result<Self, SpawnWorkersError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = argv.into_iter().map(Into::into);
        let program = argv.next().ok_or(SpawnWorkersError::EmptyCommand)?;
        Ok(Self {
            program,
            args: argv.collect(),
            envs: Vec::new(),
        })
    }

    /// Adds an environment variable for every worker.
    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((name.into(), value.into()));
        self
    }

    /// The program to run.
    pub fn program(&self) -> &str {
        &self.program
    }

    fn to_expression(
        &self,
        run: Option<&RunHandle>,
        index: usize,
        count: usize,
    ) -> duct::Expression {
        let mut expression = cmd(self.program.as_str(), &self.args)
            .env(WORKER_INDEX_ENV, index.to_string())
            .env(WORKER_COUNT_ENV, count.to_string())
            // A failing worker is reported through its exit status, not as an error.
            .unchecked();
        expression = match run {
            Some(run) => {
                let (name, run_dir) = run.env_var();
                expression.env(name, run_dir)
            }
            // Workers must not attach to a run started by an outer xunitmp.
            None => expression.env_remove(RUN_DIR_ENV),
        };
        for (name, value) in &self.envs {
            expression = expression.env(name, value);
        }
        expression
    }
}

impl fmt::Display for WorkerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// A set of running worker processes.
#[derive(Debug)]
pub struct WorkerSet {
    handles: Vec<duct::Handle>,
}

impl WorkerSet {
    /// Starts `count` copies of `command`.
    ///
    /// If `run` is set, each worker gets the run handle in its environment. If any worker fails
    /// to start, the workers already started are killed.
    pub fn spawn(
        command: &WorkerCommand,
        count: NonZeroUsize,
        run: Option<&RunHandle>,
    ) -> Result<Self, SpawnWorkersError> {
        let count = count.get();
        let mut handles = Vec::with_capacity(count);
        for index in 0..count {
            let expression = command.to_expression(run, index, count);
            match expression.start() {
                Ok(handle) => {
                    debug!(index, command = %command, "started worker");
                    handles.push(handle);
                }
                Err(error) => {
                    kill_all(&handles);
                    return Err(SpawnWorkersError::Spawn {
                        index,
                        command: command.to_string(),
                        error,
                    });
                }
            }
        }
        Ok(Self { handles })
    }

    /// Waits for every worker to exit.
    ///
    /// Returns the barrier that allows the result channel to be drained, along with how each
    /// worker exited. A worker that exits unsuccessfully is not an error here.
    pub fn join(self) -> Result<(CompletionBarrier, Vec<WorkerExit>), SpawnWorkersError> {
        let mut exits = Vec::with_capacity(self.handles.len());
        for (index, handle) in self.handles.iter().enumerate() {
            match handle.wait() {
                Ok(output) => {
                    debug!(index, status = %output.status, "worker exited");
                    exits.push(WorkerExit {
                        index,
                        status: output.status,
                    });
                }
                Err(error) => {
                    kill_all(&self.handles[index + 1..]);
                    return Err(SpawnWorkersError::Wait { index, error });
                }
            }
        }
        Ok((CompletionBarrier::joined_processes(exits.len()), exits))
    }
}

fn kill_all(handles: &[duct::Handle]) {
    for handle in handles {
        if let Err(error) = handle.kill() {
            debug!(%error, "failed to kill worker");
        }
    }
}

/// How a worker process exited.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct WorkerExit {
    /// The worker's index, as passed in `XUNITMP_WORKER_INDEX`.
    pub index: usize,

    /// The exit status.
    pub status: ExitStatus,
}

impl WorkerExit {
    /// Returns true if the worker exited successfully.
    pub fn success(&self) -> bool {
        self.status.success()
    }
}
