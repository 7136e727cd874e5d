// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError, Result, XunitmpExitCode,
    output::{OutputContext, OutputOpts},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use std::{io::Write, num::NonZeroUsize};
use tracing::{debug, info, warn};
use xunitmp_runner::{
    config::XunitConfig,
    context::{RunContext, WORKER_INDEX_ENV},
    failure::{ExceptionInfo, FailureInfo},
    hooks::LifecycleHooks,
    workers::{WorkerCommand, WorkerExit, WorkerSet},
};

static CONFIG_FILE_ENV: &str = "XUNITMP_CONFIG_FILE";

/// Run a test command in several worker processes and merge their results into one xUnit
/// report.
#[derive(Debug, Parser)]
#[command(
    version,
    name = "xunitmp",
    styles = crate::output::clap_styles::style(),
    max_term_width = 100,
)]
pub struct XunitmpApp {
    #[clap(flatten)]
    common: CommonOpts,

    #[clap(subcommand)]
    command: Command,
}

impl XunitmpApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.common.output.init()
    }

    /// Executes the app, returning the exit code.
    pub fn exec(self, output: OutputContext) -> Result<i32> {
        let cwd = current_dir()?;
        match self.command {
            Command::Run(opts) => opts.exec(&cwd, self.common.config_file.as_deref(), output),
            Command::Debug { command } => {
                command.exec(&cwd, self.common.config_file.as_deref())
            }
        }
    }
}

#[derive(Debug, Args)]
struct CommonOpts {
    #[clap(flatten)]
    output: OutputOpts,

    /// Config file [default: .config/xunitmp.toml in the current directory]
    #[arg(long, global = true, value_name = "PATH", env = CONFIG_FILE_ENV)]
    config_file: Option<Utf8PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a command in worker processes and collect their results
    Run(RunOpts),

    /// Debug commands
    #[command(hide = true)]
    Debug {
        #[clap(subcommand)]
        command: DebugCommand,
    },
}

#[derive(Debug, Args)]
struct RunOpts {
    /// Number of worker processes to start
    #[arg(long, short = 'j', value_name = "N", default_value = "1", env = "XUNITMP_WORKERS")]
    workers: NonZeroUsize,

    /// Collect results and write an xUnit report
    #[arg(long, env = "XUNITMP_WITH_XUNIT")]
    with_xunit: bool,

    /// Path to write the report to [default: from config, or xunit.xml]
    #[arg(long, value_name = "PATH", env = "XUNITMP_FILE")]
    xunit_file: Option<Utf8PathBuf>,

    /// The command each worker runs
    #[arg(last = true, required = true, value_name = "COMMAND")]
    command: Vec<String>,
}

impl RunOpts {
    fn exec(
        self,
        cwd: &Utf8Path,
        config_file: Option<&Utf8Path>,
        output: OutputContext,
    ) -> Result<i32> {
        let mut command = WorkerCommand::new(self.command.iter().cloned())?;
        if let Some(config_file) = config_file {
            // Workers read the same config as the coordinator.
            command = command.env(CONFIG_FILE_ENV, absolute(cwd, config_file).as_str());
        }
        debug!(
            command = %shell_words::join(&self.command),
            workers = self.workers.get(),
            "starting workers"
        );

        if !self.with_xunit {
            let workers = WorkerSet::spawn(&command, self.workers, None)?;
            let (_barrier, exits) = workers.join()?;
            return Ok(exit_code_for_workers(&exits).unwrap_or(XunitmpExitCode::OK));
        }

        let mut config = XunitConfig::from_sources(cwd, config_file)?;
        if let Some(xunit_file) = &self.xunit_file {
            config = config.with_path_override(absolute(cwd, xunit_file));
        }

        let context = RunContext::new(config)?;
        let workers = WorkerSet::spawn(&command, self.workers, Some(&context.handle()))?;
        let (barrier, exits) = workers.join()?;
        let summary = context.write_report(barrier)?;

        if output.verbose {
            let path = summary.path();
            let display = path.strip_prefix(cwd).unwrap_or(path);
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "XML: {display}")
                .and_then(|()| stdout.flush())
                .map_err(|err| ExpectedError::WriteOutput { err })?;
        }

        let counts = summary.counts();
        info!(
            "{} tests: {} passed, {} failed, {} errored, {} skipped",
            counts.total(),
            counts.passes,
            counts.failures,
            counts.errors,
            counts.skipped,
        );

        if let Some(code) = exit_code_for_workers(&exits) {
            return Ok(code);
        }
        if counts.has_failures() {
            Ok(XunitmpExitCode::TEST_RUN_FAILED)
        } else if counts.total() == 0 {
            warn!("no test results were recorded");
            Ok(XunitmpExitCode::NO_TESTS_RUN)
        } else {
            Ok(XunitmpExitCode::OK)
        }
    }
}

fn exit_code_for_workers(exits: &[WorkerExit]) -> Option<i32> {
    let failed: Vec<_> = exits.iter().filter(|exit| !exit.success()).collect();
    if failed.is_empty() {
        return None;
    }
    for exit in &failed {
        warn!("worker {} exited with {}", exit.index, exit.status);
    }
    Some(XunitmpExitCode::TEST_RUN_FAILED)
}

#[derive(Debug, Subcommand)]
enum DebugCommand {
    /// Act as a worker: attach to the current run and emit synthetic outcomes
    Emit(EmitOpts),
}

impl DebugCommand {
    fn exec(self, cwd: &Utf8Path, config_file: Option<&Utf8Path>) -> Result<i32> {
        match self {
            DebugCommand::Emit(opts) => opts.exec(cwd, config_file),
        }
    }
}

#[derive(Debug, Args)]
struct EmitOpts {
    /// Number of passing tests
    #[arg(long, default_value_t = 0)]
    pass: usize,

    /// Number of failing tests
    #[arg(long, default_value_t = 0)]
    fail: usize,

    /// Number of tests that raise an error
    #[arg(long, default_value_t = 0)]
    error: usize,

    /// Number of skipped tests
    #[arg(long, default_value_t = 0)]
    skip: usize,

    /// Class name prefix for the emitted tests; the worker index is appended
    #[arg(long, default_value = "xunitmp.emit.Worker")]
    prefix: String,
}

impl EmitOpts {
    fn exec(self, cwd: &Utf8Path, config_file: Option<&Utf8Path>) -> Result<i32> {
        let config = XunitConfig::from_sources(cwd, config_file)?;
        let Some(mut hooks) = LifecycleHooks::from_env(&config)? else {
            return Err(ExpectedError::NotInRun);
        };

        let worker_index = std::env::var(WORKER_INDEX_ENV).unwrap_or_else(|_| "0".to_owned());
        let classname = format!("{}{}", self.prefix, worker_index);

        for i in 0..self.pass {
            let test = format!("{classname}.test_pass_{i}");
            hooks.on_start(&test);
            hooks
                .on_success_with_output(&test, &format!("worker {worker_index}: pass {i}"))
                .map_err(|err| ExpectedError::hook_error(&test, err))?;
        }

        for i in 0..self.fail {
            let test = format!("{classname}.test_fail_{i}");
            hooks.on_start(&test);
            let info = ExceptionInfo::new(
                "xunitmp.EmittedFailure",
                format!("emitted failure {i}"),
                format!("emitted failure {i}\n  at {test}\n  terminator: ]]>\n"),
            );
            hooks
                .on_failure(&test, info)
                .map_err(|err| ExpectedError::hook_error(&test, err))?;
        }

        for i in 0..self.error {
            let test = format!("{classname}.test_error_{i}");
            hooks.on_start(&test);
            let error = std::io::Error::other(format!("emitted error {i}"));
            hooks
                .on_error(&test, ExceptionInfo::from_error(&error).into())
                .map_err(|err| ExpectedError::hook_error(&test, err))?;
        }

        for i in 0..self.skip {
            let test = format!("{classname}.test_skip_{i}");
            hooks.on_start(&test);
            hooks
                .on_error(&test, FailureInfo::skip(format!("emitted skip {i}")))
                .map_err(|err| ExpectedError::hook_error(&test, err))?;
        }

        debug!(submitted = hooks.submitted(), "emitted outcomes");
        Ok(XunitmpExitCode::OK)
    }
}

fn current_dir() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir().map_err(|error| ExpectedError::CurrentDirFailed { error })?;
    Utf8PathBuf::try_from(cwd).map_err(|error| ExpectedError::CurrentDirNotUtf8 { error })
}

fn absolute(cwd: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    // Joining an absolute path replaces the base.
    cwd.join(path)
}
