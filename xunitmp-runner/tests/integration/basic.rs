// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use camino_tempfile::Utf8TempDir;
use color_eyre::eyre::{Result, ensure};
use pretty_assertions::assert_eq;
use std::thread;
use test_case::test_case;
use xunitmp_runner::{
    barrier::CompletionBarrier,
    config::XunitConfig,
    context::RunContext,
    errors::HookError,
    failure::{ExceptionInfo, FailureInfo},
    hooks::LifecycleHooks,
};

struct TestRun {
    dir: Utf8TempDir,
    context: RunContext,
}

impl TestRun {
    fn new() -> Result<Self> {
        let dir = camino_tempfile::tempdir()?;
        let config = XunitConfig::from_sources(dir.path(), None)?
            .with_path_override(dir.path().join("reports/xunit.xml"));
        let context = RunContext::new_in(config, dir.path())?;
        Ok(Self { dir, context })
    }

    fn hooks(&self) -> Result<LifecycleHooks> {
        let sink = self.context.handle().attach()?;
        Ok(LifecycleHooks::new(sink, self.context.config()))
    }
}

#[test_case(1, 0; "one worker, no tests")]
#[test_case(1, 50; "one worker")]
#[test_case(8, 25; "eight workers")]
#[test_case(16, 10; "sixteen workers")]
fn concurrent_passes_are_all_counted(workers: usize, per_worker: usize) -> Result<()> {
    test_init();

    let run = TestRun::new()?;
    let handles: Vec<_> = (0..workers)
        .map(|worker| {
            let handle = run.context.handle();
            let config = run.context.config().clone();
            thread::spawn(move || -> Result<usize> {
                let mut hooks = LifecycleHooks::new(handle.attach()?, &config);
                for test in 0..per_worker {
                    let id = format!("suite.Worker{worker}.test_{test}");
                    hooks.on_start(&id);
                    hooks.on_success(&id)?;
                }
                Ok(hooks.submitted())
            })
        })
        .collect();

    let (barrier, results) = CompletionBarrier::join_threads(handles);
    for result in results {
        let submitted = result.map_err(|_| color_eyre::eyre::eyre!("worker panicked"))??;
        assert_eq!(submitted, per_worker);
    }
    assert_eq!(barrier.producers(), workers);

    let expected = (workers * per_worker) as u64;
    assert_eq!(run.context.counters().snapshot().passes, expected);

    let summary = run.context.write_report(barrier)?;
    assert_eq!(summary.counts().total(), expected);
    assert_eq!(summary.fragments() as u64, expected);
    assert!(summary.is_consistent());

    let report = ParsedReport::read(summary.path())?;
    assert_eq!(report.testsuite.tests, expected);
    assert_eq!(report.testsuite.errors, 0);
    assert_eq!(report.testsuite.failures, 0);
    assert_eq!(report.testsuite.skip, 0);
    assert_eq!(report.testcases.len() as u64, expected);
    assert_eq!(report.count_kind(None) as u64, expected);

    // Every test appears exactly once.
    let mut ids: Vec<_> = report
        .testcases
        .iter()
        .map(|t| format!("{}.{}", t.classname, t.name))
        .collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len() as u64, expected);

    drop(run.dir);
    Ok(())
}

#[test]
fn zero_tests_document() -> Result<()> {
    test_init();

    let run = TestRun::new()?;
    let summary = run
        .context
        .write_report(CompletionBarrier::assume_complete(0))?;

    let report = ParsedReport::read(summary.path())?;
    assert_eq!(
        report.testsuite,
        ParsedTestsuite {
            name: "xunitmp".to_owned(),
            tests: 0,
            errors: 0,
            failures: 0,
            skip: 0,
        }
    );
    assert!(report.testcases.is_empty());
    Ok(())
}

#[test]
fn failure_traceback_with_cdata_terminator() -> Result<()> {
    test_init();

    let run = TestRun::new()?;
    let mut hooks = run.hooks()?;
    let traceback = "Traceback:\n  check(x)\nAssertionError: expected ]]> in output\n";

    hooks.on_start("pkg.Mod.TestX.test_a");
    hooks.on_failure(
        "pkg.Mod.TestX.test_a",
        ExceptionInfo::new("AssertionError", "expected ]]> in output", traceback),
    )?;
    drop(hooks);

    let summary = run
        .context
        .write_report(CompletionBarrier::assume_complete(1))?;
    let report = ParsedReport::read(summary.path())?;
    assert_eq!(report.testsuite.tests, 1);
    assert_eq!(report.testsuite.failures, 1);

    let testcase = &report.testcases[0];
    assert_eq!(testcase.classname, "pkg.Mod.TestX");
    assert_eq!(testcase.name, "test_a");
    assert_eq!(testcase.kind.as_deref(), Some("failure"));
    assert_eq!(testcase.kind_type.as_deref(), Some("AssertionError"));
    assert_eq!(
        testcase.kind_message.as_deref(),
        Some("expected ]]> in output")
    );
    assert_eq!(testcase.body, traceback);
    Ok(())
}

#[test]
fn every_outcome_kind() -> Result<()> {
    test_init();

    let run = TestRun::new()?;
    let mut hooks = run.hooks()?;

    hooks.on_start("kinds.test_pass");
    hooks.on_success("kinds.test_pass")?;

    hooks.on_start("kinds.test_fail");
    hooks.on_failure("kinds.test_fail", ExceptionInfo::new("Fail", "no", "tb"))?;

    hooks.on_start("kinds.test_error");
    let io_error = std::io::Error::other("socket closed\u{7}");
    hooks.on_error(
        "kinds.test_error",
        ExceptionInfo::from_error(&io_error).into(),
    )?;

    hooks.on_start("kinds.test_skip");
    hooks.on_error("kinds.test_skip", FailureInfo::Skip { reason: None })?;
    drop(hooks);

    let summary = run
        .context
        .write_report(CompletionBarrier::assume_complete(1))?;
    let report = ParsedReport::read(summary.path())?;
    assert_eq!(
        report.testsuite,
        ParsedTestsuite {
            name: "xunitmp".to_owned(),
            tests: 4,
            errors: 1,
            failures: 1,
            skip: 1,
        }
    );

    let kinds: Vec<_> = report
        .testcases
        .iter()
        .map(|t| (t.name.as_str(), t.kind.as_deref()))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("test_pass", None),
            ("test_fail", Some("failure")),
            ("test_error", Some("error")),
            ("test_skip", Some("skipped")),
        ]
    );

    let error = &report.testcases[2];
    assert_eq!(error.kind_type.as_deref(), Some("std.io.error.Error"));
    // The bell character is not allowed in XML.
    assert_eq!(error.kind_message.as_deref(), Some("socket closed?"));
    Ok(())
}

#[test]
fn malformed_outcome_is_not_counted() -> Result<()> {
    test_init();

    let run = TestRun::new()?;
    let mut hooks = run.hooks()?;
    let error = hooks
        .on_failure("trailing.", ExceptionInfo::new("t", "m", "tb"))
        .expect_err("malformed id");
    ensure!(
        matches!(error, HookError::MalformedTestId { .. }),
        "unexpected error: {error:?}"
    );
    hooks.on_success("fine.test")?;
    drop(hooks);

    let summary = run
        .context
        .write_report(CompletionBarrier::assume_complete(1))?;
    assert_eq!(summary.counts().total(), 1);
    assert!(summary.is_consistent());
    Ok(())
}
