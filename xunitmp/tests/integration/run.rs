// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::*;
use pretty_assertions::assert_eq;

#[test]
fn four_workers_merge_into_one_report() {
    let project = TempProject::new();
    let output = project.run_emit(
        &["--workers", "4", "--with-xunit", "--xunit-file", "out/x.xml"],
        &["--pass", "5"],
    );
    assert_eq!(output.status.code(), Some(0));

    let report = Report::read(&report_path(&project, "out/x.xml"));
    assert_eq!(
        report.suite,
        SuiteCounts {
            name: "xunitmp".to_owned(),
            tests: 20,
            errors: 0,
            failures: 0,
            skip: 0,
        }
    );
    assert_eq!(report.classnames.len(), 20);
    for index in 0..4 {
        let classname = format!("xunitmp.emit.Worker{index}");
        let per_worker = report.classnames.iter().filter(|c| **c == classname).count();
        assert_eq!(per_worker, 5, "worker {index} contributed 5 test cases");
    }
}

#[test]
fn failures_set_exit_code() {
    let project = TempProject::new();
    let output = project.run_emit(
        &["-j", "2", "--with-xunit"],
        &["--pass", "1", "--fail", "1", "--error", "1", "--skip", "1"],
    );
    assert_eq!(output.status.code(), Some(100));

    // Without --xunit-file the report goes to the configured default.
    let report = Report::read(&report_path(&project, "xunit.xml"));
    assert_eq!(report.suite.tests, 8);
    assert_eq!(report.suite.failures, 2);
    assert_eq!(report.suite.errors, 2);
    assert_eq!(report.suite.skip, 2);
    assert_eq!(report.failure_bodies.len(), 2);
    for body in &report.failure_bodies {
        assert!(
            body.contains("terminator: ]]>"),
            "CDATA terminator survives in traceback: {body:?}"
        );
    }
}

#[test]
fn zero_tests_exit_code() {
    let project = TempProject::new();
    let output = project.run_emit(&["-j", "3", "--with-xunit"], &[]);
    assert_eq!(output.status.code(), Some(4));

    let report = Report::read(&report_path(&project, "xunit.xml"));
    assert_eq!(report.suite.tests, 0);
    assert!(report.classnames.is_empty());
}

#[test]
fn config_file_sets_path_and_name() {
    let project = TempProject::new();
    project.write_config(
        r#"
        [xunit]
        path = "reports/merged.xml"
        report-name = "nightly"
        "#,
    );
    let output = project.run_emit(&["-j", "2", "--with-xunit"], &["--pass", "2"]);
    assert_eq!(output.status.code(), Some(0));

    let report = Report::read(&report_path(&project, "reports/merged.xml"));
    assert_eq!(report.suite.name, "nightly");
    assert_eq!(report.suite.tests, 4);
    assert!(!report_path(&project, "xunit.xml").exists());
}

#[test]
fn verbose_prints_report_path() {
    let project = TempProject::new();
    let output = project.run_emit(
        &["--verbose", "--with-xunit", "--xunit-file", "v.xml"],
        &["--pass", "1"],
    );
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8(output.stdout).expect("UTF-8 stdout");
    assert_eq!(stdout, "XML: v.xml\n");
}

#[test]
fn without_xunit_no_report_is_written() {
    let project = TempProject::new();
    // Workers are not attached to a run, so `debug emit` fails with a setup error.
    let output = project.run_emit(&["-j", "2"], &["--pass", "1"]);
    assert_eq!(output.status.code(), Some(100));
    assert!(!report_path(&project, "xunit.xml").exists());
}

#[test]
fn missing_worker_program_is_setup_error() {
    let project = TempProject::new();
    let output = project.xunitmp([
        "run",
        "--with-xunit",
        "--",
        "xunitmp-definitely-not-a-real-program",
    ]);
    assert_eq!(output.status.code(), Some(96));
    let stderr = String::from_utf8(output.stderr).expect("UTF-8 stderr");
    assert!(stderr.contains("error:"), "error is reported: {stderr}");
}

#[test]
fn unwritable_report_is_write_error() {
    let project = TempProject::new();
    std::fs::write(project.path().join("blocker"), "not a directory").expect("wrote file");
    let output = project.run_emit(
        &["--with-xunit", "--xunit-file", "blocker/x.xml"],
        &["--pass", "1"],
    );
    assert_eq!(output.status.code(), Some(110));
    let stderr = String::from_utf8(output.stderr).expect("UTF-8 stderr");
    assert!(
        stderr.contains("error creating directory"),
        "report failure is explained: {stderr}"
    );
}
