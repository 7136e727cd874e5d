// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runs the `xunitmp` binary against itself, using `xunitmp debug emit` as the worker.

use camino::{Utf8Path, Utf8PathBuf};
use camino_tempfile::Utf8TempDir;
use quick_xml::{Reader, events::Event};
use std::process::Output;

mod emit;
mod run;

const XUNITMP_BIN: &str = env!("CARGO_BIN_EXE_xunitmp");

/// Environment variables that would otherwise leak into the binary from the outer environment.
const SCRUBBED_ENV: &[&str] = &[
    "XUNITMP_RUN_DIR",
    "XUNITMP_WORKER_INDEX",
    "XUNITMP_WORKER_COUNT",
    "XUNITMP_CONFIG_FILE",
    "XUNITMP_WORKERS",
    "XUNITMP_WITH_XUNIT",
    "XUNITMP_FILE",
    "XUNITMP_VERBOSE",
    "XUNITMP_LOG",
];

struct TempProject {
    dir: Utf8TempDir,
}

impl TempProject {
    fn new() -> Self {
        let dir = camino_tempfile::Builder::new()
            .prefix("xunitmp-cli-")
            .tempdir()
            .expect("created temp dir");
        Self { dir }
    }

    fn path(&self) -> &Utf8Path {
        self.dir.path()
    }

    fn write_config(&self, contents: &str) {
        let config_dir = self.path().join(".config");
        std::fs::create_dir_all(&config_dir).expect("created .config");
        std::fs::write(config_dir.join("xunitmp.toml"), contents).expect("wrote config");
    }

    fn xunitmp<I, S>(&self, args: I) -> Output
    where
        I: IntoIterator<Item = S>,
        S: Into<std::ffi::OsString>,
    {
        let mut expression = duct::cmd(XUNITMP_BIN, args)
            .dir(self.path())
            .env("XUNITMP_COLOR", "never")
            .stdout_capture()
            .stderr_capture()
            .unchecked();
        for name in SCRUBBED_ENV {
            expression = expression.env_remove(*name);
        }
        let output = expression.run().expect("xunitmp ran");
        eprintln!(
            "stdout:\n{}\nstderr:\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
        output
    }

    /// Runs `xunitmp run` with the given run arguments, using `xunitmp debug emit` with
    /// `emit_args` as the worker command.
    fn run_emit(&self, run_args: &[&str], emit_args: &[&str]) -> Output {
        let mut args = vec!["run"];
        args.extend_from_slice(run_args);
        args.extend_from_slice(&["--", XUNITMP_BIN, "debug", "emit"]);
        args.extend_from_slice(emit_args);
        self.xunitmp(args)
    }
}

#[derive(Debug, Default, Eq, PartialEq)]
struct SuiteCounts {
    name: String,
    tests: u64,
    errors: u64,
    failures: u64,
    skip: u64,
}

#[derive(Debug, Default)]
struct Report {
    suite: SuiteCounts,
    classnames: Vec<String>,
    failure_bodies: Vec<String>,
}

impl Report {
    fn read(path: &Utf8Path) -> Self {
        let xml = std::fs::read_to_string(path).expect("report exists");
        let mut reader = Reader::from_str(&xml);
        let mut report = Report::default();
        let mut in_failure = false;

        loop {
            match reader.read_event().expect("well-formed XML") {
                Event::Start(e) | Event::Empty(e) => {
                    let attr = |name: &str| {
                        e.try_get_attribute(name)
                            .expect("valid attribute")
                            .map(|a| {
                                a.unescape_value()
                                    .expect("valid attribute value")
                                    .into_owned()
                            })
                            .unwrap_or_default()
                    };
                    let count = |name: &str| attr(name).parse::<u64>().expect("count attribute");
                    match e.name().as_ref() {
                        b"testsuite" => {
                            report.suite = SuiteCounts {
                                name: attr("name"),
                                tests: count("tests"),
                                errors: count("errors"),
                                failures: count("failures"),
                                skip: count("skip"),
                            };
                        }
                        b"testcase" => report.classnames.push(attr("classname")),
                        b"failure" => {
                            in_failure = true;
                            report.failure_bodies.push(String::new());
                        }
                        _ => {}
                    }
                }
                Event::End(e) if e.name().as_ref() == b"failure" => in_failure = false,
                Event::CData(data) if in_failure => {
                    let text = String::from_utf8(data.into_inner().into_owned())
                        .expect("UTF-8 CDATA");
                    if let Some(body) = report.failure_bodies.last_mut() {
                        body.push_str(&text);
                    }
                }
                // An escaped `]]>` sits between two CDATA sections as plain text.
                Event::Text(text) if in_failure => {
                    let text = text.unescape().expect("valid text");
                    if let Some(body) = report.failure_bodies.last_mut() {
                        body.push_str(&text);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
        report
    }
}

fn report_path(project: &TempProject, name: &str) -> Utf8PathBuf {
    project.path().join(name)
}
