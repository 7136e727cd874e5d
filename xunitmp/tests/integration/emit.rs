// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::*;
use pretty_assertions::assert_eq;

#[test]
fn emit_outside_run_is_setup_error() {
    let project = TempProject::new();
    let output = project.xunitmp(["debug", "emit", "--pass", "1"]);
    assert_eq!(output.status.code(), Some(96));
    let stderr = String::from_utf8(output.stderr).expect("UTF-8 stderr");
    assert!(
        stderr.contains("XUNITMP_RUN_DIR is not set"),
        "missing run is explained: {stderr}"
    );
}

#[test]
fn invalid_config_is_setup_error() {
    let project = TempProject::new();
    project.write_config("[xunit]\nstore-success-output = \"sometimes\"\n");
    let output = project.run_emit(&["--with-xunit"], &["--pass", "1"]);
    assert_eq!(output.status.code(), Some(96));
    assert!(!report_path(&project, "xunit.xml").exists());
}
