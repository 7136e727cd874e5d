// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8Path;
use color_eyre::eyre::{Result, bail, eyre};
use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use std::sync::Once;

pub(crate) fn test_init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        // Another test binary may have installed a hook already.
        _ = color_eyre::install();
        _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct ParsedTestsuite {
    pub(crate) name: String,
    pub(crate) tests: u64,
    pub(crate) errors: u64,
    pub(crate) failures: u64,
    pub(crate) skip: u64,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct ParsedTestcase {
    pub(crate) classname: String,
    pub(crate) name: String,
    pub(crate) time: String,
    /// The name of the child element, if any.
    pub(crate) kind: Option<String>,
    pub(crate) kind_type: Option<String>,
    pub(crate) kind_message: Option<String>,
    pub(crate) body: String,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct ParsedReport {
    pub(crate) testsuite: ParsedTestsuite,
    pub(crate) testcases: Vec<ParsedTestcase>,
}

impl ParsedReport {
    pub(crate) fn read(path: &Utf8Path) -> Result<Self> {
        let xml = std::fs::read_to_string(path)?;
        Self::parse(&xml)
    }

    pub(crate) fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut report = ParsedReport::default();
        let mut saw_testsuite = false;
        let mut current: Option<ParsedTestcase> = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) if e.name().as_ref() == b"testsuite" => {
                    report.testsuite = ParsedTestsuite {
                        name: attr(&e, "name")?.unwrap_or_default(),
                        tests: count_attr(&e, "tests")?,
                        errors: count_attr(&e, "errors")?,
                        failures: count_attr(&e, "failures")?,
                        skip: count_attr(&e, "skip")?,
                    };
                    saw_testsuite = true;
                }
                Event::Start(e) if e.name().as_ref() == b"testcase" => {
                    current = Some(testcase(&e)?);
                }
                Event::Empty(e) if e.name().as_ref() == b"testcase" => {
                    report.testcases.push(testcase(&e)?);
                }
                Event::Start(e) | Event::Empty(e) => {
                    let Some(testcase) = current.as_mut() else {
                        bail!("unexpected element outside testcase");
                    };
                    testcase.kind = Some(String::from_utf8(e.name().as_ref().to_vec())?);
                    testcase.kind_type = attr(&e, "type")?;
                    testcase.kind_message = attr(&e, "message")?;
                }
                Event::CData(e) => {
                    if let Some(testcase) = current.as_mut() {
                        testcase.body.push_str(std::str::from_utf8(&e)?);
                    }
                }
                Event::Text(e) => {
                    if let Some(testcase) = current.as_mut() {
                        testcase.body.push_str(&e.unescape()?);
                    }
                }
                Event::End(e) if e.name().as_ref() == b"testcase" => {
                    let testcase = current.take().ok_or_else(|| eyre!("unbalanced testcase"))?;
                    report.testcases.push(testcase);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !saw_testsuite {
            bail!("no testsuite element found");
        }
        Ok(report)
    }

    pub(crate) fn count_kind(&self, kind: Option<&str>) -> usize {
        self.testcases
            .iter()
            .filter(|t| t.kind.as_deref() == kind)
            .count()
    }
}

fn attr(e: &BytesStart<'_>, key: &str) -> Result<Option<String>> {
    match e.try_get_attribute(key)? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

fn count_attr(e: &BytesStart<'_>, key: &str) -> Result<u64> {
    let value = attr(e, key)?.ok_or_else(|| eyre!("missing attribute {key}"))?;
    Ok(value.parse()?)
}

fn testcase(e: &BytesStart<'_>) -> Result<ParsedTestcase> {
    Ok(ParsedTestcase {
        classname: attr(e, "classname")?.ok_or_else(|| eyre!("missing classname"))?,
        name: attr(e, "name")?.ok_or_else(|| eyre!("missing name"))?,
        time: attr(e, "time")?.ok_or_else(|| eyre!("missing time"))?,
        ..Default::default()
    })
}
