// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serialize fragments and report documents.
//!
//! Every string that reaches the output goes through [`crate::sanitize`] here, so callers can
//! pass raw test names and tracebacks.

use crate::{
    Fragment, Outcome, OutcomeDetail, OutcomeRecord,
    errors::SerializeError,
    sanitize::{escape_attr, escape_cdata, xml_safe},
};
use quick_xml::{
    Writer,
    events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event, attributes::Attribute},
    name::QName,
};
use std::{borrow::Cow, io, time::Duration};

static TESTSUITE_TAG: &str = "testsuite";
static TESTCASE_TAG: &str = "testcase";
static FAILURE_TAG: &str = "failure";
static ERROR_TAG: &str = "error";
static SKIPPED_TAG: &str = "skipped";
static SYSTEM_OUT_TAG: &str = "system-out";

/// The counts carried by the root element of a report.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReportHeader {
    /// The name of the report.
    pub name: String,

    /// The number of tests that errored.
    pub errors: usize,

    /// The number of tests that failed.
    pub failures: usize,

    /// The number of tests that passed.
    pub passes: usize,

    /// The number of tests that were skipped.
    pub skipped: usize,
}

impl ReportHeader {
    /// Creates a header with all counts set to zero.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            errors: 0,
            failures: 0,
            passes: 0,
            skipped: 0,
        }
    }

    /// The total number of tests: the sum of every count.
    pub fn tests(&self) -> usize {
        self.errors + self.failures + self.passes + self.skipped
    }
}

/// Writes a report document: a header, any number of fragments, then a footer.
///
/// Fragments are copied verbatim, since they were escaped when they were serialized.
pub struct DocumentWriter<W: io::Write> {
    writer: Writer<W>,
    fragments_written: usize,
}

impl<W: io::Write> DocumentWriter<W> {
    /// Writes the XML declaration and the opening root element.
    pub fn start(inner: W, header: &ReportHeader) -> Result<Self, SerializeError> {
        let mut writer = Writer::new(inner);

        let decl = BytesDecl::new("1.0", Some("UTF-8"), None);
        writer.write_event(Event::Decl(decl))?;

        // Use the destructuring syntax to ensure that all fields are handled.
        let ReportHeader {
            name,
            errors,
            failures,
            passes: _,
            skipped,
        } = header;

        let mut testsuite_tag = BytesStart::new(TESTSUITE_TAG);
        push_attr(&mut testsuite_tag, "name", name);
        push_attr(&mut testsuite_tag, "tests", &header.tests().to_string());
        push_attr(&mut testsuite_tag, "errors", &errors.to_string());
        push_attr(&mut testsuite_tag, "failures", &failures.to_string());
        push_attr(&mut testsuite_tag, "skip", &skipped.to_string());
        writer.write_event(Event::Start(testsuite_tag))?;

        Ok(Self {
            writer,
            fragments_written: 0,
        })
    }

    /// Appends a fragment to the document.
    pub fn write_fragment(&mut self, fragment: &Fragment) -> Result<(), SerializeError> {
        io::Write::write_all(self.writer.get_mut(), fragment.as_str().as_bytes())?;
        self.fragments_written += 1;
        Ok(())
    }

    /// The number of fragments written so far.
    pub fn fragments_written(&self) -> usize {
        self.fragments_written
    }

    /// Writes the closing root element and returns the inner writer.
    pub fn finish(mut self) -> Result<W, SerializeError> {
        serialize_end_tag(TESTSUITE_TAG, &mut self.writer)?;
        let mut inner = self.writer.into_inner();
        io::Write::flush(&mut inner)?;
        Ok(inner)
    }
}

pub(crate) fn serialize_fragment(
    record: &OutcomeRecord,
    writer: impl io::Write,
) -> Result<(), SerializeError> {
    let mut writer = Writer::new(writer);

    let id = record.id();
    let mut testcase_tag = BytesStart::new(TESTCASE_TAG);
    push_attr(&mut testcase_tag, "classname", id.classname());
    push_attr(&mut testcase_tag, "name", id.name());
    push_attr(&mut testcase_tag, "time", &serialize_time(record.duration()));

    match record.outcome() {
        Outcome::Pass { system_out: None } => {
            writer.write_event(Event::Empty(testcase_tag))?;
            return Ok(());
        }
        Outcome::Pass {
            system_out: Some(system_out),
        } => {
            writer.write_event(Event::Start(testcase_tag))?;
            serialize_output(system_out, SYSTEM_OUT_TAG, &mut writer)?;
        }
        Outcome::Failure(detail) => {
            writer.write_event(Event::Start(testcase_tag))?;
            serialize_detail(detail, FAILURE_TAG, &mut writer)?;
        }
        Outcome::Error(detail) => {
            writer.write_event(Event::Start(testcase_tag))?;
            serialize_detail(detail, ERROR_TAG, &mut writer)?;
        }
        Outcome::Skip { reason } => {
            writer.write_event(Event::Start(testcase_tag))?;
            let mut tag = BytesStart::new(SKIPPED_TAG);
            if let Some(reason) = reason {
                push_attr(&mut tag, "message", reason);
            }
            writer.write_event(Event::Empty(tag))?;
        }
    }

    serialize_end_tag(TESTCASE_TAG, &mut writer)?;
    Ok(())
}

fn serialize_detail(
    detail: &OutcomeDetail,
    tag_name: &'static str,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let OutcomeDetail {
        ty,
        message,
        traceback,
    } = detail;

    let mut tag = BytesStart::new(tag_name);
    push_attr(&mut tag, "type", ty);
    push_attr(&mut tag, "message", message);
    writer.write_event(Event::Start(tag))?;

    // The escaped text may contain `]]>` followed by the sequence that reopens a section; the
    // writer emits it between a single `<![CDATA[` and `]]>` pair.
    let cdata = BytesCData::new(escape_cdata(traceback));
    writer.write_event(Event::CData(cdata))?;

    serialize_end_tag(tag_name, writer)
}

fn serialize_output(
    output: &str,
    tag_name: &'static str,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    writer.write_event(Event::Start(BytesStart::new(tag_name)))?;

    let output = xml_safe(output);
    writer.write_event(Event::Text(BytesText::new(&output)))?;

    serialize_end_tag(tag_name, writer)
}

fn serialize_end_tag(
    tag_name: &'static str,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    writer.write_event(Event::End(BytesEnd::new(tag_name)))?;
    Ok(())
}

// quick-xml's tuple attributes don't escape whitespace, so values are escaped here and pushed
// as raw attributes.
fn push_attr(tag: &mut BytesStart<'_>, key: &'static str, value: &str) {
    let value = match escape_attr(value) {
        Cow::Borrowed(value) => Cow::Borrowed(value.as_bytes()),
        Cow::Owned(value) => Cow::Owned(value.into_bytes()),
    };
    tag.push_attribute(Attribute {
        key: QName(key.as_bytes()),
        value,
    });
}

// Serialize time as seconds with 6 decimal points.
fn serialize_time(time: Duration) -> String {
    format!("{:.6}", time.as_secs_f64())
}
