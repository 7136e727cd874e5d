// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{io, string::FromUtf8Error};
use thiserror::Error;

/// An error that occurs while serializing a fragment or a report document.
///
/// Returned by [`OutcomeRecord::to_fragment`](crate::OutcomeRecord::to_fragment) and the
/// methods on [`DocumentWriter`](crate::DocumentWriter).
#[derive(Debug, Error)]
#[error("error serializing xUnit XML")]
pub struct SerializeError {
    #[source]
    inner: SerializeErrorInner,
}

impl SerializeError {
    pub(crate) fn from_utf8(error: FromUtf8Error) -> Self {
        Self {
            inner: SerializeErrorInner::Utf8(error),
        }
    }
}

impl From<io::Error> for SerializeError {
    fn from(error: io::Error) -> Self {
        Self {
            inner: SerializeErrorInner::Io(error),
        }
    }
}

impl From<quick_xml::Error> for SerializeError {
    fn from(error: quick_xml::Error) -> Self {
        Self {
            inner: SerializeErrorInner::Xml(error),
        }
    }
}

#[derive(Debug, Error)]
enum SerializeErrorInner {
    #[error("I/O error")]
    Io(#[source] io::Error),
    #[error("XML writer error")]
    Xml(#[source] quick_xml::Error),
    #[error("serialized output was not UTF-8")]
    Utf8(#[source] FromUtf8Error),
}

/// A test id could not be split into a classname and a name.
#[derive(Clone, Debug, Error)]
#[error("invalid test id `{id}`: {reason}")]
pub struct TestIdParseError {
    id: String,
    reason: &'static str,
}

impl TestIdParseError {
    pub(crate) fn new(id: impl Into<String>, reason: &'static str) -> Self {
        Self {
            id: id.into(),
            reason,
        }
    }

    /// The id that failed to parse.
    pub fn id(&self) -> &str {
        &self.id
    }
}
