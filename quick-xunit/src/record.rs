// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    errors::{SerializeError, TestIdParseError},
    serialize::serialize_fragment,
};
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};

/// The classification of one completed test.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum OutcomeKind {
    /// The test raised an unexpected error.
    Error,

    /// An assertion in the test failed.
    Failure,

    /// The test passed.
    Pass,

    /// The test asked to be skipped.
    Skip,
}

impl OutcomeKind {
    /// All kinds, in the order the report header lists their counts.
    pub const ALL: [OutcomeKind; 4] = [
        OutcomeKind::Error,
        OutcomeKind::Failure,
        OutcomeKind::Pass,
        OutcomeKind::Skip,
    ];

    /// A stable index for this kind, in `0..4`.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            OutcomeKind::Error => 0,
            OutcomeKind::Failure => 1,
            OutcomeKind::Pass => 2,
            OutcomeKind::Skip => 3,
        }
    }

    /// Returns the name of this kind as used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeKind::Error => "error",
            OutcomeKind::Failure => "failure",
            OutcomeKind::Pass => "pass",
            OutcomeKind::Skip => "skipped",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The identity of a test, split into the class-qualified part and the short name.
///
/// A dotted id like `pkg.Mod.TestX.test_a` becomes classname `pkg.Mod.TestX` and name
/// `test_a`. An id without dots has an empty classname.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct TestId {
    classname: String,
    name: String,
}

impl TestId {
    /// Parses a dotted test id.
    pub fn parse(id: &str) -> Result<Self, TestIdParseError> {
        if id.trim().is_empty() {
            return Err(TestIdParseError::new(id, "test id is empty"));
        }
        let (classname, name) = match id.rsplit_once('.') {
            Some((classname, name)) => (classname, name),
            None => ("", id),
        };
        if name.is_empty() {
            return Err(TestIdParseError::new(id, "test id ends with `.`"));
        }

        Ok(Self {
            classname: classname.to_owned(),
            name: name.to_owned(),
        })
    }

    /// Returns the class-qualified part: every segment but the last.
    pub fn classname(&self) -> &str {
        &self.classname
    }

    /// Returns the short name: the last segment.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.classname.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}.{}", self.classname, self.name)
        }
    }
}

/// Details attached to a failure or an error.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OutcomeDetail {
    /// The qualified name of the error type, e.g. `std.io.Error`.
    pub ty: String,

    /// A one-line message.
    pub message: String,

    /// The full formatted error chain.
    pub traceback: String,
}

impl OutcomeDetail {
    /// Creates a new `OutcomeDetail`.
    pub fn new(
        ty: impl Into<String>,
        message: impl Into<String>,
        traceback: impl Into<String>,
    ) -> Self {
        Self {
            ty: ty.into(),
            message: message.into(),
            traceback: traceback.into(),
        }
    }
}

/// What happened to a test, with the data that goes with each kind.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// The test passed. `system_out` is an optional informational body.
    Pass { system_out: Option<String> },

    /// An assertion failed.
    Failure(OutcomeDetail),

    /// The test errored.
    Error(OutcomeDetail),

    /// The test was skipped, possibly with a reason.
    Skip { reason: Option<String> },
}

impl Outcome {
    /// Returns the kind of this outcome.
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Pass { .. } => OutcomeKind::Pass,
            Outcome::Failure(_) => OutcomeKind::Failure,
            Outcome::Error(_) => OutcomeKind::Error,
            Outcome::Skip { .. } => OutcomeKind::Skip,
        }
    }

    /// Returns the failure detail, if this is a failure or an error.
    pub fn detail(&self) -> Option<&OutcomeDetail> {
        match self {
            Outcome::Failure(detail) | Outcome::Error(detail) => Some(detail),
            Outcome::Pass { .. } | Outcome::Skip { .. } => None,
        }
    }
}

/// An immutable description of one completed test.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OutcomeRecord {
    id: TestId,
    duration: Duration,
    outcome: Outcome,
}

impl OutcomeRecord {
    /// Creates a new record.
    pub fn new(id: TestId, duration: Duration, outcome: Outcome) -> Self {
        Self {
            id,
            duration,
            outcome,
        }
    }

    /// The test this record describes.
    pub fn id(&self) -> &TestId {
        &self.id
    }

    /// How long the test took. Zero if its start was never observed.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn kind(&self) -> OutcomeKind {
        self.outcome.kind()
    }

    /// Serializes this record into a self-contained `<testcase>` fragment.
    ///
    /// All text fields are sanitized and escaped by the serializer.
    pub fn to_fragment(&self) -> Result<Fragment, SerializeError> {
        let mut buf = Vec::with_capacity(256);
        serialize_fragment(self, &mut buf)?;
        let xml = String::from_utf8(buf).map_err(SerializeError::from_utf8)?;
        Ok(Fragment { xml })
    }
}

/// One serialized, self-contained `<testcase>` element.
///
/// Fragments are only produced by [`OutcomeRecord::to_fragment`], so their text is always
/// well-formed and pre-escaped. The serde representation is the bare string, which is how
/// fragments travel between processes.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fragment {
    xml: String,
}

impl Fragment {
    /// Returns the markup for this fragment.
    pub fn as_str(&self) -> &str {
        &self.xml
    }

    /// Consumes the fragment, returning its markup.
    pub fn into_string(self) -> String {
        self.xml
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.xml)
    }
}
