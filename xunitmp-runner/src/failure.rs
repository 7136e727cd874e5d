// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! What the host runner reports when a test does not pass.

use crate::errors::DisplayErrorChain;
use quick_xunit::{
    OutcomeDetail,
    text::{TextSource, render_message},
};
use std::{any::Any, backtrace::Backtrace, error::Error, fmt};

/// The argument to [`LifecycleHooks::on_error`](crate::hooks::LifecycleHooks::on_error).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FailureInfo {
    /// The test asked to be skipped. This is reported as a skip, not as an error.
    Skip {
        /// Why the test was skipped, if known.
        reason: Option<String>,
    },

    /// The test raised an unexpected error.
    Exception(ExceptionInfo),
}

impl FailureInfo {
    /// A skip signal with a reason.
    pub fn skip(reason: impl Into<String>) -> Self {
        FailureInfo::Skip {
            reason: Some(reason.into()),
        }
    }
}

impl From<ExceptionInfo> for FailureInfo {
    fn from(info: ExceptionInfo) -> Self {
        FailureInfo::Exception(info)
    }
}

/// A captured error: its type, a message and a formatted traceback.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExceptionInfo {
    type_name: String,
    message: String,
    traceback: String,
}

impl ExceptionInfo {
    /// Creates a new `ExceptionInfo` from its parts.
    pub fn new(
        type_name: impl Into<String>,
        message: impl Into<String>,
        traceback: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            traceback: traceback.into(),
        }
    }

    /// Captures an error value.
    ///
    /// The type name is the Rust path of `E` with `.` separators, e.g. `std.io.error.Error`.
    /// The traceback is the error followed by its chain of sources. A `Display` implementation
    /// that fails falls back to the `Debug` rendering.
    pub fn from_error<E: Error + 'static>(error: &E) -> Self {
        let type_name = qualified_type_name::<E>();
        let message = render_message([TextSource::Display(error), TextSource::Debug(error)]);
        let chain = DisplayErrorChain::new(error);
        let traceback = render_message([TextSource::Display(&chain), TextSource::Debug(error)]);
        Self {
            type_name,
            message,
            traceback,
        }
    }

    /// Captures a panic payload, as returned by [`std::panic::catch_unwind`].
    ///
    /// Payloads that are neither `&str` nor `String` get a placeholder message.
    pub fn from_panic(payload: &(dyn Any + Send), backtrace: Option<&Backtrace>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Box<dyn Any>".to_owned()
        };

        let mut traceback = format!("panicked: {message}");
        if let Some(backtrace) = backtrace {
            let rendered = render_message([TextSource::Display(backtrace)]);
            if !rendered.is_empty() {
                traceback.push('\n');
                traceback.push_str(&rendered);
            }
        }

        Self {
            type_name: "panic".to_owned(),
            message,
            traceback,
        }
    }

    /// The qualified name of the error type.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn traceback(&self) -> &str {
        &self.traceback
    }

    pub(crate) fn into_detail(self) -> OutcomeDetail {
        OutcomeDetail::new(self.type_name, self.message, self.traceback)
    }
}

impl fmt::Display for ExceptionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.type_name, self.message)
    }
}

fn qualified_type_name<T: ?Sized>() -> String {
    std::any::type_name::<T>().replace("::", ".")
}
