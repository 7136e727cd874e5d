// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rendering message text for a report, with fallbacks.
//!
//! An error message has to end up in the report no matter what. A `Display` implementation
//! that returns `fmt::Error`, or a message that only exists as raw bytes, must not abort the
//! run. [`render_message`] walks an ordered list of [`TextSource`]s and returns the first one
//! that renders; if none do, the message is empty.

use std::fmt::{self, Write};

/// One way of producing message text.
#[derive(Clone, Copy)]
pub enum TextSource<'a> {
    /// The value's native `Display` rendering.
    Display(&'a dyn fmt::Display),

    /// Raw bytes in an unknown encoding, transcoded lossily from UTF-8.
    Bytes(&'a [u8]),

    /// Reconstruction from the value's `Debug` rendering, which shows the raw fields.
    Debug(&'a dyn fmt::Debug),
}

impl TextSource<'_> {
    /// Attempts to render this source, returning `None` if it failed.
    pub fn render(&self) -> Option<String> {
        let mut out = String::new();
        let res = match self {
            TextSource::Display(value) => write!(out, "{value}"),
            TextSource::Bytes(bytes) => {
                out.push_str(&String::from_utf8_lossy(bytes));
                Ok(())
            }
            TextSource::Debug(value) => write!(out, "{value:?}"),
        };
        res.ok().map(|()| out)
    }
}

impl fmt::Debug for TextSource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextSource::Display(_) => f.write_str("Display(..)"),
            TextSource::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            TextSource::Debug(_) => f.write_str("Debug(..)"),
        }
    }
}

/// Renders the first source that succeeds, in order.
///
/// Returns the empty string if every attempt failed. The result is not sanitized: callers
/// hand it to the serializer, which does that.
pub fn render_message<'a>(sources: impl IntoIterator<Item = TextSource<'a>>) -> String {
    sources
        .into_iter()
        .find_map(|source| source.render())
        .unwrap_or_default()
}
