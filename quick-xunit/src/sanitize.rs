// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Make arbitrary text safe to embed in an XML document.
//!
//! XML 1.0 forbids most C0 control characters anywhere in a document, even as character
//! references. Test output routinely contains them (terminal escapes, stray NULs from
//! binary data), so they are replaced with `?` before anything else happens.

use quick_xml::escape::escape;
use std::borrow::Cow;

/// The replacement for characters that cannot appear in an XML 1.0 document.
pub const REPLACEMENT_CHAR: char = '?';

static CDATA_END: &str = "]]>";
static CDATA_END_SPLIT: &str = "]]>]]&gt;<![CDATA[";

/// Returns true if `c` may not appear in an XML 1.0 document.
///
/// This is the control range `0x00-0x1F` minus tab, newline and carriage return.
#[inline]
pub fn is_invalid_xml_char(c: char) -> bool {
    matches!(c, '\u{00}'..='\u{08}' | '\u{0B}' | '\u{0C}' | '\u{0E}'..='\u{1F}')
}

/// Replaces characters that are invalid in XML with [`REPLACEMENT_CHAR`].
///
/// Borrows the input if nothing needed to be replaced.
pub fn xml_safe(text: &str) -> Cow<'_, str> {
    if !text.contains(is_invalid_xml_char) {
        return Cow::Borrowed(text);
    }

    Cow::Owned(
        text.chars()
            .map(|c| {
                if is_invalid_xml_char(c) {
                    REPLACEMENT_CHAR
                } else {
                    c
                }
            })
            .collect(),
    )
}

/// Prepares text for the body of a `<![CDATA[ ... ]]>` section.
///
/// In addition to [`xml_safe`], every `]]>` is rewritten so that it closes the current
/// section, emits the terminator as escaped character data, and reopens a new section. A
/// reader concatenating the pieces gets the original text back.
pub fn escape_cdata(text: &str) -> Cow<'_, str> {
    match xml_safe(text) {
        Cow::Borrowed(text) if !text.contains(CDATA_END) => Cow::Borrowed(text),
        safe => Cow::Owned(safe.replace(CDATA_END, CDATA_END_SPLIT)),
    }
}

/// Escapes text for use as a double-quoted attribute value.
///
/// The quotes themselves are not included. Markup characters go through quick-xml's escaper.
/// Tab, newline and carriage return are then written as character references: a literal one
/// would be normalized to a space by conforming readers.
pub fn escape_attr(text: &str) -> Cow<'_, str> {
    let escaped = match xml_safe(text) {
        Cow::Borrowed(safe) => escape(safe),
        Cow::Owned(safe) => Cow::Owned(escape(&safe).into_owned()),
    };
    if !escaped.contains(is_attr_whitespace) {
        return escaped;
    }

    let mut out = String::with_capacity(escaped.len() + 8);
    for c in escaped.chars() {
        match c {
            '\t' => out.push_str("&#9;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

#[inline]
fn is_attr_whitespace(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r')
}
