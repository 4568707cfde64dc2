//! JSON text under construction.
//!
//! `JsonText` is the output side of the renderer and the accumulation
//! state of the aggregates: a growing string plus a malformed-input flag
//! that the renderer raises when the binary input comes apart. The escape
//! writer mirrors the element taxonomy: content already known safe is
//! copied verbatim, everything else is re-escaped from scratch.

use alloc::borrow::Cow;
use alloc::string::String;

use bstr::ByteSlice;

use crate::error::Error;
use crate::parse;
use crate::render;
use crate::scanner::string_ok;
use crate::value::{ValueRef, int_to_text, real_to_text};

#[derive(Debug, Default)]
pub(crate) struct JsonText {
    buf: String,
    malformed: bool,
}

impl JsonText {
    pub(crate) fn new() -> JsonText {
        JsonText::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.buf
    }

    pub(crate) fn mark_malformed(&mut self) {
        self.malformed = true;
    }

    pub(crate) fn into_result(self) -> Result<String, Error> {
        if self.malformed {
            return Err(Error::Malformed);
        }
        Ok(self.buf)
    }

    pub(crate) fn push(&mut self, c: char) {
        self.buf.push(c);
    }

    pub(crate) fn push_str(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    /// Appends payload bytes taken from a binary element. Host blobs can
    /// smuggle arbitrary bytes here, so invalid UTF-8 is replaced rather
    /// than trusted.
    pub(crate) fn push_payload(&mut self, bytes: &[u8]) {
        match bytes.to_str_lossy() {
            Cow::Borrowed(s) => self.buf.push_str(s),
            Cow::Owned(s) => self.buf.push_str(&s),
        }
    }

    /// Appends a `,` between container items: a no-op right after the
    /// opening bracket so the first item gets no separator.
    pub(crate) fn append_separator(&mut self) {
        match self.buf.as_bytes().last() {
            None | Some(b'[' | b'{') => {}
            Some(_) => self.buf.push(','),
        }
    }

    /// Appends `s` as a quoted JSON string literal, escaping as needed:
    /// `"` and `\` get a backslash, the short-escape controls their
    /// letter, remaining controls a `\u00XX`. A single quote passes
    /// through raw.
    pub(crate) fn append_quoted(&mut self, s: &str) {
        self.buf.push('"');
        let z = s.as_bytes();
        let mut i = 0;
        while i < z.len() {
            let start = i;
            while i < z.len() && (string_ok(z[i]) || z[i] == b'\'') {
                i += 1;
            }
            if i > start {
                // Escape bytes are ASCII, so the run is on char boundaries.
                self.buf.push_str(&s[start..i]);
            }
            if i >= z.len() {
                break;
            }
            let c = z[i];
            match c {
                b'"' => self.buf.push_str("\\\""),
                b'\\' => self.buf.push_str("\\\\"),
                0x08 => self.buf.push_str("\\b"),
                0x09 => self.buf.push_str("\\t"),
                0x0a => self.buf.push_str("\\n"),
                0x0c => self.buf.push_str("\\f"),
                0x0d => self.buf.push_str("\\r"),
                _ => {
                    self.buf.push_str("\\u00");
                    self.buf.push(char::from_digit(u32::from(c) >> 4, 16).unwrap_or('0'));
                    self.buf.push(char::from_digit(u32::from(c) & 0xf, 16).unwrap_or('0'));
                }
            }
            i += 1;
        }
        self.buf.push('"');
    }

    /// Appends a host value the way `quote()` would: SQL text becomes a
    /// JSON string, tagged JSON text and numbers pass through, a BJSON
    /// blob is rendered, and any other blob is refused.
    pub(crate) fn append_value(&mut self, v: &ValueRef<'_>) -> Result<(), Error> {
        match *v {
            ValueRef::Null => self.buf.push_str("null"),
            ValueRef::Integer(i) => self.buf.push_str(&int_to_text(i)),
            ValueRef::Real(r) => self.buf.push_str(&real_to_text(r)),
            ValueRef::Text { text, tagged } => {
                if tagged {
                    self.buf.push_str(text);
                } else {
                    self.append_quoted(text);
                }
            }
            ValueRef::Blob(b) => {
                if !parse::might_be_blob(b) {
                    return Err(Error::BlobValue);
                }
                render::render_element(b, 0, self);
            }
        }
        Ok(())
    }

    /// Drops everything from byte `n` on. The window-aggregate inverse
    /// uses this to rewind to a prefix it has already measured.
    pub(crate) fn truncate(&mut self, n: usize) {
        self.buf.truncate(n);
    }

    /// Splices out `buf[1..=cut]`, keeping the opening bracket: the
    /// window-inverse removal of a leading element plus its comma.
    pub(crate) fn remove_leading(&mut self, cut: usize) {
        self.buf.replace_range(1..=cut, "");
    }
}
