//! The aggregate functions `group_array(v)` and `group_object(k, v)`.
//!
//! Both build their JSON text incrementally in the aggregate state, so a
//! running window query never re-renders the whole group. The window
//! inverse removes the first element by scanning for the first `,` that
//! sits outside every string and nested container, then splicing the
//! prefix away — the accumulated text is trusted to be well-formed
//! because this module produced it.

use alloc::borrow::Cow;
use alloc::string::String;

use crate::error::Error;
use crate::parser;
use crate::text::JsonText;
use crate::value::{OutputClass, SqlValue, ValueRef, int_to_text, real_to_text};

/// Aggregate state for `group_array`.
#[derive(Debug, Default)]
pub struct GroupArray {
    acc: Option<JsonText>,
}

impl GroupArray {
    #[must_use]
    pub fn new() -> GroupArray {
        GroupArray::default()
    }

    /// Folds one row's value into the array under construction.
    pub fn step(&mut self, v: &ValueRef<'_>) -> Result<(), Error> {
        let acc = self.acc.get_or_insert_with(|| {
            let mut t = JsonText::new();
            t.push('[');
            t
        });
        if acc.len() > 1 {
            acc.push(',');
        }
        acc.append_value(v)
    }

    /// Window inverse: drops the earliest element.
    pub fn inverse(&mut self) {
        if let Some(acc) = &mut self.acc {
            drop_first_element(acc);
        }
    }

    /// The aggregate so far, usable mid-window.
    pub fn value(&self, class: OutputClass) -> Result<SqlValue, Error> {
        close_and_return(self.acc.as_ref(), '[', ']', class)
    }

    /// The final aggregate.
    pub fn finish(self, class: OutputClass) -> Result<SqlValue, Error> {
        self.value(class)
    }
}

/// Aggregate state for `group_object`.
#[derive(Debug, Default)]
pub struct GroupObject {
    acc: Option<JsonText>,
}

impl GroupObject {
    #[must_use]
    pub fn new() -> GroupObject {
        GroupObject::default()
    }

    /// Folds one row's label/value pair into the object under
    /// construction. The label is coerced to text the way the host
    /// would coerce any value.
    pub fn step(&mut self, key: &ValueRef<'_>, v: &ValueRef<'_>) -> Result<(), Error> {
        let acc = self.acc.get_or_insert_with(|| {
            let mut t = JsonText::new();
            t.push('{');
            t
        });
        if acc.len() > 1 {
            acc.push(',');
        }
        acc.append_quoted(&key_text(key));
        acc.push(':');
        acc.append_value(v)
    }

    /// Window inverse: drops the earliest pair.
    pub fn inverse(&mut self) {
        if let Some(acc) = &mut self.acc {
            drop_first_element(acc);
        }
    }

    /// The aggregate so far, usable mid-window.
    pub fn value(&self, class: OutputClass) -> Result<SqlValue, Error> {
        close_and_return(self.acc.as_ref(), '{', '}', class)
    }

    /// The final aggregate.
    pub fn finish(self, class: OutputClass) -> Result<SqlValue, Error> {
        self.value(class)
    }
}

fn key_text<'a>(v: &'a ValueRef<'_>) -> Cow<'a, str> {
    match *v {
        ValueRef::Null => Cow::Borrowed(""),
        ValueRef::Text { text, .. } => Cow::Borrowed(text),
        ValueRef::Integer(n) => Cow::Owned(int_to_text(n)),
        ValueRef::Real(r) => Cow::Owned(real_to_text(r)),
        ValueRef::Blob(b) => String::from_utf8_lossy(b),
    }
}

fn close_and_return(
    acc: Option<&JsonText>,
    open: char,
    close: char,
    class: OutputClass,
) -> Result<SqlValue, Error> {
    let mut text = match acc {
        Some(t) => String::from(t.as_str()),
        None => String::from(open),
    };
    text.push(close);
    match class {
        OutputClass::Text => Ok(SqlValue::json_text(text)),
        OutputClass::Blob => Ok(SqlValue::Blob(
            parser::parse_text(&text)
                .map_err(|_| Error::Malformed)?
                .blob,
        )),
    }
}

/// Removes everything from just after the opening bracket through the
/// first top-level comma; with no such comma the accumulator reverts to
/// the bare bracket.
fn drop_first_element(acc: &mut JsonText) {
    let z = acc.as_str().as_bytes();
    let mut in_str = false;
    let mut nest = 0u32;
    let mut i = 1;
    while i < z.len() {
        let c = z[i];
        if c == b',' && !in_str && nest == 0 {
            break;
        }
        if c == b'"' {
            in_str = !in_str;
        } else if c == b'\\' {
            i += 1;
        } else if !in_str {
            if c == b'{' || c == b'[' {
                nest += 1;
            } else if c == b'}' || c == b']' {
                nest = nest.saturating_sub(1);
            }
        }
        i += 1;
    }
    if i < acc.len() {
        acc.remove_leading(i);
    } else {
        acc.truncate(1);
    }
}
