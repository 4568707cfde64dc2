//! The scalar-function surface.
//!
//! Every function here mirrors one SQL-visible function of the JSON
//! subsystem. Arguments arrive as [`ValueRef`]s, results leave as
//! [`SqlValue`]s, and a NULL anywhere a document or path is expected
//! yields a NULL result (`Ok(None)`) rather than an error, per the
//! host's three-valued conventions.
//!
//! Functions that produce JSON take an [`OutputClass`]: `Text` renders
//! canonical JSON tagged with the host's JSON sub-type, `Blob` hands
//! back the binary encoding — the `b*` twins of the text forms.

use alloc::borrow::Cow;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use crate::cache::{CacheEntry, FuncCtx};
use crate::error::Error;
use crate::header;
use crate::kind::Kind;
use crate::lookup::{EditJob, EditOp, Lookup, lookup_step};
use crate::merge::merge_patch;
use crate::parse::{Parse, might_be_blob};
use crate::parser;
use crate::rcstr::RcText;
use crate::render;
use crate::text::JsonText;
use crate::value::{OutputClass, SqlValue, ValueRef, int_to_text, real_to_text};

/// Parses a document argument: the first argument of most functions.
///
/// NULL is absent; a blob is adopted as a read-only view; text goes
/// through the statement cache and the parser; numbers parse their
/// canonical text form. With `editable` the returned parse owns a
/// private buffer (a clone, for cache hits).
pub(crate) fn doc_arg<'a>(
    ctx: &mut FuncCtx,
    v: &ValueRef<'a>,
    editable: bool,
) -> Result<Option<Parse<'a>>, Error> {
    match *v {
        ValueRef::Null => Ok(None),
        ValueRef::Blob(b) => {
            let mut p = Parse::from_blob(b)?;
            if editable {
                p.make_editable(0);
            }
            Ok(Some(p))
        }
        ValueRef::Text { text, .. } => {
            if let Some(entry) = ctx.cache.search(text) {
                if editable {
                    return Ok(Some(Parse::from_owned(entry.blob.clone(), entry.has_nonstd)));
                }
                return Ok(Some(Parse::from_cache(entry)));
            }
            let out = parser::parse_text(text).map_err(|_| Error::Malformed)?;
            let entry = Arc::new(CacheEntry {
                text: RcText::intern(text),
                blob: out.blob,
                has_nonstd: out.has_nonstd,
            });
            ctx.cache.insert(Arc::clone(&entry));
            if editable {
                Ok(Some(Parse::from_owned(entry.blob.clone(), entry.has_nonstd)))
            } else {
                Ok(Some(Parse::from_cache(entry)))
            }
        }
        ValueRef::Integer(n) => {
            let out = parser::parse_text(&int_to_text(n)).map_err(|_| Error::Malformed)?;
            Ok(Some(Parse::from_owned(out.blob, out.has_nonstd)))
        }
        ValueRef::Real(r) => {
            let out = parser::parse_text(&real_to_text(r)).map_err(|_| Error::Malformed)?;
            Ok(Some(Parse::from_owned(out.blob, out.has_nonstd)))
        }
    }
}

/// Encodes a value argument as one BJSON element (§ArgCoerce): tagged
/// text is parsed, untagged text becomes a raw-text element, numbers
/// keep their canonical spelling, a structurally-plausible blob is
/// adopted and anything else is refused.
fn value_to_blob(v: &ValueRef<'_>) -> Result<Vec<u8>, Error> {
    match *v {
        ValueRef::Null => Ok(vec![Kind::Null as u8]),
        ValueRef::Blob(b) => {
            if might_be_blob(b) {
                Ok(b.to_vec())
            } else {
                Err(Error::BlobValue)
            }
        }
        ValueRef::Text { text, tagged } => {
            if tagged {
                Ok(parser::parse_text(text).map_err(|_| Error::Malformed)?.blob)
            } else {
                let mut out = Vec::with_capacity(text.len() + 5);
                header::append(&mut out, Kind::TextRaw as u8, text.len());
                out.extend_from_slice(text.as_bytes());
                Ok(out)
            }
        }
        ValueRef::Integer(n) => {
            let t = int_to_text(n);
            let mut out = Vec::with_capacity(t.len() + 2);
            header::append(&mut out, Kind::Int as u8, t.len());
            out.extend_from_slice(t.as_bytes());
            Ok(out)
        }
        ValueRef::Real(r) => {
            let t = real_to_text(r);
            let mut out = Vec::with_capacity(t.len() + 2);
            header::append(&mut out, Kind::Float as u8, t.len());
            out.extend_from_slice(t.as_bytes());
            Ok(out)
        }
    }
}

fn return_parse(p: &Parse<'_>, class: OutputClass) -> Result<SqlValue, Error> {
    match class {
        OutputClass::Blob => Ok(SqlValue::Blob(p.blob().to_vec())),
        OutputClass::Text => Ok(SqlValue::json_text(p.to_json_text()?)),
    }
}

/// Host text of a path argument; `None` for NULL.
fn path_text<'a>(v: &'a ValueRef<'_>) -> Option<Cow<'a, str>> {
    match *v {
        ValueRef::Null => None,
        ValueRef::Text { text, .. } => Some(Cow::Borrowed(text)),
        ValueRef::Integer(n) => Some(Cow::Owned(int_to_text(n))),
        ValueRef::Real(r) => Some(Cow::Owned(real_to_text(r))),
        ValueRef::Blob(b) => Some(String::from_utf8_lossy(b)),
    }
}

pub(crate) fn bad_path(path: &str) -> Error {
    Error::BadPath(path.to_string())
}

/// `make_text(v)` — coerce any document argument to canonical JSON text.
pub fn make_text(ctx: &mut FuncCtx, v: &ValueRef<'_>) -> Result<Option<SqlValue>, Error> {
    make(ctx, v, OutputClass::Text)
}

/// `make_blob(v)` — coerce any document argument to BJSON.
pub fn make_blob(ctx: &mut FuncCtx, v: &ValueRef<'_>) -> Result<Option<SqlValue>, Error> {
    make(ctx, v, OutputClass::Blob)
}

fn make(
    ctx: &mut FuncCtx,
    v: &ValueRef<'_>,
    class: OutputClass,
) -> Result<Option<SqlValue>, Error> {
    let Some(p) = doc_arg(ctx, v, false)? else {
        return Ok(None);
    };
    Ok(Some(return_parse(&p, class)?))
}

/// `quote(v)` — JSON-encode one host scalar.
pub fn quote(v: &ValueRef<'_>) -> Result<SqlValue, Error> {
    let mut out = JsonText::new();
    out.append_value(v)?;
    Ok(SqlValue::json_text(out.into_result()?))
}

/// `array(v, ...)` — build a JSON array from host values.
pub fn array(values: &[ValueRef<'_>], class: OutputClass) -> Result<SqlValue, Error> {
    let mut out = JsonText::new();
    out.push('[');
    for v in values {
        out.append_separator();
        out.append_value(v)?;
    }
    out.push(']');
    text_result(out, class)
}

/// `object(k, v, ...)` — build a JSON object from label/value pairs.
pub fn object(args: &[ValueRef<'_>], class: OutputClass) -> Result<SqlValue, Error> {
    if args.len() % 2 != 0 {
        return Err(Error::EvenArityRequired);
    }
    let mut out = JsonText::new();
    out.push('{');
    for pair in args.chunks(2) {
        let ValueRef::Text { text: key, .. } = pair[0] else {
            return Err(Error::NonTextLabel);
        };
        out.append_separator();
        out.append_quoted(key);
        out.push(':');
        out.append_value(&pair[1])?;
    }
    out.push('}');
    text_result(out, class)
}

/// A finished text builder, returned as tagged text or re-encoded as a
/// blob per the output class.
fn text_result(out: JsonText, class: OutputClass) -> Result<SqlValue, Error> {
    let text = out.into_result()?;
    match class {
        OutputClass::Text => Ok(SqlValue::json_text(text)),
        OutputClass::Blob => Ok(SqlValue::Blob(
            parser::parse_text(&text)
                .map_err(|_| Error::Malformed)?
                .blob,
        )),
    }
}

/// `array_length(j [, path])` — element count of the array at the root
/// or at `path`; 0 when the element is not an array.
pub fn array_length(
    ctx: &mut FuncCtx,
    j: &ValueRef<'_>,
    path: Option<&ValueRef<'_>>,
) -> Result<Option<i64>, Error> {
    let Some(mut p) = doc_arg(ctx, j, false)? else {
        return Ok(None);
    };
    let root = match path {
        None => 0,
        Some(pv) => {
            let Some(path) = path_text(pv) else {
                return Ok(None);
            };
            let suffix = path.strip_prefix('$').ok_or_else(|| bad_path(&path))?;
            match lookup_step(&mut p, 0, suffix.as_bytes(), None, None) {
                Lookup::Found(at) => at,
                Lookup::NotFound => return Ok(None),
                Lookup::PathError => return Err(bad_path(&path)),
                Lookup::Malformed => return Err(Error::Malformed),
            }
        }
    };
    if p.kind_at(root) != Some(Kind::Array) {
        return Ok(Some(0));
    }
    let (n, sz) = p.payload_size(root).ok_or(Error::Malformed)?;
    let end = root + n + sz;
    let mut i = root + n;
    let mut count = 0i64;
    while i < end {
        let (cn, csz) = p.payload_size(i).ok_or(Error::Malformed)?;
        i += cn + csz;
        count += 1;
    }
    Ok(Some(count))
}

/// `extract(j, path, ...)` — one path yields the element itself; several
/// paths yield a JSON array with `null` for the misses.
pub fn extract(
    ctx: &mut FuncCtx,
    j: &ValueRef<'_>,
    paths: &[ValueRef<'_>],
    class: OutputClass,
) -> Result<Option<SqlValue>, Error> {
    let Some(mut p) = doc_arg(ctx, j, false)? else {
        return Ok(None);
    };
    if paths.is_empty() {
        return Ok(None);
    }
    let multi = paths.len() > 1;
    let mut out = JsonText::new();
    out.push('[');
    for pv in paths {
        let Some(path) = path_text(pv) else {
            return Ok(None);
        };
        let suffix = path.strip_prefix('$').ok_or_else(|| bad_path(&path))?;
        match lookup_step(&mut p, 0, suffix.as_bytes(), None, None) {
            Lookup::Found(at) => {
                if multi {
                    out.append_separator();
                    render::render_element(p.blob(), at, &mut out);
                } else {
                    return Ok(Some(render::element_to_value(p.blob(), at, class)?));
                }
            }
            Lookup::NotFound => {
                if multi {
                    out.append_separator();
                    out.push_str("null");
                } else {
                    return Ok(None);
                }
            }
            Lookup::PathError => return Err(bad_path(&path)),
            Lookup::Malformed => return Err(Error::Malformed),
        }
    }
    out.push(']');
    Ok(Some(text_result(out, class)?))
}

/// The abbreviated path forms accepted by the arrow operators: a bare
/// integer means `$[n]`, a bare label `$.label`, and `[n]` keeps its
/// meaning; a full `$...` path passes through.
fn abbrev_suffix(path: &str) -> Cow<'_, str> {
    if let Some(suffix) = path.strip_prefix('$') {
        Cow::Borrowed(suffix)
    } else if path.bytes().next().is_some_and(|b| b.is_ascii_digit()) {
        Cow::Owned(alloc::format!("[{path}]"))
    } else if path.starts_with('[') {
        Cow::Borrowed(path)
    } else {
        Cow::Owned(alloc::format!(".{path}"))
    }
}

/// `arrow(j, path)` — single-path extract whose result is always JSON
/// text, abbreviated paths allowed.
pub fn arrow(
    ctx: &mut FuncCtx,
    j: &ValueRef<'_>,
    path: &ValueRef<'_>,
) -> Result<Option<SqlValue>, Error> {
    let Some(mut p) = doc_arg(ctx, j, false)? else {
        return Ok(None);
    };
    let Some(path) = path_text(path) else {
        return Ok(None);
    };
    let suffix = abbrev_suffix(&path);
    match lookup_step(&mut p, 0, suffix.as_bytes(), None, None) {
        Lookup::Found(at) => {
            let mut out = JsonText::new();
            render::render_element(p.blob(), at, &mut out);
            Ok(Some(SqlValue::json_text(out.into_result()?)))
        }
        Lookup::NotFound => Ok(None),
        Lookup::PathError => Err(bad_path(&path)),
        Lookup::Malformed => Err(Error::Malformed),
    }
}

/// `arrow2(j, path)` — single-path extract whose result is always a host
/// value (containers come back as plain, untagged JSON text).
pub fn arrow2(
    ctx: &mut FuncCtx,
    j: &ValueRef<'_>,
    path: &ValueRef<'_>,
) -> Result<Option<SqlValue>, Error> {
    let Some(mut p) = doc_arg(ctx, j, false)? else {
        return Ok(None);
    };
    let Some(path) = path_text(path) else {
        return Ok(None);
    };
    let suffix = abbrev_suffix(&path);
    match lookup_step(&mut p, 0, suffix.as_bytes(), None, None) {
        Lookup::Found(at) => {
            let v = match render::element_to_value(p.blob(), at, OutputClass::Text)? {
                SqlValue::Text { text, .. } => SqlValue::Text {
                    text,
                    tagged: false,
                },
                other => other,
            };
            Ok(Some(v))
        }
        Lookup::NotFound => Ok(None),
        Lookup::PathError => Err(bad_path(&path)),
        Lookup::Malformed => Err(Error::Malformed),
    }
}

/// `insert(j, path, v, ...)` — create at each path that is missing.
pub fn insert(
    ctx: &mut FuncCtx,
    args: &[ValueRef<'_>],
    class: OutputClass,
) -> Result<Option<SqlValue>, Error> {
    edit_function(ctx, args, EditOp::Insert, "insert", class)
}

/// `replace(j, path, v, ...)` — overwrite each path that exists.
pub fn replace(
    ctx: &mut FuncCtx,
    args: &[ValueRef<'_>],
    class: OutputClass,
) -> Result<Option<SqlValue>, Error> {
    edit_function(ctx, args, EditOp::Replace, "replace", class)
}

/// `set(j, path, v, ...)` — overwrite or create at each path.
pub fn set(
    ctx: &mut FuncCtx,
    args: &[ValueRef<'_>],
    class: OutputClass,
) -> Result<Option<SqlValue>, Error> {
    edit_function(ctx, args, EditOp::Set, "set", class)
}

fn edit_function(
    ctx: &mut FuncCtx,
    args: &[ValueRef<'_>],
    op: EditOp,
    name: &'static str,
    class: OutputClass,
) -> Result<Option<SqlValue>, Error> {
    if args.is_empty() {
        return Ok(None);
    }
    if args.len() % 2 == 0 {
        return Err(Error::OddArityRequired(name));
    }
    let Some(mut p) = doc_arg(ctx, &args[0], args.len() > 1)? else {
        return Ok(None);
    };
    let mut i = 1;
    while i + 1 < args.len() {
        let (path_arg, value_arg) = (&args[i], &args[i + 1]);
        i += 2;
        let Some(path) = path_text(path_arg) else {
            // A NULL path skips its pair.
            continue;
        };
        let suffix = path.strip_prefix('$').ok_or_else(|| bad_path(&path))?;
        let ins = value_to_blob(value_arg)?;
        p.delta = 0;
        if suffix.is_empty() {
            if matches!(op, EditOp::Replace | EditOp::Set) {
                let whole = p.blob().len();
                p.blob_edit(0, whole, &ins);
            }
            continue;
        }
        let job = EditJob { op, ins: &ins };
        match lookup_step(&mut p, 0, suffix.as_bytes(), None, Some(&job)) {
            Lookup::Found(_) | Lookup::NotFound => {}
            Lookup::PathError => return Err(bad_path(&path)),
            Lookup::Malformed => return Err(Error::Malformed),
        }
    }
    Ok(Some(return_parse(&p, class)?))
}

/// `remove(j, path, ...)` — delete each named element. Removing `$`
/// removes everything: the result is NULL.
pub fn remove(
    ctx: &mut FuncCtx,
    args: &[ValueRef<'_>],
    class: OutputClass,
) -> Result<Option<SqlValue>, Error> {
    if args.is_empty() {
        return Ok(None);
    }
    let Some(mut p) = doc_arg(ctx, &args[0], args.len() > 1)? else {
        return Ok(None);
    };
    for path_arg in &args[1..] {
        let Some(path) = path_text(path_arg) else {
            return Ok(None);
        };
        let suffix = path.strip_prefix('$').ok_or_else(|| bad_path(&path))?;
        if suffix.is_empty() {
            return Ok(None);
        }
        p.delta = 0;
        let job = EditJob {
            op: EditOp::Delete,
            ins: &[],
        };
        match lookup_step(&mut p, 0, suffix.as_bytes(), None, Some(&job)) {
            Lookup::Found(_) | Lookup::NotFound => {}
            Lookup::PathError => return Err(bad_path(&path)),
            Lookup::Malformed => return Err(Error::Malformed),
        }
    }
    Ok(Some(return_parse(&p, class)?))
}

/// `patch(t, p)` — RFC 7396 merge-patch.
pub fn patch(
    ctx: &mut FuncCtx,
    target: &ValueRef<'_>,
    patch_arg: &ValueRef<'_>,
    class: OutputClass,
) -> Result<Option<SqlValue>, Error> {
    let Some(mut t) = doc_arg(ctx, target, true)? else {
        return Ok(None);
    };
    let Some(p) = doc_arg(ctx, patch_arg, false)? else {
        return Ok(None);
    };
    merge_patch(&mut t, 0, p.blob(), 0).map_err(|_| Error::Malformed)?;
    Ok(Some(return_parse(&t, class)?))
}

/// `type_of(j [, path])` — the SQL-visible type name of the element.
pub fn type_of(
    ctx: &mut FuncCtx,
    j: &ValueRef<'_>,
    path: Option<&ValueRef<'_>>,
) -> Result<Option<&'static str>, Error> {
    let Some(mut p) = doc_arg(ctx, j, false)? else {
        return Ok(None);
    };
    let at = match path {
        None => 0,
        Some(pv) => {
            let Some(path) = path_text(pv) else {
                return Ok(None);
            };
            if path.is_empty() {
                return Err(bad_path(""));
            }
            let suffix = path.strip_prefix('$').ok_or_else(|| bad_path(&path))?;
            match lookup_step(&mut p, 0, suffix.as_bytes(), None, None) {
                Lookup::Found(at) => at,
                Lookup::NotFound => return Ok(None),
                Lookup::PathError => return Err(bad_path(&path)),
                Lookup::Malformed => return Err(Error::Malformed),
            }
        }
    };
    let kind = p.kind_at(at).ok_or(Error::Malformed)?;
    Ok(Some(kind.sql_name()))
}

/// `valid(j [, flags])` — well-formedness under the flag bitmask:
/// 1 strict text, 2 extended text, 4 superficial blob, 8 strict blob
/// (currently an alias of 4).
pub fn valid(
    ctx: &mut FuncCtx,
    j: &ValueRef<'_>,
    flags: Option<i64>,
) -> Result<Option<bool>, Error> {
    let f = flags.unwrap_or(1);
    if !(1..=15).contains(&f) {
        return Err(Error::FlagsRange);
    }
    let f = f as u8;
    match *j {
        ValueRef::Null => Ok(None),
        ValueRef::Blob(b) => Ok(Some(f & 0x0c != 0 && might_be_blob(b))),
        ValueRef::Text { text, .. } => {
            if f & 0x03 == 0 {
                return Ok(Some(false));
            }
            let has_nonstd = if let Some(entry) = ctx.cache.search(text) {
                entry.has_nonstd
            } else {
                match parser::parse_text(text) {
                    Ok(out) => {
                        let nonstd = out.has_nonstd;
                        ctx.cache.insert(Arc::new(CacheEntry {
                            text: RcText::intern(text),
                            blob: out.blob,
                            has_nonstd: nonstd,
                        }));
                        nonstd
                    }
                    Err(_) => return Ok(Some(false)),
                }
            };
            Ok(Some(f & 0x02 != 0 || !has_nonstd))
        }
        ValueRef::Integer(n) => Ok(Some(f & 0x03 != 0 && parser::parse_text(&int_to_text(n)).is_ok())),
        ValueRef::Real(r) => Ok(Some(f & 0x03 != 0 && parser::parse_text(&real_to_text(r)).is_ok())),
    }
}

/// `error_position(j)` — 1-based character offset of the first syntax
/// error in a text document, 0 when it parses (or the blob passes the
/// superficial check), 1 for a blob that is clearly not BJSON.
pub fn error_position(_ctx: &mut FuncCtx, j: &ValueRef<'_>) -> Result<Option<i64>, Error> {
    match *j {
        ValueRef::Null => Ok(None),
        ValueRef::Blob(b) => Ok(Some(i64::from(!might_be_blob(b)))),
        ValueRef::Text { text, .. } => {
            if text.is_empty() {
                return Ok(Some(1));
            }
            match parser::parse_text(text) {
                Ok(_) => Ok(Some(0)),
                Err(e) => {
                    let chars = text
                        .as_bytes()
                        .iter()
                        .take(e.offset)
                        .filter(|&&b| b & 0xc0 != 0x80)
                        .count();
                    Ok(Some(chars as i64 + 1))
                }
            }
        }
        ValueRef::Integer(_) | ValueRef::Real(_) => Ok(Some(0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> FuncCtx {
        FuncCtx::new()
    }

    #[test]
    fn make_text_canonicalizes() {
        let mut c = ctx();
        let v = make_text(&mut c, &ValueRef::json("{a: 'b', }")).unwrap().unwrap();
        assert_eq!(v.as_text(), Some("{\"a\":\"b\"}"));
        assert!(make_text(&mut c, &ValueRef::Null).unwrap().is_none());
    }

    #[test]
    fn make_blob_and_back() {
        let mut c = ctx();
        let b = make_blob(&mut c, &ValueRef::text("[1,2]")).unwrap().unwrap();
        let blob = b.as_blob().unwrap();
        let t = make_text(&mut c, &ValueRef::Blob(blob)).unwrap().unwrap();
        assert_eq!(t.as_text(), Some("[1,2]"));
    }

    #[test]
    fn doc_arg_uses_cache() {
        let mut c = ctx();
        let text = "{\"k\":[1,2,3]}";
        let a = make_text(&mut c, &ValueRef::text(text)).unwrap().unwrap();
        let b = make_text(&mut c, &ValueRef::text(text)).unwrap().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn numeric_documents() {
        let mut c = ctx();
        assert_eq!(
            type_of(&mut c, &ValueRef::Integer(5), None).unwrap(),
            Some("integer")
        );
        assert_eq!(
            type_of(&mut c, &ValueRef::Real(1.5), None).unwrap(),
            Some("real")
        );
    }

    #[test]
    fn quote_values() {
        assert_eq!(
            quote(&ValueRef::text("it's")).unwrap().as_text(),
            Some("\"it's\"")
        );
        assert_eq!(quote(&ValueRef::Integer(7)).unwrap().as_text(), Some("7"));
        assert_eq!(quote(&ValueRef::Null).unwrap().as_text(), Some("null"));
        assert_eq!(
            quote(&ValueRef::Real(2.0)).unwrap().as_text(),
            Some("2.0")
        );
        assert_eq!(
            quote(&ValueRef::json("[1,2]")).unwrap().as_text(),
            Some("[1,2]")
        );
    }

    #[test]
    fn abbreviated_paths() {
        assert_eq!(abbrev_suffix("$.a.b"), ".a.b");
        assert_eq!(abbrev_suffix("3"), "[3]");
        assert_eq!(abbrev_suffix("[3]"), "[3]");
        assert_eq!(abbrev_suffix("label"), ".label");
    }

    #[test]
    fn arrow_forces_json() {
        let mut c = ctx();
        let j = ValueRef::text("{\"a\":\"x\",\"b\":[1]}");
        let v = arrow(&mut c, &j, &ValueRef::text("a")).unwrap().unwrap();
        assert_eq!(v, SqlValue::json_text("\"x\"".into()));
        let v = arrow2(&mut c, &j, &ValueRef::text("a")).unwrap().unwrap();
        assert_eq!(
            v,
            SqlValue::Text {
                text: "x".into(),
                tagged: false
            }
        );
        let v = arrow2(&mut c, &j, &ValueRef::text("b")).unwrap().unwrap();
        assert_eq!(
            v,
            SqlValue::Text {
                text: "[1]".into(),
                tagged: false
            }
        );
    }

    #[test]
    fn edit_skips_null_paths() {
        let mut c = ctx();
        let args = [
            ValueRef::text("{\"a\":1}"),
            ValueRef::Null,
            ValueRef::Integer(9),
        ];
        let v = set(&mut c, &args, OutputClass::Text).unwrap().unwrap();
        assert_eq!(v.as_text(), Some("{\"a\":1}"));
    }

    #[test]
    fn remove_root_returns_null() {
        let mut c = ctx();
        let args = [ValueRef::text("{\"a\":1}"), ValueRef::text("$")];
        assert!(remove(&mut c, &args, OutputClass::Text).unwrap().is_none());
    }

    #[test]
    fn whole_document_replace() {
        let mut c = ctx();
        let args = [
            ValueRef::text("{\"a\":1}"),
            ValueRef::text("$"),
            ValueRef::Integer(4),
        ];
        let v = set(&mut c, &args, OutputClass::Text).unwrap().unwrap();
        assert_eq!(v.as_text(), Some("4"));
        // insert at $ is a no-op: the root always exists.
        let v = insert(&mut c, &args, OutputClass::Text).unwrap().unwrap();
        assert_eq!(v.as_text(), Some("{\"a\":1}"));
    }

    #[test]
    fn arity_errors() {
        let mut c = ctx();
        let args = [ValueRef::text("{}"), ValueRef::text("$.a")];
        assert_eq!(
            set(&mut c, &args, OutputClass::Text),
            Err(Error::OddArityRequired("set"))
        );
        assert_eq!(
            object(&[ValueRef::text("k")], OutputClass::Text),
            Err(Error::EvenArityRequired)
        );
        assert_eq!(
            object(
                &[ValueRef::Integer(1), ValueRef::Integer(2)],
                OutputClass::Text
            ),
            Err(Error::NonTextLabel)
        );
    }

    #[test]
    fn untagged_text_value_is_quoted_not_parsed() {
        let mut c = ctx();
        let args = [
            ValueRef::text("{}"),
            ValueRef::text("$.a"),
            ValueRef::text("[1,2]"),
        ];
        let v = set(&mut c, &args, OutputClass::Text).unwrap().unwrap();
        assert_eq!(v.as_text(), Some("{\"a\":\"[1,2]\"}"));

        let args = [
            ValueRef::text("{}"),
            ValueRef::text("$.a"),
            ValueRef::json("[1,2]"),
        ];
        let v = set(&mut c, &args, OutputClass::Text).unwrap().unwrap();
        assert_eq!(v.as_text(), Some("{\"a\":[1,2]}"));
    }

    #[test]
    fn valid_flag_matrix() {
        let mut c = ctx();
        let json5 = ValueRef::text("{a:1,}");
        assert_eq!(valid(&mut c, &json5, Some(2)).unwrap(), Some(true));
        assert_eq!(valid(&mut c, &json5, Some(1)).unwrap(), Some(false));
        let strict = ValueRef::text("{\"a\":1}");
        assert_eq!(valid(&mut c, &strict, None).unwrap(), Some(true));
        assert_eq!(valid(&mut c, &strict, Some(4)).unwrap(), Some(false));
        assert_eq!(valid(&mut c, &ValueRef::Null, Some(1)).unwrap(), None);
        assert_eq!(
            valid(&mut c, &strict, Some(16)),
            Err(Error::FlagsRange)
        );
        let blob = make_blob(&mut c, &ValueRef::text("[1]")).unwrap().unwrap();
        let blob = ValueRef::Blob(blob.as_blob().unwrap());
        assert_eq!(valid(&mut c, &blob, Some(4)).unwrap(), Some(true));
        assert_eq!(valid(&mut c, &blob, Some(8)).unwrap(), Some(true));
        assert_eq!(valid(&mut c, &blob, Some(1)).unwrap(), Some(false));
    }

    #[test]
    fn error_positions() {
        let mut c = ctx();
        assert_eq!(
            error_position(&mut c, &ValueRef::text("[1,2,,3]")).unwrap(),
            Some(6)
        );
        assert_eq!(
            error_position(&mut c, &ValueRef::text("[1,2]")).unwrap(),
            Some(0)
        );
        // Multi-byte characters count once.
        assert_eq!(
            error_position(&mut c, &ValueRef::text("[\"héllo\",]x")).unwrap(),
            Some(11)
        );
        assert_eq!(
            error_position(&mut c, &ValueRef::Blob(b"\x00")).unwrap(),
            Some(0)
        );
        assert_eq!(
            error_position(&mut c, &ValueRef::Blob(b"nope")).unwrap(),
            Some(1)
        );
    }
}
