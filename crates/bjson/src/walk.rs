//! Table-valued iteration over a document: `walk_each` visits the
//! immediate children of one element, `walk_tree` the whole subtree in
//! pre-order.
//!
//! The driver is a thin loop over the navigator: a cursor holds the
//! offset of the current element, the span of the element being walked,
//! and (for the tree walk) a stack of enclosing containers used to
//! rebuild the `path` and `fullkey` columns and to pop levels when a
//! container's span is exhausted. Iteration ends early if the encoding
//! comes apart mid-walk; the superficial check cannot rule that out for
//! adopted blobs.

use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;

use bstr::ByteSlice;

use crate::cache::FuncCtx;
use crate::error::Error;
use crate::func::{bad_path, doc_arg};
use crate::kind::Kind;
use crate::lookup::{Lookup, lookup_step};
use crate::parse::Parse;
use crate::render;
use crate::value::{OutputClass, SqlValue, ValueRef};

/// One row of `walk_each` / `walk_tree`, in the fixed column order of
/// the table-valued interface.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkRow {
    /// Object label, array index, or NULL for a root element.
    pub key: SqlValue,
    /// The element as a host value; containers render as JSON text.
    pub value: SqlValue,
    /// The SQL-visible type name (`type` column).
    pub kind: &'static str,
    /// The element again for primitives, NULL for containers.
    pub atom: SqlValue,
    /// Byte offset of the row's element (its label, for object members):
    /// a stable identifier within one document.
    pub id: i64,
    /// `id` of the enclosing container row, tree walk only.
    pub parent: Option<i64>,
    /// Full path to this element, label spelled out.
    pub fullkey: String,
    /// Path to the container holding this element.
    pub path: String,
}

struct ParentFrame {
    /// Offset of the container row's element (label included).
    head: usize,
    /// Offset of the container value itself.
    value: usize,
    /// First byte past the container's payload.
    end: usize,
    /// Running array index; -1 until the first child is reached.
    key: i64,
    /// Length of `path` when this frame was entered.
    path_len: usize,
}

/// Cursor over one walked document.
pub struct Walk<'a> {
    p: Parse<'a>,
    /// Offset of the current row's element (label first, for members).
    i: usize,
    /// One past the last byte of the walked span.
    end: usize,
    /// Kind of the container the cursor is inside, when any.
    etype: Option<Kind>,
    recursive: bool,
    rowid: i64,
    /// Byte length of the root path prefix inside `path`.
    root_len: usize,
    path: String,
    parents: Vec<ParentFrame>,
}

/// `walk_each(j [, root])` — one row per immediate child of the element
/// at `root` (default `$`), or a single row for a primitive element.
pub fn walk_each<'a>(
    ctx: &mut FuncCtx,
    j: &ValueRef<'a>,
    root: Option<&str>,
) -> Result<Walk<'a>, Error> {
    setup(ctx, j, root, false)
}

/// `walk_tree(j [, root])` — pre-order traversal of the whole subtree,
/// starting with the root element itself.
pub fn walk_tree<'a>(
    ctx: &mut FuncCtx,
    j: &ValueRef<'a>,
    root: Option<&str>,
) -> Result<Walk<'a>, Error> {
    setup(ctx, j, root, true)
}

fn empty_walk(recursive: bool) -> Walk<'static> {
    Walk {
        p: Parse::from_owned(vec![Kind::Null as u8], false),
        i: 0,
        end: 0,
        etype: None,
        recursive,
        rowid: 0,
        root_len: 1,
        path: String::from("$"),
        parents: Vec::new(),
    }
}

fn setup<'a>(
    ctx: &mut FuncCtx,
    j: &ValueRef<'a>,
    root: Option<&str>,
    recursive: bool,
) -> Result<Walk<'a>, Error> {
    let Some(p) = doc_arg(ctx, j, false)? else {
        return Ok(empty_walk(recursive));
    };
    let mut w = Walk {
        p,
        i: 0,
        end: 0,
        etype: None,
        recursive,
        rowid: 0,
        root_len: 1,
        path: String::from("$"),
        parents: Vec::new(),
    };
    let mut at = 0usize;
    if let Some(root) = root {
        if !root.starts_with('$') {
            return Err(bad_path(root));
        }
        w.path = root.to_string();
        w.root_len = root.len();
        if root.len() > 1 {
            match lookup_step(&mut w.p, 0, root[1..].as_bytes(), None, None) {
                Lookup::Found(found) => {
                    if let Some(l) = w.p.found_label {
                        w.i = l;
                        w.etype = Some(Kind::Object);
                    } else {
                        w.i = found;
                        w.etype = Some(Kind::Array);
                    }
                    at = found;
                }
                Lookup::NotFound => return Ok(empty_walk(recursive)),
                Lookup::PathError | Lookup::Malformed => return Err(bad_path(root)),
            }
        }
    }
    let (n, sz) = w.p.payload_size(at).ok_or(Error::Malformed)?;
    w.end = at + n + sz;
    if w.p.kind_at(at).is_some_and(Kind::is_container) && !recursive {
        w.i = at + n;
        w.etype = w.p.kind_at(at);
        w.parents = vec![ParentFrame {
            head: w.i,
            value: at,
            end: w.end,
            key: 0,
            path_len: w.path.len(),
        }];
    }
    Ok(w)
}

impl Walk<'_> {
    /// Offset of the current row's value, past an object label.
    fn value_offset(&self) -> Option<usize> {
        if self.etype == Some(Kind::Object) {
            let (n, sz) = self.p.payload_size(self.i)?;
            Some(self.i + n + sz)
        } else {
            Some(self.i)
        }
    }

    /// Length of the `path` column for the current row: everything up
    /// to, but not including, the last step — which for the very first
    /// row of a rooted tree walk lives inside the root prefix itself.
    fn path_length(&self) -> usize {
        let n = self.path.len();
        if self.rowid == 0 && self.recursive && n > 1 {
            let z = self.path.as_bytes();
            if z[n - 1] == b']' {
                let mut k = n - 1;
                while k > 0 && z[k] != b'[' {
                    k -= 1;
                }
                return k;
            }
            let Some((_, sz)) = self.p.payload_size(self.i) else {
                return n;
            };
            let quoted = if z[n - 1] == b'"' { 2 } else { 0 };
            let mut k = n.saturating_sub(sz + quoted);
            while k > 0 && z[k] != b'.' {
                k -= 1;
            }
            return k;
        }
        n
    }

    /// Appends the current element's step (`.label` or `[idx]`) to `out`.
    fn append_path_name(&self, out: &mut String) {
        if self.etype == Some(Kind::Array) {
            let key = self.parents.last().map_or(0, |f| f.key);
            out.push_str(&alloc::format!("[{key}]"));
            return;
        }
        let Some((n, sz)) = self.p.payload_size(self.i) else {
            return;
        };
        let label = &self.p.blob()[self.i + n..self.i + n + sz];
        let plain = !label.is_empty()
            && label[0].is_ascii_alphabetic()
            && label.iter().all(u8::is_ascii_alphanumeric);
        if plain {
            out.push('.');
            out.push_str(&label.to_str_lossy());
        } else {
            out.push_str(&alloc::format!(".\"{}\"", label.to_str_lossy()));
        }
    }

    fn row(&self) -> Option<WalkRow> {
        let v = self.value_offset()?;
        let kind = self.p.kind_at(v)?;
        let value = render::element_to_value(self.p.blob(), v, OutputClass::Text).ok()?;
        let key = if self.parents.is_empty() {
            self.root_key()
        } else if self.etype == Some(Kind::Object) {
            render::element_to_value(self.p.blob(), self.i, OutputClass::Text).ok()?
        } else {
            SqlValue::Integer(self.parents.last().map_or(0, |f| f.key))
        };
        let atom = if kind.is_container() {
            SqlValue::Null
        } else {
            value.clone()
        };
        let mut fullkey = self.path.clone();
        if !self.parents.is_empty() {
            self.append_path_name(&mut fullkey);
        }
        Some(WalkRow {
            key,
            value,
            kind: kind.sql_name(),
            atom,
            id: self.i as i64,
            parent: self
                .parents
                .last()
                .filter(|_| self.recursive)
                .map(|f| f.head as i64),
            fullkey,
            path: self.path[..self.path_length()].to_string(),
        })
    }

    /// Key for a row with no enclosing container: the last step of the
    /// root path, or NULL when the walk is rooted at `$`.
    fn root_key(&self) -> SqlValue {
        if self.root_len == 1 {
            return SqlValue::Null;
        }
        let j = self.path_length();
        if self.root_len <= j {
            return SqlValue::Null;
        }
        let seg = &self.path[j..self.root_len];
        let z = seg.as_bytes();
        if z[0] == b'[' {
            let digits: String = seg
                .chars()
                .filter(char::is_ascii_digit)
                .collect();
            return SqlValue::Integer(digits.parse().unwrap_or(0));
        }
        let name = if z.len() > 2 && z[1] == b'"' {
            &seg[2..seg.len() - 1]
        } else {
            &seg[1..]
        };
        SqlValue::Text {
            text: name.to_string(),
            tagged: false,
        }
    }

    /// Advances past the current row; clamps to the end on a decoding
    /// failure so iteration stops.
    fn advance(&mut self) {
        let Some(i) = self.value_offset() else {
            self.i = self.end;
            return;
        };
        if self.recursive {
            let kind = self.p.kind_at(i);
            let Some((n, sz)) = self.p.payload_size(i) else {
                self.i = self.end;
                return;
            };
            let mut level_change = false;
            if kind.is_some_and(Kind::is_container) {
                if self.etype.is_some() && !self.parents.is_empty() {
                    let mut path = core::mem::take(&mut self.path);
                    self.append_path_name(&mut path);
                    self.path = path;
                }
                self.parents.push(ParentFrame {
                    head: self.i,
                    value: i,
                    end: i + n + sz,
                    key: -1,
                    path_len: self.path.len(),
                });
                level_change = true;
                self.i = i + n;
            } else {
                self.i = i + n + sz;
            }
            while let Some(f) = self.parents.last() {
                if self.i < f.end {
                    break;
                }
                self.path.truncate(f.path_len);
                self.parents.pop();
                level_change = true;
            }
            if level_change {
                self.etype = self
                    .parents
                    .last()
                    .and_then(|f| self.p.kind_at(f.value));
            }
        } else {
            let Some((n, sz)) = self.p.payload_size(i) else {
                self.i = self.end;
                return;
            };
            self.i = i + n + sz;
        }
        if self.etype == Some(Kind::Array) {
            if let Some(f) = self.parents.last_mut() {
                f.key += 1;
            }
        }
    }
}

impl Iterator for Walk<'_> {
    type Item = WalkRow;

    fn next(&mut self) -> Option<WalkRow> {
        if self.i >= self.end {
            return None;
        }
        let row = self.row()?;
        self.advance();
        self.rowid += 1;
        Some(row)
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    fn ctx() -> FuncCtx {
        FuncCtx::new()
    }

    fn rows(w: Walk<'_>) -> Vec<WalkRow> {
        w.collect()
    }

    #[test]
    fn each_over_object() {
        let mut c = ctx();
        let j = ValueRef::text("{\"a\":1,\"b\":[2,3]}");
        let got = rows(walk_each(&mut c, &j, None).unwrap());
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].key.as_text(), Some("a"));
        assert_eq!(got[0].value, SqlValue::Integer(1));
        assert_eq!(got[0].kind, "integer");
        assert_eq!(got[0].atom, SqlValue::Integer(1));
        assert_eq!(got[0].fullkey, "$.a");
        assert_eq!(got[0].path, "$");
        assert_eq!(got[1].key.as_text(), Some("b"));
        assert_eq!(got[1].value.as_text(), Some("[2,3]"));
        assert_eq!(got[1].kind, "array");
        assert_eq!(got[1].atom, SqlValue::Null);
        assert_eq!(got[1].fullkey, "$.b");
    }

    #[test]
    fn each_over_array_counts_keys() {
        let mut c = ctx();
        let j = ValueRef::text("[4,5,6]");
        let got = rows(walk_each(&mut c, &j, None).unwrap());
        assert_eq!(got.len(), 3);
        for (n, row) in got.iter().enumerate() {
            assert_eq!(row.key, SqlValue::Integer(n as i64));
            assert_eq!(row.fullkey, alloc::format!("$[{n}]"));
            assert_eq!(row.path, "$");
        }
    }

    #[test]
    fn each_over_scalar_is_single_row() {
        let mut c = ctx();
        let j = ValueRef::text("7");
        let got = rows(walk_each(&mut c, &j, None).unwrap());
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].key, SqlValue::Null);
        assert_eq!(got[0].value, SqlValue::Integer(7));
        assert_eq!(got[0].fullkey, "$");
        assert_eq!(got[0].path, "$");
    }

    #[test]
    fn each_with_root_path() {
        let mut c = ctx();
        let j = ValueRef::text("{\"a\":{\"x\":9}}");
        let got = rows(walk_each(&mut c, &j, Some("$.a")).unwrap());
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].key.as_text(), Some("x"));
        assert_eq!(got[0].value, SqlValue::Integer(9));
        assert_eq!(got[0].fullkey, "$.a.x");
        assert_eq!(got[0].path, "$.a");
    }

    #[test]
    fn missing_root_is_empty() {
        let mut c = ctx();
        let j = ValueRef::text("{\"a\":1}");
        assert_eq!(rows(walk_each(&mut c, &j, Some("$.zzz")).unwrap()).len(), 0);
        assert!(walk_each(&mut c, &j, Some("nope")).is_err());
    }

    #[test]
    fn tree_preorder() {
        let mut c = ctx();
        let j = ValueRef::text("{\"a\":[1,2]}");
        let got = rows(walk_tree(&mut c, &j, None).unwrap());
        assert_eq!(got.len(), 4);

        assert_eq!(got[0].key, SqlValue::Null);
        assert_eq!(got[0].kind, "object");
        assert_eq!(got[0].fullkey, "$");
        assert_eq!(got[0].parent, None);

        assert_eq!(got[1].key.as_text(), Some("a"));
        assert_eq!(got[1].kind, "array");
        assert_eq!(got[1].fullkey, "$.a");
        assert_eq!(got[1].path, "$");
        assert_eq!(got[1].parent, Some(got[0].id));

        assert_eq!(got[2].key, SqlValue::Integer(0));
        assert_eq!(got[2].value, SqlValue::Integer(1));
        assert_eq!(got[2].fullkey, "$.a[0]");
        assert_eq!(got[2].path, "$.a");
        assert_eq!(got[2].parent, Some(got[1].id));

        assert_eq!(got[3].key, SqlValue::Integer(1));
        assert_eq!(got[3].value, SqlValue::Integer(2));
        assert_eq!(got[3].fullkey, "$.a[1]");
    }

    #[test]
    fn tree_rooted_at_member() {
        let mut c = ctx();
        let j = ValueRef::text("{\"a\":{\"b\":1}}");
        let got = rows(walk_tree(&mut c, &j, Some("$.a")).unwrap());
        assert_eq!(got.len(), 2);
        // The rooted first row reports its own label as key, with the
        // path trimmed back to the parent.
        assert_eq!(got[0].key.as_text(), Some("a"));
        assert_eq!(got[0].kind, "object");
        assert_eq!(got[0].fullkey, "$.a");
        assert_eq!(got[0].path, "$");
        assert_eq!(got[1].key.as_text(), Some("b"));
        assert_eq!(got[1].value, SqlValue::Integer(1));
        assert_eq!(got[1].fullkey, "$.a.b");
        assert_eq!(got[1].path, "$.a");
    }

    #[test]
    fn quoted_labels_in_paths() {
        let mut c = ctx();
        let j = ValueRef::text("{\"two words\":[1]}");
        let got = rows(walk_tree(&mut c, &j, None).unwrap());
        assert_eq!(got[1].fullkey, "$.\"two words\"");
        assert_eq!(got[2].fullkey, "$.\"two words\"[0]");
    }

    #[test]
    fn null_document_yields_nothing() {
        let mut c = ctx();
        assert_eq!(rows(walk_each(&mut c, &ValueRef::Null, None).unwrap()).len(), 0);
    }
}
