//! Path navigation and the in-place edit engine.
//!
//! A path starts at `$` and descends by `.label`, `."quoted label"`,
//! `[N]`, `[#]` (the last array element) or `[#-N]` (N before the last).
//! Label comparison is byte-exact against the element payload; neither
//! side's escapes are expanded.
//!
//! The same recursive walk serves reads and edits. An edit rides along as
//! an [`EditJob`]; when the terminal step is reached the job's splice is
//! applied, and on the way back up every enclosing container re-decides
//! its header size class against the accumulated byte delta — a single
//! up-walk, never a re-encode.
//!
//! Missing-path creation (`insert`/`set`) synthesizes the remaining steps
//! as empty containers, runs the same editor over the synthetic subtree,
//! and splices the result at the end of the parent's body.

use alloc::vec;
use alloc::vec::Vec;

use crate::header;
use crate::kind::Kind;
use crate::parse::Parse;

/// The four edit opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EditOp {
    /// Remove the element (and its label); missing path is a no-op.
    Delete,
    /// Overwrite the element; missing path is a no-op.
    Replace,
    /// Create a missing path; an existing element is left alone.
    Insert,
    /// Overwrite or create.
    Set,
}

impl EditOp {
    fn creates_missing(self) -> bool {
        matches!(self, EditOp::Insert | EditOp::Set)
    }
}

/// An edit riding along a lookup: the opcode plus the encoded replacement
/// element (empty for `Delete`).
#[derive(Debug, Clone, Copy)]
pub(crate) struct EditJob<'v> {
    pub(crate) op: EditOp,
    pub(crate) ins: &'v [u8],
}

/// Outcome of a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lookup {
    /// Offset of the matched element (for an append, of the splice).
    Found(usize),
    /// The path is valid but names nothing.
    NotFound,
    /// The path does not match the grammar.
    PathError,
    /// The buffer came apart under navigation.
    Malformed,
}

/// Walks `path` (already stripped of its `$`) from the element at `root`,
/// applying `job` at the terminal step. `label` is the offset of the
/// object label owning `root`, when there is one.
pub(crate) fn lookup_step(
    p: &mut Parse<'_>,
    root: usize,
    path: &[u8],
    label: Option<usize>,
    job: Option<&EditJob<'_>>,
) -> Lookup {
    if path.is_empty() {
        if let Some(job) = job {
            p.make_editable(job.ins.len());
            let Some((n, sz)) = p.payload_size(root) else {
                return Lookup::Malformed;
            };
            let total = n + sz;
            match job.op {
                EditOp::Delete => {
                    let (at, len) = match label {
                        Some(l) => (l, total + (root - l)),
                        None => (root, total),
                    };
                    p.blob_edit(at, len, &[]);
                }
                EditOp::Insert => {
                    // Already exists, so insert is a no-op.
                }
                EditOp::Replace | EditOp::Set => p.blob_edit(root, total, job.ins),
            }
        }
        p.found_label = label;
        return Lookup::Found(root);
    }
    match path[0] {
        b'.' => object_step(p, root, &path[1..], job),
        b'[' => array_step(p, root, path, job),
        _ => Lookup::PathError,
    }
}

fn object_step(
    p: &mut Parse<'_>,
    root: usize,
    rest: &[u8],
    job: Option<&EditJob<'_>>,
) -> Lookup {
    // Key text and the path remainder after it.
    let (key, after) = if rest.first() == Some(&b'"') {
        let mut i = 1;
        while i < rest.len() && rest[i] != b'"' {
            i += 1;
        }
        if i >= rest.len() {
            return Lookup::PathError;
        }
        (&rest[1..i], i + 1)
    } else {
        let mut i = 0;
        while i < rest.len() && rest[i] != b'.' && rest[i] != b'[' {
            i += 1;
        }
        if i == 0 {
            return Lookup::PathError;
        }
        (&rest[..i], i)
    };
    let tail = &rest[after..];

    if p.kind_at(root) != Some(Kind::Object) {
        return Lookup::NotFound;
    }
    let Some((n, sz)) = p.payload_size(root) else {
        return Lookup::Malformed;
    };
    let mut j = root + n;
    let end = j + sz;
    while j < end {
        if !p.kind_at(j).is_some_and(Kind::is_text) {
            return Lookup::Malformed;
        }
        let Some((ln, lsz)) = p.payload_size(j) else {
            return Lookup::Malformed;
        };
        let k = j + ln;
        if k + lsz >= end {
            // A label with no room for its value.
            return Lookup::Malformed;
        }
        let v = k + lsz;
        if lsz == key.len() && &p.blob()[k..k + lsz] == key {
            if p.kind_at(v).is_none() {
                return Lookup::Malformed;
            }
            let Some((vn, vsz)) = p.payload_size(v) else {
                return Lookup::Malformed;
            };
            if v + vn + vsz > end {
                return Lookup::Malformed;
            }
            let rc = lookup_step(p, v, tail, Some(j), job);
            if p.delta != 0 {
                p.after_edit_size_adjust(root);
            }
            return rc;
        }
        if p.kind_at(v).is_none() {
            return Lookup::Malformed;
        }
        let Some((vn, vsz)) = p.payload_size(v) else {
            return Lookup::Malformed;
        };
        j = v + vn + vsz;
    }
    if j > end {
        return Lookup::Malformed;
    }
    if let Some(job) = job.filter(|j| j.op.creates_missing()) {
        // Materialize the missing member at the end of the body:
        // a textraw label followed by the value (or a synthesized
        // subtree carrying it).
        let mut ins: Vec<u8> = Vec::new();
        header::append(&mut ins, Kind::TextRaw as u8, key.len());
        ins.extend_from_slice(key);
        if tail.is_empty() {
            ins.extend_from_slice(job.ins);
        } else if let Some(sub) = synthesize(tail, job) {
            ins.extend_from_slice(&sub);
        } else {
            return Lookup::PathError;
        }
        p.make_editable(ins.len());
        p.blob_edit(j, 0, &ins);
        if p.delta != 0 {
            p.after_edit_size_adjust(root);
        }
        return Lookup::Found(j);
    }
    Lookup::NotFound
}

fn array_step(
    p: &mut Parse<'_>,
    root: usize,
    path: &[u8],
    job: Option<&EditJob<'_>>,
) -> Lookup {
    if p.kind_at(root) != Some(Kind::Array) {
        return Lookup::NotFound;
    }
    let Some((n, sz)) = p.payload_size(root) else {
        return Lookup::Malformed;
    };
    let mut i = 1usize;
    let mut k: i64 = 0;
    while path.get(i).is_some_and(u8::is_ascii_digit) {
        k = k.saturating_mul(10).saturating_add(i64::from(path[i] - b'0'));
        i += 1;
    }
    if i < 2 || path.get(i) != Some(&b']') {
        if path.get(1) == Some(&b'#') {
            // `#` names the last element; `#-N` counts back from it.
            k = p.array_count(root) as i64 - 1;
            i = 2;
            if path.get(2) == Some(&b'-') && path.get(3).is_some_and(u8::is_ascii_digit) {
                i = 3;
                let mut nn: i64 = 0;
                while path.get(i).is_some_and(u8::is_ascii_digit) {
                    nn = nn.saturating_mul(10).saturating_add(i64::from(path[i] - b'0'));
                    i += 1;
                }
                k -= nn;
            }
            if k < 0 {
                return Lookup::NotFound;
            }
            if path.get(i) != Some(&b']') {
                return Lookup::PathError;
            }
        } else {
            return Lookup::PathError;
        }
    }
    let tail = &path[i + 1..];
    let mut j = root + n;
    let end = j + sz;
    while j < end {
        if k == 0 {
            let rc = lookup_step(p, j, tail, None, job);
            if p.delta != 0 {
                p.after_edit_size_adjust(root);
            }
            return rc;
        }
        k -= 1;
        let Some((n2, sz2)) = p.payload_size(j) else {
            return Lookup::Malformed;
        };
        j += n2 + sz2;
    }
    if j > end {
        return Lookup::Malformed;
    }
    if k > 0 {
        return Lookup::NotFound;
    }
    // Index exactly one past the end: the append position.
    if let Some(job) = job.filter(|j| j.op.creates_missing()) {
        let ins: Vec<u8> = if tail.is_empty() {
            job.ins.to_vec()
        } else if let Some(sub) = synthesize(tail, job) {
            sub
        } else {
            return Lookup::PathError;
        };
        p.make_editable(ins.len());
        p.blob_edit(j, 0, &ins);
        if p.delta != 0 {
            p.after_edit_size_adjust(root);
        }
        return Lookup::Found(j);
    }
    Lookup::NotFound
}

/// Builds the encoding of the missing remainder of a path: an empty
/// container of the right flavor, edited in place by the same job. A
/// remainder that cannot be materialized (bad syntax, or an array index
/// past the synthetic end) yields `None`.
fn synthesize(tail: &[u8], job: &EditJob<'_>) -> Option<Vec<u8>> {
    let seed = if tail[0] == b'.' {
        Kind::Object
    } else {
        Kind::Array
    } as u8;
    let mut sub = Parse::from_owned(vec![seed], false);
    match lookup_step(&mut sub, 0, tail, None, Some(job)) {
        Lookup::PathError | Lookup::Malformed => None,
        // Not-found leaves the bare container; found carries the value.
        Lookup::NotFound | Lookup::Found(_) => Some(sub.into_blob()),
    }
}
