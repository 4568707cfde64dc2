//! The in-memory work object wrapping a BJSON buffer.
//!
//! A `Parse` is created by the text parser (owned, growable), adopted from
//! a host blob argument (borrowed view), or taken from the statement cache
//! (shared, read-only). Only the owned form may be mutated; the other two
//! escalate by copying on the first edit, reserving caller-declared
//! headroom so the splice that follows does not immediately regrow.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::cache::CacheEntry;
use crate::error::Error;
use crate::header;
use crate::kind::Kind;
use crate::parser;
use crate::render;
use crate::text::JsonText;

#[derive(Debug)]
enum Repr<'a> {
    /// Host-owned bytes, read-only.
    View(&'a [u8]),
    /// Cache-resident parse, read-only, shared by reference count.
    Shared(Arc<CacheEntry>),
    /// Private growable buffer.
    Owned(Vec<u8>),
}

/// A checked BJSON buffer plus edit bookkeeping.
#[derive(Debug)]
pub struct Parse<'a> {
    repr: Repr<'a>,
    has_nonstd: bool,
    /// Running byte delta of the edit in progress; consumed by the
    /// ancestor size fix-up.
    pub(crate) delta: i64,
    /// Offset of the object label owning the element found by the most
    /// recent path lookup, when there is one.
    pub(crate) found_label: Option<usize>,
}

impl Parse<'static> {
    /// Parses JSON text (RFC 8259 or the JSON-5 superset) into an owned
    /// buffer.
    pub fn from_text(src: &str) -> Result<Parse<'static>, Error> {
        match parser::parse_text(src) {
            Ok(out) => Ok(Parse::from_owned(out.blob, out.has_nonstd)),
            Err(_) => Err(Error::Malformed),
        }
    }

    pub(crate) fn from_owned(blob: Vec<u8>, has_nonstd: bool) -> Parse<'static> {
        Parse {
            repr: Repr::Owned(blob),
            has_nonstd,
            delta: 0,
            found_label: None,
        }
    }

    pub(crate) fn from_cache(entry: Arc<CacheEntry>) -> Parse<'static> {
        Parse {
            has_nonstd: entry.has_nonstd,
            repr: Repr::Shared(entry),
            delta: 0,
            found_label: None,
        }
    }
}

impl<'a> Parse<'a> {
    /// Adopts a host blob as a read-only view, after the superficial
    /// structural check.
    pub fn from_blob(blob: &'a [u8]) -> Result<Parse<'a>, Error> {
        if !might_be_blob(blob) {
            return Err(Error::Malformed);
        }
        Ok(Parse {
            repr: Repr::View(blob),
            has_nonstd: false,
            delta: 0,
            found_label: None,
        })
    }

    pub fn blob(&self) -> &[u8] {
        match &self.repr {
            Repr::View(b) => b,
            Repr::Shared(e) => &e.blob,
            Repr::Owned(v) => v,
        }
    }

    /// Consumes the parse, yielding the encoded bytes (copied when the
    /// buffer was a borrowed view).
    pub fn into_blob(self) -> Vec<u8> {
        match self.repr {
            Repr::View(b) => b.to_vec(),
            Repr::Shared(e) => e.blob.clone(),
            Repr::Owned(v) => v,
        }
    }

    /// True when the input used any JSON-5 extension.
    #[must_use]
    pub fn has_nonstd(&self) -> bool {
        self.has_nonstd
    }

    /// Renders the whole buffer as canonical JSON text.
    pub fn to_json_text(&self) -> Result<String, Error> {
        let mut out = JsonText::new();
        render::render_element(self.blob(), 0, &mut out);
        out.into_result()
    }

    /// Ensures the buffer is privately owned before a mutation, copying
    /// with `extra` bytes of headroom when it is not.
    pub(crate) fn make_editable(&mut self, extra: usize) {
        if matches!(self.repr, Repr::Owned(_)) {
            return;
        }
        let src = self.blob();
        let mut v = Vec::with_capacity(src.len() + extra);
        v.extend_from_slice(src);
        self.repr = Repr::Owned(v);
    }

    fn owned_mut(&mut self) -> &mut Vec<u8> {
        match &mut self.repr {
            Repr::Owned(v) => v,
            // make_editable() precedes every mutation.
            _ => unreachable!("edit of read-only parse"),
        }
    }

    /// Header length and payload length of the element at `i`, verified
    /// against the buffer — with slack for stale container sizes while an
    /// edit's delta has not yet been folded into the ancestors.
    pub(crate) fn payload_size(&self, i: usize) -> Option<(usize, usize)> {
        let blob = self.blob();
        let (n, sz) = header::decode_raw(blob, i)?;
        let end = (i + n + sz) as i64;
        if end > blob.len() as i64 && end > blob.len() as i64 - self.delta {
            return None;
        }
        Some((n, sz))
    }

    pub(crate) fn kind_at(&self, i: usize) -> Option<Kind> {
        Kind::from_tag(*self.blob().get(i)?)
    }

    /// Removes `del` bytes at `at` and inserts `ins` in their place,
    /// accumulating the size change into the running delta.
    pub(crate) fn blob_edit(&mut self, at: usize, del: usize, ins: &[u8]) {
        self.make_editable(ins.len());
        let v = self.owned_mut();
        v.splice(at..at + del, ins.iter().copied());
        self.delta += ins.len() as i64 - del as i64;
    }

    /// Rewrites the kind nibble of the element at `i`, leaving the size
    /// class alone. Merge-patch uses this to turn a cleared element into
    /// an empty object.
    pub(crate) fn relabel(&mut self, i: usize, kind: Kind) {
        self.make_editable(0);
        let v = self.owned_mut();
        v[i] = (v[i] & 0xf0) | kind as u8;
    }

    /// Folds the running delta into the container header at `root`,
    /// widening or narrowing its size class as needed. The class change
    /// itself feeds back into the delta for the next ancestor up.
    pub(crate) fn after_edit_size_adjust(&mut self, root: usize) {
        debug_assert!(self.delta != 0);
        let Some((_, sz)) = header::decode_raw(self.blob(), root) else {
            return;
        };
        let new_sz = sz as i64 + self.delta;
        debug_assert!(new_sz >= 0);
        let d = crate::blob::change_payload_size(self.owned_mut(), root, new_sz as usize);
        self.delta += d as i64;
    }

    /// Number of elements in the array whose header is at `root`.
    pub(crate) fn array_count(&self, root: usize) -> usize {
        let Some((n, sz)) = self.payload_size(root) else {
            return 0;
        };
        let end = root + n + sz;
        let mut i = root + n;
        let mut k = 0;
        while i < end {
            let Some((n2, sz2)) = self.payload_size(i) else {
                break;
            };
            i += n2 + sz2;
            k += 1;
        }
        k
    }
}

/// The superficial structural check applied before adopting a host blob:
/// a valid leading kind nibble, a decodable top-level header spanning
/// exactly the buffer, and no payload on the singletons. False positives
/// are possible by design; false negatives are not.
pub(crate) fn might_be_blob(blob: &[u8]) -> bool {
    let Some(&first) = blob.first() else {
        return false;
    };
    if Kind::from_tag(first).is_none() {
        return false;
    }
    let Some((n, sz)) = header::decode(blob, 0) else {
        return false;
    };
    if n + sz != blob.len() {
        return false;
    }
    if (first & 0x0f) <= Kind::False as u8 && sz > 0 {
        return false;
    }
    true
}
