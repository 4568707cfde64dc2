//! Interned source text.
//!
//! The parse cache keys on the *identity* of the input text first and its
//! content second, so parses of the same hot string are shared without a
//! byte compare. The reference-counted string service of the host maps
//! onto `Arc<str>`: one strong reference per cache residency, released on
//! eviction.

use alloc::sync::Arc;

/// A reference-counted, immutable copy of a parsed input text.
#[derive(Debug, Clone)]
pub(crate) struct RcText(Arc<str>);

impl RcText {
    pub(crate) fn intern(s: &str) -> RcText {
        RcText(Arc::from(s))
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }

    /// Identity comparison against a host-supplied slice: true only when
    /// `s` *is* this interned buffer, not merely equal to it.
    pub(crate) fn is_same_buffer(&self, s: &str) -> bool {
        core::ptr::eq(self.0.as_ptr(), s.as_ptr()) && self.0.len() == s.len()
    }
}
