//! The per-statement parse cache.
//!
//! A tiny LRU keyed first on the memory identity of the input text and
//! only then on its content, so the common case — the same bound text
//! value flowing through every row of a statement — hits without a byte
//! compare. Capacity is four entries; a hit rotates to the tail and a
//! full insert evicts the head. Entries are read-only; callers that need
//! to edit clone the entry's buffer into a private parse.
//!
//! The cache lives inside [`FuncCtx`], the crate's stand-in for the host
//! engine's per-statement auxiliary-data slot: the host keeps one context
//! per prepared statement and drops it when the statement is finalized,
//! which releases the cache's references.

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::rcstr::RcText;

const CACHE_SIZE: usize = 4;

/// One cached translation: the interned source text and its encoding.
#[derive(Debug)]
pub(crate) struct CacheEntry {
    pub(crate) text: RcText,
    pub(crate) blob: Vec<u8>,
    pub(crate) has_nonstd: bool,
}

#[derive(Debug, Default)]
pub(crate) struct ParseCache {
    entries: Vec<Arc<CacheEntry>>,
}

impl ParseCache {
    /// Finds a cached parse of `text`, by buffer identity first and
    /// content second, rotating the hit to the most-recent position.
    pub(crate) fn search(&mut self, text: &str) -> Option<Arc<CacheEntry>> {
        let mut hit = self
            .entries
            .iter()
            .position(|e| e.text.is_same_buffer(text));
        if hit.is_none() {
            hit = self.entries.iter().position(|e| e.text.as_str() == text);
        }
        let i = hit?;
        let entry = self.entries.remove(i);
        self.entries.push(Arc::clone(&entry));
        Some(entry)
    }

    /// Inserts at the most-recent position, evicting the least recently
    /// used entry when full.
    pub(crate) fn insert(&mut self, entry: Arc<CacheEntry>) {
        if self.entries.len() >= CACHE_SIZE {
            self.entries.remove(0);
        }
        self.entries.push(entry);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Per-statement state threaded through every function call; owns the
/// parse cache.
#[derive(Debug, Default)]
pub struct FuncCtx {
    pub(crate) cache: ParseCache,
}

impl FuncCtx {
    #[must_use]
    pub fn new() -> FuncCtx {
        FuncCtx::default()
    }
}
