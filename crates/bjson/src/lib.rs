//! JSON support for an embeddable SQL engine, built around a compact
//! binary element encoding ("BJSON").
//!
//! The crate accepts JSON input either as text — strict RFC 8259 or a
//! JSON-5 superset with comments, hex integers, single-quoted strings and
//! relaxed numbers — or as an already-encoded BJSON blob, and produces
//! output in either form at the caller's choice.
//!
//! The interesting machinery is the binary codec and the in-place editor:
//! a recursive translator from text to BJSON ([`Parse::from_text`]), the
//! canonical renderer back to text, a path interpreter (`$.a.b[2]`) that
//! returns a cursor into the encoded buffer, an edit engine that splices
//! deletes/replacements/insertions with live size fix-up of the enclosing
//! containers, and an RFC 7396 merge-patch that operates directly on two
//! encoded trees.
//!
//! The host SQL engine is out of scope; its value system appears only as
//! the [`ValueRef`] argument channel and the [`SqlValue`] result channel,
//! and its per-statement auxiliary-data slot as the caller-owned
//! [`FuncCtx`].

#![no_std]
#![allow(missing_docs)]
extern crate alloc;

#[cfg(test)]
extern crate std;

mod blob;
mod cache;
mod error;
mod header;
mod kind;
mod lookup;
mod merge;
mod parse;
mod parser;
mod rcstr;
mod render;
mod scanner;
mod text;
mod value;

mod func;
mod group;
#[cfg(feature = "walk")]
mod walk;

pub use cache::FuncCtx;
pub use error::Error;
pub use func::{
    array, array_length, arrow, arrow2, error_position, extract, insert, make_blob, make_text,
    object, patch, quote, remove, replace, set, type_of, valid,
};
pub use group::{GroupArray, GroupObject};
pub use kind::Kind;
pub use parse::Parse;
pub use value::{OutputClass, SqlValue, ValueRef};
#[cfg(feature = "walk")]
pub use walk::{Walk, WalkRow, walk_each, walk_tree};
