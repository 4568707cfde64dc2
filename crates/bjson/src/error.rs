use alloc::string::String;
use thiserror::Error;

/// Errors surfaced to the host, mirroring the host engine's error channel.
///
/// "Path not found" and "NULL argument" are deliberately absent: the
/// functions report those as NULL results, not errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// Text failed the parser, or a blob failed the structural check or
    /// came apart during navigation.
    #[error("malformed JSON")]
    Malformed,
    /// A path argument does not match the path grammar.
    #[error("bad JSON path: {0:?}")]
    BadPath(String),
    /// An edit function was called with an even argument count.
    #[error("{0}() needs an odd number of arguments")]
    OddArityRequired(&'static str),
    /// `object()` was called with an odd argument count.
    #[error("object() requires an even number of arguments")]
    EvenArityRequired,
    /// `object()` was given a non-text key.
    #[error("object() labels must be TEXT")]
    NonTextLabel,
    /// A blob argument that is clearly not BJSON was given to a function
    /// that cannot accept one.
    #[error("JSON cannot hold BLOB values")]
    BlobValue,
    /// The `valid()` flags argument is outside `1..=15`.
    #[error("FLAGS parameter to valid() must be between 1 and 15")]
    FlagsRange,
}
