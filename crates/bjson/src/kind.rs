//! The thirteen element kinds of the binary encoding.
//!
//! A kind occupies the low nibble of an element's first byte; the high
//! nibble carries the size class (see [`crate::header`]). Nibble values
//! 13..15 are reserved and rejected on input.

/// Element kind, the low nibble of an element's tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Kind {
    /// The literal `null`.
    Null = 0,
    /// The literal `true`.
    True = 1,
    /// The literal `false`.
    False = 2,
    /// Integer acceptable to both JSON and SQL; payload is the decimal
    /// literal text.
    Int = 3,
    /// Integer in JSON-5 `0x` notation.
    Int5 = 4,
    /// Float acceptable to both JSON and SQL.
    Float = 5,
    /// Float using JSON-5 extensions (bare leading/trailing point).
    Float5 = 6,
    /// Text needing no escapes in canonical output.
    Text = 7,
    /// Text containing only canonical JSON escapes.
    TextJ = 8,
    /// Text containing at least one JSON-5-only escape.
    Text5 = 9,
    /// Raw host text; the renderer re-escapes it from scratch.
    TextRaw = 10,
    /// An array; payload is a concatenation of child elements.
    Array = 11,
    /// An object; payload alternates text labels and values.
    Object = 12,
}

impl Kind {
    /// Decodes the low nibble of a tag byte. Nibbles 13..15 are invalid.
    pub fn from_tag(tag: u8) -> Option<Kind> {
        Some(match tag & 0x0f {
            0 => Kind::Null,
            1 => Kind::True,
            2 => Kind::False,
            3 => Kind::Int,
            4 => Kind::Int5,
            5 => Kind::Float,
            6 => Kind::Float5,
            7 => Kind::Text,
            8 => Kind::TextJ,
            9 => Kind::Text5,
            10 => Kind::TextRaw,
            11 => Kind::Array,
            12 => Kind::Object,
            _ => return None,
        })
    }

    /// True for the four text kinds, the only kinds legal as object labels.
    #[must_use]
    pub fn is_text(self) -> bool {
        matches!(self, Kind::Text | Kind::TextJ | Kind::Text5 | Kind::TextRaw)
    }

    /// True for `array` and `object`.
    #[must_use]
    pub fn is_container(self) -> bool {
        matches!(self, Kind::Array | Kind::Object)
    }

    /// The SQL-visible type name: text kinds all report `"text"` and the
    /// numeric kinds collapse to `"integer"` / `"real"`.
    #[must_use]
    pub fn sql_name(self) -> &'static str {
        match self {
            Kind::Null => "null",
            Kind::True => "true",
            Kind::False => "false",
            Kind::Int | Kind::Int5 => "integer",
            Kind::Float | Kind::Float5 => "real",
            Kind::Text | Kind::TextJ | Kind::Text5 | Kind::TextRaw => "text",
            Kind::Array => "array",
            Kind::Object => "object",
        }
    }
}
