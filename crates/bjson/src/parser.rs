//! Recursive translator from JSON text to the binary encoding.
//!
//! The dispatcher looks at one byte and either emits an element or
//! reports, via [`Step`], which delimiter stopped it; container parsers
//! use those delimiter signals from recursive calls instead of
//! re-scanning. A container's header is emitted first with a size class
//! wide enough for the worst case (the body cannot outgrow the remaining
//! source text, doubled for objects), then rewritten to the minimal class
//! once the body length is known.
//!
//! Errors are positions: the translator records the byte offset of the
//! first offending character, which `error_position()` later converts to
//! a character offset.

use alloc::vec::Vec;

use crate::blob::BlobBuf;
use crate::kind::Kind;
use crate::scanner::{
    NAN_INF_NAMES, at, id_cont, id_start, is_2hex, is_4hex, is_hex, json5_whitespace, string_ok,
    strict_space,
};

/// Nesting deeper than this is a parse error rather than a stack risk.
pub(crate) const MAX_DEPTH: u32 = 1000;

/// A successful translation.
#[derive(Debug)]
pub(crate) struct ParseOutput {
    pub(crate) blob: Vec<u8>,
    pub(crate) has_nonstd: bool,
}

/// A failed translation; `offset` is the byte position of the first
/// syntax error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TextError {
    pub(crate) offset: usize,
}

/// What a call to [`Translator::translate`] produced. The delimiter
/// variants carry their position in `Translator::err` so container
/// parsers can resume without rescanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// One element emitted; resume scanning at this offset.
    Next(usize),
    /// End of input before any element.
    Eof,
    /// `}` seen where a value could start.
    ObjEnd,
    /// `]` seen where a value could start.
    ArrEnd,
    /// `,` seen where a value could start.
    Comma,
    /// `:` seen where a value could start.
    Colon,
    /// Syntax error at `Translator::err`.
    Fail,
}

/// Outcome of the search for a separator after a container item.
enum Delim {
    /// `,` at this offset; the next item starts one past it.
    More(usize),
    /// The closing bracket at this offset.
    Close(usize),
    Bad,
}

struct Translator<'s> {
    z: &'s [u8],
    out: BlobBuf,
    depth: u32,
    nonstd: bool,
    /// Error offset for `Fail`, delimiter offset for the closer variants.
    err: usize,
}

/// Translates a complete JSON text. After the top element only
/// whitespace (either regime) may follow.
pub(crate) fn parse_text(src: &str) -> Result<ParseOutput, TextError> {
    let mut tr = Translator {
        z: src.as_bytes(),
        out: BlobBuf::new(),
        depth: 0,
        nonstd: false,
        err: 0,
    };
    match tr.translate(0) {
        Step::Next(mut i) => {
            while strict_space(at(tr.z, i)) {
                i += 1;
            }
            if at(tr.z, i) != 0 {
                i += json5_whitespace(&tr.z[i..]);
                if at(tr.z, i) != 0 {
                    return Err(TextError { offset: i });
                }
                tr.nonstd = true;
            }
            Ok(ParseOutput {
                blob: tr.out.into_vec(),
                has_nonstd: tr.nonstd,
            })
        }
        Step::Eof => Err(TextError { offset: 0 }),
        _ => Err(TextError { offset: tr.err }),
    }
}

impl<'s> Translator<'s> {
    /// Translates one element starting at or after `i`, appending its
    /// encoding to `self.out`.
    fn translate(&mut self, mut i: usize) -> Step {
        loop {
            match at(self.z, i) {
                b'{' => return self.object(i),
                b'[' => return self.array(i),
                b'"' => return self.string(i),
                b'\'' => {
                    self.nonstd = true;
                    return self.string(i);
                }
                b't' => {
                    if self.z[i..].starts_with(b"true")
                        && !at(self.z, i + 4).is_ascii_alphanumeric()
                    {
                        self.out.append_singleton(Kind::True);
                        return Step::Next(i + 4);
                    }
                    self.err = i;
                    return Step::Fail;
                }
                b'f' => {
                    if self.z[i..].starts_with(b"false")
                        && !at(self.z, i + 5).is_ascii_alphanumeric()
                    {
                        self.out.append_singleton(Kind::False);
                        return Step::Next(i + 5);
                    }
                    self.err = i;
                    return Step::Fail;
                }
                b'+' => {
                    self.nonstd = true;
                    return self.number(i);
                }
                b'.' | b'-' | b'0'..=b'9' => return self.number(i),
                b'}' => {
                    self.err = i;
                    return Step::ObjEnd;
                }
                b']' => {
                    self.err = i;
                    return Step::ArrEnd;
                }
                b',' => {
                    self.err = i;
                    return Step::Comma;
                }
                b':' => {
                    self.err = i;
                    return Step::Colon;
                }
                0 => return Step::Eof,
                b'\t' | b'\n' | 0x0b | 0x0c | b'\r' | b' ' => {
                    i += 1;
                    while strict_space(at(self.z, i)) {
                        i += 1;
                    }
                }
                b'/' | 0xc2 | 0xe1 | 0xe2 | 0xe3 | 0xef => {
                    let n = json5_whitespace(&self.z[i..]);
                    if n == 0 {
                        self.err = i;
                        return Step::Fail;
                    }
                    i += n;
                    self.nonstd = true;
                }
                _ => return self.nan_inf(i),
            }
        }
    }

    fn object(&mut self, i: usize) -> Step {
        let this = self.out.len();
        // The body can never outgrow twice the remaining source text.
        let hint = (self.z.len() - i).saturating_mul(2);
        self.out.append_container_header(Kind::Object, hint);
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            self.err = i;
            return Step::Fail;
        }
        let start = self.out.len();
        let mut j = i + 1;
        loop {
            // Label.
            let label_at = self.out.len();
            let x = self.translate(j);
            let mut next = match x {
                Step::Next(nx) => nx,
                Step::ObjEnd => {
                    j = self.err;
                    if self.out.len() != start {
                        // Trailing comma.
                        self.nonstd = true;
                    }
                    break;
                }
                _ => {
                    // A JSON-5 unquoted label, perhaps.
                    j += json5_whitespace(&self.z[j..]);
                    let mut op = Kind::Text;
                    let c = at(self.z, j);
                    if id_start(c) || (c == b'\\' && self.escaped_id_char(j + 1, &mut op)) {
                        let mut k = j + 1;
                        loop {
                            let c = at(self.z, k);
                            if id_cont(c) && json5_whitespace(&self.z[k..]) == 0 {
                                k += 1;
                            } else if c == b'\\' && self.escaped_id_char(k + 1, &mut op) {
                                k += 1;
                            } else {
                                break;
                            }
                        }
                        debug_assert_eq!(label_at, self.out.len());
                        self.out.append_node(op, &self.z[j..k]);
                        self.nonstd = true;
                        k
                    } else {
                        if x != Step::Fail {
                            self.err = j;
                        }
                        return Step::Fail;
                    }
                }
            };
            let t = self.out.as_slice()[label_at] & 0x0f;
            if !(Kind::Text as u8..=Kind::TextRaw as u8).contains(&t) {
                self.err = j;
                return Step::Fail;
            }
            j = next;

            // Colon.
            if at(self.z, j) == b':' {
                j += 1;
            } else {
                let mut need_scan = true;
                if strict_space(at(self.z, j)) {
                    while strict_space(at(self.z, j)) {
                        j += 1;
                    }
                    if at(self.z, j) == b':' {
                        j += 1;
                        need_scan = false;
                    }
                }
                if need_scan {
                    let x = self.translate(j);
                    if x != Step::Colon {
                        if x != Step::Fail {
                            self.err = j;
                        }
                        return Step::Fail;
                    }
                    j = self.err + 1;
                }
            }

            // Value.
            match self.translate(j) {
                Step::Next(nx) => next = nx,
                x => {
                    if x != Step::Fail {
                        self.err = j;
                    }
                    return Step::Fail;
                }
            }
            j = next;

            // Separator or closer.
            match self.delimiter(j, Step::ObjEnd) {
                Delim::More(nj) => j = nj + 1,
                Delim::Close(nj) => {
                    j = nj;
                    break;
                }
                Delim::Bad => {
                    self.err = j;
                    return Step::Fail;
                }
            }
        }
        let body = self.out.len() - start;
        self.out.change_payload_size(this, body);
        self.depth -= 1;
        Step::Next(j + 1)
    }

    fn array(&mut self, i: usize) -> Step {
        let this = self.out.len();
        let hint = self.z.len() - i;
        self.out.append_container_header(Kind::Array, hint);
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            self.err = i;
            return Step::Fail;
        }
        let start = self.out.len();
        let mut j = i + 1;
        loop {
            match self.translate(j) {
                Step::Next(nx) => j = nx,
                Step::ArrEnd => {
                    j = self.err;
                    if self.out.len() != start {
                        self.nonstd = true;
                    }
                    break;
                }
                x => {
                    if x != Step::Fail {
                        self.err = j;
                    }
                    return Step::Fail;
                }
            }
            match self.delimiter(j, Step::ArrEnd) {
                Delim::More(nj) => j = nj + 1,
                Delim::Close(nj) => {
                    j = nj;
                    break;
                }
                Delim::Bad => {
                    self.err = j;
                    return Step::Fail;
                }
            }
        }
        let body = self.out.len() - start;
        self.out.change_payload_size(this, body);
        self.depth -= 1;
        Step::Next(j + 1)
    }

    /// After a container item: finds the `,` or the closer, tolerating
    /// strict whitespace directly and anything else via the dispatcher.
    fn delimiter(&mut self, mut j: usize, close: Step) -> Delim {
        let closer = if close == Step::ObjEnd { b'}' } else { b']' };
        if at(self.z, j) == b',' {
            return Delim::More(j);
        }
        if at(self.z, j) == closer {
            return Delim::Close(j);
        }
        if strict_space(at(self.z, j)) {
            while strict_space(at(self.z, j)) {
                j += 1;
            }
            if at(self.z, j) == b',' {
                return Delim::More(j);
            }
            if at(self.z, j) == closer {
                return Delim::Close(j);
            }
        }
        let x = self.translate(j);
        if x == Step::Comma {
            return Delim::More(self.err);
        }
        if x == close {
            return Delim::Close(self.err);
        }
        Delim::Bad
    }

    fn string(&mut self, i: usize) -> Step {
        let delim = at(self.z, i);
        let mut op = Kind::Text;
        let z = self.z;
        let mut j = i + 1;
        loop {
            while string_ok(at(z, j)) {
                j += 1;
            }
            let c = at(z, j);
            if c == delim {
                break;
            }
            if c == b'\\' {
                j += 1;
                match at(z, j) {
                    b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't' => {
                        if op == Kind::Text {
                            op = Kind::TextJ;
                        }
                    }
                    b'u' if is_4hex(z, j + 1) => {
                        if op == Kind::Text {
                            op = Kind::TextJ;
                        }
                    }
                    b'\'' | b'0' | b'v' | b'\n' => {
                        op = Kind::Text5;
                        self.nonstd = true;
                    }
                    0xe2 if at(z, j + 1) == 0x80 && matches!(at(z, j + 2), 0xa8 | 0xa9) => {
                        op = Kind::Text5;
                        self.nonstd = true;
                    }
                    b'x' if is_2hex(z, j + 1) => {
                        op = Kind::Text5;
                        self.nonstd = true;
                    }
                    b'\r' => {
                        if at(z, j + 1) == b'\n' {
                            j += 1;
                        }
                        op = Kind::Text5;
                        self.nonstd = true;
                    }
                    _ => {
                        self.err = j;
                        return Step::Fail;
                    }
                }
            } else if c <= 0x1f {
                // Raw control characters (and end of input) cannot
                // appear inside a string.
                self.err = j;
                return Step::Fail;
            }
            j += 1;
        }
        self.out.append_node(op, &z[i + 1..j]);
        Step::Next(j + 1)
    }

    /// `\uXXXX` after a backslash continues a JSON-5 identifier label and
    /// upgrades the label kind to `textj`.
    fn escaped_id_char(&self, pos: usize, op: &mut Kind) -> bool {
        if at(self.z, pos) != b'u' || !is_4hex(self.z, pos + 1) {
            return false;
        }
        *op = Kind::TextJ;
        true
    }

    fn number(&mut self, i: usize) -> Step {
        let z = self.z;
        let c = at(z, i);
        // Kind bits threaded to number_tail: 0x01 JSON-5, 0x02 float.
        if c == b'.' {
            if !at(z, i + 1).is_ascii_digit() {
                self.err = i;
                return Step::Fail;
            }
            self.nonstd = true;
            return self.number_tail(i, 0x03);
        }
        if c <= b'0' {
            if c == b'0' {
                if matches!(at(z, i + 1), b'x' | b'X') && is_hex(at(z, i + 2)) {
                    self.nonstd = true;
                    let mut j = i + 3;
                    while is_hex(at(z, j)) {
                        j += 1;
                    }
                    return self.number_finish(i, j, 0x01);
                }
                if at(z, i + 1).is_ascii_digit() {
                    self.err = i + 1;
                    return Step::Fail;
                }
            } else {
                // '+' or '-'
                if !at(z, i + 1).is_ascii_digit() {
                    if matches!(at(z, i + 1), b'I' | b'i') && self.matches_nocase(i + 1, "inf") {
                        self.nonstd = true;
                        if c == b'-' {
                            self.out.append_node(Kind::Float, b"-9e999");
                        } else {
                            self.out.append_node(Kind::Float, b"9e999");
                        }
                        let n = if self.matches_nocase(i + 4, "inity") { 9 } else { 4 };
                        return Step::Next(i + n);
                    }
                    if at(z, i + 1) == b'.' {
                        self.nonstd = true;
                        return self.number_tail(i, 0x01);
                    }
                    self.err = i;
                    return Step::Fail;
                }
                if at(z, i + 1) == b'0' {
                    if at(z, i + 2).is_ascii_digit() {
                        self.err = i + 1;
                        return Step::Fail;
                    }
                    if matches!(at(z, i + 2), b'x' | b'X') && is_hex(at(z, i + 3)) {
                        self.nonstd = true;
                        let mut j = i + 4;
                        while is_hex(at(z, j)) {
                            j += 1;
                        }
                        return self.number_finish(i, j, 0x01);
                    }
                }
            }
        }
        self.number_tail(i, 0)
    }

    fn number_tail(&mut self, i: usize, mut t: u8) -> Step {
        let z = self.z;
        let mut seen_e = false;
        let mut j = i + 1;
        loop {
            let c = at(z, j);
            if c.is_ascii_digit() {
                j += 1;
                continue;
            }
            if c == b'.' {
                if t & 0x02 != 0 {
                    self.err = j;
                    return Step::Fail;
                }
                t |= 0x02;
                j += 1;
                continue;
            }
            if c == b'e' || c == b'E' {
                if !at(z, j - 1).is_ascii_digit() {
                    // "5.e3" is JSON-5; anything else here is an error.
                    if at(z, j - 1) == b'.' && j >= i + 2 && at(z, j - 2).is_ascii_digit() {
                        self.nonstd = true;
                        t |= 0x01;
                    } else {
                        self.err = j;
                        return Step::Fail;
                    }
                }
                if seen_e {
                    self.err = j;
                    return Step::Fail;
                }
                t |= 0x02;
                seen_e = true;
                let mut c2 = at(z, j + 1);
                if c2 == b'+' || c2 == b'-' {
                    j += 1;
                    c2 = at(z, j + 1);
                }
                if !c2.is_ascii_digit() {
                    self.err = j;
                    return Step::Fail;
                }
                j += 1;
                continue;
            }
            break;
        }
        if !at(z, j - 1).is_ascii_digit() {
            if at(z, j - 1) == b'.' && j >= i + 2 && at(z, j - 2).is_ascii_digit() {
                self.nonstd = true;
                t |= 0x01;
            } else {
                self.err = j;
                return Step::Fail;
            }
        }
        self.number_finish(i, j, t)
    }

    fn number_finish(&mut self, mut i: usize, j: usize, t: u8) -> Step {
        if at(self.z, i) == b'+' {
            // The sign-only prefix is stripped; the JSON-5 bit remains.
            i += 1;
        }
        let kind = Kind::from_tag(Kind::Int as u8 + t).unwrap_or(Kind::Int);
        self.out.append_node(kind, &self.z[i..j]);
        Step::Next(j)
    }

    /// The extension literal families: `Infinity`/`Inf` as an
    /// out-of-range float, the NaN spellings as `null`.
    fn nan_inf(&mut self, i: usize) -> Step {
        for &(name, is_float) in NAN_INF_NAMES {
            if !self.matches_nocase(i, name) {
                continue;
            }
            if at(self.z, i + name.len()).is_ascii_alphanumeric() {
                continue;
            }
            if is_float {
                self.out.append_node(Kind::Float, b"9e999");
            } else {
                self.out.append_singleton(Kind::Null);
            }
            self.nonstd = true;
            return Step::Next(i + name.len());
        }
        self.err = i;
        Step::Fail
    }

    fn matches_nocase(&self, i: usize, name: &str) -> bool {
        name.bytes()
            .enumerate()
            .all(|(k, b)| at(self.z, i + k).eq_ignore_ascii_case(&b))
    }
}
