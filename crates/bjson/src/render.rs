//! Renderer from the binary encoding back to canonical RFC 8259 text,
//! plus the narrowing conversion from an encoded element to a host value.
//!
//! The renderer never reproduces the input dialect: hex integers are
//! expanded to decimal, relaxed floats regain their digits, JSON-5-only
//! escapes are rewritten as canonical ones, and raw host text is escaped
//! from scratch. Malformed binary input raises the output's malformed
//! flag; not every corruption is detectable, matching the superficial
//! validation contract.

use alloc::string::String;
use alloc::vec::Vec;

use bstr::ByteSlice;

use crate::error::Error;
use crate::header;
use crate::kind::Kind;
use crate::scanner::{hex_value, hex4, is_4hex};
use crate::text::JsonText;
use crate::value::{OutputClass, SqlValue};

/// Renders the element at `blob[i]` as canonical JSON text appended to
/// `out`, returning the offset just past the element. On undecodable
/// input the malformed flag is raised and the returned offset leaves the
/// buffer so container loops terminate.
pub(crate) fn render_element(blob: &[u8], i: usize, out: &mut JsonText) -> usize {
    let Some((n, sz)) = header::decode(blob, i) else {
        out.mark_malformed();
        return blob.len() + 1;
    };
    let Some(kind) = Kind::from_tag(blob[i]) else {
        out.mark_malformed();
        return i + n + sz;
    };
    let payload = &blob[i + n..i + n + sz];
    match kind {
        Kind::Null => {
            out.push_str("null");
            return i + 1;
        }
        Kind::True => {
            out.push_str("true");
            return i + 1;
        }
        Kind::False => {
            out.push_str("false");
            return i + 1;
        }
        Kind::Int | Kind::Float => out.push_payload(payload),
        Kind::Int5 => render_hex_int(payload, out),
        Kind::Float5 => {
            let mut s = String::new();
            normalize_float5(payload, &mut s);
            out.push_str(&s);
        }
        Kind::TextJ => {
            out.push('"');
            out.push_payload(payload);
            out.push('"');
        }
        Kind::Text | Kind::Text5 => render_text5(payload, out),
        Kind::TextRaw => {
            let s = payload.to_str_lossy();
            out.append_quoted(&s);
        }
        Kind::Array => {
            out.push('[');
            let mut j = i + n;
            let end = j + sz;
            while j < end {
                j = render_element(blob, j, out);
                out.push(',');
            }
            if sz > 0 {
                out.truncate(out.len() - 1);
            }
            out.push(']');
        }
        Kind::Object => {
            out.push('{');
            let mut j = i + n;
            let end = j + sz;
            let mut x = 0u32;
            while j < end {
                j = render_element(blob, j, out);
                out.push(if x & 1 == 1 { ',' } else { ':' });
                x += 1;
            }
            if x & 1 == 1 {
                out.mark_malformed();
            }
            if sz > 0 {
                out.truncate(out.len() - 1);
            }
            out.push('}');
        }
    }
    i + n + sz
}

/// Expands a hex-integer payload to decimal. Overflow of the 64-bit
/// magnitude yields the out-of-range sentinel; the sign has already been
/// emitted by then, so a huge negative literal renders `-9.0e999`.
fn render_hex_int(payload: &[u8], out: &mut JsonText) {
    let mut k = 2usize;
    if payload.first() == Some(&b'-') {
        out.push('-');
        k = 3;
    } else if payload.first() == Some(&b'+') {
        k = 3;
    }
    let mut u = 0u64;
    let mut overflow = false;
    while k < payload.len() {
        let Some(d) = hex_value(payload[k]) else {
            out.mark_malformed();
            break;
        };
        if u >> 60 != 0 {
            overflow = true;
        } else {
            u = u * 16 + u64::from(d);
        }
        k += 1;
    }
    if overflow {
        out.push_str("9.0e999");
    } else {
        out.push_str(&alloc::format!("{u}"));
    }
}

/// Restores the digits a JSON-5 float may omit: `0` before a leading
/// point, `0` after a trailing or pre-exponent point.
fn normalize_float5(payload: &[u8], out: &mut String) {
    let mut k = 0usize;
    if payload.first() == Some(&b'-') {
        out.push('-');
        k = 1;
    }
    if payload.get(k) == Some(&b'.') {
        out.push('0');
    }
    while k < payload.len() {
        let c = payload[k];
        out.push(char::from(c));
        if c == b'.' && (k + 1 == payload.len() || !payload[k + 1].is_ascii_digit()) {
            out.push('0');
        }
        k += 1;
    }
}

/// Emits a `text` or `text5` payload, preserving canonical escapes,
/// rewriting the JSON-5-only ones, and escaping any raw `"` (which a
/// single-quoted source string may legally contain).
fn render_text5(payload: &[u8], out: &mut JsonText) {
    out.push('"');
    let z = payload;
    let mut pos = 0usize;
    while pos < z.len() {
        let start = pos;
        while pos < z.len() && z[pos] != b'\\' && z[pos] != b'"' {
            pos += 1;
        }
        if pos > start {
            out.push_payload(&z[start..pos]);
        }
        if pos >= z.len() {
            break;
        }
        if z[pos] == b'"' {
            out.push_str("\\\"");
            pos += 1;
            continue;
        }
        if pos + 1 >= z.len() {
            out.mark_malformed();
            break;
        }
        match z[pos + 1] {
            b'\'' => out.push('\''),
            b'v' => out.push_str("\\u0009"),
            b'x' => {
                if pos + 3 >= z.len() {
                    out.mark_malformed();
                    break;
                }
                out.push_str("\\u00");
                out.push_payload(&z[pos + 2..pos + 4]);
                pos += 2;
            }
            b'0' => out.push_str("\\u0000"),
            b'\r' => {
                // Line continuation; swallow an LF that follows.
                if z.get(pos + 2) == Some(&b'\n') {
                    pos += 1;
                }
            }
            b'\n' => {}
            0xe2 => {
                if pos + 3 >= z.len()
                    || z[pos + 2] != 0x80
                    || !matches!(z[pos + 3], 0xa8 | 0xa9)
                {
                    out.mark_malformed();
                    break;
                }
                pos += 2;
            }
            c => {
                // A canonical escape: pass both bytes through.
                out.push('\\');
                out.push(char::from(c));
            }
        }
        pos += 2;
    }
    out.push('"');
}

/// Converts the element at `blob[i]` into a host value: singletons and
/// numbers narrow to SQL scalars, strings lose their escapes, containers
/// come back as JSON text or as their raw encoding per `class`.
pub(crate) fn element_to_value(
    blob: &[u8],
    i: usize,
    class: OutputClass,
) -> Result<SqlValue, Error> {
    let (n, sz) = header::decode(blob, i).ok_or(Error::Malformed)?;
    let kind = Kind::from_tag(blob[i]).ok_or(Error::Malformed)?;
    let payload = &blob[i + n..i + n + sz];
    Ok(match kind {
        Kind::Null => SqlValue::Null,
        Kind::True => SqlValue::Integer(1),
        Kind::False => SqlValue::Integer(0),
        Kind::Int | Kind::Int5 => int_payload_to_value(payload),
        Kind::Float | Kind::Float5 => {
            let mut s = String::new();
            normalize_float5(payload, &mut s);
            SqlValue::Real(s.parse::<f64>().unwrap_or(0.0))
        }
        Kind::Text | Kind::TextRaw => SqlValue::Text {
            text: payload.to_str_lossy().into_owned(),
            tagged: false,
        },
        Kind::TextJ | Kind::Text5 => SqlValue::Text {
            text: unescape_string(payload),
            tagged: false,
        },
        Kind::Array | Kind::Object => match class {
            OutputClass::Blob => SqlValue::Blob(blob[i..i + n + sz].to_vec()),
            OutputClass::Text => {
                let mut out = JsonText::new();
                render_element(blob, i, &mut out);
                SqlValue::json_text(out.into_result()?)
            }
        },
    })
}

/// Decimal or hex integer payload to a host integer, falling back to a
/// real when 64 bits are not enough. A hex magnitude past 64 bits
/// saturates: the sign decides between `i64::MIN` and the out-of-range
/// real.
fn int_payload_to_value(payload: &[u8]) -> SqlValue {
    let s = payload.to_str_lossy();
    let (neg, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, &*s),
    };
    if let Some(hex) = body
        .strip_prefix("0x")
        .or_else(|| body.strip_prefix("0X"))
    {
        let mut u = 0u64;
        let mut overflow = false;
        for b in hex.bytes() {
            let Some(d) = hex_value(b) else { break };
            if u >> 60 != 0 {
                overflow = true;
                break;
            }
            u = u * 16 + u64::from(d);
        }
        if overflow {
            return if neg {
                SqlValue::Integer(i64::MIN)
            } else {
                SqlValue::Real(f64::INFINITY)
            };
        }
        let v = u as i64;
        return SqlValue::Integer(if neg { v.wrapping_neg() } else { v });
    }
    match s.parse::<i64>() {
        Ok(v) => SqlValue::Integer(v),
        Err(_) => SqlValue::Real(s.parse::<f64>().unwrap_or(0.0)),
    }
}

/// Expands the canonical and JSON-5 escapes of a `textj`/`text5` payload
/// into raw text. Surrogate pairs join; an escaped NUL ends the string.
fn unescape_string(payload: &[u8]) -> String {
    let z = payload;
    let mut out: Vec<u8> = Vec::with_capacity(z.len());
    let mut i = 0usize;
    while i < z.len() {
        let c = z[i];
        if c != b'\\' {
            out.push(c);
            i += 1;
            continue;
        }
        i += 1;
        let Some(&e) = z.get(i) else { break };
        match e {
            b'u' => {
                if !is_4hex(z, i + 1) {
                    break;
                }
                let mut v = hex4(z, i + 1);
                i += 5;
                if v == 0 {
                    break;
                }
                if (v & 0xfc00) == 0xd800
                    && z.get(i) == Some(&b'\\')
                    && z.get(i + 1) == Some(&b'u')
                    && is_4hex(z, i + 2)
                    && (hex4(z, i + 2) & 0xfc00) == 0xdc00
                {
                    let lo = hex4(z, i + 2);
                    v = ((v & 0x3ff) << 10) + (lo & 0x3ff) + 0x10000;
                    i += 6;
                }
                push_code_point(&mut out, v);
            }
            b'b' => {
                out.push(0x08);
                i += 1;
            }
            b'f' => {
                out.push(0x0c);
                i += 1;
            }
            b'n' => {
                out.push(b'\n');
                i += 1;
            }
            b'r' => {
                out.push(b'\r');
                i += 1;
            }
            b't' => {
                out.push(b'\t');
                i += 1;
            }
            b'v' => {
                out.push(0x0b);
                i += 1;
            }
            b'\'' | b'"' | b'/' | b'\\' => {
                out.push(e);
                i += 1;
            }
            b'0' => {
                out.push(0);
                i += 1;
            }
            b'x' => {
                if let (Some(h), Some(l)) = (
                    z.get(i + 1).copied().and_then(hex_value),
                    z.get(i + 2).copied().and_then(hex_value),
                ) {
                    out.push((h << 4) | l);
                    i += 3;
                } else {
                    break;
                }
            }
            b'\r' => {
                i += 1;
                if z.get(i) == Some(&b'\n') {
                    i += 1;
                }
            }
            b'\n' => i += 1,
            0xe2 => {
                // Escaped U+2028 / U+2029 line continuation.
                i += 3;
            }
            _ => i += 1,
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn push_code_point(out: &mut Vec<u8>, v: u32) {
    if v <= 0x7f {
        out.push(v as u8);
    } else if v <= 0x7ff {
        out.push(0xc0 | (v >> 6) as u8);
        out.push(0x80 | (v & 0x3f) as u8);
    } else if v <= 0xffff {
        out.push(0xe0 | (v >> 12) as u8);
        out.push(0x80 | ((v >> 6) & 0x3f) as u8);
        out.push(0x80 | (v & 0x3f) as u8);
    } else {
        out.push(0xf0 | (v >> 18) as u8);
        out.push(0x80 | ((v >> 12) & 0x3f) as u8);
        out.push(0x80 | ((v >> 6) & 0x3f) as u8);
        out.push(0x80 | (v & 0x3f) as u8);
    }
}
