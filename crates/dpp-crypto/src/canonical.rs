//! Canonical encoding of record content, format `dpp-canonical-json/v1`.
//!
//! Hashes anchored on the ledger are only verifiable if every writer and
//! verifier produce byte-identical payloads, so this encoding is a frozen
//! wire format. It matches `JSON.stringify` for string-keyed content and
//! integers within `±2^53`; past that the two diverge:
//!
//! - object members in source insertion order, no whitespace, `{}` when empty.
//!   Integer-like keys (`"10"`, `"2"`) also keep insertion order, where
//!   `JSON.stringify` would list them first in ascending order.
//! - strings escape `"`, `\` and control characters only, everything else is
//!   raw UTF-8
//! - integers in plain decimal at full precision; `JSON.stringify` rounds
//!   anything above `2^53` to the nearest double
//! - floats as the shortest round-trip digits, integral floats below `1e21`
//!   without a fraction, exponent form `d.ddde+N` outside `[1e-6, 1e21)`

use std::fmt::Write as _;

use dpp_types::{Attributes, Digest};
use serde::Serialize;
use serde_json::{Number, Value};

use crate::hasher::HasherError;

/// Identifier of the frozen payload encoding.
pub const CANONICAL_FORMAT: &str = "dpp-canonical-json/v1";

/// One piece of a hash payload.
#[derive(Clone, Copy, Debug)]
pub enum PayloadPart<'a> {
    /// UTF-8 text, copied verbatim.
    Text(&'a str),
    /// An attribute map in canonical JSON.
    Attributes(&'a Attributes),
    /// An unsigned integer as decimal text.
    Integer(u64),
    /// A digest as its raw 32 bytes.
    Digest(&'a Digest),
}

/// Concatenate `parts` into a single byte sequence with no separators.
pub fn encode_payload(parts: &[PayloadPart<'_>]) -> Vec<u8> {
    let mut out = Vec::new();
    for part in parts {
        match part {
            PayloadPart::Text(s) => out.extend_from_slice(s.as_bytes()),
            PayloadPart::Attributes(map) => {
                let mut json = String::new();
                write_object(&mut json, map);
                out.extend_from_slice(json.as_bytes());
            }
            PayloadPart::Integer(n) => out.extend_from_slice(n.to_string().as_bytes()),
            PayloadPart::Digest(d) => out.extend_from_slice(d.as_bytes()),
        }
    }
    out
}

/// Canonical JSON text of a value.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

/// Canonical JSON text of any serializable value.
///
/// Fails with [`HasherError::Encoding`] when the value has no JSON form,
/// e.g. a map with non-string keys.
pub fn to_canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<String, HasherError> {
    let value = serde_json::to_value(value).map_err(|e| HasherError::Encoding(e.to_string()))?;
    Ok(canonical_json(&value))
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => write_number(out, n),
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => write_object(out, map),
    }
}

fn write_object(out: &mut String, map: &Attributes) {
    out.push('{');
    for (i, (key, value)) in map.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_string(out, key);
        out.push(':');
        write_value(out, value);
    }
    out.push('}');
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

fn write_number(out: &mut String, n: &Number) {
    if let Some(i) = n.as_i64() {
        let _ = write!(out, "{i}");
    } else if let Some(u) = n.as_u64() {
        let _ = write!(out, "{u}");
    } else if let Some(f) = n.as_f64() {
        write_float(out, f);
    }
}

/// ECMAScript `Number::toString` over the shortest round-trip digits.
fn write_float(out: &mut String, f: f64) {
    if f == 0.0 {
        out.push('0');
        return;
    }
    if f < 0.0 {
        out.push('-');
    }
    let (digits, n) = shortest_digits(f.abs());
    let k = digits.len() as i32;

    if k <= n && n <= 21 {
        out.push_str(&digits);
        out.extend(std::iter::repeat('0').take((n - k) as usize));
    } else if 0 < n && n <= 21 {
        out.push_str(&digits[..n as usize]);
        out.push('.');
        out.push_str(&digits[n as usize..]);
    } else if -6 < n && n <= 0 {
        out.push_str("0.");
        out.extend(std::iter::repeat('0').take((-n) as usize));
        out.push_str(&digits);
    } else {
        let e = n - 1;
        out.push_str(&digits[..1]);
        if k > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        let sign = if e < 0 { '-' } else { '+' };
        let _ = write!(out, "e{sign}{}", e.abs());
    }
}

/// Shortest round-trip significant digits of a positive finite `f`, and the
/// decimal point position `n` such that `f = 0.digits × 10^n`.
fn shortest_digits(f: f64) -> (String, i32) {
    // `{:e}` on f64 yields the shortest round-trip mantissa, e.g. `1.25e-7`.
    let sci = format!("{f:e}");
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();
    let digits = digits.trim_end_matches('0');
    let digits = if digits.is_empty() { "0" } else { digits };
    (digits.to_string(), exp + 1)
}
