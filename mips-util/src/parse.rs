/// Decodes a single backslash-escape starting at `chars` (which must already have consumed the
/// backslash), returning the decoded byte and the number of source characters consumed.
fn decode_escape(c: char) -> Option<u8> {
    Some(match c {
        'n' => b'\n',
        'r' => b'\r',
        't' => b'\t',
        'b' => 0x08,
        '0' => 0,
        '"' => b'"',
        '\\' => b'\\',
        '\'' => b'\'',
        _ => return None,
    })
}

/// Decodes the escape sequences `\n \r \t \b \0 \" \\` in a string literal's inner text
/// (i.e. with the surrounding quotes already stripped). Returns `None` on an unrecognized
/// escape.
pub fn decode_ascii_escapes(inner: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            let escaped = chars.next()?;
            out.push(decode_escape(escaped)?);
        } else if c.is_ascii() {
            out.push(c as u8);
        } else {
            return None;
        }
    }
    Some(out)
}

/// Encodes `bytes` back into a `\`-escaped literal body, the inverse of
/// [`decode_ascii_escapes`]. Used when rendering diagnostics that echo a source string.
pub fn escape_ascii(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x08 => out.push_str("\\b"),
            0 => out.push_str("\\0"),
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            _ => out.push(b as char),
        }
    }
    out
}

/// Parses a MIPS integer literal: decimal, `0b`-, `0o`-, `0x`-prefixed, a single-quoted
/// character literal (`'X'` or `'\X'`), or scientific notation (`1e2`). Returns `None` on any
/// parse failure rather than a partial value, and never panics.
///
/// `signed` controls whether a leading `-` is permitted and whether the result is sign-extended
/// from `bits`; `bits` bounds the accepted magnitude the same way [`crate::to_int`]/
/// [`crate::to_uint`] do.
pub fn from_string(s: &str, bits: u32, signed: bool) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    // Character literal: 'X' or '\X'
    if s.starts_with('\'') && s.ends_with('\'') && s.len() >= 3 {
        let inner = &s[1..s.len() - 1];
        let bytes = decode_ascii_escapes(inner)?;
        if bytes.len() != 1 {
            return None;
        }
        return Some(apply_width(bytes[0] as i64, bits, signed));
    }

    let (neg, rest) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };

    let value = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(oct) = rest.strip_prefix("0o").or_else(|| rest.strip_prefix("0O")) {
        i64::from_str_radix(oct, 8).ok()?
    } else if let Some(bin) = rest.strip_prefix("0b").or_else(|| rest.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2).ok()?
    } else if rest.contains(['e', 'E']) && rest.contains(|c: char| c.is_ascii_digit()) {
        let f: f64 = rest.parse().ok()?;
        if f.fract() != 0.0 {
            return None;
        }
        f as i64
    } else {
        rest.parse::<i64>().ok()?
    };

    if !signed && neg {
        return None;
    }

    let value = if neg { -value } else { value };
    Some(apply_width(value, bits, signed))
}

fn apply_width(value: i64, bits: u32, signed: bool) -> i64 {
    if signed {
        crate::to_int(value as u64, bits)
    } else {
        crate::to_uint(value as u64, bits) as i64
    }
}
