//! Password masking for outbound log payloads.
//!
//! Masks the value of any field named exactly `password`, in either
//! `"password": "<value>"` form (including inside a JSON document embedded
//! as an escaped string, e.g. a captured request body) or
//! `password=<value>` form. Everything else is copied through byte for byte.

/// Replacement for masked values.
pub const MASK: &str = "*****";

const FIELD: &str = "password";

/// A byte range of the input to replace.
struct Span {
    start: usize,
    end: usize,
    replacement: String,
}

/// Return `input` with every password value masked.
pub fn redact(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut copied = 0;
    let mut search = 0;

    while let Some(offset) = input[search..].find(FIELD) {
        let start = search + offset;
        let end = start + FIELD.len();
        match json_value(bytes, start, end).or_else(|| form_value(bytes, start, end)) {
            Some(span) => {
                out.push_str(&input[copied..span.start]);
                out.push_str(&span.replacement);
                copied = span.end;
                search = span.end;
            }
            None => search = end,
        }
    }

    out.push_str(&input[copied..]);
    out
}

/// `"password": <value>`, with the quotes optionally escaped one level.
fn json_value(bytes: &[u8], start: usize, end: usize) -> Option<Span> {
    if start == 0 || bytes[start - 1] != b'"' {
        return None;
    }
    let escaped = match backslashes_before(bytes, start - 1) {
        0 => false,
        1 => true,
        _ => return None,
    };
    let quote: &[u8] = if escaped { b"\\\"" } else { b"\"" };

    let mut i = end;
    if !bytes[i..].starts_with(quote) {
        return None;
    }
    i = skip_whitespace(bytes, i + quote.len());
    if bytes.get(i) != Some(&b':') {
        return None;
    }
    i = skip_whitespace(bytes, i + 1);

    if bytes[i..].starts_with(quote) {
        let value_start = i + quote.len();
        let value_end = string_end(bytes, value_start, escaped)?;
        return Some(Span {
            start: value_start,
            end: value_end,
            replacement: MASK.to_string(),
        });
    }

    // Bare scalar: number, boolean or null. Nested objects are left alone.
    let value_end = scan_until(bytes, i, b",}] \t\r\n\\");
    if value_end == i || matches!(bytes[i], b'{' | b'[') {
        return None;
    }
    let q = if escaped { "\\\"" } else { "\"" };
    Some(Span {
        start: i,
        end: value_end,
        replacement: format!("{q}{MASK}{q}"),
    })
}

/// `password=<value>`, bare or quoted.
fn form_value(bytes: &[u8], start: usize, end: usize) -> Option<Span> {
    if start > 0 && (bytes[start - 1].is_ascii_alphanumeric() || bytes[start - 1] == b'_') {
        return None;
    }
    if bytes.get(end) != Some(&b'=') {
        return None;
    }
    let i = skip_whitespace(bytes, end + 1);

    let (value_start, value_end) = if bytes[i..].starts_with(b"\\\"") {
        let from = i + 2;
        (from, find(bytes, from, b"\\\"")?)
    } else if bytes.get(i) == Some(&b'"') {
        let from = i + 1;
        (from, find(bytes, from, b"\"")?)
    } else {
        (i, scan_until(bytes, i, b"&;,}\"\\ \t\r\n"))
    };

    Some(Span {
        start: value_start,
        end: value_end,
        replacement: MASK.to_string(),
    })
}

/// End of a string value starting at `from`, exclusive of the closing quote.
///
/// In a plain string the closing quote has an even run of backslashes before
/// it. One level of escaping turns the closing quote into `\"`, and the
/// content's own escapes double, so the run is 1 modulo 4.
fn string_end(bytes: &[u8], from: usize, escaped: bool) -> Option<usize> {
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] == b'"' {
            let run = backslashes_before(bytes, i).min(i - from);
            if !escaped && run % 2 == 0 {
                return Some(i);
            }
            if escaped {
                match run % 4 {
                    1 => return Some(i - 1),
                    3 => {}
                    // An unescaped quote closes the outer string: malformed.
                    _ => return None,
                }
            }
        }
        i += 1;
    }
    None
}

fn backslashes_before(bytes: &[u8], index: usize) -> usize {
    bytes[..index]
        .iter()
        .rev()
        .take_while(|&&b| b == b'\\')
        .count()
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

fn scan_until(bytes: &[u8], mut i: usize, stops: &[u8]) -> usize {
    while i < bytes.len() && !stops.contains(&bytes[i]) {
        i += 1;
    }
    i
}

fn find(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    bytes[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| from + p)
}
