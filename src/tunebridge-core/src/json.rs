//! Best-effort field extraction from loosely structured JSON text.
//!
//! Backend responses are small and flat, so instead of building a document
//! tree these helpers scan the raw text for `"key":` and read the value that
//! follows. Every lookup is a fresh linear scan. Nothing here fails: an
//! absent or malformed value yields the documented default (`""`, `0`,
//! `false`, or an empty list).
//!
//! Limitations:
//! - the first occurrence of a key wins, wherever it sits in the document;
//! - string values are returned raw, escape sequences are not decoded;
//! - [`extract_array`] counts braces without regard to string contents, so it
//!   expects array elements to be flat objects.

/// Returns the raw string value of the first `"key":"…"` (or `"key": "…"`),
/// up to the next unescaped quote. Empty when absent or unterminated.
pub fn extract_string<'a>(doc: &'a str, key: &str) -> &'a str {
    let start = match find_value(doc, &format!("\"{key}\":\""))
        .or_else(|| find_value(doc, &format!("\"{key}\": \"")))
    {
        Some(start) => start,
        None => return "",
    };

    let bytes = doc.as_bytes();
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return &doc[start..i],
            _ => i += 1,
        }
    }
    ""
}

/// Reads the integer after `"key":`, up to the next `,`, `}` or newline.
///
/// Only the leading sign and digits count, so `180.5` reads as `180`.
/// Returns `0` when the key is absent or no number can be read.
pub fn extract_int(doc: &str, key: &str) -> i64 {
    let Some(start) = find_value(doc, &format!("\"{key}\":")) else {
        return 0;
    };
    let rest = &doc[start..];
    let Some(end) = rest.find([',', '}', '\n']) else {
        return 0;
    };
    parse_leading_int(rest[..end].trim()).unwrap_or(0)
}

/// Reads a boolean after `"key":`.
///
/// Accepts the JSON literals `true`/`false`, then falls back to the string
/// forms `"true"`/`"True"`. Anything else is `false`.
pub fn extract_bool(doc: &str, key: &str) -> bool {
    if let Some(start) = find_value(doc, &format!("\"{key}\":")) {
        let value = doc[start..].trim_start();
        if value.starts_with("true") {
            return true;
        }
        if value.starts_with("false") {
            return false;
        }
    }
    matches!(extract_string(doc, key), "true" | "True")
}

/// Splits the first `[ … ]` span (first `[` to last `]`) into its top-level
/// `{ … }` objects, returned as raw substrings.
pub fn extract_array(doc: &str) -> Vec<&str> {
    let (Some(open), Some(close)) = (doc.find('['), doc.rfind(']')) else {
        return Vec::new();
    };
    if close <= open {
        return Vec::new();
    }

    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut item_start = None;
    for (offset, byte) in doc.as_bytes()[open + 1..close].iter().enumerate() {
        let i = open + 1 + offset;
        match byte {
            b'{' => {
                if depth == 0 {
                    item_start = Some(i);
                }
                depth += 1;
            }
            b'}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(start) = item_start.take() {
                        items.push(&doc[start..=i]);
                    }
                }
            }
            _ => {}
        }
    }
    items
}

fn find_value(doc: &str, needle: &str) -> Option<usize> {
    doc.find(needle).map(|pos| pos + needle.len())
}

fn parse_leading_int(text: &str) -> Option<i64> {
    let digits_from = usize::from(text.starts_with(['-', '+']));
    let digits_len = text[digits_from..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits_len == 0 {
        return None;
    }
    text[..digits_from + digits_len].parse().ok()
}
