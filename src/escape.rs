//! Character escaping shared by every dialect.
//!
//! PGE-X values are stored escaped: the characters `\n \r " ; : [ ] , % \`
//! are prefixed with a backslash (`\n` and `\r` become the two-character
//! sequences `\n` and `\r`). String values are additionally wrapped in
//! double quotes.
//!
//! ```rust
//! use pge_file_formats::escape::{escape, unescape};
//!
//! let raw = "Level: \"1-1\"; start";
//! let escaped = escape(raw, true);
//! assert_eq!(escaped, r#""Level\: \"1-1\"\; start""#);
//! assert_eq!(unescape(&escaped, true), raw);
//! ```
//!
//! This module also hosts the array encodings used by PGE-X values and the
//! URL/base64 transforms used by the SMBX-38A dialect.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD_NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;

use crate::validate;

/// Escapes `input`, optionally wrapping the result in double quotes.
///
/// The output is at most `2 * input.len() + 2` bytes long.
#[must_use]
pub fn escape(input: &str, add_quotes: bool) -> String {
    let mut out = String::with_capacity(input.len() * 2 + if add_quotes { 2 } else { 0 });
    if add_quotes {
        out.push('"');
    }
    for c in input.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '"' | ';' | ':' | '[' | ']' | ',' | '%' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    if add_quotes {
        out.push('"');
    }
    out
}

/// Restores a string produced by [`escape`].
///
/// Never fails: a trailing lone backslash is kept literally and an unknown
/// escape keeps the escaped character without its backslash.
///
/// ```rust
/// use pge_file_formats::escape::unescape;
///
/// assert_eq!(unescape(r"a\nb", false), "a\nb");
/// assert_eq!(unescape(r"tail\", false), r"tail\");
/// assert_eq!(unescape(r"\q", false), "q");
/// ```
#[must_use]
pub fn unescape(input: &str, remove_quotes: bool) -> String {
    let mut body = input;
    if remove_quotes {
        body = body.strip_prefix('"').unwrap_or(body);
        body = body.strip_suffix('"').unwrap_or(body);
    }

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Encodes a list of strings as `["a","b"]`. An empty list encodes as an empty string.
#[must_use]
pub fn encode_string_array<S: AsRef<str>>(items: &[S]) -> String {
    if items.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = items.iter().map(|s| escape(s.as_ref(), true)).collect();
    format!("[{}]", parts.join(","))
}

/// Decodes a `["a","b"]` array. Returns `None` when the syntax is broken.
///
/// ```rust
/// use pge_file_formats::escape::decode_string_array;
///
/// let items = decode_string_array(r#"["one","t\"wo"]"#).unwrap();
/// assert_eq!(items, vec!["one".to_string(), "t\"wo".to_string()]);
/// assert!(decode_string_array(r#"["unterminated]"#).is_none());
/// ```
#[must_use]
pub fn decode_string_array(input: &str) -> Option<Vec<String>> {
    #[derive(PartialEq)]
    enum State {
        Outside,
        AfterOpen,
        AfterValue,
        AfterComma,
        InValue,
        Closed,
    }

    let mut items = Vec::new();
    let mut entry = String::new();
    let mut state = State::Outside;
    let mut escaped = false;

    for c in input.chars() {
        state = match state {
            State::Outside if c == '[' => State::AfterOpen,
            State::AfterOpen if c == ']' => State::Closed,
            State::AfterOpen | State::AfterComma if c == '"' => State::InValue,
            State::AfterValue if c == ']' => State::Closed,
            State::AfterValue if c == ',' => State::AfterComma,
            State::InValue => {
                if c == '"' && !escaped {
                    items.push(unescape(&entry, false));
                    entry.clear();
                    State::AfterValue
                } else {
                    escaped = c == '\\' && !escaped;
                    entry.push(c);
                    State::InValue
                }
            }
            _ => return None,
        };
    }

    match state {
        State::Closed | State::Outside => Some(items),
        _ => None,
    }
}

/// Encodes integers as `[1,-2,3]`. An empty list encodes as an empty string.
#[must_use]
pub fn encode_int_array(items: &[i64]) -> String {
    if items.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = items.iter().map(i64::to_string).collect();
    format!("[{}]", parts.join(","))
}

/// Decodes an `[1,-2,3]` array. An empty string decodes as an empty list
/// and a single trailing comma is tolerated.
#[must_use]
pub fn decode_int_array(input: &str) -> Option<Vec<i64>> {
    if input.is_empty() {
        return Some(Vec::new());
    }
    let inner = input.strip_prefix('[')?.strip_suffix(']')?;
    if inner.is_empty() {
        return Some(Vec::new());
    }
    let inner = inner.strip_suffix(',').unwrap_or(inner);
    inner
        .split(',')
        .map(|token| {
            if validate::is_sint(token) {
                token.parse().ok()
            } else {
                None
            }
        })
        .collect()
}

/// Encodes booleans as a bare digit string such as `"01101"`.
#[must_use]
pub fn encode_bool_array(items: &[bool]) -> String {
    items.iter().map(|&b| if b { '1' } else { '0' }).collect()
}

/// Decodes a digit string. Every character other than `1` reads as `false`.
#[must_use]
pub fn decode_bool_array(input: &str) -> Vec<bool> {
    input.chars().map(|c| c == '1').collect()
}

/// Percent-encodes `input` for SMBX-38A fields.
#[must_use]
pub fn url_encode(input: &str) -> String {
    urlencoding::encode(input).into_owned()
}

/// Percent-decodes `input`. Malformed `%` sequences are kept as they are.
///
/// ```rust
/// use pge_file_formats::escape::url_decode;
///
/// assert_eq!(url_decode("%48%65llo"), "Hello");
/// assert_eq!(url_decode("100%"), "100%");
/// assert_eq!(url_decode("%zz"), "%zz");
/// ```
#[must_use]
pub fn url_decode(input: &str) -> String {
    String::from_utf8_lossy(&urlencoding::decode_binary(input.as_bytes())).into_owned()
}

const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Base64-encodes `input` without padding.
#[must_use]
pub fn base64_encode(input: &str) -> String {
    STANDARD_NO_PAD.encode(input.as_bytes())
}

/// Base64-decodes `input`, stopping at padding or the first byte outside the alphabet.
///
/// ```rust
/// use pge_file_formats::escape::{base64_decode, base64_encode};
///
/// assert_eq!(base64_decode(&base64_encode("Mario\nLuigi")), "Mario\nLuigi");
/// assert_eq!(base64_decode("TWFyaW8=junk"), "Mario");
/// ```
#[must_use]
pub fn base64_decode(input: &str) -> String {
    let end = input
        .bytes()
        .position(|b| !(b.is_ascii_alphanumeric() || b == b'+' || b == b'/'))
        .unwrap_or(input.len());
    let mut usable = &input[..end];
    // a single dangling sextet carries no whole byte
    if usable.len() % 4 == 1 {
        usable = &usable[..usable.len() - 1];
    }
    match LENIENT_BASE64.decode(usable) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => String::new(),
    }
}
