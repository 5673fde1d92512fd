//! Total, side-effect free validators for raw field values.
//!
//! The functions at the top level check PGE-X values (after the
//! `marker:` prefix and before unescaping). The [`smbx64`] submodule holds
//! the legacy dialect's variants, which differ in a few deliberate places:
//! most notably an empty string is a valid legacy float (read as zero) but
//! an invalid PGE-X float.
//!
//! ```rust
//! use pge_file_formats::validate;
//!
//! assert!(validate::is_float("1.5e-2"));
//! assert!(!validate::is_float("1.5e-12345"));
//! assert!(!validate::is_float(""));
//! assert!(validate::smbx64::is_float(""));
//! ```

/// `[A-Z0-9_]*`. The empty string passes.
#[must_use]
pub fn is_section_title(input: &str) -> bool {
    input
        .bytes()
        .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_')
}

/// A double-quoted string with no unescaped quote inside and an unescaped closing quote.
#[must_use]
pub fn is_quoted_string(input: &str) -> bool {
    let bytes = input.as_bytes();
    if bytes.len() < 2 || bytes[0] != b'"' || bytes[bytes.len() - 1] != b'"' {
        return false;
    }
    let mut escaped = false;
    for &b in &bytes[1..bytes.len() - 1] {
        if escaped {
            escaped = false;
        } else if b == b'\\' {
            escaped = true;
        } else if b == b'"' {
            return false;
        }
    }
    !escaped
}

/// Hexadecimal digits only. The empty string passes.
#[must_use]
pub fn is_hex(input: &str) -> bool {
    input.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Exactly `0` or `1`.
#[must_use]
pub fn is_bool(input: &str) -> bool {
    input == "0" || input == "1"
}

/// One or more decimal digits.
#[must_use]
pub fn is_uint(input: &str) -> bool {
    !input.is_empty() && input.bytes().all(|b| b.is_ascii_digit())
}

/// Decimal digits with an optional leading minus sign.
#[must_use]
pub fn is_sint(input: &str) -> bool {
    let digits = input.strip_prefix('-').unwrap_or(input);
    is_uint(digits)
}

/// Decimal number with an optional fraction and an optional `e` exponent of at most four digits.
///
/// At least one mantissa digit is required.
#[must_use]
pub fn is_float(input: &str) -> bool {
    let bytes = input.as_bytes();
    if bytes.is_empty() {
        return false;
    }
    if bytes.len() == 1 && !bytes[0].is_ascii_digit() {
        return false;
    }
    if !bytes[0].is_ascii_digit() && bytes[0] != b'-' && bytes[0] != b'.' {
        return false;
    }

    let mut has_digit = false;
    let mut decimal = false;
    let mut exponent = false;
    let mut exponent_digits = 0;
    let mut i = usize::from(bytes[0] == b'-');
    while i < bytes.len() {
        let b = bytes[i];
        if !decimal && !exponent && b == b'.' {
            decimal = true;
        } else if !exponent && b == b'e' {
            exponent = true;
            if i + 1 < bytes.len() && (bytes[i + 1] == b'-' || bytes[i + 1] == b'+') {
                i += 1;
            }
            if i == bytes.len() - 1 {
                return false;
            }
        } else if !b.is_ascii_digit() {
            return false;
        } else if exponent {
            exponent_digits += 1;
        } else {
            has_digit = true;
        }
        i += 1;
    }

    has_digit && exponent_digits <= 4
}

/// Digit string made of `0` and `1`. The empty string passes.
#[must_use]
pub fn is_bool_array(input: &str) -> bool {
    input.bytes().all(|b| b == b'0' || b == b'1')
}

/// `[` optionally signed integers separated by commas `]`.
#[must_use]
pub fn is_int_array(input: &str) -> bool {
    let Some(inner) = input.strip_prefix('[').and_then(|s| s.strip_suffix(']')) else {
        return false;
    };
    if inner.is_empty() {
        return true;
    }
    // a single trailing comma is tolerated
    let inner = inner.strip_suffix(',').unwrap_or(inner);
    inner.split(',').all(is_sint)
}

/// `["a","b"]` with escaped elements. The empty string is an empty array.
#[must_use]
pub fn is_string_array(input: &str) -> bool {
    crate::escape::decode_string_array(input).is_some()
}

/// Validators of the legacy SMBX64 dialect.
pub mod smbx64 {
    pub use super::{is_sint, is_uint};

    /// `#TRUE#` or `#FALSE#`.
    #[must_use]
    pub fn is_csv_bool(input: &str) -> bool {
        input == "#TRUE#" || input == "#FALSE#"
    }

    /// Legacy float: an empty string passes, a comma may stand for the decimal point.
    ///
    /// The exponent may be `e` or `E` and has no digit limit.
    #[must_use]
    pub fn is_float(input: &str) -> bool {
        let bytes = input.as_bytes();
        if bytes.is_empty() {
            return true;
        }
        if bytes.len() == 1 && !bytes[0].is_ascii_digit() {
            return false;
        }
        if !bytes[0].is_ascii_digit() && !matches!(bytes[0], b'-' | b'.' | b',') {
            return false;
        }

        let mut decimal = false;
        let mut exponent = false;
        let mut sign_checked = false;
        let last = bytes.len() - 1;
        for (i, &b) in bytes.iter().enumerate().skip(usize::from(bytes[0] == b'-')) {
            if !decimal && !exponent && (b == b'.' || b == b',') {
                decimal = true;
                if i == last {
                    return false;
                }
                continue;
            }
            if !exponent {
                if b == b'e' || b == b'E' {
                    exponent = true;
                    if i == last {
                        return false;
                    }
                    continue;
                }
            } else if !sign_checked {
                sign_checked = true;
                if b == b'+' || b == b'-' {
                    if i == last {
                        return false;
                    }
                    continue;
                }
            }
            if !b.is_ascii_digit() {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_title() {
        assert!(is_section_title("LEVEL_INFO"));
        assert!(is_section_title("VIZ_LEVELS2"));
        assert!(!is_section_title("Head"));
        assert!(!is_section_title("A:1;"));
    }

    #[test]
    fn test_quoted_string() {
        assert!(is_quoted_string("\"\""));
        assert!(is_quoted_string(r#""a\"b""#));
        assert!(!is_quoted_string(r#""a"b""#));
        assert!(!is_quoted_string(r#""a\""#));
        assert!(!is_quoted_string("\""));
        assert!(!is_quoted_string(""));
        assert!(!is_quoted_string("abc"));
    }

    #[test]
    fn test_integers() {
        assert!(is_uint("0"));
        assert!(!is_uint(""));
        assert!(!is_uint("-1"));
        assert!(is_sint("-15"));
        assert!(!is_sint("-"));
        assert!(!is_sint("+1"));
        assert!(!is_sint("1-"));
    }

    #[test]
    fn test_pgex_float() {
        assert!(is_float("1.5e-2"));
        assert!(is_float("-.5"));
        assert!(is_float("10"));
        assert!(is_float("3e+1234"));
        assert!(!is_float("1.5e-12345"));
        assert!(!is_float(""));
        assert!(!is_float("."));
        assert!(!is_float("1e"));
        assert!(!is_float("1e-"));
        assert!(!is_float("1.2.3"));
        assert!(!is_float("1,5"));
    }

    #[test]
    fn test_legacy_float() {
        assert!(smbx64::is_float(""));
        assert!(smbx64::is_float("1,5"));
        assert!(smbx64::is_float("-2.5E+10"));
        assert!(!smbx64::is_float("1."));
        assert!(!smbx64::is_float("1e"));
        assert!(!smbx64::is_float("abc"));
    }

    #[test]
    fn test_arrays() {
        assert!(is_bool_array("0101"));
        assert!(!is_bool_array("012"));
        assert!(is_int_array("[1,-2,3]"));
        assert!(is_int_array("[]"));
        assert!(!is_int_array("[1,,2]"));
        assert!(!is_int_array("1,2"));
        for input in ["[1,]", "[1,-2,]", "[]", "[1,,]", "[,]", "[x]"] {
            assert_eq!(
                is_int_array(input),
                crate::escape::decode_int_array(input).is_some(),
                "input {input:?}"
            );
        }
        assert!(is_string_array(r#"["a","b"]"#));
        assert!(!is_string_array(r#"["a"#));
    }

    #[test]
    fn test_validators_handle_nul() {
        let input = "\0";
        assert!(!is_uint(input));
        assert!(!is_sint(input));
        assert!(!is_float(input));
        assert!(!smbx64::is_float(input));
        assert!(!is_quoted_string(input));
        assert!(!is_section_title(input));
    }
}
