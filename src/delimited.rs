//! Composable readers and writers for delimiter-separated records.
//!
//! A record such as `L|5,0,0|100|200|intro.lvl` is described by a list of
//! [`Spec`]s, one per field. Each spec binds a field to storage in the
//! caller's model, so the same list both decodes a line into the model and
//! encodes the model back into a line:
//!
//! - [`required`] / [`optional`]: a single converted value
//! - [`post_process`] / [`optional_with`]: a string passed through a
//!   decode transform on read and its inverse on write
//! - [`sub_reader`]: the field is itself a record with another delimiter
//! - [`iterator`]: the field is a list bound to a `Vec`, parsed element by
//!   element on read and rendered element by element on write
//! - [`discard`]: skipped on read, written as a literal tag
//!
//! ```rust
//! use pge_file_formats::delimited::{discard, optional, read_fields, required, sub_reader};
//!
//! let (mut id, mut dx, mut dy, mut x, mut y) = (0u32, 9i64, 9i64, 0i64, 0i64);
//! read_fields(
//!     "L|5,0,0|100|200",
//!     '|',
//!     &mut [
//!         discard("L"),
//!         sub_reader(',', vec![
//!             required(&mut id),
//!             optional(&mut dx, 0),
//!             optional(&mut dy, 0),
//!         ]),
//!         required(&mut x),
//!         required(&mut y),
//!     ],
//! )
//! .unwrap();
//! assert_eq!((id, dx, dy, x, y), (5, 0, 0, 100, 200));
//! ```

use std::fmt;

use thiserror::Error;

/// String transform applied by post-processing fields.
pub type Transform = fn(&str) -> String;

/// Why a delimited record could not be decoded.
///
/// `path` holds the 1-based field position at every nesting level, so
/// `[6, 2, 1]` is the first value of the second group of the sixth field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field {}: {msg} (got {raw:?})", format_path(.path))]
pub struct FieldError {
    pub path: Vec<usize>,
    pub raw: String,
    pub msg: String,
}

fn format_path(path: &[usize]) -> String {
    let parts: Vec<String> = path.iter().map(usize::to_string).collect();
    parts.join(".")
}

/// A value that can live in one delimited field.
pub trait FieldValue: Sized + Clone {
    /// Name used in conversion error messages.
    const KIND: &'static str;

    fn parse_field(raw: &str) -> Option<Self>;

    fn render_field(&self) -> String;
}

impl FieldValue for String {
    const KIND: &'static str = "string";

    fn parse_field(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }

    fn render_field(&self) -> String {
        self.clone()
    }
}

impl FieldValue for bool {
    const KIND: &'static str = "bool (must be empty, \"0\", \"!0\" or \"1\")";

    fn parse_field(raw: &str) -> Option<Self> {
        match raw {
            "" | "0" => Some(false),
            "!0" | "1" => Some(true),
            _ => None,
        }
    }

    fn render_field(&self) -> String {
        if *self { "1" } else { "0" }.to_string()
    }
}

macro_rules! number_field {
    ($($ty:ty => $kind:expr),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                const KIND: &'static str = $kind;

                fn parse_field(raw: &str) -> Option<Self> {
                    raw.trim().parse().ok()
                }

                fn render_field(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

number_field! {
    i32 => "signed integer",
    i64 => "signed integer",
    u32 => "unsigned integer",
    u64 => "unsigned integer",
    f64 => "float",
}

/// Storage behind a single-value spec.
pub trait Slot {
    /// Converts `raw` into the storage.
    ///
    /// # Errors
    ///
    /// Returns a message describing the failed conversion.
    fn read(&mut self, raw: &str) -> Result<(), String>;

    /// Restores the default of an optional field.
    fn reset(&mut self);

    fn write(&self) -> String;
}

struct Typed<'a, T> {
    target: &'a mut T,
    default: Option<T>,
}

impl<T: FieldValue> Slot for Typed<'_, T> {
    fn read(&mut self, raw: &str) -> Result<(), String> {
        *self.target =
            T::parse_field(raw).ok_or_else(|| format!("could not convert to {}", T::KIND))?;
        Ok(())
    }

    fn reset(&mut self) {
        if let Some(default) = &self.default {
            *self.target = default.clone();
        }
    }

    fn write(&self) -> String {
        self.target.render_field()
    }
}

struct Transformed<'a> {
    target: &'a mut String,
    default: Option<String>,
    decode: Transform,
    encode: Transform,
}

impl Slot for Transformed<'_> {
    fn read(&mut self, raw: &str) -> Result<(), String> {
        *self.target = (self.decode)(raw);
        Ok(())
    }

    fn reset(&mut self) {
        if let Some(default) = &self.default {
            *self.target = default.clone();
        }
    }

    fn write(&self) -> String {
        (self.encode)(self.target)
    }
}

/// Storage behind a list spec.
pub trait ListSlot {
    /// Converts one element and appends it to the list.
    ///
    /// # Errors
    ///
    /// Returns a message describing the failed conversion.
    fn push(&mut self, raw: &str) -> Result<(), String>;

    /// Renders every element of the list, in order.
    fn render(&self) -> Vec<String>;
}

struct Elements<'a, T> {
    target: &'a mut Vec<T>,
    parse: fn(&str) -> Result<T, String>,
    render: fn(&T) -> String,
}

impl<T> ListSlot for Elements<'_, T> {
    fn push(&mut self, raw: &str) -> Result<(), String> {
        self.target.push((self.parse)(raw)?);
        Ok(())
    }

    fn render(&self) -> Vec<String> {
        self.target.iter().map(self.render).collect()
    }
}

/// Descriptor of one field of a delimited record.
pub enum Spec<'a> {
    /// Skipped on read, written as the given literal
    Discard(&'a str),
    /// A single value; an optional one falls back to its default when absent or empty
    Value {
        slot: Box<dyn Slot + 'a>,
        optional: bool,
    },
    /// A nested record split by its own delimiter
    SubReader {
        delimiter: char,
        optional: bool,
        specs: Vec<Spec<'a>>,
    },
    /// A list whose elements are converted one at a time
    Iterator {
        delimiter: char,
        optional: bool,
        list: Box<dyn ListSlot + 'a>,
    },
}

impl Spec<'_> {
    fn is_optional(&self) -> bool {
        match self {
            Spec::Discard(_) => false,
            Spec::Value { optional, .. }
            | Spec::SubReader { optional, .. }
            | Spec::Iterator { optional, .. } => *optional,
        }
    }
}

impl fmt::Debug for Spec<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Spec::Discard(tag) => f.debug_tuple("Discard").field(tag).finish(),
            Spec::Value { slot, optional } => f
                .debug_struct("Value")
                .field("current", &slot.write())
                .field("optional", optional)
                .finish(),
            Spec::SubReader {
                delimiter,
                optional,
                specs,
            } => f
                .debug_struct("SubReader")
                .field("delimiter", delimiter)
                .field("optional", optional)
                .field("specs", specs)
                .finish(),
            Spec::Iterator {
                delimiter,
                optional,
                list,
            } => f
                .debug_struct("Iterator")
                .field("delimiter", delimiter)
                .field("optional", optional)
                .field("items", &list.render())
                .finish(),
        }
    }
}

/// Skips a field on read and writes `tag` in its place.
#[must_use]
pub fn discard(tag: &str) -> Spec<'_> {
    Spec::Discard(tag)
}

/// A field that must be present and must convert.
#[must_use]
pub fn required<T: FieldValue>(target: &mut T) -> Spec<'_> {
    Spec::Value {
        slot: Box::new(Typed {
            target,
            default: None,
        }),
        optional: false,
    }
}

/// A field that takes `default` when absent or empty.
#[must_use]
pub fn optional<T: FieldValue>(target: &mut T, default: T) -> Spec<'_> {
    Spec::Value {
        slot: Box::new(Typed {
            target,
            default: Some(default),
        }),
        optional: true,
    }
}

/// A required string decoded by `decode` on read and encoded by `encode` on write.
#[must_use]
pub fn post_process(target: &mut String, decode: Transform, encode: Transform) -> Spec<'_> {
    Spec::Value {
        slot: Box::new(Transformed {
            target,
            default: None,
            decode,
            encode,
        }),
        optional: false,
    }
}

/// An optional string with transforms. Absent or empty fields take `default` untransformed.
#[must_use]
pub fn optional_with<'a>(
    target: &'a mut String,
    default: &str,
    decode: Transform,
    encode: Transform,
) -> Spec<'a> {
    Spec::Value {
        slot: Box::new(Transformed {
            target,
            default: Some(default.to_string()),
            decode,
            encode,
        }),
        optional: true,
    }
}

/// A field holding a nested record.
#[must_use]
pub fn sub_reader(delimiter: char, specs: Vec<Spec<'_>>) -> Spec<'_> {
    Spec::SubReader {
        delimiter,
        optional: false,
        specs,
    }
}

/// A nested record that may be missing entirely.
#[must_use]
pub fn optional_sub_reader(delimiter: char, specs: Vec<Spec<'_>>) -> Spec<'_> {
    Spec::SubReader {
        delimiter,
        optional: true,
        specs,
    }
}

/// A list field bound to `target`.
///
/// On read every element goes through `parse` and is appended; an empty
/// field has no elements. On write every element goes through `render` and
/// the results are joined by `delimiter`.
#[must_use]
pub fn iterator<'a, T: 'a>(
    delimiter: char,
    target: &'a mut Vec<T>,
    parse: fn(&str) -> Result<T, String>,
    render: fn(&T) -> String,
) -> Spec<'a> {
    Spec::Iterator {
        delimiter,
        optional: false,
        list: Box::new(Elements {
            target,
            parse,
            render,
        }),
    }
}

/// Like [`iterator`], but the field may be missing.
#[must_use]
pub fn optional_iterator<'a, T: 'a>(
    delimiter: char,
    target: &'a mut Vec<T>,
    parse: fn(&str) -> Result<T, String>,
    render: fn(&T) -> String,
) -> Spec<'a> {
    Spec::Iterator {
        delimiter,
        optional: true,
        list: Box::new(Elements {
            target,
            parse,
            render,
        }),
    }
}

/// Decodes `line` into the storage bound by `specs`.
///
/// Fields are consumed left to right. Once an optional spec has been seen
/// at a level, running out of fields at that level is not an error: the
/// remaining optional specs take their defaults and required ones keep
/// their current value. Extra trailing fields are ignored.
///
/// # Errors
///
/// Returns a [`FieldError`] for the first missing required field or failed
/// conversion.
pub fn read_fields(line: &str, delimiter: char, specs: &mut [Spec<'_>]) -> Result<(), FieldError> {
    let fields: Vec<&str> = line.split(delimiter).collect();
    let mut path = Vec::new();
    read_level(&fields, specs, &mut path)
}

fn read_level(
    fields: &[&str],
    specs: &mut [Spec<'_>],
    path: &mut Vec<usize>,
) -> Result<(), FieldError> {
    let mut tolerant = false;
    for (index, spec) in specs.iter_mut().enumerate() {
        tolerant |= spec.is_optional();
        path.push(index + 1);
        let field = fields.get(index).copied();

        if field.is_none() && !tolerant {
            return Err(FieldError {
                path: path.clone(),
                raw: String::new(),
                msg: "missing required field".to_string(),
            });
        }

        match spec {
            Spec::Discard(_) => {}
            Spec::Value { slot, optional } => match field {
                Some(raw) if !(*optional && raw.is_empty()) => {
                    slot.read(raw).map_err(|msg| FieldError {
                        path: path.clone(),
                        raw: raw.to_string(),
                        msg,
                    })?;
                }
                _ if *optional => slot.reset(),
                _ => {}
            },
            Spec::SubReader {
                delimiter,
                optional,
                specs,
            } => match field {
                Some(raw) if !(*optional && raw.is_empty()) => {
                    let parts: Vec<&str> = raw.split(*delimiter).collect();
                    read_level(&parts, specs, path)?;
                }
                _ => reset_all(specs),
            },
            Spec::Iterator {
                delimiter, list, ..
            } => {
                if let Some(raw) = field {
                    if !raw.is_empty() {
                        for (n, element) in raw.split(*delimiter).enumerate() {
                            list.push(element).map_err(|msg| {
                                let mut element_path = path.clone();
                                element_path.push(n + 1);
                                FieldError {
                                    path: element_path,
                                    raw: element.to_string(),
                                    msg,
                                }
                            })?;
                        }
                    }
                }
            }
        }
        path.pop();
    }
    Ok(())
}

fn reset_all(specs: &mut [Spec<'_>]) {
    for spec in specs {
        match spec {
            Spec::Value {
                slot,
                optional: true,
            } => slot.reset(),
            Spec::SubReader { specs, .. } => reset_all(specs),
            _ => {}
        }
    }
}

/// Encodes the storage bound by `specs` as one delimited line (without a newline).
///
/// ```rust
/// use pge_file_formats::delimited::{discard, iterator, required, sub_reader, write_fields};
///
/// let (mut id, mut x) = (5u32, 100i64);
/// let mut tags = vec!["a".to_string(), "b".to_string()];
/// let line = write_fields('|', &[
///     discard("T"),
///     sub_reader(',', vec![required(&mut id)]),
///     required(&mut x),
///     iterator('/', &mut tags, |raw| Ok(raw.to_string()), String::clone),
/// ]);
/// assert_eq!(line, "T|5|100|a/b");
/// ```
#[must_use]
pub fn write_fields(delimiter: char, specs: &[Spec<'_>]) -> String {
    let mut out = String::new();
    for (index, spec) in specs.iter().enumerate() {
        if index > 0 {
            out.push(delimiter);
        }
        match spec {
            Spec::Discard(tag) => out.push_str(tag),
            Spec::Value { slot, .. } => out.push_str(&slot.write()),
            Spec::SubReader {
                delimiter, specs, ..
            } => out.push_str(&write_fields(*delimiter, specs)),
            Spec::Iterator {
                delimiter, list, ..
            } => {
                let mut separator = [0u8; 4];
                out.push_str(&list.render().join(delimiter.encode_utf8(&mut separator)));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escape::{url_decode, url_encode};

    #[test]
    fn test_subreader_with_optional_tail() {
        let (mut id, mut dx, mut dy) = (0u32, 7i64, 7i64);
        read_fields(
            "5",
            ',',
            &mut [
                required(&mut id),
                optional(&mut dx, 0),
                optional(&mut dy, 0),
            ],
        )
        .unwrap();
        assert_eq!((id, dx, dy), (5, 0, 0));
    }

    #[test]
    fn test_missing_required_field() {
        let (mut a, mut b) = (0u32, 0u32);
        let err = read_fields("1", '|', &mut [required(&mut a), required(&mut b)]).unwrap_err();
        assert_eq!(err.path, vec![2]);
    }

    #[test]
    fn test_conversion_error_path() {
        let (mut a, mut b, mut c) = (0u32, 0u32, 0i64);
        let err = read_fields(
            "T|1,x|3",
            '|',
            &mut [
                discard("T"),
                sub_reader(',', vec![required(&mut a), required(&mut b)]),
                required(&mut c),
            ],
        )
        .unwrap_err();
        assert_eq!(err.path, vec![2, 2]);
        assert_eq!(err.raw, "x");
        assert!(err.to_string().starts_with("field 2.2:"));
    }

    #[test]
    fn test_bool_conversion() {
        let mut flag = false;
        read_fields("!0", '|', &mut [required(&mut flag)]).unwrap();
        assert!(flag);
        read_fields("", '|', &mut [required(&mut flag)]).unwrap();
        assert!(!flag);
        assert!(read_fields("yes", '|', &mut [required(&mut flag)]).is_err());
    }

    #[test]
    fn test_post_process_roundtrip() {
        let mut name = String::new();
        read_fields(
            "%48%69%21",
            '|',
            &mut [post_process(&mut name, url_decode, url_encode)],
        )
        .unwrap();
        assert_eq!(name, "Hi!");
        assert_eq!(
            write_fields('|', &[post_process(&mut name, url_decode, url_encode)]),
            url_encode("Hi!")
        );
    }

    fn parse_text(raw: &str) -> Result<String, String> {
        Ok(raw.to_string())
    }

    fn parse_number(raw: &str) -> Result<u32, String> {
        raw.parse().map_err(|e: std::num::ParseIntError| e.to_string())
    }

    #[test]
    fn test_iterator_elements() {
        let mut seen = Vec::new();
        read_fields(
            "a/b/c",
            '|',
            &mut [iterator('/', &mut seen, parse_text, String::clone)],
        )
        .unwrap();
        assert_eq!(seen, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_iterator_uses_one_spec_list_both_ways() {
        let (mut id, mut numbers) = (0u32, Vec::new());
        let line = "N|4|1:2:30";
        let mut specs = [
            discard("N"),
            required(&mut id),
            iterator(':', &mut numbers, parse_number, u32::to_string),
        ];
        read_fields(line, '|', &mut specs).unwrap();
        assert_eq!(write_fields('|', &specs), line);
        drop(specs);
        assert_eq!((id, numbers), (4, vec![1, 2, 30]));
    }

    #[test]
    fn test_empty_iterator_writes_empty_field() {
        let mut items: Vec<String> = Vec::new();
        let specs = [discard("E"), iterator(',', &mut items, parse_text, String::clone)];
        assert_eq!(write_fields('|', &specs), "E|");
    }

    #[test]
    fn test_iterator_error_path() {
        let mut numbers = Vec::new();
        let err = read_fields(
            "x|1:2:oops",
            '|',
            &mut [
                discard("x"),
                iterator(':', &mut numbers, parse_number, u32::to_string),
            ],
        )
        .unwrap_err();
        assert_eq!(err.path, vec![2, 3]);
        assert_eq!(err.raw, "oops");
    }

    #[test]
    fn test_three_level_nesting() {
        let mut codes = [0i32; 4];
        let [a, b, c, d] = &mut codes;
        read_fields(
            "1,2\\3,4",
            '|',
            &mut [sub_reader(
                '\\',
                vec![
                    sub_reader(',', vec![required(a), required(b)]),
                    sub_reader(',', vec![required(c), required(d)]),
                ],
            )],
        )
        .unwrap();
        assert_eq!(codes, [1, 2, 3, 4]);
    }

    #[test]
    fn test_optional_sub_reader_absent() {
        let (mut a, mut b) = (0u32, 3u32);
        read_fields(
            "1",
            '|',
            &mut [
                required(&mut a),
                optional_sub_reader(',', vec![optional(&mut b, 0)]),
            ],
        )
        .unwrap();
        assert_eq!((a, b), (1, 0));
    }
}
