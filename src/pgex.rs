//! The PGE-X section tree.
//!
//! A PGE-X document is a flat list of sections. Each section starts with a
//! bare `NAME` line and ends with a `NAME_END` line; every line in between
//! is a record made of `marker:value;` pairs:
//!
//! ```text
//! HEAD
//! TL:"My episode";SZ:5;
//! HEAD_END
//! LEVELS
//! ID:1;X:32;Y:64;LF:"intro.lvlx";
//! ID:2;X:96;Y:64;
//! LEVELS_END
//! ```
//!
//! Values stay escaped in the tree ([`Value::raw`]) and are converted on
//! demand through the typed accessors. A section whose body contains a
//! malformed record is not rejected: it is kept as a plain-text body holding
//! the original lines so nothing is silently lost. Only structural problems
//! (an unterminated section or a NUL byte in a section name) fail the whole
//! document.
//!
//! ## Examples
//!
//! ```rust
//! use pge_file_formats::pgex::{self, Body};
//!
//! let doc = pgex::parse("NAME\nA:1;\nNAME_END\n").unwrap();
//! let section = doc.section("NAME").unwrap();
//! let item = section.items().next().unwrap();
//! assert_eq!(item.get("A").and_then(|v| v.as_i64()), Some(1));
//!
//! assert_eq!(doc.to_string(), "NAME\nA:1;\nNAME_END\n");
//!
//! let broken = pgex::parse("NAME\nA:1\nNAME_END\n").unwrap();
//! assert!(matches!(broken.sections[0].body, Body::PlainText(_)));
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::error::{truncate_filtered, Error, Result};
use crate::escape;
use crate::options::FileFormat;
use crate::validate;

/// Longest section name kept in structural error messages.
const SECTION_NAME_LIMIT: usize = 20;

/// A complete PGE-X document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub sections: Vec<Section>,
}

/// A named section. Its body is either structured or plain text.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub name: String,
    pub body: Body,
}

/// Content of a [`Section`].
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Records and nested sections, in document order
    Struct(Vec<Entry>),
    /// Raw body lines, each terminated by `\n`
    PlainText(String),
}

/// One element of a structured body.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Item(Item),
    Section(Section),
}

/// One record: an ordered list of values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Item {
    pub values: Vec<Value>,
}

/// A `marker:value` pair. `raw` keeps the value exactly as written (escaped).
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub marker: String,
    pub raw: String,
}

/// Why a record could not be split into values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("record does not end with ';'")]
    MissingTerminator,
    #[error("record ends inside a marker")]
    UnterminatedMarker,
    #[error("illegal {0:?} inside a marker")]
    IllegalInMarker(char),
    #[error("unescaped ':' inside a value")]
    UnescapedColon,
}

impl Document {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a section.
    pub fn push(&mut self, section: Section) {
        self.sections.push(section);
    }

    /// First section called `name`.
    #[must_use]
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        for section in &self.sections {
            write_section(&mut out, section);
        }
        f.write_str(&out)
    }
}

impl Section {
    /// Creates an empty structured section.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Section {
            name: name.to_string(),
            body: Body::Struct(Vec::new()),
        }
    }

    /// Creates a plain-text section from raw lines.
    #[must_use]
    pub fn plain_text<S: AsRef<str>>(name: &str, lines: &[S]) -> Self {
        Section {
            name: name.to_string(),
            body: Body::PlainText(join_lines(lines)),
        }
    }

    /// Appends a record. Turns a plain-text body into an empty structured one first.
    pub fn push_item(&mut self, item: Item) {
        self.entries_mut().push(Entry::Item(item));
    }

    /// Appends a nested section.
    pub fn push_section(&mut self, section: Section) {
        self.entries_mut().push(Entry::Section(section));
    }

    fn entries_mut(&mut self) -> &mut Vec<Entry> {
        if let Body::PlainText(_) = self.body {
            self.body = Body::Struct(Vec::new());
        }
        match &mut self.body {
            Body::Struct(entries) => entries,
            Body::PlainText(_) => unreachable!("plain text body replaced above"),
        }
    }

    /// Records of a structured body. A plain-text body yields nothing.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.entries().filter_map(|e| match e {
            Entry::Item(item) => Some(item),
            Entry::Section(_) => None,
        })
    }

    /// Nested sections of a structured body.
    pub fn subsections(&self) -> impl Iterator<Item = &Section> {
        self.entries().filter_map(|e| match e {
            Entry::Section(section) => Some(section),
            Entry::Item(_) => None,
        })
    }

    fn entries(&self) -> std::slice::Iter<'_, Entry> {
        match &self.body {
            Body::Struct(entries) => entries.iter(),
            Body::PlainText(_) => [].iter(),
        }
    }

    /// Raw text of a degraded section.
    #[must_use]
    pub fn plain_text_body(&self) -> Option<&str> {
        match &self.body {
            Body::PlainText(text) => Some(text),
            Body::Struct(_) => None,
        }
    }

    #[must_use]
    pub fn is_plain_text(&self) -> bool {
        matches!(self.body, Body::PlainText(_))
    }
}

impl Item {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// First value with the given marker.
    #[must_use]
    pub fn get(&self, marker: &str) -> Option<&Value> {
        self.values.iter().find(|v| v.marker == marker)
    }

    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Value {
    /// Wraps an already escaped value.
    #[must_use]
    pub fn raw(marker: &str, raw: &str) -> Self {
        Value {
            marker: marker.to_string(),
            raw: raw.to_string(),
        }
    }

    /// A quoted, escaped string value.
    #[must_use]
    pub fn string(marker: &str, text: &str) -> Self {
        Self::raw(marker, &escape::escape(text, true))
    }

    /// Any integer or float rendered with `Display`.
    #[must_use]
    pub fn number<N: fmt::Display>(marker: &str, number: N) -> Self {
        Self::raw(marker, &number.to_string())
    }

    #[must_use]
    pub fn bool(marker: &str, flag: bool) -> Self {
        Self::raw(marker, if flag { "1" } else { "0" })
    }

    #[must_use]
    pub fn bool_array(marker: &str, flags: &[bool]) -> Self {
        Self::raw(marker, &escape::encode_bool_array(flags))
    }

    #[must_use]
    pub fn int_array(marker: &str, numbers: &[i64]) -> Self {
        Self::raw(marker, &escape::encode_int_array(numbers))
    }

    #[must_use]
    pub fn string_array<S: AsRef<str>>(marker: &str, items: &[S]) -> Self {
        Self::raw(marker, &escape::encode_string_array(items))
    }

    /// Unquoted and unescaped string, if the value is a quoted string.
    #[must_use]
    pub fn as_string(&self) -> Option<String> {
        validate::is_quoted_string(&self.raw).then(|| escape::unescape(&self.raw, true))
    }

    /// Signed integer in any width.
    #[must_use]
    pub fn as_sint<T: FromStr>(&self) -> Option<T> {
        if validate::is_sint(&self.raw) {
            self.raw.parse().ok()
        } else {
            None
        }
    }

    /// Unsigned integer in any width.
    #[must_use]
    pub fn as_uint<T: FromStr>(&self) -> Option<T> {
        if validate::is_uint(&self.raw) {
            self.raw.parse().ok()
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        self.as_sint()
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        if validate::is_float(&self.raw) {
            self.raw.parse().ok()
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        validate::is_bool(&self.raw).then(|| self.raw == "1")
    }

    #[must_use]
    pub fn as_bool_array(&self) -> Option<Vec<bool>> {
        validate::is_bool_array(&self.raw).then(|| escape::decode_bool_array(&self.raw))
    }

    /// An empty value reads as an empty array.
    #[must_use]
    pub fn as_int_array(&self) -> Option<Vec<i64>> {
        if !self.raw.is_empty() && !validate::is_int_array(&self.raw) {
            return None;
        }
        escape::decode_int_array(&self.raw)
    }

    #[must_use]
    pub fn as_string_array(&self) -> Option<Vec<String>> {
        escape::decode_string_array(&self.raw)
    }
}

/// Parses a complete document.
///
/// # Errors
///
/// Returns [`Error::Structural`] when a section is never closed or a section
/// name contains a NUL byte. Malformed records only degrade their section.
pub fn parse(text: &str) -> Result<Document> {
    let lines: Vec<&str> = text.lines().collect();
    let mut doc = Document::new();
    let mut cursor = 0;

    while cursor < lines.len() {
        let name = lines[cursor];
        let name_line = cursor + 1;
        cursor += 1;

        if name.bytes().all(|b| b == b' ') {
            continue;
        }
        if name.contains('\0') {
            let msg = format!(
                "Section [{}] has invalid name",
                truncate_filtered(name, SECTION_NAME_LIMIT)
            );
            return Err(Error::structural(FileFormat::Pgex, name_line, &msg, name));
        }

        let terminator = format!("{name}_END");
        let mut body = Vec::new();
        let mut closed = false;
        while cursor < lines.len() {
            let line = lines[cursor];
            cursor += 1;
            if line == terminator {
                closed = true;
                break;
            }
            body.push(line);
        }

        if !closed {
            let msg = format!(
                "Section [{}] is not closed",
                truncate_filtered(name, SECTION_NAME_LIMIT)
            );
            return Err(Error::structural(FileFormat::Pgex, name_line, &msg, name));
        }
        doc.push(build_section(name, &body));
    }

    tracing::debug!("Parsed PGE-X document with {} sections", doc.sections.len());
    Ok(doc)
}

/// Serializes a document. Equivalent to `doc.to_string()`.
#[must_use]
pub fn write(doc: &Document) -> String {
    doc.to_string()
}

fn build_section(name: &str, body: &[&str]) -> Section {
    match build_entries(body) {
        Ok(entries) => Section {
            name: name.to_string(),
            body: Body::Struct(entries),
        },
        Err(err) => {
            tracing::warn!("Section [{}] kept as plain text: {}", name, err);
            Section::plain_text(name, body)
        }
    }
}

fn build_entries(lines: &[&str]) -> std::result::Result<Vec<Entry>, RecordError> {
    let mut entries = Vec::new();
    let mut q = 0;
    while q < lines.len() {
        if lines[q].is_empty() {
            q += 1;
            continue;
        }
        let title: String = lines[q].chars().filter(|c| *c != ' ').collect();
        if !title.is_empty() && validate::is_section_title(&title) {
            // An unclosed nested section runs to the end of the enclosing body
            let terminator = format!("{title}_END");
            let rest = &lines[q + 1..];
            let len = rest
                .iter()
                .position(|line| *line == terminator)
                .unwrap_or(rest.len());
            entries.push(Entry::Section(build_section(&title, &rest[..len])));
            q += len + 2;
        } else {
            entries.push(Entry::Item(split_record(lines[q])?));
            q += 1;
        }
    }
    Ok(entries)
}

/// Splits one `marker:value;marker:value;` record.
///
/// Anything after a NUL byte is ignored, but the record as a whole must
/// still end with `;`.
///
/// # Errors
///
/// Returns a [`RecordError`] describing the first illegal character.
///
/// ```rust
/// use pge_file_formats::pgex::{split_record, RecordError};
///
/// let item = split_record(r#"ID:5;N:"a\;b";"#).unwrap();
/// assert_eq!(item.values.len(), 2);
/// assert_eq!(item.get("N").and_then(|v| v.as_string()).as_deref(), Some("a;b"));
///
/// assert_eq!(split_record("ID:5"), Err(RecordError::MissingTerminator));
/// ```
pub fn split_record(record: &str) -> std::result::Result<Item, RecordError> {
    if !record.ends_with(';') {
        return Err(RecordError::MissingTerminator);
    }
    let content = record.split('\0').next().unwrap_or_default();

    let mut item = Item::new();
    let mut marker = String::new();
    let mut value = String::new();
    let mut in_value = false;
    let mut escaped = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        let last = chars.peek().is_none();
        if !in_value {
            if last {
                return Err(RecordError::UnterminatedMarker);
            }
            match c {
                ';' | '\\' => return Err(RecordError::IllegalInMarker(c)),
                ':' => in_value = true,
                _ => marker.push(c),
            }
            continue;
        }

        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == ':' {
            return Err(RecordError::UnescapedColon);
        } else if c == ';' {
            item.push(Value {
                marker: std::mem::take(&mut marker),
                raw: std::mem::take(&mut value),
            });
            in_value = false;
            continue;
        }
        if last {
            return Err(RecordError::MissingTerminator);
        }
        value.push(c);
    }

    Ok(item)
}

fn write_section(out: &mut String, section: &Section) {
    out.push_str(&section.name);
    out.push('\n');
    match &section.body {
        Body::Struct(entries) => {
            for entry in entries {
                match entry {
                    Entry::Item(item) => write_item(out, item),
                    Entry::Section(sub) => write_section(out, sub),
                }
            }
        }
        Body::PlainText(text) => out.push_str(text),
    }
    out.push_str(&section.name);
    out.push_str("_END\n");
}

fn write_item(out: &mut String, item: &Item) {
    for value in &item.values {
        out.push_str(&value.marker);
        out.push(':');
        out.push_str(&value.raw);
        out.push(';');
    }
    out.push('\n');
}

fn join_lines<S: AsRef<str>>(lines: &[S]) -> String {
    let mut text = String::new();
    for line in lines {
        text.push_str(line.as_ref());
        text.push('\n');
    }
    text
}

/// Records of a section a document reader knows. A degraded body is an error.
pub(crate) fn records(section: &Section) -> Result<impl Iterator<Item = &Item>> {
    if section.is_plain_text() {
        return Err(Error::section_syntax(
            &section.name,
            "section content is not a list of records",
        ));
    }
    Ok(section.items())
}

/// Converts a failed typed read into a section syntax error.
pub(crate) fn typed<T>(parsed: Option<T>, section: &str, value: &Value) -> Result<T> {
    parsed.ok_or_else(|| {
        Error::section_syntax(
            section,
            format!("invalid value of marker {}: {}", value.marker, value.raw),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_value_roundtrip() {
        let text = "NAME\nA:1;\nNAME_END\n";
        let doc = parse(text).unwrap();
        assert_eq!(doc.sections.len(), 1);
        let items: Vec<&Item> = doc.sections[0].items().collect();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].values, vec![Value::raw("A", "1")]);
        assert_eq!(doc.to_string(), text);
    }

    #[test]
    fn test_unclosed_section_is_fatal() {
        let err = parse("NAME\nA:1;\n").unwrap_err();
        match err {
            Error::Structural { line, msg, .. } => {
                assert_eq!(line, 1);
                assert_eq!(msg, "Section [NAME] is not closed");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_unclosed_section_name_truncated() {
        let name = "A".repeat(30);
        let err = parse(&format!("{name}\nX:1;\n")).unwrap_err();
        assert!(err.to_string().contains(&format!("[{}...]", "A".repeat(20))));
    }

    #[test]
    fn test_nul_in_section_name() {
        let err = parse("NA\0ME\nA:1;\nNA\0ME_END\n").unwrap_err();
        assert!(err.to_string().contains("has invalid name"));
    }

    #[test]
    fn test_degraded_section_is_isolated() {
        let text = "GOOD\nA:1;B:\"x\";\nGOOD_END\nBAD\nA:1;\nB:2\nBAD_END\n";
        let doc = parse(text).unwrap();
        assert!(!doc.sections[0].is_plain_text());
        assert_eq!(doc.sections[1].plain_text_body(), Some("A:1;\nB:2\n"));
        assert_eq!(doc.to_string(), text);
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let doc = parse("\n   \nHEAD\n\nTL:\"x\";\nHEAD_END\n").unwrap();
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].items().count(), 1);
    }

    #[test]
    fn test_nested_sections() {
        let text = "OUTER\nA:1;\nINNER\nB:2;\nINNER_END\nC:3;\nOUTER_END\n";
        let doc = parse(text).unwrap();
        let outer = &doc.sections[0];
        assert_eq!(outer.items().count(), 2);
        let inner: Vec<&Section> = outer.subsections().collect();
        assert_eq!(inner[0].name, "INNER");
        assert_eq!(doc.to_string(), text);
    }

    #[test]
    fn test_unclosed_nested_section_runs_to_end_of_body() {
        let doc = parse("OUTER\nA:1;\nINNER\nB:2;\nC:3;\nOUTER_END\n").unwrap();
        let outer = &doc.sections[0];
        assert!(!outer.is_plain_text());
        assert_eq!(outer.items().count(), 1);
        let inner: Vec<&Section> = outer.subsections().collect();
        assert_eq!(inner.len(), 1);
        assert_eq!(inner[0].items().count(), 2);
    }

    #[test]
    fn test_degraded_section_keeps_blank_lines() {
        let text = "BAD\nA:1\n\nB:2;\nBAD_END\n";
        let doc = parse(text).unwrap();
        assert_eq!(doc.sections[0].plain_text_body(), Some("A:1\n\nB:2;\n"));
        assert_eq!(doc.to_string(), text);
    }

    #[test]
    fn test_record_state_machine() {
        assert_eq!(split_record(";"), Err(RecordError::UnterminatedMarker));
        assert_eq!(split_record("A;"), Err(RecordError::UnterminatedMarker));
        assert_eq!(split_record("A;B:1;"), Err(RecordError::IllegalInMarker(';')));
        assert_eq!(split_record("A\\:1;"), Err(RecordError::IllegalInMarker('\\')));
        assert_eq!(split_record("A:1:2;"), Err(RecordError::UnescapedColon));
        assert_eq!(split_record("A:1\\;"), Err(RecordError::MissingTerminator));
        assert_eq!(split_record("A:1;B"), Err(RecordError::MissingTerminator));

        let item = split_record("A:1\\:2;B:;").unwrap();
        assert_eq!(item.values[0].raw, "1\\:2");
        assert_eq!(item.values[1].raw, "");
    }

    #[test]
    fn test_record_with_nul_still_needs_terminator() {
        let item = split_record("A:1;\0junk;").unwrap();
        assert_eq!(item.values, vec![Value::raw("A", "1")]);
        assert!(split_record("A:1;\0junk").is_err());
    }

    #[test]
    fn test_typed_accessors() {
        let item = split_record(r#"S:"a\nb";I:-3;U:7;F:1.5;B:1;BA:0110;IA:[1,-2];SA:["x","y"];"#)
            .unwrap();
        assert_eq!(item.get("S").unwrap().as_string().as_deref(), Some("a\nb"));
        assert_eq!(item.get("I").unwrap().as_i64(), Some(-3));
        assert_eq!(item.get("I").unwrap().as_uint::<u32>(), None);
        assert_eq!(item.get("U").unwrap().as_uint::<u32>(), Some(7));
        assert_eq!(item.get("F").unwrap().as_f64(), Some(1.5));
        assert_eq!(item.get("B").unwrap().as_bool(), Some(true));
        assert_eq!(
            item.get("BA").unwrap().as_bool_array(),
            Some(vec![false, true, true, false])
        );
        assert_eq!(item.get("IA").unwrap().as_int_array(), Some(vec![1, -2]));
        assert_eq!(Value::raw("IA", "[4,]").as_int_array(), Some(vec![4]));
        assert_eq!(
            item.get("SA").unwrap().as_string_array(),
            Some(vec!["x".to_string(), "y".to_string()])
        );
    }

    #[test]
    fn test_builders_write_escaped_values() {
        let mut section = Section::new("HEAD");
        let mut item = Item::new();
        item.push(Value::string("TL", "a;b"));
        item.push(Value::number("SZ", 5));
        item.push(Value::bool("HB", true));
        section.push_item(item);
        let mut doc = Document::new();
        doc.push(section);
        assert_eq!(doc.to_string(), "HEAD\nTL:\"a\\;b\";SZ:5;HB:1;\nHEAD_END\n");
    }
}
