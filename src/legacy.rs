//! The versioned sequential codec behind the SMBX64 dialect.
//!
//! A legacy document is a flat sequence of records. The first record is the
//! format version; every following record is one field whose meaning
//! depends only on its position and on that version. Records end at a
//! newline or at a comma outside double quotes, the quotes themselves are
//! dropped and so is every `\r`:
//!
//! ```text
//! 64
//! "My episode"
//! #FALSE#
//! 32,64,1
//! "next"
//! ```
//!
//! Field lists are plain data: a slice of [`Field`]s pairing the first
//! version that carries the field with a [`Binding`] to the storage it reads
//! into or writes from. The same list drives [`LegacyReader::read_fields`]
//! and [`LegacyWriter::write_fields`], so both directions always agree on
//! order and gating.
//!
//! ## Examples
//!
//! ```rust
//! use pge_file_formats::legacy::{Binding, Field, LegacyReader, LegacyWriter};
//!
//! let mut title = String::new();
//! let mut stars = 0u32;
//!
//! let mut reader = LegacyReader::new("20\n\"Quest\"\n7\n");
//! reader.read_version().unwrap();
//! reader
//!     .read_fields(&mut [
//!         Field::always(Binding::Str(&mut title)),
//!         Field::since(20, Binding::UInt(&mut stars)),
//!     ])
//!     .unwrap();
//! assert_eq!((title.as_str(), stars), ("Quest", 7));
//!
//! let mut writer = LegacyWriter::new(19);
//! writer.write_fields(&[
//!     Field::always(Binding::Str(&mut title)),
//!     Field::since(20, Binding::UInt(&mut stars)),
//! ]);
//! assert_eq!(writer.finish(), "19\n\"Quest\"\n");
//! ```

use crate::error::{Error, Result};
use crate::options::{FileFormat, SMBX64_NEWEST};
use crate::validate::smbx64 as check;

/// Literal record closing a repeating group.
pub const SENTINEL: &str = "next";

/// Storage a legacy field converts into (and renders from).
#[derive(Debug)]
pub enum Binding<'a> {
    /// Unsigned integer
    UInt(&'a mut u32),
    /// Signed integer
    SInt(&'a mut i32),
    /// Wide signed integer
    Long(&'a mut i64),
    /// Position stored as a float in old files, rounded to the nearest integer
    Coord(&'a mut i64),
    Float(&'a mut f64),
    /// `#TRUE#`/`#FALSE#`, read leniently
    Bool(&'a mut bool),
    /// Single-line string
    Str(&'a mut String),
    /// Multi-line string; only tabs are removed on write
    Text(&'a mut String),
}

/// One version-gated field of a legacy record sequence.
#[derive(Debug)]
pub struct Field<'a> {
    /// First version that carries the field
    pub since: u32,
    pub binding: Binding<'a>,
}

impl<'a> Field<'a> {
    /// A field present in every version.
    #[must_use]
    pub fn always(binding: Binding<'a>) -> Self {
        Self::since(0, binding)
    }

    /// A field present from `version` onwards.
    #[must_use]
    pub fn since(version: u32, binding: Binding<'a>) -> Self {
        Field {
            since: version,
            binding,
        }
    }

    /// Whether the field exists in a document of `version`.
    #[must_use]
    pub fn present_in(&self, version: u32) -> bool {
        version >= self.since
    }
}

/// How a repeating group may end besides its `"next"` sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Group {
    /// End of input closes the group in documents older than this version.
    pub eof_below: u32,
    /// An empty record also closes the group.
    pub blank_ends: bool,
}

impl Group {
    /// Ends at the sentinel; end of input is tolerated in every version.
    pub const LENIENT: Group = Group {
        eof_below: u32::MAX,
        blank_ends: false,
    };

    /// Ends at the sentinel, an empty record or the end of input.
    pub const OPEN_ENDED: Group = Group {
        eof_below: u32::MAX,
        blank_ends: true,
    };

    /// Requires the sentinel from `version` onwards.
    #[must_use]
    pub const fn strict_since(version: u32) -> Group {
        Group {
            eof_below: version,
            blank_ends: false,
        }
    }
}

/// Why a group loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupEnd {
    Sentinel,
    Blank,
    EndOfInput,
}

/// Record cursor over a legacy document.
///
/// The version is read once by [`read_version`](Self::read_version) and
/// then stays fixed for the rest of the document.
#[derive(Debug)]
pub struct LegacyReader<'a> {
    input: &'a str,
    position: usize,
    line: usize,
    record_line: usize,
    record: String,
    pending: bool,
    version: Option<u32>,
}

impl<'a> LegacyReader<'a> {
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        LegacyReader {
            input,
            position: 0,
            line: 1,
            record_line: 1,
            record: String::new(),
            pending: false,
            version: None,
        }
    }

    /// The document version, or 0 before it has been read.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version.unwrap_or(0)
    }

    /// 1-based line on which the current record starts.
    #[must_use]
    pub fn line(&self) -> usize {
        self.record_line
    }

    /// The current record with quotes and `\r` removed.
    #[must_use]
    pub fn record(&self) -> &str {
        &self.record
    }

    #[must_use]
    pub fn at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Reads the next record and marks it as not yet consumed.
    ///
    /// Returns `None` once the input is exhausted.
    pub fn advance(&mut self) -> Option<&str> {
        if self.at_end() {
            self.pending = false;
            return None;
        }

        self.record.clear();
        self.record_line = self.line;
        let input = self.input;
        let mut quoted = false;
        for c in input[self.position..].chars() {
            self.position += c.len_utf8();
            match c {
                '"' => quoted = !quoted,
                '\r' => {}
                '\n' => {
                    self.line += 1;
                    if !quoted {
                        break;
                    }
                    self.record.push(c);
                }
                ',' if !quoted => break,
                _ => self.record.push(c),
            }
        }
        self.pending = true;
        Some(&self.record)
    }

    /// Makes the next field read consume a fresh record.
    fn take_record(&mut self) -> Result<()> {
        if self.pending {
            self.pending = false;
            return Ok(());
        }
        if self.advance().is_none() {
            return Err(self.error("Unexpected end of file"));
        }
        self.pending = false;
        Ok(())
    }

    /// Reads the first record as the document version.
    ///
    /// # Errors
    ///
    /// A record that is not an unsigned integer fails with an undetermined
    /// version; a version above 64 fails with [`Error::UnsupportedVersion`].
    pub fn read_version(&mut self) -> Result<u32> {
        self.take_record()?;
        let version = if check::is_uint(&self.record) {
            self.record.parse::<u32>().ok()
        } else {
            None
        };
        let Some(version) = version else {
            return Err(self.error("Invalid file format version"));
        };
        if version > SMBX64_NEWEST {
            return Err(Error::unsupported_version(
                FileFormat::Smbx64,
                version,
                SMBX64_NEWEST,
            ));
        }
        tracing::debug!("Reading SMBX64 document version {}", version);
        self.version = Some(version);
        Ok(version)
    }

    /// Reads one record into `binding`.
    ///
    /// # Errors
    ///
    /// Fails when the input ends or the record does not convert.
    pub fn read(&mut self, binding: &mut Binding<'_>) -> Result<()> {
        self.take_record()?;
        let raw = self.record.as_str();
        let converted = match binding {
            Binding::UInt(dst) => parse_checked(raw, check::is_uint).map(|v| **dst = v),
            Binding::SInt(dst) => parse_checked(raw, check::is_sint).map(|v| **dst = v),
            Binding::Long(dst) => parse_checked(raw, check::is_sint).map(|v| **dst = v),
            Binding::Coord(dst) => read_float(raw).map(|v| **dst = v.round() as i64),
            Binding::Float(dst) => read_float(raw).map(|v| **dst = v),
            Binding::Bool(dst) => read_bool(raw).map(|v| **dst = v),
            Binding::Str(dst) | Binding::Text(dst) => {
                **dst = raw.to_string();
                Some(())
            }
        };
        converted.ok_or_else(|| self.error(&format!("Could not convert to {}", kind(binding))))
    }

    /// Reads every field present in the document version, in order.
    ///
    /// # Errors
    ///
    /// Stops at the first field that fails to read.
    pub fn read_fields(&mut self, fields: &mut [Field<'_>]) -> Result<()> {
        let version = self.version();
        for field in fields.iter_mut().filter(|f| f.present_in(version)) {
            self.read(&mut field.binding)?;
        }
        Ok(())
    }

    /// Runs `element` once per group entry until the group ends.
    ///
    /// The element's first read consumes the record that was checked
    /// against the sentinel. A record left unconsumed by
    /// [`advance`](Self::advance) is the first one checked.
    ///
    /// # Errors
    ///
    /// Fails when `element` fails, or when the input ends before the
    /// sentinel in a version that requires it.
    pub fn read_group<F>(&mut self, group: Group, mut element: F) -> Result<GroupEnd>
    where
        F: FnMut(&mut Self) -> Result<()>,
    {
        loop {
            let has_record = self.pending || self.advance().is_some();
            if !has_record {
                if self.version() < group.eof_below {
                    tracing::trace!("Group closed by end of input at line {}", self.line);
                    return Ok(GroupEnd::EndOfInput);
                }
                return Err(self.error("Unexpected end of file, expected \"next\""));
            }
            if self.record == SENTINEL {
                self.pending = false;
                return Ok(GroupEnd::Sentinel);
            }
            if self.record.is_empty() && group.blank_ends {
                self.pending = false;
                return Ok(GroupEnd::Blank);
            }
            element(self)?;
        }
    }

    fn error(&self, msg: &str) -> Error {
        Error::field_conversion(
            FileFormat::Smbx64,
            self.version,
            self.record_line,
            msg,
            &self.record,
        )
    }
}

fn parse_checked<T: std::str::FromStr>(raw: &str, valid: fn(&str) -> bool) -> Option<T> {
    if valid(raw) {
        raw.parse().ok()
    } else {
        None
    }
}

fn read_float(raw: &str) -> Option<f64> {
    if !check::is_float(raw) {
        return None;
    }
    if raw.is_empty() {
        return Some(0.0);
    }
    raw.replace(',', ".").parse().ok()
}

fn read_bool(raw: &str) -> Option<bool> {
    match raw {
        "#TRUE#" => Some(true),
        "#FALSE#" => Some(false),
        "1" | "!0" | "true" => {
            tracing::trace!("Lenient boolean {:?} read as true", raw);
            Some(true)
        }
        "0" | "" | "false" => {
            tracing::trace!("Lenient boolean {:?} read as false", raw);
            Some(false)
        }
        _ => None,
    }
}

fn kind(binding: &Binding<'_>) -> &'static str {
    match binding {
        Binding::UInt(_) => "unsigned integer",
        Binding::SInt(_) | Binding::Long(_) => "signed integer",
        Binding::Coord(_) => "integer from float",
        Binding::Float(_) => "float",
        Binding::Bool(_) => "CSV bool (must be #TRUE# or #FALSE#)",
        Binding::Str(_) | Binding::Text(_) => "string",
    }
}

/// Accumulates a legacy document.
#[derive(Debug)]
pub struct LegacyWriter {
    out: String,
    version: u32,
}

impl LegacyWriter {
    /// Starts a document and writes its version record. Versions above 64 are clamped.
    #[must_use]
    pub fn new(version: u32) -> Self {
        let version = version.min(SMBX64_NEWEST);
        let mut writer = LegacyWriter {
            out: String::new(),
            version,
        };
        writer.write_uint(u64::from(version));
        writer
    }

    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn write_uint(&mut self, value: u64) {
        self.out.push_str(&value.to_string());
        self.out.push('\n');
    }

    pub fn write_sint(&mut self, value: i64) {
        self.out.push_str(&value.to_string());
        self.out.push('\n');
    }

    pub fn write_float(&mut self, value: f64) {
        self.out.push_str(&value.to_string());
        self.out.push('\n');
    }

    pub fn write_bool(&mut self, value: bool) {
        self.out.push_str(if value { "#TRUE#\n" } else { "#FALSE#\n" });
    }

    /// Writes a quoted single-line string. Newlines, tabs and quotes are dropped.
    pub fn write_str(&mut self, value: &str) {
        self.out.push('"');
        self.out
            .extend(value.chars().filter(|c| !matches!(c, '\n' | '\r' | '\t' | '"')));
        self.out.push_str("\"\n");
    }

    /// Writes a quoted multi-line string. Tabs are dropped, quotes become apostrophes.
    pub fn write_text(&mut self, value: &str) {
        self.out.push('"');
        for c in value.chars() {
            match c {
                '\t' => {}
                '"' => self.out.push('\''),
                _ => self.out.push(c),
            }
        }
        self.out.push_str("\"\n");
    }

    /// Closes a repeating group.
    pub fn write_sentinel(&mut self) {
        self.out.push('"');
        self.out.push_str(SENTINEL);
        self.out.push_str("\"\n");
    }

    pub fn write(&mut self, binding: &Binding<'_>) {
        match binding {
            Binding::UInt(v) => self.write_uint(u64::from(**v)),
            Binding::SInt(v) => self.write_sint(i64::from(**v)),
            Binding::Long(v) | Binding::Coord(v) => self.write_sint(**v),
            Binding::Float(v) => self.write_float(**v),
            Binding::Bool(v) => self.write_bool(**v),
            Binding::Str(v) => self.write_str(v),
            Binding::Text(v) => self.write_text(v),
        }
    }

    /// Writes every field present in the target version, in order.
    pub fn write_fields(&mut self, fields: &[Field<'_>]) {
        let version = self.version;
        for field in fields.iter().filter(|f| f.present_in(version)) {
            self.write(&field.binding);
        }
    }

    #[must_use]
    pub fn finish(self) -> String {
        self.out
    }
}
