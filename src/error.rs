//! Error types for reading and writing SMBX/PGE documents.
//!
//! Every fatal error carries enough context to find the offending record:
//! the 1-based line number, the raw line (truncated and filtered so it is
//! safe to print) and the dialect/version that was being decoded.
//!
//! ## Error Categories
//!
//! - **Structural errors**: unterminated PGE-X sections, NUL bytes in section names
//! - **Field conversion errors**: a legacy or pipe-dialect field that does not convert
//! - **Version errors**: a document version newer than the dialect supports
//! - **Section syntax errors**: a known PGE-X section whose content is unusable
//!
//! ## Examples
//!
//! ```rust
//! use pge_file_formats::{pgex, Error};
//!
//! let result = pgex::parse("NAME\nA:1;\n");
//! assert!(matches!(result, Err(Error::Structural { .. })));
//!
//! if let Err(err) = result {
//!     eprintln!("Parse error: {}", err);
//! }
//! ```

use std::fmt;
use thiserror::Error;

use crate::options::FileFormat;

/// Maximum number of characters of a raw line kept in an error message.
pub const CONTEXT_LIMIT: usize = 50;

/// Represents all possible errors that can occur while decoding or encoding a document.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum Error {
    /// The document is structurally broken and cannot be decoded at all
    #[error("{format} structural error at line {line}: {msg}\n{context}")]
    Structural {
        format: FileFormat,
        line: usize,
        msg: String,
        context: String,
    },

    /// A field could not be converted to its declared type
    #[error(
        "{format} (version {}) field conversion failed at line {line}: {msg}\n{context}",
        version_label(*.version)
    )]
    FieldConversion {
        format: FileFormat,
        /// `None` when the version record itself failed.
        version: Option<u32>,
        line: usize,
        msg: String,
        context: String,
    },

    /// The document declares a version newer than the dialect supports
    #[error("Unsupported {format} file version {version} (newest supported is {newest})")]
    UnsupportedVersion {
        format: FileFormat,
        version: u32,
        newest: u32,
    },

    /// A known PGE-X section has a value or shape the reader cannot accept
    #[error("Wrong section data syntax in [{section}]: {msg}")]
    SectionSyntax { section: String, msg: String },

    /// The requested format has no codec for this kind of document
    #[error("{format} has no {kind} format")]
    UnsupportedFormat {
        format: FileFormat,
        kind: &'static str,
    },

    /// Reading or writing the underlying stream failed
    #[error("IO error: {0}")]
    Io(String),
}

fn version_label(version: Option<u32>) -> String {
    match version {
        Some(v) => v.to_string(),
        None => "undetermined".to_string(),
    }
}

impl Error {
    /// Creates a structural error for the given line.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pge_file_formats::{Error, FileFormat};
    ///
    /// let err = Error::structural(FileFormat::Pgex, 3, "Section [HEAD] is not closed", "HEAD");
    /// assert!(err.to_string().contains("line 3"));
    /// ```
    pub fn structural(format: FileFormat, line: usize, msg: &str, raw: &str) -> Self {
        Error::Structural {
            format,
            line,
            msg: msg.to_string(),
            context: display_context(raw),
        }
    }

    /// Creates a field conversion error. `raw` is truncated and filtered for display.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pge_file_formats::{Error, FileFormat};
    ///
    /// let err = Error::field_conversion(FileFormat::Smbx64, None, 1, "invalid version", "abc");
    /// assert!(err.to_string().contains("undetermined"));
    /// ```
    pub fn field_conversion(
        format: FileFormat,
        version: Option<u32>,
        line: usize,
        msg: &str,
        raw: &str,
    ) -> Self {
        Error::FieldConversion {
            format,
            version,
            line,
            msg: msg.to_string(),
            context: display_context(raw),
        }
    }

    /// Creates a version error for a document newer than `newest`.
    pub fn unsupported_version(format: FileFormat, version: u32, newest: u32) -> Self {
        Error::UnsupportedVersion {
            format,
            version,
            newest,
        }
    }

    /// Creates an error for a known PGE-X section with unusable content.
    pub fn section_syntax<T: fmt::Display>(section: &str, msg: T) -> Self {
        Error::SectionSyntax {
            section: section.to_string(),
            msg: msg.to_string(),
        }
    }

    /// Creates an error for a document kind the format cannot express.
    pub fn unsupported_format(format: FileFormat, kind: &'static str) -> Self {
        Error::UnsupportedFormat { format, kind }
    }

    /// Creates an I/O error.
    pub fn io(msg: &str) -> Self {
        Error::Io(msg.to_string())
    }

    /// Returns the 1-based line number the error points at, if any.
    #[must_use]
    pub fn line(&self) -> Option<usize> {
        match self {
            Error::Structural { line, .. } | Error::FieldConversion { line, .. } => Some(*line),
            _ => None,
        }
    }
}

/// Cuts `raw` to [`CONTEXT_LIMIT`] characters and replaces control characters.
///
/// ```rust
/// use pge_file_formats::error::display_context;
///
/// assert_eq!(display_context("a\0b"), "a?b");
/// assert_eq!(display_context(&"x".repeat(80)).chars().count(), 53);
/// ```
#[must_use]
pub fn display_context(raw: &str) -> String {
    truncate_filtered(raw, CONTEXT_LIMIT)
}

pub(crate) fn truncate_filtered(raw: &str, limit: usize) -> String {
    let mut out: String = raw
        .chars()
        .take(limit)
        .map(|c| if c.is_control() { '?' } else { c })
        .collect();
    if raw.chars().count() > limit {
        out.push_str("...");
    }
    out
}

pub type Result<T> = std::result::Result<T, Error>;
