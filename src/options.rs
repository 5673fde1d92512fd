//! Configuration options for writing documents.
//!
//! This module provides the types that select an output dialect:
//!
//! - [`WriteOptions`]: Main configuration struct
//! - [`FileFormat`]: The three text dialects (PGE-X, SMBX64, SMBX-38A)
//!
//! ## Examples
//!
//! ```rust
//! use pge_file_formats::{write_world, FileFormat, WorldData, WriteOptions};
//!
//! let world = WorldData::default();
//!
//! // Legacy format, version 64
//! let options = WriteOptions::new().with_format(FileFormat::Smbx64);
//! let text = write_world(&world, &options).unwrap();
//! assert!(text.starts_with("64\n"));
//!
//! // Legacy format pinned to an old version
//! let options = WriteOptions::new()
//!     .with_format(FileFormat::Smbx64)
//!     .with_version(20);
//! let text = write_world(&world, &options).unwrap();
//! assert!(text.starts_with("20\n"));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Newest SMBX64 version.
pub const SMBX64_NEWEST: u32 = 64;
/// Newest SMBX-38A file version.
pub const SMBX38A_NEWEST: u32 = 69;

/// Text dialect of a document.
///
/// # Examples
///
/// ```rust
/// use pge_file_formats::FileFormat;
///
/// assert_eq!(FileFormat::detect("64\n\"My episode\"\n"), FileFormat::Smbx64);
/// assert_eq!(FileFormat::detect("SMBXFile67\n"), FileFormat::Smbx38a);
/// assert_eq!(FileFormat::detect("HEAD\nTL:\"x\";\nHEAD_END\n"), FileFormat::Pgex);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FileFormat {
    /// Extensible section/marker dialect
    #[default]
    Pgex,
    /// Legacy positional dialect, versions 0-64
    Smbx64,
    /// Pipe-delimited dialect of the 38A engine fork
    Smbx38a,
}

impl FileFormat {
    /// Human-readable dialect name used in messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            FileFormat::Pgex => "PGE-X",
            FileFormat::Smbx64 => "SMBX64",
            FileFormat::Smbx38a => "SMBX-38A",
        }
    }

    /// Newest version number the dialect can encode.
    #[must_use]
    pub const fn newest_version(&self) -> u32 {
        match self {
            FileFormat::Pgex => 0,
            FileFormat::Smbx64 => SMBX64_NEWEST,
            FileFormat::Smbx38a => SMBX38A_NEWEST,
        }
    }

    /// Guesses the dialect from the first non-blank record of `text`.
    #[must_use]
    pub fn detect(text: &str) -> FileFormat {
        let first = text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default();
        let format = if first.starts_with("SMBXFile") {
            FileFormat::Smbx38a
        } else if !first.is_empty() && first.bytes().all(|b| b.is_ascii_digit()) {
            FileFormat::Smbx64
        } else {
            FileFormat::Pgex
        };
        tracing::debug!("Detected {} document", format);
        format
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Configuration options for writing documents.
///
/// # Examples
///
/// ```rust
/// use pge_file_formats::{FileFormat, WriteOptions};
///
/// let options = WriteOptions::new();
/// assert_eq!(options.format, FileFormat::Pgex);
///
/// let options = WriteOptions::new()
///     .with_format(FileFormat::Smbx64)
///     .with_version(100);
/// assert_eq!(options.target_version(), 64);
/// ```
#[derive(Clone, Debug, PartialEq, Default)]
pub struct WriteOptions {
    pub format: FileFormat,
    /// Target version; `None` writes the newest version of the dialect.
    pub version: Option<u32>,
}

impl WriteOptions {
    /// Creates default options (PGE-X output).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the output dialect.
    #[must_use]
    pub fn with_format(mut self, format: FileFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the target version. Out of range values are clamped on write.
    #[must_use]
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    /// The version that will actually be written.
    #[must_use]
    pub fn target_version(&self) -> u32 {
        let newest = self.format.newest_version();
        self.version.map_or(newest, |v| v.min(newest))
    }
}

/// Dialect and version a document was last read from or written to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileMeta {
    pub format: FileFormat,
    pub version: u32,
}

impl FileMeta {
    #[must_use]
    pub fn new(format: FileFormat, version: u32) -> Self {
        FileMeta { format, version }
    }
}
