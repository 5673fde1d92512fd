//! # pge_file_formats
//!
//! Readers and writers for the world map, level and game save files of
//! SMBX-style platformer episodes.
//!
//! ## Dialects
//!
//! Three text dialects are supported, each identified by its first record:
//!
//! - **PGE-X** (`.wldx`, `.savx`): named sections of `marker:value;` records.
//!   Unknown sections and markers are skipped, so newer files still open.
//! - **SMBX64** (`.wld`, `.lvl`, `.sav`): one value per line, versions 0 to 64. Each
//!   field is present from a given version on.
//! - **SMBX-38A** (`.wld`): pipe-separated records after a `SMBXFile<v>`
//!   header, versions up to 69. World maps only.
//!
//! ## Quick Start
//!
//! ```rust
//! use pge_file_formats::{read_world, write_world, FileFormat, WorldData, WriteOptions};
//!
//! let mut world = WorldData::default();
//! world.title = "Mushroom Kingdom".to_string();
//! world.stars = 20;
//!
//! // Legacy world map, version 64
//! let options = WriteOptions::new().with_format(FileFormat::Smbx64);
//! let text = write_world(&world, &options).unwrap();
//! assert!(text.starts_with("64\n\"Mushroom Kingdom\"\n"));
//!
//! // The dialect is detected from the first record
//! let back = read_world(&text).unwrap();
//! assert_eq!(back.meta.format, FileFormat::Smbx64);
//! assert_eq!(back.meta.version, 64);
//! assert_eq!(back.stars, 20);
//! ```
//!
//! ### Older versions
//!
//! Fields a version does not know are dropped on write and keep their
//! defaults on read:
//!
//! ```rust
//! use pge_file_formats::{read_world, write_world, FileFormat, WorldData, WriteOptions};
//!
//! let world = WorldData { stars: 20, ..WorldData::default() };
//! let options = WriteOptions::new()
//!     .with_format(FileFormat::Smbx64)
//!     .with_version(10);
//! let back = read_world(&write_world(&world, &options).unwrap()).unwrap();
//! assert_eq!(back.stars, 0);
//! ```
//!
//! ## Building blocks
//!
//! The dialect codecs are built from public layers that also work alone:
//! [`escape`] and [`validate`] for value encodings, [`pgex`] for the section
//! tree, [`legacy`] for version-gated records and [`delimited`] for
//! pipe-separated lines.

pub mod delimited;
pub mod error;
pub mod escape;
pub mod legacy;
pub mod level;
pub mod options;
pub mod pgex;
pub mod save;
pub mod validate;
pub mod world;

pub use error::{Error, Result};
pub use options::{FileFormat, FileMeta, WriteOptions};
pub use level::LevelData;
pub use save::GameSave;
pub use world::WorldData;

use std::io;

/// Reads a world map, detecting its dialect from the first record.
///
/// # Errors
///
/// Returns an error if the document is malformed or its version is newer
/// than the dialect supports.
pub fn read_world(text: &str) -> Result<WorldData> {
    read_world_as(text, FileFormat::detect(text))
}

/// Reads a world map written in `format`.
///
/// # Examples
///
/// ```rust
/// use pge_file_formats::{read_world_as, FileFormat};
///
/// let world = read_world_as("HEAD\nTL:\"Islands\";\nHEAD_END\n", FileFormat::Pgex).unwrap();
/// assert_eq!(world.title, "Islands");
/// ```
///
/// # Errors
///
/// Returns an error if the document is malformed or its version is newer
/// than the dialect supports.
pub fn read_world_as(text: &str, format: FileFormat) -> Result<WorldData> {
    world::read(text, format)
}

/// Writes a world map in the dialect and version selected by `options`.
///
/// # Errors
///
/// Returns an error if the dialect cannot express a world map.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn write_world(world: &WorldData, options: &WriteOptions) -> Result<String> {
    world::write(world, options)
}

/// Reads a world map from an I/O stream, detecting its dialect.
///
/// # Errors
///
/// Returns an error if reading fails or the document does not decode.
pub fn read_world_from<R: io::Read>(mut reader: R) -> Result<WorldData> {
    read_world(&read_text(&mut reader)?)
}

/// Writes a world map to an I/O stream.
///
/// # Errors
///
/// Returns an error if encoding or writing fails.
pub fn write_world_to<W: io::Write>(
    mut writer: W,
    world: &WorldData,
    options: &WriteOptions,
) -> Result<()> {
    let text = write_world(world, options)?;
    writer
        .write_all(text.as_bytes())
        .map_err(|e| Error::io(&e.to_string()))
}

/// Reads a level, detecting its dialect from the first record.
///
/// # Errors
///
/// Returns an error if the document is malformed, or if it is not an
/// SMBX64 document.
pub fn read_level(text: &str) -> Result<LevelData> {
    read_level_as(text, FileFormat::detect(text))
}

/// Reads a level written in `format`.
///
/// # Errors
///
/// Returns an error if the document is malformed, or if `format` has no
/// level codec.
pub fn read_level_as(text: &str, format: FileFormat) -> Result<LevelData> {
    level::read(text, format)
}

/// Writes a level in the dialect and version selected by `options`.
///
/// # Errors
///
/// Returns an error if `options` selects a dialect without a level codec.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn write_level(level: &LevelData, options: &WriteOptions) -> Result<String> {
    level::write(level, options)
}

/// Reads a game save, detecting its dialect from the first record.
///
/// # Errors
///
/// Returns an error if the document is malformed, or if it is an SMBX-38A
/// document.
pub fn read_save(text: &str) -> Result<GameSave> {
    read_save_as(text, FileFormat::detect(text))
}

/// Reads a game save written in `format`.
///
/// # Errors
///
/// Returns an error if the document is malformed, or if `format` has no
/// save codec.
pub fn read_save_as(text: &str, format: FileFormat) -> Result<GameSave> {
    save::read(text, format)
}

/// Writes a game save in the dialect and version selected by `options`.
///
/// # Examples
///
/// ```rust
/// use pge_file_formats::{write_save, FileFormat, GameSave, WriteOptions};
///
/// let options = WriteOptions::new().with_format(FileFormat::Smbx38a);
/// assert!(write_save(&GameSave::default(), &options).is_err());
/// ```
///
/// # Errors
///
/// Returns an error if `options` selects a dialect without a save codec.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn write_save(save: &GameSave, options: &WriteOptions) -> Result<String> {
    save::write(save, options)
}

/// Reads a game save from an I/O stream, detecting its dialect.
///
/// # Errors
///
/// Returns an error if reading fails or the document does not decode.
pub fn read_save_from<R: io::Read>(mut reader: R) -> Result<GameSave> {
    read_save(&read_text(&mut reader)?)
}

/// Writes a game save to an I/O stream.
///
/// # Errors
///
/// Returns an error if encoding or writing fails.
pub fn write_save_to<W: io::Write>(
    mut writer: W,
    save: &GameSave,
    options: &WriteOptions,
) -> Result<()> {
    let text = write_save(save, options)?;
    writer
        .write_all(text.as_bytes())
        .map_err(|e| Error::io(&e.to_string()))
}

fn read_text<R: io::Read>(reader: &mut R) -> Result<String> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|e| Error::io(&e.to_string()))?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_world_through_streams() {
        let world = WorldData {
            title: "Streamed".to_string(),
            ..WorldData::default()
        };
        let mut buffer = Vec::new();
        write_world_to(&mut buffer, &world, &WriteOptions::new()).unwrap();
        let back = read_world_from(Cursor::new(buffer)).unwrap();
        assert_eq!(back.title, "Streamed");
        assert_eq!(back.meta.format, FileFormat::Pgex);
    }

    #[test]
    fn test_save_through_streams() {
        let save = GameSave {
            coins: 99,
            ..GameSave::default()
        };
        let options = WriteOptions::new().with_format(FileFormat::Smbx64);
        let mut buffer = Vec::new();
        write_save_to(&mut buffer, &save, &options).unwrap();
        let back = read_save_from(buffer.as_slice()).unwrap();
        assert_eq!(back.coins, 99);
        assert_eq!(back.meta.version, 64);
    }

    #[test]
    fn test_level_detection() {
        let options = WriteOptions::new().with_format(FileFormat::Smbx64);
        let text = write_level(&LevelData::default(), &options).unwrap();
        assert_eq!(read_level(&text).unwrap().meta.version, 64);
        assert!(write_level(&LevelData::default(), &WriteOptions::new()).is_err());
    }

    #[test]
    fn test_invalid_utf8_is_an_io_error() {
        let bytes: &[u8] = &[0xff, 0xfe, 0x00];
        assert!(matches!(read_world_from(bytes), Err(Error::Io(_))));
    }

    #[test]
    fn test_detected_38a_save_is_rejected() {
        let err = read_save("SMBXFile66\nWS1|x\n").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { .. }));
    }
}
