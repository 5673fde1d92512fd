//! Episode game saves.
//!
//! [`GameSave`] holds a player's progress through an episode. It can be read
//! from and written to the PGE-X (`.savx`) and SMBX64 (`.sav`) dialects. The
//! SMBX-38A dialect has no save codec and reports
//! [`Error::UnsupportedFormat`](crate::Error::UnsupportedFormat).
//!
//! ```rust
//! use pge_file_formats::save::{GameSave, VisibleItem};
//! use pge_file_formats::{FileFormat, WriteOptions};
//!
//! let mut save = GameSave::default();
//! save.coins = 42;
//! save.visible_levels.push(VisibleItem { id: 1, visible: true });
//!
//! let options = WriteOptions::new().with_format(FileFormat::Smbx64);
//! let text = pge_file_formats::write_save(&save, &options).unwrap();
//! let back = pge_file_formats::read_save(&text).unwrap();
//! assert_eq!(back.coins, 42);
//! assert_eq!(back.visible_levels, save.visible_levels);
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::options::{FileFormat, FileMeta, WriteOptions};

pub mod pgex;
pub mod smbx64;

/// User data slot that belongs to the world map.
pub const DATA_WORLD: i32 = 0;
/// User data slot that belongs to a level.
pub const DATA_LEVEL: i32 = 1;
/// User data slot shared by the whole episode.
pub const DATA_GLOBAL: i32 = 2;
/// Bits of [`UserData::location`] that hold the slot kind.
pub const DATA_LOCATION_MASK: i32 = 0xFFFF;
/// Flag of [`UserData::location`] for data that is never written to disk.
pub const DATA_VOLATILE: i32 = 0x10000;

/// Name of the user data bank unless told otherwise.
pub const DEFAULT_BANK: &str = "default";

/// State of one playable character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterState {
    pub id: u32,
    /// Power-up state
    pub state: u32,
    /// Item kept in the reserve box
    pub item: u32,
    pub mount_type: u32,
    pub mount_id: u32,
    pub health: u32,
}

impl Default for CharacterState {
    fn default() -> Self {
        CharacterState {
            id: 1,
            state: 1,
            item: 0,
            mount_type: 0,
            mount_id: 0,
            health: 1,
        }
    }
}

impl CharacterState {
    /// Default state of character `id`.
    #[must_use]
    pub fn for_character(id: u32) -> Self {
        CharacterState {
            id,
            ..Self::default()
        }
    }
}

/// Visibility of a world map element, keyed by its 1-based position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibleItem {
    pub id: u32,
    pub visible: bool,
}

/// A star collected in a level section.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StarRecord {
    pub level_file: String,
    pub section: i32,
}

/// Per-level totals of stars and medals.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelInfo {
    pub level_file: String,
    pub max_stars: u32,
    pub max_medals: u32,
    pub medals_got: Vec<bool>,
    pub medals_best: Vec<bool>,
}

/// A bank of key/value pairs stored by scripts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserData {
    /// Slot kind, optionally combined with [`DATA_VOLATILE`]
    pub location: i32,
    /// Level or world file the bank belongs to
    pub location_name: String,
    pub name: String,
    pub data: IndexMap<String, String>,
}

impl Default for UserData {
    fn default() -> Self {
        UserData {
            location: DATA_WORLD,
            location_name: String::new(),
            name: DEFAULT_BANK.to_string(),
            data: IndexMap::new(),
        }
    }
}

impl UserData {
    /// Whether the bank lives in memory only.
    #[must_use]
    pub fn is_volatile(&self) -> bool {
        self.location & DATA_VOLATILE != 0
    }
}

/// Player progress through an episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSave {
    pub lives: i32,
    pub coins: u32,
    pub points: u32,
    pub total_stars: u32,
    /// Player position on the world map
    pub world_x: i64,
    pub world_y: i64,
    /// Hub warp the player entered the episode through last
    pub last_hub_warp: u64,
    pub music_id: u32,
    pub music_file: String,
    pub game_completed: bool,
    pub characters: Vec<CharacterState>,
    /// Character id controlled by each player
    pub current_characters: Vec<u64>,
    pub visible_levels: Vec<VisibleItem>,
    pub visible_paths: Vec<VisibleItem>,
    pub visible_scenery: Vec<VisibleItem>,
    pub stars: Vec<StarRecord>,
    pub level_info: Vec<LevelInfo>,
    pub user_data: Vec<UserData>,
    pub meta: FileMeta,
}

impl Default for GameSave {
    fn default() -> Self {
        GameSave {
            lives: 3,
            coins: 0,
            points: 0,
            total_stars: 0,
            world_x: 0,
            world_y: 0,
            last_hub_warp: 0,
            music_id: 0,
            music_file: String::new(),
            game_completed: false,
            characters: vec![CharacterState::default()],
            current_characters: vec![1],
            visible_levels: Vec::new(),
            visible_paths: Vec::new(),
            visible_scenery: Vec::new(),
            stars: Vec::new(),
            level_info: Vec::new(),
            user_data: Vec::new(),
            meta: FileMeta::default(),
        }
    }
}

/// Reads a game save written in `format`.
///
/// # Errors
///
/// Returns the dialect reader's error, or [`Error::UnsupportedFormat`] for
/// SMBX-38A.
pub fn read(text: &str, format: FileFormat) -> Result<GameSave> {
    match format {
        FileFormat::Pgex => pgex::read(text),
        FileFormat::Smbx64 => smbx64::read(text),
        FileFormat::Smbx38a => Err(Error::unsupported_format(format, "game save")),
    }
}

/// Writes a game save in the dialect and version selected by `options`.
///
/// # Errors
///
/// Returns [`Error::UnsupportedFormat`] for SMBX-38A.
pub fn write(save: &GameSave, options: &WriteOptions) -> Result<String> {
    let version = options.target_version();
    tracing::debug!("Writing {} game save, version {}", options.format, version);
    match options.format {
        FileFormat::Pgex => Ok(pgex::write(save)),
        FileFormat::Smbx64 => Ok(smbx64::write(save, version)),
        FileFormat::Smbx38a => Err(Error::unsupported_format(options.format, "game save")),
    }
}
