//! Level documents.
//!
//! [`LevelData`] is the in-memory form of a single level: its sections,
//! start points, placed elements and the events that script them. Levels
//! are read from and written to the SMBX64 dialect (`.lvl`). PGE-X and
//! SMBX-38A levels report [`Error::UnsupportedFormat`](crate::Error::UnsupportedFormat).
//!
//! ```rust
//! use pge_file_formats::level::{Block, LevelData};
//! use pge_file_formats::{FileFormat, WriteOptions};
//!
//! let mut level = LevelData::default();
//! level.title = "Underground".to_string();
//! level.blocks.push(Block { id: 1, x: 32, y: 64, npc_id: 9, ..Block::default() });
//!
//! let options = WriteOptions::new().with_format(FileFormat::Smbx64);
//! let text = pge_file_formats::write_level(&level, &options).unwrap();
//! let back = pge_file_formats::read_level(&text).unwrap();
//! assert_eq!(back.title, "Underground");
//! assert_eq!(back.blocks[0].npc_id, 9);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::options::{FileFormat, FileMeta, WriteOptions};

pub mod smbx64;

/// Sections every level has.
pub const SECTION_COUNT: usize = 21;

pub const DEFAULT_LAYER: &str = "Default";

/// Background color of a fresh section, `0xF89868`.
pub const DEFAULT_SECTION_COLOR: u32 = 16_291_944;

fn default_layer() -> String {
    DEFAULT_LAYER.to_string()
}

/// One of the scrollable areas of a level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelSection {
    pub id: usize,
    pub size_left: i64,
    pub size_top: i64,
    pub size_bottom: i64,
    pub size_right: i64,
    pub music_id: u32,
    pub bg_color: u32,
    /// Leaving one side enters from the other
    pub wrap_h: bool,
    pub off_screen_exit: bool,
    pub background: u32,
    pub lock_left_scroll: bool,
    pub underwater: bool,
    pub music_file: String,
}

impl Default for LevelSection {
    fn default() -> Self {
        LevelSection {
            id: 0,
            size_left: 0,
            size_top: 0,
            size_bottom: 0,
            size_right: 0,
            music_id: 0,
            bg_color: DEFAULT_SECTION_COLOR,
            wrap_h: false,
            off_screen_exit: false,
            background: 0,
            lock_left_scroll: false,
            underwater: false,
            music_file: String::new(),
        }
    }
}

impl LevelSection {
    #[must_use]
    pub fn with_id(id: usize) -> Self {
        LevelSection {
            id,
            ..LevelSection::default()
        }
    }
}

/// Start position of a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerPoint {
    /// 1 or 2
    pub id: u32,
    pub x: i64,
    pub y: i64,
    pub w: u32,
    pub h: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Block {
    pub id: u32,
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
    /// Contents: a positive NPC id, or a negated coin count
    pub npc_id: i64,
    pub invisible: bool,
    pub slippery: bool,
    pub layer: String,
    pub event_destroy: String,
    pub event_hit: String,
    pub event_empty_layer: String,
}

impl Default for Block {
    fn default() -> Self {
        Block {
            id: 0,
            x: 0,
            y: 0,
            w: 32,
            h: 32,
            npc_id: 0,
            invisible: false,
            slippery: false,
            layer: default_layer(),
            event_destroy: String::new(),
            event_hit: String::new(),
            event_empty_layer: String::new(),
        }
    }
}

/// Background object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bgo {
    pub id: u32,
    pub x: i64,
    pub y: i64,
    pub layer: String,
    /// Drawn in front of the players
    pub foreground: bool,
}

impl Default for Bgo {
    fn default() -> Self {
        Bgo {
            id: 0,
            x: 0,
            y: 0,
            layer: default_layer(),
            foreground: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Npc {
    pub id: u32,
    pub x: i64,
    pub y: i64,
    /// -1 left, 0 random, 1 right
    pub direction: i32,
    /// Per-type setting such as a flight pattern or target section
    pub special_data: i64,
    /// NPC id held by a container
    pub contents: i64,
    pub generator: bool,
    /// 1 up, 2 left, 3 down, 4 right
    pub generator_direction: i32,
    /// 1 warp, 2 projectile
    pub generator_type: u32,
    /// Spawn period in tenths of a second
    pub generator_period: u32,
    pub message: String,
    pub friendly: bool,
    pub no_move: bool,
    pub is_boss: bool,
    pub layer: String,
    pub event_activate: String,
    pub event_die: String,
    pub event_talk: String,
    pub event_empty_layer: String,
    pub attach_layer: String,
}

impl Default for Npc {
    fn default() -> Self {
        Npc {
            id: 0,
            x: 0,
            y: 0,
            direction: 0,
            special_data: 0,
            contents: 0,
            generator: false,
            generator_direction: 1,
            generator_type: 1,
            generator_period: 20,
            message: String::new(),
            friendly: false,
            no_move: false,
            is_boss: false,
            layer: default_layer(),
            event_activate: String::new(),
            event_die: String::new(),
            event_talk: String::new(),
            event_empty_layer: String::new(),
            attach_layer: String::new(),
        }
    }
}

/// A door, pipe or instant warp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Warp {
    pub entrance_x: i64,
    pub entrance_y: i64,
    pub exit_x: i64,
    pub exit_y: i64,
    pub entrance_direction: u32,
    pub exit_direction: u32,
    /// 0 instant, 1 pipe, 2 door
    pub kind: u32,
    /// Level file the warp leads to
    pub level_file: String,
    pub warp_to: u32,
    /// Entrance from another level; the warp has no entrance point here
    pub level_entrance: bool,
    /// Exit to the world map; the warp has no exit point here
    pub level_exit: bool,
    pub world_x: i64,
    pub world_y: i64,
    pub stars: u32,
    pub layer: String,
    pub unknown: bool,
    pub no_vehicles: bool,
    pub allow_npc: bool,
    pub locked: bool,
    /// The entrance point has been placed
    pub is_set_in: bool,
    /// The exit point has been placed
    pub is_set_out: bool,
}

impl Default for Warp {
    fn default() -> Self {
        Warp {
            entrance_x: 0,
            entrance_y: 0,
            exit_x: 0,
            exit_y: 0,
            entrance_direction: 3,
            exit_direction: 1,
            kind: 0,
            level_file: String::new(),
            warp_to: 0,
            level_entrance: false,
            level_exit: false,
            world_x: -1,
            world_y: -1,
            stars: 0,
            layer: default_layer(),
            unknown: false,
            no_vehicles: false,
            allow_npc: false,
            locked: false,
            is_set_in: true,
            is_set_out: true,
        }
    }
}

impl Warp {
    /// Warps missing a point they need are not saved.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        if !self.level_entrance && !self.is_set_in {
            return false;
        }
        if (self.level_entrance || !self.level_exit) && !self.is_set_out {
            return false;
        }
        true
    }
}

/// A water or quicksand area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysEnv {
    pub x: i64,
    pub y: i64,
    pub w: u32,
    pub h: u32,
    pub unknown: u32,
    pub quicksand: bool,
    pub layer: String,
}

impl Default for PhysEnv {
    fn default() -> Self {
        PhysEnv {
            x: 0,
            y: 0,
            w: 32,
            h: 32,
            unknown: 0,
            quicksand: false,
            layer: default_layer(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelLayer {
    pub name: String,
    pub hidden: bool,
}

/// Section changes applied by an event. -1 leaves a value as it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionSettings {
    pub music_id: i64,
    pub background_id: i64,
    pub position_left: i64,
    pub position_top: i64,
    pub position_bottom: i64,
    pub position_right: i64,
}

impl Default for SectionSettings {
    fn default() -> Self {
        SectionSettings {
            music_id: -1,
            background_id: -1,
            position_left: -1,
            position_top: 0,
            position_bottom: 0,
            position_right: 0,
        }
    }
}

/// Keys an event holds down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HeldKeys {
    pub alt_jump: bool,
    pub alt_run: bool,
    pub down: bool,
    pub drop: bool,
    pub jump: bool,
    pub left: bool,
    pub right: bool,
    pub run: bool,
    pub start: bool,
    pub up: bool,
}

impl HeldKeys {
    #[must_use]
    pub fn any(&self) -> bool {
        [
            self.alt_jump,
            self.alt_run,
            self.down,
            self.drop,
            self.jump,
            self.left,
            self.right,
            self.run,
            self.start,
            self.up,
        ]
        .contains(&true)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelEvent {
    pub name: String,
    pub message: String,
    pub sound_id: u32,
    pub end_game: u32,
    pub layers_hide: Vec<String>,
    pub layers_show: Vec<String>,
    pub layers_toggle: Vec<String>,
    /// One entry per section
    pub sets: Vec<SectionSettings>,
    pub trigger: String,
    /// Delay before the trigger, in tenths of a second
    pub trigger_timer: u32,
    pub no_smoke: bool,
    pub held_keys: HeldKeys,
    pub autostart: bool,
    pub move_layer: String,
    pub layer_speed_x: f64,
    pub layer_speed_y: f64,
    pub move_camera_x: f64,
    pub move_camera_y: f64,
    pub scroll_section: i64,
}

impl LevelEvent {
    #[must_use]
    pub fn named(name: &str) -> Self {
        LevelEvent {
            name: name.to_string(),
            ..LevelEvent::default()
        }
    }
}

/// A single level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelData {
    pub title: String,
    pub stars: u32,
    pub sections: Vec<LevelSection>,
    pub players: Vec<PlayerPoint>,
    pub blocks: Vec<Block>,
    pub bgo: Vec<Bgo>,
    pub npcs: Vec<Npc>,
    pub warps: Vec<Warp>,
    pub phys_envs: Vec<PhysEnv>,
    pub layers: Vec<LevelLayer>,
    pub events: Vec<LevelEvent>,
    pub meta: FileMeta,
}

impl Default for LevelData {
    fn default() -> Self {
        LevelData {
            title: String::new(),
            stars: 0,
            sections: (0..SECTION_COUNT).map(LevelSection::with_id).collect(),
            players: Vec::new(),
            blocks: Vec::new(),
            bgo: Vec::new(),
            npcs: Vec::new(),
            warps: Vec::new(),
            phys_envs: Vec::new(),
            layers: Vec::new(),
            events: Vec::new(),
            meta: FileMeta::default(),
        }
    }
}

impl LevelData {
    /// Appends the layers and events the game expects in every level, unless present.
    pub fn add_internal_entries(&mut self) {
        for (name, hidden) in [
            (DEFAULT_LAYER, false),
            ("Destroyed Blocks", true),
            ("Spawned NPCs", false),
        ] {
            if !self.layers.iter().any(|layer| layer.name == name) {
                self.layers.push(LevelLayer {
                    name: name.to_string(),
                    hidden,
                });
            }
        }
        for name in ["Level - Start", "P Switch - Start", "P Switch - End"] {
            if !self.events.iter().any(|event| event.name == name) {
                self.events.push(LevelEvent::named(name));
            }
        }
    }
}

/// Reads a level in the given dialect.
///
/// # Errors
///
/// Returns the dialect reader's error, or [`Error::UnsupportedFormat`] for
/// PGE-X and SMBX-38A.
pub fn read(text: &str, format: FileFormat) -> Result<LevelData> {
    match format {
        FileFormat::Smbx64 => smbx64::read(text),
        FileFormat::Pgex | FileFormat::Smbx38a => Err(Error::unsupported_format(format, "level")),
    }
}

/// Writes a level in the dialect and version selected by `options`.
///
/// # Errors
///
/// Returns [`Error::UnsupportedFormat`] for PGE-X and SMBX-38A.
pub fn write(level: &LevelData, options: &WriteOptions) -> Result<String> {
    let version = options.target_version();
    tracing::debug!("Writing {} level, version {}", options.format, version);
    match options.format {
        FileFormat::Smbx64 => Ok(smbx64::write(level, version)),
        FileFormat::Pgex | FileFormat::Smbx38a => {
            Err(Error::unsupported_format(options.format, "level"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_entries_are_added_once() {
        let mut level = LevelData::default();
        level.layers.push(LevelLayer {
            name: "Spawned NPCs".to_string(),
            hidden: true,
        });
        level.add_internal_entries();
        level.add_internal_entries();
        let names: Vec<&str> = level.layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Spawned NPCs", "Default", "Destroyed Blocks"]);
        assert!(level.layers[2].hidden);
        assert_eq!(level.events.len(), 3);
        assert_eq!(level.events[0].name, "Level - Start");
    }

    #[test]
    fn test_incomplete_warps() {
        let warp = Warp {
            is_set_in: false,
            ..Warp::default()
        };
        assert!(!warp.is_complete());
        let entrance = Warp {
            level_entrance: true,
            is_set_in: false,
            ..Warp::default()
        };
        assert!(entrance.is_complete());
        let exit = Warp {
            level_exit: true,
            is_set_out: false,
            ..Warp::default()
        };
        assert!(exit.is_complete());
    }

    #[test]
    fn test_only_legacy_levels_have_a_codec() {
        let err = read("HEAD\nHEAD_END\n", FileFormat::Pgex).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { kind: "level", .. }));
        let options = WriteOptions::new().with_format(FileFormat::Smbx38a);
        assert!(write(&LevelData::default(), &options).is_err());
    }

    #[test]
    fn test_held_keys() {
        assert!(!HeldKeys::default().any());
        let keys = HeldKeys {
            run: true,
            ..HeldKeys::default()
        };
        assert!(keys.any());
    }
}
