//! World map documents.
//!
//! [`WorldData`] is the in-memory form of an episode's world map. It can be
//! read from and written to all three dialects; fields a dialect cannot
//! express keep their defaults when read from it and are dropped when
//! written to it.
//!
//! ```rust
//! use pge_file_formats::world::{MapTile, WorldData};
//! use pge_file_formats::{FileFormat, WriteOptions};
//!
//! let mut world = WorldData::default();
//! world.title = "Grass land".to_string();
//! world.tiles.push(MapTile { id: 3, x: 64, y: 32, ..MapTile::default() });
//!
//! for format in [FileFormat::Pgex, FileFormat::Smbx64, FileFormat::Smbx38a] {
//!     let options = WriteOptions::new().with_format(format);
//!     let text = pge_file_formats::write_world(&world, &options).unwrap();
//!     let back = pge_file_formats::read_world(&text).unwrap();
//!     assert_eq!(back.meta.format, format);
//!     assert_eq!(back.title, "Grass land");
//!     assert_eq!(back.tiles[0].x, 64);
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::options::{FileFormat, FileMeta, WriteOptions};

pub mod pgex;
pub mod smbx38a;
pub mod smbx64;

/// Name of the layer every element belongs to unless told otherwise.
pub const DEFAULT_LAYER: &str = "Default";

/// "Not specified" value of the star counter display policies.
pub const STARS_UNSPECIFIED: i32 = -1;

fn default_layer() -> String {
    DEFAULT_LAYER.to_string()
}

/// Terrain tile, scenery object or path tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapTile {
    pub id: u32,
    pub x: i64,
    pub y: i64,
    pub gfx_dx: i64,
    pub gfx_dy: i64,
    pub layer: String,
    pub extra: String,
}

impl Default for MapTile {
    fn default() -> Self {
        MapTile {
            id: 0,
            x: 0,
            y: 0,
            gfx_dx: 0,
            gfx_dy: 0,
            layer: default_layer(),
            extra: String::new(),
        }
    }
}

/// How a level tile opens the path in one direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelExit {
    /// Level exit type that opens the path, -1 for none
    pub code: i32,
    /// Two alternative exit types
    pub alt_codes: [i32; 2],
    /// Extra condition expression
    pub expression: String,
}

impl Default for LevelExit {
    fn default() -> Self {
        LevelExit {
            code: -1,
            alt_codes: [0, 0],
            expression: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnterCondition {
    pub condition: String,
    pub level_index: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoveNode {
    pub x: i64,
    pub y: i64,
    pub chance: i64,
}

impl Default for MoveNode {
    fn default() -> Self {
        MoveNode {
            x: 0,
            y: 0,
            chance: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MoveLine {
    pub node1: i64,
    pub node2: i64,
}

/// Movement graph of a wandering level tile.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Movement {
    pub nodes: Vec<MoveNode>,
    pub paths: Vec<MoveLine>,
}

/// A level entrance on the world map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelTile {
    pub id: u32,
    pub x: i64,
    pub y: i64,
    pub gfx_dx: i64,
    pub gfx_dy: i64,
    pub file: String,
    pub title: String,
    pub exit_top: LevelExit,
    pub exit_left: LevelExit,
    pub exit_bottom: LevelExit,
    pub exit_right: LevelExit,
    pub enter_conditions: Vec<EnterCondition>,
    /// Warp to enter through; 0 starts the level normally
    pub entrance_warp: u32,
    pub always_visible: bool,
    pub path_bg: bool,
    pub big_path_bg: bool,
    pub game_start: bool,
    pub goto_x: i64,
    pub goto_y: i64,
    pub force_start: bool,
    pub no_star_coin_count: bool,
    pub destroy_on_complete: bool,
    pub level_id: i64,
    pub controlled_by_area_rects: bool,
    pub layer: String,
    pub movement: Movement,
    pub stars_show_policy: i32,
    pub extra: String,
}

impl Default for LevelTile {
    fn default() -> Self {
        LevelTile {
            id: 0,
            x: 0,
            y: 0,
            gfx_dx: 0,
            gfx_dy: 0,
            file: String::new(),
            title: String::new(),
            exit_top: LevelExit::default(),
            exit_left: LevelExit::default(),
            exit_bottom: LevelExit::default(),
            exit_right: LevelExit::default(),
            enter_conditions: Vec::new(),
            entrance_warp: 0,
            always_visible: false,
            path_bg: false,
            big_path_bg: false,
            game_start: false,
            goto_x: -1,
            goto_y: -1,
            force_start: false,
            no_star_coin_count: false,
            destroy_on_complete: false,
            level_id: 0,
            controlled_by_area_rects: false,
            layer: default_layer(),
            movement: Movement::default(),
            stars_show_policy: STARS_UNSPECIFIED,
            extra: String::new(),
        }
    }
}

/// A point that switches the world music.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MusicBox {
    pub id: u32,
    pub x: i64,
    pub y: i64,
    pub music_file: String,
    pub layer: String,
    pub extra: String,
}

impl Default for MusicBox {
    fn default() -> Self {
        MusicBox {
            id: 0,
            x: 0,
            y: 0,
            music_file: String::new(),
            layer: default_layer(),
            extra: String::new(),
        }
    }
}

/// Area rectangle flag: switches the music.
pub const AREA_CHANGE_MUSIC: u32 = 0x01;
/// Area rectangle flag: automatic walking, unknown to files older than 38A version 69.
pub const AREA_AUTO_WALKING: u32 = 0x20;

/// A rectangular trigger area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaRect {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
    pub flags: u32,
    pub music_id: u32,
    pub music_file: String,
    pub layer: String,
    pub event_touch: String,
    pub touch_policy: u32,
    pub event_break: String,
    pub event_warp: String,
    pub event_anchor: String,
    pub extra: String,
}

impl Default for AreaRect {
    fn default() -> Self {
        AreaRect {
            x: 0,
            y: 0,
            w: 32,
            h: 32,
            flags: 0,
            music_id: 0,
            music_file: String::new(),
            layer: default_layer(),
            event_touch: String::new(),
            touch_policy: 0,
            event_break: String::new(),
            event_warp: String::new(),
            event_anchor: String::new(),
            extra: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldLayer {
    pub name: String,
    pub hidden: bool,
}

/// What a world event's layer lists switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LayerStateMode {
    /// Show, hide or toggle the objects on the listed layers
    #[default]
    Objects,
    /// Show, hide or toggle the listed layers themselves
    Layers,
}

/// Layer movement performed by a world event.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerMove {
    /// 0 sets speed, 1 moves by coordinates, 2 moves to a point, 4 spins
    pub kind: u32,
    pub layer: String,
    /// Horizontal parameter expression
    pub param_h: String,
    /// Vertical parameter expression
    pub param_v: String,
    pub param_extra: String,
}

/// A scripted event on a 38A world map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldEvent {
    pub name: String,
    pub no_smoke: bool,
    pub layers_mode: LayerStateMode,
    pub layers_hide: Vec<String>,
    pub layers_show: Vec<String>,
    pub layers_toggle: Vec<String>,
    pub layer_moves: Vec<LayerMove>,
    /// 0 never, 1 on the first world load, 2 on every world load, 3 on level exit
    pub autostart: u32,
    pub start_on_condition: bool,
    pub is_level_enter_exit: bool,
    pub interrupt_on_false: bool,
    pub show_msg_on_interrupt: bool,
    pub autostart_condition: String,
    pub interrupt_message: String,
    pub sound_id: i64,
    /// Keyboard lock in frames
    pub lock_keyboard_delay: i64,
    pub trigger: String,
    pub trigger_timer: i64,
    pub trigger_script: String,
    pub msg: String,
    /// Warp whistle target; -1 on both axes means no move
    pub move_to_x: i64,
    pub move_to_y: i64,
    pub level_anchor_id: i64,
}

impl Default for WorldEvent {
    fn default() -> Self {
        WorldEvent {
            name: String::new(),
            no_smoke: false,
            layers_mode: LayerStateMode::Objects,
            layers_hide: Vec::new(),
            layers_show: Vec::new(),
            layers_toggle: Vec::new(),
            layer_moves: Vec::new(),
            autostart: 0,
            start_on_condition: false,
            is_level_enter_exit: false,
            interrupt_on_false: false,
            show_msg_on_interrupt: false,
            autostart_condition: String::new(),
            interrupt_message: String::new(),
            sound_id: 0,
            lock_keyboard_delay: 0,
            trigger: String::new(),
            trigger_timer: 0,
            trigger_script: String::new(),
            msg: String::new(),
            move_to_x: -1,
            move_to_y: -1,
            level_anchor_id: 0,
        }
    }
}

/// A named position saved by the editor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Bookmark {
    pub name: String,
    pub x: f64,
    pub y: f64,
}

/// Editor state stored after a crash so the file can be recovered.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CrashData {
    pub untitled: bool,
    pub modified: bool,
    pub format_id: i32,
    pub format_version: u32,
    pub filename: String,
    pub path: String,
    pub full_path: String,
}

/// Element kind a custom 38A configuration applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    Terrain,
    Scenery,
    Level,
}

/// One `key=value` pair of a custom element configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub key: i32,
    pub value: i64,
}

/// Per-element graphics configuration stored in 38A worlds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSetup {
    pub kind: ItemKind,
    pub id: i64,
    pub data: Vec<ConfigEntry>,
}

/// An episode's world map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldData {
    pub title: String,
    /// One flag per playable character, `true` when it cannot be used
    pub disabled_characters: Vec<bool>,
    pub intro_level: String,
    pub game_over_level: String,
    pub hub_styled: bool,
    pub restart_level: bool,
    pub single_player_only: bool,
    pub no_character_switch: bool,
    pub secure_save: bool,
    pub no_entry_scene: bool,
    /// `true` allows only the cheats in `cheats`, `false` forbids them
    pub cheats_allowed: bool,
    pub cheats: Vec<String>,
    /// -1 resumes at the intro, 0 at the world map, 1 at the recent level
    pub save_resume: i32,
    pub auto_save: bool,
    pub save_locker: bool,
    pub save_locker_expression: String,
    pub save_locker_message: String,
    pub show_everything: bool,
    pub stars: u32,
    pub inventory_limit: u64,
    pub stars_show_policy: i32,
    /// Credits, one author per line
    pub credits: String,
    pub credits_music: String,
    pub extra: String,
    pub tiles: Vec<MapTile>,
    pub scenery: Vec<MapTile>,
    pub paths: Vec<MapTile>,
    pub levels: Vec<LevelTile>,
    pub music_boxes: Vec<MusicBox>,
    pub area_rects: Vec<AreaRect>,
    pub layers: Vec<WorldLayer>,
    pub events: Vec<WorldEvent>,
    pub custom_configs: Vec<ItemSetup>,
    /// Configuration package the episode was made for
    pub config_pack_id: String,
    pub bookmarks: Vec<Bookmark>,
    /// Present when the file was written by the editor's crash handler
    pub crash: Option<CrashData>,
    /// 38A records this crate does not decode, kept verbatim
    pub unsupported_lines: Vec<String>,
    pub meta: FileMeta,
}

impl Default for WorldData {
    fn default() -> Self {
        WorldData {
            title: String::new(),
            disabled_characters: Vec::new(),
            intro_level: String::new(),
            game_over_level: String::new(),
            hub_styled: false,
            restart_level: false,
            single_player_only: false,
            no_character_switch: false,
            secure_save: false,
            no_entry_scene: false,
            cheats_allowed: false,
            cheats: Vec::new(),
            save_resume: 0,
            auto_save: false,
            save_locker: false,
            save_locker_expression: String::new(),
            save_locker_message: String::new(),
            show_everything: false,
            stars: 0,
            inventory_limit: 0,
            stars_show_policy: STARS_UNSPECIFIED,
            credits: String::new(),
            credits_music: String::new(),
            extra: String::new(),
            tiles: Vec::new(),
            scenery: Vec::new(),
            paths: Vec::new(),
            levels: Vec::new(),
            music_boxes: Vec::new(),
            area_rects: Vec::new(),
            layers: Vec::new(),
            events: Vec::new(),
            custom_configs: Vec::new(),
            config_pack_id: String::new(),
            bookmarks: Vec::new(),
            crash: None,
            unsupported_lines: Vec::new(),
            meta: FileMeta::default(),
        }
    }
}

impl WorldData {
    /// Whether playable character `index` (0-based) is disabled.
    #[must_use]
    pub fn character_disabled(&self, index: usize) -> bool {
        self.disabled_characters.get(index).copied().unwrap_or(false)
    }

    /// Credits split into individual author lines.
    pub fn authors(&self) -> impl Iterator<Item = &str> {
        self.credits.split('\n').filter(|line| !line.is_empty())
    }
}

/// Reads a world map in the given dialect.
///
/// # Errors
///
/// Returns the dialect reader's error.
pub fn read(text: &str, format: FileFormat) -> Result<WorldData> {
    match format {
        FileFormat::Pgex => pgex::read(text),
        FileFormat::Smbx64 => smbx64::read(text),
        FileFormat::Smbx38a => smbx38a::read(text),
    }
}

/// Writes a world map in the dialect and version selected by `options`.
///
/// # Errors
///
/// Returns the dialect writer's error.
pub fn write(world: &WorldData, options: &WriteOptions) -> Result<String> {
    let version = options.target_version();
    tracing::debug!("Writing {} world map, version {}", options.format, version);
    match options.format {
        FileFormat::Pgex => Ok(pgex::write(world)),
        FileFormat::Smbx64 => Ok(smbx64::write(world, version)),
        FileFormat::Smbx38a => Ok(smbx38a::write(world, version)),
    }
}
