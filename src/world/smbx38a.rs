//! World maps in the SMBX-38A pipe dialect.
//!
//! The first line is the file identifier `SMBXFile<version>`. Every other
//! line is one record: a tag, then `|`-separated fields, some of which are
//! split further by `,`, `\`, `/` or `:`. Strings are percent-encoded.
//!
//! ```text
//! SMBXFile69
//! WS1|My%20episode|0,0,0,0,0|intro.lvl,|0,0,0,0,0,0,0,0,0|10,0|0|0
//! T|3|64|32|
//! L|1|96|32|one.lvl|One|-1,0,0,\-1,0,0,\-1,0,0,\1,0,0,|-1|-1|0|0,0,1,1,0,0,0,0,0|||\
//! ```
//!
//! Each record kind has one spec builder shared by the reader and the
//! writer. Records this crate does not decode are kept verbatim and written
//! back after everything else.

use crate::delimited::{
    self, discard, iterator, optional, optional_iterator, optional_sub_reader, optional_with,
    post_process, required, sub_reader, FieldError, Spec,
};
use crate::error::{Error, Result};
use crate::escape::{base64_decode, base64_encode, url_decode, url_encode};
use crate::options::{FileFormat, FileMeta, SMBX38A_NEWEST};

use super::{
    AreaRect, ConfigEntry, EnterCondition, ItemKind, ItemSetup, LayerMove, LayerStateMode,
    LevelExit, LevelTile, MapTile, MoveLine, MoveNode, MusicBox, WorldData, WorldEvent, WorldLayer,
    AREA_AUTO_WALKING, AREA_CHANGE_MUSIC, DEFAULT_LAYER,
};

const FILE_TAG: &str = "SMBXFile";

#[derive(Debug, Clone, Copy)]
enum Mode {
    Read,
    Write(u32),
}

impl Mode {
    /// Fields gated by version are always read and only written when the target has them.
    fn has(self, since: u32) -> bool {
        match self {
            Mode::Read => true,
            Mode::Write(version) => version >= since,
        }
    }
}

/// Parses the `SMBXFile<version>` identifier on the first line.
///
/// # Errors
///
/// Fails when the prefix is missing or the number does not parse, and with
/// [`Error::UnsupportedVersion`] when the version is newer than 69.
///
/// ```rust
/// use pge_file_formats::world::smbx38a::parse_file_identifier;
///
/// assert_eq!(parse_file_identifier("SMBXFile66").unwrap(), 66);
/// assert!(parse_file_identifier("SMBXFile70").is_err());
/// assert!(parse_file_identifier("64").is_err());
/// ```
pub fn parse_file_identifier(line: &str) -> Result<u32> {
    let field = line.split('|').next().unwrap_or_default();
    let Some(number) = field.strip_prefix(FILE_TAG) else {
        return Err(Error::field_conversion(
            FileFormat::Smbx38a,
            None,
            1,
            "Invalid file format",
            line,
        ));
    };
    let version: u32 = number.trim().parse().map_err(|_| {
        Error::field_conversion(
            FileFormat::Smbx38a,
            None,
            1,
            "Invalid file format version",
            line,
        )
    })?;
    if version > SMBX38A_NEWEST {
        return Err(Error::unsupported_version(
            FileFormat::Smbx38a,
            version,
            SMBX38A_NEWEST,
        ));
    }
    Ok(version)
}

/// Reads a 38A world map.
///
/// # Errors
///
/// A bad file identifier, or the first record whose fields do not convert.
pub fn read(text: &str) -> Result<WorldData> {
    let first = text.lines().next().unwrap_or_default();
    let version = parse_file_identifier(first)?;
    tracing::debug!("Reading SMBX-38A world map version {}", version);

    let mut world = WorldData {
        meta: FileMeta::new(FileFormat::Smbx38a, version),
        ..WorldData::default()
    };
    for (index, line) in text.lines().enumerate().skip(1) {
        if line.is_empty() {
            continue;
        }
        read_record(line, &mut world).map_err(|err| {
            Error::field_conversion(
                FileFormat::Smbx38a,
                Some(version),
                index + 1,
                &err.to_string(),
                line,
            )
        })?;
    }
    Ok(world)
}

fn read_record(line: &str, world: &mut WorldData) -> std::result::Result<(), FieldError> {
    let tag = line.split('|').next().unwrap_or_default();
    match tag {
        "WS1" => {
            let mut characters = [false; 5];
            delimited::read_fields(
                line,
                '|',
                &mut header_specs(world, &mut characters, Mode::Read),
            )?;
            world.disabled_characters = characters.to_vec();
        }
        "WS2" => delimited::read_fields(line, '|', &mut credits_specs(world, Mode::Read))?,
        "WS3" => {
            let mut list = String::new();
            delimited::read_fields(line, '|', &mut cheats_specs(&mut list))?;
            world.cheats = if list.is_empty() {
                Vec::new()
            } else {
                list.split(',').map(str::to_string).collect()
            };
        }
        "WS4" => delimited::read_fields(line, '|', &mut save_locker_specs(world))?,
        "T" | "S" | "P" => {
            let mut tile = MapTile::default();
            delimited::read_fields(line, '|', &mut tile_specs(tag, &mut tile, Mode::Read))?;
            match tag {
                "T" => world.tiles.push(tile),
                "S" => world.scenery.push(tile),
                _ => world.paths.push(tile),
            }
        }
        "M" => {
            let mut rect = AreaRect {
                flags: AREA_CHANGE_MUSIC,
                ..AreaRect::default()
            };
            delimited::read_fields(line, '|', &mut area_specs(&mut rect, Mode::Read))?;
            if rect.flags == AREA_CHANGE_MUSIC && rect.w == 32 && rect.h == 32 {
                world.music_boxes.push(MusicBox {
                    id: rect.music_id,
                    x: rect.x,
                    y: rect.y,
                    music_file: rect.music_file,
                    layer: rect.layer,
                    extra: String::new(),
                });
            } else {
                world.area_rects.push(rect);
            }
        }
        "L" => {
            let mut level = LevelTile::default();
            delimited::read_fields(line, '|', &mut level_specs(&mut level, Mode::Read))?;
            world.levels.push(level);
        }
        "WL" => {
            let mut layer = WorldLayer::default();
            delimited::read_fields(line, '|', &mut layer_specs(&mut layer))?;
            world.layers.push(layer);
        }
        "WE" => {
            let mut event = WorldEvent::default();
            let mut way = 0;
            delimited::read_fields(line, '|', &mut event_specs(&mut event, &mut way))?;
            event.no_smoke = way % 10 == 1;
            event.layers_mode = if way > 10 {
                LayerStateMode::Layers
            } else {
                LayerStateMode::Objects
            };
            world.events.push(event);
        }
        "WCT" | "WCS" | "WCL" => {
            let kind = match tag {
                "WCT" => ItemKind::Terrain,
                "WCS" => ItemKind::Scenery,
                _ => ItemKind::Level,
            };
            let mut setup = ItemSetup {
                kind,
                id: 0,
                data: Vec::new(),
            };
            delimited::read_fields(line, '|', &mut config_specs(&mut setup))?;
            world.custom_configs.push(setup);
        }
        _ => {
            tracing::trace!("Keeping unsupported 38A record {:?}", tag);
            world.unsupported_lines.push(line.to_string());
        }
    }
    Ok(())
}

/// Writes a 38A world map of the given version (clamped to 69).
#[must_use]
pub fn write(world: &WorldData, version: u32) -> String {
    let version = version.min(SMBX38A_NEWEST);
    let mode = Mode::Write(version);
    let mut out = format!("{FILE_TAG}{version}\n");

    let mut header = world.clone();
    let mut characters: [bool; 5] = std::array::from_fn(|i| world.character_disabled(i));
    push(&mut out, &header_specs(&mut header, &mut characters, mode));
    push(&mut out, &credits_specs(&mut header, mode));
    let mut cheats = world.cheats.join(",");
    push(&mut out, &cheats_specs(&mut cheats));
    push(&mut out, &save_locker_specs(&mut header));

    for (tag, tiles) in [("T", &world.tiles), ("S", &world.scenery), ("P", &world.paths)] {
        for tile in tiles {
            push(&mut out, &tile_specs(tag, &mut tile.clone(), mode));
        }
    }

    for music in &world.music_boxes {
        let mut rect = AreaRect {
            music_id: music.id,
            x: music.x,
            y: music.y,
            music_file: music.music_file.clone(),
            layer: music.layer.clone(),
            flags: AREA_CHANGE_MUSIC,
            ..AreaRect::default()
        };
        push(&mut out, &area_specs(&mut rect, mode));
    }
    for rect in &world.area_rects {
        let mut rect = rect.clone();
        if version < 69 {
            rect.flags &= !AREA_AUTO_WALKING;
        }
        push(&mut out, &area_specs(&mut rect, mode));
    }

    for level in &world.levels {
        push(&mut out, &level_specs(&mut level.clone(), mode));
    }
    for layer in &world.layers {
        push(&mut out, &layer_specs(&mut layer.clone()));
    }
    for event in &world.events {
        let mut way = u32::from(event.no_smoke);
        if event.layers_mode == LayerStateMode::Layers {
            way += 20;
        }
        push(&mut out, &event_specs(&mut event.clone(), &mut way));
    }
    if version >= 67 {
        for setup in &world.custom_configs {
            push(&mut out, &config_specs(&mut setup.clone()));
        }
    }

    for line in &world.unsupported_lines {
        out.push_str(line);
        out.push('\n');
    }
    out
}

fn push(out: &mut String, specs: &[Spec<'_>]) {
    out.push_str(&delimited::write_fields('|', specs));
    out.push('\n');
}

fn header_specs<'a>(
    world: &'a mut WorldData,
    characters: &'a mut [bool; 5],
    mode: Mode,
) -> Vec<Spec<'a>> {
    let mut levels = vec![post_process(&mut world.intro_level, url_decode, url_encode)];
    if mode.has(67) {
        levels.push(optional_with(
            &mut world.game_over_level,
            "",
            url_decode,
            url_encode,
        ));
    }

    let mut flags = vec![
        optional(&mut world.single_player_only, false),
        optional(&mut world.hub_styled, false),
        optional(&mut world.restart_level, false),
        optional(&mut world.no_character_switch, false),
        optional(&mut world.secure_save, false),
        optional(&mut world.save_resume, 0),
        optional(&mut world.auto_save, false),
        optional(&mut world.show_everything, false),
    ];
    if mode.has(68) {
        flags.push(optional(&mut world.no_entry_scene, false));
    }

    vec![
        discard("WS1"),
        post_process(&mut world.title, url_decode, url_encode),
        sub_reader(
            ',',
            characters.iter_mut().map(|c| optional(c, false)).collect(),
        ),
        sub_reader(',', levels),
        sub_reader(',', flags),
        sub_reader(
            ',',
            vec![
                optional(&mut world.stars, 0),
                optional(&mut world.inventory_limit, 0),
            ],
        ),
        required(&mut world.cheats_allowed),
        required(&mut world.save_locker),
    ]
}

fn credits_specs(world: &mut WorldData, mode: Mode) -> Vec<Spec<'_>> {
    let mut specs = vec![
        discard("WS2"),
        post_process(&mut world.credits, decode_credits, encode_credits),
    ];
    if mode.has(69) {
        specs.push(optional_with(
            &mut world.credits_music,
            "",
            url_decode,
            url_encode,
        ));
    }
    specs
}

/// `#DEFT#` holds an author list, `#CUST#` free text; both are base64.
fn decode_credits(raw: &str) -> String {
    if let Some(authors) = raw.strip_prefix("#DEFT#") {
        return base64_decode(authors).replace("\r\n", "\n");
    }
    base64_decode(raw.strip_prefix("#CUST#").unwrap_or(raw))
}

fn encode_credits(credits: &str) -> String {
    if credits.is_empty() {
        String::new()
    } else {
        format!("#CUST#{}", base64_encode(credits))
    }
}

fn cheats_specs(list: &mut String) -> Vec<Spec<'_>> {
    vec![discard("WS3"), post_process(list, url_decode, url_encode)]
}

fn save_locker_specs(world: &mut WorldData) -> Vec<Spec<'_>> {
    vec![
        discard("WS4"),
        post_process(&mut world.save_locker_expression, url_decode, url_encode),
        post_process(&mut world.save_locker_message, url_decode, url_encode),
    ]
}

fn layer_or_default(raw: &str) -> String {
    if raw.is_empty() {
        DEFAULT_LAYER.to_string()
    } else {
        url_decode(raw)
    }
}

fn layer_unless_default(layer: &str) -> String {
    if layer == DEFAULT_LAYER {
        String::new()
    } else {
        url_encode(layer)
    }
}

fn layer_field(layer: &mut String) -> Spec<'_> {
    optional_with(layer, DEFAULT_LAYER, layer_or_default, layer_unless_default)
}

/// `id[,dx,dy]`; the graphics offset is only written by version 67 and when positive.
fn id_with_offset<'a>(id: &'a mut u32, dx: &'a mut i64, dy: &'a mut i64, mode: Mode) -> Spec<'a> {
    let with_offset = match mode {
        Mode::Read => true,
        Mode::Write(version) => version >= 67 && (*dx > 0 || *dy > 0),
    };
    let mut specs = vec![required(id)];
    if with_offset {
        specs.push(optional(dx, 0));
        specs.push(optional(dy, 0));
    }
    sub_reader(',', specs)
}

fn tile_specs<'a>(tag: &'a str, tile: &'a mut MapTile, mode: Mode) -> Vec<Spec<'a>> {
    let mut specs = vec![
        discard(tag),
        id_with_offset(&mut tile.id, &mut tile.gfx_dx, &mut tile.gfx_dy, mode),
        required(&mut tile.x),
        required(&mut tile.y),
    ];
    if mode.has(66) {
        specs.push(layer_field(&mut tile.layer));
    }
    specs
}

// M|id|x|y|name|layer|w|h|flags|te,eflag|ie1,ie2,ie3
fn area_specs(rect: &mut AreaRect, mode: Mode) -> Vec<Spec<'_>> {
    let item_events = match mode {
        Mode::Read => true,
        Mode::Write(_) => {
            !(rect.event_break.is_empty()
                && rect.event_warp.is_empty()
                && rect.event_anchor.is_empty())
        }
    };

    let mut specs = vec![
        discard("M"),
        required(&mut rect.music_id),
        required(&mut rect.x),
        required(&mut rect.y),
        post_process(&mut rect.music_file, url_decode, url_encode),
    ];
    if !mode.has(66) {
        return specs;
    }
    specs.extend([
        layer_field(&mut rect.layer),
        optional(&mut rect.w, 32),
        optional(&mut rect.h, 32),
        optional(&mut rect.flags, AREA_CHANGE_MUSIC),
        optional_sub_reader(
            ',',
            vec![
                optional_with(&mut rect.event_touch, "", url_decode, url_encode),
                optional(&mut rect.touch_policy, 0),
            ],
        ),
    ]);
    if item_events {
        specs.push(optional_sub_reader(
            ',',
            vec![
                optional_with(&mut rect.event_break, "", url_decode, url_encode),
                optional_with(&mut rect.event_warp, "", url_decode, url_encode),
                optional_with(&mut rect.event_anchor, "", url_decode, url_encode),
            ],
        ));
    }
    specs
}

fn exit_field(exit: &mut LevelExit) -> Spec<'_> {
    let [alt1, alt2] = &mut exit.alt_codes;
    sub_reader(
        ',',
        vec![
            required(&mut exit.code),
            required(alt1),
            required(alt2),
            post_process(&mut exit.expression, url_decode, url_encode),
        ],
    )
}

// L|id[,dx,dy]|x|y|file|title|eu\el\ed\er|wx|wy|warp|flags|conditions|layer|movement
fn level_specs(level: &mut LevelTile, mode: Mode) -> Vec<Spec<'_>> {
    let conditions = optional_iterator(
        '/',
        &mut level.enter_conditions,
        parse_enter_condition,
        render_enter_condition,
    );
    let movement = optional_sub_reader(
        '\\',
        vec![
            optional_iterator(
                ':',
                &mut level.movement.nodes,
                parse_move_node,
                render_move_node,
            ),
            optional_iterator(
                ':',
                &mut level.movement.paths,
                parse_move_line,
                render_move_line,
            ),
        ],
    );

    let mut specs = vec![
        discard("L"),
        id_with_offset(&mut level.id, &mut level.gfx_dx, &mut level.gfx_dy, mode),
        required(&mut level.x),
        required(&mut level.y),
        post_process(&mut level.file, url_decode, url_encode),
        post_process(&mut level.title, url_decode, url_encode),
        sub_reader(
            '\\',
            vec![
                exit_field(&mut level.exit_top),
                exit_field(&mut level.exit_left),
                exit_field(&mut level.exit_bottom),
                exit_field(&mut level.exit_right),
            ],
        ),
        required(&mut level.goto_x),
        required(&mut level.goto_y),
        required(&mut level.entrance_warp),
        sub_reader(
            ',',
            vec![
                optional(&mut level.big_path_bg, false),
                optional(&mut level.path_bg, false),
                optional(&mut level.always_visible, false),
                optional(&mut level.game_start, false),
                optional(&mut level.force_start, false),
                optional(&mut level.no_star_coin_count, false),
                optional(&mut level.destroy_on_complete, false),
                optional(&mut level.level_id, 0),
                optional(&mut level.controlled_by_area_rects, false),
            ],
        ),
        conditions,
    ];
    if mode.has(66) {
        specs.push(layer_field(&mut level.layer));
        specs.push(movement);
    }
    specs
}

fn parse_enter_condition(raw: &str) -> std::result::Result<EnterCondition, String> {
    let mut condition = EnterCondition::default();
    delimited::read_fields(
        raw,
        ',',
        &mut [
            post_process(&mut condition.condition, url_decode, url_encode),
            post_process(&mut condition.level_index, url_decode, url_encode),
        ],
    )
    .map_err(|err| err.to_string())?;
    Ok(condition)
}

fn render_enter_condition(condition: &EnterCondition) -> String {
    format!(
        "{},{}",
        url_encode(&condition.condition),
        url_encode(&condition.level_index)
    )
}

fn parse_move_node(raw: &str) -> std::result::Result<MoveNode, String> {
    let mut node = MoveNode::default();
    delimited::read_fields(
        raw,
        ',',
        &mut [
            required(&mut node.x),
            required(&mut node.y),
            required(&mut node.chance),
        ],
    )
    .map_err(|err| err.to_string())?;
    Ok(node)
}

fn render_move_node(node: &MoveNode) -> String {
    format!("{},{},{}", node.x, node.y, node.chance)
}

fn parse_move_line(raw: &str) -> std::result::Result<MoveLine, String> {
    let mut line = MoveLine::default();
    delimited::read_fields(
        raw,
        ',',
        &mut [required(&mut line.node1), required(&mut line.node2)],
    )
    .map_err(|err| err.to_string())?;
    Ok(line)
}

fn render_move_line(line: &MoveLine) -> String {
    format!("{},{}", line.node1, line.node2)
}

fn layer_specs(layer: &mut WorldLayer) -> Vec<Spec<'_>> {
    vec![
        discard("WL"),
        post_process(&mut layer.name, layer_or_default, url_encode),
        required(&mut layer.hidden),
    ]
}

// WE|name|way/hide/show/toggle|moves|autostart/conditions|sound/lock/trigger,delay/script/msg/x,y,anchor
// `way` packs the no-smoke flag in its last digit and the layer mode above ten.
fn event_specs<'a>(event: &'a mut WorldEvent, way: &'a mut u32) -> Vec<Spec<'a>> {
    vec![
        discard("WE"),
        post_process(&mut event.name, url_decode, url_encode),
        sub_reader(
            '/',
            vec![
                required(way),
                layer_names(&mut event.layers_hide),
                layer_names(&mut event.layers_show),
                layer_names(&mut event.layers_toggle),
            ],
        ),
        iterator('\\', &mut event.layer_moves, parse_layer_move, render_layer_move),
        optional_sub_reader(
            '/',
            vec![
                required(&mut event.autostart),
                sub_reader(
                    ',',
                    vec![
                        required(&mut event.start_on_condition),
                        required(&mut event.is_level_enter_exit),
                        required(&mut event.interrupt_on_false),
                        required(&mut event.show_msg_on_interrupt),
                        post_process(&mut event.autostart_condition, url_decode, url_encode),
                        post_process(&mut event.interrupt_message, url_decode, url_encode),
                    ],
                ),
            ],
        ),
        optional_sub_reader(
            '/',
            vec![
                required(&mut event.sound_id),
                required(&mut event.lock_keyboard_delay),
                sub_reader(
                    ',',
                    vec![
                        post_process(&mut event.trigger, url_decode, url_encode),
                        required(&mut event.trigger_timer),
                    ],
                ),
                post_process(&mut event.trigger_script, url_decode, url_encode),
                post_process(&mut event.msg, url_decode, url_encode),
                sub_reader(
                    ',',
                    vec![
                        required(&mut event.move_to_x),
                        required(&mut event.move_to_y),
                        required(&mut event.level_anchor_id),
                    ],
                ),
            ],
        ),
    ]
}

fn layer_names(names: &mut Vec<String>) -> Spec<'_> {
    iterator(',', names, |raw| Ok(url_decode(raw)), |name| url_encode(name))
}

fn parse_layer_move(raw: &str) -> std::result::Result<LayerMove, String> {
    let mut layer_move = LayerMove::default();
    delimited::read_fields(
        raw,
        ',',
        &mut [
            required(&mut layer_move.kind),
            post_process(&mut layer_move.layer, url_decode, url_encode),
            post_process(&mut layer_move.param_h, url_decode, url_encode),
            post_process(&mut layer_move.param_v, url_decode, url_encode),
            post_process(&mut layer_move.param_extra, url_decode, url_encode),
        ],
    )
    .map_err(|err| err.to_string())?;
    Ok(layer_move)
}

fn render_layer_move(layer_move: &LayerMove) -> String {
    format!(
        "{},{},{},{},{}",
        layer_move.kind,
        url_encode(&layer_move.layer),
        url_encode(&layer_move.param_h),
        url_encode(&layer_move.param_v),
        url_encode(&layer_move.param_extra)
    )
}

fn config_tag(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Terrain => "WCT",
        ItemKind::Scenery => "WCS",
        ItemKind::Level => "WCL",
    }
}

fn config_specs(setup: &mut ItemSetup) -> Vec<Spec<'_>> {
    vec![
        discard(config_tag(setup.kind)),
        required(&mut setup.id),
        optional_iterator(
            ',',
            &mut setup.data,
            |raw| Ok(decode_config_entry(raw)),
            encode_config_entry,
        ),
    ]
}

/// Decodes `KKKKV...`: four hex digits of key, then the hex value.
/// Unparsable parts read as zero.
fn decode_config_entry(raw: &str) -> ConfigEntry {
    if raw.len() < 4 || !raw.is_char_boundary(4) {
        return ConfigEntry::default();
    }
    let (key, value) = raw.split_at(4);
    ConfigEntry {
        key: i32::from_str_radix(key, 16).unwrap_or(0),
        value: if value.is_empty() {
            0
        } else {
            i64::from_str_radix(value, 16).unwrap_or(0)
        },
    }
}

fn encode_config_entry(entry: &ConfigEntry) -> String {
    format!("{:04X}{:X}", entry.key as u16, entry.value as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Movement;
    use pretty_assertions::assert_eq;

    fn sample() -> WorldData {
        let mut world = WorldData {
            title: "Big | world, 100%".to_string(),
            disabled_characters: vec![false, true, false, false, true],
            intro_level: "intro.lvl".to_string(),
            game_over_level: "over.lvl".to_string(),
            hub_styled: true,
            secure_save: true,
            no_entry_scene: true,
            save_resume: -1,
            cheats_allowed: true,
            cheats: vec!["iwannafly".to_string(), "moneytree".to_string()],
            save_locker: true,
            save_locker_expression: "v>1".to_string(),
            save_locker_message: "Locked!".to_string(),
            stars: 20,
            inventory_limit: 8,
            credits: "Alice\nBob".to_string(),
            credits_music: "credits.ogg".to_string(),
            ..WorldData::default()
        };
        world.tiles.push(MapTile {
            id: 3,
            x: 64,
            y: 32,
            gfx_dx: 4,
            gfx_dy: 2,
            ..MapTile::default()
        });
        world.paths.push(MapTile {
            id: 1,
            layer: "Bridges".to_string(),
            ..MapTile::default()
        });
        world.music_boxes.push(MusicBox {
            id: 2,
            x: 32,
            music_file: "a b.ogg".to_string(),
            ..MusicBox::default()
        });
        world.area_rects.push(AreaRect {
            music_id: 1,
            w: 96,
            flags: AREA_CHANGE_MUSIC | AREA_AUTO_WALKING,
            event_touch: "touch".to_string(),
            touch_policy: 2,
            event_warp: "warp".to_string(),
            ..AreaRect::default()
        });
        let mut level = LevelTile {
            id: 7,
            x: 96,
            y: -32,
            file: "one.lvl".to_string(),
            title: "One, first".to_string(),
            entrance_warp: 2,
            game_start: true,
            always_visible: true,
            level_id: 12,
            layer: "Hidden".to_string(),
            enter_conditions: vec![EnterCondition {
                condition: "a/b".to_string(),
                level_index: "1".to_string(),
            }],
            movement: Movement {
                nodes: vec![
                    MoveNode { x: 1, y: 2, chance: 50 },
                    MoveNode { x: 3, y: 4, chance: 100 },
                ],
                paths: vec![MoveLine { node1: 0, node2: 1 }],
            },
            ..LevelTile::default()
        };
        level.exit_right = LevelExit {
            code: 1,
            alt_codes: [3, 4],
            expression: "x:1".to_string(),
        };
        world.levels.push(level);
        world.layers.push(WorldLayer {
            name: "Hidden".to_string(),
            hidden: true,
        });
        world.custom_configs.push(ItemSetup {
            kind: ItemKind::Scenery,
            id: 4,
            data: vec![ConfigEntry { key: 1, value: 64 }, ConfigEntry { key: 3, value: 2 }],
        });
        world.events.push(WorldEvent {
            name: "Open gate".to_string(),
            no_smoke: true,
            layers_mode: LayerStateMode::Layers,
            layers_hide: vec!["Gate".to_string(), "Wall, east".to_string()],
            layers_toggle: vec!["Bridges".to_string()],
            layer_moves: vec![LayerMove {
                kind: 2,
                layer: "Gate".to_string(),
                param_h: "32".to_string(),
                param_v: "-64".to_string(),
                param_extra: String::new(),
            }],
            autostart: 3,
            start_on_condition: true,
            autostart_condition: "v>1".to_string(),
            sound_id: 12,
            trigger: "after".to_string(),
            trigger_timer: 20,
            msg: "The gate opens".to_string(),
            move_to_x: 64,
            move_to_y: 128,
            ..WorldEvent::default()
        });
        world.unsupported_lines.push("ZZ|future|record".to_string());
        world
    }

    #[test]
    fn test_roundtrip_newest() {
        let world = sample();
        let text = write(&world, SMBX38A_NEWEST);
        let mut back = read(&text).unwrap();
        assert_eq!(back.meta, FileMeta::new(FileFormat::Smbx38a, 69));
        back.meta = world.meta;
        assert_eq!(back, world);
    }

    #[test]
    fn test_minimal_output() {
        let mut world = WorldData {
            title: "Grass land".to_string(),
            ..WorldData::default()
        };
        world.tiles.push(MapTile {
            id: 3,
            x: 64,
            y: 32,
            ..MapTile::default()
        });
        assert_eq!(
            write(&world, 69),
            "SMBXFile69\n\
             WS1|Grass%20land|0,0,0,0,0|,|0,0,0,0,0,0,0,0,0|0,0|0|0\n\
             WS2||\n\
             WS3|\n\
             WS4||\n\
             T|3|64|32|\n"
        );
    }

    #[test]
    fn test_old_versions_drop_gated_fields() {
        let world = sample();
        let back = read(&write(&world, 65)).unwrap();
        assert_eq!(back.meta.version, 65);
        assert_eq!(back.game_over_level, "");
        assert!(!back.no_entry_scene);
        assert_eq!(back.credits_music, "");
        assert_eq!(back.credits, world.credits);
        assert_eq!(back.tiles[0].gfx_dx, 0);
        assert_eq!(back.paths[0].layer, DEFAULT_LAYER);
        assert!(back.levels[0].movement.nodes.is_empty());
        assert!(back.custom_configs.is_empty());
        // without width and height an area rect reads back as a music box
        assert_eq!(back.music_boxes.len(), 2);
        assert!(back.area_rects.is_empty());
    }

    #[test]
    fn test_auto_walking_flag_needs_69() {
        let world = sample();
        let back = read(&write(&world, 68)).unwrap();
        assert_eq!(back.area_rects[0].flags, AREA_CHANGE_MUSIC);
    }

    #[test]
    fn test_music_box_record() {
        let mut world = WorldData::default();
        world.music_boxes.push(MusicBox {
            id: 10,
            x: 416,
            y: 1312,
            ..MusicBox::default()
        });
        let text = write(&world, 69);
        assert!(text.contains("\nM|10|416|1312|||32|32|1|,0\n"));
        let back = read(&text).unwrap();
        assert_eq!(back.music_boxes, world.music_boxes);
    }

    #[test]
    fn test_level_line_with_defaults() {
        let text = "SMBXFile69\nL|5,0,0|100|200|one.lvl|One|-1,0,0,\\1,0,0,\\-1,0,0,\\-1,0,0,|-1|-1|0|0,1\n";
        let world = read(text).unwrap();
        let level = &world.levels[0];
        assert_eq!((level.id, level.x, level.y), (5, 100, 200));
        assert_eq!((level.gfx_dx, level.gfx_dy), (0, 0));
        assert_eq!(level.exit_left.code, 1);
        assert!(level.path_bg);
        assert!(!level.always_visible);
        assert_eq!(level.layer, DEFAULT_LAYER);
        assert!(level.enter_conditions.is_empty());
    }

    #[test]
    fn test_credits_prefixes() {
        let deft = format!("SMBXFile69\nWS2|#DEFT#{}\n", base64_encode("Ann\r\nBo"));
        assert_eq!(read(&deft).unwrap().credits, "Ann\nBo");
        let plain = format!("SMBXFile69\nWS2|{}|x%20y\n", base64_encode("free text"));
        let world = read(&plain).unwrap();
        assert_eq!(world.credits, "free text");
        assert_eq!(world.credits_music, "x y");
    }

    #[test]
    fn test_empty_cheat_list() {
        let world = read("SMBXFile69\nWS3|\n").unwrap();
        assert!(world.cheats.is_empty());
    }

    #[test]
    fn test_field_error_carries_line() {
        let err = read("SMBXFile69\n\nT|x|1|2\n").unwrap_err();
        match err {
            Error::FieldConversion {
                line, version, msg, ..
            } => {
                assert_eq!(line, 3);
                assert_eq!(version, Some(69));
                assert!(msg.starts_with("field 2.1"), "{msg}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_file_identifier() {
        assert_eq!(parse_file_identifier("SMBXFile0").unwrap(), 0);
        assert_eq!(
            parse_file_identifier("SMBXFile70").unwrap_err(),
            Error::unsupported_version(FileFormat::Smbx38a, 70, SMBX38A_NEWEST)
        );
        let err = parse_file_identifier("SMBX64").unwrap_err();
        assert!(err.to_string().contains("Invalid file format"));
    }

    #[test]
    fn test_event_line() {
        let line = "WE|Open%20gate|21/Gate//Bridges|2,Gate,32,-64,\\0,Lift,1,2,3|1/0,1,0,0,,|5/30/next,10/run/Hi/-1,-1,4";
        let world = read(&format!("SMBXFile69\n{line}\n")).unwrap();
        let event = &world.events[0];
        assert_eq!(event.name, "Open gate");
        assert!(event.no_smoke);
        assert_eq!(event.layers_mode, LayerStateMode::Layers);
        assert_eq!(event.layers_hide, vec!["Gate".to_string()]);
        assert!(event.layers_show.is_empty());
        assert_eq!(event.layers_toggle, vec!["Bridges".to_string()]);
        assert_eq!(event.layer_moves.len(), 2);
        assert_eq!(event.layer_moves[1].layer, "Lift");
        assert_eq!(event.layer_moves[1].param_extra, "3");
        assert_eq!(event.autostart, 1);
        assert!(event.is_level_enter_exit);
        assert_eq!((event.sound_id, event.lock_keyboard_delay), (5, 30));
        assert_eq!((event.trigger.as_str(), event.trigger_timer), ("next", 10));
        assert_eq!((event.trigger_script.as_str(), event.msg.as_str()), ("run", "Hi"));
        assert_eq!((event.move_to_x, event.move_to_y, event.level_anchor_id), (-1, -1, 4));
        assert!(world.unsupported_lines.is_empty());

        let text = write(&world, 69);
        assert!(text.ends_with(&format!("\n{line}\n")), "{text}");
    }

    #[test]
    fn test_event_way_encoding() {
        let world = read("SMBXFile69\nWE|a|1///||\nWE|b|10///||\n").unwrap();
        assert!(world.events[0].no_smoke);
        assert_eq!(world.events[0].layers_mode, LayerStateMode::Objects);
        assert!(!world.events[1].no_smoke);
        assert_eq!(world.events[1].layers_mode, LayerStateMode::Objects);
        assert_eq!(world.events[1].move_to_x, -1);
    }

    #[test]
    fn test_config_entries() {
        let entry = decode_config_entry("000140");
        assert_eq!(entry, ConfigEntry { key: 1, value: 64 });
        assert_eq!(encode_config_entry(&entry), "000140");
        assert_eq!(decode_config_entry("00A"), ConfigEntry::default());
        assert_eq!(decode_config_entry("0002"), ConfigEntry { key: 2, value: 0 });
    }
}
