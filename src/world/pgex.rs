//! World maps in the PGE-X dialect (`.wldx`).
//!
//! Sections read: `HEAD`, `META_BOOKMARKS`, `META_SYS_CRASH`, `TILES`,
//! `SCENERY`, `PATHS`, `MUSICBOXES`, `AREARECTS` and `LEVELS`. Unknown sections and markers are skipped so
//! newer files still open. Markers holding their default value are left out
//! on write, and so are empty sections.

use crate::error::Result;
use crate::options::{FileFormat, FileMeta};
use crate::pgex::{self, records, typed, Document, Item, Section, Value};

use super::{
    AreaRect, Bookmark, CrashData, LevelTile, MapTile, MusicBox, WorldData, DEFAULT_LAYER,
    STARS_UNSPECIFIED,
};

/// Reads a PGE-X world map.
///
/// # Errors
///
/// Structural errors of the document, a known section that degraded to plain
/// text, or a marker whose value does not convert.
pub fn read(text: &str) -> Result<WorldData> {
    let doc = pgex::parse(text)?;
    let mut world = WorldData {
        meta: FileMeta::new(FileFormat::Pgex, 0),
        ..WorldData::default()
    };

    for section in &doc.sections {
        let name = section.name.as_str();
        match name {
            "HEAD" => {
                for item in records(section)? {
                    read_head(&mut world, item)?;
                }
            }
            "META_BOOKMARKS" => {
                for item in records(section)? {
                    world.bookmarks.push(read_bookmark(item, name)?);
                }
            }
            "META_SYS_CRASH" => {
                for item in records(section)? {
                    let crash = world.crash.get_or_insert_with(CrashData::default);
                    read_crash(crash, item, name)?;
                }
            }
            "TILES" | "SCENERY" | "PATHS" => {
                let list = match name {
                    "TILES" => &mut world.tiles,
                    "SCENERY" => &mut world.scenery,
                    _ => &mut world.paths,
                };
                for item in records(section)? {
                    list.push(read_tile(item, name)?);
                }
            }
            "MUSICBOXES" => {
                for item in records(section)? {
                    world.music_boxes.push(read_music_box(item, name)?);
                }
            }
            "AREARECTS" => {
                for item in records(section)? {
                    world.area_rects.push(read_area_rect(item, name)?);
                }
            }
            "LEVELS" => {
                for item in records(section)? {
                    world.levels.push(read_level(item, name)?);
                }
            }
            _ => tracing::debug!("Skipping unknown world section [{}]", name),
        }
    }

    Ok(world)
}

fn read_head(world: &mut WorldData, item: &Item) -> Result<()> {
    const SECTION: &str = "HEAD";
    for v in &item.values {
        match v.marker.as_str() {
            "TL" => world.title = typed(v.as_string(), SECTION, v)?,
            "DC" => world.disabled_characters = typed(v.as_bool_array(), SECTION, v)?,
            "IT" => world.intro_level = typed(v.as_string(), SECTION, v)?,
            "GO" => world.game_over_level = typed(v.as_string(), SECTION, v)?,
            "HB" => world.hub_styled = typed(v.as_bool(), SECTION, v)?,
            "RL" => world.restart_level = typed(v.as_bool(), SECTION, v)?,
            "SZ" => world.stars = typed(v.as_uint(), SECTION, v)?,
            "CD" => world.credits = typed(v.as_string(), SECTION, v)?,
            "CM" => world.credits_music = typed(v.as_string(), SECTION, v)?,
            "SSS" => world.stars_show_policy = typed(v.as_sint(), SECTION, v)?,
            "XTRA" => world.extra = typed(v.as_string(), SECTION, v)?,
            "CPID" => world.config_pack_id = typed(v.as_string(), SECTION, v)?,
            _ => {}
        }
    }
    Ok(())
}

fn read_bookmark(item: &Item, section: &str) -> Result<Bookmark> {
    let mut bookmark = Bookmark::default();
    for v in &item.values {
        match v.marker.as_str() {
            "BM" => bookmark.name = typed(v.as_string(), section, v)?,
            "X" => bookmark.x = typed(v.as_i64(), section, v)? as f64,
            "Y" => bookmark.y = typed(v.as_i64(), section, v)? as f64,
            _ => {}
        }
    }
    Ok(bookmark)
}

fn read_crash(crash: &mut CrashData, item: &Item, section: &str) -> Result<()> {
    for v in &item.values {
        match v.marker.as_str() {
            "UT" => crash.untitled = typed(v.as_bool(), section, v)?,
            "MD" => crash.modified = typed(v.as_bool(), section, v)?,
            "FF" => crash.format_id = typed(v.as_sint(), section, v)?,
            "FV" => crash.format_version = typed(v.as_uint(), section, v)?,
            "N" => crash.filename = typed(v.as_string(), section, v)?,
            "P" => crash.path = typed(v.as_string(), section, v)?,
            "FP" => crash.full_path = typed(v.as_string(), section, v)?,
            _ => {}
        }
    }
    Ok(())
}

fn read_tile(item: &Item, section: &str) -> Result<MapTile> {
    let mut tile = MapTile::default();
    for v in &item.values {
        match v.marker.as_str() {
            "ID" => tile.id = typed(v.as_uint(), section, v)?,
            "X" => tile.x = typed(v.as_i64(), section, v)?,
            "Y" => tile.y = typed(v.as_i64(), section, v)?,
            "XTRA" => tile.extra = typed(v.as_string(), section, v)?,
            _ => {}
        }
    }
    Ok(tile)
}

fn read_music_box(item: &Item, section: &str) -> Result<MusicBox> {
    let mut music = MusicBox::default();
    for v in &item.values {
        match v.marker.as_str() {
            "ID" => music.id = typed(v.as_uint(), section, v)?,
            "X" => music.x = typed(v.as_i64(), section, v)?,
            "Y" => music.y = typed(v.as_i64(), section, v)?,
            "MF" => music.music_file = typed(v.as_string(), section, v)?,
            "XTRA" => music.extra = typed(v.as_string(), section, v)?,
            _ => {}
        }
    }
    Ok(music)
}

fn read_area_rect(item: &Item, section: &str) -> Result<AreaRect> {
    let mut rect = AreaRect::default();
    for v in &item.values {
        match v.marker.as_str() {
            "F" => rect.flags = typed(v.as_uint(), section, v)?,
            "X" => rect.x = typed(v.as_i64(), section, v)?,
            "Y" => rect.y = typed(v.as_i64(), section, v)?,
            "W" => rect.w = typed(v.as_i64(), section, v)?,
            "H" => rect.h = typed(v.as_i64(), section, v)?,
            "MI" => rect.music_id = typed(v.as_uint(), section, v)?,
            "MF" => rect.music_file = typed(v.as_string(), section, v)?,
            "LR" => rect.layer = typed(v.as_string(), section, v)?,
            "EB" => rect.event_break = typed(v.as_string(), section, v)?,
            "EW" => rect.event_warp = typed(v.as_string(), section, v)?,
            "EA" => rect.event_anchor = typed(v.as_string(), section, v)?,
            "ET" => rect.event_touch = typed(v.as_string(), section, v)?,
            "TP" => rect.touch_policy = typed(v.as_uint(), section, v)?,
            "XTRA" => rect.extra = typed(v.as_string(), section, v)?,
            _ => {}
        }
    }
    Ok(rect)
}

fn read_level(item: &Item, section: &str) -> Result<LevelTile> {
    let mut level = LevelTile::default();
    for v in &item.values {
        match v.marker.as_str() {
            "ID" => level.id = typed(v.as_uint(), section, v)?,
            "X" => level.x = typed(v.as_i64(), section, v)?,
            "Y" => level.y = typed(v.as_i64(), section, v)?,
            "LT" => level.title = typed(v.as_string(), section, v)?,
            "LF" => level.file = typed(v.as_string(), section, v)?,
            "EI" => level.entrance_warp = typed(v.as_uint(), section, v)?,
            "EL" => level.exit_left.code = typed(v.as_sint(), section, v)?,
            "ET" => level.exit_top.code = typed(v.as_sint(), section, v)?,
            "ER" => level.exit_right.code = typed(v.as_sint(), section, v)?,
            "EB" => level.exit_bottom.code = typed(v.as_sint(), section, v)?,
            "WX" => level.goto_x = typed(v.as_i64(), section, v)?,
            "WY" => level.goto_y = typed(v.as_i64(), section, v)?,
            "AV" => level.always_visible = typed(v.as_bool(), section, v)?,
            "SP" => level.game_start = typed(v.as_bool(), section, v)?,
            "BP" => level.path_bg = typed(v.as_bool(), section, v)?,
            "BG" => level.big_path_bg = typed(v.as_bool(), section, v)?,
            "SSS" => level.stars_show_policy = typed(v.as_sint(), section, v)?,
            "XTRA" => level.extra = typed(v.as_string(), section, v)?,
            _ => {}
        }
    }
    Ok(level)
}

/// Writes a PGE-X world map.
#[must_use]
pub fn write(world: &WorldData) -> String {
    let mut doc = Document::new();

    let head = head_item(world);
    if !head.is_empty() {
        let mut section = Section::new("HEAD");
        section.push_item(head);
        doc.push(section);
    }
    push_section(&mut doc, "META_BOOKMARKS", &world.bookmarks, bookmark_item);
    if let Some(crash) = &world.crash {
        let mut section = Section::new("META_SYS_CRASH");
        section.push_item(crash_item(crash));
        doc.push(section);
    }
    push_section(&mut doc, "TILES", &world.tiles, tile_item);
    push_section(&mut doc, "SCENERY", &world.scenery, tile_item);
    push_section(&mut doc, "PATHS", &world.paths, tile_item);
    push_section(&mut doc, "MUSICBOXES", &world.music_boxes, music_box_item);
    push_section(&mut doc, "AREARECTS", &world.area_rects, area_rect_item);
    push_section(&mut doc, "LEVELS", &world.levels, level_item);

    pgex::write(&doc)
}

fn push_section<T>(doc: &mut Document, name: &str, elements: &[T], to_item: fn(&T) -> Item) {
    if elements.is_empty() {
        return;
    }
    let mut section = Section::new(name);
    for element in elements {
        section.push_item(to_item(element));
    }
    doc.push(section);
}

/// Pushes a string value unless it is empty.
fn push_str(item: &mut Item, marker: &str, text: &str) {
    if !text.is_empty() {
        item.push(Value::string(marker, text));
    }
}

fn head_item(world: &WorldData) -> Item {
    let mut item = Item::new();
    push_str(&mut item, "TL", &world.title);
    if world.disabled_characters.contains(&true) {
        item.push(Value::bool_array("DC", &world.disabled_characters));
    }
    push_str(&mut item, "IT", &world.intro_level);
    push_str(&mut item, "GO", &world.game_over_level);
    if world.hub_styled {
        item.push(Value::bool("HB", true));
    }
    if world.restart_level {
        item.push(Value::bool("RL", true));
    }
    if world.stars > 0 {
        item.push(Value::number("SZ", world.stars));
    }
    push_str(&mut item, "CD", &world.credits);
    push_str(&mut item, "CM", &world.credits_music);
    if world.stars_show_policy != STARS_UNSPECIFIED {
        item.push(Value::number("SSS", world.stars_show_policy));
    }
    push_str(&mut item, "XTRA", &world.extra);
    push_str(&mut item, "CPID", &world.config_pack_id);
    item
}

fn bookmark_item(bookmark: &Bookmark) -> Item {
    let mut item = Item::new();
    item.push(Value::string("BM", &bookmark.name));
    item.push(Value::number("X", bookmark.x.round() as i64));
    item.push(Value::number("Y", bookmark.y.round() as i64));
    item
}

fn crash_item(crash: &CrashData) -> Item {
    let mut item = Item::new();
    item.push(Value::bool("UT", crash.untitled));
    item.push(Value::bool("MD", crash.modified));
    item.push(Value::number("FF", crash.format_id));
    item.push(Value::number("FV", crash.format_version));
    item.push(Value::string("N", &crash.filename));
    item.push(Value::string("P", &crash.path));
    item.push(Value::string("FP", &crash.full_path));
    item
}

fn tile_item(tile: &MapTile) -> Item {
    let mut item = Item::new();
    item.push(Value::number("ID", tile.id));
    item.push(Value::number("X", tile.x));
    item.push(Value::number("Y", tile.y));
    push_str(&mut item, "XTRA", &tile.extra);
    item
}

fn music_box_item(music: &MusicBox) -> Item {
    let mut item = Item::new();
    item.push(Value::number("ID", music.id));
    item.push(Value::number("X", music.x));
    item.push(Value::number("Y", music.y));
    push_str(&mut item, "MF", &music.music_file);
    push_str(&mut item, "XTRA", &music.extra);
    item
}

fn area_rect_item(rect: &AreaRect) -> Item {
    let mut item = Item::new();
    item.push(Value::number("F", rect.flags));
    item.push(Value::number("X", rect.x));
    item.push(Value::number("Y", rect.y));
    item.push(Value::number("W", rect.w));
    item.push(Value::number("H", rect.h));
    if rect.music_id != 0 {
        item.push(Value::number("MI", rect.music_id));
    }
    push_str(&mut item, "MF", &rect.music_file);
    if rect.layer != DEFAULT_LAYER {
        push_str(&mut item, "LR", &rect.layer);
    }
    push_str(&mut item, "EB", &rect.event_break);
    push_str(&mut item, "EW", &rect.event_warp);
    push_str(&mut item, "EA", &rect.event_anchor);
    push_str(&mut item, "ET", &rect.event_touch);
    if rect.touch_policy != 0 {
        item.push(Value::number("TP", rect.touch_policy));
    }
    push_str(&mut item, "XTRA", &rect.extra);
    item
}

fn level_item(level: &LevelTile) -> Item {
    let mut item = Item::new();
    item.push(Value::number("ID", level.id));
    item.push(Value::number("X", level.x));
    item.push(Value::number("Y", level.y));
    push_str(&mut item, "LT", &level.title);
    push_str(&mut item, "LF", &level.file);
    if level.entrance_warp != 0 {
        item.push(Value::number("EI", level.entrance_warp));
    }
    for (marker, exit) in [
        ("EL", &level.exit_left),
        ("ET", &level.exit_top),
        ("ER", &level.exit_right),
        ("EB", &level.exit_bottom),
    ] {
        if exit.code != -1 {
            item.push(Value::number(marker, exit.code));
        }
    }
    if level.goto_x != -1 {
        item.push(Value::number("WX", level.goto_x));
    }
    if level.goto_y != -1 {
        item.push(Value::number("WY", level.goto_y));
    }
    for (marker, flag) in [
        ("AV", level.always_visible),
        ("SP", level.game_start),
        ("BP", level.path_bg),
        ("BG", level.big_path_bg),
    ] {
        if flag {
            item.push(Value::bool(marker, true));
        }
    }
    if level.stars_show_policy != STARS_UNSPECIFIED {
        item.push(Value::number("SSS", level.stars_show_policy));
    }
    push_str(&mut item, "XTRA", &level.extra);
    item
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_roundtrip() {
        let mut world = WorldData {
            title: "Islands; \"big\" ones".to_string(),
            disabled_characters: vec![false, true],
            hub_styled: true,
            stars: 40,
            credits: "Me\nYou".to_string(),
            stars_show_policy: 2,
            ..WorldData::default()
        };
        world.scenery.push(MapTile {
            id: 9,
            x: -32,
            y: 64,
            extra: "{\"a\":1}".to_string(),
            ..MapTile::default()
        });
        world.music_boxes.push(MusicBox {
            id: 3,
            music_file: "theme.ogg".to_string(),
            ..MusicBox::default()
        });
        world.area_rects.push(AreaRect {
            x: 16,
            w: 64,
            flags: 3,
            layer: "Doors".to_string(),
            event_touch: "open".to_string(),
            touch_policy: 1,
            ..AreaRect::default()
        });
        let mut level = LevelTile {
            id: 5,
            file: "castle.lvlx".to_string(),
            game_start: true,
            goto_x: 128,
            ..LevelTile::default()
        };
        level.exit_right.code = 1;
        world.levels.push(level);

        let text = write(&world);
        let mut back = read(&text).unwrap();
        back.meta = world.meta;
        assert_eq!(back, world);
    }

    #[test]
    fn test_defaults_are_omitted() {
        let mut world = WorldData::default();
        world.levels.push(LevelTile {
            id: 1,
            ..LevelTile::default()
        });
        assert_eq!(write(&world), "LEVELS\nID:1;X:0;Y:0;\nLEVELS_END\n");
    }

    #[test]
    fn test_empty_world_writes_nothing() {
        assert_eq!(write(&WorldData::default()), "");
    }

    #[test]
    fn test_unknown_sections_and_markers_are_skipped() {
        let text = "META_SCRIPTS\nID:1;\nMETA_SCRIPTS_END\nTILES\nID:2;X:4;Y:8;ZZ:1;\nTILES_END\n";
        let world = read(text).unwrap();
        assert_eq!(world.tiles.len(), 1);
        assert_eq!(world.tiles[0].id, 2);
        assert_eq!(world.meta.format, FileFormat::Pgex);
    }

    #[test]
    fn test_editor_metadata() {
        let world = WorldData {
            config_pack_id: "SMBX2".to_string(),
            bookmarks: vec![Bookmark {
                name: "Castle".to_string(),
                x: 64.6,
                y: -32.0,
            }],
            crash: Some(CrashData {
                modified: true,
                format_id: 1,
                format_version: 64,
                filename: "world".to_string(),
                full_path: "/eps/world.wld".to_string(),
                ..CrashData::default()
            }),
            ..WorldData::default()
        };
        let text = write(&world);
        assert_eq!(
            text,
            "HEAD\nCPID:\"SMBX2\";\nHEAD_END\n\
             META_BOOKMARKS\nBM:\"Castle\";X:65;Y:-32;\nMETA_BOOKMARKS_END\n\
             META_SYS_CRASH\nUT:0;MD:1;FF:1;FV:64;N:\"world\";P:\"\";FP:\"/eps/world.wld\";\nMETA_SYS_CRASH_END\n"
        );

        let back = read(&text).unwrap();
        assert_eq!(back.config_pack_id, "SMBX2");
        assert_eq!(back.bookmarks[0].x, 65.0);
        assert_eq!(back.crash, world.crash);
    }

    #[test]
    fn test_crash_data_only_from_its_section() {
        assert_eq!(read("TILES\nTILES_END\n").unwrap().crash, None);
        let world = read("META_SYS_CRASH\nUT:1;\nMETA_SYS_CRASH_END\n").unwrap();
        assert!(world.crash.unwrap().untitled);
    }

    #[test]
    fn test_degraded_known_section_is_rejected() {
        let err = read("TILES\nID:2\nTILES_END\n").unwrap_err();
        assert!(matches!(err, Error::SectionSyntax { ref section, .. } if section == "TILES"));
    }

    #[test]
    fn test_bad_marker_value() {
        let err = read("HEAD\nSZ:-4;\nHEAD_END\n").unwrap_err();
        assert!(err.to_string().contains("SZ"));
    }
}
