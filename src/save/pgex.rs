//! Game saves in the PGE-X dialect (`.savx`).

use crate::error::{Error, Result};
use crate::escape::{escape, unescape};
use crate::options::{FileFormat, FileMeta};
use crate::pgex::{self, records, typed, Document, Item, Section, Value};

use super::{
    CharacterState, GameSave, LevelInfo, StarRecord, UserData, VisibleItem, DATA_LOCATION_MASK,
    DEFAULT_BANK,
};

/// Stand-in for `=` inside user data keys and values.
const EQUALS_ESCAPE: &str = "\\q";

/// Reads a PGE-X game save.
///
/// # Errors
///
/// Structural errors of the document, a marker whose value does not
/// convert, or a user data entry without a `=` separator.
pub fn read(text: &str) -> Result<GameSave> {
    let doc = pgex::parse(text)?;
    let mut save = GameSave {
        meta: FileMeta::new(FileFormat::Pgex, 0),
        characters: Vec::new(),
        current_characters: Vec::new(),
        ..GameSave::default()
    };

    for section in &doc.sections {
        let name = section.name.as_str();
        match name {
            "SAVE_HEADER" => {
                for item in records(section)? {
                    read_header(&mut save, item)?;
                }
            }
            "CHARACTERS" => {
                for item in records(section)? {
                    save.characters.push(read_character(item)?);
                }
            }
            "CHARACTERS_PER_PLAYERS" => {
                for item in records(section)? {
                    let mut id = 0;
                    if let Some(v) = item.get("ID") {
                        id = typed(v.as_uint(), name, v)?;
                    }
                    save.current_characters.push(id);
                }
            }
            "VIZ_LEVELS" | "VIZ_PATHS" | "VIZ_SCENERY" => {
                let list = match name {
                    "VIZ_LEVELS" => &mut save.visible_levels,
                    "VIZ_PATHS" => &mut save.visible_paths,
                    _ => &mut save.visible_scenery,
                };
                for item in records(section)? {
                    list.push(read_visible(item, name)?);
                }
            }
            "STARS" => {
                for item in records(section)? {
                    save.stars.push(read_star(item)?);
                }
            }
            "LEVEL_INFO" => {
                for item in records(section)? {
                    save.level_info.push(read_level_info(item)?);
                }
            }
            "USERDATA" => {
                for item in records(section)? {
                    save.user_data.push(read_user_data(item)?);
                }
            }
            _ => tracing::debug!("Skipping unknown save section [{}]", name),
        }
    }

    Ok(save)
}

fn read_header(save: &mut GameSave, item: &Item) -> Result<()> {
    const SECTION: &str = "SAVE_HEADER";
    for v in &item.values {
        match v.marker.as_str() {
            "LV" => save.lives = typed(v.as_sint(), SECTION, v)?,
            "CN" => save.coins = typed(v.as_uint(), SECTION, v)?,
            "PT" => save.points = typed(v.as_uint(), SECTION, v)?,
            "TS" => save.total_stars = typed(v.as_uint(), SECTION, v)?,
            "WX" => save.world_x = typed(v.as_i64(), SECTION, v)?,
            "WY" => save.world_y = typed(v.as_i64(), SECTION, v)?,
            "HW" => save.last_hub_warp = typed(v.as_uint(), SECTION, v)?,
            "MI" => save.music_id = typed(v.as_uint(), SECTION, v)?,
            "MF" => save.music_file = typed(v.as_string(), SECTION, v)?,
            "GC" => save.game_completed = typed(v.as_bool(), SECTION, v)?,
            _ => {}
        }
    }
    Ok(())
}

fn read_character(item: &Item) -> Result<CharacterState> {
    const SECTION: &str = "CHARACTERS";
    let mut state = CharacterState::default();
    for v in &item.values {
        match v.marker.as_str() {
            "ID" => state.id = typed(v.as_uint(), SECTION, v)?,
            "ST" => state.state = typed(v.as_uint(), SECTION, v)?,
            "IT" => state.item = typed(v.as_uint(), SECTION, v)?,
            "MT" => state.mount_type = typed(v.as_uint(), SECTION, v)?,
            "MI" => state.mount_id = typed(v.as_uint(), SECTION, v)?,
            "HL" => state.health = typed(v.as_uint(), SECTION, v)?,
            _ => {}
        }
    }
    Ok(state)
}

fn read_visible(item: &Item, section: &str) -> Result<VisibleItem> {
    let mut visible = VisibleItem::default();
    for v in &item.values {
        match v.marker.as_str() {
            "ID" => visible.id = typed(v.as_uint(), section, v)?,
            "V" => visible.visible = typed(v.as_bool(), section, v)?,
            _ => {}
        }
    }
    Ok(visible)
}

fn read_star(item: &Item) -> Result<StarRecord> {
    const SECTION: &str = "STARS";
    let mut star = StarRecord::default();
    for v in &item.values {
        match v.marker.as_str() {
            "L" => star.level_file = typed(v.as_string(), SECTION, v)?,
            "S" => star.section = typed(v.as_sint(), SECTION, v)?,
            _ => {}
        }
    }
    Ok(star)
}

fn read_level_info(item: &Item) -> Result<LevelInfo> {
    const SECTION: &str = "LEVEL_INFO";
    let mut info = LevelInfo::default();
    for v in &item.values {
        match v.marker.as_str() {
            "L" => info.level_file = typed(v.as_string(), SECTION, v)?,
            "S" => info.max_stars = typed(v.as_uint(), SECTION, v)?,
            "M" => info.max_medals = typed(v.as_uint(), SECTION, v)?,
            "MG" => info.medals_got = typed(v.as_bool_array(), SECTION, v)?,
            "MB" => info.medals_best = typed(v.as_bool_array(), SECTION, v)?,
            _ => {}
        }
    }
    Ok(info)
}

fn read_user_data(item: &Item) -> Result<UserData> {
    const SECTION: &str = "USERDATA";
    let mut bank = UserData::default();
    let mut entries = Vec::new();
    for v in &item.values {
        match v.marker.as_str() {
            "L" => bank.location = typed(v.as_sint(), SECTION, v)?,
            "SN" => bank.name = typed(v.as_string(), SECTION, v)?,
            "LN" => bank.location_name = typed(v.as_string(), SECTION, v)?,
            "D" => entries = typed(v.as_string_array(), SECTION, v)?,
            _ => {}
        }
    }

    for entry in &entries {
        let mut parts = entry.split('=');
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            return Err(Error::section_syntax(
                SECTION,
                &format!("user data entry {entry:?} has no '=' separator"),
            ));
        };
        bank.data.insert(decode_data_part(key), decode_data_part(value));
    }
    Ok(bank)
}

fn decode_data_part(part: &str) -> String {
    unescape(part, true).replace(EQUALS_ESCAPE, "=")
}

fn encode_data_part(part: &str) -> String {
    escape(&part.replace('=', EQUALS_ESCAPE), true)
}

/// Writes a PGE-X game save.
///
/// The header is always present. Other sections are left out when empty,
/// and volatile user data banks are never written.
#[must_use]
pub fn write(save: &GameSave) -> String {
    let mut doc = Document::new();

    let mut header = Section::new("SAVE_HEADER");
    header.push_item(header_item(save));
    doc.push(header);

    push_section(&mut doc, "CHARACTERS", &save.characters, character_item);
    push_section(
        &mut doc,
        "CHARACTERS_PER_PLAYERS",
        &save.current_characters,
        |id| {
            let mut item = Item::new();
            item.push(Value::number("ID", id));
            item
        },
    );
    push_section(&mut doc, "VIZ_LEVELS", &save.visible_levels, visible_item);
    push_section(&mut doc, "VIZ_PATHS", &save.visible_paths, visible_item);
    push_section(&mut doc, "VIZ_SCENERY", &save.visible_scenery, visible_item);
    push_section(&mut doc, "STARS", &save.stars, |star| {
        let mut item = Item::new();
        item.push(Value::string("L", &star.level_file));
        item.push(Value::number("S", star.section));
        item
    });
    push_section(&mut doc, "LEVEL_INFO", &save.level_info, level_info_item);

    let stored: Vec<&UserData> = save.user_data.iter().filter(|b| !b.is_volatile()).collect();
    push_section(&mut doc, "USERDATA", &stored, |bank| user_data_item(bank));

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

fn header_item(save: &GameSave) -> Item {
    let mut item = Item::new();
    item.push(Value::number("LV", save.lives));
    item.push(Value::number("CN", save.coins));
    item.push(Value::number("PT", save.points));
    item.push(Value::number("TS", save.total_stars));
    item.push(Value::number("WX", save.world_x));
    item.push(Value::number("WY", save.world_y));
    item.push(Value::number("HW", save.last_hub_warp));
    item.push(Value::number("MI", save.music_id));
    item.push(Value::string("MF", &save.music_file));
    item.push(Value::bool("GC", save.game_completed));
    item
}

fn character_item(state: &CharacterState) -> Item {
    let mut item = Item::new();
    item.push(Value::number("ID", state.id));
    item.push(Value::number("ST", state.state));
    item.push(Value::number("IT", state.item));
    item.push(Value::number("MT", state.mount_type));
    item.push(Value::number("MI", state.mount_id));
    item.push(Value::number("HL", state.health));
    item
}

fn visible_item(visible: &VisibleItem) -> Item {
    let mut item = Item::new();
    item.push(Value::number("ID", visible.id));
    item.push(Value::bool("V", visible.visible));
    item
}

fn level_info_item(info: &LevelInfo) -> Item {
    let mut item = Item::new();
    item.push(Value::string("L", &info.level_file));
    item.push(Value::number("S", info.max_stars));
    item.push(Value::number("M", info.max_medals));
    if !info.medals_got.is_empty() {
        item.push(Value::bool_array("MG", &info.medals_got));
    }
    if !info.medals_best.is_empty() {
        item.push(Value::bool_array("MB", &info.medals_best));
    }
    item
}

fn user_data_item(bank: &UserData) -> Item {
    let mut item = Item::new();
    item.push(Value::number("L", bank.location & DATA_LOCATION_MASK));
    if !bank.name.is_empty() && bank.name != DEFAULT_BANK {
        item.push(Value::string("SN", &bank.name));
    }
    if !bank.location_name.is_empty() {
        item.push(Value::string("LN", &bank.location_name));
    }
    let entries: Vec<String> = bank
        .data
        .iter()
        .map(|(key, value)| format!("{}={}", encode_data_part(key), encode_data_part(value)))
        .collect();
    if !entries.is_empty() {
        item.push(Value::string_array("D", &entries));
    }
    item
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::save::{DATA_GLOBAL, DATA_LEVEL, DATA_VOLATILE};
    use pretty_assertions::assert_eq;

    fn sample() -> GameSave {
        let mut save = GameSave {
            lives: 4,
            coins: 12,
            points: 5000,
            total_stars: 3,
            world_x: 64,
            world_y: -32,
            last_hub_warp: 2,
            music_file: "map.ogg".to_string(),
            game_completed: true,
            current_characters: vec![1, 2],
            ..GameSave::default()
        };
        save.characters.push(CharacterState {
            id: 2,
            state: 4,
            item: 9,
            ..CharacterState::default()
        });
        save.visible_paths.push(VisibleItem { id: 3, visible: true });
        save.stars.push(StarRecord {
            level_file: "lake.lvlx".to_string(),
            section: -1,
        });
        save.level_info.push(LevelInfo {
            level_file: "lake.lvlx".to_string(),
            max_stars: 3,
            max_medals: 2,
            medals_got: vec![true, false],
            medals_best: Vec::new(),
        });
        let mut bank = UserData {
            location: DATA_LEVEL,
            location_name: "lake.lvlx".to_string(),
            name: "scores".to_string(),
            ..UserData::default()
        };
        bank.data.insert("best=time".to_string(), "1:20; \"fast\"".to_string());
        bank.data.insert("tries".to_string(), "7".to_string());
        save.user_data.push(bank);
        save
    }

    #[test]
    fn test_roundtrip() {
        let save = sample();
        let text = write(&save);
        let mut back = read(&text).unwrap();
        back.meta = save.meta;
        assert_eq!(back, save);
    }

    #[test]
    fn test_header_is_always_written() {
        let save = GameSave {
            characters: Vec::new(),
            current_characters: Vec::new(),
            ..GameSave::default()
        };
        assert_eq!(
            write(&save),
            "SAVE_HEADER\nLV:3;CN:0;PT:0;TS:0;WX:0;WY:0;HW:0;MI:0;MF:\"\";GC:0;\nSAVE_HEADER_END\n"
        );
    }

    #[test]
    fn test_volatile_banks_are_not_written() {
        let mut save = GameSave::default();
        save.user_data.push(UserData {
            location: DATA_GLOBAL | DATA_VOLATILE,
            ..UserData::default()
        });
        let text = write(&save);
        assert!(!text.contains("USERDATA"));

        save.user_data.push(UserData {
            location: DATA_GLOBAL,
            ..UserData::default()
        });
        let back = read(&write(&save)).unwrap();
        assert_eq!(back.user_data.len(), 1);
        assert_eq!(back.user_data[0].location, DATA_GLOBAL);
        assert_eq!(back.user_data[0].name, DEFAULT_BANK);
    }

    #[test]
    fn test_user_data_entry_without_separator() {
        let text = "USERDATA\nL:0;D:[\"\\\"key\\\"\"];\nUSERDATA_END\n";
        let err = read(text).unwrap_err();
        assert!(matches!(err, Error::SectionSyntax { .. }));
    }

    #[test]
    fn test_unknown_sections_are_skipped() {
        let text = "SAVE_HEADER\nLV:7;NEW:1;\nSAVE_HEADER_END\nFUTURE\nX:1;\nFUTURE_END\n";
        let save = read(text).unwrap();
        assert_eq!(save.lives, 7);
        assert!(save.characters.is_empty());
    }
}
