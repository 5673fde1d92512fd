//! Game saves in the legacy SMBX64 dialect (`.sav`).
//!
//! Record order: version, lives, coins, world position, one block per
//! character, music, the completion flag (an unused placeholder record
//! before version 56), three
//! visibility groups, collected stars (version 7 and newer) and the star
//! total (version 21 and newer). Files may stop right after the music
//! record or right before the star total.

use crate::error::Result;
use crate::legacy::{Binding, Field, Group, LegacyReader, LegacyWriter};
use crate::options::{FileFormat, FileMeta};

use super::{CharacterState, GameSave, StarRecord, VisibleItem};

/// Character blocks stored by a document of `version`.
fn character_slots(version: u32) -> usize {
    if version >= 56 {
        5
    } else {
        2
    }
}

/// Reads a legacy game save.
///
/// # Errors
///
/// Fails on the first record that does not convert, or when the version is
/// newer than 64.
pub fn read(text: &str) -> Result<GameSave> {
    let mut reader = LegacyReader::new(text);
    let version = reader.read_version()?;
    let mut save = GameSave {
        meta: FileMeta::new(FileFormat::Smbx64, version),
        characters: Vec::new(),
        ..GameSave::default()
    };

    reader.read_fields(&mut [
        Field::always(Binding::SInt(&mut save.lives)),
        Field::always(Binding::UInt(&mut save.coins)),
        Field::always(Binding::Long(&mut save.world_x)),
        Field::always(Binding::Long(&mut save.world_y)),
    ])?;

    for id in 1..=character_slots(version) {
        let mut state = CharacterState::for_character(id as u32);
        reader.read_fields(&mut character_fields(&mut state))?;
        if version < 10 && state.mount_id > 0 {
            state.mount_type = 1;
        }
        save.characters.push(state);
    }

    reader.read(&mut Binding::UInt(&mut save.music_id))?;

    if !has_more(&mut reader) {
        return Ok(save);
    }
    if version >= 56 {
        reader.read(&mut Binding::Bool(&mut save.game_completed))?;
    } else {
        // Unused record before the visibility groups
        reader.read(&mut Binding::Str(&mut String::new()))?;
    }

    for list in [
        &mut save.visible_levels,
        &mut save.visible_paths,
        &mut save.visible_scenery,
    ] {
        let mut id = 0;
        reader.read_group(Group::LENIENT, |r| {
            id += 1;
            let mut visible = false;
            r.read(&mut Binding::Bool(&mut visible))?;
            list.push(VisibleItem { id, visible });
            Ok(())
        })?;
    }

    if version >= 7 {
        reader.read_group(Group::OPEN_ENDED, |r| {
            let mut star = StarRecord::default();
            r.read_fields(&mut [
                Field::always(Binding::Str(&mut star.level_file)),
                Field::since(16, Binding::SInt(&mut star.section)),
            ])?;
            save.stars.push(star);
            Ok(())
        })?;
    }

    if version >= 21 && has_more(&mut reader) {
        reader.read(&mut Binding::UInt(&mut save.total_stars))?;
    }

    Ok(save)
}

/// Peeks at the next record; the document may stop at a blank record.
fn has_more(reader: &mut LegacyReader<'_>) -> bool {
    matches!(reader.advance(), Some(record) if !record.is_empty())
}

/// Writes a legacy game save of the given version (clamped to 64).
///
/// Characters missing from the save are written in their default state.
#[must_use]
pub fn write(save: &GameSave, version: u32) -> String {
    let mut writer = LegacyWriter::new(version);
    let version = writer.version();

    writer.write_sint(i64::from(save.lives));
    writer.write_uint(u64::from(save.coins));
    writer.write_sint(save.world_x);
    writer.write_sint(save.world_y);

    for id in 1..=character_slots(version) {
        let mut state = save
            .characters
            .get(id - 1)
            .cloned()
            .unwrap_or_else(|| CharacterState::for_character(id as u32));
        writer.write_fields(&character_fields(&mut state));
    }

    writer.write_uint(u64::from(save.music_id));
    writer.write_bool(version >= 56 && save.game_completed);

    for list in [&save.visible_levels, &save.visible_paths, &save.visible_scenery] {
        for item in list {
            writer.write_bool(item.visible);
        }
        writer.write_sentinel();
    }

    if version >= 7 {
        for star in &save.stars {
            writer.write_str(&star.level_file);
            if version >= 16 {
                writer.write_sint(i64::from(star.section));
            }
        }
        writer.write_sentinel();
    }

    if version >= 21 {
        writer.write_uint(u64::from(save.total_stars));
    }

    writer.finish()
}

fn character_fields(state: &mut CharacterState) -> [Field<'_>; 5] {
    [
        Field::always(Binding::UInt(&mut state.state)),
        Field::always(Binding::UInt(&mut state.item)),
        Field::since(10, Binding::UInt(&mut state.mount_type)),
        Field::always(Binding::UInt(&mut state.mount_id)),
        Field::since(56, Binding::UInt(&mut state.health)),
    ]
}
