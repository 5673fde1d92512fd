//! World maps in the legacy SMBX64 dialect (`.wld`).

use crate::error::Result;
use crate::legacy::{Binding, Field, Group, LegacyReader, LegacyWriter};
use crate::options::{FileFormat, FileMeta};

use super::{LevelTile, MapTile, MusicBox, WorldData};

/// Number of author records in the header.
const AUTHOR_SLOTS: usize = 5;

/// Reads a legacy world map.
///
/// # Errors
///
/// Fails on the first record that does not convert, or when the version is
/// newer than 64.
pub fn read(text: &str) -> Result<WorldData> {
    let mut reader = LegacyReader::new(text);
    let version = reader.read_version()?;
    let mut world = WorldData {
        meta: FileMeta::new(FileFormat::Smbx64, version),
        ..WorldData::default()
    };

    let mut disabled = [false; 5];
    let mut authors: [String; AUTHOR_SLOTS] = Default::default();
    {
        let [c1, c2, c3, c4, c5] = &mut disabled;
        let [a1, a2, a3, a4, a5] = &mut authors;
        reader.read_fields(&mut [
            Field::always(Binding::Str(&mut world.title)),
            Field::since(55, Binding::Bool(c1)),
            Field::since(55, Binding::Bool(c2)),
            Field::since(55, Binding::Bool(c3)),
            Field::since(55, Binding::Bool(c4)),
            Field::since(56, Binding::Bool(c5)),
            Field::since(3, Binding::Str(&mut world.intro_level)),
            Field::since(3, Binding::Bool(&mut world.hub_styled)),
            Field::since(3, Binding::Bool(&mut world.restart_level)),
            Field::since(20, Binding::UInt(&mut world.stars)),
            Field::since(17, Binding::Str(a1)),
            Field::since(17, Binding::Str(a2)),
            Field::since(17, Binding::Str(a3)),
            Field::since(17, Binding::Str(a4)),
            Field::since(17, Binding::Str(a5)),
        ])?;
    }
    if version >= 55 {
        world.disabled_characters = disabled.to_vec();
    }
    world.credits = authors
        .iter()
        .filter(|a| !a.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join("\n");

    for list in [&mut world.tiles, &mut world.scenery, &mut world.paths] {
        reader.read_group(Group::LENIENT, |r| {
            let mut tile = MapTile::default();
            r.read_fields(&mut tile_fields(&mut tile))?;
            list.push(tile);
            Ok(())
        })?;
    }

    reader.read_group(Group::LENIENT, |r| {
        let mut level = LevelTile::default();
        r.read_fields(&mut level_fields(&mut level))?;
        if version < 22 && level.id == 1 {
            level.game_start = true;
        }
        world.levels.push(level);
        Ok(())
    })?;

    reader.read_group(Group::OPEN_ENDED, |r| {
        let mut music = MusicBox::default();
        r.read_fields(&mut [
            Field::always(Binding::Coord(&mut music.x)),
            Field::always(Binding::Coord(&mut music.y)),
            Field::always(Binding::UInt(&mut music.id)),
        ])?;
        world.music_boxes.push(music);
        Ok(())
    })?;

    Ok(world)
}

/// Writes a legacy world map of the given version (clamped to 64).
#[must_use]
pub fn write(world: &WorldData, version: u32) -> String {
    let mut writer = LegacyWriter::new(version);

    let mut title = world.title.clone();
    let mut disabled: [bool; 5] = std::array::from_fn(|i| world.character_disabled(i));
    let mut intro = world.intro_level.clone();
    let (mut hub, mut restart, mut stars) = (world.hub_styled, world.restart_level, world.stars);
    let mut authors: [String; AUTHOR_SLOTS] = Default::default();
    for (slot, author) in authors.iter_mut().zip(world.credits.split('\n')) {
        *slot = author.to_string();
    }
    {
        let [c1, c2, c3, c4, c5] = &mut disabled;
        let [a1, a2, a3, a4, a5] = &mut authors;
        writer.write_fields(&[
            Field::always(Binding::Str(&mut title)),
            Field::since(55, Binding::Bool(c1)),
            Field::since(55, Binding::Bool(c2)),
            Field::since(55, Binding::Bool(c3)),
            Field::since(55, Binding::Bool(c4)),
            Field::since(56, Binding::Bool(c5)),
            Field::since(3, Binding::Str(&mut intro)),
            Field::since(3, Binding::Bool(&mut hub)),
            Field::since(3, Binding::Bool(&mut restart)),
            Field::since(20, Binding::UInt(&mut stars)),
            Field::since(17, Binding::Str(a1)),
            Field::since(17, Binding::Str(a2)),
            Field::since(17, Binding::Str(a3)),
            Field::since(17, Binding::Str(a4)),
            Field::since(17, Binding::Str(a5)),
        ]);
    }

    for list in [&world.tiles, &world.scenery, &world.paths] {
        for tile in list {
            writer.write_fields(&tile_fields(&mut tile.clone()));
        }
        writer.write_sentinel();
    }

    for level in &world.levels {
        writer.write_fields(&level_fields(&mut level.clone()));
    }
    writer.write_sentinel();

    for music in &world.music_boxes {
        writer.write_sint(music.x);
        writer.write_sint(music.y);
        writer.write_uint(u64::from(music.id));
    }
    writer.write_sentinel();

    writer.finish()
}

fn tile_fields(tile: &mut MapTile) -> [Field<'_>; 3] {
    [
        Field::always(Binding::Coord(&mut tile.x)),
        Field::always(Binding::Coord(&mut tile.y)),
        Field::always(Binding::UInt(&mut tile.id)),
    ]
}

fn level_fields(level: &mut LevelTile) -> Vec<Field<'_>> {
    vec![
        Field::always(Binding::Coord(&mut level.x)),
        Field::always(Binding::Coord(&mut level.y)),
        Field::always(Binding::UInt(&mut level.id)),
        Field::always(Binding::Str(&mut level.file)),
        Field::always(Binding::Str(&mut level.title)),
        Field::always(Binding::SInt(&mut level.exit_top.code)),
        Field::always(Binding::SInt(&mut level.exit_left.code)),
        Field::always(Binding::SInt(&mut level.exit_bottom.code)),
        Field::always(Binding::SInt(&mut level.exit_right.code)),
        Field::since(4, Binding::UInt(&mut level.entrance_warp)),
        Field::since(22, Binding::Bool(&mut level.always_visible)),
        Field::since(22, Binding::Bool(&mut level.path_bg)),
        Field::since(22, Binding::Bool(&mut level.game_start)),
        Field::since(22, Binding::Long(&mut level.goto_x)),
        Field::since(22, Binding::Long(&mut level.goto_y)),
        Field::since(22, Binding::Bool(&mut level.big_path_bg)),
    ]
}
