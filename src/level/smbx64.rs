//! Levels in the legacy SMBX64 dialect (`.lvl`).
//!
//! Record order: version, star count (version 17 and newer), title (60 and
//! newer), the sections (6 before version 8, then 21), two player start
//! points, then the groups of blocks, background objects, NPCs and warps.
//! Version 29 adds a group of water areas and version 10 adds the layer and
//! event groups. Every group but the last one closes with `"next"`; before
//! version 10 the warp group runs to the end of the document instead.

use crate::error::Result;
use crate::legacy::{Binding, Field, Group, LegacyReader, LegacyWriter};
use crate::options::{FileFormat, FileMeta};

use super::{
    Bgo, Block, HeldKeys, LevelData, LevelEvent, LevelLayer, LevelSection, Npc, PhysEnv,
    PlayerPoint, SectionSettings, Warp, SECTION_COUNT,
};

/// Groups that must close with the sentinel in every version.
const CLOSED: Group = Group::strict_since(0);

/// Block contents renumbered in version 18, as `(before, after)` stored ids.
const RENUMBERED_CONTENTS: [(i64, i64); 5] = [
    (100, 1009),
    (101, 1001),
    (102, 1014),
    (103, 1034),
    (104, 1035),
];

/// Written for every section an event has no settings for.
const UNUSED_SECTION_SETS: SectionSettings = SectionSettings {
    music_id: 0,
    background_id: 0,
    position_left: 0,
    position_top: -1,
    position_bottom: -1,
    position_right: -1,
};

/// Sections stored by a document of `version`.
fn section_count(version: u32) -> usize {
    if version >= 8 {
        SECTION_COUNT
    } else {
        6
    }
}

fn warp_group(version: u32) -> Group {
    Group {
        blank_ends: version < 10,
        ..Group::strict_since(10)
    }
}

/// Converts stored block contents to an NPC id or a negated coin count.
fn contents_from_file(stored: i64) -> i64 {
    let stored = RENUMBERED_CONTENTS
        .iter()
        .find(|(before, _)| *before == stored)
        .map_or(stored, |(_, after)| *after);
    match stored {
        0 => 0,
        id if id > 1000 => id - 1000,
        coins => -coins,
    }
}

fn contents_to_file(npc_id: i64, version: u32) -> i64 {
    if npc_id < 0 {
        return (-npc_id).min(99);
    }
    if npc_id == 0 {
        return 0;
    }
    let stored = npc_id + 1000;
    if version < 18 {
        if let Some((before, _)) = RENUMBERED_CONTENTS.iter().find(|(_, after)| *after == stored) {
            return *before;
        }
    }
    stored
}

/// NPC types followed by one extra setting record.
fn has_special_data(id: u32, version: u32) -> bool {
    match id {
        76 => version >= 15,
        28 => version >= 31,
        121..=124 | 161 | 176 | 177 | 243 | 244 | 229 | 230 | 232..=234 | 236 | 260 | 288 | 289 => {
            true
        }
        _ => false,
    }
}

fn is_container(id: u32) -> bool {
    matches!(id, 91 | 96 | 283 | 284)
}

/// Reads a legacy level.
///
/// # Errors
///
/// Fails on the first record that does not convert, when a group ends
/// without its sentinel, or when the version is newer than 64.
pub fn read(text: &str) -> Result<LevelData> {
    let mut reader = LegacyReader::new(text);
    let version = reader.read_version()?;
    let mut level = LevelData {
        meta: FileMeta::new(FileFormat::Smbx64, version),
        ..LevelData::default()
    };

    reader.read_fields(&mut [
        Field::since(17, Binding::UInt(&mut level.stars)),
        Field::since(60, Binding::Str(&mut level.title)),
    ])?;

    for section in level.sections.iter_mut().take(section_count(version)) {
        reader.read_fields(&mut section_fields(section))?;
    }

    for id in 1..=2 {
        let mut point = PlayerPoint {
            id,
            ..PlayerPoint::default()
        };
        reader.read_fields(&mut point_fields(&mut point))?;
        // A point with any zero coordinate or size was never placed
        if point.x != 0 && point.y != 0 && point.w != 0 && point.h != 0 {
            level.players.push(point);
        }
    }

    reader.read_group(CLOSED, |r| {
        let mut block = Block::default();
        let mut contents = 0;
        r.read_fields(&mut block_fields(&mut block, &mut contents))?;
        block.npc_id = contents_from_file(contents);
        level.blocks.push(block);
        Ok(())
    })?;

    reader.read_group(CLOSED, |r| {
        let mut bgo = Bgo::default();
        r.read_fields(&mut bgo_fields(&mut bgo))?;
        // SMBX 1.0 drew this one above the players
        bgo.foreground = version < 10 && bgo.id == 65;
        level.bgo.push(bgo);
        Ok(())
    })?;

    reader.read_group(CLOSED, |r| {
        level.npcs.push(read_npc(r, version)?);
        Ok(())
    })?;

    reader.read_group(warp_group(version), |r| {
        let mut warp = Warp::default();
        r.read_fields(&mut warp_fields(&mut warp))?;
        warp.is_set_in = !warp.level_entrance;
        warp.is_set_out = !warp.level_exit || warp.level_entrance;
        level.warps.push(warp);
        Ok(())
    })?;

    if version >= 29 {
        reader.read_group(CLOSED, |r| {
            let mut env = PhysEnv::default();
            r.read_fields(&mut phys_env_fields(&mut env))?;
            level.phys_envs.push(env);
            Ok(())
        })?;
    }

    if version >= 10 {
        reader.read_group(Group::OPEN_ENDED, |r| {
            let mut layer = LevelLayer::default();
            r.read_fields(&mut [
                Field::always(Binding::Str(&mut layer.name)),
                Field::always(Binding::Bool(&mut layer.hidden)),
            ])?;
            level.layers.push(layer);
            Ok(())
        })?;

        reader.read_group(Group::OPEN_ENDED, |r| {
            level.events.push(read_event(r, version)?);
            Ok(())
        })?;
    }

    level.add_internal_entries();
    Ok(level)
}

fn read_npc(r: &mut LegacyReader<'_>, version: u32) -> Result<Npc> {
    let mut npc = Npc::default();
    r.read_fields(&mut npc_head_fields(&mut npc))?;

    if has_special_data(npc.id, version) {
        r.read(&mut Binding::Long(&mut npc.special_data))?;
    } else if is_container(npc.id) {
        r.read(&mut Binding::Long(&mut npc.contents))?;
        if npc.id == 91 && npc.contents == 288 {
            r.read(&mut Binding::Long(&mut npc.special_data))?;
        }
    }

    if version >= 3 {
        r.read(&mut Binding::Bool(&mut npc.generator))?;
        if npc.generator {
            r.read_fields(&mut generator_fields(&mut npc))?;
            if npc.generator_direction < 0 {
                npc.generator_direction = 1;
            }
        }
    }

    r.read_fields(&mut npc_tail_fields(&mut npc))?;
    if version < 9 && matches!(npc.id, 15 | 39 | 86) {
        npc.is_boss = true;
    }
    Ok(npc)
}

fn read_event(r: &mut LegacyReader<'_>, version: u32) -> Result<LevelEvent> {
    let mut event = LevelEvent::default();
    r.read_fields(&mut event_head_fields(&mut event))?;

    for _ in 0..section_count(version) {
        let (mut hide, mut show, mut toggle) = (String::new(), String::new(), String::new());
        r.read_fields(&mut layer_switch_fields(&mut hide, &mut show, &mut toggle))?;
        for (list, name) in [
            (&mut event.layers_hide, hide),
            (&mut event.layers_show, show),
            (&mut event.layers_toggle, toggle),
        ] {
            if !name.is_empty() {
                list.push(name);
            }
        }
    }

    if version >= 13 {
        for _ in 0..SECTION_COUNT {
            let mut sets = SectionSettings::default();
            r.read_fields(&mut sets_fields(&mut sets))?;
            event.sets.push(sets);
        }
    }

    r.read_fields(&mut event_tail_fields(&mut event))?;
    Ok(event)
}

/// Writes a legacy level of the given version (clamped to 64).
///
/// Blocks are stored sorted by position, as the game expects. Warps
/// missing a point they need are left out.
#[must_use]
pub fn write(level: &LevelData, version: u32) -> String {
    let mut writer = LegacyWriter::new(version);
    let version = writer.version();

    let (mut stars, mut title) = (level.stars, level.title.clone());
    writer.write_fields(&[
        Field::since(17, Binding::UInt(&mut stars)),
        Field::since(60, Binding::Str(&mut title)),
    ]);

    let slots = section_count(version);
    for index in 0..slots {
        let mut section = level
            .sections
            .get(index)
            .cloned()
            .unwrap_or_else(|| LevelSection::with_id(index));
        writer.write_fields(&section_fields(&mut section));
    }

    for id in 1..=2 {
        let mut point = level
            .players
            .iter()
            .find(|point| point.id == id)
            .copied()
            .unwrap_or_default();
        writer.write_fields(&point_fields(&mut point));
    }

    let mut blocks = level.blocks.clone();
    blocks.sort_by_key(|block| (block.x, block.y));
    for mut block in blocks {
        let mut contents = contents_to_file(block.npc_id, version);
        writer.write_fields(&block_fields(&mut block, &mut contents));
    }
    writer.write_sentinel();

    for bgo in &level.bgo {
        writer.write_fields(&bgo_fields(&mut bgo.clone()));
    }
    writer.write_sentinel();

    for npc in &level.npcs {
        write_npc(&mut writer, &mut npc.clone());
    }
    writer.write_sentinel();

    for warp in level.warps.iter().filter(|warp| warp.is_complete()) {
        writer.write_fields(&warp_fields(&mut warp.clone()));
    }

    if version >= 29 {
        writer.write_sentinel();
        for env in &level.phys_envs {
            writer.write_fields(&phys_env_fields(&mut env.clone()));
        }
    }

    if version >= 10 {
        writer.write_sentinel();
        for layer in &level.layers {
            writer.write_str(&layer.name);
            writer.write_bool(layer.hidden);
        }
        writer.write_sentinel();
        for event in &level.events {
            write_event(&mut writer, &mut event.clone(), slots);
        }
    }

    writer.finish()
}

fn write_npc(writer: &mut LegacyWriter, npc: &mut Npc) {
    let version = writer.version();
    writer.write_fields(&npc_head_fields(npc));

    if has_special_data(npc.id, version) {
        writer.write_sint(npc.special_data);
    } else if is_container(npc.id) {
        writer.write_sint(npc.contents);
        if npc.id == 91 && npc.contents == 288 {
            writer.write_sint(npc.special_data);
        }
    }

    if version >= 3 {
        writer.write_bool(npc.generator);
        if npc.generator {
            writer.write_fields(&generator_fields(npc));
        }
    }

    writer.write_fields(&npc_tail_fields(npc));
}

fn write_event(writer: &mut LegacyWriter, event: &mut LevelEvent, slots: usize) {
    writer.write_fields(&event_head_fields(event));

    // The last slot is always written empty
    let name = |list: &[String], index: usize| -> String {
        if index + 1 < slots {
            list.get(index).cloned().unwrap_or_default()
        } else {
            String::new()
        }
    };
    for index in 0..slots {
        let mut hide = name(&event.layers_hide, index);
        let mut show = name(&event.layers_show, index);
        let mut toggle = name(&event.layers_toggle, index);
        writer.write_fields(&layer_switch_fields(&mut hide, &mut show, &mut toggle));
    }

    if writer.version() >= 13 {
        for index in 0..slots {
            let mut sets = event.sets.get(index).copied().unwrap_or(UNUSED_SECTION_SETS);
            writer.write_fields(&sets_fields(&mut sets));
        }
    }

    writer.write_fields(&event_tail_fields(event));
}

fn section_fields(section: &mut LevelSection) -> [Field<'_>; 12] {
    [
        Field::always(Binding::Coord(&mut section.size_left)),
        Field::always(Binding::Coord(&mut section.size_top)),
        Field::always(Binding::Coord(&mut section.size_bottom)),
        Field::always(Binding::Coord(&mut section.size_right)),
        Field::always(Binding::UInt(&mut section.music_id)),
        Field::always(Binding::UInt(&mut section.bg_color)),
        Field::always(Binding::Bool(&mut section.wrap_h)),
        Field::always(Binding::Bool(&mut section.off_screen_exit)),
        Field::always(Binding::UInt(&mut section.background)),
        Field::since(1, Binding::Bool(&mut section.lock_left_scroll)),
        Field::since(30, Binding::Bool(&mut section.underwater)),
        Field::since(2, Binding::Str(&mut section.music_file)),
    ]
}

fn point_fields(point: &mut PlayerPoint) -> [Field<'_>; 4] {
    [
        Field::always(Binding::Coord(&mut point.x)),
        Field::always(Binding::Coord(&mut point.y)),
        Field::always(Binding::UInt(&mut point.w)),
        Field::always(Binding::UInt(&mut point.h)),
    ]
}

// Height comes before width
fn block_fields<'a>(block: &'a mut Block, contents: &'a mut i64) -> [Field<'a>; 12] {
    [
        Field::always(Binding::Coord(&mut block.x)),
        Field::always(Binding::Coord(&mut block.y)),
        Field::always(Binding::Coord(&mut block.h)),
        Field::always(Binding::Coord(&mut block.w)),
        Field::always(Binding::UInt(&mut block.id)),
        Field::always(Binding::Long(contents)),
        Field::always(Binding::Bool(&mut block.invisible)),
        Field::since(61, Binding::Bool(&mut block.slippery)),
        Field::since(10, Binding::Str(&mut block.layer)),
        Field::since(14, Binding::Str(&mut block.event_destroy)),
        Field::since(14, Binding::Str(&mut block.event_hit)),
        Field::since(14, Binding::Str(&mut block.event_empty_layer)),
    ]
}

fn bgo_fields(bgo: &mut Bgo) -> [Field<'_>; 4] {
    [
        Field::always(Binding::Coord(&mut bgo.x)),
        Field::always(Binding::Coord(&mut bgo.y)),
        Field::always(Binding::UInt(&mut bgo.id)),
        Field::since(10, Binding::Str(&mut bgo.layer)),
    ]
}

fn npc_head_fields(npc: &mut Npc) -> [Field<'_>; 4] {
    [
        Field::always(Binding::Coord(&mut npc.x)),
        Field::always(Binding::Coord(&mut npc.y)),
        Field::always(Binding::SInt(&mut npc.direction)),
        Field::always(Binding::UInt(&mut npc.id)),
    ]
}

fn generator_fields(npc: &mut Npc) -> [Field<'_>; 3] {
    [
        Field::always(Binding::SInt(&mut npc.generator_direction)),
        Field::always(Binding::UInt(&mut npc.generator_type)),
        Field::always(Binding::UInt(&mut npc.generator_period)),
    ]
}

fn npc_tail_fields(npc: &mut Npc) -> [Field<'_>; 10] {
    [
        Field::since(5, Binding::Text(&mut npc.message)),
        Field::since(6, Binding::Bool(&mut npc.friendly)),
        Field::since(6, Binding::Bool(&mut npc.no_move)),
        Field::since(9, Binding::Bool(&mut npc.is_boss)),
        Field::since(10, Binding::Str(&mut npc.layer)),
        Field::since(10, Binding::Str(&mut npc.event_activate)),
        Field::since(10, Binding::Str(&mut npc.event_die)),
        Field::since(10, Binding::Str(&mut npc.event_talk)),
        Field::since(14, Binding::Str(&mut npc.event_empty_layer)),
        Field::since(63, Binding::Str(&mut npc.attach_layer)),
    ]
}

fn warp_fields(warp: &mut Warp) -> [Field<'_>; 19] {
    [
        Field::always(Binding::Coord(&mut warp.entrance_x)),
        Field::always(Binding::Coord(&mut warp.entrance_y)),
        Field::always(Binding::Coord(&mut warp.exit_x)),
        Field::always(Binding::Coord(&mut warp.exit_y)),
        Field::always(Binding::UInt(&mut warp.entrance_direction)),
        Field::always(Binding::UInt(&mut warp.exit_direction)),
        Field::always(Binding::UInt(&mut warp.kind)),
        Field::since(3, Binding::Str(&mut warp.level_file)),
        Field::since(3, Binding::UInt(&mut warp.warp_to)),
        Field::since(3, Binding::Bool(&mut warp.level_entrance)),
        Field::since(4, Binding::Bool(&mut warp.level_exit)),
        Field::since(4, Binding::Long(&mut warp.world_x)),
        Field::since(4, Binding::Long(&mut warp.world_y)),
        Field::since(7, Binding::UInt(&mut warp.stars)),
        Field::since(12, Binding::Str(&mut warp.layer)),
        Field::since(12, Binding::Bool(&mut warp.unknown)),
        Field::since(23, Binding::Bool(&mut warp.no_vehicles)),
        Field::since(25, Binding::Bool(&mut warp.allow_npc)),
        Field::since(26, Binding::Bool(&mut warp.locked)),
    ]
}

fn phys_env_fields(env: &mut PhysEnv) -> [Field<'_>; 7] {
    [
        Field::always(Binding::Coord(&mut env.x)),
        Field::always(Binding::Coord(&mut env.y)),
        Field::always(Binding::UInt(&mut env.w)),
        Field::always(Binding::UInt(&mut env.h)),
        Field::always(Binding::UInt(&mut env.unknown)),
        Field::since(62, Binding::Bool(&mut env.quicksand)),
        Field::always(Binding::Str(&mut env.layer)),
    ]
}

fn event_head_fields(event: &mut LevelEvent) -> [Field<'_>; 4] {
    [
        Field::always(Binding::Str(&mut event.name)),
        Field::since(11, Binding::Text(&mut event.message)),
        Field::since(14, Binding::UInt(&mut event.sound_id)),
        Field::since(18, Binding::UInt(&mut event.end_game)),
    ]
}

fn layer_switch_fields<'a>(
    hide: &'a mut String,
    show: &'a mut String,
    toggle: &'a mut String,
) -> [Field<'a>; 3] {
    [
        Field::always(Binding::Str(hide)),
        Field::always(Binding::Str(show)),
        Field::since(14, Binding::Str(toggle)),
    ]
}

fn sets_fields(sets: &mut SectionSettings) -> [Field<'_>; 6] {
    [
        Field::always(Binding::Long(&mut sets.music_id)),
        Field::always(Binding::Long(&mut sets.background_id)),
        Field::always(Binding::Long(&mut sets.position_left)),
        Field::always(Binding::Long(&mut sets.position_top)),
        Field::always(Binding::Long(&mut sets.position_bottom)),
        Field::always(Binding::Long(&mut sets.position_right)),
    ]
}

fn event_tail_fields(event: &mut LevelEvent) -> Vec<Field<'_>> {
    let HeldKeys {
        alt_jump,
        alt_run,
        down,
        drop,
        jump,
        left,
        right,
        run,
        start,
        up,
    } = &mut event.held_keys;
    let mut fields = vec![
        Field::since(26, Binding::Str(&mut event.trigger)),
        Field::since(26, Binding::UInt(&mut event.trigger_timer)),
        Field::since(27, Binding::Bool(&mut event.no_smoke)),
    ];
    fields.extend(
        [alt_jump, alt_run, down, drop, jump, left, right, run, start, up]
            .into_iter()
            .map(|key| Field::since(28, Binding::Bool(key))),
    );
    fields.extend([
        Field::since(32, Binding::Bool(&mut event.autostart)),
        Field::since(32, Binding::Str(&mut event.move_layer)),
        Field::since(32, Binding::Float(&mut event.layer_speed_x)),
        Field::since(32, Binding::Float(&mut event.layer_speed_y)),
        Field::since(33, Binding::Float(&mut event.move_camera_x)),
        Field::since(33, Binding::Float(&mut event.move_camera_y)),
        Field::since(33, Binding::Long(&mut event.scroll_section)),
    ]);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use pretty_assertions::assert_eq;

    fn sample() -> LevelData {
        let mut level = LevelData {
            title: "Cave, deep".to_string(),
            stars: 2,
            ..LevelData::default()
        };
        level.sections[0].size_left = -200_000;
        level.sections[0].size_right = -199_200;
        level.sections[0].music_id = 4;
        level.sections[0].underwater = true;
        level.sections[0].music_file = "cave.ogg".to_string();
        level.players.push(PlayerPoint {
            id: 1,
            x: -199_900,
            y: -200_400,
            w: 24,
            h: 54,
        });
        level.blocks.push(Block {
            id: 2,
            x: 64,
            y: 32,
            npc_id: 9,
            slippery: true,
            event_hit: "bump".to_string(),
            ..Block::default()
        });
        level.blocks.push(Block {
            id: 1,
            x: 32,
            npc_id: -5,
            ..Block::default()
        });
        level.bgo.push(Bgo {
            id: 65,
            x: 96,
            ..Bgo::default()
        });
        level.npcs.push(Npc {
            id: 91,
            x: 10,
            contents: 288,
            special_data: 3,
            message: "Hi\nthere".to_string(),
            ..Npc::default()
        });
        level.npcs.push(Npc {
            id: 76,
            direction: -1,
            special_data: 1,
            generator: true,
            generator_direction: 2,
            generator_period: 65,
            attach_layer: "Lift".to_string(),
            ..Npc::default()
        });
        level.warps.push(Warp {
            kind: 1,
            entrance_x: 1,
            exit_x: 2,
            level_file: "next.lvl".to_string(),
            stars: 3,
            locked: true,
            ..Warp::default()
        });
        level.phys_envs.push(PhysEnv {
            x: 8,
            quicksand: true,
            ..PhysEnv::default()
        });
        level.layers.push(LevelLayer {
            name: "Lift".to_string(),
            hidden: true,
        });
        let mut event = LevelEvent {
            name: "Open".to_string(),
            message: "Doors open".to_string(),
            sound_id: 7,
            layers_show: vec!["Lift".to_string()],
            trigger: "Close".to_string(),
            trigger_timer: 15,
            autostart: true,
            move_layer: "Lift".to_string(),
            layer_speed_y: -1.5,
            scroll_section: 2,
            ..LevelEvent::default()
        };
        event.held_keys.jump = true;
        event.sets = vec![SectionSettings::default(); SECTION_COUNT];
        event.sets[1].music_id = 12;
        level.events.push(event);
        level.add_internal_entries();
        level
    }

    #[test]
    fn test_roundtrip_newest() {
        let level = sample();
        let back = read(&write(&level, 64)).unwrap();
        assert_eq!(back.meta, FileMeta::new(FileFormat::Smbx64, 64));
        assert_eq!(back.title, level.title);
        assert_eq!(back.sections, level.sections);
        assert_eq!(back.players, level.players);
        // sorted by position
        assert_eq!(back.blocks[0].x, 32);
        assert_eq!(back.blocks[0].npc_id, -5);
        assert_eq!(back.blocks[1], level.blocks[0]);
        assert_eq!(back.bgo, level.bgo);
        assert_eq!(back.npcs, level.npcs);
        assert_eq!(back.warps, level.warps);
        assert_eq!(back.phys_envs, level.phys_envs);
        assert_eq!(back.layers, level.layers);
        assert_eq!(back.events[0], level.events[0]);
        // events without section settings get the unused placeholder
        assert_eq!(back.events.len(), 4);
        assert_eq!(back.events[1].sets, vec![UNUSED_SECTION_SETS; SECTION_COUNT]);
    }

    #[test]
    fn test_block_contents_renumbered_before_18() {
        assert_eq!(contents_from_file(100), 9);
        assert_eq!(contents_from_file(1009), 9);
        assert_eq!(contents_from_file(104), 35);
        assert_eq!(contents_from_file(5), -5);
        assert_eq!(contents_from_file(0), 0);
        assert_eq!(contents_to_file(9, 17), 100);
        assert_eq!(contents_to_file(9, 18), 1009);
        assert_eq!(contents_to_file(2, 17), 1002);
        assert_eq!(contents_to_file(-120, 64), 99);

        let mut level = LevelData::default();
        level.blocks.push(Block {
            id: 4,
            npc_id: 14,
            ..Block::default()
        });
        let text = write(&level, 17);
        assert!(text.contains("\n4\n102\n#FALSE#\n"), "{text}");
        assert_eq!(read(&text).unwrap().blocks[0].npc_id, 14);
    }

    #[test]
    fn test_old_versions() {
        let level = sample();
        let back = read(&write(&level, 9)).unwrap();
        assert_eq!(back.meta.version, 9);
        assert_eq!(back.title, "");
        assert_eq!(back.stars, 0);
        assert_eq!(back.sections.len(), SECTION_COUNT);
        assert!(!back.sections[0].underwater);
        assert_eq!(back.sections[0].music_file, "cave.ogg");
        assert!(back.bgo[0].foreground);
        assert_eq!(back.npcs[0].message, "Hi\nthere");
        assert!(!back.blocks[1].slippery);
        assert_eq!(back.warps.len(), 1);
        assert!(!back.warps[0].locked);
        assert!(back.phys_envs.is_empty());
        // layers and events start at version 10, only the built-in ones remain
        assert_eq!(back.layers.len(), 3);
        assert_eq!(back.events.len(), 3);
    }

    #[test]
    fn test_six_sections_before_8() {
        let mut level = LevelData::default();
        level.sections[7].music_id = 3;
        let text = write(&level, 7);
        let back = read(&text).unwrap();
        assert_eq!(back.sections.len(), SECTION_COUNT);
        assert_eq!(back.sections[7].music_id, 0);
        assert_eq!(back.sections[5].bg_color, 16_291_944);
    }

    #[test]
    fn test_warp_group_runs_to_end_before_10() {
        let mut level = LevelData::default();
        level.warps.push(Warp::default());
        let text = write(&level, 9);
        assert!(!text.ends_with("\"next\"\n"));
        assert_eq!(read(&text).unwrap().warps.len(), 1);
        let padded = format!("{text}\n");
        assert_eq!(read(&padded).unwrap().warps.len(), 1);
    }

    #[test]
    fn test_missing_sentinel_is_an_error_from_10() {
        let level = LevelData::default();
        let text = write(&level, 10);
        let cut = text.split("\"next\"").next().unwrap();
        let err = read(cut).unwrap_err();
        assert!(err.to_string().contains("expected \"next\""), "{err}");
    }

    #[test]
    fn test_incomplete_warps_are_not_written() {
        let mut level = LevelData::default();
        level.warps.push(Warp {
            is_set_out: false,
            ..Warp::default()
        });
        assert!(read(&write(&level, 64)).unwrap().warps.is_empty());
    }

    #[test]
    fn test_special_data_needs_version() {
        assert!(!has_special_data(76, 14));
        assert!(has_special_data(76, 15));
        assert!(!has_special_data(28, 30));
        assert!(has_special_data(260, 0));
        assert!(!has_special_data(1, 64));
    }

    #[test]
    fn test_bosses_implied_before_9() {
        let mut level = LevelData::default();
        level.npcs.push(Npc {
            id: 39,
            ..Npc::default()
        });
        let back = read(&write(&level, 8)).unwrap();
        assert!(back.npcs[0].is_boss);
    }

    #[test]
    fn test_player_points_without_size_are_dropped() {
        let mut level = LevelData::default();
        level.players.push(PlayerPoint {
            id: 2,
            x: 10,
            y: 10,
            w: 24,
            h: 60,
        });
        level.players.push(PlayerPoint {
            id: 1,
            x: 10,
            y: 10,
            ..PlayerPoint::default()
        });
        let back = read(&write(&level, 64)).unwrap();
        assert_eq!(back.players.len(), 1);
        assert_eq!(back.players[0].id, 2);
    }

    #[test]
    fn test_bad_block_record() {
        let mut text = write(&LevelData::default(), 64);
        let at = text.find("\"next\"").unwrap();
        text.insert_str(at, "1\n2\nwide\n");
        match read(&text).unwrap_err() {
            Error::FieldConversion { context, .. } => assert_eq!(context, "wide"),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
