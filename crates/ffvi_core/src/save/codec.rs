//! One generic codec routine per direction. The walk order over fields is
//! fixed; everything format-specific (widths, coordinate encoding, slot
//! geometry, checksums) comes from the [`SaveLayout`] being interpreted.

use std::io::Cursor;

use crate::reader::LittleEndianReader;
use crate::state::{
    COMMAND_SLOTS, Character, EMPTY_PARTY_MEMBER, Equipment, Facing, Gps, PARTY_SIZE, Party,
    Position, StateGraph, StatPair, StatusFlags, TRANSPORT_MAP_UNSET, Transport, TransportKind,
    WorldState, NAME_LEN,
};

use super::SaveError;
use super::layout::{self, CoordEncoding, SaveLayout};

pub fn decode_slot(
    bytes: &[u8],
    layout: &SaveLayout,
    slot: usize,
) -> Result<StateGraph, SaveError> {
    if slot >= layout.slot_count {
        return Err(SaveError::SlotOutOfRange {
            slot,
            slot_count: layout.slot_count,
        });
    }
    if let Some((offset, expected)) = layout.magic {
        if bytes.get(offset..offset + expected.len()) != Some(expected) {
            return Err(SaveError::BadMagic { offset, expected });
        }
    }

    let slot_start = layout.slot_offset(slot);
    let need = layout.slot_data_len();
    if bytes.len() < slot_start + need {
        return Err(SaveError::TruncatedRecord {
            offset: slot_start,
            need,
            have: bytes.len().saturating_sub(slot_start),
        });
    }

    let stored = layout::stored_checksum(layout, bytes, slot).ok_or(SaveError::TruncatedRecord {
        offset: bytes.len(),
        need: 2,
        have: 0,
    })?;
    let computed = layout::compute_checksum(layout, bytes, slot);
    if stored != computed {
        return Err(SaveError::ChecksumMismatch {
            slot,
            stored,
            computed,
        });
    }

    let mut r = LittleEndianReader::new(Cursor::new(bytes));
    r.seek_to(slot_start as u64).map_err(io_to_truncated(slot_start, need))?;
    read_graph(&mut r, layout).map_err(io_to_truncated(slot_start, need))
}

fn io_to_truncated(offset: usize, need: usize) -> impl Fn(std::io::Error) -> SaveError {
    // Bounds were verified before the walk; an EOF here still maps to the
    // slot span that could not be read.
    move |_| SaveError::TruncatedRecord {
        offset,
        need,
        have: 0,
    }
}

fn read_graph<R: std::io::Read + std::io::Seek>(
    r: &mut LittleEndianReader<R>,
    layout: &SaveLayout,
) -> std::io::Result<StateGraph> {
    let mut characters = Vec::with_capacity(layout.character_count);
    for id in 0..layout.character_count as u8 {
        characters.push(read_character(r, layout, id)?);
    }

    let party_enabled = r.read_u8()? != 0;
    let mut members = [None; PARTY_SIZE];
    for member in &mut members {
        let raw = r.read_u8()?;
        *member = (raw != EMPTY_PARTY_MEMBER).then_some(raw);
    }
    let party = Party {
        enabled: party_enabled,
        members,
    };

    let gold = read_money(r, layout)?;
    let steps = read_money(r, layout)?;
    let play_time_seconds = r.read_u32()?;

    let map_id = r.read_u16()?;
    let player = Position {
        x: read_coord(r, layout)?,
        y: read_coord(r, layout)?,
        z: read_coord(r, layout)?,
    };
    let facing = Facing::from_raw(r.read_u8()?);
    let gps = Gps {
        area_id: r.read_u16()?,
        width: r.read_u16()?,
        height: r.read_u16()?,
    };

    let mut transports = Vec::with_capacity(TransportKind::ALL.len());
    for kind in TransportKind::ALL {
        let enabled = r.read_u8()? != 0;
        let raw_map = r.read_u16()?;
        let x = read_coord(r, layout)?;
        let y = read_coord(r, layout)?;
        let facing = Facing::from_raw(r.read_u8()?);
        transports.push(Transport {
            kind,
            enabled,
            map_id: (raw_map != TRANSPORT_MAP_UNSET).then_some(raw_map),
            x,
            y,
            facing,
        });
    }

    Ok(StateGraph {
        characters,
        party,
        world: WorldState {
            map_id,
            player,
            facing,
            gps,
            transports,
        },
        gold,
        steps,
        play_time_seconds,
    })
}

fn read_character<R: std::io::Read + std::io::Seek>(
    r: &mut LittleEndianReader<R>,
    layout: &SaveLayout,
    id: u8,
) -> std::io::Result<Character> {
    let name = r.read_fixed_string(NAME_LEN)?;
    let enabled = r.read_u8()? != 0;
    let level = r.read_u8()?;
    let exp = match layout.exp_width {
        3 => r.read_u24()?,
        _ => r.read_u32()?,
    };
    let hp = StatPair {
        current: r.read_u16()?,
        max: r.read_u16()?,
    };
    let mp = StatPair {
        current: r.read_u16()?,
        max: r.read_u16()?,
    };
    let vigor = r.read_u8()?;
    let stamina = r.read_u8()?;
    let speed = r.read_u8()?;
    let magic = r.read_u8()?;

    let mut slots = [0u16; 6];
    for slot in &mut slots {
        *slot = match layout.equip_width {
            1 => u16::from(r.read_u8()?),
            _ => r.read_u16()?,
        };
    }
    let equipment = Equipment {
        weapon: slots[0],
        shield: slots[1],
        helmet: slots[2],
        armor: slots[3],
        relic1: slots[4],
        relic2: slots[5],
    };

    let mut commands = [0u8; COMMAND_SLOTS];
    for command in &mut commands {
        *command = r.read_u8()?;
    }

    let spells = r.read_bytes(layout.spell_count)?;
    let status = StatusFlags(r.read_u16()?);

    Ok(Character {
        id,
        name,
        enabled,
        level,
        exp,
        hp,
        mp,
        vigor,
        stamina,
        speed,
        magic,
        equipment,
        commands,
        spells,
        status,
        sprite: None,
    })
}

fn read_money<R: std::io::Read + std::io::Seek>(
    r: &mut LittleEndianReader<R>,
    layout: &SaveLayout,
) -> std::io::Result<u32> {
    match layout.money_width {
        3 => r.read_u24(),
        _ => r.read_u32(),
    }
}

fn read_coord<R: std::io::Read + std::io::Seek>(
    r: &mut LittleEndianReader<R>,
    layout: &SaveLayout,
) -> std::io::Result<f32> {
    match layout.coords {
        CoordEncoding::Tile8 => Ok(f32::from(r.read_u8()?)),
        CoordEncoding::Float32 => r.read_f32(),
    }
}

pub fn encode_slot(
    graph: &StateGraph,
    layout: &SaveLayout,
    slot: usize,
    out: &mut [u8],
) -> Result<(), SaveError> {
    if slot >= layout.slot_count {
        return Err(SaveError::SlotOutOfRange {
            slot,
            slot_count: layout.slot_count,
        });
    }
    let slot_start = layout.slot_offset(slot);
    let need = layout.slot_data_len();
    if out.len() < slot_start + need {
        return Err(SaveError::TruncatedRecord {
            offset: slot_start,
            need,
            have: out.len().saturating_sub(slot_start),
        });
    }

    let mut w = FieldWriter {
        buf: out,
        pos: slot_start,
    };

    for id in 0..layout.character_count as u8 {
        // A graph may omit characters; absent ones serialize as disabled
        // defaults so the record block keeps its fixed shape.
        let default_character;
        let character = match graph.character(id) {
            Some(c) => c,
            None => {
                default_character = Character::new(id);
                &default_character
            }
        };
        write_character(&mut w, layout, character).map_err(|e| contextualize(e, character))?;
    }

    w.write_u8(u8::from(graph.party.enabled));
    for member in graph.party.members {
        w.write_u8(member.unwrap_or(EMPTY_PARTY_MEMBER));
    }

    write_money(&mut w, layout, graph.gold, "gold")?;
    write_money(&mut w, layout, graph.steps, "steps")?;
    w.write_u32(graph.play_time_seconds);

    let world = &graph.world;
    w.write_u16(world.map_id);
    write_coord(&mut w, layout, world.player.x, "player x")?;
    write_coord(&mut w, layout, world.player.y, "player y")?;
    write_coord(&mut w, layout, world.player.z, "player z")?;
    w.write_u8(world.facing.raw());
    w.write_u16(world.gps.area_id);
    w.write_u16(world.gps.width);
    w.write_u16(world.gps.height);

    for kind in TransportKind::ALL {
        let default_transport = Transport::new(kind);
        let transport = world
            .transports
            .iter()
            .find(|t| t.kind == kind)
            .unwrap_or(&default_transport);
        w.write_u8(u8::from(transport.enabled));
        w.write_u16(transport.map_id.unwrap_or(TRANSPORT_MAP_UNSET));
        write_coord(&mut w, layout, transport.x, &format!("{} x", kind.name()))?;
        write_coord(&mut w, layout, transport.y, &format!("{} y", kind.name()))?;
        w.write_u8(transport.facing.raw());
    }

    Ok(())
}

fn contextualize(err: SaveError, character: &Character) -> SaveError {
    match err {
        SaveError::FieldOutOfRange { field, value, max } => SaveError::FieldOutOfRange {
            field: format!("{} (character {})", field, character.id),
            value,
            max,
        },
        other => other,
    }
}

fn write_character(
    w: &mut FieldWriter<'_>,
    layout: &SaveLayout,
    c: &Character,
) -> Result<(), SaveError> {
    w.write_name(&c.name)?;
    w.write_u8(u8::from(c.enabled));
    w.write_u8(c.level);
    w.write_unsigned(u64::from(c.exp), layout.exp_width, "exp")?;
    w.write_u16(c.hp.current);
    w.write_u16(c.hp.max);
    w.write_u16(c.mp.current);
    w.write_u16(c.mp.max);
    w.write_u8(c.vigor);
    w.write_u8(c.stamina);
    w.write_u8(c.speed);
    w.write_u8(c.magic);

    for (slot, name) in c.equipment.slots().into_iter().zip(Equipment::slot_names()) {
        w.write_unsigned(u64::from(slot), layout.equip_width, name)?;
    }

    for command in c.commands {
        w.write_u8(command);
    }

    // The spell vector is fixed-size in practice; pad or truncate to the
    // layout's count so a hand-built graph cannot shift later fields.
    for index in 0..layout.spell_count {
        w.write_u8(c.spells.get(index).copied().unwrap_or(0));
    }

    w.write_u16(c.status.0);
    Ok(())
}

fn write_money(
    w: &mut FieldWriter<'_>,
    layout: &SaveLayout,
    value: u32,
    field: &str,
) -> Result<(), SaveError> {
    w.write_unsigned(u64::from(value), layout.money_width, field)
}

fn write_coord(
    w: &mut FieldWriter<'_>,
    layout: &SaveLayout,
    value: f32,
    field: &str,
) -> Result<(), SaveError> {
    match layout.coords {
        CoordEncoding::Tile8 => {
            let tile = value.round();
            if !(0.0..=255.0).contains(&tile) {
                return Err(SaveError::FieldOutOfRange {
                    field: field.to_string(),
                    value: tile.max(0.0) as u64,
                    max: 255,
                });
            }
            w.write_u8(tile as u8);
            Ok(())
        }
        CoordEncoding::Float32 => {
            w.write_bytes(&value.to_le_bytes());
            Ok(())
        }
    }
}

/// Bounds-checked little-endian writer over a slot span. Width overflow
/// is the caller's data being unrepresentable, not a buffer problem.
struct FieldWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl FieldWriter<'_> {
    fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }

    fn write_u8(&mut self, value: u8) {
        self.write_bytes(&[value]);
    }

    fn write_u16(&mut self, value: u16) {
        self.write_bytes(&value.to_le_bytes());
    }

    fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    fn write_unsigned(&mut self, value: u64, width: usize, field: &str) -> Result<(), SaveError> {
        let max = if width >= 8 { u64::MAX } else { (1u64 << (width * 8)) - 1 };
        if value > max {
            return Err(SaveError::FieldOutOfRange {
                field: field.to_string(),
                value,
                max,
            });
        }
        let le = value.to_le_bytes();
        self.write_bytes(&le[..width]);
        Ok(())
    }

    fn write_name(&mut self, name: &str) -> Result<(), SaveError> {
        if !name.is_ascii() || name.len() > NAME_LEN {
            return Err(SaveError::FieldOutOfRange {
                field: "name".to_string(),
                value: name.len() as u64,
                max: NAME_LEN as u64,
            });
        }
        let mut fixed = [0u8; NAME_LEN];
        fixed[..name.len()].copy_from_slice(name.as_bytes());
        self.write_bytes(&fixed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::{Document, SaveFormat};
    use super::*;
    use crate::state::StatPreset;

    fn sample_graph() -> StateGraph {
        let mut graph = StateGraph::default();
        {
            let terra = graph.character_mut(0).unwrap();
            terra.enabled = true;
            terra.name = "TERRA".to_string();
            terra.level = 24;
            terra.exp = 39_460;
            terra.hp = StatPair { current: 801, max: 1023 };
            terra.mp = StatPair { current: 99, max: 140 };
            terra.vigor = 31;
            terra.stamina = 28;
            terra.speed = 33;
            terra.magic = 39;
            terra.equipment.weapon = 104;
            terra.equipment.armor = 252;
            terra.commands = [0, 2, 1, 21];
            terra.spells[40] = 100;
            terra.spells[41] = 35;
            terra.status.set(2, true);
        }
        {
            let locke = graph.character_mut(1).unwrap();
            locke.enabled = true;
            locke.name = "LOCKE".to_string();
            locke.apply_preset(StatPreset::Starter);
        }
        graph.party.enabled = true;
        graph.party.members = [Some(0), Some(1), None, None];
        graph.gold = 123_456;
        graph.steps = 54_321;
        graph.play_time_seconds = 3 * 3600 + 42 * 60 + 7;
        graph.world.map_id = 1;
        graph.world.player = Position { x: 84.0, y: 113.0, z: 0.0 };
        graph.world.facing = Facing::Down;
        graph.world.gps = Gps { area_id: 3, width: 256, height: 256 };
        graph.world.transports[0].enabled = true;
        graph.world.transports[0].map_id = Some(1);
        graph.world.transports[0].x = 120.0;
        graph.world.transports[0].y = 64.0;
        graph
    }

    #[test]
    fn round_trip_is_value_exact_in_both_formats() {
        for format in SaveFormat::ALL {
            let graph = sample_graph();
            let doc = Document::blank(format);
            let bytes = doc.save(&graph, 0).unwrap();
            let doc2 = Document::new(bytes, format).unwrap();
            let reloaded = doc2.load(0).unwrap();
            assert_eq!(reloaded, graph, "round trip mismatch for {format:?}");
        }
    }

    #[test]
    fn unmodified_slots_stay_byte_identical() {
        let doc = Document::blank(SaveFormat::Snes);
        let graph = sample_graph();
        let bytes = doc.save(&graph, 1).unwrap();

        let layout = SaveFormat::Snes.layout();
        // Slots 0 and 2 and everything outside slot 1's span and checksum
        // table must be untouched.
        let original = doc.bytes();
        let slot1 = layout.slot_offset(1);
        assert_eq!(bytes[..slot1], original[..slot1]);
        let slot2 = layout.slot_offset(2);
        assert_eq!(bytes[slot2..0x1FF0], original[slot2..0x1FF0]);
    }

    #[test]
    fn saving_twice_without_edits_is_byte_stable() {
        let graph = sample_graph();
        let doc = Document::blank(SaveFormat::Playstation);
        let first = doc.save(&graph, 0).unwrap();
        let doc2 = Document::new(first.clone(), SaveFormat::Playstation).unwrap();
        let second = doc2.save(&doc2.load(0).unwrap(), 0).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn corrupted_slot_fails_checksum() {
        let graph = sample_graph();
        let doc = Document::blank(SaveFormat::Snes);
        let mut bytes = doc.save(&graph, 0).unwrap();
        bytes[0x40] ^= 0xFF;
        let doc2 = Document::new(bytes, SaveFormat::Snes).unwrap();
        match doc2.load(0) {
            Err(super::super::SaveError::ChecksumMismatch { slot: 0, .. }) => {}
            other => panic!("expected checksum mismatch, got {other:?}"),
        }
    }

    #[test]
    fn psx_rejects_missing_magic() {
        let mut bytes = Document::blank(SaveFormat::Playstation).bytes().to_vec();
        bytes[0] = b'X';
        match Document::new(bytes, SaveFormat::Playstation) {
            Err(super::super::SaveError::BadMagic { offset: 0, .. }) => {}
            other => panic!("expected bad magic, got {other:?}"),
        }
    }

    #[test]
    fn snes_format_rejects_oversized_equipment_id() {
        let mut graph = sample_graph();
        graph.character_mut(0).unwrap().equipment.relic2 = 305;
        let doc = Document::blank(SaveFormat::Snes);
        match doc.save(&graph, 0) {
            Err(super::super::SaveError::FieldOutOfRange { field, value, max }) => {
                assert!(field.contains("relic2"));
                assert_eq!(value, 305);
                assert_eq!(max, 255);
            }
            other => panic!("expected field out of range, got {other:?}"),
        }

        // The wider PlayStation layout represents the same graph fine.
        let doc = Document::blank(SaveFormat::Playstation);
        assert!(doc.save(&graph, 0).is_ok());
    }

    #[test]
    fn detection_by_shape_matches_the_producing_format() {
        for format in SaveFormat::ALL {
            let doc = Document::blank(format);
            assert_eq!(Document::detect_format(doc.bytes()), Some(format));
        }
        assert_eq!(Document::detect_format(&[0u8; 100]), None);
    }

    #[test]
    fn slot_out_of_range_is_reported() {
        let doc = Document::blank(SaveFormat::Playstation);
        match doc.load(1) {
            Err(super::super::SaveError::SlotOutOfRange { slot: 1, slot_count: 1 }) => {}
            other => panic!("expected slot out of range, got {other:?}"),
        }
    }

    #[test]
    fn truncated_buffer_is_reported_per_record() {
        let layout = SaveFormat::Snes.layout();
        let bytes = vec![0u8; layout.slot_offset(2) + 16];
        match decode_slot(&bytes, layout, 2) {
            Err(super::super::SaveError::TruncatedRecord { need, have, .. }) => {
                assert_eq!(need, layout.slot_data_len());
                assert_eq!(have, 16);
            }
            other => panic!("expected truncated record, got {other:?}"),
        }
    }
}
