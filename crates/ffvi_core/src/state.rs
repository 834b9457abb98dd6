use serde::{Deserialize, Serialize};

use crate::catalog::{self, CHARACTER_COUNT, SPELL_COUNT};
use crate::experience;
use crate::sprite::Sprite;

pub const PARTY_SIZE: usize = 4;
pub const EQUIPMENT_SLOTS: usize = 6;
pub const COMMAND_SLOTS: usize = 4;
pub const TRANSPORT_COUNT: usize = 4;
pub const NAME_LEN: usize = 6;

/// Wire sentinel for an unused party slot.
pub const EMPTY_PARTY_MEMBER: u8 = 0xFF;
/// Wire sentinel for a transport that is not on any map.
pub const TRANSPORT_MAP_UNSET: u16 = 0xFFFF;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatPair {
    pub current: u16,
    pub max: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    pub weapon: u16,
    pub shield: u16,
    pub helmet: u16,
    pub armor: u16,
    pub relic1: u16,
    pub relic2: u16,
}

impl Equipment {
    pub fn slots(&self) -> [u16; EQUIPMENT_SLOTS] {
        [
            self.weapon,
            self.shield,
            self.helmet,
            self.armor,
            self.relic1,
            self.relic2,
        ]
    }

    pub fn slots_mut(&mut self) -> [&mut u16; EQUIPMENT_SLOTS] {
        [
            &mut self.weapon,
            &mut self.shield,
            &mut self.helmet,
            &mut self.armor,
            &mut self.relic1,
            &mut self.relic2,
        ]
    }

    pub fn slot_names() -> [&'static str; EQUIPMENT_SLOTS] {
        ["weapon", "shield", "helmet", "armor", "relic1", "relic2"]
    }
}

/// Status-effect bitmask; bit order matches [`catalog::STATUS_NAMES`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFlags(pub u16);

impl StatusFlags {
    pub fn contains(&self, bit: u8) -> bool {
        bit < catalog::STATUS_COUNT as u8 && self.0 & (1 << bit) != 0
    }

    pub fn set(&mut self, bit: u8, on: bool) {
        if bit >= catalog::STATUS_COUNT as u8 {
            return;
        }
        if on {
            self.0 |= 1 << bit;
        } else {
            self.0 &= !(1 << bit);
        }
    }

    pub fn active_names(&self) -> Vec<&'static str> {
        catalog::STATUS_NAMES
            .iter()
            .enumerate()
            .filter(|(bit, _)| self.contains(*bit as u8))
            .map(|(_, name)| *name)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: u8,
    pub name: String,
    pub enabled: bool,
    pub level: u8,
    pub exp: u32,
    pub hp: StatPair,
    pub mp: StatPair,
    pub vigor: u8,
    pub stamina: u8,
    pub speed: u8,
    pub magic: u8,
    pub equipment: Equipment,
    pub commands: [u8; COMMAND_SLOTS],
    /// Learn progress per spell id, 0-100; index matches the spell table.
    pub spells: Vec<u8>,
    pub status: StatusFlags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sprite: Option<Sprite>,
}

impl Character {
    pub fn new(id: u8) -> Self {
        Self {
            id,
            name: catalog::character_name(id).unwrap_or("").to_string(),
            enabled: false,
            level: 1,
            exp: 0,
            hp: StatPair::default(),
            mp: StatPair::default(),
            vigor: 0,
            stamina: 0,
            speed: 0,
            magic: 0,
            equipment: Equipment::default(),
            commands: [0; COMMAND_SLOTS],
            spells: vec![0; SPELL_COUNT],
            status: StatusFlags::default(),
            sprite: None,
        }
    }

    pub fn heal(&mut self) {
        self.hp.current = self.hp.max;
        self.mp.current = self.mp.max;
    }

    pub fn apply_preset(&mut self, preset: StatPreset) {
        let (hp, mp, stat, level) = match preset {
            StatPreset::Max => (9999, 999, 255, 99),
            StatPreset::High => (5000, 500, 150, 50),
            StatPreset::Starter => (1000, 200, 50, 20),
        };
        self.hp = StatPair { current: hp, max: hp };
        self.mp = StatPair { current: mp, max: mp };
        self.vigor = stat;
        self.stamina = stat;
        self.speed = stat;
        self.magic = stat;
        self.level = level;
        self.exp = experience::exp_for_level(level);
    }

    pub fn best_equipment(&mut self) {
        self.equipment = Equipment {
            weapon: 122, // Ultima Weapon
            shield: 211, // Genji Shield
            helmet: 237, // Crystal Helm
            armor: 266,  // Genji Armor
            relic1: 301, // Ribbon
            relic2: 305, // Celestriad
        };
    }

    pub fn basic_equipment(&mut self) {
        self.equipment = Equipment {
            weapon: 104, // Mythril Sword
            shield: 203, // Mythril Shield
            helmet: 227, // Mythril Helm
            armor: 252,  // Mythril Mail
            relic1: catalog::EMPTY_ITEM,
            relic2: catalog::EMPTY_ITEM,
        };
    }

    /// Teach the elemental spell line at full proficiency.
    pub fn learn_elemental_spells(&mut self) {
        let start = catalog::ELEMENTAL_SPELLS_START as usize;
        let end = start + catalog::ELEMENTAL_SPELLS_LEN as usize;
        for value in &mut self.spells[start..end] {
            *value = 100;
        }
    }

    /// Magitek rig: first command slot becomes Magitek and the elemental
    /// line is mastered.
    pub fn equip_magitek(&mut self) {
        if let Some(first) = self.commands.first_mut() {
            *first = catalog::MAGITEK_COMMAND;
        }
        self.learn_elemental_spells();
    }

    pub fn reset_stats(&mut self) {
        self.level = 1;
        self.exp = 0;
        self.hp = StatPair::default();
        self.mp = StatPair::default();
        self.vigor = 0;
        self.stamina = 0;
        self.speed = 0;
        self.magic = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatPreset {
    Max,
    High,
    Starter,
}

/// Party slots hold character ids, never character data; members survive a
/// reload of the character set untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub enabled: bool,
    pub members: [Option<u8>; PARTY_SIZE],
}

impl Default for Party {
    fn default() -> Self {
        Self {
            enabled: false,
            members: [None; PARTY_SIZE],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Facing {
    #[default]
    Up,
    Right,
    Down,
    Left,
}

impl Facing {
    pub fn from_raw(raw: u8) -> Self {
        match raw & 0x03 {
            0 => Self::Up,
            1 => Self::Right,
            2 => Self::Down,
            _ => Self::Left,
        }
    }

    pub fn raw(&self) -> u8 {
        match self {
            Self::Up => 0,
            Self::Right => 1,
            Self::Down => 2,
            Self::Left => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Default for Position {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0, z: 0.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gps {
    pub area_id: u16,
    pub width: u16,
    pub height: u16,
}

impl Default for Gps {
    fn default() -> Self {
        // World maps are 256x256 game tiles.
        Self {
            area_id: 0,
            width: 256,
            height: 256,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportKind {
    Blackjack,
    Falcon,
    Chocobo,
    MagitekArmor,
}

impl TransportKind {
    pub const ALL: [TransportKind; TRANSPORT_COUNT] = [
        TransportKind::Blackjack,
        TransportKind::Falcon,
        TransportKind::Chocobo,
        TransportKind::MagitekArmor,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Blackjack => "Blackjack",
            Self::Falcon => "Falcon",
            Self::Chocobo => "Chocobo",
            Self::MagitekArmor => "Magitek Armor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transport {
    pub kind: TransportKind,
    pub enabled: bool,
    /// `None` when the transport is not placed on any map.
    pub map_id: Option<u16>,
    pub x: f32,
    pub y: f32,
    pub facing: Facing,
}

impl Transport {
    pub fn new(kind: TransportKind) -> Self {
        Self {
            kind,
            enabled: false,
            map_id: None,
            x: 0.0,
            y: 0.0,
            facing: Facing::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    pub map_id: u16,
    pub player: Position,
    pub facing: Facing,
    pub gps: Gps,
    pub transports: Vec<Transport>,
}

impl Default for WorldState {
    fn default() -> Self {
        Self {
            map_id: 1,
            player: Position::default(),
            facing: Facing::default(),
            gps: Gps::default(),
            transports: TransportKind::ALL.iter().map(|&k| Transport::new(k)).collect(),
        }
    }
}

/// The whole editable state of one save slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateGraph {
    pub characters: Vec<Character>,
    pub party: Party,
    pub world: WorldState,
    pub gold: u32,
    pub steps: u32,
    pub play_time_seconds: u32,
}

impl Default for StateGraph {
    fn default() -> Self {
        Self {
            characters: (0..CHARACTER_COUNT as u8).map(Character::new).collect(),
            party: Party::default(),
            world: WorldState::default(),
            gold: 0,
            steps: 0,
            play_time_seconds: 0,
        }
    }
}

impl StateGraph {
    pub fn character(&self, id: u8) -> Option<&Character> {
        self.characters.iter().find(|c| c.id == id)
    }

    pub fn character_mut(&mut self, id: u8) -> Option<&mut Character> {
        self.characters.iter_mut().find(|c| c.id == id)
    }

    /// Resolve party slots to character ids that actually exist.
    pub fn party_members(&self) -> Vec<&Character> {
        self.party
            .members
            .iter()
            .filter_map(|slot| slot.and_then(|id| self.character(id)))
            .collect()
    }

    pub fn max_all(&mut self) {
        for character in &mut self.characters {
            character.apply_preset(StatPreset::Max);
        }
    }

    pub fn heal_all(&mut self) {
        for character in &mut self.characters {
            character.heal();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_preset_is_table_consistent() {
        let mut c = Character::new(0);
        c.apply_preset(StatPreset::Max);
        assert_eq!(c.level, 99);
        assert!(experience::is_consistent(c.level, c.exp));
        assert_eq!(c.hp, StatPair { current: 9999, max: 9999 });
    }

    #[test]
    fn party_members_skip_empty_and_dangling_slots() {
        let mut graph = StateGraph::default();
        graph.party.members = [Some(0), None, Some(200), Some(5)];
        let members: Vec<u8> = graph.party_members().iter().map(|c| c.id).collect();
        assert_eq!(members, vec![0, 5]);
    }

    #[test]
    fn status_flags_round_trip_bits() {
        let mut status = StatusFlags::default();
        status.set(2, true); // Poison
        status.set(15, true); // Sleep
        status.set(16, true); // out of range, ignored
        assert!(status.contains(2));
        assert!(!status.contains(3));
        assert_eq!(status.active_names(), vec!["Poison", "Sleep"]);
    }

    #[test]
    fn magitek_rig_sets_command_and_spell_line() {
        let mut c = Character::new(10);
        c.equip_magitek();
        assert_eq!(c.commands[0], catalog::MAGITEK_COMMAND);
        let start = catalog::ELEMENTAL_SPELLS_START as usize;
        assert!(c.spells[..start].iter().all(|&v| v == 0));
        assert!(
            c.spells[start..start + catalog::ELEMENTAL_SPELLS_LEN as usize]
                .iter()
                .all(|&v| v == 100)
        );
    }
}
