//! Static name and identifier tables shared by the save codec, validator
//! and CLI. Item identifiers use `0` as the universal "empty slot" value.

pub const CHARACTER_COUNT: usize = 16;
pub const COMMAND_COUNT: usize = 30;
pub const SPELL_COUNT: usize = 54;
pub const STATUS_COUNT: usize = 16;

pub const EMPTY_ITEM: u16 = 0;

/// Playable roster; character id is the index into this table.
pub const CHARACTER_NAMES: [&str; CHARACTER_COUNT] = [
    "Terra", "Locke", "Cyan", "Shadow", "Edgar", "Sabin", "Celes", "Strago", "Relm", "Setzer",
    "Mog", "Gau", "Gogo", "Umaro", "Banon", "Leo",
];

pub fn character_name(id: u8) -> Option<&'static str> {
    CHARACTER_NAMES.get(id as usize).copied()
}

pub fn character_id_by_name(name: &str) -> Option<u8> {
    CHARACTER_NAMES
        .iter()
        .position(|n| n.eq_ignore_ascii_case(name))
        .map(|i| i as u8)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Weapon,
    Shield,
    Helmet,
    Armor,
    Relic,
}

pub struct ItemEntry {
    pub id: u16,
    pub name: &'static str,
    pub kind: ItemKind,
}

// Curated equipment table. Identifiers follow the remaster numbering the
// presets reference; gaps between entries are deliberately not valid ids.
#[rustfmt::skip]
pub const ITEMS: &[ItemEntry] = &[
    // Weapons
    ItemEntry { id: 101, name: "Dirk",            kind: ItemKind::Weapon },
    ItemEntry { id: 102, name: "Mythril Knife",   kind: ItemKind::Weapon },
    ItemEntry { id: 104, name: "Mythril Sword",   kind: ItemKind::Weapon },
    ItemEntry { id: 106, name: "Regal Cutlass",   kind: ItemKind::Weapon },
    ItemEntry { id: 108, name: "Flame Sabre",     kind: ItemKind::Weapon },
    ItemEntry { id: 110, name: "Blizzard Sabre",  kind: ItemKind::Weapon },
    ItemEntry { id: 113, name: "Excalibur",       kind: ItemKind::Weapon },
    ItemEntry { id: 117, name: "Icebrand",        kind: ItemKind::Weapon },
    ItemEntry { id: 120, name: "Ragnarok",        kind: ItemKind::Weapon },
    ItemEntry { id: 122, name: "Ultima Weapon",   kind: ItemKind::Weapon },
    ItemEntry { id: 125, name: "Valiant Knife",   kind: ItemKind::Weapon },

    // Shields
    ItemEntry { id: 201, name: "Buckler",         kind: ItemKind::Shield },
    ItemEntry { id: 202, name: "Heavy Shield",    kind: ItemKind::Shield },
    ItemEntry { id: 203, name: "Mythril Shield",  kind: ItemKind::Shield },
    ItemEntry { id: 205, name: "Golden Shield",   kind: ItemKind::Shield },
    ItemEntry { id: 207, name: "Aegis Shield",    kind: ItemKind::Shield },
    ItemEntry { id: 209, name: "Crystal Shield",  kind: ItemKind::Shield },
    ItemEntry { id: 211, name: "Genji Shield",    kind: ItemKind::Shield },
    ItemEntry { id: 213, name: "Paladin's Shield", kind: ItemKind::Shield },

    // Helmets
    ItemEntry { id: 221, name: "Leather Hat",     kind: ItemKind::Helmet },
    ItemEntry { id: 223, name: "Iron Helm",       kind: ItemKind::Helmet },
    ItemEntry { id: 227, name: "Mythril Helm",    kind: ItemKind::Helmet },
    ItemEntry { id: 231, name: "Golden Helm",     kind: ItemKind::Helmet },
    ItemEntry { id: 237, name: "Crystal Helm",    kind: ItemKind::Helmet },
    ItemEntry { id: 239, name: "Genji Helmet",    kind: ItemKind::Helmet },

    // Armor
    ItemEntry { id: 251, name: "Leather Armor",   kind: ItemKind::Armor },
    ItemEntry { id: 252, name: "Mythril Mail",    kind: ItemKind::Armor },
    ItemEntry { id: 255, name: "Golden Armor",    kind: ItemKind::Armor },
    ItemEntry { id: 259, name: "Crystal Mail",    kind: ItemKind::Armor },
    ItemEntry { id: 262, name: "Force Armor",     kind: ItemKind::Armor },
    ItemEntry { id: 266, name: "Genji Armor",     kind: ItemKind::Armor },
    ItemEntry { id: 268, name: "Minerva Bustier", kind: ItemKind::Armor },

    // Relics
    ItemEntry { id: 301, name: "Ribbon",          kind: ItemKind::Relic },
    ItemEntry { id: 302, name: "Sprint Shoes",    kind: ItemKind::Relic },
    ItemEntry { id: 303, name: "Hermes Sandals",  kind: ItemKind::Relic },
    ItemEntry { id: 305, name: "Celestriad",      kind: ItemKind::Relic },
    ItemEntry { id: 307, name: "Gem Box",         kind: ItemKind::Relic },
    ItemEntry { id: 309, name: "Genji Glove",     kind: ItemKind::Relic },
    ItemEntry { id: 311, name: "Master's Scroll", kind: ItemKind::Relic },
    ItemEntry { id: 313, name: "Exp. Egg",        kind: ItemKind::Relic },
];

pub fn item(id: u16) -> Option<&'static ItemEntry> {
    ITEMS.iter().find(|entry| entry.id == id)
}

/// Whether an equipment slot value is acceptable: the empty sentinel or a
/// cataloged item.
pub fn is_known_item(id: u16) -> bool {
    id == EMPTY_ITEM || item(id).is_some()
}

#[rustfmt::skip]
pub const COMMAND_NAMES: [&str; COMMAND_COUNT] = [
    "Fight", "Item", "Magic", "Morph", "Revert", "Steal", "Capture", "Magitek",
    "Throw", "Tools", "Blitz", "Runic", "Lore", "Sketch", "Control", "Slot",
    "Rage", "Leap", "Mimic", "Dance", "Row", "Defend", "Jump", "X-Magic",
    "GP Rain", "Summon", "Health", "Shock", "Possess", "Magic (Dual)",
];

#[rustfmt::skip]
pub const SPELL_NAMES: [&str; SPELL_COUNT] = [
    // Healing and support
    "Cure", "Cura", "Curaga", "Raise", "Arise", "Poisona", "Esuna", "Regen",
    "Reraise", "Antdot", "Protect", "Shell", "Haste", "Slow", "Hastega",
    "Slowga", "Float", "Imp", "Teleport", "Quick",
    // Effect
    "Berserk", "Confuse", "Silence", "Sleep", "Stop", "Banish", "Gravity",
    "Graviga", "Doom", "Meteor", "Ultima", "Quake", "Tornado", "Holy",
    "Flood", "Libra", "Drain", "Osmose", "Rasp", "Vanish",
    // Elemental line
    "Fire", "Blizzard", "Thunder", "Fira", "Blizzara", "Thundara", "Poison",
    "Bio", "Flare", "Firaga", "Blizzaga", "Thundaga",
    // Top end
    "Death", "Meltdown",
];

/// Index of the first elemental spell ("Fire"); the Magitek rig teaches
/// the twelve spells starting here.
pub const ELEMENTAL_SPELLS_START: u8 = 40;
pub const ELEMENTAL_SPELLS_LEN: u8 = 12;

/// Command table index of "Magitek".
pub const MAGITEK_COMMAND: u8 = 7;

#[rustfmt::skip]
pub const STATUS_NAMES: [&str; STATUS_COUNT] = [
    "Dark", "Zombie", "Poison", "Magitek", "Vanish", "Imp", "Petrify", "Death",
    "Doom", "Critical", "Blink", "Silence", "Berserk", "Confusion", "Sap", "Sleep",
];

pub struct MapEntry {
    pub id: u16,
    pub name: &'static str,
}

#[rustfmt::skip]
pub const MAPS: &[MapEntry] = &[
    MapEntry { id: 1,  name: "World of Balance" },
    MapEntry { id: 2,  name: "World of Ruin" },
    MapEntry { id: 3,  name: "Narshe" },
    MapEntry { id: 4,  name: "Figaro Castle" },
    MapEntry { id: 5,  name: "South Figaro" },
    MapEntry { id: 6,  name: "Kohlingen" },
    MapEntry { id: 7,  name: "Jidoor" },
    MapEntry { id: 8,  name: "Zozo" },
    MapEntry { id: 9,  name: "Vector" },
    MapEntry { id: 10, name: "Albrook" },
    MapEntry { id: 11, name: "Thamasa" },
    MapEntry { id: 12, name: "Doma Castle" },
    MapEntry { id: 13, name: "Mobliz" },
    MapEntry { id: 14, name: "Nikeah" },
    MapEntry { id: 15, name: "Tzen" },
    MapEntry { id: 16, name: "Maranda" },
    MapEntry { id: 17, name: "Opera House" },
    MapEntry { id: 18, name: "Kefka's Tower" },
];

pub fn map_name(id: u16) -> Option<&'static str> {
    MAPS.iter().find(|m| m.id == id).map(|m| m.name)
}
