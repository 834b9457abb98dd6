use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::color::{PALETTE_SIZE, Palette};
use crate::sprite::{Provenance, Sprite, SpriteSource};

// Sprite geometry is a contract constant of the cartridge format, not
// something inferred from the data.
pub const FIELD_SPRITE_WIDTH: i32 = 16;
pub const FIELD_SPRITE_HEIGHT: i32 = 24;
pub const FIELD_SPRITE_FRAMES: i32 = 3;
pub const BATTLE_SPRITE_WIDTH: i32 = 32;
pub const BATTLE_SPRITE_HEIGHT: i32 = 32;
pub const BATTLE_SPRITE_FRAMES: i32 = 6;

pub const FIELD_SPRITE_BYTES: usize =
    (FIELD_SPRITE_WIDTH * FIELD_SPRITE_HEIGHT / 2 * FIELD_SPRITE_FRAMES) as usize;
pub const BATTLE_SPRITE_BYTES: usize =
    (BATTLE_SPRITE_WIDTH * BATTLE_SPRITE_HEIGHT / 2 * BATTLE_SPRITE_FRAMES) as usize;

const COPIER_HEADER_LEN: usize = 512;
const BANK_SIZE: usize = 0x8000;

const CHARACTER_PALETTE_BASE: usize = 0x26_8000;
const PALETTE_BYTES: usize = PALETTE_SIZE * 2;

#[derive(Debug, Clone, Copy)]
struct CharacterArt {
    id: u8,
    field_offset: usize,
    battle_offset: usize,
    palette_index: u8,
}

// Fixed per-character resource table. Field blocks are 0x240 bytes apart,
// battle blocks 0xC00; palettes share a small pool indexed per character.
#[rustfmt::skip]
const CHARACTER_ART: &[CharacterArt] = &[
    CharacterArt { id:  0, field_offset: 0x15_0000, battle_offset: 0x16_0000, palette_index: 2 }, // Terra
    CharacterArt { id:  1, field_offset: 0x15_0240, battle_offset: 0x16_0C00, palette_index: 1 }, // Locke
    CharacterArt { id:  2, field_offset: 0x15_0480, battle_offset: 0x16_1800, palette_index: 4 }, // Cyan
    CharacterArt { id:  3, field_offset: 0x15_06C0, battle_offset: 0x16_2400, palette_index: 4 }, // Shadow
    CharacterArt { id:  4, field_offset: 0x15_0900, battle_offset: 0x16_3000, palette_index: 0 }, // Edgar
    CharacterArt { id:  5, field_offset: 0x15_0B40, battle_offset: 0x16_3C00, palette_index: 0 }, // Sabin
    CharacterArt { id:  6, field_offset: 0x15_0D80, battle_offset: 0x16_4800, palette_index: 0 }, // Celes
    CharacterArt { id:  7, field_offset: 0x15_0FC0, battle_offset: 0x16_5400, palette_index: 3 }, // Strago
    CharacterArt { id:  8, field_offset: 0x15_1200, battle_offset: 0x16_6000, palette_index: 3 }, // Relm
    CharacterArt { id:  9, field_offset: 0x15_1440, battle_offset: 0x16_6C00, palette_index: 4 }, // Setzer
    CharacterArt { id: 10, field_offset: 0x15_1680, battle_offset: 0x16_7800, palette_index: 5 }, // Mog
    CharacterArt { id: 11, field_offset: 0x15_18C0, battle_offset: 0x16_8400, palette_index: 3 }, // Gau
    CharacterArt { id: 12, field_offset: 0x15_1B00, battle_offset: 0x16_9000, palette_index: 3 }, // Gogo
    CharacterArt { id: 13, field_offset: 0x15_1D40, battle_offset: 0x16_9C00, palette_index: 5 }, // Umaro
    CharacterArt { id: 14, field_offset: 0x15_1F80, battle_offset: 0x16_A800, palette_index: 1 }, // Banon
    CharacterArt { id: 15, field_offset: 0x15_21C0, battle_offset: 0x16_B400, palette_index: 0 }, // Leo
];

fn art_for(id: u8) -> Option<&'static CharacterArt> {
    CHARACTER_ART.iter().find(|art| art.id == id)
}

#[derive(Debug, thiserror::Error)]
pub enum RomError {
    #[error("no ROM image is loaded")]
    NotLoaded,

    #[error("character id {0} has no resource table entry")]
    UnknownCharacter(u8),

    #[error("ROM truncated: need {need} bytes at offset {offset:#x}, ROM is {rom_len} bytes")]
    TruncatedData {
        offset: usize,
        need: usize,
        rom_len: usize,
    },

    #[error("failed to read ROM image: {0}")]
    Io(#[from] std::io::Error),
}

/// A flat cartridge image with any copier header already stripped.
#[derive(Debug, Clone)]
pub struct RomImage {
    path: Option<PathBuf>,
    data: Vec<u8>,
}

impl RomImage {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RomError> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        let mut image = Self::from_bytes(data);
        image.path = Some(path.to_path_buf());
        debug!(path = %path.display(), len = image.data.len(), "loaded ROM image");
        Ok(image)
    }

    /// Headered dumps (.smc) carry a 512-byte copier header in front of
    /// the bank-aligned data; headerless dumps (.sfc) do not.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let data = if data.len() % BANK_SIZE == COPIER_HEADER_LEN {
            data[COPIER_HEADER_LEN..].to_vec()
        } else {
            data
        };
        Self { path: None, data }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn span(&self, offset: usize, need: usize) -> Result<&[u8], RomError> {
        let end = offset.checked_add(need).ok_or(RomError::TruncatedData {
            offset,
            need,
            rom_len: self.data.len(),
        })?;
        self.data.get(offset..end).ok_or(RomError::TruncatedData {
            offset,
            need,
            rom_len: self.data.len(),
        })
    }
}

/// Extracts character graphics out of one loaded ROM. One instance per
/// ROM; discard and rebuild when the ROM changes.
#[derive(Debug, Default)]
pub struct RomExtractor {
    rom: Option<RomImage>,
    palette_cache: RwLock<HashMap<u8, Palette>>,
}

impl RomExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rom(rom: RomImage) -> Self {
        Self {
            rom: Some(rom),
            palette_cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.rom.is_some()
    }

    fn rom(&self) -> Result<&RomImage, RomError> {
        self.rom.as_ref().ok_or(RomError::NotLoaded)
    }

    /// 16x24, 3-frame walking sprite used on the world and town maps.
    pub fn extract_field_sprite(&self, id: u8) -> Result<Sprite, RomError> {
        let art = art_for(id).ok_or(RomError::UnknownCharacter(id))?;
        let rom = self.rom()?;
        let bytes = rom.span(art.field_offset, FIELD_SPRITE_BYTES)?;
        Ok(self.build_sprite(
            format!("char{id}_field"),
            FIELD_SPRITE_WIDTH,
            FIELD_SPRITE_HEIGHT,
            FIELD_SPRITE_FRAMES,
            art.field_offset,
            bytes,
            id,
        ))
    }

    /// 32x32, 6-frame battle sprite.
    pub fn extract_battle_sprite(&self, id: u8) -> Result<Sprite, RomError> {
        let art = art_for(id).ok_or(RomError::UnknownCharacter(id))?;
        let rom = self.rom()?;
        let bytes = rom.span(art.battle_offset, BATTLE_SPRITE_BYTES)?;
        Ok(self.build_sprite(
            format!("char{id}_battle"),
            BATTLE_SPRITE_WIDTH,
            BATTLE_SPRITE_HEIGHT,
            BATTLE_SPRITE_FRAMES,
            art.battle_offset,
            bytes,
            id,
        ))
    }

    /// The character's 16-color palette. Served from the cache when the
    /// background fill has already produced it, decoded on demand (and
    /// cached) otherwise.
    pub fn extract_character_palette(&self, id: u8) -> Result<Palette, RomError> {
        if let Some(palette) = self.cached_palette(id) {
            return Ok(palette);
        }

        let palette = self.decode_palette(id)?;
        if let Ok(mut cache) = self.palette_cache.write() {
            cache.insert(id, palette.clone());
        }
        Ok(palette)
    }

    /// Pure cache lookup; never touches the ROM.
    pub fn cached_palette(&self, id: u8) -> Option<Palette> {
        self.palette_cache
            .read()
            .ok()
            .and_then(|cache| cache.get(&id).cloned())
    }

    pub fn cached_palette_count(&self) -> usize {
        self.palette_cache.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Fill the palette cache for the whole roster on a background
    /// thread. Each entry is inserted complete; concurrent readers see
    /// either a miss or a finished palette. Returns the number of
    /// palettes cached.
    pub fn load_all_palettes_cached(self: &Arc<Self>) -> JoinHandle<usize> {
        let extractor = Arc::clone(self);
        thread::spawn(move || {
            let mut cached = 0usize;
            for art in CHARACTER_ART {
                match extractor.decode_palette(art.id) {
                    Ok(palette) => {
                        if let Ok(mut cache) = extractor.palette_cache.write() {
                            cache.insert(art.id, palette);
                            cached += 1;
                        }
                    }
                    Err(err) => {
                        warn!(id = art.id, %err, "palette pre-cache skipped character");
                    }
                }
            }
            debug!(cached, "palette pre-cache finished");
            cached
        })
    }

    fn decode_palette(&self, id: u8) -> Result<Palette, RomError> {
        let art = art_for(id).ok_or(RomError::UnknownCharacter(id))?;
        let rom = self.rom()?;
        let offset = CHARACTER_PALETTE_BASE + art.palette_index as usize * PALETTE_BYTES;
        let bytes = rom.span(offset, PALETTE_BYTES)?;
        let mut fixed = [0u8; PALETTE_BYTES];
        fixed.copy_from_slice(bytes);
        Ok(Palette::from_bytes(&fixed))
    }

    #[allow(clippy::too_many_arguments)]
    fn build_sprite(
        &self,
        sprite_id: String,
        width: i32,
        height: i32,
        frames: i32,
        offset: usize,
        bytes: &[u8],
        character_id: u8,
    ) -> Sprite {
        let mut sprite = Sprite::new(sprite_id, width, height, frames, bytes.to_vec());
        sprite.provenance = Provenance::new(SpriteSource::Rom { offset }, bytes);
        // A missing palette is survivable; the caller renders with a
        // placeholder.
        sprite.palette = self.extract_character_palette(character_id).ok();
        sprite
    }
}
