pub mod codec;
pub mod layout;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::state::StateGraph;
use layout::{PSX_LAYOUT, SNES_LAYOUT, SaveLayout};

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("missing {expected:?} signature at offset {offset:#x}")]
    BadMagic {
        offset: usize,
        expected: &'static [u8],
    },

    #[error("checksum mismatch in slot {slot}: stored {stored:#06x}, computed {computed:#06x}")]
    ChecksumMismatch {
        slot: usize,
        stored: u16,
        computed: u16,
    },

    #[error("record truncated at offset {offset:#x}: need {need} bytes, have {have}")]
    TruncatedRecord {
        offset: usize,
        need: usize,
        have: usize,
    },

    #[error("slot {slot} out of range; format has {slot_count} slot(s)")]
    SlotOutOfRange { slot: usize, slot_count: usize },

    #[error("{field} value {value} does not fit the format (max {max})")]
    FieldOutOfRange {
        field: String,
        value: u64,
        max: u64,
    },

    #[error("unsupported save format tag {0:?}")]
    UnsupportedFormat(String),
}

/// Which fixed binary layout governs a save buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveFormat {
    Snes,
    Playstation,
}

impl SaveFormat {
    pub const ALL: [SaveFormat; 2] = [SaveFormat::Snes, SaveFormat::Playstation];

    pub fn layout(&self) -> &'static SaveLayout {
        match self {
            Self::Snes => &SNES_LAYOUT,
            Self::Playstation => &PSX_LAYOUT,
        }
    }

    pub fn tag(&self) -> &'static str {
        self.layout().name
    }

    pub fn from_tag(tag: &str) -> Result<Self, SaveError> {
        match tag.to_ascii_lowercase().as_str() {
            "snes" | "sram" | "srm" => Ok(Self::Snes),
            "psx" | "playstation" | "ps1" => Ok(Self::Playstation),
            other => Err(SaveError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn slot_count(&self) -> usize {
        self.layout().slot_count
    }
}

/// One loaded save buffer. Keeps the originally read bytes so that a save
/// only rewrites the records the editor owns; everything else in the file
/// is emitted byte-identical.
#[derive(Debug, Clone)]
pub struct Document {
    format: SaveFormat,
    original: Vec<u8>,
}

impl Document {
    /// Take ownership of a raw save buffer, verifying only its gross
    /// shape. Per-slot validation happens at [`Document::load`].
    pub fn new(bytes: Vec<u8>, format: SaveFormat) -> Result<Self, SaveError> {
        let layout = format.layout();
        if let Some((offset, expected)) = layout.magic {
            let found = bytes.get(offset..offset + expected.len());
            if found != Some(expected) {
                return Err(SaveError::BadMagic { offset, expected });
            }
        }
        if bytes.len() < layout.file_len {
            return Err(SaveError::TruncatedRecord {
                offset: 0,
                need: layout.file_len,
                have: bytes.len(),
            });
        }
        Ok(Self {
            format,
            original: bytes,
        })
    }

    /// A factory-fresh buffer: every slot carries the default roster,
    /// magic in place, checksums consistent.
    pub fn blank(format: SaveFormat) -> Self {
        let layout = format.layout();
        let mut bytes = vec![0u8; layout.file_len];
        if let Some((offset, expected)) = layout.magic {
            bytes[offset..offset + expected.len()].copy_from_slice(expected);
        }
        let defaults = StateGraph::default();
        for slot in 0..layout.slot_count {
            codec::encode_slot(&defaults, layout, slot, &mut bytes)
                .expect("default state graph fits every layout");
            layout::write_checksum(layout, &mut bytes, slot);
        }
        Self {
            format,
            original: bytes,
        }
    }

    pub fn format(&self) -> SaveFormat {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.original
    }

    /// Decode one slot into a state graph.
    pub fn load(&self, slot: usize) -> Result<StateGraph, SaveError> {
        let graph = codec::decode_slot(&self.original, self.format.layout(), slot)?;
        debug!(format = self.format.tag(), slot, "loaded state graph");
        Ok(graph)
    }

    /// Serialize a state graph into `slot`, re-deriving the checksum.
    /// Bytes outside the encoded records are preserved from the original
    /// buffer.
    pub fn save(&self, graph: &StateGraph, slot: usize) -> Result<Vec<u8>, SaveError> {
        let layout = self.format.layout();
        let mut out = self.original.clone();
        codec::encode_slot(graph, layout, slot, &mut out)?;
        layout::write_checksum(layout, &mut out, slot);
        debug!(format = self.format.tag(), slot, "serialized state graph");
        Ok(out)
    }

    /// Detect which layout a buffer uses, when the caller has no tag.
    /// Exact file length plus magic; content validation happens at load.
    pub fn detect_format(bytes: &[u8]) -> Option<SaveFormat> {
        SaveFormat::ALL.into_iter().find(|format| {
            let layout = format.layout();
            if bytes.len() != layout.file_len {
                return false;
            }
            match layout.magic {
                Some((offset, expected)) => {
                    bytes.get(offset..offset + expected.len()) == Some(expected)
                }
                None => true,
            }
        })
    }
}
