use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tracing::{debug, info};

use crate::rom::{RomExtractor, RomImage};
use crate::save::{Document, SaveFormat};
use crate::state::StateGraph;
use crate::undo::UndoStack;
use crate::validate::{self, ValidationResult};

use super::error::CoreError;

#[derive(Debug, Default, Clone, Copy)]
pub struct Engine;

impl Engine {
    pub fn new() -> Self {
        Self
    }

    pub fn open_path(
        &self,
        path: impl AsRef<Path>,
        slot: usize,
        hint: Option<SaveFormat>,
    ) -> Result<Session, CoreError> {
        let bytes = fs::read(path.as_ref())?;
        self.open_bytes(bytes, slot, hint)
    }

    pub fn open_bytes(
        &self,
        bytes: Vec<u8>,
        slot: usize,
        hint: Option<SaveFormat>,
    ) -> Result<Session, CoreError> {
        match hint {
            Some(format) => {
                let document = Document::new(bytes, format)?;
                let graph = document.load(slot)?;
                Ok(Session::new(document, graph, slot))
            }
            None => {
                let snes = open_as(&bytes, SaveFormat::Snes, slot);
                let psx = open_as(&bytes, SaveFormat::Playstation, slot);
                match (snes, psx) {
                    (Ok(session), Err(_)) | (Err(_), Ok(session)) => Ok(session),
                    (Ok(_), Ok(_)) => Err(CoreError::FormatDetectionAmbiguous),
                    (Err(snes), Err(psx)) => Err(CoreError::FormatDetectionFailed { snes, psx }),
                }
            }
        }
    }

    /// A session over a factory-fresh buffer, for building saves from
    /// scratch.
    pub fn new_session(&self, format: SaveFormat, slot: usize) -> Result<Session, CoreError> {
        let document = Document::blank(format);
        let graph = document.load(slot)?;
        Ok(Session::new(document, graph, slot))
    }
}

fn open_as(
    bytes: &[u8],
    format: SaveFormat,
    slot: usize,
) -> Result<Session, crate::save::SaveError> {
    let document = Document::new(bytes.to_vec(), format)?;
    let graph = document.load(slot)?;
    Ok(Session::new(document, graph, slot))
}

/// One editing session: exclusive owner of the live state graph, its
/// originating document, and the undo history. All mutation goes through
/// `&mut self`, so two saves or loads can never race over one graph.
#[derive(Debug)]
pub struct Session {
    document: Document,
    graph: StateGraph,
    slot: usize,
    undo: UndoStack,
    rom: Option<Arc<RomExtractor>>,
}

impl Session {
    fn new(document: Document, graph: StateGraph, slot: usize) -> Self {
        info!(format = document.format().tag(), slot, "opened editing session");
        Self {
            document,
            graph,
            slot,
            undo: UndoStack::default(),
            rom: None,
        }
    }

    pub fn format(&self) -> SaveFormat {
        self.document.format()
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn graph(&self) -> &StateGraph {
        &self.graph
    }

    /// Mutable access for editors. Call [`Session::checkpoint`] first if
    /// the edit should be undoable.
    pub fn graph_mut(&mut self) -> &mut StateGraph {
        &mut self.graph
    }

    /// Snapshot the live graph before a mutation-bearing operation.
    pub fn checkpoint(&mut self) {
        self.undo.push(&self.graph);
    }

    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    /// Replace the live graph with the previous snapshot, wholesale.
    pub fn undo(&mut self) -> Result<&StateGraph, CoreError> {
        self.graph = self.undo.undo(&self.graph)?;
        Ok(&self.graph)
    }

    pub fn redo(&mut self) -> Result<&StateGraph, CoreError> {
        self.graph = self.undo.redo()?;
        Ok(&self.graph)
    }

    pub fn validate(&self) -> ValidationResult {
        validate::validate(&self.graph)
    }

    /// Deterministic repair pass; snapshots first so it can be undone.
    pub fn auto_fix(&mut self) -> usize {
        self.checkpoint();
        validate::auto_fix(&mut self.graph)
    }

    /// Serialize the live graph into `slot` of the loaded buffer.
    pub fn to_bytes(&self, slot: usize) -> Result<Vec<u8>, CoreError> {
        Ok(self.document.save(&self.graph, slot)?)
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>, slot: usize) -> Result<(), CoreError> {
        let bytes = self.to_bytes(slot)?;
        fs::write(path.as_ref(), bytes)?;
        info!(path = %path.as_ref().display(), slot, "wrote save file");
        Ok(())
    }

    pub fn attach_rom(&mut self, rom: RomImage) {
        self.rom = Some(Arc::new(RomExtractor::with_rom(rom)));
    }

    pub fn rom(&self) -> Option<&Arc<RomExtractor>> {
        self.rom.as_ref()
    }

    /// Pull a character's field sprite (with palette) out of the attached
    /// ROM and hang it on the character.
    pub fn load_character_art(&mut self, id: u8) -> Result<(), CoreError> {
        let extractor = self.rom.as_ref().ok_or(crate::rom::RomError::NotLoaded)?;
        let sprite = extractor.extract_field_sprite(id)?;
        if let Some(character) = self.graph.character_mut(id) {
            character.sprite = Some(sprite);
        }
        Ok(())
    }

    /// Editor-side session persistence: one gzip-compressed JSON state
    /// file per quick slot, independent of any save-file binary layout.
    pub fn quick_save(&self, dir: impl AsRef<Path>, slot: u8) -> Result<PathBuf, CoreError> {
        let path = quick_state_path(dir.as_ref(), slot);
        let json = serde_json::to_vec(&self.graph)?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json)?;
        fs::write(&path, encoder.finish()?)?;
        debug!(path = %path.display(), "wrote quick state");
        Ok(path)
    }

    /// Replace the live graph with a quick slot's contents. Snapshots
    /// first, so a mistaken load is one undo away.
    pub fn quick_load(&mut self, dir: impl AsRef<Path>, slot: u8) -> Result<(), CoreError> {
        let path = quick_state_path(dir.as_ref(), slot);
        let compressed = fs::read(&path)?;
        let mut json = Vec::new();
        GzDecoder::new(compressed.as_slice()).read_to_end(&mut json)?;
        let graph: StateGraph = serde_json::from_slice(&json)?;

        self.checkpoint();
        self.graph = graph;
        debug!(path = %path.display(), "restored quick state");
        Ok(())
    }
}

fn quick_state_path(dir: &Path, slot: u8) -> PathBuf {
    dir.join(format!("quickstate{slot}.json.gz"))
}
