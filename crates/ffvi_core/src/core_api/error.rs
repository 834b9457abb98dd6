use crate::rom::RomError;
use crate::save::SaveError;
use crate::undo::UndoError;

/// Everything that can go wrong at the editor's operation surface.
/// Callers branch on the variant; the inner errors keep their structure.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Save(#[from] SaveError),

    #[error(transparent)]
    Rom(#[from] RomError),

    #[error(transparent)]
    Undo(#[from] UndoError),

    #[error("state persistence failed: {0}")]
    StatePersistence(#[from] serde_json::Error),

    #[error("buffer parses as more than one save format; supply a format tag")]
    FormatDetectionAmbiguous,

    #[error("buffer matches no known save format: snes: {snes}; psx: {psx}")]
    FormatDetectionFailed { snes: SaveError, psx: SaveError },
}
