use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::color::Palette;

/// Default per-frame duration when a frame has none, or a non-positive one.
pub const DEFAULT_FRAME_DURATION_MS: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpriteSource {
    Rom { offset: usize },
    Imported,
    Synthetic,
}

/// Where sprite data came from and what it looked like at import time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub source: SpriteSource,
    pub imported_at: DateTime<Utc>,
    pub crc32: u32,
}

impl Provenance {
    pub fn new(source: SpriteSource, data: &[u8]) -> Self {
        let mut crc = flate2::Crc::new();
        crc.update(data);
        Self {
            source,
            imported_at: Utc::now(),
            crc32: crc.sum(),
        }
    }
}

/// Tile-indexed pixel data, packed two pixels per byte (high nibble first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sprite {
    pub id: String,
    pub width: i32,
    pub height: i32,
    pub frames: i32,
    pub data: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub palette: Option<Palette>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_durations: Option<Vec<u32>>,
    pub provenance: Provenance,
}

impl Sprite {
    pub fn new(id: impl Into<String>, width: i32, height: i32, frames: i32, data: Vec<u8>) -> Self {
        let provenance = Provenance::new(SpriteSource::Synthetic, &data);
        Self {
            id: id.into(),
            width,
            height,
            frames,
            data,
            palette: None,
            frame_durations: None,
            provenance,
        }
    }

    pub fn bytes_per_frame(&self) -> usize {
        if self.width <= 0 || self.height <= 0 {
            return 0;
        }
        (self.width as usize * self.height as usize) / 2
    }

    /// Split packed multi-frame data into independent single-frame sprites.
    ///
    /// Produces `min(frames, data.len() / bytes_per_frame)` frames; a frame
    /// whose byte range would run past the buffer is omitted, because ROM
    /// and save data is frequently truncated or only partially populated.
    /// Non-positive dimensions or frame counts yield no frames.
    pub fn decode_frames(&self) -> Vec<Sprite> {
        let bytes_per_frame = self.bytes_per_frame();
        if bytes_per_frame == 0 || self.frames <= 0 {
            return Vec::new();
        }

        let available = self.data.len() / bytes_per_frame;
        let count = (self.frames as usize).min(available);

        (0..count)
            .map(|n| {
                let start = n * bytes_per_frame;
                let data = self.data[start..start + bytes_per_frame].to_vec();
                Sprite {
                    id: format!("{}_frame_{n}", self.id),
                    width: self.width,
                    height: self.height,
                    frames: 1,
                    data,
                    palette: self.palette.clone(),
                    frame_durations: None,
                    provenance: self.provenance.clone(),
                }
            })
            .collect()
    }

    /// Inverse of [`decode_frames`]: concatenating the frames' bytes
    /// reproduces the byte range decoding consumed.
    pub fn encode_frames(
        id: impl Into<String>,
        width: i32,
        height: i32,
        frames: &[Sprite],
    ) -> Sprite {
        let mut data = Vec::new();
        for frame in frames {
            data.extend_from_slice(&frame.data);
        }
        let mut sprite = Sprite::new(id, width, height, frames.len() as i32, data);
        sprite.palette = frames.first().and_then(|f| f.palette.clone());
        sprite
    }

    /// Flat per-pixel palette indices for one decoded frame.
    pub fn pixel_indices(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() * 2);
        for &byte in &self.data {
            out.push(byte >> 4);
            out.push(byte & 0x0F);
        }
        out
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackMode {
    #[default]
    Loop,
    Once,
    PingPong,
}

/// Render-ready animation derived from a multi-frame sprite. Built on
/// demand; never persisted with the save state.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationData {
    pub name: String,
    pub frames: Vec<Sprite>,
    pub durations_ms: Vec<u32>,
    pub mode: PlaybackMode,
    pub speed: f32,
    pub total_duration_ms: u32,
    pub frame_count: usize,
}

impl AnimationData {
    pub fn from_sprite(sprite: &Sprite) -> Self {
        let frames = sprite.decode_frames();
        let durations_ms: Vec<u32> = (0..frames.len())
            .map(|n| {
                sprite
                    .frame_durations
                    .as_ref()
                    .and_then(|d| d.get(n).copied())
                    .filter(|&d| d > 0)
                    .unwrap_or(DEFAULT_FRAME_DURATION_MS)
            })
            .collect();
        let total_duration_ms = durations_ms.iter().sum();
        let frame_count = frames.len();

        Self {
            name: sprite.id.clone(),
            frames,
            durations_ms,
            mode: PlaybackMode::default(),
            speed: 1.0,
            total_duration_ms,
            frame_count,
        }
    }
}
