//! Sprite sheet layout and composition.

use image::{imageops, RgbImage};
use std::path::{Path, PathBuf};

use crate::error::{MediaError, MediaResult};

/// Pixel rectangle of one cell inside the sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Row-major grid of equally sized frames, filled from the top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteLayout {
    pub frame_count: usize,
    pub columns: u32,
    pub rows: u32,
    pub cell_width: u32,
    pub cell_height: u32,
}

impl SpriteLayout {
    /// `rows = ceil(frame_count / columns)`. `columns` must be non-zero.
    pub fn new(frame_count: usize, columns: u32, cell_width: u32, cell_height: u32) -> Self {
        let columns = columns.max(1);
        let rows = frame_count.div_ceil(columns as usize) as u32;
        Self {
            frame_count,
            columns,
            rows,
            cell_width,
            cell_height,
        }
    }

    pub fn width(&self) -> u32 {
        self.columns * self.cell_width
    }

    pub fn height(&self) -> u32 {
        self.rows * self.cell_height
    }

    pub fn cell(&self, index: usize) -> CellRegion {
        let col = (index % self.columns as usize) as u32;
        let row = (index / self.columns as usize) as u32;
        CellRegion {
            x: col * self.cell_width,
            y: row * self.cell_height,
            width: self.cell_width,
            height: self.cell_height,
        }
    }
}

/// Paste `frames` into one sprite image and save it to `output`.
///
/// Cell size comes from the first frame. Trailing cells stay black.
/// CPU bound; call from a blocking thread.
pub fn compose_sprite(frames: &[PathBuf], columns: u32, output: &Path) -> MediaResult<SpriteLayout> {
    let first = frames
        .first()
        .ok_or_else(|| MediaError::internal("no frames to compose"))?;
    let (w, h) = image::image_dimensions(first)?;
    let layout = SpriteLayout::new(frames.len(), columns, w, h);

    let mut sprite = RgbImage::new(layout.width(), layout.height());
    for (index, path) in frames.iter().enumerate() {
        let frame = image::open(path)?.to_rgb8();
        let cell = layout.cell(index);
        imageops::replace(&mut sprite, &frame, cell.x as i64, cell.y as i64);
    }

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    sprite.save(output)?;
    Ok(layout)
}
