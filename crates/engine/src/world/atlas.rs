use std::path::PathBuf;

use super::grid::{DEFAULT_TILE_SIZE_PX, EMPTY_TILE};

pub const DEFAULT_ATLAS_COLUMNS: u32 = 63;
pub const DEFAULT_ATLAS_ROWS: u32 = 62;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasCell {
    pub col: u32,
    pub row: u32,
}

/// Grid layout of the tileset image that tile ids index into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileAtlas {
    pub columns: u32,
    pub rows: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub image: Option<PathBuf>,
}

impl Default for TileAtlas {
    fn default() -> Self {
        Self {
            columns: DEFAULT_ATLAS_COLUMNS,
            rows: DEFAULT_ATLAS_ROWS,
            tile_width: DEFAULT_TILE_SIZE_PX,
            tile_height: DEFAULT_TILE_SIZE_PX,
            image: None,
        }
    }
}

impl TileAtlas {
    pub fn capacity(&self) -> u32 {
        self.columns.saturating_mul(self.rows)
    }

    pub fn cell_for(&self, tile_id: u32) -> Option<AtlasCell> {
        if tile_id == EMPTY_TILE || self.columns == 0 || tile_id > self.capacity() {
            return None;
        }
        let index = tile_id - 1;
        Some(AtlasCell {
            col: index % self.columns,
            row: index / self.columns,
        })
    }

    pub fn source_rect_px(&self, cell: AtlasCell) -> (u32, u32, u32, u32) {
        (
            cell.col * self.tile_width,
            cell.row * self.tile_height,
            self.tile_width,
            self.tile_height,
        )
    }
}
