use serde::{Deserialize, Serialize};

use super::grid::{GridGeometry, WorldGrid};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenInfo {
    pub id: u32,
    pub grid_x: u32,
    pub grid_y: u32,
    pub tile_x: u32,
    pub tile_y: u32,
    pub pixel_x: u32,
    pub pixel_y: u32,
    pub width_tiles: u32,
    pub height_tiles: u32,
}

/// Per-screen layout table written next to a map for tooling and debugging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenMetadata {
    pub tile_size: u32,
    pub screen_width_tiles: u32,
    pub screen_height_tiles: u32,
    pub screen_width_pixels: u32,
    pub screen_height_pixels: u32,
    pub total_screens_wide: u32,
    pub total_screens_tall: u32,
    pub total_screens: u32,
    pub screens: Vec<ScreenInfo>,
}

impl ScreenMetadata {
    pub fn for_grid(grid: &WorldGrid) -> Self {
        Self::for_layout(grid.geometry(), grid.screens_wide(), grid.screens_tall())
    }

    pub fn for_layout(geometry: GridGeometry, screens_wide: u32, screens_tall: u32) -> Self {
        let mut screens = Vec::with_capacity(screens_wide.saturating_mul(screens_tall) as usize);
        for grid_y in 0..screens_tall {
            for grid_x in 0..screens_wide {
                let tile_x = grid_x.saturating_mul(geometry.screen_width_tiles);
                let tile_y = grid_y.saturating_mul(geometry.screen_height_tiles);
                screens.push(ScreenInfo {
                    id: grid_y.saturating_mul(screens_wide).saturating_add(grid_x),
                    grid_x,
                    grid_y,
                    tile_x,
                    tile_y,
                    pixel_x: tile_x.saturating_mul(geometry.tile_width),
                    pixel_y: tile_y.saturating_mul(geometry.tile_height),
                    width_tiles: geometry.screen_width_tiles,
                    height_tiles: geometry.screen_height_tiles,
                });
            }
        }

        Self {
            tile_size: geometry.tile_width,
            screen_width_tiles: geometry.screen_width_tiles,
            screen_height_tiles: geometry.screen_height_tiles,
            screen_width_pixels: geometry.screen_width_px(),
            screen_height_pixels: geometry.screen_height_px(),
            total_screens_wide: screens_wide,
            total_screens_tall: screens_tall,
            total_screens: screens_wide.saturating_mul(screens_tall),
            screens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screens_are_listed_row_major_with_pixel_origins() {
        let metadata = ScreenMetadata::for_layout(GridGeometry::default(), 16, 8);
        assert_eq!(metadata.total_screens, 128);
        assert_eq!(metadata.screen_width_pixels, 256);
        assert_eq!(metadata.screen_height_pixels, 176);

        let screen = &metadata.screens[17];
        assert_eq!(screen.id, 17);
        assert_eq!((screen.grid_x, screen.grid_y), (1, 1));
        assert_eq!((screen.tile_x, screen.tile_y), (16, 11));
        assert_eq!((screen.pixel_x, screen.pixel_y), (256, 176));
    }

    #[test]
    fn empty_grid_has_no_screens() {
        let metadata = ScreenMetadata::for_grid(&WorldGrid::empty());
        assert_eq!(metadata.total_screens, 0);
        assert!(metadata.screens.is_empty());
    }
}
