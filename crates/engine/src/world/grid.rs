use std::collections::HashSet;

use tracing::warn;

use crate::app::Vec2;

pub const DEFAULT_TILE_SIZE_PX: u32 = 16;
pub const DEFAULT_SCREEN_WIDTH_TILES: u32 = 16;
pub const DEFAULT_SCREEN_HEIGHT_TILES: u32 = 11;

/// Tile id meaning "no tile". Also returned for every out-of-range query.
pub const EMPTY_TILE: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridGeometry {
    pub tile_width: u32,
    pub tile_height: u32,
    pub screen_width_tiles: u32,
    pub screen_height_tiles: u32,
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self {
            tile_width: DEFAULT_TILE_SIZE_PX,
            tile_height: DEFAULT_TILE_SIZE_PX,
            screen_width_tiles: DEFAULT_SCREEN_WIDTH_TILES,
            screen_height_tiles: DEFAULT_SCREEN_HEIGHT_TILES,
        }
    }
}

impl GridGeometry {
    pub fn screen_width_px(&self) -> u32 {
        self.screen_width_tiles.saturating_mul(self.tile_width)
    }

    pub fn screen_height_px(&self) -> u32 {
        self.screen_height_tiles.saturating_mul(self.tile_height)
    }

    /// Replaces each field with the override when the override is positive.
    pub fn with_overrides(
        self,
        tile_width: Option<i64>,
        tile_height: Option<i64>,
        screen_width_tiles: Option<i64>,
        screen_height_tiles: Option<i64>,
    ) -> Self {
        fn pick(current: u32, candidate: Option<i64>) -> u32 {
            candidate
                .filter(|value| *value > 0)
                .and_then(|value| u32::try_from(value).ok())
                .unwrap_or(current)
        }
        Self {
            tile_width: pick(self.tile_width, tile_width),
            tile_height: pick(self.tile_height, tile_height),
            screen_width_tiles: pick(self.screen_width_tiles, screen_width_tiles),
            screen_height_tiles: pick(self.screen_height_tiles, screen_height_tiles),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ScreenCoord {
    pub x: i32,
    pub y: i32,
}

impl ScreenCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}

/// Pixel bounds of one screen. `right`/`bottom` are exclusive edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl ScreenRect {
    pub fn clamp_inset(&self, position: Vec2, margin: f32) -> Vec2 {
        Vec2 {
            x: clamp_axis(position.x, self.left + margin, self.right - margin),
            y: clamp_axis(position.y, self.top + margin, self.bottom - margin),
        }
    }
}

fn clamp_axis(value: f32, min: f32, max: f32) -> f32 {
    if min > max {
        return (min + max) * 0.5;
    }
    value.clamp(min, max)
}

/// Tile map of the whole world, row-major, immutable once built.
///
/// Pixel space has its origin at the top-left of tile (0,0) with `y` growing
/// downward, matching the map description format.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldGrid {
    width_tiles: u32,
    height_tiles: u32,
    geometry: GridGeometry,
    tiles: Vec<u32>,
}

impl Default for WorldGrid {
    fn default() -> Self {
        Self::empty()
    }
}

impl WorldGrid {
    pub fn empty() -> Self {
        Self::empty_with_geometry(GridGeometry::default())
    }

    pub fn empty_with_geometry(geometry: GridGeometry) -> Self {
        Self {
            width_tiles: 0,
            height_tiles: 0,
            geometry,
            tiles: Vec::new(),
        }
    }

    pub fn from_tiles(
        width_tiles: u32,
        height_tiles: u32,
        mut tiles: Vec<u32>,
        geometry: GridGeometry,
    ) -> Self {
        let expected = width_tiles as usize * height_tiles as usize;
        if tiles.len() < expected {
            warn!(
                expected,
                actual = tiles.len(),
                "map_tile_data_short"
            );
        } else if tiles.len() > expected {
            warn!(
                expected,
                actual = tiles.len(),
                "map_tile_data_truncated"
            );
            tiles.truncate(expected);
        }
        Self {
            width_tiles,
            height_tiles,
            geometry,
            tiles,
        }
    }

    pub fn width_tiles(&self) -> u32 {
        self.width_tiles
    }

    pub fn height_tiles(&self) -> u32 {
        self.height_tiles
    }

    pub fn geometry(&self) -> GridGeometry {
        self.geometry
    }

    pub fn is_empty(&self) -> bool {
        self.width_tiles == 0 || self.height_tiles == 0
    }

    pub fn has_data_shortfall(&self) -> bool {
        self.tiles.len() < self.width_tiles as usize * self.height_tiles as usize
    }

    pub fn tiles(&self) -> &[u32] {
        &self.tiles
    }

    pub fn screens_wide(&self) -> u32 {
        self.width_tiles / self.geometry.screen_width_tiles.max(1)
    }

    pub fn screens_tall(&self) -> u32 {
        self.height_tiles / self.geometry.screen_height_tiles.max(1)
    }

    pub fn screen_count(&self) -> u32 {
        self.screens_wide().saturating_mul(self.screens_tall())
    }

    pub fn tile_at(&self, x: i64, y: i64) -> u32 {
        if x < 0 || y < 0 || x >= self.width_tiles as i64 || y >= self.height_tiles as i64 {
            return EMPTY_TILE;
        }
        let index = y as usize * self.width_tiles as usize + x as usize;
        self.tiles.get(index).copied().unwrap_or(EMPTY_TILE)
    }

    pub fn tile_at_pixel(&self, position: Vec2) -> u32 {
        let x = (position.x / self.geometry.tile_width.max(1) as f32).floor() as i64;
        let y = (position.y / self.geometry.tile_height.max(1) as f32).floor() as i64;
        self.tile_at(x, y)
    }

    /// Floor division, so positions left of or above the origin land in
    /// negative (and therefore invalid) screens.
    pub fn screen_containing(&self, position: Vec2) -> ScreenCoord {
        let width = self.geometry.screen_width_px().max(1) as f32;
        let height = self.geometry.screen_height_px().max(1) as f32;
        ScreenCoord {
            x: (position.x / width).floor() as i32,
            y: (position.y / height).floor() as i32,
        }
    }

    pub fn is_valid_screen(&self, screen: ScreenCoord) -> bool {
        screen.x >= 0
            && screen.y >= 0
            && (screen.x as i64) < self.screens_wide() as i64
            && (screen.y as i64) < self.screens_tall() as i64
    }

    pub fn screen_rect(&self, screen: ScreenCoord) -> ScreenRect {
        let width = self.geometry.screen_width_px() as f32;
        let height = self.geometry.screen_height_px() as f32;
        let left = screen.x as f32 * width;
        let top = screen.y as f32 * height;
        ScreenRect {
            left,
            top,
            right: left + width,
            bottom: top + height,
        }
    }

    pub fn screen_center_pixel(&self, screen: ScreenCoord) -> Vec2 {
        let width = self.geometry.screen_width_px() as f32;
        let height = self.geometry.screen_height_px() as f32;
        Vec2 {
            x: screen.x as f32 * width + width / 2.0,
            y: screen.y as f32 * height + height / 2.0,
        }
    }

    pub fn unique_tile_count(&self) -> usize {
        self.tiles
            .iter()
            .filter(|id| **id != EMPTY_TILE)
            .collect::<HashSet<_>>()
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_with_screens(screens_wide: u32, screens_tall: u32) -> WorldGrid {
        let geometry = GridGeometry::default();
        let width = screens_wide * geometry.screen_width_tiles;
        let height = screens_tall * geometry.screen_height_tiles;
        WorldGrid::from_tiles(
            width,
            height,
            vec![1; (width * height) as usize],
            geometry,
        )
    }

    #[test]
    fn tile_lookup_is_row_major() {
        let grid = WorldGrid::from_tiles(2, 2, vec![1, 0, 0, 64], GridGeometry::default());
        assert_eq!(grid.tile_at(0, 0), 1);
        assert_eq!(grid.tile_at(1, 0), 0);
        assert_eq!(grid.tile_at(0, 1), 0);
        assert_eq!(grid.tile_at(1, 1), 64);
    }

    #[test]
    fn out_of_range_and_short_data_report_empty_tile() {
        let grid = WorldGrid::from_tiles(3, 2, vec![5, 6, 7, 8], GridGeometry::default());
        assert!(grid.has_data_shortfall());
        assert_eq!(grid.tile_at(0, 1), 8);
        assert_eq!(grid.tile_at(1, 1), EMPTY_TILE);
        assert_eq!(grid.tile_at(2, 1), EMPTY_TILE);
        assert_eq!(grid.tile_at(-1, 0), EMPTY_TILE);
        assert_eq!(grid.tile_at(3, 0), EMPTY_TILE);
        assert_eq!(grid.tile_at(0, 2), EMPTY_TILE);
    }

    #[test]
    fn long_data_is_truncated_to_extent() {
        let grid = WorldGrid::from_tiles(1, 1, vec![9, 10, 11], GridGeometry::default());
        assert_eq!(grid.tiles(), &[9]);
        assert!(!grid.has_data_shortfall());
    }

    #[test]
    fn partial_trailing_screens_are_not_counted() {
        let grid = WorldGrid::from_tiles(40, 25, vec![1; 1000], GridGeometry::default());
        assert_eq!(grid.screens_wide(), 2);
        assert_eq!(grid.screens_tall(), 2);
        assert!(grid.is_valid_screen(ScreenCoord::new(1, 1)));
        assert!(!grid.is_valid_screen(ScreenCoord::new(2, 0)));
    }

    #[test]
    fn valid_screen_bounds_are_half_open() {
        let grid = grid_with_screens(16, 8);
        assert!(grid.is_valid_screen(ScreenCoord::new(0, 0)));
        assert!(grid.is_valid_screen(ScreenCoord::new(15, 7)));
        assert!(!grid.is_valid_screen(ScreenCoord::new(16, 7)));
        assert!(!grid.is_valid_screen(ScreenCoord::new(15, 8)));
        assert!(!grid.is_valid_screen(ScreenCoord::new(-1, 0)));
        assert!(!grid.is_valid_screen(ScreenCoord::new(0, -1)));
    }

    #[test]
    fn validity_is_repeatable_for_the_same_input() {
        let grid = grid_with_screens(3, 2);
        for x in -2..5 {
            for y in -2..4 {
                let screen = ScreenCoord::new(x, y);
                let first = grid.is_valid_screen(screen);
                assert_eq!(first, grid.is_valid_screen(screen));
                assert_eq!(first, grid.is_valid_screen(screen));
            }
        }
    }

    #[test]
    fn screen_center_round_trips_through_screen_containing() {
        let grid = grid_with_screens(16, 8);
        for x in 0..16 {
            for y in 0..8 {
                let screen = ScreenCoord::new(x, y);
                assert_eq!(grid.screen_containing(grid.screen_center_pixel(screen)), screen);
            }
        }
    }

    #[test]
    fn screen_center_uses_screen_pixel_size() {
        let grid = grid_with_screens(16, 8);
        let center = grid.screen_center_pixel(ScreenCoord::new(8, 7));
        assert_eq!(center, Vec2 { x: 2176.0, y: 1320.0 });
    }

    #[test]
    fn negative_positions_floor_into_negative_screens() {
        let grid = grid_with_screens(2, 2);
        assert_eq!(
            grid.screen_containing(Vec2 { x: -1.0, y: 10.0 }),
            ScreenCoord::new(-1, 0)
        );
        assert_eq!(
            grid.screen_containing(Vec2 { x: 10.0, y: -0.5 }),
            ScreenCoord::new(0, -1)
        );
        assert_eq!(
            grid.screen_containing(Vec2 { x: 255.9, y: 175.9 }),
            ScreenCoord::new(0, 0)
        );
        assert_eq!(
            grid.screen_containing(Vec2 { x: 256.0, y: 176.0 }),
            ScreenCoord::new(1, 1)
        );
    }

    #[test]
    fn empty_grid_has_no_valid_screens_or_tiles() {
        let grid = WorldGrid::empty();
        assert!(grid.is_empty());
        assert_eq!(grid.screen_count(), 0);
        assert!(!grid.is_valid_screen(ScreenCoord::new(0, 0)));
        assert_eq!(grid.tile_at(0, 0), EMPTY_TILE);
        assert_eq!(grid.tile_at_pixel(Vec2 { x: 3.0, y: 3.0 }), EMPTY_TILE);
    }

    #[test]
    fn oversized_dimensions_saturate_instead_of_overflowing() {
        let geometry = GridGeometry {
            tile_width: 65_536,
            tile_height: 65_536,
            screen_width_tiles: 65_536,
            screen_height_tiles: 65_536,
        };
        assert_eq!(geometry.screen_width_px(), u32::MAX);
        assert_eq!(geometry.screen_height_px(), u32::MAX);

        let grid = WorldGrid::from_tiles(u32::MAX, u32::MAX, Vec::new(), GridGeometry::default());
        assert_eq!(grid.screen_count(), u32::MAX);
        assert_eq!(grid.tile_at(0, 0), EMPTY_TILE);
    }

    #[test]
    fn clamp_inset_keeps_margin_from_each_edge() {
        let grid = grid_with_screens(1, 1);
        let rect = grid.screen_rect(ScreenCoord::new(0, 0));
        let clamped = rect.clamp_inset(Vec2 { x: 300.0, y: -20.0 }, 6.0);
        assert_eq!(clamped, Vec2 { x: 250.0, y: 6.0 });
        let untouched = rect.clamp_inset(Vec2 { x: 100.0, y: 80.0 }, 6.0);
        assert_eq!(untouched, Vec2 { x: 100.0, y: 80.0 });
    }

    #[test]
    fn geometry_overrides_ignore_non_positive_values() {
        let geometry =
            GridGeometry::default().with_overrides(Some(8), Some(0), Some(-3), None);
        assert_eq!(geometry.tile_width, 8);
        assert_eq!(geometry.tile_height, DEFAULT_TILE_SIZE_PX);
        assert_eq!(geometry.screen_width_tiles, DEFAULT_SCREEN_WIDTH_TILES);
        assert_eq!(geometry.screen_height_tiles, DEFAULT_SCREEN_HEIGHT_TILES);
    }

    #[test]
    fn unique_tile_count_ignores_empty() {
        let grid = WorldGrid::from_tiles(2, 2, vec![0, 3, 3, 7], GridGeometry::default());
        assert_eq!(grid.unique_tile_count(), 2);
    }
}
