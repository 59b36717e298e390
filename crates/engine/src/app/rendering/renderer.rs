use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageReader;
use pixels::{Error, Pixels, SurfaceTexture};
use tracing::warn;
use winit::window::Window;

use crate::app::{Camera2D, Entity, SceneWorld, Vec2};
use crate::world::{TileAtlas, WorldGrid, EMPTY_TILE};

use super::{world_to_screen_px, Viewport, PLACEHOLDER_HALF_SIZE_PX};

const CLEAR_COLOR: [u8; 4] = [0, 0, 0, 255];
const TILE_FALLBACK_COLORS: [[u8; 4]; 4] = [
    [74, 112, 56, 255],
    [112, 83, 58, 255],
    [196, 176, 120, 255],
    [60, 90, 160, 255],
];
const FACING_NOTCH_COLOR: [u8; 4] = [24, 24, 24, 255];
const FACING_NOTCH_HALF_SIZE_PX: i32 = 1;

struct LoadedImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TileRectInclusive {
    x_min: i64,
    x_max: i64,
    y_min: i64,
    y_max: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PixelRect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

/// Draws one screen's worth of world into a fixed-size framebuffer that
/// `pixels` scales up to the window.
pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
    atlas_image: Option<(PathBuf, Option<LoadedImage>)>,
    warned_atlas_keys: HashSet<String>,
}

impl Renderer {
    pub fn new(window: Arc<Window>, viewport: Viewport) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), viewport, size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport,
            atlas_image: None,
            warned_atlas_keys: HashSet::new(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), self.viewport, width, height)?;
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        viewport: Viewport,
        surface_width: u32,
        surface_height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(surface_width, surface_height, window);
        Pixels::new(viewport.width, viewport.height, surface)
    }

    pub(crate) fn render_world(&mut self, world: &SceneWorld) -> Result<(), Error> {
        let viewport = self.viewport;
        let atlas = world.tile_atlas();
        let atlas_image =
            resolve_atlas_image(&mut self.atlas_image, &mut self.warned_atlas_keys, atlas);
        let frame = self.pixels.frame_mut();
        for chunk in frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&CLEAR_COLOR);
        }

        if let Some(grid) = world.world_grid() {
            draw_tiles(frame, viewport, world.camera(), grid, atlas, atlas_image);
        }
        for entity in world.entities() {
            draw_entity(frame, viewport, world.camera(), entity);
        }

        self.pixels.render()
    }
}

fn draw_tiles(
    frame: &mut [u8],
    viewport: Viewport,
    camera: &Camera2D,
    grid: &WorldGrid,
    atlas: &TileAtlas,
    atlas_image: Option<&LoadedImage>,
) {
    let Some(visible) = visible_tile_rect(grid, camera, viewport) else {
        return;
    };
    let geometry = grid.geometry();

    for y in visible.y_min..=visible.y_max {
        for x in visible.x_min..=visible.x_max {
            let tile_id = grid.tile_at(x, y);
            if tile_id == EMPTY_TILE {
                continue;
            }
            let tile_origin = Vec2 {
                x: (x * geometry.tile_width as i64) as f32,
                y: (y * geometry.tile_height as i64) as f32,
            };
            let (left, top) = world_to_screen_px(tile_origin, camera, viewport);

            let source = atlas_image.zip(atlas.cell_for(tile_id));
            match source {
                Some((image, cell)) => {
                    let (src_x, src_y, width, height) = atlas.source_rect_px(cell);
                    blit_region(
                        frame,
                        viewport,
                        left,
                        top,
                        image,
                        PixelRect {
                            x: src_x,
                            y: src_y,
                            width,
                            height,
                        },
                    );
                }
                None => fill_rect(
                    frame,
                    viewport,
                    left,
                    top,
                    geometry.tile_width as i32,
                    geometry.tile_height as i32,
                    fallback_tile_color(tile_id),
                ),
            }
        }
    }
}

fn draw_entity(frame: &mut [u8], viewport: Viewport, camera: &Camera2D, entity: &Entity) {
    let (cx, cy) = world_to_screen_px(entity.transform.position, camera, viewport);
    let half_size = if entity.renderable.half_size_px > 0 {
        entity.renderable.half_size_px
    } else {
        PLACEHOLDER_HALF_SIZE_PX
    };
    draw_square(frame, viewport, cx, cy, half_size, entity.renderable.color);

    let (dx, dy) = entity.facing.step();
    let notch_distance = (half_size - FACING_NOTCH_HALF_SIZE_PX - 1).max(0);
    draw_square(
        frame,
        viewport,
        cx + dx * notch_distance,
        cy + dy * notch_distance,
        FACING_NOTCH_HALF_SIZE_PX,
        FACING_NOTCH_COLOR,
    );
}

fn visible_tile_rect(
    grid: &WorldGrid,
    camera: &Camera2D,
    viewport: Viewport,
) -> Option<TileRectInclusive> {
    if grid.is_empty() {
        return None;
    }
    let geometry = grid.geometry();
    let tile_width = geometry.tile_width.max(1) as f32;
    let tile_height = geometry.tile_height.max(1) as f32;
    let origin = viewport.top_left_world(camera);

    let x_min = ((origin.x / tile_width).floor() as i64).max(0);
    let y_min = ((origin.y / tile_height).floor() as i64).max(0);
    let x_max = (((origin.x + viewport.width as f32) / tile_width).ceil() as i64 - 1)
        .min(grid.width_tiles() as i64 - 1);
    let y_max = (((origin.y + viewport.height as f32) / tile_height).ceil() as i64 - 1)
        .min(grid.height_tiles() as i64 - 1);

    if x_min > x_max || y_min > y_max {
        return None;
    }
    Some(TileRectInclusive {
        x_min,
        x_max,
        y_min,
        y_max,
    })
}

fn fallback_tile_color(tile_id: u32) -> [u8; 4] {
    let index = tile_id.saturating_sub(1) as usize % TILE_FALLBACK_COLORS.len();
    TILE_FALLBACK_COLORS[index]
}

fn resolve_atlas_image<'a>(
    cache: &'a mut Option<(PathBuf, Option<LoadedImage>)>,
    warned_keys: &mut HashSet<String>,
    atlas: &TileAtlas,
) -> Option<&'a LoadedImage> {
    let Some(path) = atlas.image.as_deref() else {
        warn_atlas_fallback_once(warned_keys, None, "atlas_image_unset");
        return None;
    };
    let stale = cache
        .as_ref()
        .map_or(true, |(cached_path, _)| cached_path != path);
    if stale {
        let loaded = match load_image_rgba(path) {
            Ok(image) => Some(image),
            Err(reason) => {
                warn_atlas_fallback_once(warned_keys, Some(path), &reason);
                None
            }
        };
        *cache = Some((path.to_path_buf(), loaded));
    }
    cache.as_ref().and_then(|(_, image)| image.as_ref())
}

fn load_image_rgba(path: &Path) -> Result<LoadedImage, String> {
    let reader = ImageReader::open(path).map_err(|error| format!("file_open_failed:{error}"))?;
    let decoded = reader
        .decode()
        .map_err(|error| format!("decode_failed:{error}"))?;
    let image = decoded.to_rgba8();
    Ok(LoadedImage {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

fn warn_atlas_fallback_once(warned_keys: &mut HashSet<String>, path: Option<&Path>, reason: &str) {
    let path_display = path
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<unset>".to_string());
    if !warned_keys.insert(path_display.clone()) {
        return;
    }
    warn!(
        path = %path_display,
        reason = reason,
        "renderer_atlas_load_failed_using_fallback_colors"
    );
}

fn write_pixel_rgba_clipped(frame: &mut [u8], width: usize, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 || x as usize >= width {
        return;
    }
    let x = x as usize;
    let y = y as usize;
    let Some(pixel_offset) = y.checked_mul(width).and_then(|row| row.checked_add(x)) else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    let Some(end) = byte_offset.checked_add(4) else {
        return;
    };
    if end > frame.len() {
        return;
    }
    frame[byte_offset..end].copy_from_slice(&color);
}

fn fill_rect(
    frame: &mut [u8],
    viewport: Viewport,
    left: i32,
    top: i32,
    width: i32,
    height: i32,
    color: [u8; 4],
) {
    let draw_left = left.max(0);
    let draw_top = top.max(0);
    let draw_right = (left + width).min(viewport.width as i32);
    let draw_bottom = (top + height).min(viewport.height as i32);
    for y in draw_top..draw_bottom {
        for x in draw_left..draw_right {
            write_pixel_rgba_clipped(frame, viewport.width as usize, x, y, color);
        }
    }
}

fn draw_square(
    frame: &mut [u8],
    viewport: Viewport,
    cx: i32,
    cy: i32,
    half_size: i32,
    color: [u8; 4],
) {
    let size = half_size * 2 + 1;
    fill_rect(frame, viewport, cx - half_size, cy - half_size, size, size, color);
}

/// Copies `source` out of `image` with its top-left at `(left, top)`.
/// Fully transparent source pixels are skipped.
fn blit_region(
    frame: &mut [u8],
    viewport: Viewport,
    left: i32,
    top: i32,
    image: &LoadedImage,
    source: PixelRect,
) {
    let expected_rgba_len = image.width as usize * image.height as usize * 4;
    if image.rgba.len() < expected_rgba_len {
        return;
    }
    let source_right = source.x.saturating_add(source.width).min(image.width);
    let source_bottom = source.y.saturating_add(source.height).min(image.height);
    if source.x >= source_right || source.y >= source_bottom {
        return;
    }

    let image_width = image.width as usize;
    for src_y in source.y..source_bottom {
        let out_y = top + (src_y - source.y) as i32;
        if out_y < 0 || out_y >= viewport.height as i32 {
            continue;
        }
        for src_x in source.x..source_right {
            let out_x = left + (src_x - source.x) as i32;
            if out_x < 0 || out_x >= viewport.width as i32 {
                continue;
            }
            let src_offset = (src_y as usize * image_width + src_x as usize) * 4;
            let alpha = image.rgba[src_offset + 3];
            if alpha == 0 {
                continue;
            }
            let color = [
                image.rgba[src_offset],
                image.rgba[src_offset + 1],
                image.rgba[src_offset + 2],
                alpha,
            ];
            write_pixel_rgba_clipped(frame, viewport.width as usize, out_x, out_y, color);
        }
    }
}
