use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{imageops, ImageFormat, ImageReader, RgbaImage};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::info;

use crate::world::{
    GridGeometry, ScreenMetadata, TiledLayer, TiledMap, TiledProperty, TiledTileset,
    PROPERTY_SCREENS_TALL, PROPERTY_SCREENS_WIDE, PROPERTY_SCREEN_HEIGHT, PROPERTY_SCREEN_WIDTH,
};

use super::atomic_io::write_bytes_atomic;

pub const TILESET_FILE_NAME: &str = "tileset.png";
pub const MAP_FILE_NAME: &str = "overworld.json";
pub const SCREENS_FILE_NAME: &str = "screens.json";
const TERRAIN_LAYER_NAME: &str = "terrain";
const TILESET_NAME: &str = "overworld_tiles";
const TILED_VERSION: &str = "1.10.0";
const TILED_FORMAT_VERSION: &str = "1.10";

#[derive(Debug, Error)]
pub enum AssetPipelineError {
    #[error("failed to open image {path}: {source}")]
    OpenImage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {path}: {source}")]
    DecodeImage {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("image is {width}x{height}px, smaller than one {tile_width}x{tile_height} tile")]
    ImageTooSmall {
        width: u32,
        height: u32,
        tile_width: u32,
        tile_height: u32,
    },
    #[error("tileset column count must be positive")]
    ZeroColumns,
    #[error("failed to encode tileset image: {0}")]
    EncodeImage(#[source] image::ImageError),
    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// How tiles sit in a source screenshot. `separator_px` is the width of the
/// divider lines drawn between screens; zero means tiles are packed densely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtractionLayout {
    pub geometry: GridGeometry,
    pub separator_px: u32,
}

impl ExtractionLayout {
    fn tiles_across(&self, image_px: u32, tile_px: u32, screen_tiles: u32) -> u32 {
        if self.separator_px == 0 {
            return image_px / tile_px.max(1);
        }
        let screen_px = screen_tiles * tile_px;
        let stride = screen_px + self.separator_px;
        let full_screens = (image_px + self.separator_px) / stride.max(1);
        full_screens * screen_tiles
    }

    fn tile_origin(&self, tile_index: u32, tile_px: u32, screen_tiles: u32) -> u32 {
        let screen_tiles = screen_tiles.max(1);
        let screen = tile_index / screen_tiles;
        let within = tile_index % screen_tiles;
        screen * (screen_tiles * tile_px + self.separator_px) + within * tile_px
    }

    /// Top-left pixel of tile `(x, y)` in the source image.
    pub fn tile_origin_px(&self, x: u32, y: u32) -> (u32, u32) {
        let geometry = self.geometry;
        (
            self.tile_origin(x, geometry.tile_width, geometry.screen_width_tiles),
            self.tile_origin(y, geometry.tile_height, geometry.screen_height_tiles),
        )
    }

    pub fn tile_extent(&self, image_width: u32, image_height: u32) -> (u32, u32) {
        let geometry = self.geometry;
        (
            self.tiles_across(image_width, geometry.tile_width, geometry.screen_width_tiles),
            self.tiles_across(image_height, geometry.tile_height, geometry.screen_height_tiles),
        )
    }
}

#[derive(Debug, Clone)]
pub struct TileExtraction {
    pub geometry: GridGeometry,
    pub width_tiles: u32,
    pub height_tiles: u32,
    /// 1-based ids into `unique_tiles`, row-major.
    pub tile_ids: Vec<u32>,
    /// Distinct tiles in first-occurrence order.
    pub unique_tiles: Vec<RgbaImage>,
}

impl TileExtraction {
    pub fn screens_wide(&self) -> u32 {
        self.width_tiles / self.geometry.screen_width_tiles.max(1)
    }

    pub fn screens_tall(&self) -> u32 {
        self.height_tiles / self.geometry.screen_height_tiles.max(1)
    }
}

pub fn load_rgba_image(path: &Path) -> Result<RgbaImage, AssetPipelineError> {
    let reader = ImageReader::open(path).map_err(|source| AssetPipelineError::OpenImage {
        path: path.to_path_buf(),
        source,
    })?;
    let decoded = reader
        .decode()
        .map_err(|source| AssetPipelineError::DecodeImage {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(decoded.to_rgba8())
}

pub fn extract_unique_tiles(
    image: &RgbaImage,
    layout: ExtractionLayout,
) -> Result<TileExtraction, AssetPipelineError> {
    let geometry = layout.geometry;
    let (width_tiles, height_tiles) = layout.tile_extent(image.width(), image.height());
    if width_tiles == 0 || height_tiles == 0 {
        return Err(AssetPipelineError::ImageTooSmall {
            width: image.width(),
            height: image.height(),
            tile_width: geometry.tile_width,
            tile_height: geometry.tile_height,
        });
    }

    let mut id_by_digest = HashMap::<[u8; 32], u32>::new();
    let mut unique_tiles = Vec::<RgbaImage>::new();
    let mut tile_ids = Vec::with_capacity((width_tiles * height_tiles) as usize);

    for y in 0..height_tiles {
        for x in 0..width_tiles {
            let (px, py) = layout.tile_origin_px(x, y);
            let tile =
                imageops::crop_imm(image, px, py, geometry.tile_width, geometry.tile_height)
                    .to_image();
            let digest: [u8; 32] = Sha256::digest(tile.as_raw()).into();
            let id = match id_by_digest.get(&digest) {
                Some(id) => *id,
                None => {
                    unique_tiles.push(tile);
                    let id = unique_tiles.len() as u32;
                    id_by_digest.insert(digest, id);
                    id
                }
            };
            tile_ids.push(id);
        }
    }

    Ok(TileExtraction {
        geometry,
        width_tiles,
        height_tiles,
        tile_ids,
        unique_tiles,
    })
}

/// Square-ish packing: `ceil(sqrt(n))` columns.
pub fn default_tileset_columns(tile_count: usize) -> u32 {
    ((tile_count as f64).sqrt().ceil() as u32).max(1)
}

pub fn build_tileset_image(
    tiles: &[RgbaImage],
    tile_width: u32,
    tile_height: u32,
    columns: u32,
) -> Result<RgbaImage, AssetPipelineError> {
    if columns == 0 {
        return Err(AssetPipelineError::ZeroColumns);
    }
    let rows = (tiles.len() as u32).div_ceil(columns).max(1);
    let mut atlas = RgbaImage::new(columns * tile_width, rows * tile_height);
    for (index, tile) in tiles.iter().enumerate() {
        let index = index as u32;
        let x = (index % columns) * tile_width;
        let y = (index / columns) * tile_height;
        imageops::replace(&mut atlas, tile, x as i64, y as i64);
    }
    Ok(atlas)
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, AssetPipelineError> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(AssetPipelineError::EncodeImage)?;
    Ok(bytes)
}

/// Tiled JSON for an extraction: one `terrain` layer, one tileset pointing
/// at `tileset_image`, and the screen layout as map properties.
pub fn build_tiled_document(
    extraction: &TileExtraction,
    tileset_image: &str,
    columns: u32,
) -> TiledMap {
    let geometry = extraction.geometry;
    let tile_count = extraction.unique_tiles.len() as u32;
    let rows = tile_count.div_ceil(columns.max(1)).max(1);

    TiledMap {
        width: extraction.width_tiles,
        height: extraction.height_tiles,
        tilewidth: Some(geometry.tile_width as i64),
        tileheight: Some(geometry.tile_height as i64),
        orientation: Some("orthogonal".to_string()),
        renderorder: Some("right-down".to_string()),
        infinite: Some(false),
        tiledversion: Some(TILED_VERSION.to_string()),
        version: Some(TILED_FORMAT_VERSION.to_string()),
        kind: Some("map".to_string()),
        layers: vec![TiledLayer {
            data: Some(extraction.tile_ids.clone()),
            id: Some(1),
            name: Some(TERRAIN_LAYER_NAME.to_string()),
            width: Some(extraction.width_tiles),
            height: Some(extraction.height_tiles),
            opacity: Some(1.0),
            visible: Some(true),
            kind: Some("tilelayer".to_string()),
            x: Some(0),
            y: Some(0),
        }],
        tilesets: vec![TiledTileset {
            columns: Some(columns),
            firstgid: Some(1),
            image: Some(tileset_image.to_string()),
            imageheight: Some(rows * geometry.tile_height),
            imagewidth: Some(columns * geometry.tile_width),
            margin: Some(0),
            name: Some(TILESET_NAME.to_string()),
            spacing: Some(0),
            tilecount: Some(tile_count),
            tileheight: Some(geometry.tile_height),
            tilewidth: Some(geometry.tile_width),
        }],
        properties: vec![
            TiledProperty::int(PROPERTY_SCREEN_WIDTH, geometry.screen_width_tiles as i64),
            TiledProperty::int(PROPERTY_SCREEN_HEIGHT, geometry.screen_height_tiles as i64),
            TiledProperty::int(PROPERTY_SCREENS_WIDE, extraction.screens_wide() as i64),
            TiledProperty::int(PROPERTY_SCREENS_TALL, extraction.screens_tall() as i64),
        ],
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReconstructOptions {
    pub layout: ExtractionLayout,
    pub columns: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ReconstructOutput {
    pub tileset_path: PathBuf,
    pub map_path: PathBuf,
    pub screens_path: PathBuf,
    pub width_tiles: u32,
    pub height_tiles: u32,
    pub unique_tile_count: usize,
    pub columns: u32,
}

/// Rebuilds a tileset, Tiled map and screen table from an overworld image.
pub fn reconstruct_map(
    source: &Path,
    out_dir: &Path,
    options: ReconstructOptions,
) -> Result<ReconstructOutput, AssetPipelineError> {
    let image = load_rgba_image(source)?;
    let extraction = extract_unique_tiles(&image, options.layout)?;
    let columns = options
        .columns
        .unwrap_or_else(|| default_tileset_columns(extraction.unique_tiles.len()));
    let geometry = extraction.geometry;

    let tileset = build_tileset_image(
        &extraction.unique_tiles,
        geometry.tile_width,
        geometry.tile_height,
        columns,
    )?;
    let document = build_tiled_document(&extraction, TILESET_FILE_NAME, columns);
    let screens = ScreenMetadata::for_layout(
        geometry,
        extraction.screens_wide(),
        extraction.screens_tall(),
    );

    let tileset_path = out_dir.join(TILESET_FILE_NAME);
    let map_path = out_dir.join(MAP_FILE_NAME);
    let screens_path = out_dir.join(SCREENS_FILE_NAME);
    write_output(&tileset_path, &encode_png(&tileset)?)?;
    write_output(&map_path, &to_pretty_json("map document", &document)?)?;
    write_output(&screens_path, &to_pretty_json("screen metadata", &screens)?)?;

    info!(
        source = %source.display(),
        out_dir = %out_dir.display(),
        width_tiles = extraction.width_tiles,
        height_tiles = extraction.height_tiles,
        unique_tiles = extraction.unique_tiles.len(),
        columns,
        "map_reconstructed"
    );

    Ok(ReconstructOutput {
        tileset_path,
        map_path,
        screens_path,
        width_tiles: extraction.width_tiles,
        height_tiles: extraction.height_tiles,
        unique_tile_count: extraction.unique_tiles.len(),
        columns,
    })
}

pub fn to_pretty_json<T: serde::Serialize>(
    what: &'static str,
    value: &T,
) -> Result<Vec<u8>, AssetPipelineError> {
    serde_json::to_vec_pretty(value).map_err(|source| AssetPipelineError::Serialize { what, source })
}

pub fn write_output(path: &Path, bytes: &[u8]) -> Result<(), AssetPipelineError> {
    write_bytes_atomic(path, bytes).map_err(|source| AssetPipelineError::Write {
        path: path.to_path_buf(),
        source,
    })
}
