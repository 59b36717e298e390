mod atlas;
mod grid;
mod map_format;
mod screens;

pub use atlas::{AtlasCell, TileAtlas, DEFAULT_ATLAS_COLUMNS, DEFAULT_ATLAS_ROWS};
pub use grid::{
    GridGeometry, ScreenCoord, ScreenRect, WorldGrid, DEFAULT_SCREEN_HEIGHT_TILES,
    DEFAULT_SCREEN_WIDTH_TILES, DEFAULT_TILE_SIZE_PX, EMPTY_TILE,
};
pub use map_format::{
    load_map_file, load_map_file_or_empty, parse_map_document, parse_tiled_json, parse_tiled_xml,
    read_map_document, LoadedMap, MapFormat, TiledLayer, TiledMap, TiledProperty, TiledTileset,
    WorldLoadError, MAX_MAP_TILES, MAX_SCREEN_SIDE_PX, PROPERTY_SCREENS_TALL, PROPERTY_SCREENS_WIDE, PROPERTY_SCREEN_HEIGHT,
    PROPERTY_SCREEN_WIDTH,
};
pub use screens::{ScreenInfo, ScreenMetadata};
