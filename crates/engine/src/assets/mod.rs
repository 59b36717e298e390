mod atomic_io;
mod tileset_builder;

pub use atomic_io::write_bytes_atomic;
pub use tileset_builder::{
    build_tiled_document, build_tileset_image, default_tileset_columns, encode_png,
    extract_unique_tiles, load_rgba_image, reconstruct_map, to_pretty_json, write_output,
    AssetPipelineError, ExtractionLayout, ReconstructOptions, ReconstructOutput, TileExtraction,
    MAP_FILE_NAME, SCREENS_FILE_NAME, TILESET_FILE_NAME,
};
