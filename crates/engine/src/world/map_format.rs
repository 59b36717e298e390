use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use super::atlas::TileAtlas;
use super::grid::{GridGeometry, WorldGrid};

pub const PROPERTY_SCREEN_WIDTH: &str = "screen_width";
pub const PROPERTY_SCREEN_HEIGHT: &str = "screen_height";
pub const PROPERTY_SCREENS_WIDE: &str = "screens_wide";
pub const PROPERTY_SCREENS_TALL: &str = "screens_tall";
/// Largest screen side, in pixels, a map may declare.
pub const MAX_SCREEN_SIDE_PX: u32 = 4096;
/// Largest map extent, in tiles, a map may declare.
pub const MAX_MAP_TILES: u64 = 1 << 24;

#[derive(Debug, Error)]
pub enum WorldLoadError {
    #[error("failed to read map file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed map json at {path}: {message}")]
    Json { path: String, message: String },
    #[error("malformed map xml at line {line}, column {column}: {message}")]
    Xml {
        message: String,
        line: usize,
        column: usize,
    },
    #[error("unsupported map format for {path}; expected .json or .tmx")]
    UnsupportedFormat { path: PathBuf },
    #[error("map description has no layers")]
    NoLayers,
    #[error("invalid layer data: {message}")]
    InvalidLayerData { message: String },
    #[error(
        "screen of {screen_width_tiles}x{screen_height_tiles} tiles at {tile_width}x{tile_height}px \
exceeds {max_px}px per side"
    )]
    ScreenTooLarge {
        tile_width: u32,
        tile_height: u32,
        screen_width_tiles: u32,
        screen_height_tiles: u32,
        max_px: u32,
    },
    #[error("map of {width}x{height} tiles exceeds {max_tiles} tiles")]
    MapTooLarge {
        width: u32,
        height: u32,
        max_tiles: u64,
    },
}

/// Tiled map document. Unknown fields are ignored on read; optional fields
/// are omitted on write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TiledMap {
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tilewidth: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tileheight: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renderorder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infinite: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiledversion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub layers: Vec<TiledLayer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tilesets: Vec<TiledTileset>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<TiledProperty>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TiledLayer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TiledTileset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firstgid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imageheight: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imagewidth: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spacing: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tilecount: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tileheight: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tilewidth: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TiledProperty {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub value: serde_json::Value,
}

impl TiledProperty {
    pub fn int(name: &str, value: i64) -> Self {
        Self {
            name: name.to_string(),
            kind: "int".to_string(),
            value: serde_json::Value::from(value),
        }
    }
}

impl TiledMap {
    pub fn property_int(&self, name: &str) -> Option<i64> {
        self.properties
            .iter()
            .find(|property| property.name == name)
            .and_then(|property| match &property.value {
                serde_json::Value::Number(number) => number.as_i64(),
                serde_json::Value::String(text) => text.trim().parse::<i64>().ok(),
                _ => None,
            })
    }

    pub fn geometry(&self) -> GridGeometry {
        GridGeometry::default().with_overrides(
            self.tilewidth,
            self.tileheight,
            self.property_int(PROPERTY_SCREEN_WIDTH),
            self.property_int(PROPERTY_SCREEN_HEIGHT),
        )
    }

    fn checked_geometry(&self) -> Result<GridGeometry, WorldLoadError> {
        let geometry = self.geometry();
        let side_fits = |tiles: u32, tile_px: u32| {
            tiles
                .checked_mul(tile_px)
                .is_some_and(|px| px <= MAX_SCREEN_SIDE_PX)
        };
        if side_fits(geometry.screen_width_tiles, geometry.tile_width)
            && side_fits(geometry.screen_height_tiles, geometry.tile_height)
        {
            return Ok(geometry);
        }
        Err(WorldLoadError::ScreenTooLarge {
            tile_width: geometry.tile_width,
            tile_height: geometry.tile_height,
            screen_width_tiles: geometry.screen_width_tiles,
            screen_height_tiles: geometry.screen_height_tiles,
            max_px: MAX_SCREEN_SIDE_PX,
        })
    }

    /// Resolves the first tileset against `base_dir` (the map file's directory).
    pub fn atlas(&self, base_dir: Option<&Path>) -> TileAtlas {
        let geometry = self.geometry();
        let mut atlas = TileAtlas {
            tile_width: geometry.tile_width,
            tile_height: geometry.tile_height,
            ..TileAtlas::default()
        };
        let Some(tileset) = self.tilesets.first() else {
            return atlas;
        };
        if let Some(columns) = tileset.columns.filter(|columns| *columns > 0) {
            atlas.columns = columns;
            if let Some(count) = tileset.tilecount.filter(|count| *count > 0) {
                atlas.rows = count.div_ceil(columns);
            }
        }
        if let Some(width) = tileset.tilewidth.filter(|width| *width > 0) {
            atlas.tile_width = width;
        }
        if let Some(height) = tileset.tileheight.filter(|height| *height > 0) {
            atlas.tile_height = height;
        }
        atlas.image = tileset.image.as_deref().map(|image| match base_dir {
            Some(dir) => dir.join(image),
            None => PathBuf::from(image),
        });
        atlas
    }

    pub fn into_grid(self) -> Result<WorldGrid, WorldLoadError> {
        let geometry = self.checked_geometry()?;
        let tile_count = u64::from(self.width) * u64::from(self.height);
        if tile_count > MAX_MAP_TILES {
            return Err(WorldLoadError::MapTooLarge {
                width: self.width,
                height: self.height,
                max_tiles: MAX_MAP_TILES,
            });
        }
        let first = self.layers.into_iter().next().ok_or(WorldLoadError::NoLayers)?;
        let data = first.data.ok_or_else(|| WorldLoadError::InvalidLayerData {
            message: "first layer has no tile data array".to_string(),
        })?;
        Ok(WorldGrid::from_tiles(self.width, self.height, data, geometry))
    }
}

#[derive(Debug, Clone)]
pub struct LoadedMap {
    pub grid: WorldGrid,
    pub atlas: TileAtlas,
}

impl LoadedMap {
    pub fn empty() -> Self {
        Self {
            grid: WorldGrid::empty(),
            atlas: TileAtlas::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapFormat {
    TiledJson,
    TiledXml,
}

impl MapFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension().and_then(|ext| ext.to_str())?;
        if extension.eq_ignore_ascii_case("json") {
            Some(Self::TiledJson)
        } else if extension.eq_ignore_ascii_case("tmx") {
            Some(Self::TiledXml)
        } else {
            None
        }
    }
}

pub fn parse_tiled_json(raw: &str) -> Result<TiledMap, WorldLoadError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, TiledMap>(&mut deserializer).map_err(|error| {
        let path = error.path().to_string();
        WorldLoadError::Json {
            path,
            message: error.into_inner().to_string(),
        }
    })
}

pub fn parse_tiled_xml(raw: &str) -> Result<TiledMap, WorldLoadError> {
    let doc = Document::parse(raw).map_err(|error| WorldLoadError::Xml {
        message: error.to_string(),
        line: error.pos().row as usize,
        column: error.pos().col as usize,
    })?;
    let root = doc.root_element();
    if root.tag_name().name() != "map" {
        return Err(xml_error_at(&doc, root, "root element must be <map>".to_string()));
    }

    let width = required_u32_attribute(&doc, root, "width")?;
    let height = required_u32_attribute(&doc, root, "height")?;
    let mut map = TiledMap {
        width,
        height,
        tilewidth: optional_attribute::<i64>(&doc, root, "tilewidth")?,
        tileheight: optional_attribute::<i64>(&doc, root, "tileheight")?,
        orientation: root.attribute("orientation").map(ToString::to_string),
        renderorder: root.attribute("renderorder").map(ToString::to_string),
        infinite: root.attribute("infinite").map(|value| value == "1"),
        tiledversion: root.attribute("tiledversion").map(ToString::to_string),
        version: root.attribute("version").map(ToString::to_string),
        kind: Some("map".to_string()),
        layers: Vec::new(),
        tilesets: Vec::new(),
        properties: Vec::new(),
    };

    for child in root.children().filter(|node| node.is_element()) {
        match child.tag_name().name() {
            "properties" => map.properties = parse_xml_properties(child),
            "tileset" => map.tilesets.push(parse_xml_tileset(&doc, child)?),
            "layer" => map.layers.push(parse_xml_layer(&doc, child)?),
            // Object groups and image layers carry nothing the grid uses.
            _ => {}
        }
    }

    Ok(map)
}

fn parse_xml_properties(node: Node<'_, '_>) -> Vec<TiledProperty> {
    node.children()
        .filter(|child| child.is_element() && child.tag_name().name() == "property")
        .filter_map(|child| {
            let name = child.attribute("name")?.to_string();
            let kind = child.attribute("type").unwrap_or("string").to_string();
            let raw = child.attribute("value").unwrap_or_default();
            let value = match kind.as_str() {
                "int" => raw
                    .parse::<i64>()
                    .map(serde_json::Value::from)
                    .unwrap_or_else(|_| serde_json::Value::from(raw)),
                _ => serde_json::Value::from(raw),
            };
            Some(TiledProperty { name, kind, value })
        })
        .collect()
}

fn parse_xml_tileset(doc: &Document<'_>, node: Node<'_, '_>) -> Result<TiledTileset, WorldLoadError> {
    let image_node = node
        .children()
        .find(|child| child.is_element() && child.tag_name().name() == "image");
    Ok(TiledTileset {
        columns: optional_attribute(doc, node, "columns")?,
        firstgid: optional_attribute(doc, node, "firstgid")?,
        image: image_node
            .and_then(|image| image.attribute("source"))
            .map(ToString::to_string),
        imageheight: match image_node {
            Some(image) => optional_attribute(doc, image, "height")?,
            None => None,
        },
        imagewidth: match image_node {
            Some(image) => optional_attribute(doc, image, "width")?,
            None => None,
        },
        margin: optional_attribute(doc, node, "margin")?,
        name: node.attribute("name").map(ToString::to_string),
        spacing: optional_attribute(doc, node, "spacing")?,
        tilecount: optional_attribute(doc, node, "tilecount")?,
        tileheight: optional_attribute(doc, node, "tileheight")?,
        tilewidth: optional_attribute(doc, node, "tilewidth")?,
    })
}

fn parse_xml_layer(doc: &Document<'_>, node: Node<'_, '_>) -> Result<TiledLayer, WorldLoadError> {
    let data_node = node
        .children()
        .find(|child| child.is_element() && child.tag_name().name() == "data");
    let data = match data_node {
        Some(data) => {
            let encoding = data.attribute("encoding").unwrap_or("csv");
            if encoding != "csv" {
                return Err(xml_error_at(
                    doc,
                    data,
                    format!("unsupported layer encoding '{encoding}'; only csv is supported"),
                ));
            }
            Some(parse_csv_tiles(doc, data)?)
        }
        None => None,
    };
    Ok(TiledLayer {
        data,
        id: optional_attribute(doc, node, "id")?,
        name: node.attribute("name").map(ToString::to_string),
        width: optional_attribute(doc, node, "width")?,
        height: optional_attribute(doc, node, "height")?,
        opacity: optional_attribute(doc, node, "opacity")?,
        visible: node.attribute("visible").map(|value| value != "0"),
        kind: Some("tilelayer".to_string()),
        x: None,
        y: None,
    })
}

fn parse_csv_tiles(doc: &Document<'_>, node: Node<'_, '_>) -> Result<Vec<u32>, WorldLoadError> {
    let text = node.text().unwrap_or_default();
    text.split(',')
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(|cell| {
            cell.parse::<u32>().map_err(|_| {
                xml_error_at(doc, node, format!("tile id '{cell}' is not a non-negative integer"))
            })
        })
        .collect()
}

fn required_u32_attribute(
    doc: &Document<'_>,
    node: Node<'_, '_>,
    name: &str,
) -> Result<u32, WorldLoadError> {
    optional_attribute::<u32>(doc, node, name)?.ok_or_else(|| {
        xml_error_at(
            doc,
            node,
            format!("<{}> is missing attribute '{name}'", node.tag_name().name()),
        )
    })
}

fn optional_attribute<T: std::str::FromStr>(
    doc: &Document<'_>,
    node: Node<'_, '_>,
    name: &str,
) -> Result<Option<T>, WorldLoadError> {
    match node.attribute(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            xml_error_at(
                doc,
                node,
                format!("attribute '{name}' has invalid value '{raw}'"),
            )
        }),
    }
}

fn xml_error_at(doc: &Document<'_>, node: Node<'_, '_>, message: String) -> WorldLoadError {
    let pos = doc.text_pos_at(node.range().start);
    WorldLoadError::Xml {
        message,
        line: pos.row as usize,
        column: pos.col as usize,
    }
}

pub fn parse_map_document(path: &Path, raw: &str) -> Result<TiledMap, WorldLoadError> {
    match MapFormat::from_path(path) {
        Some(MapFormat::TiledJson) => parse_tiled_json(raw),
        Some(MapFormat::TiledXml) => parse_tiled_xml(raw),
        None => Err(WorldLoadError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

pub fn read_map_document(path: &Path) -> Result<TiledMap, WorldLoadError> {
    if MapFormat::from_path(path).is_none() {
        return Err(WorldLoadError::UnsupportedFormat {
            path: path.to_path_buf(),
        });
    }
    let raw = fs::read_to_string(path).map_err(|source| WorldLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_map_document(path, &raw)
}

pub fn load_map_file(path: &Path) -> Result<LoadedMap, WorldLoadError> {
    let document = read_map_document(path)?;
    let atlas = document.atlas(path.parent());
    let grid = document.into_grid()?;
    info!(
        path = %path.display(),
        width_tiles = grid.width_tiles(),
        height_tiles = grid.height_tiles(),
        screens_wide = grid.screens_wide(),
        screens_tall = grid.screens_tall(),
        "world_map_loaded"
    );
    Ok(LoadedMap { grid, atlas })
}

/// Load failures leave an empty world rather than aborting startup.
pub fn load_map_file_or_empty(path: &Path) -> LoadedMap {
    match load_map_file(path) {
        Ok(loaded) => loaded,
        Err(error) => {
            warn!(
                path = %path.display(),
                error = %error,
                "world_map_load_failed"
            );
            LoadedMap::empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::world::grid::{ScreenCoord, EMPTY_TILE};

    const TWO_BY_TWO: &str = r#"{"width":2,"height":2,"layers":[{"data":[1,0,0,64]}]}"#;

    #[test]
    fn valid_map_populates_grid_from_first_layer() {
        let grid = parse_tiled_json(TWO_BY_TWO)
            .expect("parse")
            .into_grid()
            .expect("grid");
        assert_eq!(grid.tile_at(0, 0), 1);
        assert_eq!(grid.tile_at(1, 0), 0);
        assert_eq!(grid.tile_at(1, 1), 64);

        let atlas = TileAtlas::default();
        let first = atlas.cell_for(grid.tile_at(0, 0)).expect("cell");
        assert_eq!((first.col, first.row), (0, 0));
        let last = atlas.cell_for(grid.tile_at(1, 1)).expect("cell");
        assert_eq!((last.col, last.row), (0, 1));
    }

    #[test]
    fn additional_layers_are_ignored() {
        let raw = r#"{"width":1,"height":1,"layers":[{"data":[5]},{"data":[9]}]}"#;
        let grid = parse_tiled_json(raw).expect("parse").into_grid().expect("grid");
        assert_eq!(grid.tile_at(0, 0), 5);
    }

    #[test]
    fn short_layer_data_is_tolerated() {
        let raw = r#"{"width":2,"height":2,"layers":[{"data":[3]}]}"#;
        let grid = parse_tiled_json(raw).expect("parse").into_grid().expect("grid");
        assert!(grid.has_data_shortfall());
        assert_eq!(grid.tile_at(0, 0), 3);
        assert_eq!(grid.tile_at(1, 1), EMPTY_TILE);
    }

    #[test]
    fn map_without_layers_fails() {
        let raw = r#"{"width":2,"height":2,"layers":[]}"#;
        let error = parse_tiled_json(raw)
            .expect("parse")
            .into_grid()
            .expect_err("no layers");
        assert!(matches!(error, WorldLoadError::NoLayers));
    }

    #[test]
    fn negative_tile_id_reports_json_path() {
        let raw = r#"{"width":2,"height":1,"layers":[{"data":[1,-4]}]}"#;
        let error = parse_tiled_json(raw).expect_err("negative id");
        match error {
            WorldLoadError::Json { path, .. } => assert_eq!(path, "layers[0].data[1]"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_width_is_a_load_failure() {
        let error = parse_tiled_json(r#"{"height":2,"layers":[]}"#).expect_err("missing width");
        assert!(matches!(error, WorldLoadError::Json { .. }));
    }

    #[test]
    fn properties_override_screen_geometry() {
        let raw = r#"{
            "width": 32, "height": 20, "tilewidth": 8, "tileheight": 8,
            "layers": [{"data": []}],
            "properties": [
                {"name": "screen_width", "type": "int", "value": 8},
                {"name": "screen_height", "type": "int", "value": 10}
            ]
        }"#;
        let map = parse_tiled_json(raw).expect("parse");
        let geometry = map.geometry();
        assert_eq!(geometry.tile_width, 8);
        assert_eq!(geometry.screen_width_tiles, 8);
        assert_eq!(geometry.screen_height_tiles, 10);
        let grid = map.into_grid().expect("grid");
        assert_eq!(grid.screens_wide(), 4);
        assert_eq!(grid.screens_tall(), 2);
    }

    #[test]
    fn oversized_screen_geometry_is_a_load_failure() {
        let raw = r#"{
            "width": 16, "height": 11, "tilewidth": 65536,
            "layers": [{"data": []}],
            "properties": [{"name": "screen_width", "type": "int", "value": 65536}]
        }"#;
        let error = parse_tiled_json(raw)
            .expect("parse")
            .into_grid()
            .expect_err("screen too large");
        assert!(matches!(
            error,
            WorldLoadError::ScreenTooLarge {
                tile_width: 65536,
                screen_width_tiles: 65536,
                ..
            }
        ));
    }

    #[test]
    fn screen_at_the_size_limit_loads() {
        let raw = r#"{
            "width": 16, "height": 11, "tilewidth": 256, "tileheight": 16,
            "layers": [{"data": []}]
        }"#;
        let grid = parse_tiled_json(raw).expect("parse").into_grid().expect("grid");
        assert_eq!(grid.geometry().screen_width_px(), MAX_SCREEN_SIDE_PX);
    }

    #[test]
    fn huge_extent_is_a_load_failure() {
        let raw = r#"{"width":4294967295,"height":4294967295,"layers":[{"data":[]}]}"#;
        let error = parse_tiled_json(raw)
            .expect("parse")
            .into_grid()
            .expect_err("map too large");
        assert!(matches!(
            error,
            WorldLoadError::MapTooLarge {
                width: u32::MAX,
                height: u32::MAX,
                ..
            }
        ));
    }

    #[test]
    fn oversized_map_file_degrades_to_empty_world() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("huge.json");
        fs::write(
            &path,
            r#"{"width":16,"height":11,"tilewidth":65536,"layers":[{"data":[]}],
                "properties":[{"name":"screen_width","type":"int","value":65536}]}"#,
        )
        .expect("write");

        let loaded = load_map_file_or_empty(&path);
        assert!(loaded.grid.is_empty());
        assert_eq!(loaded.grid.geometry(), GridGeometry::default());
        let center = loaded.grid.screen_center_pixel(ScreenCoord::new(0, 0));
        assert_eq!((center.x, center.y), (128.0, 88.0));
    }

    #[test]
    fn tileset_fields_shape_the_atlas() {
        let raw = r#"{
            "width": 1, "height": 1, "layers": [{"data": [1]}],
            "tilesets": [{"columns": 10, "tilecount": 25, "image": "tiles.png", "firstgid": 1}]
        }"#;
        let map = parse_tiled_json(raw).expect("parse");
        let atlas = map.atlas(Some(Path::new("assets")));
        assert_eq!(atlas.columns, 10);
        assert_eq!(atlas.rows, 3);
        assert_eq!(atlas.image, Some(Path::new("assets").join("tiles.png")));
    }

    #[test]
    fn tmx_csv_layer_parses_like_json() {
        let raw = r#"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.10" orientation="orthogonal" width="2" height="2" tilewidth="16" tileheight="16">
 <properties>
  <property name="screen_width" type="int" value="16"/>
 </properties>
 <tileset firstgid="1" name="overworld_tiles" tilewidth="16" tileheight="16" tilecount="3906" columns="63">
  <image source="tileset.png" width="1008" height="992"/>
 </tileset>
 <layer id="1" name="terrain" width="2" height="2">
  <data encoding="csv">
1,0,
0,64
</data>
 </layer>
</map>"#;
        let map = parse_tiled_xml(raw).expect("parse");
        assert_eq!(map.property_int(PROPERTY_SCREEN_WIDTH), Some(16));
        let atlas = map.atlas(None);
        assert_eq!(atlas.columns, 63);
        assert_eq!(atlas.rows, 62);
        let grid = map.into_grid().expect("grid");
        assert_eq!(grid.tiles(), &[1, 0, 0, 64]);
    }

    #[test]
    fn tmx_non_csv_encoding_is_rejected_with_location() {
        let raw = r#"<map width="1" height="1"><layer><data encoding="base64">AAAA</data></layer></map>"#;
        let error = parse_tiled_xml(raw).expect_err("base64");
        match error {
            WorldLoadError::Xml { line, .. } => assert_eq!(line, 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_tmx_reports_location() {
        let error = parse_tiled_xml("<map width=\"1\"><layer></map>").expect_err("malformed");
        assert!(matches!(error, WorldLoadError::Xml { .. }));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let error = read_map_document(Path::new("overworld.yaml")).expect_err("yaml");
        assert!(matches!(error, WorldLoadError::UnsupportedFormat { .. }));
    }

    #[test]
    fn load_map_file_resolves_atlas_next_to_map() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("overworld.json");
        fs::write(
            &path,
            r#"{"width":16,"height":11,"layers":[{"data":[]}],"tilesets":[{"columns":63,"image":"tileset.png"}]}"#,
        )
        .expect("write map");
        let loaded = load_map_file(&path).expect("load");
        assert_eq!(loaded.atlas.image, Some(temp.path().join("tileset.png")));
        assert!(loaded.grid.is_valid_screen(ScreenCoord::new(0, 0)));
    }

    #[test]
    fn unreadable_file_degrades_to_empty_world() {
        let temp = TempDir::new().expect("temp");
        let loaded = load_map_file_or_empty(&temp.path().join("missing.json"));
        assert!(loaded.grid.is_empty());
        assert!(!loaded.grid.is_valid_screen(ScreenCoord::new(0, 0)));
    }

    #[test]
    fn malformed_file_degrades_to_empty_world() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("broken.json");
        fs::write(&path, "{ not json").expect("write");
        let loaded = load_map_file_or_empty(&path);
        assert!(loaded.grid.is_empty());
        assert_eq!(loaded.grid.tile_at(0, 0), EMPTY_TILE);
    }
}
