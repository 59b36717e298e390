use std::io::{self, Write};
use std::path::{Path, PathBuf};

use engine::assets::{
    reconstruct_map, to_pretty_json, write_output, AssetPipelineError, ExtractionLayout,
    ReconstructOptions,
};
use engine::world::{read_map_document, GridGeometry, ScreenMetadata, WorldGrid, WorldLoadError};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MapToolError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Asset(#[from] AssetPipelineError),
    #[error(transparent)]
    World(#[from] WorldLoadError),
    #[error("failed to write report: {0}")]
    Report(#[source] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    Reconstruct {
        source: PathBuf,
        out_dir: PathBuf,
        separator_px: u32,
        columns: Option<u32>,
    },
    Screens {
        map: PathBuf,
        output: PathBuf,
    },
    Inspect {
        map: PathBuf,
        json: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedArgs {
    Help,
    Command(CommandKind),
}

/// Parses everything after the program name.
pub fn parse_args(args: &[String]) -> Result<ParsedArgs, MapToolError> {
    let Some(command) = args.first() else {
        return Err(MapToolError::Usage(usage_text()));
    };
    let rest = &args[1..];

    let kind = match command.as_str() {
        "-h" | "--help" | "help" => return Ok(ParsedArgs::Help),
        "reconstruct" => parse_reconstruct(rest)?,
        "screens" => {
            let [map, output] = rest else {
                return Err(usage("screens requires <map> <out.json>"));
            };
            CommandKind::Screens {
                map: PathBuf::from(map),
                output: PathBuf::from(output),
            }
        }
        "inspect" => {
            let mut map = None;
            let mut json = false;
            for arg in rest {
                match arg.as_str() {
                    "--json" => json = true,
                    flag if flag.starts_with("--") => {
                        return Err(usage(format!("unknown inspect argument '{flag}'")));
                    }
                    path if map.is_none() => map = Some(PathBuf::from(path)),
                    extra => return Err(usage(format!("unexpected argument '{extra}'"))),
                }
            }
            let map = map.ok_or_else(|| usage("inspect requires <map>"))?;
            CommandKind::Inspect { map, json }
        }
        other => return Err(usage(format!("unknown subcommand '{other}'"))),
    };
    Ok(ParsedArgs::Command(kind))
}

fn parse_reconstruct(args: &[String]) -> Result<CommandKind, MapToolError> {
    let mut positional = Vec::new();
    let mut separator_px = 0u32;
    let mut columns = None;
    let mut index = 0usize;
    while index < args.len() {
        match args[index].as_str() {
            "--separator" => {
                separator_px = parse_flag_value(args, index, "--separator")?;
                index += 2;
            }
            "--columns" => {
                let value: u32 = parse_flag_value(args, index, "--columns")?;
                if value == 0 {
                    return Err(usage("--columns must be positive"));
                }
                columns = Some(value);
                index += 2;
            }
            flag if flag.starts_with("--") => {
                return Err(usage(format!("unknown reconstruct argument '{flag}'")));
            }
            value => {
                positional.push(PathBuf::from(value));
                index += 1;
            }
        }
    }

    let [source, out_dir] = <[PathBuf; 2]>::try_from(positional)
        .map_err(|_| usage("reconstruct requires <overworld.png> <out_dir>"))?;
    Ok(CommandKind::Reconstruct {
        source,
        out_dir,
        separator_px,
        columns,
    })
}

fn parse_flag_value<T: std::str::FromStr>(
    args: &[String],
    index: usize,
    flag: &str,
) -> Result<T, MapToolError> {
    let value = args
        .get(index + 1)
        .ok_or_else(|| usage(format!("missing value for {flag}")))?;
    value
        .parse::<T>()
        .map_err(|_| usage(format!("invalid {flag} value '{value}' (expected a non-negative integer)")))
}

fn usage(message: impl Into<String>) -> MapToolError {
    MapToolError::Usage(format!("{}\n\n{}", message.into(), usage_text()))
}

pub fn usage_text() -> String {
    [
        "map_tools - overworld map tooling",
        "",
        "Usage:",
        "  map_tools reconstruct <overworld.png> <out_dir> [--separator <px>] [--columns <n>]",
        "  map_tools screens <map.json|map.tmx> <out.json>",
        "  map_tools inspect <map.json|map.tmx> [--json]",
        "",
        "reconstruct writes tileset.png, overworld.json and screens.json into <out_dir>.",
        "Defaults:",
        "  --separator 0",
        "  --columns ceil(sqrt(unique tiles))",
    ]
    .join("\n")
}

pub fn run<W: Write>(kind: CommandKind, stdout: &mut W) -> Result<(), MapToolError> {
    match kind {
        CommandKind::Reconstruct {
            source,
            out_dir,
            separator_px,
            columns,
        } => {
            let options = ReconstructOptions {
                layout: ExtractionLayout {
                    geometry: GridGeometry::default(),
                    separator_px,
                },
                columns,
            };
            let output = reconstruct_map(&source, &out_dir, options)?;
            writeln!(
                stdout,
                "reconstructed {}x{} tiles, {} unique tiles in {} columns",
                output.width_tiles, output.height_tiles, output.unique_tile_count, output.columns
            )
            .map_err(MapToolError::Report)?;
            for path in [&output.tileset_path, &output.map_path, &output.screens_path] {
                writeln!(stdout, "  wrote {}", path.display()).map_err(MapToolError::Report)?;
            }
            Ok(())
        }
        CommandKind::Screens { map, output } => {
            let grid = load_grid(&map)?;
            let metadata = ScreenMetadata::for_grid(&grid);
            write_output(&output, &to_pretty_json("screen metadata", &metadata)?)?;
            info!(
                map = %map.display(),
                output = %output.display(),
                screens = metadata.total_screens,
                "screen_metadata_written"
            );
            writeln!(
                stdout,
                "wrote {} screens to {}",
                metadata.total_screens,
                output.display()
            )
            .map_err(MapToolError::Report)
        }
        CommandKind::Inspect { map, json } => {
            let grid = load_grid(&map)?;
            let summary = MapSummary::of(&grid);
            if json {
                writeln!(stdout, "{}", summary.to_json()).map_err(MapToolError::Report)
            } else {
                summary.write_text(&map, stdout).map_err(MapToolError::Report)
            }
        }
    }
}

fn load_grid(path: &Path) -> Result<WorldGrid, MapToolError> {
    Ok(read_map_document(path)?.into_grid()?)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapSummary {
    pub width_tiles: u32,
    pub height_tiles: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub screens_wide: u32,
    pub screens_tall: u32,
    pub unique_tiles: usize,
    pub data_shortfall: bool,
    /// Tiles past the last whole screen on either axis; unreachable in game.
    pub partial_screen_tiles: (u32, u32),
}

impl MapSummary {
    pub fn of(grid: &WorldGrid) -> Self {
        let geometry = grid.geometry();
        Self {
            width_tiles: grid.width_tiles(),
            height_tiles: grid.height_tiles(),
            tile_width: geometry.tile_width,
            tile_height: geometry.tile_height,
            screens_wide: grid.screens_wide(),
            screens_tall: grid.screens_tall(),
            unique_tiles: grid.unique_tile_count(),
            data_shortfall: grid.has_data_shortfall(),
            partial_screen_tiles: (
                grid.width_tiles() % geometry.screen_width_tiles.max(1),
                grid.height_tiles() % geometry.screen_height_tiles.max(1),
            ),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "width_tiles": self.width_tiles,
            "height_tiles": self.height_tiles,
            "tile_width": self.tile_width,
            "tile_height": self.tile_height,
            "screens_wide": self.screens_wide,
            "screens_tall": self.screens_tall,
            "unique_tiles": self.unique_tiles,
            "data_shortfall": self.data_shortfall,
            "partial_screen_tiles": [self.partial_screen_tiles.0, self.partial_screen_tiles.1],
        })
    }

    fn write_text<W: Write>(&self, map: &Path, out: &mut W) -> io::Result<()> {
        writeln!(out, "map: {}", map.display())?;
        writeln!(
            out,
            "size: {}x{} tiles ({}x{} px tiles)",
            self.width_tiles, self.height_tiles, self.tile_width, self.tile_height
        )?;
        writeln!(
            out,
            "screens: {}x{} ({} total)",
            self.screens_wide,
            self.screens_tall,
            self.screens_wide.saturating_mul(self.screens_tall)
        )?;
        writeln!(out, "unique tiles: {}", self.unique_tiles)?;
        if self.data_shortfall {
            writeln!(out, "warning: tile data is shorter than width*height")?;
        }
        let (extra_x, extra_y) = self.partial_screen_tiles;
        if extra_x != 0 || extra_y != 0 {
            writeln!(
                out,
                "warning: {extra_x} column(s) and {extra_y} row(s) of tiles fall outside whole screens"
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    fn write_map(dir: &Path, width: u32, height: u32, data: &[u32]) -> PathBuf {
        let path = dir.join("map.json");
        let document = serde_json::json!({
            "width": width,
            "height": height,
            "layers": [{ "data": data }],
        });
        fs::write(&path, document.to_string()).expect("write map");
        path
    }

    #[test]
    fn empty_args_and_help() {
        assert!(matches!(parse_args(&[]), Err(MapToolError::Usage(_))));
        assert_eq!(parse_args(&args(&["--help"])).expect("help"), ParsedArgs::Help);
    }

    #[test]
    fn reconstruct_parses_flags_in_any_position() {
        let parsed = parse_args(&args(&[
            "reconstruct",
            "--separator",
            "1",
            "shot.png",
            "out",
            "--columns",
            "40",
        ]))
        .expect("parse");

        assert_eq!(
            parsed,
            ParsedArgs::Command(CommandKind::Reconstruct {
                source: PathBuf::from("shot.png"),
                out_dir: PathBuf::from("out"),
                separator_px: 1,
                columns: Some(40),
            })
        );
    }

    #[test]
    fn reconstruct_rejects_bad_input() {
        for raw in [
            &["reconstruct", "shot.png"][..],
            &["reconstruct", "shot.png", "out", "--columns", "0"][..],
            &["reconstruct", "shot.png", "out", "--separator"][..],
            &["reconstruct", "shot.png", "out", "--separator", "-2"][..],
            &["reconstruct", "shot.png", "out", "--scale", "2"][..],
        ] {
            assert!(
                matches!(parse_args(&args(raw)), Err(MapToolError::Usage(_))),
                "{raw:?}"
            );
        }
    }

    #[test]
    fn screens_and_inspect_parse() {
        assert_eq!(
            parse_args(&args(&["screens", "map.tmx", "screens.json"])).expect("screens"),
            ParsedArgs::Command(CommandKind::Screens {
                map: PathBuf::from("map.tmx"),
                output: PathBuf::from("screens.json"),
            })
        );
        assert_eq!(
            parse_args(&args(&["inspect", "--json", "map.json"])).expect("inspect"),
            ParsedArgs::Command(CommandKind::Inspect {
                map: PathBuf::from("map.json"),
                json: true,
            })
        );
        assert!(parse_args(&args(&["screens", "map.json"])).is_err());
        assert!(parse_args(&args(&["launch"])).is_err());
    }

    #[test]
    fn inspect_reports_dimensions_and_partial_screens() {
        let temp = TempDir::new().expect("temp");
        let width = 20;
        let height = 11;
        let mut data = vec![1; (width * height) as usize];
        data[3] = 2;
        let map = write_map(temp.path(), width, height, &data);

        let mut out = Vec::new();
        run(
            CommandKind::Inspect {
                map: map.clone(),
                json: false,
            },
            &mut out,
        )
        .expect("inspect");
        let text = String::from_utf8(out).expect("utf8");

        assert!(text.contains("size: 20x11 tiles"));
        assert!(text.contains("screens: 1x1 (1 total)"));
        assert!(text.contains("unique tiles: 2"));
        assert!(text.contains("4 column(s) and 0 row(s)"));
        assert!(!text.contains("shorter than"));
    }

    #[test]
    fn inspect_json_flags_shortfall() {
        let temp = TempDir::new().expect("temp");
        let map = write_map(temp.path(), 16, 11, &[1, 2, 3]);

        let mut out = Vec::new();
        run(CommandKind::Inspect { map, json: true }, &mut out).expect("inspect");
        let value: serde_json::Value = serde_json::from_slice(&out).expect("json");

        assert_eq!(value["data_shortfall"], true);
        assert_eq!(value["unique_tiles"], 3);
        assert_eq!(value["screens_wide"], 1);
    }

    #[test]
    fn screens_command_writes_metadata() {
        let temp = TempDir::new().expect("temp");
        let map = write_map(temp.path(), 32, 22, &vec![5; 32 * 22]);
        let output = temp.path().join("out").join("screens.json");

        let mut out = Vec::new();
        run(
            CommandKind::Screens {
                map,
                output: output.clone(),
            },
            &mut out,
        )
        .expect("screens");

        let raw = fs::read_to_string(&output).expect("read screens");
        let metadata: ScreenMetadata = serde_json::from_str(&raw).expect("parse screens");
        assert_eq!(metadata.total_screens, 4);
        assert_eq!(metadata.screens[3].pixel_x, 256);
        assert_eq!(metadata.screens[3].pixel_y, 176);
    }

    #[test]
    fn missing_map_surfaces_world_error() {
        let temp = TempDir::new().expect("temp");
        let result = run(
            CommandKind::Inspect {
                map: temp.path().join("nope.json"),
                json: false,
            },
            &mut Vec::new(),
        );
        assert!(matches!(
            result,
            Err(MapToolError::World(WorldLoadError::Read { .. }))
        ));
    }

    #[test]
    fn oversized_map_is_rejected_before_reporting() {
        let temp = TempDir::new().expect("temp");
        let map = write_map(temp.path(), u32::MAX, u32::MAX, &[]);
        let mut out = Vec::new();
        let result = run(CommandKind::Inspect { map, json: false }, &mut out);
        assert!(matches!(
            result,
            Err(MapToolError::World(WorldLoadError::MapTooLarge { .. }))
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn reconstruct_command_writes_all_outputs() {
        let temp = TempDir::new().expect("temp");
        let source = temp.path().join("overworld.png");
        let mut image = RgbaImage::from_pixel(256, 176, Rgba([10, 20, 30, 255]));
        for y in 0..16 {
            for x in 0..16 {
                image.put_pixel(x, y, Rgba([200, 0, 0, 255]));
            }
        }
        image.save(&source).expect("save fixture");
        let out_dir = temp.path().join("out");

        let mut out = Vec::new();
        run(
            CommandKind::Reconstruct {
                source,
                out_dir: out_dir.clone(),
                separator_px: 0,
                columns: None,
            },
            &mut out,
        )
        .expect("reconstruct");

        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("reconstructed 16x11 tiles, 2 unique tiles in 2 columns"));
        for name in ["tileset.png", "overworld.json", "screens.json"] {
            assert!(out_dir.join(name).is_file(), "{name} missing");
        }
    }
}
