use std::sync::Arc;

use engine::{
    load_map_file_or_empty, resolve_app_paths, LoopConfig, Scene, ScreenCoord, StartupError,
    WorldGrid,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::config::OverworldConfig;
use super::gameplay::OverworldScene;

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

pub(crate) fn build_app() -> Result<AppWiring, StartupError> {
    init_tracing();
    info!("=== Overworld Startup ===");

    let paths = resolve_app_paths()?;
    let overworld = OverworldConfig::from_env(&paths);
    info!(
        root = %paths.root.display(),
        map = %overworld.map_path.display(),
        start_x = overworld.start_screen.x,
        start_y = overworld.start_screen.y,
        "overworld_config"
    );

    let loaded = load_map_file_or_empty(&overworld.map_path);
    let grid = Arc::new(loaded.grid);
    let start_screen = resolve_start_screen(&grid, overworld.start_screen);
    let geometry = grid.geometry();

    let config = LoopConfig {
        viewport_width: geometry.screen_width_px(),
        viewport_height: geometry.screen_height_px(),
        ..LoopConfig::default()
    };
    let scene = OverworldScene::new(grid, loaded.atlas, start_screen);

    Ok(AppWiring {
        config,
        scene: Box::new(scene),
    })
}

/// An empty world keeps the requested screen; there is nothing to fall back to.
fn resolve_start_screen(grid: &WorldGrid, requested: ScreenCoord) -> ScreenCoord {
    if grid.is_empty() || grid.is_valid_screen(requested) {
        return requested;
    }
    let fallback = ScreenCoord::new(0, 0);
    warn!(
        requested_x = requested.x,
        requested_y = requested.y,
        screens_wide = grid.screens_wide(),
        screens_tall = grid.screens_tall(),
        "start_screen_outside_map_using_origin"
    );
    fallback
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
