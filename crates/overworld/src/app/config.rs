use std::env;
use std::path::{Path, PathBuf};

use engine::{AppPaths, ScreenCoord};
use tracing::warn;

pub(crate) const MAP_ENV_VAR: &str = "OVERWORLD_MAP";
pub(crate) const START_SCREEN_ENV_VAR: &str = "OVERWORLD_START_SCREEN";
pub(crate) const DEFAULT_MAP_FILE_NAME: &str = "overworld.json";
/// Screen the player starts on: the middle-bottom of a 16x8 overworld.
pub(crate) const DEFAULT_START_SCREEN: ScreenCoord = ScreenCoord::new(7, 7);

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OverworldConfig {
    pub(crate) map_path: PathBuf,
    pub(crate) start_screen: ScreenCoord,
}

impl OverworldConfig {
    pub(crate) fn from_env(paths: &AppPaths) -> Self {
        Self::from_values(
            paths,
            read_env(MAP_ENV_VAR).as_deref(),
            read_env(START_SCREEN_ENV_VAR).as_deref(),
        )
    }

    fn from_values(paths: &AppPaths, map: Option<&str>, start_screen: Option<&str>) -> Self {
        let map_path = match map.map(str::trim).filter(|raw| !raw.is_empty()) {
            Some(raw) => resolve_against(&paths.root, Path::new(raw)),
            None => paths.assets_dir.join(DEFAULT_MAP_FILE_NAME),
        };

        let start_screen = match start_screen {
            Some(raw) => parse_screen_coord(raw).unwrap_or_else(|| {
                warn!(
                    var = START_SCREEN_ENV_VAR,
                    value = raw,
                    default_x = DEFAULT_START_SCREEN.x,
                    default_y = DEFAULT_START_SCREEN.y,
                    "start_screen_invalid_using_default"
                );
                DEFAULT_START_SCREEN
            }),
            None => DEFAULT_START_SCREEN,
        };

        Self {
            map_path,
            start_screen,
        }
    }
}

/// Parses `"x,y"`; whitespace around either number is ignored.
pub(crate) fn parse_screen_coord(raw: &str) -> Option<ScreenCoord> {
    let (x, y) = raw.split_once(',')?;
    let x = x.trim().parse::<i32>().ok()?;
    let y = y.trim().parse::<i32>().ok()?;
    Some(ScreenCoord::new(x, y))
}

fn resolve_against(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

fn read_env(var: &'static str) -> Option<String> {
    match env::var(var) {
        Ok(value) => Some(value),
        Err(env::VarError::NotPresent) => None,
        Err(env::VarError::NotUnicode(_)) => {
            warn!(var, "env_var_not_unicode_ignored");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::app_paths_for_root;

    fn paths() -> AppPaths {
        app_paths_for_root(PathBuf::from("/game"))
    }

    #[test]
    fn defaults_point_at_bundled_map_and_start_screen() {
        let config = OverworldConfig::from_values(&paths(), None, None);
        assert_eq!(config.map_path, PathBuf::from("/game/assets/overworld.json"));
        assert_eq!(config.start_screen, DEFAULT_START_SCREEN);
    }

    #[test]
    fn relative_map_override_resolves_against_root() {
        let config = OverworldConfig::from_values(&paths(), Some("maps/custom.tmx"), None);
        assert_eq!(config.map_path, PathBuf::from("/game/maps/custom.tmx"));
    }

    #[test]
    fn absolute_map_override_is_used_as_is() {
        let config = OverworldConfig::from_values(&paths(), Some("/tmp/world.json"), None);
        assert_eq!(config.map_path, PathBuf::from("/tmp/world.json"));
    }

    #[test]
    fn blank_map_override_falls_back_to_default() {
        let config = OverworldConfig::from_values(&paths(), Some("   "), None);
        assert_eq!(config.map_path, PathBuf::from("/game/assets/overworld.json"));
    }

    #[test]
    fn start_screen_override_is_parsed() {
        let config = OverworldConfig::from_values(&paths(), None, Some(" 3 , 5 "));
        assert_eq!(config.start_screen, ScreenCoord::new(3, 5));
    }

    #[test]
    fn malformed_start_screen_falls_back_to_default() {
        for raw in ["", "7", "a,b", "1,2,3", "1;2"] {
            let config = OverworldConfig::from_values(&paths(), None, Some(raw));
            assert_eq!(config.start_screen, DEFAULT_START_SCREEN, "input {raw:?}");
        }
    }

    #[test]
    fn negative_coordinates_parse() {
        assert_eq!(parse_screen_coord("-1,0"), Some(ScreenCoord::new(-1, 0)));
    }
}
