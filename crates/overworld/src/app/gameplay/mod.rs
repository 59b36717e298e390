use std::sync::Arc;

use engine::{
    InputSnapshot, RenderableDesc, Scene, SceneCommand, SceneWorld, ScreenCoord,
    ScreenTransitionController, TileAtlas, Transform, TransitionStep, WorldGrid,
};
use tracing::{debug, info};

mod player;

use player::{PlayerController, PlayerStep};

const PLAYER_COLOR: [u8; 4] = [72, 168, 56, 255];
const PLAYER_HALF_SIZE_PX: i32 = 6;

pub(crate) struct OverworldScene {
    grid: Arc<WorldGrid>,
    atlas: TileAtlas,
    start_screen: ScreenCoord,
    controller: ScreenTransitionController,
    player: Option<PlayerController>,
    completed_transitions: u32,
}

impl OverworldScene {
    pub(crate) fn new(grid: Arc<WorldGrid>, atlas: TileAtlas, start_screen: ScreenCoord) -> Self {
        let controller = ScreenTransitionController::new(Arc::clone(&grid), start_screen);
        Self {
            grid,
            atlas,
            start_screen,
            controller,
            player: None,
            completed_transitions: 0,
        }
    }
}

impl Scene for OverworldScene {
    fn load(&mut self, world: &mut SceneWorld) {
        world.set_world_map(Arc::clone(&self.grid), self.atlas.clone());
        self.controller = ScreenTransitionController::new(Arc::clone(&self.grid), self.start_screen);
        self.completed_transitions = 0;

        let spawn = self.grid.screen_center_pixel(self.start_screen);
        let player_id = world.spawn(
            Transform { position: spawn },
            RenderableDesc {
                debug_name: "player",
                color: PLAYER_COLOR,
                half_size_px: PLAYER_HALF_SIZE_PX,
            },
        );
        world.apply_pending();
        self.player = Some(PlayerController::new(player_id));
        world.camera_mut().position = self.controller.camera_position();

        info!(
            screen_x = self.start_screen.x,
            screen_y = self.start_screen.y,
            player_id = player_id.0,
            entity_count = world.entity_count(),
            "overworld_scene_loaded"
        );
    }

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand {
        if input.restart_pressed() {
            return SceneCommand::Restart;
        }

        if let Some(player) = self.player {
            let step = player.tick(
                fixed_dt_seconds,
                input.movement_axis(),
                &mut self.controller,
                world,
            );
            match step {
                PlayerStep::TransitionStarted { target, direction } => info!(
                    player_id = player.id().0,
                    to_x = target.x,
                    to_y = target.y,
                    direction = ?direction,
                    "player_left_screen"
                ),
                PlayerStep::Clamped { position } => debug!(
                    player_id = player.id().0,
                    x = position.x,
                    y = position.y,
                    "player_held_at_map_edge"
                ),
                PlayerStep::Suppressed | PlayerStep::Idle | PlayerStep::Moved => {}
            }
        }

        if self.controller.update(fixed_dt_seconds, world) == TransitionStep::Completed {
            self.completed_transitions = self.completed_transitions.saturating_add(1);
        }
        world.camera_mut().position = self.controller.camera_position();

        SceneCommand::None
    }

    fn unload(&mut self, world: &mut SceneWorld) {
        info!(
            entity_count = world.entity_count(),
            completed_transitions = self.completed_transitions,
            "overworld_scene_unloaded"
        );
        self.player = None;
    }

    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        let screen = self.controller.current_screen();
        let state = if self.controller.is_transitioning() {
            " | scrolling"
        } else {
            ""
        };
        Some(format!(
            "Overworld | screen ({}, {}){state}",
            screen.x, screen.y
        ))
    }
}
