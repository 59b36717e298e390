use engine::{
    Direction, EntityId, EntityPositions, ScreenCoord, ScreenTransitionController, SceneWorld,
    Vec2,
};
use tracing::debug;

pub(crate) const PLAYER_SPEED_PX_PER_SECOND: f32 = 80.0;
/// Half of the player's 12px body; keeps the sprite fully on screen when
/// pushed against the edge of the map.
pub(crate) const PLAYER_CLAMP_MARGIN_PX: f32 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum PlayerStep {
    /// A screen transition owns the player this tick.
    Suppressed,
    Idle,
    Moved,
    TransitionStarted {
        target: ScreenCoord,
        direction: Direction,
    },
    Clamped {
        position: Vec2,
    },
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct PlayerController {
    id: EntityId,
    speed: f32,
    clamp_margin: f32,
}

impl PlayerController {
    pub(crate) fn new(id: EntityId) -> Self {
        Self {
            id,
            speed: PLAYER_SPEED_PX_PER_SECOND,
            clamp_margin: PLAYER_CLAMP_MARGIN_PX,
        }
    }

    pub(crate) fn id(&self) -> EntityId {
        self.id
    }

    pub(crate) fn tick(
        &self,
        fixed_dt_seconds: f32,
        movement_axis: Vec2,
        controller: &mut ScreenTransitionController,
        world: &mut SceneWorld,
    ) -> PlayerStep {
        if controller.is_transitioning() {
            return PlayerStep::Suppressed;
        }

        let heading = movement_axis.normalized_or_zero();
        if heading == Vec2::ZERO {
            return PlayerStep::Idle;
        }
        let Some(position) = world.entity_position(self.id) else {
            return PlayerStep::Idle;
        };

        if let (Some(facing), Some(entity)) = (
            Direction::from_movement(heading.x, heading.y),
            world.find_entity_mut(self.id),
        ) {
            entity.facing = facing;
        }

        let current = controller.current_screen();
        let (mut next, walled) = self.stop_at_map_edges(
            controller,
            current,
            position + heading * (self.speed * fixed_dt_seconds),
        );
        let next_screen = controller.get_screen(next);
        if next_screen == current {
            world.set_entity_position(self.id, next);
            return if walled {
                PlayerStep::Clamped { position: next }
            } else {
                PlayerStep::Moved
            };
        }

        let dx = (next_screen.x - current.x).signum();
        let dy = (next_screen.y - current.y).signum();
        let (target, direction) = if dx != 0 {
            if dy != 0 {
                // Corner crossings scroll horizontally; stay inside the current row.
                let row = controller.grid().screen_rect(current);
                next.y = next
                    .y
                    .clamp(row.top + self.clamp_margin, row.bottom - self.clamp_margin);
            }
            (current.offset(dx, 0), Direction::from_screen_step(dx, 0))
        } else {
            (current.offset(0, dy), Direction::from_screen_step(0, dy))
        };
        world.set_entity_position(self.id, next);

        if let Some(direction) = direction {
            if controller.begin_transition_carrying(target, direction, self.id, world) {
                return PlayerStep::TransitionStarted { target, direction };
            }
        }

        match controller.boundary_clamp(self.id, current, self.clamp_margin, world) {
            Some(position) => {
                debug!(
                    entity_id = self.id.0,
                    blocked_x = target.x,
                    blocked_y = target.y,
                    "player_blocked_at_map_edge"
                );
                PlayerStep::Clamped { position }
            }
            None => PlayerStep::Idle,
        }
    }

    /// Sides of `screen` with no neighbouring screen behave as walls
    /// `clamp_margin` pixels in. Returns the stopped position and whether a
    /// wall was hit.
    fn stop_at_map_edges(
        &self,
        controller: &ScreenTransitionController,
        screen: ScreenCoord,
        mut next: Vec2,
    ) -> (Vec2, bool) {
        let rect = controller.grid().screen_rect(screen);
        let open = |dx: i32, dy: i32| controller.is_valid_screen(screen.offset(dx, dy));
        let mut walled = false;

        if next.x < rect.left + self.clamp_margin && !open(-1, 0) {
            next.x = rect.left + self.clamp_margin;
            walled = true;
        } else if next.x > rect.right - self.clamp_margin && !open(1, 0) {
            next.x = rect.right - self.clamp_margin;
            walled = true;
        }
        if next.y < rect.top + self.clamp_margin && !open(0, -1) {
            next.y = rect.top + self.clamp_margin;
            walled = true;
        } else if next.y > rect.bottom - self.clamp_margin && !open(0, 1) {
            next.y = rect.bottom - self.clamp_margin;
            walled = true;
        }
        (next, walled)
    }
}
