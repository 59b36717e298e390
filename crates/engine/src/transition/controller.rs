use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::app::{EntityId, Vec2};
use crate::world::{ScreenCoord, WorldGrid};

use super::direction::Direction;

pub const TRANSITION_CAMERA_SPEED_PX_PER_SECOND: f32 = 200.0;
pub const ENTRY_EDGE_MARGIN_PX: f32 = 16.0;

// Absorbs f32 drift so a step that lands on the target completes in that tick.
const ARRIVAL_TOLERANCE_PX: f32 = 1e-3;

/// Position access for entities the controller does not own.
///
/// The controller only keeps an [`EntityId`]; callers hand in the store on
/// every call. An id that no longer resolves is dropped from the transition
/// and the camera finishes on its own.
pub trait EntityPositions {
    fn entity_position(&self, id: EntityId) -> Option<Vec2>;
    fn set_entity_position(&mut self, id: EntityId, position: Vec2) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct CarriedEntity {
    id: EntityId,
    camera_offset: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ActiveTransition {
    target: Vec2,
    direction: (i32, i32),
    carried: Option<CarriedEntity>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TransitionState {
    Idle,
    Transitioning(ActiveTransition),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionStep {
    Idle,
    Advanced,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    AlreadyTransitioning,
    SameScreen,
    InvalidTarget,
}

impl Rejection {
    fn as_str(self) -> &'static str {
        match self {
            Rejection::AlreadyTransitioning => "already_transitioning",
            Rejection::SameScreen => "same_screen",
            Rejection::InvalidTarget => "invalid_target",
        }
    }
}

/// Owns the current screen, the camera and the scroll between screens.
#[derive(Debug, Clone)]
pub struct ScreenTransitionController {
    grid: Arc<WorldGrid>,
    current_screen: ScreenCoord,
    camera_position: Vec2,
    speed: f32,
    state: TransitionState,
}

impl ScreenTransitionController {
    pub fn new(grid: Arc<WorldGrid>, start_screen: ScreenCoord) -> Self {
        let camera_position = grid.screen_center_pixel(start_screen);
        Self {
            grid,
            current_screen: start_screen,
            camera_position,
            speed: TRANSITION_CAMERA_SPEED_PX_PER_SECOND,
            state: TransitionState::Idle,
        }
    }

    pub fn grid(&self) -> &Arc<WorldGrid> {
        &self.grid
    }

    pub fn get_screen(&self, position: Vec2) -> ScreenCoord {
        self.grid.screen_containing(position)
    }

    pub fn is_valid_screen(&self, screen: ScreenCoord) -> bool {
        self.grid.is_valid_screen(screen)
    }

    pub fn is_transitioning(&self) -> bool {
        matches!(self.state, TransitionState::Transitioning(_))
    }

    pub fn current_screen(&self) -> ScreenCoord {
        self.current_screen
    }

    pub fn camera_position(&self) -> Vec2 {
        self.camera_position
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn transition_target(&self) -> Option<Vec2> {
        match self.state {
            TransitionState::Transitioning(active) => Some(active.target),
            TransitionState::Idle => None,
        }
    }

    /// `(0, 0)` whenever no transition is running.
    pub fn transition_direction(&self) -> (i32, i32) {
        match self.state {
            TransitionState::Transitioning(active) => active.direction,
            TransitionState::Idle => (0, 0),
        }
    }

    pub fn active_entity(&self) -> Option<EntityId> {
        match self.state {
            TransitionState::Transitioning(active) => active.carried.map(|carried| carried.id),
            TransitionState::Idle => None,
        }
    }

    pub fn entity_camera_offset(&self) -> Option<Vec2> {
        match self.state {
            TransitionState::Transitioning(active) => {
                active.carried.map(|carried| carried.camera_offset)
            }
            TransitionState::Idle => None,
        }
    }

    /// Camera-only transition. Returns `false` (and changes nothing) when
    /// rejected.
    pub fn begin_transition(&mut self, target: ScreenCoord) -> bool {
        if let Some(rejection) = self.rejection_for(target) {
            self.log_rejection(target, rejection);
            return false;
        }
        let direction = (
            (target.x - self.current_screen.x).signum(),
            (target.y - self.current_screen.y).signum(),
        );
        self.start(target, direction, None);
        true
    }

    /// Transition that carries `entity` across: the entity is moved to the
    /// entry edge of `target` and then rides with the camera until the
    /// transition completes.
    pub fn begin_transition_carrying<S: EntityPositions + ?Sized>(
        &mut self,
        target: ScreenCoord,
        direction: Direction,
        entity: EntityId,
        store: &mut S,
    ) -> bool {
        if let Some(rejection) = self.rejection_for(target) {
            self.log_rejection(target, rejection);
            return false;
        }

        let target_center = self.grid.screen_center_pixel(target);
        let carried = match store.entity_position(entity) {
            Some(position) => {
                let entry = direction.entry_position(
                    position,
                    self.grid.screen_rect(target),
                    ENTRY_EDGE_MARGIN_PX,
                );
                store.set_entity_position(entity, entry);
                Some(CarriedEntity {
                    id: entity,
                    camera_offset: entry - target_center,
                })
            }
            None => {
                warn!(
                    entity_id = entity.0,
                    "carried_entity_missing_at_transition_start"
                );
                None
            }
        };
        self.start(target, direction.step(), carried);
        true
    }

    fn start(&mut self, target: ScreenCoord, direction: (i32, i32), carried: Option<CarriedEntity>) {
        let from = self.current_screen;
        let target_center = self.grid.screen_center_pixel(target);
        self.current_screen = target;
        self.state = TransitionState::Transitioning(ActiveTransition {
            target: target_center,
            direction,
            carried,
        });
        info!(
            from_x = from.x,
            from_y = from.y,
            to_x = target.x,
            to_y = target.y,
            carried_entity = carried.map(|carried| carried.id.0),
            "screen_transition_started"
        );
    }

    fn rejection_for(&self, target: ScreenCoord) -> Option<Rejection> {
        if self.is_transitioning() {
            return Some(Rejection::AlreadyTransitioning);
        }
        if target == self.current_screen {
            return Some(Rejection::SameScreen);
        }
        if !self.grid.is_valid_screen(target) {
            return Some(Rejection::InvalidTarget);
        }
        None
    }

    fn log_rejection(&self, target: ScreenCoord, rejection: Rejection) {
        debug!(
            to_x = target.x,
            to_y = target.y,
            reason = rejection.as_str(),
            "screen_transition_rejected"
        );
    }

    /// Advances the camera by one tick. A carried entity is kept at
    /// `camera + offset`, including on the final step.
    pub fn update<S: EntityPositions + ?Sized>(
        &mut self,
        fixed_dt_seconds: f32,
        store: &mut S,
    ) -> TransitionStep {
        let TransitionState::Transitioning(mut active) = self.state else {
            return TransitionStep::Idle;
        };

        let delta = active.target - self.camera_position;
        let distance = delta.length();
        let max_step = self.speed * fixed_dt_seconds.max(0.0);

        if distance <= max_step + ARRIVAL_TOLERANCE_PX {
            self.camera_position = active.target;
            if let Some(carried) = active.carried {
                if !store.set_entity_position(carried.id, active.target + carried.camera_offset) {
                    warn!(entity_id = carried.id.0, "carried_entity_missing");
                }
            }
            self.state = TransitionState::Idle;
            info!(
                screen_x = self.current_screen.x,
                screen_y = self.current_screen.y,
                "screen_transition_completed"
            );
            return TransitionStep::Completed;
        }

        self.camera_position = self.camera_position + delta * (max_step / distance);
        if let Some(carried) = active.carried {
            let position = self.camera_position + carried.camera_offset;
            if !store.set_entity_position(carried.id, position) {
                warn!(entity_id = carried.id.0, "carried_entity_missing");
                active.carried = None;
                self.state = TransitionState::Transitioning(active);
            }
        }
        TransitionStep::Advanced
    }

    /// Keeps `entity` inside `screen`, `margin` pixels away from each edge.
    /// Used when the screen the entity is heading into does not exist.
    pub fn boundary_clamp<S: EntityPositions + ?Sized>(
        &self,
        entity: EntityId,
        screen: ScreenCoord,
        margin: f32,
        store: &mut S,
    ) -> Option<Vec2> {
        let position = store.entity_position(entity)?;
        let clamped = self.grid.screen_rect(screen).clamp_inset(position, margin);
        if clamped != position {
            store.set_entity_position(entity, clamped);
            debug!(
                entity_id = entity.0,
                screen_x = screen.x,
                screen_y = screen.y,
                "boundary_clamped"
            );
        }
        Some(clamped)
    }
}
