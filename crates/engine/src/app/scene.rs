use std::ops::{Add, AddAssign, Mul, Sub};
use std::sync::Arc;

use tracing::info;

use super::input::{ActionStates, InputAction};
use crate::transition::{Direction, EntityPositions};
use crate::world::{TileAtlas, WorldGrid};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Restart,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    restart_pressed: bool,
    actions: ActionStates,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(quit_requested: bool, restart_pressed: bool, actions: ActionStates) -> Self {
        Self {
            quit_requested,
            restart_pressed,
            actions,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn restart_pressed(&self) -> bool {
        self.restart_pressed
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    /// Held movement keys as an axis vector in screen space (y down).
    pub fn movement_axis(&self) -> Vec2 {
        self.actions.movement_axis()
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_restart_pressed(mut self, restart_pressed: bool) -> Self {
        self.restart_pressed = restart_pressed;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(pub u64);

/// Pixel-space vector; x grows right, y grows down.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn normalized_or_zero(self) -> Vec2 {
        let length = self.length();
        if length <= f32::EPSILON || !length.is_finite() {
            return Vec2::ZERO;
        }
        Vec2 {
            x: self.x / length,
            y: self.y / length,
        }
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2 {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2 {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2 {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

/// `position` is the pixel at the center of the view.
#[derive(Debug, Clone, Copy, Default)]
pub struct Camera2D {
    pub position: Vec2,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Transform {
    pub position: Vec2,
}

#[derive(Debug, Clone)]
pub struct RenderableDesc {
    pub debug_name: &'static str,
    pub color: [u8; 4],
    pub half_size_px: i32,
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub transform: Transform,
    pub renderable: RenderableDesc,
    pub facing: Direction,
}

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

#[derive(Debug, Default)]
pub struct SceneWorld {
    allocator: EntityIdAllocator,
    entities: Vec<Entity>,
    pending_spawns: Vec<Entity>,
    pending_despawns: Vec<EntityId>,
    camera: Camera2D,
    grid: Option<Arc<WorldGrid>>,
    atlas: TileAtlas,
}

impl SceneWorld {
    pub fn spawn(&mut self, transform: Transform, renderable: RenderableDesc) -> EntityId {
        let id = self.allocator.allocate();
        self.pending_spawns.push(Entity {
            id,
            transform,
            renderable,
            facing: Direction::Down,
        });
        id
    }

    pub fn despawn(&mut self, id: EntityId) -> bool {
        let exists_now = self.entities.iter().any(|entity| entity.id == id);
        let pending_spawn = self.pending_spawns.iter().any(|entity| entity.id == id);
        if !exists_now && !pending_spawn {
            return false;
        }
        self.pending_despawns.push(id);
        true
    }

    pub fn apply_pending(&mut self) {
        if !self.pending_despawns.is_empty() {
            let pending = std::mem::take(&mut self.pending_despawns);
            self.entities.retain(|entity| !pending.contains(&entity.id));
            self.pending_spawns
                .retain(|entity| !pending.contains(&entity.id));
        }
        self.entities.append(&mut self.pending_spawns);
    }

    /// Drops entities and camera state; the world map stays attached.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.pending_spawns.clear();
        self.pending_despawns.clear();
        self.camera = Camera2D::default();
    }

    pub fn set_world_map(&mut self, grid: Arc<WorldGrid>, atlas: TileAtlas) {
        self.grid = Some(grid);
        self.atlas = atlas;
    }

    pub fn world_grid(&self) -> Option<&Arc<WorldGrid>> {
        self.grid.as_ref()
    }

    pub fn tile_atlas(&self) -> &TileAtlas {
        &self.atlas
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn find_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities
            .iter()
            .chain(self.pending_spawns.iter())
            .find(|entity| entity.id == id)
    }

    pub fn find_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities
            .iter_mut()
            .chain(self.pending_spawns.iter_mut())
            .find(|entity| entity.id == id)
    }

    pub fn camera(&self) -> &Camera2D {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera2D {
        &mut self.camera
    }
}

impl EntityPositions for SceneWorld {
    fn entity_position(&self, id: EntityId) -> Option<Vec2> {
        self.find_entity(id).map(|entity| entity.transform.position)
    }

    fn set_entity_position(&mut self, id: EntityId, position: Vec2) -> bool {
        match self.find_entity_mut(id) {
            Some(entity) => {
                entity.transform.position = position;
                true
            }
            None => false,
        }
    }
}

pub trait Scene {
    fn load(&mut self, world: &mut SceneWorld);
    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand;
    fn unload(&mut self, world: &mut SceneWorld);
    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        None
    }
}

pub(crate) struct SceneRunner {
    scene: Box<dyn Scene>,
    world: SceneWorld,
    is_loaded: bool,
}

impl SceneRunner {
    pub(crate) fn new(scene: Box<dyn Scene>) -> Self {
        Self {
            scene,
            world: SceneWorld::default(),
            is_loaded: false,
        }
    }

    pub(crate) fn load(&mut self) {
        if self.is_loaded {
            return;
        }
        self.scene.load(&mut self.world);
        self.world.apply_pending();
        self.is_loaded = true;
    }

    pub(crate) fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand {
        let command = self.scene.update(fixed_dt_seconds, input, &mut self.world);
        self.world.apply_pending();
        command
    }

    pub(crate) fn apply_command(&mut self, command: SceneCommand) {
        match command {
            SceneCommand::None => {}
            SceneCommand::Restart => {
                self.restart();
                info!(entity_count = self.world.entity_count(), "scene_restarted");
            }
        }
    }

    fn restart(&mut self) {
        if self.is_loaded {
            self.scene.unload(&mut self.world);
        }
        self.world.clear();
        self.is_loaded = false;
        self.load();
    }

    pub(crate) fn shutdown(&mut self) {
        if self.is_loaded {
            self.scene.unload(&mut self.world);
            self.world.clear();
            self.is_loaded = false;
        }
    }

    pub(crate) fn world(&self) -> &SceneWorld {
        &self.world
    }

    pub(crate) fn debug_title(&self) -> Option<String> {
        self.scene.debug_title(&self.world)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    fn placeholder() -> RenderableDesc {
        RenderableDesc {
            debug_name: "test",
            color: [255, 255, 255, 255],
            half_size_px: 4,
        }
    }

    fn at(x: f32, y: f32) -> Transform {
        Transform {
            position: Vec2 { x, y },
        }
    }

    #[test]
    fn spawned_entities_appear_after_apply_pending() {
        let mut world = SceneWorld::default();
        let id = world.spawn(at(1.0, 2.0), placeholder());
        assert_eq!(world.entity_count(), 0);

        world.apply_pending();
        assert_eq!(world.entity_count(), 1);
        assert_eq!(world.entities()[0].id, id);
    }

    #[test]
    fn despawn_unknown_entity_returns_false() {
        let mut world = SceneWorld::default();
        assert!(!world.despawn(EntityId(42)));
    }

    #[test]
    fn despawn_removes_after_apply_pending() {
        let mut world = SceneWorld::default();
        let id = world.spawn(at(0.0, 0.0), placeholder());
        world.apply_pending();

        assert!(world.despawn(id));
        assert_eq!(world.entity_count(), 1);
        world.apply_pending();
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn entity_positions_reach_pending_and_applied_entities() {
        let mut world = SceneWorld::default();
        let applied = world.spawn(at(1.0, 1.0), placeholder());
        world.apply_pending();
        let pending = world.spawn(at(2.0, 2.0), placeholder());

        assert!(world.set_entity_position(applied, Vec2 { x: 5.0, y: 6.0 }));
        assert!(world.set_entity_position(pending, Vec2 { x: 7.0, y: 8.0 }));
        assert_eq!(world.entity_position(applied), Some(Vec2 { x: 5.0, y: 6.0 }));
        assert_eq!(world.entity_position(pending), Some(Vec2 { x: 7.0, y: 8.0 }));
        assert!(!world.set_entity_position(EntityId(99), Vec2::ZERO));
        assert_eq!(world.entity_position(EntityId(99)), None);
    }

    #[test]
    fn clear_keeps_world_map() {
        let mut world = SceneWorld::default();
        world.set_world_map(Arc::new(WorldGrid::empty()), TileAtlas::default());
        world.spawn(at(0.0, 0.0), placeholder());
        world.apply_pending();

        world.clear();
        assert_eq!(world.entity_count(), 0);
        assert!(world.world_grid().is_some());
    }

    #[test]
    fn vec2_normalized_or_zero_handles_zero_length() {
        assert_eq!(Vec2::ZERO.normalized_or_zero(), Vec2::ZERO);
        let unit = Vec2 { x: 3.0, y: 4.0 }.normalized_or_zero();
        assert!((unit.length() - 1.0).abs() < 0.0001);
    }

    struct CountingScene {
        loads: Rc<Cell<u32>>,
        unloads: Rc<Cell<u32>>,
    }

    impl Scene for CountingScene {
        fn load(&mut self, world: &mut SceneWorld) {
            self.loads.set(self.loads.get() + 1);
            world.spawn(Transform::default(), placeholder());
        }

        fn update(
            &mut self,
            _fixed_dt_seconds: f32,
            input: &InputSnapshot,
            _world: &mut SceneWorld,
        ) -> SceneCommand {
            if input.restart_pressed() {
                SceneCommand::Restart
            } else {
                SceneCommand::None
            }
        }

        fn unload(&mut self, _world: &mut SceneWorld) {
            self.unloads.set(self.unloads.get() + 1);
        }
    }

    #[test]
    fn restart_reloads_scene_into_fresh_world() {
        let loads = Rc::new(Cell::new(0));
        let unloads = Rc::new(Cell::new(0));
        let mut runner = SceneRunner::new(Box::new(CountingScene {
            loads: Rc::clone(&loads),
            unloads: Rc::clone(&unloads),
        }));
        runner.load();
        runner.load();
        assert_eq!(loads.get(), 1);
        assert_eq!(runner.world().entity_count(), 1);

        let command = runner.update(1.0 / 60.0, &InputSnapshot::empty().with_restart_pressed(true));
        assert_eq!(command, SceneCommand::Restart);
        runner.apply_command(command);

        assert_eq!(loads.get(), 2);
        assert_eq!(unloads.get(), 1);
        assert_eq!(runner.world().entity_count(), 1);

        runner.shutdown();
        assert_eq!(unloads.get(), 2);
        assert_eq!(runner.world().entity_count(), 0);
    }
}
