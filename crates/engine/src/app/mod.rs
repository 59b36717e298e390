mod input;
mod loop_runner;
mod metrics;
mod rendering;
mod scene;

pub use input::InputAction;
pub use loop_runner::{run_app, AppError, LoopConfig, SLOW_FRAME_ENV_VAR};
pub use metrics::LoopMetricsSnapshot;
pub use rendering::{
    screen_to_world_px, world_to_screen_px, Renderer, Viewport, PLACEHOLDER_HALF_SIZE_PX,
};
pub use scene::{
    Camera2D, Entity, EntityId, EntityIdAllocator, InputSnapshot, RenderableDesc, Scene,
    SceneCommand, SceneWorld, Transform, Vec2,
};
