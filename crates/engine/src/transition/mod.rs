mod controller;
mod direction;

pub use controller::{
    EntityPositions, ScreenTransitionController, TransitionStep, ENTRY_EDGE_MARGIN_PX,
    TRANSITION_CAMERA_SPEED_PX_PER_SECOND,
};
pub use direction::{Axis, Direction, EntryEdgeRule, ScreenEdge};
