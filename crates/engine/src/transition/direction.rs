use crate::app::Vec2;
use crate::world::ScreenRect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenEdge {
    Left,
    Right,
    Top,
    Bottom,
}

/// Where an entity entering a screen through one edge is placed: on `edge`
/// of the new screen, moved `inset_sign * margin` along `axis`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryEdgeRule {
    pub axis: Axis,
    pub edge: ScreenEdge,
    pub inset_sign: f32,
}

const DIRECTION_COUNT: usize = 4;

// Indexed by `Direction::index`. Screen space has y growing downward.
const DIRECTION_STEPS: [(i32, i32); DIRECTION_COUNT] = [(0, -1), (0, 1), (-1, 0), (1, 0)];

const ENTRY_EDGE_RULES: [EntryEdgeRule; DIRECTION_COUNT] = [
    EntryEdgeRule {
        axis: Axis::Y,
        edge: ScreenEdge::Bottom,
        inset_sign: -1.0,
    },
    EntryEdgeRule {
        axis: Axis::Y,
        edge: ScreenEdge::Top,
        inset_sign: 1.0,
    },
    EntryEdgeRule {
        axis: Axis::X,
        edge: ScreenEdge::Right,
        inset_sign: -1.0,
    },
    EntryEdgeRule {
        axis: Axis::X,
        edge: ScreenEdge::Left,
        inset_sign: 1.0,
    },
];

impl Direction {
    pub const ALL: [Direction; DIRECTION_COUNT] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    const fn index(self) -> usize {
        match self {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }

    pub fn step(self) -> (i32, i32) {
        DIRECTION_STEPS[self.index()]
    }

    pub fn entry_edge(self) -> EntryEdgeRule {
        ENTRY_EDGE_RULES[self.index()]
    }

    /// Only single-axis steps name a direction; diagonals and zero do not.
    pub fn from_screen_step(dx: i32, dy: i32) -> Option<Self> {
        let step = (dx.signum(), dy.signum());
        Self::ALL
            .into_iter()
            .find(|direction| direction.step() == step)
    }

    /// Dominant axis of a movement vector; horizontal wins ties.
    pub fn from_movement(x: f32, y: f32) -> Option<Self> {
        if x == 0.0 && y == 0.0 {
            return None;
        }
        if x.abs() >= y.abs() {
            Some(if x > 0.0 { Direction::Right } else { Direction::Left })
        } else {
            Some(if y > 0.0 { Direction::Down } else { Direction::Up })
        }
    }

    pub fn entry_position(self, position: Vec2, new_screen: ScreenRect, margin: f32) -> Vec2 {
        self.entry_edge().apply(position, new_screen, margin)
    }
}

impl EntryEdgeRule {
    pub fn apply(&self, position: Vec2, rect: ScreenRect, margin: f32) -> Vec2 {
        let edge_value = match self.edge {
            ScreenEdge::Left => rect.left,
            ScreenEdge::Right => rect.right,
            ScreenEdge::Top => rect.top,
            ScreenEdge::Bottom => rect.bottom,
        };
        let placed = edge_value + self.inset_sign * margin;
        match self.axis {
            Axis::X => Vec2 {
                x: placed,
                y: position.y,
            },
            Axis::Y => Vec2 {
                x: position.x,
                y: placed,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect() -> ScreenRect {
        ScreenRect {
            left: 2048.0,
            top: 1232.0,
            right: 2304.0,
            bottom: 1408.0,
        }
    }

    #[test]
    fn steps_match_screen_axes() {
        assert_eq!(Direction::Up.step(), (0, -1));
        assert_eq!(Direction::Down.step(), (0, 1));
        assert_eq!(Direction::Left.step(), (-1, 0));
        assert_eq!(Direction::Right.step(), (1, 0));
    }

    #[test]
    fn screen_step_round_trips_for_every_direction() {
        for direction in Direction::ALL {
            let (dx, dy) = direction.step();
            assert_eq!(Direction::from_screen_step(dx, dy), Some(direction));
        }
        assert_eq!(Direction::from_screen_step(3, 0), Some(Direction::Right));
        assert_eq!(Direction::from_screen_step(1, 1), None);
        assert_eq!(Direction::from_screen_step(0, 0), None);
    }

    #[test]
    fn entry_positions_only_move_the_crossing_axis() {
        let from = Vec2 { x: 2050.0, y: 1300.0 };
        assert_eq!(
            Direction::Right.entry_position(from, rect(), 16.0),
            Vec2 { x: 2064.0, y: 1300.0 }
        );
        assert_eq!(
            Direction::Left.entry_position(from, rect(), 16.0),
            Vec2 { x: 2288.0, y: 1300.0 }
        );
        assert_eq!(
            Direction::Down.entry_position(from, rect(), 16.0),
            Vec2 { x: 2050.0, y: 1248.0 }
        );
        assert_eq!(
            Direction::Up.entry_position(from, rect(), 16.0),
            Vec2 { x: 2050.0, y: 1392.0 }
        );
    }

    #[test]
    fn movement_prefers_horizontal_on_ties() {
        assert_eq!(Direction::from_movement(1.0, 1.0), Some(Direction::Right));
        assert_eq!(Direction::from_movement(-1.0, 1.0), Some(Direction::Left));
        assert_eq!(Direction::from_movement(0.0, -2.0), Some(Direction::Up));
        assert_eq!(Direction::from_movement(0.0, 0.0), None);
    }
}
