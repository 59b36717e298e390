use super::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Restart,
    Quit,
}

const ACTION_COUNT: usize = 6;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    /// Raw held-direction axis; opposite keys cancel. Not normalized.
    pub(crate) fn movement_axis(&self) -> Vec2 {
        let axis = |negative: InputAction, positive: InputAction| {
            match (self.is_down(negative), self.is_down(positive)) {
                (true, false) => -1.0,
                (false, true) => 1.0,
                _ => 0.0,
            }
        };
        Vec2 {
            x: axis(InputAction::MoveLeft, InputAction::MoveRight),
            y: axis(InputAction::MoveUp, InputAction::MoveDown),
        }
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveUp => 0,
            InputAction::MoveDown => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::Restart => 4,
            InputAction::Quit => 5,
        }
    }
}
