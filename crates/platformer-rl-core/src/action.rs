//! Action types sent by the external agent

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::error::{BridgeError, Result};

/// Vertical stick intent
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VerticalIntent {
    #[default]
    Noop,
    Up,
    Down,
}

/// Horizontal stick intent
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum HorizontalIntent {
    #[default]
    Noop,
    Left,
    Right,
}

/// Special-move button intent
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpecialMove {
    #[default]
    None,
    Jump,
    LongJump,
    Dash,
}

/// Grab button intent
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GrabIntent {
    #[default]
    None,
    Grab,
}

/// Menu navigation intent
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MenuIntent {
    Confirm,
    Down,
    Pause,
}

/// A single discretized action. Immutable once constructed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// In-game movement
    Move {
        vertical: VerticalIntent,
        horizontal: HorizontalIntent,
        special: SpecialMove,
        grab: GrabIntent,
    },
    /// Menu navigation
    Menu { intent: MenuIntent },
    /// Explicit no-op
    Wait,
}

impl Default for Action {
    fn default() -> Self {
        Action::Wait
    }
}

impl Action {
    /// Horizontal input axis value (left = -1, right = 1)
    pub fn move_x(&self) -> f32 {
        match self {
            Action::Move { horizontal, .. } => match horizontal {
                HorizontalIntent::Noop => 0.0,
                HorizontalIntent::Left => -1.0,
                HorizontalIntent::Right => 1.0,
            },
            _ => 0.0,
        }
    }

    /// Vertical input axis value (up = -1, down = 1)
    pub fn move_y(&self) -> f32 {
        match self {
            Action::Move { vertical, .. } => match vertical {
                VerticalIntent::Noop => 0.0,
                VerticalIntent::Up => -1.0,
                VerticalIntent::Down => 1.0,
            },
            _ => 0.0,
        }
    }

    pub fn jump(&self) -> bool {
        matches!(
            self,
            Action::Move {
                special: SpecialMove::Jump,
                ..
            }
        )
    }

    pub fn long_jump(&self) -> bool {
        matches!(
            self,
            Action::Move {
                special: SpecialMove::LongJump,
                ..
            }
        )
    }

    pub fn dash(&self) -> bool {
        matches!(
            self,
            Action::Move {
                special: SpecialMove::Dash,
                ..
            }
        )
    }

    pub fn grab(&self) -> bool {
        matches!(
            self,
            Action::Move {
                grab: GrabIntent::Grab,
                ..
            }
        )
    }

    pub fn menu_intent(&self) -> Option<MenuIntent> {
        match self {
            Action::Menu { intent } => Some(*intent),
            _ => None,
        }
    }

    fn move_only(
        vertical: VerticalIntent,
        horizontal: HorizontalIntent,
        special: SpecialMove,
        grab: GrabIntent,
    ) -> Action {
        Action::Move {
            vertical,
            horizontal,
            special,
            grab,
        }
    }
}

/// Interleave frames to give each scripted press time to register.
const SEQUENCE_PAD_FRAMES: usize = 9;

/// A scripted queue of actions, expanded from a comma-separated list such as
/// `"Wait,MenuConfirm,Wait"`. Each named action is followed by padding
/// no-ops so the host input layer sees distinct presses.
#[derive(Debug, Default)]
pub struct ActionSequence {
    queue: VecDeque<Action>,
}

impl ActionSequence {
    pub fn new() -> ActionSequence {
        ActionSequence::default()
    }

    pub fn parse(script: &str) -> Result<ActionSequence> {
        let mut queue = VecDeque::new();
        for name in script.split(',') {
            queue.push_back(Self::named(name.trim())?);
            for _ in 0..SEQUENCE_PAD_FRAMES {
                queue.push_back(Action::Wait);
            }
        }
        Ok(ActionSequence { queue })
    }

    pub fn has_next(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn next_action(&mut self) -> Option<Action> {
        self.queue.pop_front()
    }

    fn named(name: &str) -> Result<Action> {
        let action = match name {
            "Up" => Action::move_only(
                VerticalIntent::Up,
                HorizontalIntent::Noop,
                SpecialMove::None,
                GrabIntent::None,
            ),
            "Down" => Action::move_only(
                VerticalIntent::Down,
                HorizontalIntent::Noop,
                SpecialMove::None,
                GrabIntent::None,
            ),
            "Left" => Action::move_only(
                VerticalIntent::Noop,
                HorizontalIntent::Left,
                SpecialMove::None,
                GrabIntent::None,
            ),
            "Right" => Action::move_only(
                VerticalIntent::Noop,
                HorizontalIntent::Right,
                SpecialMove::None,
                GrabIntent::None,
            ),
            "Jump" => Action::move_only(
                VerticalIntent::Noop,
                HorizontalIntent::Noop,
                SpecialMove::Jump,
                GrabIntent::None,
            ),
            "LongJump" => Action::move_only(
                VerticalIntent::Noop,
                HorizontalIntent::Noop,
                SpecialMove::LongJump,
                GrabIntent::None,
            ),
            "Dash" => Action::move_only(
                VerticalIntent::Noop,
                HorizontalIntent::Noop,
                SpecialMove::Dash,
                GrabIntent::None,
            ),
            "Grab" => Action::move_only(
                VerticalIntent::Noop,
                HorizontalIntent::Noop,
                SpecialMove::None,
                GrabIntent::Grab,
            ),
            "MenuConfirm" => Action::Menu {
                intent: MenuIntent::Confirm,
            },
            "MenuDown" => Action::Menu {
                intent: MenuIntent::Down,
            },
            "Pause" => Action::Menu {
                intent: MenuIntent::Pause,
            },
            "Wait" => Action::Wait,
            other => return Err(BridgeError::Parse(format!("unknown action name: {other}"))),
        };
        Ok(action)
    }
}
