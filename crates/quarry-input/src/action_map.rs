//! Action mapping: abstract game actions bound to key codes.
//!
//! [`InputMap`] defines which codes trigger which [`Action`]s. [`ActionState`]
//! is recomputed each frame from the current [`KeyboardState`].

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::keyboard::{KeyCode, KeyboardState};

/// Semantic game actions that can be bound to physical inputs.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Action {
    MoveForward,
    MoveBack,
    MoveLeft,
    MoveRight,
    Jump,
    /// Held to mine the selected cube.
    Mine,
    /// Request a transfer of the full token balance.
    Withdraw,
    /// Focus the chat input.
    OpenChat,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::MoveForward,
        Action::MoveBack,
        Action::MoveLeft,
        Action::MoveRight,
        Action::Jump,
        Action::Mine,
        Action::Withdraw,
        Action::OpenChat,
    ];

    /// Config-file name of the action (`"move_forward"`, `"mine"`, ...).
    pub fn name(self) -> &'static str {
        match self {
            Action::MoveForward => "move_forward",
            Action::MoveBack => "move_back",
            Action::MoveLeft => "move_left",
            Action::MoveRight => "move_right",
            Action::Jump => "jump",
            Action::Mine => "mine",
            Action::Withdraw => "withdraw",
            Action::OpenChat => "open_chat",
        }
    }

    pub fn from_name(name: &str) -> Option<Action> {
        Action::ALL.into_iter().find(|a| a.name() == name)
    }
}

/// Action to key-code bindings. An action fires if any of its codes is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputMap {
    pub bindings: HashMap<Action, Vec<KeyCode>>,
}

impl Default for InputMap {
    fn default() -> Self {
        let mut bindings = HashMap::new();
        let mut bind = |action: Action, codes: &[&str]| {
            bindings.insert(action, codes.iter().map(|c| KeyCode::from(*c)).collect());
        };
        bind(Action::MoveForward, &["KeyW", "ArrowUp"]);
        bind(Action::MoveBack, &["KeyS", "ArrowDown"]);
        bind(Action::MoveLeft, &["KeyA", "ArrowLeft"]);
        bind(Action::MoveRight, &["KeyD", "ArrowRight"]);
        bind(Action::Jump, &["Space"]);
        bind(Action::Mine, &["Mouse0"]);
        bind(Action::Withdraw, &["KeyG"]);
        bind(Action::OpenChat, &["KeyT", "Enter"]);
        Self { bindings }
    }
}

impl InputMap {
    /// Default bindings with config overrides applied. Each override replaces
    /// every binding of the named action. Unknown action names are skipped
    /// with a warning.
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut map = Self::default();
        for (name, code) in overrides {
            match Action::from_name(name) {
                Some(action) => {
                    map.bindings.insert(action, vec![KeyCode::new(code.clone())]);
                }
                None => warn!("Ignoring binding for unknown action '{name}'"),
            }
        }
        map
    }

    /// Codes currently bound to `action`.
    pub fn codes(&self, action: Action) -> &[KeyCode] {
        self.bindings.get(&action).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Per-frame resolved action state.
#[derive(Debug, Clone, Default)]
pub struct ActionState {
    held: HashSet<Action>,
    just_pressed: HashSet<Action>,
    just_released: HashSet<Action>,
}

impl ActionState {
    /// Resolve every bound action against the keyboard state.
    pub fn resolve(map: &InputMap, keyboard: &KeyboardState) -> Self {
        let mut state = Self::default();
        for (action, codes) in &map.bindings {
            if codes.iter().any(|c| keyboard.is_pressed(c)) {
                state.held.insert(*action);
            }
            if codes.iter().any(|c| keyboard.just_pressed(c)) {
                state.just_pressed.insert(*action);
            }
            if codes.iter().any(|c| keyboard.just_released(c)) {
                state.just_released.insert(*action);
            }
        }
        state
    }

    pub fn held(&self, action: Action) -> bool {
        self.held.contains(&action)
    }

    pub fn just_pressed(&self, action: Action) -> bool {
        self.just_pressed.contains(&action)
    }

    pub fn just_released(&self, action: Action) -> bool {
        self.just_released.contains(&action)
    }
}
