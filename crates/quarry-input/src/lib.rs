//! Input abstraction: browser key codes mapped through configurable action bindings.

pub mod action_map;
pub mod keyboard;

pub use action_map::{Action, ActionState, InputMap};
pub use keyboard::{KeyCode, KeyboardState};
