//! Frame-coherent key and button state tracker.
//!
//! [`KeyboardState`] accumulates key events during a frame and answers three
//! questions for any code: is it held, was it just pressed this frame, and
//! was it just released this frame.
//!
//! Codes follow the browser `KeyboardEvent.code` naming (`"KeyW"`, `"Space"`)
//! so that WASD works regardless of keyboard layout. Mouse buttons use
//! `"Mouse0"`, `"Mouse1"`, ...

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Layout-independent key or button code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyCode(pub String);

impl KeyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Code for the mouse button with the given DOM button index.
    pub fn mouse(button: u8) -> Self {
        Self(format!("Mouse{button}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for KeyCode {
    fn from(code: &str) -> Self {
        Self(code.to_string())
    }
}

/// Tracks per-frame key state.
///
/// 1. Forward every event to [`press`](Self::press) / [`release`](Self::release).
/// 2. Query with [`is_pressed`](Self::is_pressed), [`just_pressed`](Self::just_pressed),
///    [`just_released`](Self::just_released).
/// 3. Call [`clear_transients`](Self::clear_transients) at the end of each frame.
#[derive(Debug, Clone, Default)]
pub struct KeyboardState {
    pressed: HashSet<KeyCode>,
    just_pressed: HashSet<KeyCode>,
    just_released: HashSet<KeyCode>,
}

impl KeyboardState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a key-down. Auto-repeat events for held keys are ignored.
    pub fn press(&mut self, code: KeyCode) {
        if self.pressed.insert(code.clone()) {
            self.just_pressed.insert(code);
        }
    }

    pub fn release(&mut self, code: KeyCode) {
        if self.pressed.remove(&code) {
            self.just_released.insert(code);
        }
    }

    /// Releases every held key, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        let held: Vec<KeyCode> = self.pressed.drain().collect();
        self.just_released.extend(held);
    }

    #[must_use]
    pub fn is_pressed(&self, code: &KeyCode) -> bool {
        self.pressed.contains(code)
    }

    #[must_use]
    pub fn just_pressed(&self, code: &KeyCode) -> bool {
        self.just_pressed.contains(code)
    }

    #[must_use]
    pub fn just_released(&self, code: &KeyCode) -> bool {
        self.just_released.contains(code)
    }

    /// Clears `just_pressed` and `just_released` sets. Call at end of frame.
    pub fn clear_transients(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
    }
}
