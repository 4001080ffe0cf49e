//! Platform-agnostic input handling
use crate::model::Facing;

/// Platform-independent input events
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    // Keyboard events, carrying `KeyboardEvent.key` names
    KeyDown(String),
    KeyUp(String),

    // Window events
    FocusLost,
    VisibilityChanged { visible: bool },
    Resized { width: u32, height: u32 },
}

/// The only keys the viewer reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrowKey {
    Left,
    Right,
    Up,
    Down,
}

impl ArrowKey {
    pub fn from_key_name(key: &str) -> Option<Self> {
        match key {
            "ArrowLeft" => Some(ArrowKey::Left),
            "ArrowRight" => Some(ArrowKey::Right),
            "ArrowUp" => Some(ArrowKey::Up),
            "ArrowDown" => Some(ArrowKey::Down),
            _ => None,
        }
    }

    pub fn key_name(&self) -> &'static str {
        match self {
            ArrowKey::Left => "ArrowLeft",
            ArrowKey::Right => "ArrowRight",
            ArrowKey::Up => "ArrowUp",
            ArrowKey::Down => "ArrowDown",
        }
    }

    pub fn direction(&self) -> Option<Direction> {
        match self {
            ArrowKey::Left => Some(Direction::Left),
            ArrowKey::Right => Some(Direction::Right),
            ArrowKey::Up | ArrowKey::Down => None,
        }
    }
}

/// Horizontal movement direction of a held key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub fn facing(&self) -> Facing {
        match self {
            Direction::Left => Facing::Left,
            Direction::Right => Facing::Right,
        }
    }

    /// Sign applied to the x coordinate when moving
    pub fn sign(&self) -> f32 {
        match self {
            Direction::Left => -1.0,
            Direction::Right => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KeyState {
    pub pressed: bool,
    /// Milliseconds timestamp of the press edge
    pub press_started_at: f64,
    // Monotonic press counter; orders simultaneous presses
    press_order: u64,
}

/// Held state of the left and right keys.
///
/// When both are held the most recently pressed one is active.
#[derive(Debug, Clone, Default)]
pub struct DirectionalKeys {
    left: KeyState,
    right: KeyState,
    presses: u64,
}

impl DirectionalKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, dir: Direction) -> &KeyState {
        match dir {
            Direction::Left => &self.left,
            Direction::Right => &self.right,
        }
    }

    fn state_mut(&mut self, dir: Direction) -> &mut KeyState {
        match dir {
            Direction::Left => &mut self.left,
            Direction::Right => &mut self.right,
        }
    }

    /// Register a key-down. Returns false for repeats of a held key, which
    /// leave the press timestamp untouched.
    pub fn press(&mut self, dir: Direction, now_ms: f64) -> bool {
        if self.state(dir).pressed {
            return false;
        }
        self.presses += 1;
        let order = self.presses;
        let state = self.state_mut(dir);
        state.pressed = true;
        state.press_started_at = now_ms;
        state.press_order = order;
        true
    }

    /// Register a key-up. Returns whether the key was held.
    pub fn release(&mut self, dir: Direction) -> bool {
        let state = self.state_mut(dir);
        let was_pressed = state.pressed;
        state.pressed = false;
        was_pressed
    }

    pub fn is_pressed(&self, dir: Direction) -> bool {
        self.state(dir).pressed
    }

    pub fn any_pressed(&self) -> bool {
        self.left.pressed || self.right.pressed
    }

    /// The held key that drives movement and facing
    pub fn active(&self) -> Option<Direction> {
        match (self.left.pressed, self.right.pressed) {
            (true, true) if self.left.press_order > self.right.press_order => Some(Direction::Left),
            (true, true) => Some(Direction::Right),
            (true, false) => Some(Direction::Left),
            (false, true) => Some(Direction::Right),
            (false, false) => None,
        }
    }

    /// How long `dir` has been held, if it is held
    pub fn held_for(&self, dir: Direction, now_ms: f64) -> Option<f64> {
        let state = self.state(dir);
        state.pressed.then(|| now_ms - state.press_started_at)
    }

    /// Release everything, returning the keys that were held
    pub fn clear(&mut self) -> Vec<Direction> {
        let held: Vec<Direction> = [Direction::Left, Direction::Right]
            .into_iter()
            .filter(|d| self.is_pressed(*d))
            .collect();
        self.left = KeyState::default();
        self.right = KeyState::default();
        held
    }
}

pub mod wasm {
    use super::*;
    use web_sys::KeyboardEvent;

    pub fn keyboard_event_to_input(e: &KeyboardEvent, is_down: bool) -> InputEvent {
        let key = e.key();
        if is_down {
            InputEvent::KeyDown(key)
        } else {
            InputEvent::KeyUp(key)
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub mod native {
    use super::*;
    use winit::keyboard::KeyCode;

    /// Map a physical key to the DOM key name the controller understands
    pub fn key_name(code: KeyCode) -> Option<&'static str> {
        let key = match code {
            KeyCode::ArrowLeft => ArrowKey::Left,
            KeyCode::ArrowRight => ArrowKey::Right,
            KeyCode::ArrowUp => ArrowKey::Up,
            KeyCode::ArrowDown => ArrowKey::Down,
            _ => return None,
        };
        Some(key.key_name())
    }

    pub fn keyboard_input(code: KeyCode, is_down: bool) -> Option<InputEvent> {
        let key = key_name(code)?.to_string();
        Some(if is_down { InputEvent::KeyDown(key) } else { InputEvent::KeyUp(key) })
    }
}
