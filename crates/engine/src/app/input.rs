use super::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

pub(crate) const BUTTON_COUNT: usize = 3;

impl MouseButton {
    pub const ALL: [MouseButton; BUTTON_COUNT] =
        [MouseButton::Left, MouseButton::Middle, MouseButton::Right];

    pub(crate) const fn index(self) -> usize {
        match self {
            MouseButton::Left => 0,
            MouseButton::Middle => 1,
            MouseButton::Right => 2,
        }
    }
}

/// Pointer position (frame-buffer pixels) and button levels at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerState {
    position: Vec2,
    buttons: [bool; BUTTON_COUNT],
}

impl PointerState {
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn with_button_down(mut self, button: MouseButton, is_down: bool) -> Self {
        self.set_button(button, is_down);
        self
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn is_down(&self, button: MouseButton) -> bool {
        self.buttons[button.index()]
    }

    pub(crate) fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub(crate) fn set_button(&mut self, button: MouseButton, is_down: bool) {
        self.buttons[button.index()] = is_down;
    }
}

/// Two generations of pointer state, advanced once per tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputSampler {
    current: PointerState,
    previous: PointerState,
}

impl InputSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample(&mut self, fresh: PointerState) {
        self.previous = self.current;
        self.current = fresh;
    }

    pub fn current(&self) -> &PointerState {
        &self.current
    }

    pub fn previous(&self) -> &PointerState {
        &self.previous
    }

    pub fn position(&self) -> Vec2 {
        self.current.position
    }

    pub fn pressed_edge(&self, button: MouseButton) -> bool {
        !self.previous.is_down(button) && self.current.is_down(button)
    }

    pub fn released_edge(&self, button: MouseButton) -> bool {
        self.previous.is_down(button) && !self.current.is_down(button)
    }
}
