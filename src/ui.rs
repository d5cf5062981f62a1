// On-screen toggle button

use crate::lamp::LampState;

/// Pixel rectangle, origin at the top-left of the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

/// The lamp button. Inert until a lamp controller has been wired to it.
#[derive(Debug, Clone)]
pub struct ToggleButton {
    label: &'static str,
    enabled: bool,
    rect: Rect,
}

impl ToggleButton {
    pub fn new() -> Self {
        Self {
            label: LampState::Off.label(),
            enabled: false,
            rect: Rect {
                x: 16.0,
                y: 16.0,
                width: 72.0,
                height: 32.0,
            },
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn set_label(&mut self, label: &'static str) {
        self.label = label;
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// True when an enabled button is under the pointer.
    pub fn hit(&self, x: f32, y: f32) -> bool {
        self.enabled && self.rect.contains(x, y)
    }

    /// Flat fill color used by the renderer.
    pub fn color(&self) -> [f32; 4] {
        match (self.enabled, self.label == LampState::On.label()) {
            (false, _) => [0.35, 0.35, 0.35, 1.0],
            (true, false) => [0.12, 0.12, 0.16, 1.0],
            (true, true) => [0.95, 0.78, 0.35, 1.0],
        }
    }
}

impl Default for ToggleButton {
    fn default() -> Self {
        Self::new()
    }
}
