use serde::{Deserialize, Serialize};

/// Rumble motor intensities, 0 (off) to 255 (full)
///
/// The left motor is the heavy one, the right one the light one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Rumble {
    left: u8,
    right: u8,
}

impl Rumble {
    pub const fn new(left: u8, right: u8) -> Self {
        Self { left, right }
    }

    /// Left motor at full power
    pub const fn left_only() -> Self {
        Self::new(255, 0)
    }

    /// Right motor at full power
    pub const fn right_only() -> Self {
        Self::new(0, 255)
    }

    pub const fn both() -> Self {
        Self::new(255, 255)
    }

    pub const fn off() -> Self {
        Self::new(0, 0)
    }

    /// Preset lookup used by config: `off`, `left`, `right`, `both`
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "off" | "none" => Some(Self::off()),
            "left" => Some(Self::left_only()),
            "right" => Some(Self::right_only()),
            "both" => Some(Self::both()),
            _ => None,
        }
    }

    pub fn left(&self) -> u8 {
        self.left
    }

    pub fn right(&self) -> u8 {
        self.right
    }
}
