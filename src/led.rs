//! Light bar color and flash timing

use serde::{Deserialize, Serialize};

/// Light bar setting
///
/// Flash durations are in controller units (roughly 10ms each); both zero
/// means a steady light.
///
/// # Examples
///
/// ```rust
/// use dualshock::Led;
///
/// let led = Led::cyan().with_flash(50, 50);
/// assert_eq!((led.red(), led.green(), led.blue()), (0, 255, 255));
/// assert_eq!(Led::preset("navy"), Some(Led::rgb(0, 0, 128)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Led {
    red: u8,
    green: u8,
    blue: u8,
    flash_on: u8,
    flash_off: u8,
}

// Named presets, resolvable from config
const PRESETS: [(&str, Led); 16] = [
    ("none", Led::none()),
    ("white", Led::white()),
    ("red", Led::red_light()),
    ("green", Led::green_light()),
    ("blue", Led::blue_light()),
    ("lime", Led::lime()),
    ("yellow", Led::yellow()),
    ("cyan", Led::cyan()),
    ("magenta", Led::magenta()),
    ("silver", Led::silver()),
    ("gray", Led::gray()),
    ("maroon", Led::maroon()),
    ("olive", Led::olive()),
    ("purple", Led::purple()),
    ("teal", Led::teal()),
    ("navy", Led::navy()),
];

impl Led {
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red,
            green,
            blue,
            flash_on: 0,
            flash_off: 0,
        }
    }

    pub const fn with_flash(mut self, on: u8, off: u8) -> Self {
        self.flash_on = on;
        self.flash_off = off;
        self
    }

    /// Case-insensitive lookup of a named preset
    pub fn preset(name: &str) -> Option<Self> {
        PRESETS
            .iter()
            .find(|(preset, _)| preset.eq_ignore_ascii_case(name))
            .map(|&(_, led)| led)
    }

    pub fn preset_names() -> impl Iterator<Item = &'static str> {
        PRESETS.iter().map(|&(name, _)| name)
    }

    pub fn red(&self) -> u8 {
        self.red
    }

    pub fn green(&self) -> u8 {
        self.green
    }

    pub fn blue(&self) -> u8 {
        self.blue
    }

    pub fn flash_on(&self) -> u8 {
        self.flash_on
    }

    pub fn flash_off(&self) -> u8 {
        self.flash_off
    }

    pub const fn none() -> Self {
        Self::rgb(0, 0, 0)
    }

    pub const fn white() -> Self {
        Self::rgb(255, 255, 255)
    }

    pub const fn red_light() -> Self {
        Self::rgb(255, 0, 0)
    }

    /// Half intensity, like the HTML color
    pub const fn green_light() -> Self {
        Self::rgb(0, 128, 0)
    }

    pub const fn blue_light() -> Self {
        Self::rgb(0, 0, 255)
    }

    pub const fn lime() -> Self {
        Self::rgb(0, 255, 0)
    }

    pub const fn yellow() -> Self {
        Self::rgb(255, 255, 0)
    }

    pub const fn cyan() -> Self {
        Self::rgb(0, 255, 255)
    }

    pub const fn magenta() -> Self {
        Self::rgb(255, 0, 255)
    }

    pub const fn silver() -> Self {
        Self::rgb(192, 192, 192)
    }

    pub const fn gray() -> Self {
        Self::rgb(128, 128, 128)
    }

    pub const fn maroon() -> Self {
        Self::rgb(128, 0, 0)
    }

    pub const fn olive() -> Self {
        Self::rgb(128, 128, 0)
    }

    pub const fn purple() -> Self {
        Self::rgb(128, 0, 128)
    }

    pub const fn teal() -> Self {
        Self::rgb(0, 128, 128)
    }

    pub const fn navy() -> Self {
        Self::rgb(0, 0, 128)
    }
}
