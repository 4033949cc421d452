//! Input report decoding
//!
//! Turns one raw DualShock 4 input report into an immutable [`Snapshot`].
//! Every field position is relative to the session's input offset, which is
//! `0` over USB and `2` over Bluetooth (see [`super::connection`]).
//!
//! ```text
//! byte  0       report id
//! bytes 1-4     left stick x/y, right stick x/y
//! byte  5       face buttons (high nibble) + d-pad (low nibble)
//! byte  6       L1 R1 L2 R2 share options L3 R3
//! byte  7       PS, touchpad click
//! bytes 8-9     L2 / R2 analog
//! bytes 13-18   accelerometer x/y/z (i16 LE)
//! bytes 19-24   gyroscope roll/yaw/pitch (i16 LE)
//! byte  30      battery level (low nibble) + cable flag (bit 4)
//! bytes 35-42   two touch points, 4 bytes each
//! ```

use serde::{Deserialize, Serialize};

/// Size of the buffer handed to the transport for every input read
pub const INPUT_REPORT_SIZE: usize = 64;

/// Minimum per-axis delta before a new stick position replaces the stored one
pub const STICK_SMOOTHING: u8 = 4;

const STICK_CENTER: u8 = 128;
const DPAD_NEUTRAL: u8 = 8;
const TOUCH_POINTS: usize = 2;
const TOUCH_STRIDE: usize = 4;

// Byte positions relative to the input offset
const LEFT_STICK_X: usize = 1;
const LEFT_STICK_Y: usize = 2;
const RIGHT_STICK_X: usize = 3;
const RIGHT_STICK_Y: usize = 4;
const FACE_BUTTONS: usize = 5;
const SHOULDER_BUTTONS: usize = 6;
const SYSTEM_BUTTONS: usize = 7;
const L2_ANALOG: usize = 8;
const R2_ANALOG: usize = 9;
const ACCELEROMETER: usize = 13;
const GYROSCOPE: usize = 19;
const BATTERY: usize = 30;
const TOUCH: usize = 35;

// Bit masks
const SQUARE: u8 = 0x10;
const CROSS: u8 = 0x20;
const CIRCLE: u8 = 0x40;
const TRIANGLE: u8 = 0x80;
const L1: u8 = 0x01;
const R1: u8 = 0x02;
const L2_DIGITAL: u8 = 0x04;
const R2_DIGITAL: u8 = 0x08;
const SHARE: u8 = 0x10;
const OPTIONS: u8 = 0x20;
const L3: u8 = 0x40;
const R3: u8 = 0x80;
const PS: u8 = 0x01;
const TOUCHPAD_CLICK: u8 = 0x02;

/// Analog stick position, both axes 0-255 with 128 at rest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stick {
    pub x: u8,
    pub y: u8,
}

impl Default for Stick {
    fn default() -> Self {
        Self {
            x: STICK_CENTER,
            y: STICK_CENTER,
        }
    }
}

/// Single finger on the touch surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Touch {
    pub is_active: bool,
    /// 12-bit horizontal coordinate
    pub x: u16,
    /// 12-bit vertical coordinate
    pub y: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Touchpad {
    /// Touch surface clicked down
    pub press: bool,
    /// Up to two tracked touch points, in report order
    pub swipe: Vec<Touch>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Accelerometer {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Gyroscope {
    pub roll: i16,
    pub yaw: i16,
    pub pitch: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Battery {
    /// Normalized charge, 0-100
    pub capacity: u8,
    pub is_charging: bool,
    pub is_cable_connected: bool,
}

/// One fully decoded controller state
///
/// Built once per read cycle and never mutated afterwards. The session keeps
/// the previous snapshot around for stick smoothing and change detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub cross: bool,
    pub circle: bool,
    pub square: bool,
    pub triangle: bool,
    pub l1: bool,
    /// L2 pressure, forced to 0 while the digital L2 bit is clear
    pub l2: u8,
    pub l3: bool,
    pub r1: bool,
    /// R2 pressure, forced to 0 while the digital R2 bit is clear
    pub r2: u8,
    pub r3: bool,
    pub dpad_up: bool,
    pub dpad_down: bool,
    pub dpad_left: bool,
    pub dpad_right: bool,
    pub share: bool,
    pub options: bool,
    pub ps: bool,
    pub left_stick: Stick,
    pub right_stick: Stick,
    pub touchpad: Touchpad,
    pub accelerometer: Accelerometer,
    pub gyroscope: Gyroscope,
    pub battery: Battery,
}

impl Snapshot {
    /// Decodes `report` using the default stick smoothing threshold.
    ///
    /// # Panics
    ///
    /// Panics if `report` is shorter than `offset + 43` bytes. Callers read into
    /// a buffer of [`INPUT_REPORT_SIZE`] bytes, which always satisfies this.
    pub fn decode(report: &[u8], offset: usize, previous: Option<&Snapshot>) -> Self {
        Self::decode_smoothed(report, offset, previous, STICK_SMOOTHING)
    }

    /// Decodes `report` with an explicit stick smoothing threshold.
    pub fn decode_smoothed(
        report: &[u8],
        offset: usize,
        previous: Option<&Snapshot>,
        smoothing: u8,
    ) -> Self {
        let field = |position: usize| report[position + offset];

        let face = field(FACE_BUTTONS);
        let shoulder = field(SHOULDER_BUTTONS);
        let system = field(SYSTEM_BUTTONS);
        let dpad = face & 0x0F;

        let left_raw = Stick {
            x: field(LEFT_STICK_X),
            y: field(LEFT_STICK_Y),
        };
        let right_raw = Stick {
            x: field(RIGHT_STICK_X),
            y: field(RIGHT_STICK_Y),
        };

        Self {
            cross: face & CROSS != 0,
            circle: face & CIRCLE != 0,
            square: face & SQUARE != 0,
            triangle: face & TRIANGLE != 0,
            l1: shoulder & L1 != 0,
            l2: trigger_pressure(shoulder, L2_DIGITAL, field(L2_ANALOG)),
            l3: shoulder & L3 != 0,
            r1: shoulder & R1 != 0,
            r2: trigger_pressure(shoulder, R2_DIGITAL, field(R2_ANALOG)),
            r3: shoulder & R3 != 0,
            dpad_up: matches!(dpad, 0 | 1 | 7),
            dpad_down: matches!(dpad, 3..=5),
            dpad_left: matches!(dpad, 5..=7),
            dpad_right: matches!(dpad, 1..=3),
            share: shoulder & SHARE != 0,
            options: shoulder & OPTIONS != 0,
            ps: system & PS != 0,
            left_stick: smooth_stick(left_raw, previous.map(|p| p.left_stick), smoothing),
            right_stick: smooth_stick(right_raw, previous.map(|p| p.right_stick), smoothing),
            touchpad: decode_touchpad(&report[offset..], system & TOUCHPAD_CLICK != 0),
            accelerometer: Accelerometer {
                x: read_i16_le(report, ACCELEROMETER + offset),
                y: read_i16_le(report, ACCELEROMETER + 2 + offset).wrapping_neg(),
                z: read_i16_le(report, ACCELEROMETER + 4 + offset).wrapping_neg(),
            },
            gyroscope: Gyroscope {
                roll: read_i16_le(report, GYROSCOPE + offset).wrapping_neg(),
                yaw: read_i16_le(report, GYROSCOPE + 2 + offset),
                pitch: read_i16_le(report, GYROSCOPE + 4 + offset),
            },
            battery: decode_battery(field(BATTERY)),
        }
    }

    /// State assumed before the first report of a session arrives.
    ///
    /// Sticks centered, triggers released, d-pad neutral, touch points lifted,
    /// sensors and battery zeroed.
    pub fn neutral() -> Self {
        Self::decode(&neutral_report(), 0, None)
    }
}

/// Raw report equivalent to [`Snapshot::neutral`], at offset 0.
pub fn neutral_report() -> [u8; INPUT_REPORT_SIZE] {
    let mut report = [0u8; INPUT_REPORT_SIZE];
    report[0] = 0x01;
    report[LEFT_STICK_X] = STICK_CENTER;
    report[LEFT_STICK_Y] = STICK_CENTER;
    report[RIGHT_STICK_X] = STICK_CENTER;
    report[RIGHT_STICK_Y] = STICK_CENTER;
    report[FACE_BUTTONS] = DPAD_NEUTRAL;
    for point in 0..TOUCH_POINTS {
        report[TOUCH + point * TOUCH_STRIDE] = 0x80;
    }
    report
}

fn trigger_pressure(shoulder: u8, digital: u8, analog: u8) -> u8 {
    if shoulder & digital != 0 {
        analog
    } else {
        0
    }
}

// Hysteresis against stick jitter: keep the stored position until either
// axis moves by at least `smoothing`.
fn smooth_stick(raw: Stick, previous: Option<Stick>, smoothing: u8) -> Stick {
    let previous = previous.unwrap_or(raw);
    if raw.x.abs_diff(previous.x) >= smoothing || raw.y.abs_diff(previous.y) >= smoothing {
        raw
    } else {
        previous
    }
}

// `fields` starts at the input offset
fn decode_touchpad(fields: &[u8], press: bool) -> Touchpad {
    let swipe = (0..TOUCH_POINTS)
        .map(|point| {
            let base = TOUCH + point * TOUCH_STRIDE;
            let status = fields[base];
            let low = fields[base + 1];
            let shared = fields[base + 2];
            let high = fields[base + 3];
            Touch {
                // Inverted: bit 7 set means no finger
                is_active: status >> 7 == 0,
                x: u16::from(shared & 0x0F) << 8 | u16::from(low),
                y: u16::from(high) << 4 | u16::from((shared & 0xF0) >> 4),
            }
        })
        .collect();

    Touchpad { press, swipe }
}

fn decode_battery(status: u8) -> Battery {
    let level = status & 0x0F;
    let is_cable_connected = (status >> 4) & 0x01 == 1;
    let is_charging = is_cable_connected && level <= 10;

    // The device reports 0-10 on cable and 0-9 on battery
    let max_level: u8 = if is_cable_connected { 10 } else { 9 };
    let capacity = (u16::from(level.min(max_level)) * 100 / u16::from(max_level)) as u8;

    Battery {
        capacity,
        is_charging,
        is_cable_connected,
    }
}

fn read_i16_le(report: &[u8], position: usize) -> i16 {
    i16::from_le_bytes([report[position], report[position + 1]])
}
