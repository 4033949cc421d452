//! Event catalog
//!
//! Every change the dispatcher can report, with the payload handed to the
//! registered handler.

use std::fmt;

use super::state::{Accelerometer, Battery, Gyroscope, Stick, Touchpad};

// Event kinds, one per handler slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Event {
    CrossPress,
    CrossRelease,
    CirclePress,
    CircleRelease,
    SquarePress,
    SquareRelease,
    TrianglePress,
    TriangleRelease,
    L1Press,
    L1Release,
    L2Press,
    L2Release,
    L3Press,
    L3Release,
    R1Press,
    R1Release,
    R2Press,
    R2Release,
    R3Press,
    R3Release,
    DPadUpPress,
    DPadUpRelease,
    DPadDownPress,
    DPadDownRelease,
    DPadLeftPress,
    DPadLeftRelease,
    DPadRightPress,
    DPadRightRelease,
    SharePress,
    ShareRelease,
    OptionsPress,
    OptionsRelease,
    TouchpadSwipe,
    TouchpadPress,
    TouchpadRelease,
    PSPress,
    PSRelease,
    LeftStickMove,
    RightStickMove,
    AccelerometerUpdate,
    GyroscopeUpdate,
    BatteryUpdate,
}

impl Event {
    pub const ALL: [Event; 42] = [
        Event::CrossPress,
        Event::CrossRelease,
        Event::CirclePress,
        Event::CircleRelease,
        Event::SquarePress,
        Event::SquareRelease,
        Event::TrianglePress,
        Event::TriangleRelease,
        Event::L1Press,
        Event::L1Release,
        Event::L2Press,
        Event::L2Release,
        Event::L3Press,
        Event::L3Release,
        Event::R1Press,
        Event::R1Release,
        Event::R2Press,
        Event::R2Release,
        Event::R3Press,
        Event::R3Release,
        Event::DPadUpPress,
        Event::DPadUpRelease,
        Event::DPadDownPress,
        Event::DPadDownRelease,
        Event::DPadLeftPress,
        Event::DPadLeftRelease,
        Event::DPadRightPress,
        Event::DPadRightRelease,
        Event::SharePress,
        Event::ShareRelease,
        Event::OptionsPress,
        Event::OptionsRelease,
        Event::TouchpadSwipe,
        Event::TouchpadPress,
        Event::TouchpadRelease,
        Event::PSPress,
        Event::PSRelease,
        Event::LeftStickMove,
        Event::RightStickMove,
        Event::AccelerometerUpdate,
        Event::GyroscopeUpdate,
        Event::BatteryUpdate,
    ];

    /// Stable dotted name, e.g. `cross.press` or `left_stick.move`
    pub fn name(self) -> &'static str {
        match self {
            Event::CrossPress => "cross.press",
            Event::CrossRelease => "cross.release",
            Event::CirclePress => "circle.press",
            Event::CircleRelease => "circle.release",
            Event::SquarePress => "square.press",
            Event::SquareRelease => "square.release",
            Event::TrianglePress => "triangle.press",
            Event::TriangleRelease => "triangle.release",
            Event::L1Press => "l1.press",
            Event::L1Release => "l1.release",
            Event::L2Press => "l2.press",
            Event::L2Release => "l2.release",
            Event::L3Press => "l3.press",
            Event::L3Release => "l3.release",
            Event::R1Press => "r1.press",
            Event::R1Release => "r1.release",
            Event::R2Press => "r2.press",
            Event::R2Release => "r2.release",
            Event::R3Press => "r3.press",
            Event::R3Release => "r3.release",
            Event::DPadUpPress => "dpad_up.press",
            Event::DPadUpRelease => "dpad_up.release",
            Event::DPadDownPress => "dpad_down.press",
            Event::DPadDownRelease => "dpad_down.release",
            Event::DPadLeftPress => "dpad_left.press",
            Event::DPadLeftRelease => "dpad_left.release",
            Event::DPadRightPress => "dpad_right.press",
            Event::DPadRightRelease => "dpad_right.release",
            Event::SharePress => "share.press",
            Event::ShareRelease => "share.release",
            Event::OptionsPress => "options.press",
            Event::OptionsRelease => "options.release",
            Event::TouchpadSwipe => "touchpad.swipe",
            Event::TouchpadPress => "touchpad.press",
            Event::TouchpadRelease => "touchpad.release",
            Event::PSPress => "ps.press",
            Event::PSRelease => "ps.release",
            Event::LeftStickMove => "left_stick.move",
            Event::RightStickMove => "right_stick.move",
            Event::AccelerometerUpdate => "accelerometer.update",
            Event::GyroscopeUpdate => "gyroscope.update",
            Event::BatteryUpdate => "battery.update",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload handed to a handler together with its [`Event`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventData {
    /// Plain button edges carry nothing
    None,
    /// L2 / R2 pressure after the change
    Trigger(u8),
    Stick(Stick),
    Touchpad(Touchpad),
    Accelerometer(Accelerometer),
    Gyroscope(Gyroscope),
    Battery(Battery),
}
