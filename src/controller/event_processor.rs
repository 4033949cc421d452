//! Change detection and handler dispatch
//!
//! Compares two consecutive snapshots and fires one [`Event`] per detected
//! change. The checks run in a fixed order:
//!
//! ```text
//! cross circle square triangle L1 L2 L3 R1 R2 R3
//! d-pad up/down/left/right share options PS
//! left stick, right stick, touchpad, accelerometer, gyroscope, battery
//! ```
//!
//! A failing handler stops the pass; checks after it are not evaluated.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use super::controller_handle::ControllerError;
use super::event::{Event, EventData};
use super::state::{Snapshot, Stick};

/// Error type returned by user handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Callback invoked for a single event kind
pub type Handler = Arc<dyn Fn(&EventData) -> Result<(), HandlerError> + Send + Sync>;

/// Immutable view of the registered handlers used for one dispatch pass
pub type HandlerMap = Arc<HashMap<Event, Handler>>;

/// Registered handlers, at most one per event kind
///
/// Registration replaces the whole map behind the lock, so a dispatch pass that
/// grabbed a [`HandlerMap`] keeps seeing the table as it was when the pass began.
#[derive(Default)]
pub struct EventTable {
    handlers: RwLock<HandlerMap>,
}

impl EventTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `event`, replacing any previous one.
    pub fn set<F>(&self, event: Event, handler: F)
    where
        F: Fn(&EventData) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let handler: Handler = Arc::new(handler);
        let mut guard = self.handlers.write();
        let mut handlers = HashMap::clone(&guard);
        if handlers.insert(event, handler).is_some() {
            debug!("Replaced handler for {}", event);
        } else {
            debug!("Registered handler for {}", event);
        }
        *guard = Arc::new(handlers);
    }

    /// Removes the handler for `event`. Returns whether one was registered.
    pub fn unset(&self, event: Event) -> bool {
        let mut guard = self.handlers.write();
        if !guard.contains_key(&event) {
            return false;
        }
        let mut handlers = HashMap::clone(&guard);
        handlers.remove(&event);
        *guard = Arc::new(handlers);
        debug!("Removed handler for {}", event);
        true
    }

    pub fn contains(&self, event: Event) -> bool {
        self.handlers.read().contains_key(&event)
    }

    /// Current table for one dispatch pass
    pub fn snapshot(&self) -> HandlerMap {
        Arc::clone(&self.handlers.read())
    }
}

// One row per feature, evaluated top to bottom
enum Check {
    Button {
        pressed: fn(&Snapshot) -> bool,
        press: Event,
        release: Event,
    },
    Trigger {
        value: fn(&Snapshot) -> u8,
        press: Event,
        release: Event,
    },
    Stick {
        position: fn(&Snapshot) -> Stick,
        moved: Event,
    },
    Touchpad,
    Accelerometer,
    Gyroscope,
    Battery,
}

const CHECKS: [Check; 23] = [
    Check::Button {
        pressed: |s| s.cross,
        press: Event::CrossPress,
        release: Event::CrossRelease,
    },
    Check::Button {
        pressed: |s| s.circle,
        press: Event::CirclePress,
        release: Event::CircleRelease,
    },
    Check::Button {
        pressed: |s| s.square,
        press: Event::SquarePress,
        release: Event::SquareRelease,
    },
    Check::Button {
        pressed: |s| s.triangle,
        press: Event::TrianglePress,
        release: Event::TriangleRelease,
    },
    Check::Button {
        pressed: |s| s.l1,
        press: Event::L1Press,
        release: Event::L1Release,
    },
    Check::Trigger {
        value: |s| s.l2,
        press: Event::L2Press,
        release: Event::L2Release,
    },
    Check::Button {
        pressed: |s| s.l3,
        press: Event::L3Press,
        release: Event::L3Release,
    },
    Check::Button {
        pressed: |s| s.r1,
        press: Event::R1Press,
        release: Event::R1Release,
    },
    Check::Trigger {
        value: |s| s.r2,
        press: Event::R2Press,
        release: Event::R2Release,
    },
    Check::Button {
        pressed: |s| s.r3,
        press: Event::R3Press,
        release: Event::R3Release,
    },
    Check::Button {
        pressed: |s| s.dpad_up,
        press: Event::DPadUpPress,
        release: Event::DPadUpRelease,
    },
    Check::Button {
        pressed: |s| s.dpad_down,
        press: Event::DPadDownPress,
        release: Event::DPadDownRelease,
    },
    Check::Button {
        pressed: |s| s.dpad_left,
        press: Event::DPadLeftPress,
        release: Event::DPadLeftRelease,
    },
    Check::Button {
        pressed: |s| s.dpad_right,
        press: Event::DPadRightPress,
        release: Event::DPadRightRelease,
    },
    Check::Button {
        pressed: |s| s.share,
        press: Event::SharePress,
        release: Event::ShareRelease,
    },
    Check::Button {
        pressed: |s| s.options,
        press: Event::OptionsPress,
        release: Event::OptionsRelease,
    },
    Check::Button {
        pressed: |s| s.ps,
        press: Event::PSPress,
        release: Event::PSRelease,
    },
    Check::Stick {
        position: |s| s.left_stick,
        moved: Event::LeftStickMove,
    },
    Check::Stick {
        position: |s| s.right_stick,
        moved: Event::RightStickMove,
    },
    Check::Touchpad,
    Check::Accelerometer,
    Check::Gyroscope,
    Check::Battery,
];

impl Check {
    fn run<E>(
        &self,
        current: &Snapshot,
        previous: &Snapshot,
        emit: &mut impl FnMut(Event, EventData) -> Result<(), E>,
    ) -> Result<(), E> {
        match *self {
            Check::Button {
                pressed,
                press,
                release,
            } => match (pressed(previous), pressed(current)) {
                (false, true) => emit(press, EventData::None),
                (true, false) => emit(release, EventData::None),
                _ => Ok(()),
            },
            Check::Trigger {
                value,
                press,
                release,
            } => {
                let (before, after) = (value(previous), value(current));
                // Press fires on every pressure change while held, not only on the edge
                if after != before {
                    emit(press, EventData::Trigger(after))?;
                }
                if after == 0 && before != 0 {
                    emit(release, EventData::Trigger(after))?;
                }
                Ok(())
            }
            Check::Stick { position, moved } => {
                let after = position(current);
                if after != position(previous) {
                    emit(moved, EventData::Stick(after))?;
                }
                Ok(())
            }
            Check::Touchpad => {
                let (before, after) = (&previous.touchpad, &current.touchpad);
                if before.swipe != after.swipe {
                    emit(Event::TouchpadSwipe, EventData::Touchpad(after.clone()))?;
                }
                match (before.press, after.press) {
                    (false, true) => emit(Event::TouchpadPress, EventData::Touchpad(after.clone())),
                    (true, false) => {
                        emit(Event::TouchpadRelease, EventData::Touchpad(after.clone()))
                    }
                    _ => Ok(()),
                }
            }
            Check::Accelerometer => {
                if current.accelerometer != previous.accelerometer {
                    emit(
                        Event::AccelerometerUpdate,
                        EventData::Accelerometer(current.accelerometer),
                    )?;
                }
                Ok(())
            }
            Check::Gyroscope => {
                if current.gyroscope != previous.gyroscope {
                    emit(Event::GyroscopeUpdate, EventData::Gyroscope(current.gyroscope))?;
                }
                Ok(())
            }
            Check::Battery => {
                if current.battery != previous.battery {
                    emit(Event::BatteryUpdate, EventData::Battery(current.battery))?;
                }
                Ok(())
            }
        }
    }
}

/// Walks every check in order and hands each detected change to `emit`.
///
/// Stops at the first error returned by `emit`.
pub fn detect_transitions<E>(
    current: &Snapshot,
    previous: &Snapshot,
    mut emit: impl FnMut(Event, EventData) -> Result<(), E>,
) -> Result<(), E> {
    for check in &CHECKS {
        check.run(current, previous, &mut emit)?;
    }
    Ok(())
}

/// All changes between two snapshots, in dispatch order
pub fn transitions(current: &Snapshot, previous: &Snapshot) -> Vec<(Event, EventData)> {
    let mut events = Vec::new();
    let collected = detect_transitions::<Infallible>(current, previous, |event, data| {
        events.push((event, data));
        Ok(())
    });
    match collected {
        Ok(()) => events,
        Err(never) => match never {},
    }
}

/// Fires the registered handler for every change between `previous` and `current`.
///
/// Events without a handler are skipped. The first handler error aborts the
/// pass and is returned as [`ControllerError::Handler`].
pub fn dispatch(
    current: &Snapshot,
    previous: &Snapshot,
    handlers: &HashMap<Event, Handler>,
) -> Result<(), ControllerError> {
    detect_transitions(current, previous, |event, data| {
        let Some(handler) = handlers.get(&event) else {
            return Ok(());
        };
        debug!("Dispatching {}: {:?}", event, data);
        handler(&data).map_err(|source| {
            warn!("Handler for {} failed: {}", event, source);
            ControllerError::Handler { event, source }
        })
    })
}
