//! DualShock 4 controller sessions over HID
//!
//! Connects to a controller attached over USB or Bluetooth, decodes its input
//! reports into snapshots, fires registered handlers for every change, and
//! drives rumble motors and the light bar.
//!
//! ```no_run
//! # #[cfg(feature = "hidapi")]
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use dualshock::{config::DeviceFilter, Controller, ControllerSettings, Event, Led};
//!
//! let controllers = dualshock::hid::find(&DeviceFilter::default(), &ControllerSettings::default())?;
//! let controller = controllers.into_iter().next().ok_or("no controller")?;
//! controller.connect().await?;
//! controller.on(Event::CrossPress, |_| {
//!     println!("cross");
//!     Ok(())
//! });
//! controller.led(&Led::cyan())?;
//! controller.listen().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod hid;
pub mod led;
pub mod rumble;

pub use controller::{
    ConnectionType, Controller, ControllerError, ControllerSettings, Event, EventData, Snapshot,
    StateError,
};
pub use hid::{Device, TransportError};
pub use led::Led;
pub use rumble::Rumble;
