//! Controller subsystem for DualShock 4 input and output
//!
//! Implements the report pipeline of one session:
//!
//! 1. [`connection`] - USB / Bluetooth detection right after open
//! 2. [`state`] - Input report decoding into a [`Snapshot`]
//! 3. [`event_processor`] - Change detection and handler dispatch
//! 4. [`event_collector`] - Blocking read loop tying the above together
//! 5. [`output`] - Rumble / LED output report encoding
//! 6. [`controller_handle`] - Unified API and lifecycle management
//!
//! # Architecture
//!
//! ```text
//! Device ──► Collector ──► decode ──► Processor ──► handlers
//!   ▲       (read loop)   (Snapshot)  (Events)
//!   └──────── OutputReport ◄── rumble / led
//! ```
//!
//! The read loop runs on a blocking worker thread; the transport read timeout
//! bounds how long a stop request takes to be noticed.

pub mod connection;
pub mod controller_handle;
pub mod event;
pub mod event_collector;
pub mod event_processor;
pub mod output;
pub mod state;

pub use connection::ConnectionType;
pub use controller_handle::{Controller, ControllerError, ControllerSettings, StateError};
pub use event::{Event, EventData};
pub use event_processor::{Handler, HandlerError};
pub use output::{Field, OutputReport};
pub use state::{Accelerometer, Battery, Gyroscope, Snapshot, Stick, Touch, Touchpad};
