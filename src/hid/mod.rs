//! Device transport
//!
//! The session only talks to the controller through [`Device`]: an opaque
//! byte stream with input reads, output writes and feature reports. Any
//! failure is fatal to the session that hit it.
//!
//! With the `hidapi` feature, [`HidTransport`] implements it on top of the
//! `hidapi` crate and [`find`] enumerates attached controllers.

#[cfg(feature = "hidapi")]
mod hidapi_device;

#[cfg(feature = "hidapi")]
pub use hidapi_device::{find, HidTransport};

/// Sony Interactive Entertainment
pub const SONY_VENDOR_ID: u16 = 1356;

/// DualShock 4 second revision (CUH-ZCT2) and first revision (CUH-ZCT1)
pub const DUALSHOCK4_PRODUCT_IDS: [u16; 2] = [2508, 1476];

/// Feature report that returns calibration data; querying it also switches a
/// Bluetooth controller to the full input report
pub const FEATURE_REPORT_CALIBRATION: u8 = 0x04;

// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Device is not open")]
    NotOpen,

    #[error("Unsupported feature report code: {0:#04x}")]
    UnsupportedReport(u8),

    #[error("HID I/O error: {0}")]
    Io(String),

    #[cfg(feature = "hidapi")]
    #[error("hidapi error: {0}")]
    Hid(#[from] hidapi::HidError),
}

/// Raw byte-stream access to one controller
///
/// All methods take `&self`: the read loop and actuator writes share one
/// device from different threads, so implementations synchronize internally.
pub trait Device: Send + Sync {
    fn vendor_id(&self) -> u16;
    fn product_id(&self) -> u16;
    fn path(&self) -> String;
    fn release(&self) -> u16;
    fn serial(&self) -> String;
    fn manufacturer(&self) -> String;
    fn product(&self) -> String;

    fn open(&self) -> Result<(), TransportError>;
    fn close(&self) -> Result<(), TransportError>;

    /// Reads one input report into `buf`.
    ///
    /// Returns the number of bytes read. `Ok(0)` means no report was available
    /// yet; the caller retries.
    fn read(&self, buf: &mut [u8]) -> Result<usize, TransportError>;

    fn write(&self, buf: &[u8]) -> Result<usize, TransportError>;

    /// Fetches feature report `code`, including the leading report id byte.
    fn get_feature_report(&self, code: u8) -> Result<Vec<u8>, TransportError>;
}
