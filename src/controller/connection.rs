//! Connection type detection
//!
//! USB and Bluetooth deliver the same input fields, but Bluetooth prefixes the
//! input report with two extra bytes and expects a different output frame
//! with a CRC-32 trailer. Which one we are on is decided once, right after the
//! device is opened.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::controller_handle::ControllerError;
use super::state::INPUT_REPORT_SIZE;
use crate::hid::{Device, FEATURE_REPORT_CALIBRATION};

/// Reads discarded before the signature check.
///
/// Empirical: the Bluetooth signature only shows up reliably once the read
/// pipeline has settled. May need recalibration for other hardware revisions.
pub const DEFAULT_CLASSIFICATION_READS: usize = 100;

/// First two bytes of a Bluetooth input report (report 0x11, HID flags 0xC0)
pub const BLUETOOTH_SIGNATURE: [u8; 2] = [0x11, 0xC0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConnectionType {
    #[default]
    None,
    Usb,
    Bluetooth,
}

impl ConnectionType {
    /// Shift applied to every input report field
    pub fn input_offset(self) -> usize {
        match self {
            ConnectionType::Bluetooth => 2,
            ConnectionType::Usb | ConnectionType::None => 0,
        }
    }

    /// Shift applied to every output report field
    pub fn output_offset(self) -> usize {
        match self {
            ConnectionType::Bluetooth => 3,
            ConnectionType::Usb | ConnectionType::None => 0,
        }
    }

    /// Whether output frames carry a CRC-32 trailer and a stripped sync byte
    pub fn has_checksum(self) -> bool {
        self == ConnectionType::Bluetooth
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionType::None => "NONE",
            ConnectionType::Usb => "USB",
            ConnectionType::Bluetooth => "BT",
        })
    }
}

/// Decides whether `device` is attached over USB or Bluetooth.
///
/// Queries the calibration feature report (best effort), then consumes exactly
/// `reads` input reports and inspects only the last one. Empty reads are
/// retried without counting. A failed read aborts
/// with [`ControllerError::Connectivity`]; a last read too short to hold the
/// signature yields [`ControllerError::Protocol`].
pub fn classify(device: &dyn Device, reads: usize) -> Result<ConnectionType, ControllerError> {
    debug!("Classifying connection over {} reads", reads);

    if let Err(e) = device.get_feature_report(FEATURE_REPORT_CALIBRATION) {
        debug!("Calibration query before classification failed: {}", e);
    }

    let mut report = [0u8; INPUT_REPORT_SIZE];
    let mut len = 0;
    let mut received = 0;
    while received < reads {
        let read = device.read(&mut report).map_err(|e| {
            warn!("Read failed during connection classification: {}", e);
            ControllerError::Connectivity(e)
        })?;
        // Timed out without a report; doesn't count
        if read == 0 {
            continue;
        }
        len = read;
        received += 1;
    }

    if len < BLUETOOTH_SIGNATURE.len() {
        return Err(ControllerError::Protocol(format!(
            "can't detect connection type: last report had {} bytes",
            len
        )));
    }

    let connection = if report[..2] == BLUETOOTH_SIGNATURE {
        ConnectionType::Bluetooth
    } else {
        ConnectionType::Usb
    };
    info!("Detected {} connection", connection);
    Ok(connection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::TransportError;
    use parking_lot::Mutex;

    struct Scripted {
        reports: Mutex<Vec<Vec<u8>>>,
        reads: Mutex<usize>,
        fail_at: Option<usize>,
    }

    impl Scripted {
        fn new(reports: Vec<Vec<u8>>) -> Self {
            Self {
                reports: Mutex::new(reports),
                reads: Mutex::new(0),
                fail_at: None,
            }
        }
    }

    impl Device for Scripted {
        fn vendor_id(&self) -> u16 {
            0
        }
        fn product_id(&self) -> u16 {
            0
        }
        fn path(&self) -> String {
            String::new()
        }
        fn release(&self) -> u16 {
            0
        }
        fn serial(&self) -> String {
            String::new()
        }
        fn manufacturer(&self) -> String {
            String::new()
        }
        fn product(&self) -> String {
            String::new()
        }
        fn open(&self) -> Result<(), TransportError> {
            Ok(())
        }
        fn close(&self) -> Result<(), TransportError> {
            Ok(())
        }
        fn read(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
            let mut reads = self.reads.lock();
            *reads += 1;
            if Some(*reads) == self.fail_at {
                return Err(TransportError::Io("unplugged".into()));
            }
            let mut reports = self.reports.lock();
            let report = if reports.len() > 1 {
                reports.remove(0)
            } else {
                reports[0].clone()
            };
            buf[..report.len()].copy_from_slice(&report);
            Ok(report.len())
        }
        fn write(&self, buf: &[u8]) -> Result<usize, TransportError> {
            Ok(buf.len())
        }
        fn get_feature_report(&self, _code: u8) -> Result<Vec<u8>, TransportError> {
            Err(TransportError::Io("not supported".into()))
        }
    }

    #[test]
    fn test_bluetooth_signature_on_last_read() {
        let device = Scripted::new(vec![vec![0x11, 0xC0, 0, 0]]);
        assert_eq!(classify(&device, 100).unwrap(), ConnectionType::Bluetooth);
        assert_eq!(*device.reads.lock(), 100);
    }

    #[test]
    fn test_only_last_read_counts() {
        // Signature early on, plain USB report at the end
        let mut reports = vec![vec![0x11, 0xC0]; 99];
        reports.push(vec![0x01, 0x80]);
        let device = Scripted::new(reports);
        assert_eq!(classify(&device, 100).unwrap(), ConnectionType::Usb);
    }

    #[test]
    fn test_read_failure_is_connectivity_error() {
        let mut device = Scripted::new(vec![vec![0x01, 0x80]]);
        device.fail_at = Some(42);
        let err = classify(&device, 100).unwrap_err();
        assert!(matches!(err, ControllerError::Connectivity(_)));
        assert_eq!(*device.reads.lock(), 42);
    }

    #[test]
    fn test_short_last_read_is_protocol_error() {
        let device = Scripted::new(vec![vec![0x11]]);
        let err = classify(&device, 3).unwrap_err();
        assert!(matches!(err, ControllerError::Protocol(_)));
    }

    #[test]
    fn test_empty_reads_are_not_counted() {
        // Timeouts in between, one right where the fifth report was due
        let device = Scripted::new(vec![
            vec![0x01, 0x80],
            vec![],
            vec![0x01, 0x80],
            vec![0x01, 0x80],
            vec![0x01, 0x80],
            vec![],
            vec![0x11, 0xC0],
        ]);
        assert_eq!(classify(&device, 5).unwrap(), ConnectionType::Bluetooth);
        assert_eq!(*device.reads.lock(), 7);
    }

    #[test]
    fn test_offsets_per_connection() {
        assert_eq!(ConnectionType::Usb.input_offset(), 0);
        assert_eq!(ConnectionType::Bluetooth.input_offset(), 2);
        assert_eq!(ConnectionType::Bluetooth.output_offset(), 3);
        assert!(!ConnectionType::Usb.has_checksum());
        assert_eq!(ConnectionType::Bluetooth.to_string(), "BT");
        assert_eq!(ConnectionType::None.to_string(), "NONE");
    }
}
