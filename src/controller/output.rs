//! Output report encoding
//!
//! The session keeps one persistent output report per connection. Rumble and
//! LED requests patch individual bytes of it and the whole report is sent
//! again, so settings not touched by a request stay as they were.
//!
//! ```text
//! USB        [0x05][0x07][ .. fields at +0 .. ]                 79 bytes sent
//! Bluetooth  [0xA2][0x11][0x80][ ][0x0F][ fields at +3 ][CRC32 LE @75..79]
//!            0xA2 is only fed to the CRC; the 78 bytes after it are sent
//! ```

use crc32fast::Hasher;

use super::connection::ConnectionType;
use super::controller_handle::ControllerError;

pub const OUTPUT_REPORT_SIZE: usize = 79;

/// Bytes 0..75 are covered by the Bluetooth checksum
pub const CHECKSUM_SPAN: usize = 75;

const BLUETOOTH_HEADER: [(usize, u8); 4] = [(0, 0xA2), (1, 0x11), (2, 0x80), (4, 0x0F)];
const USB_HEADER: [(usize, u8); 2] = [(0, 0x05), (1, 0x07)];

/// Actuator bytes, positioned before the connection's output offset is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    RumbleLeft = 4,
    RumbleRight = 5,
    LedRed = 6,
    LedGreen = 7,
    LedBlue = 8,
    LedFlashOn = 9,
    LedFlashOff = 10,
}

/// Persistent output report for one connected session
#[derive(Debug, Clone)]
pub struct OutputReport {
    connection: ConnectionType,
    buffer: [u8; OUTPUT_REPORT_SIZE],
}

impl OutputReport {
    pub fn new(connection: ConnectionType) -> Self {
        let mut buffer = [0u8; OUTPUT_REPORT_SIZE];
        let header: &[(usize, u8)] = match connection {
            ConnectionType::Bluetooth => &BLUETOOTH_HEADER,
            ConnectionType::Usb | ConnectionType::None => &USB_HEADER,
        };
        for &(position, value) in header {
            buffer[position] = value;
        }
        Self { connection, buffer }
    }

    pub fn connection(&self) -> ConnectionType {
        self.connection
    }

    /// Absolute buffer position of `field` for this connection
    pub fn position(&self, field: Field) -> usize {
        field as usize + self.connection.output_offset()
    }

    /// Writes absolute `(position, value)` pairs and returns the frame to send.
    ///
    /// # Errors
    ///
    /// [`ControllerError::ReservedPosition`] if any position lies outside the
    /// actuator bytes. Nothing is written then.
    pub fn apply_patch(&mut self, patch: &[(usize, u8)]) -> Result<&[u8], ControllerError> {
        if let Some(&(position, _)) = patch.iter().find(|&&(p, _)| !self.is_writable(p)) {
            return Err(ControllerError::ReservedPosition(position));
        }
        for &(position, value) in patch {
            self.buffer[position] = value;
        }
        Ok(self.encode())
    }

    /// Named-field variant of [`apply_patch`](Self::apply_patch)
    pub fn set(&mut self, fields: &[(Field, u8)]) -> Result<&[u8], ControllerError> {
        let patch: Vec<(usize, u8)> = fields
            .iter()
            .map(|&(field, value)| (self.position(field), value))
            .collect();
        self.apply_patch(&patch)
    }

    /// Full buffer including the Bluetooth sync byte
    pub fn as_bytes(&self) -> &[u8; OUTPUT_REPORT_SIZE] {
        &self.buffer
    }

    fn is_writable(&self, position: usize) -> bool {
        let first = Field::RumbleLeft as usize + self.connection.output_offset();
        let end = if self.connection.has_checksum() {
            CHECKSUM_SPAN
        } else {
            OUTPUT_REPORT_SIZE
        };
        (first..end).contains(&position)
    }

    fn encode(&mut self) -> &[u8] {
        if !self.connection.has_checksum() {
            return &self.buffer;
        }

        let mut hasher = Hasher::new();
        hasher.update(&self.buffer[..CHECKSUM_SPAN]);
        let crc = hasher.finalize();
        self.buffer[CHECKSUM_SPAN..].copy_from_slice(&crc.to_le_bytes());

        // Sync byte is part of the checksum but not of the transfer
        &self.buffer[1..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usb_frame_is_sent_whole() {
        let mut report = OutputReport::new(ConnectionType::Usb);
        let frame = report
            .set(&[(Field::RumbleLeft, 255), (Field::LedBlue, 64)])
            .unwrap()
            .to_vec();

        assert_eq!(frame.len(), OUTPUT_REPORT_SIZE);
        assert_eq!(&frame[..2], &[0x05, 0x07]);
        assert_eq!(frame[4], 255);
        assert_eq!(frame[8], 64);
        assert!(frame[75..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_bluetooth_frame_layout() {
        let mut report = OutputReport::new(ConnectionType::Bluetooth);
        assert_eq!(report.position(Field::RumbleLeft), 7);
        assert_eq!(report.position(Field::LedFlashOff), 13);

        let frame = report.set(&[(Field::RumbleLeft, 255)]).unwrap().to_vec();
        assert_eq!(frame.len(), OUTPUT_REPORT_SIZE - 1);
        // Sync byte stripped, header follows directly
        assert_eq!(&frame[..4], &[0x11, 0x80, 0x00, 0x0F]);
        assert_eq!(frame[6], 255);

        let bytes = report.as_bytes();
        assert_eq!(bytes[0], 0xA2);
        let crc = crc32fast::hash(&bytes[..CHECKSUM_SPAN]);
        assert_eq!(&bytes[CHECKSUM_SPAN..], &crc.to_le_bytes());
        assert_eq!(&frame[CHECKSUM_SPAN - 1..], &crc.to_le_bytes());
    }

    #[test]
    fn test_patches_accumulate() {
        let mut report = OutputReport::new(ConnectionType::Bluetooth);
        report
            .set(&[(Field::RumbleLeft, 10), (Field::RumbleRight, 20)])
            .unwrap();
        let first_crc = report.as_bytes()[CHECKSUM_SPAN..].to_vec();

        report
            .set(&[(Field::LedRed, 255), (Field::LedGreen, 255)])
            .unwrap();
        let bytes = report.as_bytes();
        assert_eq!(bytes[7], 10);
        assert_eq!(bytes[8], 20);
        assert_eq!(bytes[9], 255);
        assert_eq!(bytes[10], 255);
        assert_ne!(&bytes[CHECKSUM_SPAN..], first_crc.as_slice());
    }

    #[test]
    fn test_patch_on_header_is_rejected() {
        let mut report = OutputReport::new(ConnectionType::Bluetooth);
        let before = *report.as_bytes();

        let err = report.apply_patch(&[(7, 0x10), (1, 0xEE), (2, 0xEE)]).unwrap_err();
        assert!(matches!(err, ControllerError::ReservedPosition(1)));
        // Rejected as a whole, the valid rumble byte is not written either
        assert_eq!(report.as_bytes(), &before);
        assert_eq!(&report.as_bytes()[..5], &[0xA2, 0x11, 0x80, 0x00, 0x0F]);
    }

    #[test]
    fn test_patch_on_checksum_or_past_end_is_rejected() {
        let mut bluetooth = OutputReport::new(ConnectionType::Bluetooth);
        assert!(matches!(
            bluetooth.apply_patch(&[(CHECKSUM_SPAN, 0)]),
            Err(ControllerError::ReservedPosition(75))
        ));
        assert!(matches!(
            bluetooth.apply_patch(&[(6, 0)]),
            Err(ControllerError::ReservedPosition(6))
        ));

        let mut usb = OutputReport::new(ConnectionType::Usb);
        assert!(matches!(
            usb.apply_patch(&[(OUTPUT_REPORT_SIZE, 1)]),
            Err(ControllerError::ReservedPosition(79))
        ));
        assert!(matches!(
            usb.apply_patch(&[(0, 1)]),
            Err(ControllerError::ReservedPosition(0))
        ));
        // Last USB byte is still an actuator byte
        assert!(usb.apply_patch(&[(OUTPUT_REPORT_SIZE - 1, 1)]).is_ok());
    }
}
