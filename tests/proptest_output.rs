//! Property-based tests for output report encoding.

use dualshock::controller::output::{Field, OutputReport, CHECKSUM_SPAN, OUTPUT_REPORT_SIZE};
use dualshock::{ConnectionType, ControllerError};
use proptest::prelude::*;

const FIELDS: [Field; 7] = [
    Field::RumbleLeft,
    Field::RumbleRight,
    Field::LedRed,
    Field::LedGreen,
    Field::LedBlue,
    Field::LedFlashOn,
    Field::LedFlashOff,
];

fn arb_fields() -> impl Strategy<Value = Vec<(Field, u8)>> {
    proptest::collection::vec((proptest::sample::select(FIELDS.to_vec()), any::<u8>()), 0..10)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Every Bluetooth frame carries a valid CRC over sync byte plus payload.
    #[test]
    fn prop_bluetooth_checksum_valid(fields in arb_fields()) {
        let mut report = OutputReport::new(ConnectionType::Bluetooth);
        let frame = report
            .set(&fields)
            .map_err(|e| TestCaseError::fail(format!("{e:?}")))?
            .to_vec();

        prop_assert_eq!(frame.len(), OUTPUT_REPORT_SIZE - 1);
        let mut covered = vec![0xA2];
        covered.extend_from_slice(&frame[..CHECKSUM_SPAN - 1]);
        let crc = crc32fast::hash(&covered);
        prop_assert_eq!(&frame[CHECKSUM_SPAN - 1..], &crc.to_le_bytes()[..]);
    }

    /// Headers survive any actuator patch.
    #[test]
    fn prop_headers_preserved(fields in arb_fields()) {
        let mut usb = OutputReport::new(ConnectionType::Usb);
        let frame = usb
            .set(&fields)
            .map_err(|e| TestCaseError::fail(format!("{e:?}")))?
            .to_vec();
        prop_assert_eq!(&frame[..2], &[0x05, 0x07]);

        let mut bluetooth = OutputReport::new(ConnectionType::Bluetooth);
        let frame = bluetooth
            .set(&fields)
            .map_err(|e| TestCaseError::fail(format!("{e:?}")))?
            .to_vec();
        prop_assert_eq!(&frame[..4], &[0x11, 0x80, 0x00, 0x0F]);
    }

    /// The last write to a field wins and untouched fields keep their value.
    #[test]
    fn prop_last_write_wins(first in arb_fields(), second in arb_fields()) {
        for connection in [ConnectionType::Usb, ConnectionType::Bluetooth] {
            let mut report = OutputReport::new(connection);
            prop_assert!(report.set(&first).is_ok());
            prop_assert!(report.set(&second).is_ok());

            for field in FIELDS {
                let latest = second
                    .iter()
                    .rev()
                    .chain(first.iter().rev())
                    .find(|(f, _)| *f == field)
                    .map(|&(_, value)| value)
                    .unwrap_or(0);
                prop_assert_eq!(report.as_bytes()[report.position(field)], latest);
            }
        }
    }

    /// Patches outside the actuator region are refused in full, whatever the
    /// build profile, and leave the report untouched.
    #[test]
    fn prop_reserved_positions_rejected(
        bluetooth in any::<bool>(),
        position in prop_oneof![0usize..4, CHECKSUM_SPAN..OUTPUT_REPORT_SIZE + 16],
        value in any::<u8>(),
        fields in arb_fields(),
    ) {
        let connection = if bluetooth { ConnectionType::Bluetooth } else { ConnectionType::Usb };
        // USB has no checksum trailer, bytes 75..79 are regular payload there
        prop_assume!(bluetooth || position < 4 || position >= OUTPUT_REPORT_SIZE);

        let mut report = OutputReport::new(connection);
        let before = *report.as_bytes();
        let mut patch: Vec<(usize, u8)> = fields
            .iter()
            .map(|&(field, v)| (report.position(field), v))
            .collect();
        patch.push((position, value));

        let rejected = matches!(
            report.apply_patch(&patch),
            Err(ControllerError::ReservedPosition(p)) if p == position
        );
        prop_assert!(rejected);
        prop_assert_eq!(report.as_bytes(), &before);
    }
}
