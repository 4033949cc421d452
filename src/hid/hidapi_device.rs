use std::sync::Arc;

use hidapi::{DeviceInfo, HidApi, HidDevice};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::{Device, TransportError, FEATURE_REPORT_CALIBRATION};
use crate::config::DeviceFilter;
use crate::controller::controller_handle::{Controller, ControllerSettings};

// Calibration feature report is 37 bytes over USB, 41 over Bluetooth; 67 covers both
const CALIBRATION_REPORT_SIZE: usize = 67;

/// [`Device`] backed by a hidapi handle
///
/// Reads use a timeout so the session's read loop regains control regularly
/// and can observe a stop request.
pub struct HidTransport {
    api: Arc<Mutex<HidApi>>,
    info: DeviceInfo,
    handle: Mutex<Option<HidDevice>>,
    read_timeout_ms: i32,
}

impl HidTransport {
    pub fn new(api: Arc<Mutex<HidApi>>, info: DeviceInfo, read_timeout_ms: i32) -> Self {
        Self {
            api,
            info,
            handle: Mutex::new(None),
            read_timeout_ms,
        }
    }

    fn with_handle<T>(
        &self,
        op: impl FnOnce(&HidDevice) -> Result<T, hidapi::HidError>,
    ) -> Result<T, TransportError> {
        let handle = self.handle.lock();
        let device = handle.as_ref().ok_or(TransportError::NotOpen)?;
        Ok(op(device)?)
    }
}

impl Device for HidTransport {
    fn vendor_id(&self) -> u16 {
        self.info.vendor_id()
    }

    fn product_id(&self) -> u16 {
        self.info.product_id()
    }

    fn path(&self) -> String {
        self.info.path().to_string_lossy().into_owned()
    }

    fn release(&self) -> u16 {
        self.info.release_number()
    }

    fn serial(&self) -> String {
        self.info.serial_number().unwrap_or_default().to_string()
    }

    fn manufacturer(&self) -> String {
        self.info.manufacturer_string().unwrap_or_default().to_string()
    }

    fn product(&self) -> String {
        self.info.product_string().unwrap_or_default().to_string()
    }

    fn open(&self) -> Result<(), TransportError> {
        let device = self.info.open_device(&self.api.lock())?;
        info!("Opened HID device {}", self.path());
        *self.handle.lock() = Some(device);
        Ok(())
    }

    fn close(&self) -> Result<(), TransportError> {
        // Dropping the handle closes it
        match self.handle.lock().take() {
            Some(_) => {
                info!("Closed HID device {}", self.path());
                Ok(())
            }
            None => Err(TransportError::NotOpen),
        }
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        self.with_handle(|device| device.read_timeout(buf, self.read_timeout_ms))
    }

    fn write(&self, buf: &[u8]) -> Result<usize, TransportError> {
        self.with_handle(|device| device.write(buf))
    }

    fn get_feature_report(&self, code: u8) -> Result<Vec<u8>, TransportError> {
        if code != FEATURE_REPORT_CALIBRATION {
            return Err(TransportError::UnsupportedReport(code));
        }

        let mut report = vec![0u8; CALIBRATION_REPORT_SIZE];
        report[0] = code;
        let len = self.with_handle(|device| device.get_feature_report(&mut report))?;
        debug!("Feature report {:#04x}: {} bytes", code, len);
        Ok(report)
    }
}

/// Finds every attached controller matching `filter`, one [`Controller`] each.
pub fn find(
    filter: &DeviceFilter,
    settings: &ControllerSettings,
) -> Result<Vec<Controller>, TransportError> {
    let api = HidApi::new()?;
    let infos: Vec<DeviceInfo> = api
        .device_list()
        .filter(|info| filter.matches(info.vendor_id(), info.product_id()))
        .cloned()
        .collect();

    if infos.is_empty() {
        warn!("No matching HID devices found");
    } else {
        info!("Found {} matching HID devices", infos.len());
    }

    let api = Arc::new(Mutex::new(api));
    Ok(infos
        .into_iter()
        .map(|info| {
            debug!(
                "  {:04x}:{:04x} {}",
                info.vendor_id(),
                info.product_id(),
                info.path().to_string_lossy()
            );
            let transport = HidTransport::new(Arc::clone(&api), info, settings.read_timeout_ms);
            Controller::with_settings(transport, settings.clone())
        })
        .collect())
}
