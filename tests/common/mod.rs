//! Scripted in-memory transport shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dualshock::controller::state::{neutral_report, INPUT_REPORT_SIZE};
use dualshock::{Device, TransportError};
use parking_lot::Mutex;

pub const VENDOR_ID: u16 = 1356;
pub const PRODUCT_ID: u16 = 2508;

/// Neutral input report as sent over USB
pub fn usb_report() -> Vec<u8> {
    neutral_report().to_vec()
}

/// Neutral input report as sent over Bluetooth: signature, then fields shifted by 2
pub fn bluetooth_report() -> Vec<u8> {
    let mut report = vec![0x11, 0xC0];
    report.extend_from_slice(&neutral_report()[..INPUT_REPORT_SIZE - 2]);
    report
}

enum Step {
    Report(Vec<u8>),
    Fail(String),
}

/// Observable state behind a [`MockDevice`]
///
/// Once the script runs dry the device keeps repeating the last report it
/// served, like a controller sitting still.
pub struct MockState {
    script: Mutex<VecDeque<Step>>,
    idle: Mutex<Vec<u8>>,
    pub reads: AtomicUsize,
    pub writes: Mutex<Vec<Vec<u8>>>,
    pub feature_requests: Mutex<Vec<u8>>,
    pub open_count: AtomicUsize,
    pub close_count: AtomicUsize,
    pub fail_open: AtomicBool,
    pub fail_feature_reports: AtomicBool,
    /// Extra latency added to every read, in milliseconds
    pub read_delay_ms: AtomicU64,
}

impl MockState {
    /// Queues a report to be served by the next read.
    pub fn push_report(&self, report: Vec<u8>) {
        self.script.lock().push_back(Step::Report(report));
    }

    /// Queues a read failure.
    pub fn push_failure(&self, message: &str) {
        self.script.lock().push_back(Step::Fail(message.to_string()));
    }

    pub fn last_write(&self) -> Option<Vec<u8>> {
        self.writes.lock().last().cloned()
    }

    pub fn is_open(&self) -> bool {
        self.open_count.load(Ordering::SeqCst) > self.close_count.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct MockDevice {
    pub state: Arc<MockState>,
}

impl MockDevice {
    /// A device that idles on `report`
    pub fn idling_on(report: Vec<u8>) -> Self {
        Self {
            state: Arc::new(MockState {
                script: Mutex::new(VecDeque::new()),
                idle: Mutex::new(report),
                reads: AtomicUsize::new(0),
                writes: Mutex::new(Vec::new()),
                feature_requests: Mutex::new(Vec::new()),
                open_count: AtomicUsize::new(0),
                close_count: AtomicUsize::new(0),
                fail_open: AtomicBool::new(false),
                fail_feature_reports: AtomicBool::new(false),
                read_delay_ms: AtomicU64::new(0),
            }),
        }
    }

    pub fn usb() -> Self {
        Self::idling_on(usb_report())
    }

    pub fn bluetooth() -> Self {
        Self::idling_on(bluetooth_report())
    }
}

impl Device for MockDevice {
    fn vendor_id(&self) -> u16 {
        VENDOR_ID
    }

    fn product_id(&self) -> u16 {
        PRODUCT_ID
    }

    fn path(&self) -> String {
        "mock://dualshock".to_string()
    }

    fn release(&self) -> u16 {
        0x0100
    }

    fn serial(&self) -> String {
        "00:11:22:33:44:55".to_string()
    }

    fn manufacturer(&self) -> String {
        "Sony Interactive Entertainment".to_string()
    }

    fn product(&self) -> String {
        "Wireless Controller".to_string()
    }

    fn open(&self) -> Result<(), TransportError> {
        if self.state.fail_open.load(Ordering::SeqCst) {
            return Err(TransportError::Io("permission denied".to_string()));
        }
        self.state.open_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) -> Result<(), TransportError> {
        if !self.state.is_open() {
            return Err(TransportError::NotOpen);
        }
        self.state.close_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        self.state.reads.fetch_add(1, Ordering::SeqCst);
        let delay = self.state.read_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay));
        }
        let step = self.state.script.lock().pop_front();
        let report = match step {
            Some(Step::Report(report)) => {
                *self.state.idle.lock() = report.clone();
                report
            }
            Some(Step::Fail(message)) => return Err(TransportError::Io(message)),
            None => {
                // Keep an idle loop from spinning
                std::thread::sleep(Duration::from_millis(1));
                self.state.idle.lock().clone()
            }
        };
        let len = report.len().min(buf.len());
        buf[..len].copy_from_slice(&report[..len]);
        Ok(len)
    }

    fn write(&self, buf: &[u8]) -> Result<usize, TransportError> {
        if !self.state.is_open() {
            return Err(TransportError::NotOpen);
        }
        self.state.writes.lock().push(buf.to_vec());
        Ok(buf.len())
    }

    fn get_feature_report(&self, code: u8) -> Result<Vec<u8>, TransportError> {
        self.state.feature_requests.lock().push(code);
        if self.state.fail_feature_reports.load(Ordering::SeqCst) {
            return Err(TransportError::Io("feature report rejected".to_string()));
        }
        Ok(vec![code; 37])
    }
}
