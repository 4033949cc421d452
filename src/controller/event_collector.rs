use std::sync::Arc;

use chrono::Local;
use statum::{machine, state};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use super::controller_handle::ControllerError;
use super::event_processor::{dispatch, EventTable};
use super::state::{Snapshot, INPUT_REPORT_SIZE};
use crate::hid::Device;

// Define collector states using statum's state macro
#[state]
#[derive(Debug, Clone)]
pub enum CollectionState {
    Initializing,
    Collecting,
}

/// Blocking read loop for one listening session
///
/// Reads input reports, decodes them against the previous snapshot and hands
/// every transition to the registered handlers.
#[machine]
pub struct ReportCollector<S: CollectionState> {
    // Shared transport, also used by the session for writes
    device: Arc<dyn Device>,

    // Handler table, snapshotted once per report
    handlers: Arc<EventTable>,

    // 0 over USB, 2 over Bluetooth
    input_offset: usize,

    stick_smoothing: u8,

    // Raw report buffer, reused for every read
    report: [u8; INPUT_REPORT_SIZE],

    // Snapshot of the last dispatched report
    previous: Snapshot,
}

impl ReportCollector<Initializing> {
    pub fn create(
        device: Arc<dyn Device>,
        handlers: Arc<EventTable>,
        input_offset: usize,
        stick_smoothing: u8,
    ) -> Self {
        debug!(
            "Creating ReportCollector (input offset {}, stick smoothing {})",
            input_offset, stick_smoothing
        );
        Self::new(
            device,
            handlers,
            input_offset,
            stick_smoothing,
            [0u8; INPUT_REPORT_SIZE],
            // Nothing is reported for a controller sitting at rest
            Snapshot::neutral(),
        )
    }

    // Transition to Collecting state
    pub fn initialize(self) -> ReportCollector<Collecting> {
        info!("ReportCollector initialized, transitioning to Collecting state");
        self.transition()
    }
}

impl ReportCollector<Collecting> {
    /// Reads and dispatches one report.
    ///
    /// Returns `Ok(false)` when the transport had nothing to deliver.
    pub fn collect_next_report(&mut self) -> Result<bool, ControllerError> {
        let len = self.device.read(&mut self.report)?;
        if len == 0 {
            return Ok(false);
        }

        let current = Snapshot::decode_smoothed(
            &self.report,
            self.input_offset,
            Some(&self.previous),
            self.stick_smoothing,
        );
        if current != self.previous {
            trace!("Report changed: {:?}", current);
            let handlers = self.handlers.snapshot();
            dispatch(&current, &self.previous, &handlers)?;
        }
        self.previous = current;
        Ok(true)
    }

    /// Runs until `cancel` fires (`Ok`) or a read or handler fails (`Err`).
    pub fn run_collection_loop(&mut self, cancel: &CancellationToken) -> Result<(), ControllerError> {
        info!("Starting ReportCollector loop");

        // For performance monitoring
        let mut report_count: u64 = 0;
        let mut last_log_time = Local::now();
        let log_interval = chrono::Duration::seconds(10);

        while !cancel.is_cancelled() {
            match self.collect_next_report() {
                Ok(true) => report_count += 1,
                Ok(false) => {}
                Err(e) => {
                    error!("Error collecting report: {}", e);
                    return Err(e);
                }
            }

            let now = Local::now();
            if now - last_log_time > log_interval {
                info!(
                    "ReportCollector stats: processed {} reports in last {} seconds (avg {:.2}/sec)",
                    report_count,
                    log_interval.num_seconds(),
                    report_count as f64 / log_interval.num_seconds() as f64
                );
                report_count = 0;
                last_log_time = now;
            }
        }

        info!("ReportCollector loop cancelled");
        Ok(())
    }
}
