//! Controller Handle - Session lifecycle for one DualShock 4
//!
//! Owns the device transport, the persistent output report and the background
//! read loop. Lifecycle:
//!
//! ```text
//! Disconnected ──connect──► Connecting ──► Connected ──listen──► Listening
//!      ▲                        │              ▲                     │
//!      │                  (classify fails)     └──── loop exits ─────┘
//!      └───────── Disconnecting ◄──disconnect── (Connected / Listening)
//! ```
//!
//! Session state (connection type, output report, listener) sits behind one
//! reader/writer lock. Handler registration goes through a separate
//! [`EventTable`] so it never waits on device I/O.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::connection::{classify, ConnectionType, DEFAULT_CLASSIFICATION_READS};
use super::event::{Event, EventData};
use super::event_collector::ReportCollector;
use super::event_processor::{EventTable, HandlerError};
use super::output::{Field, OutputReport};
use super::state::STICK_SMOOTHING;
use crate::hid::{Device, TransportError, FEATURE_REPORT_CALIBRATION};
use crate::led::Led;
use crate::rumble::Rumble;

/// Tunables for a controller session
///
/// # Examples
///
/// ```rust
/// use dualshock::controller::ControllerSettings;
///
/// let settings = ControllerSettings {
///     stick_smoothing: 2,
///     ..ControllerSettings::default()
/// };
/// assert_eq!(settings.classification_reads, 100);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    /// Input reads discarded while detecting USB vs Bluetooth
    pub classification_reads: usize,

    /// Minimum per-axis stick movement before a new position is reported
    pub stick_smoothing: u8,

    /// Transport read timeout; lets the read loop notice a stop request
    pub read_timeout_ms: i32,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            classification_reads: DEFAULT_CLASSIFICATION_READS,
            stick_smoothing: STICK_SMOOTHING,
            read_timeout_ms: 100,
        }
    }
}

/// Operation called in the wrong lifecycle state. Rejected without side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("controller is already connected")]
    AlreadyConnected,

    #[error("controller is not connected")]
    NotConnected,

    #[error("controller is already listening for events")]
    AlreadyListening,
}

/// Errors that can occur during a controller session
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// Transport open/read/write/feature report failure; ends the session
    #[error("Connectivity error: {0}")]
    Connectivity(#[from] TransportError),

    /// Connection type could not be determined; connect fails
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("State error: {0}")]
    State(#[from] StateError),

    /// A registered handler failed; ends the read loop
    #[error("Handler for {event} failed: {source}")]
    Handler { event: Event, source: HandlerError },

    /// Output patch aimed outside the actuator bytes
    #[error("Output position {0} is not an actuator byte")]
    ReservedPosition(usize),

    /// The read loop task died without reporting an outcome
    #[error("Read loop error: {0}")]
    TaskError(String),
}

struct Listener {
    id: u64,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

struct Connection {
    kind: ConnectionType,
    output: OutputReport,
    listener: Option<Listener>,
}

enum Session {
    Disconnected,
    Connecting,
    Connected(Connection),
    Disconnecting,
}

struct Shared {
    device: Arc<dyn Device>,
    settings: ControllerSettings,
    session: RwLock<Session>,
    handlers: Arc<EventTable>,
    next_listener_id: AtomicU64,
}

// Puts a Connecting session back to Disconnected unless the attempt settled it
struct ConnectAttempt<'a> {
    shared: &'a Shared,
    settled: bool,
}

impl Drop for ConnectAttempt<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("Connect attempt aborted, resetting session");
            *self.shared.session.write() = Session::Disconnected;
        }
    }
}

impl Shared {
    // Blocking part of connect; always leaves the session Connected or Disconnected
    fn complete_connect(&self) -> Result<(), ControllerError> {
        let mut attempt = ConnectAttempt {
            shared: self,
            settled: false,
        };
        let result = open_and_classify(self.device.as_ref(), self.settings.classification_reads);

        let mut session = self.session.write();
        attempt.settled = true;
        match result {
            Ok(kind) => {
                *session = Session::Connected(Connection {
                    kind,
                    output: OutputReport::new(kind),
                    listener: None,
                });
                info!("Connected over {}", kind);
                Ok(())
            }
            Err(e) => {
                *session = Session::Disconnected;
                error!("Failed to connect: {}", e);
                Err(e)
            }
        }
    }

    // Runs on its own task so a dropped disconnect future can't strand the session
    async fn complete_disconnect(
        self: Arc<Self>,
        listener: Option<Listener>,
    ) -> Result<(), ControllerError> {
        if let Some(listener) = listener {
            info!("Stopping read loop before disconnect");
            listener.cancel.cancel();
            if let Err(e) = listener.task.await {
                warn!("Read loop task ended abnormally: {}", e);
            }
        }

        let closed = self.device.close();
        *self.session.write() = Session::Disconnected;
        match closed {
            Ok(()) => {
                info!("Disconnected");
                Ok(())
            }
            Err(e) => {
                error!("Failed to close device: {}", e);
                Err(e.into())
            }
        }
    }

    // Called by the loop task once the read loop returned
    fn finish_listening(&self, id: u64) {
        let mut session = self.session.write();
        if let Session::Connected(connection) = &mut *session {
            if connection.listener.as_ref().is_some_and(|l| l.id == id) {
                connection.listener = None;
                debug!("Listener {} released", id);
            }
        }
    }
}

/// One DualShock 4 and its session
///
/// Cheap to clone; clones share the same session, so one task can await
/// [`listen`](Self::listen) while another calls [`disconnect`](Self::disconnect).
#[derive(Clone)]
pub struct Controller {
    shared: Arc<Shared>,
}

impl Controller {
    pub fn new(device: impl Device + 'static) -> Self {
        Self::with_settings(device, ControllerSettings::default())
    }

    pub fn with_settings(device: impl Device + 'static, settings: ControllerSettings) -> Self {
        Self {
            shared: Arc::new(Shared {
                device: Arc::new(device),
                settings,
                session: RwLock::new(Session::Disconnected),
                handlers: Arc::new(EventTable::new()),
                next_listener_id: AtomicU64::new(1),
            }),
        }
    }

    /// Opens the device and detects how it is attached.
    ///
    /// Blocks a worker thread for the duration of the classification reads.
    ///
    /// # Errors
    ///
    /// * [`StateError::AlreadyConnected`] if a session exists or is being set up
    /// * [`ControllerError::Connectivity`] if the device can't be opened or read
    /// * [`ControllerError::Protocol`] if the connection type can't be detected
    pub async fn connect(&self) -> Result<(), ControllerError> {
        {
            let mut session = self.shared.session.write();
            if !matches!(*session, Session::Disconnected) {
                return Err(StateError::AlreadyConnected.into());
            }
            *session = Session::Connecting;
        }
        info!("Connecting to {}", self);

        // Runs to completion and settles the session even if this future is dropped
        let shared = Arc::clone(&self.shared);
        tokio::task::spawn_blocking(move || shared.complete_connect())
            .await
            .unwrap_or_else(|e| Err(ControllerError::TaskError(e.to_string())))
    }

    /// Stops the read loop if one is running, waits for it, then closes the device.
    ///
    /// Dropping the returned future does not abort the disconnect; it finishes
    /// in the background.
    pub async fn disconnect(&self) -> Result<(), ControllerError> {
        let listener = {
            let mut session = self.shared.session.write();
            match std::mem::replace(&mut *session, Session::Disconnecting) {
                Session::Connected(mut connection) => connection.listener.take(),
                other => {
                    *session = other;
                    return Err(StateError::NotConnected.into());
                }
            }
        };

        let shared = Arc::clone(&self.shared);
        tokio::spawn(shared.complete_disconnect(listener))
            .await
            .unwrap_or_else(|e| Err(ControllerError::TaskError(e.to_string())))
    }

    /// Runs the read loop until it stops and returns its outcome.
    ///
    /// Resolves with `Ok(())` after [`disconnect`](Self::disconnect), or with the
    /// error that ended the loop: a failed read or a failed handler.
    ///
    /// # Errors
    ///
    /// Rejected with [`StateError::NotConnected`] or
    /// [`StateError::AlreadyListening`] without touching a running loop.
    pub async fn listen(&self) -> Result<(), ControllerError> {
        let outcome = self.start_listening()?;
        outcome.await.unwrap_or_else(|_| {
            Err(ControllerError::TaskError(
                "read loop ended without reporting an outcome".to_string(),
            ))
        })
    }

    fn start_listening(
        &self,
    ) -> Result<oneshot::Receiver<Result<(), ControllerError>>, ControllerError> {
        let mut session = self.shared.session.write();
        let connection = match &mut *session {
            Session::Connected(connection) => connection,
            _ => return Err(StateError::NotConnected.into()),
        };
        if connection.listener.is_some() {
            warn!("Listen requested while already listening");
            return Err(StateError::AlreadyListening.into());
        }

        let id = self.shared.next_listener_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let (outcome_tx, outcome_rx) = oneshot::channel();

        let collector = ReportCollector::create(
            Arc::clone(&self.shared.device),
            Arc::clone(&self.shared.handlers),
            connection.kind.input_offset(),
            self.shared.settings.stick_smoothing,
        );
        let shared = Arc::clone(&self.shared);
        let token = cancel.clone();

        info!("Spawning read loop {}", id);
        let task = tokio::spawn(async move {
            let outcome = tokio::task::spawn_blocking(move || {
                let mut collector = collector.initialize();
                collector.run_collection_loop(&token)
            })
            .await
            .unwrap_or_else(|e| Err(ControllerError::TaskError(e.to_string())));

            match &outcome {
                Ok(()) => info!("Read loop {} stopped", id),
                Err(e) => error!("Read loop {} terminated with error: {}", id, e),
            }
            shared.finish_listening(id);

            if outcome_tx.send(outcome).is_err() {
                debug!("Nobody awaiting the outcome of read loop {}", id);
            }
        });

        connection.listener = Some(Listener { id, cancel, task });
        Ok(outcome_rx)
    }

    /// Registers `handler` for `event`, replacing any previous one.
    ///
    /// Takes effect from the next dispatch pass.
    pub fn on<F>(&self, event: Event, handler: F)
    where
        F: Fn(&EventData) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.shared.handlers.set(event, handler);
    }

    /// Removes the handler for `event`, if any.
    pub fn off(&self, event: Event) {
        self.shared.handlers.unset(event);
    }

    /// Sets both rumble motors.
    pub fn rumble(&self, rumble: &Rumble) -> Result<(), ControllerError> {
        debug!("Rumble left={} right={}", rumble.left(), rumble.right());
        self.write_fields(&[
            (Field::RumbleLeft, rumble.left()),
            (Field::RumbleRight, rumble.right()),
        ])
    }

    /// Sets the light bar color and flash timing.
    pub fn led(&self, led: &Led) -> Result<(), ControllerError> {
        debug!("LED {:?}", led);
        self.write_fields(&[
            (Field::LedRed, led.red()),
            (Field::LedGreen, led.green()),
            (Field::LedBlue, led.blue()),
            (Field::LedFlashOn, led.flash_on()),
            (Field::LedFlashOff, led.flash_off()),
        ])
    }

    /// Patches the persistent output report and sends it.
    pub fn write_fields(&self, fields: &[(Field, u8)]) -> Result<(), ControllerError> {
        let mut session = self.shared.session.write();
        let Session::Connected(connection) = &mut *session else {
            return Err(StateError::NotConnected.into());
        };
        let frame = connection.output.set(fields)?;
        let written = self.shared.device.write(frame)?;
        debug!("Wrote {} byte output report", written);
        Ok(())
    }

    /// [`ConnectionType::None`] unless connected
    pub fn connection_type(&self) -> ConnectionType {
        match &*self.shared.session.read() {
            Session::Connected(connection) => connection.kind,
            _ => ConnectionType::None,
        }
    }

    pub fn is_listening(&self) -> bool {
        match &*self.shared.session.read() {
            Session::Connected(connection) => connection.listener.is_some(),
            _ => false,
        }
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.shared.settings
    }

    pub fn vendor_id(&self) -> u16 {
        self.shared.device.vendor_id()
    }

    pub fn product_id(&self) -> u16 {
        self.shared.device.product_id()
    }

    pub fn name(&self) -> String {
        self.shared.device.product()
    }
}

impl fmt::Display for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (vendor: {}, product: {})",
            self.name(),
            self.vendor_id(),
            self.product_id()
        )
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("device", &self.to_string())
            .field("connection", &self.connection_type())
            .finish()
    }
}

fn open_and_classify(device: &dyn Device, reads: usize) -> Result<ConnectionType, ControllerError> {
    device.open()?;

    let kind = match classify(device, reads) {
        Ok(kind) => kind,
        Err(e) => {
            if let Err(close_err) = device.close() {
                warn!("Failed to close device after classification error: {}", close_err);
            }
            return Err(e);
        }
    };

    // Bluetooth only sends full input reports after the calibration query
    if kind == ConnectionType::Bluetooth {
        if let Err(e) = device.get_feature_report(FEATURE_REPORT_CALIBRATION) {
            if let Err(close_err) = device.close() {
                warn!("Failed to close device after calibration error: {}", close_err);
            }
            return Err(e.into());
        }
    }

    Ok(kind)
}
