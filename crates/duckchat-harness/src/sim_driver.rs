//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` provides the same interface as the Socket.IO driver but over
//! in-memory channels. Tests hold the paired [`SimController`]: they push
//! transport reports in and observe everything the runtime puts on the wire,
//! in order.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, PoisonError},
};

use duckchat_app::Driver;
use duckchat_core::TransportEvent;
use duckchat_proto::{Event, IncomingMessage};
use tokio::sync::mpsc;

/// Error type for simulation driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimDriverError(pub String);

impl std::fmt::Display for SimDriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimDriverError: {}", self.0)
    }
}

impl std::error::Error for SimDriverError {}

/// What [`Driver::connect`] does.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectBehavior {
    /// Report [`TransportEvent::Opened`] immediately.
    #[default]
    Open,
    /// Accept the call but report nothing; the test drives the handshake.
    Hold,
    /// Report [`TransportEvent::Failed`] with this reason.
    Unreachable(String),
    /// Return an error from `connect` itself.
    Reject(String),
}

/// Something the runtime did to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Wire {
    /// `connect` was called.
    Connect(String),
    /// An event was transmitted.
    Event(Event),
    /// `close` was called.
    Close,
}

/// Simulation driver for deterministic testing.
pub struct SimDriver {
    behavior: Arc<Mutex<ConnectBehavior>>,
    queued: VecDeque<TransportEvent>,
    reports: mpsc::UnboundedReceiver<TransportEvent>,
    wire: mpsc::UnboundedSender<Wire>,
    connected: bool,
}

/// Test-side handle of a [`SimDriver`].
///
/// Dropping the controller closes the transport: once queued reports are
/// drained, [`Driver::recv`] returns `None`.
pub struct SimController {
    behavior: Arc<Mutex<ConnectBehavior>>,
    reports: mpsc::UnboundedSender<TransportEvent>,
    wire: mpsc::UnboundedReceiver<Wire>,
}

impl SimDriver {
    /// Create a driver and its controller.
    pub fn new() -> (Self, SimController) {
        let behavior = Arc::new(Mutex::new(ConnectBehavior::default()));
        let (reports_tx, reports_rx) = mpsc::unbounded_channel();
        let (wire_tx, wire_rx) = mpsc::unbounded_channel();

        let driver = Self {
            behavior: Arc::clone(&behavior),
            queued: VecDeque::new(),
            reports: reports_rx,
            wire: wire_tx,
            connected: false,
        };
        let controller = SimController { behavior, reports: reports_tx, wire: wire_rx };

        (driver, controller)
    }

    fn record(&self, wire: Wire) {
        // The controller may be gone; the runtime still runs to completion.
        let _ = self.wire.send(wire);
    }
}

impl SimController {
    /// Set what the next `connect` call does.
    pub fn set_connect_behavior(&self, behavior: ConnectBehavior) {
        *self.behavior.lock().unwrap_or_else(PoisonError::into_inner) = behavior;
    }

    /// Push a transport report.
    pub fn push(&self, event: TransportEvent) {
        let _ = self.reports.send(event);
    }

    /// Deliver an inbound `messageReceived` event.
    pub fn deliver(&self, message: IncomingMessage) {
        self.push(TransportEvent::Inbound(Event::MessageReceived(message)));
    }

    /// Complete a held handshake.
    pub fn open(&self) {
        self.push(TransportEvent::Opened);
    }

    /// Drop the channel, then restore it.
    pub fn bounce(&self, reason: &str) {
        self.push(TransportEvent::Lost { reason: reason.to_string() });
        self.push(TransportEvent::Reconnected);
    }

    /// Next thing the runtime did on the wire. `None` once the driver is
    /// dropped and everything has been observed.
    pub async fn next_wire(&mut self) -> Option<Wire> {
        self.wire.recv().await
    }

    /// Next transmitted event, skipping connects and closes.
    pub async fn next_event(&mut self) -> Option<Event> {
        loop {
            if let Wire::Event(event) = self.wire.recv().await? {
                return Some(event);
            }
        }
    }

    /// Everything already put on the wire, without waiting.
    pub fn drain_wire(&mut self) -> Vec<Wire> {
        let mut seen = Vec::new();
        while let Ok(wire) = self.wire.try_recv() {
            seen.push(wire);
        }
        seen
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;

    async fn connect(&mut self, endpoint: &str) -> Result<(), SimDriverError> {
        self.record(Wire::Connect(endpoint.to_string()));

        let behavior = self.behavior.lock().unwrap_or_else(PoisonError::into_inner).clone();
        tracing::debug!(endpoint, ?behavior, "sim connect");

        match behavior {
            ConnectBehavior::Open => {
                self.connected = true;
                self.queued.push_back(TransportEvent::Opened);
            },
            ConnectBehavior::Hold => self.connected = true,
            ConnectBehavior::Unreachable(reason) => {
                self.queued.push_back(TransportEvent::Failed { reason });
            },
            ConnectBehavior::Reject(reason) => return Err(SimDriverError(reason)),
        }
        Ok(())
    }

    async fn send_event(&mut self, event: Event) -> Result<(), SimDriverError> {
        if !self.connected {
            return Err(SimDriverError(format!("{} while not connected", event.name())));
        }
        self.record(Wire::Event(event));
        Ok(())
    }

    async fn recv(&mut self) -> Option<TransportEvent> {
        if let Some(event) = self.queued.pop_front() {
            return Some(event);
        }
        self.reports.recv().await
    }

    async fn close(&mut self) {
        if self.connected {
            self.connected = false;
            self.record(Wire::Close);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leave() -> Event {
        Event::LeaveGroup { room_name: "lobby".into() }
    }

    #[tokio::test]
    async fn open_behavior_reports_opened() {
        let (mut driver, mut controller) = SimDriver::new();

        driver.connect("ws://sim").await.unwrap();
        assert_eq!(driver.recv().await, Some(TransportEvent::Opened));
        assert_eq!(controller.next_wire().await, Some(Wire::Connect("ws://sim".into())));
    }

    #[tokio::test]
    async fn unreachable_behavior_reports_failed() {
        let (mut driver, controller) = SimDriver::new();
        controller.set_connect_behavior(ConnectBehavior::Unreachable("refused".into()));

        driver.connect("ws://sim").await.unwrap();
        assert_eq!(driver.recv().await, Some(TransportEvent::Failed { reason: "refused".into() }));
    }

    #[tokio::test]
    async fn reject_behavior_errors() {
        let (mut driver, controller) = SimDriver::new();
        controller.set_connect_behavior(ConnectBehavior::Reject("bad url".into()));

        assert_eq!(driver.connect("nope").await, Err(SimDriverError("bad url".into())));
    }

    #[tokio::test]
    async fn send_requires_connect() {
        let (mut driver, mut controller) = SimDriver::new();
        assert!(driver.send_event(leave()).await.is_err());

        driver.connect("ws://sim").await.unwrap();
        driver.send_event(leave()).await.unwrap();
        assert_eq!(controller.next_event().await, Some(leave()));
    }

    #[tokio::test]
    async fn close_is_recorded_once() {
        let (mut driver, mut controller) = SimDriver::new();
        driver.connect("ws://sim").await.unwrap();
        driver.close().await;
        driver.close().await;

        assert_eq!(controller.drain_wire(), vec![Wire::Connect("ws://sim".into()), Wire::Close]);
    }

    #[tokio::test]
    async fn dropped_controller_closes_transport() {
        let (mut driver, controller) = SimDriver::new();
        controller.bounce("reset");
        drop(controller);

        assert!(matches!(driver.recv().await, Some(TransportEvent::Lost { .. })));
        assert_eq!(driver.recv().await, Some(TransportEvent::Reconnected));
        assert_eq!(driver.recv().await, None);
    }
}
