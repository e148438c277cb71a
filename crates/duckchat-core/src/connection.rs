//! Live-channel connection state machine.
//!
//! Owns the lifecycle of one persistent connection. Uses the action pattern:
//! methods return [`ConnectionAction`]s for the driver to execute, and the
//! driver reports what the transport did back as [`TransportEvent`]s. No I/O
//! happens here.
//!
//! # State Machine
//!
//! ```text
//! ┌──────────────┐ connect ┌────────────┐ Opened ┌───────────┐
//! │ Disconnected │────────>│ Connecting │───────>│ Connected │<──┐
//! └──────────────┘         └────────────┘        └───────────┘   │
//!        ▲                       │                     │ Lost    │ Reconnected
//!        │ Failed/Closed/        │                     ↓         │
//!        │ disconnect            │              ┌──────────────┐ │
//!        └───────────────────────┴──────────────│ Reconnecting │─┘
//!                                               └──────────────┘
//! ```
//!
//! `disconnect()` and transport failure reach `Disconnected` from any state.

use duckchat_proto::Event;

use crate::error::ConnectionError;

/// Connection state. Sends are permitted only in [`ConnectionState::Connected`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No transport. Initial and terminal state.
    #[default]
    Disconnected,
    /// Transport opening, handshake not yet complete.
    Connecting,
    /// Handshake complete, events flow both ways.
    Connected,
    /// Transport dropped and is retrying on its own.
    Reconnecting,
}

/// One observed state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    /// State before the transition.
    pub from: ConnectionState,
    /// State after the transition.
    pub to: ConnectionState,
}

/// What the transport reports back to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Transport and protocol handshakes completed.
    Opened,
    /// Event pushed by the server.
    Inbound(Event),
    /// Transport dropped. The transport is retrying.
    Lost {
        /// Why the transport dropped.
        reason: String,
    },
    /// A retry succeeded after [`TransportEvent::Lost`].
    Reconnected,
    /// Transport gave up: unreachable, or reconnect attempts exhausted.
    Failed {
        /// Why the transport gave up.
        reason: String,
    },
    /// Transport closed cleanly.
    Closed,
}

/// Actions returned by the connection state machine.
///
/// The driver executes these:
/// - `Open`: connect the transport to `endpoint`
/// - `Transmit`: encode and send the event
/// - `Close`: shut the transport down
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionAction {
    /// Open the transport.
    Open {
        /// Opaque endpoint URL.
        endpoint: String,
    },
    /// Send this event to the server.
    Transmit(Event),
    /// Close the transport.
    Close,
}

type StateHandler = Box<dyn FnMut(StateChange) + Send>;

/// Connection state machine.
///
/// Pure: holds no socket. One per open room.
#[derive(Default)]
pub struct ConnectionManager {
    state: ConnectionState,
    endpoint: Option<String>,
    on_change: Option<StateHandler>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("state", &self.state)
            .field("endpoint", &self.endpoint)
            .field("on_change", &self.on_change.is_some())
            .finish()
    }
}

impl ConnectionManager {
    /// Create a manager in [`ConnectionState::Disconnected`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Endpoint of the last `connect()`. `None` before the first one.
    #[must_use]
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Register the state-change handler, replacing any previous one.
    ///
    /// Invoked synchronously on every transition, in transition order. A
    /// single slot means at most one handler fires per transition.
    pub fn on_state_change(&mut self, handler: impl FnMut(StateChange) + Send + 'static) {
        self.on_change = Some(Box::new(handler));
    }

    /// Begin connecting to `endpoint`.
    ///
    /// Transitions to `Connecting` and returns `Open`. The endpoint is not
    /// known to be reachable until the driver reports [`TransportEvent::Opened`].
    ///
    /// # Errors
    ///
    /// - `ConnectionError::InvalidState` if not `Disconnected`
    pub fn connect(
        &mut self,
        endpoint: impl Into<String>,
    ) -> Result<Vec<ConnectionAction>, ConnectionError> {
        if self.state != ConnectionState::Disconnected {
            return Err(ConnectionError::InvalidState { state: self.state, operation: "connect" });
        }

        let endpoint = endpoint.into();
        self.endpoint = Some(endpoint.clone());
        self.transition(ConnectionState::Connecting);

        Ok(vec![ConnectionAction::Open { endpoint }])
    }

    /// Process a transport report.
    ///
    /// Returns the inbound events to dispatch. Inbound events are only
    /// surfaced while `Connected`; anything that arrives in another state is a
    /// leftover from a torn-down transport and is dropped. Reports received
    /// after `disconnect()` are ignored.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::Unreachable` on [`TransportEvent::Failed`]. The
    ///   manager is `Disconnected` afterwards.
    pub fn handle(&mut self, event: TransportEvent) -> Result<Vec<Event>, ConnectionError> {
        use ConnectionState::{Connected, Connecting, Disconnected, Reconnecting};

        match (self.state, event) {
            (Disconnected, event) => {
                tracing::debug!(?event, "transport report after disconnect, ignoring");
                Ok(vec![])
            },

            (Connected, TransportEvent::Inbound(event)) => Ok(vec![event]),

            (state, TransportEvent::Inbound(event)) => {
                tracing::debug!(?state, event = event.name(), "inbound event while not connected");
                Ok(vec![])
            },

            (Connecting | Reconnecting, TransportEvent::Opened | TransportEvent::Reconnected) => {
                self.transition(Connected);
                Ok(vec![])
            },

            (Connected, TransportEvent::Lost { reason }) => {
                tracing::warn!(%reason, "live channel lost, transport reconnecting");
                self.transition(Reconnecting);
                Ok(vec![])
            },

            (_, TransportEvent::Failed { reason }) => {
                self.transition(Disconnected);
                Err(ConnectionError::Unreachable {
                    endpoint: self.endpoint.clone().unwrap_or_default(),
                    reason,
                })
            },

            (_, TransportEvent::Closed) => {
                self.transition(Disconnected);
                Ok(vec![])
            },

            (state, event) => {
                tracing::debug!(?state, ?event, "transport report has no effect");
                Ok(vec![])
            },
        }
    }

    /// Send an event. Fire-and-forget once connected.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::NotConnected` unless `Connected`
    pub fn send(&mut self, event: Event) -> Result<Vec<ConnectionAction>, ConnectionError> {
        if self.state != ConnectionState::Connected {
            return Err(ConnectionError::NotConnected { state: self.state });
        }

        Ok(vec![ConnectionAction::Transmit(event)])
    }

    /// Tear the connection down. Idempotent from any state.
    pub fn disconnect(&mut self) -> Vec<ConnectionAction> {
        if self.state == ConnectionState::Disconnected {
            return vec![];
        }

        self.transition(ConnectionState::Disconnected);
        vec![ConnectionAction::Close]
    }

    fn transition(&mut self, to: ConnectionState) {
        let from = self.state;
        if from == to {
            return;
        }

        self.state = to;
        tracing::debug!(?from, ?to, "connection state");

        if let Some(handler) = self.on_change.as_mut() {
            handler(StateChange { from, to });
        }
    }
}
