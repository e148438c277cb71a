//! Driver trait for abstracting live-channel I/O.
//!
//! The [`Driver`] trait decouples the room runtime from a specific transport.
//! The client crate implements it over a Socket.IO WebSocket; the harness
//! implements it over in-memory channels.

use std::future::Future;

use duckchat_core::TransportEvent;
use duckchat_proto::Event;

/// Performs a room's live-channel I/O.
///
/// Implementations report everything the transport does (handshake
/// completion, inbound events, drops, reconnects, failure) through
/// [`Driver::recv`] as [`TransportEvent`]s. The runtime feeds those to the
/// connection state machine in order.
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Start connecting to `endpoint`.
    ///
    /// Returning `Ok` does not mean the channel is usable; that is reported
    /// later as [`TransportEvent::Opened`].
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is rejected before any I/O, for
    /// example a malformed URL.
    fn connect(&mut self, endpoint: &str) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Send an event to the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport is gone. The drop itself is reported
    /// through [`Driver::recv`].
    fn send_event(&mut self, event: Event) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Next transport report. `None` once the transport is closed for good.
    fn recv(&mut self) -> impl Future<Output = Option<TransportEvent>> + Send;

    /// Close the transport and release its resources. Idempotent.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}
