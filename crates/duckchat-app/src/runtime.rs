//! Generic runtime for one open room.
//!
//! The runtime drives a [`ChatRoom`] with a [`Driver`] and a
//! [`HistoryLoader`]. One task, one room, no locks. Each loop iteration races
//! three sources with `tokio::select!`:
//!
//! - the in-flight history load, if any
//! - the next transport report
//! - the next UI command
//!
//! Whichever resolves first is fed to the room, then the room's pending
//! connection actions are executed on the driver.

use std::future::Future;

use duckchat_core::{
    ConnectionAction, ConnectionError, Environment, HistoryLoader, Room, SessionStatus,
    TransportEvent, UserIdentity,
};
use tokio::sync::mpsc;

use crate::{ChatRoom, Driver, HistoryTicket, RoomCommand, RoomUpdate, RuntimeError};

/// Generic runtime that orchestrates a room, a driver, and a history loader.
///
/// # Type Parameters
///
/// - `D`: live-channel driver
/// - `H`: history loader
/// - `E`: environment for message id generation
pub struct Runtime<D, H, E>
where
    D: Driver,
    H: HistoryLoader,
    E: Environment,
{
    driver: D,
    history: H,
    room: ChatRoom<E>,
    endpoint: String,
}

impl<D, H, E> Runtime<D, H, E>
where
    D: Driver,
    H: HistoryLoader,
    E: Environment,
{
    /// Create a runtime for `room`, to be joined as `identity`.
    pub fn new(
        driver: D,
        history: H,
        env: E,
        room: Room,
        identity: UserIdentity,
        endpoint: impl Into<String>,
    ) -> Self {
        Self { driver, history, room: ChatRoom::new(env, room, identity), endpoint: endpoint.into() }
    }

    /// The room being driven.
    pub fn room(&self) -> &ChatRoom<E> {
        &self.room
    }

    /// Run the room until it is left.
    ///
    /// Connects the live channel and fetches the backlog in parallel. Stream
    /// appends, connection transitions, and status changes are pushed to
    /// `updates`. The room is left on [`RoomCommand::Leave`], when `commands`
    /// closes, or when the transport closes.
    ///
    /// # Errors
    ///
    /// - `RuntimeError::Connection` if the live channel is unreachable or
    ///   gives up reconnecting
    pub async fn run(
        self,
        mut commands: mpsc::Receiver<RoomCommand>,
        updates: mpsc::UnboundedSender<RoomUpdate>,
    ) -> Result<(), RuntimeError> {
        let Self { mut driver, history, mut room, endpoint } = self;

        let tx = updates.clone();
        room.subscribe(move |event| {
            let _ = tx.send(RoomUpdate::Stream(event.clone()));
        });
        let tx = updates.clone();
        room.on_connection_change(move |change| {
            let _ = tx.send(RoomUpdate::Connection(change));
        });

        let room_id = room.room().id.clone();
        let mut status = room.status();

        room.open(&endpoint)?;
        let mut pending = Some((room.begin_history(), Box::pin(history.load(&room_id))));
        execute(&mut driver, &mut room).await?;
        report_status(&room, &mut status, &updates);

        loop {
            tokio::select! {
                (ticket, result) = resolve(&mut pending), if pending.is_some() => {
                    room.history_resolved(ticket, result);
                },

                event = driver.recv() => {
                    let Some(event) = event else {
                        tracing::info!(room = %room_id, "transport closed");
                        room.handle_transport(TransportEvent::Closed)?;
                        room.leave();
                        execute(&mut driver, &mut room).await?;
                        report_status(&room, &mut status, &updates);
                        break;
                    };
                    room.handle_transport(event)?;
                },

                command = commands.recv() => match command {
                    Some(RoomCommand::Send(body)) => {
                        if let Err(e) = room.send(&body) {
                            tracing::debug!(room = %room_id, error = %e, "send rejected");
                            let _ = updates.send(RoomUpdate::SendFailed { reason: e.to_string() });
                        }
                    },
                    Some(RoomCommand::RefreshHistory) => {
                        pending = Some((room.begin_history(), Box::pin(history.load(&room_id))));
                    },
                    Some(RoomCommand::Leave) | None => {
                        room.leave();
                        execute(&mut driver, &mut room).await?;
                        report_status(&room, &mut status, &updates);
                        break;
                    },
                },
            }

            execute(&mut driver, &mut room).await?;
            report_status(&room, &mut status, &updates);
        }

        Ok(())
    }
}

/// Await the in-flight load and clear the slot.
async fn resolve<F: Future + Unpin>(slot: &mut Option<(HistoryTicket, F)>) -> (HistoryTicket, F::Output) {
    match slot {
        Some((ticket, load)) => {
            let ticket = *ticket;
            let result = load.await;
            *slot = None;
            (ticket, result)
        },
        None => std::future::pending().await,
    }
}

/// Execute the room's pending connection actions on the driver.
///
/// A driver that fails to connect is reported back to the room as a
/// transport failure.
async fn execute<D: Driver, E: Environment>(
    driver: &mut D,
    room: &mut ChatRoom<E>,
) -> Result<(), ConnectionError> {
    loop {
        let actions = room.take_outgoing();
        if actions.is_empty() {
            return Ok(());
        }

        for action in actions {
            match action {
                ConnectionAction::Open { endpoint } => {
                    if let Err(e) = driver.connect(&endpoint).await {
                        room.handle_transport(TransportEvent::Failed { reason: e.to_string() })?;
                    }
                },
                ConnectionAction::Transmit(event) => {
                    let name = event.name();
                    if let Err(e) = driver.send_event(event).await {
                        tracing::warn!(event = name, error = %e, "transmit failed");
                    }
                },
                ConnectionAction::Close => driver.close().await,
            }
        }
    }
}

fn report_status<E: Environment>(
    room: &ChatRoom<E>,
    last: &mut SessionStatus,
    updates: &mpsc::UnboundedSender<RoomUpdate>,
) {
    let status = room.status();
    if status != *last {
        *last = status;
        let _ = updates.send(RoomUpdate::Status(status));
    }
}
