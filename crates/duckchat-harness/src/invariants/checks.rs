//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use std::collections::HashSet;

use duckchat_core::{ConnectionState, SessionStatus};

use super::{Invariant, InvariantResult, Timeline, Violation};

/// No message id appears twice in a stream.
pub struct UniqueMessageIds;

impl Invariant for UniqueMessageIds {
    fn name(&self) -> &'static str {
        "UniqueMessageIds"
    }

    fn check(&self, state: &Timeline) -> InvariantResult {
        for (step, snapshot) in state.snapshots.iter().enumerate() {
            let mut seen = HashSet::new();
            if let Some(dup) = snapshot.message_ids.iter().find(|id| !seen.insert(id.as_str())) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("step {step}: id {dup} appears twice"),
                });
            }
        }
        Ok(())
    }
}

/// The stream is append-only until teardown.
///
/// Each snapshot's ids are a prefix of the next snapshot's ids: nothing is
/// removed or reordered. A torn-down stream may be empty.
pub struct BufferNeverShrinks;

impl Invariant for BufferNeverShrinks {
    fn name(&self) -> &'static str {
        "BufferNeverShrinks"
    }

    fn check(&self, state: &Timeline) -> InvariantResult {
        for (step, window) in state.snapshots.windows(2).enumerate() {
            let (before, after) = (&window[0], &window[1]);
            if after.closed {
                continue;
            }
            if !after.message_ids.starts_with(&before.message_ids) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "step {}: {:?} is not an extension of {:?}",
                        step + 1,
                        after.message_ids,
                        before.message_ids
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Session status never goes backwards.
pub struct StatusMonotonicity;

impl Invariant for StatusMonotonicity {
    fn name(&self) -> &'static str {
        "StatusMonotonicity"
    }

    fn check(&self, state: &Timeline) -> InvariantResult {
        for (step, window) in state.snapshots.windows(2).enumerate() {
            if window[1].status < window[0].status {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "step {}: status went {:?} → {:?}",
                        step + 1,
                        window[0].status,
                        window[1].status
                    ),
                });
            }
        }
        Ok(())
    }
}

/// A send is accepted only while active and connected.
pub struct SendGating;

impl Invariant for SendGating {
    fn name(&self) -> &'static str {
        "SendGating"
    }

    fn check(&self, state: &Timeline) -> InvariantResult {
        let bad = state.sends.iter().find(|send| {
            send.accepted
                && (send.status != SessionStatus::Active
                    || send.connection != ConnectionState::Connected)
        });

        match bad {
            Some(send) => Err(Violation {
                invariant: self.name(),
                message: format!(
                    "send accepted in {:?} over {:?} channel",
                    send.status, send.connection
                ),
            }),
            None => Ok(()),
        }
    }
}

/// A left room is disconnected and holds no messages.
pub struct LeftIsQuiescent;

impl Invariant for LeftIsQuiescent {
    fn name(&self) -> &'static str {
        "LeftIsQuiescent"
    }

    fn check(&self, state: &Timeline) -> InvariantResult {
        for (step, snapshot) in state.snapshots.iter().enumerate() {
            if snapshot.status != SessionStatus::Left {
                continue;
            }
            if snapshot.connection != ConnectionState::Disconnected
                || !snapshot.message_ids.is_empty()
            {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "step {step}: left room is {:?} with {} messages",
                        snapshot.connection,
                        snapshot.message_ids.len()
                    ),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invariants::{RoomSnapshot, SendAttempt};

    fn snapshot(status: SessionStatus, ids: &[&str]) -> RoomSnapshot {
        RoomSnapshot {
            status,
            connection: ConnectionState::Connected,
            message_ids: ids.iter().map(ToString::to_string).collect(),
            closed: false,
        }
    }

    fn timeline(snapshots: Vec<RoomSnapshot>) -> Timeline {
        Timeline { snapshots, sends: Vec::new() }
    }

    #[test]
    fn duplicate_id_is_caught() {
        let state = timeline(vec![snapshot(SessionStatus::Active, &["a", "b", "a"])]);
        assert!(UniqueMessageIds.check(&state).is_err());
    }

    #[test]
    fn reordering_is_caught() {
        let state = timeline(vec![
            snapshot(SessionStatus::Active, &["a", "b"]),
            snapshot(SessionStatus::Active, &["b", "a"]),
        ]);
        assert!(BufferNeverShrinks.check(&state).is_err());
    }

    #[test]
    fn teardown_may_empty_the_buffer() {
        let mut closed = snapshot(SessionStatus::Left, &[]);
        closed.closed = true;
        let state = timeline(vec![snapshot(SessionStatus::Active, &["a"]), closed]);
        assert!(BufferNeverShrinks.check(&state).is_ok());
    }

    #[test]
    fn status_regression_is_caught() {
        let state = timeline(vec![
            snapshot(SessionStatus::Left, &[]),
            snapshot(SessionStatus::Active, &[]),
        ]);
        let violation = StatusMonotonicity.check(&state).unwrap_err();
        assert_eq!(violation.invariant, "StatusMonotonicity");
    }

    #[test]
    fn send_while_reconnecting_is_caught() {
        let state = Timeline {
            snapshots: Vec::new(),
            sends: vec![SendAttempt {
                status: SessionStatus::Active,
                connection: ConnectionState::Reconnecting,
                accepted: true,
            }],
        };
        assert!(SendGating.check(&state).is_err());
    }

    #[test]
    fn connected_left_room_is_caught() {
        let state = timeline(vec![snapshot(SessionStatus::Left, &[])]);
        assert!(LeftIsQuiescent.check(&state).is_err());
    }
}
