//! Reconnect and state reconciliation.
//!
//! Tracks, per open room, the last server-assigned sequence the client holds,
//! the message ids it has already applied, and the optimistic (locally created,
//! not yet confirmed) messages keyed by their correlation id.
//!
//! On reconnect the session asks this module for a plan: which rooms to
//! re-join and from which sequence to request replay. Until a room has been
//! re-joined and its gap requested, the room is marked stale so the UI can
//! flag a possibly incomplete history instead of silently presenting it as
//! complete. Replayed and retried deliveries are de-duplicated by message id,
//! so receiving the same event twice never duplicates it in the view.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

const BACKOFF_BASE_SECS: u64 = 1;
const BACKOFF_CAP_SECS: u64 = 30;

/// Exponential backoff schedule for reconnect attempts.
///
/// 1s, 2s, 4s, … capped at [`BACKOFF_CAP_SECS`].
pub fn next_backoff(attempt: u32) -> Duration {
    // 2^5 already exceeds the cap, so larger attempts need no larger shift
    let exp = attempt.min(5);
    let secs = (BACKOFF_BASE_SECS << exp).min(BACKOFF_CAP_SECS);
    Duration::from_secs(secs)
}

/// State of an optimistic local message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimisticState {
    /// Sent, waiting for the confirmed event
    Pending,
    /// The server reported a failure; kept visible for manual retry
    Failed,
}

/// A locally created message awaiting server confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimisticMessage {
    pub correlation_id: String,
    pub room_id: String,
    pub content: String,
    pub state: OptimisticState,
}

/// Outcome of applying a delivered event to the reconciled view.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// First time this message id was seen
    New {
        /// Correlation id of the optimistic entry this delivery confirmed, if any
        confirmed_correlation: Option<String>,
    },
    /// The same message id was applied before (transport retry or replay overlap)
    Duplicate,
}

/// A re-join plus gap-fetch request for one room.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayRequest {
    pub room_id: String,
    /// Last sequence the client holds; the server replays everything after it
    pub since: u64,
}

#[derive(Debug, Default)]
struct RoomLedger {
    last_sequence: u64,
    last_message_id: Option<String>,
    seen: HashSet<String>,
    stale: bool,
}

/// Client-side reconciliation state across connections.
#[derive(Debug, Default)]
pub struct ReconnectReconciler {
    rooms: HashMap<String, RoomLedger>,
    pending: HashMap<String, OptimisticMessage>,
}

impl ReconnectReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a room the user has opened.
    pub fn track_room(&mut self, room_id: &str) {
        self.rooms.entry(room_id.to_string()).or_default();
    }

    /// Stop tracking a room (explicit leave).
    pub fn forget_room(&mut self, room_id: &str) {
        self.rooms.remove(room_id);
    }

    /// Rooms currently tracked, sorted for stable display.
    pub fn open_rooms(&self) -> Vec<String> {
        let mut rooms: Vec<String> = self.rooms.keys().cloned().collect();
        rooms.sort();
        rooms
    }

    pub fn is_tracking(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Record an optimistic send before the server confirms it.
    pub fn record_send(&mut self, room_id: &str, correlation_id: &str, content: &str) {
        self.pending.insert(
            correlation_id.to_string(),
            OptimisticMessage {
                correlation_id: correlation_id.to_string(),
                room_id: room_id.to_string(),
                content: content.to_string(),
                state: OptimisticState::Pending,
            },
        );
    }

    /// Mark an optimistic send as failed.
    ///
    /// The entry stays visible so the user can retry it manually; it is never
    /// silently dropped or silently retried.
    pub fn mark_send_failed(&mut self, correlation_id: &str) -> bool {
        match self.pending.get_mut(correlation_id) {
            Some(message) => {
                message.state = OptimisticState::Failed;
                true
            }
            None => false,
        }
    }

    /// Flip a failed entry back to pending for a manual retry with the same
    /// correlation id.
    pub fn mark_retrying(&mut self, correlation_id: &str) -> Option<OptimisticMessage> {
        let message = self.pending.get_mut(correlation_id)?;
        if message.state != OptimisticState::Failed {
            return None;
        }
        message.state = OptimisticState::Pending;
        Some(message.clone())
    }

    /// Optimistic entries currently marked failed, oldest correlation first.
    pub fn failed_sends(&self) -> Vec<OptimisticMessage> {
        let mut failed: Vec<OptimisticMessage> = self
            .pending
            .values()
            .filter(|message| message.state == OptimisticState::Failed)
            .cloned()
            .collect();
        failed.sort_by(|a, b| a.correlation_id.cmp(&b.correlation_id));
        failed
    }

    /// Apply a delivered event to the reconciled view.
    ///
    /// De-duplicates by message id, advances the room's sequence cursor, and
    /// discards the matching optimistic entry when the delivery carries one of
    /// our correlation ids.
    pub fn apply_delivered(
        &mut self,
        room_id: &str,
        message_id: &str,
        sequence: u64,
        correlation_id: Option<&str>,
    ) -> ApplyOutcome {
        // A sender ack can arrive for a room the user never opened; track it
        // so the sequence cursor stays correct if the room is opened later.
        let ledger = self.rooms.entry(room_id.to_string()).or_default();

        if !ledger.seen.insert(message_id.to_string()) {
            return ApplyOutcome::Duplicate;
        }

        if sequence > ledger.last_sequence {
            ledger.last_sequence = sequence;
            ledger.last_message_id = Some(message_id.to_string());
        }

        let confirmed_correlation = correlation_id
            .and_then(|correlation| self.pending.remove(correlation))
            .map(|message| message.correlation_id);

        ApplyOutcome::New {
            confirmed_correlation,
        }
    }

    /// Last sequence held for a room (0 when nothing was received yet).
    pub fn last_sequence(&self, room_id: &str) -> u64 {
        self.rooms
            .get(room_id)
            .map(|ledger| ledger.last_sequence)
            .unwrap_or(0)
    }

    /// Message id of the newest applied event in a room.
    pub fn last_message_id(&self, room_id: &str) -> Option<String> {
        self.rooms
            .get(room_id)
            .and_then(|ledger| ledger.last_message_id.clone())
    }

    /// Note a transport loss: every tracked room becomes stale until it has
    /// been re-joined and its gap requested.
    pub fn on_disconnect(&mut self) {
        for ledger in self.rooms.values_mut() {
            ledger.stale = true;
        }
    }

    /// Rooms to re-join and replay on reconnect, sorted for stable order.
    pub fn reconnect_plan(&self) -> Vec<ReplayRequest> {
        let mut plan: Vec<ReplayRequest> = self
            .rooms
            .iter()
            .map(|(room_id, ledger)| ReplayRequest {
                room_id: room_id.clone(),
                since: ledger.last_sequence,
            })
            .collect();
        plan.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        plan
    }

    /// Clear the staleness flag once a room has been re-joined and its gap
    /// requested.
    pub fn mark_reconciled(&mut self, room_id: &str) {
        if let Some(ledger) = self.rooms.get_mut(room_id) {
            ledger.stale = false;
        }
    }

    /// Whether a room's view may be missing events.
    pub fn is_stale(&self, room_id: &str) -> bool {
        self.rooms
            .get(room_id)
            .map(|ledger| ledger.stale)
            .unwrap_or(false)
    }
}
