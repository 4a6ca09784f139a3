//! In-flight fetch tracking.
//!
//! At most one fetch cycle runs at a time. The state is checked and
//! updated under a single lock; every caller that arrives while a cycle is
//! `Fetching` subscribes to that cycle's broadcast and receives the same
//! outcome as the caller that started it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::Snapshot;

/// Result shared with every waiter of a cycle
pub type CycleOutcome = Result<Arc<Snapshot>, String>;

/// Fetch state machine
#[derive(Debug)]
pub enum FetchState {
    /// No cycle has run since construction or the last invalidation
    Idle,

    /// A cycle is running
    Fetching {
        cycle_id: Uuid,
        language: String,
        started_at: DateTime<Utc>,
        waiters: broadcast::Sender<CycleOutcome>,
    },

    /// The last cycle finished
    Settled {
        cycle_id: Uuid,
        language: String,
        succeeded: bool,
        at: DateTime<Utc>,
    },
}

/// Phase of the state machine, without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchPhase {
    Idle,
    Fetching,
    Settled,
}

/// What `FetchState::begin` hands back to a caller
pub enum Ticket {
    /// The caller started a new cycle and must run it, sending the outcome
    /// on `sender`
    Started {
        cycle_id: Uuid,
        sender: broadcast::Sender<CycleOutcome>,
        receiver: broadcast::Receiver<CycleOutcome>,
    },

    /// The caller joined a cycle that was already running
    Joined {
        cycle_id: Uuid,
        language: String,
        receiver: broadcast::Receiver<CycleOutcome>,
    },
}

impl Default for FetchState {
    fn default() -> Self {
        FetchState::Idle
    }
}

impl FetchState {
    /// Join the running cycle, or start one for `language`
    pub fn begin(&mut self, language: &str, now: DateTime<Utc>) -> Ticket {
        if let FetchState::Fetching {
            cycle_id,
            language: running,
            waiters,
            ..
        } = self
        {
            return Ticket::Joined {
                cycle_id: *cycle_id,
                language: running.clone(),
                receiver: waiters.subscribe(),
            };
        }

        let cycle_id = Uuid::new_v4();
        let (sender, receiver) = broadcast::channel(1);

        *self = FetchState::Fetching {
            cycle_id,
            language: language.to_string(),
            started_at: now,
            waiters: sender.clone(),
        };

        Ticket::Started {
            cycle_id,
            sender,
            receiver,
        }
    }

    /// Mark `cycle_id` finished.
    ///
    /// Returns false when the state no longer tracks that cycle (it was
    /// detached by an invalidation), in which case nothing changes.
    pub fn settle(&mut self, cycle_id: Uuid, succeeded: bool, now: DateTime<Utc>) -> bool {
        let language = match self {
            FetchState::Fetching {
                cycle_id: running,
                language,
                ..
            } if *running == cycle_id => std::mem::take(language),
            _ => return false,
        };

        *self = FetchState::Settled {
            cycle_id,
            language,
            succeeded,
            at: now,
        };
        true
    }

    /// Forget the running cycle. It still completes and notifies its own
    /// waiters, but a new caller will start a fresh cycle.
    pub fn detach(&mut self) -> Option<Uuid> {
        match std::mem::take(self) {
            FetchState::Fetching { cycle_id, .. } => Some(cycle_id),
            _ => None,
        }
    }

    pub fn phase(&self) -> FetchPhase {
        match self {
            FetchState::Idle => FetchPhase::Idle,
            FetchState::Fetching { .. } => FetchPhase::Fetching,
            FetchState::Settled { .. } => FetchPhase::Settled,
        }
    }

    pub fn is_fetching(&self) -> bool {
        matches!(self, FetchState::Fetching { .. })
    }

    /// Number of callers currently waiting on the running cycle
    pub fn waiter_count(&self) -> usize {
        match self {
            FetchState::Fetching { waiters, .. } => waiters.receiver_count(),
            _ => 0,
        }
    }
}
