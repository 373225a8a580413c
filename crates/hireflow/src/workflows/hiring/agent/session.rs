use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

/// Opaque identifier correlating a sequence of agent exchanges.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of a single agent request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestPhase {
    Idle,
    Dispatched,
    Succeeded,
    Failed,
    TimedOut,
    Cancelled,
}

impl RequestPhase {
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestPhase::Succeeded
                | RequestPhase::Failed
                | RequestPhase::TimedOut
                | RequestPhase::Cancelled
        )
    }
}

#[derive(Debug, Default)]
struct LaneState {
    next_ticket: u64,
    next_delivery: u64,
    released: BTreeSet<u64>,
}

impl LaneState {
    fn idle(&self) -> bool {
        self.next_delivery == self.next_ticket
    }
}

#[derive(Debug)]
struct SessionLane {
    state: Mutex<LaneState>,
    turn: watch::Sender<u64>,
}

impl SessionLane {
    fn new() -> Self {
        let (turn, _) = watch::channel(0);
        Self {
            state: Mutex::new(LaneState::default()),
            turn,
        }
    }

    fn state(&self) -> MutexGuard<'_, LaneState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Per-session delivery lanes. Requests in one session may run concurrently but
/// their replies are handed back in the order the requests were issued.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    lanes: Arc<Mutex<HashMap<SessionId, Arc<SessionLane>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse the caller's session or open a fresh one.
    pub fn resolve(&self, requested: Option<SessionId>) -> SessionId {
        requested.unwrap_or_else(SessionId::generate)
    }

    /// Reserve the next delivery slot in `session`.
    pub fn issue(&self, session: &SessionId) -> Ticket {
        let mut lanes = self.lanes();
        let lane = lanes
            .entry(session.clone())
            .or_insert_with(|| Arc::new(SessionLane::new()))
            .clone();

        let number = {
            let mut state = lane.state();
            let number = state.next_ticket;
            state.next_ticket += 1;
            number
        };
        drop(lanes);

        Ticket {
            registry: self.clone(),
            session: session.clone(),
            lane,
            number,
        }
    }

    /// Sessions with at least one outstanding request.
    pub fn active_sessions(&self) -> usize {
        self.lanes().len()
    }

    fn lanes(&self) -> MutexGuard<'_, HashMap<SessionId, Arc<SessionLane>>> {
        self.lanes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn prune(&self, session: &SessionId) {
        let mut lanes = self.lanes();
        let idle = lanes
            .get(session)
            .is_some_and(|lane| lane.state().idle());
        if idle {
            lanes.remove(session);
        }
    }
}

/// Delivery slot held for the lifetime of one request. Dropping it, whether
/// the request finished or was abandoned, lets later requests deliver.
#[derive(Debug)]
pub struct Ticket {
    registry: SessionRegistry,
    session: SessionId,
    lane: Arc<SessionLane>,
    number: u64,
}

impl Ticket {
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Resolve once every earlier ticket in the session has been released.
    pub async fn wait_turn(&self) {
        let mut turn = self.lane.turn.subscribe();
        let _ = turn.wait_for(|next| *next >= self.number).await;
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        let next = {
            let mut guard = self.lane.state();
            let state = &mut *guard;
            state.released.insert(self.number);
            while state.released.remove(&state.next_delivery) {
                state.next_delivery += 1;
            }
            state.next_delivery
        };
        self.lane.turn.send_replace(next);
        self.registry.prune(&self.session);
    }
}
