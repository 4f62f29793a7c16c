//! ConversationSession — owns the lifecycle of the one logical conversation
//! held with the backend.
//!
//! States: `Closed → Opening → OpenFor(service) → Closed`. The `reset_occurred`
//! flag rides alongside `OpenFor` without a state transition: the backend lost
//! its memory while the channel stayed up. The surface is its only producer and
//! the resolution engine (by resending preambles) its only consumer. Every
//! latched reset bumps a generation counter, so a consumer only clears the
//! reset it actually answered.
//!
//! A session is shared by every service that talks to the backend. Callers
//! hold [`ConversationSession::begin_round`] across a multi-chain exchange so
//! chains from different rounds never interleave.

#[cfg(test)]
pub mod fake;
pub mod handlers;
pub mod surface;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::prompting::PromptStep;
pub use surface::{AutomationSurface, ChainOptions, ChainResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Closed,
    Opening,
    OpenFor(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub status: SessionStatus,
    pub reset_occurred: bool,
    /// Number of resets latched so far. Survives close.
    pub reset_generation: u64,
}

impl SessionState {
    fn closed() -> Self {
        Self {
            status: SessionStatus::Closed,
            reset_occurred: false,
            reset_generation: 0,
        }
    }

    fn mark_closed(&mut self) {
        self.status = SessionStatus::Closed;
        self.reset_occurred = false;
    }

    pub fn is_open(&self) -> bool {
        matches!(self.status, SessionStatus::OpenFor(_))
    }

    pub fn active_service(&self) -> Option<&str> {
        match &self.status {
            SessionStatus::OpenFor(service) => Some(service),
            _ => None,
        }
    }
}

/// Read-only view of the session, as exposed over HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub is_open: bool,
    pub active_service: Option<String>,
    pub reset_occurred: bool,
}

pub struct ConversationSession {
    surface: Arc<dyn AutomationSurface>,
    /// Also serializes teardown: only one `release` can hold it at a time.
    state: Mutex<SessionState>,
    /// At most one chain in flight per session.
    chain_lock: Mutex<()>,
    /// At most one multi-chain round in flight per session.
    round_lock: Mutex<()>,
}

impl ConversationSession {
    pub fn new(surface: Arc<dyn AutomationSurface>) -> Self {
        Self {
            surface,
            state: Mutex::new(SessionState::closed()),
            chain_lock: Mutex::new(()),
            round_lock: Mutex::new(()),
        }
    }

    /// Makes the session available for `service`.
    ///
    /// Reuses an open session for the same service, resyncs one open for a
    /// different service, and performs a full bring-up otherwise.
    pub async fn acquire(&self, service: &str) -> bool {
        let mut state = self.state.lock().await;
        self.sync_with_surface(&mut state);

        match state.status.clone() {
            SessionStatus::OpenFor(active) if active == service => {
                debug!("Reusing open session for '{service}'");
                true
            }
            SessionStatus::OpenFor(active) => {
                info!("Session open for '{active}', resyncing for '{service}'");
                if self.surface.resync(service).await {
                    state.status = SessionStatus::OpenFor(service.to_string());
                    true
                } else {
                    warn!("Surface did not settle after resync for '{service}'");
                    false
                }
            }
            SessionStatus::Closed | SessionStatus::Opening => {
                state.status = SessionStatus::Opening;
                if self.surface.acquire_session(service).await {
                    info!("Session opened for '{service}'");
                    state.status = SessionStatus::OpenFor(service.to_string());
                    state.reset_occurred = false;
                    // A fresh session has nothing to forget.
                    self.surface.take_reset();
                    true
                } else {
                    warn!("Failed to open session for '{service}'");
                    state.mark_closed();
                    false
                }
            }
        }
    }

    /// True when the session is open for `service` right now.
    pub async fn is_open_for(&self, service: &str) -> bool {
        let mut state = self.state.lock().await;
        self.sync_with_surface(&mut state);
        state.active_service() == Some(service)
    }

    pub async fn reset_occurred(&self) -> bool {
        let mut state = self.state.lock().await;
        self.sync_with_surface(&mut state);
        state.reset_occurred
    }

    /// Generation of the latched reset, or `None` when none is pending.
    pub async fn pending_reset(&self) -> Option<u64> {
        let mut state = self.state.lock().await;
        self.sync_with_surface(&mut state);
        state.reset_occurred.then_some(state.reset_generation)
    }

    /// Marks the reset observed at `generation` as handled. A reset latched
    /// after that observation stays pending.
    ///
    /// Call only after a chain carrying the full context succeeded.
    pub async fn clear_reset_through(&self, generation: u64) {
        let mut state = self.state.lock().await;
        self.sync_with_surface(&mut state);
        if state.reset_generation == generation {
            state.reset_occurred = false;
        } else {
            debug!("Newer reset latched since generation {generation}; keeping it");
        }
    }

    /// Serializes multi-chain exchanges against this session.
    pub async fn begin_round(&self) -> MutexGuard<'_, ()> {
        self.round_lock.lock().await
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let mut state = self.state.lock().await;
        self.sync_with_surface(&mut state);
        SessionSnapshot {
            is_open: state.is_open(),
            active_service: state.active_service().map(str::to_string),
            reset_occurred: state.reset_occurred,
        }
    }

    /// Sends the steps through the surface. A pure transport: content is not
    /// inspected, and every failure comes back as `success == false`.
    ///
    /// The whole call is bounded by the sum of the per-step timeouts.
    pub async fn run_chain(&self, steps: &[PromptStep], options: ChainOptions) -> ChainResult {
        let _in_flight = self.chain_lock.lock().await;

        if !self.state.lock().await.is_open() {
            warn!("run_chain called on a closed session");
            return ChainResult::failure();
        }
        if steps.is_empty() {
            return ChainResult::ok(Vec::new());
        }

        let budget: Duration = steps.iter().map(|s| s.timeout).sum();
        let result =
            match tokio::time::timeout(budget, self.surface.run_chain(steps, options)).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("Prompt chain timed out after {}s", budget.as_secs());
                    ChainResult::failure()
                }
            };

        let mut state = self.state.lock().await;
        self.sync_with_surface(&mut state);

        result
    }

    /// Best-effort close. Idempotent, and concurrent callers are serialized so
    /// only one of them actually tears the session down.
    pub async fn release(&self) {
        let mut state = self.state.lock().await;

        if !state.is_open() && !self.surface.is_session_open() {
            state.mark_closed();
            return;
        }

        self.surface.close_session().await;
        state.mark_closed();
        info!("Session released");
    }

    /// Latches a pending reset signal and drops a stale open flag.
    fn sync_with_surface(&self, state: &mut SessionState) {
        if state.is_open() && !self.surface.is_session_open() {
            warn!("Surface reports the session closed; marking it closed");
            state.mark_closed();
        }

        if self.surface.take_reset() && state.is_open() {
            warn!("Backend reset detected; conversation context was lost");
            state.reset_occurred = true;
            state.reset_generation += 1;
        }
    }
}
