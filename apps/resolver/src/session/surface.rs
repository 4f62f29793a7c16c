//! AutomationSurface — the port through which a conversation backend is driven.
//!
//! The core never assumes how a surface is implemented (browser automation,
//! a direct API, a test fake). `AppState` holds one behind an `Arc<dyn AutomationSurface>`.

use async_trait::async_trait;

use crate::prompting::PromptStep;

/// Outcome of running one prompt chain.
///
/// When `success` is true, `payload` holds one raw string per `copy_output`
/// step, in request order. Callers must still verify that count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainResult {
    pub success: bool,
    pub payload: Vec<String>,
}

impl ChainResult {
    pub fn ok(payload: Vec<String>) -> Self {
        Self {
            success: true,
            payload,
        }
    }

    pub fn failure() -> Self {
        Self::default()
    }
}

/// Per-chain execution knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainOptions {
    /// Keep the session open once the chain completes.
    pub leave_open: bool,
    /// Re-check capability grants (clipboard access, credentials) before sending.
    pub grant_capabilities: bool,
    /// Let the surface retry transient failures on its own.
    pub allow_retry: bool,
}

impl Default for ChainOptions {
    fn default() -> Self {
        Self {
            leave_open: true,
            grant_capabilities: false,
            allow_retry: false,
        }
    }
}

#[async_trait]
pub trait AutomationSurface: Send + Sync {
    /// Brings up a fresh session, including any capability grants it needs.
    async fn acquire_session(&self, service_hint: &str) -> bool;

    /// Reloads an already open session so it can be relabeled for another service.
    async fn resync(&self, service_hint: &str) -> bool;

    /// Executes the steps in order. Transport problems are reported as
    /// `success == false`, never raised.
    async fn run_chain(&self, steps: &[PromptStep], options: ChainOptions) -> ChainResult;

    async fn close_session(&self);

    fn is_session_open(&self) -> bool;

    /// Returns and clears the backend-reset signal.
    fn take_reset(&self) -> bool;
}
