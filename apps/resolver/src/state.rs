use std::sync::Arc;

use crate::config::Config;
use crate::nearest_address::NearestAddressFinder;
use crate::resolution::ResolutionEngine;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// The one engine, and through it the one conversation session.
    pub engine: Arc<ResolutionEngine>,
    /// Shares the engine's session under its own service name.
    pub addresses: Arc<NearestAddressFinder>,
    pub config: Config,
}
