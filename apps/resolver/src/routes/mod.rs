pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::nearest_address::handlers as nearest_address;
use crate::resolution::handlers as resolution;
use crate::session::handlers as session;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/questions/resolve",
            post(resolution::handle_resolve),
        )
        .route(
            "/api/v1/addresses/nearest",
            post(nearest_address::handle_nearest_address),
        )
        .route("/api/v1/session", get(session::handle_get_session))
        .route(
            "/api/v1/session/release",
            post(session::handle_release_session),
        )
        .with_state(state)
}
