//! Axum route handlers for inspecting and releasing the conversation session.

use axum::{extract::State, http::StatusCode, Json};

use crate::session::SessionSnapshot;
use crate::state::AppState;

/// GET /api/v1/session
pub async fn handle_get_session(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.engine.session().snapshot().await)
}

/// POST /api/v1/session/release
///
/// Best-effort close; releasing an already closed session is a no-op.
pub async fn handle_release_session(State(state): State<AppState>) -> StatusCode {
    state.engine.session().release().await;
    StatusCode::NO_CONTENT
}
