//! Axum route handlers for the Resolution API.

use std::collections::HashSet;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::prompting::{JobDetails, Question};
use crate::resolution::{ResolutionRecord, MAX_RETRIES_LIMIT};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub questions: Vec<Question>,
    #[serde(default)]
    pub job_details: JobDetails,
    pub max_retries: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub results: Vec<ResolutionRecord>,
    pub resolved: usize,
    pub total: usize,
}

/// POST /api/v1/questions/resolve
///
/// Resolves a batch of form questions against the stored profile.
/// Unresolved questions come back with `response: null`.
pub async fn handle_resolve(
    State(state): State<AppState>,
    Json(request): Json<ResolveRequest>,
) -> Result<Json<ResolveResponse>, AppError> {
    let max_retries = request.max_retries.unwrap_or(state.config.max_retries);
    if max_retries > MAX_RETRIES_LIMIT {
        return Err(AppError::Validation(format!(
            "maxRetries must be at most {MAX_RETRIES_LIMIT}"
        )));
    }

    let mut seen = HashSet::new();
    for question in &request.questions {
        if question.id.trim().is_empty() {
            return Err(AppError::Validation("Question id must not be empty".to_string()));
        }
        if !seen.insert(question.id.as_str()) {
            return Err(AppError::Validation(format!(
                "Duplicate question id '{}'",
                question.id
            )));
        }
    }

    let results = state
        .engine
        .resolve(&request.questions, &request.job_details, max_retries)
        .await?;

    let resolved = results.iter().filter(|r| r.response.is_some()).count();
    info!("Resolved {resolved}/{} question(s)", results.len());

    Ok(Json(ResolveResponse {
        total: results.len(),
        resolved,
        results,
    }))
}
