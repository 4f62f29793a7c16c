//! Axum route handler for the nearest-address lookup.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::nearest_address::{Address, AddressLookupError, LocationQuery};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NearestAddressRequest {
    /// A single location string or a list of them.
    pub location: Option<LocationQuery>,
}

#[derive(Debug, Serialize)]
pub struct NearestAddressResponse {
    pub address: Address,
}

/// POST /api/v1/addresses/nearest
pub async fn handle_nearest_address(
    State(state): State<AppState>,
    Json(request): Json<NearestAddressRequest>,
) -> Result<Json<NearestAddressResponse>, AppError> {
    let location = request.location.ok_or(AddressLookupError::NoLocation)?;
    let address = state.addresses.find(&location).await?;
    Ok(Json(NearestAddressResponse { address }))
}
