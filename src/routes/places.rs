use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    auth::CurrentUser,
    error::AppError,
    services::places::{PlaceResult, PlacesError},
    state::AppState,
};

const MIN_INPUT_LEN: usize = 2;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(status))
        .route("/autocomplete", get(autocomplete))
}

#[derive(Serialize)]
struct StatusResponse {
    ready: bool,
}

/// Resolves once the startup health check has finished; the browser widget calls it
/// once before wiring up autocomplete.
async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        ready: state.places.readiness().wait().await,
    })
}

#[derive(Deserialize)]
struct AutocompleteQuery {
    #[serde(default)]
    input: String,
}

async fn autocomplete(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<AutocompleteQuery>,
) -> Result<(StatusCode, Json<Vec<PlaceResult>>), AppError> {
    current.require_user()?;
    let input = query.input.trim();
    if input.chars().count() < MIN_INPUT_LEN {
        return Ok((StatusCode::OK, Json(Vec::new())));
    }
    match state.places.autocomplete(input).await {
        Ok(results) => Ok((StatusCode::OK, Json(results))),
        Err(PlacesError::Unavailable) => Ok((StatusCode::SERVICE_UNAVAILABLE, Json(Vec::new()))),
        Err(err) => {
            warn!("place lookup failed: {err}");
            Ok((StatusCode::BAD_GATEWAY, Json(Vec::new())))
        }
    }
}
