use crate::server::SharedState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct Status {
    status: String,
    model: String,
}

/// Readiness: unlike `/test`, reports 503 while the classifier is not loaded.
pub async fn healthcheck(State(state): State<SharedState>) -> impl IntoResponse {
    let model_state = state.prediction_service.model_state();
    let (code, status) = if model_state.is_loaded() {
        (StatusCode::OK, "Available")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Degraded")
    };

    (
        code,
        Json(Status {
            status: status.into(),
            model: model_state.as_str().into(),
        }),
    )
}
