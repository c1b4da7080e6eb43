use crate::{
    record::PredictionRecord,
    response::{failure_response, ApiResponse},
    server::SharedState,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

pub const HISTORIES_FAILED_MESSAGE: &str = "Failed to fetch prediction histories.";

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub history: PredictionRecord,
}

impl From<PredictionRecord> for HistoryEntry {
    fn from(record: PredictionRecord) -> Self {
        Self {
            id: record.id,
            history: record,
        }
    }
}

#[instrument(skip(state))]
pub async fn histories(State(state): State<SharedState>) -> Response {
    state.metrics.record_request("/predict/histories");

    match state.prediction_service.histories().await {
        Ok(records) => {
            let data: Vec<HistoryEntry> = records.into_iter().map(HistoryEntry::from).collect();
            Json(ApiResponse::success(None, data)).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to list prediction histories: {}", e);
            failure_response(StatusCode::INTERNAL_SERVER_ERROR, HISTORIES_FAILED_MESSAGE)
        }
    }
}
