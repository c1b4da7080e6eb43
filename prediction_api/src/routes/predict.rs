use crate::{
    prediction::{PredictError, PREDICTION_SUCCESS_MESSAGE},
    response::ApiResponse,
    server::SharedState,
    upload::{read_image_upload, UploadError},
};
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::time::Instant;
use tracing::instrument;

#[instrument(skip(state, multipart))]
pub async fn predict(
    State(state): State<SharedState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, PredictError> {
    state.metrics.record_request("/predict");
    let started = Instant::now();

    // A body that is not a multipart form carries no image at all.
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!("Request is not a multipart form: {}", e);
        UploadError::MissingInput
    })?;

    let upload = read_image_upload(&mut multipart, state.upload_config.max_bytes).await?;
    let record = state.prediction_service.predict(upload).await?;

    state.metrics.record_prediction(
        record.result.map_or("indeterminate", |label| label.as_str()),
        started.elapsed().as_millis() as u64,
    );

    let body = ApiResponse::success(Some(PREDICTION_SUCCESS_MESSAGE), record);
    Ok((StatusCode::CREATED, Json(body)).into_response())
}
