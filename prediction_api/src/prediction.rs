use crate::{
    model_service::{ModelError, ModelState},
    preprocess::{ImagePreprocessor, PreprocessError},
    record::PredictionRecord,
    response::failure_response,
    store::{RecordStore, StoreError},
    threshold::ThresholdPolicy,
    upload::{ImageUpload, UploadError},
};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

pub const PAYLOAD_TOO_LARGE_MESSAGE: &str =
    "Payload content length greater than maximum allowed: 1000000";
pub const INVALID_MEDIA_TYPE_MESSAGE: &str =
    "Invalid file type. Only PNG, JPG, or JPEG images are allowed.";
pub const MISSING_IMAGE_MESSAGE: &str = "Image is required.";
pub const UPLOAD_ERROR_MESSAGE: &str = "An unexpected error occurred while uploading the file.";
pub const NOT_RGB_MESSAGE: &str = "Image must be in RGB format";
pub const IMAGE_TOO_LARGE_MESSAGE: &str =
    "Image dimensions must not exceed 3000x4000 (width x height)";
pub const PREDICTION_FAILED_MESSAGE: &str = "Terjadi kesalahan dalam melakukan prediksi";
pub const PERSISTENCE_FAILED_MESSAGE: &str = "Failed to store prediction result.";
pub const PREDICTION_SUCCESS_MESSAGE: &str = "Model predicted successfully";

#[derive(Error, Debug)]
pub enum PredictError {
    #[error("Upload rejected: {0}")]
    Upload(#[from] UploadError),
    #[error("Preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),
    #[error("Model failed: {0}")]
    Model(#[from] ModelError),
    #[error("Persisting prediction failed: {0}")]
    Persistence(#[from] StoreError),
}

impl PredictError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PredictError::Upload(UploadError::PayloadTooLarge { .. }) => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            PredictError::Upload(UploadError::InvalidMediaType(_))
            | PredictError::Upload(UploadError::MissingInput) => StatusCode::BAD_REQUEST,
            PredictError::Upload(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PredictError::Preprocess(_) | PredictError::Model(_) => StatusCode::BAD_REQUEST,
            PredictError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn client_message(&self) -> &'static str {
        match self {
            PredictError::Upload(UploadError::PayloadTooLarge { .. }) => {
                PAYLOAD_TOO_LARGE_MESSAGE
            }
            PredictError::Upload(UploadError::InvalidMediaType(_)) => INVALID_MEDIA_TYPE_MESSAGE,
            PredictError::Upload(UploadError::MissingInput) => MISSING_IMAGE_MESSAGE,
            PredictError::Upload(_) => UPLOAD_ERROR_MESSAGE,
            PredictError::Preprocess(PreprocessError::UnsupportedImageFormat(_)) => {
                NOT_RGB_MESSAGE
            }
            PredictError::Preprocess(PreprocessError::ImageTooLarge { .. }) => {
                IMAGE_TOO_LARGE_MESSAGE
            }
            PredictError::Preprocess(PreprocessError::Decode(_)) | PredictError::Model(_) => {
                PREDICTION_FAILED_MESSAGE
            }
            PredictError::Persistence(_) => PERSISTENCE_FAILED_MESSAGE,
        }
    }
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Prediction request failed: {}", self);
        } else {
            tracing::warn!("Prediction request rejected: {}", self);
        }
        failure_response(status, self.client_message())
    }
}

/// Decode, classify, label and persist one uploaded image.
pub struct PredictionService {
    preprocessor: ImagePreprocessor,
    model: ModelState,
    policy: ThresholdPolicy,
    store: Arc<dyn RecordStore>,
}

impl PredictionService {
    pub fn new(
        preprocessor: ImagePreprocessor,
        model: ModelState,
        policy: ThresholdPolicy,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            preprocessor,
            model,
            policy,
            store,
        }
    }

    pub fn model_state(&self) -> &ModelState {
        &self.model
    }

    #[instrument(
        skip(self, upload),
        fields(
            file_name = ?upload.file_name,
            bytes = upload.bytes.len(),
            content_type = %upload.content_type
        )
    )]
    pub async fn predict(&self, upload: ImageUpload) -> Result<PredictionRecord, PredictError> {
        let input = self.preprocessor.preprocess(&upload.bytes)?;

        let model_service = self.model.service()?;
        let score = model_service.predict(input).await?;

        let label = self.policy.classify(score);
        match label {
            Some(label) => tracing::info!("Score {:.4} classified as {}", score, label),
            None => tracing::warn!(
                "Score {:.4} sits exactly on the cutoff of {:?}, result is indeterminate",
                score,
                self.policy
            ),
        }

        let record = PredictionRecord::new(label);
        self.store.put(&record).await?;

        Ok(record)
    }

    pub async fn histories(&self) -> Result<Vec<PredictionRecord>, StoreError> {
        self.store.list_all().await
    }
}
