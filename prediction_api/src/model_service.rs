use async_trait::async_trait;
use ndarray::{Array, Ix4};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model is not available: {0}")]
    Unavailable(String),
    #[error("Failed to download model: {0}")]
    Download(#[from] reqwest::Error),
    #[error("Failed to read model file: {0}")]
    Io(#[from] std::io::Error),
    #[error("ONNX Runtime error: {0}")]
    Runtime(#[from] ort::Error),
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("Model produced an empty output")]
    EmptyOutput,
    #[error("Model produced a non-finite score: {0}")]
    NonFiniteScore(f32),
}

#[async_trait]
pub trait ModelService: Send + Sync + 'static {
    /// Returns the positive-class confidence for a `[1, H, W, 3]` input.
    async fn predict(&self, input: Array<f32, Ix4>) -> Result<f32, ModelError>;
}

/// Startup outcome of the classifier, checked on every inference call.
#[derive(Clone)]
pub enum ModelState {
    Unloaded,
    Loaded(Arc<dyn ModelService>),
    FailedToLoad(String),
}

impl ModelState {
    pub fn loaded(model_service: impl ModelService) -> Self {
        ModelState::Loaded(Arc::new(model_service))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelState::Unloaded => "unloaded",
            ModelState::Loaded(_) => "loaded",
            ModelState::FailedToLoad(_) => "failed",
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, ModelState::Loaded(_))
    }

    pub fn service(&self) -> Result<&Arc<dyn ModelService>, ModelError> {
        match self {
            ModelState::Loaded(service) => Ok(service),
            ModelState::Unloaded => Err(ModelError::Unavailable(
                "no model location configured".into(),
            )),
            ModelState::FailedToLoad(reason) => Err(ModelError::Unavailable(format!(
                "model failed to load at startup: {}",
                reason
            ))),
        }
    }
}

impl std::fmt::Debug for ModelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelState::FailedToLoad(reason) => write!(f, "FailedToLoad({})", reason),
            other => f.write_str(other.as_str()),
        }
    }
}
