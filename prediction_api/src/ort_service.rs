use crate::{
    config::{ModelConfig, OutputConvention},
    model_service::{ModelError, ModelService, ModelState},
};
use async_trait::async_trait;
use ndarray::{Array, Ix4};
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::TensorRef,
};
use parking_lot::Mutex;
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

/// Loads the classifier once. Failures are logged and leave the service degraded
/// instead of aborting startup.
pub async fn load_model_state(model_config: &ModelConfig) -> ModelState {
    let Some(location) = model_config.location.as_deref() else {
        tracing::warn!("No model location configured, predictions will be rejected");
        return ModelState::Unloaded;
    };

    tracing::info!("Model is loading from {}", location);
    match OrtModelService::load(model_config, location).await {
        Ok(service) => {
            tracing::info!("Model loaded successfully");
            ModelState::loaded(service)
        }
        Err(e) => {
            tracing::error!("Failed to load model: {}", e);
            ModelState::FailedToLoad(e.to_string())
        }
    }
}

async fn fetch_model_bytes(
    model_config: &ModelConfig,
    location: &str,
) -> Result<Vec<u8>, ModelError> {
    if model_config.is_remote() {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(model_config.download_timeout_secs))
            .build()?;
        let response = client.get(location).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    } else {
        Ok(tokio::fs::read(location).await?)
    }
}

pub fn score_from_output(output: &[f32], convention: OutputConvention) -> Result<f32, ModelError> {
    let score = match (convention, output) {
        (_, []) => return Err(ModelError::EmptyOutput),
        (OutputConvention::Vector, [_, positive, ..]) => *positive,
        (_, [first, ..]) => *first,
    };

    if !score.is_finite() {
        return Err(ModelError::NonFiniteScore(score));
    }
    Ok(score)
}

#[derive(Clone)]
pub struct OrtModelService {
    sessions: Arc<Vec<Arc<Mutex<Session>>>>,
    counter: Arc<AtomicUsize>,
    output: OutputConvention,
}

impl OrtModelService {
    pub async fn load(model_config: &ModelConfig, location: &str) -> Result<Self, ModelError> {
        let model_bytes = fetch_model_bytes(model_config, location).await?;
        tracing::debug!("Fetched {} bytes of model", model_bytes.len());

        let num_instances = model_config.num_instances.max(1);
        let output = model_config.output;
        tokio::task::spawn_blocking(move || Self::from_bytes(&model_bytes, num_instances, output))
            .await
            .map_err(|e| ModelError::Inference(format!("model loading task failed: {}", e)))?
    }

    pub fn from_bytes(
        model_bytes: &[u8],
        num_instances: usize,
        output: OutputConvention,
    ) -> Result<Self, ModelError> {
        let sessions = (0..num_instances)
            .map(|_| {
                let session = Session::builder()?
                    .with_optimization_level(GraphOptimizationLevel::Level3)?
                    .commit_from_memory(model_bytes)?;
                Ok(Arc::new(Mutex::new(session)))
            })
            .collect::<Result<Vec<_>, ort::Error>>()?;

        tracing::info!("Created {} ONNX sessions", num_instances);

        Ok(Self {
            sessions: Arc::new(sessions),
            counter: Arc::new(AtomicUsize::new(0)),
            output,
        })
    }

    pub fn run_inference(&self, input: &Array<f32, Ix4>) -> Result<Vec<f32>, ModelError> {
        let index = self.counter.fetch_add(1, Ordering::SeqCst) % self.sessions.len();
        let mut session = self.sessions[index].lock();

        tracing::debug!("Handling request with session {}", index);
        let owned_buffer;
        let input_view = if input.view().is_standard_layout() {
            input.view()
        } else {
            owned_buffer = input.as_standard_layout().to_owned();
            owned_buffer.view()
        };

        let tensor_ref = TensorRef::from_array_view(input_view)?;
        let outputs = session.run(ort::inputs![tensor_ref])?;
        let (_, scores) = outputs[0].try_extract_tensor::<f32>()?;

        Ok(scores.to_vec())
    }
}

#[async_trait]
impl ModelService for OrtModelService {
    async fn predict(&self, input: Array<f32, Ix4>) -> Result<f32, ModelError> {
        let service = self.clone();
        let output = tokio::task::spawn_blocking(move || service.run_inference(&input))
            .await
            .map_err(|e| ModelError::Inference(format!("inference task failed: {}", e)))??;

        tracing::debug!("Raw model output: {:?}", output);
        score_from_output(&output, self.output)
    }
}
