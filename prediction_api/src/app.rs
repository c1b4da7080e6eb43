use crate::config::Config;
use crate::ort_service::load_model_state;
use crate::prediction::PredictionService;
use crate::preprocess::ImagePreprocessor;
use crate::server::HttpServer;
use crate::store::build_store;
use crate::telemetry::Metrics;

use std::{error::Error, sync::Arc};
use tokio::{signal, sync::broadcast};

pub async fn start_app(config: Config) -> Result<(), Box<dyn Error>> {
    let metrics = match Metrics::new() {
        Ok(metrics) => Arc::new(metrics),
        Err(e) => {
            tracing::error!("Failed to register metrics: {:?}", e);
            return Err(Box::new(e));
        }
    };

    // The listener is only bound once loading has finished, successfully or not.
    let model_state = load_model_state(&config.model).await;
    if !model_state.is_loaded() {
        tracing::warn!(
            "Starting in degraded mode, model is {}",
            model_state.as_str()
        );
    }

    let prediction_service = Arc::new(PredictionService::new(
        ImagePreprocessor::new(&config.preprocess),
        model_state,
        config.prediction.threshold_policy(),
        build_store(&config.store),
    ));

    let server = HttpServer::new(prediction_service, metrics, &config).await?;

    let (shutdown_tx, _) = broadcast::channel(1);
    let server_handle = server.run(shutdown_tx.subscribe()).await?;

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown.");

    let _ = shutdown_tx.send(());
    server_handle.await??;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
