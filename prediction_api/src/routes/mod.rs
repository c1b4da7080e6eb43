mod health;
mod histories;
mod liveness;
mod metrics;
mod predict;

use crate::server::SharedState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

/// Headroom over the file limit for multipart boundaries and part headers.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn api_routes(max_upload_bytes: usize) -> Router<SharedState> {
    Router::new()
        .route("/test", get(liveness::liveness))
        .route("/health", get(health::healthcheck))
        .route("/metrics", get(metrics::metrics_handler))
        .route(
            "/predict",
            post(predict::predict).layer(DefaultBodyLimit::max(
                max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES),
            )),
        )
        .route("/predict/histories", get(histories::histories))
}
