use crate::server::SharedState;
use axum::{extract::State, response::IntoResponse, response::Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Liveness {
    status: bool,
    message: String,
}

pub async fn liveness(State(state): State<SharedState>) -> impl IntoResponse {
    state.metrics.record_request("/test");
    Json(Liveness {
        status: true,
        message: "server is work !".into(),
    })
}
