use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

/// JSON envelope shared by every endpoint: `{status, message?, data?}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: Option<&str>, data: T) -> Self {
        Self {
            status: "success",
            message: message.map(str::to_owned),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Client errors report `fail`, server errors report `error`.
    pub fn failure(status: StatusCode, message: &str) -> Self {
        Self {
            status: if status.is_server_error() {
                "error"
            } else {
                "fail"
            },
            message: Some(message.to_owned()),
            data: None,
        }
    }
}

pub fn failure_response(status: StatusCode, message: &str) -> Response {
    (status, Json(ApiResponse::<()>::failure(status, message))).into_response()
}
