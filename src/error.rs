use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::config::ConfigError;
use crate::port::PortError;
use crate::reboot::RebootError;

/// A specialized `Result` type for HTTP handlers and the entry point.
pub type AppResult<T> = Result<T, AppError>;

/// Unified application error type.
///
/// Serial-layer failures are absorbed by the connection worker and never
/// reach a handler; the only request-level failures are rejected reboots.
/// The remaining variants surface at startup.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Reboot(#[from] RebootError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("serial setup error: {0}")]
    Port(#[from] PortError),

    #[error("an I/O error occurred: {0}")]
    Io(#[from] std::io::Error),
}

/// Allows Axum to convert `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::Reboot(RebootError::NoConnection) => (
                StatusCode::BAD_REQUEST,
                json!({"success": false, "message": self.to_string()}),
            ),
            Self::Reboot(RebootError::InProgress) => (
                StatusCode::CONFLICT,
                json!({"success": false, "message": self.to_string()}),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"success": false, "error": self.to_string()}),
            ),
        };
        (status, axum::Json(body)).into_response()
    }
}
