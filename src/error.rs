use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub const PROXY_ERROR_CODE: &str = "PROXY_ERROR";

#[derive(Error, Debug)]
pub enum AppError {
    /// The gateway credential is not configured on this server.
    #[error("Payment API configuration missing on the server.")]
    Configuration,

    #[error("{0}")]
    BadRequest(String),

    #[error("Method not allowed.")]
    MethodNotAllowed,

    /// The gateway could not be reached or answered with something unreadable.
    #[error("{0}")]
    Proxy(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Proxy(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn code(&self) -> Option<&'static str> {
        match self {
            AppError::Proxy(_) => Some(PROXY_ERROR_CODE),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self.code() {
            Some(code) => json!({ "error": { "code": code, "message": self.to_string() } }),
            None => json!({ "error": { "message": self.to_string() } }),
        };

        (status, Json(body)).into_response()
    }
}
